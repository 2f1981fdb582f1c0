use medprofile_core::InsightResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct InsightRequest {
    pub drugs: Vec<String>,
    /// When set, the aggregated result is also summarized in plain language
    /// by the configured LLM. Requires OPENROUTER_API_KEY.
    #[serde(default)]
    pub summarize: bool,
}

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    pub result: InsightResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}
