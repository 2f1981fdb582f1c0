//! Label source backed by the openFDA drug label endpoint.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::StoreError;
use crate::model::{CanonicalDrug, LabelInfo};
use crate::store::LabelSource;

const DEFAULT_BASE_URL: &str = "https://api.fda.gov/drug/label.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OpenFdaLabelSource {
    client: reqwest::Client,
    base_url: String,
}

impl OpenFdaLabelSource {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for OpenFdaLabelSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LabelSource for OpenFdaLabelSource {
    async fn fetch_label(&self, drug: &CanonicalDrug) -> Result<Option<LabelInfo>, StoreError> {
        let search = format!("openfda.generic_name:\"{}\"", drug.generic_name);
        debug!(canonical_id = %drug.canonical_id, %search, "querying openFDA");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("search", search.as_str()), ("limit", "1")])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|err| StoreError::transient(err.to_string()))?;

        // openFDA answers 404 when the search matches nothing.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreError::transient(format!(
                "openFDA returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| StoreError::transient(err.to_string()))?;

        Ok(parse_label(&drug.canonical_id, &body))
    }
}

fn parse_label(canonical_id: &str, body: &Value) -> Option<LabelInfo> {
    let result = body["results"].as_array()?.first()?;
    let openfda = &result["openfda"];

    Some(LabelInfo {
        canonical_id: canonical_id.to_string(),
        purpose: first_string(result, "purpose"),
        warnings: string_list(result, "warnings"),
        brand_name: first_string(openfda, "brand_name"),
        generic_name: first_string(openfda, "generic_name"),
    })
}

fn first_string(value: &Value, key: &str) -> Option<String> {
    value[key]
        .as_array()?
        .first()?
        .as_str()
        .map(|s| s.to_string())
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value[key]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}
