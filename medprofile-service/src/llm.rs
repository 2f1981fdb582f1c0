use medprofile_core::InsightResult;
use rig::client::CompletionClient;
use rig::{agent::Agent, completion::Prompt, providers::openrouter};
use tracing::info;

pub fn get_llm_agent(prompt: &str) -> anyhow::Result<Agent<openrouter::CompletionModel>> {
    let api_key = std::env::var("OPENROUTER_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENROUTER_API_KEY not set"))?;
    let client = openrouter::Client::new(&api_key);
    let agent = client.agent("openai/gpt-4o-mini").preamble(prompt).build();
    Ok(agent)
}

/// Turn an aggregated insight payload into a short plain-language summary.
pub async fn summarize_insights(result: &InsightResult) -> anyhow::Result<String> {
    let payload = serde_json::to_string_pretty(result)?;

    let prompt = format!(
        r#"You are a medication information assistant.
        Below is a structured medication report: per-drug profiles (classification, label warnings)
        and either therapeutic alternatives for a single drug or pairwise interaction checks for
        several drugs.

        Summarize it for a general audience in a few short paragraphs:
        - Name each drug and what it is for.
        - If interactions were checked, state each pair's outcome. Treat "missing" as
          "no interaction on file" and "unavailable" as "could not be checked" - never
          present an unchecked pair as safe.
        - If alternatives were looked up, list them.
        - Mention any inputs that could not be recognized.
        - Close by noting this is not medical advice.

        Report:
        {payload}"#
    );

    let agent = get_llm_agent("You are a careful medication information assistant.")?;
    let summary = agent.prompt(&prompt).await?;

    info!(chars = summary.len(), "generated insight summary");
    Ok(summary)
}
