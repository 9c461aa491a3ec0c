use super::render::print_payload;
use anyhow::{Context, Result};
use chrono::Utc;
use pipeline_poller::api::{fetch_source, PipelineClient};
use pipeline_poller::core::models::{DataSource, Delivery};
use pipeline_poller::core::settings::Settings;

pub async fn run(settings: &Settings, source: DataSource, json: bool) -> Result<()> {
    let client = PipelineClient::from_settings(&settings.server)?;

    let request = fetch_source(&client, &source);
    let payload = match settings.polling.fetch_timeout() {
        Some(timeout) => tokio::time::timeout(timeout, request)
            .await
            .with_context(|| format!("Timed out fetching {}", source.name()))?,
        None => request.await,
    }
    .with_context(|| format!("Failed to fetch {}", source.name()))?;

    if json {
        let delivery = Delivery {
            source: source.name().to_string(),
            cache_key: source.cache_key(),
            received_at: Utc::now(),
            payload,
        };
        println!("{}", serde_json::to_string_pretty(&delivery)?);
    } else {
        print_payload(&source, &payload);
    }

    Ok(())
}
