use super::render::print_payload;
use anyhow::{Context, Result};
use chrono::Utc;
use pipeline_poller::api::{fetch_source, PipelineClient};
use pipeline_poller::core::models::{DataSource, Delivery};
use pipeline_poller::core::settings::Settings;
use pipeline_poller::{ApiError, PollRequest, Poller, ResultCache};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

enum WatchEvent {
    Data(Value),
    Failed(ApiError),
}

pub async fn run(
    settings: &Settings,
    source: DataSource,
    interval_ms: Option<u64>,
    json: bool,
    count: Option<usize>,
) -> Result<()> {
    let delay = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| settings.polling.delay());

    let client = Arc::new(PipelineClient::from_settings(&settings.server)?);
    let cache = ResultCache::with_policy(settings.cache.ttl(), settings.cache.policy()?);
    let poller: Poller<Value, ApiError> = Poller::with_cache(source.name(), cache);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<WatchEvent>();
    let request = build_request(&client, &source, delay, event_tx);
    let request = match settings.polling.fetch_timeout() {
        Some(timeout) => request.timeout(timeout),
        None => request,
    };

    tracing::info!(
        source = source.name(),
        base_url = %client.base_url(),
        delay_ms = delay.as_millis() as u64,
        "Watching data source"
    );
    poller.start(request).context("Failed to start poller")?;

    let mut delivered = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                break;
            }
            Some(event) = event_rx.recv() => match event {
                WatchEvent::Data(payload) => {
                    print_delivery(&source, payload, json)?;
                    delivered += 1;
                    if count.is_some_and(|limit| delivered >= limit) {
                        break;
                    }
                }
                WatchEvent::Failed(error) => report_failure(&source, &error),
            }
        }
    }

    poller.release();
    Ok(())
}

fn build_request(
    client: &Arc<PipelineClient>,
    source: &DataSource,
    delay: Duration,
    event_tx: mpsc::UnboundedSender<WatchEvent>,
) -> PollRequest<Value, ApiError> {
    let fetch_client = Arc::clone(client);
    let fetch_source_arg = source.clone();
    let error_tx = event_tx.clone();

    PollRequest::new(
        delay,
        move || {
            let client = Arc::clone(&fetch_client);
            let source = fetch_source_arg.clone();
            async move {
                let api: &PipelineClient = &client;
                fetch_source(api, &source).await
            }
        },
        move |payload| {
            let _ = event_tx.send(WatchEvent::Data(payload));
        },
    )
    .on_error(move |error| {
        let _ = error_tx.send(WatchEvent::Failed(error));
    })
    .cache_key(source.cache_key())
}

fn print_delivery(source: &DataSource, payload: Value, json: bool) -> Result<()> {
    if json {
        let delivery = Delivery {
            source: source.name().to_string(),
            cache_key: source.cache_key(),
            received_at: Utc::now(),
            payload,
        };
        println!("{}", serde_json::to_string(&delivery)?);
    } else {
        println!("--- {} @ {}", source.name(), Utc::now().format("%H:%M:%S"));
        print_payload(source, &payload);
    }
    Ok(())
}

fn report_failure(source: &DataSource, error: &ApiError) {
    if error.is_unauthorized() {
        tracing::warn!(
            source = source.name(),
            error = %error,
            "Session token rejected, set PIPELINE_TOKEN or server.token"
        );
    } else {
        tracing::warn!(source = source.name(), error = %error, "Fetch failed, will retry");
    }
}
