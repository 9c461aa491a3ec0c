mod capture;
mod client;
mod jobs;

use crate::core::errors::ApiError;
use crate::core::models::DataSource;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

pub use capture::{capture_locations, toggle_capturing};
pub use client::PipelineClient;
pub use jobs::{
    change_priority, delete_job, farm_job, farm_jobs, farm_node, farm_nodes, kill_job,
    restart_job, RestartOptions,
};

pub type Query = Vec<(&'static str, String)>;

/// Transport for the pipeline REST API. Response bodies are passed through
/// as JSON without interpretation.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    async fn get(&self, path: &str, query: &Query) -> Result<Value, ApiError>;
    async fn send(&self, method: Method, path: &str, body: Value) -> Result<Value, ApiError>;
}

/// Reads whichever endpoint backs `source`.
pub async fn fetch_source(api: &dyn PipelineApi, source: &DataSource) -> Result<Value, ApiError> {
    match source {
        DataSource::FarmJobs(filter) => farm_jobs(api, filter).await,
        DataSource::FarmJob(id) => farm_job(api, *id).await,
        DataSource::FarmNodes => farm_nodes(api).await,
        DataSource::FarmNode(id) => farm_node(api, *id).await,
        DataSource::CaptureLocations => capture_locations(api).await,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeApi;
    use super::*;
    use crate::core::models::{FarmJobsFilter, JobStatus};
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_source_routes_to_endpoint() {
        let api = FakeApi::new(json!([]));

        fetch_source(&api, &DataSource::FarmNodes).await.unwrap();
        fetch_source(&api, &DataSource::FarmNode(4)).await.unwrap();
        fetch_source(&api, &DataSource::FarmJob(9)).await.unwrap();
        fetch_source(&api, &DataSource::CaptureLocations).await.unwrap();
        fetch_source(
            &api,
            &DataSource::FarmJobs(FarmJobsFilter {
                limit: 10,
                status: Some(JobStatus::Failed),
                search: None,
            }),
        )
        .await
        .unwrap();

        let paths: Vec<String> = api.calls().into_iter().map(|c| c.path).collect();
        assert_eq!(
            paths,
            vec![
                "/jobs/farm_nodes/",
                "/jobs/farm_node/4",
                "/jobs/farm_job/9",
                "/capture/locations/",
                "/jobs/farm_jobs/",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_caches_api_payload_under_source_key() {
        use crate::core::cache::ResultCache;
        use crate::poller::{PollRequest, Poller};
        use std::sync::Arc;
        use std::time::Duration;

        let api = Arc::new(FakeApi::new(json!({"count": 0, "results": []})));
        let cache = ResultCache::new();
        let source = DataSource::FarmJobs(FarmJobsFilter::default());
        let poller: Poller<Value, ApiError> = Poller::with_cache("farm_jobs", cache.clone());

        let fetch_api = Arc::clone(&api);
        let fetch_source_arg = source.clone();
        poller
            .start(
                PollRequest::new(
                    Duration::from_millis(3000),
                    move || {
                        let api = Arc::clone(&fetch_api);
                        let source = fetch_source_arg.clone();
                        async move {
                            let api: &FakeApi = &api;
                            fetch_source(api, &source).await
                        }
                    },
                    |_| {},
                )
                .cache_key(source.cache_key()),
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(6500)).await;

        assert_eq!(api.calls().len(), 3);
        assert_eq!(
            cache.get("farm_jobs:all:30:"),
            Some(json!({"count": 0, "results": []}))
        );
    }
}
