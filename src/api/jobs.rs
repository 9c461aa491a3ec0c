use super::{PipelineApi, Query};
use crate::core::errors::ApiError;
use crate::core::models::FarmJobsFilter;
use reqwest::Method;
use serde_json::{json, Value};

pub async fn farm_jobs(api: &dyn PipelineApi, filter: &FarmJobsFilter) -> Result<Value, ApiError> {
    api.get("/jobs/farm_jobs/", &farm_jobs_query(filter)).await
}

fn farm_jobs_query(filter: &FarmJobsFilter) -> Query {
    let mut query = vec![("limit", filter.limit.to_string())];
    if let Some(status) = filter.status {
        query.push(("status", status.as_str().to_string()));
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        query.push(("search", search.to_string()));
    }
    query
}

pub async fn farm_job(api: &dyn PipelineApi, job_id: u64) -> Result<Value, ApiError> {
    api.get(&format!("/jobs/farm_job/{job_id}"), &Vec::new()).await
}

pub async fn farm_nodes(api: &dyn PipelineApi) -> Result<Value, ApiError> {
    api.get("/jobs/farm_nodes/", &Vec::new()).await
}

pub async fn farm_node(api: &dyn PipelineApi, node_id: u64) -> Result<Value, ApiError> {
    api.get(&format!("/jobs/farm_node/{node_id}"), &Vec::new()).await
}

pub async fn kill_job(api: &dyn PipelineApi, job_id: u64) -> Result<Value, ApiError> {
    api.send(Method::POST, "/jobs/kill_job/", json!({ "job_id": job_id }))
        .await
}

pub async fn delete_job(api: &dyn PipelineApi, job_id: u64) -> Result<Value, ApiError> {
    api.send(Method::POST, "/jobs/delete_job/", json!({ "job_id": job_id }))
        .await
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RestartOptions {
    /// Submit a copy of the job instead of resetting the original.
    pub clone_job: bool,
    /// Pin the restarted job to the node that ran it before.
    pub use_same_machine: bool,
}

pub async fn restart_job(
    api: &dyn PipelineApi,
    job_id: u64,
    options: RestartOptions,
) -> Result<Value, ApiError> {
    let body = json!({
        "job_id": job_id,
        "clone_job": options.clone_job,
        "use_same_machine": options.use_same_machine,
    });
    api.send(Method::POST, "/jobs/restart_job/", body).await
}

pub async fn change_priority(
    api: &dyn PipelineApi,
    job_id: u64,
    priority: i32,
) -> Result<Value, ApiError> {
    api.send(
        Method::PATCH,
        &format!("/jobs/farm_jobs/{job_id}/"),
        json!({ "priority": priority }),
    )
    .await
}
