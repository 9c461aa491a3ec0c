use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Ready,
    Reserved,
    Running,
    Failed,
    Success,
    Waiting,
    Terminating,
}

impl JobStatus {
    pub const ALL: [JobStatus; 8] = [
        JobStatus::Created,
        JobStatus::Ready,
        JobStatus::Reserved,
        JobStatus::Running,
        JobStatus::Failed,
        JobStatus::Success,
        JobStatus::Waiting,
        JobStatus::Terminating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Ready => "ready",
            JobStatus::Reserved => "reserved",
            JobStatus::Running => "running",
            JobStatus::Failed => "failed",
            JobStatus::Success => "success",
            JobStatus::Waiting => "waiting",
            JobStatus::Terminating => "terminating",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| format!("unknown job status: {s}"))
    }
}

/// Query for the farm job list. `status: None` means every status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmJobsFilter {
    pub limit: u32,
    pub status: Option<JobStatus>,
    pub search: Option<String>,
}

impl Default for FarmJobsFilter {
    fn default() -> Self {
        Self {
            limit: 30,
            status: None,
            search: None,
        }
    }
}

/// A pollable read endpoint of the pipeline API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    FarmJobs(FarmJobsFilter),
    FarmJob(u64),
    FarmNodes,
    FarmNode(u64),
    CaptureLocations,
}

impl DataSource {
    pub fn name(&self) -> &'static str {
        match self {
            DataSource::FarmJobs(_) => "farm_jobs",
            DataSource::FarmJob(_) => "farm_job",
            DataSource::FarmNodes => "farm_nodes",
            DataSource::FarmNode(_) => "farm_node",
            DataSource::CaptureLocations => "capture_locations",
        }
    }

    /// Cache slot for this source. Includes every parameter that changes the
    /// response so distinct queries never share an entry.
    pub fn cache_key(&self) -> String {
        match self {
            DataSource::FarmJobs(filter) => format!(
                "{}:{}:{}:{}",
                self.name(),
                filter.status.map(|s| s.as_str()).unwrap_or("all"),
                filter.limit,
                filter.search.as_deref().unwrap_or("")
            ),
            DataSource::FarmJob(id) | DataSource::FarmNode(id) => format!("{}:{}", self.name(), id),
            DataSource::FarmNodes | DataSource::CaptureLocations => self.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: u64,
    pub machine_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmJob {
    pub id: u64,
    pub job_class: String,
    pub status: JobStatus,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub node: Option<NodeRef>,
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub ext_take_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FarmJobPage {
    #[serde(default)]
    pub count: Option<u64>,
    pub results: Vec<FarmJob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmNode {
    pub id: u64,
    pub machine_name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub cpu_percent: Option<f64>,
    #[serde(default)]
    pub gpu_count: Option<u32>,
    #[serde(default)]
    pub running_jobs: Vec<serde_json::Value>,
}

/// One payload handed to a watcher, with where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub source: String,
    pub cache_key: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub received_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}
