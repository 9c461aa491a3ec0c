pub mod fetch;
pub mod job;
mod render;
pub mod watch;

use clap::Subcommand;
use pipeline_poller::core::models::{DataSource, FarmJobsFilter, JobStatus};

#[derive(Subcommand, Clone)]
pub enum SourceCommand {
    /// Farm job list
    Jobs {
        /// Maximum number of jobs to return
        #[arg(long, default_value = "30")]
        limit: u32,

        /// Only jobs with this status
        #[arg(long)]
        status: Option<JobStatus>,

        /// Free-text search
        #[arg(long)]
        search: Option<String>,
    },

    /// One farm job with its children
    Job { id: u64 },

    /// All farm nodes
    Nodes,

    /// One farm node
    Node { id: u64 },

    /// Capture locations and their system information
    Locations,
}

impl From<SourceCommand> for DataSource {
    fn from(command: SourceCommand) -> Self {
        match command {
            SourceCommand::Jobs {
                limit,
                status,
                search,
            } => DataSource::FarmJobs(FarmJobsFilter {
                limit,
                status,
                search,
            }),
            SourceCommand::Job { id } => DataSource::FarmJob(id),
            SourceCommand::Nodes => DataSource::FarmNodes,
            SourceCommand::Node { id } => DataSource::FarmNode(id),
            SourceCommand::Locations => DataSource::CaptureLocations,
        }
    }
}

#[derive(Subcommand, Clone)]
pub enum JobAction {
    /// Terminate a running job
    Kill { id: u64 },

    /// Delete a finished job
    Delete { id: u64 },

    /// Run a job again
    Restart {
        id: u64,

        /// Submit a copy instead of resetting the original
        #[arg(long)]
        clone: bool,

        /// Run on the node that ran it before
        #[arg(long)]
        same_machine: bool,
    },

    /// Set a job's scheduling priority
    Priority { id: u64, value: i32 },
}
