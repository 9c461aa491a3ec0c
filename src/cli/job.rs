use super::JobAction;
use anyhow::{Context, Result};
use pipeline_poller::api::{self, PipelineClient, RestartOptions};
use pipeline_poller::core::settings::Settings;

pub async fn run(settings: &Settings, action: JobAction) -> Result<()> {
    let client = PipelineClient::from_settings(&settings.server)?;

    let message = match action {
        JobAction::Kill { id } => {
            api::kill_job(&client, id)
                .await
                .with_context(|| format!("Could not kill job {id}"))?;
            format!("Job {id} killed")
        }
        JobAction::Delete { id } => {
            api::delete_job(&client, id)
                .await
                .with_context(|| format!("Could not delete job {id}"))?;
            format!("Job {id} deleted")
        }
        JobAction::Restart {
            id,
            clone,
            same_machine,
        } => {
            let options = RestartOptions {
                clone_job: clone,
                use_same_machine: same_machine,
            };
            api::restart_job(&client, id, options)
                .await
                .with_context(|| format!("Could not restart job {id}"))?;
            format!("Job {id} restarted")
        }
        JobAction::Priority { id, value } => {
            api::change_priority(&client, id, value)
                .await
                .with_context(|| format!("Could not change priority of job {id}"))?;
            format!("Job {id} priority set to {value}")
        }
    };

    tracing::info!(%message, "Job updated");
    println!("{message}");
    Ok(())
}

pub async fn toggle_capturing(settings: &Settings, camera_id: u64) -> Result<()> {
    let client = PipelineClient::from_settings(&settings.server)?;
    api::toggle_capturing(&client, camera_id)
        .await
        .with_context(|| format!("Could not toggle capturing on camera {camera_id}"))?;
    println!("Toggled capturing on camera {camera_id}");
    Ok(())
}
