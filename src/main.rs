use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use pipeline_poller::core::settings::Settings;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

use cli::{JobAction, SourceCommand};

#[derive(Parser)]
#[command(name = "pipeline-poller")]
#[command(author, version, about = "Poll and drive the capture pipeline REST API")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a data source and print every delivery
    Watch {
        /// Delay between the end of one fetch and the start of the next
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Output as JSON lines
        #[arg(long)]
        json: bool,

        /// Stop after this many deliveries
        #[arg(long)]
        count: Option<usize>,

        #[command(subcommand)]
        source: SourceCommand,
    },

    /// Fetch a data source once
    Fetch {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        #[command(subcommand)]
        source: SourceCommand,
    },

    /// Change a farm job
    Job {
        #[command(subcommand)]
        action: JobAction,
    },

    /// Start or stop recording on a camera
    ToggleCapturing {
        camera_id: u64,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    settings.validate()?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = load_settings(cli.config.as_ref())?;
    init_logging(settings.debug);

    match cli.command {
        Commands::Watch {
            interval_ms,
            json,
            count,
            source,
        } => cli::watch::run(&settings, source.into(), interval_ms, json, count).await,
        Commands::Fetch { json, source } => cli::fetch::run(&settings, source.into(), json).await,
        Commands::Job { action } => cli::job::run(&settings, action).await,
        Commands::ToggleCapturing { camera_id } => {
            cli::job::toggle_capturing(&settings, camera_id).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}
