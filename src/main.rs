use anyhow::Context;
use clap::{Parser, Subcommand};
use learnval::config::{ConfigLoader, TransportKind, ValidationConfig};
use learnval::lookup::ReferenceDataSnapshot;
use learnval::orchestrator::{CancellationFlag, OrchestratorSettings, ValidationOrchestrator};
use learnval::output::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, ValidationOutputService,
};
use learnval::population::JsonFileSubmissionSource;
use learnval::rules::{Profile, RuleCatalogue};
use learnval::worker::{InProcessWorker, SerializedWorker, WorkerDispatch};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, trace};

/// Validate learner record submissions
#[derive(Parser)]
#[command(name = "learnval")]
#[command(about = "Rule-driven validation of learner record submissions", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one submission
    Run {
        /// Submission JSON file
        #[arg(long)]
        submission: PathBuf,

        /// Reference data snapshot JSON file
        #[arg(long)]
        reference: PathBuf,

        /// Job identifier used to key the output artifacts (default: random)
        #[arg(long)]
        job_id: Option<String>,

        /// Path to configuration file (default: ./learnval.toml if present)
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Maximum learners per shard
        #[arg(long)]
        shard_size: Option<usize>,

        /// Maximum shards validated at once
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Rule profile: full or reduced
        #[arg(long)]
        profile: Option<Profile>,

        /// Round-trip every shard through the wire format
        #[arg(long)]
        serialized: bool,

        /// Directory to write artifacts to (default: keep in memory and print)
        #[arg(short = 'o', long)]
        output_dir: Option<PathBuf>,
    },
    /// List the rules in a profile
    Rules {
        #[arg(long, default_value = "full")]
        profile: Profile,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Config is loaded before logging starts so its log level can apply
    let config = match &cli.command {
        Commands::Run { config, .. } => match load_config(config.clone()).await {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        },
        Commands::Rules { .. } => None,
    };

    let log_level = match cli.verbose {
        0 => config
            .as_ref()
            .and_then(|c| c.log_level.clone())
            .unwrap_or_else(|| "info".to_string()),
        1 => "debug".to_string(),
        2 => "trace".to_string(),
        _ => "trace,tokio=debug".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .with_writer(std::io::stderr)
        .init();

    debug!("learnval started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Commands::Run {
            submission,
            reference,
            job_id,
            config: _,
            shard_size,
            max_parallel,
            profile,
            serialized,
            output_dir,
        } => {
            let overrides = CliOverrides {
                shard_size,
                max_parallel,
                profile,
                serialized,
                output_dir,
            };
            let mut config = config.unwrap_or_default();
            overrides.apply(&mut config);
            run_job(submission, reference, job_id, config).await
        }
        Commands::Rules { profile } => list_rules(profile),
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

struct CliOverrides {
    shard_size: Option<usize>,
    max_parallel: Option<usize>,
    profile: Option<Profile>,
    serialized: bool,
    output_dir: Option<PathBuf>,
}

impl CliOverrides {
    fn apply(self, config: &mut ValidationConfig) {
        if let Some(shard_size) = self.shard_size {
            config.shard_size = shard_size;
        }
        if let Some(max_parallel) = self.max_parallel {
            config.max_parallel_workers = max_parallel;
        }
        if let Some(profile) = self.profile {
            config.profile = profile;
        }
        if self.serialized {
            config.transport = TransportKind::Serialized;
        }
        if self.output_dir.is_some() {
            config.output_dir = self.output_dir;
        }
    }
}

async fn load_config(path: Option<PathBuf>) -> anyhow::Result<ValidationConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::discover(&std::env::current_dir()?),
    };
    Ok(loader.load().await?)
}

async fn run_job(
    submission: PathBuf,
    reference: PathBuf,
    job_id: Option<String>,
    config: ValidationConfig,
) -> anyhow::Result<()> {
    let settings = OrchestratorSettings::from_config(&config)?;

    let reference = ReferenceDataSnapshot::from_json_file(&reference)
        .await
        .with_context(|| format!("loading reference data from {}", reference.display()))?;
    let catalogue = Arc::new(RuleCatalogue::standard()?);

    let dispatcher: Arc<dyn WorkerDispatch> = match config.transport {
        TransportKind::InProcess => Arc::new(InProcessWorker::new(catalogue.clone())),
        TransportKind::Serialized => Arc::new(SerializedWorker::new(catalogue.clone())),
    };
    let memory_store = Arc::new(MemoryKeyValueStore::new());
    let store: Arc<dyn KeyValueStore> = match &config.output_dir {
        Some(dir) => Arc::new(FileKeyValueStore::new(dir)),
        None => memory_store.clone(),
    };

    let orchestrator = ValidationOrchestrator::new(
        settings,
        catalogue,
        Arc::new(reference),
        dispatcher,
        ValidationOutputService::new(store),
    );

    let cancel = CancellationFlag::new();
    let ctrl_c_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; cancelling at the next phase boundary");
            ctrl_c_flag.cancel();
        }
    });

    let job_id = job_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let source = JsonFileSubmissionSource::new(submission);
    let outcome = orchestrator.run_job(&job_id, &source, &cancel).await?;

    if let Some(dir) = &config.output_dir {
        info!(job_id = %job_id, dir = %dir.display(), "Artifacts written");
    } else {
        for key in memory_store.keys().await {
            if let Some(value) = memory_store.get(&key).await? {
                println!("{key}: {value}");
            }
        }
    }
    println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
    Ok(())
}

fn list_rules(profile: Profile) -> anyhow::Result<()> {
    let catalogue = RuleCatalogue::standard()?;
    let messages = catalogue.messages(&Default::default());

    let header = catalogue.header.rule_set(profile).unwrap_or_default();
    let learner = catalogue.learner.rule_set(profile).unwrap_or_default();
    println!("Profile {profile}: {} rules", header.len() + learner.len());
    for (subject, names) in [("header", header), ("learner", learner)] {
        for name in names {
            let severity = messages
                .severity_for(name)
                .map(|s| s.code())
                .unwrap_or("-");
            let message = messages.message_for(name).unwrap_or_default();
            println!("  {subject:<8} {name:<20} {severity}  {message}");
        }
    }
    Ok(())
}
