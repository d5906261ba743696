use anyhow::{bail, Context, Result};
use cdsflow::config::PipelineConfig;
use cdsflow::events::LoggingEventSink;
use cdsflow::pipeline::{prepare_module, ModuleBuilder, OrchestratorBuilder, PrebuiltJar};
use cdsflow::stages::join_args;
use cdsflow::testing::{PlaceholderJar, ScriptedLauncher};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{debug, error, info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "cdsflow", version, about = "Build and validate class-data-sharing archives")]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run every stage
    Run(RunArgs),
    /// Print the steps that would be launched
    Plan(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Working directory for artifacts
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Java launcher to invoke
    #[arg(long)]
    java: Option<PathBuf>,

    /// Prebuilt module jar
    #[arg(long)]
    jar: Option<PathBuf>,

    /// Per-process timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Simulate the runtime instead of launching it
    #[arg(long)]
    simulate: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);
    debug!("cdsflow v{} starting", cdsflow::VERSION);

    let outcome = match args.command {
        Commands::Run(ref run_args) => handle_run(run_args).await,
        Commands::Plan(ref config_args) => handle_plan(config_args),
    };

    match outcome {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{e:#}");
            process::exit(2);
        }
    }
}

fn init_logging_from_args(args: &CliArgs) {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let level = if args.verbose {
            Level::DEBUG
        } else if args.quiet {
            Level::ERROR
        } else {
            Level::INFO
        };

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("cdsflow={level}")));

        let registry = tracing_subscriber::registry().with(filter);
        if args.log_json {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        } else {
            registry
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .init();
        }
    });
}

fn load_config(args: &ConfigArgs) -> Result<PipelineConfig> {
    let mut config = match args.config {
        Some(ref path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::new(),
    };

    if let Some(ref dir) = args.work_dir {
        config.work_dir.clone_from(dir);
    }
    if let Some(ref java) = args.java {
        config.java_launcher.clone_from(java);
    }
    if let Some(ref jar) = args.jar {
        config.module_jar = Some(jar.clone());
    }
    if let Some(secs) = args.timeout {
        config.stage_timeout_secs = secs;
    }

    config.validate().context("invalid configuration")?;
    debug!(?config, "Configuration loaded");
    Ok(config)
}

async fn handle_run(args: &RunArgs) -> Result<i32> {
    let config = load_config(&args.config)?;
    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("creating {}", config.work_dir.display()))?;

    let builder: Box<dyn ModuleBuilder> = match (config.module_jar.as_ref(), args.simulate) {
        (Some(jar), _) => Box::new(PrebuiltJar::new(jar)),
        (None, true) => Box::new(PlaceholderJar),
        (None, false) => bail!("no module jar configured; pass --jar or set module_jar"),
    };
    let module = prepare_module(builder.as_ref(), &config).context("preparing module")?;
    info!(jar = %module.jar_path().display(), "Module ready");

    let mut builder = OrchestratorBuilder::from_config(&config, module.clone())
        .with_event_sink(Arc::new(LoggingEventSink::debug()));
    if args.simulate {
        builder = builder.with_launcher(Arc::new(ScriptedLauncher::new(module)));
    }
    let mut orchestrator = builder.build().context("building pipeline")?;

    let result = orchestrator.run().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.to_dict())?);
    } else {
        for report in &result.stages {
            println!(
                "[{}] {:<26} {} step(s), {} ms",
                report.stage.index(),
                report.stage.name(),
                report.steps.len(),
                report.duration_ms
            );
        }
        println!("{}", result.final_state());
    }

    match result.failure() {
        Some(failure) => {
            error!("{failure}");
            Ok(1)
        }
        None => Ok(0),
    }
}

fn handle_plan(args: &ConfigArgs) -> Result<i32> {
    let config = load_config(args)?;
    let declared = config.module_descriptor();
    let module = declared.relocated(
        config
            .escaped_dir()
            .join(format!("{}.jar", declared.name())),
    );

    let orchestrator = OrchestratorBuilder::from_config(&config, module)
        .build()
        .context("building pipeline")?;

    let prefix: Vec<String> = std::iter::once(config.java_launcher.display().to_string())
        .chain(config.vm_options.iter().cloned())
        .collect();
    for step in orchestrator.plan() {
        println!("{step}\n    {}", join_args(prefix.iter().chain(&step.args)));
    }
    Ok(0)
}
