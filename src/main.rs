use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use failover_harness::file_io::open_file_for_append;
use failover_harness::HarnessConfig;
use failover_harness::ProcessLauncher;
use failover_harness::Result;
use failover_harness::ScenarioDriver;
use failover_harness::ScenarioMode;
use failover_harness::StorageClient;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[derive(Parser, Debug)]
#[command(name = "failover-harness")]
#[command(about = "Kill the leader of a server cluster again and again and check every election")]
struct Cli {
    /// Configuration file (TOML); `CONFIG_PATH` is used when absent
    #[arg(long)]
    config: Option<String>,

    /// Number of server instances
    #[arg(long)]
    instances: Option<u32>,

    /// Number of leader kills
    #[arg(long)]
    switch_overs: Option<usize>,

    /// Where HTTP verification goes: the elected leader, or a fronting gateway
    #[arg(long)]
    mode: Option<ScenarioMode>,

    /// Allowance for the first election (seconds)
    #[arg(long)]
    startup_secs: Option<u64>,

    /// Allowance for each replacement election (seconds)
    #[arg(long)]
    recovery_secs: Option<u64>,

    /// Also write harness logs to `<dir>/harness.log`
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Only check that the stored value survived, through the gateway
    #[arg(long)]
    verify_only: bool,
}

impl Cli {
    fn apply(
        &self,
        config: &mut HarnessConfig,
    ) {
        if let Some(instances) = self.instances {
            config.cluster.instance_count = instances;
        }
        if let Some(count) = self.switch_overs {
            config.scenario.switch_over_count = count;
        }
        if let Some(mode) = self.mode {
            config.scenario.mode = mode;
        }
        if let Some(secs) = self.startup_secs {
            config.timing.startup_secs = secs;
        }
        if let Some(secs) = self.recovery_secs {
            config.timing.recovery_secs = secs;
        }
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initializing Logs
    let _guard = match init_observability(cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialise logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = tokio::select! {
        outcome = run(&cli) => outcome,
        signal = shutdown_signal() => {
            warn!("{} received; stopping instances", signal);
            return ExitCode::from(130);
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("failover run failed: {}", e);
            if e.is_consistency_violation() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let mut config = HarnessConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    if cli.verify_only {
        return verify_only(&config).await;
    }

    let launcher = ProcessLauncher::new(config.launcher.clone());
    let report = ScenarioDriver::from_config(&config, launcher)?.run().await?;
    info!("failover run passed: {}", report);
    Ok(())
}

/// Read back the value a previous run stored, without managing any instance.
async fn verify_only(config: &HarnessConfig) -> Result<()> {
    let Some(base) = config.scenario.gateway_url.as_deref() else {
        return Err(failover_harness::Error::InvalidConfig(
            "--verify-only requires scenario.gateway_url".into(),
        ));
    };
    let scenario = &config.scenario;
    let client = StorageClient::new(&config.http, config.retry.http)?;

    client.check_liveness(base).await?;
    client.authenticate(base, &scenario.username, &scenario.password).await?;
    client.verify_persisted(base, &scenario.key, &scenario.value).await?;
    info!("{} still serves {}={}", base, scenario.key, scenario.value);
    Ok(())
}

/// Resolves with the name of the first termination signal.
///
/// Dropping the scenario future on return stops every instance it launched.
async fn shutdown_signal() -> &'static str {
    let (Ok(mut sigint), Ok(mut sigterm)) = (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) else {
        warn!("signal handlers unavailable; falling back to Ctrl+C only");
        let _ = tokio::signal::ctrl_c().await;
        return "Ctrl+C";
    };
    tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    }
}

pub fn init_observability(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let stdout_layer = tracing_subscriber::fmt::layer().with_filter(env_filter());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let log_file = open_file_for_append(&dir.join("harness.log"))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_filter(env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(stdout_layer).with(file_layer).init();
    Ok(guard)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
