use clap::Parser;
use pkg_controllers::sleepschedule::SleepScheduleController;
use pkg_controllers::workloadscaler::WorkloadScalerController;
use pkg_state::client::StateStore;
use pkg_types::config::{SleeperConfigFile, load_config_file};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sleeperd", about = "sleep schedule controller daemon")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = "/etc/sleeper/config.yaml")]
    config: String,

    /// Directory for SlateDB state storage
    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let file_cfg: SleeperConfigFile = load_config_file(&cli.config)?;
    info!("Config file: {}", cli.config);

    // Merge: CLI args > config file > defaults
    let data_dir = cli
        .data_dir
        .or(file_cfg.data_dir)
        .unwrap_or_else(|| "/tmp/sleeper-data".to_string());

    info!("Starting sleeperd");
    info!("  Data dir: {}", data_dir);

    let store = StateStore::new(&data_dir).await?;

    let schedule_handle = SleepScheduleController::new(store.clone()).start();
    let scaler_handle = WorkloadScalerController::new(store.clone()).start();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    schedule_handle.abort();
    scaler_handle.abort();
    store.close().await?;

    Ok(())
}
