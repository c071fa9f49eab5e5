use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dashboard_sync::{
    config::Config,
    console::{ConsoleDashboard, ReportFilter},
    notifier::{Permission, TracingNotifier},
    remote::SnapshotFileSource,
    store::{FileStore, KeyValueStore, ReportSlot},
    DashboardSync,
};
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "dashboard-sync")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch the report slot and notify about new reports until Ctrl-C
    Run,
    /// Append simulated mobile-app reports to the slot
    Simulate {
        /// Number of reports to append
        #[arg(long, default_value = "1")]
        count: usize,
        /// Use the fixed test report instead of the template catalog
        #[arg(long)]
        basic: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboard_sync=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let cfg = Config::from_env()?;
    tracing::info!(
        "dashboard-sync starting; key={}, data_dir={}, poll={:?}, sync={:?}, variant={:?}",
        cfg.sync_key,
        cfg.data_dir.display(),
        cfg.poll_interval,
        cfg.sync_interval,
        cfg.variant
    );

    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&cfg.data_dir)
            .with_context(|| format!("opening data dir {}", cfg.data_dir.display()))?,
    );

    match args.command {
        Command::Run => serve(cfg, store).await,
        Command::Simulate { count, basic } => simulate(cfg, store, count, basic),
    }
}

async fn serve(cfg: Config, store: Arc<dyn KeyValueStore>) -> Result<()> {
    let dashboard = Arc::new(ConsoleDashboard::new(
        ReportSlot::new(Arc::clone(&store), cfg.sync_key.clone()),
        ReportFilter {
            priority: cfg.priority_filter.clone(),
            category: cfg.category_filter.clone(),
        },
    ));
    dashboard.load_reports_from_storage();
    dashboard.update_stats();

    let mut builder = DashboardSync::builder(cfg.clone(), store).hooks(dashboard.hooks());
    if let Some(permission) = cfg.notification_permission {
        let mut platform = TracingNotifier::new(permission);
        if cfg.notification_prompt_answer == Permission::Denied {
            platform = platform.deny_on_request();
        }
        builder = builder.platform_notifier(Arc::new(platform));
    }
    if let Some(path) = &cfg.remote_snapshot_path {
        tracing::info!("reconciling with snapshot {}", path.display());
        builder = builder.remote(Arc::new(SnapshotFileSource::new(path)));
    }
    let sync = Arc::new(builder.build());

    let handle = sync.initialize()?;
    sync.request_notification_permission();
    tracing::info!("Dashboard sync integration loaded");

    signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    tracing::info!("Shutdown signal received");
    handle.stop().await;
    Ok(())
}

fn simulate(cfg: Config, store: Arc<dyn KeyValueStore>, count: usize, basic: bool) -> Result<()> {
    let sync = DashboardSync::builder(cfg, store).build();
    for _ in 0..count {
        let report = if basic {
            sync.simulate_mobile_report()?
        } else {
            sync.simulate_varied_mobile_report()?
        };
        println!("{}  [{}/{}]  {}", report.id, report.priority, report.category, report.title);
    }
    Ok(())
}
