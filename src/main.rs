use std::process::ExitCode;
use std::sync::Arc;

use config::MonitorConfig;
use monitor::{Monitor, MonitorSettings};
use notify::{Dispatcher, HttpTransport, Targets};
use runtime::docker::DockerRuntime;
use scheduler::CronWatcher;

mod cli;
mod config;
mod health;
mod monitor;
mod notify;
mod runtime;
mod scheduler;
mod signals;

#[tokio::main]
async fn main() -> ExitCode {
    // Values from a local .env behave like regular environment variables
    let _ = dotenv::dotenv();

    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting up Container-Mon");

    let config = MonitorConfig::init();
    config.log_summary();

    let schedule = match scheduler::parse_schedule(&config.cron_schedule) {
        Ok(schedule) => schedule,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match DockerRuntime::connect() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Error getting Docker client, exiting: {e}");
            return ExitCode::FAILURE;
        }
    };

    let transport = match HttpTransport::new() {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            log::error!("Unable to build notification client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let dispatcher = Dispatcher::new(
        transport,
        Targets {
            failure: config.notification_url.clone(),
            recovery: config.healthy_notification_url.clone(),
        },
        config.message_prefix.clone(),
    );
    let mut monitor = Monitor::new(runtime, dispatcher, MonitorSettings::from(&config));

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel(1);
    if let Err(e) = signals::handle_shutdown(shutdown_tx) {
        log::error!("Unable to register signal handlers: {e}");
        return ExitCode::FAILURE;
    }

    let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]);

    let mut watcher = CronWatcher::new(&schedule);
    tokio::select! {
        _ = watcher.run(&mut monitor) => {}
        _ = shutdown_rx.recv() => {}
    }

    log::info!("Container-Mon stopped");
    ExitCode::SUCCESS
}
