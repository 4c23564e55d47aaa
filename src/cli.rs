use std::sync::OnceLock;

use clap::Parser;

use crate::config::parse_bool;

/// Watches container health and sends notifications when containers fail.
///
/// Every option can also be set through its `CONTAINERMON_*` environment
/// variable; flags take precedence.
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Number of consecutive 'unhealthy' checks before notification
    #[arg(long, allow_negative_numbers = true)]
    pub fail_limit: Option<i64>,

    /// Cron schedule for healthchecks
    #[arg(long)]
    pub cron: Option<String>,

    /// Notification URL(s), separated by '|'
    #[arg(long)]
    pub notification_url: Option<String>,

    /// Notification URL(s) for the healthy state
    #[arg(long)]
    pub healthy_notification_url: Option<String>,

    /// Monitor only containers with the containermon.enable=true label
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = parse_bool_arg)]
    pub use_labels: Option<bool>,

    /// Notify when an unhealthy container returns to healthy
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = parse_bool_arg)]
    pub notify_healthy: Option<bool>,

    /// Consider stopped containers as unhealthy
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = parse_bool_arg)]
    pub check_stopped: Option<bool>,

    /// Custom prefix for notification messages
    #[arg(long, allow_hyphen_values = true)]
    pub message_prefix: Option<String>,

    /// Only exited containers with a non-zero exit code are unhealthy
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", value_parser = parse_bool_arg)]
    pub check_exit_code: Option<bool>,
}

fn parse_bool_arg(value: &str) -> Result<bool, String> {
    parse_bool(value).ok_or_else(|| format!("invalid boolean value '{value}'"))
}

static ARGS: OnceLock<Args> = OnceLock::new();

pub fn get_cli_args() -> &'static Args {
    ARGS.get_or_init(Args::parse)
}
