use crate::cli::Args;

pub const ENV_FAIL_LIMIT: &str = "CONTAINERMON_FAIL_LIMIT";
pub const ENV_CRON_SCHEDULE: &str = "CONTAINERMON_CRON";
pub const ENV_NOTIFICATION_URL: &str = "CONTAINERMON_NOTIFICATION_URL";
pub const ENV_HEALTHY_NOTIFICATION_URL: &str = "CONTAINERMON_HEALTHY_NOTIFICATION_URL";
pub const ENV_USE_LABELS: &str = "CONTAINERMON_USE_LABELS";
pub const ENV_NOTIFY_HEALTHY: &str = "CONTAINERMON_NOTIFY_HEALTHY";
pub const ENV_CHECK_STOPPED: &str = "CONTAINERMON_CHECK_STOPPED";
pub const ENV_MESSAGE_PREFIX: &str = "CONTAINERMON_MESSAGE_PREFIX";
pub const ENV_CHECK_EXIT_CODE: &str = "CONTAINERMON_CHECK_EXIT_CODE";

const DEFAULT_FAIL_LIMIT: i64 = 1;
const DEFAULT_CRON_SCHEDULE: &str = "*/5 * * * *";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub fail_limit: i64,
    pub cron_schedule: String,
    pub notification_url: String,
    pub healthy_notification_url: String,
    pub use_labels: bool,
    pub notify_healthy: bool,
    pub check_stopped: bool,
    pub message_prefix: String,
    pub check_exit_code: bool,
}

/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Reads options from a variable lookup, falling back to defaults when a
/// variable is unset or cannot be parsed.
struct EnvSource<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvSource<F> {
    fn int(&self, key: &str, fallback: i64) -> i64 {
        (self.lookup)(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(fallback)
    }

    fn bool(&self, key: &str, fallback: bool) -> bool {
        (self.lookup)(key)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(fallback)
    }

    fn string(&self, key: &str, fallback: &str, trim: bool) -> String {
        match (self.lookup)(key) {
            Some(v) if trim => v.trim().to_string(),
            Some(v) => v,
            None => fallback.to_string(),
        }
    }
}

impl MonitorConfig {
    /// Resolve every option from its flag, then its environment variable,
    /// then the built-in default.
    pub fn resolve(args: &Args, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = EnvSource { lookup };

        let notification_url = args
            .notification_url
            .clone()
            .unwrap_or_else(|| env.string(ENV_NOTIFICATION_URL, "", true));
        let healthy_notification_url = args
            .healthy_notification_url
            .clone()
            .unwrap_or_else(|| env.string(ENV_HEALTHY_NOTIFICATION_URL, "", true));
        let healthy_notification_url = if healthy_notification_url.is_empty() {
            notification_url.clone()
        } else {
            healthy_notification_url
        };

        Self {
            fail_limit: args
                .fail_limit
                .unwrap_or_else(|| env.int(ENV_FAIL_LIMIT, DEFAULT_FAIL_LIMIT)),
            cron_schedule: args
                .cron
                .clone()
                .unwrap_or_else(|| env.string(ENV_CRON_SCHEDULE, DEFAULT_CRON_SCHEDULE, true)),
            notification_url,
            healthy_notification_url,
            use_labels: args
                .use_labels
                .unwrap_or_else(|| env.bool(ENV_USE_LABELS, false)),
            notify_healthy: args
                .notify_healthy
                .unwrap_or_else(|| env.bool(ENV_NOTIFY_HEALTHY, true)),
            check_stopped: args
                .check_stopped
                .unwrap_or_else(|| env.bool(ENV_CHECK_STOPPED, true)),
            message_prefix: args
                .message_prefix
                .clone()
                .unwrap_or_else(|| env.string(ENV_MESSAGE_PREFIX, "", false)),
            check_exit_code: args
                .check_exit_code
                .unwrap_or_else(|| env.bool(ENV_CHECK_EXIT_CODE, false)),
        }
    }

    pub fn init() -> Self {
        Self::resolve(crate::cli::get_cli_args(), |key| std::env::var(key).ok())
    }

    /// Log the effective configuration. Only the service part of notification
    /// URLs is shown since they usually embed credentials.
    pub fn log_summary(&self) {
        log::info!("Using config:");
        log::info!("  - failure limit: {}", self.fail_limit);
        log::info!("  - cron schedule: {}", self.cron_schedule);
        log::info!(
            "  - notification service: {}",
            service_name(&self.notification_url)
        );
        log::info!(
            "  - healthy notification service: {}",
            service_name(&self.healthy_notification_url)
        );
        log::info!("  - use labels: {}", self.use_labels);
        log::info!("  - notify when healthy: {}", self.notify_healthy);
        log::info!("  - check stopped containers: {}", self.check_stopped);
        log::info!("  - message prefix: {}", self.message_prefix);
        log::info!("  - check container exit code: {}", self.check_exit_code);
        if !self.has_failure_target() {
            log::warn!("No notification URL configured, failures will only be logged");
        }
    }

    pub fn has_failure_target(&self) -> bool {
        crate::notify::destinations(&self.notification_url)
            .next()
            .is_some()
    }
}

/// Schemes of every destination in a `|`-separated target.
fn service_name(target: &str) -> String {
    target
        .split(crate::notify::DESTINATION_SEPARATOR)
        .map(|destination| destination.split("://").next().unwrap_or_default().trim())
        .collect::<Vec<_>>()
        .join(", ")
}
