use std::sync::Arc;

use thiserror::Error;

pub mod transport;

pub use transport::{HttpTransport, Transport};

/// Separates independent destinations within one notification target.
pub const DESTINATION_SEPARATOR: char = '|';

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid notification URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("Unsupported notification service '{0}'")]
    UnsupportedScheme(String),
    #[error("Malformed {0} URL: {1}")]
    Malformed(&'static str, String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Notification service answered with status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Failure,
    Recovery,
}

/// A container crossing the healthy/unhealthy boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub name: String,
    pub kind: TransitionKind,
}

impl Transition {
    pub fn message(&self, prefix: &str) -> String {
        match self.kind {
            TransitionKind::Failure => format!("{prefix}Container {} is not healthy", self.name),
            TransitionKind::Recovery => {
                format!("{prefix}Container {} is back to healthy", self.name)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Targets {
    pub failure: String,
    pub recovery: String,
}

/// Turns transitions into messages and fans them out to every destination of
/// the matching target.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    targets: Targets,
    prefix: String,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, targets: Targets, prefix: String) -> Self {
        Self {
            transport,
            targets,
            prefix,
        }
    }

    /// Returns the number of destinations the message was delivered to.
    pub async fn dispatch(&self, transition: &Transition) -> usize {
        let message = transition.message(&self.prefix);
        let target = match transition.kind {
            TransitionKind::Failure => &self.targets.failure,
            TransitionKind::Recovery => &self.targets.recovery,
        };

        log::info!("{} | {message}", chrono::Local::now().to_rfc3339());

        self.fan_out(target, &message).await
    }

    /// Sends `message` to every destination in `target` in order. A failed
    /// destination is logged and does not stop the remaining ones.
    pub async fn fan_out(&self, target: &str, message: &str) -> usize {
        let mut delivered = 0;
        for destination in destinations(target) {
            match self.transport.send(destination, message).await {
                Ok(()) => delivered += 1,
                Err(e) => log::error!("Error sending notification: {e}"),
            }
        }
        delivered
    }
}

pub(crate) fn destinations(target: &str) -> impl Iterator<Item = &str> {
    target
        .split(DESTINATION_SEPARATOR)
        .map(str::trim)
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every delivery; destinations containing "fail" are rejected.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingTransport {
        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().expect("poisoned").clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .expect("poisoned")
                .push((destination.to_string(), message.to_string()));
            if destination.contains("fail") {
                return Err(NotifyError::UnsupportedScheme(destination.to_string()));
            }
            Ok(())
        }
    }

    fn dispatcher(transport: Arc<RecordingTransport>, failure: &str, recovery: &str) -> Dispatcher {
        Dispatcher::new(
            transport,
            Targets {
                failure: failure.to_string(),
                recovery: recovery.to_string(),
            },
            "[prod] ".to_string(),
        )
    }

    #[test]
    fn test_messages() {
        let failure = Transition {
            name: "web".to_string(),
            kind: TransitionKind::Failure,
        };
        let recovery = Transition {
            name: "web".to_string(),
            kind: TransitionKind::Recovery,
        };
        assert_eq!(failure.message(""), "Container web is not healthy");
        assert_eq!(
            recovery.message("host-1: "),
            "host-1: Container web is back to healthy"
        );
    }

    #[tokio::test]
    async fn test_each_destination_is_attempted() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(transport.clone(), "urlA|urlB", "");

        let delivered = dispatcher.fan_out("urlA|urlB", "hello").await;

        assert_eq!(delivered, 2);
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "urlA");
        assert_eq!(sent[1].0, "urlB");
    }

    #[tokio::test]
    async fn test_failed_destination_does_not_block_others() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(transport.clone(), "", "");

        let delivered = dispatcher.fan_out("fail://a|logger://", "hello").await;

        assert_eq!(delivered, 1);
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_destinations_are_skipped() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(transport.clone(), "", "");

        assert_eq!(dispatcher.fan_out("", "hello").await, 0);
        assert_eq!(dispatcher.fan_out(" | logger:// |", "hello").await, 1);
        assert_eq!(transport.sent(), vec![("logger://".to_string(), "hello".to_string())]);
    }

    #[tokio::test]
    async fn test_transitions_route_to_their_target() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(transport.clone(), "alerts://x", "recovered://y");

        dispatcher
            .dispatch(&Transition {
                name: "db".to_string(),
                kind: TransitionKind::Failure,
            })
            .await;
        dispatcher
            .dispatch(&Transition {
                name: "db".to_string(),
                kind: TransitionKind::Recovery,
            })
            .await;

        assert_eq!(
            transport.sent(),
            vec![
                (
                    "alerts://x".to_string(),
                    "[prod] Container db is not healthy".to_string()
                ),
                (
                    "recovered://y".to_string(),
                    "[prod] Container db is back to healthy".to_string()
                ),
            ]
        );
    }
}
