use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::health::{CoarseState, Inspection};

pub mod docker;

/// Label a container must carry (set to `true`) when label filtering is on.
pub const MONITOR_LABEL: &str = "containermon.enable";

const SHORT_ID_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Docker API error: {0}")]
    DockerApi(#[from] bollard::errors::Error),
    #[error("Runtime call '{0}' timed out after {1:?}")]
    Timeout(&'static str, Duration),
}

/// A container as returned by the runtime's listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    pub state: CoarseState,
}

impl ContainerSummary {
    /// First reported name without the leading `/`, or the short id when the
    /// runtime reported no name at all.
    pub fn display_name(&self) -> &str {
        match self.names.first() {
            Some(name) => name.strip_prefix('/').unwrap_or(name),
            None => self.id.get(..SHORT_ID_LEN).unwrap_or(&self.id),
        }
    }
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List containers, optionally restricted to those labelled with
    /// [`MONITOR_LABEL`] and optionally including stopped ones.
    async fn list_containers(
        &self,
        filter_by_label: bool,
        include_stopped: bool,
    ) -> Result<Vec<ContainerSummary>, RuntimeError>;

    async fn inspect(&self, id: &str) -> Result<Inspection, RuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, names: &[&str]) -> ContainerSummary {
        ContainerSummary {
            id: id.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
            state: CoarseState::Running,
        }
    }

    #[test]
    fn test_display_name_strips_slash() {
        assert_eq!(summary("abc", &["/web"]).display_name(), "web");
        assert_eq!(summary("abc", &["web"]).display_name(), "web");
    }

    #[test]
    fn test_display_name_uses_first_name() {
        assert_eq!(summary("abc", &["/db", "/web/db"]).display_name(), "db");
    }

    #[test]
    fn test_display_name_falls_back_to_short_id() {
        let long = "4f66ad9a0b2e0c1f9e2a6b1d8c3f5a7e";
        assert_eq!(summary(long, &[]).display_name(), "4f66ad9a0b2e");
        assert_eq!(summary("abc", &[]).display_name(), "abc");
    }
}
