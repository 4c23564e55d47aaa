//! Docker implementation of [`ContainerRuntime`] using bollard.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{
    InspectContainerOptions, InspectContainerOptionsBuilder, ListContainersOptions,
    ListContainersOptionsBuilder,
};

use crate::health::{CoarseState, HealthStatus, Inspection};
use crate::runtime::{ContainerRuntime, ContainerSummary, MONITOR_LABEL, RuntimeError};

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using the default connection method (Unix socket on
    /// Linux/macOS, named pipe on Windows, `DOCKER_HOST` when set).
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(
        &self,
        filter_by_label: bool,
        include_stopped: bool,
    ) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let mut builder = ListContainersOptionsBuilder::new().all(include_stopped);
        if filter_by_label {
            let filters: HashMap<String, Vec<String>> = HashMap::from([(
                "label".to_string(),
                vec![format!("{MONITOR_LABEL}=true")],
            )]);
            builder = builder.filters(&filters);
        }
        let options: ListContainersOptions = builder.build();

        let containers = self.docker.list_containers(Some(options)).await?;

        let summaries = containers
            .into_iter()
            .filter_map(|container| {
                let Some(id) = container.id else {
                    log::warn!("Skipping container without id: {:?}", container.names);
                    return None;
                };
                let state = container
                    .state
                    .map(|s| CoarseState::from(s.to_string().as_str()))
                    .unwrap_or(CoarseState::Unknown);
                Some(ContainerSummary {
                    id,
                    names: container.names.unwrap_or_default(),
                    state,
                })
            })
            .collect();

        Ok(summaries)
    }

    async fn inspect(&self, id: &str) -> Result<Inspection, RuntimeError> {
        let options: InspectContainerOptions = InspectContainerOptionsBuilder::new().build();

        let info = self.docker.inspect_container(id, Some(options)).await?;

        let Some(state) = info.state else {
            return Ok(Inspection::default());
        };
        let health = state
            .health
            .and_then(|health| health.status)
            .map(HealthStatus::from);

        Ok(Inspection {
            health,
            exit_code: state.exit_code,
        })
    }
}
