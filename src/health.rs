use bollard::models::HealthStatusEnum;

/// Top-level lifecycle state of a container as reported by the runtime,
/// independent of any health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoarseState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown,
}

impl AsRef<str> for CoarseState {
    fn as_ref(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
            Self::Removing => "removing",
            Self::Exited => "exited",
            Self::Dead => "dead",
            Self::Unknown => "unknown",
        }
    }
}

impl From<&str> for CoarseState {
    fn from(state: &str) -> Self {
        match state {
            "created" => Self::Created,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "removing" => Self::Removing,
            "exited" => Self::Exited,
            "dead" => Self::Dead,
            _ => Self::Unknown,
        }
    }
}

/// Result of the container's own health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Starting,
    None,
}

impl AsRef<str> for HealthStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Starting => "starting",
            Self::None => "none",
        }
    }
}

impl From<HealthStatusEnum> for HealthStatus {
    fn from(status: HealthStatusEnum) -> Self {
        match status {
            HealthStatusEnum::HEALTHY => Self::Healthy,
            HealthStatusEnum::UNHEALTHY => Self::Unhealthy,
            HealthStatusEnum::STARTING => Self::Starting,
            HealthStatusEnum::EMPTY | HealthStatusEnum::NONE => Self::None,
        }
    }
}

/// Details only available from a successful container inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inspection {
    /// `None` when the container has no health check configured.
    pub health: Option<HealthStatus>,
    pub exit_code: Option<i64>,
}

/// One container as seen during a single polling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub id: String,
    pub name: String,
    pub state: CoarseState,
    /// `None` when inspecting the container failed.
    pub inspection: Option<Inspection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Policy {
    /// Judge exited containers by their exit code alone.
    pub check_exit_code: bool,
}

/// Decide whether a container counts as healthy for this cycle.
///
/// In exit-code mode an exited container is healthy only when it exited with
/// code 0, and an exited container that could not be inspected is unhealthy.
/// Otherwise the health check decides once it has left its `starting` phase,
/// and everything else falls back to whether the container is running.
pub fn classify(observation: &Observation, policy: &Policy) -> bool {
    let running = observation.state == CoarseState::Running;

    if policy.check_exit_code && observation.state == CoarseState::Exited {
        return match &observation.inspection {
            Some(inspection) => inspection.exit_code == Some(0),
            None => false,
        };
    }

    let Some(inspection) = &observation.inspection else {
        return running;
    };

    match inspection.health {
        None | Some(HealthStatus::None) | Some(HealthStatus::Starting) => running,
        Some(status) => status == HealthStatus::Healthy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(state: CoarseState, inspection: Option<Inspection>) -> Observation {
        Observation {
            id: "0123456789abcdef".to_string(),
            name: "web".to_string(),
            state,
            inspection,
        }
    }

    fn inspected(health: Option<HealthStatus>, exit_code: Option<i64>) -> Option<Inspection> {
        Some(Inspection { health, exit_code })
    }

    const EXIT_CODE_MODE: Policy = Policy {
        check_exit_code: true,
    };

    #[test]
    fn test_running_without_healthcheck_is_healthy() {
        let obs = observation(CoarseState::Running, inspected(None, Some(0)));
        assert!(classify(&obs, &Policy::default()));
    }

    #[test]
    fn test_exited_without_healthcheck_is_unhealthy() {
        let obs = observation(CoarseState::Exited, inspected(None, Some(0)));
        assert!(!classify(&obs, &Policy::default()));
    }

    #[test]
    fn test_health_status_none_falls_back_to_state() {
        let obs = observation(
            CoarseState::Running,
            inspected(Some(HealthStatus::None), None),
        );
        assert!(classify(&obs, &Policy::default()));

        let obs = observation(
            CoarseState::Paused,
            inspected(Some(HealthStatus::None), None),
        );
        assert!(!classify(&obs, &Policy::default()));
    }

    #[test]
    fn test_starting_health_check_is_not_judged_yet() {
        let obs = observation(
            CoarseState::Running,
            inspected(Some(HealthStatus::Starting), None),
        );
        assert!(classify(&obs, &Policy::default()));

        let obs = observation(
            CoarseState::Restarting,
            inspected(Some(HealthStatus::Starting), None),
        );
        assert!(!classify(&obs, &Policy::default()));
    }

    #[test]
    fn test_health_status_is_authoritative() {
        let healthy = observation(
            CoarseState::Running,
            inspected(Some(HealthStatus::Healthy), None),
        );
        let unhealthy = observation(
            CoarseState::Running,
            inspected(Some(HealthStatus::Unhealthy), None),
        );
        assert!(classify(&healthy, &Policy::default()));
        assert!(!classify(&unhealthy, &Policy::default()));
    }

    #[test]
    fn test_inspection_failure_falls_back_to_state() {
        let running = observation(CoarseState::Running, None);
        let exited = observation(CoarseState::Exited, None);
        assert!(classify(&running, &Policy::default()));
        assert!(!classify(&exited, &Policy::default()));
    }

    #[test]
    fn test_exit_code_mode_judges_exit_code() {
        let ok = observation(CoarseState::Exited, inspected(None, Some(0)));
        let failed = observation(CoarseState::Exited, inspected(None, Some(137)));
        assert!(classify(&ok, &EXIT_CODE_MODE));
        assert!(!classify(&failed, &EXIT_CODE_MODE));
    }

    #[test]
    fn test_exit_code_mode_overrides_health_status() {
        let obs = observation(
            CoarseState::Exited,
            inspected(Some(HealthStatus::Unhealthy), Some(0)),
        );
        assert!(classify(&obs, &EXIT_CODE_MODE));
    }

    #[test]
    fn test_exit_code_mode_inspection_failure_is_unhealthy() {
        let exited = observation(CoarseState::Exited, None);
        assert!(!classify(&exited, &EXIT_CODE_MODE));

        // The same failure on a running container keeps the running verdict
        let running = observation(CoarseState::Running, None);
        assert!(classify(&running, &EXIT_CODE_MODE));
    }

    #[test]
    fn test_exit_code_mode_missing_exit_code_is_unhealthy() {
        let obs = observation(CoarseState::Exited, inspected(None, None));
        assert!(!classify(&obs, &EXIT_CODE_MODE));
    }

    #[test]
    fn test_exit_code_mode_ignores_running_containers() {
        let obs = observation(
            CoarseState::Running,
            inspected(Some(HealthStatus::Unhealthy), None),
        );
        assert!(!classify(&obs, &EXIT_CODE_MODE));
    }

    #[test]
    fn test_coarse_state_parsing() {
        assert_eq!(CoarseState::from("running"), CoarseState::Running);
        assert_eq!(CoarseState::from("exited"), CoarseState::Exited);
        assert_eq!(CoarseState::from(""), CoarseState::Unknown);
        assert_eq!(CoarseState::from("bogus"), CoarseState::Unknown);
        for state in [
            CoarseState::Created,
            CoarseState::Running,
            CoarseState::Paused,
            CoarseState::Restarting,
            CoarseState::Removing,
            CoarseState::Exited,
            CoarseState::Dead,
        ] {
            assert_eq!(CoarseState::from(state.as_ref()), state);
        }
    }
}
