//! Health status values.

use serde::{Deserialize, Serialize};

/// Health of one upstream or of the gateway as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(self) -> bool {
        self == HealthStatus::Healthy
    }

    /// Healthy only if every status is healthy.
    pub fn all<I: IntoIterator<Item = HealthStatus>>(statuses: I) -> Self {
        if statuses.into_iter().all(HealthStatus::is_healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}
