use std::time::Duration;

use crate::SourceId;

/// Per-provider request budget: attempts, per-attempt timeout and rate quota.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub source: SourceId,
    pub max_attempts: u32,
    pub timeout: Duration,
    pub quota_window: Duration,
    pub quota_limit: u32,
}

impl ProviderPolicy {
    pub fn weather_default() -> Self {
        Self {
            source: SourceId::Weather,
            max_attempts: 3,
            timeout: Duration::from_secs(10),
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
        }
    }

    /// Shared by the geocoding and pollutant endpoints.
    pub fn air_quality_default() -> Self {
        Self {
            source: SourceId::AirQuality,
            max_attempts: 3,
            timeout: Duration::from_secs(10),
            quota_window: Duration::from_secs(60),
            quota_limit: 600,
        }
    }

    pub fn traffic_flow_default() -> Self {
        Self {
            source: SourceId::TrafficFlow,
            max_attempts: 2,
            timeout: Duration::from_secs(8),
            quota_window: Duration::from_secs(1),
            quota_limit: 5,
        }
    }

    pub fn traffic_incidents_default() -> Self {
        Self {
            source: SourceId::TrafficIncidents,
            ..Self::traffic_flow_default()
        }
    }

    /// Energy endpoints reject most clients, so a single short attempt.
    pub fn energy_default() -> Self {
        Self {
            source: SourceId::Energy,
            max_attempts: 1,
            timeout: Duration::from_secs(3),
            quota_window: Duration::from_secs(60),
            quota_limit: 30,
        }
    }

    pub fn default_for(source: SourceId) -> Option<Self> {
        match source {
            SourceId::Weather => Some(Self::weather_default()),
            SourceId::AirQuality => Some(Self::air_quality_default()),
            SourceId::TrafficFlow => Some(Self::traffic_flow_default()),
            SourceId::TrafficIncidents => Some(Self::traffic_incidents_default()),
            SourceId::Energy => Some(Self::energy_default()),
            SourceId::Waste => None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}
