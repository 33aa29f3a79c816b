use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical identifiers for the independent sources that feed a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Weather,
    AirQuality,
    TrafficFlow,
    TrafficIncidents,
    Energy,
    Waste,
}

impl SourceId {
    pub const ALL: [Self; 6] = [
        Self::Weather,
        Self::AirQuality,
        Self::TrafficFlow,
        Self::TrafficIncidents,
        Self::Energy,
        Self::Waste,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::AirQuality => "air_quality",
            Self::TrafficFlow => "traffic_flow",
            Self::TrafficIncidents => "traffic_incidents",
            Self::Energy => "energy",
            Self::Waste => "waste",
        }
    }

    /// Only the weather source aborts an aggregation when it fails.
    pub const fn is_mandatory(self) -> bool {
        matches!(self, Self::Weather)
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weather" => Ok(Self::Weather),
            "air_quality" | "airquality" | "aqi" => Ok(Self::AirQuality),
            "traffic_flow" | "traffic" => Ok(Self::TrafficFlow),
            "traffic_incidents" | "incidents" => Ok(Self::TrafficIncidents),
            "energy" => Ok(Self::Energy),
            "waste" => Ok(Self::Waste),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
