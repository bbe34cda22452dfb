use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ProfileError;

/// The environments a monitor can run in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileName {
    Production,
    Development,
    Experimental,
}

impl ProfileName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileName::Production => "production",
            ProfileName::Development => "development",
            ProfileName::Experimental => "experimental",
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileName {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(ProfileName::Production),
            "development" => Ok(ProfileName::Development),
            "experimental" => Ok(ProfileName::Experimental),
            _ => Err(ProfileError::Unknown(s.to_string())),
        }
    }
}

/// Behaviour switches carried by a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Detailed health check output
    DebugMode,

    /// Crate-level debug logging
    VerboseLogging,

    /// Predictive forecasting on a secondary timer
    AiEnabled,
}

/// How far ahead to forecast, and how often
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictiveWindow {
    pub horizon: Duration,
    pub interval: Duration,
}

/// Resolved, immutable configuration for one run of the sampler
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    name: ProfileName,
    interval: Duration,
    alert_threshold: f64,
    flags: BTreeSet<Capability>,
    predictive_window: Option<PredictiveWindow>,
}

impl Profile {
    /// Resolve an environment name into its profile
    pub fn resolve(name: &str) -> Result<Profile, ProfileError> {
        let profile = Profile::for_name(name.parse()?);
        trace!("resolved profile: {profile:?}");
        Ok(profile)
    }

    pub fn for_name(name: ProfileName) -> Profile {
        match name {
            ProfileName::Production => Profile {
                name,
                interval: Duration::from_secs(60),
                alert_threshold: 80.0,
                flags: BTreeSet::new(),
                predictive_window: None,
            },
            ProfileName::Development => Profile {
                name,
                interval: Duration::from_secs(5),
                alert_threshold: 90.0,
                flags: BTreeSet::from([Capability::DebugMode, Capability::VerboseLogging]),
                predictive_window: None,
            },
            ProfileName::Experimental => Profile {
                name,
                interval: Duration::from_secs(30),
                alert_threshold: 75.0,
                flags: BTreeSet::from([Capability::AiEnabled]),
                predictive_window: Some(PredictiveWindow {
                    horizon: Duration::from_secs(300),
                    interval: Duration::from_secs(30),
                }),
            },
        }
    }

    /// Same profile with a different sampling interval
    ///
    /// A zero interval is ignored, since a timer cannot fire on it.
    pub fn with_interval(mut self, interval: Duration) -> Profile {
        if !interval.is_zero() {
            self.interval = interval;
        }
        self
    }

    /// Same profile with a different forecasting cadence and horizon
    pub fn with_predictive_window(mut self, window: PredictiveWindow) -> Profile {
        if !window.interval.is_zero() {
            self.predictive_window = Some(window);
        }
        self
    }

    pub fn name(&self) -> ProfileName {
        self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn alert_threshold(&self) -> f64 {
        self.alert_threshold
    }

    pub fn flags(&self) -> &BTreeSet<Capability> {
        &self.flags
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.flags.contains(&capability)
    }

    /// The forecasting window, if the profile enables forecasting at all
    pub fn predictive_window(&self) -> Option<PredictiveWindow> {
        self.predictive_window
            .filter(|_| self.has(Capability::AiEnabled))
    }
}
