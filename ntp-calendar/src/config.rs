use std::{str::FromStr, sync::Arc};

use serde::{Deserialize, Deserializer};

use crate::{
    calendar::Calendar,
    reference::{FixedReference, ReferenceClock, SystemReference},
    time_types::NtpSeconds,
};

fn deserialize_reference_time<'de, D>(deserializer: D) -> Result<NtpSeconds, D::Error>
where
    D: Deserializer<'de>,
{
    let data: String = Deserialize::deserialize(deserializer)?;
    Calendar::from_str(&data)
        .and_then(|calendar| calendar.to_ntp_seconds())
        .map_err(serde::de::Error::custom)
}

/// Where era resolution takes its notion of "now" from.
#[derive(Deserialize, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ReferenceConfig {
    /// The host's realtime clock.
    #[default]
    System,
    /// A clock stopped at `time`, given as `YYYY-MM-DD HH:MM:SS`.
    Fixed {
        #[serde(deserialize_with = "deserialize_reference_time")]
        time: NtpSeconds,
    },
}

impl ReferenceConfig {
    pub fn to_clock(&self) -> Arc<dyn ReferenceClock> {
        match *self {
            ReferenceConfig::System => Arc::new(SystemReference),
            ReferenceConfig::Fixed { time } => {
                tracing::debug!(time = time.as_secs(), "using fixed reference time");
                Arc::new(FixedReference::new(time))
            }
        }
    }
}
