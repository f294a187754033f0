//! Serde helpers shared by the configuration domains
//!
//! Durations are written as seconds. Whole seconds stay integers (`30`);
//! sub-second values use a fraction (`0.5`), which short token lifetimes need.

use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Convert a non-negative, finite number of seconds
pub(crate) fn duration_from_secs(seconds: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(seconds).ok()
}

fn serialize_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if duration.subsec_nanos() == 0 {
        serializer.serialize_u64(duration.as_secs())
    } else {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = f64::deserialize(deserializer)?;
    duration_from_secs(seconds)
        .ok_or_else(|| D::Error::custom(format!("invalid duration of {} seconds", seconds)))
}

/// Serde helper module for Duration serialization as seconds
pub mod serde_duration {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_secs(duration, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_secs(deserializer)
    }
}

/// Serde helper module for optional Duration serialization
pub mod serde_duration_option {
    use super::*;

    #[derive(Deserialize)]
    struct Seconds(#[serde(deserialize_with = "deserialize_secs")] Duration);

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serialize_secs(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds: Option<Seconds> = Option::deserialize(deserializer)?;
        Ok(seconds.map(|Seconds(duration)| duration))
    }
}

pub fn default_false() -> bool {
    false
}
