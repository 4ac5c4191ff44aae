//! Serde helpers for durations in configuration files
//!
//! Optional durations are written as integer milliseconds, with a negative
//! number (or `null`) meaning "disabled".

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serde serialization result type
type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

fn millis_u64(duration: &Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Serialize an `Option<Duration>` as signed milliseconds
///
/// `None` is written as `-1`. Any negative number or `null` reads back as
/// `None`, so a disabled cooler or timer can be written either way.
///
/// ```rust
/// use std::time::Duration;
///
/// use breakwater_common::optional_duration_millis;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Window {
///     #[serde(with = "optional_duration_millis")]
///     cooler: Option<Duration>,
/// }
///
/// let window: Window = serde_json::from_str(r#"{"cooler":-1}"#).unwrap();
/// assert_eq!(window.cooler, None);
/// ```
pub mod optional_duration_millis {
    use super::*;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_i64(i64::try_from(millis_u64(d)).unwrap_or(i64::MAX)),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<i64>::deserialize(deserializer)?;
        Ok(millis.and_then(|ms| u64::try_from(ms).ok()).map(Duration::from_millis))
    }
}
