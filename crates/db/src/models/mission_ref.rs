use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;
use uuid::Uuid;

use super::mission::CURRICULUM_DAYS;

/// Prefixes that encode a day number directly. Longer prefixes come first so
/// `day-fallback-7` is not read as `day-` followed by `fallback-7`.
const VIRTUAL_PREFIXES: [&str; 3] = ["day-fallback-", "emergency-", "day-"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized mission reference: {0}")]
pub struct MissionRefError(pub String);

/// Address of a mission: the persisted catalog row, or a virtual reference that
/// carries the day number itself when no row exists (yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MissionRef {
    Persisted(Uuid),
    Virtual(i32),
}

impl MissionRef {
    /// Parses either addressing scheme. Returns `None` for anything else,
    /// including virtual days outside the curriculum.
    pub fn parse(raw: &str) -> Option<MissionRef> {
        let raw = raw.trim();
        if let Ok(id) = Uuid::parse_str(raw) {
            return Some(MissionRef::Persisted(id));
        }

        VIRTUAL_PREFIXES
            .iter()
            .find_map(|prefix| raw.strip_prefix(prefix))
            .and_then(|day| day.parse::<i32>().ok())
            .filter(|day| (1..=CURRICULUM_DAYS).contains(day))
            .map(MissionRef::Virtual)
    }

    pub fn persisted_id(&self) -> Option<Uuid> {
        match self {
            MissionRef::Persisted(id) => Some(*id),
            MissionRef::Virtual(_) => None,
        }
    }

    pub fn virtual_day(&self) -> Option<i32> {
        match self {
            MissionRef::Persisted(_) => None,
            MissionRef::Virtual(day) => Some(*day),
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, MissionRef::Virtual(_))
    }
}

impl fmt::Display for MissionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionRef::Persisted(id) => write!(f, "{}", id.hyphenated()),
            MissionRef::Virtual(day) => write!(f, "day-{day}"),
        }
    }
}

impl FromStr for MissionRef {
    type Err = MissionRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MissionRef::parse(s).ok_or_else(|| MissionRefError(s.to_string()))
    }
}

impl Serialize for MissionRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MissionRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
