//! Bullet - the smallest unit of playbook memory
//!
//! A bullet is one short heuristic with three effectiveness counters. All
//! counter mutation goes through the closed [`TagKind`] mapping; metadata
//! maps never reflect into arbitrary fields.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Counter metadata attached to delta operations: counter name -> amount
pub type CounterMap = BTreeMap<String, i64>;

/// The three recognized effectiveness counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Helpful,
    Harmful,
    Neutral,
}

impl TagKind {
    /// All recognized kinds, in rendering order
    pub const ALL: [TagKind; 3] = [TagKind::Helpful, TagKind::Harmful, TagKind::Neutral];
}

impl std::fmt::Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagKind::Helpful => write!(f, "helpful"),
            TagKind::Harmful => write!(f, "harmful"),
            TagKind::Neutral => write!(f, "neutral"),
        }
    }
}

impl std::str::FromStr for TagKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "helpful" => Ok(TagKind::Helpful),
            "harmful" => Ok(TagKind::Harmful),
            "neutral" => Ok(TagKind::Neutral),
            other => Err(EngineError::UnsupportedTag(other.to_string())),
        }
    }
}

/// A single persisted heuristic with effectiveness counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    /// Unique within the owning playbook; immutable after creation
    pub id: String,
    /// Section this bullet renders under
    pub section: String,
    /// The heuristic text itself
    pub content: String,
    #[serde(default)]
    pub helpful: u32,
    #[serde(default)]
    pub harmful: u32,
    #[serde(default)]
    pub neutral: u32,
    #[serde(alias = "createdAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "updatedAt", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Bullet {
    pub fn new(id: impl Into<String>, section: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            section: section.into(),
            content: content.into(),
            helpful: 0,
            harmful: 0,
            neutral: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Read one counter
    pub fn counter(&self, kind: TagKind) -> u32 {
        match kind {
            TagKind::Helpful => self.helpful,
            TagKind::Harmful => self.harmful,
            TagKind::Neutral => self.neutral,
        }
    }

    fn set_counter(&mut self, kind: TagKind, value: u32) {
        match kind {
            TagKind::Helpful => self.helpful = value,
            TagKind::Harmful => self.harmful = value,
            TagKind::Neutral => self.neutral = value,
        }
    }

    /// Overwrite counters named in `metadata`; unrecognized keys are ignored
    /// and negative values clamp to zero. Does not advance `updated_at` - the
    /// store owns timestamps.
    pub(crate) fn apply_counters(&mut self, metadata: &CounterMap) {
        for (key, value) in metadata {
            if let Ok(kind) = key.parse::<TagKind>() {
                self.set_counter(kind, (*value).max(0) as u32);
            }
        }
    }

    /// Increment one counter and advance `updated_at`
    pub(crate) fn tag(&mut self, kind: TagKind, increment: u32) {
        let current = self.counter(kind);
        self.set_counter(kind, current.saturating_add(increment));
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_kind_from_str() {
        assert_eq!("helpful".parse::<TagKind>().unwrap(), TagKind::Helpful);
        assert_eq!("neutral".parse::<TagKind>().unwrap(), TagKind::Neutral);
        assert!(matches!(
            "speed".parse::<TagKind>(),
            Err(EngineError::UnsupportedTag(name)) if name == "speed"
        ));
    }

    #[test]
    fn test_apply_counters_ignores_unknown_keys() {
        let mut bullet = Bullet::new("s-00001", "strategy", "prefer smaller steps");
        let mut metadata = CounterMap::new();
        metadata.insert("helpful".to_string(), 4);
        metadata.insert("velocity".to_string(), 9);
        metadata.insert("harmful".to_string(), -2);

        bullet.apply_counters(&metadata);
        assert_eq!(bullet.helpful, 4);
        assert_eq!(bullet.harmful, 0);
        assert_eq!(bullet.neutral, 0);
    }

    #[test]
    fn test_tag_saturates_and_touches_timestamp() {
        let mut bullet = Bullet::new("s-00001", "strategy", "x");
        let before = bullet.updated_at;
        bullet.tag(TagKind::Helpful, 3);
        assert_eq!(bullet.helpful, 3);
        assert!(bullet.updated_at >= before);
    }
}
