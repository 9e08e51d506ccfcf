//! Playbook store - bullets grouped into ordered sections
//!
//! Single-writer: the adapter loop is the only mutator. All edits from model
//! output arrive as a [`DeltaBatch`] and are applied best-effort, one
//! operation at a time.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::bullet::{Bullet, CounterMap, TagKind};
use super::delta::{DeltaBatch, DeltaOperation};
use crate::error::EngineError;

/// Aggregate store of bullets plus per-section insertion order.
///
/// Serializes to `{bullets, sections, next_id}`; `dumps`/`loads` round-trip
/// every bullet field, section ordering, and the id counter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Playbook {
    #[serde(default)]
    bullets: BTreeMap<String, Bullet>,
    #[serde(default)]
    sections: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    next_id: u64,
}

/// Summed counter totals across all bullets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagTotals {
    pub helpful: u64,
    pub harmful: u64,
    pub neutral: u64,
}

/// Counts reported by [`Playbook::stats`]
#[derive(Debug, Clone, Serialize)]
pub struct PlaybookStats {
    pub sections: usize,
    pub bullets: usize,
    pub tags: TagTotals,
}

impl Playbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bullet. A supplied id bypasses the counter; if it collides
    /// with an existing bullet the old one is replaced (last write wins).
    pub fn add_bullet(
        &mut self,
        section: &str,
        content: &str,
        bullet_id: Option<String>,
        metadata: &CounterMap,
    ) -> &Bullet {
        let id = bullet_id.unwrap_or_else(|| self.generate_id(section));
        if self.bullets.contains_key(&id) {
            debug!(bullet_id = %id, "replacing existing bullet (supplied id collision)");
            self.remove_bullet(&id);
        }

        let mut bullet = Bullet::new(id.clone(), section, content);
        bullet.apply_counters(metadata);
        self.bullets.insert(id.clone(), bullet);
        self.sections.entry(section.to_string()).or_default().push(id.clone());
        &self.bullets[&id]
    }

    /// Rewrite content and/or overwrite counters. Returns `None` when the
    /// bullet does not exist.
    pub fn update_bullet(
        &mut self,
        bullet_id: &str,
        content: Option<&str>,
        metadata: Option<&CounterMap>,
    ) -> Option<&Bullet> {
        let bullet = self.bullets.get_mut(bullet_id)?;
        if let Some(content) = content {
            bullet.content = content.to_string();
        }
        if let Some(metadata) = metadata {
            bullet.apply_counters(metadata);
        }
        bullet.updated_at = Utc::now();
        Some(bullet)
    }

    /// Increment one effectiveness counter. Fails with `UnsupportedTag` for
    /// any name outside {helpful, harmful, neutral}; returns `Ok(None)` when
    /// the bullet does not exist.
    pub fn tag_bullet(
        &mut self,
        bullet_id: &str,
        tag: &str,
        increment: u32,
    ) -> Result<Option<&Bullet>, EngineError> {
        let kind: TagKind = tag.parse()?;
        match self.bullets.get_mut(bullet_id) {
            Some(bullet) => {
                bullet.tag(kind, increment);
                Ok(Some(bullet))
            }
            None => Ok(None),
        }
    }

    /// Delete a bullet; no-op when absent. Removing the last bullet of a
    /// section drops the section entry.
    pub fn remove_bullet(&mut self, bullet_id: &str) {
        let Some(bullet) = self.bullets.remove(bullet_id) else {
            return;
        };
        if let Some(ids) = self.sections.get_mut(&bullet.section) {
            ids.retain(|id| id != bullet_id);
            if ids.is_empty() {
                self.sections.remove(&bullet.section);
            }
        }
    }

    pub fn get_bullet(&self, bullet_id: &str) -> Option<&Bullet> {
        self.bullets.get(bullet_id)
    }

    /// All bullets, unordered
    pub fn bullets(&self) -> impl Iterator<Item = &Bullet> {
        self.bullets.values()
    }

    pub fn stats(&self) -> PlaybookStats {
        let mut tags = TagTotals::default();
        for bullet in self.bullets.values() {
            tags.helpful += u64::from(bullet.helpful);
            tags.harmful += u64::from(bullet.harmful);
            tags.neutral += u64::from(bullet.neutral);
        }
        PlaybookStats {
            sections: self.sections.len(),
            bullets: self.bullets.len(),
            tags,
        }
    }

    /// Deterministic text rendering: sections in lexicographic order,
    /// bullets in insertion order.
    pub fn as_prompt(&self) -> String {
        let mut parts = Vec::new();
        for (section, ids) in &self.sections {
            parts.push(format!("## {}", section));
            for id in ids {
                let Some(bullet) = self.bullets.get(id) else {
                    continue;
                };
                parts.push(format!(
                    "- [{}] {} (helpful={}, harmful={}, neutral={})",
                    bullet.id, bullet.content, bullet.helpful, bullet.harmful, bullet.neutral
                ));
            }
        }
        parts.join("\n")
    }

    /// Apply a curator batch: strictly in order, each operation independent.
    /// Operations referencing missing bullets are skipped; there is no
    /// rollback across the batch.
    pub fn apply_delta(&mut self, batch: &DeltaBatch) {
        debug!(
            operations = batch.operations.len(),
            reasoning = %batch.reasoning,
            "applying delta batch"
        );
        for operation in &batch.operations {
            self.apply_operation(operation);
        }
    }

    fn apply_operation(&mut self, operation: &DeltaOperation) {
        match operation {
            DeltaOperation::Add {
                section,
                content,
                bullet_id,
                metadata,
            } => {
                self.add_bullet(section, content, bullet_id.clone(), metadata);
            }
            DeltaOperation::Update {
                bullet_id,
                content,
                metadata,
            } => {
                if self
                    .update_bullet(bullet_id, content.as_deref(), Some(metadata))
                    .is_none()
                {
                    debug!(bullet_id = %bullet_id, "UPDATE skipped: bullet not found");
                }
            }
            DeltaOperation::Tag {
                bullet_id,
                metadata,
            } => {
                for (name, amount) in metadata {
                    // Unrecognized counter names in model output are noise,
                    // not a reason to abort the batch.
                    let Ok(kind) = name.parse::<TagKind>() else {
                        debug!(tag = %name, "TAG skipped: unsupported counter name");
                        continue;
                    };
                    let increment = (*amount).max(0) as u32;
                    if let Some(bullet) = self.bullets.get_mut(bullet_id) {
                        bullet.tag(kind, increment);
                    } else {
                        debug!(bullet_id = %bullet_id, "TAG skipped: bullet not found");
                    }
                }
            }
            DeltaOperation::Remove { bullet_id } => self.remove_bullet(bullet_id),
        }
    }

    /// Serialize to a pretty JSON snapshot
    pub fn dumps(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize playbook snapshot")
    }

    /// Load from a JSON snapshot. Anything that is not a JSON object fails
    /// with `MalformedSnapshot` before any state is populated.
    pub fn loads(data: &str) -> Result<Playbook, EngineError> {
        let payload: serde_json::Value = serde_json::from_str(data)
            .map_err(|e| EngineError::MalformedSnapshot(e.to_string()))?;
        if !payload.is_object() {
            return Err(EngineError::MalformedSnapshot(
                "payload is not an object".to_string(),
            ));
        }
        serde_json::from_value(payload).map_err(|e| EngineError::MalformedSnapshot(e.to_string()))
    }

    /// Persist the snapshot to disk
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.dumps()?)
            .with_context(|| format!("Failed to write playbook snapshot to {}", path.display()))?;
        info!(path = %path.display(), bullets = self.bullets.len(), "saved playbook snapshot");
        Ok(())
    }

    /// Load a snapshot from disk
    pub fn load_from(path: &Path) -> Result<Playbook> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read playbook snapshot from {}", path.display()))?;
        let playbook = Playbook::loads(&data)?;
        info!(path = %path.display(), bullets = playbook.bullets.len(), "loaded playbook snapshot");
        Ok(playbook)
    }

    fn generate_id(&mut self, section: &str) -> String {
        self.next_id += 1;
        let prefix = section
            .split_whitespace()
            .next()
            .map(str::to_lowercase)
            .filter(|word| !word.is_empty())
            .unwrap_or_else(|| "sec".to_string());
        format!("{}-{:05}", prefix, self.next_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_use_section_prefix() {
        let mut pb = Playbook::new();
        let id1 = pb
            .add_bullet("Search Strategy", "narrow queries first", None, &CounterMap::new())
            .id
            .clone();
        let id2 = pb
            .add_bullet("", "fallback section", None, &CounterMap::new())
            .id
            .clone();
        assert_eq!(id1, "search-00001");
        assert_eq!(id2, "sec-00002");
    }

    #[test]
    fn test_supplied_id_collision_is_last_write_wins() {
        let mut pb = Playbook::new();
        pb.add_bullet("a", "first", Some("x-1".to_string()), &CounterMap::new());
        pb.add_bullet("b", "second", Some("x-1".to_string()), &CounterMap::new());

        let bullet = pb.get_bullet("x-1").unwrap();
        assert_eq!(bullet.section, "b");
        assert_eq!(bullet.content, "second");
        // Old section entry must not dangle
        assert_eq!(pb.stats().sections, 1);
    }

    #[test]
    fn test_remove_last_bullet_drops_section() {
        let mut pb = Playbook::new();
        let id = pb
            .add_bullet("tips", "alpha", None, &CounterMap::new())
            .id
            .clone();
        pb.remove_bullet(&id);
        assert_eq!(pb.stats().sections, 0);
        assert_eq!(pb.stats().bullets, 0);
        // Removing again is a no-op
        pb.remove_bullet(&id);
    }

    #[test]
    fn test_as_prompt_orders_sections_lexicographically() {
        let mut pb = Playbook::new();
        pb.add_bullet("zeta", "last", None, &CounterMap::new());
        pb.add_bullet("alpha", "first", None, &CounterMap::new());

        let prompt = pb.as_prompt();
        let alpha = prompt.find("## alpha").unwrap();
        let zeta = prompt.find("## zeta").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn test_loads_rejects_non_object() {
        assert!(matches!(
            Playbook::loads("[1, 2, 3]"),
            Err(EngineError::MalformedSnapshot(_))
        ));
        assert!(matches!(
            Playbook::loads("not json"),
            Err(EngineError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_loads_defaults_missing_counters() {
        let raw = r#"{
            "bullets": {
                "s-00001": {
                    "id": "s-00001",
                    "section": "s",
                    "content": "x",
                    "createdAt": "2024-01-01T00:00:00Z",
                    "updatedAt": "2024-01-02T00:00:00Z"
                }
            },
            "sections": {"s": ["s-00001"]},
            "next_id": 1
        }"#;
        let pb = Playbook::loads(raw).unwrap();
        let bullet = pb.get_bullet("s-00001").unwrap();
        assert_eq!(bullet.helpful, 0);
        assert_eq!(bullet.created_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }
}
