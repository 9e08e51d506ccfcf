//! Playbook store and delta protocol behavior

use adaptive_playbook::playbook::{CounterMap, DeltaBatch, DeltaOperation, Playbook};
use adaptive_playbook::EngineError;

fn counters(entries: &[(&str, i64)]) -> CounterMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}

#[test]
fn test_crud_stats_and_prompt() {
    let mut pb = Playbook::new();
    let id = pb
        .add_bullet("guidelines", "Use clear steps.", None, &counters(&[("helpful", 1)]))
        .id
        .clone();

    assert!(pb.get_bullet(&id).is_some());
    assert_eq!(pb.bullets().count(), 1);

    pb.update_bullet(&id, Some("Use clear, numbered steps."), Some(&counters(&[("harmful", 0)])));
    assert!(pb.get_bullet(&id).unwrap().content.contains("numbered"));

    pb.tag_bullet(&id, "helpful", 2).unwrap();
    assert!(pb.get_bullet(&id).unwrap().helpful >= 3);

    let prompt = pb.as_prompt();
    assert!(prompt.contains("## guidelines"));
    assert!(prompt.contains(&format!("[{}]", id)));

    let stats = pb.stats();
    assert_eq!(stats.sections, 1);
    assert_eq!(stats.bullets, 1);

    pb.remove_bullet(&id);
    assert!(pb.get_bullet(&id).is_none());
    assert_eq!(pb.stats().sections, 0);
    assert_eq!(pb.stats().bullets, 0);
}

#[test]
fn test_tag_increments_accumulate_and_touch_updated_at() {
    let mut pb = Playbook::new();
    let id = pb
        .add_bullet("tips", "check units", None, &CounterMap::new())
        .id
        .clone();
    let before = pb.get_bullet(&id).unwrap().updated_at;

    pb.tag_bullet(&id, "helpful", 2).unwrap();
    pb.tag_bullet(&id, "helpful", 1).unwrap();

    let bullet = pb.get_bullet(&id).unwrap();
    assert_eq!(bullet.helpful, 3);
    assert!(bullet.updated_at > before);
}

#[test]
fn test_unknown_tag_name_fails_and_leaves_counters_unchanged() {
    let mut pb = Playbook::new();
    let id = pb
        .add_bullet("tips", "check units", None, &CounterMap::new())
        .id
        .clone();

    let err = pb.tag_bullet(&id, "speed", 1).unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedTag(name) if name == "speed"));

    let bullet = pb.get_bullet(&id).unwrap();
    assert_eq!(
        (bullet.helpful, bullet.harmful, bullet.neutral),
        (0, 0, 0)
    );
}

#[test]
fn test_tag_missing_bullet_is_not_found_not_error() {
    let mut pb = Playbook::new();
    assert!(pb.tag_bullet("ghost-1", "helpful", 1).unwrap().is_none());
}

#[test]
fn test_serialization_roundtrip_preserves_everything() {
    let mut pb = Playbook::new();
    let id = pb
        .add_bullet("defaults", "Answer 42 when in doubt.", None, &counters(&[("helpful", 1)]))
        .id
        .clone();
    pb.tag_bullet(&id, "neutral", 1).unwrap();
    pb.add_bullet("guidelines", "Short answers.", None, &CounterMap::new());

    let dump = pb.dumps().unwrap();
    let restored = Playbook::loads(&dump).unwrap();

    assert_eq!(restored.dumps().unwrap(), dump);
    assert_eq!(restored.as_prompt(), pb.as_prompt());
    let stats = restored.stats();
    assert_eq!(stats.sections, 2);
    assert_eq!(stats.bullets, 2);
    assert_eq!(stats.tags.neutral, 1);

    // The id counter round-trips: the next generated id continues the sequence
    let mut restored = restored;
    let next = restored
        .add_bullet("defaults", "later", None, &CounterMap::new())
        .id
        .clone();
    assert_eq!(next, "defaults-00003");
}

#[test]
fn test_loads_rejects_non_object_payloads() {
    assert!(matches!(
        Playbook::loads("[]"),
        Err(EngineError::MalformedSnapshot(_))
    ));
    assert!(matches!(
        Playbook::loads("\"text\""),
        Err(EngineError::MalformedSnapshot(_))
    ));
}

#[test]
fn test_delta_applies_in_order() {
    let mut pb = Playbook::new();
    let batch = DeltaBatch::new(
        "exercise all four operations",
        vec![
            DeltaOperation::Add {
                section: "s".to_string(),
                content: "alpha".to_string(),
                bullet_id: Some("s-00001".to_string()),
                metadata: counters(&[("helpful", 1)]),
            },
            DeltaOperation::Update {
                bullet_id: "s-00001".to_string(),
                content: Some("alpha-updated".to_string()),
                metadata: CounterMap::new(),
            },
            DeltaOperation::Tag {
                bullet_id: "s-00001".to_string(),
                metadata: counters(&[("helpful", 2), ("neutral", 1)]),
            },
        ],
    );
    pb.apply_delta(&batch);

    let bullet = pb.get_bullet("s-00001").unwrap();
    assert_eq!(bullet.content, "alpha-updated");
    assert_eq!(bullet.helpful, 3);
    assert_eq!(bullet.neutral, 1);
}

#[test]
fn test_add_then_remove_leaves_no_dangling_state() {
    let mut pb = Playbook::new();
    let batch = DeltaBatch::new(
        "add and immediately remove",
        vec![
            DeltaOperation::Add {
                section: "s".to_string(),
                content: "transient".to_string(),
                bullet_id: Some("s-x".to_string()),
                metadata: CounterMap::new(),
            },
            DeltaOperation::Remove {
                bullet_id: "s-x".to_string(),
            },
        ],
    );
    pb.apply_delta(&batch);

    assert_eq!(pb.stats().bullets, 0);
    assert_eq!(pb.stats().sections, 0);
    assert!(pb.as_prompt().is_empty());
}

#[test]
fn test_delta_skips_missing_references_and_continues() {
    let mut pb = Playbook::new();
    let batch = DeltaBatch::new(
        "later operations still apply after a miss",
        vec![
            DeltaOperation::Update {
                bullet_id: "ghost".to_string(),
                content: Some("never lands".to_string()),
                metadata: CounterMap::new(),
            },
            DeltaOperation::Remove {
                bullet_id: "also-ghost".to_string(),
            },
            DeltaOperation::Add {
                section: "s".to_string(),
                content: "survives".to_string(),
                bullet_id: None,
                metadata: CounterMap::new(),
            },
        ],
    );
    pb.apply_delta(&batch);
    assert_eq!(pb.stats().bullets, 1);
}

#[test]
fn test_snapshot_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("playbook.json");

    let mut pb = Playbook::new();
    pb.add_bullet("tips", "persisted", None, &CounterMap::new());
    pb.save_to(&path).unwrap();

    let restored = Playbook::load_from(&path).unwrap();
    assert_eq!(restored.as_prompt(), pb.as_prompt());
}
