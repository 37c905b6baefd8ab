use crate::common::RecordingListener;
use serde_json::json;
use stageload::source::{DataSource, LoadId, MemorySource, SourceError};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_memory_source_resolves_inline() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let mut source = MemorySource::new("folders", move || {
        counter.set(counter.get() + 1);
        Ok(vec!["Inbox".to_string()])
    });
    let reader = source.reader();
    let mut listener = RecordingListener::default();

    assert!(!source.load_if_needed(&mut listener, LoadId::Static(0)));
    assert_eq!(listener.events, vec!["loaded #0".to_string()]);
    assert!(source.is_valid());
    assert!(!source.is_loading());
    assert_eq!(reader.get(), Some(vec!["Inbox".to_string()]));

    // Valid sources do nothing further
    assert!(!source.load_if_needed(&mut listener, LoadId::Static(0)));
    assert_eq!(listener.events.len(), 1);
    assert_eq!(calls.get(), 1);

    source.invalidate();
    assert!(!source.is_valid());
    source.load_if_needed(&mut listener, LoadId::Static(0));
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_memory_source_failure_is_reported_inline() {
    let mut source: MemorySource<Vec<String>> =
        MemorySource::new("broken", || Err(SourceError::Decode("bad header".to_string())));
    let mut listener = RecordingListener::default();

    assert!(!source.load_if_needed(&mut listener, LoadId::Adhoc(7)));
    assert_eq!(
        listener.events,
        vec!["failed adhoc:7: Invalid data: bad header".to_string()]
    );
    assert!(!source.is_valid());
}

#[test]
fn test_ready_source_is_valid_from_the_start() {
    let mut source = MemorySource::ready("settings", 42u32);
    let mut listener = RecordingListener::default();

    assert!(source.is_valid());
    assert!(!source.load_if_needed(&mut listener, LoadId::Static(0)));
    assert!(listener.events.is_empty());
    assert_eq!(source.reader().get(), Some(42));
}

#[test]
fn test_persistent_memory_source_roundtrip() {
    let mut saved = MemorySource::ready("labels", vec!["work".to_string()]).persistent();
    let payload = saved.persistable().unwrap().save().unwrap();
    assert_eq!(payload, json!(["work"]));

    let mut restored: MemorySource<Vec<String>> =
        MemorySource::new("labels", || Ok(Vec::new())).persistent();
    restored.persistable().unwrap().restore(payload).unwrap();

    assert!(restored.is_valid());
    assert_eq!(restored.reader().get(), Some(vec!["work".to_string()]));
}

#[test]
fn test_invalid_source_saves_nothing() {
    let mut source: MemorySource<Vec<String>> = MemorySource::new("labels", || Ok(Vec::new())).persistent();
    assert_eq!(source.persistable().unwrap().save().unwrap(), serde_json::Value::Null);

    let err = source.persistable().unwrap().restore(json!({ "wrong": true })).unwrap_err();
    assert!(matches!(err, SourceError::Decode(_)));
    assert!(!source.is_valid());
}

#[test]
fn test_sources_are_not_persistable_by_default() {
    let mut source = MemorySource::ready("labels", 1u8);
    assert!(source.persistable().is_none());
}
