use crate::common::{host, ManualSource, Renders};
use serde_json::json;
use stageload::error::EngineError;
use stageload::host::{Host, HostSnapshot, PanelSnapshot};
use stageload::panel::{DataState, Panel, PanelKey};
use stageload::source::{MemorySource, SourceReader};
use std::cell::Cell;
use std::rc::Rc;

/// A calendar panel whose single cached source counts loader calls
fn calendar(host: &mut Host, calls: &Rc<Cell<usize>>) -> (PanelKey, SourceReader<Vec<String>>) {
    let calls = Rc::clone(calls);
    let source = MemorySource::new("events", move || {
        calls.set(calls.get() + 1);
        Ok(vec!["Retro".to_string(), "Planning".to_string()])
    })
    .persistent();
    let reader = source.reader();
    let key = host
        .attach_panel(Panel::new("calendar", Renders::default().view()).with_source(source))
        .unwrap();
    (key, reader)
}

#[test]
fn test_save_state_records_every_panel() {
    let mut host = host();
    let (root_src, _root_handle) = ManualSource::sync("messages");
    let (child_src, _child_handle) = ManualSource::deferred("unread");
    let (hidden_src, _hidden_handle) = ManualSource::sync("starred");
    let inbox = host
        .attach_panel(Panel::new("inbox", Renders::default().view()).with_source(root_src))
        .unwrap();
    host.attach_child(inbox, Panel::new("unread", Renders::default().view()).with_source(child_src))
        .unwrap();
    host.attach_child(
        inbox,
        Panel::new("starred", Renders::default().view())
            .with_source(hidden_src)
            .with_selected(false),
    )
    .unwrap();
    host.become_visible().unwrap();

    let snapshot = host.save_state();

    assert_eq!(snapshot.host_id, host.id());
    assert!(snapshot.visible);
    assert_eq!(snapshot.panel_count(), 3);
    let saved = snapshot.find("inbox").unwrap();
    assert_eq!(saved.data_state, DataState::Displayed);
    assert_eq!(saved.child("unread").unwrap().data_state, DataState::Loading);
    let starred = saved.child("starred").unwrap();
    assert_eq!(starred.data_state, DataState::Invalid);
    assert!(!starred.selected);
}

#[test]
fn test_snapshot_file_roundtrip() {
    let mut host = host();
    let calls = Rc::new(Cell::new(0));
    calendar(&mut host, &calls);
    host.become_visible().unwrap();
    let snapshot = host.save_state();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("snapshot.json");
    snapshot.save_to_file(&path).unwrap();

    let loaded = HostSnapshot::load_from_file(&path).unwrap();
    assert_eq!(loaded, snapshot);
    assert!(loaded.to_json().unwrap().contains("\"DISPLAYED\""));
}

#[test]
fn test_load_from_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(HostSnapshot::load_from_file(dir.path().join("missing.json")).is_err());
    assert!(HostSnapshot::from_json("{ not json").is_err());
}

#[test]
fn test_restore_brings_persisted_panels_back_without_loading() {
    let mut first = host();
    let first_calls = Rc::new(Cell::new(0));
    calendar(&mut first, &first_calls);
    first.become_visible().unwrap();
    assert_eq!(first_calls.get(), 1);
    let snapshot = first.save_state();

    let mut second = host();
    let second_calls = Rc::new(Cell::new(0));
    let (key, reader) = calendar(&mut second, &second_calls);

    assert_eq!(second.restore_state(&snapshot).unwrap(), 1);
    assert_eq!(second.state(key), Some(DataState::Loaded));
    assert_eq!(reader.get(), Some(vec!["Retro".to_string(), "Planning".to_string()]));

    second.become_visible().unwrap();
    assert_eq!(second.state(key), Some(DataState::Displayed));
    assert_eq!(second_calls.get(), 0);
}

#[test]
fn test_restore_leaves_unpersisted_panels_invalid() {
    let mut first = host();
    let (source, handle) = ManualSource::deferred("feed");
    first
        .attach_panel(Panel::new("feed", Renders::default().view()).with_source(source))
        .unwrap();
    first.become_visible().unwrap();
    handle.complete();
    first.pump();
    let snapshot = first.save_state();
    assert_eq!(snapshot.find("feed").unwrap().data_state, DataState::Displayed);

    let mut second = host();
    let (source, handle) = ManualSource::deferred("feed");
    let key = second
        .attach_panel(Panel::new("feed", Renders::default().view()).with_source(source))
        .unwrap();

    assert_eq!(second.restore_state(&snapshot).unwrap(), 0);
    assert_eq!(second.state(key), Some(DataState::Invalid));
    assert_eq!(handle.load_calls(), 0);
}

#[test]
fn test_save_stops_adhoc_sources_that_cannot_persist() {
    let mut host = host();
    let key = host.attach_panel(Panel::new("p", Renders::default().view())).unwrap();
    host.become_visible().unwrap();
    let (source, handle) = ManualSource::deferred("preview");
    host.load_adhoc(key, Box::new(source)).unwrap();

    let snapshot = host.save_state();

    assert_eq!(handle.stop_calls(), 1);
    assert_eq!(host.get(key).unwrap().adhoc_count(), 0);
    assert!(snapshot.find("p").unwrap().adhoc.is_empty());
}

#[test]
fn test_persisted_adhoc_payloads_are_handed_back() {
    let mut first = host();
    let key = first.attach_panel(Panel::new("p", Renders::default().view())).unwrap();
    first.become_visible().unwrap();
    let (source, handle) = ManualSource::deferred("preview");
    first
        .load_adhoc(key, Box::new(source.persisting(json!({ "page": 3 }))))
        .unwrap();

    let snapshot = first.save_state();
    assert_eq!(handle.stop_calls(), 0);
    assert_eq!(first.get(key).unwrap().adhoc_count(), 1);
    assert_eq!(snapshot.find("p").unwrap().adhoc, vec![json!({ "page": 3 })]);

    let mut second = host();
    let key = second.attach_panel(Panel::new("p", Renders::default().view())).unwrap();
    second.restore_state(&snapshot).unwrap();

    let panel = second.get_mut(key).unwrap();
    assert_eq!(panel.take_restored_adhoc(), vec![json!({ "page": 3 })]);
    assert!(panel.take_restored_adhoc().is_empty());
}

#[test]
fn test_restore_skips_unknown_panels() {
    let mut first = host();
    first.attach_panel(Panel::new("ghost", Renders::default().view())).unwrap();
    first.become_visible().unwrap();
    let snapshot = first.save_state();

    let mut second = host();
    let key = second.attach_panel(Panel::new("real", Renders::default().view())).unwrap();

    assert_eq!(second.restore_state(&snapshot).unwrap(), 0);
    assert_eq!(second.state(key), Some(DataState::Invalid));
}

#[test]
fn test_restore_after_destroy_is_rejected() {
    let mut first = host();
    let snapshot = first.save_state();

    let mut second = host();
    second.destroy();

    assert!(matches!(second.restore_state(&snapshot), Err(EngineError::HostDestroyed)));
}

fn saved_child<'a>(snapshot: &'a mut HostSnapshot, root: &str, child: &str) -> &'a mut PanelSnapshot {
    snapshot
        .panels
        .iter_mut()
        .find(|panel| panel.id == root)
        .and_then(|panel| panel.children.iter_mut().find(|saved| saved.id == child))
        .unwrap()
}

#[test]
fn test_restored_selection_activates_child() {
    let mut host = host();
    let (root_src, _root_handle) = ManualSource::sync("messages");
    let (child_src, child_handle) = ManualSource::sync("starred");
    let inbox = host
        .attach_panel(Panel::new("inbox", Renders::default().view()).with_source(root_src))
        .unwrap();
    let starred = host
        .attach_child(
            inbox,
            Panel::new("starred", Renders::default().view())
                .with_source(child_src)
                .with_selected(false),
        )
        .unwrap();
    host.become_visible().unwrap();

    let mut snapshot = host.save_state();
    saved_child(&mut snapshot, "inbox", "starred").selected = true;
    host.restore_state(&snapshot).unwrap();

    let panel = host.get(starred).unwrap();
    assert!(panel.is_selected());
    assert!(panel.is_active());
    assert_eq!(panel.state(), DataState::Displayed);
    assert_eq!(child_handle.load_calls(), 1);
}

#[test]
fn test_restored_deselection_detaches_child() {
    let mut host = host();
    let (root_src, _root_handle) = ManualSource::sync("messages");
    let (child_src, child_handle) = ManualSource::deferred("unread");
    let inbox = host
        .attach_panel(Panel::new("inbox", Renders::default().view()).with_source(root_src))
        .unwrap();
    let unread = host
        .attach_child(inbox, Panel::new("unread", Renders::default().view()).with_source(child_src))
        .unwrap();
    host.become_visible().unwrap();
    assert!(child_handle.is_attached());

    let mut snapshot = host.save_state();
    saved_child(&mut snapshot, "inbox", "unread").selected = false;
    host.restore_state(&snapshot).unwrap();

    let panel = host.get(unread).unwrap();
    assert!(!panel.is_selected());
    assert!(!panel.is_active());
    assert!(!child_handle.is_attached());
}
