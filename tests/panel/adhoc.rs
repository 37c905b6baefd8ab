use crate::common::{host, ManualSource, Renders};
use stageload::host::Host;
use stageload::panel::{DataState, Panel, PanelKey};

fn displayed_panel(host: &mut Host, renders: &Renders) -> PanelKey {
    let (source, _handle) = ManualSource::sync("base");
    let key = host
        .attach_panel(Panel::new("p", renders.view()).with_source(source))
        .unwrap();
    host.become_visible().unwrap();
    assert_eq!(host.state(key), Some(DataState::Displayed));
    key
}

#[test]
fn test_adhoc_source_is_one_shot() {
    let mut host = host();
    let renders = Renders::default();
    let key = displayed_panel(&mut host, &renders);

    let (source, handle) = ManualSource::deferred("preview");
    host.load_adhoc(key, Box::new(source)).unwrap();
    assert_eq!(host.get(key).unwrap().adhoc_count(), 1);
    assert_eq!(host.state(key), Some(DataState::Displayed));

    assert!(handle.complete());
    assert_eq!(host.pump(), 1);

    assert_eq!(host.get(key).unwrap().adhoc_count(), 0);
    // Never re-triggers the aggregate
    assert_eq!(host.state(key), Some(DataState::Displayed));
    assert_eq!(renders.count(), 1);
}

#[test]
fn test_synchronous_adhoc_source_is_dropped_at_once() {
    let mut host = host();
    let renders = Renders::default();
    let key = displayed_panel(&mut host, &renders);

    let (source, handle) = ManualSource::sync("cached");
    host.load_adhoc(key, Box::new(source)).unwrap();

    assert_eq!(handle.load_calls(), 1);
    assert_eq!(host.get(key).unwrap().adhoc_count(), 0);
}

#[test]
fn test_failed_adhoc_source_is_dropped() {
    let mut host = host();
    let renders = Renders::default();
    let key = displayed_panel(&mut host, &renders);

    let (source, handle) = ManualSource::deferred("preview");
    host.load_adhoc(key, Box::new(source)).unwrap();
    handle.fail("not found");
    host.pump();

    let panel = host.get(key).unwrap();
    assert_eq!(panel.adhoc_count(), 0);
    assert!(!panel.has_failures());
}

#[test]
fn test_adhoc_tokens_are_unique() {
    let mut host = host();
    let renders = Renders::default();
    let key = displayed_panel(&mut host, &renders);

    let (first, _first_handle) = ManualSource::deferred("first");
    let (second, _second_handle) = ManualSource::deferred("second");
    let a = host.load_adhoc(key, Box::new(first)).unwrap();
    let b = host.load_adhoc(key, Box::new(second)).unwrap();

    assert_ne!(a, b);
    assert_eq!(host.get(key).unwrap().adhoc_count(), 2);
}

#[test]
fn test_adhoc_does_not_complete_a_loading_panel() {
    let mut host = host();
    let (base, base_handle) = ManualSource::deferred("base");
    let key = host
        .attach_panel(Panel::new("p", Renders::default().view()).with_source(base))
        .unwrap();
    host.become_visible().unwrap();

    let (source, handle) = ManualSource::deferred("preview");
    host.load_adhoc(key, Box::new(source)).unwrap();
    handle.complete();
    host.pump();
    assert_eq!(host.state(key), Some(DataState::Loading));

    base_handle.complete();
    host.pump();
    assert_eq!(host.state(key), Some(DataState::Displayed));
}

#[test]
fn test_adhoc_results_survive_invalidation() {
    let mut host = host();
    let renders = Renders::default();
    let key = displayed_panel(&mut host, &renders);

    let (source, handle) = ManualSource::deferred("preview");
    host.load_adhoc(key, Box::new(source)).unwrap();
    host.invalidate_data(key).unwrap();

    handle.complete();
    assert_eq!(host.pump(), 1);
    assert_eq!(host.get(key).unwrap().adhoc_count(), 0);
}

#[test]
fn test_reset_stops_adhoc_sources() {
    let mut host = host();
    let renders = Renders::default();
    let key = displayed_panel(&mut host, &renders);

    let (source, handle) = ManualSource::deferred("preview");
    host.load_adhoc(key, Box::new(source)).unwrap();

    host.reset(key).unwrap();

    assert_eq!(handle.stop_calls(), 1);
    assert_eq!(host.get(key).unwrap().adhoc_count(), 0);
    assert!(!handle.complete());
}

#[test]
fn test_adhoc_callbacks_wait_for_reattach() {
    let mut host = host();
    let renders = Renders::default();
    let key = displayed_panel(&mut host, &renders);

    let (source, handle) = ManualSource::deferred("preview");
    host.load_adhoc(key, Box::new(source)).unwrap();
    host.become_hidden().unwrap();

    assert!(!handle.is_attached());
    assert_eq!(host.pump(), 0);
    assert_eq!(host.get(key).unwrap().adhoc_count(), 1);

    host.become_visible().unwrap();
    assert!(handle.is_attached());
    handle.complete();
    assert_eq!(host.pump(), 1);
    assert_eq!(host.get(key).unwrap().adhoc_count(), 0);
}

#[test]
fn test_adhoc_settled_while_hidden_is_released_on_show() {
    let mut host = host();
    let renders = Renders::default();
    let key = displayed_panel(&mut host, &renders);

    let (source, handle) = ManualSource::deferred("preview");
    host.load_adhoc(key, Box::new(source)).unwrap();
    // Result queued, then the panel leaves the screen before it is pumped
    assert!(handle.complete());
    host.become_hidden().unwrap();
    assert_eq!(host.pump(), 0);
    assert_eq!(host.get(key).unwrap().adhoc_count(), 1);

    host.become_visible().unwrap();

    assert_eq!(host.get(key).unwrap().adhoc_count(), 0);
    assert!(!handle.is_attached());
    assert_eq!(host.state(key), Some(DataState::Displayed));
}

#[test]
fn test_adhoc_finished_while_detached_does_not_accumulate() {
    let mut host = host();
    let renders = Renders::default();
    let key = displayed_panel(&mut host, &renders);

    for _ in 0..4 {
        let (source, handle) = ManualSource::deferred("preview");
        host.load_adhoc(key, Box::new(source)).unwrap();
        host.become_hidden().unwrap();
        // No listener while detached, so nothing is posted
        assert!(!handle.complete());
        host.become_visible().unwrap();
        assert_eq!(host.get(key).unwrap().adhoc_count(), 0);
    }
    assert_eq!(host.pump(), 0);
}
