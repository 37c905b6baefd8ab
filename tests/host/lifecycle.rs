use crate::common::{assert_legal_journal, host, host_with, GatedFetcher, ManualSource, Renders};
use stageload::error::EngineError;
use stageload::panel::{DataState, Panel};
use stageload::source::FetchSource;

#[test]
fn test_hide_mid_load_then_show_reissues_the_pass() {
    let mut host = host();
    let renders = Renders::default();
    let (a, a_handle) = ManualSource::valid("a");
    let (b, b_handle) = ManualSource::deferred("b");
    let key = host
        .attach_panel(Panel::new("p", renders.view()).with_source(a).with_source(b))
        .unwrap();

    host.become_visible().unwrap();
    let in_flight = b_handle.listener().unwrap();

    host.become_hidden().unwrap();
    assert!(!b_handle.is_attached());
    assert!(!host.get(key).unwrap().is_active());
    assert_eq!(host.state(key), Some(DataState::Loading));

    host.become_visible().unwrap();
    assert_eq!(host.state(key), Some(DataState::Loading));
    assert_eq!(b_handle.load_calls(), 2);
    assert_eq!(a_handle.load_calls(), 0);

    // The callback of the first request belongs to an earlier pass
    assert!(in_flight.loaded());
    assert_eq!(host.pump(), 0);
    assert_eq!(host.state(key), Some(DataState::Loading));

    b_handle.complete();
    assert_eq!(host.pump(), 1);
    assert_eq!(host.state(key), Some(DataState::Displayed));
    assert_eq!(renders.count(), 1);
    assert_legal_journal(&host);
}

#[test]
fn test_stale_callbacks_apply_when_filtering_is_off() {
    let mut host = host_with(|settings| settings.discard_stale_callbacks = false);
    let renders = Renders::default();
    let (b, b_handle) = ManualSource::deferred("b");
    let key = host
        .attach_panel(Panel::new("p", renders.view()).with_source(b))
        .unwrap();

    host.become_visible().unwrap();
    let in_flight = b_handle.listener().unwrap();
    host.become_hidden().unwrap();
    host.become_visible().unwrap();

    in_flight.loaded();
    assert_eq!(host.pump(), 1);
    assert_eq!(host.state(key), Some(DataState::Displayed));

    // The second request resolves into a panel that is already done
    b_handle.complete();
    assert_eq!(host.pump(), 1);
    assert_eq!(host.state(key), Some(DataState::Displayed));
    assert_eq!(renders.count(), 1);
}

#[test]
fn test_callbacks_while_hidden_are_ignored() {
    let mut host = host();
    let (b, b_handle) = ManualSource::deferred("b");
    let key = host
        .attach_panel(Panel::new("p", Renders::default().view()).with_source(b))
        .unwrap();

    host.become_visible().unwrap();
    let in_flight = b_handle.listener().unwrap();
    host.become_hidden().unwrap();

    in_flight.loaded();
    assert_eq!(host.pump(), 0);
    assert_eq!(host.state(key), Some(DataState::Loading));
    assert_eq!(host.get(key).unwrap().pending().iter().collect::<Vec<_>>(), vec![0]);
}

#[test]
fn test_hide_and_show_keeps_displayed_state() {
    let mut host = host();
    let renders = Renders::default();
    let (a, a_handle) = ManualSource::sync("a");
    let key = host
        .attach_panel(Panel::new("p", renders.view()).with_source(a))
        .unwrap();

    host.become_visible().unwrap();
    host.become_hidden().unwrap();
    assert_eq!(host.state(key), Some(DataState::Displayed));

    host.become_visible().unwrap();
    assert_eq!(host.state(key), Some(DataState::Displayed));
    assert_eq!(a_handle.load_calls(), 1);
    assert_eq!(renders.count(), 1);
}

#[test]
fn test_panel_attached_while_visible_loads_right_away() {
    let mut host = host();
    host.become_visible().unwrap();

    let (a, _a_handle) = ManualSource::sync("a");
    let key = host
        .attach_panel(Panel::new("late", Renders::default().view()).with_source(a))
        .unwrap();

    assert_eq!(host.state(key), Some(DataState::Displayed));
}

#[test]
fn test_destroy_interrupts_everything() {
    let mut host = host();
    let renders = Renders::default();
    let (a, a_handle) = ManualSource::deferred("a");
    let (b, b_handle) = ManualSource::sync("b");
    host.attach_panel(Panel::new("p", renders.view()).with_source(a))
        .unwrap();
    host.attach_panel(Panel::new("q", renders.view()).with_source(b))
        .unwrap();
    host.become_visible().unwrap();
    a_handle.listener().unwrap().loaded();

    host.destroy();

    assert!(host.is_destroyed());
    assert!(!host.is_visible());
    assert!(host.tree().is_empty());
    assert!(host.panel("p").is_none());
    assert_eq!(a_handle.stop_calls(), 1);
    // Sources that were not loading are only invalidated
    assert_eq!(b_handle.stop_calls(), 0);
    assert!(!b_handle.is_valid());
    assert_eq!(host.pump(), 0);

    let err = host
        .attach_panel(Panel::new("r", Renders::default().view()))
        .unwrap_err();
    assert!(matches!(err, EngineError::HostDestroyed));
    assert!(matches!(host.become_visible(), Err(EngineError::HostDestroyed)));
}

#[test]
fn test_reload_retries_failed_sources() {
    let mut host = host();
    let renders = Renders::default();
    let (b, b_handle) = ManualSource::deferred("b");
    let key = host
        .attach_panel(Panel::new("p", renders.view()).with_source(b))
        .unwrap();

    host.become_visible().unwrap();
    b_handle.fail("timeout");
    host.pump();
    assert!(host.get(key).unwrap().has_failures());

    host.reload().unwrap();
    assert_eq!(host.state(key), Some(DataState::Loading));
    assert_eq!(b_handle.load_calls(), 2);

    b_handle.complete();
    host.pump();
    assert_eq!(host.state(key), Some(DataState::Displayed));
    assert!(!host.get(key).unwrap().has_failures());
    assert_eq!(renders.count(), 2);
}

#[test]
fn test_redraw_renders_again_without_loading() {
    let mut host = host();
    let renders = Renders::default();
    let (a, a_handle) = ManualSource::sync("a");
    host.attach_panel(Panel::new("p", renders.view()).with_source(a))
        .unwrap();
    host.become_visible().unwrap();

    host.redraw().unwrap();

    assert_eq!(renders.count(), 2);
    assert_eq!(a_handle.load_calls(), 1);
    assert_legal_journal(&host);
}

#[test]
fn test_journal_is_bounded() {
    let mut host = host_with(|settings| settings.journal_capacity = 3);
    let (a, _a_handle) = ManualSource::sync("a");
    let key = host
        .attach_panel(Panel::new("p", Renders::default().view()).with_source(a))
        .unwrap();

    host.become_visible().unwrap();
    host.invalidate_data(key).unwrap();

    let journal: Vec<_> = host.context().journal().map(|t| (t.from, t.to)).collect();
    assert_eq!(
        journal,
        vec![
            (DataState::Loading, DataState::Loaded),
            (DataState::Loaded, DataState::Displayed),
            (DataState::Displayed, DataState::Invalid),
        ]
    );
    assert_eq!(host.context_mut().take_journal().len(), 3);
    assert_eq!(host.context().journal().count(), 0);
}

#[tokio::test]
async fn test_fetch_source_completes_through_the_event_queue() {
    let mut host = host();
    let renders = Renders::default();
    let (fetcher, gate) = GatedFetcher::new(&["hello", "world"]);
    let source: FetchSource<Vec<String>> = FetchSource::new("greeting", fetcher);
    let reader = source.reader();
    let key = host
        .attach_panel(Panel::new("p", renders.view()).with_source(source))
        .unwrap();

    host.become_visible().unwrap();
    assert_eq!(host.state(key), Some(DataState::Loading));
    assert!(host.get(key).unwrap().is_loading());

    gate.notify_one();
    assert!(host.next_event().await);

    assert_eq!(host.state(key), Some(DataState::Displayed));
    assert_eq!(reader.get(), Some(vec!["hello".to_string(), "world".to_string()]));
    assert!(reader.is_valid());
}

#[tokio::test]
async fn test_request_in_flight_across_hide_and_show_still_completes() {
    let mut host = host();
    let renders = Renders::default();
    let (fetcher, gate) = GatedFetcher::new(&["hello"]);
    let source: FetchSource<Vec<String>> = FetchSource::new("greeting", fetcher);
    let key = host
        .attach_panel(Panel::new("p", renders.view()).with_source(source))
        .unwrap();

    host.become_visible().unwrap();
    host.become_hidden().unwrap();
    host.become_visible().unwrap();
    let epoch = host.get(key).unwrap().epoch();

    // Whichever request resolves first reports under the current pass
    gate.notify_one();
    assert!(host.next_event().await);

    assert_eq!(host.get(key).unwrap().epoch(), epoch);
    assert_eq!(host.state(key), Some(DataState::Displayed));
    assert_eq!(renders.count(), 1);
}
