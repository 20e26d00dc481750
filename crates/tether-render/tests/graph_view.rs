use futures::executor::block_on;
use serde_json::json;
use tether_core::api::ApiOperation;
use tether_core::geom::{Rect, point, rect};
use tether_core::{
    Connection, ConnectionId, ConnectionStatus, ConnectionType, FrameHandle, FrameScheduler,
    GraphRules, GraphStore, LayoutSource, MemoryGraphApi, MutationCoordinator, NewConnection,
    PositionTracker, RectStore, StoreConfig, TaggedElement,
};
use tether_render::{Error, GraphHost, GraphView, NoticeLevel, SceneOptions};

struct FakeDom {
    container: Option<Rect>,
    elements: Vec<TaggedElement>,
}

impl LayoutSource for FakeDom {
    fn container_rect(&self) -> Option<Rect> {
        self.container
    }

    fn tagged_elements(&self) -> Vec<TaggedElement> {
        self.elements.clone()
    }
}

#[derive(Default)]
struct Frames {
    next: u64,
    last: Option<FrameHandle>,
}

impl FrameScheduler for Frames {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle(self.next);
        self.last = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.last == Some(handle) {
            self.last = None;
        }
    }
}

#[derive(Default)]
struct RecordingHost {
    selections: Vec<Option<ConnectionId>>,
}

impl GraphHost for RecordingHost {
    fn on_select_connection(&mut self, id: Option<&ConnectionId>) {
        self.selections.push(id.cloned());
    }
}

type View<'a> = GraphView<&'a MemoryGraphApi, FakeDom, Frames, RecordingHost>;

fn connection(id: &str, source: &str, target: &str) -> Connection {
    serde_json::from_value(json!({
        "id": id,
        "project_id": "p",
        "source_service_id": source,
        "target_service_id": target,
        "connection_type": "uses",
        "connection_status": "active",
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    }))
    .expect("connection fixture")
}

/// Container scrolled to (50, 100) in the viewport; rects land at container-relative
/// svcA (0,0,100,40) and svcB (300,0,100,40).
fn two_services() -> FakeDom {
    FakeDom {
        container: Some(rect(50.0, 100.0, 800.0, 600.0)),
        elements: vec![
            TaggedElement::new("svcA", rect(50.0, 100.0, 100.0, 40.0)),
            TaggedElement::new("svcB", rect(350.0, 100.0, 100.0, 40.0)),
        ],
    }
}

fn view_over(api: &MemoryGraphApi, dom: FakeDom) -> View<'_> {
    let tracker = PositionTracker::new(dom, Frames::default(), RectStore::new());
    let store = GraphStore::new("p", StoreConfig::default());
    let coordinator = MutationCoordinator::new(api, store, GraphRules::default());
    GraphView::new(
        tracker,
        coordinator,
        RecordingHost::default(),
        SceneOptions::default(),
    )
}

fn mounted(api: &MemoryGraphApi) -> View<'_> {
    let mut view = view_over(api, two_services());
    view.mount();
    let frame = view.tracker().scheduler().last.expect("first pass scheduled");
    assert!(view.on_frame(frame));
    block_on(view.load()).expect("initial load");
    view
}

#[test]
fn late_container_still_gets_its_first_measurement() {
    let api = MemoryGraphApi::with_connections([connection("c1", "svcA", "svcB")]);
    let mut view = view_over(
        &api,
        FakeDom {
            container: None,
            elements: Vec::new(),
        },
    );
    view.mount();
    block_on(view.load()).expect("load");
    assert!(view.tracker().scheduler().last.is_none());
    assert!(view.scene().is_empty());

    *view.tracker_mut().source_mut() = two_services();
    view.container_ready();
    assert_eq!(view.tracker().scheduler().next, 1);
    let frame = view.tracker().scheduler().last.expect("initial pass scheduled");
    assert!(view.on_frame(frame));

    assert_eq!(view.tracker().store().snapshot().len(), 2);
    let scene = view.scene();
    assert_eq!(scene.edges.len(), 1);
    assert_eq!(scene.edges[0].path_d, "M100,20 C200,20 200,20 300,20");
}

#[test]
fn click_selects_and_toggles() {
    let api = MemoryGraphApi::with_connections([connection("c1", "svcA", "svcB")]);
    let mut view = mounted(&api);

    let c1 = ConnectionId::new("c1");
    assert_eq!(view.click(point(200.0, 22.0)), Some(c1.clone()));
    assert_eq!(view.editor_anchor(), Some(point(200.0, 20.0)));
    assert_eq!(view.click(point(200.0, 22.0)), None);

    view.click(point(200.0, 20.0));
    assert_eq!(view.click(point(200.0, 300.0)), None);
    assert_eq!(
        view.host().selections,
        vec![Some(c1.clone()), None, Some(c1), None]
    );
}

#[test]
fn saving_an_edit_updates_the_edge_and_closes_the_editor() {
    let api = MemoryGraphApi::with_connections([connection("c1", "svcA", "svcB")]);
    let mut view = mounted(&api);
    let c1 = ConnectionId::new("c1");
    view.select(Some(&c1));

    // Nothing changed yet: no request, editor stays open.
    assert_eq!(block_on(view.save_edit()).expect("noop save"), None);
    assert_eq!(api.call_count(ApiOperation::Update), 0);
    assert!(view.interaction().editor().is_some());

    let editor = view.editor_mut().expect("editor");
    editor.set_status(ConnectionStatus::Error);
    editor.set_type(ConnectionType::Webhook);
    let updated = block_on(view.save_edit())
        .expect("save")
        .expect("changed");
    assert_eq!(updated.connection_status, ConnectionStatus::Error);
    assert_eq!(updated.connection_type, ConnectionType::Webhook);
    assert!(view.interaction().selected().is_none());

    let scene = view.scene();
    let edge = scene.edge(&c1).expect("edge");
    assert_eq!(edge.style.color, "#ef4444");
    assert_eq!(edge.style.dash_array, Some("6 2"));

    let notices = view.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Info);
}

#[test]
fn rejected_edit_rolls_back_and_reports() {
    let api = MemoryGraphApi::with_connections([connection("c1", "svcA", "svcB")]);
    let mut view = mounted(&api);
    let c1 = ConnectionId::new("c1");
    view.select(Some(&c1));
    view.editor_mut()
        .expect("editor")
        .set_status(ConnectionStatus::Inactive);

    api.fail_next(ApiOperation::Update, "Connection is locked");
    let err = block_on(view.save_edit()).expect_err("rejected");
    assert!(matches!(err, Error::Core(_)));

    let scene = view.scene();
    assert_eq!(scene.edge(&c1).expect("edge").style.color, "#22c55e");
    // The editor keeps the draft so the user can retry.
    assert_eq!(
        view.interaction().editor().map(|e| e.connection_status()),
        Some(ConnectionStatus::Inactive)
    );

    let notices = view.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].message, "Connection is locked");
}

#[test]
fn delete_needs_confirmation() {
    let api = MemoryGraphApi::with_connections([connection("c1", "svcA", "svcB")]);
    let mut view = mounted(&api);
    let c1 = ConnectionId::new("c1");

    assert!(matches!(
        block_on(view.delete_selected()),
        Err(Error::NoSelection)
    ));

    view.select(Some(&c1));
    assert!(matches!(
        block_on(view.delete_selected()),
        Err(Error::DeleteNotConfirmed)
    ));
    assert_eq!(api.call_count(ApiOperation::Delete), 0);

    view.editor_mut().expect("editor").request_delete();
    block_on(view.delete_selected()).expect("delete");
    assert!(api.stored().is_empty());
    assert!(view.scene().is_empty());
    assert!(view.interaction().selected().is_none());
}

#[test]
fn selection_is_dropped_when_its_connection_vanishes() {
    let api = MemoryGraphApi::with_connections([
        connection("c1", "svcA", "svcB"),
        connection("c2", "svcB", "svcA"),
    ]);
    let mut view = mounted(&api);
    let c2 = ConnectionId::new("c2");
    view.select(Some(&c2));

    // Removed elsewhere; the next refetch no longer carries it.
    let other = MutationCoordinator::new(
        &api,
        view.coordinator().store().clone(),
        GraphRules::default(),
    );
    block_on(other.delete(&c2)).expect("remote delete");

    let scene = view.scene();
    assert!(scene.edge(&c2).is_none());
    assert!(view.interaction().selected().is_none());
    assert_eq!(view.host().selections.last(), Some(&None));
}

#[test]
fn failed_create_surfaces_a_notice_and_leaves_no_edge() {
    let api = MemoryGraphApi::with_connections([connection("c1", "svcA", "svcB")]);
    let mut view = mounted(&api);

    let err = block_on(view.connect(NewConnection::new(
        "p",
        "svcA",
        "svcB",
        ConnectionType::ApiCall,
    )))
    .expect_err("duplicate pair");
    assert_eq!(err.to_string(), "Connection already exists");
    assert_eq!(view.scene().edges.len(), 1);

    let notices = view.take_notices();
    assert_eq!(notices[0].message, "Connection already exists");
}
