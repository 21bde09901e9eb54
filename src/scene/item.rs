use crate::engine::events::PortableEvent;
use crate::engine::instance::{EventListener, SourceDescriptor};
use crate::engine::{EmbedError, WorkerRegistry};
use crate::render::backend::RenderBackend;
use crate::render::Viewport;
use crate::scene::dispatch::{pump, DispatchTimer};
use crate::scene::host::{HostWindow, RenderableSurface};
use crate::scene::input::{InputTranslator, KeyEvent, Point, PointerEvent, WheelEvent};
use crate::scene::TextureNode;
use crate::worker::{RenderWorker, WorkerId, WorkerPhase, WorkerStats};
use log::{debug, info, trace, warn};
use std::sync::{Arc, Mutex};

/// The node a host GUI places in its scene to show embedded engine content.
///
/// Created by [`EmbedEngine::create_item`](crate::EmbedEngine::create_item).
/// Property changes are queued for the render worker; input goes straight to
/// the current engine instance under the worker's lock and is dropped while
/// no instance exists.
pub struct SceneItem {
    worker: Arc<RenderWorker>,
    backend: Arc<dyn RenderBackend>,
    registry: Arc<Mutex<WorkerRegistry>>,
    dispatch: Option<DispatchTimer>,
    node: Option<Arc<TextureNode>>,
    source: SourceDescriptor,
    viewport: Viewport,
    translator: InputTranslator,
    shut_down: bool,
}

impl SceneItem {
    pub(crate) fn new(
        worker: Arc<RenderWorker>,
        backend: Arc<dyn RenderBackend>,
        registry: Arc<Mutex<WorkerRegistry>>,
        dispatch: Option<DispatchTimer>,
    ) -> Self {
        let viewport = worker.viewport();
        Self {
            worker,
            backend,
            registry,
            dispatch,
            node: None,
            source: SourceDescriptor::default(),
            viewport,
            translator: InputTranslator::new(),
            shut_down: false,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.worker.id()
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The texture node, once the first paint-node update has run.
    pub fn node(&self) -> Option<Arc<TextureNode>> {
        self.node.clone()
    }

    pub fn phase(&self) -> WorkerPhase {
        self.worker.phase()
    }

    pub fn stats(&self) -> WorkerStats {
        self.worker.stats()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// True while the dispatch timer is pumping the engine.
    pub fn is_dispatching(&self) -> bool {
        self.dispatch.as_ref().is_some_and(DispatchTimer::is_running)
    }

    /// Set the content to show. Setting the same source again reloads it.
    pub fn set_source(&mut self, source: impl Into<SourceDescriptor>) {
        self.source = source.into();
        self.worker.set_source(self.source.clone());
    }

    /// Register the application's listener for engine events. It stays
    /// installed across reloads; `None` removes it.
    pub fn set_event_listener(&self, listener: Option<EventListener>) {
        self.worker.set_event_listener(listener);
    }

    /// Pump the engine's event queue once. For hosts driving dispatch
    /// themselves; returns false when no instance exists.
    pub fn dispatch_pending(&self) -> bool {
        pump(self.worker.shared_state())
    }

    /// Stop dispatching, shut the render worker down and wait for it to
    /// release its GPU resources. Calling this more than once is a no-op.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Some(mut timer) = self.dispatch.take() {
            timer.stop();
        }
        self.worker.shutdown();
        self.registry
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(self.worker.id());

        info!("scene item {}: shut down", self.worker.id());
    }

    fn forward(&self, event: PortableEvent) -> bool {
        let kind = event.kind();
        let delivered = self.worker.with_instance(|instance| instance.on_event(&event)).is_some();
        if !delivered {
            trace!("scene item {}: {kind} dropped, no engine instance", self.worker.id());
        }
        delivered
    }

    /// Announce a new size or pixel density to the current instance, then
    /// queue it for the worker. Degenerate and unchanged viewports are ignored.
    fn apply_viewport(&mut self, viewport: Viewport) {
        if !viewport.is_valid() {
            trace!("scene item {}: degenerate viewport {viewport:?} ignored", self.worker.id());
            return;
        }
        if viewport == self.viewport {
            return;
        }

        self.viewport = viewport;
        self.forward(InputTranslator::resize(viewport));
        self.worker.set_viewport(viewport);
    }

    /// Follow the window's pixel density, which changes when it moves to
    /// another screen.
    fn sync_device_pixel_ratio(&mut self, window: &dyn HostWindow) {
        let dpi = window.device_pixel_ratio();
        if dpi.is_finite() && dpi > 0.0 && dpi != self.viewport.dpi {
            debug!("scene item {}: device pixel ratio now {dpi}", self.worker.id());
            self.apply_viewport(self.viewport.with_dpi(dpi));
        }
    }

    /// Deltas are measured from the last motion the engine actually saw.
    fn forward_motion(&mut self, position: Point) {
        if self.forward(self.translator.motion(position)) {
            self.translator.commit_motion(position);
        }
    }

    fn bootstrap(&mut self, window: &mut dyn HostWindow) -> Result<Arc<TextureNode>, EmbedError> {
        let redraw = window.redraw_sink();

        let context = {
            let host = window.current_context().ok_or(EmbedError::NoHostContext)?;
            host.done_current();
            let shared = self.backend.create_shared_context(host);
            let restored = host.make_current();

            let context = shared.map_err(|e| EmbedError::Backend(format!("{}: {e}", self.backend.name())))?;
            restored.map_err(|e| EmbedError::Context(format!("cannot restore host context: {e}")))?;
            context
        };

        let node = Arc::new(TextureNode::new(redraw, self.worker.trigger()));
        self.worker.start(context, node.clone())?;
        self.node = Some(node.clone());

        info!(
            "scene item {}: render context created with {}",
            self.worker.id(),
            self.backend.name()
        );
        Ok(node)
    }
}

impl RenderableSurface for SceneItem {
    fn update_paint_node(&mut self, window: &mut dyn HostWindow) -> Result<Arc<TextureNode>, EmbedError> {
        if self.shut_down {
            return Err(EmbedError::WorkerTerminated(self.worker.id()));
        }

        self.sync_device_pixel_ratio(window);

        match &self.node {
            Some(node) => {
                node.prepare();
                Ok(node.clone())
            }
            None => self.bootstrap(window),
        }
    }

    fn geometry_changed(&mut self, width: f64, height: f64) {
        self.apply_viewport(Viewport::from_logical(width, height, self.viewport.dpi));
    }

    fn mouse_press(&mut self, event: &PointerEvent) {
        match self.translator.button_down(event) {
            Some(ev) => {
                self.forward(ev);
            }
            None => warn!("scene item {}: unsupported button {:?} dropped", self.worker.id(), event.button),
        }
    }

    fn mouse_release(&mut self, event: &PointerEvent) {
        match self.translator.button_up(event) {
            Some(ev) => {
                self.forward(ev);
            }
            None => warn!("scene item {}: unsupported button {:?} dropped", self.worker.id(), event.button),
        }
    }

    fn mouse_move(&mut self, event: &PointerEvent) {
        self.forward_motion(event.position);
    }

    fn hover_move(&mut self, event: &PointerEvent) {
        self.forward_motion(event.position);
    }

    fn wheel(&mut self, event: &WheelEvent) {
        let ev = self.translator.wheel(event);
        self.forward(ev);
    }

    fn key_press(&mut self, event: &KeyEvent) {
        let ev = self.translator.key_down(event);
        self.forward(ev);
    }

    fn key_release(&mut self, event: &KeyEvent) {
        let ev = self.translator.key_up(event);
        self.forward(ev);
    }
}

impl Drop for SceneItem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::{EmbedEvent, Modifiers};
    use crate::engine::keymap::{Key, KeyCode, NamedKey};
    use crate::engine::testing::{Journal, RecordingFactory, TestWindow};
    use crate::engine::{EmbedConfig, EmbedEngine, ResizePolicy};
    use crate::render::backends::software::{SoftwareBackend, SoftwareStats};
    use crate::scene::input::PointerButton;
    use std::time::Duration;

    struct Harness {
        engine: EmbedEngine,
        journal: Journal,
        stats: Arc<SoftwareStats>,
        window: TestWindow,
    }

    fn harness(policy: ResizePolicy) -> Harness {
        let config = EmbedConfig::builder()
            .frame_interval(Duration::from_millis(1))
            .dispatch_interval(Duration::from_secs(3600))
            .resize_policy(policy)
            .build()
            .unwrap();
        let journal = Journal::new();
        let backend = SoftwareBackend::new().unwrap();
        let stats = backend.stats();
        let engine = EmbedEngine::new(
            Some(config),
            Box::new(backend),
            Arc::new(RecordingFactory::new(journal.clone())),
        )
        .unwrap();

        Harness {
            engine,
            journal,
            stats,
            window: TestWindow::new(),
        }
    }

    impl Harness {
        /// Run one pre-render step and wait until the worker produced the
        /// frame it triggers.
        fn frame(&mut self, item: &mut SceneItem) -> Arc<TextureNode> {
            let expected = self.window.redraws() + 1;
            let node = item.update_paint_node(&mut self.window).unwrap();
            assert!(self.window.wait_for_redraws(expected), "frame {expected} never arrived");
            node
        }
    }

    #[test]
    fn first_frames_follow_bootstrap_scenario() {
        let mut h = harness(ResizePolicy::Rebuild);
        let mut item = h.engine.create_item().unwrap();
        item.set_source("a.pkg");
        item.geometry_changed(800.0, 600.0);
        assert!(item.node().is_none());

        // First pre-render step creates the context and the first frame.
        let node = h.frame(&mut item);
        assert!(!h.window.host_context_detached());
        let log = h.journal.construction_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].source.as_deref(), Some("a.pkg"));
        assert_eq!((log[0].width, log[0].height), (800, 600));
        assert_eq!(node.pending_frame_id(), Some(1));

        // Consuming it lets the worker produce the second one.
        h.frame(&mut item);
        assert_eq!(node.displayed().frame_id(), 1);
        assert_eq!(node.pending_frame_id(), Some(2));
        assert_eq!(h.journal.constructions(), 1);
        assert_eq!(item.stats().cycles, 2);
    }

    #[test]
    fn same_inputs_construct_once_per_run() {
        for _ in 0..2 {
            let mut h = harness(ResizePolicy::Rebuild);
            let mut item = h.engine.create_item().unwrap();
            item.set_source("a.pkg");
            item.geometry_changed(640.0, 480.0);
            for _ in 0..3 {
                h.frame(&mut item);
            }
            assert_eq!(h.journal.constructions(), 1);
        }
    }

    #[test]
    fn input_reaches_instance_unchanged() {
        let mut h = harness(ResizePolicy::Rebuild);
        let mut item = h.engine.create_item().unwrap();
        item.set_source("a.pkg");
        item.geometry_changed(800.0, 600.0);

        // No instance yet: dropped without error.
        item.mouse_press(&PointerEvent::new(1.0, 1.0, PointerButton::Left));
        assert!(h.journal.events().is_empty());

        h.frame(&mut item);
        item.mouse_press(&PointerEvent::new(120.0, 45.0, PointerButton::Left));
        item.mouse_release(&PointerEvent::new(120.0, 45.0, PointerButton::Forward));
        item.hover_move(&PointerEvent::new(120.0, 45.0, PointerButton::None));
        item.wheel(&WheelEvent {
            position: Point::new(120.0, 45.0),
            pixel_delta: Point::new(0.0, 30.0),
        });
        item.key_press(&KeyEvent {
            key: Key::Named(NamedKey::Enter),
            modifiers: Modifiers::ALT,
        });

        let events = h.journal.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], PortableEvent::MouseButtonDown { button: 1, x: 120.0, y: 45.0 });
        assert_eq!(events[1], PortableEvent::MouseMotion { x: 120.0, y: 45.0, dx: 120.0, dy: 45.0 });
        assert_eq!(events[2], PortableEvent::Wheel { x: 120.0, y: 45.0, delta_x: 0.0, delta_y: 30.0 });
        assert!(matches!(events[3], PortableEvent::KeyDown { key: KeyCode::RETURN, .. }));
    }

    #[test]
    fn resize_is_forwarded_then_applied() {
        let mut h = harness(ResizePolicy::Rebuild);
        let mut item = h.engine.create_item().unwrap();
        item.set_source("a.pkg");
        item.geometry_changed(800.0, 600.0);
        h.frame(&mut item);

        item.geometry_changed(1024.0, 768.0);
        item.geometry_changed(0.0, 768.0);
        assert_eq!(
            h.journal.events(),
            vec![PortableEvent::WindowResize {
                width: 1024,
                height: 768,
                scaled_width: 1024,
                scaled_height: 768
            }]
        );

        let node = h.frame(&mut item);
        h.frame(&mut item);
        assert_eq!(node.displayed().width(), 1024);
        assert_eq!(h.journal.constructions(), 2);
    }

    #[test]
    fn bootstrap_picks_up_device_pixel_ratio() {
        let mut h = harness(ResizePolicy::Rebuild);
        h.window.set_device_pixel_ratio(2.0);
        let mut item = h.engine.create_item().unwrap();
        item.set_source("a.pkg");
        item.geometry_changed(100.0, 50.0);
        h.frame(&mut item);

        assert_eq!(item.viewport(), Viewport::new(100, 50, 2.0));
        assert_eq!(h.journal.construction_log()[0].dpi, 2.0);
    }

    #[test]
    fn device_pixel_ratio_change_reaches_worker() {
        let mut h = harness(ResizePolicy::Rebuild);
        let mut item = h.engine.create_item().unwrap();
        item.set_source("a.pkg");
        item.geometry_changed(100.0, 50.0);
        h.frame(&mut item);
        assert!(h.journal.events().is_empty());

        h.window.set_device_pixel_ratio(2.0);
        h.frame(&mut item);

        assert_eq!(item.viewport(), Viewport::new(100, 50, 2.0));
        assert_eq!(
            h.journal.events(),
            vec![PortableEvent::WindowResize {
                width: 100,
                height: 50,
                scaled_width: 200,
                scaled_height: 100
            }]
        );
        let log = h.journal.construction_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].dpi, 2.0);

        // Unchanged ratio: nothing new is forwarded.
        h.frame(&mut item);
        assert_eq!(h.journal.events().len(), 1);
    }

    #[test]
    fn motion_before_instance_does_not_shift_delta() {
        let mut h = harness(ResizePolicy::Rebuild);
        let mut item = h.engine.create_item().unwrap();
        item.set_source("a.pkg");
        item.geometry_changed(800.0, 600.0);

        item.hover_move(&PointerEvent::new(50.0, 50.0, PointerButton::None));
        h.frame(&mut item);
        item.hover_move(&PointerEvent::new(60.0, 60.0, PointerButton::None));
        item.mouse_move(&PointerEvent::new(65.0, 70.0, PointerButton::Left));

        assert_eq!(
            h.journal.events(),
            vec![
                PortableEvent::MouseMotion { x: 60.0, y: 60.0, dx: 60.0, dy: 60.0 },
                PortableEvent::MouseMotion { x: 65.0, y: 70.0, dx: 5.0, dy: 10.0 },
            ]
        );
    }

    #[test]
    fn missing_host_context_fails_fast() {
        let mut h = harness(ResizePolicy::Rebuild);
        let mut item = h.engine.create_item().unwrap();
        h.window.remove_context();
        assert!(matches!(
            item.update_paint_node(&mut h.window),
            Err(EmbedError::NoHostContext)
        ));
        assert!(item.node().is_none());
    }

    #[test]
    fn refused_sharing_is_reported() {
        let mut h = harness(ResizePolicy::Rebuild);
        let mut item = h.engine.create_item().unwrap();
        h.window.refuse_sharing();
        assert!(matches!(
            item.update_paint_node(&mut h.window),
            Err(EmbedError::Backend(_))
        ));
        assert!(!h.window.host_context_detached());
    }

    #[test]
    fn dispatch_pending_needs_instance() {
        let mut h = harness(ResizePolicy::Rebuild);
        let mut item = h.engine.create_item().unwrap();
        assert!(!item.dispatch_pending());

        item.set_source("a.pkg");
        h.frame(&mut item);
        assert!(item.dispatch_pending());
        assert_eq!(h.journal.dispatches(), 1);
    }

    #[test]
    fn shutdown_twice_leaves_same_state() {
        let mut h = harness(ResizePolicy::Rebuild);
        let mut events = h.engine.subscribe_events();
        let mut item = h.engine.create_item().unwrap();
        item.set_source("a.pkg");
        h.frame(&mut item);

        item.shutdown();
        let after_first = (
            item.phase(),
            h.stats.live_framebuffers(),
            h.stats.live_contexts(),
            h.journal.live_instances(),
            h.engine.worker_count(),
        );
        item.shutdown();
        let after_second = (
            item.phase(),
            h.stats.live_framebuffers(),
            h.stats.live_contexts(),
            h.journal.live_instances(),
            h.engine.worker_count(),
        );

        assert_eq!(after_first, (WorkerPhase::Terminated, 0, 0, 0, 0));
        assert_eq!(after_first, after_second);
        assert!(matches!(
            item.update_paint_node(&mut h.window),
            Err(EmbedError::WorkerTerminated(_))
        ));

        let mut terminated = 0;
        while let Ok(ev) = events.try_recv() {
            if matches!(ev, EmbedEvent::WorkerTerminated { .. }) {
                terminated += 1;
            }
        }
        assert_eq!(terminated, 1);
    }

    #[test]
    fn listener_registered_before_instance_is_kept() {
        let mut h = harness(ResizePolicy::Rebuild);
        let mut item = h.engine.create_item().unwrap();
        let hits: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = hits.clone();
        item.set_event_listener(Some(Arc::new(move |_sdk, ty, _id, path| {
            sink.lock().unwrap().push(format!("{ty}@{path}"))
        })));

        item.set_source("a.pkg");
        h.frame(&mut item);
        assert!(h.journal.fire_listener("click", "ok", "/dialog/ok"));
        assert_eq!(hits.lock().unwrap().as_slice(), &["click@/dialog/ok".to_string()]);

        item.set_event_listener(None);
        assert!(!h.journal.fire_listener("click", "ok", "/dialog/ok"));
    }
}
