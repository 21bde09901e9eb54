use engine_host::engine::events::{EmbedEvent, Modifiers, PortableEvent};
use engine_host::engine::instance::{EngineInstance, InstanceListener, SdkHandle, SourceDescriptor};
use engine_host::engine::keymap::{Key, NamedKey};
use engine_host::render::backend::HostContext;
use engine_host::render::backends::software::{SoftwareBackend, SoftwareHostContext};
use engine_host::scene::{HostWindow, KeyEvent, PointerButton, PointerEvent, RedrawSink, RenderableSurface};
use engine_host::{EmbedConfig, EmbedEngine, EmbedError};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

/// Stand-in for a real engine: logs what it is asked to do.
struct LoggingInstance {
    size: (u32, u32),
    listener: Option<InstanceListener>,
}

impl EngineInstance for LoggingInstance {
    fn init(&mut self, width: u32, height: u32, dpi: f64) {
        self.size = (width, height);
        log::info!("engine: init {width}x{height} @ {dpi}");
    }

    fn load(&mut self, source: &SourceDescriptor) -> bool {
        log::info!("engine: load '{source}'");
        source.as_str().ends_with(".pkg")
    }

    fn paint(&mut self, force_full_redraw: bool) {
        log::debug!("engine: paint {:?} (full: {force_full_redraw})", self.size);
    }

    fn dispatch(&mut self) {}

    fn on_event(&mut self, event: &PortableEvent) {
        log::info!("engine: event {event:?}");
        if let (PortableEvent::MouseButtonUp { .. }, Some(listener)) = (event, &self.listener) {
            listener("click", "ok-button", "/dialog/ok-button");
        }
    }

    fn set_event_listener(&mut self, listener: Option<InstanceListener>) {
        self.listener = listener;
    }

    fn sdk(&self) -> SdkHandle {
        Arc::new(())
    }

    fn set_background_color(&mut self, _argb: u32) {}

    fn set_render_target_id(&mut self, id: u32) {
        log::debug!("engine: render target {id}");
    }
}

struct ChannelRedraw(Mutex<mpsc::Sender<()>>);

impl RedrawSink for ChannelRedraw {
    fn request_redraw(&self) {
        let _ = self.0.lock().map(|tx| tx.send(()));
    }
}

struct HeadlessWindow {
    context: SoftwareHostContext,
    redraw: Arc<ChannelRedraw>,
}

impl HostWindow for HeadlessWindow {
    fn current_context(&mut self) -> Option<&mut dyn HostContext> {
        Some(&mut self.context)
    }

    fn redraw_sink(&self) -> Arc<dyn RedrawSink> {
        self.redraw.clone()
    }
}

fn main() -> Result<(), EmbedError> {
    env_logger::init();

    let config = EmbedConfig::builder()
        .frame_interval(Duration::from_millis(16))
        .build()?;
    let backend = SoftwareBackend::new().map_err(|e| EmbedError::Backend(e.to_string()))?;
    let factory = || -> Box<dyn EngineInstance> {
        Box::new(LoggingInstance {
            size: (0, 0),
            listener: None,
        })
    };

    let engine = EmbedEngine::new(Some(config), Box::new(backend), Arc::new(factory))?;
    let mut events = engine.subscribe_events();

    let (redraw_tx, redraw_rx) = mpsc::channel();
    let mut window = HeadlessWindow {
        context: SoftwareHostContext::new(),
        redraw: Arc::new(ChannelRedraw(Mutex::new(redraw_tx))),
    };

    let mut item = engine.create_item()?;
    item.set_event_listener(Some(Arc::new(|_sdk, event_type, id, path| {
        println!("listener: {event_type} on {id} ({path})");
    })));
    item.set_source("hello.pkg");
    item.geometry_changed(640.0, 480.0);

    // Drive the scene graph: every redraw request is answered by a
    // pre-render step, which displays the frame and asks for the next one.
    item.update_paint_node(&mut window)?;
    for frame in 0..30 {
        if redraw_rx.recv_timeout(Duration::from_secs(1)).is_err() {
            println!("no frame after {frame} frames");
            break;
        }
        let node = item.update_paint_node(&mut window)?;

        match frame {
            5 => item.geometry_changed(800.0, 600.0),
            10 => {
                item.mouse_press(&PointerEvent::new(120.0, 45.0, PointerButton::Left));
                item.mouse_release(&PointerEvent::new(120.0, 45.0, PointerButton::Left));
            }
            15 => item.key_press(&KeyEvent {
                key: Key::Named(NamedKey::Enter),
                modifiers: Modifiers::empty(),
            }),
            20 => item.set_source("other.pkg"),
            _ => {}
        }

        if node.take_dirty() {
            let shown = node.displayed();
            println!("frame {} shown at {}x{}", shown.frame_id(), shown.width(), shown.height());
        }
    }

    item.shutdown();
    println!("worker stats: {:?}", item.stats());

    while let Ok(event) = events.try_recv() {
        if !matches!(event, EmbedEvent::FrameProduced { .. }) {
            println!("event: {event:?}");
        }
    }

    Ok(())
}
