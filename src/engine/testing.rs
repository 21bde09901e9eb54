//! Test doubles: a recording engine instance and a headless host window.

use crate::engine::events::PortableEvent;
use crate::engine::instance::{EngineInstance, InstanceFactory, InstanceListener, SdkHandle, SourceDescriptor};
use crate::render::backend::HostContext;
use crate::render::backends::software::SoftwareHostContext;
use crate::scene::{HostWindow, RedrawSink};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

type SharedListener = Arc<dyn Fn(&str, &str, &str) + Send + Sync>;

/// Route `log` output through the test harness. Set `RUST_LOG` to see it.
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Construction {
    pub serial: u64,
    pub source: Option<String>,
    pub width: u32,
    pub height: u32,
    pub dpi: f64,
}

#[derive(Default)]
struct JournalData {
    constructions: Vec<Construction>,
    live: usize,
    loads: Vec<String>,
    paints: usize,
    forced_paints: usize,
    target_ids: Vec<u32>,
    background_colors: Vec<u32>,
    events: Vec<PortableEvent>,
    dispatches: usize,
    listener: Option<(u64, SharedListener)>,
}

/// Everything the recording instances of one factory did.
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<JournalData>>);

impl Journal {
    pub fn new() -> Self {
        init_logging();
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, JournalData> {
        self.0.lock().unwrap()
    }

    pub fn constructions(&self) -> usize {
        self.data().constructions.len()
    }

    pub fn construction_log(&self) -> Vec<Construction> {
        self.data().constructions.clone()
    }

    pub fn live_instances(&self) -> usize {
        self.data().live
    }

    pub fn loads(&self) -> Vec<String> {
        self.data().loads.clone()
    }

    pub fn paints(&self) -> usize {
        self.data().paints
    }

    pub fn forced_paints(&self) -> usize {
        self.data().forced_paints
    }

    pub fn target_ids(&self) -> Vec<u32> {
        self.data().target_ids.clone()
    }

    pub fn background_colors(&self) -> Vec<u32> {
        self.data().background_colors.clone()
    }

    pub fn events(&self) -> Vec<PortableEvent> {
        self.data().events.clone()
    }

    pub fn dispatches(&self) -> usize {
        self.data().dispatches
    }

    /// Simulate the engine reporting an interaction. Returns false when no
    /// listener is installed.
    pub fn fire_listener(&self, event_type: &str, target_id: &str, target_path: &str) -> bool {
        let listener = self.data().listener.as_ref().map(|(_, l)| l.clone());
        match listener {
            Some(listener) => {
                listener(event_type, target_id, target_path);
                true
            }
            None => false,
        }
    }
}

/// SDK handle of a recording instance.
pub(crate) struct RecordingSdk {
    pub serial: u64,
}

pub(crate) struct RecordingFactory {
    journal: Journal,
}

impl RecordingFactory {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl InstanceFactory for RecordingFactory {
    fn create(&self) -> Box<dyn EngineInstance> {
        let mut data = self.journal.data();
        let serial = data.constructions.len() as u64 + 1;
        data.constructions.push(Construction {
            serial,
            source: None,
            width: 0,
            height: 0,
            dpi: 0.0,
        });
        data.live += 1;
        drop(data);

        Box::new(RecordingInstance {
            serial,
            journal: self.journal.clone(),
            sdk: Arc::new(RecordingSdk { serial }),
        })
    }
}

/// Records every call. Loading a source containing "missing" fails.
struct RecordingInstance {
    serial: u64,
    journal: Journal,
    sdk: Arc<RecordingSdk>,
}

impl RecordingInstance {
    fn entry<'a>(&self, data: &'a mut JournalData) -> &'a mut Construction {
        &mut data.constructions[(self.serial - 1) as usize]
    }
}

impl EngineInstance for RecordingInstance {
    fn init(&mut self, width: u32, height: u32, dpi: f64) {
        let mut data = self.journal.data();
        let entry = self.entry(&mut data);
        entry.width = width;
        entry.height = height;
        entry.dpi = dpi;
    }

    fn load(&mut self, source: &SourceDescriptor) -> bool {
        let mut data = self.journal.data();
        self.entry(&mut data).source = Some(source.to_string());
        data.loads.push(source.to_string());
        !source.as_str().contains("missing")
    }

    fn paint(&mut self, force_full_redraw: bool) {
        let mut data = self.journal.data();
        data.paints += 1;
        if force_full_redraw {
            data.forced_paints += 1;
        }
    }

    fn dispatch(&mut self) {
        self.journal.data().dispatches += 1;
    }

    fn on_event(&mut self, event: &PortableEvent) {
        self.journal.data().events.push(event.clone());
    }

    fn set_event_listener(&mut self, listener: Option<InstanceListener>) {
        let mut data = self.journal.data();
        match listener {
            Some(listener) => data.listener = Some((self.serial, Arc::from(listener))),
            None => {
                if data.listener.as_ref().is_some_and(|(owner, _)| *owner == self.serial) {
                    data.listener = None;
                }
            }
        }
    }

    fn sdk(&self) -> SdkHandle {
        self.sdk.clone()
    }

    fn set_background_color(&mut self, argb: u32) {
        self.journal.data().background_colors.push(argb);
    }

    fn set_render_target_id(&mut self, id: u32) {
        self.journal.data().target_ids.push(id);
    }
}

impl Drop for RecordingInstance {
    fn drop(&mut self) {
        let mut data = self.journal.data();
        data.live -= 1;
        if data.listener.as_ref().is_some_and(|(owner, _)| *owner == self.serial) {
            data.listener = None;
        }
    }
}

/// Counts redraw requests and lets tests wait for them.
#[derive(Default)]
pub(crate) struct CountingRedraw {
    count: Mutex<usize>,
    cond: Condvar,
}

impl CountingRedraw {
    pub fn count(&self) -> usize {
        *self.count.lock().unwrap()
    }

    pub fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        let count = self.count.lock().unwrap();
        let (count, _) = self.cond.wait_timeout_while(count, timeout, |c| *c < n).unwrap();
        *count >= n
    }
}

impl RedrawSink for CountingRedraw {
    fn request_redraw(&self) {
        *self.count.lock().unwrap() += 1;
        self.cond.notify_all();
    }
}

/// Headless host window backed by the software backend.
pub(crate) struct TestWindow {
    context: Option<SoftwareHostContext>,
    redraw: Arc<CountingRedraw>,
    dpi: f64,
}

impl TestWindow {
    pub fn new() -> Self {
        Self {
            context: Some(SoftwareHostContext::new()),
            redraw: Arc::new(CountingRedraw::default()),
            dpi: 1.0,
        }
    }

    pub fn redraws(&self) -> usize {
        self.redraw.count()
    }

    pub fn wait_for_redraws(&self, n: usize) -> bool {
        self.redraw.wait_for(n, WAIT_TIMEOUT)
    }

    /// True when the host context was left detached from the GUI thread.
    pub fn host_context_detached(&self) -> bool {
        self.context.as_ref().is_some_and(|c| !c.is_current())
    }

    pub fn set_device_pixel_ratio(&mut self, dpi: f64) {
        self.dpi = dpi;
    }

    pub fn remove_context(&mut self) {
        self.context = None;
    }

    pub fn refuse_sharing(&mut self) {
        if let Some(context) = self.context.as_mut() {
            context.refuse_sharing = true;
        }
    }
}

impl HostWindow for TestWindow {
    fn current_context(&mut self) -> Option<&mut dyn HostContext> {
        self.context.as_mut().map(|c| c as &mut dyn HostContext)
    }

    fn redraw_sink(&self) -> Arc<dyn RedrawSink> {
        self.redraw.clone()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.dpi
    }
}
