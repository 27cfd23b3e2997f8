#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use pdfpane::pdf::{
    ContainerPair, Document, DocumentHandle, EngineError, EventEmitter, FixedSurface, PageBox,
    PagedViewer, PagingMode, RenderEngine, RenderedPage, Size, Viewer, ViewerConfig, ViewerEvent,
    ViewerOptions, ViewportController,
};

pub const PAGE_WIDTH: f32 = 600.0;
pub const PAGE_HEIGHT: f32 = 800.0;
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Payload the fake engine understands: `pages:N`
pub fn pdf_bytes(pages: usize) -> Vec<u8> {
    format!("pages:{pages}").into_bytes()
}

#[derive(Default)]
struct GateState {
    open: Mutex<bool>,
    cond: Condvar,
    waiting: AtomicUsize,
}

/// Holds a parse or render until opened
#[derive(Clone, Default)]
pub struct Gate(Arc<GateState>);

impl Gate {
    pub fn open(&self) {
        *self.0.open.lock().unwrap() = true;
        self.0.cond.notify_all();
    }

    /// True once a worker is blocked on this gate
    pub fn is_waiting(&self) -> bool {
        self.0.waiting.load(Ordering::SeqCst) > 0
    }

    fn wait(&self) {
        self.0.waiting.fetch_add(1, Ordering::SeqCst);
        let guard = self.0.open.lock().unwrap();
        let _ = self
            .0
            .cond
            .wait_timeout_while(guard, TIMEOUT, |open| !*open)
            .unwrap();
    }
}

#[derive(Default)]
pub struct Counters {
    pub parsed: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub rendered: AtomicUsize,
}

impl Counters {
    /// Handles parsed and not yet destroyed
    pub fn live(&self) -> usize {
        self.parsed.load(Ordering::SeqCst) - self.destroyed.load(Ordering::SeqCst)
    }
}

type RenderGates = Arc<Mutex<HashMap<usize, Gate>>>;

struct FakeHandle {
    pages: usize,
    counters: Arc<Counters>,
    render_gates: RenderGates,
}

impl DocumentHandle for FakeHandle {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_box(&self, page: usize, scale: f32) -> Result<PageBox, EngineError> {
        if page == 0 || page > self.pages {
            return Err(EngineError::PageOutOfRange {
                page,
                count: self.pages,
            });
        }
        Ok(PageBox::new(PAGE_WIDTH, PAGE_HEIGHT).scaled(scale))
    }

    fn render_page(&self, page: usize, scale: f32) -> Result<RenderedPage, EngineError> {
        let gate = self.render_gates.lock().unwrap().get(&page).cloned();
        if let Some(gate) = gate {
            gate.wait();
        }
        let size = self.page_box(page, scale)?;
        self.counters.rendered.fetch_add(1, Ordering::SeqCst);
        Ok(RenderedPage { page, scale, size })
    }

    fn destroy(&self) {
        self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Writes the controller made into the viewer
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewerWrite {
    Page(usize),
    Scale(f32),
}

/// Built-in viewer that records every page/scale write
struct RecordingViewer {
    inner: PagedViewer,
    writes: Arc<Mutex<Vec<ViewerWrite>>>,
}

impl Viewer for RecordingViewer {
    fn mode(&self) -> PagingMode {
        self.inner.mode()
    }

    fn set_document(&mut self, document: Option<Document>) {
        self.inner.set_document(document);
    }

    fn has_document(&self) -> bool {
        self.inner.has_document()
    }

    fn pages_count(&self) -> usize {
        self.inner.pages_count()
    }

    fn current_page(&self) -> usize {
        self.inner.current_page()
    }

    fn set_current_page(&mut self, page: usize) {
        self.writes.lock().unwrap().push(ViewerWrite::Page(page));
        self.inner.set_current_page(page);
    }

    fn current_scale(&self) -> f32 {
        self.inner.current_scale()
    }

    fn set_current_scale(&mut self, scale: f32) {
        self.writes.lock().unwrap().push(ViewerWrite::Scale(scale));
        self.inner.set_current_scale(scale);
    }

    fn scroll_by(&mut self, delta: f32) {
        self.inner.scroll_by(delta);
    }
}

/// Engine parsing `pages:N` payloads, with per-payload gates
#[derive(Default)]
pub struct FakeEngine {
    pub counters: Arc<Counters>,
    gates: Mutex<HashMap<Vec<u8>, Gate>>,
    render_gates: RenderGates,
    writes: Arc<Mutex<Vec<ViewerWrite>>>,
    viewers: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Block parsing of `bytes` until the returned gate is opened
    pub fn gate(&self, bytes: &[u8]) -> Gate {
        let gate = Gate::default();
        self.gates
            .lock()
            .unwrap()
            .insert(bytes.to_vec(), gate.clone());
        gate
    }

    /// Block rendering of `page` until the returned gate is opened
    pub fn gate_render(&self, page: usize) -> Gate {
        let gate = Gate::default();
        self.render_gates.lock().unwrap().insert(page, gate.clone());
        gate
    }

    pub fn live(&self) -> usize {
        self.counters.live()
    }

    pub fn rendered(&self) -> usize {
        self.counters.rendered.load(Ordering::SeqCst)
    }

    pub fn parsed(&self) -> usize {
        self.counters.parsed.load(Ordering::SeqCst)
    }

    /// Take the writes recorded so far
    pub fn take_writes(&self) -> Vec<ViewerWrite> {
        std::mem::take(&mut *self.writes.lock().unwrap())
    }

    pub fn viewers_created(&self) -> usize {
        self.viewers.load(Ordering::SeqCst)
    }
}

impl RenderEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn parse(&self, bytes: &[u8]) -> Result<Box<dyn DocumentHandle>, EngineError> {
        let gate = self.gates.lock().unwrap().get(bytes).cloned();
        if let Some(gate) = gate {
            gate.wait();
        }

        let text = std::str::from_utf8(bytes).map_err(|e| EngineError::Parse(e.to_string()))?;
        let pages = text
            .strip_prefix("pages:")
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| EngineError::Parse(format!("unsupported payload {text:?}")))?;

        self.counters.parsed.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            pages,
            counters: self.counters.clone(),
            render_gates: self.render_gates.clone(),
        }))
    }

    fn create_viewer(
        &self,
        containers: &ContainerPair,
        options: ViewerOptions,
        emitter: EventEmitter,
    ) -> Box<dyn Viewer> {
        self.viewers.fetch_add(1, Ordering::SeqCst);
        Box::new(RecordingViewer {
            inner: PagedViewer::with_options(containers.clone(), options, emitter),
            writes: self.writes.clone(),
        })
    }
}

pub struct Surfaces {
    pub scroll: FixedSurface,
    pub content: FixedSurface,
}

impl Surfaces {
    pub fn new(size: Option<Size>) -> Self {
        Self {
            scroll: FixedSurface::new(size),
            content: FixedSurface::new(size),
        }
    }

    pub fn pair(&self) -> ContainerPair {
        ContainerPair::new(Arc::new(self.scroll.clone()), Arc::new(self.content.clone()))
    }
}

pub fn config() -> ViewerConfig {
    ViewerConfig::default()
}

/// Controller on a fake engine, attached to a viewport of `size`
pub fn attached(engine: &Arc<FakeEngine>, size: Option<Size>) -> (ViewportController, Surfaces) {
    attached_with(engine, size, config())
}

pub fn attached_with(
    engine: &Arc<FakeEngine>,
    size: Option<Size>,
    config: ViewerConfig,
) -> (ViewportController, Surfaces) {
    let surfaces = Surfaces::new(size);
    let mut controller = ViewportController::new(engine.clone(), config);
    controller.attach(surfaces.pair());
    (controller, surfaces)
}

/// Poll until an event satisfies `pred`; returns everything seen, or
/// panics on timeout
pub fn poll_until(
    controller: &mut ViewportController,
    mut pred: impl FnMut(&ViewerEvent) -> bool,
) -> Vec<ViewerEvent> {
    let deadline = Instant::now() + TIMEOUT;
    let mut seen = Vec::new();
    loop {
        let events = controller.poll();
        let hit = events.iter().any(&mut pred);
        seen.extend(events);
        if hit {
            return seen;
        }
        assert!(Instant::now() < deadline, "timed out; saw {seen:?}");
        thread::sleep(Duration::from_millis(2));
    }
}

/// Wait until `cond` holds, polling the controller meanwhile
pub fn settle(controller: &mut ViewportController, mut cond: impl FnMut() -> bool) -> Vec<ViewerEvent> {
    let deadline = Instant::now() + TIMEOUT;
    let mut seen = Vec::new();
    loop {
        seen.extend(controller.poll());
        if cond() {
            return seen;
        }
        assert!(Instant::now() < deadline, "condition never held; saw {seen:?}");
        thread::sleep(Duration::from_millis(2));
    }
}

/// Poll until the controller itself satisfies `cond`
pub fn settle_on(
    controller: &mut ViewportController,
    mut cond: impl FnMut(&ViewportController) -> bool,
) -> Vec<ViewerEvent> {
    let deadline = Instant::now() + TIMEOUT;
    let mut seen = Vec::new();
    loop {
        seen.extend(controller.poll());
        if cond(controller) {
            return seen;
        }
        assert!(Instant::now() < deadline, "controller never settled; saw {seen:?}");
        thread::sleep(Duration::from_millis(2));
    }
}

pub fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + TIMEOUT;
    while !cond() {
        assert!(Instant::now() < deadline, "condition never held");
        thread::sleep(Duration::from_millis(2));
    }
}

pub fn is_ready(event: &ViewerEvent) -> bool {
    matches!(event, ViewerEvent::DocumentReady(n) if *n > 0)
}
