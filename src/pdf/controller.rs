//! Viewport controller
//!
//! Owns the viewer instance, the current document and the loader, and turns
//! viewer events into [`ViewerEvent`]s for the caller. Everything here runs
//! on the owning thread; workers only ever hand results back through
//! [`ViewportController::poll`].

use std::sync::Arc;

use log::{debug, error, warn};

use super::config::ViewerConfig;
use super::engine::{Document, RenderEngine};
use super::events::{EngineEvent, EventBus, EventKind, Subscription};
use super::fit;
use super::loader::{DocumentLoader, LoadOutcome};
use super::request::{FitParams, LoadError, RequestId};
use super::source::Source;
use super::state::{Command, Effect, Synchronizer};
use super::surface::{ContainerPair, Size};
use super::types::{
    DesiredState, FitAxis, ObservedState, PagingMode, RenderedPage, is_valid_scale, scale_differs_by,
};
use super::viewer::Viewer;

/// Upper bound on drain rounds per poll; each round can only be triggered
/// by writes the synchronizer issued in the previous one
const MAX_DRAIN_ROUNDS: usize = 8;

/// Events reported to the owner of a controller
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerEvent {
    /// A load was dispatched
    Loading(RequestId),
    /// Document laid out with this many pages; 0 means no document
    DocumentReady(usize),
    PageChanged(usize),
    ScaleChanged(f32),
    /// The latest load failed with a user-visible error
    LoadFailed(LoadError),
    /// A fit request completed; `None` means no change
    FitResolved {
        id: RequestId,
        axis: FitAxis,
        scale: Option<f32>,
    },
}

pub struct ViewportController {
    engine: Arc<dyn RenderEngine>,
    config: ViewerConfig,
    loader: DocumentLoader,
    bus: EventBus,
    subscriptions: Vec<Subscription>,
    containers: Option<ContainerPair>,
    viewer: Option<Box<dyn Viewer>>,
    /// The one live document and the load that produced it
    document: Option<(RequestId, Document)>,
    pending_fits: Vec<(RequestId, FitAxis)>,
    /// Document, page and scale of the last render dispatched
    render_target: Option<(RequestId, usize, f32)>,
    rendered: Option<RenderedPage>,
    sync: Synchronizer,
    window: Option<Size>,
    outbox: Vec<ViewerEvent>,
    alive: bool,
}

impl ViewportController {
    #[must_use]
    pub fn new(engine: Arc<dyn RenderEngine>, config: ViewerConfig) -> Self {
        let config = config.sanitized();
        let loader = DocumentLoader::new(engine.clone(), config.loader_workers);
        let sync = Synchronizer::with_epsilon(DesiredState::default(), config.scale_epsilon);

        Self {
            engine,
            config,
            loader,
            bus: EventBus::new(),
            subscriptions: Vec::new(),
            containers: None,
            viewer: None,
            document: None,
            pending_fits: Vec::new(),
            render_target: None,
            rendered: None,
            sync,
            window: None,
            outbox: Vec::new(),
            alive: true,
        }
    }

    #[must_use]
    pub fn mode(&self) -> PagingMode {
        self.config.paging_mode
    }

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Bind the viewer to its container pair. Only the first call has any
    /// effect.
    pub fn attach(&mut self, containers: ContainerPair) {
        if !self.alive {
            return;
        }
        if self.viewer.is_some() {
            debug!("Viewer already attached, ignoring new containers");
            return;
        }

        for kind in EventKind::ALL {
            self.subscriptions.push(self.bus.on(kind));
        }

        let mut viewer =
            self.engine
                .create_viewer(&containers, self.config.viewer_options(), self.bus.emitter());
        debug!(
            "Attached {} viewer ({})",
            self.engine.name(),
            self.config.paging_mode.as_str()
        );

        if let Some((_, document)) = &self.document {
            viewer.set_document(Some(document.clone()));
        }

        self.containers = Some(containers);
        self.viewer = Some(viewer);
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.viewer.is_some()
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Window size used when the scroll container cannot be measured
    pub fn set_window_size(&mut self, size: Option<Size>) {
        self.window = size;
    }

    /// Replace the document source. The previous document is destroyed
    /// before the new load is dispatched.
    pub fn set_source(&mut self, source: Source) -> Option<RequestId> {
        if !self.alive {
            return None;
        }

        self.clear_document();
        let id = self.loader.begin(source);
        match id {
            Some(id) => self.outbox.push(ViewerEvent::Loading(id)),
            None => self.outbox.push(ViewerEvent::DocumentReady(0)),
        }
        id
    }

    pub fn set_desired_page(&mut self, page: usize) {
        if !self.alive {
            return;
        }
        self.refresh_live();
        let effects = self.sync.apply(Command::SetDesiredPage(page));
        self.run_effects(effects);
    }

    pub fn set_desired_scale(&mut self, scale: f32) {
        if !self.alive {
            return;
        }
        self.refresh_live();
        let effects = self.sync.apply(Command::SetDesiredScale(scale));
        self.run_effects(effects);
    }

    /// Forward a user scroll to the viewer
    pub fn scroll_by(&mut self, delta: f32) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.scroll_by(delta);
        }
    }

    /// Start computing a scale that fits the current page along `axis`.
    ///
    /// Returns `None` without dispatching when there is no viewer or no
    /// document. The answer arrives as [`ViewerEvent::FitResolved`], unless
    /// the document or page changes first.
    pub fn request_fit(&mut self, axis: FitAxis) -> Option<RequestId> {
        if !self.alive {
            return None;
        }
        let Some(viewer) = self.viewer.as_ref() else {
            debug!("Fit requested before containers were attached");
            return None;
        };
        let (document_id, document) = self.document.as_ref()?;

        let container = self.containers.as_ref().and_then(ContainerPair::viewport_size);
        let params = FitParams {
            axis,
            page: viewer.current_page(),
            available: fit::available_length(
                container,
                self.window,
                self.config.fallback_fraction,
                axis,
            ),
            padding: self.config.fit_padding,
            min_scale: self.config.fit_min_scale,
            max_scale: self.config.fit_max_scale,
        };

        let id = self
            .loader
            .request_fit(*document_id, document.clone(), params)?;
        self.pending_fits.push((id, axis));
        Some(id)
    }

    /// Apply finished work and viewer events, returning what the caller
    /// should hear about.
    pub fn poll(&mut self) -> Vec<ViewerEvent> {
        if !self.alive {
            return vec![];
        }

        for outcome in self.loader.poll() {
            self.handle_outcome(outcome);
        }

        for _ in 0..MAX_DRAIN_ROUNDS {
            let events = self.bus.drain();
            if events.is_empty() {
                break;
            }
            for event in events {
                self.handle_engine_event(event);
            }
        }

        self.schedule_render();
        std::mem::take(&mut self.outbox)
    }

    #[must_use]
    pub fn observed(&self) -> ObservedState {
        self.sync.observed()
    }

    #[must_use]
    pub fn desired(&self) -> DesiredState {
        self.sync.desired()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    /// Last page render that matches what the viewer shows
    #[must_use]
    pub fn rendered(&self) -> Option<RenderedPage> {
        self.rendered
    }

    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.loader.is_rendering()
    }

    #[must_use]
    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.sync.observed().page_count
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.bus.listener_count()
    }

    /// Tear everything down. Listeners go first, then the document, then
    /// the viewer, so nothing is reported while tearing down.
    pub fn unmount(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        debug!("Unmounting viewport controller");

        self.loader.cancel_current();
        self.loader.cancel_fits();
        self.loader.cancel_render();
        self.pending_fits.clear();
        self.render_target = None;
        self.rendered = None;

        for subscription in self.subscriptions.drain(..) {
            self.bus.off(subscription);
        }

        if let Some(viewer) = self.viewer.as_mut() {
            viewer.set_document(None);
        }
        if let Some((_, document)) = self.document.take() {
            document.destroy();
        }
        self.viewer = None;
        self.containers = None;

        let _ = self.bus.drain();
        self.outbox.clear();
        self.loader.shutdown();
        // loads that finished but were never polled
        self.loader.discard_responses();
    }

    fn clear_document(&mut self) {
        self.loader.cancel_fits();
        self.loader.cancel_render();
        self.pending_fits.clear();
        self.render_target = None;
        self.rendered = None;

        if let Some(viewer) = self.viewer.as_mut() {
            viewer.set_document(None);
        }
        if let Some((id, document)) = self.document.take() {
            debug!("Destroying document from load {id:?}");
            document.destroy();
        }

        // anything queued belongs to the old document
        let _ = self.bus.drain();
        let _ = self.sync.apply(Command::DocumentDetached);
    }

    fn handle_outcome(&mut self, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Ready { id, document } => {
                if let Some((old_id, old)) = self.document.take() {
                    warn!("Document from {old_id:?} still live when {id:?} arrived");
                    old.destroy();
                }
                debug!("Document from {id:?} ready with {} pages", document.page_count());

                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.set_document(Some(document.clone()));
                } else {
                    debug!("Containers not attached yet, holding document");
                }
                self.document = Some((id, document));
            }

            LoadOutcome::Failed { id, error } => {
                if error.is_user_visible() {
                    error!("Load {id:?} failed: {error}");
                    self.outbox.push(ViewerEvent::LoadFailed(error));
                }
            }

            LoadOutcome::Fit {
                id,
                document_id,
                params,
                scale,
            } => self.handle_fit(id, document_id, params, scale),

            LoadOutcome::Rendered {
                id,
                document_id,
                page,
            } => {
                let wanted = self.render_target.is_some_and(|(target_doc, target_page, scale)| {
                    target_doc == document_id
                        && target_page == page.page
                        && !scale_differs_by(scale, page.scale, self.config.scale_epsilon)
                });
                if wanted {
                    self.rendered = Some(page);
                } else {
                    debug!("Discarding stale render {id:?} of page {}", page.page);
                }
            }
        }
    }

    /// Bring the synchronizer up to date with the viewer before a request, so
    /// scrolls whose events are still queued are not mistaken for no-ops
    fn refresh_live(&mut self) {
        let Some(viewer) = self.viewer.as_ref() else {
            return;
        };
        let _ = self.sync.apply(Command::ViewerPosition {
            current_page: viewer.current_page(),
            current_scale: viewer.current_scale(),
        });
    }

    /// Render the page the viewer shows, once per page and scale
    fn schedule_render(&mut self) {
        if !self.sync.has_document() {
            return;
        }
        let (Some(viewer), Some((document_id, document))) =
            (self.viewer.as_ref(), self.document.as_ref())
        else {
            return;
        };

        let page = viewer.current_page();
        let scale = viewer.current_scale();
        if page == 0 || !is_valid_scale(scale) {
            return;
        }
        let current = self.render_target.is_some_and(|(target_doc, target_page, target_scale)| {
            target_doc == *document_id
                && target_page == page
                && !scale_differs_by(target_scale, scale, self.config.scale_epsilon)
        });
        if current {
            return;
        }

        let document_id = *document_id;
        let document = document.clone();
        // a newer target supersedes whatever render is in flight
        self.rendered = None;
        self.render_target = Some((document_id, page, scale));
        if self
            .loader
            .request_render(document_id, document, page, scale)
            .is_some()
        {
            debug!("Rendering page {page} at {scale}");
        }
    }

    fn handle_fit(
        &mut self,
        id: RequestId,
        document_id: RequestId,
        params: FitParams,
        scale: Option<f32>,
    ) {
        let Some(pos) = self.pending_fits.iter().position(|(fit_id, _)| *fit_id == id) else {
            return;
        };
        let (_, axis) = self.pending_fits.remove(pos);

        let same_document = self
            .document
            .as_ref()
            .is_some_and(|(current, _)| *current == document_id);
        let same_page = self
            .viewer
            .as_ref()
            .is_some_and(|viewer| viewer.current_page() == params.page);

        if same_document && same_page {
            self.outbox.push(ViewerEvent::FitResolved { id, axis, scale });
        } else {
            debug!("Discarding stale fit {id:?} for page {}", params.page);
        }
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        let command = match event {
            EngineEvent::PagesInit => {
                let Some(viewer) = self.viewer.as_ref() else {
                    return;
                };
                Command::PagesInit {
                    page_count: viewer.pages_count(),
                    current_page: viewer.current_page(),
                    current_scale: viewer.current_scale(),
                }
            }
            // queued events can lag behind later writes; report where the
            // viewer is now, so intermediate values collapse into one change
            EngineEvent::PagesLoaded(count) => Command::ObservePagesLoaded(
                self.viewer.as_ref().map_or(count, |v| v.pages_count()),
            ),
            EngineEvent::PageChanging(page) => {
                Command::ObservePage(self.viewer.as_ref().map_or(page, |v| v.current_page()))
            }
            EngineEvent::ScaleChanging(scale) => {
                Command::ObserveScale(self.viewer.as_ref().map_or(scale, |v| v.current_scale()))
            }
        };

        let effects = self.sync.apply(command);
        self.run_effects(effects);
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ApplyScale(scale) => {
                    if let Some(viewer) = self.viewer.as_mut() {
                        viewer.set_current_scale(scale);
                    }
                }
                Effect::ApplyPage(page) => {
                    if let Some(viewer) = self.viewer.as_mut() {
                        viewer.set_current_page(page);
                    }
                }
                Effect::NotifyDocumentReady(count) => {
                    self.outbox.push(ViewerEvent::DocumentReady(count));
                }
                Effect::NotifyPage(page) => self.outbox.push(ViewerEvent::PageChanged(page)),
                Effect::NotifyScale(scale) => self.outbox.push(ViewerEvent::ScaleChanged(scale)),
            }
        }
    }
}

impl Drop for ViewportController {
    fn drop(&mut self) {
        self.unmount();
    }
}
