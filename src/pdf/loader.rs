//! Document loader - owns the worker pool and the pending load token

use std::collections::HashMap;
use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, error, warn};

use super::cancel::CancelToken;
use super::engine::{Document, RenderEngine};
use super::request::{FitParams, LoadError, LoadRequest, LoadResponse, RequestId};
use super::source::Source;
use super::types::RenderedPage;
use super::worker::load_worker;

/// The one open request whose result is still wanted
#[derive(Debug)]
struct PendingLoad {
    id: RequestId,
    cancel: CancelToken,
}

/// Loader results that survived stale-token filtering
#[derive(Debug)]
pub enum LoadOutcome {
    /// Latest request parsed successfully
    Ready { id: RequestId, document: Document },
    /// Latest request failed
    Failed { id: RequestId, error: LoadError },
    /// A fit that is still wanted
    Fit {
        id: RequestId,
        document_id: RequestId,
        params: FitParams,
        scale: Option<f32>,
    },
    /// The page render that is still wanted
    Rendered {
        id: RequestId,
        document_id: RequestId,
        page: RenderedPage,
    },
}

/// Fetches and parses documents on worker threads.
///
/// At most one open request is live: starting a new one cancels the
/// previous token, and any result carrying an older id is destroyed on
/// arrival instead of being reported.
pub struct DocumentLoader {
    request_tx: Sender<LoadRequest>,
    response_rx: Receiver<LoadResponse>,
    next_request_id: u64,
    current: Option<PendingLoad>,
    pending_fits: HashMap<RequestId, CancelToken>,
    current_render: Option<PendingLoad>,
    // outcomes decided without a worker round trip
    undelivered: Vec<LoadOutcome>,
    num_workers: usize,
}

impl DocumentLoader {
    #[must_use]
    pub fn new(engine: Arc<dyn RenderEngine>, num_workers: usize) -> Self {
        // flume gives an MPMC queue: every worker pulls from the same receiver
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let num_workers = num_workers.max(1);
        for idx in 0..num_workers {
            let engine = engine.clone();
            let rx = request_rx.clone();
            let tx = response_tx.clone();

            let spawned = std::thread::Builder::new()
                .name(format!("pdfpane-loader-{idx}"))
                .spawn(move || load_worker(engine, rx, tx));
            if let Err(e) = spawned {
                error!("Failed to spawn loader worker {idx}: {e}");
            }
        }

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            current: None,
            pending_fits: HashMap::new(),
            current_render: None,
            undelivered: vec![],
            num_workers,
        }
    }

    /// Start loading `source`, superseding any load in flight.
    ///
    /// Returns `None` for an empty source: nothing is dispatched. If the
    /// workers are gone the load fails on the next [`poll`](Self::poll).
    pub fn begin(&mut self, source: Source) -> Option<RequestId> {
        self.cancel_current();

        if source.is_empty() {
            return None;
        }

        let id = self.next_id();
        let cancel = CancelToken::new();
        debug!("Starting load {id:?} for {source:?}");

        if self
            .request_tx
            .send(LoadRequest::Open {
                id,
                source,
                cancel: cancel.clone(),
            })
            .is_err()
        {
            error!("Loader workers are gone; load {id:?} dropped");
            self.undelivered.push(LoadOutcome::Failed {
                id,
                error: LoadError::fetch("loader workers are not running"),
            });
            return Some(id);
        }

        self.current = Some(PendingLoad { id, cancel });
        Some(id)
    }

    /// Give up on the load in flight, if any
    pub fn cancel_current(&mut self) {
        if let Some(pending) = self.current.take() {
            debug!("Cancelling load {:?}", pending.id);
            pending.cancel.cancel();
        }
    }

    /// Cancel every outstanding fit query
    pub fn cancel_fits(&mut self) {
        for (_, cancel) in self.pending_fits.drain() {
            cancel.cancel();
        }
    }

    /// Drop the page render in flight, if any
    pub fn cancel_render(&mut self) {
        if let Some(pending) = self.current_render.take() {
            pending.cancel.cancel();
        }
    }

    #[must_use]
    pub fn current_id(&self) -> Option<RequestId> {
        self.current.as_ref().map(|pending| pending.id)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.current.is_some()
    }

    /// Queue a fit computation against `document`
    pub fn request_fit(
        &mut self,
        document_id: RequestId,
        document: Document,
        params: FitParams,
    ) -> Option<RequestId> {
        let id = self.next_id();
        let cancel = CancelToken::new();

        let request = LoadRequest::Fit {
            id,
            document_id,
            document,
            params,
            cancel: cancel.clone(),
        };
        if self.request_tx.send(request).is_err() {
            warn!("Loader workers are gone; fit {id:?} dropped");
            return None;
        }

        self.pending_fits.insert(id, cancel);
        Some(id)
    }

    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.current_render.is_some()
    }

    /// Render `page` of `document`, superseding the render in flight
    pub fn request_render(
        &mut self,
        document_id: RequestId,
        document: Document,
        page: usize,
        scale: f32,
    ) -> Option<RequestId> {
        self.cancel_render();

        let id = self.next_id();
        let cancel = CancelToken::new();
        let request = LoadRequest::Render {
            id,
            document_id,
            document,
            page,
            scale,
            cancel: cancel.clone(),
        };
        if self.request_tx.send(request).is_err() {
            warn!("Loader workers are gone; render {id:?} dropped");
            return None;
        }

        self.current_render = Some(PendingLoad { id, cancel });
        Some(id)
    }

    /// Collect finished work, dropping anything superseded
    pub fn poll(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = std::mem::take(&mut self.undelivered);

        while let Ok(response) = self.response_rx.try_recv() {
            match response {
                LoadResponse::Loaded { id, document } => {
                    if self.current_id() == Some(id) {
                        self.current = None;
                        outcomes.push(LoadOutcome::Ready { id, document });
                    } else {
                        warn!("Discarding stale document from load {id:?}");
                        document.destroy();
                    }
                }

                LoadResponse::Failed { id, error } => {
                    if self.current_id() == Some(id) {
                        self.current = None;
                        outcomes.push(LoadOutcome::Failed { id, error });
                    } else {
                        debug!("Ignoring failure of stale load {id:?}: {error}");
                    }
                }

                LoadResponse::Cancelled(id) => {
                    self.pending_fits.remove(&id);
                    debug!("Request {id:?} cancelled");
                }

                LoadResponse::Rendered {
                    id,
                    document_id,
                    page,
                } => {
                    if self.current_render.as_ref().map(|r| r.id) == Some(id) {
                        self.current_render = None;
                        outcomes.push(LoadOutcome::Rendered {
                            id,
                            document_id,
                            page,
                        });
                    } else {
                        debug!("Dropping stale render {id:?} of page {}", page.page);
                    }
                }

                LoadResponse::RenderFailed { id, detail } => {
                    if self.current_render.as_ref().map(|r| r.id) == Some(id) {
                        self.current_render = None;
                    }
                    warn!("Render {id:?} failed: {detail}");
                }

                LoadResponse::Fit {
                    id,
                    document_id,
                    params,
                    intrinsic,
                    scale,
                } => {
                    if self.pending_fits.remove(&id).is_some() {
                        debug!("Fit {id:?} for page {} of {intrinsic:?}: {scale:?}", params.page);
                        outcomes.push(LoadOutcome::Fit {
                            id,
                            document_id,
                            params,
                            scale,
                        });
                    }
                }
            }
        }

        outcomes
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(LoadRequest::Shutdown);
        }
    }

    /// Throw away every queued response, destroying documents nobody took
    pub fn discard_responses(&mut self) {
        self.undelivered.clear();
        while let Ok(response) = self.response_rx.try_recv() {
            if let LoadResponse::Loaded { id, document } = response {
                debug!("Destroying undelivered document from load {id:?}");
                document.destroy();
            }
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for DocumentLoader {
    fn drop(&mut self) {
        self.cancel_current();
        self.cancel_fits();
        self.cancel_render();
        self.shutdown();
        self.discard_responses();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use super::*;
    use crate::pdf::engine::{DocumentHandle, EngineError};
    use crate::pdf::types::PageBox;

    #[derive(Default)]
    struct Blank {
        destroyed: Arc<AtomicUsize>,
    }

    impl DocumentHandle for Blank {
        fn page_count(&self) -> usize {
            2
        }

        fn page_box(&self, _page: usize, scale: f32) -> Result<PageBox, EngineError> {
            Ok(PageBox::new(10.0, 20.0).scaled(scale))
        }

        fn destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct BlankEngine {
        destroyed: Arc<AtomicUsize>,
    }

    impl RenderEngine for BlankEngine {
        fn name(&self) -> &'static str {
            "blank"
        }

        fn parse(&self, _bytes: &[u8]) -> Result<Box<dyn DocumentHandle>, EngineError> {
            Ok(Box::new(Blank {
                destroyed: self.destroyed.clone(),
            }))
        }
    }

    fn poll_for(loader: &mut DocumentLoader) -> Vec<LoadOutcome> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let outcomes = loader.poll();
            if !outcomes.is_empty() {
                return outcomes;
            }
            assert!(Instant::now() < deadline, "no outcome");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn load_after_workers_exit_fails_instead_of_vanishing() {
        let mut loader = DocumentLoader::new(Arc::new(BlankEngine::default()), 1);
        loader.shutdown();

        let deadline = Instant::now() + Duration::from_secs(5);
        while loader.request_tx.receiver_count() > 0 {
            assert!(Instant::now() < deadline, "worker did not exit");
            std::thread::sleep(Duration::from_millis(2));
        }

        let id = loader.begin(Source::from_bytes(vec![1u8])).unwrap();
        assert!(!loader.is_loading());
        match loader.poll().as_slice() {
            [LoadOutcome::Failed { id: failed, error }] => {
                assert_eq!(*failed, id);
                assert!(matches!(error, LoadError::FetchFailed { .. }));
                assert!(error.is_user_visible());
            }
            other => panic!("unexpected outcomes {other:?}"),
        }
    }

    #[test]
    fn newer_render_supersedes_older() {
        let mut loader = DocumentLoader::new(Arc::new(BlankEngine::default()), 1);
        let document = Document::new(Box::new(Blank::default()));
        let doc_id = RequestId::new(100);

        let first = loader
            .request_render(doc_id, document.clone(), 1, 1.0)
            .unwrap();
        let second = loader.request_render(doc_id, document, 2, 1.0).unwrap();
        assert_ne!(first, second);

        let mut rendered = vec![];
        let deadline = Instant::now() + Duration::from_secs(5);
        while loader.is_rendering() {
            assert!(Instant::now() < deadline, "render never finished");
            rendered.extend(loader.poll());
            std::thread::sleep(Duration::from_millis(2));
        }

        match rendered.as_slice() {
            [LoadOutcome::Rendered { id, page, .. }] => {
                assert_eq!(*id, second);
                assert_eq!(page.page, 2);
            }
            other => panic!("unexpected outcomes {other:?}"),
        }
    }

    #[test]
    fn discarding_responses_destroys_unclaimed_documents() {
        let engine = Arc::new(BlankEngine::default());
        let destroyed = engine.destroyed.clone();
        let mut loader = DocumentLoader::new(engine, 1);
        loader.begin(Source::from_bytes(vec![1u8])).unwrap();
        let outcomes = poll_for(&mut loader);
        let [LoadOutcome::Ready { document, .. }] = outcomes.as_slice() else {
            panic!("unexpected outcomes {outcomes:?}");
        };
        assert!(!document.is_destroyed());

        // a second load finishes but is never polled
        loader.begin(Source::from_bytes(vec![2u8])).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while loader.response_rx.is_empty() {
            assert!(Instant::now() < deadline, "load never finished");
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);
        loader.discard_responses();
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert!(loader.poll().is_empty());
        assert!(!document.is_destroyed());
    }
}
