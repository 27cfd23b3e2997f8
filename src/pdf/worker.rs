//! Loader worker - runs in separate thread(s)

use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::cancel::CancelToken;
use super::engine::{Document, RenderEngine};
use super::fit;
use super::request::{FitParams, LoadError, LoadRequest, LoadResponse, RequestId};
use super::source::{Fetcher, Source};

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn load_worker(
    engine: Arc<dyn RenderEngine>,
    requests: Receiver<LoadRequest>,
    responses: Sender<LoadResponse>,
) {
    let mut fetcher = Fetcher::new();

    for request in requests {
        match request {
            LoadRequest::Open { id, source, cancel } => {
                handle_open(engine.as_ref(), &mut fetcher, id, &source, &cancel, &responses);
            }

            LoadRequest::Fit {
                id,
                document_id,
                document,
                params,
                cancel,
            } => {
                handle_fit(id, document_id, document, params, &cancel, &responses);
            }

            LoadRequest::Render {
                id,
                document_id,
                document,
                page,
                scale,
                cancel,
            } => {
                handle_render(id, document_id, document, page, scale, &cancel, &responses);
            }

            LoadRequest::Shutdown => break,
        }
    }
}

fn handle_open(
    engine: &dyn RenderEngine,
    fetcher: &mut Fetcher,
    id: RequestId,
    source: &Source,
    cancel: &CancelToken,
    responses: &Sender<LoadResponse>,
) {
    if cancel.is_cancelled() {
        send_aborted(id, responses);
        return;
    }

    let bytes = match fetcher.read(source) {
        Ok(bytes) => bytes,
        Err(error) => {
            send_failure(id, error, cancel, responses);
            return;
        }
    };

    if cancel.is_cancelled() {
        send_aborted(id, responses);
        return;
    }

    let document = match engine.parse(&bytes) {
        Ok(handle) => Document::new(handle),
        Err(e) => {
            send_failure(id, LoadError::parse(e.to_string()), cancel, responses);
            return;
        }
    };

    if cancel.is_cancelled() {
        debug!("Discarding document for superseded request {id:?}");
        document.destroy();
        send_aborted(id, responses);
        return;
    }

    debug!(
        "Parsed {} pages with {} for request {id:?}",
        document.page_count(),
        engine.name()
    );

    // Receiver gone means the owner was torn down
    if let Err(flume::SendError(LoadResponse::Loaded { document, .. })) =
        responses.send(LoadResponse::Loaded { id, document })
    {
        document.destroy();
    }
}

fn send_aborted(id: RequestId, responses: &Sender<LoadResponse>) {
    let _ = responses.send(LoadResponse::Failed {
        id,
        error: LoadError::Aborted,
    });
}

fn send_failure(
    id: RequestId,
    error: LoadError,
    cancel: &CancelToken,
    responses: &Sender<LoadResponse>,
) {
    let response = if cancel.is_cancelled() {
        LoadResponse::Failed {
            id,
            error: LoadError::Aborted,
        }
    } else {
        warn!("Load {id:?} failed: {error}");
        LoadResponse::Failed { id, error }
    };
    let _ = responses.send(response);
}

fn handle_fit(
    id: RequestId,
    document_id: RequestId,
    document: Document,
    params: FitParams,
    cancel: &CancelToken,
    responses: &Sender<LoadResponse>,
) {
    if cancel.is_cancelled() {
        let _ = responses.send(LoadResponse::Cancelled(id));
        return;
    }

    let intrinsic = match document.page_box(params.page, 1.0) {
        Ok(page_box) => Some(page_box),
        Err(e) => {
            debug!("Fit query for page {} failed: {e}", params.page);
            None
        }
    };
    drop(document);

    let scale = intrinsic.and_then(|page_box| fit::compute(&params, page_box));
    let _ = responses.send(LoadResponse::Fit {
        id,
        document_id,
        params,
        intrinsic,
        scale,
    });
}

fn handle_render(
    id: RequestId,
    document_id: RequestId,
    document: Document,
    page: usize,
    scale: f32,
    cancel: &CancelToken,
    responses: &Sender<LoadResponse>,
) {
    if cancel.is_cancelled() {
        let _ = responses.send(LoadResponse::Cancelled(id));
        return;
    }

    let result = document.render_page(page, scale);
    drop(document);

    // superseded while the engine was busy
    if cancel.is_cancelled() {
        debug!("Dropping render of page {page} for superseded request {id:?}");
        let _ = responses.send(LoadResponse::Cancelled(id));
        return;
    }

    let response = match result {
        Ok(page) => LoadResponse::Rendered {
            id,
            document_id,
            page,
        },
        Err(e) => {
            warn!("Render of page {page} failed: {e}");
            LoadResponse::RenderFailed {
                id,
                detail: e.to_string(),
            }
        }
    };
    let _ = responses.send(response);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::engine::{DocumentHandle, EngineError};
    use crate::pdf::types::PageBox;

    struct Blank;

    impl DocumentHandle for Blank {
        fn page_count(&self) -> usize {
            1
        }

        fn page_box(&self, _page: usize, scale: f32) -> Result<PageBox, EngineError> {
            Ok(PageBox::new(10.0, 20.0).scaled(scale))
        }

        fn destroy(&self) {}
    }

    struct BlankEngine;

    impl RenderEngine for BlankEngine {
        fn name(&self) -> &'static str {
            "blank"
        }

        fn parse(&self, _bytes: &[u8]) -> Result<Box<dyn DocumentHandle>, EngineError> {
            Ok(Box::new(Blank))
        }
    }

    #[test]
    fn superseded_open_reports_aborted() {
        let (tx, rx) = flume::unbounded();
        let cancel = CancelToken::new();
        cancel.cancel();

        let source = Source::from_bytes(vec![1u8]);
        handle_open(&BlankEngine, &mut Fetcher::new(), RequestId(4), &source, &cancel, &tx);

        match rx.try_recv().unwrap() {
            LoadResponse::Failed { id, error } => {
                assert_eq!(id, RequestId(4));
                assert_eq!(error, LoadError::Aborted);
                assert!(!error.is_user_visible());
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn cancelled_render_is_not_delivered() {
        let (tx, rx) = flume::unbounded();
        let cancel = CancelToken::new();
        cancel.cancel();

        let document = Document::new(Box::new(Blank));
        handle_render(RequestId(2), RequestId(1), document, 1, 2.0, &cancel, &tx);
        assert!(matches!(rx.try_recv().unwrap(), LoadResponse::Cancelled(RequestId(2))));
    }

    #[test]
    fn render_reports_page_at_scale() {
        let (tx, rx) = flume::unbounded();
        let document = Document::new(Box::new(Blank));
        handle_render(RequestId(2), RequestId(1), document, 1, 2.0, &CancelToken::new(), &tx);

        match rx.try_recv().unwrap() {
            LoadResponse::Rendered { page, .. } => {
                assert_eq!(page.size, PageBox::new(20.0, 40.0));
                assert_eq!(page.scale, 2.0);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }
}
