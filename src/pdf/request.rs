//! Loader request and response types

use super::cancel::CancelToken;
use super::engine::Document;
use super::source::Source;
use super::types::{FitAxis, PageBox, RenderedPage};

/// Unique, monotonically increasing identifier for loader requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Inputs of a fit computation, captured when the fit was requested
#[derive(Clone, Copy, Debug)]
pub struct FitParams {
    pub axis: FitAxis,
    /// 1-indexed page the fit targets
    pub page: usize,
    /// Available length along `axis`, `None` when nothing could be measured
    pub available: Option<f32>,
    pub padding: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

/// Request sent to loader workers
pub enum LoadRequest {
    /// Fetch (if needed) and parse a source
    Open {
        id: RequestId,
        source: Source,
        cancel: CancelToken,
    },

    /// Compute a fit scale for a page of a loaded document
    Fit {
        id: RequestId,
        document_id: RequestId,
        document: Document,
        params: FitParams,
        cancel: CancelToken,
    },

    /// Render one page of a loaded document
    Render {
        id: RequestId,
        document_id: RequestId,
        document: Document,
        page: usize,
        scale: f32,
        cancel: CancelToken,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Errors surfaced by a load
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Superseded by a newer load or by teardown; never shown to the user
    #[error("load aborted")]
    Aborted,

    #[error("Unable to load PDF: {detail}")]
    FetchFailed { detail: String },

    #[error("Unable to render PDF: {detail}")]
    ParseFailed { detail: String },
}

impl LoadError {
    pub fn fetch(detail: impl Into<String>) -> Self {
        Self::FetchFailed {
            detail: detail.into(),
        }
    }

    pub fn parse(detail: impl Into<String>) -> Self {
        Self::ParseFailed {
            detail: detail.into(),
        }
    }

    /// Whether the error should reach the user
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::Aborted)
    }
}

/// Response from loader workers
pub enum LoadResponse {
    /// Document parsed and ready to attach
    Loaded { id: RequestId, document: Document },

    /// Load failed
    Failed { id: RequestId, error: LoadError },

    /// Fit or render request was cancelled before it finished
    Cancelled(RequestId),

    /// Page rendered for the current render request
    Rendered {
        id: RequestId,
        document_id: RequestId,
        page: RenderedPage,
    },

    /// The engine could not render the page
    RenderFailed { id: RequestId, detail: String },

    /// Fit computed; `scale` is `None` when no sensible fit exists
    Fit {
        id: RequestId,
        document_id: RequestId,
        params: FitParams,
        intrinsic: Option<PageBox>,
        scale: Option<f32>,
    },
}

impl std::fmt::Debug for LoadResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded { id, document } => f
                .debug_struct("Loaded")
                .field("id", id)
                .field("pages", &document.page_count())
                .finish(),
            Self::Failed { id, error } => f
                .debug_struct("Failed")
                .field("id", id)
                .field("error", error)
                .finish(),
            Self::Cancelled(id) => f.debug_tuple("Cancelled").field(id).finish(),
            Self::Rendered { id, page, .. } => f
                .debug_struct("Rendered")
                .field("id", id)
                .field("page", page)
                .finish_non_exhaustive(),
            Self::RenderFailed { id, detail } => f
                .debug_struct("RenderFailed")
                .field("id", id)
                .field("detail", detail)
                .finish(),
            Self::Fit {
                id,
                document_id,
                scale,
                ..
            } => f
                .debug_struct("Fit")
                .field("id", id)
                .field("document_id", document_id)
                .field("scale", scale)
                .finish_non_exhaustive(),
        }
    }
}
