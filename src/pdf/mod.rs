//! PDF viewport core

mod cache;
mod cancel;
mod config;
mod controller;
mod engine;
pub mod engines;
mod events;
pub mod fit;
mod loader;
mod request;
mod source;
mod state;
mod surface;
mod types;
mod viewer;
mod worker;
mod zoom;

pub use cache::{CacheKey, PageBoxCache};
pub use cancel::CancelToken;
pub use config::{DEFAULT_LOADER_WORKERS, ViewerConfig};
pub use controller::{ViewerEvent, ViewportController};
pub use engine::{Document, DocumentHandle, EngineError, RenderEngine};
pub use events::{EngineEvent, EventBus, EventEmitter, EventKind, Subscription};
pub use loader::{DocumentLoader, LoadOutcome};
pub use request::{FitParams, LoadError, RequestId};
pub use source::{Fetcher, Source};
pub use state::{Command, Effect, Synchronizer};
pub use surface::{ContainerPair, FixedSurface, Size, Surface};
pub use types::*;
pub use viewer::{DEFAULT_BOX_CACHE_SIZE, PAGE_GAP, PagedViewer, Viewer, ViewerOptions};
pub use zoom::*;
