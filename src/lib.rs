pub mod panic_handler;
pub mod pdf;
pub mod settings;
pub mod shell;

pub use pdf::{
    ContainerPair, FitAxis, PagingMode, RenderEngine, Source, ViewerConfig, ViewerEvent,
    ViewportController,
};
pub use shell::PdfViewerBlock;
