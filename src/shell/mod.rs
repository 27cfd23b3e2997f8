//! Toolbar state around a [`ViewportController`]
//!
//! Keeps the committed page and zoom, the uncommitted text of the two
//! numeric inputs, and the status line (loading, error, labels).

mod input;

use std::sync::Arc;

use log::{debug, error};

use crate::pdf::{
    ContainerPair, FitAxis, RenderEngine, RequestId, Size, Source, ViewerConfig, ViewerEvent,
    ViewportController, Zoom, clamp_percent, scale_differs_by,
};

pub use input::{NumericInput, parse_float_prefix, parse_int_prefix};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileCheckError {
    #[error("Please upload a file first.")]
    Missing,

    #[error("The selected file is not a PDF.")]
    NotPdf,
}

/// Accept only file names with a `.pdf` extension (any case)
pub fn ensure_pdf(name: Option<&str>) -> Result<(), FileCheckError> {
    let name = name.ok_or(FileCheckError::Missing)?;
    match name.rsplit_once('.') {
        Some((_, ext)) if ext.eq_ignore_ascii_case("pdf") => Ok(()),
        _ => Err(FileCheckError::NotPdf),
    }
}

/// Human-readable byte size: "0 B" style below 1 KB, one decimal below
/// 10 units, whole numbers above. Empty for zero.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return String::new();
    }

    let mut value = bytes as f64;
    let mut exponent = 0;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }

    if value >= 10.0 || exponent == 0 {
        format!("{value:.0} {}", UNITS[exponent])
    } else {
        format!("{value:.1} {}", UNITS[exponent])
    }
}

pub struct PdfViewerBlock {
    controller: ViewportController,
    zoom: Zoom,
    scale_epsilon: f32,
    page: usize,
    total_pages: usize,
    scale_input: NumericInput,
    page_input: NumericInput,
    error: Option<String>,
    filename: Option<String>,
    file_size: Option<String>,
}

impl PdfViewerBlock {
    #[must_use]
    pub fn new(engine: Arc<dyn RenderEngine>, config: ViewerConfig) -> Self {
        let zoom = Zoom::new(config.zoom);
        let mut controller = ViewportController::new(engine, config);
        controller.set_desired_scale(zoom.factor());
        controller.set_desired_page(1);

        Self {
            controller,
            zoom,
            scale_epsilon: config.scale_epsilon,
            page: 1,
            total_pages: 0,
            scale_input: NumericInput::new(zoom.percent().to_string()),
            page_input: NumericInput::new("1"),
            error: None,
            filename: None,
            file_size: None,
        }
    }

    pub fn attach(&mut self, containers: ContainerPair) {
        self.controller.attach(containers);
    }

    pub fn set_window_size(&mut self, size: Option<Size>) {
        self.controller.set_window_size(size);
    }

    /// Show a new document. An empty source clears the view and reports
    /// that nothing was provided.
    pub fn open(
        &mut self,
        source: Source,
        filename: Option<String>,
        file_size: Option<String>,
    ) -> Option<RequestId> {
        self.filename = filename;
        self.file_size = file_size;

        if source.is_empty() {
            self.error = Some("No document provided.".to_string());
        } else {
            self.error = None;
        }
        self.controller.set_source(source)
    }

    /// Pump the controller and fold its events into toolbar state. The
    /// events are returned for callers that want them too.
    pub fn poll(&mut self) -> Vec<ViewerEvent> {
        let events = self.controller.poll();
        for event in &events {
            self.handle_event(event);
        }
        events
    }

    fn handle_event(&mut self, event: &ViewerEvent) {
        match event {
            ViewerEvent::Loading(id) => debug!("Waiting for load {id:?}"),

            ViewerEvent::DocumentReady(count) => {
                self.total_pages = *count;
                let next = if *count == 0 {
                    1
                } else {
                    self.page.clamp(1, *count)
                };
                self.set_page(next);
            }

            ViewerEvent::PageChanged(page) => self.set_page(*page),

            ViewerEvent::ScaleChanged(scale) => {
                if scale_differs_by(self.zoom.factor(), *scale, self.scale_epsilon) {
                    self.apply_scale(*scale);
                }
            }

            ViewerEvent::LoadFailed(e) => {
                error!("Failed to prepare PDF viewer: {e}");
                self.error = Some(e.to_string());
                self.total_pages = 0;
            }

            ViewerEvent::FitResolved { axis, scale, .. } => match scale {
                Some(scale) if scale.is_finite() => self.apply_scale(*scale),
                _ => debug!("Fit to {axis:?} left scale unchanged"),
            },
        }
    }

    fn set_page(&mut self, page: usize) {
        self.page = page;
        self.page_input.set_text(page.to_string());
        self.controller.set_desired_page(page);
    }

    fn apply_scale(&mut self, scale: f32) {
        if self.zoom.set(scale) {
            self.controller.set_desired_scale(self.zoom.factor());
        }
        self.scale_input.set_text(self.zoom.percent().to_string());
    }

    fn sync_zoom(&mut self) {
        let factor = self.zoom.factor();
        self.apply_scale(factor);
    }

    pub fn zoom_in(&mut self) {
        self.zoom.step_in();
        self.sync_zoom();
    }

    pub fn zoom_out(&mut self) {
        self.zoom.step_out();
        self.sync_zoom();
    }

    #[must_use]
    pub fn can_zoom_in(&self) -> bool {
        self.zoom.can_step_in()
    }

    #[must_use]
    pub fn can_zoom_out(&self) -> bool {
        self.zoom.can_step_out()
    }

    pub fn reset_zoom(&mut self) {
        self.zoom.reset();
        self.sync_zoom();
    }

    /// Typing in the zoom field: keep the text, apply it if it parses
    pub fn edit_scale_input(&mut self, text: &str) {
        self.scale_input.set_text(text);
        if let Some(percent) = self.scale_input.as_float() {
            let clamped = clamp_percent(percent as f32);
            if self.zoom.set(clamped / 100.0) {
                self.controller.set_desired_scale(self.zoom.factor());
            }
        }
    }

    /// Enter or blur on the zoom field
    pub fn commit_scale_input(&mut self) {
        match self.scale_input.as_float() {
            Some(percent) => {
                let clamped = clamp_percent(percent as f32);
                self.apply_scale(clamped / 100.0);
            }
            None => self.revert_scale_input(),
        }
    }

    /// Escape on the zoom field
    pub fn revert_scale_input(&mut self) {
        self.scale_input.set_text(self.zoom.percent().to_string());
    }

    /// Typing in the page field: jump only when the text parses and a
    /// page count is known
    pub fn edit_page_input(&mut self, text: &str) {
        self.page_input.set_text(text);
        let Some(requested) = self.page_input.as_int() else {
            return;
        };
        if self.total_pages == 0 {
            return;
        }

        let clamped = clamp_page_number(requested, self.total_pages);
        if clamped != self.page {
            self.page = clamped;
            self.controller.set_desired_page(clamped);
        }
    }

    /// Enter or blur on the page field
    pub fn commit_page_input(&mut self) {
        match self.page_input.as_int() {
            Some(requested) => {
                let clamped = clamp_page_number(requested, self.total_pages.max(1));
                self.set_page(clamped);
            }
            None => self.revert_page_input(),
        }
    }

    /// Escape on the page field
    pub fn revert_page_input(&mut self) {
        self.page_input.set_text(self.page.to_string());
    }

    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.set_page(self.page - 1);
        }
    }

    pub fn next_page(&mut self) {
        if self.total_pages > 0 && self.page < self.total_pages {
            self.set_page(self.page + 1);
        }
    }

    #[must_use]
    pub fn can_go_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn can_go_next(&self) -> bool {
        self.total_pages > 0 && self.page < self.total_pages
    }

    pub fn fit_height(&mut self) -> Option<RequestId> {
        self.controller.request_fit(FitAxis::Height)
    }

    pub fn fit_width(&mut self) -> Option<RequestId> {
        self.controller.request_fit(FitAxis::Width)
    }

    pub fn scroll_by(&mut self, delta: f32) {
        self.controller.scroll_by(delta);
    }

    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.zoom.factor()
    }

    #[must_use]
    pub fn scale_text(&self) -> &str {
        self.scale_input.text()
    }

    #[must_use]
    pub fn page_text(&self) -> &str {
        self.page_input.text()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// "name (size)", or whichever part is known
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.filename, &self.file_size) {
            (Some(name), Some(size)) => format!("{name} ({size})"),
            (Some(name), None) => name.clone(),
            (None, Some(size)) => size.clone(),
            (None, None) => "PDF document".to_string(),
        }
    }

    /// "N page(s)" once a page count is known
    #[must_use]
    pub fn page_label(&self) -> Option<String> {
        match self.total_pages {
            0 => None,
            1 => Some("1 page".to_string()),
            n => Some(format!("{n} pages")),
        }
    }

    #[must_use]
    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    pub fn unmount(&mut self) {
        self.controller.unmount();
    }
}

fn clamp_page_number(requested: i64, upper: usize) -> usize {
    usize::try_from(requested.max(1)).map_or(upper, |page| page.min(upper))
}
