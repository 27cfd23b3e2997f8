//! Desired/observed state reconciliation
//!
//! The caller states where it wants the viewer (page, scale); the viewer
//! reports where it is. Commands go in, effects come out: viewer writes are
//! only issued when the live value actually differs, and notifications only
//! when the reported value changes, so the two sides cannot ping-pong.

use super::types::{
    DesiredState, ObservedState, SCALE_EPSILON, clamp_page, is_valid_scale, scale_differs_by,
};

#[derive(Clone, Debug)]
pub struct Synchronizer {
    desired: DesiredState,
    epsilon: f32,
    /// What the viewer holds right now, including our own pending writes
    live: ObservedState,
    /// What was last reported upward
    reported: ObservedState,
    has_document: bool,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new(DesiredState::default())
    }
}

impl Synchronizer {
    #[must_use]
    pub fn new(desired: DesiredState) -> Self {
        Self::with_epsilon(desired, SCALE_EPSILON)
    }

    /// Synchronizer treating scales within `epsilon` as equal
    #[must_use]
    pub fn with_epsilon(desired: DesiredState, epsilon: f32) -> Self {
        Self {
            desired,
            epsilon: if epsilon.is_finite() && epsilon >= 0.0 {
                epsilon
            } else {
                SCALE_EPSILON
            },
            live: ObservedState::default(),
            reported: ObservedState::default(),
            has_document: false,
        }
    }

    fn differs(&self, a: f32, b: f32) -> bool {
        scale_differs_by(a, b, self.epsilon)
    }

    #[must_use]
    pub fn desired(&self) -> DesiredState {
        self.desired
    }

    /// Last state reported to the caller
    #[must_use]
    pub fn observed(&self) -> ObservedState {
        self.reported
    }

    #[must_use]
    pub fn has_document(&self) -> bool {
        self.has_document
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::SetDesiredPage(page) => {
                self.desired.page = page;
                if !self.has_document {
                    return vec![];
                }
                match clamp_page(page, self.live.page_count) {
                    Some(clamped) if clamped != self.live.current_page => {
                        self.live.current_page = clamped;
                        vec![Effect::ApplyPage(clamped)]
                    }
                    _ => vec![],
                }
            }

            Command::SetDesiredScale(scale) => {
                if !is_valid_scale(scale) {
                    return vec![];
                }
                self.desired.scale = scale;
                if self.has_document && self.differs(scale, self.live.current_scale) {
                    self.live.current_scale = scale;
                    vec![Effect::ApplyScale(scale)]
                } else {
                    vec![]
                }
            }

            Command::ViewerPosition {
                current_page,
                current_scale,
            } => {
                if self.has_document {
                    self.live.current_page = current_page;
                    if is_valid_scale(current_scale) {
                        self.live.current_scale = current_scale;
                    }
                }
                vec![]
            }

            Command::DocumentDetached => {
                self.has_document = false;
                self.live.page_count = 0;
                self.live.current_page = 0;
                self.reported.page_count = 0;
                self.reported.current_page = 0;
                vec![]
            }

            Command::PagesInit {
                page_count,
                current_page,
                current_scale,
            } => {
                self.has_document = true;
                self.live = ObservedState {
                    page_count,
                    current_page,
                    current_scale,
                };

                let mut effects = vec![];
                // scale first: page positions depend on it in continuous mode
                if is_valid_scale(self.desired.scale)
                    && self.differs(self.desired.scale, self.live.current_scale)
                {
                    self.live.current_scale = self.desired.scale;
                    effects.push(Effect::ApplyScale(self.desired.scale));
                }
                if let Some(page) = clamp_page(self.desired.page, page_count) {
                    if page != self.live.current_page {
                        self.live.current_page = page;
                        effects.push(Effect::ApplyPage(page));
                    }
                }

                self.reported = self.live;
                effects.push(Effect::NotifyDocumentReady(page_count));
                effects.push(Effect::NotifyPage(self.live.current_page.max(1)));
                effects.push(Effect::NotifyScale(self.live.current_scale));
                effects
            }

            Command::ObservePagesLoaded(page_count) => {
                self.live.page_count = page_count;
                if self.reported.page_count == page_count {
                    return vec![];
                }
                self.reported.page_count = page_count;
                vec![Effect::NotifyDocumentReady(page_count)]
            }

            Command::ObservePage(page) => {
                self.live.current_page = page;
                if self.reported.current_page == page {
                    return vec![];
                }
                self.reported.current_page = page;
                vec![Effect::NotifyPage(page)]
            }

            Command::ObserveScale(scale) => {
                if !is_valid_scale(scale) {
                    return vec![];
                }
                self.live.current_scale = scale;
                if !self.differs(scale, self.reported.current_scale) {
                    return vec![];
                }
                self.reported.current_scale = scale;
                vec![Effect::NotifyScale(scale)]
            }
        }
    }
}

/// Inputs to the synchronizer
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Caller wants this page (1-indexed, unclamped)
    SetDesiredPage(usize),
    /// Caller wants this scale
    SetDesiredScale(f32),
    /// Where the viewer is right now, ahead of any queued events
    ViewerPosition {
        current_page: usize,
        current_scale: f32,
    },
    /// The viewer no longer shows a document
    DocumentDetached,
    /// The viewer laid out a new document; carries its initial state
    PagesInit {
        page_count: usize,
        current_page: usize,
        current_scale: f32,
    },
    /// The viewer finished measuring pages
    ObservePagesLoaded(usize),
    /// The viewer moved to a page
    ObservePage(usize),
    /// The viewer changed scale
    ObserveScale(f32),
}

/// Effects produced by state changes
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    /// Write a scale into the viewer
    ApplyScale(f32),
    /// Write a page into the viewer
    ApplyPage(usize),
    /// Tell the caller how many pages the document has
    NotifyDocumentReady(usize),
    /// Tell the caller the current page
    NotifyPage(usize),
    /// Tell the caller the current scale
    NotifyScale(f32),
}
