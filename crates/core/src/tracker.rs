//! Which unit the learner is currently looking at.
//!
//! Geometry stays pure in [`pick_active_unit`]; [`ActiveUnitTracker`] adds the
//! frame coalescing a host needs when it forwards raw scroll/resize events.

/// Activation threshold below the viewport top on wide layouts, in pixels.
pub const WIDE_ACTIVATION_THRESHOLD: f64 = 180.0;
/// Activation threshold below the viewport top on narrow layouts, in pixels.
pub const NARROW_ACTIVATION_THRESHOLD: f64 = 96.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LayoutClass {
    #[default]
    Wide,
    Narrow,
}

impl LayoutClass {
    #[must_use]
    pub fn threshold(self) -> f64 {
        match self {
            LayoutClass::Wide => WIDE_ACTIVATION_THRESHOLD,
            LayoutClass::Narrow => NARROW_ACTIVATION_THRESHOLD,
        }
    }
}

/// Index of the last section whose top is at or above `viewport_top + threshold`.
///
/// Falls back to the first section when none qualifies yet; `None` only when
/// there are no sections at all.
#[must_use]
pub fn pick_active_unit(section_tops: &[f64], viewport_top: f64, threshold: f64) -> Option<usize> {
    if section_tops.is_empty() {
        return None;
    }
    let line = viewport_top + threshold;
    Some(
        section_tops
            .iter()
            .rposition(|top| *top <= line)
            .unwrap_or(0),
    )
}

/// Coalesces scroll/resize notifications into one recomputation per frame.
#[derive(Debug, Clone, Default)]
pub struct ActiveUnitTracker {
    layout: LayoutClass,
    pending: bool,
    active: Option<usize>,
    recomputations: u64,
}

impl ActiveUnitTracker {
    #[must_use]
    pub fn new(layout: LayoutClass) -> Self {
        Self {
            layout,
            pending: true,
            active: None,
            recomputations: 0,
        }
    }

    /// Called for every scroll or resize event.
    pub fn request_recompute(&mut self) {
        self.pending = true;
    }

    /// Switching layout class changes the threshold, so it forces a recompute.
    pub fn set_layout(&mut self, layout: LayoutClass) {
        if self.layout != layout {
            self.layout = layout;
            self.pending = true;
        }
    }

    /// Called once per animation frame. Recomputes only when a request is
    /// pending and returns the new index only when the selection changed.
    pub fn on_animation_frame(&mut self, section_tops: &[f64], viewport_top: f64) -> Option<usize> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        self.recomputations += 1;

        let picked = pick_active_unit(section_tops, viewport_top, self.layout.threshold());
        if picked == self.active {
            return None;
        }
        self.active = picked;
        picked
    }

    #[must_use]
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}
