//! Numeric geometry: aspect-locked sizing, scale anchoring and the
//! rectangle math behind region collision avoidance.

/// Display surface extents, in display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// Axis-aligned rectangle in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Grow the rectangle by `margin` on every side.
    #[must_use]
    pub fn inflate(&self, margin: f32) -> Self {
        Self {
            left: self.left - margin,
            top: self.top - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    /// Overlap test with strict separation: rectangles that merely touch
    /// still count as overlapping.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.right() < other.left
            || self.left > other.right()
            || self.bottom() < other.top
            || self.top > other.bottom())
    }
}

/// Which edge a scale animation grows from, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAnchor {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAnchor {
    Top,
    #[default]
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Anchor {
    pub horizontal: HorizontalAnchor,
    pub vertical: VerticalAnchor,
}

/// Aspect-locked display size for natural pixel dimensions at a fixed
/// target height.
#[must_use]
pub fn target_size(natural_w: u32, natural_h: u32, reference_height: f32) -> (f32, f32) {
    let aspect = natural_w.max(1) as f32 / natural_h.max(1) as f32;
    let height = reference_height.max(1.0);
    (height * aspect, height)
}

/// Pick the anchor so the scaled box stays inside the viewport.
///
/// Scaling is centered by default; when the centered box would cross a
/// viewport edge, growth is pinned to that edge instead so the enlarged
/// frame never clips off-screen. A box too large for the viewport on an
/// axis stays centered, since no edge can save it.
#[must_use]
pub fn anchor_for(rect: &Rect, scale: f32, viewport: &Viewport) -> Anchor {
    let grow_w = (scale - 1.0) * rect.width / 2.0;
    let grow_h = (scale - 1.0) * rect.height / 2.0;

    let horizontal = match (
        rect.left - grow_w < 0.0,
        rect.right() + grow_w > viewport.width,
    ) {
        (true, false) => HorizontalAnchor::Left,
        (false, true) => HorizontalAnchor::Right,
        _ => HorizontalAnchor::Center,
    };
    let vertical = match (
        rect.top - grow_h < 0.0,
        rect.bottom() + grow_h > viewport.height,
    ) {
        (true, false) => VerticalAnchor::Top,
        (false, true) => VerticalAnchor::Bottom,
        _ => VerticalAnchor::Center,
    };

    Anchor {
        horizontal,
        vertical,
    }
}

/// Bounding box of `rect` scaled about the given anchor. This is the
/// animated footprint an enlarging element sweeps, and what regions are
/// reserved against.
#[must_use]
pub fn scaled_rect(rect: &Rect, scale: f32, anchor: Anchor) -> Rect {
    let width = rect.width * scale;
    let height = rect.height * scale;
    let left = match anchor.horizontal {
        HorizontalAnchor::Left => rect.left,
        HorizontalAnchor::Center => rect.left - (width - rect.width) / 2.0,
        HorizontalAnchor::Right => rect.right() - width,
    };
    let top = match anchor.vertical {
        VerticalAnchor::Top => rect.top,
        VerticalAnchor::Center => rect.top - (height - rect.height) / 2.0,
        VerticalAnchor::Bottom => rect.bottom() - height,
    };
    Rect::new(left, top, width, height)
}
