//! The wall itself: lanes of elements in display units.
//!
//! Each lane lays its elements out as one contiguous horizontal strip
//! centered on the viewport's horizontal midpoint, so inserting or
//! growing an element near the middle pushes its neighbors outward until
//! they cross a viewport edge. Element `scale` is render emphasis only
//! and never participates in flow layout; the scaled footprint matters
//! only to region reservation, which callers compute separately.
//!
//! All state sits behind one mutex that is never held across an await,
//! so concurrently animating slots can mutate widths and styles freely.

use std::fmt;
use std::sync::Mutex;

use crate::geometry::{Rect, Viewport};
use crate::handles::DisplayHandle;
use crate::item::{Item, ItemId, MediaKind};

/// Identity of one element on the wall, unique for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element-{}", self.0)
    }
}

/// One media element resting in or entering a lane.
#[derive(Debug, Clone)]
pub struct WallElement {
    pub id: ElementId,
    pub item: ItemId,
    pub kind: MediaKind,
    pub handle: Option<DisplayHandle>,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub elevated: bool,
}

impl WallElement {
    /// True when the element carries no transient animation styling.
    #[must_use]
    pub fn is_resting(&self) -> bool {
        self.scale == 1.0 && !self.elevated
    }
}

#[derive(Debug)]
struct SurfaceState {
    lanes: Vec<Vec<WallElement>>,
    next_element: u64,
    error_banner: Option<String>,
}

/// Explicit, shareable display state. Owned by the scheduler and passed
/// by handle to every task that touches the wall.
#[derive(Debug)]
pub struct DisplaySurface {
    viewport: Viewport,
    lane_total: usize,
    state: Mutex<SurfaceState>,
}

impl DisplaySurface {
    #[must_use]
    pub fn new(viewport: Viewport, lanes: usize) -> Self {
        Self {
            viewport,
            lane_total: lanes,
            state: Mutex::new(SurfaceState {
                lanes: (0..lanes).map(|_| Vec::new()).collect(),
                next_element: 0,
                error_banner: None,
            }),
        }
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lane_total
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.state
            .lock()
            .expect("surface poisoned")
            .lanes
            .iter()
            .map(Vec::len)
            .sum()
    }

    /// Append a resting-size element at the end of a lane. Used by the
    /// startup fill, which skips entrance styling entirely.
    pub fn append_resting(
        &self,
        lane: usize,
        item: &Item,
        width: f32,
        height: f32,
    ) -> Option<ElementId> {
        let mut state = self.state.lock().expect("surface poisoned");
        let id = ElementId(state.next_element);
        let element = WallElement {
            id,
            item: item.id.clone(),
            kind: item.kind,
            handle: None,
            width,
            height,
            scale: 1.0,
            elevated: false,
        };
        state.lanes.get_mut(lane)?.push(element);
        state.next_element += 1;
        Some(id)
    }

    /// Insert a zero-width placeholder before `sibling`. Fails when the
    /// sibling has left the lane in the meantime, which the caller
    /// treats as placement contention.
    pub fn place_before(
        &self,
        lane: usize,
        sibling: ElementId,
        item: &Item,
        height: f32,
    ) -> Option<ElementId> {
        let mut state = self.state.lock().expect("surface poisoned");
        let id = ElementId(state.next_element);
        let element = WallElement {
            id,
            item: item.id.clone(),
            kind: item.kind,
            handle: None,
            width: 0.0,
            height,
            scale: 1.0,
            elevated: false,
        };
        let row = state.lanes.get_mut(lane)?;
        let position = row.iter().position(|e| e.id == sibling)?;
        row.insert(position, element);
        state.next_element += 1;
        Some(id)
    }

    /// Remove an element, returning it so the caller can release its
    /// display handle.
    pub fn remove_element(&self, id: ElementId) -> Option<WallElement> {
        let mut state = self.state.lock().expect("surface poisoned");
        let (lane, position) = locate(&state, id)?;
        Some(state.lanes[lane].remove(position))
    }

    pub fn set_width(&self, id: ElementId, width: f32) {
        self.with_element(id, |element| element.width = width.max(0.0));
    }

    pub fn set_scale(&self, id: ElementId, scale: f32) {
        self.with_element(id, |element| element.scale = scale);
    }

    pub fn set_elevated(&self, id: ElementId, elevated: bool) {
        self.with_element(id, |element| element.elevated = elevated);
    }

    pub fn set_handle(&self, id: ElementId, handle: DisplayHandle) {
        self.with_element(id, |element| element.handle = Some(handle));
    }

    /// Strip transient styling, keeping the final layout width.
    pub fn commit_resting(&self, id: ElementId) {
        self.with_element(id, |element| {
            element.scale = 1.0;
            element.elevated = false;
        });
    }

    /// Current layout box of an element; `scale` does not affect it.
    #[must_use]
    pub fn element_rect(&self, id: ElementId) -> Option<Rect> {
        let state = self.state.lock().expect("surface poisoned");
        let (lane, position) = locate(&state, id)?;
        Some(self.layout_rect(&state.lanes[lane], lane, position, None))
    }

    /// The layout box the element would occupy if its width were
    /// `width`, with every neighbor unchanged. Predicts the resting rect
    /// of a placeholder before its entrance animation runs.
    #[must_use]
    pub fn rect_if_width(&self, id: ElementId, width: f32) -> Option<Rect> {
        let state = self.state.lock().expect("surface poisoned");
        let (lane, position) = locate(&state, id)?;
        Some(self.layout_rect(&state.lanes[lane], lane, position, Some(width)))
    }

    /// Sum of element widths in a lane.
    #[must_use]
    pub fn lane_content_width(&self, lane: usize) -> f32 {
        let state = self.state.lock().expect("surface poisoned");
        state
            .lanes
            .get(lane)
            .map(|row| row.iter().map(|e| e.width).sum())
            .unwrap_or(0.0)
    }

    /// Elements whose left edge lies inside the insertion band around
    /// the lane's horizontal center. `band` is the half-width of the
    /// band as a fraction of the viewport width.
    #[must_use]
    pub fn siblings_within_band(&self, lane: usize, band: f32) -> Vec<ElementId> {
        let state = self.state.lock().expect("surface poisoned");
        let Some(row) = state.lanes.get(lane) else {
            return Vec::new();
        };
        let lower = self.viewport.width * (0.5 - band);
        let upper = self.viewport.width * (0.5 + band);
        (0..row.len())
            .filter(|&position| {
                let left = self.layout_rect(row, lane, position, None).left;
                left >= lower && left <= upper
            })
            .map(|position| row[position].id)
            .collect()
    }

    /// Elements of a lane whose layout box lies fully beyond either
    /// viewport edge, excluding the caller's own element.
    #[must_use]
    pub fn fully_off_screen(&self, lane: usize, exclude: ElementId) -> Vec<ElementId> {
        let state = self.state.lock().expect("surface poisoned");
        let Some(row) = state.lanes.get(lane) else {
            return Vec::new();
        };
        (0..row.len())
            .filter(|&position| row[position].id != exclude)
            .filter(|&position| {
                let rect = self.layout_rect(row, lane, position, None);
                rect.right() <= 0.0 || rect.left >= self.viewport.width
            })
            .map(|position| row[position].id)
            .collect()
    }

    /// Clone of a lane's elements in visual order.
    #[must_use]
    pub fn lane_elements(&self, lane: usize) -> Vec<WallElement> {
        let state = self.state.lock().expect("surface poisoned");
        state.lanes.get(lane).cloned().unwrap_or_default()
    }

    /// Blocking error state shown over the whole wall. Once set, slot
    /// workers stop starting new cycles.
    pub fn set_error_banner(&self, message: impl Into<String>) {
        let mut state = self.state.lock().expect("surface poisoned");
        state.error_banner = Some(message.into());
    }

    #[must_use]
    pub fn error_banner(&self) -> Option<String> {
        self.state
            .lock()
            .expect("surface poisoned")
            .error_banner
            .clone()
    }

    fn with_element(&self, id: ElementId, mutate: impl FnOnce(&mut WallElement)) {
        let mut state = self.state.lock().expect("surface poisoned");
        if let Some((lane, position)) = locate(&state, id) {
            mutate(&mut state.lanes[lane][position]);
        }
    }

    fn layout_rect(
        &self,
        row: &[WallElement],
        lane: usize,
        position: usize,
        substitute_width: Option<f32>,
    ) -> Rect {
        let width_of = |index: usize| match substitute_width {
            Some(width) if index == position => width,
            _ => row[index].width,
        };
        let content: f32 = (0..row.len()).map(width_of).sum();
        let start = (self.viewport.width - content) / 2.0;
        let left = start + (0..position).map(width_of).sum::<f32>();
        let lane_height = self.viewport.height / self.lane_total.max(1) as f32;
        let element = &row[position];
        let top = lane as f32 * lane_height + (lane_height - element.height) / 2.0;
        Rect::new(left, top, width_of(position), element.height)
    }
}

fn locate(state: &SurfaceState, id: ElementId) -> Option<(usize, usize)> {
    state.lanes.iter().enumerate().find_map(|(lane, row)| {
        row.iter()
            .position(|element| element.id == id)
            .map(|position| (lane, position))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::HandleRegistry;
    use std::time::SystemTime;

    fn item(id: &str) -> Item {
        Item {
            id: ItemId::from(id),
            kind: MediaKind::Image,
            width: 800,
            height: 600,
            created_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn surface_1200x300() -> DisplaySurface {
        DisplaySurface::new(
            Viewport {
                width: 1200.0,
                height: 300.0,
            },
            1,
        )
    }

    #[test]
    fn centered_strip_starts_at_zero_when_it_fills_the_viewport() {
        let surface = surface_1200x300();
        let ids: Vec<ElementId> = (0..3)
            .map(|n| {
                surface
                    .append_resting(0, &item(&format!("p{n}")), 400.0, 100.0)
                    .unwrap()
            })
            .collect();
        for (n, id) in ids.iter().enumerate() {
            let rect = surface.element_rect(*id).unwrap();
            assert_eq!(rect.left, n as f32 * 400.0);
            assert_eq!(rect.top, 100.0);
            assert_eq!(rect.width, 400.0);
        }
        assert_eq!(surface.lane_content_width(0), 1200.0);
    }

    #[test]
    fn lane_rows_stack_vertically() {
        let surface = DisplaySurface::new(
            Viewport {
                width: 1920.0,
                height: 1080.0,
            },
            3,
        );
        let id = surface.append_resting(1, &item("mid"), 288.0, 216.0).unwrap();
        let rect = surface.element_rect(id).unwrap();
        assert_eq!(rect.top, 360.0 + (360.0 - 216.0) / 2.0);
    }

    #[test]
    fn growing_an_insertion_recenters_the_strip() {
        let surface = surface_1200x300();
        let first = surface.append_resting(0, &item("a"), 400.0, 100.0).unwrap();
        let middle = surface.append_resting(0, &item("b"), 400.0, 100.0).unwrap();
        surface.append_resting(0, &item("c"), 400.0, 100.0).unwrap();

        let placed = surface
            .place_before(0, middle, &item("new"), 100.0)
            .unwrap();
        // Zero width: nothing moves yet.
        assert_eq!(surface.element_rect(first).unwrap().left, 0.0);

        surface.set_width(placed, 100.0);
        assert_eq!(surface.element_rect(first).unwrap().left, -50.0);
        assert_eq!(surface.element_rect(placed).unwrap().left, 350.0);
    }

    #[test]
    fn place_before_a_departed_sibling_fails_softly() {
        let surface = surface_1200x300();
        let gone = surface.append_resting(0, &item("a"), 400.0, 100.0).unwrap();
        surface.remove_element(gone);
        assert!(surface.place_before(0, gone, &item("b"), 100.0).is_none());
    }

    #[test]
    fn rect_if_width_predicts_without_mutating() {
        let surface = surface_1200x300();
        let anchor = surface.append_resting(0, &item("a"), 400.0, 100.0).unwrap();
        let placed = surface
            .place_before(0, anchor, &item("b"), 100.0)
            .unwrap();

        let predicted = surface.rect_if_width(placed, 300.0).unwrap();
        assert_eq!(predicted.width, 300.0);
        assert_eq!(predicted.left, (1200.0 - 700.0) / 2.0);
        // The element itself is still a zero-width placeholder.
        assert_eq!(surface.element_rect(placed).unwrap().width, 0.0);
    }

    #[test]
    fn band_candidates_have_central_left_edges() {
        let surface = surface_1200x300();
        let ids: Vec<ElementId> = ["a", "b", "c"]
            .iter()
            .map(|name| surface.append_resting(0, &item(name), 400.0, 100.0).unwrap())
            .collect();
        // Left edges 0, 400, 800; band 0.25 covers [300, 900].
        let candidates = surface.siblings_within_band(0, 0.25);
        assert_eq!(candidates, vec![ids[1], ids[2]]);
    }

    #[test]
    fn off_screen_scan_excludes_the_caller() {
        let surface = surface_1200x300();
        let ids: Vec<ElementId> = (0..5)
            .map(|n| {
                surface
                    .append_resting(0, &item(&format!("p{n}")), 500.0, 100.0)
                    .unwrap()
            })
            .collect();
        // Strip spans [-650, 1850]: the first ends at -150, the last
        // starts at 1350; both fully outside the viewport.
        let evictable = surface.fully_off_screen(0, ids[4]);
        assert_eq!(evictable, vec![ids[0]]);
        let evictable = surface.fully_off_screen(0, ids[2]);
        assert_eq!(evictable, vec![ids[0], ids[4]]);
    }

    #[test]
    fn commit_resting_strips_transient_styling() {
        let surface = surface_1200x300();
        let id = surface.append_resting(0, &item("a"), 400.0, 100.0).unwrap();
        surface.set_scale(id, 1.5);
        surface.set_elevated(id, true);
        assert!(!surface.lane_elements(0)[0].is_resting());

        surface.commit_resting(id);
        let element = &surface.lane_elements(0)[0];
        assert!(element.is_resting());
        assert_eq!(element.width, 400.0);
    }

    #[test]
    fn remove_returns_the_element_with_its_handle() {
        let registry = HandleRegistry::new();
        let surface = surface_1200x300();
        let id = surface.append_resting(0, &item("a"), 400.0, 100.0).unwrap();
        surface.set_handle(id, registry.bind(vec![1, 2, 3]));

        let removed = surface.remove_element(id).unwrap();
        assert!(removed.handle.is_some());
        assert_eq!(surface.element_count(), 0);
    }

    #[test]
    fn error_banner_blocks_visibly() {
        let surface = surface_1200x300();
        assert!(surface.error_banner().is_none());
        surface.set_error_banner("update feed lost");
        assert_eq!(surface.error_banner().unwrap(), "update feed lost");
    }
}
