//! Shape-based selection tools: rectangle, lasso, polygon, and fuzzy
//! (color-based) selection. All four produce a fresh mask and merge it into
//! the existing selection via the modifier-implied combine mode.

use egui::{Pos2, Rect};

use super::{PointerInput, ToolEvent, selection_commit, selection_mode};
use crate::compositor;
use crate::fill::{self, SampleScope};
use crate::mask::SelectionMask;
use crate::project::ProjectState;
use crate::text::FontStore;

/// Rasterize an axis-aligned rectangle: a pixel is selected when its centre
/// lies inside the rect.
pub fn rect_mask(width: u32, height: u32, rect: Rect) -> SelectionMask {
    let mut mask = SelectionMask::empty(width, height);
    let x0 = (rect.min.x - 0.5).ceil().max(0.0) as u32;
    let y0 = (rect.min.y - 0.5).ceil().max(0.0) as u32;
    let x1 = ((rect.max.x - 0.5).floor() as i64 + 1).clamp(0, width as i64) as u32;
    let y1 = ((rect.max.y - 0.5).floor() as i64 + 1).clamp(0, height as i64) as u32;
    for y in y0..y1 {
        for x in x0..x1 {
            mask.set(x, y, 255);
        }
    }
    mask
}

/// Scanline-rasterize a closed polygon (the closing edge last→first is
/// implicit). Pixel-centre rule on both axes, matching [`rect_mask`].
pub fn polygon_mask(width: u32, height: u32, points: &[Pos2]) -> SelectionMask {
    let mut mask = SelectionMask::empty(width, height);
    let n = points.len();
    if n < 3 {
        return mask;
    }

    for y in 0..height {
        let yf = y as f32 + 0.5;
        // Intersection x-coords of the scanline with polygon edges.
        let mut nodes: Vec<f32> = Vec::new();
        for i in 0..n {
            let j = (i + 1) % n;
            let yi = points[i].y;
            let yj = points[j].y;
            if (yi < yf && yj >= yf) || (yj < yf && yi >= yf) {
                let t = (yf - yi) / (yj - yi);
                nodes.push(points[i].x + t * (points[j].x - points[i].x));
            }
        }
        nodes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut k = 0;
        while k + 1 < nodes.len() {
            let x0 = (nodes[k] - 0.5).ceil().max(0.0) as i64;
            let x1 = (nodes[k + 1] - 0.5).floor() as i64 + 1;
            for x in x0..x1.min(width as i64) {
                mask.set(x as u32, y, 255);
            }
            k += 2;
        }
    }
    mask
}

// ============================================================================
// RECTANGLE SELECT
// ============================================================================

#[derive(Debug, Clone)]
enum RectState {
    Idle,
    Dragging { start: Pos2, current: Pos2 },
}

/// Drag out an axis-aligned marquee. A zero-size rectangle never commits.
pub struct RectangleSelectTool {
    state: RectState,
}

impl Default for RectangleSelectTool {
    fn default() -> Self {
        Self::new()
    }
}

impl RectangleSelectTool {
    pub fn new() -> Self {
        Self {
            state: RectState::Idle,
        }
    }

    pub fn pointer_down(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        self.state = RectState::Dragging {
            start: input.pos,
            current: input.pos,
        };
        Vec::new()
    }

    pub fn pointer_move(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        if let RectState::Dragging { current, .. } = &mut self.state {
            *current = input.pos;
        }
        Vec::new()
    }

    pub fn pointer_up(&mut self, input: PointerInput, project: &ProjectState) -> Vec<ToolEvent> {
        let RectState::Dragging { start, .. } = self.state else {
            return Vec::new();
        };
        self.state = RectState::Idle;

        let rect = Rect::from_two_pos(start, input.pos);
        if rect.width() < 1.0 || rect.height() < 1.0 {
            // Below the commit threshold — same as a cancel.
            return Vec::new();
        }
        let mask = rect_mask(project.width(), project.height(), rect);
        vec![ToolEvent::Commit(selection_commit(
            project,
            mask,
            selection_mode(&input.modifiers),
        ))]
    }

    pub fn cancel(&mut self) {
        self.state = RectState::Idle;
    }

    /// Marquee rect for overlay drawing while dragging.
    pub fn preview_rect(&self) -> Option<Rect> {
        match self.state {
            RectState::Dragging { start, current } => Some(Rect::from_two_pos(start, current)),
            RectState::Idle => None,
        }
    }
}

// ============================================================================
// LASSO SELECT
// ============================================================================

#[derive(Debug, Clone)]
enum LassoState {
    Idle,
    Dragging { points: Vec<Pos2> },
}

/// Freehand outline; the path closes itself on release.
pub struct LassoTool {
    state: LassoState,
}

impl Default for LassoTool {
    fn default() -> Self {
        Self::new()
    }
}

impl LassoTool {
    pub fn new() -> Self {
        Self {
            state: LassoState::Idle,
        }
    }

    pub fn pointer_down(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        self.state = LassoState::Dragging {
            points: vec![input.pos],
        };
        Vec::new()
    }

    pub fn pointer_move(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        if let LassoState::Dragging { points } = &mut self.state {
            // Skip sub-pixel jitter to keep the outline small.
            if points
                .last()
                .is_none_or(|last| (*last - input.pos).length() >= 0.5)
            {
                points.push(input.pos);
            }
        }
        Vec::new()
    }

    pub fn pointer_up(&mut self, input: PointerInput, project: &ProjectState) -> Vec<ToolEvent> {
        let LassoState::Dragging { points } = std::mem::replace(&mut self.state, LassoState::Idle)
        else {
            return Vec::new();
        };
        if points.len() < 3 {
            return Vec::new();
        }
        let mask = polygon_mask(project.width(), project.height(), &points);
        vec![ToolEvent::Commit(selection_commit(
            project,
            mask,
            selection_mode(&input.modifiers),
        ))]
    }

    pub fn cancel(&mut self) {
        self.state = LassoState::Idle;
    }
}

// ============================================================================
// POLYGON SELECT
// ============================================================================

#[derive(Debug, Clone)]
enum PolygonState {
    Idle,
    Placing { points: Vec<Pos2> },
}

/// Click to place vertices; the host closes the shape (double-click or
/// Enter) via [`PolygonSelectTool::finish`]. Fewer than three points cancel.
pub struct PolygonSelectTool {
    state: PolygonState,
}

impl Default for PolygonSelectTool {
    fn default() -> Self {
        Self::new()
    }
}

impl PolygonSelectTool {
    pub fn new() -> Self {
        Self {
            state: PolygonState::Idle,
        }
    }

    pub fn pointer_down(&mut self, input: PointerInput) -> Vec<ToolEvent> {
        match &mut self.state {
            PolygonState::Idle => {
                self.state = PolygonState::Placing {
                    points: vec![input.pos],
                };
            }
            PolygonState::Placing { points } => points.push(input.pos),
        }
        Vec::new()
    }

    pub fn finish(&mut self, input: PointerInput, project: &ProjectState) -> Vec<ToolEvent> {
        let PolygonState::Placing { points } = std::mem::replace(&mut self.state, PolygonState::Idle)
        else {
            return Vec::new();
        };
        if points.len() < 3 {
            return Vec::new();
        }
        let mask = polygon_mask(project.width(), project.height(), &points);
        vec![ToolEvent::Commit(selection_commit(
            project,
            mask,
            selection_mode(&input.modifiers),
        ))]
    }

    pub fn cancel(&mut self) {
        self.state = PolygonState::Idle;
    }

    pub fn point_count(&self) -> usize {
        match &self.state {
            PolygonState::Idle => 0,
            PolygonState::Placing { points } => points.len(),
        }
    }
}

// ============================================================================
// FUZZY (COLOR) SELECT
// ============================================================================

#[derive(Debug, Clone)]
enum FuzzyState {
    Idle,
    Pending { pos: Pos2 },
}

/// Click-to-select by color similarity: contiguous flood fill or a whole-
/// canvas scan, per project settings.
pub struct FuzzySelectTool {
    state: FuzzyState,
}

impl Default for FuzzySelectTool {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzySelectTool {
    pub fn new() -> Self {
        Self {
            state: FuzzyState::Idle,
        }
    }

    pub fn pointer_down(&mut self, input: PointerInput, project: &ProjectState) -> Vec<ToolEvent> {
        if project.metadata.settings.sample_scope == SampleScope::ActiveLayer
            && project.active().is_none()
        {
            return vec![ToolEvent::Warning("No active layer".to_string())];
        }
        self.state = FuzzyState::Pending { pos: input.pos };
        Vec::new()
    }

    pub fn pointer_up(
        &mut self,
        input: PointerInput,
        project: &ProjectState,
        fonts: &FontStore,
    ) -> Vec<ToolEvent> {
        let FuzzyState::Pending { pos } = std::mem::replace(&mut self.state, FuzzyState::Idle)
        else {
            return Vec::new();
        };

        let settings = &project.metadata.settings;
        let source = match settings.sample_scope {
            SampleScope::ActiveLayer => match project.active_layer {
                Some(id) => compositor::render_layer_alone(project, id, fonts),
                None => return vec![ToolEvent::Warning("No active layer".to_string())],
            },
            SampleScope::Composite => compositor::flatten_visible(project, fonts),
        };

        let x = pos.x.floor();
        let y = pos.y.floor();
        if x < 0.0 || y < 0.0 || x >= source.width() as f32 || y >= source.height() as f32 {
            return Vec::new();
        }
        let seed = (x as u32, y as u32);

        let mask = if settings.fuzzy_contiguous {
            fill::contiguous_select(&source, seed, settings.fuzzy_tolerance)
        } else {
            fill::global_select(
                &source,
                *source.get_pixel(seed.0, seed.1),
                settings.fuzzy_tolerance,
            )
        };
        vec![ToolEvent::Commit(selection_commit(
            project,
            mask,
            selection_mode(&input.modifiers),
        ))]
    }

    pub fn cancel(&mut self) {
        self.state = FuzzyState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Command;
    use crate::mask::SelectionMode;
    use egui::Modifiers;

    fn project() -> ProjectState {
        ProjectState::new("select-test", 100, 100)
    }

    fn commit_of(events: Vec<ToolEvent>) -> Command {
        assert_eq!(events.len(), 1, "expected exactly one event: {events:?}");
        match events.into_iter().next().unwrap() {
            ToolEvent::Commit(cmd) => cmd,
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn rect_mask_uses_pixel_centers() {
        let mask = rect_mask(100, 100, Rect::from_min_max(Pos2::new(10.0, 10.0), Pos2::new(50.0, 50.0)));
        assert_eq!(mask.bounds(), Some((10, 10, 50, 50)));
        assert_eq!(mask.get(10, 10), 255);
        assert_eq!(mask.get(49, 49), 255);
        assert_eq!(mask.get(50, 50), 0);
        assert_eq!(mask.get(9, 10), 0);
    }

    #[test]
    fn rectangle_drag_commits_selection() {
        let p = project();
        let mut tool = RectangleSelectTool::new();
        tool.pointer_down(PointerInput::at(10.0, 10.0));
        tool.pointer_move(PointerInput::at(30.0, 20.0));
        let cmd = commit_of(tool.pointer_up(PointerInput::at(50.0, 50.0), &p));

        let Command::SetSelection { before, after } = cmd else {
            panic!("wrong command");
        };
        assert!(before.is_none());
        let after = after.expect("selection set");
        assert_eq!(after.bounds(), Some((10, 10, 50, 50)));
    }

    #[test]
    fn zero_size_rectangle_cancels() {
        let p = project();
        let mut tool = RectangleSelectTool::new();
        tool.pointer_down(PointerInput::at(10.0, 10.0));
        let events = tool.pointer_up(PointerInput::at(10.2, 40.0), &p);
        assert!(events.is_empty(), "{events:?}");
    }

    #[test]
    fn cancel_discards_drag() {
        let p = project();
        let mut tool = RectangleSelectTool::new();
        tool.pointer_down(PointerInput::at(10.0, 10.0));
        tool.pointer_move(PointerInput::at(90.0, 90.0));
        tool.cancel();
        assert!(tool.pointer_up(PointerInput::at(90.0, 90.0), &p).is_empty());
    }

    #[test]
    fn subtract_modifier_erases_from_selection() {
        let mut p = project();
        p.selection = Some(rect_mask(100, 100, Rect::from_min_max(
            Pos2::new(0.0, 0.0),
            Pos2::new(60.0, 60.0),
        )));

        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        let mut tool = RectangleSelectTool::new();
        tool.pointer_down(PointerInput::at(0.0, 0.0).with_modifiers(ctrl));
        let cmd = commit_of(
            tool.pointer_up(PointerInput::at(60.0, 30.0).with_modifiers(ctrl), &p),
        );
        let Command::SetSelection { after, .. } = cmd else {
            panic!();
        };
        let after = after.unwrap();
        assert_eq!(after.get(5, 10), 0, "subtracted region cleared");
        assert_eq!(after.get(5, 45), 255, "rest untouched");
    }

    #[test]
    fn subtracting_everything_clears_selection() {
        let mut p = project();
        p.selection = Some(rect_mask(100, 100, Rect::from_min_max(
            Pos2::new(10.0, 10.0),
            Pos2::new(20.0, 20.0),
        )));
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        let mut tool = RectangleSelectTool::new();
        tool.pointer_down(PointerInput::at(0.0, 0.0).with_modifiers(ctrl));
        let cmd = commit_of(
            tool.pointer_up(PointerInput::at(100.0, 100.0).with_modifiers(ctrl), &p),
        );
        let Command::SetSelection { after, .. } = cmd else {
            panic!();
        };
        assert!(after.is_none(), "all-zero combine clears the mask");
    }

    #[test]
    fn lasso_needs_three_points() {
        let p = project();
        let mut tool = LassoTool::new();
        tool.pointer_down(PointerInput::at(10.0, 10.0));
        tool.pointer_move(PointerInput::at(40.0, 10.0));
        assert!(tool.pointer_up(PointerInput::at(40.0, 10.0), &p).is_empty());
    }

    #[test]
    fn lasso_triangle_selects_interior() {
        let p = project();
        let mut tool = LassoTool::new();
        tool.pointer_down(PointerInput::at(10.0, 10.0));
        tool.pointer_move(PointerInput::at(60.0, 10.0));
        tool.pointer_move(PointerInput::at(10.0, 60.0));
        let cmd = commit_of(tool.pointer_up(PointerInput::at(10.0, 60.0), &p));
        let Command::SetSelection { after, .. } = cmd else {
            panic!();
        };
        let mask = after.unwrap();
        assert_eq!(mask.get(15, 15), 255, "inside the triangle");
        assert_eq!(mask.get(55, 55), 0, "outside the hypotenuse");
    }

    #[test]
    fn polygon_finish_below_threshold_cancels() {
        let p = project();
        let mut tool = PolygonSelectTool::new();
        tool.pointer_down(PointerInput::at(5.0, 5.0));
        tool.pointer_down(PointerInput::at(50.0, 5.0));
        assert!(tool.finish(PointerInput::at(50.0, 5.0), &p).is_empty());
        assert_eq!(tool.point_count(), 0);
    }

    #[test]
    fn polygon_commits_on_finish() {
        let p = project();
        let mut tool = PolygonSelectTool::new();
        for (x, y) in [(5.0, 5.0), (50.0, 5.0), (50.0, 50.0), (5.0, 50.0)] {
            tool.pointer_down(PointerInput::at(x, y));
        }
        let cmd = commit_of(tool.finish(PointerInput::at(5.0, 50.0), &p));
        let Command::SetSelection { after, .. } = cmd else {
            panic!();
        };
        assert_eq!(after.unwrap().get(20, 20), 255);
    }

    #[test]
    fn fuzzy_without_active_layer_warns() {
        let mut p = project();
        p.active_layer = None;
        let mut tool = FuzzySelectTool::new();
        let events = tool.pointer_down(PointerInput::at(5.0, 5.0), &p);
        assert_eq!(
            events,
            vec![ToolEvent::Warning("No active layer".to_string())]
        );
    }

    #[test]
    fn fuzzy_selects_contiguous_patch() {
        let mut p = project();
        let id = p.metadata.layers[0].id;
        let buf = p.buffer_mut(id).unwrap();
        for y in 0..20 {
            for x in 0..20 {
                buf.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
            }
        }
        // Disjoint identical patch.
        for y in 60..70 {
            for x in 60..70 {
                buf.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
            }
        }
        p.metadata.settings.fuzzy_tolerance = 0.0;

        let fonts = FontStore::new();
        let mut tool = FuzzySelectTool::new();
        tool.pointer_down(PointerInput::at(5.0, 5.0), &p);
        let cmd = commit_of(tool.pointer_up(PointerInput::at(5.0, 5.0), &p, &fonts));
        let Command::SetSelection { after, .. } = cmd else {
            panic!();
        };
        let mask = after.unwrap();
        assert_eq!(mask.get(10, 10), 255);
        assert_eq!(mask.get(65, 65), 0, "disjoint region not reached");
    }
}
