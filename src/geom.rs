//! Shared handle-hit and rectangle-resize geometry for the interactive
//! tools: crop, canvas resize, text resize, and free transform all use the
//! same eight-handle policy.

use egui::{Pos2, Rect, Vec2};

/// Which part of a handle-decorated rectangle a pointer grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Body,
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl Handle {
    pub fn is_corner(&self) -> bool {
        matches!(self, Handle::Ne | Handle::Se | Handle::Sw | Handle::Nw)
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, Handle::N | Handle::E | Handle::S | Handle::W)
    }

    /// True when the handle moves the rectangle's left/top side, which
    /// shifts the rect origin instead of its extent.
    pub fn moves_left(&self) -> bool {
        matches!(self, Handle::W | Handle::Nw | Handle::Sw)
    }

    pub fn moves_top(&self) -> bool {
        matches!(self, Handle::N | Handle::Nw | Handle::Ne)
    }

    pub fn moves_right(&self) -> bool {
        matches!(self, Handle::E | Handle::Ne | Handle::Se)
    }

    pub fn moves_bottom(&self) -> bool {
        matches!(self, Handle::S | Handle::Sw | Handle::Se)
    }
}

/// Hit-test the eight handles (corners first, since they overlap edge zones)
/// then the body. `grab` is the handle capture radius.
pub fn hit_handle(rect: Rect, pos: Pos2, grab: f32) -> Option<Handle> {
    let near = |a: Pos2, b: Pos2| (a.x - b.x).abs() <= grab && (a.y - b.y).abs() <= grab;

    let corners = [
        (rect.left_top(), Handle::Nw),
        (rect.right_top(), Handle::Ne),
        (rect.right_bottom(), Handle::Se),
        (rect.left_bottom(), Handle::Sw),
    ];
    for (corner, handle) in corners {
        if near(pos, corner) {
            return Some(handle);
        }
    }

    let cx = rect.center().x;
    let cy = rect.center().y;
    let edges = [
        (Pos2::new(cx, rect.top()), Handle::N),
        (Pos2::new(rect.right(), cy), Handle::E),
        (Pos2::new(cx, rect.bottom()), Handle::S),
        (Pos2::new(rect.left(), cy), Handle::W),
    ];
    for (mid, handle) in edges {
        if near(pos, mid) {
            return Some(handle);
        }
    }

    if rect.contains(pos) {
        Some(Handle::Body)
    } else {
        None
    }
}

/// Apply a pointer delta to a rectangle through a handle.
///
/// - Edge handles adjust one dimension; the orthogonal one is unchanged.
/// - Corner handles adjust both independently; with `aspect_lock`, the axis
///   with the larger absolute delta drives and the other follows the
///   original aspect ratio, anchored at the opposite corner.
/// - Aspect-locked edges derive the other dimension and split the change
///   evenly around the original centre on that axis.
/// - Both dimensions clamp at `min_w`/`min_h`.
pub fn resize_rect(
    start: Rect,
    handle: Handle,
    delta: Vec2,
    aspect_lock: bool,
    min_w: f32,
    min_h: f32,
) -> Rect {
    if handle == Handle::Body {
        return start.translate(delta);
    }

    let mut min = start.min;
    let mut max = start.max;

    if handle.moves_left() {
        min.x = (start.min.x + delta.x).min(max.x - min_w);
    } else if handle.moves_right() {
        max.x = (start.max.x + delta.x).max(min.x + min_w);
    }
    if handle.moves_top() {
        min.y = (start.min.y + delta.y).min(max.y - min_h);
    } else if handle.moves_bottom() {
        max.y = (start.max.y + delta.y).max(min.y + min_h);
    }

    if !aspect_lock {
        return Rect::from_min_max(min, max);
    }

    let aspect = start.width() / start.height();

    if handle.is_corner() {
        // The axis with the larger pointer delta drives the scale.
        let (w, h) = if delta.x.abs() >= delta.y.abs() {
            let w = (max.x - min.x).max(min_w);
            (w, (w / aspect).max(min_h))
        } else {
            let h = (max.y - min.y).max(min_h);
            ((h * aspect).max(min_w), h)
        };
        // Anchor the opposite corner.
        let (x0, x1) = if handle.moves_left() {
            (start.max.x - w, start.max.x)
        } else {
            (start.min.x, start.min.x + w)
        };
        let (y0, y1) = if handle.moves_top() {
            (start.max.y - h, start.max.y)
        } else {
            (start.min.y, start.min.y + h)
        };
        return Rect::from_min_max(Pos2::new(x0, y0), Pos2::new(x1, y1));
    }

    // Aspect-locked edge: the dragged dimension drives, the derived change is
    // centred on the original axis centre.
    match handle {
        Handle::E | Handle::W => {
            let w = (max.x - min.x).max(min_w);
            let h = (w / aspect).max(min_h);
            let cy = start.center().y;
            Rect::from_min_max(
                Pos2::new(min.x, cy - h * 0.5),
                Pos2::new(max.x, cy + h * 0.5),
            )
        }
        Handle::N | Handle::S => {
            let h = (max.y - min.y).max(min_h);
            let w = (h * aspect).max(min_w);
            let cx = start.center().x;
            Rect::from_min_max(
                Pos2::new(cx - w * 0.5, min.y),
                Pos2::new(cx + w * 0.5, max.y),
            )
        }
        _ => unreachable!(),
    }
}

/// Snap a float rect to whole pixels, `(x, y, w, h)`, clamped to a minimum
/// of 1×1.
pub fn rect_to_pixels(rect: Rect) -> (i32, i32, u32, u32) {
    let x = rect.min.x.round() as i32;
    let y = rect.min.y.round() as i32;
    let w = (rect.width().round() as i64).max(1) as u32;
    let h = (rect.height().round() as i64).max(1) as u32;
    (x, y, w, h)
}
