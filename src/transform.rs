use egui::Pos2;
use serde::{Deserialize, Serialize};

/// Angle increment used when rotation snapping is enabled.
pub const ROTATION_SNAP_DEGREES: f32 = 15.0;

/// How closely a pivot must be preserved across an interactive edit, in
/// world units. Interactive steps round translation/rotation to 2 decimal
/// places, so drift stays below this bound.
pub const PIVOT_TOLERANCE: f32 = 0.01;

/// 2-D affine placement of a layer in world space.
///
/// Ordering is fixed: `world = translate · rotate · scale · local`, i.e. a
/// local point is scaled, then rotated about the local origin, then
/// translated. Scale components may be negative (flip) but never zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation_degrees: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translate_x: 0.0,
        translate_y: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        rotation_degrees: 0.0,
    };

    pub fn from_translation(x: f32, y: f32) -> Self {
        Transform {
            translate_x: x,
            translate_y: y,
            ..Self::IDENTITY
        }
    }

    /// Map a local-space point to world space: `T + R·S·p`.
    pub fn apply(&self, p: Pos2) -> Pos2 {
        let (s, c) = self.rotation_degrees.to_radians().sin_cos();
        let sx = p.x * self.scale_x;
        let sy = p.y * self.scale_y;
        Pos2::new(
            self.translate_x + c * sx - s * sy,
            self.translate_y + s * sx + c * sy,
        )
    }

    /// Map a world-space point back to local space: `S⁻¹·R⁻¹·(p − T)`.
    pub fn apply_inverse(&self, p: Pos2) -> Pos2 {
        let (s, c) = self.rotation_degrees.to_radians().sin_cos();
        let dx = p.x - self.translate_x;
        let dy = p.y - self.translate_y;
        // R⁻¹ is rotation by -θ.
        let rx = c * dx + s * dy;
        let ry = -s * dx + c * dy;
        Pos2::new(rx / self.scale_x, ry / self.scale_y)
    }

    /// Rotation + scale only (no translation) — useful for direction vectors
    /// and pivot solving.
    pub fn apply_linear(&self, p: Pos2) -> Pos2 {
        let (s, c) = self.rotation_degrees.to_radians().sin_cos();
        let sx = p.x * self.scale_x;
        let sy = p.y * self.scale_y;
        Pos2::new(c * sx - s * sy, s * sx + c * sy)
    }

    pub fn to_matrix(&self) -> Mat2x3 {
        let (s, c) = self.rotation_degrees.to_radians().sin_cos();
        Mat2x3 {
            m: [
                [c * self.scale_x, -s * self.scale_y, self.translate_x],
                [s * self.scale_x, c * self.scale_y, self.translate_y],
            ],
        }
    }

    /// Translation and rotation rounded to 2 decimal places. Applied after
    /// every interactive step so that many small pointer-move deltas cannot
    /// accumulate floating drift.
    pub fn rounded(&self) -> Transform {
        Transform {
            translate_x: round2(self.translate_x),
            translate_y: round2(self.translate_y),
            scale_x: self.scale_x,
            scale_y: self.scale_y,
            rotation_degrees: round2(self.rotation_degrees),
        }
    }

    /// Recompute translation so that the given local-space point maps to the
    /// given world-space point: solves `T = P − R·S·pivot_local`.
    pub fn anchored_at(&self, pivot_local: Pos2, pivot_world: Pos2) -> Transform {
        let rotated = self.apply_linear(pivot_local);
        Transform {
            translate_x: pivot_world.x - rotated.x,
            translate_y: pivot_world.y - rotated.y,
            ..*self
        }
    }

    /// Change rotation while keeping `pivot_local`'s world position fixed.
    pub fn with_rotation_about(&self, pivot_local: Pos2, new_degrees: f32) -> Transform {
        let pivot_world = self.apply(pivot_local);
        let rotated = Transform {
            rotation_degrees: new_degrees,
            ..*self
        };
        rotated.anchored_at(pivot_local, pivot_world)
    }
}

/// Round a rotation to the nearest multiple of [`ROTATION_SNAP_DEGREES`].
pub fn snap_rotation(degrees: f32) -> f32 {
    (degrees / ROTATION_SNAP_DEGREES).round() * ROTATION_SNAP_DEGREES
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

// ============================================================================
// AFFINE MATRIX — row-major 2x3, used where a bare TRS record is not closed
// under the operation (composition, inversion)
// ============================================================================

/// Row-major 2×3 affine matrix `[[a, b, tx], [c, d, ty]]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat2x3 {
    pub m: [[f32; 3]; 2],
}

impl Mat2x3 {
    pub const IDENTITY: Mat2x3 = Mat2x3 {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    };

    pub fn apply(&self, p: Pos2) -> Pos2 {
        Pos2::new(
            self.m[0][0] * p.x + self.m[0][1] * p.y + self.m[0][2],
            self.m[1][0] * p.x + self.m[1][1] * p.y + self.m[1][2],
        )
    }

    /// Matrix product `self · other` (apply `other` first).
    pub fn then_inner(&self, other: &Mat2x3) -> Mat2x3 {
        let a = &self.m;
        let b = &other.m;
        Mat2x3 {
            m: [
                [
                    a[0][0] * b[0][0] + a[0][1] * b[1][0],
                    a[0][0] * b[0][1] + a[0][1] * b[1][1],
                    a[0][0] * b[0][2] + a[0][1] * b[1][2] + a[0][2],
                ],
                [
                    a[1][0] * b[0][0] + a[1][1] * b[1][0],
                    a[1][0] * b[0][1] + a[1][1] * b[1][1],
                    a[1][0] * b[0][2] + a[1][1] * b[1][2] + a[1][2],
                ],
            ],
        }
    }

    /// Inverse affine. Returns identity on singular input.
    pub fn invert(&self) -> Mat2x3 {
        let [[a, b, tx], [c, d, ty]] = self.m;
        let det = a * d - b * c;
        if det.abs() < 1e-12 {
            return Mat2x3::IDENTITY;
        }
        let inv = 1.0 / det;
        Mat2x3 {
            m: [
                [d * inv, -b * inv, (b * ty - d * tx) * inv],
                [-c * inv, a * inv, (c * tx - a * ty) * inv],
            ],
        }
    }
}

/// Compose a parent placement with a child placement: the result maps the
/// child's local space through the child, then the parent.
pub fn compose(parent: &Transform, child: &Transform) -> Mat2x3 {
    parent.to_matrix().then_inner(&child.to_matrix())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Pos2, b: Pos2, eps: f32) -> bool {
        (a.x - b.x).abs() <= eps && (a.y - b.y).abs() <= eps
    }

    #[test]
    fn apply_then_inverse_is_identity() {
        let t = Transform {
            translate_x: 12.5,
            translate_y: -3.0,
            scale_x: 2.0,
            scale_y: -0.5,
            rotation_degrees: 33.0,
        };
        let p = Pos2::new(17.0, 42.0);
        let back = t.apply_inverse(t.apply(p));
        assert!(close(p, back, 1e-3), "{p:?} vs {back:?}");
    }

    #[test]
    fn matrix_matches_direct_apply() {
        let t = Transform {
            translate_x: 5.0,
            translate_y: 7.0,
            scale_x: 1.5,
            scale_y: 3.0,
            rotation_degrees: -20.0,
        };
        let p = Pos2::new(4.0, -9.0);
        assert!(close(t.apply(p), t.to_matrix().apply(p), 1e-4));
    }

    #[test]
    fn matrix_invert_round_trips() {
        let t = Transform {
            translate_x: -8.0,
            translate_y: 2.0,
            scale_x: 0.75,
            scale_y: 2.0,
            rotation_degrees: 111.0,
        };
        let m = t.to_matrix();
        let p = Pos2::new(3.0, 14.0);
        assert!(close(p, m.invert().apply(m.apply(p)), 1e-3));
    }

    #[test]
    fn compose_applies_child_first() {
        let parent = Transform::from_translation(100.0, 0.0);
        let child = Transform {
            rotation_degrees: 90.0,
            ..Transform::IDENTITY
        };
        let m = compose(&parent, &child);
        // Child rotates (1,0) to (0,1); parent then shifts x by 100.
        assert!(close(m.apply(Pos2::new(1.0, 0.0)), Pos2::new(100.0, 1.0), 1e-4));
    }

    #[test]
    fn rotation_about_pivot_keeps_pivot_fixed() {
        let t = Transform {
            translate_x: 40.0,
            translate_y: 25.0,
            scale_x: 2.0,
            scale_y: 1.0,
            rotation_degrees: 10.0,
        };
        let pivot = Pos2::new(15.0, 30.0);
        let before = t.apply(pivot);
        let after = t.with_rotation_about(pivot, 73.0).apply(pivot);
        assert!(close(before, after, 1e-3));
    }

    #[test]
    fn rotate_and_rotate_back_restores_translation() {
        let original = Transform {
            translate_x: 31.47,
            translate_y: -12.09,
            scale_x: 1.25,
            scale_y: 0.8,
            rotation_degrees: 5.0,
        };
        let pivot = Pos2::new(50.0, 20.0);
        let theta = 37.0;

        let turned = original
            .with_rotation_about(pivot, original.rotation_degrees + theta)
            .rounded();
        let back = turned
            .with_rotation_about(pivot, turned.rotation_degrees - theta)
            .rounded();

        assert!((back.translate_x - original.translate_x).abs() <= PIVOT_TOLERANCE);
        assert!((back.translate_y - original.translate_y).abs() <= PIVOT_TOLERANCE);
    }

    #[test]
    fn snap_rounds_to_nearest_15() {
        assert_eq!(snap_rotation(7.4), 0.0);
        assert_eq!(snap_rotation(7.6), 15.0);
        assert_eq!(snap_rotation(52.0), 45.0);
    }
}
