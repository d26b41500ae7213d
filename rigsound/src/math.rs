//! Math types for rigsound

pub use glam::Vec3;

/// Facing used when the caller hands over a degenerate forward vector.
pub const DEFAULT_FORWARD: Vec3 = Vec3::NEG_Z;

/// Up used when the caller hands over a degenerate up vector.
pub const DEFAULT_UP: Vec3 = Vec3::Y;

/// Vectors at or below this length are treated as zero.
pub const MIN_DIRECTION_LENGTH: f32 = 1e-6;

/// Normalizes `v`, returning `fallback` when `v` is too short (or not finite) to have a direction.
pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let len = v.length();
    if !(len > MIN_DIRECTION_LENGTH) || !len.is_finite() {
        return fallback;
    }
    v / len
}
