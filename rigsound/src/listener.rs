use crate::backend::AudioBackend;
use crate::math::{DEFAULT_FORWARD, DEFAULT_UP, Vec3, normalize_or};

/// The virtual microphone all positional voices are heard from.
///
/// Updated once per rendered frame from the camera. The last position is kept so sounds can be
/// played "at the listener" (footsteps) without the caller passing it again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerState {
    position: Vec3,
    forward: Vec3,
    up: Vec3,
}

impl Default for ListenerState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: DEFAULT_FORWARD,
            up: DEFAULT_UP,
        }
    }
}

impl ListenerState {
    /// Stores a new pose. Directions are normalized; degenerate ones fall back to the defaults.
    pub fn update(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
        self.position = position;
        self.forward = normalize_or(forward, DEFAULT_FORWARD);
        self.up = normalize_or(up, DEFAULT_UP);
    }

    /// Pushes position and orientation to the backend.
    pub fn apply(&self, backend: &mut dyn AudioBackend) {
        backend.set_listener(self.position, self.forward, self.up);
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Orientation as the six floats `[forward.xyz, up.xyz]`.
    pub fn orientation(&self) -> [f32; 6] {
        [
            self.forward.x,
            self.forward.y,
            self.forward.z,
            self.up.x,
            self.up.y,
            self.up.z,
        ]
    }
}
