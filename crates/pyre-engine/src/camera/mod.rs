//! Fly camera and the pointer/keyboard controller that drives it.
//!
//! Orientation is yaw/pitch in degrees; the front vector is rebuilt from
//! them whenever they change, never integrated, so it stays unit-length.

use glam::{Mat4, Vec3};

use crate::input::{InputState, Key};

/// Fixed world-up axis.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Pitch is clamped short of the poles to keep the view basis well-defined.
const PITCH_LIMIT_DEG: f32 = 89.0;

const DEFAULT_FOV_Y_DEG: f32 = 45.0;
const DEFAULT_ZNEAR: f32 = 0.1;
const DEFAULT_ZFAR: f32 = 100.0;

/// Free-look camera.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    yaw_deg: f32,
    pitch_deg: f32,
    front: Vec3,
    fov_y_deg: f32,
    znear: f32,
    zfar: f32,
}

impl Camera {
    pub fn new(position: Vec3, yaw_deg: f32, pitch_deg: f32) -> Self {
        let mut cam = Self {
            position,
            yaw_deg,
            pitch_deg: pitch_deg.clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG),
            front: Vec3::NEG_Z,
            fov_y_deg: DEFAULT_FOV_Y_DEG,
            znear: DEFAULT_ZNEAR,
            zfar: DEFAULT_ZFAR,
        };
        cam.rebuild_front();
        cam
    }

    pub fn yaw(&self) -> f32 {
        self.yaw_deg
    }

    pub fn pitch(&self) -> f32 {
        self.pitch_deg
    }

    /// Unit front direction derived from yaw/pitch.
    pub fn front(&self) -> Vec3 {
        self.front
    }

    /// Unit right direction (strafe axis).
    pub fn right(&self) -> Vec3 {
        self.front.cross(WORLD_UP).normalize()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, WORLD_UP)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), aspect, self.znear, self.zfar)
    }

    /// Applies orientation deltas (degrees) and rebuilds the front vector.
    pub fn rotate(&mut self, yaw_delta_deg: f32, pitch_delta_deg: f32) {
        self.yaw_deg += yaw_delta_deg;
        self.pitch_deg =
            (self.pitch_deg + pitch_delta_deg).clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG);
        self.rebuild_front();
    }

    fn rebuild_front(&mut self) {
        let yaw = self.yaw_deg.to_radians();
        let pitch = self.pitch_deg.to_radians();
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
    }
}

/// Converts pointer samples and held keys into camera motion.
///
/// Pointer handling is sample-based: the controller keeps the last absolute
/// position and turns consecutive samples into deltas. After control is
/// (re)acquired — first sample ever, focus regained, pointer re-entered —
/// the next sample only seeds the baseline, so there is no spurious jump.
#[derive(Debug, Clone)]
pub struct CameraController {
    pub sensitivity: f32,
    pub speed: f32,
    last_pointer: Option<(f32, f32)>,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            sensitivity: 0.1,
            speed: 4.0,
            last_pointer: None,
        }
    }
}

impl CameraController {
    /// Feeds an absolute pointer sample (logical pixels).
    ///
    /// Screen-space y grows downward while pitch grows upward, so the y
    /// delta is inverted.
    pub fn look(&mut self, camera: &mut Camera, x: f32, y: f32) {
        let Some((last_x, last_y)) = self.last_pointer else {
            self.last_pointer = Some((x, y));
            return;
        };

        let dx = x - last_x;
        let dy = last_y - y;
        self.last_pointer = Some((x, y));

        camera.rotate(dx * self.sensitivity, dy * self.sensitivity);
    }

    /// Clears the pointer baseline; the next sample re-seeds it.
    pub fn reset_look(&mut self) {
        self.last_pointer = None;
    }

    /// Applies held movement keys for this frame.
    ///
    /// Displacement is `dt * speed` along the relevant axis, which makes
    /// total movement over a fixed wall-clock interval independent of how
    /// many frames covered it.
    pub fn advance(&self, camera: &mut Camera, input: &InputState, dt: f32) {
        let step = dt * self.speed;
        let front = camera.front();
        let right = camera.right();

        let mut delta = Vec3::ZERO;
        if input.key_down(Key::W) || input.key_down(Key::ArrowUp) {
            delta += front;
        }
        if input.key_down(Key::S) || input.key_down(Key::ArrowDown) {
            delta -= front;
        }
        if input.key_down(Key::D) || input.key_down(Key::ArrowRight) {
            delta += right;
        }
        if input.key_down(Key::A) || input.key_down(Key::ArrowLeft) {
            delta -= right;
        }

        camera.position += delta * step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputFrame, InputEvent, KeyState, Modifiers};
    use approx::assert_relative_eq;

    fn held(keys: &[Key]) -> InputState {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        for &key in keys {
            state.apply_event(
                &mut frame,
                InputEvent::Key {
                    key,
                    state: KeyState::Pressed,
                    modifiers: Modifiers::default(),
                    repeat: false,
                },
            );
        }
        state
    }

    // ── orientation ───────────────────────────────────────────────────────

    #[test]
    fn pitch_clamps_at_limits() {
        let mut cam = Camera::new(Vec3::ZERO, -90.0, 0.0);
        let mut ctl = CameraController::default();

        ctl.look(&mut cam, 0.0, 0.0); // seed
        ctl.look(&mut cam, 0.0, -10_000.0); // sweep far above the pole
        assert_eq!(cam.pitch(), 89.0);
        assert_relative_eq!(cam.front().length(), 1.0, epsilon = 1e-5);

        ctl.look(&mut cam, 0.0, 10_000.0); // and far below
        assert_eq!(cam.pitch(), -89.0);
        assert_relative_eq!(cam.front().length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn front_stays_unit_length() {
        let mut cam = Camera::new(Vec3::ZERO, 0.0, 0.0);
        let deltas = [
            (15.0, 200.0),
            (-400.0, -1000.0),
            (3.0, 0.5),
            (720.0, 89.0),
            (-1.0, -179.0),
        ];
        for (dyaw, dpitch) in deltas {
            cam.rotate(dyaw, dpitch);
            assert_relative_eq!(cam.front().length(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn first_sample_after_seed_causes_no_rotation() {
        let mut cam = Camera::new(Vec3::ZERO, -90.0, 10.0);
        let mut ctl = CameraController::default();

        let (yaw, pitch) = (cam.yaw(), cam.pitch());
        ctl.look(&mut cam, 640.0, 400.0); // seeds only
        assert_eq!(cam.yaw(), yaw);
        assert_eq!(cam.pitch(), pitch);

        // Re-seeding behaves the same after the baseline is cleared.
        ctl.look(&mut cam, 645.0, 400.0);
        let yaw_after_move = cam.yaw();
        ctl.reset_look();
        ctl.look(&mut cam, 100.0, 100.0);
        assert_eq!(cam.yaw(), yaw_after_move);
    }

    #[test]
    fn y_axis_is_inverted() {
        let mut cam = Camera::new(Vec3::ZERO, -90.0, 0.0);
        let mut ctl = CameraController::default();

        ctl.look(&mut cam, 0.0, 100.0);
        ctl.look(&mut cam, 0.0, 50.0); // pointer moved up the screen
        assert!(cam.pitch() > 0.0);
    }

    // ── movement ──────────────────────────────────────────────────────────

    #[test]
    fn displacement_is_step_count_invariant() {
        let input = held(&[Key::W]);
        let ctl = CameraController::default();

        let mut coarse = Camera::new(Vec3::ZERO, -90.0, 0.0);
        ctl.advance(&mut coarse, &input, 2.0);

        let mut fine = Camera::new(Vec3::ZERO, -90.0, 0.0);
        for _ in 0..200 {
            ctl.advance(&mut fine, &input, 0.01);
        }

        assert_relative_eq!(coarse.position.x, fine.position.x, epsilon = 1e-3);
        assert_relative_eq!(coarse.position.y, fine.position.y, epsilon = 1e-3);
        assert_relative_eq!(coarse.position.z, fine.position.z, epsilon = 1e-3);
    }

    #[test]
    fn strafe_is_perpendicular_to_front() {
        let cam = Camera::new(Vec3::ZERO, -37.0, 12.0);
        assert_relative_eq!(cam.front().dot(cam.right()), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn opposed_keys_cancel() {
        let input = held(&[Key::W, Key::S]);
        let ctl = CameraController::default();
        let mut cam = Camera::new(Vec3::ZERO, -90.0, 0.0);
        ctl.advance(&mut cam, &input, 1.0);
        assert_eq!(cam.position, Vec3::ZERO);
    }
}
