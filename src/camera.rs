//! Camera, projection and keyboard movement state.
//!
//! The camera looks from a movable eye position at a fixed target. The view
//! matrix is recomputed every frame from the current eye; the projection
//! parameters are fixed at setup and only change on window resize.

use cgmath::{Matrix4, Point3, Rad, SquareMatrix, Vector3};
use winit::keyboard::KeyCode;

/// Maps the OpenGL clip-space depth range (-1..1) onto WGPU's (0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Units the eye moves per pressed direction per frame.
///
/// The step is applied once per frame with no delta-time scaling, so movement
/// speed follows the frame rate. Known limitation, kept on purpose.
pub const MOVE_STEP: f32 = 0.1;

/// Viewpoint: movable eye, fixed look-at target, fixed up vector.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<E: Into<Point3<f32>>, T: Into<Point3<f32>>>(eye: E, target: T) -> Self {
        Self {
            eye: eye.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    /// Standard right-handed look-at view matrix from the current eye.
    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.target, self.up)
    }
}

/// Perspective projection parameters, fixed apart from the aspect ratio.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    /// `znear` and `zfar` must both be positive with `znear < zfar`; `aspect`
    /// is derived from the viewport dimensions and kept in sync via
    /// [`resize`](Self::resize).
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        debug_assert!(znear > 0.0 && znear < zfar);
        Self {
            aspect: width as f32 / height as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Persistent directional key state, consumed once per frame.
///
/// Each direction is set on key-down and cleared on key-up. Repeated events
/// of the same kind are no-ops, and a key-up without a prior key-down leaves
/// the state released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MovementState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press or release. Returns `false` for keys that don't map
    /// to a movement direction so the caller can pass them on.
    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        match key {
            KeyCode::ArrowUp => self.forward = pressed,
            KeyCode::ArrowDown => self.back = pressed,
            KeyCode::ArrowLeft => self.left = pressed,
            KeyCode::ArrowRight => self.right = pressed,
            _ => return false,
        }
        true
    }

    /// Apply one frame worth of movement to the eye position.
    pub fn integrate(&self, eye: &mut Point3<f32>) {
        if self.forward {
            eye.z += MOVE_STEP;
        }
        if self.back {
            eye.z -= MOVE_STEP;
        }
        if self.left {
            eye.x -= MOVE_STEP;
        }
        if self.right {
            eye.x += MOVE_STEP;
        }
    }
}

/// Projection and view matrices as uploaded to the GPU once per frame.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    proj: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            proj: Matrix4::identity().into(),
            view: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.proj = projection.matrix().into();
        self.view = camera.view().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera state bundled with its GPU resources.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub movement: MovementState,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{EuclideanSpace, InnerSpace};

    fn assert_matrix_eq(actual: Matrix4<f32>, expected: Matrix4<f32>) {
        let a: [[f32; 4]; 4] = actual.into();
        let e: [[f32; 4]; 4] = expected.into();
        for col in 0..4 {
            for row in 0..4 {
                assert!(
                    (a[col][row] - e[col][row]).abs() < 1e-6,
                    "matrix mismatch at column {col} row {row}: {:?} vs {:?}",
                    a,
                    e
                );
            }
        }
    }

    #[test]
    fn view_matrix_matches_look_at_formula() {
        // Reference computation: f toward the target, s = f × up, u = s × f,
        // rows [s; u; -f] with the eye projected onto each axis.
        let eye = Point3::new(1.0, 2.0, -3.0);
        let target = Point3::new(0.0, 0.0, 1000.0);
        let up = Vector3::unit_y();
        let camera = Camera::new(eye, target);

        let f = (target - eye).normalize();
        let s = f.cross(up).normalize();
        let u = s.cross(f);
        let eye_v = eye.to_vec();
        #[rustfmt::skip]
        let expected = Matrix4::new(
            s.x, u.x, -f.x, 0.0,
            s.y, u.y, -f.y, 0.0,
            s.z, u.z, -f.z, 0.0,
            -s.dot(eye_v), -u.dot(eye_v), f.dot(eye_v), 1.0,
        );
        assert_matrix_eq(camera.view(), expected);
    }

    #[test]
    fn view_matrix_translates_by_eye() {
        let eye = Point3::new(3.0, -2.0, 5.0);
        let camera = Camera::new(eye, (3.0, -2.0, 1000.0));
        let view = camera.view();
        // The eye must map to the view-space origin.
        let origin = view * eye.to_homogeneous();
        assert!(origin.x.abs() < 1e-5);
        assert!(origin.y.abs() < 1e-5);
        assert!(origin.z.abs() < 1e-5);
    }

    #[test]
    fn repeated_key_down_is_idempotent() {
        let mut movement = MovementState::new();
        movement.handle_key(KeyCode::ArrowUp, true);
        let snapshot = movement;
        movement.handle_key(KeyCode::ArrowUp, true);
        assert_eq!(movement, snapshot);
        assert!(movement.forward);
    }

    #[test]
    fn key_up_without_key_down_stays_released() {
        let mut movement = MovementState::new();
        movement.handle_key(KeyCode::ArrowLeft, false);
        assert_eq!(movement, MovementState::default());
    }

    #[test]
    fn unmapped_keys_are_not_consumed() {
        let mut movement = MovementState::new();
        assert!(!movement.handle_key(KeyCode::Space, true));
        assert_eq!(movement, MovementState::default());
    }

    #[test]
    fn integration_applies_fixed_step_per_pressed_axis() {
        let mut movement = MovementState::new();
        movement.handle_key(KeyCode::ArrowUp, true);
        movement.handle_key(KeyCode::ArrowLeft, true);
        let mut eye = Point3::new(0.0, 0.0, 0.0);
        movement.integrate(&mut eye);
        assert_eq!(eye, Point3::new(-MOVE_STEP, 0.0, MOVE_STEP));

        movement.handle_key(KeyCode::ArrowUp, false);
        movement.integrate(&mut eye);
        assert_eq!(eye, Point3::new(-2.0 * MOVE_STEP, 0.0, MOVE_STEP));
    }
}
