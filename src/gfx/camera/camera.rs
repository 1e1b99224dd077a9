use std::cell::Cell;

use cgmath::*;

/// World up direction used by the camera and its controllers.
pub const UP_DIRECTION: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

/// A camera looking at a focus point.
///
/// `position` is the eye's offset from `focus`. The view matrix is rebuilt on
/// the first query after any of position, focus or orientation changes, and
/// served from the cache until the next change.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vector3<f32>,
    focus: Vector3<f32>,
    view_quat: Quaternion<f32>,
    projection: Matrix4<f32>,
    view_matrix: Cell<Matrix4<f32>>,
    is_dirty: Cell<bool>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub fn new() -> Self {
        let position = Vector3::new(0.0, 0.0, 1.0);
        let focus = Vector3::zero();
        Self {
            position,
            focus,
            view_quat: look_at_quat(position, focus, UP_DIRECTION),
            projection: Matrix4::identity(),
            view_matrix: Cell::new(Matrix4::identity()),
            is_dirty: Cell::new(true),
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn focus(&self) -> Vector3<f32> {
        self.focus
    }

    pub fn view_quat(&self) -> Quaternion<f32> {
        self.view_quat
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    /// Eye position in world space.
    pub fn eye(&self) -> Vector3<f32> {
        self.position + self.focus
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.is_dirty.set(true);
    }

    pub fn set_focus(&mut self, focus: Vector3<f32>) {
        self.focus = focus;
        self.is_dirty.set(true);
    }

    pub fn set_view_quat(&mut self, view_quat: Quaternion<f32>) {
        self.view_quat = view_quat;
        self.is_dirty.set(true);
    }

    pub fn set_projection_matrix(&mut self, projection: Matrix4<f32>) {
        self.projection = projection;
    }

    /// `rotation(view_quat) * translate(-(position + focus))`, cached.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        if self.is_dirty.get() {
            let view = Matrix4::from(self.view_quat) * Matrix4::from_translation(-(self.position + self.focus));
            self.view_matrix.set(view);
            self.is_dirty.set(false);
        }
        self.view_matrix.get()
    }

    /// True when the next [`view_matrix`](Self::view_matrix) call recomputes.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.get()
    }

    /// Moves the focus to `center` and backs off along the current view
    /// direction until a sphere of `radius` fits the view.
    pub fn frame(&mut self, center: Vector3<f32>, radius: f32) {
        let back = self.view_direction() * -1.0;
        let distance = (radius * 2.5).max(0.1);
        self.set_focus(center);
        self.set_position(back * distance);
    }

    /// Unit vector the camera looks along, in world space.
    pub fn view_direction(&self) -> Vector3<f32> {
        let view = self.view_matrix();
        -Vector3::new(view.x.z, view.y.z, view.z.z).normalize()
    }
}

/// Orientation of a view looking from `eye` at `target`.
pub fn look_at_quat(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Quaternion<f32> {
    let view = Matrix4::look_at_rh(Point3::from_vec(eye), Point3::from_vec(target), up);
    Quaternion::from(Matrix3::from_cols(view.x.truncate(), view.y.truncate(), view.z.truncate())).normalize()
}
