use cgmath::*;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use super::camera::{Camera, UP_DIRECTION};

/// Wheel units reported per scrolled line.
const WHEEL_UNITS_PER_LINE: f32 = 120.0;

/// Orbits the camera around its focus with the middle mouse button and
/// zooms along the view direction with the wheel.
#[derive(Debug, Clone)]
pub struct OrbitCameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    is_mouse_pressed: bool,
    prev_cursor: Option<Vector2<f32>>,
}

impl Default for OrbitCameraController {
    fn default() -> Self {
        Self::new(0.007, 0.007)
    }
}

impl OrbitCameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            is_mouse_pressed: false,
            prev_cursor: None,
        }
    }

    pub fn is_rotating(&self) -> bool {
        self.is_mouse_pressed
    }

    /// Feeds one window event. Returns true when the camera changed.
    pub fn process_event(&mut self, event: &WindowEvent, camera: &mut Camera) -> bool {
        match event {
            WindowEvent::MouseInput {
                button: MouseButton::Middle,
                state,
                ..
            } => {
                self.is_mouse_pressed = *state == ElementState::Pressed;
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = Vector2::new(position.x as f32, position.y as f32);
                let previous = self.prev_cursor.replace(current);
                match previous {
                    Some(previous) if self.is_mouse_pressed && previous != current => {
                        let delta = current - previous;
                        self.rotate(delta.x, delta.y, camera);
                        true
                    }
                    _ => false,
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.prev_cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, lines) => lines * WHEEL_UNITS_PER_LINE,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32,
                };
                self.zoom(amount, camera);
                true
            }
            _ => false,
        }
    }

    /// Rotates the view and the eye offset about the view's x axis (`dy`)
    /// and the world up axis (`dx`), both in pixels.
    pub fn rotate(&self, dx: f32, dy: f32, camera: &mut Camera) {
        let view = camera.view_matrix();
        let row = |i: usize| Vector3::new(view.x[i], view.y[i], view.z[i]);
        let view_dir = row(2).normalize();

        let mut x_axis = view_dir.cross(UP_DIRECTION);
        if x_axis.magnitude2() < f32::EPSILON {
            x_axis = row(0);
        }
        if x_axis.dot(row(0)) < 0.0 {
            x_axis = -x_axis;
        }

        let rotate_x = Quaternion::from_axis_angle(x_axis.normalize(), Rad(self.rotate_speed * dy));
        let rotate_y = Quaternion::from_axis_angle(UP_DIRECTION, Rad(self.rotate_speed * dx));
        let rotation = rotate_x * rotate_y;

        camera.set_view_quat((camera.view_quat() * rotation).normalize());
        camera.set_position(rotation.conjugate() * camera.position());
    }

    /// Moves the eye along the view direction, faster when far from the focus.
    pub fn zoom(&self, delta: f32, camera: &mut Camera) {
        let position = camera.position();
        let scale = (position - camera.focus()).magnitude() / 25.0 + 1.0;
        let direction = camera.view_direction();
        camera.set_position(position + direction * scale * self.zoom_speed * delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_keeps_distance_to_focus() {
        let mut camera = Camera::new();
        camera.set_position(Vector3::new(0.0, 0.0, 4.0));
        let controller = OrbitCameraController::default();

        controller.rotate(120.0, -45.0, &mut camera);

        assert!((camera.position().magnitude() - 4.0).abs() < 1e-4);
        assert!((camera.view_quat().magnitude() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rotated_eye_still_looks_at_focus() {
        let mut camera = Camera::new();
        camera.set_position(Vector3::new(0.0, 0.0, 3.0));
        let controller = OrbitCameraController::default();
        controller.rotate(80.0, 30.0, &mut camera);

        // the focus stays on the view axis
        let focus = camera.view_matrix() * camera.focus().extend(1.0);
        assert!(focus.x.abs() < 1e-3 && focus.y.abs() < 1e-3);
        assert!((focus.z + 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_zoom_moves_towards_focus() {
        let mut camera = Camera::new();
        camera.set_position(Vector3::new(0.0, 0.0, 10.0));
        let controller = OrbitCameraController::default();

        controller.zoom(120.0, &mut camera);
        let expected = 10.0 - (10.0 / 25.0 + 1.0) * 0.007 * 120.0;
        assert!((camera.position().z - expected).abs() < 1e-4);
    }

    fn cursor(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            position: PhysicalPosition::new(x, y),
        }
    }

    fn middle(state: ElementState) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            state,
            button: MouseButton::Middle,
        }
    }

    #[test]
    fn test_drag_requires_middle_button() {
        let mut camera = Camera::new();
        let mut controller = OrbitCameraController::default();
        let before = camera.position();

        assert!(!controller.process_event(&cursor(10.0, 10.0), &mut camera));
        assert!(!controller.process_event(&cursor(30.0, 10.0), &mut camera));
        assert_eq!(camera.position(), before);

        controller.process_event(&middle(ElementState::Pressed), &mut camera);
        assert!(controller.is_rotating());
        assert!(controller.process_event(&cursor(50.0, 10.0), &mut camera));
        assert_ne!(camera.position(), before);

        controller.process_event(&middle(ElementState::Released), &mut camera);
        let after = camera.position();
        assert!(!controller.process_event(&cursor(90.0, 40.0), &mut camera));
        assert_eq!(camera.position(), after);
    }
}
