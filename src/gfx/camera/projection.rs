use cgmath::*;

use super::Camera;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Keeps the camera's projection in sync with the window size.
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveProjection {
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub aspect: f32,
}

impl Default for PerspectiveProjection {
    fn default() -> Self {
        Self {
            fovy: Deg(45.0),
            znear: 0.1,
            zfar: 10000.0,
            aspect: 1.0,
        }
    }
}

impl PerspectiveProjection {
    pub fn new(fovy: Deg<f32>, znear: f32, zfar: f32) -> Self {
        Self {
            fovy,
            znear,
            zfar,
            ..Default::default()
        }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    /// Updates the aspect ratio and writes the new projection into `camera`.
    pub fn resize(&mut self, width: u32, height: u32, camera: &mut Camera) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
        camera.set_projection_matrix(self.matrix());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_sets_camera_projection() {
        let mut camera = Camera::new();
        let mut projection = PerspectiveProjection::default();
        projection.resize(800, 400, &mut camera);

        assert_eq!(projection.aspect, 2.0);
        assert_eq!(camera.projection_matrix(), projection.matrix());

        // zero-sized (minimised) windows keep the last aspect
        projection.resize(0, 400, &mut camera);
        assert_eq!(projection.aspect, 2.0);
    }

    #[test]
    fn test_near_plane_maps_to_zero_depth() {
        let projection = PerspectiveProjection::default();
        let clip = projection.matrix() * Vector4::new(0.0, 0.0, -projection.znear, 1.0);
        assert!((clip.z / clip.w).abs() < 1e-5);
    }
}
