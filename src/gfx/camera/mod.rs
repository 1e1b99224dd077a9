pub mod camera;
pub mod camera_controller;
pub mod projection;

// Re-export main types
pub use camera::{look_at_quat, Camera, UP_DIRECTION};
pub use camera_controller::OrbitCameraController;
pub use projection::{PerspectiveProjection, OPENGL_TO_WGPU_MATRIX};
