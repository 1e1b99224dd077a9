// src/config.rs
//! Viewer configuration
//!
//! Plain settings with builder-style setters. Everything has a usable
//! default, so `ViewerConfig::default().with_obj_files(args)` is a complete
//! configuration.

use std::path::PathBuf;

use cgmath::{Deg, Vector4};

use crate::gfx::camera::{OrbitCameraController, PerspectiveProjection};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: Vector4<f32>,
    pub fov: Deg<f32>,
    pub near: f32,
    pub far: f32,
    /// Radians per pixel of mouse drag.
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    /// Meshes imported in the background at startup.
    pub obj_files: Vec<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "meshview".to_string(),
            width: 1200,
            height: 800,
            clear_color: Vector4::new(0.2, 0.2, 0.2, 1.0),
            fov: Deg(45.0),
            near: 0.1,
            far: 10000.0,
            rotate_speed: 0.007,
            zoom_speed: 0.007,
            obj_files: Vec::new(),
        }
    }
}

impl ViewerConfig {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_clear_color(mut self, color: Vector4<f32>) -> Self {
        self.clear_color = color;
        self
    }

    /// Field of view and clip planes of the perspective projection.
    pub fn with_perspective(mut self, fov: Deg<f32>, near: f32, far: f32) -> Self {
        self.fov = fov;
        self.near = near;
        self.far = far;
        self
    }

    pub fn with_orbit_speeds(mut self, rotate_speed: f32, zoom_speed: f32) -> Self {
        self.rotate_speed = rotate_speed;
        self.zoom_speed = zoom_speed;
        self
    }

    pub fn with_obj_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.obj_files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn projection(&self) -> PerspectiveProjection {
        let mut projection = PerspectiveProjection::new(self.fov, self.near, self.far);
        if self.width > 0 && self.height > 0 {
            projection.aspect = self.width as f32 / self.height as f32;
        }
        projection
    }

    pub fn camera_controller(&self) -> OrbitCameraController {
        OrbitCameraController::new(self.rotate_speed, self.zoom_speed)
    }
}
