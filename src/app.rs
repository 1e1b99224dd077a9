// src/app.rs
//! Windowed viewer
//!
//! Owns the winit event loop and the shared scene. Rendering, resizing and
//! camera input run on the event loop thread; OBJ imports run on workers and
//! report back through a user event.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use cgmath::Vector3;
use log::{debug, error, info, trace, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::ViewerConfig;
use crate::gfx::camera::{OrbitCameraController, PerspectiveProjection};
use crate::gfx::effects::ForwardPhongEffect;
use crate::gfx::geometry::generate_cube;
use crate::gfx::scene::{DrawContext, NodeId, SharedScene};
use crate::import::spawn_import;
use crate::wgpu_utils::WgpuDevice;

/// Events sent to the loop from worker threads.
#[derive(Debug, Clone, Copy)]
pub enum ViewerEvent {
    /// A background import finished; carries the new group node on success.
    ImportFinished(Option<NodeId>),
}

pub struct MeshViewer {
    event_loop: Option<EventLoop<ViewerEvent>>,
    state: ViewerState,
}

struct ViewerState {
    config: ViewerConfig,
    proxy: EventLoopProxy<ViewerEvent>,
    window: Option<Arc<Window>>,
    scene: Option<SharedScene>,
    controller: OrbitCameraController,
    projection: PerspectiveProjection,
}

impl MeshViewer {
    pub fn new(config: ViewerConfig) -> Result<Self> {
        let event_loop = EventLoop::<ViewerEvent>::with_user_event()
            .build()
            .context("Failed to create event loop")?;
        let proxy = event_loop.create_proxy();

        Ok(Self {
            event_loop: Some(event_loop),
            state: ViewerState {
                controller: config.camera_controller(),
                projection: config.projection(),
                config,
                proxy,
                window: None,
                scene: None,
            },
        })
    }

    /// Runs until the window is closed.
    pub fn run(mut self) -> Result<()> {
        let event_loop = self.event_loop.take().context("Event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut self.state)
            .context("Event loop terminated with an error")
    }
}

impl ViewerState {
    fn init_scene(&mut self, window: Arc<Window>) -> Result<SharedScene> {
        let PhysicalSize { width, height } = window.inner_size();
        let device = pollster::block_on(WgpuDevice::new(window, width, height))
            .context("Failed to create the graphics device")?;

        let mut context =
            DrawContext::with_default_effects(Box::new(device)).context("Failed to create the default effects")?;
        context.set_clear_color(self.config.clear_color);
        self.projection.resize(width, height, context.camera_mut());
        context.resize(width, height);

        let root = context.root();
        let light = context.create_point_light(Vector3::new(1.0, 1.0, 1.0), 100.0)?;
        if let Some(node) = context
            .create_child(root, Some(light.with_name("key light")))
            .and_then(|id| context.graph_mut().get_mut(id))
        {
            node.set_position(Vector3::new(5.0, 10.0, 10.0));
        }

        if self.config.obj_files.is_empty() {
            let phong = context.effect_id(ForwardPhongEffect::NAME);
            let property = phong.and_then(|id| context.create_property(id));
            let cube = context.create_geometry_from(property, &generate_cube());
            context.create_child(root, Some(cube.with_name("cube")));
        }

        Ok(Arc::new(Mutex::new(context)))
    }

    fn spawn_imports(&self, scene: &SharedScene) {
        for path in &self.config.obj_files {
            let proxy = self.proxy.clone();
            let spawned = spawn_import(Arc::clone(scene), path.clone(), move |result| {
                if proxy.send_event(ViewerEvent::ImportFinished(result.ok())).is_err() {
                    debug!("Event loop closed before the import finished");
                }
            });
            if let Err(e) = spawned {
                error!("Failed to start import of {}: {}", path.display(), e);
            }
        }
    }
}

fn lock_scene(scene: &Option<SharedScene>) -> Option<MutexGuard<'_, DrawContext>> {
    match scene.as_ref()?.lock() {
        Ok(context) => Some(context),
        Err(poisoned) => {
            warn!("Scene lock poisoned, continuing with the last state");
            Some(poisoned.into_inner())
        }
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match self.init_scene(Arc::clone(&window)) {
            Ok(scene) => {
                info!("Viewer ready, importing {} file(s)", self.config.obj_files.len());
                self.spawn_imports(&scene);
                self.scene = Some(scene);
                self.window = Some(window);
            }
            Err(e) => {
                error!("{:#}", e);
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        let ViewerEvent::ImportFinished(Some(group)) = event else {
            return;
        };
        if let Some(mut context) = lock_scene(&self.scene) {
            if let Some(bounds) = context.subtree_bounds(group) {
                context.camera_mut().frame(bounds.center(), bounds.radius());
            }
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                event_loop.exit();
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(mut context) = lock_scene(&self.scene) {
                    self.projection.resize(width, height, context.camera_mut());
                    context.resize(width, height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(mut context) = lock_scene(&self.scene) {
                    match context.render_frame() {
                        Ok(stats) => trace!(
                            "Drew {} drawables in {} batches with {} lights",
                            stats.drawables,
                            stats.batches,
                            stats.lights
                        ),
                        Err(e) => warn!("Frame skipped: {}", e),
                    }
                }
            }
            event => {
                let moved = lock_scene(&self.scene)
                    .is_some_and(|mut context| self.controller.process_event(&event, context.camera_mut()));
                if moved {
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
