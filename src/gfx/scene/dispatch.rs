//! # Draw Dispatch
//!
//! One frame of rendering in two passes:
//!
//! 1. **Collect**: walk the subtree depth-first (children in insertion order),
//!    accumulate `world = parent * local` per node, cache it on the node's
//!    drawable, gather point lights, and batch every drawable that has a
//!    shading property under that property's effect.
//! 2. **Draw**: for each batch in effect order, reset the device's
//!    fixed-function state and hand the batch plus the full light list to the
//!    effect.
//!
//! Lights are only known after the whole walk, which is why drawing waits
//! for collection to finish. Drawables without a shading property are never
//! batched.

use std::collections::BTreeMap;

use cgmath::{Matrix4, SquareMatrix, Vector4};
use log::{trace, warn};

use super::node::{NodeId, SceneGraph};
use crate::gfx::camera::Camera;
use crate::gfx::device::{BlendEquation, ClearBuffer, CompareFunc, Face, FrontFace, GraphicsDevice, StencilOp};
use crate::gfx::drawables::Drawable;
use crate::gfx::effects::{Effect, EffectId};

/// Result of the collect pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawRequests {
    /// Drawable nodes per effect, in traversal order.
    pub batches: BTreeMap<EffectId, Vec<NodeId>>,
    /// Point light nodes in traversal order.
    pub lights: Vec<NodeId>,
}

impl DrawRequests {
    pub fn drawable_count(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }
}

/// Counters of one dispatched frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub batches: usize,
    pub drawables: usize,
    pub lights: usize,
}

/// Walks the subtree at `start`, caching world transforms on its drawables.
///
/// The walk starts from the world transform of `start`'s parent (identity
/// for the root). Returns an empty request set if `start` is not in the graph.
pub fn collect_draw_requests(graph: &mut SceneGraph, start: NodeId) -> DrawRequests {
    let mut requests = DrawRequests::default();

    let parent_transform = graph
        .get(start)
        .and_then(|node| node.parent())
        .and_then(|parent| graph.world_transform(parent))
        .unwrap_or_else(Matrix4::identity);

    let mut stack = vec![(start, parent_transform)];
    while let Some((id, parent)) = stack.pop() {
        let Some(node) = graph.get_mut(id) else {
            continue;
        };
        let world = parent * node.local_transform();

        if let Some(drawable) = node.drawable_mut() {
            drawable.set_transformation(world);
            if drawable.as_point_light().is_some() {
                requests.lights.push(id);
            }
            if let Some(effect) = drawable.effect() {
                requests.batches.entry(effect).or_default().push(id);
            }
        }

        // reversed so the first child is popped first
        stack.extend(node.children().iter().rev().map(|&child| (child, world)));
    }

    requests
}

/// Puts the fixed-function state back to the defaults every effect assumes.
pub fn reset_device_state(device: &mut dyn GraphicsDevice) {
    device.set_color_mask(true, true, true, true);

    device.enable_depth_test(true);
    device.enable_depth_mask(true);
    device.set_depth_func(CompareFunc::Less);
    device.set_depth_range(0.0, 1.0);

    device.enable_stencil_test(false);
    device.clear_buffer(ClearBuffer::Stencil);
    device.set_stencil_func(CompareFunc::Always, 0, 0xFF);
    device.set_stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Keep);

    device.enable_cull_face(false);
    device.set_cull_face(Face::Back);
    device.set_front_face(FrontFace::Ccw);

    device.enable_blend(false);
    device.set_blend_equation(BlendEquation::Add);
}

fn node_drawable(graph: &SceneGraph, id: NodeId) -> Option<&Drawable> {
    graph.get(id)?.drawable()
}

/// Runs the draw pass for already collected requests.
pub fn execute_draw_requests(
    requests: &DrawRequests,
    graph: &SceneGraph,
    effects: &mut [Effect],
    device: &mut dyn GraphicsDevice,
    camera: &Camera,
) -> DrawStats {
    let lights: Vec<&Drawable> = requests
        .lights
        .iter()
        .filter_map(|id| node_drawable(graph, *id))
        .collect();

    let mut stats = DrawStats {
        lights: lights.len(),
        ..Default::default()
    };

    for (effect_id, nodes) in &requests.batches {
        let Some(effect) = effects.get_mut(effect_id.0) else {
            warn!("No effect registered for {:?}, skipping {} drawables", effect_id, nodes.len());
            continue;
        };
        let batch: Vec<&Drawable> = nodes.iter().filter_map(|id| node_drawable(graph, *id)).collect();
        trace!("{}: {} drawables, {} lights", effect.name(), batch.len(), lights.len());

        reset_device_state(device);
        effect.draw(device, camera, &batch, &lights);

        stats.batches += 1;
        stats.drawables += batch.len();
    }

    stats
}

/// Clears the frame targets to `color`.
pub fn clear_frame(device: &mut dyn GraphicsDevice, color: Vector4<f32>) {
    device.clear_color(color);
    device.enable_depth_mask(true);
    device.clear_buffer(ClearBuffer::Color);
    device.clear_buffer(ClearBuffer::Depth);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::{DeviceCommand, RecordingDevice};

    #[test]
    fn test_reset_device_state_sequence() {
        let mut device = RecordingDevice::new();
        let handle = device.handle();
        reset_device_state(&mut device);

        assert_eq!(
            handle.commands(),
            vec![
                DeviceCommand::ColorMask(true, true, true, true),
                DeviceCommand::DepthTest(true),
                DeviceCommand::DepthMask(true),
                DeviceCommand::DepthFunc(CompareFunc::Less),
                DeviceCommand::DepthRange(0.0, 1.0),
                DeviceCommand::StencilTest(false),
                DeviceCommand::Clear(ClearBuffer::Stencil),
                DeviceCommand::StencilFunc(CompareFunc::Always, 0, 0xFF),
                DeviceCommand::StencilOp(StencilOp::Keep, StencilOp::Keep, StencilOp::Keep),
                DeviceCommand::CullFace(false),
                DeviceCommand::CullFaceMode(Face::Back),
                DeviceCommand::FrontFace(FrontFace::Ccw),
                DeviceCommand::Blend(false),
                DeviceCommand::BlendEquation(BlendEquation::Add),
            ]
        );
    }

    #[test]
    fn test_collect_from_missing_node_is_empty() {
        let mut graph = SceneGraph::new();
        let child = graph.create_child(graph.root(), None).unwrap();
        graph.remove(child);

        let requests = collect_draw_requests(&mut graph, child);
        assert!(requests.batches.is_empty());
        assert!(requests.lights.is_empty());
        assert_eq!(requests.drawable_count(), 0);
    }
}
