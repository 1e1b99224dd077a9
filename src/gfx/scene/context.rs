//! The draw context ties the scene graph to a graphics device.
//!
//! A [`DrawContext`] owns the camera, the device, the registered effects, the
//! node arena, and the lazily created sphere shared by all point lights. It is
//! the factory for properties, geometry and lights, and runs the per-frame
//! dispatch. Background work shares it through [`SharedScene`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use cgmath::{Vector3, Vector4};
use log::{debug, warn};

use super::dispatch::{self, DrawStats};
use super::node::{NodeId, SceneGraph};
use crate::gfx::bounds::BoundingBox;
use crate::gfx::camera::Camera;
use crate::gfx::device::{DeviceError, GraphicsDevice};
use crate::gfx::drawables::{Drawable, Geometry, PointLight};
use crate::gfx::effects::{ColorEffect, Effect, EffectId, ForwardPhongEffect, SharedProperty};
use crate::gfx::geometry::{generate_sphere, GeometryData};

/// A draw context guarded by the scene-wide lock.
pub type SharedScene = Arc<Mutex<DrawContext>>;

const POINT_LIGHT_LONGITUDES: u32 = 16;
const POINT_LIGHT_LATITUDES: u32 = 8;
const POINT_LIGHT_RADIUS: f32 = 0.1;

/// Effects addressed by name and by [`EffectId`].
///
/// Registering a name again points the name at the new effect. The old
/// effect stays alive for the properties already bound to it.
#[derive(Debug, Default)]
pub struct EffectRegistry {
    effects: Vec<Effect>,
    names: BTreeMap<String, EffectId>,
}

impl EffectRegistry {
    pub fn register(&mut self, name: &str, effect: Effect) -> EffectId {
        let id = EffectId(self.effects.len());
        self.effects.push(effect);
        if self.names.insert(name.to_string(), id).is_some() && cfg!(debug_assertions) {
            warn!("Another effect with name '{}' already exists in the context", name);
        }
        id
    }

    pub fn id(&self, name: &str) -> Option<EffectId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, id: EffectId) -> Option<&Effect> {
        self.effects.get(id.0)
    }

    pub fn get_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
        self.effects.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

pub struct DrawContext {
    camera: Camera,
    device: Box<dyn GraphicsDevice>,
    graph: SceneGraph,
    effects: EffectRegistry,
    point_light_geometry: Option<Arc<Geometry>>,
    clear_color: Vector4<f32>,
}

impl std::fmt::Debug for DrawContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawContext")
            .field("camera", &self.camera)
            .field("nodes", &self.graph.len())
            .field("effects", &self.effects.len())
            .finish()
    }
}

impl DrawContext {
    /// An empty scene with no effects registered.
    pub fn new(device: Box<dyn GraphicsDevice>) -> Self {
        Self {
            camera: Camera::new(),
            device,
            graph: SceneGraph::new(),
            effects: EffectRegistry::default(),
            point_light_geometry: None,
            clear_color: Vector4::new(0.0, 0.0, 0.0, 1.0),
        }
    }

    /// An empty scene with [`ColorEffect`] and [`ForwardPhongEffect`]
    /// registered under their names.
    pub fn with_default_effects(device: Box<dyn GraphicsDevice>) -> Result<Self, DeviceError> {
        let mut context = Self::new(device);
        context.create_effect(ColorEffect::NAME, |device| Ok(ColorEffect::new(device)?.into()))?;
        context.create_effect(ForwardPhongEffect::NAME, |device| {
            Ok(ForwardPhongEffect::new(device)?.into())
        })?;
        Ok(context)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn root(&self) -> NodeId {
        self.graph.root()
    }

    pub fn set_clear_color(&mut self, color: Vector4<f32>) {
        self.clear_color = color;
    }

    /// Builds an effect on this context's device and registers it as `name`.
    pub fn create_effect<F>(&mut self, name: &str, factory: F) -> Result<EffectId, DeviceError>
    where
        F: FnOnce(&mut dyn GraphicsDevice) -> Result<Effect, DeviceError>,
    {
        let effect = factory(self.device.as_mut())?;
        debug!("Registered effect '{}' ({})", name, effect.name());
        Ok(self.effects.register(name, effect))
    }

    pub fn effect_id(&self, name: &str) -> Option<EffectId> {
        self.effects.id(name)
    }

    pub fn effect(&self, id: EffectId) -> Option<&Effect> {
        self.effects.get(id)
    }

    pub fn effect_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
        self.effects.get_mut(id)
    }

    /// A fresh property for `effect`, holding the default of every
    /// per-drawable uniform.
    pub fn create_property(&self, effect: EffectId) -> Option<SharedProperty> {
        self.effects
            .get(effect)
            .map(|e| Arc::new(e.create_property(effect)))
    }

    /// Uploads a mesh and wraps it in a drawable, bound to `property` if given.
    pub fn create_geometry(
        &mut self,
        property: Option<SharedProperty>,
        elements: &[u32],
        positions: &[Vector3<f32>],
        normals: &[Vector3<f32>],
    ) -> Drawable {
        let mut geometry = Geometry::new(self.device.as_mut(), elements, positions, normals);
        if let Some(property) = property {
            self.bind_property(&mut geometry, property);
        }
        geometry.into()
    }

    pub fn create_geometry_from(&mut self, property: Option<SharedProperty>, data: &GeometryData) -> Drawable {
        self.create_geometry(property, &data.indices, &data.positions, &data.normals)
    }

    /// A pole-capped sphere drawable.
    pub fn create_sphere(
        &mut self,
        property: Option<SharedProperty>,
        longitude_divisions: u32,
        latitude_divisions: u32,
        radius: f32,
    ) -> Drawable {
        let data = generate_sphere(longitude_divisions, latitude_divisions, radius);
        self.create_geometry_from(property, &data)
    }

    /// A drawable over `element_count` elements of `source` starting at
    /// `element_offset`, sharing its vertex array and buffer.
    pub fn create_sub_geometry(
        &mut self,
        property: Option<SharedProperty>,
        source: &Geometry,
        element_offset: usize,
        element_count: usize,
    ) -> Drawable {
        let mut geometry = Geometry::from_shared(
            Arc::clone(source.vertex_array()),
            Arc::clone(source.buffer()),
            element_count,
            element_offset,
            source.position_offset(),
            source.normal_offset(),
        );
        if let Some(property) = property {
            self.bind_property(&mut geometry, property);
        }
        geometry.into()
    }

    fn bind_property(&mut self, geometry: &mut Geometry, property: SharedProperty) {
        match self.effects.get(property.effect()) {
            Some(effect) => geometry.set_shading_property(self.device.as_mut(), effect, property),
            None => warn!("Shading property refers to unknown {:?}", property.effect()),
        }
    }

    /// Binds `property` to the geometry held by `node`. Returns false when the
    /// node is gone or holds no geometry.
    pub fn set_shading_property(&mut self, node: NodeId, property: SharedProperty) -> bool {
        let Some(effect) = self.effects.get(property.effect()) else {
            warn!("Shading property refers to unknown {:?}", property.effect());
            return false;
        };
        let Some(geometry) = self
            .graph
            .get_mut(node)
            .and_then(|node| node.drawable_mut())
            .and_then(|drawable| drawable.as_geometry_mut())
        else {
            return false;
        };
        geometry.set_shading_property(self.device.as_mut(), effect, property);
        true
    }

    /// The sphere shared by every point light, created on first use with a
    /// white [`ColorEffect`] property.
    pub fn point_light_geometry(&mut self) -> Result<Arc<Geometry>, DeviceError> {
        if let Some(geometry) = &self.point_light_geometry {
            return Ok(Arc::clone(geometry));
        }

        let effect = match self.effects.id(ColorEffect::NAME) {
            Some(id) => id,
            None => self.create_effect(ColorEffect::NAME, |device| Ok(ColorEffect::new(device)?.into()))?,
        };
        let property = self.create_property(effect).ok_or(DeviceError::UnknownResource {
            kind: "effect",
            id: effect.0 as u64,
        })?;
        property.set_param(ColorEffect::COLOR, Vector3::new(1.0f32, 1.0, 1.0));

        let data = generate_sphere(POINT_LIGHT_LONGITUDES, POINT_LIGHT_LATITUDES, POINT_LIGHT_RADIUS);
        let mut geometry = Geometry::new(self.device.as_mut(), &data.indices, &data.positions, &data.normals);
        self.bind_property(&mut geometry, property);

        let geometry = Arc::new(geometry);
        self.point_light_geometry = Some(Arc::clone(&geometry));
        Ok(geometry)
    }

    pub fn create_point_light(&mut self, color: Vector3<f32>, radius: f32) -> Result<Drawable, DeviceError> {
        let sentinel = self.point_light_geometry()?;
        Ok(PointLight::new(color, radius, sentinel).into())
    }

    pub fn create_child(&mut self, parent: NodeId, drawable: Option<Drawable>) -> Option<NodeId> {
        self.graph.create_child(parent, drawable)
    }

    /// Local bounds of every geometry in the subtree, mapped through each
    /// node's world transform.
    pub fn subtree_bounds(&self, start: NodeId) -> Option<BoundingBox> {
        self.graph
            .preorder(start)
            .into_iter()
            .filter_map(|id| {
                let bounds = self.graph.get(id)?.drawable()?.as_geometry()?.bounds()?;
                Some(bounds.transformed(&self.graph.world_transform(id)?))
            })
            .reduce(|a, b| a.union(&b))
    }

    /// Dispatches the whole scene.
    pub fn draw(&mut self) -> DrawStats {
        self.draw_from(self.graph.root())
    }

    /// Dispatches the subtree at `start`.
    pub fn draw_from(&mut self, start: NodeId) -> DrawStats {
        let requests = dispatch::collect_draw_requests(&mut self.graph, start);
        dispatch::execute_draw_requests(
            &requests,
            &self.graph,
            &mut self.effects.effects,
            self.device.as_mut(),
            &self.camera,
        )
    }

    /// Frame bracket: frees released resources, clears, dispatches the
    /// scene and submits.
    pub fn render_frame(&mut self) -> Result<DrawStats, DeviceError> {
        self.device.begin_frame();
        dispatch::clear_frame(self.device.as_mut(), self.clear_color);
        let stats = self.draw();
        self.device.end_frame()?;
        Ok(stats)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.device.resize(width, height);
        self.device.set_viewport(0, 0, width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Matrix4, Quaternion, Rad, Rotation3};

    use crate::gfx::device::{DeviceCommand, RecordingDevice, RecordingHandle, UniformValue};
    use crate::gfx::drawables::{NORMAL_ATTRIBUTE, POSITION_ATTRIBUTE};

    fn context() -> (DrawContext, RecordingHandle) {
        let device = RecordingDevice::new();
        let handle = device.handle();
        (DrawContext::with_default_effects(Box::new(device)).unwrap(), handle)
    }

    fn phong_property(context: &DrawContext) -> SharedProperty {
        let phong = context.effect_id(ForwardPhongEffect::NAME).unwrap();
        context.create_property(phong).unwrap()
    }

    fn triangle(context: &mut DrawContext, property: Option<SharedProperty>) -> Drawable {
        context.create_geometry(
            property,
            &[0, 1, 2],
            &[
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
            &[Vector3::new(0.0, 0.0, 1.0); 3],
        )
    }

    fn assert_mat_eq(a: Matrix4<f32>, b: Matrix4<f32>) {
        for c in 0..4 {
            for r in 0..4 {
                assert!((a[c][r] - b[c][r]).abs() < 1e-4, "{:?} != {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_batches_by_effect() {
        let (mut context, handle) = context();
        let root = context.root();

        let color = context.effect_id(ColorEffect::NAME).unwrap();
        let color_property = context.create_property(color).unwrap();
        let phong_property = phong_property(&context);

        for property in [&phong_property, &color_property, &phong_property] {
            let drawable = triangle(&mut context, Some(Arc::clone(property)));
            context.create_child(root, Some(drawable)).unwrap();
        }

        handle.clear();
        let stats = context.draw();
        assert_eq!(
            stats,
            DrawStats {
                batches: 2,
                drawables: 3,
                lights: 0
            }
        );

        // one program bind per batch, in effect registration order
        let binds: Vec<_> = handle
            .commands()
            .into_iter()
            .filter_map(|command| match command {
                DeviceCommand::BindProgram(id) => Some(id),
                _ => None,
            })
            .collect();
        let color_program = context.effect(color).unwrap().program_id();
        let phong_program = context.effect(phong_property.effect()).unwrap().program_id();
        assert_eq!(binds, vec![color_program, phong_program]);

        let calls = handle.draw_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].program, Some(color_program));
        assert!(calls[1..].iter().all(|call| call.program == Some(phong_program)));
    }

    #[test]
    fn test_drawables_without_property_are_never_batched() {
        let (mut context, handle) = context();
        let root = context.root();
        let drawable = triangle(&mut context, None);
        let node = context.create_child(root, Some(drawable)).unwrap();

        let requests = dispatch::collect_draw_requests(context.graph_mut(), root);
        assert!(requests.batches.values().all(|batch| !batch.contains(&node)));
        assert_eq!(requests.drawable_count(), 0);

        handle.clear();
        assert_eq!(context.draw(), DrawStats::default());
        assert!(handle.draw_calls().is_empty());
    }

    #[test]
    fn test_state_reset_precedes_every_batch() {
        let (mut context, handle) = context();
        let root = context.root();
        let light = context.create_point_light(Vector3::new(1.0, 1.0, 1.0), 5.0).unwrap();
        context.create_child(root, Some(light)).unwrap();
        let property = phong_property(&context);
        let drawable = triangle(&mut context, Some(property));
        context.create_child(root, Some(drawable)).unwrap();

        handle.clear();
        context.draw();

        let commands = handle.commands();
        let binds: Vec<usize> = commands
            .iter()
            .enumerate()
            .filter(|(_, command)| matches!(command, DeviceCommand::BindProgram(_)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(binds.len(), 2);
        for bind in binds {
            let window = &commands[bind - 14..bind];
            assert_eq!(window[0], DeviceCommand::ColorMask(true, true, true, true));
            assert_eq!(window[13], DeviceCommand::BlendEquation(crate::gfx::device::BlendEquation::Add));
        }
    }

    #[test]
    fn test_lights_truncated_in_traversal_order() {
        let (mut context, handle) = context();
        let root = context.root();

        let colors: Vec<Vector3<f32>> = (0..15).map(|i| Vector3::new(i as f32 / 15.0, 0.5, 0.25)).collect();
        for (i, color) in colors.iter().enumerate() {
            let light = context.create_point_light(*color, 1.0 + i as f32).unwrap();
            let node = context.create_child(root, Some(light)).unwrap();
            context
                .graph_mut()
                .get_mut(node)
                .unwrap()
                .set_position(Vector3::new(i as f32, 0.0, 0.0));
        }
        let property = phong_property(&context);
        let drawable = triangle(&mut context, Some(property.clone()));
        context.create_child(root, Some(drawable)).unwrap();

        handle.clear();
        let stats = context.draw();
        assert_eq!(stats.lights, 15);
        assert_eq!(stats.drawables, 16);

        let phong_program = context.effect(property.effect()).unwrap().program_id();
        let calls = handle.draw_calls();
        let call = calls
            .iter()
            .find(|call| call.program == Some(phong_program))
            .unwrap();

        assert_eq!(call.uniform(ForwardPhongEffect::LIGHT_COUNT), Some(&UniformValue::Int(10)));
        for (i, color) in colors.iter().take(10).enumerate() {
            let name = ForwardPhongEffect::light_uniform(ForwardPhongEffect::LIGHT_COLOR, i);
            assert_eq!(call.uniform(&name), Some(&UniformValue::Vec3(*color)));
            let name = ForwardPhongEffect::light_uniform(ForwardPhongEffect::LIGHT_RADIUS, i);
            assert_eq!(call.uniform(&name), Some(&UniformValue::Float(1.0 + i as f32)));
        }
    }

    #[test]
    fn test_light_count_matches_lights_below_limit() {
        let (mut context, handle) = context();
        let root = context.root();
        for i in 0..3 {
            let light = context.create_point_light(Vector3::new(1.0, 1.0, 1.0), 1.0 + i as f32).unwrap();
            context.create_child(root, Some(light)).unwrap();
        }
        let property = phong_property(&context);
        let drawable = triangle(&mut context, Some(property.clone()));
        context.create_child(root, Some(drawable)).unwrap();

        handle.clear();
        assert_eq!(context.draw().lights, 3);

        let phong_program = context.effect(property.effect()).unwrap().program_id();
        let call = handle
            .draw_calls()
            .into_iter()
            .find(|call| call.program == Some(phong_program))
            .unwrap();
        assert_eq!(call.uniform(ForwardPhongEffect::LIGHT_COUNT), Some(&UniformValue::Int(3)));
        let name = ForwardPhongEffect::light_uniform(ForwardPhongEffect::LIGHT_RADIUS, 2);
        assert_eq!(call.uniform(&name), Some(&UniformValue::Float(3.0)));
    }

    #[test]
    fn test_group_transform_reaches_nested_geometry() {
        let (mut context, _handle) = context();
        let root = context.root();

        let light = context.create_point_light(Vector3::new(1.0, 1.0, 1.0), 10.0).unwrap();
        let light_node = context.create_child(root, Some(light)).unwrap();
        context
            .graph_mut()
            .get_mut(light_node)
            .unwrap()
            .set_position(Vector3::new(1.0, 2.0, 3.0));

        let group = context.create_child(root, None).unwrap();
        {
            let node = context.graph_mut().get_mut(group).unwrap();
            node.set_position(Vector3::new(0.0, 1.0, 0.0));
            node.set_scale(Vector3::new(2.0, 2.0, 2.0));
            node.set_rotation(Quaternion::from_angle_y(Rad(0.5)));
        }
        let group_local = context.graph().get(group).unwrap().local_transform();

        let mut children = Vec::new();
        for x in [-1.0, 1.0] {
            let property = phong_property(&context);
            let drawable = triangle(&mut context, Some(property));
            let child = context.create_child(group, Some(drawable)).unwrap();
            context
                .graph_mut()
                .get_mut(child)
                .unwrap()
                .set_position(Vector3::new(x, 0.0, 0.0));
            children.push(child);
        }

        let requests = dispatch::collect_draw_requests(context.graph_mut(), root);
        assert_eq!(requests.lights, vec![light_node]);
        assert_eq!(requests.drawable_count(), 3);

        let graph = context.graph();
        let light = graph.get(light_node).unwrap().drawable().unwrap();
        let position = light.world_position();
        assert!((position - Vector3::new(1.0, 2.0, 3.0)).magnitude() < 1e-5);

        for child in children {
            let node = graph.get(child).unwrap();
            let expected = group_local * node.local_transform();
            assert_mat_eq(node.drawable().unwrap().transformation(), expected);
            assert_eq!(graph.depth(child), Some(2));
        }
    }

    #[test]
    fn test_geometry_upload_round_trips_through_draw() {
        let (mut context, handle) = context();
        let positions = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let elements = [2, 0, 1, 3, 2, 0];
        let property = phong_property(&context);
        let drawable = context.create_geometry(Some(property), &elements, &positions, &[Vector3::new(0.0, 0.0, 1.0); 4]);
        let geometry = drawable.as_geometry().unwrap().clone();
        context.create_child(context.root(), Some(drawable)).unwrap();

        // element N's position sits at byte N * 12 of the position stream
        let contents = handle.buffer_contents(geometry.buffer().id()).unwrap();
        for (n, position) in positions.iter().enumerate() {
            let floats: Vec<f32> = contents[n * 12..n * 12 + 12]
                .chunks_exact(4)
                .map(|word| f32::from_ne_bytes([word[0], word[1], word[2], word[3]]))
                .collect();
            assert_eq!(floats, vec![position.x, position.y, position.z]);
        }

        handle.clear();
        context.draw();
        let call = handle.draw_calls().pop().unwrap();
        assert_eq!(call.count, elements.len());
        assert_eq!(call.byte_offset, 0);

        let phong = context.effect_id(ForwardPhongEffect::NAME).unwrap();
        let location = context.effect(phong).unwrap().attributes()[POSITION_ATTRIBUTE.name];
        let vertices = handle.fetch_vertices(&call, location).unwrap();
        let expected: Vec<Vec<f32>> = elements
            .iter()
            .map(|&i| vec![positions[i as usize].x, positions[i as usize].y, positions[i as usize].z])
            .collect();
        assert_eq!(vertices, expected);
    }

    #[test]
    fn test_sub_geometry_draws_offset_element_range() {
        let (mut context, handle) = context();
        let positions = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let elements = [0, 1, 2, 2, 3, 0];
        let whole = context.create_geometry(None, &elements, &positions, &[]);
        let source = whole.as_geometry().unwrap().clone();

        let property = phong_property(&context);
        let sub = context.create_sub_geometry(Some(property), &source, 3, 3);
        {
            let geometry = sub.as_geometry().unwrap();
            assert!(Arc::ptr_eq(geometry.vertex_array(), source.vertex_array()));
            assert!(Arc::ptr_eq(geometry.buffer(), source.buffer()));
        }
        context.create_child(context.root(), Some(sub)).unwrap();

        handle.clear();
        context.draw();
        let call = handle.draw_calls().pop().unwrap();
        assert_eq!(call.count, 3);
        assert_eq!(call.byte_offset, 12);

        let phong = context.effect_id(ForwardPhongEffect::NAME).unwrap();
        let location = context.effect(phong).unwrap().attributes()[POSITION_ATTRIBUTE.name];
        let vertices = handle.fetch_vertices(&call, location).unwrap();
        let expected: Vec<Vec<f32>> = elements[3..6]
            .iter()
            .map(|&i| vec![positions[i as usize].x, positions[i as usize].y, positions[i as usize].z])
            .collect();
        assert_eq!(vertices, expected);

        // no normal stream, so phong's normal location stays unbound
        assert_eq!(
            handle.enabled_attribs(source.vertex_array().id()),
            BTreeMap::from([(location, 0)])
        );
    }

    #[test]
    fn test_attributes_bound_only_when_effect_declares_them() {
        let (mut context, handle) = context();

        let color = context.effect_id(ColorEffect::NAME).unwrap();
        let flat_property = context.create_property(color);
        let flat = triangle(&mut context, flat_property);
        let flat_vao = flat.as_geometry().unwrap().vertex_array().id();
        let position_location = context.effect(color).unwrap().attributes()[POSITION_ATTRIBUTE.name];
        assert_eq!(
            handle.enabled_attribs(flat_vao),
            BTreeMap::from([(position_location, 0)])
        );

        let property = phong_property(&context);
        let phong = context.effect(property.effect()).unwrap();
        let normal_location = phong.attributes()[NORMAL_ATTRIBUTE.name];
        let position_location = phong.attributes()[POSITION_ATTRIBUTE.name];
        let lit = triangle(&mut context, Some(property));
        let lit_vao = lit.as_geometry().unwrap().vertex_array().id();
        assert_eq!(
            handle.enabled_attribs(lit_vao),
            BTreeMap::from([(position_location, 0), (normal_location, 36)])
        );

        let bare = triangle(&mut context, None);
        assert!(handle
            .enabled_attribs(bare.as_geometry().unwrap().vertex_array().id())
            .is_empty());
    }

    #[test]
    fn test_point_lights_share_sentinel_and_draw_in_own_color() {
        let (mut context, handle) = context();
        let root = context.root();
        let red = context.create_point_light(Vector3::new(1.0, 0.0, 0.0), 1.0).unwrap();
        let blue = context.create_point_light(Vector3::new(0.0, 0.0, 1.0), 1.0).unwrap();
        assert!(Arc::ptr_eq(
            red.as_point_light().unwrap().sentinel(),
            blue.as_point_light().unwrap().sentinel()
        ));
        context.create_child(root, Some(red)).unwrap();
        context.create_child(root, Some(blue)).unwrap();

        handle.clear();
        context.draw();
        let colors: Vec<_> = handle
            .draw_calls()
            .iter()
            .map(|call| call.uniform(ColorEffect::COLOR).cloned())
            .collect();
        assert_eq!(
            colors,
            vec![
                Some(UniformValue::Vec3(Vector3::new(1.0, 0.0, 0.0))),
                Some(UniformValue::Vec3(Vector3::new(0.0, 0.0, 1.0))),
            ]
        );

        // the shared property keeps its own value
        let sentinel = context.point_light_geometry().unwrap();
        assert_eq!(
            sentinel.shading_property().unwrap().param(ColorEffect::COLOR),
            Some(UniformValue::Vec3(Vector3::new(1.0, 1.0, 1.0)))
        );
    }

    #[test]
    fn test_reregistering_effect_name_keeps_old_effect() {
        let (mut context, _handle) = context();
        let old = context.effect_id(ColorEffect::NAME).unwrap();
        let property = context.create_property(old).unwrap();

        let new = context
            .create_effect(ColorEffect::NAME, |device| Ok(ColorEffect::new(device)?.into()))
            .unwrap();
        assert_ne!(old, new);
        assert_eq!(context.effect_id(ColorEffect::NAME), Some(new));
        assert!(context.effect(property.effect()).is_some());
    }

    #[test]
    fn test_subtree_bounds_follow_transforms() {
        let (mut context, _handle) = context();
        let root = context.root();
        assert!(context.subtree_bounds(root).is_none());

        let drawable = triangle(&mut context, None);
        let node = context.create_child(root, Some(drawable)).unwrap();
        context
            .graph_mut()
            .get_mut(node)
            .unwrap()
            .set_position(Vector3::new(10.0, 0.0, 0.0));

        let bounds = context.subtree_bounds(root).unwrap();
        assert!((bounds.min - Vector3::new(10.0, 0.0, 0.0)).magnitude() < 1e-5);
        assert!((bounds.max - Vector3::new(11.0, 1.0, 0.0)).magnitude() < 1e-5);
    }
}
