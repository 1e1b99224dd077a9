use std::path::Path;

use cgmath::Vector3;
use log::{debug, info, warn};

use super::ImportError;
use crate::gfx::device::DeviceError;
use crate::gfx::drawables::Drawable;
use crate::gfx::effects::{EffectId, ForwardPhongEffect, SharedProperty};
use crate::gfx::geometry::compute_vertex_normals;
use crate::gfx::scene::{DrawContext, NodeId};

/// Phong parameters read from an MTL material.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub shininess: f32,
}

impl Default for ImportedMaterial {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            diffuse: Vector3::new(1.0, 1.0, 1.0),
            specular: Vector3::new(1.0, 1.0, 1.0),
            shininess: 32.0,
        }
    }
}

impl From<tobj::Material> for ImportedMaterial {
    fn from(material: tobj::Material) -> Self {
        let defaults = Self::default();
        Self {
            name: material.name,
            diffuse: material.diffuse.map(Vector3::from).unwrap_or(defaults.diffuse),
            specular: material.specular.map(Vector3::from).unwrap_or(defaults.specular),
            shininess: material.shininess.unwrap_or(defaults.shininess),
        }
    }
}

/// One triangulated shape of an OBJ file, indexed with a single index per
/// vertex.
#[derive(Debug, Clone)]
pub struct ImportedShape {
    pub name: String,
    pub elements: Vec<u32>,
    pub positions: Vec<Vector3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub texcoords: Vec<[f32; 2]>,
    /// Index into [`ImportedScene::materials`].
    pub material: Option<usize>,
}

impl ImportedShape {
    fn from_model(model: tobj::Model) -> Self {
        let mesh = model.mesh;
        let positions: Vec<Vector3<f32>> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| Vector3::new(p[0], p[1], p[2]))
            .collect();

        let normals = if mesh.normals.len() == mesh.positions.len() {
            mesh.normals
                .chunks_exact(3)
                .map(|n| Vector3::new(n[0], n[1], n[2]))
                .collect()
        } else {
            debug!("Shape '{}' has no normals, computing them", model.name);
            compute_vertex_normals(&positions, &mesh.indices)
        };

        let texcoords = mesh.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect();

        Self {
            name: model.name,
            elements: mesh.indices,
            positions,
            normals,
            texcoords,
            material: mesh.material_id,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.elements.len() / 3
    }
}

/// Parsed contents of one OBJ file, not yet part of any scene.
#[derive(Debug, Clone, Default)]
pub struct ImportedScene {
    pub name: String,
    pub shapes: Vec<ImportedShape>,
    pub materials: Vec<ImportedMaterial>,
}

/// Parses `path` and the material libraries it references.
///
/// Faces are triangulated and re-indexed so positions, normals and texture
/// coordinates share one index. A missing or broken material library only
/// drops the materials; shapes then use the default white material.
pub fn load_obj(path: impl AsRef<Path>) -> Result<ImportedScene, ImportError> {
    let path = path.as_ref();
    info!("Importing {}", path.display());

    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )?;

    let materials = materials.unwrap_or_else(|e| {
        warn!("Failed to load materials for {}: {}", path.display(), e);
        Vec::new()
    });

    let scene = ImportedScene {
        name: path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        shapes: models
            .into_iter()
            .map(ImportedShape::from_model)
            .filter(|shape| shape.triangle_count() > 0)
            .collect(),
        materials: materials.into_iter().map(ImportedMaterial::from).collect(),
    };

    if scene.shapes.is_empty() {
        return Err(ImportError::EmptyScene(path.display().to_string()));
    }

    info!(
        "Parsed '{}': {} shapes, {} materials, {} triangles",
        scene.name,
        scene.shapes.len(),
        scene.materials.len(),
        scene.triangle_count()
    );
    Ok(scene)
}

impl ImportedScene {
    pub fn triangle_count(&self) -> usize {
        self.shapes.iter().map(ImportedShape::triangle_count).sum()
    }

    /// Adds the scene under the root of `context`. See [`splice_under`](Self::splice_under).
    pub fn splice(&self, context: &mut DrawContext) -> Result<NodeId, ImportError> {
        let root = context.root();
        self.splice_under(context, root)
    }

    /// Uploads every shape, then inserts one group node under `parent` with a
    /// child per shape. Returns the group node.
    ///
    /// Shapes are shaded with [`ForwardPhongEffect`], registering it first if
    /// the context lacks it. The graph is only touched once everything else
    /// has succeeded.
    pub fn splice_under(&self, context: &mut DrawContext, parent: NodeId) -> Result<NodeId, ImportError> {
        if !context.graph().contains(parent) {
            return Err(ImportError::MissingParent);
        }

        let phong = match context.effect_id(ForwardPhongEffect::NAME) {
            Some(id) => id,
            None => context.create_effect(ForwardPhongEffect::NAME, |device| {
                Ok(ForwardPhongEffect::new(device)?.into())
            })?,
        };

        let properties = self
            .materials
            .iter()
            .map(|material| phong_property(context, phong, material))
            .collect::<Result<Vec<_>, _>>()?;
        let default_property = phong_property(context, phong, &ImportedMaterial::default())?;

        let drawables: Vec<Drawable> = self
            .shapes
            .iter()
            .map(|shape| {
                let property = shape
                    .material
                    .and_then(|index| properties.get(index))
                    .unwrap_or(&default_property);
                context
                    .create_geometry(Some(property.clone()), &shape.elements, &shape.positions, &shape.normals)
                    .with_name(shape.name.clone())
            })
            .collect();

        let group = context
            .create_child(parent, None)
            .ok_or(ImportError::MissingParent)?;
        for drawable in drawables {
            context.create_child(group, Some(drawable));
        }

        info!(
            "Imported '{}': {} shapes, {} materials",
            self.name,
            self.shapes.len(),
            self.materials.len()
        );
        Ok(group)
    }
}

fn phong_property(
    context: &DrawContext,
    phong: EffectId,
    material: &ImportedMaterial,
) -> Result<SharedProperty, DeviceError> {
    let property = context.create_property(phong).ok_or(DeviceError::UnknownResource {
        kind: "effect",
        id: phong.0 as u64,
    })?;
    property.set_param(ForwardPhongEffect::DIFFUSE_COLOR, material.diffuse);
    property.set_param(ForwardPhongEffect::SPECULAR_COLOR, material.specular);
    property.set_param(ForwardPhongEffect::DIFFUSE_REFLECTION, 1.0f32);
    property.set_param(ForwardPhongEffect::SPECULAR_REFLECTION, 1.0f32);
    property.set_param(ForwardPhongEffect::SHININESS, material.shininess);
    Ok(property)
}
