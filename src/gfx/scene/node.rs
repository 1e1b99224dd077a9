//! Transform nodes stored in an arena.
//!
//! Every node lives in a slot of [`SceneGraph`] and is addressed by a
//! generational [`NodeId`]. A parent exclusively owns its children: removing a
//! node destroys its whole subtree and bumps the slot generations, so stale
//! ids (including parent links into a removed subtree) resolve to `None`
//! instead of dangling.

use cgmath::{Matrix4, One, Quaternion, Vector3};

use crate::gfx::drawables::Drawable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// A transform with an optional drawable payload.
#[derive(Debug, Clone)]
pub struct Node {
    position: Vector3<f32>,
    scale: Vector3<f32>,
    rotation: Quaternion<f32>,
    drawable: Option<Drawable>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(parent: Option<NodeId>, drawable: Option<Drawable>) -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation: Quaternion::one(),
            drawable,
            parent,
            children: Vec::new(),
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
    }

    pub fn rotation(&self) -> Quaternion<f32> {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quaternion<f32>) {
        self.rotation = rotation;
    }

    pub fn drawable(&self) -> Option<&Drawable> {
        self.drawable.as_ref()
    }

    pub fn drawable_mut(&mut self) -> Option<&mut Drawable> {
        self.drawable.as_mut()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// `Scale(scale) * Rotate(rotation) * Translate(position)`.
    pub fn local_transform(&self) -> Matrix4<f32> {
        Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
            * Matrix4::from(self.rotation)
            * Matrix4::from_translation(self.position)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of transform nodes under a single root.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// A graph holding only an empty root node.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::new(None, None)),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Appends a new child to `parent`. Returns `None` if `parent` is gone.
    pub fn create_child(&mut self, parent: NodeId, drawable: Option<Drawable>) -> Option<NodeId> {
        if !self.contains(parent) {
            return None;
        }

        let node = Node::new(Some(parent), drawable);
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };

        self.get_mut(parent)?.children.push(id);
        Some(id)
    }

    /// Destroys the subtree rooted at `child` and returns the sibling that
    /// followed it, if any.
    ///
    /// Nothing happens (and `None` is returned) when `child` is not a child of
    /// `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Option<NodeId> {
        let children = &mut self.get_mut(parent)?.children;
        let position = children.iter().position(|&c| c == child)?;
        children.remove(position);
        let next = children.get(position).copied();
        self.destroy_subtree(child);
        next
    }

    /// Detaches `id` from its parent and destroys its subtree. The root
    /// cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        match self.get(id).and_then(|node| node.parent) {
            Some(parent) => {
                self.remove_child(parent, id);
                true
            }
            None => false,
        }
    }

    fn destroy_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(slot) = self.slots.get_mut(id.index as usize) else {
                continue;
            };
            if slot.generation != id.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                pending.extend(node.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
        }
    }

    /// Product of the local transforms from the root down to `id`.
    pub fn world_transform(&self, id: NodeId) -> Option<Matrix4<f32>> {
        let mut node = self.get(id)?;
        let mut world = node.local_transform();
        while let Some(parent) = node.parent {
            node = self.get(parent)?;
            world = node.local_transform() * world;
        }
        Some(world)
    }

    /// Ids of the subtree rooted at `start` in depth-first pre-order,
    /// children in insertion order.
    pub fn preorder(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev());
        }
        order
    }

    /// Depth of `id` below the root (root is 0).
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let mut node = self.get(id)?;
        let mut depth = 0;
        while let Some(parent) = node.parent {
            node = self.get(parent)?;
            depth += 1;
        }
        Some(depth)
    }
}
