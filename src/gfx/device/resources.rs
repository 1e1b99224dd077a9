//! # Device Resources
//!
//! Handles for programs, buffers and vertex arrays created by a
//! [`GraphicsDevice`](super::GraphicsDevice).
//!
//! Handles are plain ids paired with a [`ReleaseGuard`]. Dropping the last
//! owner of a handle pushes its id onto the device's [`ReleaseQueue`]; the
//! device frees queued ids in `collect_garbage`, so a device resource is never
//! released while a drawable still references it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::uniform::Uniform;
use super::{BufferTarget, BufferUsage, GraphicsDevice};

/// Opaque id of a device resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Program,
    Buffer,
    VertexArray,
}

impl ResourceKind {
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Program => "program",
            ResourceKind::Buffer => "buffer",
            ResourceKind::VertexArray => "vertex array",
        }
    }
}

/// Ids allocated by a device plus the ids whose handles were dropped.
#[derive(Debug, Default)]
pub struct ReleaseQueue {
    next_id: AtomicU64,
    released: Mutex<Vec<(ResourceKind, ResourceId)>>,
}

impl ReleaseQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            released: Mutex::new(Vec::new()),
        })
    }

    /// Allocates a fresh id and the guard that will release it.
    pub fn allocate(self: &Arc<Self>, kind: ResourceKind) -> ReleaseGuard {
        let id = ResourceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        ReleaseGuard {
            id,
            kind,
            queue: Arc::clone(self),
        }
    }

    /// Takes every id released since the last call.
    pub fn drain(&self) -> Vec<(ResourceKind, ResourceId)> {
        match self.released.lock() {
            Ok(mut released) => std::mem::take(&mut *released),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    fn push(&self, kind: ResourceKind, id: ResourceId) {
        match self.released.lock() {
            Ok(mut released) => released.push((kind, id)),
            Err(poisoned) => poisoned.into_inner().push((kind, id)),
        }
    }
}

/// Enqueues its id for release when dropped.
#[derive(Debug)]
pub struct ReleaseGuard {
    id: ResourceId,
    kind: ResourceKind,
    queue: Arc<ReleaseQueue>,
}

impl ReleaseGuard {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.queue.push(self.kind, self.id);
    }
}

/// A compiled shader program with its introspected interface.
#[derive(Debug)]
pub struct Program {
    guard: ReleaseGuard,
    label: String,
    uniforms: BTreeMap<String, Uniform>,
    attributes: BTreeMap<String, u32>,
}

impl Program {
    pub fn new(
        guard: ReleaseGuard,
        label: impl Into<String>,
        uniforms: BTreeMap<String, Uniform>,
        attributes: BTreeMap<String, u32>,
    ) -> Self {
        Self {
            guard,
            label: label.into(),
            uniforms,
            attributes,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.guard.id()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Every active uniform: name to location and typed default.
    pub fn uniforms(&self) -> &BTreeMap<String, Uniform> {
        &self.uniforms
    }

    /// Every active vertex attribute: name to location.
    pub fn attributes(&self) -> &BTreeMap<String, u32> {
        &self.attributes
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }
}

/// A device buffer with a tracked capacity in bytes.
#[derive(Debug)]
pub struct Buffer {
    guard: ReleaseGuard,
    target: BufferTarget,
    usage: BufferUsage,
    capacity: usize,
}

impl Buffer {
    pub fn new(guard: ReleaseGuard, target: BufferTarget, usage: BufferUsage) -> Self {
        Self {
            guard,
            target,
            usage,
            capacity: 0,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.guard.id()
    }

    pub fn target(&self) -> BufferTarget {
        self.target
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// (Re)allocates `size` bytes, optionally filled from `data`.
    pub fn load_data(&mut self, device: &mut dyn GraphicsDevice, data: Option<&[u8]>, size: usize) {
        if let Some(data) = data {
            assert!(data.len() <= size, "buffer overflow: {} > {size}", data.len());
        }
        device.load_buffer_data(self.id(), data, size);
        self.capacity = size;
    }

    /// Writes `data` at `offset`.
    ///
    /// # Panics
    /// Panics when the write would end past the allocated capacity.
    pub fn load_sub_data(&self, device: &mut dyn GraphicsDevice, offset: usize, data: &[u8]) {
        assert!(
            offset + data.len() <= self.capacity,
            "buffer overflow: writing {} bytes at {offset} into {} bytes",
            data.len(),
            self.capacity
        );
        device.load_buffer_sub_data(self.id(), offset, data);
    }
}

/// A vertex array owning its element (index) list.
#[derive(Debug)]
pub struct VertexArray {
    guard: ReleaseGuard,
    element_count: usize,
}

impl VertexArray {
    pub fn new(guard: ReleaseGuard, element_count: usize) -> Self {
        Self {
            guard,
            element_count,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.guard.id()
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::{BufferTarget, BufferUsage, GraphicsDevice, RecordingDevice};

    #[test]
    fn test_guard_releases_on_drop() {
        let queue = ReleaseQueue::new();
        let a = queue.allocate(ResourceKind::Buffer);
        let b = queue.allocate(ResourceKind::VertexArray);
        assert_ne!(a.id(), b.id());

        let a_id = a.id();
        drop(a);
        assert_eq!(queue.drain(), vec![(ResourceKind::Buffer, a_id)]);
        assert!(queue.drain().is_empty());

        let shared = Arc::new(VertexArray::new(b, 3));
        let clone = Arc::clone(&shared);
        drop(shared);
        assert!(queue.drain().is_empty());
        drop(clone);
        assert_eq!(queue.drain().len(), 1);
    }

    fn vertex_buffer(device: &mut RecordingDevice) -> Buffer {
        device.create_buffer(BufferTarget::Vertex, BufferUsage::Static)
    }

    #[test]
    fn test_sub_data_within_capacity() {
        let mut device = RecordingDevice::new();
        let handle = device.handle();
        let mut buffer = vertex_buffer(&mut device);
        buffer.load_data(&mut device, None, 8);
        buffer.load_sub_data(&mut device, 4, &[1, 2, 3, 4]);

        assert_eq!(buffer.capacity(), 8);
        assert_eq!(handle.buffer_contents(buffer.id()), Some(vec![0, 0, 0, 0, 1, 2, 3, 4]));
    }

    #[test]
    #[should_panic(expected = "buffer overflow")]
    fn test_sub_data_past_capacity_panics() {
        let mut device = RecordingDevice::new();
        let mut buffer = vertex_buffer(&mut device);
        buffer.load_data(&mut device, None, 8);
        buffer.load_sub_data(&mut device, 6, &[1, 2, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "buffer overflow")]
    fn test_load_data_larger_than_size_panics() {
        let mut device = RecordingDevice::new();
        let mut buffer = vertex_buffer(&mut device);
        buffer.load_data(&mut device, Some(&[0u8; 12]), 8);
    }
}
