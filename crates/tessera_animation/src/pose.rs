use std::collections::BTreeMap;
use std::sync::OnceLock;

use glam::Vec3;

use crate::vertex_data::{VertexBuffer, xyz_range};

/// A named set of per-vertex position offsets for one vertex data block.
///
/// `target` follows the vertex track handle convention: 0 is the mesh's
/// shared vertex data, `n` is sub-mesh `n - 1`.
#[derive(Debug, Clone)]
pub struct Pose {
    target: u16,
    name: String,
    vertex_offsets: BTreeMap<usize, Vec3>,
    hardware_buffer: OnceLock<VertexBuffer>,
}

impl Pose {
    #[must_use]
    pub fn new(target: u16, name: impl Into<String>) -> Self {
        Self {
            target,
            name: name.into(),
            vertex_offsets: BTreeMap::new(),
            hardware_buffer: OnceLock::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> u16 {
        self.target
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the offset of vertex `index`, replacing any previous one.
    pub fn add_vertex(&mut self, index: usize, offset: Vec3) {
        self.vertex_offsets.insert(index, offset);
        self.hardware_buffer.take();
    }

    pub fn remove_vertex(&mut self, index: usize) {
        self.vertex_offsets.remove(&index);
        self.hardware_buffer.take();
    }

    pub fn clear_vertex_offsets(&mut self) {
        self.vertex_offsets.clear();
        self.hardware_buffer.take();
    }

    #[inline]
    #[must_use]
    pub fn vertex_offsets(&self) -> &BTreeMap<usize, Vec3> {
        &self.vertex_offsets
    }

    /// Dense xyz offsets for `vertex_count` vertices, zero where the pose
    /// has no entry. Built on first use and kept until the pose changes.
    #[must_use]
    pub fn hardware_vertex_buffer(&self, vertex_count: usize) -> VertexBuffer {
        let cached = self
            .hardware_buffer
            .get_or_init(|| self.build_hardware_buffer(vertex_count));
        if cached.vertex_count() == vertex_count {
            cached.clone()
        } else {
            self.build_hardware_buffer(vertex_count)
        }
    }

    fn build_hardware_buffer(&self, vertex_count: usize) -> VertexBuffer {
        let mut data = vec![0.0; vertex_count * 3];
        for (&index, offset) in &self.vertex_offsets {
            if let Some(dst) = xyz_range(index).and_then(|range| data.get_mut(range)) {
                dst.copy_from_slice(&offset.to_array());
            }
        }
        VertexBuffer::new(data)
    }
}
