//! Vertex data targeted by morph and pose animation.
//!
//! Buffers hold packed `f32` positions (xyz per vertex). A [`VertexData`]
//! maps source indices to buffers and carries the hardware animation slots
//! a vertex program would blend: each slot names the source it reads the
//! extra positions from and the parametric (morph `t` or pose influence).

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tessera_core::{Result, TesseraError};

/// Shared, read-mostly float buffer.
///
/// Cloning shares the storage; [`make_mut`](Self::make_mut) copies it first
/// when it is shared, so keyframe buffers are never written through a
/// binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexBuffer {
    data: Arc<Vec<f32>>,
}

impl VertexBuffer {
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    /// Packs `positions` as xyz triples.
    #[must_use]
    pub fn from_positions(positions: &[Vec3]) -> Self {
        let mut data = Vec::with_capacity(positions.len() * 3);
        for p in positions {
            data.extend_from_slice(&[p.x, p.y, p.z]);
        }
        Self::new(data)
    }

    /// A zero-filled buffer for `vertex_count` positions.
    #[must_use]
    pub fn zeroed(vertex_count: usize) -> Self {
        Self::new(vec![0.0; vertex_count * 3])
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Unique access to the floats, copying them if the storage is shared.
    pub fn make_mut(&mut self) -> &mut Vec<f32> {
        Arc::make_mut(&mut self.data)
    }

    /// `true` if both handles share the same storage.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.data.len() / 3
    }

    #[must_use]
    pub fn position(&self, index: usize) -> Option<Vec3> {
        self.data
            .get(xyz_range(index)?)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementSemantic {
    Position,
    Normal,
    TextureCoordinates,
}

/// One entry of a vertex declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexElement {
    /// Binding source the element is read from.
    pub source: u16,
    pub semantic: VertexElementSemantic,
    /// Distinguishes repeated semantics (texture coordinate sets).
    pub index: u16,
}

/// Hardware blend slot: an extra position stream and its blend factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HardwareAnimationData {
    pub target_source: u16,
    pub parametric: f32,
}

/// Vertex declaration plus buffer bindings for one block of vertices.
#[derive(Debug, Clone, Default)]
pub struct VertexData {
    vertex_count: usize,
    declaration: Vec<VertexElement>,
    bindings: FxHashMap<u16, VertexBuffer>,
    hw_animation_data: SmallVec<[HardwareAnimationData; 4]>,
    hw_anim_data_items_used: usize,
}

impl VertexData {
    /// Empty data for `vertex_count` vertices with no elements.
    #[must_use]
    pub fn new(vertex_count: usize) -> Self {
        Self {
            vertex_count,
            ..Default::default()
        }
    }

    /// Data with a single position element on source 0.
    #[must_use]
    pub fn with_positions(positions: &[Vec3]) -> Self {
        let mut data = Self::new(positions.len());
        data.add_element(0, VertexElementSemantic::Position, 0);
        data.set_binding(0, VertexBuffer::from_positions(positions));
        data
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[must_use]
    pub fn declaration(&self) -> &[VertexElement] {
        &self.declaration
    }

    pub fn add_element(&mut self, source: u16, semantic: VertexElementSemantic, index: u16) {
        self.declaration.push(VertexElement {
            source,
            semantic,
            index,
        });
    }

    #[must_use]
    pub fn find_element_by_semantic(
        &self,
        semantic: VertexElementSemantic,
        index: u16,
    ) -> Option<&VertexElement> {
        self.declaration
            .iter()
            .find(|e| e.semantic == semantic && e.index == index)
    }

    pub fn set_binding(&mut self, source: u16, buffer: VertexBuffer) {
        self.bindings.insert(source, buffer);
    }

    #[must_use]
    pub fn binding(&self, source: u16) -> Option<&VertexBuffer> {
        self.bindings.get(&source)
    }

    pub fn unset_binding(&mut self, source: u16) -> Option<VertexBuffer> {
        self.bindings.remove(&source)
    }

    /// Lowest source index above every declared or bound source.
    #[must_use]
    pub fn next_free_source(&self) -> u16 {
        let declared = self.declaration.iter().map(|e| e.source);
        let bound = self.bindings.keys().copied();
        declared.chain(bound).max().map_or(0, |s| s + 1)
    }

    pub fn position_source(&self) -> Result<u16> {
        self.find_element_by_semantic(VertexElementSemantic::Position, 0)
            .map(|e| e.source)
            .ok_or_else(|| TesseraError::invalid("vertex data has no position element"))
    }

    pub fn position_buffer(&self) -> Result<&VertexBuffer> {
        let source = self.position_source()?;
        self.bindings
            .get(&source)
            .ok_or_else(|| TesseraError::invalid(format!("position source {source} is not bound")))
    }

    /// Writable positions, detached from any other holder of the buffer.
    pub fn position_buffer_mut(&mut self) -> Result<&mut Vec<f32>> {
        let source = self.position_source()?;
        self.bindings
            .get_mut(&source)
            .map(VertexBuffer::make_mut)
            .ok_or_else(|| TesseraError::invalid(format!("position source {source} is not bound")))
    }

    // ========================================================================
    // Hardware animation slots
    // ========================================================================

    /// Grows the slot list to `count`, declaring a texture coordinate set on
    /// a fresh source for each new slot. Never shrinks.
    pub fn allocate_hardware_animation_elements(&mut self, count: usize) {
        let mut tex_coord = self
            .declaration
            .iter()
            .filter(|e| e.semantic == VertexElementSemantic::TextureCoordinates)
            .count() as u16;

        while self.hw_animation_data.len() < count {
            let source = self.next_free_source();
            self.add_element(source, VertexElementSemantic::TextureCoordinates, tex_coord);
            tex_coord += 1;
            self.hw_animation_data.push(HardwareAnimationData {
                target_source: source,
                parametric: 0.0,
            });
        }
    }

    /// Per-frame reset: ensure `count` slots, zero their parametrics and
    /// mark all of them free.
    pub fn reset_hardware_animation(&mut self, count: usize) {
        self.allocate_hardware_animation_elements(count);
        for slot in &mut self.hw_animation_data {
            slot.parametric = 0.0;
        }
        self.hw_anim_data_items_used = 0;
    }

    #[must_use]
    pub fn hardware_animation_data(&self) -> &[HardwareAnimationData] {
        &self.hw_animation_data
    }

    /// Number of slot claims this frame, including claims past capacity.
    #[must_use]
    pub fn hw_anim_data_items_used(&self) -> usize {
        self.hw_anim_data_items_used
    }

    /// Claims the next slot. Returns `None` once every slot is taken; the
    /// claim is still counted.
    pub(crate) fn claim_hardware_slot(&mut self) -> Option<usize> {
        let index = self.hw_anim_data_items_used;
        self.hw_anim_data_items_used += 1;
        (index < self.hw_animation_data.len()).then_some(index)
    }

    pub(crate) fn set_hardware_parametric(&mut self, slot: usize, value: f32) {
        if let Some(data) = self.hw_animation_data.get_mut(slot) {
            data.parametric = value;
        }
    }

    /// Copy with a private position buffer, used as an animation scratch
    /// target. Other bindings stay shared with `self`.
    #[must_use]
    pub fn clone_for_animation(&self) -> Self {
        let mut copy = self.clone();
        if let Ok(source) = self.position_source()
            && let Some(buffer) = self.bindings.get(&source)
        {
            copy.set_binding(source, VertexBuffer::new(buffer.as_slice().to_vec()));
        }
        copy
    }
}

// ============================================================================
// Software blending
// ============================================================================

/// Writes the blend of `b1` toward `b2` at `t` into `target`, float by
/// float. Exact at `t == 0` and `t == 1`.
pub fn software_vertex_morph(t: f32, b1: &VertexBuffer, b2: &VertexBuffer, target: &mut [f32]) {
    let s = 1.0 - t;
    for ((dst, &p1), &p2) in target.iter_mut().zip(b1.as_slice()).zip(b2.as_slice()) {
        *dst = p1 * s + p2 * t;
    }
}

/// Float range of vertex `index` in a packed xyz buffer, `None` on overflow.
pub(crate) fn xyz_range(index: usize) -> Option<Range<usize>> {
    let start = index.checked_mul(3)?;
    Some(start..start.checked_add(3)?)
}

/// Adds `offset * weight` to every vertex named in `offsets`.
///
/// Offsets that index past the end of `target` are ignored.
pub fn software_vertex_pose_blend(weight: f32, offsets: &BTreeMap<usize, Vec3>, target: &mut [f32]) {
    if weight == 0.0 {
        return;
    }
    for (&index, offset) in offsets {
        if let Some(dst) = xyz_range(index).and_then(|range| target.get_mut(range)) {
            dst[0] += offset.x * weight;
            dst[1] += offset.y * weight;
            dst[2] += offset.z * weight;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_declares_texcoords_on_new_sources() {
        let mut data = VertexData::with_positions(&[Vec3::ZERO, Vec3::ONE]);
        data.allocate_hardware_animation_elements(2);
        let slots = data.hardware_animation_data();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].target_source, 1);
        assert_eq!(slots[1].target_source, 2);
        assert!(
            data.find_element_by_semantic(VertexElementSemantic::TextureCoordinates, 1)
                .is_some()
        );

        // Never shrinks
        data.allocate_hardware_animation_elements(1);
        assert_eq!(data.hardware_animation_data().len(), 2);
    }

    #[test]
    fn claims_past_capacity_are_counted() {
        let mut data = VertexData::with_positions(&[Vec3::ZERO]);
        data.reset_hardware_animation(1);
        assert_eq!(data.claim_hardware_slot(), Some(0));
        assert_eq!(data.claim_hardware_slot(), None);
        assert_eq!(data.hw_anim_data_items_used(), 2);
        data.reset_hardware_animation(1);
        assert_eq!(data.hw_anim_data_items_used(), 0);
    }

    #[test]
    fn clone_for_animation_detaches_positions() {
        let data = VertexData::with_positions(&[Vec3::ONE]);
        let copy = data.clone_for_animation();
        assert!(!copy.position_buffer().unwrap().ptr_eq(data.position_buffer().unwrap()));
        assert_eq!(copy.position_buffer().unwrap(), data.position_buffer().unwrap());
    }

    #[test]
    fn pose_blend_ignores_indices_that_overflow() {
        let mut target = vec![0.0; 6];
        let offsets = BTreeMap::from([(usize::MAX / 2, Vec3::ONE), (1, Vec3::X)]);
        software_vertex_pose_blend(1.0, &offsets, &mut target);
        assert_eq!(target, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

        let buffer = VertexBuffer::new(target);
        assert_eq!(buffer.position(usize::MAX), None);
        assert_eq!(buffer.position(1), Some(Vec3::X));
    }

    #[test]
    fn pose_blend_skips_zero_weight() {
        let mut target = vec![1.0; 6];
        let offsets = BTreeMap::from([(1, Vec3::new(1.0, 2.0, 3.0))]);
        software_vertex_pose_blend(0.0, &offsets, &mut target);
        assert_eq!(target, vec![1.0; 6]);
        software_vertex_pose_blend(0.5, &offsets, &mut target);
        assert_eq!(target, vec![1.0, 1.0, 1.0, 1.5, 2.0, 2.5]);
    }
}
