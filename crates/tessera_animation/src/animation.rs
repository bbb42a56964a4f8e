//! Named, timed collections of tracks.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tessera_core::{AnimableHandle, NodeHandle, Result, TesseraError, VertexDataHandle};

use crate::settings::{DuplicateTrackPolicy, InterpolationMode, RotationInterpolationMode};
use crate::target::{AnimationTargets, BoneResolver, VertexAnimationTarget};
use crate::tracks::{NodeAnimationTrack, NumericAnimationTrack, TargetMode, VertexAnimationTrack, VertexAnimationType};

/// Animation-wide values every track needs when it is evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationParams {
    pub length: f32,
    pub interpolation_mode: InterpolationMode,
    pub rotation_interpolation_mode: RotationInterpolationMode,
}

/// A named animation of fixed length made of node, numeric and vertex tracks.
///
/// Tracks of each kind are keyed by a `u16` handle and always applied in
/// ascending handle order: node tracks first, then numeric, then vertex.
#[derive(Debug, Clone)]
pub struct Animation {
    name: String,
    length: f32,
    interpolation_mode: InterpolationMode,
    rotation_interpolation_mode: RotationInterpolationMode,
    duplicate_track_policy: DuplicateTrackPolicy,
    default_shortest_rotation_path: bool,

    node_tracks: BTreeMap<u16, NodeAnimationTrack>,
    numeric_tracks: BTreeMap<u16, NumericAnimationTrack>,
    vertex_tracks: BTreeMap<u16, VertexAnimationTrack>,
}

/// Inserts `track` under `handle` following `policy`.
fn insert_track<'a, T>(
    tracks: &'a mut BTreeMap<u16, T>,
    handle: u16,
    track: T,
    policy: DuplicateTrackPolicy,
    kind: &str,
    animation: &str,
) -> Result<&'a mut T> {
    match tracks.entry(handle) {
        Entry::Vacant(slot) => Ok(slot.insert(track)),
        Entry::Occupied(mut slot) => match policy {
            DuplicateTrackPolicy::Reject => Err(TesseraError::DuplicateItem(format!(
                "{kind} track {handle} in animation '{animation}'"
            ))),
            DuplicateTrackPolicy::Replace => {
                log::debug!("Replacing {kind} track {handle} in animation '{animation}'");
                slot.insert(track);
                Ok(slot.into_mut())
            }
        },
    }
}

fn missing_track(kind: &str, handle: u16, animation: &str) -> TesseraError {
    TesseraError::not_found(format!("{kind} track {handle} in animation '{animation}'"))
}

impl Animation {
    /// Creates an empty animation with linear interpolation.
    #[must_use]
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            length,
            interpolation_mode: InterpolationMode::default(),
            rotation_interpolation_mode: RotationInterpolationMode::default(),
            duplicate_track_policy: DuplicateTrackPolicy::default(),
            default_shortest_rotation_path: true,
            node_tracks: BTreeMap::new(),
            numeric_tracks: BTreeMap::new(),
            vertex_tracks: BTreeMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Changes the length. Existing keyframes are not moved.
    pub fn set_length(&mut self, length: f32) {
        self.length = length;
    }

    #[inline]
    #[must_use]
    pub fn interpolation_mode(&self) -> InterpolationMode {
        self.interpolation_mode
    }

    pub fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.interpolation_mode = mode;
    }

    #[inline]
    #[must_use]
    pub fn rotation_interpolation_mode(&self) -> RotationInterpolationMode {
        self.rotation_interpolation_mode
    }

    pub fn set_rotation_interpolation_mode(&mut self, mode: RotationInterpolationMode) {
        self.rotation_interpolation_mode = mode;
    }

    #[inline]
    #[must_use]
    pub fn duplicate_track_policy(&self) -> DuplicateTrackPolicy {
        self.duplicate_track_policy
    }

    pub fn set_duplicate_track_policy(&mut self, policy: DuplicateTrackPolicy) {
        self.duplicate_track_policy = policy;
    }

    /// Shortest-path flag given to node tracks created from now on.
    pub fn set_default_shortest_rotation_path(&mut self, shortest: bool) {
        self.default_shortest_rotation_path = shortest;
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> AnimationParams {
        AnimationParams {
            length: self.length,
            interpolation_mode: self.interpolation_mode,
            rotation_interpolation_mode: self.rotation_interpolation_mode,
        }
    }

    // ========================================================================
    // Node tracks
    // ========================================================================

    pub fn create_node_track(&mut self, handle: u16) -> Result<&mut NodeAnimationTrack> {
        let mut track = NodeAnimationTrack::new(handle);
        track.set_use_shortest_rotation_path(self.default_shortest_rotation_path);
        insert_track(
            &mut self.node_tracks,
            handle,
            track,
            self.duplicate_track_policy,
            "node",
            &self.name,
        )
    }

    /// Creates a node track bound to `node`.
    pub fn create_node_track_for(&mut self, handle: u16, node: NodeHandle) -> Result<&mut NodeAnimationTrack> {
        let track = self.create_node_track(handle)?;
        track.set_target(Some(node));
        Ok(track)
    }

    pub fn node_track(&self, handle: u16) -> Result<&NodeAnimationTrack> {
        self.node_tracks
            .get(&handle)
            .ok_or_else(|| missing_track("node", handle, &self.name))
    }

    pub fn node_track_mut(&mut self, handle: u16) -> Result<&mut NodeAnimationTrack> {
        self.node_tracks
            .get_mut(&handle)
            .ok_or_else(|| missing_track("node", handle, &self.name))
    }

    #[must_use]
    pub fn has_node_track(&self, handle: u16) -> bool {
        self.node_tracks.contains_key(&handle)
    }

    #[must_use]
    pub fn num_node_tracks(&self) -> usize {
        self.node_tracks.len()
    }

    pub fn node_tracks(&self) -> impl Iterator<Item = &NodeAnimationTrack> {
        self.node_tracks.values()
    }

    /// Removes the track if present.
    pub fn destroy_node_track(&mut self, handle: u16) {
        self.node_tracks.remove(&handle);
    }

    pub fn destroy_all_node_tracks(&mut self) {
        self.node_tracks.clear();
    }

    // ========================================================================
    // Numeric tracks
    // ========================================================================

    pub fn create_numeric_track(&mut self, handle: u16) -> Result<&mut NumericAnimationTrack> {
        insert_track(
            &mut self.numeric_tracks,
            handle,
            NumericAnimationTrack::new(handle),
            self.duplicate_track_policy,
            "numeric",
            &self.name,
        )
    }

    /// Creates a numeric track bound to `animable`.
    pub fn create_numeric_track_for(
        &mut self,
        handle: u16,
        animable: AnimableHandle,
    ) -> Result<&mut NumericAnimationTrack> {
        let track = self.create_numeric_track(handle)?;
        track.set_target(Some(animable));
        Ok(track)
    }

    pub fn numeric_track(&self, handle: u16) -> Result<&NumericAnimationTrack> {
        self.numeric_tracks
            .get(&handle)
            .ok_or_else(|| missing_track("numeric", handle, &self.name))
    }

    pub fn numeric_track_mut(&mut self, handle: u16) -> Result<&mut NumericAnimationTrack> {
        self.numeric_tracks
            .get_mut(&handle)
            .ok_or_else(|| missing_track("numeric", handle, &self.name))
    }

    #[must_use]
    pub fn has_numeric_track(&self, handle: u16) -> bool {
        self.numeric_tracks.contains_key(&handle)
    }

    #[must_use]
    pub fn num_numeric_tracks(&self) -> usize {
        self.numeric_tracks.len()
    }

    pub fn numeric_tracks(&self) -> impl Iterator<Item = &NumericAnimationTrack> {
        self.numeric_tracks.values()
    }

    pub fn destroy_numeric_track(&mut self, handle: u16) {
        self.numeric_tracks.remove(&handle);
    }

    pub fn destroy_all_numeric_tracks(&mut self) {
        self.numeric_tracks.clear();
    }

    // ========================================================================
    // Vertex tracks
    // ========================================================================

    /// Creates a vertex track. `handle` 0 targets shared vertex data, `n`
    /// the vertex data of sub-mesh `n - 1`.
    pub fn create_vertex_track(
        &mut self,
        handle: u16,
        animation_type: VertexAnimationType,
    ) -> Result<&mut VertexAnimationTrack> {
        let track = VertexAnimationTrack::new(handle, animation_type)?;
        insert_track(
            &mut self.vertex_tracks,
            handle,
            track,
            self.duplicate_track_policy,
            "vertex",
            &self.name,
        )
    }

    /// Creates a vertex track bound to standalone vertex data.
    pub fn create_vertex_track_for(
        &mut self,
        handle: u16,
        animation_type: VertexAnimationType,
        data: VertexDataHandle,
        mode: TargetMode,
    ) -> Result<&mut VertexAnimationTrack> {
        let track = self.create_vertex_track(handle, animation_type)?;
        track.set_target(Some(data));
        track.set_target_mode(mode);
        Ok(track)
    }

    pub fn vertex_track(&self, handle: u16) -> Result<&VertexAnimationTrack> {
        self.vertex_tracks
            .get(&handle)
            .ok_or_else(|| missing_track("vertex", handle, &self.name))
    }

    pub fn vertex_track_mut(&mut self, handle: u16) -> Result<&mut VertexAnimationTrack> {
        self.vertex_tracks
            .get_mut(&handle)
            .ok_or_else(|| missing_track("vertex", handle, &self.name))
    }

    #[must_use]
    pub fn has_vertex_track(&self, handle: u16) -> bool {
        self.vertex_tracks.contains_key(&handle)
    }

    #[must_use]
    pub fn num_vertex_tracks(&self) -> usize {
        self.vertex_tracks.len()
    }

    pub fn vertex_tracks(&self) -> impl Iterator<Item = &VertexAnimationTrack> {
        self.vertex_tracks.values()
    }

    pub fn destroy_vertex_track(&mut self, handle: u16) {
        self.vertex_tracks.remove(&handle);
    }

    pub fn destroy_all_vertex_tracks(&mut self) {
        self.vertex_tracks.clear();
    }

    pub fn destroy_all_tracks(&mut self) {
        self.destroy_all_node_tracks();
        self.destroy_all_numeric_tracks();
        self.destroy_all_vertex_tracks();
    }

    // ========================================================================
    // Application
    // ========================================================================

    /// Applies every track to the target it is bound to.
    ///
    /// Pose tracks index into the pose list `targets` supplies for their
    /// vertex data. Targets already written are not rolled back when a
    /// later track fails.
    pub fn apply(
        &self,
        targets: &mut dyn AnimationTargets,
        time: f32,
        weight: f32,
        accumulate: bool,
        scale: f32,
    ) -> Result<()> {
        let params = self.params();
        for track in self.node_tracks.values() {
            track.apply(targets, &params, time, weight, accumulate, scale)?;
        }
        for track in self.numeric_tracks.values() {
            track.apply(targets, &params, time, weight, scale)?;
        }
        for track in self.vertex_tracks.values() {
            track.apply(targets, &params, time, weight)?;
        }
        Ok(())
    }

    /// Applies the node tracks to the bones with matching handles.
    pub fn apply_to_skeleton(
        &self,
        bones: &mut dyn BoneResolver,
        time: f32,
        weight: f32,
        accumulate: bool,
        scale: f32,
    ) -> Result<()> {
        let params = self.params();
        for (&handle, track) in &self.node_tracks {
            let bone = bones.bone_mut(handle)?;
            track.apply_to_node(bone, &params, time, weight, accumulate, scale);
        }
        Ok(())
    }

    /// Applies the vertex tracks to an entity's animation buffers.
    ///
    /// `software` blends into the CPU scratch copy, `hardware` sets up the
    /// hardware slot bindings; both may be requested at once.
    pub fn apply_to_vertex_target(
        &self,
        target: &mut dyn VertexAnimationTarget,
        time: f32,
        weight: f32,
        software: bool,
        hardware: bool,
    ) -> Result<()> {
        let params = self.params();
        for (&handle, track) in &self.vertex_tracks {
            let buffers = target.animation_buffers(handle)?;

            if software && let Some(sw) = buffers.software {
                if buffers.first_touch && track.animation_type() == VertexAnimationType::Pose {
                    // Pose offsets accumulate, so start from the original positions
                    let original = buffers.original.position_buffer()?.as_slice();
                    let dst = sw.position_buffer_mut()?;
                    let n = dst.len().min(original.len());
                    dst[..n].copy_from_slice(&original[..n]);
                }
                track.apply_to_vertex_data_as(TargetMode::Software, sw, &params, time, weight, buffers.poses)?;
            }
            if hardware && let Some(hw) = buffers.hardware {
                track.apply_to_vertex_data_as(TargetMode::Hardware, hw, &params, time, weight, buffers.poses)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Optimisation
    // ========================================================================

    /// Drops node and vertex tracks that never change their target and
    /// removes redundant keyframes from the remaining node tracks.
    pub fn optimise(&mut self) {
        let node_before = self.node_tracks.len();
        self.node_tracks.retain(|_, track| {
            let keep = track.has_non_zero_key_frames();
            if keep {
                track.optimise();
            }
            keep
        });

        let vertex_before = self.vertex_tracks.len();
        self.vertex_tracks.retain(|_, track| track.has_non_zero_key_frames());

        log::debug!(
            "Animation '{}' optimised: {} of {} node tracks, {} of {} vertex tracks kept",
            self.name,
            self.node_tracks.len(),
            node_before,
            self.vertex_tracks.len(),
            vertex_before
        );
    }
}
