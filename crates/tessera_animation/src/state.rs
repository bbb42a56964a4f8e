//! Playback state of animations.
//!
//! An [`AnimationState`] records where one animation is in its timeline,
//! how strongly it contributes, and whether it is enabled. States live in an
//! [`AnimationStateSet`], which keeps the list of enabled states in the
//! order they were enabled and a dirty counter consumers compare against
//! to skip re-applying unchanged animation.
//!
//! States are only mutated through [`AnimationStateMut`], handed out by the
//! set, so every change that matters to consumers bumps the set's counter.

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use tessera_core::{ChangeTracker, Result, TesseraError};

new_key_type! {
    /// Stable key of a state inside its set.
    pub struct StateKey;
}

/// Playback state of one animation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    animation_name: String,
    time_pos: f32,
    length: f32,
    inv_length: f32,
    weight: f32,
    enabled: bool,
    looped: bool,
}

impl AnimationState {
    fn new(animation_name: String, time_pos: f32, length: f32, weight: f32, enabled: bool) -> Self {
        let mut state = Self {
            animation_name,
            time_pos: 0.0,
            length: 0.0,
            inv_length: 0.0,
            weight,
            enabled,
            looped: true,
        };
        state.store_length(length);
        state.store_time_position(time_pos);
        state
    }

    #[inline]
    #[must_use]
    pub fn animation_name(&self) -> &str {
        &self.animation_name
    }

    #[inline]
    #[must_use]
    pub fn time_position(&self) -> f32 {
        self.time_pos
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    #[inline]
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[inline]
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    #[must_use]
    pub fn looped(&self) -> bool {
        self.looped
    }

    /// `true` once a non-looping state has reached its end.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.time_pos >= self.length && !self.looped
    }

    /// Time position as a fraction of the length (0 for zero-length states).
    #[must_use]
    pub fn normalized_time(&self) -> f32 {
        self.time_pos * self.inv_length
    }

    fn store_length(&mut self, length: f32) {
        self.length = length;
        self.inv_length = if length == 0.0 { 0.0 } else { 1.0 / length };
    }

    /// Wraps or clamps `time_pos` into the timeline. Returns `false` when
    /// the requested time equals the current one.
    fn store_time_position(&mut self, time_pos: f32) -> bool {
        if time_pos == self.time_pos {
            return false;
        }
        self.time_pos = if self.looped {
            if self.length > 0.0 {
                let wrapped = time_pos.rem_euclid(self.length);
                // Rounding can land a tiny negative remainder on `length`
                if wrapped >= self.length { 0.0 } else { wrapped }
            } else {
                0.0
            }
        } else {
            time_pos.clamp(0.0, self.length.max(0.0))
        };
        true
    }
}

/// Mutable access to one state of a set.
///
/// Dereferences to the [`AnimationState`] for reading.
pub struct AnimationStateMut<'a> {
    key: StateKey,
    state: &'a mut AnimationState,
    enabled: &'a mut Vec<StateKey>,
    dirty: &'a mut ChangeTracker,
}

impl AnimationStateMut<'_> {
    /// Moves to `time_pos`, wrapping when looping and clamping otherwise.
    /// Setting the current time again is a no-op.
    pub fn set_time_position(&mut self, time_pos: f32) {
        if self.state.store_time_position(time_pos) && self.state.enabled {
            self.dirty.changed();
        }
    }

    /// Advances the time position by `offset` seconds.
    pub fn add_time(&mut self, offset: f32) {
        let time = self.state.time_pos + offset;
        self.set_time_position(time);
    }

    /// Sets the time position from a fraction of the length.
    pub fn set_normalized_time(&mut self, value: f32) {
        let time = value * self.state.length;
        self.set_time_position(time);
    }

    /// Changes the length. The time position is left as is.
    pub fn set_length(&mut self, length: f32) {
        self.state.store_length(length);
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.state.weight = weight;
        if self.state.enabled {
            self.dirty.changed();
        }
    }

    /// Enables or disables the state. Enabling always moves it to the end of
    /// the enabled list.
    pub fn set_enabled(&mut self, enabled: bool) {
        let key = self.key;
        self.state.enabled = enabled;
        self.enabled.retain(|&k| k != key);
        if enabled {
            self.enabled.push(key);
        }
        self.dirty.changed();
    }

    pub fn set_loop(&mut self, looped: bool) {
        self.state.looped = looped;
    }

    /// Copies everything except the animation name from `other`.
    pub fn copy_state_from(&mut self, other: &AnimationState) {
        copy_state(self.key, self.state, other, self.enabled);
        self.dirty.changed();
    }
}

impl std::ops::Deref for AnimationStateMut<'_> {
    type Target = AnimationState;

    fn deref(&self) -> &Self::Target {
        self.state
    }
}

/// Copies playback values and keeps the enabled list in step without
/// moving a state that stays enabled.
fn copy_state(key: StateKey, state: &mut AnimationState, other: &AnimationState, enabled: &mut Vec<StateKey>) {
    state.time_pos = other.time_pos;
    state.length = other.length;
    state.inv_length = other.inv_length;
    state.weight = other.weight;
    state.enabled = other.enabled;
    state.looped = other.looped;

    let listed = enabled.contains(&key);
    if state.enabled && !listed {
        enabled.push(key);
    } else if !state.enabled && listed {
        enabled.retain(|&k| k != key);
    }
}

/// A named collection of animation states.
#[derive(Debug)]
pub struct AnimationStateSet {
    states: SlotMap<StateKey, AnimationState>,
    by_name: FxHashMap<String, StateKey>,
    enabled: Vec<StateKey>,
    dirty: ChangeTracker,
}

impl Default for AnimationStateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationStateSet {
    /// Creates an empty set whose dirty counter has never advanced.
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: SlotMap::with_key(),
            by_name: FxHashMap::default(),
            enabled: Vec::new(),
            dirty: ChangeTracker::never(),
        }
    }

    /// Creates a state for the animation called `name`.
    ///
    /// Fails with `DuplicateItem` if the set already has one.
    pub fn create_animation_state(
        &mut self,
        name: impl Into<String>,
        time_pos: f32,
        length: f32,
        weight: f32,
        enabled: bool,
    ) -> Result<AnimationStateMut<'_>> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(TesseraError::DuplicateItem(format!(
                "animation state '{name}'"
            )));
        }

        let key = self
            .states
            .insert(AnimationState::new(name.clone(), time_pos, length, weight, enabled));
        self.by_name.insert(name, key);
        if enabled {
            self.enabled.push(key);
        }
        self.dirty.changed();
        self.guard(key)
    }

    fn key_of(&self, name: &str) -> Result<StateKey> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| TesseraError::not_found(format!("animation state '{name}'")))
    }

    fn guard(&mut self, key: StateKey) -> Result<AnimationStateMut<'_>> {
        let state = self
            .states
            .get_mut(key)
            .ok_or_else(|| TesseraError::not_found("animation state"))?;
        Ok(AnimationStateMut {
            key,
            state,
            enabled: &mut self.enabled,
            dirty: &mut self.dirty,
        })
    }

    pub fn animation_state(&self, name: &str) -> Result<&AnimationState> {
        let key = self.key_of(name)?;
        self.states
            .get(key)
            .ok_or_else(|| TesseraError::not_found(format!("animation state '{name}'")))
    }

    pub fn animation_state_mut(&mut self, name: &str) -> Result<AnimationStateMut<'_>> {
        let key = self.key_of(name)?;
        self.guard(key)
    }

    #[must_use]
    pub fn has_animation_state(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Removes the state if present, including from the enabled list.
    pub fn remove_animation_state(&mut self, name: &str) {
        if let Some(key) = self.by_name.remove(name) {
            self.states.remove(key);
            self.enabled.retain(|&k| k != key);
        }
    }

    pub fn remove_all_animation_states(&mut self) {
        self.states.clear();
        self.by_name.clear();
        self.enabled.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn animation_states(&self) -> impl Iterator<Item = &AnimationState> {
        self.states.values()
    }

    /// Enabled states, in the order they were enabled.
    pub fn enabled_animation_states(&self) -> impl Iterator<Item = &AnimationState> {
        self.enabled.iter().filter_map(|&k| self.states.get(k))
    }

    #[must_use]
    pub fn has_enabled_animation_state(&self) -> bool {
        !self.enabled.is_empty()
    }

    /// Counter bumped on every change that affects applied animation.
    #[inline]
    #[must_use]
    pub fn dirty_frame_number(&self) -> u64 {
        self.dirty.version()
    }

    /// Forces consumers to re-apply animation.
    pub fn notify_dirty(&mut self) {
        self.dirty.changed();
    }

    /// Copies every state of `target` from the same-named state in `self`,
    /// then rebuilds `target`'s enabled list in `self`'s enable order and
    /// copies the dirty counter.
    ///
    /// Fails with `ItemNotFound`, leaving `target` untouched, when `target`
    /// has a state `self` lacks.
    pub fn copy_matching_state(&self, target: &mut AnimationStateSet) -> Result<()> {
        if let Some(missing) = target.by_name.keys().find(|name| !self.by_name.contains_key(*name)) {
            return Err(TesseraError::not_found(format!(
                "animation state '{missing}' in source set"
            )));
        }

        for (name, &target_key) in &target.by_name {
            let source = self.animation_state(name)?;
            if let Some(state) = target.states.get_mut(target_key) {
                copy_state(target_key, state, source, &mut target.enabled);
            }
        }

        target.enabled = self
            .enabled_animation_states()
            .filter_map(|s| target.by_name.get(&s.animation_name).copied())
            .collect();
        target.dirty.set_version(self.dirty.version());
        Ok(())
    }
}

impl Clone for AnimationStateSet {
    /// Clones every state. The clone's dirty counter restarts from the
    /// sentinel and advances once per state.
    fn clone(&self) -> Self {
        let mut dirty = ChangeTracker::never();
        for _ in 0..self.states.len() {
            dirty.changed();
        }
        Self {
            states: self.states.clone(),
            by_name: self.by_name.clone(),
            enabled: self.enabled.clone(),
            dirty,
        }
    }
}
