use slotmap::new_key_type;

new_key_type! {
    /// Handle of a scene node an animation track can drive.
    pub struct NodeHandle;
    /// Handle of a generic numeric animable value.
    pub struct AnimableHandle;
    /// Handle of a standalone vertex data block bound to a vertex track.
    pub struct VertexDataHandle;
}
