use std::sync::Arc;

use kiln_core::Result;
use kiln_scene::{NodeHandle, Scene, SkeletonKey};

use crate::binder::Binder;
use crate::binding::{AnimationTarget, NodeTarget, SkeletonTarget, TrackBinding};
use crate::clip::AnimationClip;
use crate::settings::AnimationSettings;

/// How a state composes its samples onto the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationBlendMode {
    /// Blend toward the sampled pose by the effective weight.
    #[default]
    Lerp,
    /// Add the sample's difference from the rest pose on top of the target.
    Additive,
}

/// One playback instance of a clip, bound to a skeleton or a node hierarchy.
///
/// A state only holds handles to its target. When the target is removed from
/// the scene, [`apply`](Self::apply) silently does nothing.
#[derive(Debug, Clone)]
pub struct AnimationState {
    pub(crate) clip: Arc<AnimationClip>,
    pub(crate) target: AnimationTarget,
    pub(crate) bindings: Vec<TrackBinding>,
    pub(crate) start_bone: Option<usize>,

    pub(crate) weight: f32,
    pub(crate) time: f32,
    /// Set while the state sits at time 0 after creation or `set_time(0)`.
    pub(crate) at_start: bool,
    pub(crate) looped: bool,
    pub(crate) blend_mode: AnimationBlendMode,
    pub(crate) layer: u8,

    pub(crate) settings: AnimationSettings,
}

impl AnimationState {
    /// Creates a state driving the bones of a skeleton, starting at the root
    /// bone.
    pub fn new_for_skeleton(
        scene: &Scene,
        skeleton: SkeletonKey,
        clip: Arc<AnimationClip>,
    ) -> Result<Self> {
        let bound = Binder::bind_skeleton(scene, skeleton, &clip, None)?;
        let target = AnimationTarget::Skeleton(SkeletonTarget {
            key: skeleton,
            root_bone: bound.root_bone,
            parent_indices: bound.parent_indices,
        });
        Ok(Self::with_bindings(
            clip,
            target,
            bound.bindings,
            Some(bound.start_bone),
        ))
    }

    /// Creates a state driving `root` and the nodes below it.
    pub fn new_for_node(scene: &Scene, root: NodeHandle, clip: Arc<AnimationClip>) -> Result<Self> {
        let settings = AnimationSettings::default();
        let bindings = Binder::bind_nodes(scene, root, &clip, settings.warn_unresolved_tracks)?;
        Ok(Self::with_bindings(
            clip,
            AnimationTarget::Nodes(NodeTarget { root }),
            bindings,
            None,
        ))
    }

    fn with_bindings(
        clip: Arc<AnimationClip>,
        target: AnimationTarget,
        bindings: Vec<TrackBinding>,
        start_bone: Option<usize>,
    ) -> Self {
        Self {
            clip,
            target,
            bindings,
            start_bone,
            weight: 1.0,
            time: 0.0,
            at_start: true,
            looped: false,
            blend_mode: AnimationBlendMode::Lerp,
            layer: 0,
            settings: AnimationSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: AnimationSettings) -> Self {
        self.settings = settings;
        self
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Rebuilds every track binding against the current scene.
    ///
    /// Per-bone weights return to 1.0 and key frame cursors to the start.
    pub fn rebind(&mut self, scene: &Scene) -> Result<()> {
        match &mut self.target {
            AnimationTarget::Skeleton(target) => {
                let bound = Binder::bind_skeleton(scene, target.key, &self.clip, self.start_bone)?;
                target.root_bone = bound.root_bone;
                target.parent_indices = bound.parent_indices;
                self.start_bone = Some(bound.start_bone);
                self.bindings = bound.bindings;
            }
            AnimationTarget::Nodes(target) => {
                self.bindings = Binder::bind_nodes(
                    scene,
                    target.root,
                    &self.clip,
                    self.settings.warn_unresolved_tracks,
                )?;
            }
        }
        Ok(())
    }

    /// Restricts playback to `bone` and its descendants. `None` selects the
    /// root bone.
    ///
    /// Rebinds only when the start bone actually changes, which resets all
    /// per-bone weights. Has no effect on node-hierarchy states.
    pub fn set_start_bone(&mut self, scene: &Scene, bone: Option<usize>) {
        let AnimationTarget::Skeleton(target) = &self.target else {
            log::warn!(
                "Start bone is only supported for skeleton animation (clip '{}')",
                self.clip.name()
            );
            return;
        };

        let resolved = bone
            .filter(|&i| i < target.parent_indices.len())
            .unwrap_or(target.root_bone);
        if self.start_bone == Some(resolved) && !self.bindings.is_empty() {
            return;
        }

        let previous = self.start_bone;
        self.start_bone = Some(resolved);
        if let Err(err) = self.rebind(scene) {
            log::warn!("Failed to rebind clip '{}': {err}", self.clip.name());
            self.start_bone = previous;
        }
    }

    // ========================================================================
    // Playback attributes
    // ========================================================================

    pub fn set_looped(&mut self, looped: bool) {
        self.looped = looped;
    }

    /// Sets the blend weight, clamped to `[0, 1]`.
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight.clamp(0.0, 1.0);
    }

    /// Changes the blend weight by `delta`, clamped to `[0, 1]`.
    pub fn add_weight(&mut self, delta: f32) {
        if delta != 0.0 {
            self.set_weight(self.weight + delta);
        }
    }

    pub fn set_blend_mode(&mut self, mode: AnimationBlendMode) {
        self.blend_mode = mode;
    }

    pub fn set_layer(&mut self, layer: u8) {
        self.layer = layer;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &AnimationTarget {
        &self.target
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> Option<SkeletonKey> {
        self.target.skeleton_key()
    }

    /// Root node of a node-hierarchy state.
    #[inline]
    #[must_use]
    pub fn node(&self) -> Option<NodeHandle> {
        self.target.root_node()
    }

    #[inline]
    #[must_use]
    pub fn start_bone(&self) -> Option<usize> {
        self.start_bone
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.weight > 0.0
    }

    #[inline]
    #[must_use]
    pub fn is_looped(&self) -> bool {
        self.looped
    }

    #[inline]
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[inline]
    #[must_use]
    pub fn blend_mode(&self) -> AnimationBlendMode {
        self.blend_mode
    }

    #[inline]
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> f32 {
        self.clip.length()
    }

    #[inline]
    #[must_use]
    pub fn layer(&self) -> u8 {
        self.layer
    }

    #[inline]
    #[must_use]
    pub fn num_tracks(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &[TrackBinding] {
        &self.bindings
    }

    #[inline]
    #[must_use]
    pub fn binding(&self, index: usize) -> Option<&TrackBinding> {
        self.bindings.get(index)
    }

    /// Whether the skeleton or root node this state drives still exists.
    #[must_use]
    pub fn is_target_alive(&self, scene: &Scene) -> bool {
        match &self.target {
            AnimationTarget::Skeleton(t) => scene.skeleton(t.key).is_some(),
            AnimationTarget::Nodes(t) => scene.get_node(t.root).is_some(),
        }
    }
}
