use std::ops::Range;

use ash::vk;
use crossgfx_core::gpu::subresource_index;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SubresourceState {
    pub layout: vk::ImageLayout,
    pub access: vk::AccessFlags,
    pub stage: vk::PipelineStageFlags,
}

impl SubresourceState {
    pub fn for_layout(layout: vk::ImageLayout) -> Self {
        let (access, stage) = layout_access_and_stage(layout);
        Self {
            layout,
            access,
            stage,
        }
    }
}

pub(crate) fn layout_access_and_stage(layout: vk::ImageLayout) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    match layout {
        vk::ImageLayout::UNDEFINED => (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE),
        vk::ImageLayout::GENERAL => (
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
            vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::COMPUTE_SHADER,
        ),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (vk::AccessFlags::SHADER_READ, vk::PipelineStageFlags::FRAGMENT_SHADER),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => (vk::AccessFlags::TRANSFER_READ, vk::PipelineStageFlags::TRANSFER),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER),
        vk::ImageLayout::PRESENT_SRC_KHR => (vk::AccessFlags::MEMORY_READ, vk::PipelineStageFlags::BOTTOM_OF_PIPE),
        _ => (
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SubresourceTransition {
    pub level: u32,
    pub layer: u32,
    pub old: SubresourceState,
    pub new: SubresourceState,
}

/// Last known layout, access and stage of every (layer, level) of an image.
#[derive(Debug, Clone)]
pub(crate) struct ImageLayoutTracker {
    mip_levels: u32,
    array_layers: u32,
    states: Vec<SubresourceState>,
}

impl ImageLayoutTracker {
    pub fn new(mip_levels: u32, array_layers: u32) -> Self {
        Self {
            mip_levels,
            array_layers,
            states: vec![SubresourceState::for_layout(vk::ImageLayout::UNDEFINED); (mip_levels * array_layers) as usize],
        }
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }

    pub fn state(&self, level: u32, layer: u32) -> SubresourceState {
        self.states[subresource_index(level, layer, self.mip_levels) as usize]
    }

    /// Records the new layout for the range and returns the barriers needed to get there.
    /// Subresources that are already in `layout` are left alone.
    pub fn transition(&mut self, levels: Range<u32>, layers: Range<u32>, layout: vk::ImageLayout, stage_override: Option<vk::PipelineStageFlags>) -> Vec<SubresourceTransition> {
        let mut new = SubresourceState::for_layout(layout);
        if let Some(stage) = stage_override {
            new.stage = stage;
        }
        let mut transitions = Vec::new();
        for layer in layers {
            for level in levels.clone() {
                let index = subresource_index(level, layer, self.mip_levels) as usize;
                let old = self.states[index];
                if old.layout == layout {
                    continue;
                }
                transitions.push(SubresourceTransition {
                    level,
                    layer,
                    old,
                    new,
                });
                self.states[index] = new;
            }
        }
        transitions
    }

    /// Updates the tracked state without a barrier, for layout changes done implicitly by a render pass.
    pub fn set(&mut self, level: u32, layer: u32, layout: vk::ImageLayout) {
        let index = subresource_index(level, layer, self.mip_levels) as usize;
        self.states[index] = SubresourceState::for_layout(layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_layout_is_skipped() {
        let mut tracker = ImageLayoutTracker::new(3, 2);
        let transitions = tracker.transition(0..3, 0..2, vk::ImageLayout::TRANSFER_DST_OPTIMAL, None);
        assert_eq!(transitions.len(), 6);
        assert!(transitions.iter().all(|t| t.old.layout == vk::ImageLayout::UNDEFINED));
        assert!(tracker.transition(0..3, 0..2, vk::ImageLayout::TRANSFER_DST_OPTIMAL, None).is_empty());
    }

    #[test]
    fn source_comes_from_previous_transition() {
        let mut tracker = ImageLayoutTracker::new(4, 1);
        tracker.transition(0..4, 0..1, vk::ImageLayout::TRANSFER_DST_OPTIMAL, None);
        tracker.transition(1..2, 0..1, vk::ImageLayout::TRANSFER_SRC_OPTIMAL, None);
        let transitions = tracker.transition(0..4, 0..1, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL, None);
        assert_eq!(transitions.len(), 4);
        assert_eq!(transitions[1].level, 1);
        assert_eq!(transitions[1].old.access, vk::AccessFlags::TRANSFER_READ);
        assert_eq!(transitions[0].old.access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(transitions[0].new.stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
        assert_eq!(tracker.state(3, 0).layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    }

    #[test]
    fn layers_are_tracked_separately() {
        let mut tracker = ImageLayoutTracker::new(2, 6);
        tracker.transition(0..2, 4..5, vk::ImageLayout::GENERAL, Some(vk::PipelineStageFlags::COMPUTE_SHADER));
        assert_eq!(tracker.state(1, 4).layout, vk::ImageLayout::GENERAL);
        assert_eq!(tracker.state(1, 4).stage, vk::PipelineStageFlags::COMPUTE_SHADER);
        assert_eq!(tracker.state(1, 3).layout, vk::ImageLayout::UNDEFINED);
        tracker.set(0, 0, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(tracker.state(0, 0).access, vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
    }
}
