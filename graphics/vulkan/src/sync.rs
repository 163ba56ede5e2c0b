use std::sync::Arc;

use ash::vk;
use crossgfx_core::gpu::{
    self,
    GraphicsResult,
};

use super::*;

pub struct VkFence {
    device: Arc<RawVkDevice>,
    fence: vk::Fence,
}

impl VkFence {
    pub fn new(device: &Arc<RawVkDevice>, signaled: bool) -> GraphicsResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { device.create_fence(&info, None) }.map_vk("vkCreateFence")?;
        Ok(Self {
            device: device.clone(),
            fence,
        })
    }

    #[inline]
    pub(crate) fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl gpu::Fence for VkFence {
    fn wait(&self) -> GraphicsResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, u64::MAX)
                .map_vk("vkWaitForFences")
        }
    }

    fn reset(&self) -> GraphicsResult<()> {
        unsafe { self.device.reset_fences(&[self.fence]).map_vk("vkResetFences") }
    }

    fn is_signaled(&self) -> GraphicsResult<bool> {
        unsafe { self.device.get_fence_status(self.fence).map_vk("vkGetFenceStatus") }
    }
}

impl Drop for VkFence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}
