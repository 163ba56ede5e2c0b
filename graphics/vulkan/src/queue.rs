use std::sync::Arc;

use ash::vk;
use crossgfx_core::gpu::{
    self,
    GraphicsResult,
};
use parking_lot::Mutex;

use super::*;

pub struct VkQueue {
    device: Arc<RawVkDevice>,
    queue: Mutex<vk::Queue>,
    family_index: u32,
}

impl VkQueue {
    pub fn new(device: &Arc<RawVkDevice>, family_index: u32, queue_index: u32) -> Self {
        let queue = unsafe { device.get_device_queue(family_index, queue_index) };
        Self {
            device: device.clone(),
            queue: Mutex::new(queue),
            family_index,
        }
    }

    pub fn family_index(&self) -> u32 {
        self.family_index
    }
}

impl gpu::Queue<VkBackend> for VkQueue {
    fn submit(&self, command_buffer: &VkCommandBuffer, fence: Option<&VkFence>) -> GraphicsResult<()> {
        let command_buffers = [command_buffer.handle()];
        let submit = vk::SubmitInfo::default().command_buffers(&command_buffers);
        let fence = fence.map_or(vk::Fence::null(), |fence| fence.handle());
        let queue = self.queue.lock();
        unsafe {
            self.device
                .queue_submit(*queue, &[submit], fence)
                .map_vk("vkQueueSubmit")?;
        }
        command_buffer.mark_submitted();
        Ok(())
    }

    fn wait_idle(&self) -> GraphicsResult<()> {
        let queue = self.queue.lock();
        unsafe { self.device.queue_wait_idle(*queue).map_vk("vkQueueWaitIdle") }
    }
}
