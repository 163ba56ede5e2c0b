use std::sync::Arc;

use ash::vk;
use crossgfx_core::gpu::{
    self,
    CommandBuffer as _,
    ContextConfig,
    DescriptorType,
    GraphicsResult,
    Queue as _,
    RenderPassConfig,
    StateCache,
};
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::*;

/// Descriptor set layouts of a pipeline layout, `None` marks a set slot the shaders don't use.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub(crate) struct VkPipelineLayoutKey {
    pub(crate) sets: SmallVec<[Option<DescriptorType>; 8]>,
}

impl VkPipelineLayoutKey {
    pub(crate) fn from_bindings(bindings: &gpu::PipelineBindings) -> Self {
        Self {
            sets: bindings
                .set_layouts
                .iter()
                .map(|set| set.map(|set| set.descriptor_type))
                .collect(),
        }
    }
}

/// Objects shared by everything created from one device.
pub struct VkShared {
    device: Arc<RawVkDevice>,
    set_layouts: StateCache<DescriptorType, VkDescriptorSetLayout>,
    empty_set_layout: Arc<VkDescriptorSetLayout>,
    pipeline_layouts: StateCache<VkPipelineLayoutKey, VkPipelineLayout>,
    render_passes: StateCache<RenderPassConfig, VkRenderPass>,
    descriptor_pool: Arc<VkDescriptorPool>,
    pipeline_cache: vk::PipelineCache,
    queue: Arc<VkQueue>,
    transfer_command_buffer: Mutex<VkCommandBuffer>,
}

impl VkShared {
    pub fn new(device: &Arc<RawVkDevice>, queue: &Arc<VkQueue>, config: &ContextConfig) -> GraphicsResult<Self> {
        let empty_set_layout = Arc::new(VkDescriptorSetLayout::new(device, None)?);
        let descriptor_pool = Arc::new(VkDescriptorPool::new(device, &config.descriptor_pool)?);
        let pipeline_cache = unsafe {
            device
                .create_pipeline_cache(&vk::PipelineCacheCreateInfo::default(), None)
                .map_vk("vkCreatePipelineCache")?
        };
        let transfer_command_buffer = match VkCommandBuffer::new(device) {
            Ok(command_buffer) => command_buffer,
            Err(e) => {
                unsafe {
                    device.destroy_pipeline_cache(pipeline_cache, None);
                }
                return Err(e);
            }
        };
        Ok(Self {
            device: device.clone(),
            set_layouts: StateCache::new(),
            empty_set_layout,
            pipeline_layouts: StateCache::new(),
            render_passes: StateCache::new(),
            descriptor_pool,
            pipeline_cache,
            queue: queue.clone(),
            transfer_command_buffer: Mutex::new(transfer_command_buffer),
        })
    }

    #[inline]
    pub(crate) fn device(&self) -> &Arc<RawVkDevice> {
        &self.device
    }

    #[inline]
    pub(crate) fn queue(&self) -> &Arc<VkQueue> {
        &self.queue
    }

    #[inline]
    pub(crate) fn pipeline_cache(&self) -> vk::PipelineCache {
        self.pipeline_cache
    }

    pub(crate) fn set_layout(&self, descriptor_type: Option<DescriptorType>) -> GraphicsResult<Arc<VkDescriptorSetLayout>> {
        let Some(descriptor_type) = descriptor_type else {
            return Ok(self.empty_set_layout.clone());
        };
        self.set_layouts
            .get_or_try_create(&descriptor_type, |descriptor_type| VkDescriptorSetLayout::new(&self.device, Some(*descriptor_type)))
    }

    pub(crate) fn allocate_descriptor_set(&self, descriptor_type: DescriptorType) -> GraphicsResult<VkDescriptorSet> {
        let layout = self.set_layout(Some(descriptor_type))?;
        VkDescriptorPool::allocate(&self.descriptor_pool, &layout)
    }

    pub(crate) fn pipeline_layout(&self, key: &VkPipelineLayoutKey) -> GraphicsResult<Arc<VkPipelineLayout>> {
        self.pipeline_layouts.get_or_try_create(key, |key| {
            let set_layouts = key
                .sets
                .iter()
                .map(|descriptor_type| self.set_layout(*descriptor_type))
                .collect::<GraphicsResult<Vec<_>>>()?;
            VkPipelineLayout::new(&self.device, set_layouts)
        })
    }

    pub(crate) fn render_pass(&self, config: &RenderPassConfig) -> GraphicsResult<Arc<VkRenderPass>> {
        self.render_passes.get_or_try_create(config, |config| {
            log::debug!("Render pass cache miss for {} color attachments", config.color_attachments.len());
            VkRenderPass::new(&self.device, config)
        })
    }

    pub(crate) fn cached_render_pass_count(&self) -> usize {
        self.render_passes.len()
    }

    /// Records `f` into the transfer command buffer and blocks until the GPU has executed it.
    pub(crate) fn run_transfer<F>(&self, f: F) -> GraphicsResult<()>
    where
        F: FnOnce(&mut VkCommandBuffer) -> GraphicsResult<()>,
    {
        let mut command_buffer = self.transfer_command_buffer.lock();
        unsafe {
            command_buffer.begin()?;
        }
        let recorded = f(&mut command_buffer);
        unsafe {
            command_buffer.end()?;
        }
        recorded?;
        self.queue.submit(&command_buffer, None)?;
        self.queue.wait_idle()
    }
}

impl Drop for VkShared {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline_cache(self.pipeline_cache, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_layout_key_keeps_holes() {
        let bindings = gpu::PipelineBindings {
            set_layouts: vec![
                Some(gpu::SetLayoutKey {
                    descriptor_type: DescriptorType::UniformBuffer,
                    stages: gpu::ShaderStages::VERTEX,
                }),
                None,
                Some(gpu::SetLayoutKey {
                    descriptor_type: DescriptorType::CombinedImageSampler,
                    stages: gpu::ShaderStages::FRAGMENT,
                }),
            ],
            ..Default::default()
        };
        let key = VkPipelineLayoutKey::from_bindings(&bindings);
        assert_eq!(key.sets.as_slice(), &[Some(DescriptorType::UniformBuffer), None, Some(DescriptorType::CombinedImageSampler)]);

        let mut other = bindings.clone();
        other.set_layouts[0].as_mut().unwrap().stages = gpu::ShaderStages::ALL_GRAPHICS;
        assert_eq!(VkPipelineLayoutKey::from_bindings(&other), key);
    }
}
