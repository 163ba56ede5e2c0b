use std::hash::{
    Hash,
    Hasher,
};
use std::sync::Arc;

use ash::vk;
use crossgfx_core::gpu::{
    DescriptorPoolConfig,
    DescriptorType,
    GraphicsResult,
};
use parking_lot::Mutex;

use super::*;

/// Set layout with a single descriptor at binding 0, or no bindings at all for unused set slots.
pub(crate) struct VkDescriptorSetLayout {
    device: Arc<RawVkDevice>,
    layout: vk::DescriptorSetLayout,
    descriptor_type: Option<DescriptorType>,
}

impl VkDescriptorSetLayout {
    pub fn new(device: &Arc<RawVkDevice>, descriptor_type: Option<DescriptorType>) -> GraphicsResult<Self> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = descriptor_type
            .map(|descriptor_type| vk::DescriptorSetLayoutBinding {
                binding: 0,
                descriptor_type: descriptor_type_to_vk(descriptor_type),
                descriptor_count: 1,
                stage_flags: vk::ShaderStageFlags::ALL,
                ..Default::default()
            })
            .into_iter()
            .collect();
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let layout = unsafe { device.create_descriptor_set_layout(&info, None) }.map_vk("vkCreateDescriptorSetLayout")?;
        Ok(Self {
            device: device.clone(),
            layout,
            descriptor_type,
        })
    }

    #[inline]
    pub(crate) fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    pub(crate) fn descriptor_type(&self) -> Option<DescriptorType> {
        self.descriptor_type
    }
}

impl Drop for VkDescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

impl Hash for VkDescriptorSetLayout {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.layout.hash(state);
    }
}

impl PartialEq for VkDescriptorSetLayout {
    fn eq(&self, other: &Self) -> bool {
        self.layout == other.layout
    }
}

impl Eq for VkDescriptorSetLayout {}

pub(crate) fn descriptor_pool_sizes(config: &DescriptorPoolConfig) -> Vec<vk::DescriptorPoolSize> {
    [
        DescriptorType::UniformBuffer,
        DescriptorType::CombinedImageSampler,
        DescriptorType::StorageImage,
        DescriptorType::StorageBuffer,
    ]
    .iter()
    .filter(|descriptor_type| config.count(**descriptor_type) != 0)
    .map(|descriptor_type| vk::DescriptorPoolSize {
        ty: descriptor_type_to_vk(*descriptor_type),
        descriptor_count: config.count(*descriptor_type),
    })
    .collect()
}

pub(crate) struct VkDescriptorPool {
    device: Arc<RawVkDevice>,
    descriptor_pool: Mutex<vk::DescriptorPool>,
}

impl VkDescriptorPool {
    pub fn new(device: &Arc<RawVkDevice>, config: &DescriptorPoolConfig) -> GraphicsResult<Self> {
        let pool_sizes = descriptor_pool_sizes(config);
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .max_sets(config.max_sets)
            .pool_sizes(&pool_sizes);
        let descriptor_pool = unsafe { device.create_descriptor_pool(&info, None) }.map_vk("vkCreateDescriptorPool")?;
        Ok(Self {
            device: device.clone(),
            descriptor_pool: Mutex::new(descriptor_pool),
        })
    }

    /// Allocates a set that frees itself when dropped.
    pub fn allocate(pool: &Arc<Self>, layout: &Arc<VkDescriptorSetLayout>) -> GraphicsResult<VkDescriptorSet> {
        let layouts = [layout.handle()];
        let set = {
            let handle = pool.descriptor_pool.lock();
            let info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(*handle)
                .set_layouts(&layouts);
            unsafe { pool.device.allocate_descriptor_sets(&info) }.map_vk("vkAllocateDescriptorSets")?[0]
        };
        Ok(VkDescriptorSet {
            pool: pool.clone(),
            layout: layout.clone(),
            set,
        })
    }
}

impl Drop for VkDescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(*self.descriptor_pool.get_mut(), None);
        }
    }
}

pub(crate) struct VkDescriptorSet {
    pool: Arc<VkDescriptorPool>,
    layout: Arc<VkDescriptorSetLayout>,
    set: vk::DescriptorSet,
}

impl VkDescriptorSet {
    #[inline]
    pub(crate) fn handle(&self) -> vk::DescriptorSet {
        self.set
    }

    pub(crate) fn layout(&self) -> &Arc<VkDescriptorSetLayout> {
        &self.layout
    }

    pub(crate) unsafe fn write_buffer(&self, buffer: vk::Buffer, range: u64) {
        let Some(descriptor_type) = self.layout.descriptor_type() else {
            return;
        };
        let buffer_info = [vk::DescriptorBufferInfo {
            buffer,
            offset: 0,
            range,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(0)
            .descriptor_type(descriptor_type_to_vk(descriptor_type))
            .buffer_info(&buffer_info);
        self.pool.device.update_descriptor_sets(&[write], &[]);
    }

    pub(crate) unsafe fn write_image(&self, view: vk::ImageView, sampler: vk::Sampler, layout: vk::ImageLayout) {
        let Some(descriptor_type) = self.layout.descriptor_type() else {
            return;
        };
        let image_info = [vk::DescriptorImageInfo {
            sampler,
            image_view: view,
            image_layout: layout,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(0)
            .descriptor_type(descriptor_type_to_vk(descriptor_type))
            .image_info(&image_info);
        self.pool.device.update_descriptor_sets(&[write], &[]);
    }
}

impl Drop for VkDescriptorSet {
    fn drop(&mut self) {
        let pool = self.pool.descriptor_pool.lock();
        unsafe {
            self.pool
                .device
                .free_descriptor_sets(*pool, &[self.set])
                .warn_on_err("vkFreeDescriptorSets");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_sizes_follow_config() {
        let sizes = descriptor_pool_sizes(&DescriptorPoolConfig::default());
        assert_eq!(sizes.len(), 4);
        assert_eq!(sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert!(sizes.iter().all(|size| size.descriptor_count == 1024));

        let sizes = descriptor_pool_sizes(&DescriptorPoolConfig {
            storage_images: 0,
            storage_buffers: 8,
            ..Default::default()
        });
        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes[2].ty, vk::DescriptorType::STORAGE_BUFFER);
        assert_eq!(sizes[2].descriptor_count, 8);
    }
}
