use std::hash::{
    Hash,
    Hasher,
};
use std::sync::Arc;

use ash::vk;
use crossgfx_core::gpu::{
    self,
    BufferUsage,
    DescriptorType,
    GraphicsError,
    GraphicsResult,
};
use parking_lot::Mutex;

use super::*;

pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::STORAGE) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(BufferUsage::TRANSFER_SRC) {
        flags |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUsage::TRANSFER_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    flags
}

/// Host visible buffer. Uniform and storage descriptor sets are created on first bind.
pub struct VkBuffer {
    shared: Arc<VkShared>,
    buffer: vk::Buffer,
    memory: VkMemoryHeap,
    size: u64,
    usage: BufferUsage,
    uniform_set: Mutex<Option<VkDescriptorSet>>,
    storage_set: Mutex<Option<VkDescriptorSet>>,
}

impl VkBuffer {
    pub fn new(shared: &Arc<VkShared>, size: u64, usage: BufferUsage) -> GraphicsResult<Self> {
        if size == 0 {
            return Err(GraphicsError::InvalidUsage("Buffer size must not be zero".to_string()));
        }
        let device = shared.device();
        let buffer_info = vk::BufferCreateInfo {
            size,
            usage: buffer_usage_to_vk(usage),
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            ..Default::default()
        };
        unsafe {
            let buffer = device.create_buffer(&buffer_info, None).map_vk("vkCreateBuffer")?;
            let requirements = device.get_buffer_memory_requirements(buffer);
            let memory = VkMemoryHeap::new(device, &requirements, vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT)
                .and_then(|memory| {
                    device.bind_buffer_memory(buffer, memory.handle(), 0).map_vk("vkBindBufferMemory")?;
                    Ok(memory)
                });
            let memory = match memory {
                Ok(memory) => memory,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };
            log::trace!("Created buffer of {} bytes in {:?} memory", size, memory.properties());
            Ok(Self {
                shared: shared.clone(),
                buffer,
                memory,
                size,
                usage,
                uniform_set: Mutex::new(None),
                storage_set: Mutex::new(None),
            })
        }
    }

    #[inline]
    pub(crate) fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn set_name(&self, name: &str) {
        self.shared.device().set_object_name(self.buffer, name);
    }

    pub(crate) fn descriptor_set(&self, descriptor_type: DescriptorType) -> GraphicsResult<vk::DescriptorSet> {
        let (slot, required_usage) = match descriptor_type {
            DescriptorType::UniformBuffer => (&self.uniform_set, BufferUsage::UNIFORM),
            DescriptorType::StorageBuffer => (&self.storage_set, BufferUsage::STORAGE),
            _ => return Err(GraphicsError::InvalidUsage(format!("A buffer can't be bound as {:?}", descriptor_type))),
        };
        if !self.usage.contains(required_usage) {
            return Err(GraphicsError::InvalidUsage(format!("Buffer without {:?} usage bound as {:?}", required_usage, descriptor_type)));
        }
        let mut slot = slot.lock();
        if let Some(set) = slot.as_ref() {
            return Ok(set.handle());
        }
        let set = self.shared.allocate_descriptor_set(descriptor_type)?;
        unsafe {
            set.write_buffer(self.buffer, self.size);
        }
        let handle = set.handle();
        *slot = Some(set);
        Ok(handle)
    }
}

impl gpu::Buffer for VkBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    unsafe fn map(&self) -> GraphicsResult<*mut u8> {
        self.memory
            .map_ptr()
            .ok_or_else(|| GraphicsError::InvalidUsage("Buffer memory is not host visible".to_string()))
    }

    unsafe fn unmap(&self) {}
}

impl Drop for VkBuffer {
    fn drop(&mut self) {
        unsafe {
            self.shared.device().destroy_buffer(self.buffer, None);
        }
    }
}

impl Hash for VkBuffer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.buffer.hash(state);
    }
}

impl PartialEq for VkBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.buffer == other.buffer
    }
}

impl Eq for VkBuffer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_flags() {
        assert_eq!(buffer_usage_to_vk(BufferUsage::UNIFORM | BufferUsage::TRANSFER_DST), vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::TRANSFER_DST);
        assert_eq!(buffer_usage_to_vk(BufferUsage::empty()), vk::BufferUsageFlags::empty());
        assert_eq!(buffer_usage_to_vk(BufferUsage::VERTEX | BufferUsage::INDEX | BufferUsage::STORAGE), vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::STORAGE_BUFFER);
    }
}
