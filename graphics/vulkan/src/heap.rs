use std::ffi::c_void;
use std::sync::Arc;

use ash::vk;
use crossgfx_core::gpu::{
    GraphicsError,
    GraphicsResult,
};

use super::*;

pub(crate) fn find_memory_type(properties: &vk::PhysicalDeviceMemoryProperties, type_bits: u32, flags: vk::MemoryPropertyFlags) -> Option<u32> {
    (0..properties.memory_type_count).find(|index| {
        (type_bits & (1 << index)) != 0 && properties.memory_types[*index as usize].property_flags.contains(flags)
    })
}

/// A dedicated allocation. Host visible memory stays mapped for its whole lifetime.
pub struct VkMemoryHeap {
    device: Arc<RawVkDevice>,
    memory: vk::DeviceMemory,
    memory_properties: vk::MemoryPropertyFlags,
    map_ptr: Option<*mut c_void>,
}

unsafe impl Send for VkMemoryHeap {}
unsafe impl Sync for VkMemoryHeap {}

impl VkMemoryHeap {
    pub unsafe fn new(device: &Arc<RawVkDevice>, requirements: &vk::MemoryRequirements, flags: vk::MemoryPropertyFlags) -> GraphicsResult<Self> {
        let memory_type_index = find_memory_type(&device.memory_properties, requirements.memory_type_bits, flags)
            .ok_or_else(|| GraphicsError::Unsupported(format!("No memory type with {:?}", flags)))?;
        let memory_properties = device.memory_properties.memory_types[memory_type_index as usize].property_flags;

        let memory_info = vk::MemoryAllocateInfo {
            allocation_size: requirements.size,
            memory_type_index,
            ..Default::default()
        };
        let memory = device.allocate_memory(&memory_info, None).map_vk("vkAllocateMemory")?;

        let map_ptr = if memory_properties.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
            match device.map_memory(memory, 0u64, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty()) {
                Ok(ptr) => Some(ptr),
                Err(e) => {
                    device.free_memory(memory, None);
                    return Err(vk_error("vkMapMemory", e));
                }
            }
        } else {
            None
        };

        Ok(Self {
            device: device.clone(),
            memory,
            memory_properties,
            map_ptr,
        })
    }

    #[inline]
    pub(crate) fn handle(&self) -> vk::DeviceMemory {
        self.memory
    }

    pub(crate) fn properties(&self) -> vk::MemoryPropertyFlags {
        self.memory_properties
    }

    pub(crate) fn map_ptr(&self) -> Option<*mut u8> {
        self.map_ptr.map(|ptr| ptr as *mut u8)
    }
}

impl Drop for VkMemoryHeap {
    fn drop(&mut self) {
        unsafe {
            if self.map_ptr.is_some() {
                self.device.unmap_memory(self.memory);
            }
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties() -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: 3,
            ..Default::default()
        };
        properties.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        properties.memory_types[1].property_flags = vk::MemoryPropertyFlags::HOST_VISIBLE;
        properties.memory_types[2].property_flags = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        properties
    }

    #[test]
    fn memory_type_respects_bits_and_flags() {
        let properties = properties();
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(find_memory_type(&properties, 0b111, host), Some(2));
        assert_eq!(find_memory_type(&properties, 0b111, vk::MemoryPropertyFlags::HOST_VISIBLE), Some(1));
        assert_eq!(find_memory_type(&properties, 0b101, vk::MemoryPropertyFlags::HOST_VISIBLE), Some(2));
        assert_eq!(find_memory_type(&properties, 0b011, host), None);
        assert_eq!(find_memory_type(&properties, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL), Some(0));
    }
}
