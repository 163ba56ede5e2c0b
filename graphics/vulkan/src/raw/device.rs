use std::ffi::CString;
use std::ops::Deref;
use std::sync::Arc;

use ash::vk;

use crate::raw::RawVkInstance;
use crate::VkResultExt;

pub struct RawVkDevice {
    pub device: ash::Device,
    pub physical_device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queue_family_index: u32,
    pub supports_timestamps: bool,
    pub debug_utils: Option<ash::ext::debug_utils::Device>,
    pub instance: Arc<RawVkInstance>,
}

impl RawVkDevice {
    /// Nanoseconds per timestamp tick.
    pub fn timestamp_period(&self) -> f32 {
        self.properties.limits.timestamp_period
    }

    pub fn set_object_name<H: vk::Handle>(&self, handle: H, name: &str) {
        let Some(debug_utils) = self.debug_utils.as_ref() else {
            return;
        };
        let Ok(name_cstring) = CString::new(name) else {
            return;
        };
        let info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(handle)
            .object_name(&name_cstring);
        if let Err(e) = unsafe { debug_utils.set_debug_utils_object_name(&info) } {
            log::warn!("Failed to name object {}: {:?}", name, e);
        }
    }
}

impl Deref for RawVkDevice {
    type Target = ash::Device;

    fn deref(&self) -> &Self::Target {
        &self.device
    }
}

impl Drop for RawVkDevice {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().warn_on_err("vkDeviceWaitIdle");
            self.device.destroy_device(None);
        }
    }
}
