use std::sync::Arc;

use ash::vk;
use crossgfx_core::gpu::{
    GraphicsError,
    GraphicsResult,
};

use super::*;

/// Optional features that are turned on whenever the adapter has them.
pub(crate) fn enabled_features(supported: &vk::PhysicalDeviceFeatures) -> vk::PhysicalDeviceFeatures {
    vk::PhysicalDeviceFeatures {
        fill_mode_non_solid: supported.fill_mode_non_solid,
        wide_lines: supported.wide_lines,
        sampler_anisotropy: supported.sampler_anisotropy,
        independent_blend: supported.independent_blend,
        ..Default::default()
    }
}

pub fn create_device(adapter: &VkAdapter) -> GraphicsResult<Arc<RawVkDevice>> {
    let instance = adapter.instance();
    let queue_family_index = adapter.queue_family_index().ok_or(GraphicsError::NoSuitableAdapter)?;
    let supported = unsafe { instance.get_physical_device_features(adapter.physical_device()) };
    let features = enabled_features(&supported);

    let priorities = [1.0f32];
    let queue_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(queue_family_index)
        .queue_priorities(&priorities)];
    let device_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_features(&features);

    let device = unsafe { instance.create_device(adapter.physical_device(), &device_info, None) }.map_vk("vkCreateDevice")?;
    let memory_properties = unsafe { instance.get_physical_device_memory_properties(adapter.physical_device()) };
    let debug_utils = if instance.supports_debug_utils() {
        Some(ash::ext::debug_utils::Device::new(&instance.instance, &device))
    } else {
        None
    };
    log::info!("Created device on {}", adapter.name());
    if !adapter.supports_timestamps() {
        log::warn!("{} can't write timestamps, profiling is disabled", adapter.name());
    }

    Ok(Arc::new(RawVkDevice {
        device,
        physical_device: adapter.physical_device(),
        properties: *adapter.properties(),
        memory_properties,
        queue_family_index,
        supports_timestamps: adapter.supports_timestamps(),
        debug_utils,
        instance: instance.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_supported_features_are_enabled() {
        let supported = vk::PhysicalDeviceFeatures {
            fill_mode_non_solid: vk::TRUE,
            wide_lines: vk::FALSE,
            geometry_shader: vk::TRUE,
            ..Default::default()
        };
        let features = enabled_features(&supported);
        assert_eq!(features.fill_mode_non_solid, vk::TRUE);
        assert_eq!(features.wide_lines, vk::FALSE);
        assert_eq!(features.geometry_shader, vk::FALSE);
    }
}
