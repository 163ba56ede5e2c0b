use std::ffi::CStr;
use std::sync::Arc;

use ash::vk;
use crossgfx_core::gpu::Format;

use super::*;

/// Graphics and compute have to live on the same queue family.
pub(crate) fn find_queue_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .position(|family| family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE))
        .map(|index| index as u32)
}

/// Higher is better, `None` means the adapter can't be used at all.
pub(crate) fn adapter_score(device_type: vk::PhysicalDeviceType, api_version: u32, queue_family: Option<u32>) -> Option<u32> {
    queue_family?;
    if api_version < vk::API_VERSION_1_2 {
        return None;
    }
    Some(match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 4,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 1,
        _ => 0,
    })
}

/// Timestamp queries on the chosen queue family. A family without valid bits can't write them
/// unless the device promises timestamps on every graphics and compute queue.
pub(crate) fn timestamps_supported(limits: &vk::PhysicalDeviceLimits, timestamp_valid_bits: u32) -> bool {
    limits.timestamp_period > 0.0f32 && (timestamp_valid_bits > 0 || limits.timestamp_compute_and_graphics == vk::TRUE)
}

/// First depth format from `candidates` the adapter can render to.
pub(crate) fn select_depth_format<F: Fn(Format) -> bool>(candidates: &[Format], is_supported: F) -> Option<Format> {
    candidates.iter().copied().find(|format| format.is_depth() && is_supported(*format))
}

pub struct VkAdapter {
    instance: Arc<RawVkInstance>,
    physical_device: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    queue_family_index: Option<u32>,
    timestamp_valid_bits: u32,
}

impl VkAdapter {
    pub fn new(instance: &Arc<RawVkInstance>, physical_device: vk::PhysicalDevice) -> Self {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        let queue_family_index = find_queue_family(&families);
        let timestamp_valid_bits = queue_family_index.map_or(0, |index| families[index as usize].timestamp_valid_bits);
        Self {
            instance: instance.clone(),
            physical_device,
            properties,
            queue_family_index,
            timestamp_valid_bits,
        }
    }

    pub fn name(&self) -> String {
        unsafe { CStr::from_ptr(self.properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    pub fn score(&self) -> Option<u32> {
        adapter_score(self.properties.device_type, self.properties.api_version, self.queue_family_index)
    }

    pub(crate) fn instance(&self) -> &Arc<RawVkInstance> {
        &self.instance
    }

    pub(crate) fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub(crate) fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.properties
    }

    pub(crate) fn queue_family_index(&self) -> Option<u32> {
        self.queue_family_index
    }

    pub fn supports_timestamps(&self) -> bool {
        timestamps_supported(&self.properties.limits, self.timestamp_valid_bits)
    }

    pub fn supports_depth_format(&self, format: Format) -> bool {
        let properties = unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format_to_vk(format))
        };
        properties
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    }

    pub fn supports_sample_count(&self, samples: u32) -> bool {
        let limits = &self.properties.limits;
        let counts = limits.framebuffer_color_sample_counts & limits.framebuffer_depth_sample_counts;
        counts.contains(samples_to_vk(samples))
    }
}

/// Picks the usable adapter with the highest score.
pub fn pick_adapter(adapters: Vec<VkAdapter>) -> Option<VkAdapter> {
    adapters
        .into_iter()
        .filter_map(|adapter| adapter.score().map(|score| (score, adapter)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, adapter)| adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, queue_count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count,
            ..Default::default()
        }
    }

    #[test]
    fn queue_family_needs_graphics_and_compute() {
        let families = [
            family(vk::QueueFlags::TRANSFER, 2),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 0),
            family(vk::QueueFlags::COMPUTE, 4),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 1),
        ];
        assert_eq!(find_queue_family(&families), Some(3));
        assert_eq!(find_queue_family(&families[..3]), None);
    }

    #[test]
    fn discrete_wins() {
        let discrete = adapter_score(vk::PhysicalDeviceType::DISCRETE_GPU, vk::API_VERSION_1_3, Some(0));
        let integrated = adapter_score(vk::PhysicalDeviceType::INTEGRATED_GPU, vk::API_VERSION_1_3, Some(0));
        assert!(discrete > integrated);
        assert_eq!(adapter_score(vk::PhysicalDeviceType::DISCRETE_GPU, vk::API_VERSION_1_3, None), None);
        assert_eq!(adapter_score(vk::PhysicalDeviceType::DISCRETE_GPU, vk::API_VERSION_1_1, Some(0)), None);
        assert_eq!(adapter_score(vk::PhysicalDeviceType::CPU, vk::API_VERSION_1_2, Some(1)), Some(1));
    }

    #[test]
    fn timestamps_need_valid_bits_or_device_wide_support() {
        let limits = vk::PhysicalDeviceLimits {
            timestamp_period: 1.0f32,
            ..Default::default()
        };
        assert!(timestamps_supported(&limits, 64));
        assert!(!timestamps_supported(&limits, 0));
        let device_wide = vk::PhysicalDeviceLimits {
            timestamp_compute_and_graphics: vk::TRUE,
            ..limits
        };
        assert!(timestamps_supported(&device_wide, 0));
        let no_period = vk::PhysicalDeviceLimits {
            timestamp_period: 0.0f32,
            ..device_wide
        };
        assert!(!timestamps_supported(&no_period, 64));
    }

    #[test]
    fn depth_format_in_preference_order() {
        let candidates = [Format::D24S8, Format::D32S8, Format::D16];
        assert_eq!(select_depth_format(&candidates, |_| true), Some(Format::D24S8));
        assert_eq!(select_depth_format(&candidates, |format| format != Format::D24S8), Some(Format::D32S8));
        assert_eq!(select_depth_format(&candidates, |_| false), None);
        assert_eq!(select_depth_format(&[Format::RGBA8UNorm], |_| true), None);
    }
}
