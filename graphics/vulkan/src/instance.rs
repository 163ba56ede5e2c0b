use std::ffi::{
    c_void,
    CStr,
    CString,
};
use std::os::raw::c_char;
use std::sync::Arc;

use ash::vk;
use crossgfx_core::gpu::{
    GraphicsError,
    GraphicsResult,
};

use super::*;

const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

pub struct VkInstance {
    raw: Arc<RawVkInstance>,
}

impl VkInstance {
    pub fn new(app_name: &str, debug_layers: bool) -> GraphicsResult<Self> {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| GraphicsError::Unsupported(format!("Failed to load Vulkan: {}", e)))?;

        let (layers, extensions) = unsafe {
            (
                entry.enumerate_instance_layer_properties().map_vk("vkEnumerateInstanceLayerProperties")?,
                entry
                    .enumerate_instance_extension_properties(None)
                    .map_vk("vkEnumerateInstanceExtensionProperties")?,
            )
        };
        let supports_validation = layers
            .iter()
            .any(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) } == VALIDATION_LAYER_NAME);
        let supports_debug_utils = extensions
            .iter()
            .any(|extension| unsafe { CStr::from_ptr(extension.extension_name.as_ptr()) } == ash::ext::debug_utils::NAME);

        let mut layer_names: Vec<*const c_char> = Vec::new();
        if debug_layers {
            if supports_validation {
                layer_names.push(VALIDATION_LAYER_NAME.as_ptr());
            } else {
                log::warn!("Validation layers not installed");
            }
        }
        let enable_debug_utils = debug_layers && supports_debug_utils;
        let mut extension_names: Vec<*const c_char> = Vec::new();
        if enable_debug_utils {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
        } else if debug_layers {
            log::warn!("Vulkan debug utils are unsupported");
        }

        let app_name = CString::new(app_name).map_err(|_| GraphicsError::Config("App name contains a nul byte".to_string()))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"crossgfx")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_2);
        let instance_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        let instance = unsafe { entry.create_instance(&instance_info, None) }.map_vk("vkCreateInstance")?;

        let debug_messenger = if enable_debug_utils {
            let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                .message_severity(
                    vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                        | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                        | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                )
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(debug_callback));
            match unsafe { loader.create_debug_utils_messenger(&messenger_info, None) } {
                Ok(messenger) => Some(RawVkDebugMessenger { loader, messenger }),
                Err(e) => {
                    log::warn!("Failed to create debug messenger: {:?}", e);
                    None
                }
            }
        } else {
            None
        };

        log::info!(
            "Created Vulkan instance, validation: {}, debug utils: {}",
            debug_layers && supports_validation,
            debug_messenger.is_some()
        );
        Ok(Self {
            raw: Arc::new(RawVkInstance {
                entry,
                instance,
                debug_messenger,
                validation_enabled: debug_layers && supports_validation,
            }),
        })
    }

    pub fn raw(&self) -> &Arc<RawVkInstance> {
        &self.raw
    }

    pub fn adapters(&self) -> GraphicsResult<Vec<VkAdapter>> {
        let physical_devices = unsafe { self.raw.enumerate_physical_devices() }.map_vk("vkEnumeratePhysicalDevices")?;
        Ok(physical_devices
            .into_iter()
            .map(|physical_device| VkAdapter::new(&self.raw, physical_device))
            .collect())
    }
}

pub(crate) fn debug_log_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Debug
    } else {
        log::Level::Trace
    }
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let Some(callback_data) = p_callback_data.as_ref() else {
        return vk::FALSE;
    };
    if callback_data.p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr(callback_data.p_message).to_string_lossy();
    log::log!(target: "vulkan", debug_log_level(message_severity), "{:?}: {}", message_types, message);
    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_maps_to_log_level() {
        assert_eq!(debug_log_level(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR), log::Level::Error);
        assert_eq!(debug_log_level(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING), log::Level::Warn);
        assert_eq!(debug_log_level(vk::DebugUtilsMessageSeverityFlagsEXT::INFO), log::Level::Debug);
        assert_eq!(debug_log_level(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE), log::Level::Trace);
    }
}
