use std::ops::Deref;

use ash::vk;

pub struct RawVkDebugMessenger {
    pub loader: ash::ext::debug_utils::Instance,
    pub messenger: vk::DebugUtilsMessengerEXT,
}

pub struct RawVkInstance {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub debug_messenger: Option<RawVkDebugMessenger>,
    pub validation_enabled: bool,
}

impl RawVkInstance {
    pub fn supports_debug_utils(&self) -> bool {
        self.debug_messenger.is_some()
    }
}

impl Deref for RawVkInstance {
    type Target = ash::Instance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl Drop for RawVkInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some(debug_messenger) = self.debug_messenger.take() {
                debug_messenger
                    .loader
                    .destroy_debug_utils_messenger(debug_messenger.messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}
