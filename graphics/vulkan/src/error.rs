use ash::prelude::VkResult;
use ash::vk;
use crossgfx_core::gpu::{
    GraphicsError,
    GraphicsResult,
};

pub(crate) fn vk_error(api: &'static str, result: vk::Result) -> GraphicsError {
    match result {
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => GraphicsError::OutOfMemory,
        _ => GraphicsError::Backend {
            api,
            code: format!("{:?}", result),
        },
    }
}

pub(crate) trait VkResultExt<T> {
    fn map_vk(self, api: &'static str) -> GraphicsResult<T>;

    /// For teardown paths that can't propagate, logs the failure instead.
    fn warn_on_err(self, api: &'static str) -> Option<T>;
}

impl<T> VkResultExt<T> for VkResult<T> {
    fn map_vk(self, api: &'static str) -> GraphicsResult<T> {
        self.map_err(|result| vk_error(api, result))
    }

    fn warn_on_err(self, api: &'static str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(result) => {
                log::warn!("{} failed: {:?}", api, result);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_memory_is_not_a_backend_error() {
        let result: VkResult<()> = Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        assert!(matches!(result.map_vk("vkAllocateMemory"), Err(GraphicsError::OutOfMemory)));
        match vk_error("vkCreateImage", vk::Result::ERROR_FORMAT_NOT_SUPPORTED) {
            GraphicsError::Backend { api, code } => {
                assert_eq!(api, "vkCreateImage");
                assert_eq!(code, "ERROR_FORMAT_NOT_SUPPORTED");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn teardown_errors_are_swallowed() {
        let failed: VkResult<()> = Err(vk::Result::ERROR_DEVICE_LOST);
        assert_eq!(failed.warn_on_err("vkFreeDescriptorSets"), None);
        let ok: VkResult<u32> = Ok(3);
        assert_eq!(ok.warn_on_err("vkDeviceWaitIdle"), Some(3));
    }
}
