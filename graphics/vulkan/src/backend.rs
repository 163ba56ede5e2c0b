use crossgfx_core::gpu::GPUBackend;

use super::*;

pub enum VkBackend {}

impl GPUBackend for VkBackend {
    type Context = VkGraphicsContext;
    type CommandBuffer = VkCommandBuffer;
    type Queue = VkQueue;
    type Buffer = VkBuffer;
    type Texture = VkTexture;
    type RenderPass = VkRenderPass;
    type Framebuffer = VkFrameBuffer;
    type ShaderModule = VkShaderModule;
    type GraphicsPipeline = VkPipeline;
    type ComputePipeline = VkPipeline;
    type Fence = VkFence;

    fn name() -> &'static str {
        "vulkan"
    }
}
