use std::sync::Arc;

use crossgfx_core::gpu::{
    self,
    Buffer as _,
    BufferUsage,
    ContextConfig,
    Format,
    FramebufferAttachment,
    GraphicsError,
    GraphicsPipelineDesc,
    GraphicsResult,
    Queue as _,
    RenderPassConfig,
    ShaderMetadata,
    Texture as _,
    TextureInfo,
    TextureRegion,
};
use parking_lot::{
    Mutex,
    MutexGuard,
};

use super::*;

const OFFSCREEN_COLOR_FORMAT: Format = Format::RGBA8UNorm;

/// Device, queue and default render pass for offscreen rendering and compute.
pub struct VkGraphicsContext {
    shared: Arc<VkShared>,
    device: Arc<RawVkDevice>,
    queue: Arc<VkQueue>,
    depth_format: Option<Format>,
    num_samples: u32,
    default_render_pass: Arc<VkRenderPass>,
    clear_color: Mutex<[f32; 4]>,
    draw_command_buffer: Mutex<VkCommandBuffer>,
    copy_command_buffer: Mutex<VkCommandBuffer>,
    compute_command_buffer: Mutex<VkCommandBuffer>,
    _instance: VkInstance,
}

impl VkGraphicsContext {
    pub fn new(config: &ContextConfig) -> GraphicsResult<Self> {
        config.validate()?;
        let instance = VkInstance::new(&config.app_name, config.debug)?;
        let adapters = instance.adapters()?;
        for adapter in &adapters {
            log::debug!("Found adapter {}, score: {:?}", adapter.name(), adapter.score());
        }
        let adapter = pick_adapter(adapters).ok_or(GraphicsError::NoSuitableAdapter)?;
        log::info!("Using adapter {}", adapter.name());

        if !adapter.supports_sample_count(config.num_samples) {
            return Err(GraphicsError::Unsupported(format!("{} samples", config.num_samples)));
        }
        let depth_format = if config.enable_depth_stencil {
            let format = select_depth_format(&config.depth_formats, |format| adapter.supports_depth_format(format))
                .ok_or_else(|| GraphicsError::Unsupported(format!("None of the depth formats {:?}", config.depth_formats)))?;
            log::info!("Using depth format {:?}", format);
            Some(format)
        } else {
            None
        };

        let device = create_device(&adapter)?;
        let queue = Arc::new(VkQueue::new(&device, device.queue_family_index, 0));
        let shared = Arc::new(VkShared::new(&device, &queue, config)?);
        let default_render_pass = shared.render_pass(&RenderPassConfig::offscreen(OFFSCREEN_COLOR_FORMAT, depth_format, 1))?;

        Ok(Self {
            draw_command_buffer: Mutex::new(VkCommandBuffer::new(&device)?),
            copy_command_buffer: Mutex::new(VkCommandBuffer::new(&device)?),
            compute_command_buffer: Mutex::new(VkCommandBuffer::new(&device)?),
            shared,
            device,
            queue,
            depth_format,
            num_samples: config.num_samples,
            default_render_pass,
            clear_color: Mutex::new(config.clear_color),
            _instance: instance,
        })
    }

    /// Sample count render passes for this context were configured with.
    pub fn num_samples(&self) -> u32 {
        self.num_samples
    }

    pub fn cached_render_pass_count(&self) -> usize {
        self.shared.cached_render_pass_count()
    }
}

impl gpu::GraphicsContext<VkBackend> for VkGraphicsContext {
    fn default_render_pass(&self) -> Arc<VkRenderPass> {
        self.default_render_pass.clone()
    }

    fn default_offscreen_render_pass(&self) -> Arc<VkRenderPass> {
        self.default_render_pass.clone()
    }

    fn get_render_pass(&self, config: &RenderPassConfig) -> GraphicsResult<Arc<VkRenderPass>> {
        self.shared.render_pass(config)
    }

    fn surface_format(&self) -> Format {
        OFFSCREEN_COLOR_FORMAT
    }

    fn depth_format(&self) -> Option<Format> {
        self.depth_format
    }

    fn clear_color(&self) -> [f32; 4] {
        *self.clear_color.lock()
    }

    fn set_clear_color(&self, color: [f32; 4]) {
        *self.clear_color.lock() = color;
    }

    fn queue(&self) -> &VkQueue {
        &self.queue
    }

    fn draw_command_buffer(&self) -> MutexGuard<'_, VkCommandBuffer> {
        self.draw_command_buffer.lock()
    }

    fn copy_command_buffer(&self) -> MutexGuard<'_, VkCommandBuffer> {
        self.copy_command_buffer.lock()
    }

    fn compute_command_buffer(&self) -> MutexGuard<'_, VkCommandBuffer> {
        self.compute_command_buffer.lock()
    }

    fn create_buffer(&self, data: Option<&[u8]>, size: u64, usage: BufferUsage) -> GraphicsResult<Arc<VkBuffer>> {
        let buffer = VkBuffer::new(&self.shared, size, usage)?;
        if let Some(data) = data {
            buffer.upload(data, 0)?;
        }
        Ok(Arc::new(buffer))
    }

    fn create_texture(&self, info: &TextureInfo, data: Option<&[u8]>) -> GraphicsResult<Arc<VkTexture>> {
        let texture = VkTexture::new(&self.shared, info)?;
        if let Some(data) = data {
            texture.upload(data, &TextureRegion::default())?;
        }
        Ok(Arc::new(texture))
    }

    fn create_framebuffer(
        &self,
        render_pass: &VkRenderPass,
        attachments: &[FramebufferAttachment<VkBackend>],
        width: u32,
        height: u32,
        layers: u32,
    ) -> GraphicsResult<Arc<VkFrameBuffer>> {
        Ok(Arc::new(VkFrameBuffer::new(&self.device, render_pass, attachments, width, height, layers)?))
    }

    fn create_shader_module(&self, metadata: ShaderMetadata, code: &[u8]) -> GraphicsResult<Arc<VkShaderModule>> {
        Ok(Arc::new(VkShaderModule::new(&self.device, metadata, code)?))
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<VkBackend>) -> GraphicsResult<Arc<VkPipeline>> {
        Ok(Arc::new(VkPipeline::new_graphics(&self.shared, desc)?))
    }

    fn create_compute_pipeline(&self, cs: &VkShaderModule) -> GraphicsResult<Arc<VkPipeline>> {
        Ok(Arc::new(VkPipeline::new_compute(&self.shared, cs)?))
    }

    fn create_fence(&self, signaled: bool) -> GraphicsResult<VkFence> {
        VkFence::new(&self.device, signaled)
    }
}

impl Drop for VkGraphicsContext {
    fn drop(&mut self) {
        if let Err(e) = self.queue.wait_idle() {
            log::error!("Failed to wait for the queue: {}", e);
        }
    }
}
