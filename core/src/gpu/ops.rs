use std::sync::Arc;

use super::*;

pub trait DrawOp<B: GPUBackend> {
  unsafe fn draw(&self, command_buffer: &mut B::CommandBuffer, context: &B::Context);

  /// Lets the op adjust the state before its pipeline gets created.
  fn pipeline_state(&self, _state: &mut GraphicsPipelineState) {}
}

pub trait ComputeOp<B: GPUBackend> {
  unsafe fn apply(&self, command_buffer: &mut B::CommandBuffer, context: &B::Context);
}

/// Renders a draw op into an offscreen RGBA8 texture that can be sampled afterwards.
pub struct FilterOp<B: GPUBackend> {
  output: Arc<B::Texture>,
  depth: Option<Arc<B::Texture>>,
  framebuffer: Arc<B::Framebuffer>
}

impl<B: GPUBackend> FilterOp<B> {
  pub const OUTPUT_FORMAT: Format = Format::RGBA8UNorm;

  pub fn new(context: &B::Context, width: u32, height: u32) -> GraphicsResult<Self> {
    let output = context.create_texture(&TextureInfo {
      format: Self::OUTPUT_FORMAT,
      width,
      height,
      usage: TextureUsage::SAMPLED | TextureUsage::COLOR_ATTACHMENT | TextureUsage::TRANSFER_SRC | TextureUsage::TRANSFER_DST,
      sampler: SamplerDesc::linear_clamp(),
      ..Default::default()
    }, None)?;

    let depth = context.depth_format().map(|format| context.create_texture(&TextureInfo {
      format,
      width,
      height,
      usage: TextureUsage::DEPTH_STENCIL_ATTACHMENT,
      ..Default::default()
    }, None)).transpose()?;

    let render_pass = context.default_offscreen_render_pass();
    let mut attachments = vec![FramebufferAttachment::<B>::new(&output)];
    if let Some(depth) = depth.as_ref() {
      attachments.push(FramebufferAttachment::<B>::new(depth));
    }
    let framebuffer = context.create_framebuffer(&render_pass, &attachments, width, height, 1)?;

    Ok(Self {
      output,
      depth,
      framebuffer
    })
  }

  pub fn output(&self) -> &Arc<B::Texture> {
    &self.output
  }

  pub fn depth(&self) -> Option<&Arc<B::Texture>> {
    self.depth.as_ref()
  }

  pub fn framebuffer(&self) -> &Arc<B::Framebuffer> {
    &self.framebuffer
  }

  pub unsafe fn apply(&self, command_buffer: &mut B::CommandBuffer, context: &B::Context, op: &dyn DrawOp<B>) {
    self.output.change_layout(command_buffer, ImageLayout::ColorAttachmentOptimal);
    context.begin_offscreen_render_pass(command_buffer, &self.framebuffer);
    op.draw(command_buffer, context);
    context.end_render_pass(command_buffer);
    self.output.change_layout(command_buffer, ImageLayout::ShaderReadOnlyOptimal);
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use parking_lot::{Mutex, MutexGuard};

  use super::*;

  type Log = Arc<Mutex<Vec<String>>>;

  struct MockBackend;

  struct MockTexture {
    info: TextureInfo,
    layout: Mutex<ImageLayout>
  }

  struct MockFramebuffer {
    width: u32,
    height: u32,
    attachments: usize
  }

  struct MockRenderPass {
    config: RenderPassConfig
  }

  struct MockCommandBuffer {
    log: Log
  }

  struct MockQueue;
  struct MockFence;
  struct MockBuffer;

  struct MockShader {
    metadata: ShaderMetadata
  }

  struct MockPipeline {
    bindings: PipelineBindings
  }

  struct MockContext {
    depth_format: Option<Format>,
    offscreen: Arc<MockRenderPass>,
    command_buffer: Mutex<MockCommandBuffer>,
    queue: MockQueue,
    log: Log
  }

  impl GPUBackend for MockBackend {
    type Context = MockContext;
    type CommandBuffer = MockCommandBuffer;
    type Queue = MockQueue;
    type Buffer = MockBuffer;
    type Texture = MockTexture;
    type RenderPass = MockRenderPass;
    type Framebuffer = MockFramebuffer;
    type ShaderModule = MockShader;
    type GraphicsPipeline = MockPipeline;
    type ComputePipeline = MockPipeline;
    type Fence = MockFence;

    fn name() -> &'static str {
      "mock"
    }
  }

  impl Texture<MockBackend> for MockTexture {
    fn info(&self) -> &TextureInfo {
      &self.info
    }

    fn mip_levels(&self) -> u32 {
      self.info.mip_levels()
    }

    fn set_name(&self, _name: &str) {}

    fn upload(&self, _data: &[u8], _region: &TextureRegion) -> GraphicsResult<()> {
      Ok(())
    }

    fn download(&self, size: u64, _region: &TextureRegion) -> GraphicsResult<Vec<u8>> {
      Ok(vec![0; size as usize])
    }

    unsafe fn change_layout(&self, command_buffer: &mut MockCommandBuffer, layout: ImageLayout) {
      let mut current = self.layout.lock();
      if *current != layout {
        command_buffer.push(format!("layout {:?}", layout));
        *current = layout;
      }
    }

    unsafe fn generate_mipmaps(&self, _command_buffer: &mut MockCommandBuffer) {}
  }

  impl Framebuffer for MockFramebuffer {
    fn width(&self) -> u32 {
      self.width
    }

    fn height(&self) -> u32 {
      self.height
    }

    fn layers(&self) -> u32 {
      1
    }
  }

  impl RenderPass for MockRenderPass {
    fn config(&self) -> &RenderPassConfig {
      &self.config
    }
  }

  impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
      0
    }

    fn usage(&self) -> BufferUsage {
      BufferUsage::empty()
    }

    unsafe fn map(&self) -> GraphicsResult<*mut u8> {
      Err(GraphicsError::Unsupported("map".to_string()))
    }

    unsafe fn unmap(&self) {}
  }

  impl ShaderModule for MockShader {
    fn stage(&self) -> ShaderStages {
      self.metadata.stage
    }

    fn metadata(&self) -> &ShaderMetadata {
      &self.metadata
    }
  }

  impl Pipeline for MockPipeline {
    fn bindings(&self) -> &PipelineBindings {
      &self.bindings
    }
  }

  impl Fence for MockFence {
    fn wait(&self) -> GraphicsResult<()> {
      Ok(())
    }

    fn reset(&self) -> GraphicsResult<()> {
      Ok(())
    }

    fn is_signaled(&self) -> GraphicsResult<bool> {
      Ok(true)
    }
  }

  impl Queue<MockBackend> for MockQueue {
    fn submit(&self, _command_buffer: &MockCommandBuffer, _fence: Option<&MockFence>) -> GraphicsResult<()> {
      Ok(())
    }

    fn wait_idle(&self) -> GraphicsResult<()> {
      Ok(())
    }
  }

  impl MockCommandBuffer {
    fn push(&self, entry: String) {
      self.log.lock().push(entry);
    }
  }

  impl CommandBuffer<MockBackend> for MockCommandBuffer {
    unsafe fn begin(&mut self) -> GraphicsResult<()> {
      Ok(())
    }

    unsafe fn end(&mut self) -> GraphicsResult<()> {
      Ok(())
    }

    unsafe fn begin_render_pass(&mut self, render_pass: &MockRenderPass, framebuffer: &MockFramebuffer, clear: &ClearValues) {
      self.push(format!("begin {} {} {:?} {}", render_pass.config.attachment_count(), framebuffer.attachments, clear.color, clear.depth));
    }

    unsafe fn end_render_pass(&mut self) {
      self.push("end".to_string());
    }

    unsafe fn begin_compute_pass(&mut self) {}
    unsafe fn end_compute_pass(&mut self) {}
    unsafe fn begin_profile(&mut self) {}
    unsafe fn end_profile(&mut self) {}

    fn profile_elapsed(&self) -> GraphicsResult<Duration> {
      Ok(Duration::ZERO)
    }

    unsafe fn bind_vertex_buffer(&mut self, _buffer: &MockBuffer, _location: u32, _stride: u32) {}
    unsafe fn bind_index_buffer(&mut self, _buffer: &MockBuffer, _format: IndexFormat) {}
    unsafe fn bind_uniform_buffer(&mut self, _buffer: &MockBuffer, _set: u32, _stages: ShaderStages) {}
    unsafe fn bind_storage_buffer(&mut self, _buffer: &MockBuffer, _set: u32, _stages: ShaderStages, _readonly: bool) {}
    unsafe fn bind_graphics_pipeline(&mut self, _pipeline: &MockPipeline) {}
    unsafe fn bind_compute_pipeline(&mut self, _pipeline: &MockPipeline) {}
    unsafe fn bind_texture(&mut self, _texture: &MockTexture, _set: u32) {}

    unsafe fn draw(&mut self, vertex_count: u32, _instance_count: u32, _first_vertex: u32, _first_instance: u32) {
      self.push(format!("draw {}", vertex_count));
    }

    unsafe fn draw_indexed(&mut self, _index_count: u32, _instance_count: u32, _first_index: u32, _vertex_offset: i32, _first_instance: u32) {}
    unsafe fn dispatch(&mut self, _size: &DispatchSize) {}

    unsafe fn set_viewport(&mut self, rect: Rect2D) {
      self.push(format!("viewport {}x{}", rect.w, rect.h));
    }

    unsafe fn set_scissor(&mut self, rect: Rect2D) {
      self.push(format!("scissor {}x{}", rect.w, rect.h));
    }
  }

  impl MockContext {
    fn new(depth_format: Option<Format>) -> Self {
      let log: Log = Arc::new(Mutex::new(Vec::new()));
      Self {
        depth_format,
        offscreen: Arc::new(MockRenderPass {
          config: RenderPassConfig::offscreen(Format::RGBA8UNorm, depth_format, 1)
        }),
        command_buffer: Mutex::new(MockCommandBuffer { log: log.clone() }),
        queue: MockQueue,
        log
      }
    }
  }

  impl GraphicsContext<MockBackend> for MockContext {
    fn default_render_pass(&self) -> Arc<MockRenderPass> {
      self.offscreen.clone()
    }

    fn default_offscreen_render_pass(&self) -> Arc<MockRenderPass> {
      self.offscreen.clone()
    }

    fn get_render_pass(&self, config: &RenderPassConfig) -> GraphicsResult<Arc<MockRenderPass>> {
      Ok(Arc::new(MockRenderPass { config: config.clone() }))
    }

    fn surface_format(&self) -> Format {
      Format::RGBA8UNorm
    }

    fn depth_format(&self) -> Option<Format> {
      self.depth_format
    }

    fn clear_color(&self) -> [f32; 4] {
      [1f32, 0f32, 0f32, 1f32]
    }

    fn set_clear_color(&self, _color: [f32; 4]) {}

    fn queue(&self) -> &MockQueue {
      &self.queue
    }

    fn draw_command_buffer(&self) -> MutexGuard<'_, MockCommandBuffer> {
      self.command_buffer.lock()
    }

    fn copy_command_buffer(&self) -> MutexGuard<'_, MockCommandBuffer> {
      self.command_buffer.lock()
    }

    fn compute_command_buffer(&self) -> MutexGuard<'_, MockCommandBuffer> {
      self.command_buffer.lock()
    }

    fn create_buffer(&self, _data: Option<&[u8]>, _size: u64, _usage: BufferUsage) -> GraphicsResult<Arc<MockBuffer>> {
      Ok(Arc::new(MockBuffer))
    }

    fn create_texture(&self, info: &TextureInfo, _data: Option<&[u8]>) -> GraphicsResult<Arc<MockTexture>> {
      self.log.lock().push(format!("texture {:?}", info.format));
      Ok(Arc::new(MockTexture {
        info: *info,
        layout: Mutex::new(ImageLayout::Undefined)
      }))
    }

    fn create_framebuffer(&self, _render_pass: &MockRenderPass, attachments: &[FramebufferAttachment<MockBackend>], width: u32, height: u32, _layers: u32) -> GraphicsResult<Arc<MockFramebuffer>> {
      Ok(Arc::new(MockFramebuffer {
        width,
        height,
        attachments: attachments.len()
      }))
    }

    fn create_shader_module(&self, metadata: ShaderMetadata, _code: &[u8]) -> GraphicsResult<Arc<MockShader>> {
      Ok(Arc::new(MockShader { metadata }))
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<MockBackend>) -> GraphicsResult<Arc<MockPipeline>> {
      let bindings = plan_graphics_bindings(desc.vs.metadata(), desc.fs.metadata(), desc.instance_attributes, desc.vertex_attribute_offsets)?;
      Ok(Arc::new(MockPipeline { bindings }))
    }

    fn create_compute_pipeline(&self, cs: &MockShader) -> GraphicsResult<Arc<MockPipeline>> {
      Ok(Arc::new(MockPipeline { bindings: plan_compute_bindings(cs.metadata())? }))
    }

    fn create_fence(&self, _signaled: bool) -> GraphicsResult<MockFence> {
      Ok(MockFence)
    }
  }

  struct Triangle;

  impl DrawOp<MockBackend> for Triangle {
    unsafe fn draw(&self, command_buffer: &mut MockCommandBuffer, _context: &MockContext) {
      command_buffer.draw(3, 1, 0, 0);
    }

    fn pipeline_state(&self, state: &mut GraphicsPipelineState) {
      state.cull_mode = CullMode::None;
    }
  }

  #[test]
  fn filter_op_sequence() {
    let context = MockContext::new(None);
    let filter = FilterOp::<MockBackend>::new(&context, 64, 32).unwrap();
    assert!(filter.depth().is_none());
    assert_eq!(filter.output().info().usage, TextureUsage::SAMPLED | TextureUsage::COLOR_ATTACHMENT | TextureUsage::TRANSFER_SRC | TextureUsage::TRANSFER_DST);
    {
      let mut command_buffer = context.draw_command_buffer();
      unsafe {
        filter.apply(&mut command_buffer, &context, &Triangle);
      }
    }
    assert_eq!(*context.log.lock(), vec![
      "texture RGBA8UNorm".to_string(),
      "layout ColorAttachmentOptimal".to_string(),
      "begin 1 1 [1.0, 0.0, 0.0, 1.0] 1".to_string(),
      "viewport 64x32".to_string(),
      "scissor 64x32".to_string(),
      "draw 3".to_string(),
      "end".to_string(),
      "layout ShaderReadOnlyOptimal".to_string()
    ]);
  }

  #[test]
  fn filter_op_with_depth() {
    let context = MockContext::new(Some(Format::D32));
    let filter = FilterOp::<MockBackend>::new(&context, 8, 8).unwrap();
    assert_eq!(filter.depth().unwrap().info().format, Format::D32);
    assert_eq!(filter.framebuffer().attachments, 2);
  }

  #[test]
  fn pipeline_state_hook() {
    let mut state = GraphicsPipelineState::default();
    Triangle.pipeline_state(&mut state);
    assert_eq!(state.cull_mode, CullMode::None);
  }
}
