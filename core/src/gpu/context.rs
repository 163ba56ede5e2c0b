use std::sync::Arc;

use parking_lot::MutexGuard;

use super::*;

pub struct GraphicsPipelineDesc<'a, B: GPUBackend> {
  pub state: GraphicsPipelineState,
  pub vs: &'a B::ShaderModule,
  pub fs: &'a B::ShaderModule,
  pub render_pass: &'a B::RenderPass,
  pub color_format: Format,
  pub depth_format: Option<Format>,
  /// Start offset per vertex attribute index, missing entries start at 0.
  pub vertex_attribute_offsets: &'a [u32],
  pub instance_attributes: &'a [&'a str]
}

pub trait GraphicsContext<B: GPUBackend> {
  fn default_render_pass(&self) -> Arc<B::RenderPass>;
  fn default_offscreen_render_pass(&self) -> Arc<B::RenderPass>;
  /// Returns the render pass compatible with `config`, creating it on first use.
  fn get_render_pass(&self, config: &RenderPassConfig) -> GraphicsResult<Arc<B::RenderPass>>;

  fn surface_format(&self) -> Format;
  fn depth_format(&self) -> Option<Format>;
  fn clear_color(&self) -> [f32; 4];
  fn set_clear_color(&self, color: [f32; 4]);

  fn queue(&self) -> &B::Queue;
  fn draw_command_buffer(&self) -> MutexGuard<'_, B::CommandBuffer>;
  fn copy_command_buffer(&self) -> MutexGuard<'_, B::CommandBuffer>;
  fn compute_command_buffer(&self) -> MutexGuard<'_, B::CommandBuffer>;

  fn create_buffer(&self, data: Option<&[u8]>, size: u64, usage: BufferUsage) -> GraphicsResult<Arc<B::Buffer>>;
  fn create_texture(&self, info: &TextureInfo, data: Option<&[u8]>) -> GraphicsResult<Arc<B::Texture>>;
  fn create_framebuffer(&self, render_pass: &B::RenderPass, attachments: &[FramebufferAttachment<B>], width: u32, height: u32, layers: u32) -> GraphicsResult<Arc<B::Framebuffer>>;
  fn create_shader_module(&self, metadata: ShaderMetadata, code: &[u8]) -> GraphicsResult<Arc<B::ShaderModule>>;
  fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<B>) -> GraphicsResult<Arc<B::GraphicsPipeline>>;
  fn create_compute_pipeline(&self, cs: &B::ShaderModule) -> GraphicsResult<Arc<B::ComputePipeline>>;
  fn create_fence(&self, signaled: bool) -> GraphicsResult<B::Fence>;

  unsafe fn begin_render_pass(&self, command_buffer: &mut B::CommandBuffer, framebuffer: &B::Framebuffer) {
    let render_pass = self.default_render_pass();
    begin_pass::<B>(command_buffer, &render_pass, framebuffer, self.clear_color());
  }

  unsafe fn begin_offscreen_render_pass(&self, command_buffer: &mut B::CommandBuffer, framebuffer: &B::Framebuffer) {
    let render_pass = self.default_offscreen_render_pass();
    begin_pass::<B>(command_buffer, &render_pass, framebuffer, self.clear_color());
  }

  unsafe fn end_render_pass(&self, command_buffer: &mut B::CommandBuffer) {
    command_buffer.end_render_pass();
  }

  fn submit(&self, command_buffer: &B::CommandBuffer) -> GraphicsResult<()> {
    self.queue().submit(command_buffer, None)
  }

  fn wait_idle(&self) -> GraphicsResult<()> {
    self.queue().wait_idle()
  }
}

unsafe fn begin_pass<B: GPUBackend>(command_buffer: &mut B::CommandBuffer, render_pass: &B::RenderPass, framebuffer: &B::Framebuffer, color: [f32; 4]) {
  let clear = ClearValues {
    color,
    ..Default::default()
  };
  command_buffer.begin_render_pass(render_pass, framebuffer, &clear);
  let rect = Rect2D::from_size(framebuffer.width(), framebuffer.height());
  command_buffer.set_viewport(rect);
  command_buffer.set_scissor(rect);
}
