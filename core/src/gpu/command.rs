use std::time::Duration;

use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rect2D {
  pub x: i32,
  pub y: i32,
  pub w: u32,
  pub h: u32
}

impl Rect2D {
  pub fn from_size(w: u32, h: u32) -> Self {
    Self { x: 0, y: 0, w, h }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearValues {
  pub color: [f32; 4],
  pub depth: f32,
  pub stencil: u32
}

impl Default for ClearValues {
  fn default() -> Self {
    Self {
      color: [0f32; 4],
      depth: 1f32,
      stencil: 0
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DispatchSize {
  pub groups: [u32; 3],
  pub threads_per_group: [u32; 3]
}

/// Records work for one queue. Resources bound while recording must outlive the execution
/// of the command buffer.
pub trait CommandBuffer<B: GPUBackend> {
  unsafe fn begin(&mut self) -> GraphicsResult<()>;
  unsafe fn end(&mut self) -> GraphicsResult<()>;

  unsafe fn begin_render_pass(&mut self, render_pass: &B::RenderPass, framebuffer: &B::Framebuffer, clear: &ClearValues);
  unsafe fn end_render_pass(&mut self);
  unsafe fn begin_compute_pass(&mut self);
  unsafe fn end_compute_pass(&mut self);

  /// Resets the timestamp queries and writes the first one.
  unsafe fn begin_profile(&mut self);
  unsafe fn end_profile(&mut self);
  /// GPU time between `begin_profile` and `end_profile`. Only valid after the command buffer has finished executing.
  fn profile_elapsed(&self) -> GraphicsResult<Duration>;

  unsafe fn bind_vertex_buffer(&mut self, buffer: &B::Buffer, location: u32, stride: u32);
  unsafe fn bind_index_buffer(&mut self, buffer: &B::Buffer, format: IndexFormat);
  unsafe fn bind_uniform_buffer(&mut self, buffer: &B::Buffer, set: u32, stages: ShaderStages);
  unsafe fn bind_storage_buffer(&mut self, buffer: &B::Buffer, set: u32, stages: ShaderStages, readonly: bool);
  unsafe fn bind_graphics_pipeline(&mut self, pipeline: &B::GraphicsPipeline);
  unsafe fn bind_compute_pipeline(&mut self, pipeline: &B::ComputePipeline);
  /// Binds a texture as a sampled image in graphics pipelines and as a storage image in compute pipelines.
  unsafe fn bind_texture(&mut self, texture: &B::Texture, set: u32);

  unsafe fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);
  unsafe fn draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32);
  unsafe fn dispatch(&mut self, size: &DispatchSize);

  unsafe fn set_viewport(&mut self, rect: Rect2D);
  unsafe fn set_scissor(&mut self, rect: Rect2D);
}
