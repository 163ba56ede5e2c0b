use super::*;

pub struct FramebufferAttachment<'a, B: GPUBackend> {
  pub texture: &'a B::Texture,
  pub level: u32,
  pub layer: u32
}

impl<'a, B: GPUBackend> FramebufferAttachment<'a, B> {
  pub fn new(texture: &'a B::Texture) -> Self {
    Self {
      texture,
      level: 0,
      layer: 0
    }
  }
}

impl<B: GPUBackend> Clone for FramebufferAttachment<'_, B> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<B: GPUBackend> Copy for FramebufferAttachment<'_, B> {}

pub trait Framebuffer {
  fn width(&self) -> u32;
  fn height(&self) -> u32;
  fn layers(&self) -> u32;
}

pub trait RenderPass {
  fn config(&self) -> &RenderPassConfig;
}
