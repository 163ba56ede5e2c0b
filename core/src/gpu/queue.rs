use super::*;

pub trait Queue<B: GPUBackend> {
  fn submit(&self, command_buffer: &B::CommandBuffer, fence: Option<&B::Fence>) -> GraphicsResult<()>;
  fn wait_idle(&self) -> GraphicsResult<()>;
}
