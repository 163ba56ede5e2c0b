use super::*;

pub trait GPUBackend: 'static + Sized {
  type Context: GraphicsContext<Self>;
  type CommandBuffer: CommandBuffer<Self>;
  type Queue: Queue<Self> + Send + Sync;
  type Buffer: Buffer + Send + Sync;
  type Texture: Texture<Self> + Send + Sync;
  type RenderPass: RenderPass + Send + Sync;
  type Framebuffer: Framebuffer + Send + Sync;
  type ShaderModule: ShaderModule + Send + Sync;
  type GraphicsPipeline: Pipeline + Send + Sync;
  type ComputePipeline: Pipeline + Send + Sync;
  type Fence: Fence + Send + Sync;

  fn name() -> &'static str;
}
