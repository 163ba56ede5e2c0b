use super::*;

pub trait Fence {
  fn wait(&self) -> GraphicsResult<()>;
  fn reset(&self) -> GraphicsResult<()>;
  fn is_signaled(&self) -> GraphicsResult<bool>;
}
