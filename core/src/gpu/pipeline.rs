use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexInputRate {
  Vertex,
  Instance
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
  PointList,
  LineList,
  LineStrip,
  TriangleList,
  TriangleStrip
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
  Fill,
  Line,
  Point
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
  None,
  Front,
  Back,
  FrontAndBack
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
  CounterClockwise,
  Clockwise
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunc {
  Never,
  Less,
  Equal,
  LessEqual,
  Greater,
  NotEqual,
  GreaterEqual,
  Always
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
  Keep,
  Zero,
  Replace,
  IncrementClamp,
  DecrementClamp,
  Invert,
  IncrementWrap,
  DecrementWrap
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
  Zero,
  One,
  SrcColor,
  OneMinusSrcColor,
  DstColor,
  OneMinusDstColor,
  SrcAlpha,
  OneMinusSrcAlpha,
  DstAlpha,
  OneMinusDstAlpha,
  ConstantColor,
  OneMinusConstantColor,
  ConstantAlpha,
  OneMinusConstantAlpha,
  SrcAlphaSaturate
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
  Add,
  Subtract,
  ReverseSubtract,
  Min,
  Max
}

bitflags! {
  #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
  pub struct ColorComponents : u8 {
    const RED   = 0b0001;
    const GREEN = 0b0010;
    const BLUE  = 0b0100;
    const ALPHA = 0b1000;
  }
}

bitflags! {
  #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
  pub struct ShaderStages : u32 {
    const VERTEX   = 0b001;
    const FRAGMENT = 0b010;
    const COMPUTE  = 0b100;
    const ALL_GRAPHICS = Self::VERTEX.bits() | Self::FRAGMENT.bits();
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorType {
  UniformBuffer,
  StorageBuffer,
  CombinedImageSampler,
  SampledImage,
  StorageImage,
  Sampler
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendParams {
  pub src_color_blend_factor: BlendFactor,
  pub dst_color_blend_factor: BlendFactor,
  pub color_blend_op: BlendOp,
  pub src_alpha_blend_factor: BlendFactor,
  pub dst_alpha_blend_factor: BlendFactor,
  pub alpha_blend_op: BlendOp
}

impl BlendParams {
  /// Same factors for color and alpha, additive.
  pub fn porter_duff(src: BlendFactor, dst: BlendFactor) -> Self {
    BlendParams {
      src_color_blend_factor: src,
      dst_color_blend_factor: dst,
      color_blend_op: BlendOp::Add,
      src_alpha_blend_factor: src,
      dst_alpha_blend_factor: dst,
      alpha_blend_op: BlendOp::Add
    }
  }
}

impl Default for BlendParams {
  fn default() -> Self {
    Self::porter_duff(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilParams {
  pub read_mask: u8,
  pub write_mask: u8,
  pub fail_op: StencilOp,
  pub depth_fail_op: StencilOp,
  pub pass_op: StencilOp,
  pub func: CompareFunc,
  pub reference: u32
}

impl Default for StencilParams {
  fn default() -> Self {
    StencilParams {
      read_mask: 0xff,
      write_mask: 0xff,
      fail_op: StencilOp::Keep,
      depth_fail_op: StencilOp::Keep,
      pass_op: StencilOp::Keep,
      func: CompareFunc::Always,
      reference: 0
    }
  }
}

#[derive(Debug, Clone)]
pub struct GraphicsPipelineState {
  pub primitive_topology: PrimitiveTopology,
  pub polygon_mode: PolygonMode,
  pub blend_enable: bool,
  pub blend_params: BlendParams,
  pub color_write_mask: ColorComponents,
  pub cull_mode: CullMode,
  pub front_face: FrontFace,
  pub line_width: f32,
  pub depth_test_enable: bool,
  pub depth_write_enable: bool,
  pub depth_func: CompareFunc,
  pub stencil_enable: bool,
  pub stencil_params: StencilParams,
  pub num_samples: u32,
  pub num_color_attachments: u32
}

impl GraphicsPipelineState {
  /// Hash over every field, usable as a pipeline cache key.
  pub fn key(&self) -> u64 {
    let mut hasher = DefaultHasher::new();
    self.hash(&mut hasher);
    hasher.finish()
  }
}

impl Default for GraphicsPipelineState {
  fn default() -> Self {
    GraphicsPipelineState {
      primitive_topology: PrimitiveTopology::TriangleList,
      polygon_mode: PolygonMode::Fill,
      blend_enable: false,
      blend_params: BlendParams::default(),
      color_write_mask: ColorComponents::all(),
      cull_mode: CullMode::Back,
      front_face: FrontFace::CounterClockwise,
      line_width: 1.0f32,
      depth_test_enable: false,
      depth_write_enable: false,
      depth_func: CompareFunc::Less,
      stencil_enable: false,
      stencil_params: StencilParams::default(),
      num_samples: 1,
      num_color_attachments: 1
    }
  }
}

impl Hash for GraphicsPipelineState {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.primitive_topology.hash(state);
    self.polygon_mode.hash(state);
    self.blend_enable.hash(state);
    self.blend_params.hash(state);
    self.color_write_mask.hash(state);
    self.cull_mode.hash(state);
    self.front_face.hash(state);
    self.line_width.to_bits().hash(state);
    self.depth_test_enable.hash(state);
    self.depth_write_enable.hash(state);
    self.depth_func.hash(state);
    self.stencil_enable.hash(state);
    self.stencil_params.hash(state);
    self.num_samples.hash(state);
    self.num_color_attachments.hash(state);
  }
}

impl PartialEq for GraphicsPipelineState {
  fn eq(&self, other: &Self) -> bool {
    self.primitive_topology == other.primitive_topology
    && self.polygon_mode == other.polygon_mode
    && self.blend_enable == other.blend_enable
    && self.blend_params == other.blend_params
    && self.color_write_mask == other.color_write_mask
    && self.cull_mode == other.cull_mode
    && self.front_face == other.front_face
    && self.line_width.to_bits() == other.line_width.to_bits()
    && self.depth_test_enable == other.depth_test_enable
    && self.depth_write_enable == other.depth_write_enable
    && self.depth_func == other.depth_func
    && self.stencil_enable == other.stencil_enable
    && self.stencil_params == other.stencil_params
    && self.num_samples == other.num_samples
    && self.num_color_attachments == other.num_color_attachments
  }
}

impl Eq for GraphicsPipelineState {}

pub trait ShaderModule {
  fn stage(&self) -> ShaderStages;
  fn metadata(&self) -> &ShaderMetadata;
}

pub trait Pipeline {
  fn bindings(&self) -> &PipelineBindings;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_state() {
    let state = GraphicsPipelineState::default();
    assert_eq!(state.primitive_topology, PrimitiveTopology::TriangleList);
    assert_eq!(state.cull_mode, CullMode::Back);
    assert_eq!(state.front_face, FrontFace::CounterClockwise);
    assert_eq!(state.depth_func, CompareFunc::Less);
    assert!(!state.depth_test_enable);
    assert_eq!(state.color_write_mask, ColorComponents::RED | ColorComponents::GREEN | ColorComponents::BLUE | ColorComponents::ALPHA);
    assert_eq!(state.blend_params.src_color_blend_factor, BlendFactor::SrcAlpha);
    assert_eq!(state.blend_params.dst_alpha_blend_factor, BlendFactor::OneMinusSrcAlpha);
    assert_eq!(state.stencil_params.func, CompareFunc::Always);
    assert_eq!(state.num_samples, 1);
  }

  #[test]
  fn key_tracks_every_field() {
    let base = GraphicsPipelineState::default();
    assert_eq!(base.key(), GraphicsPipelineState::default().key());

    let mut changed = base.clone();
    changed.line_width = 2.0f32;
    assert_ne!(base.key(), changed.key());

    let mut changed = base.clone();
    changed.stencil_params.reference = 1;
    assert_ne!(base.key(), changed.key());

    let mut changed = base.clone();
    changed.blend_params.alpha_blend_op = BlendOp::Max;
    assert_ne!(base.key(), changed.key());
    assert_ne!(base, changed);
  }
}
