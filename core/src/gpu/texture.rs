use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::*;

bitflags! {
  #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
  pub struct TextureUsage: u32 {
    const SAMPLED                  = 0b1;
    const STORAGE                  = 0b10;
    const COLOR_ATTACHMENT         = 0b100;
    const DEPTH_STENCIL_ATTACHMENT = 0b1000;
    const TRANSFER_SRC             = 0b10000;
    const TRANSFER_DST             = 0b100000;
  }
}

impl Default for TextureUsage {
  fn default() -> Self {
    TextureUsage::SAMPLED | TextureUsage::TRANSFER_SRC | TextureUsage::TRANSFER_DST
  }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum TextureType {
  #[default]
  Texture2D,
  Texture2DArray,
  Texture3D,
  TextureCube
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Filter {
  Nearest,
  Linear
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AddressMode {
  ClampToEdge,
  MirrorClampToEdge,
  Repeat,
  MirrorRepeat
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SamplerDesc {
  pub min_filter: Filter,
  pub mag_filter: Filter,
  pub mip_filter: Filter,
  pub address_u: AddressMode,
  pub address_v: AddressMode,
  pub address_w: AddressMode
}

impl SamplerDesc {
  pub fn linear_clamp() -> Self {
    Self {
      min_filter: Filter::Linear,
      mag_filter: Filter::Linear,
      mip_filter: Filter::Linear,
      ..Default::default()
    }
  }
}

impl Default for SamplerDesc {
  fn default() -> Self {
    Self {
      min_filter: Filter::Nearest,
      mag_filter: Filter::Nearest,
      mip_filter: Filter::Nearest,
      address_u: AddressMode::ClampToEdge,
      address_v: AddressMode::ClampToEdge,
      address_w: AddressMode::ClampToEdge
    }
  }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureInfo {
  pub format: Format,
  pub width: u32,
  pub height: u32,
  pub depth: u32,
  pub array_layers: u32,
  pub usage: TextureUsage,
  pub texture_type: TextureType,
  pub gen_mipmaps: bool,
  pub num_samples: u32,
  pub sampler: SamplerDesc
}

impl Default for TextureInfo {
  fn default() -> Self {
    Self {
      format: Format::RGBA8UNorm,
      width: 1,
      height: 1,
      depth: 1,
      array_layers: 1,
      usage: TextureUsage::default(),
      texture_type: TextureType::Texture2D,
      gen_mipmaps: false,
      num_samples: 1,
      sampler: SamplerDesc::default()
    }
  }
}

impl TextureInfo {
  pub fn mip_levels(&self) -> u32 {
    if !self.gen_mipmaps {
      return 1;
    }
    let min_extent = self.width.min(self.height).max(1);
    32 - min_extent.leading_zeros()
  }

  /// Byte size of the full top level, all layers.
  pub fn data_size(&self) -> u64 {
    let bpp = self.format.bytes_per_pixel().unwrap_or(0) as u64;
    self.width as u64 * self.height as u64 * self.depth as u64 * self.array_layers as u64 * bpp
  }

  pub fn validate(&self) -> GraphicsResult<()> {
    if self.width == 0 || self.height == 0 || self.depth == 0 || self.array_layers == 0 {
      return Err(GraphicsError::InvalidUsage(format!("Texture extent must not be zero: {:?}", self)));
    }
    if self.format == Format::Undefined {
      return Err(GraphicsError::InvalidUsage("Texture format is undefined".to_string()));
    }
    if self.texture_type == TextureType::TextureCube && self.array_layers != 6 {
      return Err(GraphicsError::InvalidUsage(format!("Cube textures need 6 layers, got {}", self.array_layers)));
    }
    if self.gen_mipmaps && self.num_samples > 1 {
      return Err(GraphicsError::InvalidUsage("Multisampled textures can't have mipmaps".to_string()));
    }
    Ok(())
  }
}

/// Index of a (level, layer) pair in a flat per-subresource array.
pub fn subresource_index(level: u32, layer: u32, mip_levels: u32) -> u32 {
  layer * mip_levels + level
}

/// Sub-region of a texture, `None` extents cover the whole texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct TextureRegion {
  pub x: u32,
  pub y: u32,
  pub z: u32,
  pub width: Option<u32>,
  pub height: Option<u32>,
  pub depth: Option<u32>,
  pub array_layers: Option<u32>,
  pub data_pitch: Option<u32>
}

impl TextureRegion {
  pub fn resolve(&self, info: &TextureInfo) -> (u32, u32, u32, u32) {
    (
      self.width.unwrap_or(info.width),
      self.height.unwrap_or(info.height),
      self.depth.unwrap_or(info.depth),
      self.array_layers.unwrap_or(info.array_layers)
    )
  }
}

pub trait Texture<B: GPUBackend> {
  fn info(&self) -> &TextureInfo;
  fn mip_levels(&self) -> u32;
  fn set_name(&self, name: &str);
  fn upload(&self, data: &[u8], region: &TextureRegion) -> GraphicsResult<()>;
  fn download(&self, size: u64, region: &TextureRegion) -> GraphicsResult<Vec<u8>>;
  unsafe fn change_layout(&self, command_buffer: &mut B::CommandBuffer, layout: ImageLayout);
  unsafe fn generate_mipmaps(&self, command_buffer: &mut B::CommandBuffer);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mip_levels_follow_smaller_side() {
    let mut info = TextureInfo {
      width: 256,
      height: 64,
      gen_mipmaps: true,
      ..Default::default()
    };
    assert_eq!(info.mip_levels(), 7);
    info.height = 100;
    assert_eq!(info.mip_levels(), 7);
    info.width = 1;
    assert_eq!(info.mip_levels(), 1);
    info.gen_mipmaps = false;
    info.width = 512;
    assert_eq!(info.mip_levels(), 1);
  }

  #[test]
  fn data_size_and_subresources() {
    let info = TextureInfo {
      format: Format::RGBA16Float,
      width: 4,
      height: 2,
      array_layers: 6,
      texture_type: TextureType::TextureCube,
      ..Default::default()
    };
    assert_eq!(info.data_size(), 4 * 2 * 6 * 8);
    assert!(info.validate().is_ok());
    assert_eq!(subresource_index(2, 1, 5), 7);
    assert_eq!(TextureRegion::default().resolve(&info), (4, 2, 1, 6));
  }

  #[test]
  fn invalid_textures() {
    let cube = TextureInfo {
      texture_type: TextureType::TextureCube,
      array_layers: 4,
      ..Default::default()
    };
    assert!(cube.validate().is_err());
    let empty = TextureInfo {
      width: 0,
      ..Default::default()
    };
    assert!(empty.validate().is_err());
    assert_eq!(TextureInfo::default().usage, TextureUsage::SAMPLED | TextureUsage::TRANSFER_SRC | TextureUsage::TRANSFER_DST);
  }
}
