use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
  Undefined,
  R8UNorm,
  RG8UNorm,
  RGBA8UNorm,
  RGBA8Srgb,
  BGRA8UNorm,
  BGRA8Srgb,
  R16UInt,
  RG16UInt,
  RGBA16UInt,
  R16Float,
  RG16Float,
  RGBA16Float,
  R32UInt,
  RG32UInt,
  RGBA32UInt,
  R32Float,
  RG32Float,
  RGBA32Float,

  D16,
  D24,
  D24S8,
  D32,
  D32S8
}

impl Format {
  pub fn is_depth(&self) -> bool {
    matches!(self,
      Format::D16
      | Format::D24
      | Format::D24S8
      | Format::D32
      | Format::D32S8)
  }

  pub fn is_stencil(&self) -> bool {
    matches!(self,
      Format::D24S8
      | Format::D32S8)
  }

  pub fn is_srgb(&self) -> bool {
    matches!(self,
      Format::RGBA8Srgb
      | Format::BGRA8Srgb)
  }

  /// Size of a single texel in bytes, `None` for `Format::Undefined`.
  pub fn bytes_per_pixel(&self) -> Option<u32> {
    Some(match self {
      Format::Undefined => return None,
      Format::R8UNorm => 1,
      Format::RG8UNorm => 2,
      Format::RGBA8UNorm
      | Format::RGBA8Srgb
      | Format::BGRA8UNorm
      | Format::BGRA8Srgb => 4,
      Format::R16UInt | Format::R16Float => 2,
      Format::RG16UInt | Format::RG16Float => 4,
      Format::RGBA16UInt | Format::RGBA16Float => 8,
      Format::R32UInt | Format::R32Float => 4,
      Format::RG32UInt | Format::RG32Float => 8,
      Format::RGBA32UInt | Format::RGBA32Float => 16,
      Format::D16 => 2,
      Format::D24 => 4,
      Format::D24S8 => 4,
      Format::D32 => 4,
      Format::D32S8 => 8,
    })
  }
}

impl Default for Format {
  fn default() -> Self {
    Format::Undefined
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexFormat {
  Float,
  Float2,
  Float3,
  Float4,
  UInt,
  UInt2,
  UInt3,
  UInt4
}

impl VertexFormat {
  pub fn size(&self) -> u32 {
    match self {
      VertexFormat::Float | VertexFormat::UInt => 4,
      VertexFormat::Float2 | VertexFormat::UInt2 => 8,
      VertexFormat::Float3 | VertexFormat::UInt3 => 12,
      VertexFormat::Float4 | VertexFormat::UInt4 => 16,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
  U16,
  #[default]
  U32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageLayout {
  #[default]
  Undefined,
  General,
  ColorAttachmentOptimal,
  DepthStencilAttachmentOptimal,
  ShaderReadOnlyOptimal,
  TransferSrcOptimal,
  TransferDstOptimal,
  PresentSrc
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bytes_per_pixel_table() {
    assert_eq!(Format::R8UNorm.bytes_per_pixel(), Some(1));
    assert_eq!(Format::RGBA8UNorm.bytes_per_pixel(), Some(4));
    assert_eq!(Format::BGRA8UNorm.bytes_per_pixel(), Some(4));
    assert_eq!(Format::RGBA16Float.bytes_per_pixel(), Some(8));
    assert_eq!(Format::RG32UInt.bytes_per_pixel(), Some(8));
    assert_eq!(Format::RGBA32Float.bytes_per_pixel(), Some(16));
    assert_eq!(Format::D16.bytes_per_pixel(), Some(2));
    assert_eq!(Format::D24S8.bytes_per_pixel(), Some(4));
    assert_eq!(Format::D32S8.bytes_per_pixel(), Some(8));
    assert_eq!(Format::Undefined.bytes_per_pixel(), None);
  }

  #[test]
  fn depth_stencil_classification() {
    assert!(Format::D24.is_depth());
    assert!(!Format::D24.is_stencil());
    assert!(Format::D32S8.is_depth() && Format::D32S8.is_stencil());
    assert!(!Format::RGBA8UNorm.is_depth());
  }
}
