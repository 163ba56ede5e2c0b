use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::*;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
  pub name: String,
  pub semantic: String,
  pub location: u32,
  pub format: VertexFormat,
  /// Number of consecutive locations, 4 for a mat4.
  pub count: u32,
  pub element_size: u32
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DescriptorInfo {
  pub name: String,
  pub descriptor_type: DescriptorType,
  pub set: u32
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BufferMemberInfo {
  pub name: String,
  pub offset: u32,
  pub size: u32,
  pub array_count: u32,
  pub array_stride: u32
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BufferInfo {
  pub name: String,
  pub set: u32,
  pub members: Vec<BufferMemberInfo>,
  pub readonly: bool,
  pub shader_stages: ShaderStages
}

impl BufferInfo {
  pub fn find_member(&self, name: &str) -> Option<&BufferMemberInfo> {
    self.members.iter().find(|m| m.name == name)
  }
}

/// Reflection data emitted next to a compiled shader.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ShaderMetadata {
  pub stage: ShaderStages,
  pub attributes: Vec<VertexAttribute>,
  pub descriptors: Vec<DescriptorInfo>,
  pub uniform_buffers: Vec<BufferInfo>,
  pub storage_buffers: Vec<BufferInfo>
}

const INPUT_ATTRIBUTES: &str = "INPUT_ATTRIBUTES";
const DESCRIPTORS: &str = "DESCRIPTORS";
const UNIFORM_BUFFER_INFOS: &str = "UNIFORM_BUFFER_INFOS";
const SHADER_STORAGE_BUFFER_INFOS: &str = "SHADER_STORAGE_BUFFER_INFOS";

struct Tokens<'a> {
  tokens: Vec<(usize, &'a str)>,
  position: usize
}

impl<'a> Tokens<'a> {
  fn new(text: &'a str) -> Self {
    let tokens = text.lines()
      .enumerate()
      .flat_map(|(line, content)| content.split_whitespace().map(move |token| (line + 1, token)))
      .collect();
    Self {
      tokens,
      position: 0
    }
  }

  fn current_line(&self) -> usize {
    self.tokens.get(self.position)
      .or(self.tokens.last())
      .map(|(line, _)| *line)
      .unwrap_or(0)
  }

  fn error(&self, message: String) -> GraphicsError {
    GraphicsError::ShaderMetadata {
      line: self.current_line(),
      message
    }
  }

  fn peek(&self) -> Option<&'a str> {
    self.tokens.get(self.position).map(|(_, token)| *token)
  }

  fn next(&mut self, what: &str) -> GraphicsResult<&'a str> {
    let token = self.peek().ok_or_else(|| self.error(format!("Expected {} but reached the end", what)))?;
    self.position += 1;
    Ok(token)
  }

  fn number<T: FromStr>(&mut self, what: &str) -> GraphicsResult<T> {
    let token = self.next(what)?;
    token.parse::<T>().map_err(|_| {
      self.position -= 1;
      self.error(format!("Expected {} but found \"{}\"", what, token))
    })
  }

  fn expect(&mut self, keyword: &str) -> GraphicsResult<()> {
    let token = self.next(keyword)?;
    if token != keyword {
      self.position -= 1;
      return Err(self.error(format!("Expected {} but found \"{}\"", keyword, token)));
    }
    Ok(())
  }
}

fn parse_vertex_format(token: &str) -> Option<(VertexFormat, u32)> {
  Some(match token {
    "VERTEXFORMAT_FLOAT" => (VertexFormat::Float, 1),
    "VERTEXFORMAT_FLOAT2" => (VertexFormat::Float2, 1),
    "VERTEXFORMAT_FLOAT3" => (VertexFormat::Float3, 1),
    "VERTEXFORMAT_FLOAT4" => (VertexFormat::Float4, 1),
    "VERTEXFORMAT_MAT4" => (VertexFormat::Float4, 4),
    "VERTEXFORMAT_UINT" => (VertexFormat::UInt, 1),
    "VERTEXFORMAT_UINT2" => (VertexFormat::UInt2, 1),
    "VERTEXFORMAT_UINT3" => (VertexFormat::UInt3, 1),
    "VERTEXFORMAT_UINT4" => (VertexFormat::UInt4, 1),
    _ => return None
  })
}

fn parse_descriptor_type(token: &str) -> Option<DescriptorType> {
  Some(match token {
    "DESCRIPTOR_TYPE_COMBINED_IMAGE_SAMPLER" => DescriptorType::CombinedImageSampler,
    "DESCRIPTOR_TYPE_SAMPLED_IMAGE" => DescriptorType::SampledImage,
    "DESCRIPTOR_TYPE_STORAGE_IMAGE" => DescriptorType::StorageImage,
    "DESCRIPTOR_TYPE_SAMPLER" => DescriptorType::Sampler,
    "DESCRIPTOR_TYPE_UNIFORM_BUFFER" => DescriptorType::UniformBuffer,
    "DESCRIPTOR_TYPE_STORAGE_BUFFER" => DescriptorType::StorageBuffer,
    _ => return None
  })
}

fn parse_attributes(tokens: &mut Tokens) -> GraphicsResult<Vec<VertexAttribute>> {
  tokens.expect(INPUT_ATTRIBUTES)?;
  let count: usize = tokens.number("attribute count")?;
  let mut attributes = Vec::with_capacity(count);
  for _ in 0..count {
    let name = tokens.next("attribute name")?.to_string();
    let semantic = tokens.next("attribute semantic")?.to_string();
    let location: u32 = tokens.number("attribute location")?;
    let format_str = tokens.next("vertex format")?;
    let (format, count) = parse_vertex_format(format_str).ok_or_else(|| {
      tokens.position -= 1;
      tokens.error(format!("Unknown vertex format \"{}\"", format_str))
    })?;
    attributes.push(VertexAttribute {
      name,
      semantic,
      location,
      format,
      count,
      element_size: format.size()
    });
  }
  Ok(attributes)
}

fn parse_descriptors(tokens: &mut Tokens) -> GraphicsResult<Vec<DescriptorInfo>> {
  tokens.expect(DESCRIPTORS)?;
  let count: usize = tokens.number("descriptor count")?;
  let mut descriptors = Vec::with_capacity(count);
  for _ in 0..count {
    let name = tokens.next("descriptor name")?.to_string();
    let type_str = tokens.next("descriptor type")?;
    let descriptor_type = parse_descriptor_type(type_str).ok_or_else(|| {
      tokens.position -= 1;
      tokens.error(format!("Unknown descriptor type \"{}\"", type_str))
    })?;
    let set: u32 = tokens.number("descriptor set")?;
    descriptors.push(DescriptorInfo {
      name,
      descriptor_type,
      set
    });
  }
  Ok(descriptors)
}

fn parse_buffer_infos(tokens: &mut Tokens, readonly: bool, shader_stages: ShaderStages) -> GraphicsResult<Vec<BufferInfo>> {
  let count: usize = tokens.number("buffer count")?;
  let mut buffers = Vec::with_capacity(count);
  for _ in 0..count {
    let name = tokens.next("buffer name")?.to_string();
    let set: u32 = tokens.number("buffer set")?;
    let member_count: usize = tokens.number("buffer member count")?;
    let mut members = Vec::with_capacity(member_count);
    for _ in 0..member_count {
      members.push(BufferMemberInfo {
        name: tokens.next("member name")?.to_string(),
        offset: tokens.number("member offset")?,
        size: tokens.number("member size")?,
        array_count: tokens.number("member array count")?,
        array_stride: tokens.number("member array stride")?
      });
    }
    buffers.push(BufferInfo {
      name,
      set,
      members,
      readonly,
      shader_stages
    });
  }
  Ok(buffers)
}

impl ShaderMetadata {
  pub fn empty(stage: ShaderStages) -> Self {
    Self {
      stage,
      attributes: Vec::new(),
      descriptors: Vec::new(),
      uniform_buffers: Vec::new(),
      storage_buffers: Vec::new()
    }
  }

  /// Parses the plain text map written by the shader tools.
  /// Vertex shaders start with an attribute section, every stage has descriptors
  /// and optionally uniform and storage buffer layouts.
  pub fn parse(text: &str, stage: ShaderStages) -> GraphicsResult<Self> {
    let mut tokens = Tokens::new(text);
    let mut metadata = Self::empty(stage);
    if stage.contains(ShaderStages::VERTEX) {
      metadata.attributes = parse_attributes(&mut tokens)?;
    }
    metadata.descriptors = parse_descriptors(&mut tokens)?;

    while let Some(section) = tokens.peek() {
      match section {
        UNIFORM_BUFFER_INFOS => {
          tokens.position += 1;
          metadata.uniform_buffers = parse_buffer_infos(&mut tokens, true, stage)?;
        }
        SHADER_STORAGE_BUFFER_INFOS => {
          tokens.position += 1;
          metadata.storage_buffers = parse_buffer_infos(&mut tokens, false, stage)?;
        }
        _ => {
          return Err(tokens.error(format!("Unexpected section \"{}\"", section)));
        }
      }
    }
    Ok(metadata)
  }

  pub fn load<P: AsRef<Path>>(path: P, stage: ShaderStages) -> GraphicsResult<Self> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let is_json = path.extension().map(|ext| ext == "json").unwrap_or(false);
    if is_json {
      Self::from_json(&text)
    } else {
      Self::parse(&text, stage)
    }
  }

  pub fn from_json(json: &str) -> GraphicsResult<Self> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn to_json(&self) -> GraphicsResult<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  pub fn find_attribute(&self, name: &str) -> Option<&VertexAttribute> {
    self.attributes.iter().find(|a| a.name == name)
  }

  pub fn find_descriptor(&self, name: &str) -> Option<&DescriptorInfo> {
    self.descriptors.iter().find(|d| d.name == name)
  }

  pub fn find_uniform_buffer(&self, name: &str) -> Option<&BufferInfo> {
    self.uniform_buffers.iter().find(|b| b.name == name)
  }

  pub fn find_storage_buffer(&self, name: &str) -> Option<&BufferInfo> {
    self.storage_buffers.iter().find(|b| b.name == name)
  }

  /// Highest descriptor set used by this stage.
  pub fn max_set(&self) -> Option<u32> {
    self.descriptors.iter().map(|d| d.set).max()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const VERTEX_MAP: &str = "\
INPUT_ATTRIBUTES 3
inPos POSITION 0 VERTEXFORMAT_FLOAT3
inTexCoord TEXCOORD 1 VERTEXFORMAT_FLOAT2
inModel TEXCOORD1 2 VERTEXFORMAT_MAT4
DESCRIPTORS 1
UBO_VS DESCRIPTOR_TYPE_UNIFORM_BUFFER 0
UNIFORM_BUFFER_INFOS 1
UBO_VS 0 2
viewProj 0 64 0 0
color 64 16 0 0
";

  const FRAGMENT_MAP: &str = "\
DESCRIPTORS 2
texture DESCRIPTOR_TYPE_COMBINED_IMAGE_SAMPLER 1
lights DESCRIPTOR_TYPE_STORAGE_BUFFER 2
SHADER_STORAGE_BUFFER_INFOS 1
lights 2 1
data 0 16 8 16
";

  #[test]
  fn parses_vertex_map() {
    let metadata = ShaderMetadata::parse(VERTEX_MAP, ShaderStages::VERTEX).unwrap();
    assert_eq!(metadata.attributes.len(), 3);
    let model = metadata.find_attribute("inModel").unwrap();
    assert_eq!(model.format, VertexFormat::Float4);
    assert_eq!(model.count, 4);
    assert_eq!(model.element_size, 16);
    assert_eq!(model.semantic, "TEXCOORD1");
    assert_eq!(metadata.find_attribute("inPos").unwrap().element_size, 12);

    let ubo = metadata.find_uniform_buffer("UBO_VS").unwrap();
    assert!(ubo.readonly);
    assert_eq!(ubo.shader_stages, ShaderStages::VERTEX);
    assert_eq!(ubo.find_member("color").unwrap().offset, 64);
    assert_eq!(metadata.find_descriptor("UBO_VS").unwrap().descriptor_type, DescriptorType::UniformBuffer);
    assert_eq!(metadata.max_set(), Some(0));
  }

  #[test]
  fn parses_fragment_map_without_uniform_section() {
    let metadata = ShaderMetadata::parse(FRAGMENT_MAP, ShaderStages::FRAGMENT).unwrap();
    assert!(metadata.attributes.is_empty());
    assert!(metadata.uniform_buffers.is_empty());
    let lights = metadata.find_storage_buffer("lights").unwrap();
    assert!(!lights.readonly);
    assert_eq!(lights.members[0].array_count, 8);
    assert_eq!(metadata.max_set(), Some(2));
  }

  #[test]
  fn reports_line_of_bad_token() {
    let text = "DESCRIPTORS 2\ntex DESCRIPTOR_TYPE_COMBINED_IMAGE_SAMPLER 0\nbuf DESCRIPTOR_TYPE_BOGUS 1\n";
    match ShaderMetadata::parse(text, ShaderStages::FRAGMENT) {
      Err(GraphicsError::ShaderMetadata { line, message }) => {
        assert_eq!(line, 3);
        assert!(message.contains("DESCRIPTOR_TYPE_BOGUS"));
      }
      other => panic!("unexpected result {:?}", other)
    }
  }

  #[test]
  fn truncated_input_is_an_error() {
    assert!(ShaderMetadata::parse("DESCRIPTORS 2\ntex DESCRIPTOR_TYPE_STORAGE_IMAGE 0\n", ShaderStages::COMPUTE).is_err());
    assert!(ShaderMetadata::parse("INPUT_ATTRIBUTES x\n", ShaderStages::VERTEX).is_err());
  }

  #[test]
  fn json_matches_text() {
    let metadata = ShaderMetadata::parse(FRAGMENT_MAP, ShaderStages::FRAGMENT).unwrap();
    let json = metadata.to_json().unwrap();
    assert_eq!(ShaderMetadata::from_json(&json).unwrap(), metadata);
  }

  #[test]
  fn load_picks_format_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join("filter.frag.map");
    std::fs::write(&map_path, FRAGMENT_MAP).unwrap();
    let from_map = ShaderMetadata::load(&map_path, ShaderStages::FRAGMENT).unwrap();
    assert_eq!(from_map, ShaderMetadata::parse(FRAGMENT_MAP, ShaderStages::FRAGMENT).unwrap());

    let json_path = dir.path().join("filter.frag.json");
    std::fs::write(&json_path, from_map.to_json().unwrap()).unwrap();
    assert_eq!(ShaderMetadata::load(&json_path, ShaderStages::VERTEX).unwrap(), from_map);

    std::fs::write(&json_path, FRAGMENT_MAP).unwrap();
    assert!(ShaderMetadata::load(&json_path, ShaderStages::FRAGMENT).is_err());
  }

  #[test]
  fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = ShaderMetadata::load(dir.path().join("missing.vert.map"), ShaderStages::VERTEX);
    assert!(matches!(result, Err(GraphicsError::Io(_))));
  }
}
