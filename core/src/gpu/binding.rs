use smallvec::SmallVec;

use super::*;

/// Layout of one descriptor set. Every set holds exactly one descriptor at binding 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetLayoutKey {
  pub descriptor_type: DescriptorType,
  pub stages: ShaderStages
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeDesc {
  pub location: u32,
  pub format: VertexFormat,
  pub offset: u32
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBindingDesc {
  pub binding: u32,
  pub stride: u32,
  pub input_rate: VertexInputRate,
  pub attributes: SmallVec<[VertexAttributeDesc; 4]>,
  pub name: String,
  pub semantic: String
}

/// Where every named shader resource ended up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineBindings {
  pub set_layouts: Vec<Option<SetLayoutKey>>,
  pub descriptors: Vec<DescriptorInfo>,
  pub vertex_bindings: Vec<VertexBindingDesc>
}

impl PipelineBindings {
  pub fn descriptor_binding(&self, name: &str) -> Option<u32> {
    self.descriptors.iter().find(|d| d.name == name).map(|d| d.set)
  }

  pub fn vertex_binding(&self, name: &str) -> Option<u32> {
    self.vertex_bindings.iter().find(|b| b.name == name).map(|b| b.binding)
  }

  /// Resolves a list of names to binding indices, looking at descriptors first.
  pub fn bindings(&self, names: &[&str]) -> Vec<Option<u32>> {
    names.iter()
      .map(|name| self.descriptor_binding(name).or_else(|| self.vertex_binding(name)))
      .collect()
  }

  pub fn set_count(&self) -> u32 {
    self.set_layouts.len() as u32
  }
}

fn merge_descriptors(set_layouts: &mut Vec<Option<SetLayoutKey>>, descriptors: &mut Vec<DescriptorInfo>, metadata: &ShaderMetadata) -> GraphicsResult<()> {
  for descriptor in &metadata.descriptors {
    let set = descriptor.set as usize;
    if set_layouts.len() <= set {
      set_layouts.resize(set + 1, None);
    }
    if let Some(existing) = set_layouts[set].as_mut() {
      if existing.descriptor_type != descriptor.descriptor_type {
        return Err(GraphicsError::InvalidUsage(format!(
          "Descriptor set {} is used as {:?} and {:?}",
          set, existing.descriptor_type, descriptor.descriptor_type)));
      }
      existing.stages |= metadata.stage;
    } else {
      set_layouts[set] = Some(SetLayoutKey {
        descriptor_type: descriptor.descriptor_type,
        stages: metadata.stage
      });
    }
    if !descriptors.iter().any(|d| d.name == descriptor.name && d.set == descriptor.set) {
      descriptors.push(descriptor.clone());
    }
  }
  Ok(())
}

/// Plans descriptor sets and vertex input for a vertex/fragment pair.
/// Each vertex attribute gets its own buffer binding equal to its location.
/// `vertex_attribute_offsets` optionally gives the starting offset per attribute index.
pub fn plan_graphics_bindings(
  vs: &ShaderMetadata,
  fs: &ShaderMetadata,
  instance_attributes: &[&str],
  vertex_attribute_offsets: &[u32]
) -> GraphicsResult<PipelineBindings> {
  let mut bindings = PipelineBindings::default();
  merge_descriptors(&mut bindings.set_layouts, &mut bindings.descriptors, vs)?;
  merge_descriptors(&mut bindings.set_layouts, &mut bindings.descriptors, fs)?;

  for (index, attribute) in vs.attributes.iter().enumerate() {
    let mut offset = vertex_attribute_offsets.get(index).copied().unwrap_or(0);
    let mut attributes = SmallVec::<[VertexAttributeDesc; 4]>::new();
    for row in 0..attribute.count {
      attributes.push(VertexAttributeDesc {
        location: attribute.location + row,
        format: attribute.format,
        offset
      });
      offset += attribute.element_size;
    }
    let input_rate = if instance_attributes.contains(&attribute.name.as_str()) {
      VertexInputRate::Instance
    } else {
      VertexInputRate::Vertex
    };
    bindings.vertex_bindings.push(VertexBindingDesc {
      binding: attribute.location,
      stride: attribute.element_size * attribute.count,
      input_rate,
      attributes,
      name: attribute.name.clone(),
      semantic: attribute.semantic.clone()
    });
  }
  Ok(bindings)
}

pub fn plan_compute_bindings(cs: &ShaderMetadata) -> GraphicsResult<PipelineBindings> {
  let mut bindings = PipelineBindings::default();
  merge_descriptors(&mut bindings.set_layouts, &mut bindings.descriptors, cs)?;
  Ok(bindings)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn vs() -> ShaderMetadata {
    ShaderMetadata::parse("\
INPUT_ATTRIBUTES 2
inPos POSITION 0 VERTEXFORMAT_FLOAT3
inTransform TEXCOORD1 1 VERTEXFORMAT_MAT4
DESCRIPTORS 1
ubo DESCRIPTOR_TYPE_UNIFORM_BUFFER 0
", ShaderStages::VERTEX).unwrap()
  }

  fn fs() -> ShaderMetadata {
    ShaderMetadata::parse("\
DESCRIPTORS 2
ubo DESCRIPTOR_TYPE_UNIFORM_BUFFER 0
tex DESCRIPTOR_TYPE_COMBINED_IMAGE_SAMPLER 2
", ShaderStages::FRAGMENT).unwrap()
  }

  #[test]
  fn sets_are_merged_across_stages() {
    let bindings = plan_graphics_bindings(&vs(), &fs(), &[], &[]).unwrap();
    assert_eq!(bindings.set_count(), 3);
    assert_eq!(bindings.set_layouts[0], Some(SetLayoutKey {
      descriptor_type: DescriptorType::UniformBuffer,
      stages: ShaderStages::VERTEX | ShaderStages::FRAGMENT
    }));
    assert_eq!(bindings.set_layouts[1], None);
    assert_eq!(bindings.set_layouts[2].unwrap().descriptor_type, DescriptorType::CombinedImageSampler);
    assert_eq!(bindings.descriptors.len(), 2);
    assert_eq!(bindings.bindings(&["tex", "ubo", "inPos", "missing"]), vec![Some(2), Some(0), Some(0), None]);
  }

  #[test]
  fn shared_descriptor_resolves_once() {
    let fs = ShaderMetadata::parse("DESCRIPTORS 1\nubo DESCRIPTOR_TYPE_UNIFORM_BUFFER 0\n", ShaderStages::FRAGMENT).unwrap();
    let bindings = plan_graphics_bindings(&vs(), &fs, &[], &[]).unwrap();
    assert_eq!(bindings.descriptors.iter().filter(|d| d.name == "ubo").count(), 1);
    assert_eq!(bindings.descriptor_binding("ubo"), Some(0));
    assert_eq!(bindings.set_count(), 1);
    assert_eq!(bindings.set_layouts[0].unwrap().stages, ShaderStages::VERTEX | ShaderStages::FRAGMENT);
  }

  #[test]
  fn matrix_attributes_span_locations() {
    let bindings = plan_graphics_bindings(&vs(), &fs(), &["inTransform"], &[0, 32]).unwrap();
    let transform = &bindings.vertex_bindings[1];
    assert_eq!(transform.binding, 1);
    assert_eq!(transform.stride, 64);
    assert_eq!(transform.input_rate, VertexInputRate::Instance);
    let locations: Vec<u32> = transform.attributes.iter().map(|a| a.location).collect();
    let offsets: Vec<u32> = transform.attributes.iter().map(|a| a.offset).collect();
    assert_eq!(locations, vec![1, 2, 3, 4]);
    assert_eq!(offsets, vec![32, 48, 64, 80]);
    assert_eq!(bindings.vertex_bindings[0].input_rate, VertexInputRate::Vertex);
    assert_eq!(bindings.vertex_bindings[0].stride, 12);
  }

  #[test]
  fn conflicting_types_are_rejected() {
    let fs = ShaderMetadata::parse("DESCRIPTORS 1\nimg DESCRIPTOR_TYPE_STORAGE_IMAGE 0\n", ShaderStages::FRAGMENT).unwrap();
    assert!(matches!(plan_graphics_bindings(&vs(), &fs, &[], &[]), Err(GraphicsError::InvalidUsage(_))));
  }

  #[test]
  fn compute_bindings() {
    let cs = ShaderMetadata::parse("\
DESCRIPTORS 2
src DESCRIPTOR_TYPE_STORAGE_IMAGE 0
dst DESCRIPTOR_TYPE_STORAGE_BUFFER 1
", ShaderStages::COMPUTE).unwrap();
    let bindings = plan_compute_bindings(&cs).unwrap();
    assert_eq!(bindings.set_count(), 2);
    assert_eq!(bindings.set_layouts[1].unwrap().stages, ShaderStages::COMPUTE);
    assert!(bindings.vertex_bindings.is_empty());
  }
}
