use std::collections::HashMap;

use crossgfx_core::gpu::{
    DescriptorType,
    ShaderMetadata,
    ShaderStages,
};

/// Slots a descriptor set occupies in a Metal argument table.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct MTLBinding {
    pub buffer_index: Option<u32>,
    pub texture_index: Option<u32>,
    pub sampler_index: Option<u32>,
    pub writable: bool,
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct MTLArgumentTable {
    /// Keyed by descriptor set.
    pub bindings: HashMap<u32, MTLBinding>,
    pub vertex_buffer_count: u32,
    pub buffer_count: u32,
    pub texture_count: u32,
    pub sampler_count: u32,
}

impl MTLArgumentTable {
    pub fn binding(&self, set: u32) -> Option<&MTLBinding> {
        self.bindings.get(&set)
    }
}

/// Vertex buffers take buffer indices 0..n. Each attribute reads from the buffer at its first
/// location, the extra locations of a matrix attribute don't take buffers.
pub fn vertex_buffer_count(metadata: &ShaderMetadata) -> u32 {
    if !metadata.stage.contains(ShaderStages::VERTEX) {
        return 0;
    }
    metadata
        .attributes
        .iter()
        .map(|attribute| attribute.location + 1)
        .max()
        .unwrap_or(0)
}

pub fn plan_argument_table(metadata: &ShaderMetadata) -> MTLArgumentTable {
    let mut table = MTLArgumentTable {
        vertex_buffer_count: vertex_buffer_count(metadata),
        ..Default::default()
    };
    table.buffer_count = table.vertex_buffer_count;

    let mut descriptors: Vec<_> = metadata.descriptors.iter().collect();
    descriptors.sort_by_key(|descriptor| descriptor.set);
    for descriptor in descriptors {
        if table.bindings.contains_key(&descriptor.set) {
            log::warn!("Descriptor {} reuses set {}", descriptor.name, descriptor.set);
            continue;
        }
        let mut binding = MTLBinding::default();
        match descriptor.descriptor_type {
            DescriptorType::UniformBuffer | DescriptorType::StorageBuffer => {
                binding.buffer_index = Some(table.buffer_count);
                table.buffer_count += 1;
                binding.writable = descriptor.descriptor_type == DescriptorType::StorageBuffer
                    && metadata
                        .find_storage_buffer(&descriptor.name)
                        .map_or(true, |buffer| !buffer.readonly);
            }
            DescriptorType::SampledImage | DescriptorType::StorageImage => {
                binding.texture_index = Some(table.texture_count);
                table.texture_count += 1;
                binding.writable = descriptor.descriptor_type == DescriptorType::StorageImage;
            }
            DescriptorType::Sampler => {
                binding.sampler_index = Some(table.sampler_count);
                table.sampler_count += 1;
            }
            DescriptorType::CombinedImageSampler => {
                binding.texture_index = Some(table.texture_count);
                binding.sampler_index = Some(table.sampler_count);
                table.texture_count += 1;
                table.sampler_count += 1;
            }
        }
        table.bindings.insert(descriptor.set, binding);
    }
    table
}
