use crossgfx_core::gpu::{
    DescriptorInfo,
    DescriptorType,
    PipelineBindings,
    ShaderMetadata,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum D3D12PipelineKind {
    Graphics,
    Compute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum D3D12RootParameterKind {
    SrvTable,
    UavTable,
    SamplerTable,
    /// Root CBV, the data is volatile.
    ConstantBufferView,
    ShaderResourceView,
    UnorderedAccessView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct D3D12RootParameter {
    pub kind: D3D12RootParameterKind,
    pub register_space: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct D3D12DescriptorRootBinding {
    pub name: String,
    pub set: u32,
    pub descriptor_type: DescriptorType,
    pub first_parameter: u32,
}

/// Root parameters of a pipeline and the first parameter index of every descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct D3D12RootSignatureLayout {
    pub parameters: Vec<D3D12RootParameter>,
    pub bindings: Vec<D3D12DescriptorRootBinding>,
}

impl D3D12RootSignatureLayout {
    /// Root parameter index for the descriptor bound at `set`.
    pub fn root_parameter_index(&self, set: u32) -> Option<u32> {
        self.bindings
            .iter()
            .find(|binding| binding.set == set)
            .map(|binding| binding.first_parameter)
    }

    pub fn parameter_count(&self) -> u32 {
        self.parameters.len() as u32
    }
}

/// Whether any of the modules declares the storage buffer `name` readonly.
pub fn is_storage_buffer_readonly(modules: &[&ShaderMetadata], name: &str) -> bool {
    modules
        .iter()
        .find_map(|module| module.find_storage_buffer(name))
        .map_or(false, |buffer| buffer.readonly)
}

/// One descriptor per set, in set order, each in its own register space.
pub fn plan_root_signature<F>(bindings: &PipelineBindings, kind: D3D12PipelineKind, is_readonly: F) -> D3D12RootSignatureLayout
where
    F: Fn(&DescriptorInfo) -> bool,
{
    let mut descriptors: Vec<&DescriptorInfo> = Vec::with_capacity(bindings.descriptors.len());
    for descriptor in &bindings.descriptors {
        match descriptors.iter().find(|existing| existing.set == descriptor.set) {
            Some(existing) => log::debug!("{} shares set {} with {}", descriptor.name, descriptor.set, existing.name),
            None => descriptors.push(descriptor),
        }
    }
    descriptors.sort_by_key(|descriptor| descriptor.set);

    let mut layout = D3D12RootSignatureLayout::default();
    for (register_space, descriptor) in descriptors.into_iter().enumerate() {
        let register_space = register_space as u32;
        layout.bindings.push(D3D12DescriptorRootBinding {
            name: descriptor.name.clone(),
            set: descriptor.set,
            descriptor_type: descriptor.descriptor_type,
            first_parameter: layout.parameter_count(),
        });
        let kinds: &[D3D12RootParameterKind] = match descriptor.descriptor_type {
            DescriptorType::CombinedImageSampler => &[D3D12RootParameterKind::SrvTable, D3D12RootParameterKind::SamplerTable],
            DescriptorType::SampledImage => &[D3D12RootParameterKind::SrvTable],
            DescriptorType::StorageImage => &[D3D12RootParameterKind::UavTable],
            DescriptorType::Sampler => &[D3D12RootParameterKind::SamplerTable],
            DescriptorType::UniformBuffer => &[D3D12RootParameterKind::ConstantBufferView],
            DescriptorType::StorageBuffer => {
                if kind == D3D12PipelineKind::Graphics || is_readonly(descriptor) {
                    &[D3D12RootParameterKind::ShaderResourceView]
                } else {
                    &[D3D12RootParameterKind::UnorderedAccessView]
                }
            }
        };
        layout.parameters.extend(kinds.iter().map(|kind| D3D12RootParameter {
            kind: *kind,
            register_space,
        }));
    }
    layout
}

#[cfg(test)]
mod tests {
    use crossgfx_core::gpu::{
        plan_compute_bindings,
        plan_graphics_bindings,
        ShaderStages,
    };

    use super::*;

    #[test]
    fn combined_image_sampler_takes_two_parameters() {
        let vs = ShaderMetadata::parse(
            "INPUT_ATTRIBUTES 0\nDESCRIPTORS 1\nubo DESCRIPTOR_TYPE_UNIFORM_BUFFER 0\n",
            ShaderStages::VERTEX,
        )
        .unwrap();
        let fs = ShaderMetadata::parse(
            "DESCRIPTORS 3\ntex DESCRIPTOR_TYPE_COMBINED_IMAGE_SAMPLER 1\nubo DESCRIPTOR_TYPE_UNIFORM_BUFFER 0\nlights DESCRIPTOR_TYPE_STORAGE_BUFFER 3\n",
            ShaderStages::FRAGMENT,
        )
        .unwrap();
        let bindings = plan_graphics_bindings(&vs, &fs, &[], &[]).unwrap();
        let layout = plan_root_signature(&bindings, D3D12PipelineKind::Graphics, |_| false);

        let kinds: Vec<D3D12RootParameterKind> = layout.parameters.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                D3D12RootParameterKind::ConstantBufferView,
                D3D12RootParameterKind::SrvTable,
                D3D12RootParameterKind::SamplerTable,
                D3D12RootParameterKind::ShaderResourceView,
            ]
        );
        let spaces: Vec<u32> = layout.parameters.iter().map(|p| p.register_space).collect();
        assert_eq!(spaces, vec![0, 1, 1, 2]);
        assert_eq!(layout.root_parameter_index(0), Some(0));
        assert_eq!(layout.root_parameter_index(1), Some(1));
        assert_eq!(layout.root_parameter_index(3), Some(3));
        assert_eq!(layout.root_parameter_index(2), None);
    }

    #[test]
    fn compute_storage_buffers_are_uavs_unless_readonly() {
        let cs = ShaderMetadata::parse(
            "\
DESCRIPTORS 3
input DESCRIPTOR_TYPE_STORAGE_BUFFER 0
output DESCRIPTOR_TYPE_STORAGE_BUFFER 1
image DESCRIPTOR_TYPE_STORAGE_IMAGE 2
",
            ShaderStages::COMPUTE,
        )
        .unwrap();
        let bindings = plan_compute_bindings(&cs).unwrap();
        let layout = plan_root_signature(&bindings, D3D12PipelineKind::Compute, |d| d.name == "input");
        let kinds: Vec<D3D12RootParameterKind> = layout.parameters.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                D3D12RootParameterKind::ShaderResourceView,
                D3D12RootParameterKind::UnorderedAccessView,
                D3D12RootParameterKind::UavTable,
            ]
        );
        assert_eq!(layout.bindings[2].name, "image");
        assert!(!is_storage_buffer_readonly(&[&cs], "output"));
        assert!(!is_storage_buffer_readonly(&[&cs], "missing"));
    }
}
