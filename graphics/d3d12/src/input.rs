use crossgfx_core::gpu::{
    PipelineBindings,
    VertexFormat,
    VertexInputRate,
};

/// Splits trailing digits off a semantic, "TEXCOORD1" is ("TEXCOORD", 1).
pub fn parse_semantic(semantic: &str) -> (&str, u32) {
    let split = semantic
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(semantic.len());
    let (name, index) = semantic.split_at(split);
    (name, index.parse().unwrap_or(0))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct D3D12InputElement {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: VertexFormat,
    pub input_slot: u32,
    pub aligned_byte_offset: u32,
    pub per_instance: bool,
}

impl D3D12InputElement {
    pub fn instance_step_rate(&self) -> u32 {
        if self.per_instance {
            1
        } else {
            0
        }
    }
}

/// One element per attribute row, matrix rows take consecutive semantic indices.
pub fn plan_input_elements(bindings: &PipelineBindings) -> Vec<D3D12InputElement> {
    let mut elements = Vec::new();
    for binding in &bindings.vertex_bindings {
        let (semantic_name, semantic_index) = parse_semantic(&binding.semantic);
        for (row, attribute) in binding.attributes.iter().enumerate() {
            elements.push(D3D12InputElement {
                semantic_name: semantic_name.to_string(),
                semantic_index: semantic_index + row as u32,
                format: attribute.format,
                input_slot: binding.binding,
                aligned_byte_offset: attribute.offset,
                per_instance: binding.input_rate == VertexInputRate::Instance,
            });
        }
    }
    elements
}

#[cfg(test)]
mod tests {
    use crossgfx_core::gpu::{
        plan_graphics_bindings,
        ShaderMetadata,
        ShaderStages,
    };

    use super::*;

    #[test]
    fn semantics() {
        assert_eq!(parse_semantic("TEXCOORD1"), ("TEXCOORD", 1));
        assert_eq!(parse_semantic("POSITION"), ("POSITION", 0));
        assert_eq!(parse_semantic("COLOR12"), ("COLOR", 12));
        assert_eq!(parse_semantic(""), ("", 0));
    }

    #[test]
    fn instanced_matrix() {
        let vs = ShaderMetadata::parse(
            "\
INPUT_ATTRIBUTES 2
inPos POSITION 0 VERTEXFORMAT_FLOAT3
inTransform TEXCOORD1 1 VERTEXFORMAT_MAT4
DESCRIPTORS 0
",
            ShaderStages::VERTEX,
        )
        .unwrap();
        let fs = ShaderMetadata::empty(ShaderStages::FRAGMENT);
        let bindings = plan_graphics_bindings(&vs, &fs, &["inTransform"], &[]).unwrap();
        let elements = plan_input_elements(&bindings);
        assert_eq!(elements.len(), 5);
        assert_eq!(elements[0].semantic_name, "POSITION");
        assert_eq!(elements[0].instance_step_rate(), 0);
        let indices: Vec<u32> = elements[1..].iter().map(|e| e.semantic_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert!(elements[1..].iter().all(|e| e.input_slot == 1 && e.instance_step_rate() == 1));
        assert_eq!(elements[4].aligned_byte_offset, 48);
    }
}
