use std::ffi::CString;

use crossgfx_core::gpu::{
    BlendFactor,
    BlendOp,
    ColorComponents,
    CompareFunc,
    CullMode,
    Format,
    FrontFace,
    GraphicsError,
    GraphicsPipelineState,
    GraphicsResult,
    PolygonMode,
    PrimitiveTopology,
    StencilOp,
    VertexFormat,
};
use windows::core::PCSTR;
use windows::Win32::Foundation::BOOL;
use windows::Win32::Graphics::Direct3D as D3D;
use windows::Win32::Graphics::Direct3D12 as D3D12;
use windows::Win32::Graphics::Dxgi::Common as DxgiCommon;

use super::*;

pub fn format_to_dxgi(format: Format) -> DxgiCommon::DXGI_FORMAT {
    match format {
        Format::Undefined => DxgiCommon::DXGI_FORMAT_UNKNOWN,
        Format::R8UNorm => DxgiCommon::DXGI_FORMAT_R8_UNORM,
        Format::RG8UNorm => DxgiCommon::DXGI_FORMAT_R8G8_UNORM,
        Format::RGBA8UNorm => DxgiCommon::DXGI_FORMAT_R8G8B8A8_UNORM,
        Format::RGBA8Srgb => DxgiCommon::DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
        Format::BGRA8UNorm => DxgiCommon::DXGI_FORMAT_B8G8R8A8_UNORM,
        Format::BGRA8Srgb => DxgiCommon::DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
        Format::R16UInt => DxgiCommon::DXGI_FORMAT_R16_UINT,
        Format::RG16UInt => DxgiCommon::DXGI_FORMAT_R16G16_UINT,
        Format::RGBA16UInt => DxgiCommon::DXGI_FORMAT_R16G16B16A16_UINT,
        Format::R16Float => DxgiCommon::DXGI_FORMAT_R16_FLOAT,
        Format::RG16Float => DxgiCommon::DXGI_FORMAT_R16G16_FLOAT,
        Format::RGBA16Float => DxgiCommon::DXGI_FORMAT_R16G16B16A16_FLOAT,
        Format::R32UInt => DxgiCommon::DXGI_FORMAT_R32_UINT,
        Format::RG32UInt => DxgiCommon::DXGI_FORMAT_R32G32_UINT,
        Format::RGBA32UInt => DxgiCommon::DXGI_FORMAT_R32G32B32A32_UINT,
        Format::R32Float => DxgiCommon::DXGI_FORMAT_R32_FLOAT,
        Format::RG32Float => DxgiCommon::DXGI_FORMAT_R32G32_FLOAT,
        Format::RGBA32Float => DxgiCommon::DXGI_FORMAT_R32G32B32A32_FLOAT,
        Format::D16 => DxgiCommon::DXGI_FORMAT_D16_UNORM,
        Format::D24 | Format::D24S8 => DxgiCommon::DXGI_FORMAT_D24_UNORM_S8_UINT,
        Format::D32 => DxgiCommon::DXGI_FORMAT_D32_FLOAT,
        Format::D32S8 => DxgiCommon::DXGI_FORMAT_D32_FLOAT_S8X24_UINT,
    }
}

pub fn vertex_format_to_dxgi(format: VertexFormat) -> DxgiCommon::DXGI_FORMAT {
    match format {
        VertexFormat::Float => DxgiCommon::DXGI_FORMAT_R32_FLOAT,
        VertexFormat::Float2 => DxgiCommon::DXGI_FORMAT_R32G32_FLOAT,
        VertexFormat::Float3 => DxgiCommon::DXGI_FORMAT_R32G32B32_FLOAT,
        VertexFormat::Float4 => DxgiCommon::DXGI_FORMAT_R32G32B32A32_FLOAT,
        VertexFormat::UInt => DxgiCommon::DXGI_FORMAT_R32_UINT,
        VertexFormat::UInt2 => DxgiCommon::DXGI_FORMAT_R32G32_UINT,
        VertexFormat::UInt3 => DxgiCommon::DXGI_FORMAT_R32G32B32_UINT,
        VertexFormat::UInt4 => DxgiCommon::DXGI_FORMAT_R32G32B32A32_UINT,
    }
}

pub fn topology_to_d3d(topology: PrimitiveTopology) -> D3D::D3D_PRIMITIVE_TOPOLOGY {
    match topology {
        PrimitiveTopology::PointList => D3D::D3D_PRIMITIVE_TOPOLOGY_POINTLIST,
        PrimitiveTopology::LineList => D3D::D3D_PRIMITIVE_TOPOLOGY_LINELIST,
        PrimitiveTopology::LineStrip => D3D::D3D_PRIMITIVE_TOPOLOGY_LINESTRIP,
        PrimitiveTopology::TriangleList => D3D::D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
        PrimitiveTopology::TriangleStrip => D3D::D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP,
    }
}

pub fn topology_type_to_d3d12(topology_type: D3D12TopologyType) -> D3D12::D3D12_PRIMITIVE_TOPOLOGY_TYPE {
    match topology_type {
        D3D12TopologyType::Point => D3D12::D3D12_PRIMITIVE_TOPOLOGY_TYPE_POINT,
        D3D12TopologyType::Line => D3D12::D3D12_PRIMITIVE_TOPOLOGY_TYPE_LINE,
        D3D12TopologyType::Triangle => D3D12::D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
    }
}

pub fn fill_mode_to_d3d12(polygon_mode: PolygonMode) -> GraphicsResult<D3D12::D3D12_FILL_MODE> {
    match polygon_mode {
        PolygonMode::Fill => Ok(D3D12::D3D12_FILL_MODE_SOLID),
        PolygonMode::Line => Ok(D3D12::D3D12_FILL_MODE_WIREFRAME),
        PolygonMode::Point => Err(GraphicsError::Unsupported("Point fill mode on D3D12".to_string())),
    }
}

pub fn cull_mode_to_d3d12(cull_mode: CullMode) -> GraphicsResult<D3D12::D3D12_CULL_MODE> {
    match cull_mode {
        CullMode::None => Ok(D3D12::D3D12_CULL_MODE_NONE),
        CullMode::Front => Ok(D3D12::D3D12_CULL_MODE_FRONT),
        CullMode::Back => Ok(D3D12::D3D12_CULL_MODE_BACK),
        CullMode::FrontAndBack => Err(GraphicsError::Unsupported("Culling front and back faces on D3D12".to_string())),
    }
}

pub fn compare_func_to_d3d12(compare_func: CompareFunc) -> D3D12::D3D12_COMPARISON_FUNC {
    match compare_func {
        CompareFunc::Never => D3D12::D3D12_COMPARISON_FUNC_NEVER,
        CompareFunc::Less => D3D12::D3D12_COMPARISON_FUNC_LESS,
        CompareFunc::Equal => D3D12::D3D12_COMPARISON_FUNC_EQUAL,
        CompareFunc::LessEqual => D3D12::D3D12_COMPARISON_FUNC_LESS_EQUAL,
        CompareFunc::Greater => D3D12::D3D12_COMPARISON_FUNC_GREATER,
        CompareFunc::NotEqual => D3D12::D3D12_COMPARISON_FUNC_NOT_EQUAL,
        CompareFunc::GreaterEqual => D3D12::D3D12_COMPARISON_FUNC_GREATER_EQUAL,
        CompareFunc::Always => D3D12::D3D12_COMPARISON_FUNC_ALWAYS,
    }
}

pub fn stencil_op_to_d3d12(stencil_op: StencilOp) -> D3D12::D3D12_STENCIL_OP {
    match stencil_op {
        StencilOp::Keep => D3D12::D3D12_STENCIL_OP_KEEP,
        StencilOp::Zero => D3D12::D3D12_STENCIL_OP_ZERO,
        StencilOp::Replace => D3D12::D3D12_STENCIL_OP_REPLACE,
        StencilOp::IncrementClamp => D3D12::D3D12_STENCIL_OP_INCR_SAT,
        StencilOp::DecrementClamp => D3D12::D3D12_STENCIL_OP_DECR_SAT,
        StencilOp::Invert => D3D12::D3D12_STENCIL_OP_INVERT,
        StencilOp::IncrementWrap => D3D12::D3D12_STENCIL_OP_INCR,
        StencilOp::DecrementWrap => D3D12::D3D12_STENCIL_OP_DECR,
    }
}

pub fn blend_factor_to_d3d12(blend_factor: BlendFactor) -> D3D12::D3D12_BLEND {
    match blend_factor {
        BlendFactor::Zero => D3D12::D3D12_BLEND_ZERO,
        BlendFactor::One => D3D12::D3D12_BLEND_ONE,
        BlendFactor::SrcColor => D3D12::D3D12_BLEND_SRC_COLOR,
        BlendFactor::OneMinusSrcColor => D3D12::D3D12_BLEND_INV_SRC_COLOR,
        BlendFactor::DstColor => D3D12::D3D12_BLEND_DEST_COLOR,
        BlendFactor::OneMinusDstColor => D3D12::D3D12_BLEND_INV_DEST_COLOR,
        BlendFactor::SrcAlpha => D3D12::D3D12_BLEND_SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => D3D12::D3D12_BLEND_INV_SRC_ALPHA,
        BlendFactor::DstAlpha => D3D12::D3D12_BLEND_DEST_ALPHA,
        BlendFactor::OneMinusDstAlpha => D3D12::D3D12_BLEND_INV_DEST_ALPHA,
        BlendFactor::ConstantColor | BlendFactor::ConstantAlpha => D3D12::D3D12_BLEND_BLEND_FACTOR,
        BlendFactor::OneMinusConstantColor | BlendFactor::OneMinusConstantAlpha => D3D12::D3D12_BLEND_INV_BLEND_FACTOR,
        BlendFactor::SrcAlphaSaturate => D3D12::D3D12_BLEND_SRC_ALPHA_SAT,
    }
}

pub fn blend_op_to_d3d12(blend_op: BlendOp) -> D3D12::D3D12_BLEND_OP {
    match blend_op {
        BlendOp::Add => D3D12::D3D12_BLEND_OP_ADD,
        BlendOp::Subtract => D3D12::D3D12_BLEND_OP_SUBTRACT,
        BlendOp::ReverseSubtract => D3D12::D3D12_BLEND_OP_REV_SUBTRACT,
        BlendOp::Min => D3D12::D3D12_BLEND_OP_MIN,
        BlendOp::Max => D3D12::D3D12_BLEND_OP_MAX,
    }
}

pub fn color_write_mask_to_d3d12(components: ColorComponents) -> u8 {
    let mut mask = 0;
    for (component, flag) in [
        (ColorComponents::RED, D3D12::D3D12_COLOR_WRITE_ENABLE_RED),
        (ColorComponents::GREEN, D3D12::D3D12_COLOR_WRITE_ENABLE_GREEN),
        (ColorComponents::BLUE, D3D12::D3D12_COLOR_WRITE_ENABLE_BLUE),
        (ColorComponents::ALPHA, D3D12::D3D12_COLOR_WRITE_ENABLE_ALPHA),
    ] {
        if components.contains(component) {
            mask |= flag.0 as u8;
        }
    }
    mask
}

pub fn blend_desc(state: &GraphicsPipelineState) -> D3D12::D3D12_BLEND_DESC {
    let params = &state.blend_params;
    let render_target = D3D12::D3D12_RENDER_TARGET_BLEND_DESC {
        BlendEnable: BOOL::from(state.blend_enable),
        LogicOpEnable: BOOL::from(false),
        SrcBlend: blend_factor_to_d3d12(params.src_color_blend_factor),
        DestBlend: blend_factor_to_d3d12(params.dst_color_blend_factor),
        BlendOp: blend_op_to_d3d12(params.color_blend_op),
        SrcBlendAlpha: blend_factor_to_d3d12(alpha_blend_factor(params.src_alpha_blend_factor)),
        DestBlendAlpha: blend_factor_to_d3d12(alpha_blend_factor(params.dst_alpha_blend_factor)),
        BlendOpAlpha: blend_op_to_d3d12(params.alpha_blend_op),
        LogicOp: D3D12::D3D12_LOGIC_OP_NOOP,
        RenderTargetWriteMask: color_write_mask_to_d3d12(state.color_write_mask),
    };
    let mut desc = D3D12::D3D12_BLEND_DESC {
        AlphaToCoverageEnable: BOOL::from(false),
        IndependentBlendEnable: BOOL::from(false),
        ..Default::default()
    };
    for target in desc.RenderTarget.iter_mut().take(state.num_color_attachments as usize) {
        *target = render_target;
    }
    desc
}

pub fn depth_stencil_desc(state: &GraphicsPipelineState) -> D3D12::D3D12_DEPTH_STENCIL_DESC {
    let stencil = &state.stencil_params;
    let face = D3D12::D3D12_DEPTH_STENCILOP_DESC {
        StencilFailOp: stencil_op_to_d3d12(stencil.fail_op),
        StencilDepthFailOp: stencil_op_to_d3d12(stencil.depth_fail_op),
        StencilPassOp: stencil_op_to_d3d12(stencil.pass_op),
        StencilFunc: compare_func_to_d3d12(stencil.func),
    };
    D3D12::D3D12_DEPTH_STENCIL_DESC {
        DepthEnable: BOOL::from(state.depth_test_enable),
        DepthWriteMask: if state.depth_write_enable {
            D3D12::D3D12_DEPTH_WRITE_MASK_ALL
        } else {
            D3D12::D3D12_DEPTH_WRITE_MASK_ZERO
        },
        DepthFunc: compare_func_to_d3d12(state.depth_func),
        StencilEnable: BOOL::from(state.stencil_enable),
        StencilReadMask: stencil.read_mask,
        StencilWriteMask: stencil.write_mask,
        FrontFace: face,
        BackFace: face,
    }
}

pub fn rasterizer_desc(state: &GraphicsPipelineState) -> GraphicsResult<D3D12::D3D12_RASTERIZER_DESC> {
    Ok(D3D12::D3D12_RASTERIZER_DESC {
        FillMode: fill_mode_to_d3d12(state.polygon_mode)?,
        CullMode: cull_mode_to_d3d12(state.cull_mode)?,
        FrontCounterClockwise: BOOL::from(state.front_face == FrontFace::CounterClockwise),
        DepthBias: 0,
        DepthBiasClamp: 0.0,
        SlopeScaledDepthBias: 0.0,
        DepthClipEnable: BOOL::from(state.depth_test_enable),
        MultisampleEnable: BOOL::from(state.num_samples > 1),
        AntialiasedLineEnable: BOOL::from(false),
        ForcedSampleCount: 0,
        ConservativeRaster: D3D12::D3D12_CONSERVATIVE_RASTERIZATION_MODE_OFF,
    })
}

/// Input element descs with the semantic name strings they point to.
pub struct D3D12InputLayout {
    _semantic_names: Vec<CString>,
    pub elements: Vec<D3D12::D3D12_INPUT_ELEMENT_DESC>,
}

pub fn input_layout(elements: &[D3D12InputElement]) -> GraphicsResult<D3D12InputLayout> {
    let semantic_names = elements
        .iter()
        .map(|element| CString::new(element.semantic_name.as_str()))
        .collect::<Result<Vec<CString>, _>>()
        .map_err(|_| GraphicsError::InvalidUsage("Semantic contains a nul byte".to_string()))?;
    let descs = elements
        .iter()
        .zip(&semantic_names)
        .map(|(element, name)| D3D12::D3D12_INPUT_ELEMENT_DESC {
            SemanticName: PCSTR(name.as_ptr() as *const u8),
            SemanticIndex: element.semantic_index,
            Format: vertex_format_to_dxgi(element.format),
            InputSlot: element.input_slot,
            AlignedByteOffset: element.aligned_byte_offset,
            InputSlotClass: if element.per_instance {
                D3D12::D3D12_INPUT_CLASSIFICATION_PER_INSTANCE_DATA
            } else {
                D3D12::D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA
            },
            InstanceDataStepRate: element.instance_step_rate(),
        })
        .collect();
    Ok(D3D12InputLayout {
        _semantic_names: semantic_names,
        elements: descs,
    })
}

/// Root parameters with the descriptor ranges their tables point to.
pub struct D3D12RootParameters {
    _ranges: Box<[D3D12::D3D12_DESCRIPTOR_RANGE1]>,
    pub parameters: Vec<D3D12::D3D12_ROOT_PARAMETER1>,
}

fn range_type(kind: D3D12RootParameterKind) -> Option<D3D12::D3D12_DESCRIPTOR_RANGE_TYPE> {
    match kind {
        D3D12RootParameterKind::SrvTable => Some(D3D12::D3D12_DESCRIPTOR_RANGE_TYPE_SRV),
        D3D12RootParameterKind::UavTable => Some(D3D12::D3D12_DESCRIPTOR_RANGE_TYPE_UAV),
        D3D12RootParameterKind::SamplerTable => Some(D3D12::D3D12_DESCRIPTOR_RANGE_TYPE_SAMPLER),
        _ => None,
    }
}

pub fn root_parameters(layout: &D3D12RootSignatureLayout) -> D3D12RootParameters {
    let ranges: Box<[D3D12::D3D12_DESCRIPTOR_RANGE1]> = layout
        .parameters
        .iter()
        .map(|parameter| D3D12::D3D12_DESCRIPTOR_RANGE1 {
            RangeType: range_type(parameter.kind).unwrap_or(D3D12::D3D12_DESCRIPTOR_RANGE_TYPE_SRV),
            NumDescriptors: 1,
            BaseShaderRegister: 0,
            RegisterSpace: parameter.register_space,
            Flags: D3D12::D3D12_DESCRIPTOR_RANGE_FLAG_NONE,
            OffsetInDescriptorsFromTableStart: D3D12::D3D12_DESCRIPTOR_RANGE_OFFSET_APPEND,
        })
        .collect();

    let parameters = layout
        .parameters
        .iter()
        .zip(ranges.iter())
        .map(|(parameter, range)| {
            let root_descriptor = |flags| D3D12::D3D12_ROOT_PARAMETER1_0 {
                Descriptor: D3D12::D3D12_ROOT_DESCRIPTOR1 {
                    ShaderRegister: 0,
                    RegisterSpace: parameter.register_space,
                    Flags: flags,
                },
            };
            let (parameter_type, anonymous) = match parameter.kind {
                D3D12RootParameterKind::SrvTable | D3D12RootParameterKind::UavTable | D3D12RootParameterKind::SamplerTable => (
                    D3D12::D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
                    D3D12::D3D12_ROOT_PARAMETER1_0 {
                        DescriptorTable: D3D12::D3D12_ROOT_DESCRIPTOR_TABLE1 {
                            NumDescriptorRanges: 1,
                            pDescriptorRanges: range as *const D3D12::D3D12_DESCRIPTOR_RANGE1,
                        },
                    },
                ),
                D3D12RootParameterKind::ConstantBufferView => (
                    D3D12::D3D12_ROOT_PARAMETER_TYPE_CBV,
                    root_descriptor(D3D12::D3D12_ROOT_DESCRIPTOR_FLAG_DATA_VOLATILE),
                ),
                D3D12RootParameterKind::ShaderResourceView => (
                    D3D12::D3D12_ROOT_PARAMETER_TYPE_SRV,
                    root_descriptor(D3D12::D3D12_ROOT_DESCRIPTOR_FLAG_NONE),
                ),
                D3D12RootParameterKind::UnorderedAccessView => (
                    D3D12::D3D12_ROOT_PARAMETER_TYPE_UAV,
                    root_descriptor(D3D12::D3D12_ROOT_DESCRIPTOR_FLAG_NONE),
                ),
            };
            D3D12::D3D12_ROOT_PARAMETER1 {
                ParameterType: parameter_type,
                Anonymous: anonymous,
                ShaderVisibility: D3D12::D3D12_SHADER_VISIBILITY_ALL,
            }
        })
        .collect();

    D3D12RootParameters {
        _ranges: ranges,
        parameters,
    }
}

/// Fixed function part of a graphics pipeline desc. Root signature and shader bytecode are left empty.
pub fn graphics_pipeline_desc(
    state: &GraphicsPipelineState,
    input_layout: &D3D12InputLayout,
    color_format: Format,
    depth_format: Option<Format>,
) -> GraphicsResult<D3D12::D3D12_GRAPHICS_PIPELINE_STATE_DESC> {
    if state.num_color_attachments as usize > D3D12::D3D12_SIMULTANEOUS_RENDER_TARGET_COUNT as usize {
        return Err(GraphicsError::Unsupported(format!("{} render targets", state.num_color_attachments)));
    }
    let mut desc = D3D12::D3D12_GRAPHICS_PIPELINE_STATE_DESC {
        BlendState: blend_desc(state),
        SampleMask: u32::MAX,
        RasterizerState: rasterizer_desc(state)?,
        DepthStencilState: depth_stencil_desc(state),
        InputLayout: D3D12::D3D12_INPUT_LAYOUT_DESC {
            pInputElementDescs: input_layout.elements.as_ptr(),
            NumElements: input_layout.elements.len() as u32,
        },
        PrimitiveTopologyType: topology_type_to_d3d12(topology_type(state.primitive_topology)),
        NumRenderTargets: state.num_color_attachments,
        DSVFormat: depth_format.map_or(DxgiCommon::DXGI_FORMAT_UNKNOWN, format_to_dxgi),
        SampleDesc: DxgiCommon::DXGI_SAMPLE_DESC {
            Count: state.num_samples,
            Quality: 0,
        },
        ..Default::default()
    };
    for format in desc.RTVFormats.iter_mut().take(state.num_color_attachments as usize) {
        *format = format_to_dxgi(color_format);
    }
    Ok(desc)
}
