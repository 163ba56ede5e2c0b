use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2::Message;
use objc2_foundation::NSUInteger;
use objc2_metal::{
    self,
    MTLDevice as _,
};

use crossgfx_core::gpu::{
    self,
    GraphicsError,
    GraphicsResult,
    StateCache,
};

use super::*;

pub fn format_to_mtl(format: gpu::Format) -> objc2_metal::MTLPixelFormat {
    match format {
        gpu::Format::Undefined => objc2_metal::MTLPixelFormat::Invalid,
        gpu::Format::R8UNorm => objc2_metal::MTLPixelFormat::R8Unorm,
        gpu::Format::RG8UNorm => objc2_metal::MTLPixelFormat::RG8Unorm,
        gpu::Format::RGBA8UNorm => objc2_metal::MTLPixelFormat::RGBA8Unorm,
        gpu::Format::RGBA8Srgb => objc2_metal::MTLPixelFormat::RGBA8Unorm_sRGB,
        gpu::Format::BGRA8UNorm => objc2_metal::MTLPixelFormat::BGRA8Unorm,
        gpu::Format::BGRA8Srgb => objc2_metal::MTLPixelFormat::BGRA8Unorm_sRGB,
        gpu::Format::R16UInt => objc2_metal::MTLPixelFormat::R16Uint,
        gpu::Format::RG16UInt => objc2_metal::MTLPixelFormat::RG16Uint,
        gpu::Format::RGBA16UInt => objc2_metal::MTLPixelFormat::RGBA16Uint,
        gpu::Format::R16Float => objc2_metal::MTLPixelFormat::R16Float,
        gpu::Format::RG16Float => objc2_metal::MTLPixelFormat::RG16Float,
        gpu::Format::RGBA16Float => objc2_metal::MTLPixelFormat::RGBA16Float,
        gpu::Format::R32UInt => objc2_metal::MTLPixelFormat::R32Uint,
        gpu::Format::RG32UInt => objc2_metal::MTLPixelFormat::RG32Uint,
        gpu::Format::RGBA32UInt => objc2_metal::MTLPixelFormat::RGBA32Uint,
        gpu::Format::R32Float => objc2_metal::MTLPixelFormat::R32Float,
        gpu::Format::RG32Float => objc2_metal::MTLPixelFormat::RG32Float,
        gpu::Format::RGBA32Float => objc2_metal::MTLPixelFormat::RGBA32Float,
        gpu::Format::D16 => objc2_metal::MTLPixelFormat::Depth16Unorm,
        gpu::Format::D24 | gpu::Format::D24S8 => objc2_metal::MTLPixelFormat::Depth24Unorm_Stencil8,
        gpu::Format::D32 => objc2_metal::MTLPixelFormat::Depth32Float,
        gpu::Format::D32S8 => objc2_metal::MTLPixelFormat::Depth32Float_Stencil8,
    }
}

pub fn vertex_format_to_mtl(format: gpu::VertexFormat) -> objc2_metal::MTLVertexFormat {
    match format {
        gpu::VertexFormat::Float => objc2_metal::MTLVertexFormat::Float,
        gpu::VertexFormat::Float2 => objc2_metal::MTLVertexFormat::Float2,
        gpu::VertexFormat::Float3 => objc2_metal::MTLVertexFormat::Float3,
        gpu::VertexFormat::Float4 => objc2_metal::MTLVertexFormat::Float4,
        gpu::VertexFormat::UInt => objc2_metal::MTLVertexFormat::UInt,
        gpu::VertexFormat::UInt2 => objc2_metal::MTLVertexFormat::UInt2,
        gpu::VertexFormat::UInt3 => objc2_metal::MTLVertexFormat::UInt3,
        gpu::VertexFormat::UInt4 => objc2_metal::MTLVertexFormat::UInt4,
    }
}

pub fn index_format_to_mtl(format: gpu::IndexFormat) -> objc2_metal::MTLIndexType {
    match format {
        gpu::IndexFormat::U16 => objc2_metal::MTLIndexType::UInt16,
        gpu::IndexFormat::U32 => objc2_metal::MTLIndexType::UInt32,
    }
}

pub fn filter_to_mtl(filter: gpu::Filter) -> objc2_metal::MTLSamplerMinMagFilter {
    match filter {
        gpu::Filter::Nearest => objc2_metal::MTLSamplerMinMagFilter::Nearest,
        gpu::Filter::Linear => objc2_metal::MTLSamplerMinMagFilter::Linear,
    }
}

pub fn mip_filter_to_mtl(filter: gpu::Filter) -> objc2_metal::MTLSamplerMipFilter {
    match filter {
        gpu::Filter::Nearest => objc2_metal::MTLSamplerMipFilter::Nearest,
        gpu::Filter::Linear => objc2_metal::MTLSamplerMipFilter::Linear,
    }
}

pub fn address_mode_to_mtl(address_mode: gpu::AddressMode) -> objc2_metal::MTLSamplerAddressMode {
    match address_mode {
        gpu::AddressMode::ClampToEdge => objc2_metal::MTLSamplerAddressMode::ClampToEdge,
        gpu::AddressMode::MirrorClampToEdge => objc2_metal::MTLSamplerAddressMode::MirrorClampToEdge,
        gpu::AddressMode::Repeat => objc2_metal::MTLSamplerAddressMode::Repeat,
        gpu::AddressMode::MirrorRepeat => objc2_metal::MTLSamplerAddressMode::MirrorRepeat,
    }
}

pub fn primitive_type_to_mtl(topology: gpu::PrimitiveTopology) -> objc2_metal::MTLPrimitiveType {
    match topology {
        gpu::PrimitiveTopology::PointList => objc2_metal::MTLPrimitiveType::Point,
        gpu::PrimitiveTopology::LineList => objc2_metal::MTLPrimitiveType::Line,
        gpu::PrimitiveTopology::LineStrip => objc2_metal::MTLPrimitiveType::LineStrip,
        gpu::PrimitiveTopology::TriangleList => objc2_metal::MTLPrimitiveType::Triangle,
        gpu::PrimitiveTopology::TriangleStrip => objc2_metal::MTLPrimitiveType::TriangleStrip,
    }
}

pub(crate) fn topology_class_to_mtl(topology: gpu::PrimitiveTopology) -> objc2_metal::MTLPrimitiveTopologyClass {
    match topology {
        gpu::PrimitiveTopology::PointList => objc2_metal::MTLPrimitiveTopologyClass::Point,
        gpu::PrimitiveTopology::LineList | gpu::PrimitiveTopology::LineStrip => objc2_metal::MTLPrimitiveTopologyClass::Line,
        gpu::PrimitiveTopology::TriangleList | gpu::PrimitiveTopology::TriangleStrip => objc2_metal::MTLPrimitiveTopologyClass::Triangle,
    }
}

pub fn cull_mode_to_mtl(cull_mode: gpu::CullMode) -> GraphicsResult<objc2_metal::MTLCullMode> {
    match cull_mode {
        gpu::CullMode::None => Ok(objc2_metal::MTLCullMode::None),
        gpu::CullMode::Front => Ok(objc2_metal::MTLCullMode::Front),
        gpu::CullMode::Back => Ok(objc2_metal::MTLCullMode::Back),
        gpu::CullMode::FrontAndBack => Err(GraphicsError::Unsupported("Culling front and back faces on Metal".to_string())),
    }
}

pub fn winding_to_mtl(front_face: gpu::FrontFace) -> objc2_metal::MTLWinding {
    match front_face {
        gpu::FrontFace::CounterClockwise => objc2_metal::MTLWinding::CounterClockwise,
        gpu::FrontFace::Clockwise => objc2_metal::MTLWinding::Clockwise,
    }
}

pub fn fill_mode_to_mtl(polygon_mode: gpu::PolygonMode) -> GraphicsResult<objc2_metal::MTLTriangleFillMode> {
    match polygon_mode {
        gpu::PolygonMode::Fill => Ok(objc2_metal::MTLTriangleFillMode::Fill),
        gpu::PolygonMode::Line => Ok(objc2_metal::MTLTriangleFillMode::Lines),
        gpu::PolygonMode::Point => Err(GraphicsError::Unsupported("Point fill mode on Metal".to_string())),
    }
}

pub fn compare_func_to_mtl(compare_func: gpu::CompareFunc) -> objc2_metal::MTLCompareFunction {
    match compare_func {
        gpu::CompareFunc::Always => objc2_metal::MTLCompareFunction::Always,
        gpu::CompareFunc::NotEqual => objc2_metal::MTLCompareFunction::NotEqual,
        gpu::CompareFunc::Never => objc2_metal::MTLCompareFunction::Never,
        gpu::CompareFunc::Less => objc2_metal::MTLCompareFunction::Less,
        gpu::CompareFunc::LessEqual => objc2_metal::MTLCompareFunction::LessEqual,
        gpu::CompareFunc::Equal => objc2_metal::MTLCompareFunction::Equal,
        gpu::CompareFunc::GreaterEqual => objc2_metal::MTLCompareFunction::GreaterEqual,
        gpu::CompareFunc::Greater => objc2_metal::MTLCompareFunction::Greater,
    }
}

pub fn stencil_op_to_mtl(stencil_op: gpu::StencilOp) -> objc2_metal::MTLStencilOperation {
    match stencil_op {
        gpu::StencilOp::Keep => objc2_metal::MTLStencilOperation::Keep,
        gpu::StencilOp::Zero => objc2_metal::MTLStencilOperation::Zero,
        gpu::StencilOp::Replace => objc2_metal::MTLStencilOperation::Replace,
        gpu::StencilOp::IncrementClamp => objc2_metal::MTLStencilOperation::IncrementClamp,
        gpu::StencilOp::DecrementClamp => objc2_metal::MTLStencilOperation::DecrementClamp,
        gpu::StencilOp::Invert => objc2_metal::MTLStencilOperation::Invert,
        gpu::StencilOp::IncrementWrap => objc2_metal::MTLStencilOperation::IncrementWrap,
        gpu::StencilOp::DecrementWrap => objc2_metal::MTLStencilOperation::DecrementWrap,
    }
}

pub fn blend_factor_to_mtl(blend_factor: gpu::BlendFactor) -> objc2_metal::MTLBlendFactor {
    match blend_factor {
        gpu::BlendFactor::Zero => objc2_metal::MTLBlendFactor::Zero,
        gpu::BlendFactor::One => objc2_metal::MTLBlendFactor::One,
        gpu::BlendFactor::SrcColor => objc2_metal::MTLBlendFactor::SourceColor,
        gpu::BlendFactor::OneMinusSrcColor => objc2_metal::MTLBlendFactor::OneMinusSourceColor,
        gpu::BlendFactor::DstColor => objc2_metal::MTLBlendFactor::DestinationColor,
        gpu::BlendFactor::OneMinusDstColor => objc2_metal::MTLBlendFactor::OneMinusDestinationColor,
        gpu::BlendFactor::SrcAlpha => objc2_metal::MTLBlendFactor::SourceAlpha,
        gpu::BlendFactor::OneMinusSrcAlpha => objc2_metal::MTLBlendFactor::OneMinusSourceAlpha,
        gpu::BlendFactor::DstAlpha => objc2_metal::MTLBlendFactor::DestinationAlpha,
        gpu::BlendFactor::OneMinusDstAlpha => objc2_metal::MTLBlendFactor::OneMinusDestinationAlpha,
        gpu::BlendFactor::ConstantColor => objc2_metal::MTLBlendFactor::BlendColor,
        gpu::BlendFactor::OneMinusConstantColor => objc2_metal::MTLBlendFactor::OneMinusBlendColor,
        gpu::BlendFactor::ConstantAlpha => objc2_metal::MTLBlendFactor::BlendAlpha,
        gpu::BlendFactor::OneMinusConstantAlpha => objc2_metal::MTLBlendFactor::OneMinusBlendAlpha,
        gpu::BlendFactor::SrcAlphaSaturate => objc2_metal::MTLBlendFactor::SourceAlphaSaturated,
    }
}

pub fn blend_op_to_mtl(blend_op: gpu::BlendOp) -> objc2_metal::MTLBlendOperation {
    match blend_op {
        gpu::BlendOp::Add => objc2_metal::MTLBlendOperation::Add,
        gpu::BlendOp::Subtract => objc2_metal::MTLBlendOperation::Subtract,
        gpu::BlendOp::ReverseSubtract => objc2_metal::MTLBlendOperation::ReverseSubtract,
        gpu::BlendOp::Min => objc2_metal::MTLBlendOperation::Min,
        gpu::BlendOp::Max => objc2_metal::MTLBlendOperation::Max,
    }
}

pub fn color_components_to_mtl(color_components: gpu::ColorComponents) -> objc2_metal::MTLColorWriteMask {
    let mut colors = objc2_metal::MTLColorWriteMask::empty();
    if color_components.contains(gpu::ColorComponents::RED) {
        colors |= objc2_metal::MTLColorWriteMask::Red;
    }
    if color_components.contains(gpu::ColorComponents::GREEN) {
        colors |= objc2_metal::MTLColorWriteMask::Green;
    }
    if color_components.contains(gpu::ColorComponents::BLUE) {
        colors |= objc2_metal::MTLColorWriteMask::Blue;
    }
    if color_components.contains(gpu::ColorComponents::ALPHA) {
        colors |= objc2_metal::MTLColorWriteMask::Alpha;
    }
    colors
}

/// Rasterizer state, Metal sets it on the render encoder instead of the pipeline.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub struct MTLRasterizerInfo {
    pub fill_mode: objc2_metal::MTLTriangleFillMode,
    pub cull_mode: objc2_metal::MTLCullMode,
    pub front_face: objc2_metal::MTLWinding,
    pub primitive_type: objc2_metal::MTLPrimitiveType,
}

impl MTLRasterizerInfo {
    pub fn from_state(state: &gpu::GraphicsPipelineState) -> GraphicsResult<Self> {
        Ok(Self {
            fill_mode: fill_mode_to_mtl(state.polygon_mode)?,
            cull_mode: cull_mode_to_mtl(state.cull_mode)?,
            front_face: winding_to_mtl(state.front_face),
            primitive_type: primitive_type_to_mtl(state.primitive_topology),
        })
    }
}

fn mutability(writable: bool) -> objc2_metal::MTLMutability {
    if writable {
        objc2_metal::MTLMutability::Mutable
    } else {
        objc2_metal::MTLMutability::Immutable
    }
}

pub unsafe fn vertex_descriptor(bindings: &gpu::PipelineBindings) -> Retained<objc2_metal::MTLVertexDescriptor> {
    let vertex_descriptor = objc2_metal::MTLVertexDescriptor::new();
    for binding in &bindings.vertex_bindings {
        for attribute in &binding.attributes {
            let attribute_desc = objc2_metal::MTLVertexAttributeDescriptor::new();
            attribute_desc.setOffset(attribute.offset as NSUInteger);
            attribute_desc.setBufferIndex(binding.binding as NSUInteger);
            attribute_desc.setFormat(vertex_format_to_mtl(attribute.format));
            vertex_descriptor
                .attributes()
                .setObject_atIndexedSubscript(Some(&attribute_desc), attribute.location as NSUInteger);
        }
        let layout_desc = objc2_metal::MTLVertexBufferLayoutDescriptor::new();
        layout_desc.setStepFunction(match binding.input_rate {
            gpu::VertexInputRate::Vertex => objc2_metal::MTLVertexStepFunction::PerVertex,
            gpu::VertexInputRate::Instance => objc2_metal::MTLVertexStepFunction::PerInstance,
        });
        layout_desc.setStride(binding.stride as NSUInteger);
        vertex_descriptor
            .layouts()
            .setObject_atIndexedSubscript(Some(&layout_desc), binding.binding as NSUInteger);
    }
    vertex_descriptor
}

/// Fixed function part of a render pipeline. Shader functions are set by the caller.
pub unsafe fn render_pipeline_descriptor(
    state: &gpu::GraphicsPipelineState,
    bindings: &gpu::PipelineBindings,
    vertex_table: &MTLArgumentTable,
    fragment_table: &MTLArgumentTable,
    color_format: gpu::Format,
    depth_format: Option<gpu::Format>,
) -> Retained<objc2_metal::MTLRenderPipelineDescriptor> {
    let descriptor = objc2_metal::MTLRenderPipelineDescriptor::new();
    descriptor.setVertexDescriptor(Some(&vertex_descriptor(bindings)));

    let params = &state.blend_params;
    for index in 0..state.num_color_attachments {
        let attachment_desc = descriptor.colorAttachments().objectAtIndexedSubscript(index as NSUInteger);
        attachment_desc.setPixelFormat(format_to_mtl(color_format));
        attachment_desc.setBlendingEnabled(state.blend_enable);
        attachment_desc.setRgbBlendOperation(blend_op_to_mtl(params.color_blend_op));
        attachment_desc.setAlphaBlendOperation(blend_op_to_mtl(params.alpha_blend_op));
        attachment_desc.setSourceRGBBlendFactor(blend_factor_to_mtl(params.src_color_blend_factor));
        attachment_desc.setDestinationRGBBlendFactor(blend_factor_to_mtl(params.dst_color_blend_factor));
        attachment_desc.setSourceAlphaBlendFactor(blend_factor_to_mtl(params.src_alpha_blend_factor));
        attachment_desc.setDestinationAlphaBlendFactor(blend_factor_to_mtl(params.dst_alpha_blend_factor));
        attachment_desc.setWriteMask(color_components_to_mtl(state.color_write_mask));
    }
    descriptor.setRasterSampleCount(state.num_samples as NSUInteger);
    descriptor.setRasterizationEnabled(true);
    descriptor.setInputPrimitiveTopology(topology_class_to_mtl(state.primitive_topology));

    if let Some(depth_format) = depth_format {
        descriptor.setDepthAttachmentPixelFormat(format_to_mtl(depth_format));
        if depth_format.is_stencil() {
            descriptor.setStencilAttachmentPixelFormat(format_to_mtl(depth_format));
        }
    }

    for binding in vertex_table.bindings.values() {
        if let Some(buffer_index) = binding.buffer_index {
            descriptor
                .vertexBuffers()
                .objectAtIndexedSubscript(buffer_index as NSUInteger)
                .setMutability(mutability(binding.writable));
        }
    }
    for binding in fragment_table.bindings.values() {
        if let Some(buffer_index) = binding.buffer_index {
            descriptor
                .fragmentBuffers()
                .objectAtIndexedSubscript(buffer_index as NSUInteger)
                .setMutability(mutability(binding.writable));
        }
    }
    descriptor
}

unsafe fn stencil_descriptor(stencil: &gpu::StencilParams) -> Retained<objc2_metal::MTLStencilDescriptor> {
    let descriptor = objc2_metal::MTLStencilDescriptor::new();
    descriptor.setStencilCompareFunction(compare_func_to_mtl(stencil.func));
    descriptor.setStencilFailureOperation(stencil_op_to_mtl(stencil.fail_op));
    descriptor.setDepthFailureOperation(stencil_op_to_mtl(stencil.depth_fail_op));
    descriptor.setDepthStencilPassOperation(stencil_op_to_mtl(stencil.pass_op));
    descriptor.setReadMask(stencil.read_mask as u32);
    descriptor.setWriteMask(stencil.write_mask as u32);
    descriptor
}

pub unsafe fn depth_stencil_descriptor(key: &MTLDepthStencilKey) -> Retained<objc2_metal::MTLDepthStencilDescriptor> {
    let descriptor = objc2_metal::MTLDepthStencilDescriptor::new();
    descriptor.setDepthCompareFunction(compare_func_to_mtl(key.depth_func));
    descriptor.setDepthWriteEnabled(key.depth_write_enable);
    if let Some(stencil) = key.stencil.as_ref() {
        let stencil = stencil_descriptor(stencil);
        descriptor.setFrontFaceStencil(Some(&stencil));
        descriptor.setBackFaceStencil(Some(&stencil));
    }
    descriptor
}

pub type MTLDepthStencilState = Retained<ProtocolObject<dyn objc2_metal::MTLDepthStencilState>>;

/// Depth stencil state objects, one per distinct key.
pub struct MTLDepthStencilStates {
    device: Retained<ProtocolObject<dyn objc2_metal::MTLDevice>>,
    cache: StateCache<MTLDepthStencilKey, MTLDepthStencilState>,
}

impl MTLDepthStencilStates {
    pub fn new(device: &ProtocolObject<dyn objc2_metal::MTLDevice>) -> Self {
        Self {
            device: device.retain(),
            cache: StateCache::new(),
        }
    }

    pub fn get(&self, state: &gpu::GraphicsPipelineState) -> GraphicsResult<std::sync::Arc<MTLDepthStencilState>> {
        self.cache.get_or_try_create(&MTLDepthStencilKey::from_state(state), |key| {
            log::debug!("Creating depth stencil state {:?}", key);
            let descriptor = unsafe { depth_stencil_descriptor(key) };
            self.device
                .newDepthStencilStateWithDescriptor(&descriptor)
                .ok_or(GraphicsError::Backend {
                    api: "newDepthStencilStateWithDescriptor",
                    code: "nil".to_string(),
                })
        })
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}
