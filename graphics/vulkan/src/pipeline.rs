use std::ffi::CStr;
use std::hash::{
    Hash,
    Hasher,
};
use std::io::Cursor;
use std::sync::Arc;

use ash::vk;
use smallvec::SmallVec;
use crossgfx_core::gpu::{
    self,
    GraphicsError,
    GraphicsPipelineDesc,
    GraphicsPipelineState,
    GraphicsResult,
    PipelineBindings,
    RenderPass as _,
    ShaderMetadata,
    ShaderModule as _,
    ShaderStages,
};

use super::*;

const SHADER_ENTRY_POINT_NAME: &CStr = c"main";

pub(crate) fn topology_to_vk(topology: gpu::PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        gpu::PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        gpu::PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        gpu::PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        gpu::PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        gpu::PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
    }
}

pub(crate) fn polygon_mode_to_vk(polygon_mode: gpu::PolygonMode) -> vk::PolygonMode {
    match polygon_mode {
        gpu::PolygonMode::Fill => vk::PolygonMode::FILL,
        gpu::PolygonMode::Line => vk::PolygonMode::LINE,
        gpu::PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub(crate) fn cull_mode_to_vk(cull_mode: gpu::CullMode) -> vk::CullModeFlags {
    match cull_mode {
        gpu::CullMode::None => vk::CullModeFlags::NONE,
        gpu::CullMode::Front => vk::CullModeFlags::FRONT,
        gpu::CullMode::Back => vk::CullModeFlags::BACK,
        gpu::CullMode::FrontAndBack => vk::CullModeFlags::FRONT_AND_BACK,
    }
}

pub(crate) fn front_face_to_vk(front_face: gpu::FrontFace) -> vk::FrontFace {
    match front_face {
        gpu::FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
        gpu::FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
    }
}

pub(crate) fn compare_func_to_vk(compare_func: gpu::CompareFunc) -> vk::CompareOp {
    match compare_func {
        gpu::CompareFunc::Always => vk::CompareOp::ALWAYS,
        gpu::CompareFunc::NotEqual => vk::CompareOp::NOT_EQUAL,
        gpu::CompareFunc::Never => vk::CompareOp::NEVER,
        gpu::CompareFunc::Less => vk::CompareOp::LESS,
        gpu::CompareFunc::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        gpu::CompareFunc::Equal => vk::CompareOp::EQUAL,
        gpu::CompareFunc::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        gpu::CompareFunc::Greater => vk::CompareOp::GREATER,
    }
}

pub(crate) fn stencil_op_to_vk(stencil_op: gpu::StencilOp) -> vk::StencilOp {
    match stencil_op {
        gpu::StencilOp::Keep => vk::StencilOp::KEEP,
        gpu::StencilOp::Zero => vk::StencilOp::ZERO,
        gpu::StencilOp::Replace => vk::StencilOp::REPLACE,
        gpu::StencilOp::IncrementClamp => vk::StencilOp::INCREMENT_AND_CLAMP,
        gpu::StencilOp::DecrementClamp => vk::StencilOp::DECREMENT_AND_CLAMP,
        gpu::StencilOp::Invert => vk::StencilOp::INVERT,
        gpu::StencilOp::IncrementWrap => vk::StencilOp::INCREMENT_AND_WRAP,
        gpu::StencilOp::DecrementWrap => vk::StencilOp::DECREMENT_AND_WRAP,
    }
}

pub(crate) fn blend_factor_to_vk(blend_factor: gpu::BlendFactor) -> vk::BlendFactor {
    match blend_factor {
        gpu::BlendFactor::Zero => vk::BlendFactor::ZERO,
        gpu::BlendFactor::One => vk::BlendFactor::ONE,
        gpu::BlendFactor::SrcColor => vk::BlendFactor::SRC_COLOR,
        gpu::BlendFactor::OneMinusSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        gpu::BlendFactor::DstColor => vk::BlendFactor::DST_COLOR,
        gpu::BlendFactor::OneMinusDstColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        gpu::BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        gpu::BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        gpu::BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        gpu::BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        gpu::BlendFactor::ConstantColor => vk::BlendFactor::CONSTANT_COLOR,
        gpu::BlendFactor::OneMinusConstantColor => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
        gpu::BlendFactor::ConstantAlpha => vk::BlendFactor::CONSTANT_ALPHA,
        gpu::BlendFactor::OneMinusConstantAlpha => vk::BlendFactor::ONE_MINUS_CONSTANT_ALPHA,
        gpu::BlendFactor::SrcAlphaSaturate => vk::BlendFactor::SRC_ALPHA_SATURATE,
    }
}

pub(crate) fn blend_op_to_vk(blend_op: gpu::BlendOp) -> vk::BlendOp {
    match blend_op {
        gpu::BlendOp::Add => vk::BlendOp::ADD,
        gpu::BlendOp::Subtract => vk::BlendOp::SUBTRACT,
        gpu::BlendOp::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        gpu::BlendOp::Min => vk::BlendOp::MIN,
        gpu::BlendOp::Max => vk::BlendOp::MAX,
    }
}

pub(crate) fn color_components_to_vk(color_components: gpu::ColorComponents) -> vk::ColorComponentFlags {
    let mut flags = vk::ColorComponentFlags::empty();
    for (component, flag) in [
        (gpu::ColorComponents::RED, vk::ColorComponentFlags::R),
        (gpu::ColorComponents::GREEN, vk::ColorComponentFlags::G),
        (gpu::ColorComponents::BLUE, vk::ColorComponentFlags::B),
        (gpu::ColorComponents::ALPHA, vk::ColorComponentFlags::A),
    ] {
        if color_components.contains(component) {
            flags |= flag;
        }
    }
    flags
}

pub(crate) fn rasterization_state(state: &GraphicsPipelineState) -> vk::PipelineRasterizationStateCreateInfo<'static> {
    vk::PipelineRasterizationStateCreateInfo {
        depth_clamp_enable: vk::FALSE,
        rasterizer_discard_enable: vk::FALSE,
        polygon_mode: polygon_mode_to_vk(state.polygon_mode),
        cull_mode: cull_mode_to_vk(state.cull_mode),
        front_face: front_face_to_vk(state.front_face),
        depth_bias_enable: vk::FALSE,
        line_width: state.line_width,
        ..Default::default()
    }
}

/// Front and back faces share the same stencil state.
pub(crate) fn depth_stencil_state(state: &GraphicsPipelineState) -> vk::PipelineDepthStencilStateCreateInfo<'static> {
    let stencil = &state.stencil_params;
    let stencil_state = vk::StencilOpState {
        fail_op: stencil_op_to_vk(stencil.fail_op),
        pass_op: stencil_op_to_vk(stencil.pass_op),
        depth_fail_op: stencil_op_to_vk(stencil.depth_fail_op),
        compare_op: compare_func_to_vk(stencil.func),
        compare_mask: stencil.read_mask as u32,
        write_mask: stencil.write_mask as u32,
        reference: stencil.reference,
    };
    vk::PipelineDepthStencilStateCreateInfo {
        depth_test_enable: state.depth_test_enable as u32,
        depth_write_enable: state.depth_write_enable as u32,
        depth_compare_op: compare_func_to_vk(state.depth_func),
        depth_bounds_test_enable: vk::FALSE,
        stencil_test_enable: state.stencil_enable as u32,
        front: stencil_state,
        back: stencil_state,
        min_depth_bounds: 0.0f32,
        max_depth_bounds: 1.0f32,
        ..Default::default()
    }
}

pub(crate) fn blend_attachment_state(state: &GraphicsPipelineState) -> vk::PipelineColorBlendAttachmentState {
    let blend = &state.blend_params;
    vk::PipelineColorBlendAttachmentState {
        blend_enable: state.blend_enable as u32,
        src_color_blend_factor: blend_factor_to_vk(blend.src_color_blend_factor),
        dst_color_blend_factor: blend_factor_to_vk(blend.dst_color_blend_factor),
        color_blend_op: blend_op_to_vk(blend.color_blend_op),
        src_alpha_blend_factor: blend_factor_to_vk(blend.src_alpha_blend_factor),
        dst_alpha_blend_factor: blend_factor_to_vk(blend.dst_alpha_blend_factor),
        alpha_blend_op: blend_op_to_vk(blend.alpha_blend_op),
        color_write_mask: color_components_to_vk(state.color_write_mask),
    }
}

pub(crate) fn vertex_input_descriptions(
    bindings: &PipelineBindings,
) -> (
    SmallVec<[vk::VertexInputBindingDescription; 8]>,
    SmallVec<[vk::VertexInputAttributeDescription; 8]>,
) {
    let mut binding_descriptions = SmallVec::new();
    let mut attribute_descriptions = SmallVec::new();
    for binding in &bindings.vertex_bindings {
        binding_descriptions.push(vk::VertexInputBindingDescription {
            binding: binding.binding,
            stride: binding.stride,
            input_rate: input_rate_to_vk(binding.input_rate),
        });
        for attribute in &binding.attributes {
            attribute_descriptions.push(vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: binding.binding,
                format: vertex_format_to_vk(attribute.format),
                offset: attribute.offset,
            });
        }
    }
    (binding_descriptions, attribute_descriptions)
}

pub struct VkShaderModule {
    device: Arc<RawVkDevice>,
    shader_module: vk::ShaderModule,
    metadata: ShaderMetadata,
}

impl VkShaderModule {
    pub fn new(device: &Arc<RawVkDevice>, metadata: ShaderMetadata, code: &[u8]) -> GraphicsResult<Self> {
        if code.is_empty() {
            return Err(GraphicsError::InvalidUsage("Shader bytecode is empty".to_string()));
        }
        if metadata.stage.bits().count_ones() != 1 {
            return Err(GraphicsError::InvalidUsage(format!("Shader module needs exactly one stage, got {:?}", metadata.stage)));
        }
        let words = ash::util::read_spv(&mut Cursor::new(code))?;
        let info = vk::ShaderModuleCreateInfo::default().code(&words);
        let shader_module = unsafe { device.create_shader_module(&info, None) }.map_vk("vkCreateShaderModule")?;
        Ok(Self {
            device: device.clone(),
            shader_module,
            metadata,
        })
    }

    #[inline]
    pub(crate) fn handle(&self) -> vk::ShaderModule {
        self.shader_module
    }

    fn stage_info(&self) -> vk::PipelineShaderStageCreateInfo<'static> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(shader_stages_to_vk(self.metadata.stage))
            .module(self.shader_module)
            .name(SHADER_ENTRY_POINT_NAME)
    }
}

impl gpu::ShaderModule for VkShaderModule {
    fn stage(&self) -> ShaderStages {
        self.metadata.stage
    }

    fn metadata(&self) -> &ShaderMetadata {
        &self.metadata
    }
}

impl Drop for VkShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.shader_module, None);
        }
    }
}

impl Hash for VkShaderModule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shader_module.hash(state);
    }
}

impl PartialEq for VkShaderModule {
    fn eq(&self, other: &Self) -> bool {
        self.shader_module == other.shader_module
    }
}

impl Eq for VkShaderModule {}

pub struct VkPipelineLayout {
    device: Arc<RawVkDevice>,
    layout: vk::PipelineLayout,
    set_layouts: Vec<Arc<VkDescriptorSetLayout>>,
}

impl VkPipelineLayout {
    pub(crate) fn new(device: &Arc<RawVkDevice>, set_layouts: Vec<Arc<VkDescriptorSetLayout>>) -> GraphicsResult<Self> {
        let handles: SmallVec<[vk::DescriptorSetLayout; 8]> = set_layouts.iter().map(|layout| layout.handle()).collect();
        let info = vk::PipelineLayoutCreateInfo::default().set_layouts(&handles);
        let layout = unsafe { device.create_pipeline_layout(&info, None) }.map_vk("vkCreatePipelineLayout")?;
        Ok(Self {
            device: device.clone(),
            layout,
            set_layouts,
        })
    }

    #[inline]
    pub(crate) fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }

    pub(crate) fn set_count(&self) -> u32 {
        self.set_layouts.len() as u32
    }

    pub(crate) fn set_layout(&self, index: u32) -> Option<&Arc<VkDescriptorSetLayout>> {
        self.set_layouts.get(index as usize)
    }
}

impl Drop for VkPipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

pub struct VkPipeline {
    device: Arc<RawVkDevice>,
    pipeline: vk::Pipeline,
    layout: Arc<VkPipelineLayout>,
    bind_point: vk::PipelineBindPoint,
    bindings: PipelineBindings,
}

impl VkPipeline {
    pub fn new_graphics(shared: &VkShared, desc: &GraphicsPipelineDesc<VkBackend>) -> GraphicsResult<Self> {
        let device = shared.device();
        let state = &desc.state;
        let render_pass_config = desc.render_pass.config();
        if let Some(attachment) = render_pass_config.color_attachments.first() {
            if attachment.format != desc.color_format {
                return Err(GraphicsError::InvalidUsage(format!(
                    "Pipeline color format {:?} doesn't match render pass format {:?}",
                    desc.color_format, attachment.format
                )));
            }
        }
        let render_pass_depth = render_pass_config.depth_stencil_attachment.as_ref().map(|attachment| attachment.format);
        if render_pass_depth != desc.depth_format {
            return Err(GraphicsError::InvalidUsage(format!(
                "Pipeline depth format {:?} doesn't match render pass depth format {:?}",
                desc.depth_format, render_pass_depth
            )));
        }
        if state.num_samples != render_pass_config.num_samples {
            return Err(GraphicsError::InvalidUsage(format!(
                "Pipeline uses {} samples, render pass {}",
                state.num_samples, render_pass_config.num_samples
            )));
        }

        let bindings = gpu::plan_graphics_bindings(desc.vs.metadata(), desc.fs.metadata(), desc.instance_attributes, desc.vertex_attribute_offsets)?;
        let layout = shared.pipeline_layout(&VkPipelineLayoutKey::from_bindings(&bindings))?;

        let shader_stages = [desc.vs.stage_info(), desc.fs.stage_info()];
        let (binding_descriptions, attribute_descriptions) = vertex_input_descriptions(&bindings);
        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&binding_descriptions)
            .vertex_attribute_descriptions(&attribute_descriptions);
        let input_assembly_info = vk::PipelineInputAssemblyStateCreateInfo::default().topology(topology_to_vk(state.primitive_topology));
        let rasterization_info = rasterization_state(state);
        let multisample_info = vk::PipelineMultisampleStateCreateInfo::default().rasterization_samples(samples_to_vk(state.num_samples));
        let depth_stencil_info = depth_stencil_state(state);
        let blend_attachments: SmallVec<[vk::PipelineColorBlendAttachmentState; 4]> =
            (0..state.num_color_attachments).map(|_| blend_attachment_state(state)).collect();
        let blend_info = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);
        let viewport_info = vk::PipelineViewportStateCreateInfo::default().viewport_count(1).scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_info = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly_info)
            .viewport_state(&viewport_info)
            .rasterization_state(&rasterization_info)
            .multisample_state(&multisample_info)
            .depth_stencil_state(&depth_stencil_info)
            .color_blend_state(&blend_info)
            .dynamic_state(&dynamic_info)
            .layout(layout.handle())
            .render_pass(desc.render_pass.handle())
            .subpass(0);

        let pipeline = unsafe {
            device
                .create_graphics_pipelines(shared.pipeline_cache(), &[pipeline_info], None)
                .map_err(|(_, result)| vk_error("vkCreateGraphicsPipelines", result))?[0]
        };
        log::debug!(
            "Created graphics pipeline with {} sets and {} vertex bindings",
            bindings.set_count(),
            bindings.vertex_bindings.len()
        );

        Ok(Self {
            device: device.clone(),
            pipeline,
            layout,
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            bindings,
        })
    }

    pub fn new_compute(shared: &VkShared, shader: &VkShaderModule) -> GraphicsResult<Self> {
        if shader.stage() != ShaderStages::COMPUTE {
            return Err(GraphicsError::InvalidUsage(format!("Compute pipeline created from a {:?} shader", shader.stage())));
        }
        let device = shared.device();
        let bindings = gpu::plan_compute_bindings(shader.metadata())?;
        let layout = shared.pipeline_layout(&VkPipelineLayoutKey::from_bindings(&bindings))?;

        let pipeline_info = vk::ComputePipelineCreateInfo::default()
            .stage(shader.stage_info())
            .layout(layout.handle());
        let pipeline = unsafe {
            device
                .create_compute_pipelines(shared.pipeline_cache(), &[pipeline_info], None)
                .map_err(|(_, result)| vk_error("vkCreateComputePipelines", result))?[0]
        };
        log::debug!("Created compute pipeline with {} sets", bindings.set_count());

        Ok(Self {
            device: device.clone(),
            pipeline,
            layout,
            bind_point: vk::PipelineBindPoint::COMPUTE,
            bindings,
        })
    }

    #[inline]
    pub(crate) fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    #[inline]
    pub(crate) fn layout(&self) -> &Arc<VkPipelineLayout> {
        &self.layout
    }

    #[inline]
    pub(crate) fn bind_point(&self) -> vk::PipelineBindPoint {
        self.bind_point
    }
}

impl gpu::Pipeline for VkPipeline {
    fn bindings(&self) -> &PipelineBindings {
        &self.bindings
    }
}

impl Drop for VkPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
        }
    }
}

impl Hash for VkPipeline {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pipeline.hash(state);
    }
}

impl PartialEq for VkPipeline {
    fn eq(&self, other: &Self) -> bool {
        self.pipeline == other.pipeline
    }
}

impl Eq for VkPipeline {}

#[cfg(test)]
mod tests {
    use crossgfx_core::gpu::{
        BlendFactor,
        BlendMode,
        ColorComponents,
        CompareFunc,
        CullMode,
        StencilOp,
    };

    use super::*;

    #[test]
    fn enum_tables() {
        assert_eq!(topology_to_vk(gpu::PrimitiveTopology::TriangleStrip), vk::PrimitiveTopology::TRIANGLE_STRIP);
        assert_eq!(cull_mode_to_vk(CullMode::FrontAndBack), vk::CullModeFlags::FRONT_AND_BACK);
        assert_eq!(compare_func_to_vk(CompareFunc::GreaterEqual), vk::CompareOp::GREATER_OR_EQUAL);
        assert_eq!(stencil_op_to_vk(StencilOp::IncrementWrap), vk::StencilOp::INCREMENT_AND_WRAP);
        assert_eq!(stencil_op_to_vk(StencilOp::DecrementClamp), vk::StencilOp::DECREMENT_AND_CLAMP);
        assert_eq!(blend_factor_to_vk(BlendFactor::OneMinusConstantAlpha), vk::BlendFactor::ONE_MINUS_CONSTANT_ALPHA);
        assert_eq!(blend_op_to_vk(gpu::BlendOp::ReverseSubtract), vk::BlendOp::REVERSE_SUBTRACT);
    }

    #[test]
    fn color_write_mask() {
        assert_eq!(color_components_to_vk(ColorComponents::all()), vk::ColorComponentFlags::R | vk::ColorComponentFlags::G | vk::ColorComponentFlags::B | vk::ColorComponentFlags::A);
        assert_eq!(color_components_to_vk(ColorComponents::RED | ColorComponents::ALPHA), vk::ColorComponentFlags::R | vk::ColorComponentFlags::A);
        assert_eq!(color_components_to_vk(ColorComponents::empty()), vk::ColorComponentFlags::empty());
    }

    #[test]
    fn depth_stencil_uses_one_state_for_both_faces() {
        let mut state = GraphicsPipelineState::default();
        state.depth_test_enable = true;
        state.depth_func = CompareFunc::LessEqual;
        state.stencil_enable = true;
        state.stencil_params.pass_op = StencilOp::Replace;
        state.stencil_params.reference = 3;
        state.stencil_params.write_mask = 0x0f;
        let info = depth_stencil_state(&state);
        assert_eq!(info.depth_test_enable, vk::TRUE);
        assert_eq!(info.depth_write_enable, vk::FALSE);
        assert_eq!(info.depth_compare_op, vk::CompareOp::LESS_OR_EQUAL);
        assert_eq!(info.stencil_test_enable, vk::TRUE);
        assert_eq!(info.front.pass_op, vk::StencilOp::REPLACE);
        assert_eq!(info.back.pass_op, vk::StencilOp::REPLACE);
        assert_eq!(info.front.reference, 3);
        assert_eq!(info.back.write_mask, 0x0f);
        assert_eq!(info.front.compare_mask, 0xff);
    }

    #[test]
    fn blend_attachment_uses_alpha_factors() {
        let mut state = GraphicsPipelineState::default();
        state.set_blend_mode(BlendMode::Darken);
        let attachment = blend_attachment_state(&state);
        assert_eq!(attachment.blend_enable, vk::TRUE);
        assert_eq!(attachment.color_blend_op, vk::BlendOp::MIN);
        assert_eq!(attachment.alpha_blend_op, vk::BlendOp::ADD);
        assert_eq!(attachment.src_alpha_blend_factor, vk::BlendFactor::ONE);
        assert_eq!(attachment.dst_alpha_blend_factor, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
        assert_eq!(attachment.color_write_mask, vk::ColorComponentFlags::R | vk::ColorComponentFlags::G | vk::ColorComponentFlags::B | vk::ColorComponentFlags::A);

        let disabled = blend_attachment_state(&GraphicsPipelineState::default());
        assert_eq!(disabled.blend_enable, vk::FALSE);
    }

    #[test]
    fn rasterization() {
        let mut state = GraphicsPipelineState::default();
        state.polygon_mode = gpu::PolygonMode::Line;
        state.front_face = gpu::FrontFace::Clockwise;
        state.line_width = 2.0f32;
        let info = rasterization_state(&state);
        assert_eq!(info.polygon_mode, vk::PolygonMode::LINE);
        assert_eq!(info.cull_mode, vk::CullModeFlags::BACK);
        assert_eq!(info.front_face, vk::FrontFace::CLOCKWISE);
        assert_eq!(info.line_width, 2.0f32);
    }

    #[test]
    fn vertex_input_from_metadata() {
        let vs = ShaderMetadata::parse(
            "INPUT_ATTRIBUTES 2\ninPos POSITION 0 VERTEXFORMAT_FLOAT2\ninModel TEXCOORD0 1 VERTEXFORMAT_MAT4\nDESCRIPTORS 0\n",
            ShaderStages::VERTEX,
        )
        .unwrap();
        let fs = ShaderMetadata::empty(ShaderStages::FRAGMENT);
        let bindings = gpu::plan_graphics_bindings(&vs, &fs, &["inModel"], &[]).unwrap();
        let (binding_descriptions, attribute_descriptions) = vertex_input_descriptions(&bindings);
        assert_eq!(binding_descriptions.len(), 2);
        assert_eq!(binding_descriptions[0].stride, 8);
        assert_eq!(binding_descriptions[1].stride, 64);
        assert_eq!(binding_descriptions[1].input_rate, vk::VertexInputRate::INSTANCE);
        assert_eq!(attribute_descriptions.len(), 5);
        assert_eq!(attribute_descriptions[0].format, vk::Format::R32G32_SFLOAT);
        assert_eq!(attribute_descriptions[4].location, 4);
        assert_eq!(attribute_descriptions[4].binding, 1);
        assert_eq!(attribute_descriptions[4].offset, 48);
        assert_eq!(attribute_descriptions[4].format, vk::Format::R32G32B32A32_SFLOAT);
    }
}
