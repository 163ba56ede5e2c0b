use std::hash::{
    Hash,
    Hasher,
};
use std::sync::Arc;

use ash::vk;
use crossgfx_core::gpu::{
    self,
    Format,
    FramebufferAttachment,
    GraphicsError,
    GraphicsResult,
    RenderPassConfig,
    Texture as _,
};
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::*;

/// Everything needed to create a render pass, kept as plain data.
pub(crate) struct RenderPassDesc {
    pub attachments: Vec<vk::AttachmentDescription>,
    pub attachment_formats: Vec<Format>,
    pub color_refs: SmallVec<[vk::AttachmentReference; 4]>,
    pub resolve_refs: SmallVec<[vk::AttachmentReference; 4]>,
    pub depth_ref: Option<vk::AttachmentReference>,
    pub depth_resolve_ref: Option<vk::AttachmentReference>,
    pub dependencies: [vk::SubpassDependency; 2],
}

fn resolve_attachment(format: Format, final_layout: vk::ImageLayout) -> vk::AttachmentDescription {
    vk::AttachmentDescription {
        format: format_to_vk(format),
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::DONT_CARE,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout,
        ..Default::default()
    }
}

/// Attachment order: every color attachment followed by its resolve target when multisampled,
/// then depth, then the depth resolve target.
pub(crate) fn render_pass_desc(config: &RenderPassConfig) -> RenderPassDesc {
    let samples = samples_to_vk(config.num_samples);
    let multisampled = config.is_multisampled();
    let mut attachments = Vec::<vk::AttachmentDescription>::with_capacity(config.attachment_count() as usize);
    let mut attachment_formats = Vec::<Format>::with_capacity(config.attachment_count() as usize);
    let mut color_refs = SmallVec::<[vk::AttachmentReference; 4]>::new();
    let mut resolve_refs = SmallVec::<[vk::AttachmentReference; 4]>::new();

    for color in &config.color_attachments {
        let final_layout = image_layout_to_vk(color.final_layout_or_default());
        color_refs.push(vk::AttachmentReference {
            attachment: attachments.len() as u32,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        });
        attachments.push(vk::AttachmentDescription {
            format: format_to_vk(color.format),
            samples,
            load_op: load_op_to_vk(color.load_op),
            store_op: store_op_to_vk(color.store_op),
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: image_layout_to_vk(color.initial_layout_or_default()),
            final_layout,
            ..Default::default()
        });
        attachment_formats.push(color.format);
        if multisampled {
            resolve_refs.push(vk::AttachmentReference {
                attachment: attachments.len() as u32,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            });
            attachments.push(resolve_attachment(color.format, final_layout));
            attachment_formats.push(color.format);
        }
    }

    let mut depth_ref = None;
    let mut depth_resolve_ref = None;
    if let Some(depth) = config.depth_stencil_attachment.as_ref() {
        let final_layout = image_layout_to_vk(depth.final_layout_or_default());
        depth_ref = Some(vk::AttachmentReference {
            attachment: attachments.len() as u32,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        });
        attachments.push(vk::AttachmentDescription {
            format: format_to_vk(depth.format),
            samples,
            load_op: load_op_to_vk(depth.load_op),
            store_op: store_op_to_vk(depth.store_op),
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: image_layout_to_vk(depth.initial_layout_or_default()),
            final_layout,
            ..Default::default()
        });
        attachment_formats.push(depth.format);
        if multisampled && config.enable_depth_stencil_resolve {
            depth_resolve_ref = Some(vk::AttachmentReference {
                attachment: attachments.len() as u32,
                layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            });
            attachments.push(resolve_attachment(depth.format, final_layout));
            attachment_formats.push(depth.format);
        }
    }

    // Color-only passes get exactly the color stage and access masks. A depth attachment adds the
    // fragment test stages and depth access to both dependencies so its clear and store are ordered too.
    let mut attachment_stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    let mut attachment_access = vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE;
    if depth_ref.is_some() {
        attachment_stages |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
        attachment_access |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    }
    let dependencies = [
        vk::SubpassDependency {
            src_subpass: vk::SUBPASS_EXTERNAL,
            dst_subpass: 0,
            src_stage_mask: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            dst_stage_mask: attachment_stages,
            src_access_mask: vk::AccessFlags::MEMORY_READ,
            dst_access_mask: attachment_access,
            dependency_flags: vk::DependencyFlags::BY_REGION,
        },
        vk::SubpassDependency {
            src_subpass: 0,
            dst_subpass: vk::SUBPASS_EXTERNAL,
            src_stage_mask: attachment_stages,
            dst_stage_mask: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            src_access_mask: attachment_access,
            dst_access_mask: vk::AccessFlags::MEMORY_READ,
            dependency_flags: vk::DependencyFlags::BY_REGION,
        },
    ];

    RenderPassDesc {
        attachments,
        attachment_formats,
        color_refs,
        resolve_refs,
        depth_ref,
        depth_resolve_ref,
        dependencies,
    }
}

unsafe fn create_render_pass(device: &RawVkDevice, desc: &RenderPassDesc) -> GraphicsResult<vk::RenderPass> {
    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&desc.color_refs);
    if !desc.resolve_refs.is_empty() {
        subpass = subpass.resolve_attachments(&desc.resolve_refs);
    }
    if let Some(depth_ref) = desc.depth_ref.as_ref() {
        subpass = subpass.depth_stencil_attachment(depth_ref);
    }
    let subpasses = [subpass];
    let info = vk::RenderPassCreateInfo::default()
        .attachments(&desc.attachments)
        .subpasses(&subpasses)
        .dependencies(&desc.dependencies);
    device.create_render_pass(&info, None).map_vk("vkCreateRenderPass")
}

fn attachment_ref2(reference: &vk::AttachmentReference, aspect_mask: vk::ImageAspectFlags) -> vk::AttachmentReference2<'static> {
    vk::AttachmentReference2::default()
        .attachment(reference.attachment)
        .layout(reference.layout)
        .aspect_mask(aspect_mask)
}

/// Depth resolve attachments need VK_KHR_create_renderpass2, core since Vulkan 1.2.
unsafe fn create_render_pass2(device: &RawVkDevice, desc: &RenderPassDesc) -> GraphicsResult<vk::RenderPass> {
    let attachments: Vec<vk::AttachmentDescription2> = desc.attachments.iter()
        .map(|a| vk::AttachmentDescription2::default()
            .format(a.format)
            .samples(a.samples)
            .load_op(a.load_op)
            .store_op(a.store_op)
            .stencil_load_op(a.stencil_load_op)
            .stencil_store_op(a.stencil_store_op)
            .initial_layout(a.initial_layout)
            .final_layout(a.final_layout))
        .collect();
    let color_refs: SmallVec<[vk::AttachmentReference2; 4]> = desc.color_refs.iter()
        .map(|r| attachment_ref2(r, vk::ImageAspectFlags::COLOR))
        .collect();
    let resolve_refs: SmallVec<[vk::AttachmentReference2; 4]> = desc.resolve_refs.iter()
        .map(|r| attachment_ref2(r, vk::ImageAspectFlags::COLOR))
        .collect();
    let depth_aspect = desc.depth_ref
        .map(|r| aspect_mask(desc.attachment_formats[r.attachment as usize]))
        .unwrap_or(vk::ImageAspectFlags::DEPTH);
    let depth_ref = desc.depth_ref.as_ref().map(|r| attachment_ref2(r, depth_aspect));
    let depth_resolve_ref = desc.depth_resolve_ref.as_ref().map(|r| attachment_ref2(r, depth_aspect));

    let stencil_resolve_mode = if depth_aspect.contains(vk::ImageAspectFlags::STENCIL) {
        vk::ResolveModeFlags::SAMPLE_ZERO
    } else {
        vk::ResolveModeFlags::NONE
    };
    let mut depth_resolve = vk::SubpassDescriptionDepthStencilResolve::default()
        .depth_resolve_mode(vk::ResolveModeFlags::SAMPLE_ZERO)
        .stencil_resolve_mode(stencil_resolve_mode);
    if let Some(depth_resolve_ref) = depth_resolve_ref.as_ref() {
        depth_resolve = depth_resolve.depth_stencil_resolve_attachment(depth_resolve_ref);
    }

    let mut subpass = vk::SubpassDescription2::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if !resolve_refs.is_empty() {
        subpass = subpass.resolve_attachments(&resolve_refs);
    }
    if let Some(depth_ref) = depth_ref.as_ref() {
        subpass = subpass.depth_stencil_attachment(depth_ref);
    }
    if depth_resolve_ref.is_some() {
        subpass = subpass.push_next(&mut depth_resolve);
    }
    let subpasses = [subpass];

    let dependencies: Vec<vk::SubpassDependency2> = desc.dependencies.iter()
        .map(|d| vk::SubpassDependency2::default()
            .src_subpass(d.src_subpass)
            .dst_subpass(d.dst_subpass)
            .src_stage_mask(d.src_stage_mask)
            .dst_stage_mask(d.dst_stage_mask)
            .src_access_mask(d.src_access_mask)
            .dst_access_mask(d.dst_access_mask)
            .dependency_flags(d.dependency_flags))
        .collect();

    let info = vk::RenderPassCreateInfo2::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);
    device.create_render_pass2(&info, None).map_vk("vkCreateRenderPass2")
}

pub struct VkRenderPass {
    device: Arc<RawVkDevice>,
    render_pass: vk::RenderPass,
    config: RenderPassConfig,
    initial_layouts: Vec<vk::ImageLayout>,
    final_layouts: Vec<vk::ImageLayout>,
    depth_attachments: Vec<bool>,
}

impl VkRenderPass {
    pub fn new(device: &Arc<RawVkDevice>, config: &RenderPassConfig) -> GraphicsResult<Self> {
        let desc = render_pass_desc(config);
        let render_pass = unsafe {
            if desc.depth_resolve_ref.is_some() {
                create_render_pass2(device, &desc)?
            } else {
                create_render_pass(device, &desc)?
            }
        };
        log::debug!("Created render pass with {} attachments, {} samples", desc.attachments.len(), config.num_samples);
        Ok(Self {
            device: device.clone(),
            render_pass,
            config: config.clone(),
            initial_layouts: desc.attachments.iter().map(|a| a.initial_layout).collect(),
            final_layouts: desc.attachments.iter().map(|a| a.final_layout).collect(),
            depth_attachments: desc.attachment_formats.iter().map(|f| f.is_depth()).collect(),
        })
    }

    #[inline]
    pub(crate) fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub(crate) fn initial_layouts(&self) -> &[vk::ImageLayout] {
        &self.initial_layouts
    }

    pub(crate) fn final_layouts(&self) -> &[vk::ImageLayout] {
        &self.final_layouts
    }

    pub(crate) fn clear_values(&self, clear: &gpu::ClearValues) -> SmallVec<[vk::ClearValue; 8]> {
        self.depth_attachments.iter()
            .map(|is_depth| if *is_depth {
                vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: clear.depth,
                        stencil: clear.stencil,
                    },
                }
            } else {
                vk::ClearValue {
                    color: vk::ClearColorValue {
                        float32: clear.color,
                    },
                }
            })
            .collect()
    }
}

impl gpu::RenderPass for VkRenderPass {
    fn config(&self) -> &RenderPassConfig {
        &self.config
    }
}

impl Drop for VkRenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

impl Hash for VkRenderPass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.render_pass.hash(state);
    }
}

impl PartialEq for VkRenderPass {
    fn eq(&self, other: &Self) -> bool {
        self.render_pass == other.render_pass
    }
}

impl Eq for VkRenderPass {}

/// A framebuffer attachment's subresource and the tracker of the image it belongs to.
pub(crate) struct VkFramebufferImage {
    pub image: vk::Image,
    pub aspect_mask: vk::ImageAspectFlags,
    pub layouts: Arc<Mutex<ImageLayoutTracker>>,
    pub level: u32,
    pub layer: u32,
}

pub struct VkFrameBuffer {
    device: Arc<RawVkDevice>,
    frame_buffer: vk::Framebuffer,
    views: Vec<vk::ImageView>,
    images: Vec<VkFramebufferImage>,
    width: u32,
    height: u32,
    layers: u32,
}

impl VkFrameBuffer {
    pub(crate) fn new(
        device: &Arc<RawVkDevice>,
        render_pass: &VkRenderPass,
        attachments: &[FramebufferAttachment<VkBackend>],
        width: u32,
        height: u32,
        layers: u32,
    ) -> GraphicsResult<Self> {
        if attachments.len() != render_pass.initial_layouts.len() {
            return Err(GraphicsError::InvalidUsage(format!(
                "Render pass has {} attachments, framebuffer got {}",
                render_pass.initial_layouts.len(),
                attachments.len()
            )));
        }

        let mut views = Vec::<vk::ImageView>::with_capacity(attachments.len());
        let mut images = Vec::<VkFramebufferImage>::with_capacity(attachments.len());
        for attachment in attachments {
            let texture = attachment.texture;
            let info = vk::ImageViewCreateInfo {
                image: texture.handle(),
                view_type: vk::ImageViewType::TYPE_2D,
                format: format_to_vk(texture.info().format),
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: aspect_mask(texture.info().format),
                    base_mip_level: attachment.level,
                    level_count: 1,
                    base_array_layer: attachment.layer,
                    layer_count: 1,
                },
                ..Default::default()
            };
            let view = match unsafe { device.create_image_view(&info, None) } {
                Ok(view) => view,
                Err(e) => {
                    unsafe {
                        for view in views {
                            device.destroy_image_view(view, None);
                        }
                    }
                    return Err(vk_error("vkCreateImageView", e));
                }
            };
            views.push(view);
            images.push(VkFramebufferImage {
                image: texture.handle(),
                aspect_mask: aspect_mask(texture.info().format),
                layouts: texture.layouts().clone(),
                level: attachment.level,
                layer: attachment.layer,
            });
        }

        let info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.handle())
            .attachments(&views)
            .width(width)
            .height(height)
            .layers(layers);
        let frame_buffer = match unsafe { device.create_framebuffer(&info, None) } {
            Ok(frame_buffer) => frame_buffer,
            Err(e) => {
                unsafe {
                    for view in views {
                        device.destroy_image_view(view, None);
                    }
                }
                return Err(vk_error("vkCreateFramebuffer", e));
            }
        };

        Ok(Self {
            device: device.clone(),
            frame_buffer,
            views,
            images,
            width,
            height,
            layers,
        })
    }

    #[inline]
    pub(crate) fn handle(&self) -> vk::Framebuffer {
        self.frame_buffer
    }

    pub(crate) fn images(&self) -> &[VkFramebufferImage] {
        &self.images
    }
}

impl gpu::Framebuffer for VkFrameBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn layers(&self) -> u32 {
        self.layers
    }
}

impl Drop for VkFrameBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.frame_buffer, None);
            for view in self.views.drain(..) {
                self.device.destroy_image_view(view, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossgfx_core::gpu::{
        AttachmentDescription,
        ImageLayout,
    };

    #[test]
    fn single_sample_with_depth() {
        let config = RenderPassConfig::offscreen(Format::RGBA8UNorm, Some(Format::D24S8), 1);
        let desc = render_pass_desc(&config);
        assert_eq!(desc.attachments.len(), 2);
        assert_eq!(desc.attachments[0].format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(desc.attachments[0].load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(desc.attachments[0].initial_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(desc.attachments[0].final_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(desc.attachments[1].final_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        assert_eq!(desc.attachments[1].stencil_load_op, vk::AttachmentLoadOp::DONT_CARE);
        assert_eq!(desc.depth_ref.unwrap().attachment, 1);
        assert!(desc.resolve_refs.is_empty());
        assert_eq!(desc.dependencies[0].src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(desc.dependencies[0].src_stage_mask, vk::PipelineStageFlags::BOTTOM_OF_PIPE);
        assert!(desc.dependencies[0].dst_stage_mask.contains(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT));
        assert_eq!(desc.dependencies[1].dst_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(desc.dependencies[1].dependency_flags, vk::DependencyFlags::BY_REGION);
    }

    #[test]
    fn depth_extends_dependencies() {
        let desc = render_pass_desc(&RenderPassConfig::offscreen(Format::RGBA8UNorm, Some(Format::D32), 1));
        let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
        let access = vk::AccessFlags::COLOR_ATTACHMENT_READ
            | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        assert_eq!(desc.dependencies[0].dst_stage_mask, stages);
        assert_eq!(desc.dependencies[0].dst_access_mask, access);
        assert_eq!(desc.dependencies[1].src_stage_mask, stages);
        assert_eq!(desc.dependencies[1].src_access_mask, access);
        assert_eq!(desc.dependencies[1].dst_stage_mask, vk::PipelineStageFlags::BOTTOM_OF_PIPE);
    }

    #[test]
    fn color_only_dependencies() {
        let desc = render_pass_desc(&RenderPassConfig::offscreen(Format::RGBA8UNorm, None, 1));
        assert_eq!(desc.dependencies[0].dst_stage_mask, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(desc.dependencies[1].src_access_mask, vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
        assert_eq!(desc.dependencies[1].dst_access_mask, vk::AccessFlags::MEMORY_READ);
        assert!(desc.depth_ref.is_none());
    }

    #[test]
    fn multisampled_layout() {
        let config = RenderPassConfig {
            color_attachments: vec![
                AttachmentDescription::new(Format::RGBA8UNorm),
                AttachmentDescription::with_layouts(Format::RGBA16Float, ImageLayout::ShaderReadOnlyOptimal, ImageLayout::TransferSrcOptimal),
            ],
            depth_stencil_attachment: Some(AttachmentDescription::new(Format::D32)),
            enable_depth_stencil_resolve: true,
            num_samples: 4,
        };
        let desc = render_pass_desc(&config);
        assert_eq!(desc.attachments.len() as u32, config.attachment_count());
        assert_eq!(desc.attachments.len(), 6);
        let color: Vec<u32> = desc.color_refs.iter().map(|r| r.attachment).collect();
        let resolve: Vec<u32> = desc.resolve_refs.iter().map(|r| r.attachment).collect();
        assert_eq!(color, vec![0, 2]);
        assert_eq!(resolve, vec![1, 3]);
        assert_eq!(desc.depth_ref.unwrap().attachment, 4);
        assert_eq!(desc.depth_resolve_ref.unwrap().attachment, 5);
        assert_eq!(desc.attachments[0].samples, vk::SampleCountFlags::TYPE_4);
        assert_eq!(desc.attachments[1].samples, vk::SampleCountFlags::TYPE_1);
        assert_eq!(desc.attachments[2].initial_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(desc.attachments[3].final_layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        assert_eq!(desc.attachment_formats[5], Format::D32);
    }

    #[test]
    fn depth_resolve_needs_multisampling() {
        let mut config = RenderPassConfig::offscreen(Format::RGBA8UNorm, Some(Format::D16), 1);
        config.enable_depth_stencil_resolve = true;
        let desc = render_pass_desc(&config);
        assert!(desc.depth_resolve_ref.is_none());
        assert_eq!(desc.attachments.len(), 2);
    }
}
