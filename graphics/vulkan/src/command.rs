use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use crossgfx_core::gpu::{
    self,
    ClearValues,
    DescriptorType,
    DispatchSize,
    GraphicsError,
    GraphicsResult,
    IndexFormat,
    Rect2D,
    ShaderStages,
};
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::*;

const PROFILE_QUERY_COUNT: u32 = 2;

pub(crate) fn viewport_from_rect(rect: Rect2D) -> vk::Viewport {
    vk::Viewport {
        x: rect.x as f32,
        y: rect.y as f32,
        width: rect.w as f32,
        height: rect.h as f32,
        min_depth: 0.0f32,
        max_depth: 1.0f32,
    }
}

pub(crate) fn scissor_from_rect(rect: Rect2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: rect.x, y: rect.y },
        extent: vk::Extent2D { width: rect.w, height: rect.h },
    }
}

/// Combined source and destination stages of a batch of transitions.
pub(crate) fn transition_stages(transitions: &[SubresourceTransition]) -> (vk::PipelineStageFlags, vk::PipelineStageFlags) {
    transitions.iter().fold(
        (vk::PipelineStageFlags::empty(), vk::PipelineStageFlags::empty()),
        |(src, dst), transition| (src | transition.old.stage, dst | transition.new.stage),
    )
}

/// Layout a sampled or storage image has to be in while a shader accesses it.
pub(crate) fn shader_image_layout(descriptor_type: DescriptorType) -> vk::ImageLayout {
    match descriptor_type {
        DescriptorType::StorageImage => vk::ImageLayout::GENERAL,
        _ => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    }
}

struct VkPassAttachment {
    layouts: Arc<Mutex<ImageLayoutTracker>>,
    level: u32,
    layer: u32,
    final_layout: vk::ImageLayout,
}

pub struct VkCommandBuffer {
    device: Arc<RawVkDevice>,
    pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    query_pool: VkQueryPool,
    profile_state: Mutex<ProfileState>,
    pipeline_layout: Option<Arc<VkPipelineLayout>>,
    bind_point: vk::PipelineBindPoint,
    pass_attachments: Vec<VkPassAttachment>,
    in_render_pass: bool,
    in_compute_pass: bool,
}

impl VkCommandBuffer {
    pub fn new(device: &Arc<RawVkDevice>) -> GraphicsResult<Self> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(device.queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool = unsafe { device.create_command_pool(&pool_info, None) }.map_vk("vkCreateCommandPool")?;

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer = match unsafe { device.allocate_command_buffers(&allocate_info) } {
            Ok(buffers) => buffers[0],
            Err(e) => {
                unsafe {
                    device.destroy_command_pool(pool, None);
                }
                return Err(vk_error("vkAllocateCommandBuffers", e));
            }
        };
        let query_pool = match VkQueryPool::new(device, vk::QueryType::TIMESTAMP, PROFILE_QUERY_COUNT) {
            Ok(query_pool) => query_pool,
            Err(e) => {
                unsafe {
                    device.destroy_command_pool(pool, None);
                }
                return Err(e);
            }
        };

        Ok(Self {
            device: device.clone(),
            pool,
            command_buffer,
            query_pool,
            profile_state: Mutex::new(ProfileState::Idle),
            pipeline_layout: None,
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            pass_attachments: Vec::new(),
            in_render_pass: false,
            in_compute_pass: false,
        })
    }

    #[inline]
    pub(crate) fn handle(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub(crate) fn mark_submitted(&self) {
        let mut state = self.profile_state.lock();
        *state = state.submit();
    }

    pub(crate) unsafe fn record_image_transitions(&mut self, image: vk::Image, aspect_mask: vk::ImageAspectFlags, transitions: &[SubresourceTransition]) {
        if transitions.is_empty() {
            return;
        }
        let barriers: SmallVec<[vk::ImageMemoryBarrier; 8]> = transitions
            .iter()
            .map(|transition| {
                vk::ImageMemoryBarrier::default()
                    .src_access_mask(transition.old.access)
                    .dst_access_mask(transition.new.access)
                    .old_layout(transition.old.layout)
                    .new_layout(transition.new.layout)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(image)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask,
                        base_mip_level: transition.level,
                        level_count: 1,
                        base_array_layer: transition.layer,
                        layer_count: 1,
                    })
            })
            .collect();
        let (src_stage, dst_stage) = transition_stages(transitions);
        self.device.cmd_pipeline_barrier(
            self.command_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &barriers,
        );
    }

    /// Type of the set layout at `set` in the bound pipeline.
    fn expected_descriptor_type(&self, set: u32) -> Option<DescriptorType> {
        self.pipeline_layout
            .as_ref()
            .and_then(|layout| layout.set_layout(set))
            .and_then(|layout| layout.descriptor_type())
    }

    unsafe fn bind_descriptor_set(&mut self, set: u32, descriptor_set: vk::DescriptorSet) {
        let Some(layout) = self.pipeline_layout.as_ref() else {
            log::error!("Tried to bind descriptor set {} without a pipeline", set);
            return;
        };
        if set >= layout.set_count() {
            log::error!("Set {} is out of range, the pipeline has {} sets", set, layout.set_count());
            return;
        }
        self.device.cmd_bind_descriptor_sets(self.command_buffer, self.bind_point, layout.handle(), set, &[descriptor_set], &[]);
    }

    unsafe fn bind_buffer_set(&mut self, buffer: &VkBuffer, set: u32, descriptor_type: DescriptorType) {
        if let Some(expected) = self.expected_descriptor_type(set) {
            if expected != descriptor_type {
                log::error!("Set {} expects {:?}, got a buffer bound as {:?}", set, expected, descriptor_type);
                return;
            }
        }
        match buffer.descriptor_set(descriptor_type) {
            Ok(descriptor_set) => self.bind_descriptor_set(set, descriptor_set),
            Err(e) => log::error!("Failed to bind buffer to set {}: {}", set, e),
        }
    }

    fn reset_state(&mut self) {
        self.pipeline_layout = None;
        self.bind_point = vk::PipelineBindPoint::GRAPHICS;
        self.pass_attachments.clear();
        self.in_render_pass = false;
        self.in_compute_pass = false;
        *self.profile_state.get_mut() = ProfileState::Idle;
    }
}

impl gpu::CommandBuffer<VkBackend> for VkCommandBuffer {
    unsafe fn begin(&mut self) -> GraphicsResult<()> {
        self.reset_state();
        self.device
            .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
            .map_vk("vkResetCommandBuffer")?;
        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.device
            .begin_command_buffer(self.command_buffer, &begin_info)
            .map_vk("vkBeginCommandBuffer")
    }

    unsafe fn end(&mut self) -> GraphicsResult<()> {
        if self.in_render_pass {
            log::warn!("Command buffer ended inside a render pass");
            self.end_render_pass();
        }
        self.device.end_command_buffer(self.command_buffer).map_vk("vkEndCommandBuffer")
    }

    unsafe fn begin_render_pass(&mut self, render_pass: &VkRenderPass, framebuffer: &VkFrameBuffer, clear: &ClearValues) {
        debug_assert!(!self.in_render_pass);
        let initial_layouts = render_pass.initial_layouts();
        let final_layouts = render_pass.final_layouts();
        self.pass_attachments.clear();
        for (index, image) in framebuffer.images().iter().enumerate() {
            let initial_layout = initial_layouts[index];
            if initial_layout != vk::ImageLayout::UNDEFINED {
                let transitions = image
                    .layouts
                    .lock()
                    .transition(image.level..image.level + 1, image.layer..image.layer + 1, initial_layout, None);
                self.record_image_transitions(image.image, image.aspect_mask, &transitions);
            }
            self.pass_attachments.push(VkPassAttachment {
                layouts: image.layouts.clone(),
                level: image.level,
                layer: image.layer,
                final_layout: final_layouts[index],
            });
        }

        let clear_values = render_pass.clear_values(clear);
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass.handle())
            .framebuffer(framebuffer.handle())
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: gpu::Framebuffer::width(framebuffer),
                    height: gpu::Framebuffer::height(framebuffer),
                },
            })
            .clear_values(&clear_values);
        self.device.cmd_begin_render_pass(self.command_buffer, &begin_info, vk::SubpassContents::INLINE);
        self.in_render_pass = true;
    }

    unsafe fn end_render_pass(&mut self) {
        if !self.in_render_pass {
            log::error!("end_render_pass without an active render pass");
            return;
        }
        self.device.cmd_end_render_pass(self.command_buffer);
        for attachment in self.pass_attachments.drain(..) {
            attachment.layouts.lock().set(attachment.level, attachment.layer, attachment.final_layout);
        }
        self.in_render_pass = false;
    }

    unsafe fn begin_compute_pass(&mut self) {
        debug_assert!(!self.in_render_pass);
        self.in_compute_pass = true;
    }

    unsafe fn end_compute_pass(&mut self) {
        if !self.in_compute_pass {
            log::error!("end_compute_pass without an active compute pass");
            return;
        }
        let barrier = vk::MemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::SHADER_WRITE)
            .dst_access_mask(vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE);
        self.device.cmd_pipeline_barrier(
            self.command_buffer,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::DependencyFlags::empty(),
            &[barrier],
            &[],
            &[],
        );
        self.in_compute_pass = false;
    }

    unsafe fn begin_profile(&mut self) {
        debug_assert!(!self.in_render_pass);
        if !self.device.supports_timestamps {
            return;
        }
        if self.in_render_pass {
            log::error!("begin_profile inside a render pass");
            return;
        }
        let Some(state) = self.profile_state.get_mut().begin() else {
            log::error!("begin_profile called twice");
            return;
        };
        *self.profile_state.get_mut() = state;
        // Queries have to be reset before they are written again.
        self.query_pool.reset(self.command_buffer);
        self.device
            .cmd_write_timestamp(self.command_buffer, vk::PipelineStageFlags::TOP_OF_PIPE, self.query_pool.handle(), 0);
    }

    unsafe fn end_profile(&mut self) {
        if !self.device.supports_timestamps {
            return;
        }
        let Some(state) = self.profile_state.get_mut().end() else {
            log::error!("end_profile without begin_profile");
            return;
        };
        *self.profile_state.get_mut() = state;
        self.device
            .cmd_write_timestamp(self.command_buffer, vk::PipelineStageFlags::BOTTOM_OF_PIPE, self.query_pool.handle(), 1);
    }

    fn profile_elapsed(&self) -> GraphicsResult<Duration> {
        if !self.device.supports_timestamps {
            return Err(GraphicsError::Unsupported("Timestamp queries on this queue".to_string()));
        }
        self.profile_state.lock().check_readable()?;
        self.query_pool.elapsed()
    }

    unsafe fn bind_vertex_buffer(&mut self, buffer: &VkBuffer, location: u32, _stride: u32) {
        self.device
            .cmd_bind_vertex_buffers(self.command_buffer, location, &[buffer.handle()], &[0]);
    }

    unsafe fn bind_index_buffer(&mut self, buffer: &VkBuffer, format: IndexFormat) {
        self.device
            .cmd_bind_index_buffer(self.command_buffer, buffer.handle(), 0, index_format_to_vk(format));
    }

    unsafe fn bind_uniform_buffer(&mut self, buffer: &VkBuffer, set: u32, _stages: ShaderStages) {
        self.bind_buffer_set(buffer, set, DescriptorType::UniformBuffer);
    }

    unsafe fn bind_storage_buffer(&mut self, buffer: &VkBuffer, set: u32, _stages: ShaderStages, _readonly: bool) {
        self.bind_buffer_set(buffer, set, DescriptorType::StorageBuffer);
    }

    unsafe fn bind_graphics_pipeline(&mut self, pipeline: &VkPipeline) {
        self.device
            .cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline.handle());
        self.pipeline_layout = Some(pipeline.layout().clone());
        self.bind_point = pipeline.bind_point();
    }

    unsafe fn bind_compute_pipeline(&mut self, pipeline: &VkPipeline) {
        self.device
            .cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::COMPUTE, pipeline.handle());
        self.pipeline_layout = Some(pipeline.layout().clone());
        self.bind_point = pipeline.bind_point();
    }

    unsafe fn bind_texture(&mut self, texture: &VkTexture, set: u32) {
        let descriptor_type = match self.expected_descriptor_type(set) {
            Some(descriptor_type @ (DescriptorType::CombinedImageSampler | DescriptorType::StorageImage)) => descriptor_type,
            Some(other) => {
                log::error!("Set {} expects {:?}, got a texture", set, other);
                return;
            }
            None => {
                log::error!("Set {} is not used by the bound pipeline", set);
                return;
            }
        };
        if !self.in_render_pass {
            let stage = if self.bind_point == vk::PipelineBindPoint::COMPUTE {
                vk::PipelineStageFlags::COMPUTE_SHADER
            } else {
                vk::PipelineStageFlags::VERTEX_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER
            };
            texture.transition_all(self, shader_image_layout(descriptor_type), Some(stage));
        }
        match texture.descriptor_set(descriptor_type) {
            Ok(descriptor_set) => self.bind_descriptor_set(set, descriptor_set),
            Err(e) => log::error!("Failed to bind texture to set {}: {}", set, e),
        }
    }

    unsafe fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        debug_assert!(self.in_render_pass);
        self.device
            .cmd_draw(self.command_buffer, vertex_count, instance_count, first_vertex, first_instance);
    }

    unsafe fn draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32) {
        debug_assert!(self.in_render_pass);
        self.device.cmd_draw_indexed(
            self.command_buffer,
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        );
    }

    unsafe fn dispatch(&mut self, size: &DispatchSize) {
        debug_assert!(!self.in_render_pass);
        self.device
            .cmd_dispatch(self.command_buffer, size.groups[0], size.groups[1], size.groups[2]);
    }

    unsafe fn set_viewport(&mut self, rect: Rect2D) {
        self.device.cmd_set_viewport(self.command_buffer, 0, &[viewport_from_rect(rect)]);
    }

    unsafe fn set_scissor(&mut self, rect: Rect2D) {
        self.device.cmd_set_scissor(self.command_buffer, 0, &[scissor_from_rect(rect)]);
    }
}

impl Drop for VkCommandBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_command_pool(self.pool, None);
        }
    }
}
