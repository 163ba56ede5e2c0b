use std::hash::{
    Hash,
    Hasher,
};
use std::ops::Range;
use std::sync::Arc;

use ash::vk;
use crossgfx_core::gpu::{
    self,
    Buffer as _,
    BufferUsage,
    DescriptorType,
    GraphicsError,
    GraphicsResult,
    ImageLayout,
    TextureInfo,
    TextureRegion,
    TextureType,
    TextureUsage,
};
use parking_lot::Mutex;

use super::*;

pub(crate) fn texture_usage_to_vk(usage: TextureUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(TextureUsage::SAMPLED) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(TextureUsage::STORAGE) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    if usage.contains(TextureUsage::COLOR_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(TextureUsage::DEPTH_STENCIL_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(TextureUsage::TRANSFER_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(TextureUsage::TRANSFER_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    flags
}

pub(crate) fn texture_type_to_vk(texture_type: TextureType) -> (vk::ImageType, vk::ImageViewType, vk::ImageCreateFlags) {
    match texture_type {
        TextureType::Texture2D => (vk::ImageType::TYPE_2D, vk::ImageViewType::TYPE_2D, vk::ImageCreateFlags::empty()),
        TextureType::Texture2DArray => (vk::ImageType::TYPE_2D, vk::ImageViewType::TYPE_2D_ARRAY, vk::ImageCreateFlags::empty()),
        TextureType::Texture3D => (vk::ImageType::TYPE_3D, vk::ImageViewType::TYPE_3D, vk::ImageCreateFlags::empty()),
        TextureType::TextureCube => (vk::ImageType::TYPE_2D, vk::ImageViewType::CUBE, vk::ImageCreateFlags::CUBE_COMPATIBLE),
    }
}

/// Layout a texture is left in after transfers.
pub(crate) fn resting_layout(usage: TextureUsage) -> vk::ImageLayout {
    if usage.contains(TextureUsage::DEPTH_STENCIL_ATTACHMENT) {
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    } else if usage.contains(TextureUsage::SAMPLED) {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    } else if usage.contains(TextureUsage::STORAGE) {
        vk::ImageLayout::GENERAL
    } else if usage.contains(TextureUsage::COLOR_ATTACHMENT) {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    } else {
        vk::ImageLayout::GENERAL
    }
}

/// Blit regions that build level `i` from level `i - 1`.
pub(crate) fn mip_blits(width: u32, height: u32, mip_levels: u32) -> Vec<vk::ImageBlit> {
    let mut blits = Vec::with_capacity(mip_levels.saturating_sub(1) as usize);
    let mut src_width = width as i32;
    let mut src_height = height as i32;
    for level in 1..mip_levels {
        let dst_width = (src_width / 2).max(1);
        let dst_height = (src_height / 2).max(1);
        blits.push(vk::ImageBlit {
            src_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level - 1,
                base_array_layer: 0,
                layer_count: 1,
            },
            src_offsets: [vk::Offset3D::default(), vk::Offset3D { x: src_width, y: src_height, z: 1 }],
            dst_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level,
                base_array_layer: 0,
                layer_count: 1,
            },
            dst_offsets: [vk::Offset3D::default(), vk::Offset3D { x: dst_width, y: dst_height, z: 1 }],
        });
        src_width = dst_width;
        src_height = dst_height;
    }
    blits
}

/// Buffer to image copy for the top level. For everything but 3D textures `region.z` picks the first array layer.
pub(crate) fn region_copy(info: &TextureInfo, region: &TextureRegion) -> GraphicsResult<(vk::BufferImageCopy, u64)> {
    let (width, height, depth, layers) = region.resolve(info);
    let is_3d = info.texture_type == TextureType::Texture3D;
    let (z_offset, base_layer) = if is_3d { (region.z, 0) } else { (0, region.z) };
    let out_of_bounds = region.x.checked_add(width).map_or(true, |end| end > info.width)
        || region.y.checked_add(height).map_or(true, |end| end > info.height)
        || z_offset.checked_add(depth).map_or(true, |end| end > info.depth)
        || base_layer.checked_add(layers).map_or(true, |end| end > info.array_layers);
    if out_of_bounds || width == 0 || height == 0 || depth == 0 || layers == 0 {
        return Err(GraphicsError::InvalidUsage(format!("Region {:?} is outside of the texture", region)));
    }
    let pitch = region.data_pitch.unwrap_or(width);
    if pitch < width {
        return Err(GraphicsError::InvalidUsage(format!("Row pitch {} is smaller than the region width {}", pitch, width)));
    }
    let bpp = info
        .format
        .bytes_per_pixel()
        .ok_or_else(|| GraphicsError::Unsupported(format!("{:?} has no texel size", info.format)))? as u64;
    let size = pitch as u64 * height as u64 * depth as u64 * layers as u64 * bpp;

    let copy = vk::BufferImageCopy {
        buffer_offset: 0,
        buffer_row_length: if pitch == width { 0 } else { pitch },
        buffer_image_height: 0,
        image_subresource: vk::ImageSubresourceLayers {
            aspect_mask: aspect_mask(info.format),
            mip_level: 0,
            base_array_layer: base_layer,
            layer_count: layers,
        },
        image_offset: vk::Offset3D {
            x: region.x as i32,
            y: region.y as i32,
            z: z_offset as i32,
        },
        image_extent: vk::Extent3D { width, height, depth },
    };
    Ok((copy, size))
}

pub struct VkTexture {
    shared: Arc<VkShared>,
    image: vk::Image,
    memory: VkMemoryHeap,
    view: vk::ImageView,
    sampler: vk::Sampler,
    info: TextureInfo,
    mip_levels: u32,
    layouts: Arc<Mutex<ImageLayoutTracker>>,
    sampled_set: Mutex<Option<VkDescriptorSet>>,
    storage_set: Mutex<Option<VkDescriptorSet>>,
}

impl VkTexture {
    pub fn new(shared: &Arc<VkShared>, info: &TextureInfo) -> GraphicsResult<Self> {
        info.validate()?;
        let device = shared.device();
        let mip_levels = info.mip_levels();
        let (image_type, view_type, flags) = texture_type_to_vk(info.texture_type);
        let mut usage = texture_usage_to_vk(info.usage);
        if info.gen_mipmaps {
            usage |= vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
        }

        let image_info = vk::ImageCreateInfo {
            flags,
            image_type,
            format: format_to_vk(info.format),
            extent: vk::Extent3D {
                width: info.width,
                height: info.height,
                depth: info.depth,
            },
            mip_levels,
            array_layers: info.array_layers,
            samples: samples_to_vk(info.num_samples),
            tiling: vk::ImageTiling::OPTIMAL,
            usage,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            ..Default::default()
        };

        let (image, memory) = unsafe {
            let image = device.create_image(&image_info, None).map_vk("vkCreateImage")?;
            let requirements = device.get_image_memory_requirements(image);
            let memory = VkMemoryHeap::new(device, &requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL).and_then(|memory| {
                device.bind_image_memory(image, memory.handle(), 0).map_vk("vkBindImageMemory")?;
                Ok(memory)
            });
            match memory {
                Ok(memory) => (image, memory),
                Err(e) => {
                    device.destroy_image(image, None);
                    return Err(e);
                }
            }
        };

        // Views and samplers start out null so a failure below is cleaned up by Drop.
        let mut texture = Self {
            shared: shared.clone(),
            image,
            memory,
            view: vk::ImageView::null(),
            sampler: vk::Sampler::null(),
            info: info.clone(),
            mip_levels,
            layouts: Arc::new(Mutex::new(ImageLayoutTracker::new(mip_levels, info.array_layers))),
            sampled_set: Mutex::new(None),
            storage_set: Mutex::new(None),
        };

        let view_info = vk::ImageViewCreateInfo {
            image,
            view_type,
            format: image_info.format,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: aspect_mask(info.format),
                base_mip_level: 0,
                level_count: mip_levels,
                base_array_layer: 0,
                layer_count: info.array_layers,
            },
            ..Default::default()
        };
        texture.view = unsafe { device.create_image_view(&view_info, None) }.map_vk("vkCreateImageView")?;

        if info.usage.contains(TextureUsage::SAMPLED) {
            let sampler_info = vk::SamplerCreateInfo {
                mag_filter: filter_to_vk(info.sampler.mag_filter),
                min_filter: filter_to_vk(info.sampler.min_filter),
                mipmap_mode: mip_filter_to_vk(info.sampler.mip_filter),
                address_mode_u: address_mode_to_vk(info.sampler.address_u),
                address_mode_v: address_mode_to_vk(info.sampler.address_v),
                address_mode_w: address_mode_to_vk(info.sampler.address_w),
                min_lod: 0f32,
                max_lod: mip_levels as f32,
                ..Default::default()
            };
            texture.sampler = unsafe { device.create_sampler(&sampler_info, None) }.map_vk("vkCreateSampler")?;
        }

        log::trace!("Created {}x{} texture {:?} with {} mip levels", info.width, info.height, info.format, mip_levels);
        Ok(texture)
    }

    #[inline]
    pub(crate) fn handle(&self) -> vk::Image {
        self.image
    }

    #[inline]
    pub(crate) fn view(&self) -> vk::ImageView {
        self.view
    }

    pub(crate) fn layouts(&self) -> &Arc<Mutex<ImageLayoutTracker>> {
        &self.layouts
    }

    fn all_levels(&self) -> Range<u32> {
        0..self.mip_levels
    }

    fn all_layers(&self) -> Range<u32> {
        0..self.info.array_layers
    }

    /// Records barriers that move the given subresources into `layout`.
    pub(crate) unsafe fn transition(
        &self,
        command_buffer: &mut VkCommandBuffer,
        levels: Range<u32>,
        layers: Range<u32>,
        layout: vk::ImageLayout,
        stage_override: Option<vk::PipelineStageFlags>,
    ) {
        let transitions = self.layouts.lock().transition(levels, layers, layout, stage_override);
        command_buffer.record_image_transitions(self.image, aspect_mask(self.info.format), &transitions);
    }

    pub(crate) unsafe fn transition_all(&self, command_buffer: &mut VkCommandBuffer, layout: vk::ImageLayout, stage_override: Option<vk::PipelineStageFlags>) {
        self.transition(command_buffer, self.all_levels(), self.all_layers(), layout, stage_override);
    }

    pub(crate) fn descriptor_set(&self, descriptor_type: DescriptorType) -> GraphicsResult<vk::DescriptorSet> {
        let (slot, required_usage, layout) = match descriptor_type {
            DescriptorType::CombinedImageSampler => (&self.sampled_set, TextureUsage::SAMPLED, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            DescriptorType::StorageImage => (&self.storage_set, TextureUsage::STORAGE, vk::ImageLayout::GENERAL),
            _ => return Err(GraphicsError::InvalidUsage(format!("A texture can't be bound as {:?}", descriptor_type))),
        };
        if !self.info.usage.contains(required_usage) {
            return Err(GraphicsError::InvalidUsage(format!("Texture without {:?} usage bound as {:?}", required_usage, descriptor_type)));
        }
        let mut slot = slot.lock();
        if let Some(set) = slot.as_ref() {
            return Ok(set.handle());
        }
        let set = self.shared.allocate_descriptor_set(descriptor_type)?;
        unsafe {
            set.write_image(self.view, self.sampler, layout);
        }
        let handle = set.handle();
        *slot = Some(set);
        Ok(handle)
    }

    unsafe fn record_mipmaps(&self, command_buffer: &mut VkCommandBuffer) {
        let blits = mip_blits(self.info.width, self.info.height, self.mip_levels);
        let device = self.shared.device();
        for layer in self.all_layers() {
            for blit in &blits {
                let src_level = blit.src_subresource.mip_level;
                let dst_level = blit.dst_subresource.mip_level;
                self.transition(command_buffer, src_level..src_level + 1, layer..layer + 1, vk::ImageLayout::TRANSFER_SRC_OPTIMAL, None);
                self.transition(command_buffer, dst_level..dst_level + 1, layer..layer + 1, vk::ImageLayout::TRANSFER_DST_OPTIMAL, None);
                let mut blit = *blit;
                blit.src_subresource.base_array_layer = layer;
                blit.dst_subresource.base_array_layer = layer;
                device.cmd_blit_image(
                    command_buffer.handle(),
                    self.image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    self.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[blit],
                    vk::Filter::LINEAR,
                );
            }
        }
    }
}

impl gpu::Texture<VkBackend> for VkTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    fn set_name(&self, name: &str) {
        let device = self.shared.device();
        device.set_object_name(self.image, name);
        device.set_object_name(self.view, name);
    }

    fn upload(&self, data: &[u8], region: &TextureRegion) -> GraphicsResult<()> {
        let (copy, size) = region_copy(&self.info, region)?;
        if (data.len() as u64) < size {
            return Err(GraphicsError::InvalidUsage(format!("Texture upload needs {} bytes, got {}", size, data.len())));
        }
        let staging = VkBuffer::new(&self.shared, size, BufferUsage::TRANSFER_SRC)?;
        staging.upload(&data[..size as usize], 0)?;

        let layers = copy.image_subresource.base_array_layer..copy.image_subresource.base_array_layer + copy.image_subresource.layer_count;
        self.shared.run_transfer(|command_buffer| unsafe {
            self.transition(command_buffer, 0..1, layers.clone(), vk::ImageLayout::TRANSFER_DST_OPTIMAL, None);
            self.shared.device().cmd_copy_buffer_to_image(
                command_buffer.handle(),
                staging.handle(),
                self.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[copy],
            );
            if self.mip_levels > 1 {
                self.record_mipmaps(command_buffer);
            }
            self.transition(command_buffer, self.all_levels(), layers, resting_layout(self.info.usage), None);
            Ok(())
        })
    }

    fn download(&self, size: u64, region: &TextureRegion) -> GraphicsResult<Vec<u8>> {
        let (copy, region_size) = region_copy(&self.info, region)?;
        if size > region_size {
            return Err(GraphicsError::InvalidUsage(format!("Requested {} bytes from a region of {} bytes", size, region_size)));
        }
        let staging = VkBuffer::new(&self.shared, region_size, BufferUsage::TRANSFER_DST)?;

        let layers = copy.image_subresource.base_array_layer..copy.image_subresource.base_array_layer + copy.image_subresource.layer_count;
        self.shared.run_transfer(|command_buffer| unsafe {
            self.transition(command_buffer, 0..1, layers.clone(), vk::ImageLayout::TRANSFER_SRC_OPTIMAL, None);
            self.shared.device().cmd_copy_image_to_buffer(
                command_buffer.handle(),
                self.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                staging.handle(),
                &[copy],
            );
            self.transition(command_buffer, 0..1, layers, resting_layout(self.info.usage), None);
            Ok(())
        })?;
        staging.download(size, 0)
    }

    unsafe fn change_layout(&self, command_buffer: &mut VkCommandBuffer, layout: ImageLayout) {
        self.transition_all(command_buffer, image_layout_to_vk(layout), None);
    }

    unsafe fn generate_mipmaps(&self, command_buffer: &mut VkCommandBuffer) {
        if self.mip_levels <= 1 {
            return;
        }
        self.record_mipmaps(command_buffer);
        self.transition(command_buffer, self.all_levels(), self.all_layers(), resting_layout(self.info.usage), None);
    }
}

impl Drop for VkTexture {
    fn drop(&mut self) {
        let device = self.shared.device();
        unsafe {
            device.destroy_sampler(self.sampler, None);
            device.destroy_image_view(self.view, None);
            device.destroy_image(self.image, None);
        }
    }
}

impl Hash for VkTexture {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.image.hash(state);
    }
}

impl PartialEq for VkTexture {
    fn eq(&self, other: &Self) -> bool {
        self.image == other.image
    }
}

impl Eq for VkTexture {}

#[cfg(test)]
mod tests {
    use crossgfx_core::gpu::Format;

    use super::*;

    #[test]
    fn mip_chain_halves_down_to_one() {
        let blits = mip_blits(8, 2, 4);
        assert_eq!(blits.len(), 3);
        assert_eq!((blits[0].src_offsets[1].x, blits[0].src_offsets[1].y), (8, 2));
        assert_eq!((blits[0].dst_offsets[1].x, blits[0].dst_offsets[1].y), (4, 1));
        assert_eq!((blits[2].dst_offsets[1].x, blits[2].dst_offsets[1].y), (1, 1));
        assert_eq!(blits[2].dst_subresource.mip_level, 3);
        assert!(mip_blits(8, 8, 1).is_empty());
    }

    #[test]
    fn region_copy_size_and_pitch() {
        let info = TextureInfo {
            width: 16,
            height: 8,
            ..Default::default()
        };
        let (copy, size) = region_copy(&info, &TextureRegion::default()).unwrap();
        assert_eq!(size, 16 * 8 * 4);
        assert_eq!(copy.buffer_row_length, 0);
        assert_eq!((copy.image_extent.width, copy.image_extent.height, copy.image_extent.depth), (16, 8, 1));

        let region = TextureRegion {
            x: 4,
            y: 2,
            width: Some(4),
            height: Some(2),
            data_pitch: Some(8),
            ..Default::default()
        };
        let (copy, size) = region_copy(&info, &region).unwrap();
        assert_eq!(size, 8 * 2 * 4);
        assert_eq!(copy.buffer_row_length, 8);
        assert_eq!((copy.image_offset.x, copy.image_offset.y, copy.image_offset.z), (4, 2, 0));
    }

    #[test]
    fn region_copy_rejects_out_of_bounds() {
        let info = TextureInfo {
            width: 4,
            height: 4,
            ..Default::default()
        };
        let region = TextureRegion {
            x: 2,
            width: Some(4),
            ..Default::default()
        };
        assert!(region_copy(&info, &region).is_err());
        let pitch = TextureRegion {
            data_pitch: Some(2),
            ..Default::default()
        };
        assert!(region_copy(&info, &pitch).is_err());
    }

    #[test]
    fn array_layer_from_z() {
        let info = TextureInfo {
            width: 4,
            height: 4,
            array_layers: 6,
            texture_type: TextureType::TextureCube,
            ..Default::default()
        };
        let region = TextureRegion {
            z: 2,
            array_layers: Some(1),
            ..Default::default()
        };
        let (copy, _) = region_copy(&info, &region).unwrap();
        assert_eq!(copy.image_subresource.base_array_layer, 2);
        assert_eq!(copy.image_offset.z, 0);
    }

    #[test]
    fn resting_layouts() {
        assert_eq!(resting_layout(TextureUsage::default()), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(resting_layout(TextureUsage::DEPTH_STENCIL_ATTACHMENT | TextureUsage::SAMPLED), vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        assert_eq!(resting_layout(TextureUsage::STORAGE), vk::ImageLayout::GENERAL);
        assert_eq!(texture_usage_to_vk(TextureUsage::default()), vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST);
        assert_eq!(texture_type_to_vk(TextureType::TextureCube).2, vk::ImageCreateFlags::CUBE_COMPATIBLE);
        assert_eq!(aspect_mask(Format::D24S8), vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL);
    }
}
