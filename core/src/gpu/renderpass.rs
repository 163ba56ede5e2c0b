use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadOp {
  Load,
  #[default]
  Clear,
  DontCare
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
  #[default]
  Store,
  DontCare
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AttachmentDescription {
  pub format: Format,
  pub initial_layout: Option<ImageLayout>,
  pub final_layout: Option<ImageLayout>,
  pub load_op: LoadOp,
  pub store_op: StoreOp
}

impl AttachmentDescription {
  pub fn new(format: Format) -> Self {
    Self {
      format,
      ..Default::default()
    }
  }

  pub fn with_layouts(format: Format, initial_layout: ImageLayout, final_layout: ImageLayout) -> Self {
    Self {
      format,
      initial_layout: Some(initial_layout),
      final_layout: Some(final_layout),
      ..Default::default()
    }
  }

  pub fn initial_layout_or_default(&self) -> ImageLayout {
    self.initial_layout.unwrap_or(ImageLayout::Undefined)
  }

  pub fn final_layout_or_default(&self) -> ImageLayout {
    self.final_layout.unwrap_or(if self.format.is_depth() {
      ImageLayout::DepthStencilAttachmentOptimal
    } else {
      ImageLayout::ColorAttachmentOptimal
    })
  }
}

/// Everything that decides render pass compatibility.
/// Two equal configs always resolve to the same backend render pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPassConfig {
  pub color_attachments: Vec<AttachmentDescription>,
  pub depth_stencil_attachment: Option<AttachmentDescription>,
  pub enable_depth_stencil_resolve: bool,
  pub num_samples: u32
}

impl Default for RenderPassConfig {
  fn default() -> Self {
    Self {
      color_attachments: Vec::new(),
      depth_stencil_attachment: None,
      enable_depth_stencil_resolve: false,
      num_samples: 1
    }
  }
}

impl RenderPassConfig {
  pub fn offscreen(color_format: Format, depth_format: Option<Format>, num_samples: u32) -> Self {
    Self {
      color_attachments: vec![AttachmentDescription::new(color_format)],
      depth_stencil_attachment: depth_format.map(AttachmentDescription::new),
      enable_depth_stencil_resolve: false,
      num_samples
    }
  }

  pub fn num_color_attachments(&self) -> u32 {
    self.color_attachments.len() as u32
  }

  pub fn is_multisampled(&self) -> bool {
    self.num_samples > 1
  }

  /// Total attachment count including resolve targets.
  pub fn attachment_count(&self) -> u32 {
    let mut count = self.num_color_attachments();
    if self.is_multisampled() {
      count *= 2;
    }
    if self.depth_stencil_attachment.is_some() {
      count += 1;
      if self.is_multisampled() && self.enable_depth_stencil_resolve {
        count += 1;
      }
    }
    count
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn equality_covers_layouts() {
    let a = RenderPassConfig::offscreen(Format::RGBA8UNorm, Some(Format::D24S8), 1);
    let b = RenderPassConfig::offscreen(Format::RGBA8UNorm, Some(Format::D24S8), 1);
    assert_eq!(a, b);

    let mut c = a.clone();
    c.color_attachments[0].final_layout = Some(ImageLayout::PresentSrc);
    assert_ne!(a, c);

    let mut set = HashSet::new();
    set.insert(a);
    set.insert(b);
    set.insert(c);
    assert_eq!(set.len(), 2);
  }

  #[test]
  fn default_layouts() {
    let color = AttachmentDescription::new(Format::BGRA8UNorm);
    assert_eq!(color.initial_layout_or_default(), ImageLayout::Undefined);
    assert_eq!(color.final_layout_or_default(), ImageLayout::ColorAttachmentOptimal);
    let depth = AttachmentDescription::new(Format::D32);
    assert_eq!(depth.final_layout_or_default(), ImageLayout::DepthStencilAttachmentOptimal);
    assert_eq!(color.load_op, LoadOp::Clear);
    assert_eq!(color.store_op, StoreOp::Store);
  }

  #[test]
  fn attachment_count_with_resolve() {
    let mut config = RenderPassConfig::offscreen(Format::RGBA8UNorm, Some(Format::D16), 1);
    assert_eq!(config.attachment_count(), 2);
    config.num_samples = 4;
    assert_eq!(config.attachment_count(), 3);
    config.enable_depth_stencil_resolve = true;
    assert_eq!(config.attachment_count(), 4);
    config.color_attachments.push(AttachmentDescription::new(Format::R32Float));
    assert_eq!(config.attachment_count(), 6);
  }
}
