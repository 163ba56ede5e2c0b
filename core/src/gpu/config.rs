use std::path::Path;

use serde::{Deserialize, Serialize};

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorPoolConfig {
  pub uniform_buffers: u32,
  pub combined_image_samplers: u32,
  pub storage_images: u32,
  pub storage_buffers: u32,
  pub max_sets: u32
}

impl Default for DescriptorPoolConfig {
  fn default() -> Self {
    Self {
      uniform_buffers: 1024,
      combined_image_samplers: 1024,
      storage_images: 1024,
      storage_buffers: 1024,
      max_sets: 4096
    }
  }
}

impl DescriptorPoolConfig {
  pub fn count(&self, descriptor_type: DescriptorType) -> u32 {
    match descriptor_type {
      DescriptorType::UniformBuffer => self.uniform_buffers,
      DescriptorType::StorageBuffer => self.storage_buffers,
      DescriptorType::CombinedImageSampler => self.combined_image_samplers,
      DescriptorType::StorageImage => self.storage_images,
      DescriptorType::SampledImage | DescriptorType::Sampler => 0
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
  pub app_name: String,
  pub enable_depth_stencil: bool,
  pub debug: bool,
  pub clear_color: [f32; 4],
  /// Preference order, the first format the adapter supports as a depth attachment wins.
  pub depth_formats: Vec<Format>,
  pub num_samples: u32,
  pub descriptor_pool: DescriptorPoolConfig,
  pub log_level: String
}

impl Default for ContextConfig {
  fn default() -> Self {
    Self {
      app_name: "crossgfx".to_string(),
      enable_depth_stencil: false,
      debug: false,
      clear_color: [0f32; 4],
      depth_formats: vec![Format::D24S8, Format::D32S8, Format::D16],
      num_samples: 1,
      descriptor_pool: DescriptorPoolConfig::default(),
      log_level: "info".to_string()
    }
  }
}

impl ContextConfig {
  pub fn from_toml_str(text: &str) -> GraphicsResult<Self> {
    let config: ContextConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
  }

  pub fn load<P: AsRef<Path>>(path: P) -> GraphicsResult<Self> {
    let text = std::fs::read_to_string(path)?;
    Self::from_toml_str(&text)
  }

  pub fn log_level_filter(&self) -> GraphicsResult<log::LevelFilter> {
    self.log_level.parse::<log::LevelFilter>()
      .map_err(|_| GraphicsError::Config(format!("Unknown log level: {}", self.log_level)))
  }

  pub fn validate(&self) -> GraphicsResult<()> {
    if !self.num_samples.is_power_of_two() || self.num_samples > 64 {
      return Err(GraphicsError::Config(format!("Invalid sample count: {}", self.num_samples)));
    }
    if let Some(format) = self.depth_formats.iter().find(|f| !f.is_depth()) {
      return Err(GraphicsError::Config(format!("{:?} is not a depth format", format)));
    }
    self.log_level_filter()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_toml_gives_defaults() {
    let config = ContextConfig::from_toml_str("").unwrap();
    assert_eq!(config, ContextConfig::default());
    assert_eq!(config.descriptor_pool.count(DescriptorType::StorageImage), 1024);
    assert_eq!(config.descriptor_pool.max_sets, 4096);
    assert_eq!(config.log_level_filter().unwrap(), log::LevelFilter::Info);
  }

  #[test]
  fn partial_toml() {
    let config = ContextConfig::from_toml_str(r#"
app_name = "filter"
enable_depth_stencil = true
clear_color = [0.25, 0.5, 0.75, 1.0]
depth_formats = ["D32", "D16"]
log_level = "debug"

[descriptor_pool]
uniform_buffers = 16
"#).unwrap();
    assert_eq!(config.app_name, "filter");
    assert!(config.enable_depth_stencil);
    assert_eq!(config.clear_color, [0.25, 0.5, 0.75, 1.0]);
    assert_eq!(config.depth_formats, vec![Format::D32, Format::D16]);
    assert_eq!(config.descriptor_pool.uniform_buffers, 16);
    assert_eq!(config.descriptor_pool.storage_buffers, 1024);
    assert_eq!(config.num_samples, 1);
  }

  #[test]
  fn invalid_configs() {
    assert!(matches!(ContextConfig::from_toml_str("num_samples = 3"), Err(GraphicsError::Config(_))));
    assert!(matches!(ContextConfig::from_toml_str("depth_formats = [\"RGBA8UNorm\"]"), Err(GraphicsError::Config(_))));
    assert!(matches!(ContextConfig::from_toml_str("log_level = \"loud\""), Err(GraphicsError::Config(_))));
    assert!(matches!(ContextConfig::from_toml_str("debug = 3"), Err(GraphicsError::Config(_))));
  }

  #[test]
  fn load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crossgfx.toml");
    std::fs::write(&path, "app_name = \"headless\"\nnum_samples = 4\n").unwrap();
    let config = ContextConfig::load(&path).unwrap();
    assert_eq!(config.app_name, "headless");
    assert_eq!(config.num_samples, 4);
    assert_eq!(config.depth_formats, ContextConfig::default().depth_formats);

    std::fs::write(&path, "num_samples = 5\n").unwrap();
    assert!(matches!(ContextConfig::load(&path), Err(GraphicsError::Config(_))));
  }

  #[test]
  fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(ContextConfig::load(dir.path().join("missing.toml")), Err(GraphicsError::Io(_))));
  }
}
