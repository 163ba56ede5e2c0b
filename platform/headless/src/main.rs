extern crate crossgfx_core;
extern crate crossgfx_vulkan;

use crossgfx_core::gpu::{
  CommandBuffer as _,
  ContextConfig,
  DrawOp,
  FilterOp,
  GraphicsContext as _,
  GraphicsResult,
  Texture as _,
  TextureRegion
};
use crossgfx_vulkan::{VkBackend, VkCommandBuffer, VkGraphicsContext};
use simple_logger::SimpleLogger;

const OUTPUT_WIDTH: u32 = 64;
const OUTPUT_HEIGHT: u32 = 64;

/// Draws nothing, the render pass clears the output.
struct ClearOp;

impl DrawOp<VkBackend> for ClearOp {
  unsafe fn draw(&self, _command_buffer: &mut VkCommandBuffer, _context: &VkGraphicsContext) {}
}

fn load_config() -> GraphicsResult<ContextConfig> {
  match std::env::args().nth(1) {
    Some(path) => ContextConfig::load(path),
    None => Ok(ContextConfig::default())
  }
}

fn run(config: &ContextConfig) -> GraphicsResult<()> {
  let context = VkGraphicsContext::new(config)?;
  let filter = FilterOp::<VkBackend>::new(&context, OUTPUT_WIDTH, OUTPUT_HEIGHT)?;

  {
    let mut command_buffer = context.draw_command_buffer();
    unsafe {
      command_buffer.begin()?;
      command_buffer.begin_profile();
      filter.apply(&mut *command_buffer, &context, &ClearOp);
      command_buffer.end_profile();
      command_buffer.end()?;
    }
    context.submit(&*command_buffer)?;
    context.wait_idle()?;
    match command_buffer.profile_elapsed() {
      Ok(elapsed) => log::info!("Filter took {:?} on the GPU", elapsed),
      Err(e) => log::warn!("Failed to read timestamps: {}", e)
    }
  }

  let first_pixel = filter.output().download(4, &TextureRegion {
    width: Some(1),
    height: Some(1),
    ..Default::default()
  })?;
  log::info!("First pixel: {:?}", first_pixel);
  log::debug!("Cached render passes: {}", context.cached_render_pass_count());
  Ok(())
}

fn main() {
  let config = match load_config() {
    Ok(config) => config,
    Err(e) => {
      eprintln!("Failed to load config: {}", e);
      std::process::exit(1);
    }
  };
  let level = config.log_level_filter().unwrap_or(log::LevelFilter::Info);
  if let Err(e) = SimpleLogger::new().with_level(level).init() {
    eprintln!("Failed to initialize logging: {}", e);
  }

  if let Err(e) = run(&config) {
    log::error!("{}", e);
    std::process::exit(1);
  }
}
