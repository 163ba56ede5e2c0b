pub use self::backend::*;
pub use self::binding::*;
pub use self::blend::*;
pub use self::buffer::*;
pub use self::cache::*;
pub use self::command::*;
pub use self::config::*;
pub use self::context::*;
pub use self::error::*;
pub use self::format::*;
pub use self::framebuffer::*;
pub use self::ops::*;
pub use self::pipeline::*;
pub use self::queue::*;
pub use self::renderpass::*;
pub use self::shader_metadata::*;
pub use self::sync::*;
pub use self::texture::*;

mod backend;
mod binding;
mod blend;
mod buffer;
mod cache;
mod command;
mod config;
mod context;
mod error;
mod format;
mod framebuffer;
mod ops;
mod pipeline;
mod queue;
mod renderpass;
mod shader_metadata;
mod sync;
mod texture;
