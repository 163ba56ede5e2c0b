extern crate ash;
extern crate crossgfx_core;
extern crate parking_lot;
extern crate smallvec;

pub use self::adapter::{
    pick_adapter,
    VkAdapter,
};
pub(crate) use self::adapter::select_depth_format;
pub use self::backend::VkBackend;
pub use self::buffer::VkBuffer;
pub use self::command::VkCommandBuffer;
pub use self::context::VkGraphicsContext;
pub(crate) use self::descriptor::*;
pub use self::device::create_device;
pub(crate) use self::error::*;
pub(crate) use self::format::*;
pub use self::heap::VkMemoryHeap;
pub use self::instance::VkInstance;
pub(crate) use self::layout::*;
pub use self::pipeline::{
    VkPipeline,
    VkPipelineLayout,
    VkShaderModule,
};
pub(crate) use self::query::ProfileState;
pub use self::query::VkQueryPool;
pub use self::queue::VkQueue;
pub(crate) use self::raw::*;
pub use self::renderpass::{
    VkFrameBuffer,
    VkRenderPass,
};
pub use self::shared::VkShared;
pub(crate) use self::shared::VkPipelineLayoutKey;
pub use self::sync::VkFence;
pub use self::texture::VkTexture;

mod adapter;
mod backend;
mod buffer;
mod command;
mod context;
mod descriptor;
mod device;
mod error;
mod format;
mod heap;
mod instance;
mod layout;
mod pipeline;
mod query;
mod queue;
mod raw;
mod renderpass;
mod shared;
mod sync;
mod texture;
