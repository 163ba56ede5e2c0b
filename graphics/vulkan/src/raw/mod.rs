mod device;
mod instance;

pub use crate::raw::device::RawVkDevice;
pub use crate::raw::instance::{
    RawVkDebugMessenger,
    RawVkInstance,
};
