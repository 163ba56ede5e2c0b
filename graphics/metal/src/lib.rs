pub use self::{
    argument_table::*,
    depth_stencil::*,
};
#[cfg(target_vendor = "apple")]
pub use self::translate::*;

mod argument_table;
mod depth_stencil;
#[cfg(target_vendor = "apple")]
mod translate;
