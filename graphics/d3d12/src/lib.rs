pub use self::input::*;
pub use self::root_signature::*;
pub use self::state::*;
#[cfg(windows)]
pub use self::translate::*;

mod input;
mod root_signature;
mod state;
#[cfg(windows)]
mod translate;
