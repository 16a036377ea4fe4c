//! Command implementations.

mod export;
mod info;
mod play;
mod validate;

pub use export::run_export;
pub use info::run_info;
pub use play::run_play;
pub use validate::run_validate;
