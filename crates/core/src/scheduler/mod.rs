//! Periodic and on-demand job firing.

mod timer;
mod traits;

pub use timer::TokioScheduler;
pub use traits::*;
