pub mod classify;
pub mod ctx;
pub mod offers;
pub mod policies;
pub mod switch;
pub mod window;

#[cfg(test)]
pub(crate) mod tests_common;

pub use ctx::SchedCtx;
pub use policies::SchedPolicy;
pub use window::{SchedWindow, WindowSizer};
