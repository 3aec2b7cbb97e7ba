//! Controller side of the control plane.

mod broadcast;
mod controller;
pub mod dispatch;
mod media;

pub use broadcast::Broadcaster;
pub use controller::Controller;
pub use dispatch::{DispatchTable, MethodHandler};
pub use media::{CallContext, MediaServer};
