//! Girder dispatch engine.
//!
//! Maps message ids to three-stage routers and schedules handler
//! execution: either inline (one task per message) or through a fixed
//! worker pool that preserves per-connection order by sharding requests
//! on connection id.

pub mod dispatch;
pub mod router;
mod worker;

pub use dispatch::{DispatchMode, Dispatcher, RouteTable};
pub use router::{Router, StageResult};
