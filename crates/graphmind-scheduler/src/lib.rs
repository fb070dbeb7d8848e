//! Typed task scheduler, two-pool admission control and resource-aware
//! executor selection (component C8).

pub mod pool;
pub mod resource_monitor;
pub mod scheduler;

pub mod prelude {
    pub use crate::resource_monitor::{LoadLevel, ResourceMonitor, ResourceUsage};
    pub use crate::scheduler::Scheduler;
}
