//! Two-Tier Cooperative Scheduler
//!
//! Windows do not own threads or tasks. A single [`WindowManager`] task
//! owns all of them and interleaves their turns cooperatively:
//!
//! 1. **Per-window tier**: each [`Window`] drains its runtime's work
//!    queue to quiescence whenever it is serviced, so one window's
//!    update is never left half-propagated.
//!
//! 2. **Global tier**: the manager loop services input-pending windows
//!    before work-pending ones and parks on its event channel when both
//!    lists are empty, yielding to the tokio runtime between windows.
//!
//! The scheduler also carries the lifecycle machinery: a periodic sweep
//! that pings clients, reaps windows whose clients went silent, and
//! evicts disconnected windows under memory pressure, plus the rate
//! limiters that gate message delivery and window creation.

mod limiter;
mod manager;
mod sweeper;
mod window;

pub use limiter::RateLimiter;
pub use manager::{ManagerEvent, ManagerHandle, WindowManager};
pub use window::Window;
