//! # GridWatch Scheduler
//!
//! The polling core: status cache, diff engine, subscriber registry,
//! notification dispatch and the periodic loop that ties them together.
//!
//! ## Architecture
//! ```text
//! Scheduler (tokio sleep + watch shutdown)
//!   └── Monitor::poll_all (join_all over enabled platforms)
//!         ├── PlatformAdapter::fetch   (bounded by adapter timeout)
//!         ├── gridwatch_platforms::parse
//!         ├── StatusCache::put         → previous status
//!         ├── diff(previous, current)  → Vec<Event>
//!         ├── EventHistory::record
//!         └── Dispatcher::dispatch     → ChatTransport per enabled subscriber
//! ```
//! Chat commands reuse `Monitor::refresh` for on-demand queries, so events
//! detected there are dispatched too.

pub mod cache;
pub mod diff;
pub mod dispatch;
pub mod engine;
pub mod monitor;
pub mod notify;
pub mod subscribers;

pub use cache::{CachePut, StatusCache};
pub use diff::diff;
pub use dispatch::{DispatchFailure, DispatchReport, Dispatcher};
pub use engine::{run_scheduler, seed_cache, spawn_scheduler};
pub use monitor::{Monitor, PollOutcome};
pub use notify::EventHistory;
pub use subscribers::{SubscriberRegistry, SubscriberStore};
