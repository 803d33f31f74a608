//! Core of the planner: events grouped under classes, stored in plain text
//! files, with elapsed events swept into a past-events archive.
//!
//! - `event`: the `Event` entity and its one-line record codec
//! - `store` / `registry`: the upcoming/archive event stores and the class list
//! - `lifecycle`: partitioning by time and the archive sweep
//! - `notify`: change callbacks and a broadcast channel for presentation layers
//! - `planner`: the `Planner` context tying it all together

pub mod config;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod notify;
pub mod planner;
pub mod registry;
pub mod storage;
pub mod store;

pub use config::PlannerConfig;
pub use error::{PlannerError, PlannerResult};
pub use event::{Event, EventIdentity};
pub use lifecycle::{Partition, SweepReport};
pub use notify::Change;
pub use planner::Planner;
