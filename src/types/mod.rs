//! Core value types for race tracking.
//!
//! - [`ScheduledEvent`] / [`EventId`] describe a race on the calendar
//! - [`LivenessWindow`] decides whether an event should be ingested right now
//! - [`Snapshot`] / [`CarRecord`] carry one capture of a timing page
//! - [`SessionId`] names a recorded race session
//!
//! All of these are plain values: cloneable, comparable and serializable.

mod event;
mod liveness;
mod series;
mod session;
mod snapshot;

pub use event::{EventId, ScheduledEvent};
pub use liveness::{Liveness, LivenessWindow};
pub use series::Series;
pub use session::SessionId;
pub use snapshot::{CarRecord, Snapshot};
