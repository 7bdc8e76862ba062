pub mod aggregate;
pub mod event;
pub mod reconstruct;

pub use aggregate::{aggregate, first_ready_for_review, ReviewMetrics};
pub use event::{assign_seq, EventKind, PrEvent};
pub use reconstruct::{reconstruct, Interval, Seed, Timeline};
