pub mod groups;

pub use groups::{group, ClassifiedPr, Dashboard, Thresholds};
