pub mod facts;
pub mod state;

pub use facts::{flag_for_label, normalize, FactFlag, Facts, LABEL_RULES};
pub use state::{classify, LifecycleState};
