pub mod formatter;

pub use formatter::{
    format_age, format_dashboard, format_timeline, format_tsv, should_use_colors,
};
