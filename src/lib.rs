pub mod classify;
pub mod config;
pub mod dashboard;
pub mod github;
pub mod output;
pub mod timeline;
