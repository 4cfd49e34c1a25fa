pub mod auth;
pub mod candidates;
pub mod completions;
pub mod config;
pub mod interview;

mod session;
