pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod sync;
pub mod types;
pub mod view;
