pub mod config;
pub mod relay;
pub mod service;

pub use config::Config;
pub use relay::{AppState, build_router, serve};
