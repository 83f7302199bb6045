pub mod api;
pub mod config;
pub mod core;
pub mod fixtures;
pub mod logger;
pub mod services;
pub mod utils;
