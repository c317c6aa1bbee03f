pub mod config;
pub mod configuration;
pub mod logs;
pub mod supervisor;
pub mod utils;
