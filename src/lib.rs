pub mod config;
pub mod detector;
pub mod error;
pub mod logging;
pub mod pose;
pub mod source;
