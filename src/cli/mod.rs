//! `s3up` command line interface

mod config;
pub use self::config::{Config, Host};

pub mod commands;
pub mod globals;
pub mod progressbar;
pub mod upload;

mod start;
pub use self::start::{get_config_path, start};
