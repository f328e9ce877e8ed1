pub mod config;
pub mod error;
pub mod library;
pub mod paths;
pub mod size;

pub use config::*;
pub use error::ConfigError;
pub use library::*;
pub use paths::{container_base_path, PathManager};
pub use size::{format_bytes, parse_days, parse_size, ByteSize, DayCount};
