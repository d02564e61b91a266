pub mod logging;
pub mod paths;

pub use logging::{parse_level, FileLogger};
pub use paths::{config_dir, data_dir, isle_config_dir, isle_data_dir, isle_log_dir};
