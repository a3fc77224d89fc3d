//! 核心基础设施：日志系统初始化与日志配置

pub mod config;
pub mod logger;

pub use config::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use logger::{init_logger, update_log_level};
