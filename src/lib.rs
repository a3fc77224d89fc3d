// lib.rs - 层级配置存储库入口

pub mod core; // 日志等基础设施
pub mod data; // 配置数据模型、编解码与管理器

// 重新导出常用类型
pub use crate::data::codecs::{IniCodec, JsonCodec, TomlCodec, XmlCodec, YamlCodec};
pub use crate::data::{
    Codec, CodecRegistry, ConfigManager, ConfigOptions, DataError, Entry, Format, Node, NodeMut,
    Result, Table, Traversal, Value,
};

pub use crate::core::{init_logger, update_log_level, LogConfig, LogFormat, LogLevel, LogOutput};
