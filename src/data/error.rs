//! 统一错误类型定义
//!
//! 使用 `thiserror` 定义配置存储的所有错误类型，并提供与 `anyhow` 的兼容层。

use std::path::PathBuf;
use thiserror::Error;

/// 配置存储的统一错误类型
#[derive(Error, Debug)]
pub enum DataError {
    /// 文件 I/O 错误
    #[error("文件 I/O 错误: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 编解码流读写错误（不关联具体文件）
    #[error("流读写错误: {0}")]
    Stream(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML 反序列化错误
    #[error("TOML 反序列化错误: {0}")]
    TomlDeserialization(#[from] toml::de::Error),

    /// TOML 序列化错误
    #[error("TOML 序列化错误: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 序列化错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// INI 解析错误
    #[error("INI 解析错误: {0}")]
    Ini(String),

    /// XML 解析/写入错误
    #[error("XML 错误: {0}")]
    Xml(String),

    /// 资源未找到
    #[error("未找到资源: {0}")]
    NotFound(String),

    /// 无效的键路径
    #[error("无效的键路径: {0}")]
    InvalidKey(String),

    /// 路径冲突：中间节点是叶子值而非表
    #[error("键路径冲突: '{0}' 不是表")]
    PathConflict(String),

    /// 不支持的配置格式
    #[error("不支持的配置格式: {0}，支持的格式: json, toml, yaml, ini, xml")]
    UnsupportedFormat(String),
}

/// 便于与现有代码集成的类型别名
pub type Result<T> = std::result::Result<T, DataError>;

/// 便捷的 I/O 错误构造器
impl DataError {
    /// 从 `std::io::Error` 和路径创建 I/O 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
