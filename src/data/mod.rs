//! 层级配置存储
//!
//! 把嵌套键值结构映射到 JSON/TOML/YAML/INI/XML 文件，提供点路径读写、自动保存和脏状态跟踪。
//!
//! # 模块组织
//!
//! - `error`: 统一错误类型定义
//! - `value`: 配置值数据模型（`Value` / `Table`）
//! - `format`: 支持的格式与扩展名处理
//! - `codecs`: 各格式编解码器与注册表
//! - `node`: 配置树节点视图与路径遍历
//! - `manager`: 统一入口 `ConfigManager`
//!
//! # 使用示例
//!
//! ```rust
//! use diconfig::{ConfigManager, ConfigOptions};
//!
//! let mut cfg = ConfigManager::new(ConfigOptions::new("config").with_format("toml"))?;
//! cfg.write("database.url", "postgres://localhost", false)?;
//! let url = cfg.read("database.url", "");
//! ```

pub mod codecs;
pub mod error;
pub mod format;
pub mod manager;
pub mod node;
pub mod value;


pub use codecs::{Codec, CodecRegistry};
pub use error::{DataError, Result};
pub use format::Format;
pub use manager::{ConfigManager, ConfigOptions};
pub use node::{Entry, Node, NodeMut, Traversal};
pub use value::{Table, Value};
