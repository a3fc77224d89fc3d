//! 配置格式编解码器
//!
//! 每种格式实现 `Codec` trait：
//! - `json`: JSON（serde_json，格式化输出）
//! - `toml`: TOML（toml，丢弃 null）
//! - `yaml`: YAML（serde_yaml，保留非 ASCII 文本）
//! - `ini`: INI（rust-ini，一层节 + 默认节包装）
//! - `xml`: XML（quick-xml，叶子值一律为文本）
//!
//! `CodecRegistry` 在管理器初始化时构造并注入，不使用全局注册表。

pub mod ini;
pub mod json;
pub mod toml;
pub mod xml;
pub mod yaml;

pub use self::ini::IniCodec;
pub use self::json::JsonCodec;
pub use self::toml::TomlCodec;
pub use self::xml::XmlCodec;
pub use self::yaml::YamlCodec;

use crate::data::{DataError, Format, Result, Table};
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

/// 格式编解码能力：流 → 表，表 → 流
pub trait Codec: Send + Sync {
    /// 本编解码器负责的格式
    fn format(&self) -> Format;

    /// 从输入流解码出顶层表
    fn decode(&self, reader: &mut dyn Read) -> Result<Table>;

    /// 将顶层表编码写入输出流
    fn encode(&self, table: &Table, writer: &mut dyn Write) -> Result<()>;
}

/// 格式到编解码器的映射
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: HashMap<Format, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// 不含任何编解码器的空注册表
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// 注册全部五种内置格式
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(JsonCodec);
        registry.register(TomlCodec);
        registry.register(YamlCodec);
        registry.register(IniCodec::default());
        registry.register(XmlCodec::default());
        registry
    }

    /// 注册（或替换）某个格式的编解码器
    pub fn register(&mut self, codec: impl Codec + 'static) -> &mut Self {
        self.codecs.insert(codec.format(), Arc::new(codec));
        self
    }

    /// 获取格式对应的编解码器
    pub fn get(&self, format: Format) -> Result<Arc<dyn Codec>> {
        self.codecs
            .get(&format)
            .cloned()
            .ok_or_else(|| DataError::UnsupportedFormat(format.to_string()))
    }

    pub fn contains(&self, format: Format) -> bool {
        self.codecs.contains_key(&format)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.codecs.keys().map(|format| format.as_str()).collect();
        formats.sort_unstable();
        f.debug_struct("CodecRegistry")
            .field("formats", &formats)
            .finish()
    }
}

/// 将整个输入流读成字符串（文本格式共用）
pub(crate) fn read_text(reader: &mut dyn Read) -> Result<String> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use serde_json::json;

    fn sample_table() -> Table {
        Value::from(json!({
            "name": "演示",
            "port": 8080,
            "ratio": 0.75,
            "debug": false,
            "tags": ["a", "b", 3],
            "server": {
                "host": "127.0.0.1",
                "limits": {"max": 10}
            }
        }))
        .into_table()
        .unwrap()
    }

    fn round_trip(format: Format, table: &Table) -> Table {
        let codec = CodecRegistry::standard().get(format).unwrap();
        let mut buffer = Vec::new();
        codec.encode(table, &mut buffer).unwrap();
        codec.decode(&mut buffer.as_slice()).unwrap()
    }

    #[test]
    fn test_standard_registry_has_all_formats() {
        let registry = CodecRegistry::standard();
        for format in Format::ALL {
            assert!(registry.contains(format));
            assert_eq!(registry.get(format).unwrap().format(), format);
        }
    }

    #[test]
    fn test_empty_registry_rejects_lookup() {
        let registry = CodecRegistry::empty();
        let err = registry.get(Format::Json).err().unwrap();
        assert!(matches!(err, DataError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_typed_formats_round_trip() {
        let table = sample_table();
        for format in [Format::Json, Format::Toml, Format::Yaml] {
            assert_eq!(round_trip(format, &table), table, "{format} 往返应保持一致");
        }
    }

    #[test]
    fn test_xml_round_trip_stringifies_leaves() {
        let table = Value::from(json!({"server": {"port": 8080, "debug": true}, "name": "x"}))
            .into_table()
            .unwrap();
        let decoded = round_trip(Format::Xml, &table);
        assert_eq!(
            Value::Table(decoded),
            Value::from(json!({"server": {"port": "8080", "debug": "true"}, "name": "x"}))
        );
    }
}
