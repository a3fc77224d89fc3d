//! INI 编解码器
//!
//! INI 只有一层节，解码结果总是“表的表”，所有值都是字符串。
//! 编码时如果顶层不全是表，会把整个顶层包装进默认节再写出。

use crate::data::codecs::{read_text, Codec};
use crate::data::{DataError, Format, Result, Table, Value};
use ::ini::Ini;
use std::io::{Read, Write};

/// 默认节名称
pub const DEFAULT_SECTION: &str = "默认";

#[derive(Debug, Clone)]
pub struct IniCodec {
    default_section: String,
}

impl IniCodec {
    /// 使用自定义默认节名称
    pub fn with_default_section(name: impl Into<String>) -> Self {
        Self {
            default_section: name.into(),
        }
    }

    pub fn default_section(&self) -> &str {
        &self.default_section
    }
}

impl Default for IniCodec {
    fn default() -> Self {
        Self::with_default_section(DEFAULT_SECTION)
    }
}

impl Codec for IniCodec {
    fn format(&self) -> Format {
        Format::Ini
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<Table> {
        let content = read_text(reader)?;
        let conf = Ini::load_from_str(&content).map_err(|e| DataError::Ini(e.to_string()))?;

        let mut table = Table::new();
        for (section, properties) in conf.iter() {
            if section.is_none() && properties.iter().next().is_none() {
                continue;
            }
            // 节外的键归入默认节
            let name = section.unwrap_or(&self.default_section);
            let entry = table
                .entry(name.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if let Some(section_table) = entry.as_table_mut() {
                for (key, value) in properties.iter() {
                    section_table.insert(key.to_string(), Value::from(value));
                }
            }
        }
        Ok(table)
    }

    fn encode(&self, table: &Table, mut writer: &mut dyn Write) -> Result<()> {
        let wrapped;
        let sections = if table.values().all(Value::is_table) {
            table
        } else {
            wrapped = Table::from([(
                self.default_section.clone(),
                Value::Table(table.clone()),
            )]);
            &wrapped
        };

        let mut conf = Ini::new();
        for (section, value) in sections {
            let mut setter = conf.with_section(Some(section.as_str()));
            if let Some(section_table) = value.as_table() {
                for (key, leaf) in section_table {
                    setter.set(key.as_str(), leaf.to_string());
                }
            }
        }

        conf.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
