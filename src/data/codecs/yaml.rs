//! YAML 编解码器
//!
//! 空文档（或只有 `null` 的文档）解码为空表；非 ASCII 文本原样写出，不做转义。

use crate::data::codecs::{read_text, Codec};
use crate::data::{Format, Result, Table};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn format(&self) -> Format {
        Format::Yaml
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<Table> {
        let content = read_text(reader)?;
        if content.trim().is_empty() {
            return Ok(Table::new());
        }
        let table: Option<Table> = serde_yaml::from_str(&content)?;
        Ok(table.unwrap_or_default())
    }

    fn encode(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        serde_yaml::to_writer(&mut *writer, table)?;
        writer.flush()?;
        Ok(())
    }
}
