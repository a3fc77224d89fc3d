//! TOML 编解码器
//!
//! TOML 没有 null，编码前会递归丢弃值为 `Null` 的条目（数组中的 `Null` 同样丢弃）。

use crate::data::codecs::{read_text, Codec};
use crate::data::{Format, Result, Table, Value};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl Codec for TomlCodec {
    fn format(&self) -> Format {
        Format::Toml
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<Table> {
        let content = read_text(reader)?;
        Ok(toml::from_str(&content)?)
    }

    fn encode(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        let content = toml::to_string(&without_nulls(table))?;
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

fn without_nulls(table: &Table) -> Table {
    table
        .iter()
        .filter_map(|(key, value)| strip_null(value).map(|value| (key.clone(), value)))
        .collect()
}

fn strip_null(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Table(table) => Some(Value::Table(without_nulls(table))),
        Value::Array(items) => Some(Value::Array(items.iter().filter_map(strip_null).collect())),
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_drops_nulls() {
        let table = Value::from(json!({"a": null, "b": {"c": null, "d": 1}, "e": [1, null]}))
            .into_table()
            .unwrap();
        let mut out = Vec::new();
        TomlCodec.encode(&table, &mut out).unwrap();

        let decoded = TomlCodec.decode(&mut out.as_slice()).unwrap();
        assert_eq!(
            Value::Table(decoded),
            Value::from(json!({"b": {"d": 1}, "e": [1]}))
        );
    }

    #[test]
    fn test_decode_empty_document() {
        let table = TomlCodec.decode(&mut &b""[..]).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_encode_sections() {
        let table = Value::from(json!({"title": "x", "server": {"port": 80}}))
            .into_table()
            .unwrap();
        let mut out = Vec::new();
        TomlCodec.encode(&table, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[server]"));
        assert!(text.contains("port = 80"));
        assert!(text.contains("title = \"x\""));
    }
}
