//! JSON 编解码器
//!
//! 按字节解码（不要求 UTF-8 流边界），编码为两空格缩进的格式化输出。

use crate::data::codecs::Codec;
use crate::data::{Format, Result, Table};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn format(&self) -> Format {
        Format::Json
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<Table> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn encode(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, table)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataError, Value};
    use serde_json::json;

    #[test]
    fn test_encode_pretty() {
        let table = Value::from(json!({"a": {"b": 1}})).into_table().unwrap();
        let mut out = Vec::new();
        JsonCodec.encode(&table, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "{\n  \"a\": {\n    \"b\": 1\n  }\n}");
    }

    #[test]
    fn test_decode_preserves_types() {
        let input = br#"{"i": 1, "f": 1.5, "b": true, "s": "x", "n": null}"#;
        let table = JsonCodec.decode(&mut &input[..]).unwrap();
        assert_eq!(table["i"], Value::Integer(1));
        assert_eq!(table["f"], Value::Float(1.5));
        assert_eq!(table["b"], Value::Bool(true));
        assert_eq!(table["s"], Value::from("x"));
        assert_eq!(table["n"], Value::Null);
    }

    #[test]
    fn test_decode_rejects_non_object_root() {
        let err = JsonCodec.decode(&mut &b"[1, 2]"[..]).unwrap_err();
        assert!(matches!(err, DataError::Json(_)));
    }
}
