//! XML 编解码器
//!
//! 整棵表包在一个根元素（默认 `config`）下：嵌套表写成嵌套元素，
//! 叶子值按文本形式写成元素内容。解码时原始类型信息丢失：
//! 有子元素的元素还原为表，其余元素还原为原样的字符串，自闭合元素还原为 `Null`。
//!
//! 键必须是合法的 XML 元素名，否则编码失败。

use crate::data::codecs::{read_text, Codec};
use crate::data::{DataError, Format, Result, Table, Value};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{Read, Write};

/// 默认根元素名称
pub const ROOT_ELEMENT: &str = "config";

#[derive(Debug, Clone)]
pub struct XmlCodec {
    root: String,
}

impl XmlCodec {
    pub fn with_root(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }
}

impl Default for XmlCodec {
    fn default() -> Self {
        Self::with_root(ROOT_ELEMENT)
    }
}

impl Codec for XmlCodec {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<Table> {
        let content = read_text(reader)?;
        parse_document(&content)
    }

    fn encode(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        // 先完整生成文档，键名非法时不写出任何内容
        let mut buffer = Vec::new();
        let mut xml = Writer::new_with_indent(&mut buffer, b' ', 2);
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        write_element(&mut xml, &self.root, table)?;
        buffer.push(b'\n');

        writer.write_all(&buffer)?;
        writer.flush()?;
        Ok(())
    }
}

fn xml_error(e: impl std::fmt::Display) -> DataError {
    DataError::Xml(e.to_string())
}

/// 元素名校验：字母或下划线开头，其余为字母、数字、`-`、`_`、`.`
fn check_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DataError::Xml(format!("无效的元素名: '{}'", name)))
    }
}

fn write_element<W: Write>(xml: &mut Writer<W>, tag: &str, table: &Table) -> Result<()> {
    check_name(tag)?;
    if table.is_empty() {
        xml.write_event(Event::Empty(BytesStart::new(tag)))
            .map_err(xml_error)?;
        return Ok(());
    }

    xml.write_event(Event::Start(BytesStart::new(tag)))
        .map_err(xml_error)?;
    for (key, value) in table {
        match value {
            Value::Table(child) => write_element(xml, key, child)?,
            Value::Null => {
                check_name(key)?;
                xml.write_event(Event::Empty(BytesStart::new(key.as_str())))
                    .map_err(xml_error)?;
            }
            leaf => {
                check_name(key)?;
                xml.write_event(Event::Start(BytesStart::new(key.as_str())))
                    .map_err(xml_error)?;
                // 文本事件紧跟开始标签，结束标签前不会插入缩进
                let text = leaf.to_string();
                xml.write_event(Event::Text(BytesText::new(&text)))
                    .map_err(xml_error)?;
                xml.write_event(Event::End(BytesEnd::new(key.as_str())))
                    .map_err(xml_error)?;
            }
        }
    }
    xml.write_event(Event::End(BytesEnd::new(tag)))
        .map_err(xml_error)?;
    Ok(())
}

/// 解析中的元素
struct Frame {
    tag: String,
    children: Table,
    text: String,
}

impl Frame {
    fn new(tag: String) -> Self {
        Self {
            tag,
            children: Table::new(),
            text: String::new(),
        }
    }

    /// 有子元素时其中的文本只是缩进，直接丢弃
    fn into_value(self) -> Value {
        if self.children.is_empty() {
            Value::String(self.text)
        } else {
            Value::Table(self.children)
        }
    }
}

fn parse_document(content: &str) -> Result<Table> {
    // 不裁剪空白，叶子文本按原样保留
    let mut reader = Reader::from_str(content);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Table> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(Frame::new(tag));
            }
            Event::Empty(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                match stack.last_mut() {
                    Some(parent) => {
                        parent.children.insert(tag, Value::Null);
                    }
                    None => root = Some(Table::new()),
                }
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| DataError::Xml("多余的结束标签".into()))?;
                match stack.last_mut() {
                    Some(parent) => {
                        let tag = frame.tag.clone();
                        parent.children.insert(tag, frame.into_value());
                    }
                    // 根元素本身总是表
                    None => root = Some(frame.children),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DataError::Xml("文档在元素闭合前结束".into()));
    }
    root.ok_or_else(|| DataError::Xml("缺少根元素".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_layout() {
        let table = Value::from(json!({"server": {"port": 8080}, "name": "a&b"}))
            .into_table()
            .unwrap();
        let mut out = Vec::new();
        XmlCodec::default().encode(&table, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("<config>"));
        assert!(text.contains("<port>8080</port>"));
        assert!(text.contains("<name>a&amp;b</name>"));
    }

    #[test]
    fn test_decode_nested_and_text() {
        let input = r#"<?xml version="1.0"?>
<config>
  <server>
    <host>localhost</host>
    <port>8080</port>
  </server>
  <empty/>
  <blank></blank>
</config>"#;
        let table = XmlCodec::default().decode(&mut input.as_bytes()).unwrap();
        assert_eq!(
            Value::Table(table),
            Value::from(json!({
                "server": {"host": "localhost", "port": "8080"},
                "empty": null,
                "blank": ""
            }))
        );
    }

    #[test]
    fn test_null_round_trip() {
        let table = Value::from(json!({"a": null})).into_table().unwrap();
        let codec = XmlCodec::default();
        let mut out = Vec::new();
        codec.encode(&table, &mut out).unwrap();
        let decoded = codec.decode(&mut out.as_slice()).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_string_whitespace_round_trip() {
        let table = Value::from(json!({
            "greeting": "  hello world  ",
            "pad": " ",
            "blank": "",
            "nested": {"line": "\tindented\n"},
            "none": null
        }))
        .into_table()
        .unwrap();
        let codec = XmlCodec::default();
        let mut out = Vec::new();
        codec.encode(&table, &mut out).unwrap();

        let decoded = codec.decode(&mut out.as_slice()).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_encode_rejects_invalid_element_names() {
        let codec = XmlCodec::default();
        for key in ["a b", "1st", "", "a<b", "x:y"] {
            let mut table = Table::new();
            table.insert(key.to_string(), Value::from(1));
            let mut out = Vec::new();
            let err = codec.encode(&table, &mut out).unwrap_err();
            assert!(matches!(err, DataError::Xml(_)), "键 {key:?} 应被拒绝");
            assert!(out.is_empty());
        }

        let nested = Value::from(json!({"ok": {"bad key": null}})).into_table().unwrap();
        assert!(codec.encode(&nested, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_encode_accepts_common_names() {
        let table = Value::from(json!({"_private": 1, "log-level": "debug", "v1.2": true, "名称": "x"}))
            .into_table()
            .unwrap();
        let codec = XmlCodec::default();
        let mut out = Vec::new();
        codec.encode(&table, &mut out).unwrap();
        let decoded = codec.decode(&mut out.as_slice()).unwrap();
        assert_eq!(decoded["log-level"], Value::from("debug"));
        assert_eq!(decoded["名称"], Value::from("x"));
    }

    #[test]
    fn test_decode_rejects_unclosed_document() {
        let err = XmlCodec::default()
            .decode(&mut "<config><a>1</a>".as_bytes())
            .unwrap_err();
        assert!(matches!(err, DataError::Xml(_)));
    }

    #[test]
    fn test_decode_empty_root() {
        let table = XmlCodec::default()
            .decode(&mut "<config/>".as_bytes())
            .unwrap();
        assert!(table.is_empty());
    }
}
