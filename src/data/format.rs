//! 配置文件格式
//!
//! 支持的格式是固定集合：json、toml、yaml、ini、xml。格式名大小写不敏感，
//! 未知格式在构造或加载时立即返回 `DataError::UnsupportedFormat`。

use crate::data::{DataError, Result};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Toml,
    Yaml,
    Ini,
    Xml,
}

impl Format {
    /// 全部支持的格式
    pub const ALL: [Format; 5] = [
        Format::Json,
        Format::Toml,
        Format::Yaml,
        Format::Ini,
        Format::Xml,
    ];

    /// 格式名（同时作为默认扩展名）
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Toml => "toml",
            Format::Yaml => "yaml",
            Format::Ini => "ini",
            Format::Xml => "xml",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    /// 校验格式名
    ///
    /// # 示例
    ///
    /// ```rust
    /// assert_eq!(Format::parse("YAML")?, Format::Yaml);
    /// assert!(Format::parse("csv").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Self> {
        name.parse()
    }

    /// 若文件名没有扩展名，则追加本格式的扩展名
    ///
    /// 已有任意扩展名时保持不变，扩展名不影响实际使用的格式。
    pub fn ensure_extension(self, file: impl AsRef<Path>) -> PathBuf {
        let file = file.as_ref();
        if file.extension().is_some() {
            return file.to_path_buf();
        }
        let mut name = OsString::from(file.as_os_str());
        name.push(".");
        name.push(self.extension());
        PathBuf::from(name)
    }
}

impl FromStr for Format {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        Format::ALL
            .into_iter()
            .find(|format| format.as_str() == lowered)
            .ok_or_else(|| DataError::UnsupportedFormat(s.to_string()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(Format::parse("json").unwrap(), Format::Json);
        assert_eq!(Format::parse("TOML").unwrap(), Format::Toml);
        assert_eq!(Format::parse("Yaml").unwrap(), Format::Yaml);
        assert_eq!(Format::parse("ini").unwrap(), Format::Ini);
        assert_eq!(Format::parse("xml").unwrap(), Format::Xml);
    }

    #[test]
    fn test_parse_unsupported() {
        let err = Format::parse("csv").unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat(ref name) if name == "csv"));
    }

    #[test]
    fn test_ensure_extension_appends() {
        assert_eq!(
            Format::Toml.ensure_extension("config"),
            PathBuf::from("config.toml")
        );
        assert_eq!(
            Format::Yaml.ensure_extension("dir/settings"),
            PathBuf::from("dir/settings.yaml")
        );
    }

    #[test]
    fn test_ensure_extension_keeps_existing() {
        // 已有扩展名时不追加，即使与格式不一致
        assert_eq!(
            Format::Json.ensure_extension("app.conf"),
            PathBuf::from("app.conf")
        );
    }
}
