//! 配置管理器
//!
//! `ConfigManager` 持有根表、编解码器注册表、目标文件和脏标记，提供：
//! - 点路径读写（`read` / `write`），写入时自动创建中间层
//! - 深度合并（`update`）与整体替换（`set_data`）
//! - 删除并清理空分支（`del_key`）
//! - 自动保存、备份、另存为
//! - 线程安全的文件 I/O（一把互斥锁保护 load / save / save_to_file / del_clean）
//!
//! 文件 I/O 失败只记录日志，不向调用方返回错误；内存状态和脏标记保持不变，
//! 调用方可以稍后重试。只有格式校验和写入路径冲突会返回错误。
//!
//! # 使用示例
//!
//! ```rust
//! use diconfig::{ConfigManager, ConfigOptions};
//!
//! let mut cfg = ConfigManager::new(
//!     ConfigOptions::new("app").with_format("yaml").with_auto_save(false),
//! )?;
//!
//! cfg.write("server.port", 8080, false)?;
//! assert_eq!(cfg.read("server.port", 0).as_i64(), Some(8080));
//! assert_eq!(cfg.read("server.host", "localhost").as_str(), Some("localhost"));
//!
//! cfg.save();
//! ```

use crate::data::codecs::{Codec, CodecRegistry};
use crate::data::node::{
    lookup_path, merge_tables, parse_key_path, remove_path_pruning, Entry, Node, NodeMut,
    Traversal,
};
use crate::data::{DataError, Format, Result, Table, Value};
use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 管理器构造参数
#[derive(Debug, Clone)]
pub struct ConfigOptions {
    /// 配置文件路径，没有扩展名时自动追加格式扩展名
    pub file: PathBuf,
    /// 格式名：json / toml / yaml / ini / xml（大小写不敏感）
    pub format: String,
    /// 是否忽略并覆盖已有配置文件
    pub replace: bool,
    /// 每次修改后是否立即保存
    pub auto_save: bool,
    /// 保存前是否把原文件重命名为 `.bak`
    pub backup: bool,
    /// 编解码器注册表
    pub codecs: CodecRegistry,
}

impl ConfigOptions {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            file: PathBuf::from("config"),
            format: Format::Toml.to_string(),
            replace: false,
            auto_save: true,
            backup: false,
            codecs: CodecRegistry::standard(),
        }
    }
}

/// 层级配置管理器
///
/// 修改操作需要 `&mut self`，保存只需要 `&self`。跨线程并发修改需要调用方
/// 自行加锁（例如 `RwLock<ConfigManager>`）。离开作用域时会调用一次 `save()`。
#[derive(Debug)]
pub struct ConfigManager {
    file: PathBuf,
    format: Format,
    codecs: CodecRegistry,
    root: Table,
    /// 不落盘的临时字段
    ephemeral: HashMap<String, Value>,
    dirty: AtomicBool,
    auto_save: bool,
    backup: bool,
    io_lock: Mutex<()>,
}

impl ConfigManager {
    /// 创建管理器：文件存在则加载，否则立即写出空配置
    pub fn new(options: ConfigOptions) -> Result<Self> {
        Self::build(None, options)
    }

    /// 使用初始数据创建管理器
    ///
    /// 初始数据视为已处于期望状态（非脏）。若文件已存在且未设置 `replace`，
    /// 文件内容会覆盖初始数据。
    pub fn with_data(data: Table, options: ConfigOptions) -> Result<Self> {
        Self::build(Some(data), options)
    }

    fn build(data: Option<Table>, options: ConfigOptions) -> Result<Self> {
        let format = Format::parse(&options.format)?;
        options.codecs.get(format)?;

        let dirty = data.is_none();
        let mut manager = Self {
            file: format.ensure_extension(&options.file),
            format,
            codecs: options.codecs,
            root: data.unwrap_or_default(),
            ephemeral: HashMap::new(),
            dirty: AtomicBool::new(dirty),
            auto_save: options.auto_save,
            backup: options.backup,
            io_lock: Mutex::new(()),
        };

        if manager.file.exists() && !options.replace {
            manager.reload();
        } else {
            manager.save();
        }

        tracing::debug!(
            path = %manager.file.display(),
            format = %manager.format,
            auto_save = manager.auto_save,
            backup = manager.backup,
            "配置管理器已初始化"
        );
        Ok(manager)
    }

    // ==================== 路径读写 ====================

    /// 读取点路径上的值，不存在时返回 `default`
    ///
    /// 从不创建键。任一段缺失、中间段不是表、或值为 `Null` 时返回默认值。
    pub fn read(&self, key: &str, default: impl Into<Value>) -> Value {
        match self.lookup(key) {
            Some(value) => value.clone(),
            None => default.into(),
        }
    }

    /// 借用形式的 `read`
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        lookup_path(&self.root, key)
    }

    /// 写入点路径上的值
    ///
    /// 总是先标记为脏（即使值没有变化）。`overwrite_mode` 为 `false` 时，
    /// 缺失的中间层自动创建，遇到叶子值返回 `DataError::PathConflict`；
    /// 为 `true` 时，冲突的叶子值被丢弃并替换为空表。
    pub fn write(&mut self, key: &str, value: impl Into<Value>, overwrite_mode: bool) -> Result<()> {
        self.mark_dirty();

        let path = parse_key_path(key)?;
        let mode = if overwrite_mode {
            Traversal::Overwrite
        } else {
            Traversal::Vivify
        };
        let touched = Cell::new(false);
        NodeMut::new(&mut self.root, &touched).write_path(&path, value.into(), mode)?;

        self.auto_save_if_enabled();
        Ok(())
    }

    /// 深度合并到根表，返回是否发生变化
    ///
    /// 只有值确实发生变化时才标记为脏并触发自动保存。
    pub fn update(&mut self, data: Table) -> bool {
        let changed = merge_tables(&mut self.root, data);
        if changed {
            self.mark_dirty();
            self.auto_save_if_enabled();
        }
        changed
    }

    /// 整体替换根表
    pub fn set_data(&mut self, data: Table) {
        self.root = data;
        self.mark_dirty();
        self.auto_save_if_enabled();
    }

    /// 删除点路径上的值，并清理因此变空的祖先表
    ///
    /// 路径不存在时什么都不做，返回 `false`。
    pub fn del_key(&mut self, key: &str) -> bool {
        let path: Vec<&str> = key.split('.').collect();
        if remove_path_pruning(&mut self.root, &path).is_none() {
            tracing::debug!(key, "键不存在，跳过删除");
            return false;
        }

        self.mark_dirty();
        self.auto_save_if_enabled();
        true
    }

    /// 删除配置文件并清空内存数据
    ///
    /// 成功后管理器处于脏状态但不自动保存：下一次 `save()` 或离开作用域时
    /// 会重新写出一个空配置文件。文件不存在或删除失败时只记录日志并返回 `false`，
    /// 内存数据和脏标记保持不变。
    pub fn del_clean(&mut self) -> bool {
        let removed = {
            let _guard = self.lock_io();
            if !self.file.exists() {
                tracing::warn!(path = %self.file.display(), "配置文件不存在，无法清除");
                false
            } else {
                match fs::remove_file(&self.file) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(path = %self.file.display(), error = %e, "清除配置文件失败");
                        false
                    }
                }
            }
        };

        if removed {
            self.root = Table::new();
            self.mark_dirty();
            tracing::info!(path = %self.file.display(), "配置文件已清除");
        }
        removed
    }

    // ==================== 节点访问 ====================

    /// 根节点只读视图
    pub fn node(&self) -> Node<'_> {
        Node::new(&self.root)
    }

    /// 按键访问根表，缺失键返回 `DataError::NotFound`
    pub fn get(&self, key: &str) -> Result<Entry<'_>> {
        self.node().get(key)
    }

    /// 通过可变根节点修改配置
    ///
    /// 闭包内发生任何修改时，管理器会被标记为脏并按需自动保存。
    ///
    /// # 示例
    ///
    /// ```rust
    /// cfg.edit(|root| -> diconfig::Result<()> {
    ///     root.child("server")?.set("port", 8080);
    ///     Ok(())
    /// })?;
    /// ```
    pub fn edit<R>(&mut self, f: impl FnOnce(NodeMut<'_>) -> R) -> R {
        let touched = Cell::new(false);
        let result = f(NodeMut::new(&mut self.root, &touched));
        if touched.get() {
            self.mark_dirty();
            self.auto_save_if_enabled();
        }
        result
    }

    // ==================== 临时字段 ====================

    /// 设置临时字段（不落盘、不标记为脏）
    pub fn set_ephemeral(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.ephemeral.insert(key.into(), value.into());
    }

    pub fn ephemeral(&self, key: &str) -> Option<&Value> {
        self.ephemeral.get(key)
    }

    pub fn remove_ephemeral(&mut self, key: &str) -> Option<Value> {
        self.ephemeral.remove(key)
    }

    // ==================== 文件 I/O ====================

    /// 从磁盘重新加载，可选地先切换文件和格式
    ///
    /// 只有格式校验失败会返回错误；读取或解析失败只记录日志，保留原有数据。
    pub fn load(&mut self, file: Option<&Path>, format: Option<&str>) -> Result<()> {
        let format = match format {
            Some(name) => {
                let format = Format::parse(name)?;
                self.codecs.get(format)?;
                format
            }
            None => self.format,
        };

        self.format = format;
        if let Some(file) = file {
            self.file = format.ensure_extension(file);
        }
        self.reload();
        Ok(())
    }

    /// 保存到绑定的文件，返回是否实际写入
    ///
    /// 非脏状态直接返回。写入成功后才清除脏标记，失败时保留脏标记以便重试。
    pub fn save(&self) -> bool {
        let _guard = self.lock_io();
        if !self.dirty.load(Ordering::Acquire) {
            return false;
        }

        match self.persist() {
            Ok(()) => {
                self.dirty.store(false, Ordering::Release);
                tracing::debug!(path = %self.file.display(), "配置已保存");
                true
            }
            Err(e) => {
                tracing::error!(path = %self.file.display(), error = %e, "保存配置文件失败");
                false
            }
        }
    }

    /// 另存到其他文件或格式，不改变当前绑定，也不影响脏标记
    pub fn save_to_file(&self, file: Option<&Path>, format: Option<&str>) -> Result<()> {
        let target_format = match format {
            Some(name) => Format::parse(name)?,
            None => self.format,
        };
        let codec = self.codecs.get(target_format)?;
        let target = match file {
            Some(file) => target_format.ensure_extension(file),
            None => self.file.clone(),
        };

        let _guard = self.lock_io();
        match encode_table(codec.as_ref(), &self.root).and_then(|bytes| write_file(&target, &bytes))
        {
            Ok(()) => tracing::info!(path = %target.display(), format = %target_format, "配置已另存"),
            Err(e) => {
                tracing::warn!(path = %target.display(), error = %e, "另存配置文件失败")
            }
        }
        Ok(())
    }

    fn reload(&mut self) {
        let loaded = {
            let _guard = self.lock_io();
            self.codecs
                .get(self.format)
                .and_then(|codec| read_table(&self.file, codec.as_ref()))
        };

        match loaded {
            Ok(table) => {
                self.root = table;
                tracing::debug!(path = %self.file.display(), format = %self.format, "配置已加载");
            }
            Err(e) => {
                tracing::warn!(path = %self.file.display(), error = %e, "加载配置文件失败");
            }
        }
    }

    /// 先编码再备份、写入，编码失败不会破坏原文件
    fn persist(&self) -> Result<()> {
        let codec = self.codecs.get(self.format)?;
        let bytes = encode_table(codec.as_ref(), &self.root)?;
        if self.backup {
            self.backup_file();
        }
        write_file(&self.file, &bytes)
    }

    fn backup_file(&self) {
        if !self.file.exists() {
            return;
        }
        let backup = backup_path(&self.file);
        if let Err(e) = fs::rename(&self.file, &backup) {
            tracing::warn!(
                path = %self.file.display(),
                backup = %backup.display(),
                error = %e,
                "备份配置文件失败"
            );
        }
    }

    fn auto_save_if_enabled(&self) {
        if self.auto_save {
            self.save();
        }
    }

    fn lock_io(&self) -> MutexGuard<'_, ()> {
        // 锁内没有数据，中毒后可以直接继续使用
        self.io_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== 状态与属性 ====================

    /// 标记为脏，一般不需要手动调用
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn auto_save(&self) -> bool {
        self.auto_save
    }

    pub fn set_auto_save(&mut self, auto_save: bool) {
        self.auto_save = auto_save;
    }

    pub fn backup(&self) -> bool {
        self.backup
    }

    pub fn set_backup(&mut self, backup: bool) {
        self.backup = backup;
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn file_path(&self) -> &Path {
        &self.file
    }

    /// 配置文件的绝对路径
    pub fn file_path_abs(&self) -> PathBuf {
        std::path::absolute(&self.file).unwrap_or_else(|_| self.file.clone())
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// 物化后的完整配置
    pub fn to_table(&self) -> Table {
        self.root.clone()
    }

    /// 格式化的 JSON 文本
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }
}

impl fmt::Display for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.root).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl Drop for ConfigManager {
    fn drop(&mut self) {
        self.save();
    }
}

/// 备份文件路径：原路径追加 `.bak`
pub fn backup_path(file: &Path) -> PathBuf {
    let mut name = OsString::from(file.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

fn read_table(path: &Path, codec: &dyn Codec) -> Result<Table> {
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    let mut reader = BufReader::new(file);
    codec.decode(&mut reader)
}

fn encode_table(codec: &dyn Codec, table: &Table) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    codec.encode(table, &mut buffer)?;
    Ok(buffer)
}

/// 写入文件，自动创建父目录
fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| DataError::io(path, e))
}
