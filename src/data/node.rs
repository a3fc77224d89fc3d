//! 配置树节点
//!
//! 节点是对某一层 `Table` 的遍历视图，不持有数据，也不在两次访问之间缓存：
//! - `Node`: 只读视图，按键访问（缺失键返回 `NotFound`）
//! - `NodeMut`: 可变视图，通过显式的 `Traversal` 模式决定中间层缺失或冲突时的行为
//!
//! 节点没有指向父节点的引用。删除后的空分支清理由 `remove_path_pruning`
//! 从根重新遍历完成。
//!
//! # 使用示例
//!
//! ```rust
//! use std::cell::Cell;
//! use diconfig::{NodeMut, Table, Traversal, Value};
//!
//! let mut root = Table::new();
//! let touched = Cell::new(false);
//! NodeMut::new(&mut root, &touched)
//!     .descend("a", Traversal::Vivify)?
//!     .descend("b", Traversal::Vivify)?
//!     .set("c", 1);
//! assert!(touched.get());
//! ```

use crate::data::{DataError, Result, Table, Value};
use std::cell::Cell;
use std::collections::btree_map;

/// 路径遍历模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// 存在性检查：缺失键返回 `NotFound`，叶子值返回 `PathConflict`
    Checked,
    /// 自动创建：缺失键创建空表，叶子值返回 `PathConflict`
    Vivify,
    /// 覆写：缺失键创建空表，叶子值被丢弃并替换为空表
    Overwrite,
}

/// 按键访问的结果：子表包装为节点，其余值直接返回
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    Node(Node<'a>),
    Value(&'a Value),
}

impl<'a> Entry<'a> {
    pub fn as_node(&self) -> Option<Node<'a>> {
        match self {
            Entry::Node(node) => Some(*node),
            Entry::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&'a Value> {
        match self {
            Entry::Node(_) => None,
            Entry::Value(value) => Some(*value),
        }
    }

    /// 物化为独立的值（子表会被深拷贝）
    pub fn to_value(&self) -> Value {
        match self {
            Entry::Node(node) => Value::Table(node.to_table()),
            Entry::Value(value) => (*value).clone(),
        }
    }
}

fn entry_of(value: &Value) -> Entry<'_> {
    match value {
        Value::Table(table) => Entry::Node(Node::new(table)),
        other => Entry::Value(other),
    }
}

/// 只读节点
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    table: &'a Table,
}

impl<'a> Node<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self { table }
    }

    /// 按键访问，缺失键返回 `DataError::NotFound`
    pub fn get(&self, key: &str) -> Result<Entry<'a>> {
        self.table
            .get(key)
            .map(entry_of)
            .ok_or_else(|| DataError::NotFound(format!("键 '{}' 不存在", key)))
    }

    /// 按点路径查找，语义同 `ConfigManager::read`
    pub fn lookup(&self, path: &str) -> Option<&'a Value> {
        lookup_path(self.table, path)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> {
        self.table.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'a, String, Value> {
        self.table.iter()
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// 物化为普通嵌套表
    pub fn to_table(&self) -> Table {
        self.table.clone()
    }
}

/// 可变节点
///
/// 任何修改都会设置共享的 `touched` 标记，管理器据此标记脏状态并触发自动保存。
#[derive(Debug)]
pub struct NodeMut<'a> {
    table: &'a mut Table,
    touched: &'a Cell<bool>,
}

impl<'a> NodeMut<'a> {
    pub fn new(table: &'a mut Table, touched: &'a Cell<bool>) -> Self {
        Self { table, touched }
    }

    /// 按键访问，缺失键返回 `DataError::NotFound`
    pub fn get(&self, key: &str) -> Result<Entry<'_>> {
        self.as_node().get(key)
    }

    pub fn as_node(&self) -> Node<'_> {
        Node::new(self.table)
    }

    /// 进入子表
    pub fn descend(self, key: &str, mode: Traversal) -> Result<NodeMut<'a>> {
        let NodeMut { table, touched } = self;

        let slot = match mode {
            Traversal::Checked => table
                .get_mut(key)
                .ok_or_else(|| DataError::NotFound(format!("键 '{}' 不存在", key)))?,
            Traversal::Vivify | Traversal::Overwrite => {
                if !table.contains_key(key) {
                    touched.set(true);
                }
                table
                    .entry(key.to_string())
                    .or_insert_with(|| Value::Table(Table::new()))
            }
        };

        if mode == Traversal::Overwrite && !slot.is_table() {
            tracing::debug!(key, discarded = slot.kind(), "覆写模式丢弃冲突的叶子值");
            *slot = Value::Table(Table::new());
            touched.set(true);
        }

        match slot {
            Value::Table(child) => Ok(NodeMut {
                table: child,
                touched,
            }),
            _ => Err(DataError::PathConflict(key.to_string())),
        }
    }

    /// 属性式访问：缺失键自动创建为空表
    pub fn child(self, key: &str) -> Result<NodeMut<'a>> {
        self.descend(key, Traversal::Vivify)
    }

    /// 设置键值，返回旧值
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.touched.set(true);
        self.table.insert(key.into(), value.into())
    }

    /// 删除键，缺失键返回 `DataError::NotFound`
    pub fn remove(&mut self, key: &str) -> Result<Value> {
        let removed = self
            .table
            .remove(key)
            .ok_or_else(|| DataError::NotFound(format!("键 '{}' 不存在", key)))?;
        self.touched.set(true);
        Ok(removed)
    }

    /// 沿路径写入叶子值，中间层按 `mode` 处理
    pub fn write_path(self, path: &[&str], value: Value, mode: Traversal) -> Result<Option<Value>> {
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| DataError::InvalidKey("空键路径".into()))?;

        let mut node = self;
        for (depth, segment) in parents.iter().enumerate() {
            node = node.descend(segment, mode).map_err(|e| match e {
                DataError::PathConflict(_) => DataError::PathConflict(path[..=depth].join(".")),
                other => other,
            })?;
        }
        Ok(node.set(*last, value))
    }

    pub fn to_table(&self) -> Table {
        self.table.clone()
    }
}

/// 解析并校验键路径（空路径或空段视为无效）
///
/// # 示例
///
/// ```rust
/// assert_eq!(parse_key_path("a.b.c")?, vec!["a", "b", "c"]);
/// assert!(parse_key_path("a..c").is_err());
/// ```
pub fn parse_key_path(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(DataError::InvalidKey(key.to_string()));
    }
    Ok(segments)
}

/// 只读路径查找
///
/// 任一段缺失、非末段不是表、或末段存的是 `Null` 时返回 `None`，从不创建键。
pub fn lookup_path<'a>(table: &'a Table, path: &str) -> Option<&'a Value> {
    let mut current = table;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let value = current.get(segment)?;
        if segments.peek().is_none() {
            return (!value.is_null()).then_some(value);
        }
        current = value.as_table()?;
    }
    None
}

/// 删除路径末端的值，并自底向上清理变空的祖先表
///
/// 清理在第一个仍非空的祖先处停止，根表本身不会被删除。路径不存在时不做任何修改。
pub fn remove_path_pruning(table: &mut Table, path: &[&str]) -> Option<Value> {
    match path {
        [] => None,
        [last] => table.remove(*last),
        [first, rest @ ..] => {
            let child = table.get_mut(*first)?.as_table_mut()?;
            let removed = remove_path_pruning(child, rest)?;
            if child.is_empty() {
                table.remove(*first);
            }
            Some(removed)
        }
    }
}

/// 深度合并，返回是否发生了实际变化
///
/// 两侧都是表时递归合并，否则仅在值不同时覆盖。
pub fn merge_tables(target: &mut Table, source: Table) -> bool {
    let mut changed = false;
    for (key, incoming) in source {
        if let Some(existing) = target.get_mut(&key) {
            changed |= merge_value(existing, incoming);
        } else {
            target.insert(key, incoming);
            changed = true;
        }
    }
    changed
}

fn merge_value(existing: &mut Value, incoming: Value) -> bool {
    match (existing, incoming) {
        (Value::Table(existing), Value::Table(incoming)) => merge_tables(existing, incoming),
        (existing, incoming) => {
            if *existing == incoming {
                false
            } else {
                *existing = incoming;
                true
            }
        }
    }
}
