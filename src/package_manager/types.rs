//! Opkg 相关数据类型定义

use crate::error::OpkgError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::str::FromStr;

/// 命令输出结果
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// list / list-installed / list-upgradable 的条目
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageListing {
    pub package: String,
    pub version: String,
    pub description: String,
}

/// search 的结果：拥有该文件的包
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileStatusEntry {
    pub package: String,
    pub version: String,
}

/// info / status 的 `Key: Value` 字段，保持工具输出的顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRecord {
    fields: Vec<(String, String)>,
}

impl StatusRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 同名字段直接覆盖
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// 追加到某个字段末尾，字段不存在时从空字符串开始
    pub fn append(&mut self, key: &str, text: &str) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1.push_str(text),
            None => self.fields.push((key.to_string(), text.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for StatusRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// print-architecture 的一行
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Architecture {
    pub name: String,
    pub priority: u32,
}

/// 可列出的包集合
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Available,
    Installed,
    Upgradable,
}

impl ListKind {
    pub fn subcommand(self) -> &'static str {
        match self {
            ListKind::Available => "list",
            ListKind::Installed => "list-installed",
            ListKind::Upgradable => "list-upgradable",
        }
    }
}

impl FromStr for ListKind {
    type Err = OpkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ListKind::Available),
            "installed" => Ok(ListKind::Installed),
            "upgradable" => Ok(ListKind::Upgradable),
            other => Err(OpkgError::InvalidArgument(other.to_string())),
        }
    }
}

/// `opkg flag` 支持的标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFlag {
    Hold,
    Noprune,
    User,
    Ok,
    Installed,
    Unpackaged,
}

impl PackageFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageFlag::Hold => "hold",
            PackageFlag::Noprune => "noprune",
            PackageFlag::User => "user",
            PackageFlag::Ok => "ok",
            PackageFlag::Installed => "installed",
            PackageFlag::Unpackaged => "unpackaged",
        }
    }
}

impl FromStr for PackageFlag {
    type Err = OpkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hold" => Ok(PackageFlag::Hold),
            "noprune" => Ok(PackageFlag::Noprune),
            "user" => Ok(PackageFlag::User),
            "ok" => Ok(PackageFlag::Ok),
            "installed" => Ok(PackageFlag::Installed),
            "unpackaged" => Ok(PackageFlag::Unpackaged),
            other => Err(OpkgError::InvalidFlag(other.to_string())),
        }
    }
}

impl fmt::Display for PackageFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `opkg compare-versions` 的比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOp {
    Less,
    LessOrEqual,
    Equal,
    GreaterOrEqual,
    Greater,
}

impl VersionOp {
    pub fn as_str(self) -> &'static str {
        match self {
            VersionOp::Less => "<<",
            VersionOp::LessOrEqual => "<=",
            VersionOp::Equal => "=",
            VersionOp::GreaterOrEqual => ">=",
            VersionOp::Greater => ">>",
        }
    }
}

impl FromStr for VersionOp {
    type Err = OpkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<<" => Ok(VersionOp::Less),
            "<=" => Ok(VersionOp::LessOrEqual),
            "=" => Ok(VersionOp::Equal),
            ">=" => Ok(VersionOp::GreaterOrEqual),
            ">>" => Ok(VersionOp::Greater),
            other => Err(OpkgError::InvalidOperator(other.to_string())),
        }
    }
}

/// whatdepends 一族的依赖关系查询
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Depends,
    DependsRecursive,
    Provides,
    Conflicts,
    Replaces,
}

impl Relation {
    pub fn subcommand(self) -> &'static str {
        match self {
            Relation::Depends => "whatdepends",
            Relation::DependsRecursive => "whatdependsrec",
            Relation::Provides => "whatprovides",
            Relation::Conflicts => "whatconflicts",
            Relation::Replaces => "whatreplaces",
        }
    }
}
