//! 错误类型定义

use crate::package_manager::types::CommandResult;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpkgError {
    /// list 类型不在 available / installed / upgradable 之内
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid flag: {0}")]
    InvalidFlag(String),

    #[error("Invalid version operator: {0}")]
    InvalidOperator(String),

    /// 原始命令以非零状态退出，携带完整的输出
    #[error("opkg exited with code {}: {}", .0.exit_code, .0.stderr.trim())]
    Exit(CommandResult),

    /// 解析类命令失败时只保留工具自己的 stderr
    #[error("{0}")]
    Stderr(String),

    #[error("No package found")]
    NoPackageFound,

    #[error("failed to spawn '{path}': {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OpkgError {
    /// 把进程失败收窄为 stderr 文本（解析类命令使用）
    pub(crate) fn into_stderr(self) -> Self {
        match self {
            OpkgError::Exit(result) => OpkgError::Stderr(result.stderr),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, OpkgError>;
