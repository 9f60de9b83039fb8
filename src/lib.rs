//! 对 OpenWrt `opkg` 命令行的异步封装：拼装参数、执行子进程、解析输出

pub mod config;
pub mod error;
pub mod package_manager;

pub use config::Config;
pub use error::{OpkgError, Result};
pub use package_manager::{
    CommandResult, FileStatusEntry, ListKind, Opkg, Options, OptionsInput, PackageFlag,
    PackageListing, Packages, StatusRecord,
};
