//! 包管理器模块 — 对 OpenWrt opkg 的封装

pub mod args;
pub mod parser;
pub mod streaming;
pub mod types;

// 重新导出常用类型
pub use args::{Options, OptionsInput, Packages};
pub use streaming::{ChannelSink, CommandRunner, OutputSink, ProcessRunner, DEFAULT_EXECUTABLE};
pub use types::{
    Architecture, CommandResult, FileStatusEntry, ListKind, PackageFlag, PackageListing,
    Relation, StatusRecord, VersionOp,
};

use crate::config::Config;
use crate::error::{OpkgError, Result};
use args::{build_argv, command_with_packages};
use parser::{
    parse_architectures, parse_file_status, parse_package_list, parse_plain_list, parse_status,
};
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct Opkg<R = ProcessRunner> {
    runner: R,
}

impl Opkg<ProcessRunner> {
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self::new(ProcessRunner::new(executable))
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_executable(config.executable.clone())
    }

    /// 修改 opkg 路径，只影响之后的调用
    pub fn set_executable_path(&mut self, executable: impl Into<PathBuf>) {
        self.runner.set_executable(executable);
    }
}

impl<R: CommandRunner> Opkg<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// 拼接 argv 并执行，返回原始结果
    async fn run_command(&self, command: Vec<String>, opts: Options) -> Result<CommandResult> {
        let Options {
            flags,
            stdout,
            stderr,
        } = opts;
        let argv = build_argv(command, &flags);
        self.runner.run(argv, stdout, stderr).await
    }

    /// 解析类命令：失败时只保留 stderr
    async fn run_parsed<T>(
        &self,
        command: Vec<String>,
        opts: Options,
        parse: impl FnOnce(&str) -> T,
    ) -> Result<T> {
        let result = self
            .run_command(command, opts)
            .await
            .map_err(OpkgError::into_stderr)?;
        Ok(parse(&result.stdout))
    }

    // ===== 原始命令 =====

    /// 更新软件源 (`opkg update`)
    pub async fn update(&self, opts: Options) -> Result<CommandResult> {
        self.run_command(vec!["update".to_string()], opts).await
    }

    pub async fn upgrade(&self, pkg: impl Into<Packages>, opts: Options) -> Result<CommandResult> {
        self.run_command(command_with_packages(&["upgrade"], pkg.into()), opts)
            .await
    }

    pub async fn install(&self, pkg: impl Into<Packages>, opts: Options) -> Result<CommandResult> {
        self.run_command(command_with_packages(&["install"], pkg.into()), opts)
            .await
    }

    pub async fn configure(
        &self,
        pkg: impl Into<Packages>,
        opts: Options,
    ) -> Result<CommandResult> {
        self.run_command(command_with_packages(&["configure"], pkg.into()), opts)
            .await
    }

    pub async fn remove(&self, pkg: impl Into<Packages>, opts: Options) -> Result<CommandResult> {
        self.run_command(command_with_packages(&["remove"], pkg.into()), opts)
            .await
    }

    /// 下载 ipk 到当前目录 (`opkg download`)
    pub async fn download(&self, pkg: impl Into<Packages>, opts: Options) -> Result<CommandResult> {
        self.run_command(command_with_packages(&["download"], pkg.into()), opts)
            .await
    }

    /// 标记包 (`opkg flag <flag> <pkgs>`)，未知标记不会启动进程
    pub async fn flag(
        &self,
        flag: &str,
        pkg: impl Into<Packages>,
        opts: Options,
    ) -> Result<CommandResult> {
        let flag: PackageFlag = flag.parse()?;
        self.flag_package(flag, pkg, opts).await
    }

    pub async fn flag_package(
        &self,
        flag: PackageFlag,
        pkg: impl Into<Packages>,
        opts: Options,
    ) -> Result<CommandResult> {
        self.run_command(command_with_packages(&["flag", flag.as_str()], pkg.into()), opts)
            .await
    }

    /// 依赖关系查询 (`whatdepends` / `whatprovides` ...)
    pub async fn what(
        &self,
        relation: Relation,
        pkg: impl Into<Packages>,
        opts: Options,
    ) -> Result<CommandResult> {
        self.run_command(command_with_packages(&[relation.subcommand()], pkg.into()), opts)
            .await
    }

    // ===== 查询 =====

    /// 列出包。`kind` 只接受 available / installed / upgradable，
    /// 包名过滤只对 available 生效
    pub async fn list(
        &self,
        kind: &str,
        pkg: Option<Packages>,
        opts: Options,
    ) -> Result<Vec<PackageListing>> {
        let kind: ListKind = kind.parse()?;
        self.list_kind(kind, pkg, opts).await
    }

    pub async fn list_kind(
        &self,
        kind: ListKind,
        pkg: Option<Packages>,
        opts: Options,
    ) -> Result<Vec<PackageListing>> {
        let mut cmd = vec![kind.subcommand().to_string()];
        if kind == ListKind::Available {
            if let Some(pkg) = pkg {
                cmd.extend(pkg.into_vec());
            }
        }
        self.run_parsed(cmd, opts, parse_package_list).await
    }

    pub async fn list_available(
        &self,
        pkg: Option<Packages>,
        opts: Options,
    ) -> Result<Vec<PackageListing>> {
        self.list_kind(ListKind::Available, pkg, opts).await
    }

    pub async fn list_installed(&self, opts: Options) -> Result<Vec<PackageListing>> {
        self.list_kind(ListKind::Installed, None, opts).await
    }

    pub async fn list_upgradable(&self, opts: Options) -> Result<Vec<PackageListing>> {
        self.list_kind(ListKind::Upgradable, None, opts).await
    }

    /// 被修改过的配置文件 (`opkg list-changed-conffiles`)
    pub async fn changed_configurations(&self, opts: Options) -> Result<Vec<String>> {
        self.run_parsed(vec!["list-changed-conffiles".to_string()], opts, |out| {
            parse_plain_list(out, false)
        })
        .await
    }

    /// 包内文件列表 (`opkg files`)，首行是标题
    pub async fn files(&self, pkg: impl Into<Packages>, opts: Options) -> Result<Vec<String>> {
        self.run_parsed(command_with_packages(&["files"], pkg.into()), opts, |out| {
            parse_plain_list(out, true)
        })
        .await
    }

    /// 查找拥有某个文件的包 (`opkg search <path>`)
    pub async fn search(&self, query: &str, opts: Options) -> Result<FileStatusEntry> {
        let cmd = vec!["search".to_string(), query.to_string()];
        let result = self
            .run_command(cmd, opts)
            .await
            .map_err(OpkgError::into_stderr)?;
        if result.stdout.trim().is_empty() {
            return Err(OpkgError::NoPackageFound);
        }
        Ok(parse_file_status(&result.stdout))
    }

    pub async fn info(&self, pkg: impl Into<Packages>, opts: Options) -> Result<StatusRecord> {
        self.run_parsed(command_with_packages(&["info"], pkg.into()), opts, parse_status)
            .await
    }

    pub async fn status(&self, pkg: impl Into<Packages>, opts: Options) -> Result<StatusRecord> {
        self.run_parsed(command_with_packages(&["status"], pkg.into()), opts, parse_status)
            .await
    }

    /// 在全部可用包中按名称或描述查找（不区分大小写）
    pub async fn find(&self, query: &str) -> Result<Vec<PackageListing>> {
        let needle = query.to_lowercase();
        let packages = self.list_available(None, Options::new()).await?;
        Ok(packages
            .into_iter()
            .filter(|p| {
                p.package.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
            })
            .collect())
    }

    pub async fn print_architecture(&self, opts: Options) -> Result<Vec<Architecture>> {
        self.run_parsed(vec!["print-architecture".to_string()], opts, parse_architectures)
            .await
    }

    /// 版本比较 (`opkg compare-versions a op b`)，退出码 0 为真，1 为假
    pub async fn compare_versions(&self, a: &str, op: VersionOp, b: &str) -> Result<bool> {
        let cmd = vec![
            "compare-versions".to_string(),
            a.to_string(),
            op.as_str().to_string(),
            b.to_string(),
        ];
        match self.run_command(cmd, Options::new()).await {
            Ok(_) => Ok(true),
            Err(OpkgError::Exit(result)) if result.exit_code == 1 => Ok(false),
            Err(e) => Err(e),
        }
    }
}
