//! 参数序列化：包名与选项 → opkg 的 argv

use super::streaming::OutputSink;

/// 包名参数。字符串按空白拆分，列表原样使用
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packages(Vec<String>);

impl Packages {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for Packages {
    fn from(s: &str) -> Self {
        Packages(s.split_whitespace().map(str::to_string).collect())
    }
}

impl From<String> for Packages {
    fn from(s: String) -> Self {
        Packages::from(s.as_str())
    }
}

impl From<&String> for Packages {
    fn from(s: &String) -> Self {
        Packages::from(s.as_str())
    }
}

impl From<Vec<String>> for Packages {
    fn from(v: Vec<String>) -> Self {
        Packages(v)
    }
}

impl From<&[String]> for Packages {
    fn from(v: &[String]) -> Self {
        Packages(v.to_vec())
    }
}

impl From<&[&str]> for Packages {
    fn from(v: &[&str]) -> Self {
        Packages(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Packages {
    fn from(v: [&str; N]) -> Self {
        Packages(v.iter().map(|s| s.to_string()).collect())
    }
}

/// 命令行选项：要么是已经成形的 flag，要么是 名称 → 值 的有序映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionsInput {
    RawFlags(Vec<String>),
    OptionMap(Vec<(String, Option<String>)>),
}

impl Default for OptionsInput {
    fn default() -> Self {
        OptionsInput::OptionMap(Vec::new())
    }
}

impl OptionsInput {
    /// 序列化为 flag 列表
    ///
    /// - 全大写的键 → 短选项 `-K`，值非空时直接拼接在后面（`-Kvalue`）
    /// - 其他键 → 驼峰转 kebab 的长选项 `--long-name`，值为 `Some` 时追加 `=value`
    /// - 以 `_` 开头的键保留给输出回调，不会出现在 argv 中
    pub fn to_flags(&self) -> Vec<String> {
        match self {
            OptionsInput::RawFlags(flags) => flags.clone(),
            OptionsInput::OptionMap(entries) => entries
                .iter()
                .filter(|(k, _)| !k.starts_with('_'))
                .map(|(k, v)| serialize_option(k, v.as_deref()))
                .collect(),
        }
    }
}

fn serialize_option(key: &str, value: Option<&str>) -> String {
    if key == key.to_uppercase() {
        return format!("-{}{}", key, value.unwrap_or(""));
    }

    let mut flag = String::from("--");
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            flag.push('-');
            flag.push(c.to_ascii_lowercase());
        } else {
            flag.extend(c.to_lowercase());
        }
    }
    if let Some(v) = value {
        flag.push('=');
        flag.push_str(v);
    }
    flag
}

/// 一次调用的全部选项：flag 加上可选的 stdout / stderr 回调
#[derive(Default)]
pub struct Options {
    pub flags: OptionsInput,
    pub stdout: Option<Box<dyn OutputSink>>,
    pub stderr: Option<Box<dyn OutputSink>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// 原样传递的 flag
    pub fn raw<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: OptionsInput::RawFlags(flags.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// 追加一个映射项；当前是 RawFlags 时直接序列化后追加
    pub fn option(mut self, key: impl Into<String>, value: Option<&str>) -> Self {
        let entry = (key.into(), value.map(str::to_string));
        match &mut self.flags {
            OptionsInput::OptionMap(entries) => {
                match entries.iter_mut().find(|(k, _)| *k == entry.0) {
                    Some(slot) => slot.1 = entry.1,
                    None => entries.push(entry),
                }
            }
            OptionsInput::RawFlags(flags) => {
                if !entry.0.starts_with('_') {
                    flags.push(serialize_option(&entry.0, entry.1.as_deref()));
                }
            }
        }
        self
    }

    /// 不带值的开关，例如 `switch("forceDepends")` → `--force-depends`
    pub fn switch(self, key: impl Into<String>) -> Self {
        self.option(key, None)
    }

    pub fn on_stdout(mut self, sink: impl OutputSink + 'static) -> Self {
        self.stdout = Some(Box::new(sink));
        self
    }

    pub fn on_stderr(mut self, sink: impl OutputSink + 'static) -> Self {
        self.stderr = Some(Box::new(sink));
        self
    }
}

impl From<OptionsInput> for Options {
    fn from(flags: OptionsInput) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("flags", &self.flags)
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .finish()
    }
}

/// 拼出最终 argv：子命令和位置参数在前，flag 在后
pub fn build_argv(command: Vec<String>, flags: &OptionsInput) -> Vec<String> {
    let mut argv = command;
    argv.extend(flags.to_flags());
    argv
}

/// 子命令 + 包名
pub(crate) fn command_with_packages(prefix: &[&str], packages: Packages) -> Vec<String> {
    let mut cmd: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
    cmd.extend(packages.into_vec());
    cmd
}
