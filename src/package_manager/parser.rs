//! 输出解析函数

use super::types::{Architecture, FileStatusEntry, PackageListing, StatusRecord};

/// 合并连续空白为单个空格
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 解析 `opkg list` / `list-installed` / `list-upgradable` 的输出
///
/// 每行形如 `name - version - description`；以空格开头的行是上一条描述的续行。
/// 去除首尾空白后不超过 3 个字符的行视为噪声丢弃。
pub fn parse_package_list(stdout: &str) -> Vec<PackageListing> {
    let mut packages: Vec<PackageListing> = Vec::new();

    for line in stdout.split('\n') {
        if line.starts_with(' ') {
            if let Some(last) = packages.last_mut() {
                let text = normalize_whitespace(line);
                if text.is_empty() {
                    continue;
                }
                if !last.description.is_empty() {
                    last.description.push(' ');
                }
                last.description.push_str(&text);
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.chars().count() <= 3 {
            continue;
        }

        // 第三段保留其余的 " - "，描述里的连字符不会被截掉
        let mut parts = trimmed.splitn(3, " - ");
        let package = parts.next().unwrap_or_default().to_string();
        let version = parts.next().unwrap_or_default().to_string();
        let description = normalize_whitespace(parts.next().unwrap_or_default());

        packages.push(PackageListing {
            package,
            version,
            description,
        });
    }

    packages
}

/// 解析 `opkg info` / `opkg status` 的 `Key: Value` 输出
///
/// 多个包的字段会合并成一条记录。不含 `": "` 的行原样追加到 `Description`，
/// 即便之前没有出现过 `Description` 字段。
pub fn parse_status(stdout: &str) -> StatusRecord {
    let mut info = StatusRecord::default();

    for line in stdout.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        // 只在第一个 ": " 处切分，值中后续的 ": " 原样保留
        match trimmed.split_once(": ") {
            Some((key, value)) => info.insert(key, value),
            None => info.append("Description", line),
        }
    }

    info
}

/// 解析 `opkg search` 的 `name - version` 单行输出
pub fn parse_file_status(stdout: &str) -> FileStatusEntry {
    let trimmed = stdout.trim();
    // 同样只切第一个分隔符，其余内容归入版本
    let (package, version) = trimmed.split_once(" - ").unwrap_or((trimmed, ""));
    FileStatusEntry {
        package: package.to_string(),
        version: version.to_string(),
    }
}

/// 按行切分普通列表输出，`skip_header` 时丢弃第一行
pub fn parse_plain_list(stdout: &str, skip_header: bool) -> Vec<String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let lines = trimmed.split('\n').map(str::to_string);
    if skip_header {
        lines.skip(1).collect()
    } else {
        lines.collect()
    }
}

/// 解析 `opkg print-architecture`，例如 `arch mips_24kc 10`
pub fn parse_architectures(stdout: &str) -> Vec<Architecture> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            if tokens.next()? != "arch" {
                return None;
            }
            let name = tokens.next()?.to_string();
            let priority = tokens.next().and_then(|p| p.parse().ok()).unwrap_or(0);
            Some(Architecture { name, priority })
        })
        .collect()
}
