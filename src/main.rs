use anyhow::Result;
use lian_opkg::{Config, Opkg, Options};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // 加载配置
    let config = Config::load_or_default()?;
    let opkg = Opkg::from_config(&config);

    // 无参数时列出已安装包，否则显示指定包的状态
    let packages: Vec<String> = std::env::args().skip(1).collect();
    let json = if packages.is_empty() {
        let installed = opkg.list_installed(Options::new()).await?;
        serde_json::to_string_pretty(&installed)?
    } else {
        let status = opkg.status(packages, Options::new()).await?;
        serde_json::to_string_pretty(&status)?
    };

    println!("{}", json);

    Ok(())
}
