mod args;
mod demo;

use anyhow::Context;
use clap::Parser;

use args::{Args, Command};
use ndulo::config::ConfigLoader;
use ndulo::logging::{init_logging, APP_LOG_TARGET, ERROR_LOG_TARGET};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Err(error) = run(args).await {
        tracing::error!(target: ERROR_LOG_TARGET, "{:#}", error);
        return Err(error);
    }
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(path.clone()),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load_config().context("加载配置失败")?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    init_logging(&config.logging)?;
    tracing::debug!(target: APP_LOG_TARGET, "配置来源: {:?}", loader.config_path());

    match args.command {
        Command::Demo { requests, strict } => {
            if strict {
                config.container.strict_registration = true;
            }
            demo::run(&config, requests).await?;
        }
        Command::Config { init } => {
            if init {
                let (path, created) = loader.initialize_config()?;
                if created {
                    println!("✅ 已写入默认配置: {}", path.display());
                } else {
                    println!("ℹ️ 配置文件已存在: {}", path.display());
                }
            } else {
                println!("# {}", loader.config_path().display());
                print!("{}", config.to_toml()?);
            }
        }
    }

    Ok(())
}
