use clap::Parser;
use std::path::PathBuf;

/// Ndulo - 依赖注入容器演示与配置工具
#[derive(Parser, Debug)]
#[command(name = "ndulo")]
#[command(about = "Token-keyed dependency injection container with lifetimes and scopes")]
pub struct Args {
    /// 子命令
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件路径（默认 ~/.config/ndulo/config.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 覆盖日志过滤级别，如 `debug` 或 `ndulo=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Parser, Debug)]
pub enum Command {
    /// 构建示例服务图并演示解析、作用域和循环检测
    Demo {
        /// 模拟的请求数，每个请求一个作用域
        #[arg(long, default_value_t = 3)]
        requests: u32,
        /// 启用严格注册模式
        #[arg(long)]
        strict: bool,
    },
    /// 显示或初始化配置
    Config {
        /// 配置文件不存在时写入默认配置
        #[arg(long)]
        init: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_demo_with_globals() {
        let args =
            Args::try_parse_from(["ndulo", "demo", "--requests", "5", "--log-level", "debug"])
                .unwrap();
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        match args.command {
            Command::Demo { requests, strict } => {
                assert_eq!(requests, 5);
                assert!(!strict);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_init() {
        let args =
            Args::try_parse_from(["ndulo", "--config", "/tmp/n.toml", "config", "--init"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/n.toml")));
        assert!(matches!(args.command, Command::Config { init: true }));
    }
}
