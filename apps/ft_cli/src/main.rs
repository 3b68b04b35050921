// apps/ft_cli/src/main.rs

//! FioTrace 命令行界面
//!
//! 污染源到取水井的病原体/营养盐运输情景运行与参数校准。
//!
//! # 架构层级
//!
//! 本模块属于 **Layer 5: Application**：只负责参数解析、文件读写和日志初始化，
//! 计算全部委托给 `ft_transport` 与 `ft_calibration`。

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// FioTrace 污染运输与校准命令行工具
#[derive(Parser)]
#[command(name = "ft_cli")]
#[command(author = "FioTrace Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "FioTrace sanitation contamination transport model", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行一个情景
    Run(commands::run::RunArgs),
    /// 参数校准
    Calibrate(commands::calibrate::CalibrateArgs),
    /// 验证输入表与情景
    Validate(commands::validate::ValidateArgs),
    /// 显示信息与默认参数
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Calibrate(args) => commands::calibrate::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Info(args) => commands::info::execute(args),
    }
}
