// apps/ft_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示版本信息、类别默认参数和默认情景。

use anyhow::{Context, Result};
use clap::Args;
use ft_config::scenario::{default_fio_efficiency, DEFAULT_FECAL_SLUDGE_EFFICIENCY};
use ft_config::{ContainmentCategory, PollutantKind, ReceptorType, Scenario};
use tracing::info;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 显示系统信息
    #[arg(long)]
    pub system: bool,

    /// 以 TOML 形式输出默认情景
    #[arg(long)]
    pub defaults: bool,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== FioTrace 信息 ===");

    if args.system {
        print_system_info();
    }
    if args.defaults {
        print_default_scenario()?;
    }
    if !args.system && !args.defaults {
        print_system_info();
        println!();
        print_category_defaults();
    }
    Ok(())
}

fn print_system_info() {
    println!("=== 系统信息 ===");
    println!("FioTrace CLI 版本: {}", env!("CARGO_PKG_VERSION"));
    println!("目标平台: {}", std::env::consts::ARCH);
    println!("操作系统: {}", std::env::consts::OS);
    println!(
        "污染物: {}",
        [PollutantKind::Fio, PollutantKind::Nitrogen, PollutantKind::Phosphorus]
            .map(|p| p.as_str())
            .join(", ")
    );
}

fn print_category_defaults() {
    let s = Scenario::default();
    println!("=== 默认参数 ===");
    println!("排放常数: {:e} CFU/人/天", s.emission_rate);
    println!("距离衰减: {} 1/m", s.decay.per_meter);
    println!("粪污处理效率: {DEFAULT_FECAL_SLUDGE_EFFICIENCY}");
    println!("输出单位: {}", s.output_unit);

    println!("\n卫生设施类别   编码  FIO 效率  N 去除  P 去除");
    for cat in ContainmentCategory::ALL {
        println!(
            "  {:<14} {:>3}  {:>8.2}  {:>6.2}  {:>6.2}",
            cat.as_str(),
            cat.code(),
            default_fio_efficiency(cat),
            s.nutrients.nitrogen_removal.get(&cat).copied().unwrap_or(0.0),
            s.nutrients.phosphorus_removal.get(&cat).copied().unwrap_or(0.0),
        );
    }

    println!("\n受体类型      半径 [m]  默认流量 [L/day]");
    for kind in ReceptorType::ALL {
        println!(
            "  {:<12} {:>8.0}  {:>16.0}",
            kind.as_str(),
            s.search_radius_m.for_type(kind),
            s.flow_defaults.for_type(kind)
        );
    }
}

fn print_default_scenario() -> Result<()> {
    let text = toml::to_string_pretty(&Scenario::default()).context("无法序列化默认情景")?;
    println!("{text}");
    Ok(())
}
