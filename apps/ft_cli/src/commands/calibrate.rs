// apps/ft_cli/src/commands/calibrate.rs

//! 参数校准命令
//!
//! 输出目录内容：
//! - `grid.csv`: 每个网格点的指标
//! - `pairs.csv`: 最优情景下的观测-预测匹配对
//! - `calibration.json`: 完整校准报告

use super::{load_inputs, InputArgs};
use anyhow::{Context, Result};
use clap::Args;
use ft_calibration::{calibrate, CalibrationConfig, Objective};
use ft_io::{read_calibration_config, read_observations, write_grid, write_json, write_pairs};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// 校准参数
#[derive(Args)]
pub struct CalibrateArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// 野外观测表 CSV
    #[arg(long)]
    pub observations: PathBuf,

    /// 网格与校准配置（.toml / .json）
    #[arg(short, long)]
    pub grid: Option<PathBuf>,

    /// 优化目标（log_rmse / spearman / kendall），覆盖配置文件
    #[arg(long)]
    pub objective: Option<String>,

    /// 串行评估网格点
    #[arg(long)]
    pub sequential: bool,

    /// 输出目录
    #[arg(short, long, default_value = "calibration")]
    pub output: PathBuf,
}

/// 执行校准命令
pub fn execute(args: CalibrateArgs) -> Result<()> {
    info!("=== FioTrace 参数校准 ===");
    let start = Instant::now();

    let mut config = match &args.grid {
        Some(path) => read_calibration_config(path)
            .with_context(|| format!("无法读取校准配置 {}", path.display()))?,
        None => CalibrationConfig::default(),
    };
    if let Some(obj) = &args.objective {
        config.grid.objective = obj.parse::<Objective>().context("无法解析 --objective")?;
    }
    if args.sequential {
        config.grid.parallel = false;
    }

    let (ctx, scenario, diagnostics) = load_inputs(&args.input)?;
    let observations = read_observations(&args.observations, &config.lab)
        .with_context(|| format!("无法读取观测表 {}", args.observations.display()))?;

    let mut report = calibrate(&ctx, &scenario, &observations, &config).context("校准失败")?;
    let mut all = diagnostics;
    all.merge(std::mem::take(&mut report.diagnostics));
    report.diagnostics = all;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("无法创建输出目录 {}", args.output.display()))?;
    write_grid(&args.output.join("grid.csv"), &report.grid)?;
    write_pairs(&args.output.join("pairs.csv"), &report.pairs)?;
    write_json(&args.output.join("calibration.json"), &report)?;

    println!("\n=== 校准完成 ===");
    println!("网格点: {}, 目标: {}", report.grid.results.len(), report.grid.objective);
    match report.grid.best_result() {
        Some(best) => {
            println!(
                "最优点 #{}: decay_per_meter={}, emission_scale={}",
                best.index, best.point.decay_per_meter, best.point.emission_scale
            );
            for (cat, eta) in &best.point.efficiencies {
                println!("  {cat} 效率: {eta}");
            }
        }
        None => println!("没有网格点具备有效目标值"),
    }
    println!("观测: {} 条 (缺失 {}), 匹配对: {}", report.n_observations, report.n_missing_observations, report.n_matched);
    println!("log RMSE: {:?}, Spearman: {:?}", report.metrics.log_rmse, report.metrics.spearman);
    if let Some(cv) = &report.correction {
        println!(
            "对数偏差校正: shift={:.4}, {} 折 log RMSE {:?} ± {:?}",
            cv.correction.shift, cv.k, cv.mean_log_rmse, cv.std_log_rmse
        );
    }
    if let Some(t) = &report.tiers {
        println!("分级准确率: {:?}, 最高风险分位 F1: {:?}", t.accuracy, t.f1);
    }
    println!("用时: {:.2?}", start.elapsed());
    println!("输出目录: {}", args.output.display());
    Ok(())
}
