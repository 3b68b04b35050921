// apps/ft_cli/src/commands/run.rs

//! 运行情景命令
//!
//! 输出目录内容：
//! - `links.csv`: 逐链接负荷与浓度
//! - `receptors.csv`: 逐受体浓度与风险评分
//! - `summary.json`: 运行摘要、干预报告与诊断
//! - `baseline.json`: 可作为下一次运行 `--baseline` 的快照

use super::{load_inputs, InputArgs};
use anyhow::{Context, Result};
use clap::Args;
use ft_io::{read_baseline, write_baseline, write_json, write_links, write_receptors};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// 运行参数
#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// 基线快照（上一次运行的 baseline.json 或 receptors.csv），定向干预需要
    #[arg(short, long)]
    pub baseline: Option<PathBuf>,

    /// 输出目录
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,
}

#[derive(Serialize)]
struct RunSummaryFile<'a> {
    scenario: &'a str,
    pollutant: String,
    unit: &'static str,
    summary: &'a ft_transport::aggregator::RunSummary,
    intervention: &'a ft_transport::intervention::InterventionReport,
    diagnostics: &'a ft_foundation::DiagnosticLog,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== FioTrace 情景运行 ===");
    let start = Instant::now();

    let (ctx, scenario, mut diagnostics) = load_inputs(&args.input)?;
    let baseline = match &args.baseline {
        Some(path) => read_baseline(path).with_context(|| format!("无法读取基线 {}", path.display()))?,
        None => None,
    };
    if scenario.targeted.is_some() && baseline.is_none() {
        warn!("情景包含定向干预但没有可用的基线快照，该步骤将被跳过");
    }

    let mut out = ctx.run(&scenario, baseline.as_ref()).context("情景运行失败")?;
    diagnostics.merge(std::mem::take(&mut out.diagnostics));

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("无法创建输出目录 {}", args.output.display()))?;
    write_links(&args.output.join("links.csv"), &out.links, out.unit)?;
    write_receptors(&args.output.join("receptors.csv"), &out.receptors, out.unit)?;
    write_baseline(&args.output.join("baseline.json"), &out.baseline())?;
    write_json(
        &args.output.join("summary.json"),
        &RunSummaryFile {
            scenario: &out.scenario_name,
            pollutant: out.pollutant.to_string(),
            unit: out.unit.label(),
            summary: &out.summary,
            intervention: &out.intervention,
            diagnostics: &diagnostics,
        },
    )?;

    let s = &out.summary;
    println!("\n=== 运行完成 ===");
    println!("情景: {} ({})", out.scenario_name, out.pollutant);
    println!("源: {} 行, 链接: {} 条, 受体: {} 个", out.sources.len(), s.link_count, s.receptor_count);
    println!("有负荷的受体: {}", s.receptors_with_load);
    println!("最大浓度: {:.3} {}", s.max_concentration, out.unit);
    println!("诊断: {} 条", diagnostics.len());
    println!("用时: {:.2?}", start.elapsed());
    println!("输出目录: {}", args.output.display());
    Ok(())
}
