// apps/ft_cli/src/commands/mod.rs

//! 子命令与共用的输入加载

pub mod calibrate;
pub mod info;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use clap::Args;
use ft_config::{load_scenario, PollutantKind, Scenario};
use ft_foundation::DiagnosticLog;
use ft_io::{read_mapping, read_receptors, read_sources};
use ft_transport::{MappingStrategy, PipelineContext};
use std::path::{Path, PathBuf};
use tracing::info;

/// 运行与校准共用的输入参数
#[derive(Args)]
pub struct InputArgs {
    /// 源表 CSV
    #[arg(short, long)]
    pub sources: PathBuf,

    /// 受体表 CSV
    #[arg(short, long)]
    pub receptors: PathBuf,

    /// 显式映射表 CSV（提供时替代空间连接）
    #[arg(short, long)]
    pub mapping: Option<PathBuf>,

    /// 情景文件（.toml / .json），缺省为内置默认情景
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// 污染物（fio / nitrogen / phosphorus），覆盖情景中的设置
    #[arg(long)]
    pub pollutant: Option<String>,

    /// 映射策略（radius / nearest / round_robin / single:<受体ID>）
    #[arg(long, default_value = "radius")]
    pub strategy: String,
}

/// 加载情景，未指定文件时使用默认值
pub fn load_scenario_file(path: Option<&Path>, diagnostics: &mut DiagnosticLog) -> Result<Scenario> {
    match path {
        Some(p) => {
            let doc = load_scenario(p).with_context(|| format!("无法加载情景 {}", p.display()))?;
            diagnostics.merge(doc.diagnostics);
            info!("情景 '{}' 来自 {}", doc.scenario.name, p.display());
            Ok(doc.scenario)
        }
        None => {
            info!("未指定情景文件，使用默认情景");
            Ok(Scenario::default())
        }
    }
}

/// 加载全部输入，返回运行上下文、情景与诊断
pub fn load_inputs(args: &InputArgs) -> Result<(PipelineContext, Scenario, DiagnosticLog)> {
    let mut diagnostics = DiagnosticLog::new();
    let mut scenario = load_scenario_file(args.scenario.as_deref(), &mut diagnostics)?;
    if let Some(p) = &args.pollutant {
        scenario.pollutant = p.parse::<PollutantKind>().context("无法解析 --pollutant")?;
    }

    let sources = read_sources(&args.sources, &mut diagnostics)
        .with_context(|| format!("无法读取源表 {}", args.sources.display()))?;
    let receptors = read_receptors(&args.receptors, &mut diagnostics)
        .with_context(|| format!("无法读取受体表 {}", args.receptors.display()))?;
    let strategy: MappingStrategy = args.strategy.parse().context("无法解析 --strategy")?;

    let mut ctx = PipelineContext::new(sources, receptors, scenario.pollutant).with_strategy(strategy);
    if let Some(path) = &args.mapping {
        let mapping = read_mapping(path).with_context(|| format!("无法读取映射表 {}", path.display()))?;
        ctx = ctx.with_mapping(mapping);
    }
    Ok((ctx, scenario, diagnostics))
}
