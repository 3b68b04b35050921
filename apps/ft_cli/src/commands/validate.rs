// apps/ft_cli/src/commands/validate.rs

//! 输入验证命令
//!
//! 逐个加载指定的表和情景文件。结构性问题记为错误，
//! 可恢复的数据问题（未知键、默认值替换等）记为警告。

use super::load_scenario_file;
use anyhow::{bail, Result};
use clap::Args;
use ft_calibration::LabParseConfig;
use ft_foundation::{DiagnosticLog, FtResult};
use ft_io::{read_mapping, read_observations, read_receptors, read_sources};
use std::path::PathBuf;
use tracing::info;

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 源表 CSV
    #[arg(short, long)]
    pub sources: Option<PathBuf>,

    /// 受体表 CSV
    #[arg(short, long)]
    pub receptors: Option<PathBuf>,

    /// 映射表 CSV
    #[arg(short, long)]
    pub mapping: Option<PathBuf>,

    /// 观测表 CSV
    #[arg(long)]
    pub observations: Option<PathBuf>,

    /// 情景文件
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 验证结果
#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warnings(&mut self, diagnostics: &DiagnosticLog) {
        self.warnings.extend(diagnostics.entries().iter().map(|d| d.to_string()));
    }

    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn is_ok_strict(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// 检查一个输入，错误记入结果
fn check<T>(
    label: &str,
    path: &Option<PathBuf>,
    result: &mut ValidationResult,
    load: impl FnOnce(&PathBuf, &mut DiagnosticLog) -> FtResult<T>,
    describe: impl FnOnce(&T) -> String,
) {
    let Some(path) = path else {
        return;
    };
    println!("\n检查{label}: {}", path.display());
    let mut diagnostics = DiagnosticLog::new();
    match load(path, &mut diagnostics) {
        Ok(value) => println!("  ✓ {}", describe(&value)),
        Err(e) => result.add_error(format!("{label} {}: {e}", path.display())),
    }
    result.add_warnings(&diagnostics);
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== FioTrace 输入验证 ===");

    if args.sources.is_none()
        && args.receptors.is_none()
        && args.mapping.is_none()
        && args.observations.is_none()
        && args.scenario.is_none()
    {
        println!("用法: ft_cli validate [--sources <CSV>] [--receptors <CSV>] [--mapping <CSV>]");
        println!("                      [--observations <CSV>] [--scenario <TOML/JSON>] [--strict]");
        return Ok(());
    }

    let mut result = ValidationResult::default();

    if let Some(path) = &args.scenario {
        println!("\n检查情景: {}", path.display());
        let mut diagnostics = DiagnosticLog::new();
        match load_scenario_file(Some(path), &mut diagnostics) {
            Ok(s) => println!("  ✓ 情景 '{}' ({})", s.name, s.pollutant),
            Err(e) => result.add_error(format!("情景 {}: {e:#}", path.display())),
        }
        result.add_warnings(&diagnostics);
    }

    check("源表", &args.sources, &mut result, |p, d| read_sources(p, d), |t| {
        format!("{} 行, 总人口 {:.0}", t.len(), t.total_population())
    });
    check("受体表", &args.receptors, &mut result, |p, d| read_receptors(p, d), |r| {
        format!("{} 个受体", r.len())
    });
    check("映射表", &args.mapping, &mut result, |p, _| read_mapping(p), |m| {
        format!("{} 行", m.len())
    });
    check(
        "观测表",
        &args.observations,
        &mut result,
        |p, _| read_observations(p, &LabParseConfig::default()),
        |o| format!("{} 条观测, 其中 {} 条读数缺失", o.len(), o.iter().filter(|x| x.value.is_none()).count()),
    );

    print_validation_result(&result, args.strict)
}

fn print_validation_result(result: &ValidationResult, strict: bool) -> Result<()> {
    println!("\n=== 验证结果 ===");

    for e in &result.errors {
        println!("  ✗ 错误: {e}");
    }
    for w in &result.warnings {
        println!("  ⚠ 警告: {w}");
    }

    let passed = if strict { result.is_ok_strict() } else { result.is_ok() };
    if passed {
        println!("\n验证通过 ({} 个警告)", result.warnings.len());
        Ok(())
    } else if strict && result.is_ok() {
        bail!("严格模式: {} 个警告视为错误", result.warnings.len())
    } else {
        bail!("验证失败: {} 个错误", result.errors.len())
    }
}
