// crates/ft_calibration/src/report.rs

//! 完整校准流程
//!
//! 网格搜索 → 最优情景重新运行 → 匹配对 → 对数偏差交叉验证 → 风险分级验证，
//! 汇总为一份可序列化的 [`CalibrationReport`]。

use crate::correction::{cross_validate, CrossValidationReport};
use crate::error::{CalibrationError, CalibrationResult};
use crate::grid::{grid_search, match_index, GridSearchConfig, GridSearchReport};
use crate::matching::{build_pairs, MatchedPair};
use crate::metrics::CalibrationMetrics;
use crate::observation::{LabParseConfig, Observation};
use crate::tiers::{validate_tiers, TierMode, TierThresholds, TierValidation};
use ft_config::{ConcentrationUnit, PollutantKind, Scenario};
use ft_foundation::DiagnosticLog;
use ft_transport::PipelineContext;
use serde::{Deserialize, Serialize};
use tracing::info;

/// 校准配置（`--grid` 文件）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// 网格搜索
    #[serde(default)]
    pub grid: GridSearchConfig,
    /// 交叉验证折数，小于 2 时不做交叉验证
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    /// 交叉验证随机种子
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// 分级阈值来源
    #[serde(default)]
    pub tier_mode: TierMode,
    /// 固定阈值
    #[serde(default)]
    pub thresholds: TierThresholds,
    /// 最高风险分位比例
    #[serde(default = "default_top_quantile")]
    pub top_quantile: f64,
    /// 实验室读数解析
    #[serde(default)]
    pub lab: LabParseConfig,
}

fn default_cv_folds() -> usize { 5 }
fn default_seed() -> u64 { 42 }
fn default_top_quantile() -> f64 { 0.2 }

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            grid: GridSearchConfig::default(),
            cv_folds: default_cv_folds(),
            seed: default_seed(),
            tier_mode: TierMode::default(),
            thresholds: TierThresholds::default(),
            top_quantile: default_top_quantile(),
            lab: LabParseConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// 参数检查
    pub fn validate(&self) -> CalibrationResult<()> {
        if !(self.top_quantile > 0.0 && self.top_quantile <= 1.0) {
            return Err(CalibrationError::invalid_parameter(
                "top_quantile",
                self.top_quantile,
                "必须位于 (0, 1]",
            ));
        }
        if !(self.lab.tntc_cap.is_finite() && self.lab.tntc_cap >= 0.0) {
            return Err(CalibrationError::invalid_parameter("tntc_cap", self.lab.tntc_cap, "必须为非负有限值"));
        }
        TierThresholds::new(self.thresholds.low_max, self.thresholds.medium_max)?;
        Ok(())
    }
}

/// 校准报告
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationReport {
    /// 基础情景名
    pub scenario_name: String,
    /// 污染物
    pub pollutant: PollutantKind,
    /// 浓度单位
    pub unit: ConcentrationUnit,
    /// 观测条数
    pub n_observations: usize,
    /// 读数缺失的观测条数
    pub n_missing_observations: usize,
    /// 参与指标的匹配对数
    pub n_matched: usize,
    /// 网格搜索结果
    pub grid: GridSearchReport,
    /// 最优情景（无有效网格点时为基础情景）
    pub best_scenario: Scenario,
    /// 最优情景下的指标
    pub metrics: CalibrationMetrics,
    /// 最优情景下的匹配对
    pub pairs: Vec<MatchedPair>,
    /// 对数偏差校正交叉验证
    pub correction: Option<CrossValidationReport>,
    /// 风险分级验证
    pub tiers: Option<TierValidation>,
    /// 诊断
    pub diagnostics: DiagnosticLog,
}

/// 执行完整校准
pub fn calibrate(
    ctx: &PipelineContext,
    base: &Scenario,
    observations: &[Observation],
    config: &CalibrationConfig,
) -> CalibrationResult<CalibrationReport> {
    config.validate()?;
    let grid = grid_search(ctx, base, observations, &config.grid)?;
    let best_scenario = match grid.best_result() {
        Some(best) => best.point.apply(base).with_name(format!("{}#best", base.name)),
        None => base.clone(),
    };

    let run = ctx.run(&best_scenario, None)?;
    let mut diagnostics = run.diagnostics;
    if grid.best.is_none() {
        diagnostics.notice("calibration", "没有网格点具备有效目标值，沿用基础情景");
    }

    let matches = match_index(ctx, observations, config.grid.max_match_distance_m);
    let pairs = build_pairs(&matches, observations, &run.receptors);
    let metrics = CalibrationMetrics::from_pairs(&pairs);
    let n_matched = metrics.n_pairs;

    let correction = if config.cv_folds < 2 {
        None
    } else {
        match cross_validate(&pairs, config.cv_folds, config.seed) {
            Ok(report) => Some(report),
            Err(CalibrationError::InsufficientData { required, actual }) => {
                diagnostics.skipped(
                    "log_bias_correction",
                    format!("完整匹配对 {actual} 个，少于 {required} 个，跳过交叉验证"),
                );
                None
            }
            Err(e) => return Err(e),
        }
    };

    let tiers = if n_matched == 0 {
        diagnostics.skipped("risk_tiers", "没有完整匹配对");
        None
    } else {
        let thresholds = match config.tier_mode {
            TierMode::Fixed => config.thresholds,
            TierMode::ObservedTerciles => {
                let observed: Vec<f64> = pairs.iter().filter(|p| p.is_complete()).filter_map(|p| p.observed).collect();
                match TierThresholds::from_observed_terciles(&observed) {
                    Ok(t) => t,
                    Err(_) => {
                        diagnostics.notice("risk_tiers", "观测不足以计算三分位数，使用固定阈值");
                        config.thresholds
                    }
                }
            }
        };
        Some(validate_tiers(&pairs, thresholds, config.top_quantile)?)
    };

    info!(
        "校准完成: {} 个观测, {} 个匹配对, log_rmse={:?}",
        observations.len(),
        n_matched,
        metrics.log_rmse
    );

    Ok(CalibrationReport {
        scenario_name: base.name.clone(),
        pollutant: run.pollutant,
        unit: run.unit,
        n_observations: observations.len(),
        n_missing_observations: observations.iter().filter(|o| o.value.is_none()).count(),
        n_matched,
        grid,
        best_scenario,
        metrics,
        pairs,
        correction,
        tiers,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_config::ContainmentCategory;

    #[test]
    fn test_config_from_toml() {
        let text = r#"
            cv_folds = 3
            seed = 7
            tier_mode = "observed_terciles"

            [grid]
            objective = "maximize_spearman"
            parallel = false

            [grid.axes]
            decay_per_meter = [0.001, 0.003]
        "#;
        let cfg: CalibrationConfig = toml::from_str(text).unwrap();
        assert_eq!(cfg.cv_folds, 3);
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.tier_mode, TierMode::ObservedTerciles);
        assert!(!cfg.grid.parallel);
        assert_eq!(cfg.grid.axes.decay_per_meter, vec![0.001, 0.003]);
        assert_eq!(cfg.top_quantile, 0.2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_config_json_roundtrip_with_efficiency_axis() {
        let text = r#"{
            "cv_folds": 4,
            "grid": {
                "axes": {"efficiencies": {"pit_latrine": [0.1, 0.5], "septic_tank": [0.4]}},
                "max_match_distance_m": 250.0
            },
            "thresholds": {"low_max": 2.0, "medium_max": 20.0}
        }"#;
        let cfg: CalibrationConfig = serde_json::from_str(text).unwrap();
        assert_eq!(cfg.grid.axes.efficiencies[&ContainmentCategory::PitLatrine], vec![0.1, 0.5]);
        assert_eq!(cfg.grid.axes.len(), 2);
        assert_eq!(cfg.grid.max_match_distance_m, Some(250.0));
        assert!(cfg.grid.parallel);
        assert_eq!(cfg.seed, 42);

        let back: CalibrationConfig = serde_json::from_str(&serde_json::to_string(&cfg).unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_config_rejects_bad_quantile() {
        let cfg = CalibrationConfig {
            top_quantile: 1.5,
            ..CalibrationConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
