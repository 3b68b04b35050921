// crates/ft_calibration/src/grid.rs

//! 参数网格搜索
//!
//! 在 `decay_per_meter × emission_scale × 各类别效率` 的笛卡尔网格上
//! 逐点运行完整管线，计算指标，按目标选出最优点。
//! 全部网格结果都保留在报告中。
//!
//! 网格点之间互相独立，可用 rayon 并行评估；结果按网格顺序收集，
//! 最优点的选择与是否并行无关。目标值相同时保留较早的点。

use crate::error::{CalibrationError, CalibrationResult};
use crate::matching::{build_pairs, nearest_receptors, MatchIndex};
use crate::metrics::CalibrationMetrics;
use crate::observation::Observation;
use ft_config::{ContainmentCategory, Scenario};
use ft_geo::Point2D;
use ft_transport::PipelineContext;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

// ============================================================================
// 网格定义
// ============================================================================

/// 网格各轴取值；空轴表示沿用基础情景的值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridAxes {
    /// 距离衰减常数 [1/m]
    #[serde(default)]
    pub decay_per_meter: Vec<f64>,
    /// 排放常数缩放系数
    #[serde(default)]
    pub emission_scale: Vec<f64>,
    /// 各类别效率
    #[serde(default)]
    pub efficiencies: BTreeMap<ContainmentCategory, Vec<f64>>,
}

/// 单个网格点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPoint {
    /// 距离衰减常数
    pub decay_per_meter: f64,
    /// 排放缩放
    pub emission_scale: f64,
    /// 被网格覆盖的类别效率
    pub efficiencies: BTreeMap<ContainmentCategory, f64>,
}

impl GridPoint {
    /// 由基础情景派生该点的情景
    ///
    /// 网格效率写入 `calibrated_efficiencies`，对该类别的每一行都生效，
    /// 包括带行级效率或 LRV 的行。
    pub fn apply(&self, base: &Scenario) -> Scenario {
        let mut s = base
            .with_decay_per_meter(self.decay_per_meter)
            .with_emission_scale(self.emission_scale);
        for (&cat, &eta) in &self.efficiencies {
            s.calibrated_efficiencies.insert(cat, eta);
        }
        s
    }
}

impl GridAxes {
    fn validate(&self) -> CalibrationResult<()> {
        for &k in &self.decay_per_meter {
            if !(k.is_finite() && k >= 0.0) {
                return Err(CalibrationError::invalid_parameter("decay_per_meter", k, "必须为非负有限值"));
            }
        }
        for &s in &self.emission_scale {
            if !(s.is_finite() && s >= 0.0) {
                return Err(CalibrationError::invalid_parameter("emission_scale", s, "必须为非负有限值"));
            }
        }
        for values in self.efficiencies.values() {
            if let Some(&e) = values.iter().find(|e| !e.is_finite()) {
                return Err(CalibrationError::invalid_parameter("efficiencies", e, "必须为有限值"));
            }
        }
        Ok(())
    }

    /// 网格点数
    pub fn len(&self) -> usize {
        let axis = |n: usize| n.max(1);
        axis(self.decay_per_meter.len())
            * axis(self.emission_scale.len())
            * self.efficiencies.values().map(|v| axis(v.len())).product::<usize>()
    }

    /// 是否所有轴都为空（只评估基础情景）
    pub fn is_empty(&self) -> bool {
        self.decay_per_meter.is_empty()
            && self.emission_scale.is_empty()
            && self.efficiencies.values().all(Vec::is_empty)
    }

    /// 按固定顺序展开网格点：衰减为最外层，其后为排放缩放和类别效率
    pub fn points(&self, base: &Scenario) -> Vec<GridPoint> {
        let decays = if self.decay_per_meter.is_empty() {
            vec![base.decay.per_meter]
        } else {
            self.decay_per_meter.clone()
        };
        let scales = if self.emission_scale.is_empty() {
            vec![1.0]
        } else {
            self.emission_scale.clone()
        };

        let mut combos: Vec<BTreeMap<ContainmentCategory, f64>> = vec![BTreeMap::new()];
        for (&cat, values) in self.efficiencies.iter().filter(|(_, v)| !v.is_empty()) {
            combos = combos
                .into_iter()
                .flat_map(|combo| {
                    values.iter().map(move |&eta| {
                        let mut c = combo.clone();
                        c.insert(cat, eta);
                        c
                    })
                })
                .collect();
        }

        let mut points = Vec::with_capacity(decays.len() * scales.len() * combos.len());
        for &d in &decays {
            for &s in &scales {
                for combo in &combos {
                    points.push(GridPoint {
                        decay_per_meter: d,
                        emission_scale: s,
                        efficiencies: combo.clone(),
                    });
                }
            }
        }
        points
    }
}

// ============================================================================
// 目标
// ============================================================================

/// 优化目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// 最小化对数空间 RMSE
    #[default]
    MinimizeLogRmse,
    /// 最大化 Spearman 秩相关
    MaximizeSpearman,
    /// 最大化 Kendall τ-b
    MaximizeKendall,
}

impl Objective {
    /// 该目标关注的指标值
    pub fn value(self, metrics: &CalibrationMetrics) -> Option<f64> {
        match self {
            Self::MinimizeLogRmse => metrics.log_rmse,
            Self::MaximizeSpearman => metrics.spearman,
            Self::MaximizeKendall => metrics.kendall,
        }
        .filter(|v| v.is_finite())
    }

    /// `a` 是否严格优于 `b`
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Self::MinimizeLogRmse => a < b,
            Self::MaximizeSpearman | Self::MaximizeKendall => a > b,
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MinimizeLogRmse => "minimize_log_rmse",
            Self::MaximizeSpearman => "maximize_spearman",
            Self::MaximizeKendall => "maximize_kendall",
        };
        f.write_str(s)
    }
}

impl FromStr for Objective {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log_rmse" | "rmse" | "minimize_log_rmse" => Ok(Self::MinimizeLogRmse),
            "spearman" | "maximize_spearman" => Ok(Self::MaximizeSpearman),
            "kendall" | "maximize_kendall" => Ok(Self::MaximizeKendall),
            other => Err(CalibrationError::invalid_parameter(
                "objective",
                other,
                "可选 log_rmse / spearman / kendall",
            )),
        }
    }
}

// ============================================================================
// 搜索
// ============================================================================

/// 网格搜索配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchConfig {
    /// 网格轴
    #[serde(default)]
    pub axes: GridAxes,
    /// 优化目标
    #[serde(default)]
    pub objective: Objective,
    /// 是否并行评估网格点
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// 最大匹配距离 [m]，超出的匹配对不参与指标
    #[serde(default)]
    pub max_match_distance_m: Option<f64>,
}

fn default_parallel() -> bool { true }

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            axes: GridAxes::default(),
            objective: Objective::default(),
            parallel: default_parallel(),
            max_match_distance_m: None,
        }
    }
}

/// 单个网格点的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridResult {
    /// 网格序号
    pub index: usize,
    /// 参数
    pub point: GridPoint,
    /// 指标
    pub metrics: CalibrationMetrics,
}

/// 网格搜索报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSearchReport {
    /// 目标
    pub objective: Objective,
    /// 全部网格结果（网格顺序）
    pub results: Vec<GridResult>,
    /// 最优点序号（没有任何点具备有效目标值时为 `None`）
    pub best: Option<usize>,
}

impl GridSearchReport {
    /// 最优结果
    pub fn best_result(&self) -> Option<&GridResult> {
        self.best.and_then(|i| self.results.get(i))
    }
}

/// 观测与受体的匹配索引，按最大距离过滤
pub fn match_index(
    ctx: &PipelineContext,
    observations: &[Observation],
    max_match_distance_m: Option<f64>,
) -> Vec<MatchIndex> {
    let locations: Vec<Point2D> = ctx.receptors().iter().map(|r| r.location).collect();
    let mut matches = nearest_receptors(observations, &locations);
    if let Some(max_d) = max_match_distance_m {
        matches.retain(|m| m.distance_m <= max_d);
    }
    matches
}

/// 执行网格搜索
pub fn grid_search(
    ctx: &PipelineContext,
    base: &Scenario,
    observations: &[Observation],
    config: &GridSearchConfig,
) -> CalibrationResult<GridSearchReport> {
    config.axes.validate()?;
    let points = config.axes.points(base);
    let matches = match_index(ctx, observations, config.max_match_distance_m);
    info!(
        "网格搜索: {} 个网格点, {} 个匹配观测, 目标 {}",
        points.len(),
        matches.len(),
        config.objective
    );

    let evaluate = |(index, point): (usize, &GridPoint)| -> CalibrationResult<GridResult> {
        let scenario = point.apply(base).with_name(format!("{}#{index}", base.name));
        let receptors = ctx.concentrations(&scenario)?;
        let pairs = build_pairs(&matches, observations, &receptors);
        let metrics = CalibrationMetrics::from_pairs(&pairs);
        debug!("网格点 {index}: log_rmse={:?} spearman={:?}", metrics.log_rmse, metrics.spearman);
        Ok(GridResult {
            index,
            point: point.clone(),
            metrics,
        })
    };

    let results: Vec<GridResult> = if config.parallel {
        points.par_iter().enumerate().map(&evaluate).collect::<CalibrationResult<_>>()?
    } else {
        points.iter().enumerate().map(&evaluate).collect::<CalibrationResult<_>>()?
    };

    let best = select_best(&results, config.objective);
    if let Some(b) = best.and_then(|i| results.get(i)) {
        info!(
            "最优网格点 {}: decay_per_meter={} emission_scale={} {}={:?}",
            b.index,
            b.point.decay_per_meter,
            b.point.emission_scale,
            config.objective,
            config.objective.value(&b.metrics)
        );
    }

    Ok(GridSearchReport {
        objective: config.objective,
        results,
        best,
    })
}

/// 选出最优点：至少一个匹配对且目标值有效，相同时取较早者
pub fn select_best(results: &[GridResult], objective: Objective) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, r) in results.iter().enumerate() {
        if r.metrics.n_pairs == 0 {
            continue;
        }
        let Some(v) = objective.value(&r.metrics) else {
            continue;
        };
        match best {
            Some((_, bv)) if !objective.is_better(v, bv) => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_order_and_count() {
        let axes = GridAxes {
            decay_per_meter: vec![0.001, 0.01],
            emission_scale: vec![0.5, 1.0, 2.0],
            efficiencies: BTreeMap::from([(ContainmentCategory::PitLatrine, vec![0.2, 0.4])]),
        };
        let pts = axes.points(&Scenario::default());
        assert_eq!(pts.len(), 12);
        assert_eq!(axes.len(), 12);
        assert_eq!(pts[0].decay_per_meter, 0.001);
        assert_eq!(pts[0].efficiencies[&ContainmentCategory::PitLatrine], 0.2);
        assert_eq!(pts[1].efficiencies[&ContainmentCategory::PitLatrine], 0.4);
        assert_eq!(pts[2].emission_scale, 1.0);
        assert_eq!(pts[11].decay_per_meter, 0.01);
    }

    #[test]
    fn test_empty_axes_keep_base() {
        let base = Scenario::default().with_decay_per_meter(0.02);
        let axes = GridAxes::default();
        assert!(axes.is_empty());
        let pts = axes.points(&base);
        assert_eq!(pts.len(), 1);
        let s = pts[0].apply(&base);
        assert_eq!(s.decay.per_meter, 0.02);
        assert_eq!(s.emission_rate, base.emission_rate);
    }

    #[test]
    fn test_select_best_ties_keep_earliest() {
        let mk = |i: usize, rmse: f64, n: usize| GridResult {
            index: i,
            point: GridPoint {
                decay_per_meter: 0.0,
                emission_scale: 1.0,
                efficiencies: BTreeMap::new(),
            },
            metrics: CalibrationMetrics {
                n_pairs: n,
                log_rmse: Some(rmse),
                ..CalibrationMetrics::default()
            },
        };
        let results = vec![mk(0, 0.9, 3), mk(1, 0.1, 0), mk(2, 0.5, 3), mk(3, 0.5, 3)];
        assert_eq!(select_best(&results, Objective::MinimizeLogRmse), Some(2));
        assert_eq!(select_best(&results, Objective::MaximizeSpearman), None);
    }

    #[test]
    fn test_objective_parse() {
        assert_eq!("spearman".parse::<Objective>().unwrap(), Objective::MaximizeSpearman);
        assert!("r2".parse::<Objective>().is_err());
    }

    #[test]
    fn test_invalid_axis_rejected() {
        let axes = GridAxes {
            decay_per_meter: vec![-1.0],
            ..GridAxes::default()
        };
        assert!(axes.validate().is_err());
    }
}
