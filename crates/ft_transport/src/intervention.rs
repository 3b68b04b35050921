// crates/ft_transport/src/intervention.rs

//! 情景干预变换
//!
//! 将情景施加到源表，得到新的源表。行数不减少（除人口归零的行），
//! 总人口只随情景的人口乘数变化。
//!
//! # 步骤
//!
//! 1. 人口缩放：每行人口乘以 `population_factor`，负值截断为 0
//! 2. 干预计划（[`Scenario::intervention_plan`]）逐步执行
//!    - 转换规则按比例拆分：被选中行保留 `(1 − X/100)`，
//!      新行获得 `X/100` 并改为目标类别，追加到表尾
//!    - 效率替换原地修改
//!    - 每步结束后删除人口 ≤ 0 的行
//! 3. 定向干预：基线高风险受体半径内的源整体原地升级，不拆分
//!
//! 定向干预依赖上一次运行的结果，基线以 [`BaselineSnapshot`]
//! 显式传入；缺少基线时记录诊断并跳过，其余步骤照常执行。

use crate::model::{SourceRecord, SourceTable};
use ft_config::{ContainmentCategory, ConversionRule, InterventionStep, Scenario, TargetedIntervention};
use ft_foundation::{DiagnosticKind, DiagnosticLog, FtError, FtResult};
use ft_geo::{GeoIndex, Point2D};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// 基线快照
// ============================================================================

/// 基线中的单个受体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineReceptor {
    /// 受体 ID
    pub receptor_id: String,
    /// 位置
    pub location: Point2D,
    /// 基线浓度
    pub concentration: f64,
}

/// 上一次运行的受体浓度快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    /// 受体列表
    pub receptors: Vec<BaselineReceptor>,
}

impl BaselineSnapshot {
    /// 创建快照
    pub fn new(receptors: Vec<BaselineReceptor>) -> Self {
        Self { receptors }
    }

    /// 从运行结果生成快照
    pub fn from_results(results: &[crate::model::ReceptorResult]) -> Self {
        Self {
            receptors: results
                .iter()
                .map(|r| BaselineReceptor {
                    receptor_id: r.receptor_id.clone(),
                    location: r.location,
                    concentration: r.concentration,
                })
                .collect(),
        }
    }

    /// 浓度最高的前 `percent`% 受体
    ///
    /// 数量向上取整，至少 1 个（快照非空时）。浓度相同时按 ID 排序。
    pub fn top_percent(&self, percent: f64) -> Vec<&BaselineReceptor> {
        if self.receptors.is_empty() || percent <= 0.0 {
            return Vec::new();
        }
        let mut ranked: Vec<&BaselineReceptor> = self
            .receptors
            .iter()
            .filter(|r| r.concentration.is_finite())
            .collect();
        ranked.sort_by(|a, b| {
            b.concentration
                .total_cmp(&a.concentration)
                .then_with(|| a.receptor_id.cmp(&b.receptor_id))
        });
        let n = ((ranked.len() as f64) * percent.min(100.0) / 100.0).ceil() as usize;
        ranked.truncate(n.max(1));
        ranked
    }
}

// ============================================================================
// 变换报告
// ============================================================================

/// 单个干预步骤的摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSummary {
    /// 步骤名称
    pub label: String,
    /// 受影响的行数
    pub rows_affected: usize,
    /// 转移的人口
    pub population_moved: f64,
}

/// 干预变换报告
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterventionReport {
    /// 各步骤摘要
    pub steps: Vec<StepSummary>,
    /// 因人口归零删除的行数
    pub rows_dropped: usize,
    /// 定向干预升级的源数量（未执行为 `None`）
    pub targeted_upgrades: Option<usize>,
}

// ============================================================================
// 变换
// ============================================================================

/// 施加情景，返回新的源表与报告
pub fn apply_scenario(
    sources: &SourceTable,
    scenario: &Scenario,
    baseline: Option<&BaselineSnapshot>,
    diagnostics: &mut DiagnosticLog,
) -> (SourceTable, InterventionReport) {
    let mut report = InterventionReport::default();
    let mut records = scale_population(sources, scenario.population_factor, diagnostics);

    for step in scenario.intervention_plan() {
        let summary = match step {
            InterventionStep::Convert { label, rule } => {
                let (rows, moved) = split_convert(&mut records, &rule);
                StepSummary {
                    label,
                    rows_affected: rows,
                    population_moved: moved,
                }
            }
            InterventionStep::SetEfficiency {
                label,
                category,
                efficiency,
            } => StepSummary {
                label,
                rows_affected: set_efficiency(&mut records, category, efficiency),
                population_moved: 0.0,
            },
        };
        debug!(
            "干预步骤 {}: {} 行, 转移人口 {:.3}",
            summary.label, summary.rows_affected, summary.population_moved
        );
        report.steps.push(summary);
        report.rows_dropped += drop_empty_rows(&mut records);
    }

    let mut table = SourceTable::from_transformed(records);

    if let Some(targeted) = &scenario.targeted {
        match baseline {
            Some(snapshot) => {
                let n = apply_targeted(&mut table, targeted, snapshot);
                info!("定向干预: {} 个源升级为 {}", n, targeted.upgrade_to);
                report.targeted_upgrades = Some(n);
            }
            None => diagnostics.skipped("targeted_intervention", "未提供基线快照，跳过定向干预"),
        }
    }

    (table, report)
}

fn scale_population(
    sources: &SourceTable,
    factor: f64,
    diagnostics: &mut DiagnosticLog,
) -> Vec<SourceRecord> {
    sources
        .iter()
        .enumerate()
        .map(|(row, r)| {
            let mut r = r.clone();
            if !(r.population.is_finite() && r.population >= 0.0) {
                diagnostics.clamped("sources", row, "population", r.population, 0.0);
                r.population = 0.0;
            }
            r.population *= factor;
            r
        })
        .collect()
}

/// 按比例拆分，返回 `(被拆分行数, 转移人口)`
fn split_convert(records: &mut Vec<SourceRecord>, rule: &ConversionRule) -> (usize, f64) {
    let fraction = (rule.percent / 100.0).clamp(0.0, 1.0);
    if fraction <= 0.0 {
        return (0, 0.0);
    }

    let selected: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.category == rule.from && r.population > 0.0)
        .map(|(i, _)| i)
        .collect();

    let mut moved = ft_foundation::KahanSum::new();
    let mut children = Vec::with_capacity(selected.len());
    for &i in &selected {
        let parent = &mut records[i];
        let share = parent.population * fraction;
        moved.add(share);
        children.push(SourceRecord {
            id: parent.id.clone(),
            location: parent.location,
            population: share,
            category: rule.to,
            efficiency: rule.efficiency,
            lrv: None,
            origin: parent.origin,
            parent: Some(i),
        });
        parent.population -= share;
    }
    records.extend(children);
    (selected.len(), moved.value())
}

fn set_efficiency(records: &mut [SourceRecord], category: ContainmentCategory, efficiency: f64) -> usize {
    let mut n = 0;
    for r in records.iter_mut().filter(|r| r.category == category) {
        r.efficiency = Some(efficiency);
        r.lrv = None;
        n += 1;
    }
    n
}

/// 删除人口 ≤ 0 的行，并把 `parent` 重新指向仍存在的最近祖先
fn drop_empty_rows(records: &mut Vec<SourceRecord>) -> usize {
    if records.iter().all(|r| r.population > 0.0) {
        return 0;
    }
    // 父行总在子行之前，一次正向遍历即可解析祖先
    let mut remap: Vec<Option<usize>> = Vec::with_capacity(records.len());
    let mut next = 0usize;
    for r in records.iter() {
        if r.population > 0.0 {
            remap.push(Some(next));
            next += 1;
        } else {
            let ancestor = r.parent.and_then(|p| remap[p]);
            remap.push(ancestor);
        }
    }

    let before = records.len();
    let old = std::mem::take(records);
    records.extend(old.into_iter().filter(|r| r.population > 0.0).map(|mut r| {
        r.parent = r.parent.and_then(|p| remap[p]);
        r
    }));
    before - records.len()
}

/// 定向干预，返回升级的源数量
fn apply_targeted(
    table: &mut SourceTable,
    targeted: &TargetedIntervention,
    baseline: &BaselineSnapshot,
) -> usize {
    let hotspots = baseline.top_percent(targeted.top_percent);
    if hotspots.is_empty() {
        return 0;
    }
    let index = GeoIndex::bulk_load(hotspots.iter().map(|r| (r.location, ())).collect());

    let mut n = 0;
    for r in table.records_mut() {
        if !index.within_radius(&r.location, targeted.radius_m).is_empty() {
            r.category = targeted.upgrade_to;
            r.efficiency = targeted.efficiency;
            r.lrv = None;
            n += 1;
        }
    }
    n
}

// ============================================================================
// 质量守恒检查
// ============================================================================

/// 检查每个原始行的人口守恒
///
/// 对每个原始行 `i`，变换后所有 `origin == i` 的行人口之和
/// 应等于 `max(p_i, 0) · factor`（相对容差 `tol`）。
pub fn check_mass_conservation(
    original: &SourceTable,
    transformed: &SourceTable,
    factor: f64,
    tol: f64,
) -> FtResult<()> {
    let sums = transformed.population_by_origin(original.len());
    for (i, (r, actual)) in original.iter().zip(sums).enumerate() {
        let p = if r.population.is_finite() { r.population.max(0.0) } else { 0.0 };
        let expected = p * factor;
        let scale = expected.abs().max(1.0);
        if (actual - expected).abs() > tol * scale {
            return Err(FtError::internal(format!(
                "源 {} (原始行 {i}) 人口不守恒: 期望 {expected}, 实际 {actual}",
                r.id
            )));
        }
    }
    Ok(())
}

/// 诊断中是否记录了被跳过的定向干预
pub fn targeted_was_skipped(diagnostics: &DiagnosticLog) -> bool {
    diagnostics
        .entries()
        .iter()
        .any(|d| d.kind == DiagnosticKind::Skipped && d.context == "targeted_intervention")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_config::InterventionKnobs;

    fn table() -> SourceTable {
        SourceTable::new(vec![
            SourceRecord::new("A", Point2D::from_lonlat(39.20, -6.20), 100.0, ContainmentCategory::OpenDefecation),
            SourceRecord::new("B", Point2D::from_lonlat(39.21, -6.20), 50.0, ContainmentCategory::PitLatrine),
            SourceRecord::new("C", Point2D::from_lonlat(39.22, -6.20), 80.0, ContainmentCategory::SepticTank),
        ])
    }

    #[test]
    fn test_split_creates_child_rows() {
        let mut s = Scenario::default();
        s.conversions.push(ConversionRule {
            from: ContainmentCategory::OpenDefecation,
            to: ContainmentCategory::SepticTank,
            percent: 30.0,
            efficiency: Some(0.6),
        });
        let mut diag = DiagnosticLog::new();
        let (out, report) = apply_scenario(&table(), &s, None, &mut diag);

        assert_eq!(out.len(), 4);
        let child = &out.records()[3];
        assert_eq!(child.id, "A");
        assert_eq!(child.category, ContainmentCategory::SepticTank);
        assert_eq!(child.efficiency, Some(0.6));
        assert_eq!(child.parent, Some(0));
        assert!((child.population - 30.0).abs() < 1e-12);
        assert!((out.records()[0].population - 70.0).abs() < 1e-12);
        assert_eq!(report.steps[0].rows_affected, 1);
        assert!(check_mass_conservation(&table(), &out, 1.0, 1e-12).is_ok());
    }

    #[test]
    fn test_full_conversion_drops_empty_original() {
        let mut s = Scenario::default();
        s.interventions.open_defecation_reduction_percent = 100.0;
        let mut diag = DiagnosticLog::new();
        let (out, report) = apply_scenario(&table(), &s, None, &mut diag);

        assert_eq!(out.len(), 3);
        assert_eq!(report.rows_dropped, 1);
        assert!(out.iter().all(|r| r.category != ContainmentCategory::OpenDefecation));
        // 原行被删除后，子行不再指向不存在的父行
        let child = out.iter().find(|r| r.id == "A").unwrap();
        assert_eq!(child.parent, None);
        assert_eq!(child.origin, 0);
    }

    #[test]
    fn test_chained_knobs_conserve_population() {
        let mut s = Scenario::default();
        s.population_factor = 1.5;
        s.interventions = InterventionKnobs {
            open_defecation_reduction_percent: 40.0,
            infrastructure_upgrade_percent: 50.0,
            fecal_sludge_treatment_percent: 25.0,
            fecal_sludge_efficiency: Some(0.9),
            centralized_treatment_efficiency: Some(0.99),
        };
        let mut diag = DiagnosticLog::new();
        let original = table();
        let (out, _) = apply_scenario(&original, &s, None, &mut diag);

        assert!(check_mass_conservation(&original, &out, 1.5, 1e-12).is_ok());
        assert!((out.total_population() - 230.0 * 1.5).abs() < 1e-9);
        // 坑厕升级作用于露天排放转换产生的新行
        let pit_from_a: f64 = out
            .iter()
            .filter(|r| r.id == "A" && r.category == ContainmentCategory::PitLatrine)
            .map(|r| r.population)
            .sum();
        assert!((pit_from_a - 150.0 * 0.4 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_targeted_without_baseline_is_skipped() {
        let mut s = Scenario::default();
        s.targeted = Some(TargetedIntervention {
            top_percent: 10.0,
            radius_m: 500.0,
            upgrade_to: ContainmentCategory::Sewered,
            efficiency: None,
        });
        let mut diag = DiagnosticLog::new();
        let (out, report) = apply_scenario(&table(), &s, None, &mut diag);
        assert_eq!(out.len(), 3);
        assert!(report.targeted_upgrades.is_none());
        assert!(targeted_was_skipped(&diag));
    }

    #[test]
    fn test_targeted_upgrades_sources_near_hotspot() {
        let mut s = Scenario::default();
        s.targeted = Some(TargetedIntervention {
            top_percent: 50.0,
            radius_m: 200.0,
            upgrade_to: ContainmentCategory::Sewered,
            efficiency: Some(0.97),
        });
        let baseline = BaselineSnapshot::new(vec![
            BaselineReceptor {
                receptor_id: "W1".into(),
                location: Point2D::from_lonlat(39.2001, -6.2),
                concentration: 900.0,
            },
            BaselineReceptor {
                receptor_id: "W2".into(),
                location: Point2D::from_lonlat(39.2201, -6.2),
                concentration: 5.0,
            },
        ]);
        let mut diag = DiagnosticLog::new();
        let (out, report) = apply_scenario(&table(), &s, Some(&baseline), &mut diag);

        assert_eq!(report.targeted_upgrades, Some(1));
        assert_eq!(out.records()[0].category, ContainmentCategory::Sewered);
        assert_eq!(out.records()[0].efficiency, Some(0.97));
        assert_eq!(out.records()[2].category, ContainmentCategory::SepticTank);
        assert!(check_mass_conservation(&table(), &out, 1.0, 1e-12).is_ok());
    }

    #[test]
    fn test_negative_population_clamped() {
        let t = SourceTable::new(vec![SourceRecord::new(
            "N",
            Point2D::ZERO_LONLAT,
            -3.0,
            ContainmentCategory::PitLatrine,
        )]);
        let mut diag = DiagnosticLog::new();
        let (out, _) = apply_scenario(&t, &Scenario::default(), None, &mut diag);
        assert_eq!(out.records()[0].population, 0.0);
        assert_eq!(diag.count(DiagnosticKind::Clamped), 1);
    }

    #[test]
    fn test_top_percent_rounds_up() {
        let snap = BaselineSnapshot::new(
            (0..10)
                .map(|i| BaselineReceptor {
                    receptor_id: format!("W{i}"),
                    location: Point2D::ZERO_LONLAT,
                    concentration: i as f64,
                })
                .collect(),
        );
        let top = snap.top_percent(15.0);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].receptor_id, "W9");
        assert_eq!(snap.top_percent(0.1).len(), 1);
    }
}
