// crates/ft_transport/src/pollutant.rs

//! 污染物负荷策略
//!
//! 污染物在管线构建时选定一次（[`model_for`]），运输与汇总阶段
//! 只通过 [`PollutantModel`] 取得负荷，不再区分污染物类型。
//!
//! | 污染物 | 排放 | 效率来源 | 衰减 |
//! |--------|------|----------|------|
//! | FIO | 情景排放常数 [CFU/person/day] | LRV > 行级 > 情景表 | 是 |
//! | 氮 | 人均排泄 [kg/person/yr] ÷ 365 | 类别去除率 | 否 |
//! | 磷 | 人均排泄 [kg/person/yr] ÷ 365 | 类别去除率 | 否 |

use crate::load::{efficiency_from_lrv, evaluate_load, LoadOutcome};
use crate::model::{SourceRecord, SourceTable};
use ft_config::{ContainmentCategory, PollutantKind, Scenario};
use ft_foundation::DiagnosticLog;

/// 一年的天数
pub const DAYS_PER_YEAR: f64 = 365.0;

/// 污染物负荷策略
pub trait PollutantModel: Send + Sync {
    /// 污染物类型
    fn kind(&self) -> PollutantKind;

    /// 人均日排放 [单位/person/day]
    fn emission_rate(&self, scenario: &Scenario) -> f64;

    /// 类别默认效率（未截断）
    fn default_efficiency(&self, scenario: &Scenario, category: ContainmentCategory) -> f64;

    /// 是否随距离/时间衰减
    fn decays(&self) -> bool;

    /// 负荷单位标签
    fn load_unit(&self) -> &'static str;

    /// 记录的原始效率（截断前）
    fn resolve_efficiency(&self, record: &SourceRecord, scenario: &Scenario) -> f64 {
        self.default_efficiency(scenario, record.category)
    }

    /// 计算单源负荷
    fn compute_load(&self, record: &SourceRecord, scenario: &Scenario) -> LoadOutcome {
        evaluate_load(
            record.population,
            self.emission_rate(scenario),
            self.resolve_efficiency(record, scenario),
        )
    }
}

/// 根据污染物类型选择策略
pub fn model_for(kind: PollutantKind) -> Box<dyn PollutantModel> {
    match kind {
        PollutantKind::Fio => Box::new(FioModel),
        PollutantKind::Nitrogen | PollutantKind::Phosphorus => Box::new(NutrientModel { kind }),
    }
}

/// 批量计算整张源表的负荷，截断记录为诊断
pub fn compute_loads(
    model: &dyn PollutantModel,
    sources: &SourceTable,
    scenario: &Scenario,
    diagnostics: &mut DiagnosticLog,
) -> Vec<LoadOutcome> {
    sources
        .iter()
        .enumerate()
        .map(|(row, record)| {
            let out = model.compute_load(record, scenario);
            if let Some(eta) = out.efficiency_clamped_from {
                diagnostics.clamped("sources", row, "efficiency", eta, out.efficiency);
            }
            if let Some(p) = out.population_clamped_from {
                diagnostics.clamped("sources", row, "population", p, 0.0);
            }
            out
        })
        .collect()
}

// ============================================================================
// FIO
// ============================================================================

/// 粪便指示菌负荷模型
#[derive(Debug, Clone, Copy, Default)]
pub struct FioModel;

impl PollutantModel for FioModel {
    fn kind(&self) -> PollutantKind {
        PollutantKind::Fio
    }

    fn emission_rate(&self, scenario: &Scenario) -> f64 {
        scenario.emission_rate
    }

    fn default_efficiency(&self, scenario: &Scenario, category: ContainmentCategory) -> f64 {
        scenario.efficiency_for(category)
    }

    fn decays(&self) -> bool {
        true
    }

    fn load_unit(&self) -> &'static str {
        "CFU/day"
    }

    fn resolve_efficiency(&self, record: &SourceRecord, scenario: &Scenario) -> f64 {
        if let Some(&eta) = scenario.calibrated_efficiencies.get(&record.category) {
            return eta;
        }
        match (record.lrv, record.efficiency) {
            (Some(lrv), _) if lrv.is_finite() => efficiency_from_lrv(lrv),
            (_, Some(eta)) => eta,
            _ => self.default_efficiency(scenario, record.category),
        }
    }
}

// ============================================================================
// 营养物
// ============================================================================

/// 氮/磷负荷模型（保守输运）
#[derive(Debug, Clone, Copy)]
pub struct NutrientModel {
    kind: PollutantKind,
}

impl PollutantModel for NutrientModel {
    fn kind(&self) -> PollutantKind {
        self.kind
    }

    fn emission_rate(&self, scenario: &Scenario) -> f64 {
        let per_year = match self.kind {
            PollutantKind::Phosphorus => scenario.nutrients.phosphorus_kg_per_person_year,
            _ => scenario.nutrients.nitrogen_kg_per_person_year,
        };
        per_year / DAYS_PER_YEAR
    }

    fn default_efficiency(&self, scenario: &Scenario, category: ContainmentCategory) -> f64 {
        let table = match self.kind {
            PollutantKind::Phosphorus => &scenario.nutrients.phosphorus_removal,
            _ => &scenario.nutrients.nitrogen_removal,
        };
        table.get(&category).copied().unwrap_or(0.0)
    }

    fn decays(&self) -> bool {
        false
    }

    fn load_unit(&self) -> &'static str {
        "kg/day"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_geo::Point2D;

    fn pit(pop: f64) -> SourceRecord {
        SourceRecord::new("S1", Point2D::ZERO_LONLAT, pop, ContainmentCategory::PitLatrine)
    }

    #[test]
    fn test_fio_efficiency_priority() {
        let scenario = Scenario::default();
        let fio = model_for(PollutantKind::Fio);

        let base = fio.compute_load(&pit(10.0), &scenario);
        assert!((base.efficiency - 0.3).abs() < 1e-12);

        let explicit = fio.compute_load(&pit(10.0).with_efficiency(0.6), &scenario);
        assert!((explicit.efficiency - 0.6).abs() < 1e-12);

        let lrv = fio.compute_load(&pit(10.0).with_efficiency(0.6).with_lrv(2.0), &scenario);
        assert!((lrv.efficiency - 0.99).abs() < 1e-12);

        // 校准强制效率高于行级 LRV 与效率
        let calibrated = scenario.with_calibrated_efficiency(ContainmentCategory::PitLatrine, 0.7);
        let forced = fio.compute_load(&pit(10.0).with_efficiency(0.6).with_lrv(2.0), &calibrated);
        assert!((forced.efficiency - 0.7).abs() < 1e-12);
        let other = SourceRecord::new("S2", Point2D::ZERO_LONLAT, 10.0, ContainmentCategory::SepticTank)
            .with_efficiency(0.6);
        assert!((fio.compute_load(&other, &calibrated).efficiency - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_batch_records_clamps() {
        let scenario = Scenario::default();
        let table = SourceTable::new(vec![pit(10.0).with_efficiency(1.4), pit(5.0)]);
        let mut diag = DiagnosticLog::new();
        let loads = compute_loads(&FioModel, &table, &scenario, &mut diag);
        assert_eq!(loads[0].load, 0.0);
        assert!(loads[1].load > 0.0);
        assert_eq!(diag.count(ft_foundation::DiagnosticKind::Clamped), 1);
    }

    #[test]
    fn test_nutrients_do_not_decay() {
        let scenario = Scenario::default();
        let n = model_for(PollutantKind::Nitrogen);
        assert!(!n.decays());
        assert_eq!(n.kind(), PollutantKind::Nitrogen);

        let out = n.compute_load(&pit(365.0), &scenario);
        // 365 人 × 4.5 kg/yr ÷ 365 × (1 − 0.1)
        assert!((out.load - 4.5 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_phosphorus_uses_own_table() {
        let scenario = Scenario::default();
        let p = model_for(PollutantKind::Phosphorus);
        let out = p.compute_load(&pit(365.0), &scenario);
        assert!((out.load - 0.6 * 0.7).abs() < 1e-9);
        assert_eq!(p.load_unit(), "kg/day");
    }
}
