// crates/ft_transport/src/aggregator.rs

//! 受体浓度汇总
//!
//! ```text
//! C = Σ surviving_load / Q
//! score = clip(20 · log10(C + 1), 0, 100)
//! ```
//!
//! 内部浓度单位为 每升（负荷 /day ÷ 流量 L/day），输出时按情景的
//! 报告单位缩放；链接浓度与受体浓度使用同一缩放。
//! 没有任何链接的受体同样输出，负荷与浓度为 0。

use crate::model::{Link, Receptor, ReceptorResult};
use ft_config::{ConcentrationUnit, FlowDefaults, FlowUnit, Scenario};
use ft_foundation::{DiagnosticLog, KahanSum};
use serde::Serialize;

// ============================================================================
// 流量解析
// ============================================================================

/// 流量来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowSource {
    /// 实测值（原始单位）
    Measured(FlowUnit),
    /// 受体类型默认值（无任何测量）
    TypeDefault,
    /// 测量值无效，使用兜底值
    Fallback,
}

/// 解析受体流量 [L/day]
///
/// 依次尝试 L/day、m³/day、L/s、m³/s，取第一个有效（有限且为正）的值。
/// 没有任何测量时使用类型默认值；有测量但全部无效时使用兜底值。
pub fn resolve_flow(receptor: &Receptor, defaults: &FlowDefaults) -> (f64, FlowSource) {
    let f = &receptor.flow;
    let measured = [
        (f.liters_per_day, FlowUnit::LitersPerDay),
        (f.cubic_meters_per_day, FlowUnit::CubicMetersPerDay),
        (f.liters_per_second, FlowUnit::LitersPerSecond),
        (f.cubic_meters_per_second, FlowUnit::CubicMetersPerSecond),
    ];

    let mut any_present = false;
    for (value, unit) in measured {
        if let Some(v) = value {
            any_present = true;
            let q = unit.to_liters_per_day(v);
            if q.is_finite() && q > 0.0 {
                return (q, FlowSource::Measured(unit));
            }
        }
    }
    if any_present {
        (defaults.fallback, FlowSource::Fallback)
    } else {
        (defaults.for_type(receptor.kind), FlowSource::TypeDefault)
    }
}

// ============================================================================
// 风险评分
// ============================================================================

/// 风险评分 `clip(20·log10(C+1), 0, 100)`
///
/// 仅用于排序和展示，不是浓度单位。
#[inline]
pub fn risk_score(concentration: f64) -> f64 {
    if !concentration.is_finite() || concentration <= 0.0 {
        return 0.0;
    }
    (20.0 * (concentration + 1.0).log10()).clamp(0.0, 100.0)
}

// ============================================================================
// 汇总
// ============================================================================

/// 浓度汇总器
pub struct ConcentrationAggregator<'a> {
    flow_defaults: &'a FlowDefaults,
    unit: ConcentrationUnit,
}

impl<'a> ConcentrationAggregator<'a> {
    /// 从情景创建
    pub fn new(scenario: &'a Scenario) -> Self {
        Self {
            flow_defaults: &scenario.flow_defaults,
            unit: scenario.output_unit,
        }
    }

    /// 报告单位
    pub fn unit(&self) -> ConcentrationUnit {
        self.unit
    }

    /// 汇总链接，返回与 `receptors` 对齐的结果；同时填写每条链接的浓度
    pub fn aggregate(
        &self,
        receptors: &[Receptor],
        links: &mut [Link],
        diagnostics: &mut DiagnosticLog,
    ) -> Vec<ReceptorResult> {
        let flows: Vec<f64> = receptors
            .iter()
            .enumerate()
            .map(|(row, r)| {
                let (q, source) = resolve_flow(r, self.flow_defaults);
                match source {
                    FlowSource::Measured(_) => {}
                    FlowSource::TypeDefault => diagnostics.defaulted(
                        "receptors",
                        row,
                        "flow_rate",
                        format!("缺少流量，使用{}默认值 {q} L/day", r.kind),
                    ),
                    FlowSource::Fallback => diagnostics.defaulted(
                        "receptors",
                        row,
                        "flow_rate",
                        format!("流量无效 (Q ≤ 0 或非有限)，使用兜底值 {q} L/day"),
                    ),
                }
                q
            })
            .collect();

        let mut totals = vec![KahanSum::new(); receptors.len()];
        let mut counts = vec![0usize; receptors.len()];
        for link in links.iter_mut() {
            let r = link.receptor_idx;
            totals[r].add(link.surviving_load);
            counts[r] += 1;
            link.concentration = self.unit.convert_from_per_liter(link.surviving_load / flows[r]);
        }

        receptors
            .iter()
            .enumerate()
            .map(|(r, receptor)| {
                let total = totals[r].value();
                let concentration = self.unit.convert_from_per_liter(total / flows[r]);
                ReceptorResult {
                    receptor_id: receptor.id.clone(),
                    kind: receptor.kind,
                    location: receptor.location,
                    link_count: counts[r],
                    total_surviving_load: total,
                    flow_l_per_day: flows[r],
                    concentration,
                    risk_score: risk_score(concentration),
                }
            })
            .collect()
    }
}

/// 运行摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// 源负荷总和（衰减前）
    pub total_source_load: f64,
    /// 到达受体的负荷总和
    pub total_surviving_load: f64,
    /// 链接数
    pub link_count: usize,
    /// 受体数
    pub receptor_count: usize,
    /// 负荷为正的受体数
    pub receptors_with_load: usize,
    /// 最大浓度（输出单位）
    pub max_concentration: f64,
}

impl RunSummary {
    /// 由负荷与结果生成摘要
    pub fn from_results(loads: &[f64], links: &[Link], results: &[ReceptorResult]) -> Self {
        Self {
            total_source_load: KahanSum::sum_iter(loads.iter().copied().filter(|l| l.is_finite())),
            total_surviving_load: KahanSum::sum_iter(results.iter().map(|r| r.total_surviving_load)),
            link_count: links.len(),
            receptor_count: results.len(),
            receptors_with_load: results.iter().filter(|r| r.total_surviving_load > 0.0).count(),
            max_concentration: results.iter().map(|r| r.concentration).fold(0.0, f64::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlowMeasurements;
    use ft_config::ReceptorType;
    use ft_foundation::DiagnosticKind;
    use ft_geo::Point2D;

    fn link(receptor_idx: usize, surviving_load: f64) -> Link {
        Link {
            source_idx: 0,
            receptor_idx,
            source_id: "S".into(),
            receptor_id: format!("W{receptor_idx}"),
            distance_m: Some(1.0),
            travel_time_days: None,
            source_load: surviving_load,
            decay_factor: 1.0,
            surviving_load,
            concentration: 0.0,
        }
    }

    #[test]
    fn test_concentration_identity() {
        let mut s = Scenario::default();
        s.output_unit = ConcentrationUnit::PerLiter;
        let receptors = vec![
            Receptor::new("W0", Point2D::ZERO_LONLAT, ReceptorType::Private)
                .with_flow(FlowMeasurements::liters_per_day(1.0e7)),
            Receptor::new("W1", Point2D::ZERO_LONLAT, ReceptorType::Private)
                .with_flow(FlowMeasurements::liters_per_day(500.0)),
        ];
        let mut links = vec![link(0, 1.0e11), link(0, 2.414e10)];
        let mut diag = DiagnosticLog::new();
        let results = ConcentrationAggregator::new(&s).aggregate(&receptors, &mut links, &mut diag);

        let total = 1.0e11 + 2.414e10;
        assert_eq!(results[0].total_surviving_load, total);
        assert_eq!(results[0].concentration, total / 1.0e7);
        assert_eq!(links[0].concentration, 1.0e11 / 1.0e7);
        // 无链接的受体仍然输出
        assert_eq!(results[1].link_count, 0);
        assert_eq!(results[1].concentration, 0.0);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_per_100ml_output() {
        let s = Scenario::default();
        let receptors = vec![Receptor::new("W0", Point2D::ZERO_LONLAT, ReceptorType::Private)
            .with_flow(FlowMeasurements::liters_per_day(100.0))];
        let mut links = vec![link(0, 1000.0)];
        let mut diag = DiagnosticLog::new();
        let results = ConcentrationAggregator::new(&s).aggregate(&receptors, &mut links, &mut diag);
        assert!((results[0].concentration - 1.0).abs() < 1e-12);
        assert!((links[0].concentration - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_flow_preference_and_defaults() {
        let defaults = FlowDefaults::default();
        let both = Receptor::new("a", Point2D::ZERO_LONLAT, ReceptorType::Private).with_flow(FlowMeasurements {
            liters_per_day: None,
            cubic_meters_per_day: Some(3.0),
            liters_per_second: Some(1.0),
            cubic_meters_per_second: None,
        });
        assert_eq!(resolve_flow(&both, &defaults), (3_000.0, FlowSource::Measured(FlowUnit::CubicMetersPerDay)));

        let m3s = Receptor::new("b", Point2D::ZERO_LONLAT, ReceptorType::Private).with_flow(FlowMeasurements {
            cubic_meters_per_second: Some(1.0),
            ..FlowMeasurements::default()
        });
        assert_eq!(resolve_flow(&m3s, &defaults).0, 86_400_000.0);

        let none = Receptor::new("c", Point2D::ZERO_LONLAT, ReceptorType::Government);
        assert_eq!(resolve_flow(&none, &defaults), (20_000.0, FlowSource::TypeDefault));

        let bad = Receptor::new("d", Point2D::ZERO_LONLAT, ReceptorType::Government)
            .with_flow(FlowMeasurements::liters_per_day(0.0));
        assert_eq!(resolve_flow(&bad, &defaults), (2_000.0, FlowSource::Fallback));
    }

    #[test]
    fn test_invalid_flow_is_logged() {
        let s = Scenario::default();
        let receptors = vec![Receptor::new("W0", Point2D::ZERO_LONLAT, ReceptorType::Private)
            .with_flow(FlowMeasurements::liters_per_day(-5.0))];
        let mut diag = DiagnosticLog::new();
        let results = ConcentrationAggregator::new(&s).aggregate(&receptors, &mut [], &mut diag);
        assert_eq!(results[0].flow_l_per_day, 2_000.0);
        assert_eq!(diag.count(DiagnosticKind::Defaulted), 1);
    }

    #[test]
    fn test_risk_score_bounds() {
        assert_eq!(risk_score(0.0), 0.0);
        assert!((risk_score(9.0) - 20.0).abs() < 1e-12);
        assert!((risk_score(99.0) - 40.0).abs() < 1e-12);
        assert_eq!(risk_score(1.0e12), 100.0);
        assert_eq!(risk_score(f64::NAN), 0.0);
        assert!(risk_score(10.0) < risk_score(11.0));
    }
}
