// crates/ft_transport/src/load.rs

//! 源负荷模型与衰减
//!
//! # 负荷
//!
//! ```text
//! load = p · E · (1 − η)
//! ```
//!
//! - `p` 人口，负值截断为 0
//! - `E` 人均排放常数
//! - `η` 封存效率，越界截断到 [0, 1]；给出 LRV 时 `η = 1 − 10^(−LRV)`
//!
//! 截断不是错误，结果中带回原值供调用方记录诊断。
//!
//! # 衰减
//!
//! ```text
//! L_t = L · exp(−k · t)      时间衰减 [1/day]
//! L_d = L · exp(−k_s · d)    距离衰减 [1/m]
//! ```
//!
//! 同一链接同时具备传输时间与时间衰减常数时使用时间衰减，
//! 否则具备距离时使用距离衰减，两者都没有时负荷原样通过。

use ft_config::DecayParams;
use serde::Serialize;

// ============================================================================
// 效率
// ============================================================================

/// 对数去除值换算为效率，截断到 [0, 1]
#[inline]
pub fn efficiency_from_lrv(lrv: f64) -> f64 {
    (1.0 - 10f64.powf(-lrv)).clamp(0.0, 1.0)
}

/// 将效率截断到 [0, 1]，返回 `(截断后, 是否截断)`
///
/// NaN 视为 0。
#[inline]
pub fn clamp_efficiency(eta: f64) -> (f64, bool) {
    if eta.is_nan() {
        return (0.0, true);
    }
    let c = eta.clamp(0.0, 1.0);
    (c, c != eta)
}

/// 单源负荷
///
/// 调用者保证 `population ≥ 0`、`emission ≥ 0`、`η ∈ [0, 1]`。
#[inline]
pub fn source_load(population: f64, emission: f64, efficiency: f64) -> f64 {
    population * emission * (1.0 - efficiency)
}

/// 负荷计算结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadOutcome {
    /// 负荷 [单位/day]
    pub load: f64,
    /// 实际使用的效率
    pub efficiency: f64,
    /// 效率被截断时的原值
    pub efficiency_clamped_from: Option<f64>,
    /// 人口被截断时的原值
    pub population_clamped_from: Option<f64>,
}

/// 带截断的负荷计算
pub fn evaluate_load(population: f64, emission: f64, raw_efficiency: f64) -> LoadOutcome {
    let (efficiency, eta_clamped) = clamp_efficiency(raw_efficiency);
    let (p, pop_clamped) = if population.is_finite() && population >= 0.0 {
        (population, false)
    } else {
        (0.0, true)
    };
    let emission = if emission.is_finite() { emission.max(0.0) } else { 0.0 };
    LoadOutcome {
        load: source_load(p, emission, efficiency),
        efficiency,
        efficiency_clamped_from: eta_clamped.then_some(raw_efficiency),
        population_clamped_from: pop_clamped.then_some(population),
    }
}

// ============================================================================
// 衰减
// ============================================================================

/// 单条链接的衰减输入
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecayInputs {
    /// 传输时间 [day]
    pub travel_time_days: Option<f64>,
    /// 距离 [m]
    pub distance_m: Option<f64>,
}

impl DecayInputs {
    /// 仅距离
    pub fn distance(d: f64) -> Self {
        Self {
            travel_time_days: None,
            distance_m: Some(d),
        }
    }

    /// 仅传输时间
    pub fn travel_time(t: f64) -> Self {
        Self {
            travel_time_days: Some(t),
            distance_m: None,
        }
    }
}

/// 实际使用的衰减基准
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayBasis {
    /// 时间衰减
    Time,
    /// 距离衰减
    Distance,
    /// 无衰减输入，原样通过
    PassThrough,
    /// 污染物不衰减
    Conservative,
}

fn usable(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x >= 0.0)
}

/// 计算衰减因子
pub fn decay_factor(inputs: DecayInputs, params: &DecayParams) -> (f64, DecayBasis) {
    if let (Some(t), Some(k)) = (usable(inputs.travel_time_days), params.per_day) {
        return ((-k * t).exp(), DecayBasis::Time);
    }
    if let Some(d) = usable(inputs.distance_m) {
        return ((-params.per_meter * d).exp(), DecayBasis::Distance);
    }
    (1.0, DecayBasis::PassThrough)
}

/// 对负荷施加衰减
#[inline]
pub fn apply_decay(load: f64, inputs: DecayInputs, params: &DecayParams) -> (f64, DecayBasis) {
    let (f, basis) = decay_factor(inputs, params);
    (load * f, basis)
}

/// 时间衰减常数换算为距离衰减常数
///
/// `k_s = k / v`，`v` 为地下水流速 [m/day]。流速非正时返回 `None`。
pub fn per_meter_from_per_day(k_per_day: f64, velocity_m_per_day: f64) -> Option<f64> {
    (velocity_m_per_day.is_finite() && velocity_m_per_day > 0.0)
        .then(|| k_per_day / velocity_m_per_day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worked_example_load() {
        let out = evaluate_load(500.0, 1.0e9, 0.5);
        assert_eq!(out.load, 2.5e11);
        assert!(out.efficiency_clamped_from.is_none());
    }

    #[test]
    fn test_load_monotonic_in_efficiency() {
        let mut prev = f64::INFINITY;
        for i in 0..=10 {
            let eta = i as f64 / 10.0;
            let l = evaluate_load(100.0, 1.0e9, eta).load;
            assert!(l < prev, "效率 {eta} 时负荷未下降");
            prev = l;
        }
        assert_eq!(evaluate_load(100.0, 1.0e9, 1.0).load, 0.0);
    }

    #[test]
    fn test_clamping_is_reported() {
        let out = evaluate_load(-5.0, 1.0e9, 1.3);
        assert_eq!(out.load, 0.0);
        assert_eq!(out.efficiency, 1.0);
        assert_eq!(out.efficiency_clamped_from, Some(1.3));
        assert_eq!(out.population_clamped_from, Some(-5.0));

        let (eta, clamped) = clamp_efficiency(-0.2);
        assert_eq!(eta, 0.0);
        assert!(clamped);
    }

    #[test]
    fn test_lrv_conversion() {
        assert!((efficiency_from_lrv(1.0) - 0.9).abs() < 1e-12);
        assert!((efficiency_from_lrv(2.0) - 0.99).abs() < 1e-12);
        assert_eq!(efficiency_from_lrv(0.0), 0.0);
        assert_eq!(efficiency_from_lrv(-1.0), 0.0);
    }

    #[test]
    fn test_time_decay_preferred() {
        let params = DecayParams {
            per_meter: 0.003,
            per_day: Some(0.7),
        };
        let inputs = DecayInputs {
            travel_time_days: Some(1.0),
            distance_m: Some(10.0),
        };
        let (l, basis) = apply_decay(2.5e11, inputs, &params);
        assert_eq!(basis, DecayBasis::Time);
        assert!((l - 2.5e11 * (-0.7f64).exp()).abs() < 1.0);
        assert!((l - 1.24e11).abs() / 1.24e11 < 0.05);
    }

    #[test]
    fn test_distance_decay_and_pass_through() {
        let params = DecayParams::default();
        let (f, basis) = decay_factor(DecayInputs::travel_time(2.0), &params);
        assert_eq!(basis, DecayBasis::PassThrough);
        assert_eq!(f, 1.0);

        let (f10, basis) = decay_factor(DecayInputs::distance(10.0), &params);
        let (f20, _) = decay_factor(DecayInputs::distance(20.0), &params);
        assert_eq!(basis, DecayBasis::Distance);
        assert!(f20 < f10 && f10 < 1.0);

        let zero = DecayParams { per_meter: 0.0, per_day: None };
        assert_eq!(decay_factor(DecayInputs::distance(50.0), &zero).0, 1.0);
    }

    #[test]
    fn test_per_meter_from_per_day() {
        assert_eq!(per_meter_from_per_day(0.7, 1.0), Some(0.7));
        assert!((per_meter_from_per_day(0.7, 100.0).unwrap() - 0.007).abs() < 1e-15);
        assert!(per_meter_from_per_day(0.7, 0.0).is_none());
    }
}
