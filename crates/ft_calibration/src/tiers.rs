// crates/ft_calibration/src/tiers.rs

//! 风险分级验证
//!
//! 观测与预测分别分为 Low / Medium / High 三级，统计分级准确率和混淆矩阵；
//! 另外对"最高风险分位"做二分类，报告 precision / recall / F1。
//! 后者回答的是"最差的井有没有被标出来"，与绝对量级是否准确无关。

use crate::error::{CalibrationError, CalibrationResult};
use crate::matching::MatchedPair;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// 低
    Low,
    /// 中
    Medium,
    /// 高
    High,
}

impl RiskTier {
    /// 全部等级（升序）
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    /// 混淆矩阵下标
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// 名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 阈值来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierMode {
    /// 固定阈值
    #[default]
    Fixed,
    /// 由观测三分位数确定
    ObservedTerciles,
}

/// 分级阈值（输出浓度单位）
///
/// `C < low_max` 为 Low，`low_max ≤ C < medium_max` 为 Medium，其余为 High。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Low 上界（不含）
    pub low_max: f64,
    /// Medium 上界（不含）
    pub medium_max: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self::fixed()
    }
}

impl TierThresholds {
    /// 默认固定阈值：1 与 10
    pub const fn fixed() -> Self {
        Self {
            low_max: 1.0,
            medium_max: 10.0,
        }
    }

    /// 创建并检查阈值
    pub fn new(low_max: f64, medium_max: f64) -> CalibrationResult<Self> {
        if !(low_max.is_finite() && medium_max.is_finite()) || low_max > medium_max {
            return Err(CalibrationError::invalid_parameter(
                "tier_thresholds",
                format!("[{low_max}, {medium_max}]"),
                "需要有限值且 low_max ≤ medium_max",
            ));
        }
        Ok(Self { low_max, medium_max })
    }

    /// 由观测值的三分位数确定
    pub fn from_observed_terciles(observed: &[f64]) -> CalibrationResult<Self> {
        let finite: Vec<f64> = observed.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.len() < 3 {
            return Err(CalibrationError::InsufficientData {
                required: 3,
                actual: finite.len(),
            });
        }
        let low = quantile(&finite, 1.0 / 3.0).unwrap_or(0.0);
        let medium = quantile(&finite, 2.0 / 3.0).unwrap_or(low);
        Self::new(low, medium)
    }

    /// 分级
    pub fn classify(&self, concentration: f64) -> RiskTier {
        if concentration < self.low_max {
            RiskTier::Low
        } else if concentration < self.medium_max {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }
}

/// 线性插值分位数，`q` 截断到 `[0, 1]`
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// 分级验证结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierValidation {
    /// 使用的阈值
    pub thresholds: TierThresholds,
    /// 参与的完整匹配对数
    pub n: usize,
    /// 分级一致的比例
    pub accuracy: Option<f64>,
    /// 混淆矩阵，行为观测等级，列为预测等级
    pub confusion: [[usize; 3]; 3],
    /// 最高风险分位比例（如 0.2 表示前 20%）
    pub top_quantile: f64,
    /// 观测侧的分位阈值
    pub observed_cutoff: Option<f64>,
    /// 预测侧的分位阈值
    pub predicted_cutoff: Option<f64>,
    /// 真阳性
    pub true_positives: usize,
    /// 假阳性
    pub false_positives: usize,
    /// 假阴性
    pub false_negatives: usize,
    /// 精确率
    pub precision: Option<f64>,
    /// 召回率
    pub recall: Option<f64>,
    /// F1
    pub f1: Option<f64>,
}

/// 在匹配对上验证分级
///
/// 最高风险分位在观测和预测两侧各自按分位数确定，
/// 等于分位阈值的值计入阳性。
pub fn validate_tiers(
    pairs: &[MatchedPair],
    thresholds: TierThresholds,
    top_quantile: f64,
) -> CalibrationResult<TierValidation> {
    if !(top_quantile > 0.0 && top_quantile <= 1.0) {
        return Err(CalibrationError::invalid_parameter("top_quantile", top_quantile, "必须位于 (0, 1]"));
    }
    let (pred, obs): (Vec<f64>, Vec<f64>) = pairs
        .iter()
        .filter(|p| p.is_complete())
        .filter_map(|p| Some((p.predicted, p.observed?)))
        .unzip();
    let n = obs.len();

    let mut confusion = [[0usize; 3]; 3];
    for (&p, &o) in pred.iter().zip(&obs) {
        confusion[thresholds.classify(o).index()][thresholds.classify(p).index()] += 1;
    }
    let correct: usize = (0..3).map(|i| confusion[i][i]).sum();
    let accuracy = (n > 0).then(|| correct as f64 / n as f64);

    let observed_cutoff = quantile(&obs, 1.0 - top_quantile);
    let predicted_cutoff = quantile(&pred, 1.0 - top_quantile);
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    if let (Some(oc), Some(pc)) = (observed_cutoff, predicted_cutoff) {
        for (&p, &o) in pred.iter().zip(&obs) {
            match (o >= oc, p >= pc) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }
    }
    let ratio = |num: usize, den: usize| (den > 0).then(|| num as f64 / den as f64);
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = match (precision, recall) {
        (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
        (Some(_), Some(_)) => Some(0.0),
        _ => None,
    };

    Ok(TierValidation {
        thresholds,
        n,
        accuracy,
        confusion,
        top_quantile,
        observed_cutoff,
        predicted_cutoff,
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_,
        precision,
        recall,
        f1,
    })
}
