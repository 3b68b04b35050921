// crates/ft_calibration/src/metrics.rs

//! 预测-观测一致性指标
//!
//! 对数空间使用 `log10(x + 1)`：
//!
//! ```text
//! log_rmse = sqrt(mean((log10(pred+1) − log10(obs+1))²))
//! log_bias = mean(log10(pred+1) − log10(obs+1))
//! ```
//!
//! 相关系数（Pearson / Spearman / Kendall τ-b，线性与对数空间）
//! 在任一序列少于两个不同值时无定义，返回 `None`。

use crate::matching::MatchedPair;
use ft_foundation::numerics::mean;
use ft_foundation::KahanSum;
use serde::Serialize;

/// `log10(x + 1)`
#[inline]
pub fn log1p10(x: f64) -> f64 {
    (x + 1.0).log10()
}

/// 校准指标
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalibrationMetrics {
    /// 参与计算的完整匹配对数
    pub n_pairs: usize,
    /// 对数空间 RMSE
    pub log_rmse: Option<f64>,
    /// 对数空间偏差（正值表示高估）
    pub log_bias: Option<f64>,
    /// 线性 Pearson
    pub pearson: Option<f64>,
    /// 对数空间 Pearson
    pub pearson_log: Option<f64>,
    /// Spearman 秩相关
    pub spearman: Option<f64>,
    /// 对数空间 Spearman（单调变换下与线性相同，单独保留）
    pub spearman_log: Option<f64>,
    /// Kendall τ-b
    pub kendall: Option<f64>,
    /// 对数空间 Kendall τ-b
    pub kendall_log: Option<f64>,
}

impl CalibrationMetrics {
    /// 由匹配对计算，忽略任一侧缺失的对
    pub fn from_pairs(pairs: &[MatchedPair]) -> Self {
        let (pred, obs): (Vec<f64>, Vec<f64>) = pairs
            .iter()
            .filter(|p| p.is_complete())
            .filter_map(|p| Some((p.predicted, p.observed?)))
            .unzip();
        Self::from_series(&pred, &obs)
    }

    /// 由对齐的预测/观测序列计算
    pub fn from_series(predicted: &[f64], observed: &[f64]) -> Self {
        let n = predicted.len().min(observed.len());
        let pred = &predicted[..n];
        let obs = &observed[..n];
        let lp: Vec<f64> = pred.iter().map(|&v| log1p10(v.max(0.0))).collect();
        let lo: Vec<f64> = obs.iter().map(|&v| log1p10(v.max(0.0))).collect();
        let diffs: Vec<f64> = lp.iter().zip(&lo).map(|(p, o)| p - o).collect();

        Self {
            n_pairs: n,
            log_rmse: mean(&diffs.iter().map(|d| d * d).collect::<Vec<_>>()).map(f64::sqrt),
            log_bias: mean(&diffs),
            pearson: pearson(pred, obs),
            pearson_log: pearson(&lp, &lo),
            spearman: spearman(pred, obs),
            spearman_log: spearman(&lp, &lo),
            kendall: kendall_tau_b(pred, obs),
            kendall_log: kendall_tau_b(&lp, &lo),
        }
    }
}

/// 序列是否至少有两个不同值
pub fn has_variation(values: &[f64]) -> bool {
    match values.first() {
        Some(first) => values.iter().any(|v| v != first),
        None => false,
    }
}

/// Pearson 相关系数
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 || !has_variation(x) || !has_variation(y) {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut sxy = KahanSum::new();
    let mut sxx = KahanSum::new();
    let mut syy = KahanSum::new();
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy.add(dx * dy);
        sxx.add(dx * dx);
        syy.add(dy * dy);
    }
    let denom = (sxx.value() * syy.value()).sqrt();
    (denom > 0.0).then(|| (sxy.value() / denom).clamp(-1.0, 1.0))
}

/// 平均秩（从 1 开始，并列取平均）
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Spearman 秩相关系数
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || !has_variation(x) || !has_variation(y) {
        return None;
    }
    pearson(&average_ranks(x), &average_ranks(y))
}

/// Kendall τ-b
pub fn kendall_tau_b(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n != y.len() || n < 2 || !has_variation(x) || !has_variation(y) {
        return None;
    }
    let (mut concordant, mut discordant) = (0i64, 0i64);
    let (mut ties_x, mut ties_y) = (0i64, 0i64);
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            if dx == 0.0 {
                ties_x += 1;
            }
            if dy == 0.0 {
                ties_y += 1;
            }
            if dx == 0.0 || dy == 0.0 {
                continue;
            }
            if (dx > 0.0) == (dy > 0.0) {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }
    let n0 = (n * (n - 1) / 2) as i64;
    let denom = tau_b_denominator(n0, ties_x, ties_y);
    (denom > 0.0).then(|| (concordant - discordant) as f64 / denom)
}

/// τ-b 分母 √((n0 − n1)(n0 − n2))，乘积在 f64 中计算，大样本不溢出
fn tau_b_denominator(n0: i64, ties_x: i64, ties_y: i64) -> f64 {
    ((n0 - ties_x) as f64 * (n0 - ties_y) as f64).sqrt()
}
