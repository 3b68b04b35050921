// crates/ft_calibration/src/correction.rs

//! 对数空间偏差校正
//!
//! 与模型无关的后处理：在 `log10(x+1)` 空间把全部预测平移一个常数，
//! 使训练集上预测均值与观测均值一致：
//!
//! ```text
//! shift = mean(log10(obs+1) − log10(pred+1))
//! corrected = 10^(log10(pred+1) + shift) − 1
//! ```
//!
//! 用带种子的 k 折交叉验证检查平移量能否推广到未参与拟合的样本。

use crate::error::{CalibrationError, CalibrationResult};
use crate::matching::MatchedPair;
use crate::metrics::{log1p10, CalibrationMetrics};
use ft_foundation::numerics::{mean, std_dev};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

/// 对数平移校正
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogBiasCorrection {
    /// 对数空间平移量
    pub shift: f64,
}

impl LogBiasCorrection {
    /// 在对齐的预测/观测序列上拟合
    pub fn fit(predicted: &[f64], observed: &[f64]) -> CalibrationResult<Self> {
        let diffs: Vec<f64> = predicted
            .iter()
            .zip(observed)
            .map(|(&p, &o)| log1p10(o.max(0.0)) - log1p10(p.max(0.0)))
            .collect();
        let shift = mean(&diffs).ok_or(CalibrationError::InsufficientData {
            required: 1,
            actual: 0,
        })?;
        Ok(Self { shift })
    }

    /// 校正单个预测值
    #[inline]
    pub fn apply(&self, predicted: f64) -> f64 {
        (10f64.powf(log1p10(predicted.max(0.0)) + self.shift) - 1.0).max(0.0)
    }

    /// 校正一组预测值
    pub fn apply_all(&self, predicted: &[f64]) -> Vec<f64> {
        predicted.iter().map(|&p| self.apply(p)).collect()
    }
}

/// 单折结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldResult {
    /// 折序号
    pub fold: usize,
    /// 训练样本数
    pub train_n: usize,
    /// 验证样本数
    pub test_n: usize,
    /// 训练集拟合的平移量
    pub shift: f64,
    /// 校正前验证集 log RMSE
    pub log_rmse_before: Option<f64>,
    /// 校正后验证集 log RMSE
    pub log_rmse: Option<f64>,
    /// 校正后验证集 Spearman
    pub spearman: Option<f64>,
}

/// 交叉验证报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidationReport {
    /// 折数
    pub k: usize,
    /// 随机种子
    pub seed: u64,
    /// 全样本拟合的校正
    pub correction: LogBiasCorrection,
    /// 各折结果
    pub folds: Vec<FoldResult>,
    /// log RMSE 均值
    pub mean_log_rmse: Option<f64>,
    /// log RMSE 标准差
    pub std_log_rmse: Option<f64>,
    /// Spearman 均值
    pub mean_spearman: Option<f64>,
    /// Spearman 标准差
    pub std_spearman: Option<f64>,
}

/// 对匹配对做 k 折交叉验证
///
/// 只使用两侧都有值的匹配对。`k` 截断到 `[2, n]`。
pub fn cross_validate(pairs: &[MatchedPair], k: usize, seed: u64) -> CalibrationResult<CrossValidationReport> {
    let (pred, obs): (Vec<f64>, Vec<f64>) = pairs
        .iter()
        .filter(|p| p.is_complete())
        .filter_map(|p| Some((p.predicted, p.observed?)))
        .unzip();
    let n = pred.len();
    if n < 2 {
        return Err(CalibrationError::InsufficientData { required: 2, actual: n });
    }
    if k < 2 {
        return Err(CalibrationError::invalid_parameter("cv_folds", k, "至少 2 折"));
    }
    let k = k.min(n);

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut folds = Vec::with_capacity(k);
    for fold in 0..k {
        let mut test = Vec::with_capacity(n / k + 1);
        let mut train = Vec::with_capacity(n);
        for (pos, &i) in order.iter().enumerate() {
            if pos % k == fold {
                test.push(i);
            } else {
                train.push(i);
            }
        }
        let pick = |idx: &[usize], v: &[f64]| idx.iter().map(|&i| v[i]).collect::<Vec<f64>>();

        let correction = LogBiasCorrection::fit(&pick(&train, &pred), &pick(&train, &obs))?;
        let test_pred = pick(&test, &pred);
        let test_obs = pick(&test, &obs);
        let before = CalibrationMetrics::from_series(&test_pred, &test_obs);
        let after = CalibrationMetrics::from_series(&correction.apply_all(&test_pred), &test_obs);

        folds.push(FoldResult {
            fold,
            train_n: train.len(),
            test_n: test.len(),
            shift: correction.shift,
            log_rmse_before: before.log_rmse,
            log_rmse: after.log_rmse,
            spearman: after.spearman,
        });
    }

    let rmse: Vec<f64> = folds.iter().filter_map(|f| f.log_rmse).collect();
    let rho: Vec<f64> = folds.iter().filter_map(|f| f.spearman).collect();
    let correction = LogBiasCorrection::fit(&pred, &obs)?;
    info!(
        "{k} 折交叉验证: shift={:.4}, log_rmse 均值 {:?}",
        correction.shift,
        mean(&rmse)
    );

    Ok(CrossValidationReport {
        k,
        seed,
        correction,
        folds,
        mean_log_rmse: mean(&rmse),
        std_log_rmse: std_dev(&rmse),
        mean_spearman: mean(&rho),
        std_spearman: std_dev(&rho),
    })
}
