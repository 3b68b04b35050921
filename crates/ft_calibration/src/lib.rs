// crates/ft_calibration/src/lib.rs

//! FioTrace Calibration Layer
//!
//! 野外观测与模型受体的匹配、一致性指标、参数网格搜索、
//! 对数偏差校正与风险分级验证。
//!
//! # 模块概览
//!
//! - [`observation`]: 观测与实验室读数解析
//! - [`matching`]: 最近受体匹配
//! - [`metrics`]: log RMSE / 偏差 / Pearson / Spearman / Kendall
//! - [`grid`]: 参数网格搜索（rayon 并行）
//! - [`correction`]: 对数平移校正与 k 折交叉验证
//! - [`tiers`]: 风险分级与最高风险分位识别
//! - [`report`]: 完整校准流程

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod correction;
pub mod error;
pub mod grid;
pub mod matching;
pub mod metrics;
pub mod observation;
pub mod report;
pub mod tiers;

/// 预导入模块
pub mod prelude {
    pub use crate::correction::{cross_validate, LogBiasCorrection};
    pub use crate::error::{CalibrationError, CalibrationResult};
    pub use crate::grid::{grid_search, GridAxes, GridSearchConfig, GridSearchReport, Objective};
    pub use crate::matching::{match_observations, MatchedPair};
    pub use crate::metrics::CalibrationMetrics;
    pub use crate::observation::{LabValue, Observation};
    pub use crate::report::{calibrate, CalibrationConfig, CalibrationReport};
    pub use crate::tiers::{validate_tiers, RiskTier, TierMode, TierThresholds};
}

pub use error::{CalibrationError, CalibrationResult};
pub use grid::{GridSearchConfig, Objective};
pub use matching::MatchedPair;
pub use metrics::CalibrationMetrics;
pub use observation::{LabParseConfig, LabValue, Observation};
pub use report::{calibrate, CalibrationConfig, CalibrationReport};
