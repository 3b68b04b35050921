// crates/ft_calibration/src/error.rs

//! 校准错误类型

use ft_foundation::FtError;

/// 校准结果类型
pub type CalibrationResult<T> = Result<T, CalibrationError>;

/// 校准错误
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    /// 参数无效
    #[error("校准参数无效 '{name}': {value} - {reason}")]
    InvalidParameter {
        /// 参数名
        name: &'static str,
        /// 参数值
        value: String,
        /// 原因
        reason: String,
    },

    /// 样本不足
    #[error("样本不足: 需要至少 {required} 个，实际 {actual} 个")]
    InsufficientData {
        /// 需要的数量
        required: usize,
        /// 实际数量
        actual: usize,
    },

    /// 管线运行失败
    #[error(transparent)]
    Pipeline(#[from] FtError),
}

impl CalibrationError {
    /// 创建参数无效错误
    pub fn invalid_parameter(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<CalibrationError> for FtError {
    fn from(err: CalibrationError) -> Self {
        match err {
            CalibrationError::Pipeline(e) => e,
            CalibrationError::InvalidParameter { name, value, reason } => {
                FtError::invalid_config(name, value, reason)
            }
            other => FtError::invalid_input(other.to_string()),
        }
    }
}
