// crates/ft_config/src/error.rs

//! 配置层错误类型

use ft_foundation::FtError;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("情景解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },

    /// 不支持的文档格式
    #[error("不支持的情景文档格式: {0} (支持 .toml / .json)")]
    UnsupportedFormat(String),

    /// 无法识别的类别名
    #[error("无法识别的{kind}: '{value}'")]
    UnknownCategory {
        /// 类别种类（"卫生设施类别" / "受体类型" / "污染物"）
        kind: &'static str,
        /// 原始值
        value: String,
    },
}

impl ConfigError {
    /// 创建无效值错误
    pub fn invalid_value(key: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for FtError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => FtError::io_with_source("读取情景文件失败", e),
            ConfigError::InvalidValue { key, value, reason } => {
                FtError::invalid_config(key, value, reason)
            }
            other => FtError::config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid_value("decay.per_meter", -1.0, "必须非负");
        assert!(err.to_string().contains("decay.per_meter"));
    }

    #[test]
    fn test_into_ft_error() {
        let err: FtError = ConfigError::Parse("bad".into()).into();
        assert!(err.is_validation());
    }
}
