// crates/ft_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `FtError` 枚举和 `FtResult` 类型别名，用于整个项目的错误处理。
//!
//! # 错误分类
//!
//! - **验证错误**（对受影响的表是致命的）：缺少必需列、坐标无法解析、情景无法解析
//! - **IO 错误**：文件读写失败
//! - **内部错误**：不应出现的状态
//!
//! 可恢复的数据问题（效率越界、负人口、流量缺失等）不走错误通道，
//! 而是记录到 [`crate::diagnostics::DiagnosticLog`]。
//!
//! # 示例
//!
//! ```
//! use ft_foundation::error::{FtError, FtResult};
//!
//! fn read_sources() -> FtResult<()> {
//!     Err(FtError::missing_columns("sources", vec!["lat".into()]))
//! }
//! assert!(read_sources().unwrap_err().to_string().contains("lat"));
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type FtResult<T> = Result<T, FtError>;

/// FioTrace 错误类型
#[derive(Error, Debug)]
pub enum FtError {
    // ========================================================================
    // IO 相关错误
    // ========================================================================
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 文件不存在
    #[error("文件不存在: {path}")]
    FileNotFound {
        /// 未找到的路径
        path: PathBuf,
    },

    /// 文件解析错误
    #[error("文件解析错误: {file} 第{line}行: {message}")]
    ParseError {
        /// 文件路径
        file: PathBuf,
        /// 行号
        line: usize,
        /// 错误信息
        message: String,
    },

    // ========================================================================
    // 表格验证错误
    // ========================================================================
    /// 缺少必需列
    #[error("表 {table} 缺少必需列: {}", columns.join(", "))]
    MissingColumns {
        /// 表名（sources / receptors / observations / mapping）
        table: &'static str,
        /// 缺失的列名
        columns: Vec<String>,
    },

    /// 单元格数值无效
    #[error("表 {table} 第{row}行 列 {column}: 无效值 '{value}' ({reason})")]
    InvalidValue {
        /// 表名
        table: &'static str,
        /// 列名
        column: String,
        /// 数据行号（从 1 开始，不含表头）
        row: usize,
        /// 原始值
        value: String,
        /// 无效原因
        reason: String,
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 数据超出范围
    #[error("数据超出范围: {field}={value}, 期望范围=[{min}, {max}]")]
    OutOfRange {
        /// 字段名
        field: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    // ========================================================================
    // 配置错误
    // ========================================================================
    /// 配置错误
    #[error("配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: String,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    /// 序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 序列化失败原因
        message: String,
    },

    // ========================================================================
    // 其他
    // ========================================================================
    /// 资源未找到
    #[error("资源未找到: {resource}")]
    NotFound {
        /// 资源名称
        resource: String,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl FtError {
    /// 从描述创建 IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 从IO错误创建（带源）
    pub fn io_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 文件不存在
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 解析错误
    pub fn parse(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// 缺少必需列
    pub fn missing_columns(table: &'static str, columns: Vec<String>) -> Self {
        Self::MissingColumns { table, columns }
    }

    /// 单元格数值无效
    pub fn invalid_value(
        table: &'static str,
        column: impl Into<String>,
        row: usize,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            table,
            column: column.into(),
            row,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 数据超出范围
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 配置值无效
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// 序列化错误
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// 资源未找到
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// 是否为表格/配置验证错误
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingColumns { .. }
                | Self::InvalidValue { .. }
                | Self::InvalidInput { .. }
                | Self::OutOfRange { .. }
                | Self::Config { .. }
                | Self::InvalidConfig { .. }
        )
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl FtError {
    /// 检查值是否在范围内
    #[inline]
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> FtResult<()> {
        if !(min..=max).contains(&value) {
            Err(Self::out_of_range(field, value, min, max))
        } else {
            Ok(())
        }
    }

    /// 检查值是否有限
    #[inline]
    pub fn check_finite(field: &'static str, value: f64) -> FtResult<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(Self::invalid_input(format!("{field} 必须为有限值, 实际为 {value}")))
        }
    }
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for FtError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// ========================================================================
// 宏
// ========================================================================

/// 条件不满足时提前返回错误
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

/// 解包 `Option`，为 `None` 时提前返回错误
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr $(,)?) => {
        match $opt {
            Some(v) => v,
            None => return Err($err.into()),
        }
    };
}

// ========================================================================
// 测试
// ========================================================================
