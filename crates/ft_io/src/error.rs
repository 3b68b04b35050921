// crates/ft_io/src/error.rs
//! IO 错误类型定义
//!
//! 文件格式层面的错误（CSV 语法、JSON/TOML 结构）。
//! 所有错误最终可转换为 FtError 以实现跨层错误传递。

use ft_foundation::FtError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// IO 模块结果类型别名
pub type IoResult<T> = Result<T, IoError>;

/// IO 错误枚举
#[derive(Error, Debug)]
pub enum IoError {
    /// CSV 读写失败
    #[error("CSV 错误: {path}: {message}")]
    Csv {
        /// 文件路径
        path: PathBuf,
        /// 错误信息
        message: String,
    },

    /// 文档结构无法解析
    #[error("文件解析错误: {path}: {message}")]
    Document {
        /// 文件路径
        path: PathBuf,
        /// 错误信息
        message: String,
    },

    /// 无法识别文件格式
    #[error("无法识别文件格式: {path}")]
    UnknownFormat {
        /// 文件路径
        path: PathBuf,
    },

    /// 基础层错误转换
    #[error("基础层错误: {0}")]
    Foundation(#[from] FtError),
}

impl IoError {
    /// 由 csv 错误创建
    pub fn csv(path: &Path, err: csv::Error) -> Self {
        let message = match err.position() {
            Some(pos) => format!("第{}行: {err}", pos.line()),
            None => err.to_string(),
        };
        Self::Csv {
            path: path.to_path_buf(),
            message,
        }
    }

    /// 文档解析错误
    pub fn document(path: &Path, message: impl Into<String>) -> Self {
        Self::Document {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl From<IoError> for FtError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Csv { path, message } => FtError::parse(path, 0, message),
            IoError::Document { path, message } => FtError::parse(path, 0, message),
            IoError::UnknownFormat { path } => {
                FtError::invalid_input(format!("无法识别文件格式: {}", path.display()))
            }
            IoError::Foundation(e) => e,
        }
    }
}
