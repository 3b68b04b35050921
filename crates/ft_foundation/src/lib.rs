// crates/ft_foundation/src/lib.rs

//! FioTrace Foundation Layer
//!
//! 基础层，为整个项目提供统一的错误类型、运行诊断记录与数值工具。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `FtError` 与 `ensure!` / `require!` 宏
//! - [`diagnostics`]: 可恢复数据问题的结构化记录（截断、默认值、跳过的干预）
//! - [`numerics`]: Kahan 补偿求和
//!
//! # 示例
//!
//! ```
//! use ft_foundation::{DiagnosticLog, FtError, FtResult, KahanSum};
//!
//! fn positive(v: f64) -> FtResult<f64> {
//!     ft_foundation::ensure!(v > 0.0, FtError::invalid_input("必须为正"));
//!     Ok(v)
//! }
//!
//! let mut log = DiagnosticLog::new();
//! log.clamped("sources", 3, "efficiency", 1.2, 1.0);
//! assert_eq!(log.len(), 1);
//! assert!(positive(-1.0).is_err());
//! assert!((KahanSum::sum_iter([0.1; 10]) - 1.0).abs() < 1e-12);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diagnostics;
pub mod error;
pub mod numerics;

// 重导出常用类型
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog};
pub use error::{FtError, FtResult};
pub use numerics::KahanSum;

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog};
    pub use crate::error::{FtError, FtResult};
    pub use crate::numerics::KahanSum;
    pub use crate::{ensure, require};
}
