// crates/ft_io/src/lib.rs

//! FioTrace IO 模块
//!
//! 提供表格数据输入输出功能。
//!
//! # 模块
//!
//! - [`table`]: 带表头约定的 CSV 表（大小写无关的列名与别名）
//! - [`import`]: 源表、受体表、映射表、观测表导入
//! - [`export`]: 链接、受体、网格搜索、匹配对 CSV 与 JSON 摘要
//! - [`snapshot`]: 基线快照与校准配置文件
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use ft_foundation::DiagnosticLog;
//! use ft_io::import::{read_receptors, read_sources};
//!
//! let mut diag = DiagnosticLog::new();
//! let sources = read_sources(Path::new("sources.csv"), &mut diag)?;
//! let receptors = read_receptors(Path::new("receptors.csv"), &mut diag)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod export;
pub mod import;
pub mod snapshot;
pub mod table;

// 重导出常用类型
pub use error::{IoError, IoResult};
pub use export::{write_grid, write_json, write_links, write_pairs, write_receptors};
pub use import::{read_mapping, read_observations, read_receptors, read_sources};
pub use snapshot::{read_baseline, read_calibration_config, write_baseline};
