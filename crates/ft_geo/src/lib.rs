// crates/ft_geo/src/lib.rs
//! FioTrace 地理空间处理模块
//!
//! 提供经纬度点、大圆距离以及基于 R-tree 的球面空间索引。
//!
//! # 模块
//!
//! - `geometry`: 经纬度点 `Point2D`、Haversine 距离、单位球嵌入
//! - `spatial_index`: 基于 R-tree 的球面半径查询与最近邻查询
//! - `error`: 地理模块错误类型
//!
//! # 示例
//!
//! ```
//! use ft_geo::prelude::*;
//!
//! let well = Point2D::from_lonlat(39.19, -6.16);
//! let toilet = Point2D::from_lonlat(39.1903, -6.1601);
//! let index = GeoIndex::bulk_load(vec![(toilet, 7u32)]);
//! let hits = index.within_radius(&well, 100.0);
//! assert_eq!(hits.len(), 1);
//! assert!(hits[0].distance_m < 100.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod geometry;
pub mod spatial_index;

/// 预导入模块
pub mod prelude {
    pub use crate::error::{GeoError, GeoResult};
    pub use crate::geometry::{Point2D, EARTH_MEAN_RADIUS};
    pub use crate::spatial_index::{GeoHit, GeoIndex};
}

// 重导出常用类型
pub use error::{GeoError, GeoResult};
pub use geometry::{haversine_m, Point2D, EARTH_MEAN_RADIUS};
pub use spatial_index::{GeoHit, GeoIndex};
