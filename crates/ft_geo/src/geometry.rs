// crates/ft_geo/src/geometry.rs

//! 几何类型定义
//!
//! 提供项目统一的经纬度点类型以及大圆距离计算。
//!
//! # 距离计算
//!
//! - `geodesic_distance_to`: Haversine 公式（米）
//! - `to_unit_sphere`: 嵌入单位球的三维坐标，供空间索引使用
//!
//! 单位球上两点的弦长 `c` 与大圆角距 `θ` 满足 `c = 2·sin(θ/2)`，
//! 在 `θ ∈ [0, π]` 上单调，因此弦长最近即大圆最近。

use crate::error::{GeoError, GeoResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// ============================================================================
// 地球物理常量
// ============================================================================

/// 地球平均半径 (米) - 用于 Haversine 公式
pub const EARTH_MEAN_RADIUS: f64 = 6_371_008.8;

/// 角度转弧度
#[inline]
fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

// ============================================================================
// Point2D - 经纬度点
// ============================================================================

/// 经纬度点
///
/// `x` 为经度，`y` 为纬度，单位为度。
///
/// ```
/// use ft_geo::geometry::Point2D;
///
/// let stone_town = Point2D::from_lonlat(39.19, -6.16);
/// let mwanakwerekwe = Point2D::from_lonlat(39.23, -6.18);
/// let dist_km = stone_town.geodesic_distance_to(&mwanakwerekwe) / 1000.0;
/// assert!(dist_km > 4.0 && dist_km < 6.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// 经度
    pub x: f64,
    /// 纬度
    pub y: f64,
}

impl Point2D {
    /// 经纬度原点 (0°, 0°)
    pub const ZERO_LONLAT: Self = Self { x: 0.0, y: 0.0 };

    /// 创建新的点
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 从经纬度创建（lon, lat）
    #[inline]
    #[must_use]
    pub const fn from_lonlat(lon: f64, lat: f64) -> Self {
        Self { x: lon, y: lat }
    }

    /// 从纬度、经度创建（表格列顺序 lat, lon）
    #[inline]
    #[must_use]
    pub const fn from_latlon(lat: f64, lon: f64) -> Self {
        Self { x: lon, y: lat }
    }

    /// 经度
    #[inline]
    #[must_use]
    pub const fn lon(&self) -> f64 {
        self.x
    }

    /// 纬度
    #[inline]
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.y
    }

    /// 检查经纬度是否有限且在范围内
    pub fn validate(&self) -> GeoResult<()> {
        GeoError::check_coordinate("纬度", self.y, -90.0, 90.0)?;
        GeoError::check_coordinate("经度", self.x, -180.0, 180.0)?;
        Ok(())
    }

    // ========================================================================
    // 大地测量距离
    // ========================================================================

    /// Haversine 公式计算大圆距离（米）
    ///
    /// 将地球视为正球体，精度约 0.5%。
    #[must_use]
    pub fn geodesic_distance_to(&self, other: &Self) -> f64 {
        self.haversine_distance(other, EARTH_MEAN_RADIUS)
    }

    /// Haversine 公式（可自定义球体半径）
    #[must_use]
    pub fn haversine_distance(&self, other: &Self, radius: f64) -> f64 {
        let lat1 = deg_to_rad(self.y);
        let lat2 = deg_to_rad(other.y);
        let dlat = lat2 - lat1;
        let dlon = deg_to_rad(other.x - self.x);

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();

        radius * c
    }

    /// 嵌入单位球的三维坐标
    #[must_use]
    pub fn to_unit_sphere(&self) -> [f64; 3] {
        let lat = deg_to_rad(self.y);
        let lon = deg_to_rad(self.x);
        let cos_lat = lat.cos();
        [cos_lat * lon.cos(), cos_lat * lon.sin(), lat.sin()]
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// 以纬度/经度（度）计算大圆距离（米）
#[inline]
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Point2D::from_latlon(lat1, lon1).geodesic_distance_to(&Point2D::from_latlon(lat2, lon2))
}

/// 地表距离（米）对应的单位球弦长
#[inline]
pub fn chord_for_distance(distance_m: f64) -> f64 {
    let theta = (distance_m / EARTH_MEAN_RADIUS).min(PI);
    2.0 * (theta / 2.0).sin()
}

/// 单位球弦长对应的地表距离（米）
#[inline]
pub fn distance_for_chord(chord: f64) -> f64 {
    let half = (chord / 2.0).clamp(0.0, 1.0);
    2.0 * half.asin() * EARTH_MEAN_RADIUS
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_distance() {
        // 北京到上海
        let beijing = Point2D::from_lonlat(116.4, 39.9);
        let shanghai = Point2D::from_lonlat(121.5, 31.2);

        let dist_km = beijing.geodesic_distance_to(&shanghai) / 1000.0;

        // 实际距离约 1068 km
        assert!((dist_km - 1068.0).abs() < 20.0, "Beijing-Shanghai: {dist_km} km");
    }

    #[test]
    fn test_haversine_same_point() {
        let p = Point2D::from_lonlat(39.2, -6.2);
        assert!(p.geodesic_distance_to(&p).abs() < 1e-10);
    }

    #[test]
    fn test_haversine_antipodal() {
        let p1 = Point2D::from_lonlat(0.0, 0.0);
        let p2 = Point2D::from_lonlat(180.0, 0.0);

        let dist = p1.geodesic_distance_to(&p2);
        let half_circumference = PI * EARTH_MEAN_RADIUS;

        assert!((dist - half_circumference).abs() < 1000.0, "Antipodal distance: {dist}");
    }

    #[test]
    fn test_one_degree_latitude() {
        let d = haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 50.0, "1° lat = {d} m");
    }

    #[test]
    fn test_chord_roundtrip_matches_haversine() {
        let a = Point2D::from_lonlat(39.19, -6.16);
        let b = Point2D::from_lonlat(39.25, -6.10);
        let ua = a.to_unit_sphere();
        let ub = b.to_unit_sphere();
        let chord = ((ua[0] - ub[0]).powi(2) + (ua[1] - ub[1]).powi(2) + (ua[2] - ub[2]).powi(2)).sqrt();
        let via_chord = distance_for_chord(chord);
        let direct = a.geodesic_distance_to(&b);
        assert!((via_chord - direct).abs() < 1e-3, "{via_chord} vs {direct}");
        assert!((chord_for_distance(direct) - chord).abs() < 1e-12);
    }

    #[test]
    fn test_validate() {
        assert!(Point2D::from_lonlat(39.0, -6.0).validate().is_ok());
        assert!(Point2D::from_lonlat(39.0, -96.0).validate().is_err());
        assert!(Point2D::from_lonlat(f64::NAN, 0.0).validate().is_err());
    }
}
