// crates/ft_geo/src/spatial_index.rs
//! 球面空间索引
//!
//! 基于 R-tree 的空间索引。点先嵌入单位球（三维笛卡尔坐标），
//! 半径查询转换为弦长查询，最近邻直接使用弦长，
//! 结果与 Haversine 距离一致，无需处理日期变更线和极点。
//!
//! # 示例
//!
//! ```
//! use ft_geo::spatial_index::GeoIndex;
//! use ft_geo::geometry::Point2D;
//!
//! let index = GeoIndex::bulk_load(vec![
//!     (Point2D::from_lonlat(39.1900, -6.1600), "BH-1"),
//!     (Point2D::from_lonlat(39.3000, -6.2000), "BH-2"),
//! ]);
//!
//! let hit = index.nearest(&Point2D::from_lonlat(39.1901, -6.1601)).unwrap();
//! assert_eq!(*hit.data, "BH-1");
//! ```

use crate::geometry::{chord_for_distance, Point2D};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

// ============================================================================
// R-tree 包装
// ============================================================================

/// 空间索引条目
#[derive(Debug, Clone)]
struct GeoEntry<T> {
    /// 插入序号，用于结果排序的稳定性
    seq: usize,
    point: Point2D,
    xyz: [f64; 3],
    data: T,
}

impl<T> RTreeObject for GeoEntry<T> {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xyz)
    }
}

impl<T> PointDistance for GeoEntry<T> {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.xyz[0] - point[0];
        let dy = self.xyz[1] - point[1];
        let dz = self.xyz[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// 查询命中
#[derive(Debug, Clone, Copy)]
pub struct GeoHit<'a, T> {
    /// 条目的插入序号（bulk_load 输入中的位置）
    pub seq: usize,
    /// 条目位置
    pub point: &'a Point2D,
    /// 到查询点的大圆距离 [m]
    pub distance_m: f64,
    /// 关联数据
    pub data: &'a T,
}

/// 球面空间索引
pub struct GeoIndex<T> {
    tree: RTree<GeoEntry<T>>,
}

impl<T> Default for GeoIndex<T> {
    fn default() -> Self {
        Self { tree: RTree::new() }
    }
}

impl<T> GeoIndex<T> {
    /// 从点集批量构建
    #[must_use]
    pub fn bulk_load(points: Vec<(Point2D, T)>) -> Self {
        let entries: Vec<GeoEntry<T>> = points
            .into_iter()
            .enumerate()
            .map(|(seq, (point, data))| GeoEntry {
                seq,
                xyz: point.to_unit_sphere(),
                point,
                data,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// 查询给定大圆半径内的全部点
    ///
    /// 结果按距离升序排列，距离相同时按插入序号升序。
    #[must_use]
    pub fn within_radius(&self, center: &Point2D, radius_m: f64) -> Vec<GeoHit<'_, T>> {
        if radius_m.is_nan() || radius_m < 0.0 {
            return Vec::new();
        }
        let chord = chord_for_distance(radius_m);
        // 弦长阈值略微放宽，再用 Haversine 精确过滤
        let chord_2 = (chord * (1.0 + 1e-9)).powi(2);
        let mut hits: Vec<GeoHit<'_, T>> = self
            .tree
            .locate_within_distance(center.to_unit_sphere(), chord_2)
            .map(|entry| GeoHit {
                seq: entry.seq,
                point: &entry.point,
                distance_m: entry.point.geodesic_distance_to(center),
                data: &entry.data,
            })
            .filter(|hit| hit.distance_m <= radius_m)
            .collect();
        hits.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m).then(a.seq.cmp(&b.seq)));
        hits
    }

    /// 查询最近的点
    ///
    /// 多个点等距时返回插入序号最小者。索引为空时返回 `None`。
    #[must_use]
    pub fn nearest(&self, query: &Point2D) -> Option<GeoHit<'_, T>> {
        let xyz = query.to_unit_sphere();
        let mut iter = self.tree.nearest_neighbor_iter(&xyz);
        let first = iter.next()?;
        let best_d2 = first.distance_2(&xyz);
        let mut best = first;
        for entry in iter {
            if entry.distance_2(&xyz) > best_d2 {
                break;
            }
            if entry.seq < best.seq {
                best = entry;
            }
        }
        Some(GeoHit {
            seq: best.seq,
            point: &best.point,
            distance_m: best.point.geodesic_distance_to(query),
            data: &best.data,
        })
    }

    /// 返回索引中的点数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// 检查索引是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_north(p: Point2D, meters: f64) -> Point2D {
        // 1° 纬度 ≈ 111.195 km
        Point2D::from_lonlat(p.x, p.y + meters / 111_195.0)
    }

    #[test]
    fn test_within_radius_filters_by_distance() {
        let center = Point2D::from_lonlat(39.2, -6.2);
        let index = GeoIndex::bulk_load(vec![
            (offset_north(center, 10.0), 1u32),
            (offset_north(center, 30.0), 2),
            (offset_north(center, 80.0), 3),
        ]);

        let hits = index.within_radius(&center, 35.0);
        let ids: Vec<u32> = hits.iter().map(|h| *h.data).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!((hits[0].distance_m - 10.0).abs() < 0.1);
    }

    #[test]
    fn test_within_radius_matches_brute_force() {
        let center = Point2D::from_lonlat(39.2, -6.2);
        let mut points = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                let p = Point2D::from_lonlat(39.2 + (i as f64 - 10.0) * 1e-4, -6.2 + (j as f64 - 10.0) * 1e-4);
                points.push((p, i * 20 + j));
            }
        }
        let expected: Vec<usize> = points
            .iter()
            .filter(|(p, _)| p.geodesic_distance_to(&center) <= 50.0)
            .map(|(_, id)| *id)
            .collect();
        let index = GeoIndex::bulk_load(points);
        let mut got: Vec<usize> = index.within_radius(&center, 50.0).iter().map(|h| *h.data).collect();
        got.sort_unstable();
        let mut expected = expected;
        expected.sort_unstable();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_nearest_across_antimeridian() {
        let index = GeoIndex::bulk_load(vec![
            (Point2D::from_lonlat(179.999, 0.0), "east"),
            (Point2D::from_lonlat(170.0, 0.0), "far"),
        ]);
        let hit = index.nearest(&Point2D::from_lonlat(-179.999, 0.0)).unwrap();
        assert_eq!(*hit.data, "east");
        assert!(hit.distance_m < 500.0);
    }

    #[test]
    fn test_nearest_tie_prefers_first_inserted() {
        let p = Point2D::from_lonlat(39.2, -6.2);
        let index = GeoIndex::bulk_load(vec![(p, "a"), (p, "b")]);
        assert_eq!(*index.nearest(&p).unwrap().data, "a");
    }

    #[test]
    fn test_empty_index() {
        let index: GeoIndex<u32> = GeoIndex::default();
        assert!(index.is_empty());
        assert!(index.nearest(&Point2D::ZERO_LONLAT).is_none());
        assert!(index.within_radius(&Point2D::ZERO_LONLAT, 100.0).is_empty());
    }
}
