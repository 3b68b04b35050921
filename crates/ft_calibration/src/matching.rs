// crates/ft_calibration/src/matching.rs

//! 观测-预测最近邻匹配
//!
//! 每个观测匹配大圆距离最近的一个受体，记录匹配距离。
//! 远距离匹配不会被自动拒绝，需要时由调用方用
//! [`filter_by_distance`] 过滤。

use crate::observation::Observation;
use ft_geo::{GeoIndex, Point2D};
use ft_transport::ReceptorResult;
use serde::Serialize;

/// 匹配对
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair {
    /// 观测行索引
    pub observation_idx: usize,
    /// 受体行索引
    pub receptor_idx: usize,
    /// 观测 ID
    pub observation_id: String,
    /// 受体 ID
    pub receptor_id: String,
    /// 观测值（缺失为 `None`）
    pub observed: Option<f64>,
    /// 预测浓度
    pub predicted: f64,
    /// 匹配距离 [m]
    pub distance_m: f64,
}

impl MatchedPair {
    /// 两侧数值都有效
    pub fn is_complete(&self) -> bool {
        matches!(self.observed, Some(o) if o.is_finite()) && self.predicted.is_finite()
    }
}

/// 匹配结果的索引部分（与预测值无关，可在多次运行间复用）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchIndex {
    /// 观测行索引
    pub observation_idx: usize,
    /// 受体行索引
    pub receptor_idx: usize,
    /// 匹配距离 [m]
    pub distance_m: f64,
}

/// 为每个观测找到最近受体的索引
///
/// 受体位置在情景之间不变，网格搜索只需计算一次。
pub fn nearest_receptors(observations: &[Observation], receptor_locations: &[Point2D]) -> Vec<MatchIndex> {
    if receptor_locations.is_empty() {
        return Vec::new();
    }
    let index = GeoIndex::bulk_load(receptor_locations.iter().copied().enumerate().map(|(i, p)| (p, i)).collect());
    observations
        .iter()
        .enumerate()
        .filter_map(|(o, obs)| {
            let hit = index.nearest(&obs.location)?;
            Some(MatchIndex {
                observation_idx: o,
                receptor_idx: *hit.data,
                distance_m: hit.distance_m,
            })
        })
        .collect()
}

/// 用当前预测值填充匹配对
pub fn build_pairs(
    matches: &[MatchIndex],
    observations: &[Observation],
    receptors: &[ReceptorResult],
) -> Vec<MatchedPair> {
    matches
        .iter()
        .filter_map(|m| {
            let obs = observations.get(m.observation_idx)?;
            let rec = receptors.get(m.receptor_idx)?;
            Some(MatchedPair {
                observation_idx: m.observation_idx,
                receptor_idx: m.receptor_idx,
                observation_id: obs.id.clone(),
                receptor_id: rec.receptor_id.clone(),
                observed: obs.value,
                predicted: rec.concentration,
                distance_m: m.distance_m,
            })
        })
        .collect()
}

/// 观测与受体预测的最近邻匹配
pub fn match_observations(observations: &[Observation], receptors: &[ReceptorResult]) -> Vec<MatchedPair> {
    let locations: Vec<Point2D> = receptors.iter().map(|r| r.location).collect();
    build_pairs(&nearest_receptors(observations, &locations), observations, receptors)
}

/// 按最大匹配距离过滤
pub fn filter_by_distance(pairs: &[MatchedPair], max_distance_m: f64) -> Vec<MatchedPair> {
    pairs
        .iter()
        .filter(|p| p.distance_m <= max_distance_m)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_config::ReceptorType;

    fn result(id: &str, p: Point2D, c: f64) -> ReceptorResult {
        ReceptorResult {
            receptor_id: id.into(),
            kind: ReceptorType::Private,
            location: p,
            link_count: 1,
            total_surviving_load: c,
            flow_l_per_day: 1.0,
            concentration: c,
            risk_score: 0.0,
        }
    }

    #[test]
    fn test_each_observation_matches_closest() {
        let a = Point2D::from_lonlat(39.20, -6.20);
        let b = Point2D::from_lonlat(39.25, -6.20);
        let obs = vec![
            Observation::numeric("O-a", Point2D::from_lonlat(39.2001, -6.2), 5.0),
            Observation::numeric("O-b", Point2D::from_lonlat(39.2499, -6.2), 50.0),
        ];
        let receptors = vec![result("R-b", b, 40.0), result("R-a", a, 4.0)];

        let pairs = match_observations(&obs, &receptors);
        assert_eq!(pairs[0].receptor_id, "R-a");
        assert_eq!(pairs[1].receptor_id, "R-b");
        assert_eq!(pairs[0].predicted, 4.0);
        assert!(pairs[0].distance_m < 20.0);

        // 追加远处受体不改变匹配
        let mut more = receptors.clone();
        more.push(result("R-far", Point2D::from_lonlat(40.0, -7.0), 1.0e6));
        let again = match_observations(&obs, &more);
        assert_eq!(
            again.iter().map(|p| p.receptor_id.as_str()).collect::<Vec<_>>(),
            vec!["R-a", "R-b"]
        );
    }

    #[test]
    fn test_distant_matches_kept_until_filtered() {
        let obs = vec![Observation::numeric("O", Point2D::from_lonlat(39.0, -6.0), 1.0)];
        let receptors = vec![result("R", Point2D::from_lonlat(39.1, -6.0), 1.0)];
        let pairs = match_observations(&obs, &receptors);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].distance_m > 10_000.0);
        assert!(filter_by_distance(&pairs, 500.0).is_empty());
    }

    #[test]
    fn test_no_receptors_no_pairs() {
        let obs = vec![Observation::numeric("O", Point2D::ZERO_LONLAT, 1.0)];
        assert!(match_observations(&obs, &[]).is_empty());
    }
}
