// crates/ft_transport/src/linker.rs

//! 空间链接
//!
//! 为每个受体找出搜索半径内的全部污染源，计算到达受体的负荷：
//!
//! ```text
//! surviving_load = source_load · exp(−k_s · distance_m)
//! ```
//!
//! 半径按受体类型配置。空间索引建在较小的一侧，从另一侧发起半径查询；
//! 两侧都很小时直接双重循环。无论哪种路径，距离都以
//! `源 → 受体` 方向重新计算，输出按 `(受体行, 源行)` 排序，
//! 结果与索引选择无关。
//!
//! 负荷非正的源不参与链接。

use crate::load::{decay_factor, DecayBasis, DecayInputs};
use crate::model::{Link, MappingRow, Receptor, SourceTable};
use crate::pollutant::PollutantModel;
use ft_config::Scenario;
use ft_foundation::{DiagnosticKind, DiagnosticLog, FtError, FtResult};
use ft_geo::GeoIndex;
use std::collections::HashMap;
use tracing::debug;

/// 源×受体对数低于该值时使用双重循环
pub const NAIVE_PAIR_LIMIT: usize = 4_096;

/// 半径查询时的相对放宽量，随后按精确距离过滤
const RADIUS_SLACK: f64 = 1e-9;

/// 映射策略（无显式映射表时生成源-受体对）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MappingStrategy {
    /// 按受体类型半径连接
    #[default]
    RadiusJoin,
    /// 每个源连接最近的受体
    Nearest,
    /// 所有源连接到同一个受体
    SingleReceptor(String),
    /// 源按顺序轮流分配给受体
    RoundRobin,
}

impl std::str::FromStr for MappingStrategy {
    type Err = FtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(id) = s.strip_prefix("single:") {
            return Ok(Self::SingleReceptor(id.to_string()));
        }
        match s.to_ascii_lowercase().as_str() {
            "radius" | "radius_join" => Ok(Self::RadiusJoin),
            "nearest" => Ok(Self::Nearest),
            "round_robin" | "roundrobin" => Ok(Self::RoundRobin),
            _ => Err(FtError::invalid_input(format!(
                "未知映射策略 '{s}' (radius / nearest / round_robin / single:<受体ID>)"
            ))),
        }
    }
}

/// 空间链接器
pub struct SpatialLinker<'a> {
    scenario: &'a Scenario,
    model: &'a dyn PollutantModel,
    naive_pair_limit: usize,
}

/// 链接前的候选对
struct Candidate {
    source_idx: usize,
    receptor_idx: usize,
    distance_m: Option<f64>,
    travel_time_days: Option<f64>,
}

impl<'a> SpatialLinker<'a> {
    /// 创建链接器
    pub fn new(scenario: &'a Scenario, model: &'a dyn PollutantModel) -> Self {
        Self {
            scenario,
            model,
            naive_pair_limit: NAIVE_PAIR_LIMIT,
        }
    }

    /// 设置双重循环阈值（0 表示始终使用索引）
    #[must_use]
    pub fn with_naive_pair_limit(mut self, limit: usize) -> Self {
        self.naive_pair_limit = limit;
        self
    }

    /// 按策略生成链接
    ///
    /// `loads` 与 `sources` 按行对齐。
    pub fn link(
        &self,
        sources: &SourceTable,
        loads: &[f64],
        receptors: &[Receptor],
        strategy: &MappingStrategy,
        diagnostics: &mut DiagnosticLog,
    ) -> FtResult<Vec<Link>> {
        let active = active_sources(loads);
        if active.is_empty() || receptors.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = match strategy {
            MappingStrategy::RadiusJoin => self.radius_candidates(sources, &active, receptors),
            MappingStrategy::Nearest => nearest_candidates(sources, &active, receptors),
            MappingStrategy::SingleReceptor(id) => {
                let r = receptors
                    .iter()
                    .position(|r| &r.id == id)
                    .ok_or_else(|| FtError::not_found(format!("受体 '{id}'")))?;
                active
                    .iter()
                    .map(|&s| candidate(sources, receptors, s, r))
                    .collect()
            }
            MappingStrategy::RoundRobin => active
                .iter()
                .enumerate()
                .map(|(k, &s)| candidate(sources, receptors, s, k % receptors.len()))
                .collect(),
        };

        Ok(self.finish(sources, loads, receptors, candidates, diagnostics))
    }

    /// 按显式映射表生成链接
    ///
    /// 源 ID 匹配全部同 ID 行（包括拆分产生的行）。
    /// 引用未知 ID 的映射行记录诊断后跳过。
    pub fn link_mapping(
        &self,
        sources: &SourceTable,
        loads: &[f64],
        receptors: &[Receptor],
        mapping: &[MappingRow],
        diagnostics: &mut DiagnosticLog,
    ) -> Vec<Link> {
        let mut source_rows: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, r) in sources.iter().enumerate() {
            if is_active(loads.get(i).copied()) {
                source_rows.entry(r.id.as_str()).or_default().push(i);
            }
        }
        let all_ids: std::collections::HashSet<&str> = sources.iter().map(|r| r.id.as_str()).collect();
        let mut receptor_rows: HashMap<&str, usize> = HashMap::new();
        for (i, r) in receptors.iter().enumerate() {
            receptor_rows.entry(r.id.as_str()).or_insert(i);
        }

        let mut candidates = Vec::new();
        for (row, m) in mapping.iter().enumerate() {
            let Some(&r_idx) = receptor_rows.get(m.receptor_id.as_str()) else {
                diagnostics.push(
                    DiagnosticKind::RowDropped,
                    "mapping",
                    Some(row),
                    format!("未知受体 '{}'", m.receptor_id),
                );
                continue;
            };
            let Some(rows) = source_rows.get(m.source_id.as_str()) else {
                if !all_ids.contains(m.source_id.as_str()) {
                    diagnostics.push(
                        DiagnosticKind::RowDropped,
                        "mapping",
                        Some(row),
                        format!("未知污染源 '{}'", m.source_id),
                    );
                }
                continue;
            };
            for &s_idx in rows {
                let distance_m = match (m.distance_m, m.travel_time_days) {
                    (Some(d), _) => Some(d),
                    (None, None) => Some(
                        sources.records()[s_idx]
                            .location
                            .geodesic_distance_to(&receptors[r_idx].location),
                    ),
                    (None, Some(_)) => None,
                };
                candidates.push(Candidate {
                    source_idx: s_idx,
                    receptor_idx: r_idx,
                    distance_m,
                    travel_time_days: m.travel_time_days,
                });
            }
        }

        self.finish(sources, loads, receptors, candidates, diagnostics)
    }

    /// 双重循环半径连接（参考实现）
    pub fn link_naive(
        &self,
        sources: &SourceTable,
        loads: &[f64],
        receptors: &[Receptor],
        diagnostics: &mut DiagnosticLog,
    ) -> Vec<Link> {
        let active = active_sources(loads);
        let candidates = self.naive_candidates(sources, &active, receptors);
        self.finish(sources, loads, receptors, candidates, diagnostics)
    }

    // ========================================================================
    // 候选生成
    // ========================================================================

    fn radius_for(&self, receptor: &Receptor) -> f64 {
        self.scenario.search_radius_m.for_type(receptor.kind)
    }

    fn radius_candidates(
        &self,
        sources: &SourceTable,
        active: &[usize],
        receptors: &[Receptor],
    ) -> Vec<Candidate> {
        if active.len().saturating_mul(receptors.len()) <= self.naive_pair_limit {
            return self.naive_candidates(sources, active, receptors);
        }

        let records = sources.records();
        let mut out = Vec::new();
        if receptors.len() <= active.len() {
            debug!("空间索引建在受体一侧 ({} 个)", receptors.len());
            let index = GeoIndex::bulk_load(
                receptors.iter().enumerate().map(|(i, r)| (r.location, i)).collect(),
            );
            let max_radius = self.scenario.search_radius_m.max() * (1.0 + RADIUS_SLACK);
            for &s in active {
                let p = &records[s].location;
                for hit in index.within_radius(p, max_radius) {
                    let r = *hit.data;
                    let d = p.geodesic_distance_to(&receptors[r].location);
                    if d <= self.radius_for(&receptors[r]) {
                        out.push(Candidate {
                            source_idx: s,
                            receptor_idx: r,
                            distance_m: Some(d),
                            travel_time_days: None,
                        });
                    }
                }
            }
        } else {
            debug!("空间索引建在污染源一侧 ({} 个)", active.len());
            let index = GeoIndex::bulk_load(active.iter().map(|&s| (records[s].location, s)).collect());
            for (r, receptor) in receptors.iter().enumerate() {
                let radius = self.radius_for(receptor);
                for hit in index.within_radius(&receptor.location, radius * (1.0 + RADIUS_SLACK)) {
                    let s = *hit.data;
                    let d = records[s].location.geodesic_distance_to(&receptor.location);
                    if d <= radius {
                        out.push(Candidate {
                            source_idx: s,
                            receptor_idx: r,
                            distance_m: Some(d),
                            travel_time_days: None,
                        });
                    }
                }
            }
        }
        out
    }

    fn naive_candidates(
        &self,
        sources: &SourceTable,
        active: &[usize],
        receptors: &[Receptor],
    ) -> Vec<Candidate> {
        let records = sources.records();
        let mut out = Vec::new();
        for (r, receptor) in receptors.iter().enumerate() {
            let radius = self.radius_for(receptor);
            for &s in active {
                let d = records[s].location.geodesic_distance_to(&receptor.location);
                if d <= radius {
                    out.push(Candidate {
                        source_idx: s,
                        receptor_idx: r,
                        distance_m: Some(d),
                        travel_time_days: None,
                    });
                }
            }
        }
        out
    }

    // ========================================================================
    // 衰减与输出
    // ========================================================================

    fn finish(
        &self,
        sources: &SourceTable,
        loads: &[f64],
        receptors: &[Receptor],
        mut candidates: Vec<Candidate>,
        diagnostics: &mut DiagnosticLog,
    ) -> Vec<Link> {
        candidates.sort_by_key(|c| (c.receptor_idx, c.source_idx));

        let records = sources.records();
        let mut pass_through = 0usize;
        let links: Vec<Link> = candidates
            .into_iter()
            .map(|c| {
                let source_load = loads[c.source_idx];
                let (factor, basis) = if self.model.decays() {
                    decay_factor(
                        DecayInputs {
                            travel_time_days: c.travel_time_days,
                            distance_m: c.distance_m,
                        },
                        &self.scenario.decay,
                    )
                } else {
                    (1.0, DecayBasis::Conservative)
                };
                if basis == DecayBasis::PassThrough {
                    pass_through += 1;
                }
                Link {
                    source_idx: c.source_idx,
                    receptor_idx: c.receptor_idx,
                    source_id: records[c.source_idx].id.clone(),
                    receptor_id: receptors[c.receptor_idx].id.clone(),
                    distance_m: c.distance_m,
                    travel_time_days: c.travel_time_days,
                    source_load,
                    decay_factor: factor,
                    surviving_load: source_load * factor,
                    concentration: 0.0,
                }
            })
            .collect();

        if pass_through > 0 {
            diagnostics.notice(
                "linker",
                format!("{pass_through} 条链接缺少衰减输入，负荷未衰减"),
            );
        }
        debug!("生成链接 {} 条", links.len());
        links
    }
}

fn is_active(load: Option<f64>) -> bool {
    matches!(load, Some(l) if l.is_finite() && l > 0.0)
}

fn active_sources(loads: &[f64]) -> Vec<usize> {
    loads
        .iter()
        .enumerate()
        .filter(|(_, l)| is_active(Some(**l)))
        .map(|(i, _)| i)
        .collect()
}

fn candidate(sources: &SourceTable, receptors: &[Receptor], s: usize, r: usize) -> Candidate {
    Candidate {
        source_idx: s,
        receptor_idx: r,
        distance_m: Some(
            sources.records()[s]
                .location
                .geodesic_distance_to(&receptors[r].location),
        ),
        travel_time_days: None,
    }
}

fn nearest_candidates(sources: &SourceTable, active: &[usize], receptors: &[Receptor]) -> Vec<Candidate> {
    let index = GeoIndex::bulk_load(receptors.iter().enumerate().map(|(i, r)| (r.location, i)).collect());
    active
        .iter()
        .filter_map(|&s| {
            let hit = index.nearest(&sources.records()[s].location)?;
            Some(candidate(sources, receptors, s, *hit.data))
        })
        .collect()
}
