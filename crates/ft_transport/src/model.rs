// crates/ft_transport/src/model.rs

//! 运输模型的数据表
//!
//! - [`SourceRecord`] / [`SourceTable`]: 污染源记录，带拆分来源追踪
//! - [`Receptor`] / [`ReceptorTable`]: 受体（取水井）
//! - [`Link`]: 源-受体链接（运行中间结果，可导出审计）
//! - [`ReceptorResult`]: 每个受体的汇总浓度
//! - [`MappingRow`]: 显式映射表的一行
//!
//! 源表是只追加的记录数组：拆分不会修改原行的身份，
//! 新行通过 `origin` / `parent` 指回原始输入行。

use ft_config::{ContainmentCategory, ReceptorType};
use ft_geo::Point2D;
use serde::Serialize;

// ============================================================================
// 污染源
// ============================================================================

/// 污染源记录（户/厕所）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRecord {
    /// 源 ID（拆分出的行沿用原 ID）
    pub id: String,
    /// 位置
    pub location: Point2D,
    /// 服务人口
    pub population: f64,
    /// 卫生设施类别
    pub category: ContainmentCategory,
    /// 行级效率（输入覆盖或拆分规则指定），优先于情景效率表
    pub efficiency: Option<f64>,
    /// 对数去除值，存在时优先于任何效率
    pub lrv: Option<f64>,
    /// 原始输入行索引
    pub origin: usize,
    /// 拆分来源行索引（原始行为 `None`）
    pub parent: Option<usize>,
}

impl SourceRecord {
    /// 创建原始记录
    pub fn new(
        id: impl Into<String>,
        location: Point2D,
        population: f64,
        category: ContainmentCategory,
    ) -> Self {
        Self {
            id: id.into(),
            location,
            population,
            category,
            efficiency: None,
            lrv: None,
            origin: 0,
            parent: None,
        }
    }

    /// 设置行级效率
    #[must_use]
    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = Some(efficiency);
        self
    }

    /// 设置对数去除值
    #[must_use]
    pub fn with_lrv(mut self, lrv: f64) -> Self {
        self.lrv = Some(lrv);
        self
    }

    /// 是否由拆分产生
    pub fn is_split(&self) -> bool {
        self.parent.is_some()
    }
}

/// 污染源表
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceTable {
    records: Vec<SourceRecord>,
}

impl SourceTable {
    /// 从原始记录创建，`origin` 重置为行号，`parent` 清空
    pub fn new(records: Vec<SourceRecord>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.origin = i;
                r.parent = None;
                r
            })
            .collect();
        Self { records }
    }

    /// 保留现有来源信息直接包装（变换后的表）
    pub(crate) fn from_transformed(records: Vec<SourceRecord>) -> Self {
        Self { records }
    }

    /// 全部记录
    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    /// 可变记录（原地修改类别/效率，不改变人口）
    pub(crate) fn records_mut(&mut self) -> &mut [SourceRecord] {
        &mut self.records
    }

    /// 行数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 迭代
    pub fn iter(&self) -> std::slice::Iter<'_, SourceRecord> {
        self.records.iter()
    }

    /// 总人口
    pub fn total_population(&self) -> f64 {
        ft_foundation::KahanSum::sum_iter(self.records.iter().map(|r| r.population))
    }

    /// 按原始行汇总人口，返回长度为 `n_origins` 的数组
    pub fn population_by_origin(&self, n_origins: usize) -> Vec<f64> {
        let mut sums = vec![ft_foundation::KahanSum::new(); n_origins];
        for r in &self.records {
            if let Some(s) = sums.get_mut(r.origin) {
                s.add(r.population);
            }
        }
        sums.iter().map(|s| s.value()).collect()
    }
}

impl<'a> IntoIterator for &'a SourceTable {
    type Item = &'a SourceRecord;
    type IntoIter = std::slice::Iter<'a, SourceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// 受体
// ============================================================================

/// 受体的流量测量值（原始单位，均可缺失）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlowMeasurements {
    /// L/day（`flow_rate` 或 `flow_l_per_day` 列）
    pub liters_per_day: Option<f64>,
    /// m³/day
    pub cubic_meters_per_day: Option<f64>,
    /// L/s
    pub liters_per_second: Option<f64>,
    /// m³/s
    pub cubic_meters_per_second: Option<f64>,
}

impl FlowMeasurements {
    /// 仅给出 L/day 流量
    pub fn liters_per_day(q: f64) -> Self {
        Self {
            liters_per_day: Some(q),
            ..Self::default()
        }
    }
}

/// 受体（取水井）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receptor {
    /// 受体 ID
    pub id: String,
    /// 位置
    pub location: Point2D,
    /// 类型
    pub kind: ReceptorType,
    /// 流量测量
    pub flow: FlowMeasurements,
}

impl Receptor {
    /// 创建受体
    pub fn new(id: impl Into<String>, location: Point2D, kind: ReceptorType) -> Self {
        Self {
            id: id.into(),
            location,
            kind,
            flow: FlowMeasurements::default(),
        }
    }

    /// 设置流量测量
    #[must_use]
    pub fn with_flow(mut self, flow: FlowMeasurements) -> Self {
        self.flow = flow;
        self
    }
}

/// 受体表
pub type ReceptorTable = Vec<Receptor>;

// ============================================================================
// 显式映射
// ============================================================================

/// 显式映射表的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingRow {
    /// 源 ID
    pub source_id: String,
    /// 受体 ID
    pub receptor_id: String,
    /// 传输时间 [day]
    pub travel_time_days: Option<f64>,
    /// 距离 [m]
    pub distance_m: Option<f64>,
}

// ============================================================================
// 链接与结果
// ============================================================================

/// 源-受体链接
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    /// 源表行索引
    pub source_idx: usize,
    /// 受体表行索引
    pub receptor_idx: usize,
    /// 源 ID
    pub source_id: String,
    /// 受体 ID
    pub receptor_id: String,
    /// 大圆距离 [m]
    pub distance_m: Option<f64>,
    /// 传输时间 [day]
    pub travel_time_days: Option<f64>,
    /// 源负荷（衰减前）
    pub source_load: f64,
    /// 衰减因子 ∈ (0, 1]
    pub decay_factor: f64,
    /// 到达受体的负荷
    pub surviving_load: f64,
    /// 该链接对受体浓度的贡献（输出单位），由汇总阶段填写
    pub concentration: f64,
}

/// 单个受体的汇总结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceptorResult {
    /// 受体 ID
    pub receptor_id: String,
    /// 类型
    pub kind: ReceptorType,
    /// 位置
    pub location: Point2D,
    /// 链接数
    pub link_count: usize,
    /// 到达负荷总和
    pub total_surviving_load: f64,
    /// 使用的流量 [L/day]
    pub flow_l_per_day: f64,
    /// 浓度（输出单位）
    pub concentration: f64,
    /// 风险评分 [0, 100]，仅用于排序与展示
    pub risk_score: f64,
}
