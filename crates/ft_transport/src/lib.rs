// crates/ft_transport/src/lib.rs

//! FioTrace Transport Layer
//!
//! 污染源到取水受体的三层运输引擎与情景干预变换。
//!
//! # 模块概览
//!
//! - [`model`]: 源表、受体表、链接与结果
//! - [`load`]: 源负荷公式、LRV、衰减
//! - [`pollutant`]: 污染物策略（FIO / 氮 / 磷）
//! - [`intervention`]: 情景干预（比例拆分、效率替换、定向升级）与质量守恒检查
//! - [`linker`]: 基于球面 R-tree 的半径连接与映射策略
//! - [`aggregator`]: 受体负荷汇总、流量解析、单位换算、风险评分
//! - [`pipeline`]: 单次情景运行
//!
//! # 示例
//!
//! ```
//! use ft_transport::prelude::*;
//! use ft_config::{ContainmentCategory, PollutantKind, ReceptorType, Scenario};
//! use ft_geo::Point2D;
//!
//! let sources = SourceTable::new(vec![SourceRecord::new(
//!     "HH-1",
//!     Point2D::from_lonlat(39.19, -6.1601),
//!     8.0,
//!     ContainmentCategory::PitLatrine,
//! )]);
//! let receptors = vec![Receptor::new("BH-1", Point2D::from_lonlat(39.19, -6.16), ReceptorType::Private)];
//!
//! let ctx = PipelineContext::new(sources, receptors, PollutantKind::Fio);
//! let out = ctx.run(&Scenario::default(), None).unwrap();
//! assert_eq!(out.links.len(), 1);
//! assert!(out.receptors[0].concentration > 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod intervention;
pub mod linker;
pub mod load;
pub mod model;
pub mod pipeline;
pub mod pollutant;

/// 预导入模块
pub mod prelude {
    pub use crate::aggregator::{risk_score, ConcentrationAggregator, RunSummary};
    pub use crate::intervention::{apply_scenario, check_mass_conservation, BaselineReceptor, BaselineSnapshot};
    pub use crate::linker::{MappingStrategy, SpatialLinker};
    pub use crate::model::{
        FlowMeasurements, Link, MappingRow, Receptor, ReceptorResult, SourceRecord, SourceTable,
    };
    pub use crate::pipeline::{PipelineContext, RunOutput};
    pub use crate::pollutant::{model_for, PollutantModel};
}

pub use intervention::{BaselineReceptor, BaselineSnapshot};
pub use linker::MappingStrategy;
pub use model::{FlowMeasurements, Link, MappingRow, Receptor, ReceptorResult, SourceRecord, SourceTable};
pub use pipeline::{PipelineContext, RunOutput};
