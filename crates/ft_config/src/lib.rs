// crates/ft_config/src/lib.rs

//! FioTrace Config Layer
//!
//! 配置层，提供情景（Scenario）参数包、闭合的类别枚举以及单位换算。
//! 情景在运行前构建，运行期间只读；派生情景通过 `with_*` 方法生成新值。
//!
//! # 模块概览
//!
//! - [`category`]: 卫生设施类别 `ContainmentCategory`、受体类型 `ReceptorType`
//! - [`units`]: 流量单位 `FlowUnit`、浓度单位 `ConcentrationUnit`
//! - [`scenario`]: `Scenario` 及其子配置、干预计划展开
//! - [`document`]: 从 TOML/JSON 文档加载情景，未知键告警
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! Layer 5: ft_cli
//! Layer 4: ft_io, ft_calibration
//! Layer 3: ft_transport   ─> 读取 Scenario
//! Layer 2: ft_config      ─> Scenario, 类别, 单位 (本层)
//! Layer 1: ft_foundation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod category;
pub mod document;
pub mod error;
pub mod scenario;
pub mod units;

// 重导出核心类型
pub use category::{ContainmentCategory, ReceptorType};
pub use document::{load_scenario, parse_scenario_json, parse_scenario_toml, ScenarioDocument};
pub use error::ConfigError;
pub use scenario::{
    ConversionRule, DecayParams, FlowDefaults, InterventionKnobs, InterventionStep,
    NutrientParams, PollutantKind, Scenario, SearchRadius, TargetedIntervention,
};
pub use units::{ConcentrationUnit, FlowUnit};
