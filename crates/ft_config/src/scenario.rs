// crates/ft_config/src/scenario.rs

//! Scenario - 情景参数包
//!
//! 一次运行的全部可调参数。情景在运行前构建，运行期间只读；
//! 多次运行之间唯一变化的就是情景。
//!
//! 类别相关的查找表（效率、搜索半径、默认流量）都放在本结构内，
//! 作为显式参数传入每个组件，不存在全局可变字典。
//!
//! # 干预顺序
//!
//! [`Scenario::intervention_plan`] 把命名旋钮展开为固定顺序的步骤：
//!
//! 1. 露天排放削减：`OpenDefecation → PitLatrine`
//! 2. 基础设施升级：`PitLatrine → SepticTank`
//! 3. 粪污处理：`SepticTank → SepticTank`（处理后效率）
//! 4. 集中处理效率提升：`Sewered` 效率原地替换
//! 5. 文档中的自由转换规则 `conversions`，按书写顺序
//!
//! 后面的步骤会作用在前面步骤新建的行上。

use crate::category::{ContainmentCategory, ReceptorType};
use crate::error::ConfigError;
use crate::units::ConcentrationUnit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// 污染物
// ============================================================================

/// 污染物类型
///
/// 运输与汇总阶段与污染物无关，具体负荷模型在管线构建时选定一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollutantKind {
    /// 粪便指示菌 (CFU)
    #[default]
    Fio,
    /// 氮 (kg)
    Nitrogen,
    /// 磷 (kg)
    Phosphorus,
}

impl PollutantKind {
    /// 规范名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fio => "fio",
            Self::Nitrogen => "nitrogen",
            Self::Phosphorus => "phosphorus",
        }
    }
}

impl fmt::Display for PollutantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollutantKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fio" | "pathogen" | "ecoli" | "e_coli" => Ok(Self::Fio),
            "nitrogen" | "n" | "tn" => Ok(Self::Nitrogen),
            "phosphorus" | "p" | "tp" => Ok(Self::Phosphorus),
            _ => Err(ConfigError::UnknownCategory {
                kind: "污染物",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// 子配置
// ============================================================================

/// 衰减参数
///
/// 规范衰减基准为距离（`per_meter`，1/m）。`per_day` 仅在链接带有
/// 传输时间时使用（显式映射表），此时优先于距离衰减。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayParams {
    /// 距离衰减常数 k_s [1/m]
    #[serde(default = "default_decay_per_meter")]
    pub per_meter: f64,
    /// 时间衰减常数 k [1/day]
    #[serde(default)]
    pub per_day: Option<f64>,
}

fn default_decay_per_meter() -> f64 { 0.003 }

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            per_meter: default_decay_per_meter(),
            per_day: None,
        }
    }
}

/// 按受体类型的搜索半径 [m]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRadius {
    /// 私有井半径
    #[serde(default = "default_private_radius")]
    pub private: f64,
    /// 政府/社区井半径
    #[serde(default = "default_government_radius")]
    pub government: f64,
}

fn default_private_radius() -> f64 { 35.0 }
fn default_government_radius() -> f64 { 100.0 }

impl Default for SearchRadius {
    fn default() -> Self {
        Self {
            private: default_private_radius(),
            government: default_government_radius(),
        }
    }
}

impl SearchRadius {
    /// 查询某类型的半径
    pub fn for_type(&self, kind: ReceptorType) -> f64 {
        match kind {
            ReceptorType::Private => self.private,
            ReceptorType::Government => self.government,
        }
    }

    /// 最大半径
    pub fn max(&self) -> f64 {
        self.private.max(self.government)
    }
}

/// 按受体类型的默认流量 [L/day]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefaults {
    /// 私有井默认流量
    #[serde(default = "default_private_flow")]
    pub private: f64,
    /// 政府井默认流量
    #[serde(default = "default_government_flow")]
    pub government: f64,
    /// 类型默认值也无效时的兜底流量
    #[serde(default = "default_fallback_flow")]
    pub fallback: f64,
}

fn default_private_flow() -> f64 { 2_000.0 }
fn default_government_flow() -> f64 { 20_000.0 }
fn default_fallback_flow() -> f64 { 2_000.0 }

impl Default for FlowDefaults {
    fn default() -> Self {
        Self {
            private: default_private_flow(),
            government: default_government_flow(),
            fallback: default_fallback_flow(),
        }
    }
}

impl FlowDefaults {
    /// 查询某类型的默认流量
    pub fn for_type(&self, kind: ReceptorType) -> f64 {
        let q = match kind {
            ReceptorType::Private => self.private,
            ReceptorType::Government => self.government,
        };
        if q.is_finite() && q > 0.0 {
            q
        } else {
            self.fallback
        }
    }
}

/// 命名干预旋钮（百分比 0-100）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InterventionKnobs {
    /// 露天排放人口转为坑厕的百分比
    #[serde(default)]
    pub open_defecation_reduction_percent: f64,
    /// 坑厕人口升级为化粪池的百分比
    #[serde(default)]
    pub infrastructure_upgrade_percent: f64,
    /// 化粪池人口接入粪污处理的百分比
    #[serde(default)]
    pub fecal_sludge_treatment_percent: f64,
    /// 粪污处理后的化粪池效率
    #[serde(default)]
    pub fecal_sludge_efficiency: Option<f64>,
    /// 集中处理后的管网效率
    #[serde(default)]
    pub centralized_treatment_efficiency: Option<f64>,
}

/// 类别转换规则：将类别 `from` 中 `percent`% 的人口转为 `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRule {
    /// 源类别
    pub from: ContainmentCategory,
    /// 目标类别
    pub to: ContainmentCategory,
    /// 转换百分比 [0, 100]
    pub percent: f64,
    /// 新行的效率；缺省时使用目标类别的情景效率
    #[serde(default)]
    pub efficiency: Option<f64>,
}

/// 定向干预：升级基线高风险受体周边的全部污染源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetedIntervention {
    /// 选取基线浓度最高的前百分之几的受体 (0, 100]
    pub top_percent: f64,
    /// 受体周边搜索半径 [m]
    pub radius_m: f64,
    /// 升级后的类别
    pub upgrade_to: ContainmentCategory,
    /// 升级后的效率；缺省时使用目标类别的情景效率
    #[serde(default)]
    pub efficiency: Option<f64>,
}

/// 营养物参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientParams {
    /// 人均氮排泄 [kg/person/year]
    #[serde(default = "default_nitrogen_excretion")]
    pub nitrogen_kg_per_person_year: f64,
    /// 人均磷排泄 [kg/person/year]
    #[serde(default = "default_phosphorus_excretion")]
    pub phosphorus_kg_per_person_year: f64,
    /// 各类别氮去除率
    #[serde(default = "default_nitrogen_removal")]
    pub nitrogen_removal: BTreeMap<ContainmentCategory, f64>,
    /// 各类别磷去除率
    #[serde(default = "default_phosphorus_removal")]
    pub phosphorus_removal: BTreeMap<ContainmentCategory, f64>,
}

fn default_nitrogen_excretion() -> f64 { 4.5 }
fn default_phosphorus_excretion() -> f64 { 0.6 }

fn default_nitrogen_removal() -> BTreeMap<ContainmentCategory, f64> {
    BTreeMap::from([
        (ContainmentCategory::Sewered, 0.7),
        (ContainmentCategory::SepticTank, 0.3),
        (ContainmentCategory::PitLatrine, 0.1),
        (ContainmentCategory::OpenDefecation, 0.0),
    ])
}

fn default_phosphorus_removal() -> BTreeMap<ContainmentCategory, f64> {
    BTreeMap::from([
        (ContainmentCategory::Sewered, 0.8),
        (ContainmentCategory::SepticTank, 0.5),
        (ContainmentCategory::PitLatrine, 0.3),
        (ContainmentCategory::OpenDefecation, 0.0),
    ])
}

impl Default for NutrientParams {
    fn default() -> Self {
        Self {
            nitrogen_kg_per_person_year: default_nitrogen_excretion(),
            phosphorus_kg_per_person_year: default_phosphorus_excretion(),
            nitrogen_removal: default_nitrogen_removal(),
            phosphorus_removal: default_phosphorus_removal(),
        }
    }
}

// ============================================================================
// 干预计划
// ============================================================================

/// 展开后的干预步骤
#[derive(Debug, Clone, PartialEq)]
pub enum InterventionStep {
    /// 比例拆分转换
    Convert {
        /// 步骤名称（日志用）
        label: String,
        /// 规则
        rule: ConversionRule,
    },
    /// 原地替换某类别全部行的效率
    SetEfficiency {
        /// 步骤名称
        label: String,
        /// 类别
        category: ContainmentCategory,
        /// 新效率
        efficiency: f64,
    },
}

// ============================================================================
// Scenario
// ============================================================================

/// 情景参数包
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// 情景名称
    #[serde(default = "default_name")]
    pub name: String,

    /// 污染物类型
    #[serde(default)]
    pub pollutant: PollutantKind,

    /// 人口乘数
    #[serde(default = "default_population_factor")]
    pub population_factor: f64,

    /// FIO 人均排放常数 E [CFU/person/day]
    #[serde(default = "default_emission_rate")]
    pub emission_rate: f64,

    /// 各类别默认封存效率 η
    #[serde(default = "default_efficiencies")]
    pub efficiencies: BTreeMap<ContainmentCategory, f64>,

    /// 情景指定的效率覆盖（优先于 `efficiencies`）
    #[serde(default)]
    pub efficiency_overrides: BTreeMap<ContainmentCategory, f64>,

    /// 校准强制效率：对该类别全部行生效，优先于行级 LRV/效率
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub calibrated_efficiencies: BTreeMap<ContainmentCategory, f64>,

    /// 命名干预旋钮
    #[serde(default)]
    pub interventions: InterventionKnobs,

    /// 自由转换规则（在命名旋钮之后应用）
    #[serde(default)]
    pub conversions: Vec<ConversionRule>,

    /// 定向干预（需要基线快照）
    #[serde(default)]
    pub targeted: Option<TargetedIntervention>,

    /// 衰减参数
    #[serde(default)]
    pub decay: DecayParams,

    /// 按受体类型的搜索半径
    #[serde(default)]
    pub search_radius_m: SearchRadius,

    /// 按受体类型的默认流量
    #[serde(default)]
    pub flow_defaults: FlowDefaults,

    /// 浓度报告单位
    #[serde(default)]
    pub output_unit: ConcentrationUnit,

    /// 营养物参数
    #[serde(default)]
    pub nutrients: NutrientParams,
}

fn default_name() -> String { "baseline".to_string() }
fn default_population_factor() -> f64 { 1.0 }
fn default_emission_rate() -> f64 { 1.0e9 }

/// FIO 默认封存效率
pub fn default_fio_efficiency(category: ContainmentCategory) -> f64 {
    match category {
        ContainmentCategory::Sewered => 0.95,
        ContainmentCategory::SepticTank => 0.5,
        ContainmentCategory::PitLatrine => 0.3,
        ContainmentCategory::OpenDefecation => 0.0,
    }
}

fn default_efficiencies() -> BTreeMap<ContainmentCategory, f64> {
    ContainmentCategory::ALL
        .iter()
        .map(|&c| (c, default_fio_efficiency(c)))
        .collect()
}

/// 默认粪污处理后效率
pub const DEFAULT_FECAL_SLUDGE_EFFICIENCY: f64 = 0.8;

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: default_name(),
            pollutant: PollutantKind::default(),
            population_factor: default_population_factor(),
            emission_rate: default_emission_rate(),
            efficiencies: default_efficiencies(),
            efficiency_overrides: BTreeMap::new(),
            calibrated_efficiencies: BTreeMap::new(),
            interventions: InterventionKnobs::default(),
            conversions: Vec::new(),
            targeted: None,
            decay: DecayParams::default(),
            search_radius_m: SearchRadius::default(),
            flow_defaults: FlowDefaults::default(),
            output_unit: ConcentrationUnit::default(),
            nutrients: NutrientParams::default(),
        }
    }
}

impl Scenario {
    /// 某类别的有效效率：校准值 > 覆盖值 > 情景效率表 > 内置默认值
    pub fn efficiency_for(&self, category: ContainmentCategory) -> f64 {
        self.calibrated_efficiencies
            .get(&category)
            .or_else(|| self.efficiency_overrides.get(&category))
            .or_else(|| self.efficiencies.get(&category))
            .copied()
            .unwrap_or_else(|| default_fio_efficiency(category))
    }

    /// 展开干预计划（固定顺序，见模块文档）
    pub fn intervention_plan(&self) -> Vec<InterventionStep> {
        let knobs = &self.interventions;
        let mut steps = Vec::new();

        if knobs.open_defecation_reduction_percent > 0.0 {
            steps.push(InterventionStep::Convert {
                label: "open_defecation_reduction".into(),
                rule: ConversionRule {
                    from: ContainmentCategory::OpenDefecation,
                    to: ContainmentCategory::PitLatrine,
                    percent: knobs.open_defecation_reduction_percent,
                    efficiency: None,
                },
            });
        }
        if knobs.infrastructure_upgrade_percent > 0.0 {
            steps.push(InterventionStep::Convert {
                label: "infrastructure_upgrade".into(),
                rule: ConversionRule {
                    from: ContainmentCategory::PitLatrine,
                    to: ContainmentCategory::SepticTank,
                    percent: knobs.infrastructure_upgrade_percent,
                    efficiency: None,
                },
            });
        }
        if knobs.fecal_sludge_treatment_percent > 0.0 {
            steps.push(InterventionStep::Convert {
                label: "fecal_sludge_treatment".into(),
                rule: ConversionRule {
                    from: ContainmentCategory::SepticTank,
                    to: ContainmentCategory::SepticTank,
                    percent: knobs.fecal_sludge_treatment_percent,
                    efficiency: Some(
                        knobs
                            .fecal_sludge_efficiency
                            .unwrap_or(DEFAULT_FECAL_SLUDGE_EFFICIENCY),
                    ),
                },
            });
        }
        if let Some(eta) = knobs.centralized_treatment_efficiency {
            steps.push(InterventionStep::SetEfficiency {
                label: "centralized_treatment".into(),
                category: ContainmentCategory::Sewered,
                efficiency: eta,
            });
        }
        for (i, rule) in self.conversions.iter().enumerate() {
            steps.push(InterventionStep::Convert {
                label: format!("conversion[{i}]"),
                rule: rule.clone(),
            });
        }
        steps
    }

    /// 验证情景有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn non_negative(key: &str, v: f64) -> Result<(), ConfigError> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::invalid_value(key, v, "必须为非负有限值"))
            }
        }
        fn positive(key: &str, v: f64) -> Result<(), ConfigError> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::invalid_value(key, v, "必须为正的有限值"))
            }
        }
        fn percent(key: &str, v: f64) -> Result<(), ConfigError> {
            if (0.0..=100.0).contains(&v) {
                Ok(())
            } else {
                Err(ConfigError::invalid_value(key, v, "百分比必须在 [0, 100] 范围内"))
            }
        }
        fn finite(key: &str, v: f64) -> Result<(), ConfigError> {
            if v.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::invalid_value(key, v, "必须为有限值"))
            }
        }

        non_negative("population_factor", self.population_factor)?;
        non_negative("emission_rate", self.emission_rate)?;
        non_negative("decay.per_meter", self.decay.per_meter)?;
        if let Some(k) = self.decay.per_day {
            non_negative("decay.per_day", k)?;
        }
        positive("search_radius_m.private", self.search_radius_m.private)?;
        positive("search_radius_m.government", self.search_radius_m.government)?;
        positive("flow_defaults.fallback", self.flow_defaults.fallback)?;

        // 效率越界不致命：加载模型会截断并记录
        for (cat, eta) in self
            .efficiencies
            .iter()
            .chain(&self.efficiency_overrides)
            .chain(&self.calibrated_efficiencies)
        {
            finite(&format!("efficiency.{cat}"), *eta)?;
        }

        let knobs = &self.interventions;
        percent(
            "interventions.open_defecation_reduction_percent",
            knobs.open_defecation_reduction_percent,
        )?;
        percent(
            "interventions.infrastructure_upgrade_percent",
            knobs.infrastructure_upgrade_percent,
        )?;
        percent(
            "interventions.fecal_sludge_treatment_percent",
            knobs.fecal_sludge_treatment_percent,
        )?;
        for (i, rule) in self.conversions.iter().enumerate() {
            percent(&format!("conversions[{i}].percent"), rule.percent)?;
        }
        if let Some(t) = &self.targeted {
            if !(t.top_percent > 0.0 && t.top_percent <= 100.0) {
                return Err(ConfigError::invalid_value(
                    "targeted.top_percent",
                    t.top_percent,
                    "必须在 (0, 100] 范围内",
                ));
            }
            positive("targeted.radius_m", t.radius_m)?;
        }
        non_negative(
            "nutrients.nitrogen_kg_per_person_year",
            self.nutrients.nitrogen_kg_per_person_year,
        )?;
        non_negative(
            "nutrients.phosphorus_kg_per_person_year",
            self.nutrients.phosphorus_kg_per_person_year,
        )?;
        Ok(())
    }

    // ========================================================================
    // 派生情景（返回新值，不修改原情景）
    // ========================================================================

    /// 替换名称
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// 替换距离衰减常数
    #[must_use]
    pub fn with_decay_per_meter(&self, per_meter: f64) -> Self {
        let mut s = self.clone();
        s.decay.per_meter = per_meter;
        s
    }

    /// 按比例缩放排放常数
    #[must_use]
    pub fn with_emission_scale(&self, scale: f64) -> Self {
        Self {
            emission_rate: self.emission_rate * scale,
            ..self.clone()
        }
    }

    /// 替换某类别的效率覆盖
    #[must_use]
    pub fn with_efficiency(&self, category: ContainmentCategory, efficiency: f64) -> Self {
        let mut s = self.clone();
        s.efficiency_overrides.insert(category, efficiency);
        s
    }

    /// 强制某类别全部行使用给定效率（忽略行级 LRV/效率）
    #[must_use]
    pub fn with_calibrated_efficiency(&self, category: ContainmentCategory, efficiency: f64) -> Self {
        let mut s = self.clone();
        s.calibrated_efficiencies.insert(category, efficiency);
        s
    }

    /// 替换污染物类型
    #[must_use]
    pub fn with_pollutant(&self, pollutant: PollutantKind) -> Self {
        Self {
            pollutant,
            ..self.clone()
        }
    }
}
