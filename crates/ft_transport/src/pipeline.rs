// crates/ft_transport/src/pipeline.rs

//! 单次情景运行
//!
//! [`PipelineContext`] 在一次或多次运行期间持有已加载的源表、受体表
//! 和可选的显式映射表，污染物策略在构建时选定。每次运行：
//!
//! ```text
//! 干预变换 → 源负荷 → 空间链接 → 浓度汇总
//! ```
//!
//! 运行之间不共享可变状态；定向干预所需的基线以参数显式传入。

use crate::aggregator::{ConcentrationAggregator, RunSummary};
use crate::intervention::{apply_scenario, BaselineSnapshot, InterventionReport};
use crate::linker::{MappingStrategy, SpatialLinker};
use crate::load::LoadOutcome;
use crate::model::{Link, MappingRow, Receptor, ReceptorResult, SourceTable};
use crate::pollutant::{compute_loads, model_for, PollutantModel};
use ft_config::{ConcentrationUnit, PollutantKind, Scenario};
use ft_foundation::{DiagnosticLog, FtResult};
use serde::Serialize;
use tracing::info;

/// 一次运行的全部输出
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    /// 情景名称
    pub scenario_name: String,
    /// 污染物
    pub pollutant: PollutantKind,
    /// 浓度单位
    pub unit: ConcentrationUnit,
    /// 变换后的源表
    pub sources: SourceTable,
    /// 与 `sources` 对齐的负荷
    pub loads: Vec<LoadOutcome>,
    /// 链接
    pub links: Vec<Link>,
    /// 与受体表对齐的受体结果
    pub receptors: Vec<ReceptorResult>,
    /// 摘要
    pub summary: RunSummary,
    /// 干预报告
    pub intervention: InterventionReport,
    /// 诊断
    pub diagnostics: DiagnosticLog,
}

impl RunOutput {
    /// 生成可供后续运行使用的基线快照
    pub fn baseline(&self) -> BaselineSnapshot {
        BaselineSnapshot::from_results(&self.receptors)
    }
}

/// 运行上下文
pub struct PipelineContext {
    sources: SourceTable,
    receptors: Vec<Receptor>,
    mapping: Option<Vec<MappingRow>>,
    strategy: MappingStrategy,
    model: Box<dyn PollutantModel>,
}

impl PipelineContext {
    /// 创建上下文（默认半径连接）
    pub fn new(sources: SourceTable, receptors: Vec<Receptor>, pollutant: PollutantKind) -> Self {
        Self {
            sources,
            receptors,
            mapping: None,
            strategy: MappingStrategy::default(),
            model: model_for(pollutant),
        }
    }

    /// 使用显式映射表（优先于映射策略）
    #[must_use]
    pub fn with_mapping(mut self, mapping: Vec<MappingRow>) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// 设置映射策略
    #[must_use]
    pub fn with_strategy(mut self, strategy: MappingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// 原始源表
    pub fn sources(&self) -> &SourceTable {
        &self.sources
    }

    /// 受体表
    pub fn receptors(&self) -> &[Receptor] {
        &self.receptors
    }

    /// 污染物策略
    pub fn model(&self) -> &dyn PollutantModel {
        self.model.as_ref()
    }

    /// 执行一次情景运行
    pub fn run(&self, scenario: &Scenario, baseline: Option<&BaselineSnapshot>) -> FtResult<RunOutput> {
        scenario.validate()?;
        let mut diagnostics = DiagnosticLog::new();

        let (sources, intervention) = apply_scenario(&self.sources, scenario, baseline, &mut diagnostics);
        let loads = compute_loads(self.model(), &sources, scenario, &mut diagnostics);
        let load_values: Vec<f64> = loads.iter().map(|l| l.load).collect();

        let linker = SpatialLinker::new(scenario, self.model());
        let mut links = match &self.mapping {
            Some(mapping) => {
                linker.link_mapping(&sources, &load_values, &self.receptors, mapping, &mut diagnostics)
            }
            None => linker.link(&sources, &load_values, &self.receptors, &self.strategy, &mut diagnostics)?,
        };

        let receptors = ConcentrationAggregator::new(scenario).aggregate(&self.receptors, &mut links, &mut diagnostics);
        let summary = RunSummary::from_results(&load_values, &links, &receptors);

        info!(
            "情景 '{}' ({}): {} 个源, {} 条链接, {} 个受体, 最大浓度 {:.3} {}",
            scenario.name,
            self.model.kind(),
            sources.len(),
            links.len(),
            receptors.len(),
            summary.max_concentration,
            scenario.output_unit
        );

        Ok(RunOutput {
            scenario_name: scenario.name.clone(),
            pollutant: self.model.kind(),
            unit: scenario.output_unit,
            sources,
            loads,
            links,
            receptors,
            summary,
            intervention,
            diagnostics,
        })
    }

    /// 只计算受体浓度（校准网格搜索使用）
    pub fn concentrations(&self, scenario: &Scenario) -> FtResult<Vec<ReceptorResult>> {
        Ok(self.run(scenario, None)?.receptors)
    }
}
