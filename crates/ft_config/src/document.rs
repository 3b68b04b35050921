// crates/ft_config/src/document.rs

//! 情景文档加载
//!
//! 支持 TOML 与 JSON 两种格式，按扩展名选择解析器。
//! 未识别的键不会导致失败：每个未知键产生一条 `UnknownKey` 诊断，
//! 随 [`ScenarioDocument`] 返回，由调用方决定是否视为错误
//! （CLI 的 `validate --strict`）。
//!
//! 以类别为键的映射（`efficiencies` 等）接受 [`ContainmentCategory`] 的
//! 全部别名，解析前统一为规范名称；无法识别的类别键同样按未知键处理。

use crate::category::ContainmentCategory;
use crate::error::ConfigError;
use crate::scenario::Scenario;
use ft_foundation::{DiagnosticKind, DiagnosticLog};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// 顶层允许的键
const TOP_LEVEL_KEYS: &[&str] = &[
    "name",
    "pollutant",
    "population_factor",
    "emission_rate",
    "efficiencies",
    "efficiency_overrides",
    "calibrated_efficiencies",
    "interventions",
    "conversions",
    "targeted",
    "decay",
    "search_radius_m",
    "flow_defaults",
    "output_unit",
    "nutrients",
];

/// 各子节允许的键
const SECTION_KEYS: &[(&str, &[&str])] = &[
    (
        "interventions",
        &[
            "open_defecation_reduction_percent",
            "infrastructure_upgrade_percent",
            "fecal_sludge_treatment_percent",
            "fecal_sludge_efficiency",
            "centralized_treatment_efficiency",
        ],
    ),
    ("targeted", &["top_percent", "radius_m", "upgrade_to", "efficiency"]),
    ("decay", &["per_meter", "per_day"]),
    ("search_radius_m", &["private", "government"]),
    ("flow_defaults", &["private", "government", "fallback"]),
    (
        "nutrients",
        &[
            "nitrogen_kg_per_person_year",
            "phosphorus_kg_per_person_year",
            "nitrogen_removal",
            "phosphorus_removal",
        ],
    ),
];

/// 以类别为键的映射：(所在节, 键)，顶层映射的节为空
const CATEGORY_MAPS: &[(&str, &str)] = &[
    ("", "efficiencies"),
    ("", "efficiency_overrides"),
    ("", "calibrated_efficiencies"),
    ("nutrients", "nitrogen_removal"),
    ("nutrients", "phosphorus_removal"),
];

/// 转换规则允许的键
const CONVERSION_KEYS: &[&str] = &["from", "to", "percent", "efficiency"];

/// 加载后的情景文档
#[derive(Debug, Clone)]
pub struct ScenarioDocument {
    /// 情景
    pub scenario: Scenario,
    /// 加载过程中的诊断（未知键等）
    pub diagnostics: DiagnosticLog,
}

impl ScenarioDocument {
    /// 是否存在未知键
    pub fn has_unknown_keys(&self) -> bool {
        self.diagnostics.has(DiagnosticKind::UnknownKey)
    }
}

/// 从文件加载情景，按扩展名选择 TOML 或 JSON
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<ScenarioDocument, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    debug!("加载情景文档: {}", path.display());
    match ext.as_str() {
        "toml" => parse_scenario_toml(&content),
        "json" => parse_scenario_json(&content),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// 解析 TOML 情景文本
pub fn parse_scenario_toml(text: &str) -> Result<ScenarioDocument, ConfigError> {
    let value: Value = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    from_value(value)
}

/// 解析 JSON 情景文本
pub fn parse_scenario_json(text: &str) -> Result<ScenarioDocument, ConfigError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    from_value(value)
}

fn from_value(value: Value) -> Result<ScenarioDocument, ConfigError> {
    let mut diagnostics = DiagnosticLog::new();
    let Value::Object(mut root) = value else {
        return Err(ConfigError::Parse("情景文档顶层必须是表/对象".into()));
    };

    // 未知键记录后移除
    let unknown: Vec<String> = root
        .keys()
        .filter(|k| !TOP_LEVEL_KEYS.contains(&k.as_str()))
        .cloned()
        .collect();
    for key in unknown {
        root.remove(&key);
        diagnostics.push(DiagnosticKind::UnknownKey, "scenario", None, format!("忽略未知键 '{key}'"));
    }

    for (section, allowed) in SECTION_KEYS {
        if let Some(Value::Object(table)) = root.get_mut(*section) {
            strip_unknown(table, allowed, section, &mut diagnostics);
        }
    }
    for (section, key) in CATEGORY_MAPS {
        let parent = if section.is_empty() {
            Some(&mut root)
        } else {
            match root.get_mut(*section) {
                Some(Value::Object(table)) => Some(table),
                _ => None,
            }
        };
        if let Some(Value::Object(map)) = parent.and_then(|p| p.get_mut(*key)) {
            let context = if section.is_empty() {
                key.to_string()
            } else {
                format!("{section}.{key}")
            };
            normalize_category_keys(map, &context, &mut diagnostics);
        }
    }
    if let Some(Value::Array(rules)) = root.get_mut("conversions") {
        for (i, rule) in rules.iter_mut().enumerate() {
            if let Value::Object(table) = rule {
                strip_unknown(table, CONVERSION_KEYS, &format!("conversions[{i}]"), &mut diagnostics);
            }
        }
    }

    let scenario: Scenario =
        serde_json::from_value(Value::Object(root)).map_err(|e| ConfigError::Parse(e.to_string()))?;
    scenario.validate()?;
    Ok(ScenarioDocument {
        scenario,
        diagnostics,
    })
}

fn strip_unknown(
    table: &mut serde_json::Map<String, Value>,
    allowed: &[&str],
    context: &str,
    diagnostics: &mut DiagnosticLog,
) {
    let unknown: Vec<String> = table
        .keys()
        .filter(|k| !allowed.contains(&k.as_str()))
        .cloned()
        .collect();
    for key in unknown {
        table.remove(&key);
        diagnostics.push(
            DiagnosticKind::UnknownKey,
            context.to_string(),
            None,
            format!("忽略未知键 '{key}'"),
        );
    }
}

/// 类别键统一为规范名称，无法识别的键移除并记录
fn normalize_category_keys(
    map: &mut serde_json::Map<String, Value>,
    context: &str,
    diagnostics: &mut DiagnosticLog,
) {
    let entries = std::mem::take(map);
    for (key, value) in entries {
        match key.parse::<ContainmentCategory>() {
            Ok(category) => {
                map.insert(category.as_str().to_string(), value);
            }
            Err(_) => diagnostics.push(
                DiagnosticKind::UnknownKey,
                context.to_string(),
                None,
                format!("忽略未知类别 '{key}'"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::ContainmentCategory;
    use std::io::Write;

    const TOML_DOC: &str = r#"
name = "upgrade_20"
emission_rate = 2.0e9

[efficiency_overrides]
pit_latrine = 0.4

[interventions]
infrastructure_upgrade_percent = 20.0

[decay]
per_meter = 0.005

[[conversions]]
from = "septic_tank"
to = "sewered"
percent = 10.0
"#;

    #[test]
    fn test_parse_toml_document() {
        let doc = parse_scenario_toml(TOML_DOC).unwrap();
        let s = &doc.scenario;
        assert_eq!(s.name, "upgrade_20");
        assert_eq!(s.emission_rate, 2.0e9);
        assert_eq!(s.efficiency_for(ContainmentCategory::PitLatrine), 0.4);
        assert_eq!(s.decay.per_meter, 0.005);
        assert_eq!(s.conversions.len(), 1);
        assert!(doc.diagnostics.is_empty());
        // 未给出的节使用默认值
        assert_eq!(s.search_radius_m.government, 100.0);
    }

    #[test]
    fn test_unknown_keys_are_reported_not_fatal() {
        let doc = parse_scenario_json(
            r#"{"name": "x", "colour": "blue", "decay": {"per_meter": 0.01, "half_life": 3}}"#,
        )
        .unwrap();
        assert!(doc.has_unknown_keys());
        assert_eq!(doc.diagnostics.count(DiagnosticKind::UnknownKey), 2);
        assert_eq!(doc.scenario.decay.per_meter, 0.01);
    }

    #[test]
    fn test_invalid_document_fails() {
        assert!(parse_scenario_json("[1, 2]").is_err());
        assert!(parse_scenario_toml("decay = { per_meter = -1.0 }").is_err());
    }

    #[test]
    fn test_unknown_category_keys_are_reported() {
        let doc = parse_scenario_json(
            r#"{"efficiencies": {"bucket": 0.5, "Pit-Latrine": 0.45},
                "nutrients": {"nitrogen_removal": {"2": 0.35, "compost": 0.9}}}"#,
        )
        .unwrap();
        assert_eq!(doc.diagnostics.count(DiagnosticKind::UnknownKey), 2);
        let s = &doc.scenario;
        assert_eq!(s.efficiency_for(ContainmentCategory::PitLatrine), 0.45);
        assert_eq!(s.nutrients.nitrogen_removal[&ContainmentCategory::SepticTank], 0.35);
    }

    #[test]
    fn test_load_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(TOML_DOC.as_bytes()).unwrap();

        let doc = load_scenario(&path).unwrap();
        assert_eq!(doc.scenario.name, "upgrade_20");

        let bad = dir.path().join("scenario.yaml");
        std::fs::write(&bad, "name: x").unwrap();
        assert!(matches!(load_scenario(&bad), Err(ConfigError::UnsupportedFormat(_))));
    }
}
