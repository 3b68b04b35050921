// crates/ft_calibration/src/observation.rs

//! 野外观测与实验室读数解析
//!
//! 实验室记录中常见非数值代码：
//!
//! | 原始值 | 解析 |
//! |--------|------|
//! | 空白 / `NA` / `N/A` / `-` / `nd` | 缺失 |
//! | `TNTC` / `numerous` / `too numerous to count` | 上限值（默认 2420，MPN 上限） |
//! | `<N` | 0（低于检出限） |
//! | `>N` | N |
//! | `1,200` | 1200 |

use ft_geo::Point2D;
use serde::{Deserialize, Serialize};

/// MPN 方法的计数上限
pub const DEFAULT_TNTC_CAP: f64 = 2_420.0;

/// 实验室读数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum LabValue {
    /// 缺失
    Missing,
    /// 数值
    Numeric(f64),
    /// 低于检出限（`<N`）
    BelowDetection(f64),
    /// 高于读数上限（`>N`）
    AboveDetection(f64),
    /// 过多无法计数
    TooNumerous,
}

impl LabValue {
    /// 解析原始读数
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "" | "na" | "n/a" | "nan" | "-" | "--" | "nd" | "null" | "none" => return Self::Missing,
            _ => {}
        }
        if lower.starts_with("tntc") || lower.contains("numerous") || lower == "tnc" {
            return Self::TooNumerous;
        }
        if let Some(rest) = s.strip_prefix('<') {
            return parse_number(rest).map_or(Self::Missing, Self::BelowDetection);
        }
        if let Some(rest) = s.strip_prefix('>') {
            return parse_number(rest).map_or(Self::Missing, Self::AboveDetection);
        }
        parse_number(s).map_or(Self::Missing, Self::Numeric)
    }

    /// 用于计算的数值
    pub fn value(self, tntc_cap: f64) -> Option<f64> {
        match self {
            Self::Missing => None,
            Self::Numeric(v) => Some(v),
            Self::BelowDetection(_) => Some(0.0),
            Self::AboveDetection(v) => Some(v),
            Self::TooNumerous => Some(tntc_cap),
        }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim().trim_start_matches('=').trim();
    let cleaned: String = s.chars().filter(|c| *c != ',' && *c != '_').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// 读数解析参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabParseConfig {
    /// TNTC 的替代值
    #[serde(default = "default_cap")]
    pub tntc_cap: f64,
}

fn default_cap() -> f64 { DEFAULT_TNTC_CAP }

impl Default for LabParseConfig {
    fn default() -> Self {
        Self {
            tntc_cap: DEFAULT_TNTC_CAP,
        }
    }
}

/// 野外观测
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// 观测 ID
    pub id: String,
    /// 采样位置
    pub location: Point2D,
    /// 原始读数
    pub raw: String,
    /// 解析后的读数
    pub lab: LabValue,
    /// 解析后的数值（缺失为 `None`）
    pub value: Option<f64>,
    /// 单位（仅记录）
    pub units: Option<String>,
}

impl Observation {
    /// 由原始读数创建
    pub fn from_raw(id: impl Into<String>, location: Point2D, raw: &str, config: &LabParseConfig) -> Self {
        let lab = LabValue::parse(raw);
        Self {
            id: id.into(),
            location,
            raw: raw.to_string(),
            lab,
            value: lab.value(config.tntc_cap),
            units: None,
        }
    }

    /// 由数值创建
    pub fn numeric(id: impl Into<String>, location: Point2D, value: f64) -> Self {
        Self {
            id: id.into(),
            location,
            raw: value.to_string(),
            lab: LabValue::Numeric(value),
            value: Some(value),
            units: None,
        }
    }

    /// 设置单位
    #[must_use]
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lab_codes() {
        assert_eq!(LabValue::parse(""), LabValue::Missing);
        assert_eq!(LabValue::parse(" NA "), LabValue::Missing);
        assert_eq!(LabValue::parse("-"), LabValue::Missing);
        assert_eq!(LabValue::parse("TNTC"), LabValue::TooNumerous);
        assert_eq!(LabValue::parse("Too numerous to count"), LabValue::TooNumerous);
        assert_eq!(LabValue::parse("<1"), LabValue::BelowDetection(1.0));
        assert_eq!(LabValue::parse(">2419.6"), LabValue::AboveDetection(2419.6));
        assert_eq!(LabValue::parse("1,200"), LabValue::Numeric(1200.0));
        assert_eq!(LabValue::parse("abc"), LabValue::Missing);
    }

    #[test]
    fn test_values_used_for_metrics() {
        let cap = DEFAULT_TNTC_CAP;
        assert_eq!(LabValue::parse("numerous").value(cap), Some(2_420.0));
        assert_eq!(LabValue::parse("<10").value(cap), Some(0.0));
        assert_eq!(LabValue::parse(">200").value(cap), Some(200.0));
        assert_eq!(LabValue::parse("").value(cap), None);
    }

    #[test]
    fn test_observation_from_raw() {
        let cfg = LabParseConfig { tntc_cap: 1_000.0 };
        let obs = Observation::from_raw("OB-1", Point2D::ZERO_LONLAT, "TNTC", &cfg);
        assert_eq!(obs.value, Some(1_000.0));
        assert_eq!(obs.raw, "TNTC");
    }
}
