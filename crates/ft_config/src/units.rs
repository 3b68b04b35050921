// crates/ft_config/src/units.rs

//! 单位换算
//!
//! 内部统一单位：流量 L/day，负荷 CFU/day（营养物为 kg/day），
//! 浓度 CFU/L。报告单位仅在输出时换算，换算是纯缩放。

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 一天的秒数
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// 每立方米的升数
pub const LITERS_PER_CUBIC_METER: f64 = 1_000.0;

/// 流量单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowUnit {
    /// L/day（内部单位）
    #[default]
    LitersPerDay,
    /// L/s
    LitersPerSecond,
    /// m³/day
    CubicMetersPerDay,
    /// m³/s
    CubicMetersPerSecond,
}

impl FlowUnit {
    /// 换算到 L/day 的乘数
    pub fn to_liters_per_day_factor(self) -> f64 {
        match self {
            Self::LitersPerDay => 1.0,
            Self::LitersPerSecond => SECONDS_PER_DAY,
            Self::CubicMetersPerDay => LITERS_PER_CUBIC_METER,
            Self::CubicMetersPerSecond => LITERS_PER_CUBIC_METER * SECONDS_PER_DAY,
        }
    }

    /// 将该单位下的流量换算为 L/day
    #[inline]
    pub fn to_liters_per_day(self, value: f64) -> f64 {
        value * self.to_liters_per_day_factor()
    }
}

impl FromStr for FlowUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(' ', "").as_str() {
            "l/day" | "l/d" | "lpd" | "liters_per_day" => Ok(Self::LitersPerDay),
            "l/s" | "lps" | "liters_per_second" => Ok(Self::LitersPerSecond),
            "m3/day" | "m3/d" | "m³/day" | "cubic_meters_per_day" => Ok(Self::CubicMetersPerDay),
            "m3/s" | "m³/s" | "cubic_meters_per_second" => Ok(Self::CubicMetersPerSecond),
            _ => Err(ConfigError::UnknownCategory {
                kind: "流量单位",
                value: s.to_string(),
            }),
        }
    }
}

/// 浓度报告单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationUnit {
    /// 每升
    PerLiter,
    /// 每 100 mL（水质检测常用）
    #[default]
    #[serde(alias = "per_100ml")]
    Per100Ml,
}

impl ConcentrationUnit {
    /// 从每升换算到本单位的乘数
    pub fn per_liter_factor(self) -> f64 {
        match self {
            Self::PerLiter => 1.0,
            Self::Per100Ml => 0.1,
        }
    }

    /// 将每升浓度换算为本单位
    #[inline]
    pub fn convert_from_per_liter(self, per_liter: f64) -> f64 {
        per_liter * self.per_liter_factor()
    }

    /// 单位标签
    pub fn label(self) -> &'static str {
        match self {
            Self::PerLiter => "per_L",
            Self::Per100Ml => "per_100mL",
        }
    }
}

impl fmt::Display for ConcentrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_meter_per_second_to_liters_per_day() {
        assert_eq!(FlowUnit::CubicMetersPerSecond.to_liters_per_day(1.0), 86_400_000.0);
        assert_eq!(FlowUnit::LitersPerSecond.to_liters_per_day(1.0), 86_400.0);
        assert_eq!(FlowUnit::CubicMetersPerDay.to_liters_per_day(2.5), 2_500.0);
    }

    #[test]
    fn test_per_100ml_scales_by_tenth() {
        let c = 12_400.0;
        assert!((ConcentrationUnit::Per100Ml.convert_from_per_liter(c) - 1_240.0).abs() < 1e-9);
        assert_eq!(ConcentrationUnit::PerLiter.convert_from_per_liter(c), c);
        assert_eq!(ConcentrationUnit::Per100Ml.per_liter_factor(), 0.1);
    }

    #[test]
    fn test_parse_flow_unit() {
        assert_eq!("m3/s".parse::<FlowUnit>().unwrap(), FlowUnit::CubicMetersPerSecond);
        assert_eq!("L/s".parse::<FlowUnit>().unwrap(), FlowUnit::LitersPerSecond);
        assert!("gpm".parse::<FlowUnit>().is_err());
    }
}
