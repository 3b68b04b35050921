// crates/ft_config/src/category.rs

//! 卫生设施类别与受体类型
//!
//! 两者都是闭合枚举：无效类别在表格加载时即报错，
//! 而不是在运行中以字符串比较的形式悄悄漏过。

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ContainmentCategory
// ============================================================================

/// 卫生设施（粪便封存）类别
///
/// 表格中既可以使用整数代码 1-4，也可以使用名称或别名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentCategory {
    /// 接入污水管网 (1)
    Sewered,
    /// 化粪池 (2)
    SepticTank,
    /// 坑式厕所 (3)
    PitLatrine,
    /// 露天排放 (4)
    #[serde(alias = "open_release")]
    OpenDefecation,
}

impl ContainmentCategory {
    /// 全部类别，按代码顺序
    pub const ALL: [Self; 4] = [
        Self::Sewered,
        Self::SepticTank,
        Self::PitLatrine,
        Self::OpenDefecation,
    ];

    /// 整数代码
    pub fn code(self) -> u8 {
        match self {
            Self::Sewered => 1,
            Self::SepticTank => 2,
            Self::PitLatrine => 3,
            Self::OpenDefecation => 4,
        }
    }

    /// 从整数代码创建
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Sewered),
            2 => Some(Self::SepticTank),
            3 => Some(Self::PitLatrine),
            4 => Some(Self::OpenDefecation),
            _ => None,
        }
    }

    /// 配置/表格中使用的规范名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sewered => "sewered",
            Self::SepticTank => "septic_tank",
            Self::PitLatrine => "pit_latrine",
            Self::OpenDefecation => "open_defecation",
        }
    }
}

impl fmt::Display for ContainmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainmentCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        if let Ok(code) = key.parse::<u8>() {
            return Self::from_code(code).ok_or(ConfigError::UnknownCategory {
                kind: "卫生设施类别",
                value: s.to_string(),
            });
        }
        match key.as_str() {
            "sewered" | "sewer" | "sewerage" => Ok(Self::Sewered),
            "septic_tank" | "septic" => Ok(Self::SepticTank),
            "pit_latrine" | "pit" | "latrine" => Ok(Self::PitLatrine),
            "open_defecation" | "open" | "open_release" | "od" => Ok(Self::OpenDefecation),
            _ => Err(ConfigError::UnknownCategory {
                kind: "卫生设施类别",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// ReceptorType
// ============================================================================

/// 受体（取水点）类型
///
/// 不同类型的取水模式不同，搜索半径和默认流量分别配置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceptorType {
    /// 私有井
    #[default]
    Private,
    /// 政府/社区井
    Government,
}

impl ReceptorType {
    /// 全部类型
    pub const ALL: [Self; 2] = [Self::Private, Self::Government];

    /// 规范名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Government => "government",
        }
    }
}

impl fmt::Display for ReceptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceptorType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" | "household" => Ok(Self::Private),
            "government" | "public" | "community" => Ok(Self::Government),
            _ => Err(ConfigError::UnknownCategory {
                kind: "受体类型",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_and_aliases() {
        assert_eq!("1".parse::<ContainmentCategory>().unwrap(), ContainmentCategory::Sewered);
        assert_eq!(" 4 ".parse::<ContainmentCategory>().unwrap(), ContainmentCategory::OpenDefecation);
        assert_eq!("Septic".parse::<ContainmentCategory>().unwrap(), ContainmentCategory::SepticTank);
        assert_eq!("pit-latrine".parse::<ContainmentCategory>().unwrap(), ContainmentCategory::PitLatrine);
        assert_eq!("open release".parse::<ContainmentCategory>().unwrap(), ContainmentCategory::OpenDefecation);
        assert!("5".parse::<ContainmentCategory>().is_err());
        assert!("bucket".parse::<ContainmentCategory>().is_err());
    }

    #[test]
    fn test_code_roundtrip() {
        for c in ContainmentCategory::ALL {
            assert_eq!(ContainmentCategory::from_code(c.code()), Some(c));
        }
    }

    #[test]
    fn test_receptor_type_parse() {
        assert_eq!("Public".parse::<ReceptorType>().unwrap(), ReceptorType::Government);
        assert_eq!("private".parse::<ReceptorType>().unwrap(), ReceptorType::Private);
        assert!("mine".parse::<ReceptorType>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ContainmentCategory::SepticTank).unwrap();
        assert_eq!(json, "\"septic_tank\"");
        let parsed: ContainmentCategory = serde_json::from_str("\"open_release\"").unwrap();
        assert_eq!(parsed, ContainmentCategory::OpenDefecation);
    }
}
