// crates/ft_geo/src/error.rs
//! 地理空间处理错误类型
//!
//! 所有错误可转换为 `ft_foundation::FtError` 向上传播。

use ft_foundation::FtError;
use thiserror::Error;

/// Geo 模块结果类型
pub type GeoResult<T> = Result<T, GeoError>;

/// 地理空间处理错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// 坐标超出有效范围
    #[error("{coord_type} 超出范围: {value:.6} (允许范围: {min} 到 {max})")]
    CoordinateOutOfRange {
        /// 坐标类型（"纬度" 或 "经度"）
        coord_type: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// 非有限坐标
    #[error("{coord_type} 不是有限值: {value}")]
    NonFiniteCoordinate {
        /// 坐标类型
        coord_type: &'static str,
        /// 实际值
        value: f64,
    },

    /// 半径无效
    #[error("搜索半径无效: {radius} m")]
    InvalidRadius {
        /// 半径 [m]
        radius: f64,
    },
}

impl From<GeoError> for FtError {
    fn from(err: GeoError) -> Self {
        FtError::invalid_input(err.to_string())
    }
}

impl GeoError {
    /// 创建坐标越界错误
    #[inline]
    pub fn coordinate_out_of_range(coord_type: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::CoordinateOutOfRange {
            coord_type,
            value,
            min,
            max,
        }
    }

    /// 验证坐标范围
    #[inline]
    pub fn check_coordinate(coord_type: &'static str, value: f64, min: f64, max: f64) -> GeoResult<()> {
        if !value.is_finite() {
            return Err(Self::NonFiniteCoordinate { coord_type, value });
        }
        if !(min..=max).contains(&value) {
            return Err(Self::coordinate_out_of_range(coord_type, value, min, max));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_coordinate() {
        assert!(GeoError::check_coordinate("经度", 120.0, -180.0, 180.0).is_ok());
        assert!(GeoError::check_coordinate("经度", 200.0, -180.0, 180.0).is_err());
        assert!(matches!(
            GeoError::check_coordinate("纬度", f64::NAN, -90.0, 90.0),
            Err(GeoError::NonFiniteCoordinate { .. })
        ));
    }

    #[test]
    fn test_geo_error_to_ft_error() {
        let geo_err = GeoError::coordinate_out_of_range("纬度", 95.5, -90.0, 90.0);
        let ft_err: FtError = geo_err.into();
        match ft_err {
            FtError::InvalidInput { message } => {
                assert!(message.contains("纬度"));
                assert!(message.contains("95.5"));
            }
            _ => panic!("错误的FtError类型"),
        }
    }
}
