// crates/ft_io/src/snapshot.rs

//! 基线快照与校准配置文件
//!
//! 基线快照是上一次运行的受体浓度，作为定向干预的显式输入。
//! 支持两种格式：
//!
//! - `.json`：[`BaselineSnapshot`] 的序列化形式
//! - `.csv`：逐受体结果表（`receptor_id, lat, lon, concentration`），
//!   即 [`crate::export::write_receptors`] 的输出

use crate::error::IoError;
use crate::export::write_json;
use crate::table::{Column, CsvTable};
use ft_calibration::CalibrationConfig;
use ft_foundation::{FtError, FtResult};
use ft_transport::{BaselineReceptor, BaselineSnapshot};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const RECEPTOR_ID: Column = Column::new("receptor_id", &["receptor_id", "id"]);
const LAT: Column = Column::new("lat", &["lat", "latitude"]);
const LON: Column = Column::new("lon", &["lon", "lng", "longitude"]);
const CONCENTRATION: Column = Column::new("concentration", &["concentration", "c"]);

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

fn read_text(path: &Path) -> FtResult<String> {
    fs::read_to_string(path).map_err(|e| FtError::io_with_source(format!("无法读取 {}", path.display()), e))
}

/// 读取基线快照，文件不存在返回 `Ok(None)`
pub fn read_baseline(path: &Path) -> FtResult<Option<BaselineSnapshot>> {
    if !path.exists() {
        warn!("基线快照 {} 不存在", path.display());
        return Ok(None);
    }
    let snapshot = match extension(path).as_str() {
        "json" => serde_json::from_str::<BaselineSnapshot>(&read_text(path)?)
            .map_err(|e| IoError::document(path, e.to_string()))?,
        "csv" => baseline_from_table(&CsvTable::from_path("baseline", path)?)?,
        _ => return Err(IoError::UnknownFormat { path: path.to_path_buf() }.into()),
    };
    info!("读取基线快照 {}: {} 个受体", path.display(), snapshot.receptors.len());
    Ok(Some(snapshot))
}

fn baseline_from_table(table: &CsvTable) -> FtResult<BaselineSnapshot> {
    let cols = table.require(&[RECEPTOR_ID, LAT, LON, CONCENTRATION])?;
    let receptors = table
        .rows()
        .map(|row| {
            Ok(BaselineReceptor {
                receptor_id: row.required_text(RECEPTOR_ID.name, cols[0])?.to_string(),
                location: row.location(cols[1], cols[2])?,
                concentration: row.number_at(CONCENTRATION.name, cols[3])?,
            })
        })
        .collect::<FtResult<Vec<_>>>()?;
    Ok(BaselineSnapshot::new(receptors))
}

/// 写出基线快照（JSON）
pub fn write_baseline(path: &Path, snapshot: &BaselineSnapshot) -> FtResult<()> {
    write_json(path, snapshot)
}

/// 读取校准配置（`.toml` 或 `.json`）
pub fn read_calibration_config(path: &Path) -> FtResult<CalibrationConfig> {
    let text = read_text(path)?;
    let config: CalibrationConfig = match extension(path).as_str() {
        "toml" => toml::from_str(&text).map_err(|e| IoError::document(path, e.to_string()))?,
        "json" => serde_json::from_str(&text).map_err(|e| IoError::document(path, e.to_string()))?,
        _ => return Err(IoError::UnknownFormat { path: path.to_path_buf() }.into()),
    };
    config.validate()?;
    Ok(config)
}
