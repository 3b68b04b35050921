// crates/ft_io/src/export.rs

//! 结果导出
//!
//! - 逐链接 CSV、逐受体 CSV
//! - 网格搜索 CSV（每个被搜索的类别效率占一列）
//! - 匹配对 CSV
//! - 任意可序列化摘要的 JSON

use crate::error::IoError;
use ft_calibration::grid::GridSearchReport;
use ft_calibration::MatchedPair;
use ft_config::{ConcentrationUnit, ContainmentCategory};
use ft_foundation::{FtError, FtResult};
use ft_transport::{Link, ReceptorResult};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

fn create_parent(path: &Path) -> FtResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| FtError::io_with_source(format!("无法创建目录 {}", dir.display()), e))?;
    }
    Ok(())
}

fn csv_writer(path: &Path) -> FtResult<csv::Writer<File>> {
    create_parent(path)?;
    let file = File::create(path)
        .map_err(|e| FtError::io_with_source(format!("无法创建 {}", path.display()), e))?;
    Ok(csv::Writer::from_writer(file))
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> FtResult<usize> {
    let mut wtr = csv_writer(path)?;
    let mut n = 0;
    for row in rows {
        wtr.serialize(row).map_err(|e| IoError::csv(path, e))?;
        n += 1;
    }
    wtr.flush()
        .map_err(|e| FtError::io_with_source(format!("写入 {} 失败", path.display()), e))?;
    Ok(n)
}

// ============================================================================
// 运行结果
// ============================================================================

#[derive(Serialize)]
struct LinkRow<'a> {
    source_id: &'a str,
    receptor_id: &'a str,
    distance_m: Option<f64>,
    travel_time_days: Option<f64>,
    source_load: f64,
    decay_factor: f64,
    surviving_load: f64,
    concentration: f64,
    unit: &'static str,
}

/// 写出逐链接结果
pub fn write_links(path: &Path, links: &[Link], unit: ConcentrationUnit) -> FtResult<()> {
    let n = write_rows(
        path,
        links.iter().map(|l| LinkRow {
            source_id: &l.source_id,
            receptor_id: &l.receptor_id,
            distance_m: l.distance_m,
            travel_time_days: l.travel_time_days,
            source_load: l.source_load,
            decay_factor: l.decay_factor,
            surviving_load: l.surviving_load,
            concentration: l.concentration,
            unit: unit.label(),
        }),
    )?;
    info!("写出 {n} 条链接到 {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct ReceptorRow<'a> {
    receptor_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    lat: f64,
    lon: f64,
    link_count: usize,
    total_surviving_load: f64,
    flow_l_per_day: f64,
    concentration: f64,
    unit: &'static str,
    risk_score: f64,
}

/// 写出逐受体结果（包括没有链接的受体）
pub fn write_receptors(path: &Path, results: &[ReceptorResult], unit: ConcentrationUnit) -> FtResult<()> {
    let n = write_rows(
        path,
        results.iter().map(|r| ReceptorRow {
            receptor_id: &r.receptor_id,
            kind: r.kind.as_str(),
            lat: r.location.lat(),
            lon: r.location.lon(),
            link_count: r.link_count,
            total_surviving_load: r.total_surviving_load,
            flow_l_per_day: r.flow_l_per_day,
            concentration: r.concentration,
            unit: unit.label(),
            risk_score: r.risk_score,
        }),
    )?;
    info!("写出 {n} 个受体到 {}", path.display());
    Ok(())
}

// ============================================================================
// 校准结果
// ============================================================================

fn opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// 写出网格搜索结果
pub fn write_grid(path: &Path, report: &GridSearchReport) -> FtResult<()> {
    let categories: BTreeSet<ContainmentCategory> = report
        .results
        .iter()
        .flat_map(|r| r.point.efficiencies.keys().copied())
        .collect();

    let mut wtr = csv_writer(path)?;
    let mut header: Vec<String> = vec!["index".into(), "decay_per_meter".into(), "emission_scale".into()];
    header.extend(categories.iter().map(|c| format!("efficiency_{c}")));
    header.extend(
        [
            "n_pairs", "log_rmse", "log_bias", "pearson", "pearson_log", "spearman", "kendall", "best",
        ]
        .map(String::from),
    );
    wtr.write_record(&header).map_err(|e| IoError::csv(path, e))?;

    for r in &report.results {
        let mut record = vec![
            r.index.to_string(),
            r.point.decay_per_meter.to_string(),
            r.point.emission_scale.to_string(),
        ];
        record.extend(categories.iter().map(|c| opt(r.point.efficiencies.get(c).copied())));
        let m = &r.metrics;
        record.extend([
            m.n_pairs.to_string(),
            opt(m.log_rmse),
            opt(m.log_bias),
            opt(m.pearson),
            opt(m.pearson_log),
            opt(m.spearman),
            opt(m.kendall),
            (report.best == Some(r.index)).to_string(),
        ]);
        wtr.write_record(&record).map_err(|e| IoError::csv(path, e))?;
    }
    wtr.flush()
        .map_err(|e| FtError::io_with_source(format!("写入 {} 失败", path.display()), e))?;
    info!("写出 {} 个网格点到 {}", report.results.len(), path.display());
    Ok(())
}

/// 写出匹配对
pub fn write_pairs(path: &Path, pairs: &[MatchedPair]) -> FtResult<()> {
    let n = write_rows(path, pairs)?;
    info!("写出 {n} 个匹配对到 {}", path.display());
    Ok(())
}

/// 以带缩进的 JSON 写出摘要
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> FtResult<()> {
    create_parent(path)?;
    let text = serde_json::to_string_pretty(value).map_err(|e| FtError::serialization(e.to_string()))?;
    fs::write(path, text).map_err(|e| FtError::io_with_source(format!("写入 {} 失败", path.display()), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_calibration::grid::{GridPoint, GridResult, Objective};
    use ft_calibration::CalibrationMetrics;
    use std::collections::BTreeMap;

    #[test]
    fn test_grid_csv_has_category_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        let result = |i: usize, eta: f64| GridResult {
            index: i,
            point: GridPoint {
                decay_per_meter: 0.003,
                emission_scale: 1.0,
                efficiencies: BTreeMap::from([(ContainmentCategory::PitLatrine, eta)]),
            },
            metrics: CalibrationMetrics {
                n_pairs: 3,
                log_rmse: Some(0.5 + eta),
                ..CalibrationMetrics::default()
            },
        };
        let report = GridSearchReport {
            objective: Objective::MinimizeLogRmse,
            results: vec![result(0, 0.1), result(1, 0.3)],
            best: Some(0),
        };
        write_grid(&path, &report).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.contains("efficiency_pit_latrine"));
        assert!(lines.next().unwrap().ends_with("true"));
        assert!(lines.next().unwrap().ends_with("false"));
    }

    #[test]
    fn test_json_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/summary.json");
        write_json(&path, &BTreeMap::from([("a", 1)])).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("\"a\": 1"));
    }
}
