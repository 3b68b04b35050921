// crates/ft_io/src/import.rs

//! 输入表导入
//!
//! | 表 | 必需列 | 可选列 |
//! |----|--------|--------|
//! | sources | `id, lat, lon, population, category_id` | `efficiency_override, lrv` |
//! | receptors | `id, lat, lon` | `type, flow_rate / flow_l_per_day, flow_m3_per_day, flow_l_per_s, flow_m3_per_s` |
//! | mapping | `source_id, receptor_id` | `travel_time, distance` |
//! | observations | `lat, lon, lab_value` | `id, units` |
//!
//! 结构性问题（缺列、坐标无法解析、类别无法识别）对该表是致命的；
//! 可恢复的问题（受体类型未知、流量无法解析）记录到诊断后继续。

use crate::table::{Column, CsvTable, Row};
use ft_calibration::observation::{LabParseConfig, Observation};
use ft_config::{ContainmentCategory, ReceptorType};
use ft_foundation::{DiagnosticKind, DiagnosticLog, FtResult};
use ft_transport::{FlowMeasurements, MappingRow, Receptor, SourceRecord, SourceTable};
use std::io::Read;
use std::path::Path;
use tracing::info;

// ============================================================================
// 列定义
// ============================================================================

const ID: Column = Column::new("id", &["id", "source_id", "receptor_id", "site_id", "sample_id"]);
const LAT: Column = Column::new("lat", &["lat", "latitude", "y"]);
const LON: Column = Column::new("lon", &["lon", "long", "lng", "longitude", "x"]);
const POPULATION: Column = Column::new("population", &["population", "pop", "people"]);
const CATEGORY: Column = Column::new("category_id", &["category_id", "category", "containment", "toilet_category"]);
const EFFICIENCY: Column = Column::new("efficiency_override", &["efficiency_override", "efficiency", "eta"]);
const LRV: Column = Column::new("lrv", &["lrv", "log_reduction"]);

const RECEPTOR_TYPE: Column = Column::new("type", &["type", "receptor_type", "kind", "borehole_type"]);
const FLOW_L_DAY: Column = Column::new("flow_l_per_day", &["flow_l_per_day", "flow_rate", "q_l_per_day"]);
const FLOW_M3_DAY: Column = Column::new("flow_m3_per_day", &["flow_m3_per_day", "q_m3_per_day"]);
const FLOW_L_S: Column = Column::new("flow_l_per_s", &["flow_l_per_s", "q_l_per_s"]);
const FLOW_M3_S: Column = Column::new("flow_m3_per_s", &["flow_m3_per_s", "q_m3_per_s"]);

const MAP_SOURCE: Column = Column::new("source_id", &["source_id", "source"]);
const MAP_RECEPTOR: Column = Column::new("receptor_id", &["receptor_id", "receptor", "borehole_id"]);
const TRAVEL_TIME: Column = Column::new("travel_time", &["travel_time", "travel_time_days", "travel_days"]);
const DISTANCE: Column = Column::new("distance", &["distance", "distance_m"]);

const LAB_VALUE: Column = Column::new("lab_value", &["lab_value", "lab_value_raw", "value", "result", "count"]);
const UNITS: Column = Column::new("units", &["units", "unit"]);

// ============================================================================
// sources
// ============================================================================

/// 读取源表
pub fn read_sources(path: &Path, diagnostics: &mut DiagnosticLog) -> FtResult<SourceTable> {
    let table = CsvTable::from_path("sources", path)?;
    let sources = sources_from_table(&table, diagnostics)?;
    info!("读取源表 {}: {} 行, 总人口 {:.0}", path.display(), sources.len(), sources.total_population());
    Ok(sources)
}

/// 从读取器解析源表
pub fn parse_sources<R: Read>(reader: R, diagnostics: &mut DiagnosticLog) -> FtResult<SourceTable> {
    let table = CsvTable::from_reader("sources", reader, Path::new("<sources>"))?;
    sources_from_table(&table, diagnostics)
}

fn sources_from_table(table: &CsvTable, diagnostics: &mut DiagnosticLog) -> FtResult<SourceTable> {
    let cols = table.require(&[ID, LAT, LON, POPULATION, CATEGORY])?;
    let (id, lat, lon, pop, cat) = (cols[0], cols[1], cols[2], cols[3], cols[4]);
    let eff = table.find(&EFFICIENCY);
    let lrv = table.find(&LRV);

    let mut records = Vec::with_capacity(table.len());
    for row in table.rows() {
        let location = row.location(lat, lon)?;
        let population = row.number_at(POPULATION.name, pop)?;
        let raw_cat = row.text(cat);
        let category: ContainmentCategory = raw_cat
            .parse()
            .map_err(|_| row.invalid(CATEGORY.name, raw_cat, "无法识别的卫生设施类别"))?;

        let mut record = SourceRecord::new(row.required_text(ID.name, id)?, location, population, category);
        if let Some(e) = row.optional_number(EFFICIENCY.name, eff)? {
            record = record.with_efficiency(e);
        }
        if let Some(v) = row.optional_number(LRV.name, lrv)? {
            record = record.with_lrv(v);
        }
        records.push(record);
    }
    if records.is_empty() {
        diagnostics.notice("sources", "源表没有数据行");
    }
    Ok(SourceTable::new(records))
}

// ============================================================================
// receptors
// ============================================================================

/// 读取受体表
pub fn read_receptors(path: &Path, diagnostics: &mut DiagnosticLog) -> FtResult<Vec<Receptor>> {
    let table = CsvTable::from_path("receptors", path)?;
    let receptors = receptors_from_table(&table, diagnostics)?;
    info!("读取受体表 {}: {} 行", path.display(), receptors.len());
    Ok(receptors)
}

/// 从读取器解析受体表
pub fn parse_receptors<R: Read>(reader: R, diagnostics: &mut DiagnosticLog) -> FtResult<Vec<Receptor>> {
    let table = CsvTable::from_reader("receptors", reader, Path::new("<receptors>"))?;
    receptors_from_table(&table, diagnostics)
}

fn receptors_from_table(table: &CsvTable, diagnostics: &mut DiagnosticLog) -> FtResult<Vec<Receptor>> {
    let cols = table.require(&[ID, LAT, LON])?;
    let (id, lat, lon) = (cols[0], cols[1], cols[2]);
    let kind_col = table.find(&RECEPTOR_TYPE);
    let flow_cols = [
        (FLOW_L_DAY, table.find(&FLOW_L_DAY)),
        (FLOW_M3_DAY, table.find(&FLOW_M3_DAY)),
        (FLOW_L_S, table.find(&FLOW_L_S)),
        (FLOW_M3_S, table.find(&FLOW_M3_S)),
    ];

    let mut receptors = Vec::with_capacity(table.len());
    for row in table.rows() {
        let location = row.location(lat, lon)?;
        let kind = receptor_type(&row, kind_col, diagnostics);

        let mut flow = [None; 4];
        for (slot, (column, idx)) in flow.iter_mut().zip(&flow_cols) {
            *slot = lenient_number(&row, column, *idx, diagnostics);
        }
        let flow = FlowMeasurements {
            liters_per_day: flow[0],
            cubic_meters_per_day: flow[1],
            liters_per_second: flow[2],
            cubic_meters_per_second: flow[3],
        };

        receptors.push(Receptor::new(row.required_text(ID.name, id)?, location, kind).with_flow(flow));
    }
    Ok(receptors)
}

fn receptor_type(row: &Row<'_>, idx: Option<usize>, diagnostics: &mut DiagnosticLog) -> ReceptorType {
    match row.optional_text(idx) {
        None => ReceptorType::default(),
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            diagnostics.defaulted(
                "receptors",
                row.number(),
                RECEPTOR_TYPE.name,
                format!("无法识别的受体类型 '{raw}'，按 private 处理"),
            );
            ReceptorType::Private
        }),
    }
}

/// 可恢复的数值列：空白为 `None`，无法解析时记录诊断并视为缺失
fn lenient_number(row: &Row<'_>, column: &Column, idx: Option<usize>, diagnostics: &mut DiagnosticLog) -> Option<f64> {
    match row.optional_number(column.name, idx) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(DiagnosticKind::Defaulted, "receptors", Some(row.number()), e.to_string());
            None
        }
    }
}

// ============================================================================
// mapping
// ============================================================================

/// 读取显式映射表
pub fn read_mapping(path: &Path) -> FtResult<Vec<MappingRow>> {
    let table = CsvTable::from_path("mapping", path)?;
    let rows = mapping_from_table(&table)?;
    info!("读取映射表 {}: {} 行", path.display(), rows.len());
    Ok(rows)
}

/// 从读取器解析映射表
pub fn parse_mapping<R: Read>(reader: R) -> FtResult<Vec<MappingRow>> {
    let table = CsvTable::from_reader("mapping", reader, Path::new("<mapping>"))?;
    mapping_from_table(&table)
}

fn mapping_from_table(table: &CsvTable) -> FtResult<Vec<MappingRow>> {
    let cols = table.require(&[MAP_SOURCE, MAP_RECEPTOR])?;
    let travel = table.find(&TRAVEL_TIME);
    let distance = table.find(&DISTANCE);

    table
        .rows()
        .map(|row| {
            Ok(MappingRow {
                source_id: row.required_text(MAP_SOURCE.name, cols[0])?.to_string(),
                receptor_id: row.required_text(MAP_RECEPTOR.name, cols[1])?.to_string(),
                travel_time_days: row.optional_number(TRAVEL_TIME.name, travel)?,
                distance_m: row.optional_number(DISTANCE.name, distance)?,
            })
        })
        .collect()
}

// ============================================================================
// observations
// ============================================================================

/// 读取野外观测表
pub fn read_observations(path: &Path, config: &LabParseConfig) -> FtResult<Vec<Observation>> {
    let table = CsvTable::from_path("observations", path)?;
    let obs = observations_from_table(&table, config)?;
    let missing = obs.iter().filter(|o| o.value.is_none()).count();
    info!("读取观测表 {}: {} 行, 其中 {} 行读数缺失", path.display(), obs.len(), missing);
    Ok(obs)
}

/// 从读取器解析观测表
pub fn parse_observations<R: Read>(reader: R, config: &LabParseConfig) -> FtResult<Vec<Observation>> {
    let table = CsvTable::from_reader("observations", reader, Path::new("<observations>"))?;
    observations_from_table(&table, config)
}

fn observations_from_table(table: &CsvTable, config: &LabParseConfig) -> FtResult<Vec<Observation>> {
    let cols = table.require(&[LAT, LON, LAB_VALUE])?;
    let id = table.find(&ID);
    let units = table.find(&UNITS);

    table
        .rows()
        .map(|row| {
            let location = row.location(cols[0], cols[1])?;
            let obs_id = row
                .optional_text(id)
                .map_or_else(|| format!("OBS-{}", row.number()), str::to_string);
            let mut obs = Observation::from_raw(obs_id, location, row.text(cols[2]), config);
            if let Some(u) = row.optional_text(units) {
                obs = obs.with_units(u);
            }
            Ok(obs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_calibration::observation::LabValue;
    use ft_foundation::FtError;

    #[test]
    fn test_sources_with_optional_columns() {
        let csv = "ID,Lat,Lon,Population,Category_ID,efficiency_override,lrv\n\
                   HH-1,-6.16,39.19,5,3,,\n\
                   HH-2,-6.17,39.20,\"1,200\",septic,0.6,\n\
                   HH-3,-6.18,39.21,4,sewered,,2\n";
        let mut diag = DiagnosticLog::new();
        let t = parse_sources(csv.as_bytes(), &mut diag).unwrap();
        assert_eq!(t.len(), 3);
        let r = t.records();
        assert_eq!(r[0].category, ContainmentCategory::PitLatrine);
        assert_eq!(r[1].population, 1200.0);
        assert_eq!(r[1].efficiency, Some(0.6));
        assert_eq!(r[2].lrv, Some(2.0));
        assert_eq!(r[0].location.lat(), -6.16);
    }

    #[test]
    fn test_sources_missing_columns() {
        let mut diag = DiagnosticLog::new();
        let err = parse_sources("id,lat,lon\nA,1,2\n".as_bytes(), &mut diag).unwrap_err();
        match err {
            FtError::MissingColumns { table, columns } => {
                assert_eq!(table, "sources");
                assert_eq!(columns, vec!["population".to_string(), "category_id".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_sources_bad_category_names_row() {
        let mut diag = DiagnosticLog::new();
        let csv = "id,lat,lon,population,category_id\nA,1,2,3,4\nB,1,2,3,bucket\n";
        let err = parse_sources(csv.as_bytes(), &mut diag).unwrap_err();
        assert!(matches!(err, FtError::InvalidValue { row: 2, .. }), "{err}");
    }

    #[test]
    fn test_receptors_unknown_type_defaults_private() {
        let csv = "id,lat,lon,type,flow_m3_per_day\n\
                   BH-1,-6.1,39.1,Government,30\n\
                   BH-2,-6.2,39.2,spring,abc\n\
                   BH-3,-6.3,39.3,,\n";
        let mut diag = DiagnosticLog::new();
        let r = parse_receptors(csv.as_bytes(), &mut diag).unwrap();
        assert_eq!(r[0].kind, ReceptorType::Government);
        assert_eq!(r[0].flow.cubic_meters_per_day, Some(30.0));
        assert_eq!(r[1].kind, ReceptorType::Private);
        assert_eq!(r[1].flow.cubic_meters_per_day, None);
        assert_eq!(r[2].kind, ReceptorType::Private);
        assert_eq!(diag.count(DiagnosticKind::Defaulted), 2);
    }

    #[test]
    fn test_receptors_bad_coordinate_is_fatal() {
        let mut diag = DiagnosticLog::new();
        let err = parse_receptors("id,lat,lon\nBH,north,39\n".as_bytes(), &mut diag).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_mapping_optional_columns() {
        let rows = parse_mapping("source_id,receptor_id,travel_time\nS1,R1,1.5\nS2,R1,\n".as_bytes()).unwrap();
        assert_eq!(rows[0].travel_time_days, Some(1.5));
        assert_eq!(rows[1].travel_time_days, None);
        assert_eq!(rows[1].distance_m, None);
    }

    #[test]
    fn test_observations_lab_codes() {
        let csv = "lat,lon,lab_value,units\n-6.1,39.1,TNTC,CFU/100mL\n-6.2,39.2,<1,\n-6.3,39.3,,\n";
        let obs = parse_observations(csv.as_bytes(), &LabParseConfig::default()).unwrap();
        assert_eq!(obs[0].id, "OBS-1");
        assert_eq!(obs[0].lab, LabValue::TooNumerous);
        assert_eq!(obs[0].value, Some(2_420.0));
        assert_eq!(obs[0].units.as_deref(), Some("CFU/100mL"));
        assert_eq!(obs[1].value, Some(0.0));
        assert_eq!(obs[2].value, None);
    }
}
