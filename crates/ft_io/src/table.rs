// crates/ft_io/src/table.rs

//! 带表头约定的 CSV 表
//!
//! 列名忽略大小写和首尾空白匹配，每个逻辑列可以有多个别名。
//! 以 `#` 开头的行视为注释。

use crate::error::IoError;
use ft_foundation::{FtError, FtResult};
use ft_geo::Point2D;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 逻辑列：规范名 + 别名
#[derive(Debug, Clone, Copy)]
pub struct Column {
    /// 规范名（出错时报告）
    pub name: &'static str,
    /// 可接受的表头（小写）
    pub aliases: &'static [&'static str],
}

impl Column {
    /// 定义列
    pub const fn new(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases }
    }
}

/// 已加载的 CSV 表
#[derive(Debug)]
pub struct CsvTable {
    table: &'static str,
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

impl CsvTable {
    /// 从文件加载
    pub fn from_path(table: &'static str, path: &Path) -> FtResult<Self> {
        if !path.exists() {
            return Err(FtError::file_not_found(path));
        }
        let file = File::open(path)
            .map_err(|e| FtError::io_with_source(format!("无法打开 {}", path.display()), e))?;
        Self::from_reader(table, file, path)
    }

    /// 从任意读取器加载，`origin` 仅用于错误信息
    pub fn from_reader<R: Read>(table: &'static str, reader: R, origin: &Path) -> FtResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| IoError::csv(origin, e))?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
            .collect();
        let rows = rdr
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| IoError::csv(origin, e))?;

        Ok(Self { table, headers, rows })
    }

    /// 表名
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// 数据行数
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 是否没有数据行
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 查找列下标
    pub fn find(&self, column: &Column) -> Option<usize> {
        column
            .aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == alias))
    }

    /// 查找全部必需列，缺失的列一次性报告
    pub fn require(&self, columns: &[Column]) -> FtResult<Vec<usize>> {
        let mut found = Vec::with_capacity(columns.len());
        let mut missing = Vec::new();
        for column in columns {
            match self.find(column) {
                Some(idx) => found.push(idx),
                None => missing.push(column.name.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(FtError::missing_columns(self.table, missing))
        }
    }

    /// 遍历数据行，行号从 1 开始
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().enumerate().map(move |(i, record)| Row {
            table: self.table,
            number: i + 1,
            record,
        })
    }
}

/// 一行数据
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'static str,
    number: usize,
    record: &'a csv::StringRecord,
}

impl<'a> Row<'a> {
    /// 行号（从 1 开始，不含表头）
    pub fn number(&self) -> usize {
        self.number
    }

    /// 单元格文本（缺失视为空）
    pub fn text(&self, idx: usize) -> &'a str {
        self.record.get(idx).unwrap_or("").trim()
    }

    /// 可选列的单元格文本，空白返回 `None`
    pub fn optional_text(&self, idx: Option<usize>) -> Option<&'a str> {
        idx.map(|i| self.text(i)).filter(|s| !s.is_empty())
    }

    /// 必需字符串
    pub fn required_text(&self, column: &str, idx: usize) -> FtResult<&'a str> {
        let s = self.text(idx);
        if s.is_empty() {
            return Err(self.invalid(column, s, "不能为空"));
        }
        Ok(s)
    }

    /// 必需数值
    pub fn number_at(&self, column: &str, idx: usize) -> FtResult<f64> {
        let s = self.text(idx);
        parse_f64(s).ok_or_else(|| self.invalid(column, s, "不是有效数值"))
    }

    /// 可选数值，空白为 `None`，无法解析为错误
    pub fn optional_number(&self, column: &str, idx: Option<usize>) -> FtResult<Option<f64>> {
        match self.optional_text(idx) {
            None => Ok(None),
            Some(s) => parse_f64(s)
                .map(Some)
                .ok_or_else(|| self.invalid(column, s, "不是有效数值")),
        }
    }

    /// 经纬度，超出范围或无法解析为错误
    pub fn location(&self, lat_idx: usize, lon_idx: usize) -> FtResult<Point2D> {
        let lat = self.number_at("lat", lat_idx)?;
        let lon = self.number_at("lon", lon_idx)?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(self.invalid("lat", self.text(lat_idx), "纬度超出 [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(self.invalid("lon", self.text(lon_idx), "经度超出 [-180, 180]"));
        }
        Ok(Point2D::from_latlon(lat, lon))
    }

    /// 本行的单元格错误
    pub fn invalid(&self, column: &str, value: &str, reason: &str) -> FtError {
        FtError::invalid_value(self.table, column, self.number, value, reason)
    }
}

/// 解析带千位分隔符的数值，非有限值视为无效
pub fn parse_f64(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: Column = Column::new("id", &["id", "source_id"]);
    const LAT: Column = Column::new("lat", &["lat", "latitude"]);

    fn load(text: &str) -> CsvTable {
        CsvTable::from_reader("sources", text.as_bytes(), Path::new("mem.csv")).unwrap()
    }

    #[test]
    fn test_headers_case_insensitive() {
        let t = load(" ID ,Latitude\nA,1.5\n");
        assert_eq!(t.require(&[ID, LAT]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_missing_columns_reported_together() {
        let t = load("name\nA\n");
        let err = t.require(&[ID, LAT]).unwrap_err();
        match err {
            FtError::MissingColumns { table, columns } => {
                assert_eq!(table, "sources");
                assert_eq!(columns, vec!["id".to_string(), "lat".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_row_errors_name_row_and_value() {
        let t = load("id,lat,lon\nA,95,39\n");
        let row = t.rows().next().unwrap();
        let err = row.location(1, 2).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("第1行") && msg.contains("95"), "{msg}");
    }

    #[test]
    fn test_parse_f64() {
        assert_eq!(parse_f64("1,200"), Some(1200.0));
        assert_eq!(parse_f64(" 3.5 "), Some(3.5));
        assert_eq!(parse_f64("inf"), None);
        assert_eq!(parse_f64("x"), None);
    }
}
