// crates/ft_foundation/src/diagnostics.rs

//! 运行诊断记录
//!
//! 可恢复的数据问题（截断、默认值替换、跳过的干预、忽略的配置键）
//! 不会中断运行，但必须留下记录。每条记录同时通过 `tracing::warn!`
//! 输出，并保存在 [`DiagnosticLog`] 中随运行结果返回。
//!
//! # 示例
//!
//! ```
//! use ft_foundation::diagnostics::{DiagnosticLog, DiagnosticKind};
//!
//! let mut log = DiagnosticLog::new();
//! log.defaulted("receptors", 2, "flow_rate", "使用私有井默认流量");
//! assert_eq!(log.count(DiagnosticKind::Defaulted), 1);
//! ```

use serde::Serialize;
use std::fmt;
use tracing::warn;

/// 诊断类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// 数值被截断到有效范围
    Clamped,
    /// 缺失或无效值被默认值替换
    Defaulted,
    /// 某一步骤被跳过（如缺少基线的定向干预）
    Skipped,
    /// 配置中未识别的键
    UnknownKey,
    /// 输入行被忽略
    RowDropped,
    /// 其他提示
    Notice,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Clamped => "截断",
            Self::Defaulted => "默认值",
            Self::Skipped => "跳过",
            Self::UnknownKey => "未知配置键",
            Self::RowDropped => "忽略行",
            Self::Notice => "提示",
        };
        f.write_str(s)
    }
}

/// 单条诊断
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// 类别
    pub kind: DiagnosticKind,
    /// 上下文（表名、组件名或配置节）
    pub context: String,
    /// 可选的行号
    pub row: Option<usize>,
    /// 描述
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "[{}] {} 第{}行: {}", self.kind, self.context, row, self.message),
            None => write!(f, "[{}] {}: {}", self.kind, self.context, self.message),
        }
    }
}

/// 诊断日志
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    /// 创建空日志
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条诊断并输出警告日志
    pub fn push(
        &mut self,
        kind: DiagnosticKind,
        context: impl Into<String>,
        row: Option<usize>,
        message: impl Into<String>,
    ) {
        let diag = Diagnostic {
            kind,
            context: context.into(),
            row,
            message: message.into(),
        };
        warn!("{}", diag);
        self.entries.push(diag);
    }

    /// 记录截断
    pub fn clamped(
        &mut self,
        context: impl Into<String>,
        row: usize,
        field: &str,
        original: f64,
        clamped: f64,
    ) {
        self.push(
            DiagnosticKind::Clamped,
            context,
            Some(row),
            format!("{field}={original} 截断为 {clamped}"),
        );
    }

    /// 记录默认值替换
    pub fn defaulted(
        &mut self,
        context: impl Into<String>,
        row: usize,
        field: &str,
        message: impl Into<String>,
    ) {
        let message = message.into();
        self.push(
            DiagnosticKind::Defaulted,
            context,
            Some(row),
            format!("{field}: {message}"),
        );
    }

    /// 记录跳过的步骤
    pub fn skipped(&mut self, context: impl Into<String>, message: impl Into<String>) {
        self.push(DiagnosticKind::Skipped, context, None, message);
    }

    /// 记录一般提示
    pub fn notice(&mut self, context: impl Into<String>, message: impl Into<String>) {
        self.push(DiagnosticKind::Notice, context, None, message);
    }

    /// 合并另一份日志
    pub fn merge(&mut self, other: DiagnosticLog) {
        self.entries.extend(other.entries);
    }

    /// 全部条目
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// 某一类别的条目数
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// 是否包含某一类别
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for DiagnosticLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "诊断记录: {} 条", self.len())?;
        for (i, d) in self.entries.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, d)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_count() {
        let mut log = DiagnosticLog::new();
        log.clamped("sources", 1, "efficiency", 1.5, 1.0);
        log.clamped("sources", 2, "efficiency", -0.1, 0.0);
        log.skipped("intervention", "缺少基线");

        assert_eq!(log.len(), 3);
        assert_eq!(log.count(DiagnosticKind::Clamped), 2);
        assert!(log.has(DiagnosticKind::Skipped));
        assert!(!log.has(DiagnosticKind::UnknownKey));
    }

    #[test]
    fn test_display_contains_row() {
        let mut log = DiagnosticLog::new();
        log.defaulted("receptors", 4, "flow_rate", "Q<=0");
        let text = log.to_string();
        assert!(text.contains("第4行"));
        assert!(text.contains("flow_rate"));
    }

    #[test]
    fn test_merge() {
        let mut a = DiagnosticLog::new();
        a.notice("linker", "无链接");
        let mut b = DiagnosticLog::new();
        b.notice("aggregator", "全部为零");
        a.merge(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.entries()[1].context, "aggregator");
    }
}
