// tests/csv_run.rs

//! CSV 输入到 CSV 输出的完整运行
//!
//! 第一次运行的受体表作为第二次运行的基线，驱动定向干预。

use ft_config::{ContainmentCategory, PollutantKind, Scenario, TargetedIntervention};
use ft_foundation::{DiagnosticKind, DiagnosticLog};
use ft_io::{read_baseline, read_receptors, read_sources, write_links, write_receptors};
use ft_transport::PipelineContext;
use std::fs;
use std::path::Path;

// ============================================================
// 测试辅助函数
// ============================================================

const SOURCES: &str = "\
id,lat,lon,population,category_id
HH-1,-6.16000,39.19010,6,pit_latrine
HH-2,-6.16000,39.19015,3,open_defecation
HH-3,-6.20000,39.25010,8,septic
HH-4,-6.30000,39.30000,5,pit_latrine
";

const RECEPTORS: &str = "\
id,lat,lon,type,flow_l_per_day
BH-1,-6.16,39.19,private,1500
BH-2,-6.20,39.25,government,
BH-3,-6.40,39.40,private,
";

fn context(dir: &Path) -> (PipelineContext, DiagnosticLog) {
    let sources_path = dir.join("sources.csv");
    let receptors_path = dir.join("receptors.csv");
    fs::write(&sources_path, SOURCES).unwrap();
    fs::write(&receptors_path, RECEPTORS).unwrap();

    let mut diag = DiagnosticLog::new();
    let sources = read_sources(&sources_path, &mut diag).unwrap();
    let receptors = read_receptors(&receptors_path, &mut diag).unwrap();
    (PipelineContext::new(sources, receptors, PollutantKind::Fio), diag)
}

// ============================================================
// 测试
// ============================================================

#[test]
fn test_csv_run_writes_every_receptor() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, diag) = context(dir.path());
    assert!(diag.is_empty());

    let out = ctx.run(&Scenario::default(), None).unwrap();
    let links_path = dir.path().join("out/links.csv");
    let receptors_path = dir.path().join("out/receptors_result.csv");
    write_links(&links_path, &out.links, out.unit).unwrap();
    write_receptors(&receptors_path, &out.receptors, out.unit).unwrap();

    let links = fs::read_to_string(&links_path).unwrap();
    // 表头 + HH-1/HH-2 → BH-1 + HH-3 → BH-2
    assert_eq!(links.lines().count(), 4);
    let receptors = fs::read_to_string(&receptors_path).unwrap();
    assert_eq!(receptors.lines().count(), 4);
    let isolated: Vec<&str> = receptors
        .lines()
        .find(|l| l.starts_with("BH-3,"))
        .unwrap()
        .split(',')
        .collect();
    assert_eq!(isolated[1], "private");
    assert_eq!(isolated[4], "0");
    assert_eq!(isolated[7].parse::<f64>().unwrap(), 0.0);
}

#[test]
fn test_previous_output_drives_targeted_intervention() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, _) = context(dir.path());

    let first = ctx.run(&Scenario::default(), None).unwrap();
    let baseline_path = dir.path().join("baseline.csv");
    write_receptors(&baseline_path, &first.receptors, first.unit).unwrap();
    let baseline = read_baseline(&baseline_path).unwrap().unwrap();

    let mut targeted = Scenario::default().with_name("targeted");
    targeted.targeted = Some(TargetedIntervention {
        top_percent: 30.0,
        radius_m: 50.0,
        upgrade_to: ContainmentCategory::Sewered,
        efficiency: None,
    });

    let second = ctx.run(&targeted, Some(&baseline)).unwrap();
    assert!(!second.diagnostics.has(DiagnosticKind::Skipped));
    assert_eq!(second.intervention.targeted_upgrades, Some(2));
    assert!(second.receptors[0].concentration < first.receptors[0].concentration);
    assert_eq!(second.receptors[1].concentration, first.receptors[1].concentration);

    let missing = read_baseline(&dir.path().join("missing.csv")).unwrap();
    let skipped = ctx.run(&targeted, missing.as_ref()).unwrap();
    assert!(skipped.diagnostics.has(DiagnosticKind::Skipped));
    assert_eq!(skipped.receptors, first.receptors);
}
