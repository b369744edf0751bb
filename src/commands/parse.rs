//! # parse 命令实现
//!
//! 单目录模式打印一个 OutputSummary；扫描模式并行解析根目录下的所有
//! 计算目录，按目录名排序输出表格，可选写出 CSV。
//!
//! ## 依赖关系
//! - 使用 `cli/parse.rs` 定义的参数
//! - 使用 `parsers/outcar.rs`, `batch/`
//! - 使用 `tabled` 输出表格，`csv` 导出

use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

use super::{fmt_flag, fmt_opt, print_json};
use crate::batch::{BatchRunner, CalcDirCollector, ProcessResult};
use crate::cli::parse::ParseArgs;
use crate::error::{DftkitError, Result};
use crate::models::OutputSummary;
use crate::parsers::OutputParser;
use crate::utils::output;

/// 扫描结果表格行
#[derive(Debug, Clone, Tabled)]
struct ScanRow {
    #[tabled(rename = "Directory")]
    directory: String,
    #[tabled(rename = "E (eV)")]
    energy: String,
    #[tabled(rename = "E/atom (eV)")]
    energy_per_atom: String,
    #[tabled(rename = "Converged")]
    converged: String,
    #[tabled(rename = "Mag (μB)")]
    magnetization: String,
    #[tabled(rename = "Max |F| (eV/Å)")]
    max_force: String,
    #[tabled(rename = "Gap (eV)")]
    band_gap: String,
}

impl ScanRow {
    fn new(summary: &OutputSummary, root: &Path) -> Self {
        ScanRow {
            directory: relative(&summary.directory, root),
            energy: fmt_opt(summary.total_energy, 6),
            energy_per_atom: fmt_opt(summary.energy_per_atom(), 4),
            converged: fmt_flag(summary.converged),
            magnetization: fmt_opt(summary.magnetization, 3),
            max_force: fmt_opt(summary.max_force, 4),
            band_gap: fmt_opt(summary.band_gap, 3),
        }
    }
}

/// 键值表格行
#[derive(Debug, Clone, Tabled)]
struct FieldRow {
    #[tabled(rename = "Quantity")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// 执行 parse 命令
pub fn execute(args: ParseArgs) -> Result<()> {
    match (&args.scan, &args.dir) {
        (Some(root), _) => scan(root, &args),
        (None, Some(dir)) => single(dir, args.json),
        (None, None) => Err(DftkitError::InvalidArgument(
            "give a calculation directory or --scan ROOT".to_string(),
        )),
    }
}

fn single(dir: &Path, json: bool) -> Result<()> {
    if !dir.is_dir() {
        return Err(DftkitError::DirectoryNotFound {
            path: dir.display().to_string(),
        });
    }
    let summary = OutputParser::new(dir).summary()?;
    if json {
        return print_json(&summary);
    }

    output::print_header(&format!("VASP output: {}", dir.display()));
    if let Some(err) = &summary.error {
        output::print_warning(&format!("{} (calculation not run yet?)", err));
        return Ok(());
    }

    let rows = vec![
        FieldRow {
            name: "Total energy (eV)",
            value: fmt_opt(summary.total_energy, 6),
        },
        FieldRow {
            name: "Energy sigma->0 (eV)",
            value: fmt_opt(summary.energy_sigma0, 6),
        },
        FieldRow {
            name: "Energy per atom (eV)",
            value: fmt_opt(summary.energy_per_atom(), 6),
        },
        FieldRow {
            name: "Converged",
            value: fmt_flag(summary.converged),
        },
        FieldRow {
            name: "Magnetization (μB)",
            value: fmt_opt(summary.magnetization, 4),
        },
        FieldRow {
            name: "Max force (eV/Å)",
            value: fmt_opt(summary.max_force, 4),
        },
        FieldRow {
            name: "Atoms",
            value: summary
                .n_atoms
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
        },
        FieldRow {
            name: "Band gap (eV)",
            value: fmt_opt(summary.band_gap, 4),
        },
    ];
    println!("{}", Table::new(&rows));
    Ok(())
}

fn scan(root: &Path, args: &ParseArgs) -> Result<()> {
    let dirs = CalcDirCollector::new(root)
        .with_markers(&args.markers)?
        .recursive(args.recursive)
        .collect()?;

    if dirs.is_empty() {
        output::print_warning(&format!(
            "No calculation directories ({}) found under {}",
            args.markers,
            root.display()
        ));
        return Ok(());
    }

    let mut runner = BatchRunner::new(args.jobs);
    if args.json {
        runner = runner.quiet();
    } else {
        output::print_info(&format!(
            "Scanning {} directories with {} jobs",
            dirs.len(),
            runner.jobs()
        ));
    }

    let result = runner.run(dirs, |dir: &PathBuf| {
        match OutputParser::new(dir).summary() {
            Ok(summary) if summary.has_output() => ProcessResult::Success(summary),
            Ok(_) => ProcessResult::Skipped(dir.display().to_string()),
            Err(e) => ProcessResult::Failed(dir.display().to_string(), e.to_string()),
        }
    })?;

    if let Some(csv_path) = &args.csv {
        write_csv(csv_path, &result.items)?;
    }

    if args.json {
        return print_json(&result.items);
    }

    if !result.items.is_empty() {
        let rows: Vec<ScanRow> = result.items.iter().map(|s| ScanRow::new(s, root)).collect();
        println!("{}", Table::new(&rows));
    }

    for dir in &result.skipped {
        output::print_skip(&format!("{}: OUTCAR not found", dir));
    }
    for (dir, err) in &result.failures {
        output::print_error(&format!("{}: {}", dir, err));
    }

    output::print_done(&format!(
        "{} parsed, {} skipped, {} failed",
        result.items.len(),
        result.skipped.len(),
        result.failures.len()
    ));
    if let Some(csv_path) = &args.csv {
        output::print_success(&format!("Results saved to {}", csv_path.display()));
    }
    Ok(())
}

fn relative(directory: &str, root: &Path) -> String {
    Path::new(directory)
        .strip_prefix(root)
        .ok()
        .map(|p| p.display().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| directory.to_string())
}

fn opt_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// 导出 CSV，缺失值为空单元格
pub fn write_csv(path: &Path, summaries: &[OutputSummary]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "directory",
        "total_energy_eV",
        "energy_sigma0_eV",
        "energy_per_atom_eV",
        "converged",
        "magnetization",
        "max_force_eV_per_A",
        "n_atoms",
        "band_gap_eV",
    ])?;
    for s in summaries {
        wtr.write_record([
            s.directory.clone(),
            opt_cell(s.total_energy),
            opt_cell(s.energy_sigma0),
            opt_cell(s.energy_per_atom()),
            opt_cell(s.converged),
            opt_cell(s.magnetization),
            opt_cell(s.max_force),
            opt_cell(s.n_atoms),
            opt_cell(s.band_gap),
        ])?;
    }
    wtr.flush().map_err(|e| DftkitError::write(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_csv() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = OutputSummary::new("calc/a");
        s.total_energy = Some(-10.5);
        s.n_atoms = Some(2);
        s.converged = Some(true);

        let path = tmp.path().join("scan.csv");
        write_csv(&path, &[s]).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[1], "total_energy_eV");
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "calc/a");
        assert_eq!(&row[1], "-10.5");
        assert_eq!(&row[3], "-5.25");
        assert_eq!(&row[4], "true");
        assert_eq!(&row[5], "");
    }

    #[test]
    fn test_relative_directory() {
        assert_eq!(relative("/runs/a/b", Path::new("/runs")), "a/b");
        assert_eq!(relative("/runs", Path::new("/runs")), "/runs");
    }
}
