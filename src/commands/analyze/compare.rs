//! # 多个计算的对比表

use tabled::{Table, Tabled};

use crate::analysis::compare_runs;
use crate::cli::analyze::CompareArgs;
use crate::commands::{fmt_flag, fmt_opt, print_json};
use crate::error::Result;
use crate::utils::output;

#[derive(Debug, Clone, Tabled)]
struct CompareRow {
    #[tabled(rename = "Method")]
    label: String,
    #[tabled(rename = "Energy (eV)")]
    energy: String,
    #[tabled(rename = "Gap (eV)")]
    band_gap: String,
    #[tabled(rename = "Mag (μB)")]
    magnetization: String,
    #[tabled(rename = "Converged")]
    converged: String,
}

pub fn execute(args: CompareArgs, json: bool) -> Result<()> {
    let rows = compare_runs(&args.runs)?;
    if json {
        return print_json(&rows);
    }

    output::print_header("Calculation Comparison");
    let mut table_rows: Vec<CompareRow> = rows
        .iter()
        .map(|r| CompareRow {
            label: r.label.clone(),
            energy: fmt_opt(r.summary.total_energy, 6),
            band_gap: fmt_opt(r.summary.band_gap, 3),
            magnetization: fmt_opt(r.summary.magnetization, 3),
            converged: match &r.summary.error {
                Some(_) => "not run".to_string(),
                None => fmt_flag(r.summary.converged),
            },
        })
        .collect();
    if let Some(gap) = args.experimental_gap {
        table_rows.push(CompareRow {
            label: "Experiment".to_string(),
            energy: "-".to_string(),
            band_gap: format!("{:.3}", gap),
            magnetization: "-".to_string(),
            converged: "-".to_string(),
        });
    }
    println!("{}", Table::new(&table_rows));

    let missing = rows.iter().filter(|r| !r.summary.has_output()).count();
    if missing > 0 {
        output::print_warning(&format!("{} of {} runs have no OUTCAR yet", missing, rows.len()));
    }
    Ok(())
}
