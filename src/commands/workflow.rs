//! # workflow 命令实现
//!
//! 单个工作流按命令行参数运行；`all` 以默认参数运行所选工作流并写出
//! `workflow_summary.json`。
//!
//! ## 依赖关系
//! - 使用 `cli/workflow.rs` 定义的参数
//! - 使用 `workflows/`

use indexmap::IndexMap;
use std::path::PathBuf;

use super::{load_bulk, print_json};
use crate::cli::workflow::{WorkflowArgs, WorkflowCommands};
use crate::error::Result;
use crate::utils::{output, progress};
use crate::workflows::{
    self, DftD3Graphite, DftPlusUComparison, PerovskiteRelaxation, PhononDispersion,
    SurfaceSlabWorkflow, VacancyFormationEnergy, WorkflowKind, WorkflowSummary,
};

/// 执行 workflow 命令
pub fn execute(args: WorkflowArgs) -> Result<()> {
    let (kind, summary) = match args.command {
        WorkflowCommands::All { output, only } => return run_all(&output, &only, args.json),
        WorkflowCommands::Relax {
            a_site,
            b_site,
            a,
            encut,
            kpoints_density,
            output,
        } => {
            let wf = PerovskiteRelaxation {
                a_site,
                b_site,
                a,
                encut,
                kpoints_density,
                output_dir: dir_or_default(output, WorkflowKind::Relax),
            };
            (WorkflowKind::Relax, WorkflowSummary::Relax(wf.setup()?))
        }
        WorkflowCommands::Surface {
            bulk,
            miller,
            min_slab,
            min_vacuum,
            freeze,
            output,
        } => {
            let wf = SurfaceSlabWorkflow {
                bulk: load_bulk(bulk.as_deref())?,
                miller_index: [miller[0], miller[1], miller[2]],
                min_slab_size: min_slab,
                min_vacuum_size: min_vacuum,
                freeze_bottom: freeze,
                output_dir: dir_or_default(output, WorkflowKind::Surface),
            };
            (WorkflowKind::Surface, WorkflowSummary::Surface(wf.setup()?))
        }
        WorkflowCommands::Vacancy {
            bulk,
            supercell,
            element,
            output,
        } => {
            let wf = VacancyFormationEnergy {
                bulk: load_bulk(bulk.as_deref())?,
                supercell_dims: [supercell[0], supercell[1], supercell[2]],
                vacancy_element: element,
                output_dir: dir_or_default(output, WorkflowKind::Vacancy),
            };
            (WorkflowKind::Vacancy, WorkflowSummary::Vacancy(wf.setup()?))
        }
        WorkflowCommands::Dftu {
            material,
            u_value,
            j_value,
            output,
        } => {
            let wf = DftPlusUComparison {
                material,
                u_value,
                j_value,
                output_dir: dir_or_default(output, WorkflowKind::Dftu),
            };
            (WorkflowKind::Dftu, WorkflowSummary::Dftu(wf.setup()?))
        }
        WorkflowCommands::D3 { a, c, output } => {
            let wf = DftD3Graphite {
                a,
                c,
                output_dir: dir_or_default(output, WorkflowKind::D3),
            };
            (WorkflowKind::D3, WorkflowSummary::D3(wf.setup()?))
        }
        WorkflowCommands::Phonon {
            bulk,
            supercell,
            displacement,
            output,
        } => {
            let [na, nb, nc] = [supercell[0], supercell[1], supercell[2]];
            let wf = PhononDispersion {
                bulk: load_bulk(bulk.as_deref())?,
                supercell_matrix: [[na, 0, 0], [0, nb, 0], [0, 0, nc]],
                displacement,
                output_dir: dir_or_default(output, WorkflowKind::Phonon),
            };
            (WorkflowKind::Phonon, WorkflowSummary::Phonon(wf.setup()?))
        }
    };

    if args.json {
        return print_json(&summary);
    }
    output::print_header(kind.title());
    print_summary(&summary);
    output::print_done(&format!("{} workflow ready", kind));
    Ok(())
}

fn dir_or_default(output: Option<PathBuf>, kind: WorkflowKind) -> PathBuf {
    output.unwrap_or_else(|| PathBuf::from(kind.dir_name()))
}

fn run_all(base: &std::path::Path, only: &[WorkflowKind], json: bool) -> Result<()> {
    let kinds: Vec<WorkflowKind> = if only.is_empty() {
        WorkflowKind::ALL.to_vec()
    } else {
        WorkflowKind::ALL
            .into_iter()
            .filter(|k| only.contains(k))
            .collect()
    };

    if !json {
        output::print_header("DFT Teaching Workflows");
        output::print_info(&format!("Base directory: {}", base.display()));
    }

    let pb = if json {
        indicatif::ProgressBar::hidden()
    } else {
        progress::create_step_bar(kinds.len() as u64)
    };
    let mut started = 0;
    let results = workflows::run_all_with(base, &kinds, |kind| {
        if started > 0 {
            pb.inc(1);
        }
        started += 1;
        pb.set_message(kind.title());
    })?;
    pb.finish_and_clear();

    if json {
        return print_json(&results);
    }
    print_all(&results, base);
    Ok(())
}

fn print_all(results: &IndexMap<String, WorkflowSummary>, base: &std::path::Path) {
    for (i, (key, summary)) in results.iter().enumerate() {
        output::print_success(&format!("[{}/{}] {}", i + 1, results.len(), key));
        print_summary(summary);
        println!();
    }
    output::print_separator();
    output::print_done(&format!(
        "{} workflows set up; summary in {}",
        results.len(),
        base.join("workflow_summary.json").display()
    ));
    println!();
    println!("Next steps:");
    println!("  1. Copy each directory to an HPC cluster with VASP installed");
    println!("  2. Supply POTCAR files (see POTCAR_REFERENCE in each directory)");
    println!("  3. Run VASP, then use the analysis scripts in each directory");
}

fn print_summary(summary: &WorkflowSummary) {
    match summary {
        WorkflowSummary::Relax(s) => {
            output::print_kv("Formula", &s.formula);
            output::print_kv("Atoms", &s.n_atoms.to_string());
            output::print_kv("Lattice constant (Å)", &format!("{:.3}", s.lattice_constant));
            output::print_kv("Output", &s.output_dir);
        }
        WorkflowSummary::Surface(s) => {
            output::print_kv("Formula", &s.formula);
            output::print_kv("Atoms", &s.n_atoms.to_string());
            output::print_kv(
                "Miller index",
                &format!("({} {} {})", s.miller_index[0], s.miller_index[1], s.miller_index[2]),
            );
            output::print_kv("Slab thickness (Å)", &format!("{:.2}", s.slab_thickness));
            output::print_kv("Vacuum thickness (Å)", &format!("{:.2}", s.vacuum_thickness));
            output::print_kv("Output", &s.output_dir);
        }
        WorkflowSummary::Vacancy(s) => {
            let info = &s.vacancy_info;
            output::print_kv("Removed", &format!("{} (site {})", info.removed_symbol, info.removed_index));
            output::print_kv(
                "Atoms",
                &format!("{} -> {}", info.n_atoms_pristine, info.n_atoms_defective),
            );
            for (name, calc) in &s.calculations {
                output::print_kv(name, &calc.output_dir);
            }
            output::print_kv("Analysis", &s.analysis_script);
        }
        WorkflowSummary::Dftu(s) => {
            output::print_kv("Material", &s.material);
            for (name, calc) in &s.calculations {
                let u = calc
                    .u_eff
                    .map(|u| format!(" (U_eff = {:.1} eV)", u))
                    .unwrap_or_default();
                output::print_kv(name, &format!("{}{}", calc.output_dir, u));
            }
            output::print_kv("Comparison", &s.comparison_script);
        }
        WorkflowSummary::D3(s) => {
            output::print_kv("Material", &s.material);
            output::print_kv("Initial c/a", &format!("{:.3}", s.initial_c_over_a));
            output::print_kv("Initial d (Å)", &format!("{:.3}", s.initial_interlayer_d));
            for (name, calc) in &s.calculations {
                output::print_kv(name, &format!("{} [{}]", calc.output_dir, calc.vdw_correction));
            }
            output::print_kv("Comparison", &s.comparison_script);
        }
        WorkflowSummary::Phonon(s) => {
            output::print_kv(
                "Atoms",
                &format!("{} primitive, {} supercell", s.n_atoms_primitive, s.n_atoms_supercell),
            );
            output::print_kv("Displacements", &format!("{} x {:.3} Å", s.n_displacements, s.displacement));
            output::print_kv("Run", &s.run_script);
            output::print_kv("Post-process", &s.postprocess_script);
        }
    }
}
