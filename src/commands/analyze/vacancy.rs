//! # 空位形成能分析

use crate::analysis::vacancy_formation_energy;
use crate::cli::analyze::VacancyArgs;
use crate::commands::{fmt_flag, fmt_opt, print_json};
use crate::error::Result;
use crate::utils::output;

pub fn execute(args: VacancyArgs, json: bool) -> Result<()> {
    let report = vacancy_formation_energy(&args.pristine, &args.defective, args.mu)?;
    if json {
        return print_json(&report);
    }

    output::print_header("Vacancy Formation Energy");
    output::print_kv("E(pristine) (eV)", &fmt_opt(report.pristine_energy, 6));
    output::print_kv("E(defective) (eV)", &fmt_opt(report.defective_energy, 6));
    output::print_kv("mu (eV)", &format!("{:.4}", report.mu));
    output::print_kv("Pristine converged", &fmt_flag(report.pristine_converged));
    output::print_kv("Defective converged", &fmt_flag(report.defective_converged));
    println!();

    match report.formation_energy {
        Some(ef) => {
            output::print_success(&format!("E_f = E_def - E_pri + mu = {:.4} eV", ef));
            if report.pristine_converged == Some(false) || report.defective_converged == Some(false) {
                output::print_warning("At least one relaxation did not reach the required accuracy");
            }
        }
        None => output::print_warning(
            "Could not read both energies. Are the VASP calculations finished?",
        ),
    }
    Ok(())
}
