//! # FORCE_SETS 汇总

use crate::analysis::collect_force_sets;
use crate::cli::analyze::PhononArgs;
use crate::commands::print_json;
use crate::error::Result;
use crate::utils::output;
use crate::workflows::phonon::DisplacementDataset;

pub fn execute(args: PhononArgs, json: bool) -> Result<()> {
    let report = collect_force_sets(&args.dir)?;
    if json {
        return print_json(&report);
    }

    for (dir, reason) in &report.skipped {
        output::print_skip(&format!("{}: {}", dir, reason));
    }
    output::print_success(&format!(
        "Collected {}/{} displacements -> {}",
        report.n_collected,
        report.n_expected,
        report.path.display()
    ));
    if report.n_collected < report.n_expected {
        output::print_warning("Some displacements are missing; phonopy needs all of them");
    }

    let m = DisplacementDataset::read(&args.dir)?.supercell_matrix;
    println!();
    println!("Next steps (with phonopy installed):");
    println!(
        "  phonopy --dim=\"{} {} {}\" -c POSCAR-unitcell -p band.conf",
        m[0][0], m[1][1], m[2][2]
    );
    Ok(())
}
