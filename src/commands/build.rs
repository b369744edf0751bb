//! # build 命令实现
//!
//! 构建结构后写出 POSCAR；未给 `-o` 时打印到标准输出。
//!
//! ## 依赖关系
//! - 使用 `cli/build.rs` 定义的参数
//! - 使用 `builders/` 构建结构，`parsers/poscar.rs` 写出

use std::fs;
use std::path::Path;

use super::load_bulk;
use crate::builders::{
    build_corundum, build_diamond, build_graphite, build_perovskite, build_rocksalt,
    build_supercell_with_vacancy, build_surface_slab, validate_inputs,
};
use crate::cli::build::{BuildArgs, BuildCommands};
use crate::error::{DftkitError, Result};
use crate::models::Crystal;
use crate::parsers::{to_poscar_string, write_poscar_file};
use crate::utils::output;
use crate::workflows::surface::{freeze_bottom_layers, slab_thickness, vacuum_thickness};

/// 执行 build 命令
pub fn execute(args: BuildArgs) -> Result<()> {
    match args.command {
        BuildCommands::Perovskite { a_site, b_site, a } => {
            validate_inputs(&[a_site.as_str(), b_site.as_str()], &[a])?;
            emit(&build_perovskite(&a_site, &b_site, a), args.output.as_deref())
        }
        BuildCommands::Rocksalt { cation, anion, a } => {
            validate_inputs(&[cation.as_str(), anion.as_str()], &[a])?;
            emit(&build_rocksalt(&cation, &anion, a), args.output.as_deref())
        }
        BuildCommands::Diamond { element, a } => {
            validate_inputs(&[element.as_str()], &[a])?;
            emit(&build_diamond(&element, a), args.output.as_deref())
        }
        BuildCommands::Corundum { metal, a, c } => {
            validate_inputs(&[metal.as_str()], &[a, c])?;
            emit(&build_corundum(&metal, a, c)?, args.output.as_deref())
        }
        BuildCommands::Graphite { a, c } => {
            validate_inputs(&[], &[a, c])?;
            emit(&build_graphite(a, c)?, args.output.as_deref())
        }
        BuildCommands::Slab {
            bulk,
            miller,
            min_slab,
            min_vacuum,
            no_center,
            freeze,
        } => {
            let bulk = load_bulk(bulk.as_deref())?;
            let miller = [miller[0], miller[1], miller[2]];
            let mut slab = build_surface_slab(&bulk, miller, min_slab, min_vacuum, !no_center)?;
            freeze_bottom_layers(&mut slab, freeze);
            if args.output.is_some() {
                output::print_info(&format!(
                    "({}{}{}) slab: {} atoms, {:.2} Å thick, {:.2} Å vacuum",
                    miller[0],
                    miller[1],
                    miller[2],
                    slab.len(),
                    slab_thickness(&slab),
                    vacuum_thickness(&slab)
                ));
            }
            emit(&slab, args.output.as_deref())
        }
        BuildCommands::Vacancy {
            bulk,
            supercell,
            element,
            index,
        } => {
            let bulk = load_bulk(bulk.as_deref())?;
            let dims = [supercell[0], supercell[1], supercell[2]];
            let (pristine, defective, info) =
                build_supercell_with_vacancy(&bulk, dims, Some(&element), index)?;

            let dir = args.output.ok_or_else(|| {
                DftkitError::InvalidArgument("vacancy needs an output directory (-o DIR)".to_string())
            })?;
            fs::create_dir_all(&dir).map_err(|e| DftkitError::write(&dir, e))?;
            write_poscar_file(&pristine, &dir.join("POSCAR_pristine"))?;
            write_poscar_file(&defective, &dir.join("POSCAR_defective"))?;

            output::print_success(&format!(
                "Removed {} #{} at ({:.3}, {:.3}, {:.3})",
                info.removed_symbol,
                info.removed_index,
                info.removed_position[0],
                info.removed_position[1],
                info.removed_position[2]
            ));
            output::print_file("POSCAR_pristine", &format!("{} atoms", info.n_atoms_pristine));
            output::print_file("POSCAR_defective", &format!("{} atoms", info.n_atoms_defective));
            Ok(())
        }
    }
}

fn emit(crystal: &Crystal, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            write_poscar_file(crystal, path)?;
            output::print_success(&format!(
                "{} ({} atoms) -> {}",
                crystal.formula(),
                crystal.len(),
                path.display()
            ));
        }
        None => print!("{}", to_poscar_string(crystal)),
    }
    Ok(())
}
