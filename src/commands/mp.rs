//! # mp 命令实现
//!
//! Materials Project 检索、结构下载和参考能量查询。网络请求期间显示
//! spinner。
//!
//! ## 依赖关系
//! - 使用 `cli/mp.rs` 定义的参数
//! - 使用 `mp/` 客户端，`parsers/poscar.rs` 写出结构

use serde_json::json;
use tabled::{Table, Tabled};

use super::{fmt_flag, fmt_opt, print_json};
use crate::cli::mp::{MpArgs, MpCommands};
use crate::error::Result;
use crate::mp::{MaterialSummary, MpClient, SearchQuery};
use crate::parsers::{to_poscar_string, write_poscar_file};
use crate::utils::{output, progress};

#[derive(Debug, Clone, Tabled)]
struct SearchRow {
    #[tabled(rename = "ID")]
    material_id: String,
    #[tabled(rename = "Formula")]
    formula: String,
    #[tabled(rename = "Space group")]
    spacegroup: String,
    #[tabled(rename = "E_hull (eV/atom)")]
    e_hull: String,
    #[tabled(rename = "E_form (eV/atom)")]
    e_form: String,
    #[tabled(rename = "Gap (eV)")]
    band_gap: String,
    #[tabled(rename = "Sites")]
    n_sites: String,
    #[tabled(rename = "Stable")]
    stable: String,
}

impl From<&MaterialSummary> for SearchRow {
    fn from(m: &MaterialSummary) -> Self {
        SearchRow {
            material_id: m.material_id.clone(),
            formula: m.formula.clone().unwrap_or_default(),
            spacegroup: m.spacegroup.clone().unwrap_or_default(),
            e_hull: fmt_opt(m.energy_above_hull, 3),
            e_form: fmt_opt(m.formation_energy_per_atom, 3),
            band_gap: fmt_opt(m.band_gap, 3),
            n_sites: m.n_sites.map(|n| n.to_string()).unwrap_or_default(),
            stable: fmt_flag(m.is_stable),
        }
    }
}

/// mp-id 形如 "mp-5229" 或 "mvc-123"
fn looks_like_mp_id(s: &str) -> bool {
    match s.split_once('-') {
        Some((prefix, number)) => {
            !prefix.is_empty()
                && prefix.chars().all(|c| c.is_ascii_lowercase())
                && !number.is_empty()
                && number.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// 执行 mp 命令
pub fn execute(args: MpArgs) -> Result<()> {
    let client = MpClient::new(args.api_key)?;

    match args.command {
        MpCommands::Search {
            formula,
            elements,
            gap_min,
            gap_max,
            stable,
            max_results,
        } => {
            let band_gap = match (gap_min, gap_max) {
                (None, None) => None,
                (lo, hi) => Some((lo.unwrap_or(0.0), hi.unwrap_or(f64::MAX))),
            };
            let query = SearchQuery {
                formula: formula.clone(),
                elements,
                band_gap,
                is_stable: stable.then_some(true),
                max_results,
            };

            let spinner = progress::create_spinner("Querying Materials Project...");
            let results = client.search_materials(&query);
            spinner.finish_and_clear();
            let results = results?;

            if args.json {
                return print_json(&json!({ "formula": formula, "results": results }));
            }
            if results.is_empty() {
                output::print_warning("No materials matched the query");
                return Ok(());
            }
            let rows: Vec<SearchRow> = results.iter().map(SearchRow::from).collect();
            println!("{}", Table::new(&rows));
            output::print_done(&format!("{} results", results.len()));
        }

        MpCommands::Get { id, output: path } => {
            let spinner = progress::create_spinner(&format!("Fetching {}...", id));
            let crystal = if looks_like_mp_id(&id) {
                client.get_structure_by_mpid(&id)
            } else {
                client.get_structure_by_formula(&id, true)
            };
            spinner.finish_and_clear();
            let crystal = crystal?;

            match path {
                Some(path) => {
                    write_poscar_file(&crystal, &path)?;
                    output::print_success(&format!(
                        "{} ({} atoms) -> {}",
                        crystal.formula(),
                        crystal.len(),
                        path.display()
                    ));
                }
                None => print!("{}", to_poscar_string(&crystal)),
            }
        }

        MpCommands::Reference {
            id,
            elements,
            phonon,
        } => {
            let spinner = progress::create_spinner(&format!("Fetching reference data for {}...", id));
            let reference = client.get_reference_energy(&id);
            let elemental = if elements.is_empty() {
                None
            } else {
                let refs: Vec<&str> = elements.iter().map(String::as_str).collect();
                Some(client.get_elemental_reference_energies(&refs))
            };
            let phonon_info = if phonon {
                client.get_phonon_data(&id)
            } else {
                None
            };
            spinner.finish_and_clear();
            let reference = reference?;

            if args.json {
                return print_json(&json!({
                    "reference": reference,
                    "elemental_references": elemental,
                    "phonon": phonon_info,
                }));
            }

            output::print_header(&format!("Reference data: {}", reference.material_id));
            output::print_kv("Formula", reference.formula.as_deref().unwrap_or("-"));
            output::print_kv("Energy per atom (eV)", &fmt_opt(reference.energy_per_atom, 4));
            output::print_kv(
                "Formation energy (eV/atom)",
                &fmt_opt(reference.formation_energy_per_atom, 4),
            );
            output::print_kv("E above hull (eV/atom)", &fmt_opt(reference.energy_above_hull, 4));
            output::print_kv("Band gap (eV)", &fmt_opt(reference.band_gap, 3));
            output::print_kv("Stable", &fmt_flag(reference.is_stable));

            if let Some(elemental) = elemental {
                println!();
                for (el, energy) in &elemental {
                    output::print_kv(&format!("E({}) per atom (eV)", el), &fmt_opt(*energy, 4));
                }
            }
            if phonon {
                println!();
                match phonon_info {
                    Some(info) => output::print_kv(
                        "Imaginary phonon modes",
                        &fmt_flag(info.has_imaginary_modes),
                    ),
                    None => output::print_info("No phonon data available for this material"),
                }
            }
        }
    }
    Ok(())
}
