//! 端到端测试：从工作流生成到输出解析与分析，全部在临时目录中进行。

use std::fs;
use std::path::{Path, PathBuf};

use dftkit::analysis::{collect_force_sets, vacancy_formation_energy};
use dftkit::mp::client::resolve_api_key;
use dftkit::parsers::{parse_poscar_file, OutputParser};
use dftkit::vasp::{IncarValue, TagSet, VaspInputSet};
use dftkit::workflows::phonon::DisplacementDataset;
use dftkit::workflows::{
    run_all, PerovskiteRelaxation, PhononDispersion, SurfaceSlabWorkflow, VacancyFormationEnergy,
    WorkflowKind,
};
use dftkit::DftkitError;

fn write_outcar(dir: &Path, energy: f64, forces: Option<&[[f64; 3]]>) {
    fs::create_dir_all(dir).unwrap();
    let mut s = String::new();
    if let Some(forces) = forces {
        s.push_str(" POSITION                                       TOTAL-FORCE (eV/Angst)\n");
        s.push_str(" -----------------------------------------------------------------------------------\n");
        for f in forces {
            s.push_str(&format!(
                "      0.00000      0.00000      0.00000     {:10.6}  {:10.6}  {:10.6}\n",
                f[0], f[1], f[2]
            ));
        }
        s.push_str(" -----------------------------------------------------------------------------------\n");
    }
    s.push_str(&format!("  free  energy   TOTEN  =     {:.8} eV\n", energy));
    s.push_str(&format!(
        "  energy  without entropy=     {:.8}  energy(sigma->0) =     {:.8}\n",
        energy, energy
    ));
    s.push_str(" reached required accuracy - stopping structural energy minimisation\n");
    fs::write(dir.join("OUTCAR"), s).unwrap();
}

#[test]
fn relax_workflow_writes_inputs() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("relax");
    let summary = PerovskiteRelaxation {
        output_dir: out.clone(),
        ..Default::default()
    }
    .setup()
    .unwrap();

    assert_eq!(summary.formula, "O3SrTi");
    assert_eq!(summary.n_atoms, 5);
    for name in ["INCAR", "POSCAR", "KPOINTS", "POTCAR_REFERENCE", "calc_info.json", "README.md"] {
        assert!(out.join(name).is_file(), "{} missing", name);
    }

    let kpoints = fs::read_to_string(out.join("KPOINTS")).unwrap();
    assert!(kpoints.contains("Gamma"));
    assert!(kpoints.contains("65  65  65"));

    let incar = fs::read_to_string(out.join("INCAR")).unwrap();
    assert!(incar.contains("ENCUT = 520"));
    assert!(incar.contains("ISIF = 3"));

    let potcar = fs::read_to_string(out.join("POTCAR_REFERENCE")).unwrap();
    assert!(potcar.contains("Sr_sv"));
    assert!(potcar.contains("Ti_pv"));
}

#[test]
fn surface_workflow_freezes_bottom_layers() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("surface");
    let summary = SurfaceSlabWorkflow {
        output_dir: out.clone(),
        ..Default::default()
    }
    .setup()
    .unwrap();

    assert!(summary.vacuum_thickness >= 15.0 - 1e-6);
    assert!(summary.slab_thickness > 0.0);

    let poscar = fs::read_to_string(out.join("POSCAR")).unwrap();
    assert!(poscar.contains("Selective dynamics"));

    let slab = parse_poscar_file(&out.join("POSCAR")).unwrap();
    let frozen: Vec<_> = slab
        .atoms
        .iter()
        .filter(|a| a.selective_dynamics == Some([false, false, false]))
        .collect();
    assert!(!frozen.is_empty());
    assert!(frozen.len() < slab.len());

    // 被固定的原子位于 slab 底部
    let cart = slab.cartesian_positions();
    let max_frozen_z = slab
        .atoms
        .iter()
        .zip(&cart)
        .filter(|(a, _)| a.selective_dynamics == Some([false, false, false]))
        .map(|(_, c)| c[2])
        .fold(f64::MIN, f64::max);
    let max_z = cart.iter().map(|c| c[2]).fold(f64::MIN, f64::max);
    assert!(max_frozen_z < max_z);

    let incar = fs::read_to_string(out.join("INCAR")).unwrap();
    assert!(incar.contains("LDIPOL = .TRUE."));
    assert!(incar.contains("IDIPOL = 3"));
}

#[test]
fn vacancy_workflow_then_formation_energy() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("vacancy");
    let summary = VacancyFormationEnergy {
        output_dir: out.clone(),
        ..Default::default()
    }
    .setup()
    .unwrap();

    assert_eq!(summary.vacancy_info.n_atoms_pristine, 40);
    assert_eq!(summary.vacancy_info.n_atoms_defective, 39);
    assert_eq!(summary.vacancy_info.removed_symbol, "O");
    assert_eq!(summary.calculations["pristine"].n_atoms, 40);
    assert!(out.join("analyze_vacancy.sh").is_file());

    let defective = parse_poscar_file(&out.join("defective").join("POSCAR")).unwrap();
    assert_eq!(defective.len(), 39);

    write_outcar(&out.join("pristine"), -320.0, None);
    write_outcar(&out.join("defective"), -310.5, None);

    let report =
        vacancy_formation_energy(&out.join("pristine"), &out.join("defective"), Some(-4.93)).unwrap();
    let e_f = report.formation_energy.unwrap();
    assert!((e_f - 4.57).abs() < 1e-9);
    assert_eq!(report.pristine_converged, Some(true));
}

#[test]
fn formation_energy_missing_outcar_is_none() {
    let tmp = tempfile::tempdir().unwrap();
    write_outcar(&tmp.path().join("pristine"), -320.0, None);
    fs::create_dir_all(tmp.path().join("defective")).unwrap();

    let report = vacancy_formation_energy(
        &tmp.path().join("pristine"),
        &tmp.path().join("defective"),
        None,
    )
    .unwrap();
    assert_eq!(report.pristine_energy, Some(-320.0));
    assert_eq!(report.defective_energy, None);
    assert_eq!(report.formation_energy, None);
}

#[test]
fn run_all_subset_writes_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path().join("dft_workflows");
    let results = run_all(&base, &[WorkflowKind::Dftu, WorkflowKind::Relax]).unwrap();

    let keys: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(keys, ["01_relax", "04_dftu"]);
    assert!(base.join("01_SrTiO3_relax").join("INCAR").is_file());
    assert!(base.join("04_dft_plus_u").is_dir());
    assert!(!base.join("02_surface_slab").exists());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(base.join("workflow_summary.json")).unwrap()).unwrap();
    assert_eq!(json["01_relax"]["n_atoms"], 5);
    assert!(json.get("04_dftu").is_some());
    assert!(json.get("06_phonon").is_none());
}

#[test]
fn generate_with_override() {
    let tmp = tempfile::tempdir().unwrap();
    let crystal = dftkit::builders::build_rocksalt("Mg", "O", 4.21);

    let mut overrides = TagSet::new();
    overrides.insert("ENCUT", IncarValue::parse("600"));
    overrides.insert("ISMEAR", IncarValue::parse("0"));

    let set = VaspInputSet::from_preset_name(&crystal, "scf", &overrides, 30.0, Default::default())
        .unwrap();
    let paths = set.write_all(tmp.path()).unwrap();
    assert!(paths.contains_key("INCAR"));

    let incar = fs::read_to_string(tmp.path().join("INCAR")).unwrap();
    assert!(incar.contains("ENCUT = 600"));
    assert!(incar.contains("ISMEAR = 0"));
    assert!(incar.contains("NSW = 0"));

    let err = VaspInputSet::from_preset_name(&crystal, "md", &overrides, 30.0, Default::default())
        .unwrap_err();
    assert!(matches!(err, DftkitError::UnknownPreset { .. }));
}

#[test]
fn parse_summary_of_synthetic_outcar() {
    let tmp = tempfile::tempdir().unwrap();
    write_outcar(tmp.path(), -43.25, Some(&[[0.01, -0.02, 0.0], [0.0, 0.03, -0.05]]));

    let summary = OutputParser::new(tmp.path()).summary().unwrap();
    assert_eq!(summary.total_energy, Some(-43.25));
    assert_eq!(summary.energy_sigma0, Some(-43.25));
    assert_eq!(summary.converged, Some(true));
    assert_eq!(summary.n_atoms, Some(2));
    assert!((summary.max_force.unwrap() - 0.05).abs() < 1e-9);
    assert_eq!(summary.band_gap, None);
    assert!(summary.error.is_none());

    let missing = OutputParser::new(tmp.path().join("nope")).summary().unwrap();
    assert_eq!(missing.error.as_deref(), Some("OUTCAR not found"));
    assert!(missing.total_energy.is_none());
}

#[test]
fn phonon_setup_then_force_sets() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("phonon");
    let summary = PhononDispersion {
        output_dir: out.clone(),
        ..Default::default()
    }
    .setup()
    .unwrap();

    assert_eq!(summary.n_atoms_primitive, 5);
    assert_eq!(summary.n_atoms_supercell, 40);
    assert_eq!(summary.n_displacements, 15);
    assert!(out.join("SPOSCAR").is_file());
    assert!(out.join("POSCAR-unitcell").is_file());

    let dataset = DisplacementDataset::read(&out).unwrap();
    assert_eq!(dataset.natom, 40);

    // 只完成前两个位移计算
    let forces: Vec<[f64; 3]> = (0..40).map(|i| [0.001 * i as f64, 0.0, -0.002]).collect();
    let done: Vec<PathBuf> = dataset
        .first_atoms
        .iter()
        .take(2)
        .map(|d| out.join(&d.directory))
        .collect();
    for dir in &done {
        write_outcar(dir, -300.0, Some(&forces));
    }

    let report = collect_force_sets(&out).unwrap();
    assert_eq!(report.n_collected, 2);
    assert_eq!(report.n_expected, 15);
    assert_eq!(report.skipped.len(), 13);

    let force_sets = fs::read_to_string(out.join("FORCE_SETS")).unwrap();
    let mut lines = force_sets.lines();
    assert_eq!(lines.next().unwrap().trim(), "40");
    assert_eq!(lines.next().unwrap().trim(), "2");
}

#[test]
fn force_sets_without_any_outcar_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("phonon");
    PhononDispersion {
        output_dir: out.clone(),
        ..Default::default()
    }
    .setup()
    .unwrap();

    assert!(collect_force_sets(&out).is_err());
    assert!(!out.join("FORCE_SETS").exists());
}

#[test]
fn api_key_resolution() {
    assert!(matches!(resolve_api_key(None, None), Err(DftkitError::MissingApiKey)));
    assert!(matches!(
        resolve_api_key(Some("  ".to_string()), None),
        Err(DftkitError::MissingApiKey)
    ));
    assert_eq!(resolve_api_key(None, Some("abc".to_string())).unwrap(), "abc");
    assert_eq!(
        resolve_api_key(Some("explicit".to_string()), Some("env".to_string())).unwrap(),
        "explicit"
    );
}
