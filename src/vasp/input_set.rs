//! # VASP 输入文件集
//!
//! 由结构和计算类型生成一个计算目录所需的全部输入文件：
//! INCAR, POSCAR, KPOINTS, POTCAR_REFERENCE, calc_info.json。
//!
//! 输入集持有结构的独立副本。若同种元素不连续，副本会按元素首次
//! 出现顺序稳定重排，保证 POSCAR、POTCAR 顺序、LDAU 数组与 MAGMOM 一致。
//!
//! ## 依赖关系
//! - 被 `workflows/`, `commands/generate.rs` 使用
//! - 使用 `vasp/presets.rs`, `vasp/kpoints.rs`, `parsers/poscar.rs`

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::kpoints::{auto_kpoints, kpoints_string};
use super::presets::{tag_comment, CalcType, IncarValue, TagSet};
use crate::error::{DftkitError, Result};
use crate::models::Crystal;
use crate::parsers::poscar::to_poscar_string;

/// calc_info.json 内容
#[derive(Debug, Clone, Serialize)]
pub struct CalcInfo {
    pub calc_type: String,
    pub formula: String,
    pub n_atoms: usize,
    pub kpoints: [usize; 3],
    pub incar_tags: IndexMap<String, String>,
}

/// 一个计算的输入文件集
#[derive(Debug, Clone)]
pub struct VaspInputSet {
    crystal: Crystal,
    calc_type: CalcType,
    tags: TagSet,
    kpoints_density: f64,
    potcar_map: HashMap<String, String>,
}

impl VaspInputSet {
    pub fn new(
        crystal: &Crystal,
        calc_type: CalcType,
        overrides: &TagSet,
        kpoints_density: f64,
        potcar_map: HashMap<String, String>,
    ) -> Self {
        let mut crystal = crystal.clone();
        if !crystal.species_contiguous() {
            log::warn!(
                "species of {} are not contiguous; regrouping by first occurrence ({})",
                crystal.formula(),
                crystal.species_order().join(" ")
            );
            crystal.group_by_species();
        }

        let mut tags = TagSet::resolve(calc_type.defaults(), overrides);
        if crystal.has_magnetic_moments() && !tags.contains("MAGMOM") {
            if !tags.contains("ISPIN") {
                tags.insert("ISPIN", 2);
            }
            tags.insert("MAGMOM", magmom_value(&crystal));
        }

        log::debug!(
            "{} input set for {} ({} atoms, {} tags)",
            calc_type,
            crystal.formula(),
            crystal.len(),
            tags.len()
        );

        VaspInputSet {
            crystal,
            calc_type,
            tags,
            kpoints_density,
            potcar_map,
        }
    }

    /// 以预设名称构造，未知名称返回 `UnknownPreset`
    pub fn from_preset_name(
        crystal: &Crystal,
        calc_type: &str,
        overrides: &TagSet,
        kpoints_density: f64,
        potcar_map: HashMap<String, String>,
    ) -> Result<Self> {
        let calc_type: CalcType = calc_type.parse()?;
        Ok(Self::new(crystal, calc_type, overrides, kpoints_density, potcar_map))
    }

    pub fn crystal(&self) -> &Crystal {
        &self.crystal
    }

    pub fn calc_type(&self) -> CalcType {
        self.calc_type
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn kpoints(&self) -> [usize; 3] {
        auto_kpoints(&self.crystal.lattice, self.kpoints_density)
    }

    /// 元素顺序（POSCAR 中首次出现顺序）
    pub fn species(&self) -> Vec<String> {
        self.crystal.species_order()
    }

    pub fn incar_string(&self) -> String {
        let mut lines = vec![
            format!("# VASP INCAR -- {} calculation", self.calc_type),
            String::new(),
        ];
        for (tag, value) in self.tags.iter() {
            match tag_comment(tag) {
                Some(comment) => lines.push(format!("  {} = {}    # {}", tag, value, comment)),
                None => lines.push(format!("  {} = {}", tag, value)),
            }
        }
        lines.push(String::new());
        lines.join("\n")
    }

    pub fn poscar_string(&self) -> String {
        to_poscar_string(&self.crystal)
    }

    pub fn kpoints_string(&self) -> String {
        kpoints_string(self.kpoints())
    }

    pub fn potcar_reference_string(&self) -> String {
        let species = self.species();
        let mut lines = vec![
            "# POTCAR reference -- you must supply your own POTCAR from".to_string(),
            "# your VASP pseudopotential library.".to_string(),
            "#".to_string(),
            "# Concatenate in this order:".to_string(),
            "#   cat POT1 POT2 ... > POTCAR".to_string(),
            "#".to_string(),
            "# Recommended variants (PBE):".to_string(),
        ];
        for s in &species {
            let variant = self.potcar_map.get(s).unwrap_or(s);
            lines.push(format!("#   {}  ->  {}", s, variant));
        }
        lines.push("#".to_string());
        lines.push(format!("# Species order in POSCAR: {}", species.join(" ")));
        lines.join("\n") + "\n"
    }

    pub fn calc_info(&self) -> CalcInfo {
        CalcInfo {
            calc_type: self.calc_type.to_string(),
            formula: self.crystal.formula(),
            n_atoms: self.crystal.len(),
            kpoints: self.kpoints(),
            incar_tags: self.tags.formatted(),
        }
    }

    pub fn write_incar(&self, dir: &Path) -> Result<PathBuf> {
        write_text(&dir.join("INCAR"), &self.incar_string())
    }

    pub fn write_poscar(&self, dir: &Path) -> Result<PathBuf> {
        write_text(&dir.join("POSCAR"), &self.poscar_string())
    }

    pub fn write_kpoints(&self, dir: &Path) -> Result<PathBuf> {
        write_text(&dir.join("KPOINTS"), &self.kpoints_string())
    }

    pub fn write_potcar_reference(&self, dir: &Path) -> Result<PathBuf> {
        write_text(&dir.join("POTCAR_REFERENCE"), &self.potcar_reference_string())
    }

    /// 写出全部输入文件
    ///
    /// 目录不存在时创建；已有文件直接覆盖。中途失败不回滚。
    pub fn write_all(&self, dir: &Path) -> Result<IndexMap<String, PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| DftkitError::write(dir, e))?;

        let mut paths = IndexMap::new();
        paths.insert("INCAR".to_string(), self.write_incar(dir)?);
        paths.insert("POSCAR".to_string(), self.write_poscar(dir)?);
        paths.insert("KPOINTS".to_string(), self.write_kpoints(dir)?);
        paths.insert("POTCAR_REFERENCE".to_string(), self.write_potcar_reference(dir)?);

        let json = serde_json::to_string_pretty(&self.calc_info())? + "\n";
        paths.insert(
            "calc_info.json".to_string(),
            write_text(&dir.join("calc_info.json"), &json)?,
        );

        log::info!("wrote {} input set to {}", self.calc_type, dir.display());
        Ok(paths)
    }

    /// 每个 INCAR 标签的说明
    pub fn explain(&self) -> String {
        let mut lines = vec![
            format!("=== INCAR explanation for '{}' calculation ===", self.calc_type),
            String::new(),
        ];
        for (tag, value) in self.tags.iter() {
            lines.push(format!("  {} = {}", tag, value));
            lines.push(format!(
                "    -> {}",
                tag_comment(tag).unwrap_or("(no description)")
            ));
            lines.push(String::new());
        }
        lines.join("\n")
    }
}

/// 按 POSCAR 顺序生成 MAGMOM，每个值保留一位小数
pub fn magmom_value(crystal: &Crystal) -> IncarValue {
    IncarValue::Str(
        crystal
            .initial_magnetic_moments()
            .iter()
            .map(|m| format!("{:.1}", m))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

pub(crate) fn write_text(path: &Path, content: &str) -> Result<PathBuf> {
    fs::write(path, content).map_err(|e| DftkitError::write(path, e))?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::build_perovskite;
    use crate::models::{Atom, Lattice};

    fn srtio3_set(overrides: &TagSet) -> VaspInputSet {
        VaspInputSet::new(
            &build_perovskite("Sr", "Ti", 3.905),
            CalcType::Relax,
            overrides,
            40.0,
            HashMap::from([("Sr".to_string(), "Sr_sv".to_string())]),
        )
    }

    #[test]
    fn test_incar_contains_every_preset_tag_once() {
        let set = srtio3_set(&TagSet::new());
        let incar = set.incar_string();
        let lines: Vec<&str> = incar.lines().collect();

        assert_eq!(lines[0], "# VASP INCAR -- relax calculation");
        assert_eq!(lines[1], "");
        for (tag, value) in CalcType::Relax.defaults().iter() {
            let prefix = format!("  {} = {}", tag, value);
            let n = lines.iter().filter(|l| l.starts_with(&format!("  {} =", tag))).count();
            assert_eq!(n, 1, "{tag}");
            assert!(lines.iter().any(|l| l.starts_with(&prefix)));
        }
        assert!(incar.contains(
            "  EDIFF = 1e-06    # SCF energy convergence (eV).  1e-6 is standard"
        ));
        assert!(incar.contains("  LWAVE = .FALSE."));
        assert!(incar.ends_with('\n'));
    }

    #[test]
    fn test_override_replaces_exactly_one_tag() {
        let base = srtio3_set(&TagSet::new()).incar_string();
        let overrides: TagSet = [("ENCUT", IncarValue::Int(600))].into_iter().collect();
        let changed = srtio3_set(&overrides).incar_string();

        let a: Vec<&str> = base.lines().collect();
        let b: Vec<&str> = changed.lines().collect();
        assert_eq!(a.len(), b.len());
        let diffs: Vec<usize> = (0..a.len()).filter(|&i| a[i] != b[i]).collect();
        assert_eq!(diffs.len(), 1);
        assert!(b[diffs[0]].starts_with("  ENCUT = 600"));
    }

    #[test]
    fn test_unknown_preset_name() {
        let crystal = build_perovskite("Sr", "Ti", 3.905);
        let err = VaspInputSet::from_preset_name(&crystal, "md", &TagSet::new(), 40.0, HashMap::new())
            .unwrap_err();
        assert!(matches!(err, DftkitError::UnknownPreset { .. }));
    }

    #[test]
    fn test_potcar_reference() {
        let text = srtio3_set(&TagSet::new()).potcar_reference_string();
        assert!(text.contains("#   Sr  ->  Sr_sv\n"));
        assert!(text.contains("#   Ti  ->  Ti\n"));
        assert!(text.ends_with("# Species order in POSCAR: Sr Ti O\n"));
    }

    #[test]
    fn test_magmom_and_regrouping() {
        let atoms = vec![
            Atom::new("Ni", [0.0, 0.0, 0.0]).with_magmom(2.0),
            Atom::new("O", [0.5, 0.5, 0.5]),
            Atom::new("Ni", [0.5, 0.0, 0.0]).with_magmom(-2.0),
            Atom::new("O", [0.0, 0.5, 0.5]),
        ];
        let crystal = Crystal::new("NiO", Lattice::cubic(4.177), atoms);
        let set = VaspInputSet::new(&crystal, CalcType::Relax, &TagSet::new(), 30.0, HashMap::new());

        assert_eq!(set.crystal().symbols(), vec!["Ni", "Ni", "O", "O"]);
        assert_eq!(set.tags().get("ISPIN"), Some(&IncarValue::Int(2)));
        assert_eq!(set.tags().get("MAGMOM").unwrap().to_string(), "2.0 -2.0 0.0 0.0");
        // 调用方的结构不受影响
        assert_eq!(crystal.symbols(), vec!["Ni", "O", "Ni", "O"]);
    }

    #[test]
    fn test_explain() {
        let text = srtio3_set(&TagSet::new()).explain();
        assert!(text.starts_with("=== INCAR explanation for 'relax' calculation ===\n\n"));
        assert!(text.contains("  NSW = 100\n    -> Max number of ionic steps\n"));

        let overrides: TagSet = [("NPAR", IncarValue::Int(4))].into_iter().collect();
        let text = srtio3_set(&overrides).explain();
        assert!(text.contains("  NPAR = 4\n    -> (no description)"));
    }

    #[test]
    fn test_write_all() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/relax");
        let paths = srtio3_set(&TagSet::new()).write_all(&target).unwrap();

        let keys: Vec<&String> = paths.keys().collect();
        assert_eq!(keys, ["INCAR", "POSCAR", "KPOINTS", "POTCAR_REFERENCE", "calc_info.json"]);
        for p in paths.values() {
            assert!(p.exists());
        }

        let info: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths["calc_info.json"]).unwrap()).unwrap();
        assert_eq!(info["calc_type"], "relax");
        assert_eq!(info["formula"], "O3SrTi");
        assert_eq!(info["n_atoms"], 5);
        assert_eq!(info["kpoints"], serde_json::json!([65, 65, 65]));
        assert_eq!(info["incar_tags"]["EDIFF"], "1e-06");
    }
}
