//! # 空位形成能工作流
//!
//! 生成完整超胞 (pristine/) 和去掉一个原子的缺陷超胞 (defective/)，
//! 两者都只弛豫离子。运行完成后 `analyze_vacancy.sh` 计算
//! E_f = E(defective) - E(pristine) + μ。
//!
//! ## 依赖关系
//! - 使用 `builders/vacancy.rs`, `vasp/input_set.rs`
//! - 分析由 `analysis/vacancy.rs` 完成

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::{join_dims, path_strings, write_readme, write_script};
use crate::analysis::DEFAULT_MU_O;
use crate::builders::{build_perovskite, build_supercell_with_vacancy, VacancyInfo};
use crate::error::Result;
use crate::models::Crystal;
use crate::vasp::{CalcType, TagSet, VaspInputSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VacancyFormationEnergy {
    pub bulk: Crystal,
    pub supercell_dims: [usize; 3],
    pub vacancy_element: String,
    pub output_dir: PathBuf,
}

impl Default for VacancyFormationEnergy {
    fn default() -> Self {
        VacancyFormationEnergy {
            bulk: build_perovskite("Sr", "Ti", 3.905),
            supercell_dims: [2, 2, 2],
            vacancy_element: "O".to_string(),
            output_dir: PathBuf::from("03_vacancy"),
        }
    }
}

/// 单个超胞计算
#[derive(Debug, Clone, Serialize)]
pub struct SupercellCalc {
    pub n_atoms: usize,
    pub output_dir: String,
    pub files: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VacancySummary {
    pub vacancy_info: VacancyInfo,
    pub calculations: IndexMap<String, SupercellCalc>,
    pub analysis_script: String,
}

impl VacancyFormationEnergy {
    pub fn setup(&self) -> Result<VacancySummary> {
        let (pristine, defective, info) = build_supercell_with_vacancy(
            &self.bulk,
            self.supercell_dims,
            Some(&self.vacancy_element),
            None,
        )?;

        let mut overrides = TagSet::new();
        overrides.insert("ISIF", 2);

        let mut calculations = IndexMap::new();
        for (label, crystal) in [("pristine", &pristine), ("defective", &defective)] {
            let dir = self.output_dir.join(label);
            let set = VaspInputSet::new(crystal, CalcType::Relax, &overrides, 30.0, HashMap::new());
            let paths = set.write_all(&dir)?;
            calculations.insert(
                label.to_string(),
                SupercellCalc {
                    n_atoms: crystal.len(),
                    output_dir: dir.display().to_string(),
                    files: path_strings(&paths),
                },
            );
        }

        let script = write_script(&self.output_dir.join("analyze_vacancy.sh"), &analysis_script())?;
        write_readme(&self.output_dir, &self.readme(&pristine, &defective, &info))?;

        Ok(VacancySummary {
            vacancy_info: info,
            calculations,
            analysis_script: script.display().to_string(),
        })
    }

    fn readme(&self, pristine: &Crystal, defective: &Crystal, info: &VacancyInfo) -> String {
        let n_bulk = self.bulk.len();
        let [x, y, z] = info.removed_position;
        format!(
            r#"# Vacancy Formation Energy Calculation

## What this calculation does
Computes the formation energy of a {element} vacancy in
a {dims} supercell.

## Structures
- **Pristine**: {n_pristine} atoms, {f_pristine}
- **Defective**: {n_defective} atoms, {f_defective}
- Removed: 1 {removed} atom at position ({x:.4}, {y:.4}, {z:.4}) A

## Vacancy formation energy formula
```
E_f = E(defective) - E(pristine) + mu(removed_atom)
```

where mu is the chemical potential of the removed atom, which depends
on thermodynamic conditions:

| Condition | mu(O) | Interpretation |
|-----------|-------|----------------|
| O-rich    | 1/2 E(O2) | Equilibrium with O2 gas |
| O-poor    | 1/2 E(O2) + Delta_H / 3 | Metal-rich limit |

## How to run
```bash
# 1. Run pristine supercell:
cd pristine && mpirun -np 16 vasp_std > vasp.log 2>&1 && cd ..

# 2. Run defective supercell:
cd defective && mpirun -np 16 vasp_std > vasp.log 2>&1 && cd ..

# 3. Analyze results:
bash analyze_vacancy.sh
```

## Convergence test: supercell size
You should compare E_f for different supercell sizes:
- 2x2x2 ({n2} atoms)
- 3x3x3 ({n3} atoms)
- 4x4x4 ({n4} atoms) -- expensive!

E_f should converge to within ~0.05 eV.

## Expected results
For SrTiO3 oxygen vacancy (PBE):
- E_f ~ 6-7 eV (O-rich conditions)
- E_f ~ 2-3 eV (O-poor conditions)
"#,
            element = self.vacancy_element,
            dims = join_dims(&self.supercell_dims),
            n_pristine = pristine.len(),
            f_pristine = pristine.formula(),
            n_defective = defective.len(),
            f_defective = defective.formula(),
            removed = info.removed_symbol,
            n2 = 8 * n_bulk,
            n3 = 27 * n_bulk,
            n4 = 64 * n_bulk,
        )
    }
}

fn analysis_script() -> String {
    format!(
        r#"#!/bin/bash
# Compute the vacancy formation energy from the VASP results:
#
#   E_f = E(defective) - E(pristine) + mu(removed_atom)
#
# Requires completed VASP calculations in pristine/ and defective/.
# The default mu is half the PBE O2 energy ({mu} eV, O-rich limit);
# pass --mu to use another chemical potential.

cd "$(dirname "$0")"
dftkit analyze vacancy --pristine pristine --defective defective "$@"
"#,
        mu = DEFAULT_MU_O
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_setup() {
        let dir = tempfile::tempdir().unwrap();
        let wf = VacancyFormationEnergy {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let summary = wf.setup().unwrap();

        assert_eq!(summary.vacancy_info.n_atoms_pristine, 40);
        assert_eq!(summary.vacancy_info.n_atoms_defective, 39);
        assert_eq!(summary.vacancy_info.removed_symbol, "O");
        assert_eq!(summary.calculations["pristine"].n_atoms, 40);
        assert_eq!(summary.calculations["defective"].n_atoms, 39);

        for sub in ["pristine", "defective"] {
            let incar = fs::read_to_string(dir.path().join(sub).join("INCAR")).unwrap();
            assert!(incar.contains("  ISIF = 2"));
        }
        let script = fs::read_to_string(&summary.analysis_script).unwrap();
        assert!(script.starts_with("#!/bin/bash"));
        assert!(script.contains("dftkit analyze vacancy"));

        let readme = fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert!(readme.contains("- 2x2x2 (40 atoms)"));
        assert!(readme.contains("- **Defective**: 39 atoms, O23Sr8Ti8"));
    }

    #[test]
    fn test_missing_species() {
        let dir = tempfile::tempdir().unwrap();
        let wf = VacancyFormationEnergy {
            vacancy_element: "N".to_string(),
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(wf.setup().is_err());
        assert!(!dir.path().join("pristine").exists());
    }
}
