//! # 钙钛矿结构弛豫
//!
//! 立方 ABO3 钙钛矿的完全弛豫（离子、晶胞形状和体积），PBE。
//!
//! ## 依赖关系
//! - 使用 `builders/bulk.rs`, `vasp/input_set.rs`

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{encut_value, path_strings, potcar_map, write_readme};
use crate::builders::build_perovskite;
use crate::error::Result;
use crate::models::Crystal;
use crate::vasp::{CalcType, TagSet, VaspInputSet};

/// 常用钙钛矿元素的推荐 POTCAR
pub const PEROVSKITE_POTCARS: [(&str, &str); 7] = [
    ("Sr", "Sr_sv"),
    ("Ba", "Ba_sv"),
    ("Pb", "Pb_d"),
    ("Ti", "Ti_pv"),
    ("Zr", "Zr_sv"),
    ("Nb", "Nb_pv"),
    ("O", "O"),
];

/// 钙钛矿弛豫参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerovskiteRelaxation {
    pub a_site: String,
    pub b_site: String,
    /// 初始晶格常数 (Å)
    pub a: f64,
    /// 平面波截断能 (eV)
    pub encut: f64,
    pub kpoints_density: f64,
    pub output_dir: PathBuf,
}

impl Default for PerovskiteRelaxation {
    fn default() -> Self {
        PerovskiteRelaxation {
            a_site: "Sr".to_string(),
            b_site: "Ti".to_string(),
            a: 3.905,
            encut: 520.0,
            kpoints_density: 40.0,
            output_dir: PathBuf::from("01_SrTiO3_relax"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelaxSummary {
    pub formula: String,
    pub n_atoms: usize,
    #[serde(rename = "lattice_constant_A")]
    pub lattice_constant: f64,
    pub output_dir: String,
    pub files: IndexMap<String, String>,
    pub explanation: String,
}

impl PerovskiteRelaxation {
    pub fn structure(&self) -> Crystal {
        build_perovskite(&self.a_site, &self.b_site, self.a)
    }

    pub fn input_set(&self) -> VaspInputSet {
        let mut overrides = TagSet::new();
        overrides.insert("ENCUT", encut_value(self.encut));
        VaspInputSet::new(
            &self.structure(),
            CalcType::Relax,
            &overrides,
            self.kpoints_density,
            potcar_map(&PEROVSKITE_POTCARS),
        )
    }

    pub fn setup(&self) -> Result<RelaxSummary> {
        let set = self.input_set();
        let mut paths = set.write_all(&self.output_dir)?;
        paths.insert(
            "README.md".to_string(),
            write_readme(&self.output_dir, &self.readme(&set))?,
        );

        Ok(RelaxSummary {
            formula: set.crystal().formula(),
            n_atoms: set.crystal().len(),
            lattice_constant: self.a,
            output_dir: self.output_dir.display().to_string(),
            files: path_strings(&paths),
            explanation: set.explain(),
        })
    }

    fn readme(&self, set: &VaspInputSet) -> String {
        let [k1, k2, k3] = set.kpoints();
        format!(
            r#"# Perovskite Relaxation: {formula}

## What this calculation does
Full structural relaxation (ions + cell shape + cell volume) of cubic
{a_site}{b_site}O3 perovskite using PBE-GGA.

## Structure
- Space group: Pm-3m (#221), cubic perovskite
- {a_site} at corner (0,0,0), {b_site} at body centre (1/2,1/2,1/2)
- O at face centres
- Initial lattice constant: {a} A
- 5 atoms per unit cell

## Key INCAR settings
- **ISIF = 3**: Relax ions, cell shape, AND cell volume
- **IBRION = 2**: Conjugate-gradient algorithm
- **ENCUT = {encut} eV**: Plane-wave cutoff (must be >= 1.3 * ENMAX)
- **EDIFFG = -0.01 eV/A**: Force convergence criterion

## k-point grid
- Gamma-centred {k1}x{k2}x{k3} mesh

## How to run
```bash
# 1. Copy your POTCAR files (see POTCAR_REFERENCE)
# 2. Submit to your HPC queue or run directly:
mpirun -np 4 vasp_std > vasp.log 2>&1
```

## How to check convergence
```bash
# Check if relaxation converged:
grep "reached required accuracy" OUTCAR

# Check final energy:
grep "free  energy   TOTEN" OUTCAR | tail -1

# Check residual forces:
grep "FORCES:" OUTCAR | tail -1

# Or let dftkit summarise everything:
dftkit parse .
```

## Common problems
1. **Pulay stress warning**: Increase ENCUT to 600+ eV
2. **Symmetry broken**: Add ISYM = 2 to INCAR
3. **Not converged after NSW steps**: Increase NSW or restart from CONTCAR
4. **Negative frequencies in phonons**: Structure not fully relaxed
"#,
            formula = set.crystal().formula(),
            a_site = self.a_site,
            b_site = self.b_site,
            a = self.a,
            encut = encut_value(self.encut),
        )
    }
}
