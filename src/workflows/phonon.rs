//! # 有限位移法声子
//!
//! 将原胞扩成对角超胞，对每个原胞原子沿 x, y, z 各位移一次，每个位移
//! 构型一个 `disp-NNN` 目录。不做对称性约化，位移数为 3 × 原胞原子数。
//!
//! 位移信息写入 `displacements.json`，计算完成后由
//! `dftkit analyze phonon` 汇总为 phonopy 的 FORCE_SETS。
//!
//! ## 依赖关系
//! - 使用 `models/structure.rs`, `vasp/input_set.rs`, `parsers/poscar.rs`
//! - 被 `analysis/phonon.rs` 读取

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{join_dims, write_readme, write_script};
use crate::builders::build_perovskite;
use crate::error::{DftkitError, Result};
use crate::models::{Crystal, Lattice};
use crate::parsers::write_poscar_file;
use crate::vasp::input_set::write_text;
use crate::vasp::{CalcType, TagSet, VaspInputSet};

pub const DISPLACEMENTS_FILE: &str = "displacements.json";
pub const BAND_CONF_FILE: &str = "band.conf";

/// 简立方布里渊区路径 Γ-X-M-Γ-R-X
const BAND_PATH: &str = "0 0 0  0.5 0 0  0.5 0.5 0  0 0 0  0.5 0.5 0.5  0.5 0 0";
const BAND_LABELS: &str = r"$\Gamma$ X M $\Gamma$ R X";
/// DOS 用的 q 点网格
const DOS_MESH: [usize; 3] = [20, 20, 20];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhononDispersion {
    pub bulk: Crystal,
    /// 超胞矩阵，只支持对角形式
    pub supercell_matrix: [[i32; 3]; 3],
    /// 位移大小 (Å)
    pub displacement: f64,
    pub output_dir: PathBuf,
}

impl Default for PhononDispersion {
    fn default() -> Self {
        PhononDispersion {
            bulk: build_perovskite("Sr", "Ti", 3.905),
            supercell_matrix: [[2, 0, 0], [0, 2, 0], [0, 0, 2]],
            displacement: 0.01,
            output_dir: PathBuf::from("06_phonons"),
        }
    }
}

/// 单个位移
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Displacement {
    /// 超胞中的原子序号（POSCAR 顺序，从 1 开始）
    pub number: usize,
    /// 笛卡尔位移 (Å)
    pub displacement: [f64; 3],
    pub directory: String,
}

/// displacements.json 内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplacementDataset {
    pub natom: usize,
    pub supercell_matrix: [[i32; 3]; 3],
    #[serde(rename = "displacement_A")]
    pub displacement: f64,
    pub first_atoms: Vec<Displacement>,
}

impl DisplacementDataset {
    pub fn read(phonon_dir: &Path) -> Result<Self> {
        let path = phonon_dir.join(DISPLACEMENTS_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DftkitError::FileNotFound {
                name: DISPLACEMENTS_FILE.to_string(),
                dir: phonon_dir.display().to_string(),
            },
            _ => DftkitError::read(&path, e),
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhononSummary {
    pub n_atoms_primitive: usize,
    pub n_atoms_supercell: usize,
    pub supercell_matrix: [[i32; 3]; 3],
    pub n_displacements: usize,
    #[serde(rename = "displacement_A")]
    pub displacement: f64,
    pub displacement_dirs: Vec<String>,
    pub postprocess_script: String,
    pub run_script: String,
}

impl PhononDispersion {
    /// 对角超胞的倍数
    pub fn supercell_dims(&self) -> Result<[usize; 3]> {
        let m = self.supercell_matrix;
        let mut dims = [0usize; 3];
        for i in 0..3 {
            for j in 0..3 {
                if i != j && m[i][j] != 0 {
                    return Err(DftkitError::InvalidArgument(format!(
                        "only diagonal supercell matrices are supported, got {:?}",
                        m
                    )));
                }
            }
            if m[i][i] < 1 {
                return Err(DftkitError::InvalidArgument(format!(
                    "supercell multiples must be positive, got {:?}",
                    m
                )));
            }
            dims[i] = m[i][i] as usize;
        }
        Ok(dims)
    }

    /// 按元素分组的原胞，写出为 `POSCAR-unitcell`
    pub fn unit_cell(&self) -> Crystal {
        let mut unit = self.bulk.clone();
        unit.group_by_species();
        unit
    }

    /// 超胞，以及每个原胞原子第一个像在其中的序号
    ///
    /// 原子顺序与 phonopy 由原胞生成的超胞一致：原子优先，同一原子的像
    /// 按 a 最快、c 最慢排列。因此原胞第 l 个原子的第一个像序号为 l × N。
    pub fn supercell(&self) -> Result<(Crystal, Vec<usize>)> {
        if self.bulk.is_empty() {
            return Err(DftkitError::InvalidArgument("empty structure".to_string()));
        }
        let [nx, ny, nz] = self.supercell_dims()?;
        let unit = self.unit_cell();
        let n_images = nx * ny * nz;

        let mut atoms = Vec::with_capacity(unit.len() * n_images);
        for atom in &unit.atoms {
            for k in 0..nz {
                for j in 0..ny {
                    for i in 0..nx {
                        let mut image = atom.clone();
                        image.position = [
                            (atom.position[0] + i as f64) / nx as f64,
                            (atom.position[1] + j as f64) / ny as f64,
                            (atom.position[2] + k as f64) / nz as f64,
                        ];
                        atoms.push(image);
                    }
                }
            }
        }

        let m = unit.lattice.matrix;
        let lattice = Lattice::from_vectors([
            m[0].map(|x| x * nx as f64),
            m[1].map(|x| x * ny as f64),
            m[2].map(|x| x * nz as f64),
        ]);
        let mut supercell = Crystal::new(unit.name.clone(), lattice, atoms);
        supercell.pbc = unit.pbc;

        let first_images = (0..unit.len()).map(|l| l * n_images).collect();
        Ok((supercell, first_images))
    }

    /// 全部位移构型
    pub fn displaced_supercells(&self) -> Result<(Crystal, Vec<(Displacement, Crystal)>)> {
        let (supercell, first_images) = self.supercell()?;
        let mut configs = Vec::with_capacity(first_images.len() * 3);

        for &index in &first_images {
            for axis in 0..3 {
                let mut vector = [0.0; 3];
                vector[axis] = self.displacement;
                let delta = supercell.lattice.to_fractional(vector);

                let mut displaced = supercell.clone();
                let pos = &mut displaced.atoms[index].position;
                for k in 0..3 {
                    pos[k] += delta[k];
                }

                let directory = format!("disp-{:03}", configs.len() + 1);
                configs.push((
                    Displacement {
                        number: index + 1,
                        displacement: vector,
                        directory,
                    },
                    displaced,
                ));
            }
        }
        Ok((supercell, configs))
    }

    pub fn setup(&self) -> Result<PhononSummary> {
        let (supercell, configs) = self.displaced_supercells()?;
        let n_disp = configs.len();
        log::info!(
            "{} displaced supercells of {} atoms",
            n_disp,
            supercell.len()
        );

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| DftkitError::write(&self.output_dir, e))?;
        write_poscar_file(&self.unit_cell(), &self.output_dir.join("POSCAR-unitcell"))?;
        write_poscar_file(&supercell, &self.output_dir.join("SPOSCAR"))?;

        let mut dirs = Vec::with_capacity(n_disp);
        let mut first_atoms = Vec::with_capacity(n_disp);
        for (disp, crystal) in configs {
            let dir = self.output_dir.join(&disp.directory);
            VaspInputSet::new(&crystal, CalcType::Phonon, &TagSet::new(), 25.0, HashMap::new())
                .write_all(&dir)?;
            dirs.push(dir.display().to_string());
            first_atoms.push(disp);
        }

        let dataset = DisplacementDataset {
            natom: supercell.len(),
            supercell_matrix: self.supercell_matrix,
            displacement: self.displacement,
            first_atoms,
        };
        let json = serde_json::to_string_pretty(&dataset)? + "\n";
        write_text(&self.output_dir.join(DISPLACEMENTS_FILE), &json)?;

        write_text(
            &self.output_dir.join(BAND_CONF_FILE),
            &band_conf(self.supercell_dims()?),
        )?;

        let postprocess = write_script(
            &self.output_dir.join("postprocess_phonons.sh"),
            POSTPROCESS_SCRIPT,
        )?;
        let run = write_script(
            &self.output_dir.join("run_all_displacements.sh"),
            &run_script(n_disp),
        )?;
        write_readme(&self.output_dir, &self.readme(supercell.len(), n_disp)?)?;

        Ok(PhononSummary {
            n_atoms_primitive: self.bulk.len(),
            n_atoms_supercell: supercell.len(),
            supercell_matrix: self.supercell_matrix,
            n_displacements: n_disp,
            displacement: self.displacement,
            displacement_dirs: dirs,
            postprocess_script: postprocess.display().to_string(),
            run_script: run.display().to_string(),
        })
    }

    fn readme(&self, n_supercell: usize, n_disp: usize) -> Result<String> {
        let dims = self.supercell_dims()?;
        Ok(format!(
            r#"# Phonon Dispersion Calculation

## Method: Finite displacements (frozen phonon)
The harmonic phonon frequencies are computed by:
1. Displacing each atom slightly from equilibrium
2. Computing the resulting forces with DFT (VASP)
3. Building the force constant matrix from force-displacement pairs
4. Diagonalising the dynamical matrix at each q-point

## Setup
- Primitive cell: {n_prim} atoms, {formula}
- Supercell: {dims} ({n_supercell} atoms)
- Displacement: {disp} A
- Number of displaced configurations: {n_disp}
  (one per primitive atom and Cartesian direction, no symmetry reduction)

## Key INCAR settings for force calculations
- **EDIFF = 1e-8**: Very tight SCF convergence for accurate forces
- **LREAL = .FALSE.**: Reciprocal-space projection (required for phonon accuracy)
- **IBRION = -1, NSW = 0**: Single-point calculation (no relaxation)
- **PREC = Accurate**: Full precision FFT grid

## How to run
```bash
# Step 1: Run all displacement calculations
bash run_all_displacements.sh

# Step 2: Collect the forces into FORCE_SETS
bash postprocess_phonons.sh
```

## Output files
- `POSCAR-unitcell` -- Primitive cell, species grouped
- `SPOSCAR` -- Undisplaced supercell (same atom order as phonopy's)
- `displacements.json` -- Displaced atom and vector for each disp-NNN
- `band.conf` -- Phonopy band path (Gamma-X-M-Gamma-R-X) and 20x20x20 DOS mesh
- `FORCE_SETS` -- Phonopy force sets, written by the post-processing step

With FORCE_SETS in place,
`phonopy --dim="{dims_flat}" -c POSCAR-unitcell -p band.conf` plots the
dispersion and writes `band.yaml`.

## Interpreting the band structure
- **Acoustic modes**: Start at 0 THz at Gamma point (3 branches)
- **Optical modes**: Higher frequency branches
- **Imaginary frequencies**: Plotted as negative -> dynamical instability
- **LO-TO splitting**: Splitting at Gamma for polar materials (not
  included by default; add with `NAC = .TRUE.` and Born effective charges)

## Convergence tests
1. **Supercell size**: Compare 2x2x2 vs 3x3x3
2. **k-points**: Increase k-point density for force calculations
3. **EDIFF**: Compare 1e-7 vs 1e-8 vs 1e-9
4. **Displacement magnitude**: 0.01 A is standard; test 0.005 and 0.02
"#,
            n_prim = self.bulk.len(),
            formula = self.bulk.formula(),
            dims = join_dims(&dims),
            dims_flat = format!("{} {} {}", dims[0], dims[1], dims[2]),
            disp = self.displacement,
        ))
    }
}

/// phonopy 的 band.conf：色散路径和 DOS 网格
pub fn band_conf(dims: [usize; 3]) -> String {
    format!(
        "DIM = {} {} {}\nBAND = {}\nBAND_LABELS = {}\nMESH = {} {} {}\nBAND_POINTS = 101\n",
        dims[0], dims[1], dims[2], BAND_PATH, BAND_LABELS, DOS_MESH[0], DOS_MESH[1], DOS_MESH[2]
    )
}

fn run_script(n_disp: usize) -> String {
    format!(
        r#"#!/bin/bash
# Run all {n_disp} displacement calculations for phonons.
#
# Usage:
#   bash run_all_displacements.sh
#
# For HPC with SLURM, modify the vasp command and add sbatch headers.

set -e
cd "$(dirname "$0")"

VASP_CMD="${{VASP_CMD:-mpirun -np 4 vasp_std}}"

for i in $(seq 1 {n_disp}); do
    dir=$(printf "disp-%03d" "$i")
    if [ ! -d "$dir" ]; then
        echo "Directory $dir not found, skipping"
        continue
    fi

    if [ -f "$dir/vasprun.xml" ]; then
        echo "[$dir] Already completed, skipping"
        continue
    fi

    echo "[$dir] Running VASP..."
    cd "$dir"
    $VASP_CMD > vasp.log 2>&1
    cd ..
    echo "[$dir] Done"
done

echo ""
echo "All displacements complete!"
echo "Run: bash postprocess_phonons.sh"
"#
    )
}

const POSTPROCESS_SCRIPT: &str = r#"#!/bin/bash
# Collect the forces of every disp-NNN/OUTCAR into a phonopy FORCE_SETS.
#
# Displacements without an OUTCAR are skipped with a warning.

set -e
cd "$(dirname "$0")"
dftkit analyze phonon --dir . "$@"

if command -v phonopy > /dev/null; then
    phonopy -c POSCAR-unitcell -p -s band.conf
    echo "Band structure written to band.yaml"
else
    echo "phonopy not found; install it and run: phonopy -c POSCAR-unitcell -p band.conf"
fi
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_setup() {
        let dir = tempfile::tempdir().unwrap();
        let wf = PhononDispersion {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let summary = wf.setup().unwrap();

        assert_eq!(summary.n_atoms_primitive, 5);
        assert_eq!(summary.n_atoms_supercell, 40);
        assert_eq!(summary.n_displacements, 15);
        assert_eq!(summary.displacement_dirs.len(), 15);
        assert!(summary.displacement_dirs[0].ends_with("disp-001"));
        assert!(summary.displacement_dirs[14].ends_with("disp-015"));

        let incar = fs::read_to_string(dir.path().join("disp-001/INCAR")).unwrap();
        assert!(incar.starts_with("# VASP INCAR -- phonon calculation"));
        assert!(dir.path().join("SPOSCAR").exists());
        assert!(dir.path().join("POSCAR-unitcell").exists());

        let run = fs::read_to_string(&summary.run_script).unwrap();
        assert!(run.contains("$(seq 1 15)"));
        assert!(run.contains("disp-%03d"));
        let post = fs::read_to_string(&summary.postprocess_script).unwrap();
        assert!(post.contains("dftkit analyze phonon"));
        assert!(post.contains("band.conf"));
    }

    #[test]
    fn test_band_conf_written() {
        let dir = tempfile::tempdir().unwrap();
        let wf = PhononDispersion {
            supercell_matrix: [[2, 0, 0], [0, 2, 0], [0, 0, 3]],
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        wf.setup().unwrap();

        let conf = fs::read_to_string(dir.path().join("band.conf")).unwrap();
        let lines: Vec<&str> = conf.lines().collect();
        assert_eq!(lines[0], "DIM = 2 2 3");
        assert_eq!(
            lines[1],
            "BAND = 0 0 0  0.5 0 0  0.5 0.5 0  0 0 0  0.5 0.5 0.5  0.5 0 0"
        );
        assert_eq!(lines[2], r"BAND_LABELS = $\Gamma$ X M $\Gamma$ R X");
        assert_eq!(lines[3], "MESH = 20 20 20");

        let readme = fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert!(readme.contains("-p band.conf"));
    }

    #[test]
    fn test_displaced_atom_indices() {
        let wf = PhononDispersion::default();
        let (supercell, configs) = wf.displaced_supercells().unwrap();

        // 原子优先: 8 Sr, 8 Ti, 再是三个 O 各 8 个像
        let numbers: Vec<usize> = configs.iter().map(|(d, _)| d.number).collect();
        assert_eq!(
            numbers,
            vec![1, 1, 1, 9, 9, 9, 17, 17, 17, 25, 25, 25, 33, 33, 33]
        );
        assert_eq!(supercell.atoms[16].element, "O");
        assert!(supercell.species_contiguous());
        // 第二个像沿 a 平移
        let p = supercell.atoms[1].position;
        assert!((p[0] - 0.5).abs() < 1e-12 && p[1].abs() < 1e-12 && p[2].abs() < 1e-12);

        // 只有被位移的原子改变，笛卡尔位移为 0.01 Å
        let (disp, crystal) = &configs[4];
        assert_eq!(disp.displacement, [0.0, 0.01, 0.0]);
        let before = supercell.cartesian_positions();
        let after = crystal.cartesian_positions();
        for i in 0..supercell.len() {
            let d: Vec<f64> = (0..3).map(|k| after[i][k] - before[i][k]).collect();
            if i == disp.number - 1 {
                assert!((d[1] - 0.01).abs() < 1e-9);
                assert!(d[0].abs() < 1e-9 && d[2].abs() < 1e-9);
            } else {
                assert!(d.iter().all(|x| x.abs() < 1e-12));
            }
        }
    }

    #[test]
    fn test_dataset_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let wf = PhononDispersion {
            supercell_matrix: [[1, 0, 0], [0, 1, 0], [0, 0, 2]],
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        wf.setup().unwrap();
        let dataset = DisplacementDataset::read(dir.path()).unwrap();
        assert_eq!(dataset.natom, 10);
        assert_eq!(dataset.first_atoms.len(), 15);
        assert_eq!(dataset.first_atoms[0].directory, "disp-001");
    }

    #[test]
    fn test_non_diagonal_matrix_rejected() {
        let wf = PhononDispersion {
            supercell_matrix: [[1, 1, 0], [0, 1, 0], [0, 0, 1]],
            ..Default::default()
        };
        assert!(matches!(wf.supercell_dims(), Err(DftkitError::InvalidArgument(_))));
    }
}
