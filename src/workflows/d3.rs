//! # 石墨的 DFT-D3 修正
//!
//! 同一个 AB 堆垛石墨结构做三次完全弛豫：不加色散修正、D3(BJ)、
//! D3(zero)。比较弛豫后的层间距即可看出 PBE 缺失的 vdW 作用。
//!
//! ## 依赖关系
//! - 使用 `builders/bulk.rs`, `vasp/input_set.rs`
//! - 分析由 `analysis/interlayer.rs` 完成

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{path_strings, potcar_map, write_readme, write_script};
use crate::builders::build_graphite;
use crate::error::Result;
use crate::vasp::{CalcType, TagSet, VaspInputSet};

/// 一种色散修正方案
struct Variant {
    key: &'static str,
    dir: &'static str,
    calc_type: CalcType,
    ivdw: Option<i64>,
    label: &'static str,
}

const VARIANTS: [Variant; 3] = [
    Variant {
        key: "pbe",
        dir: "pbe_no_vdw",
        calc_type: CalcType::Relax,
        ivdw: None,
        label: "none",
    },
    Variant {
        key: "pbe_d3bj",
        dir: "pbe_d3bj",
        calc_type: CalcType::DftD3,
        ivdw: Some(12),
        label: "DFT-D3(BJ)",
    },
    Variant {
        key: "pbe_d3_zero",
        dir: "pbe_d3zero",
        calc_type: CalcType::DftD3,
        ivdw: Some(11),
        label: "DFT-D3(zero)",
    },
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DftD3Graphite {
    /// 面内晶格常数 (Å)
    pub a: f64,
    /// 层间方向晶格常数 (Å)
    pub c: f64,
    pub output_dir: PathBuf,
}

impl Default for DftD3Graphite {
    fn default() -> Self {
        DftD3Graphite {
            a: 2.464,
            c: 6.711,
            output_dir: PathBuf::from("05_dft_d3_graphite"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct D3Calc {
    pub n_atoms: usize,
    pub output_dir: String,
    pub vdw_correction: String,
    #[serde(rename = "IVDW", skip_serializing_if = "Option::is_none")]
    pub ivdw: Option<i64>,
    pub files: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct D3Summary {
    pub material: String,
    pub initial_c_over_a: f64,
    #[serde(rename = "initial_interlayer_d_A")]
    pub initial_interlayer_d: f64,
    pub calculations: IndexMap<String, D3Calc>,
    pub comparison_script: String,
}

impl DftD3Graphite {
    pub fn setup(&self) -> Result<D3Summary> {
        let graphite = build_graphite(self.a, self.c)?;

        let mut calculations = IndexMap::new();
        for variant in &VARIANTS {
            let mut overrides = TagSet::new();
            overrides.insert("ISIF", 3);
            if let Some(ivdw) = variant.ivdw {
                overrides.insert("IVDW", ivdw);
            }

            let dir = self.output_dir.join(variant.dir);
            let set = VaspInputSet::new(
                &graphite,
                variant.calc_type,
                &overrides,
                50.0,
                potcar_map(&[("C", "C")]),
            );
            let paths = set.write_all(&dir)?;
            calculations.insert(
                variant.key.to_string(),
                D3Calc {
                    n_atoms: graphite.len(),
                    output_dir: dir.display().to_string(),
                    vdw_correction: variant.label.to_string(),
                    ivdw: variant.ivdw,
                    files: path_strings(&paths),
                },
            );
        }

        let script = write_script(&self.output_dir.join("compare_d3.sh"), COMPARISON_SCRIPT)?;
        write_readme(&self.output_dir, README)?;

        Ok(D3Summary {
            material: "graphite".to_string(),
            initial_c_over_a: self.c / self.a,
            initial_interlayer_d: self.c / 2.0,
            calculations,
            comparison_script: script.display().to_string(),
        })
    }
}

const COMPARISON_SCRIPT: &str = r#"#!/bin/bash
# Compare PBE vs PBE-D3 results for graphite.
#
# Reads the relaxed CONTCAR of each run and compares the interlayer
# distances. PBE without vdW correction gives c >> 6.7 A (layers barely
# bound), while D3 recovers the experimental ~3.35 A.

cd "$(dirname "$0")"
dftkit analyze d3 \
    --label "PBE (no vdW)=pbe_no_vdw" \
    --label "PBE-D3(BJ)=pbe_d3bj" \
    --label "PBE-D3(zero)=pbe_d3zero" "$@"
"#;

const README: &str = r#"# DFT-D3 Corrections for Graphite

## Why vdW corrections?
Standard PBE (GGA) **cannot describe van der Waals interactions**.
Graphite layers are held together by London dispersion forces (vdW),
which arise from correlated electron fluctuations.  PBE misses this
physics entirely and predicts:
- Nearly unbound graphite layers (c ~ 8+ A instead of 6.7 A)
- Near-zero interlayer binding energy

## DFT-D3 correction (Grimme et al.)
Adds a semi-empirical pairwise correction to the DFT energy:

    E_DFT-D3 = E_DFT + E_disp

where E_disp = -sum_ij (s6*C6_ij/R^6 + s8*C8_ij/R^8) * f_damp(R)

Two damping schemes:
- **BJ damping** (IVDW=12): Becke-Johnson, recommended for most cases
- **Zero damping** (IVDW=11): Original Grimme, can give overbinding

## VASP settings
```
# Add this single line to INCAR for D3(BJ):
IVDW = 12
```

That's it!  The correction is computed on-the-fly and added to
energy, forces, and stress tensor.

## Other vdW methods in VASP
| IVDW | Method | Description |
|------|--------|-------------|
| 1    | DFT-D2 | Older Grimme, fixed C6 |
| 11   | DFT-D3(zero) | Geometry-dependent C6, zero damping |
| 12   | DFT-D3(BJ) | Geometry-dependent C6, BJ damping |
| 20   | TS    | Tkatchenko-Scheffler, density-dependent |
| 21   | TS+SCS | TS with self-consistent screening |
| 202  | MBD   | Many-body dispersion |

## Expected results
| Property | PBE | PBE-D3(BJ) | Experiment |
|----------|-----|------------|------------|
| c (A) | ~8+ | 6.6-6.8 | 6.711 |
| d_interlayer (A) | ~4+ | 3.3-3.4 | 3.356 |
| Binding energy (meV/atom) | ~0 | 25-30 | 31 +/- 2 |
| a (A) | 2.47 | 2.46 | 2.464 |

## How to run
```bash
cd pbe_no_vdw && mpirun -np 4 vasp_std > vasp.log 2>&1 && cd ..
cd pbe_d3bj && mpirun -np 4 vasp_std > vasp.log 2>&1 && cd ..
cd pbe_d3zero && mpirun -np 4 vasp_std > vasp.log 2>&1 && cd ..
bash compare_d3.sh
```
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_three_variants() {
        let dir = tempfile::tempdir().unwrap();
        let wf = DftD3Graphite {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let summary = wf.setup().unwrap();

        assert_eq!(summary.material, "graphite");
        assert!((summary.initial_c_over_a - 6.711 / 2.464).abs() < 1e-12);
        assert!((summary.initial_interlayer_d - 3.3555).abs() < 1e-12);

        let keys: Vec<&String> = summary.calculations.keys().collect();
        assert_eq!(keys, ["pbe", "pbe_d3bj", "pbe_d3_zero"]);
        assert_eq!(summary.calculations["pbe"].n_atoms, 4);

        let plain = fs::read_to_string(dir.path().join("pbe_no_vdw/INCAR")).unwrap();
        assert!(!plain.contains("IVDW"));
        assert!(plain.contains("  ISIF = 3"));

        let bj = fs::read_to_string(dir.path().join("pbe_d3bj/INCAR")).unwrap();
        assert_eq!(bj.matches("IVDW =").count(), 1);
        assert!(bj.contains("  IVDW = 12"));

        let zero = fs::read_to_string(dir.path().join("pbe_d3zero/INCAR")).unwrap();
        assert!(zero.contains("  IVDW = 11"));
        assert!(!zero.contains("  IVDW = 12"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["calculations"]["pbe_d3_zero"]["IVDW"], 11);
        assert!(json["calculations"]["pbe"].get("IVDW").is_none());
    }
}
