//! # 表面 slab 工作流
//!
//! 从体相切出表面 slab，固定底部若干原子层，只弛豫离子并加偶极修正。
//!
//! ## 依赖关系
//! - 使用 `builders/slab.rs`, `vasp/input_set.rs`

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::{path_strings, write_readme};
use crate::builders::{build_perovskite, build_surface_slab};
use crate::error::Result;
use crate::models::Crystal;
use crate::vasp::{CalcType, TagSet, VaspInputSet};

/// 层高取整精度 (Å)
const LAYER_ROUNDING: f64 = 0.1;
/// 相邻层最小间距 (Å)
const LAYER_GAP: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSlabWorkflow {
    pub bulk: Crystal,
    pub miller_index: [i32; 3],
    /// 最小 slab 厚度 (Å)
    pub min_slab_size: f64,
    /// 最小真空层厚度 (Å)
    pub min_vacuum_size: f64,
    /// 固定的底部层数
    pub freeze_bottom: usize,
    pub output_dir: PathBuf,
}

impl Default for SurfaceSlabWorkflow {
    fn default() -> Self {
        SurfaceSlabWorkflow {
            bulk: build_perovskite("Sr", "Ti", 3.905),
            miller_index: [1, 0, 0],
            min_slab_size: 10.0,
            min_vacuum_size: 15.0,
            freeze_bottom: 2,
            output_dir: PathBuf::from("02_surface_slab"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SurfaceSummary {
    pub formula: String,
    pub n_atoms: usize,
    pub miller_index: [i32; 3],
    #[serde(rename = "slab_thickness_A")]
    pub slab_thickness: f64,
    #[serde(rename = "vacuum_thickness_A")]
    pub vacuum_thickness: f64,
    pub output_dir: String,
    pub files: IndexMap<String, String>,
}

impl SurfaceSlabWorkflow {
    /// 切出 slab 并设置选择性动力学
    pub fn structure(&self) -> Result<Crystal> {
        let mut slab = build_surface_slab(
            &self.bulk,
            self.miller_index,
            self.min_slab_size,
            self.min_vacuum_size,
            true,
        )?;
        freeze_bottom_layers(&mut slab, self.freeze_bottom);
        Ok(slab)
    }

    pub fn overrides() -> TagSet {
        let mut tags = TagSet::new();
        tags.insert("ISIF", 2);
        tags.insert("LDIPOL", true);
        tags.insert("IDIPOL", 3);
        tags
    }

    pub fn setup(&self) -> Result<SurfaceSummary> {
        let slab = self.structure()?;
        let set = VaspInputSet::new(&slab, CalcType::Relax, &Self::overrides(), 40.0, HashMap::new());

        let mut paths = set.write_all(&self.output_dir)?;
        let slab = set.crystal();
        paths.insert(
            "README.md".to_string(),
            write_readme(&self.output_dir, &self.readme(slab))?,
        );

        Ok(SurfaceSummary {
            formula: slab.formula(),
            n_atoms: slab.len(),
            miller_index: self.miller_index,
            slab_thickness: slab_thickness(slab),
            vacuum_thickness: vacuum_thickness(slab),
            output_dir: self.output_dir.display().to_string(),
            files: path_strings(&paths),
        })
    }

    fn readme(&self, slab: &Crystal) -> String {
        let hkl: String = self.miller_index.iter().map(|i| i.to_string()).collect();
        format!(
            r#"# Surface Slab Model: ({hkl}) surface

## What this calculation does
Relaxation of a ({hkl}) surface slab cut from the bulk crystal.
Bottom {freeze} layers are frozen (selective dynamics),
top layers are free to relax.

## Structure details
- Formula: {formula}
- {n_atoms} atoms
- Slab thickness: {thickness:.1} A
- Vacuum thickness: {vacuum:.1} A

## Key INCAR settings
- **ISIF = 2**: Relax ions only, fix cell shape and volume
- **LDIPOL = .TRUE.**: Dipole correction for asymmetric slabs
- **IDIPOL = 3**: Dipole correction along z (vacuum direction)

## Selective dynamics
Bottom {freeze} layers have F F F (frozen).
Top layers have T T T (free to relax).

## Surface energy calculation
After running both bulk and slab calculations:

    E_surf = (E_slab - N_slab/N_bulk * E_bulk) / (2 * A)

where A is the surface area and the factor 2 accounts for two surfaces.

## Convergence tests you should do
1. **Vacuum thickness**: Run with 10, 15, 20, 25 A vacuum
2. **Slab thickness**: Run with 3, 5, 7, 9 layers
3. **k-points**: Increase in-plane k-points until E_surf converges
"#,
            freeze = self.freeze_bottom,
            formula = slab.formula(),
            n_atoms = slab.len(),
            thickness = slab_thickness(slab),
            vacuum = vacuum_thickness(slab),
        )
    }
}

/// 固定底部 `n_layers` 层原子 (F F F)，其余 T T T
///
/// 层按笛卡尔 z 聚类：z 取整到 0.1 Å，与当前层相差超过 0.5 Å 时开始
/// 新的一层。层数不超过 `n_layers` 时不做任何修改。
pub fn freeze_bottom_layers(slab: &mut Crystal, n_layers: usize) {
    if n_layers == 0 || slab.is_empty() {
        return;
    }

    let z: Vec<f64> = slab
        .cartesian_positions()
        .iter()
        .map(|p| (p[2] / LAYER_ROUNDING).round() * LAYER_ROUNDING)
        .collect();
    let mut rounded = z.clone();
    rounded.sort_by(|a, b| a.total_cmp(b));
    rounded.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

    let mut boundaries = vec![rounded[0]];
    let mut current = rounded[0];
    for &v in &rounded[1..] {
        if v - current > LAYER_GAP {
            boundaries.push(v);
            current = v;
        }
    }

    if boundaries.len() <= n_layers {
        log::warn!(
            "only {} layers found; cannot freeze {} bottom layers",
            boundaries.len(),
            n_layers
        );
        return;
    }

    // 与层边界比较的是取整后的 z
    let threshold = boundaries[n_layers];
    for (atom, zi) in slab.atoms.iter_mut().zip(&z) {
        let free = *zi >= threshold;
        atom.selective_dynamics = Some([free; 3]);
    }
}

/// 原子 z 坐标跨度 (Å)
pub fn slab_thickness(slab: &Crystal) -> f64 {
    let z: Vec<f64> = slab.cartesian_positions().iter().map(|p| p[2]).collect();
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = z.iter().copied().fold(f64::INFINITY, f64::min);
    if z.is_empty() {
        0.0
    } else {
        max - min
    }
}

/// 晶胞 z 高度减去 slab 厚度
pub fn vacuum_thickness(slab: &Crystal) -> f64 {
    slab.lattice.matrix[2][2] - slab_thickness(slab)
}
