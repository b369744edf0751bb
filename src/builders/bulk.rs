//! # 体相晶体构建器
//!
//! 钙钛矿和岩盐结构直接写出分数坐标；刚玉和石墨由 Wyckoff 位置经
//! 空间群展开得到。
//!
//! ## 依赖关系
//! - 使用 `builders/spacegroup.rs`
//! - 被 `workflows/`, `server/`, `commands/build.rs` 使用

use super::spacegroup::{from_spacegroup, is_element_symbol};
use crate::error::{DftkitError, Result};
use crate::models::{Atom, Crystal, Lattice};

/// 构建立方钙钛矿 ABO3 (Pm-3m, #221)，5 个原子
///
/// 顺序：A 角顶，B 体心，三个 O 面心。
pub fn build_perovskite(a_site: &str, b_site: &str, a: f64) -> Crystal {
    let atoms = vec![
        Atom::new(a_site, [0.0, 0.0, 0.0]),
        Atom::new(b_site, [0.5, 0.5, 0.5]),
        Atom::new("O", [0.5, 0.5, 0.0]),
        Atom::new("O", [0.5, 0.0, 0.5]),
        Atom::new("O", [0.0, 0.5, 0.5]),
    ];
    Crystal::new(
        format!("{}{}O3", a_site, b_site),
        Lattice::cubic(a),
        atoms,
    )
}

/// 构建岩盐结构 (Fm-3m, #225) 的 2 原子原胞
///
/// 晶格为 fcc 原胞 a/2·[[0,1,1],[1,0,1],[1,1,0]]，`a` 是立方晶格常数。
pub fn build_rocksalt(cation: &str, anion: &str, a: f64) -> Crystal {
    let h = a / 2.0;
    let lattice = Lattice::from_vectors([[0.0, h, h], [h, 0.0, h], [h, h, 0.0]]);
    let atoms = vec![
        Atom::new(cation, [0.0, 0.0, 0.0]),
        Atom::new(anion, [0.5, 0.5, 0.5]),
    ];
    Crystal::new(format!("{}{}", cation, anion), lattice, atoms)
}

/// 构建金刚石结构原胞 (Fd-3m)，2 个原子，取 fcc 原胞基矢
pub fn build_diamond(element: &str, a: f64) -> Crystal {
    let h = a / 2.0;
    let lattice = Lattice::from_vectors([[0.0, h, h], [h, 0.0, h], [h, h, 0.0]]);
    let atoms = vec![
        Atom::new(element, [0.0, 0.0, 0.0]),
        Atom::new(element, [0.25, 0.25, 0.25]),
    ];
    Crystal::new(element.to_string(), lattice, atoms)
}

/// 构建刚玉结构 M2O3 (R-3c, #167) 的六方惯用胞，30 个原子
///
/// 金属 12c (0, 0, 0.3553)，氧 18e (0.3059, 0, 1/4)，取 Fe2O3 的内坐标。
pub fn build_corundum(metal: &str, a: f64, c: f64) -> Result<Crystal> {
    let mut crystal = from_spacegroup(
        167,
        Lattice::hexagonal(a, c),
        &[metal, "O"],
        &[[0.0, 0.0, 0.3553], [0.3059, 0.0, 0.25]],
    )?;
    crystal.name = format!("{}2O3", metal);
    Ok(crystal)
}

/// 构建 AB 堆垛石墨 (P6_3/mmc, #194)，4 个原子
pub fn build_graphite(a: f64, c: f64) -> Result<Crystal> {
    let mut crystal = from_spacegroup(
        194,
        Lattice::hexagonal(a, c),
        &["C", "C"],
        &[[0.0, 0.0, 0.25], [1.0 / 3.0, 2.0 / 3.0, 0.25]],
    )?;
    crystal.name = "graphite".to_string();
    Ok(crystal)
}

/// 校验元素符号与晶格常数，供 CLI/API 在构建前调用
pub fn validate_inputs(symbols: &[&str], constants: &[f64]) -> Result<()> {
    if let Some(bad) = symbols.iter().find(|s| !is_element_symbol(s)) {
        return Err(DftkitError::InvalidSpeciesOrGeometry(format!(
            "'{}' is not an element symbol",
            bad
        )));
    }
    if let Some(bad) = constants.iter().find(|&&x| !(x.is_finite() && x > 0.0)) {
        return Err(DftkitError::InvalidSpeciesOrGeometry(format!(
            "lattice constant must be positive, got {}",
            bad
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_diagonal(lattice: &Lattice, a: f64) -> bool {
        (0..3).all(|i| {
            (0..3).all(|j| {
                let expected = if i == j { a } else { 0.0 };
                (lattice.matrix[i][j] - expected).abs() < 1e-12
            })
        })
    }

    #[test]
    fn test_perovskite() {
        let crystal = build_perovskite("Sr", "Ti", 3.905);
        assert_eq!(crystal.len(), 5);
        assert_eq!(crystal.formula(), "O3SrTi");
        assert!(is_diagonal(&crystal.lattice, 3.905));
        assert_eq!(crystal.species_order(), vec!["Sr", "Ti", "O"]);
    }

    #[test]
    fn test_perovskite_other_cations() {
        for (a, b) in [("Ba", "Zr"), ("Pb", "Ti"), ("Sr", "Nb")] {
            let crystal = build_perovskite(a, b, 4.0);
            assert_eq!(crystal.len(), 5);
            assert!(is_diagonal(&crystal.lattice, 4.0));
        }
    }

    #[test]
    fn test_rocksalt_primitive_cell() {
        let crystal = build_rocksalt("Ni", "O", 4.177);
        assert_eq!(crystal.len(), 2);
        assert_eq!(crystal.formula(), "NiO");
        // fcc 原胞体积 = a^3 / 4
        let expected = 4.177_f64.powi(3) / 4.0;
        assert!((crystal.lattice.volume() - expected).abs() < 1e-9);
        let cart = crystal.cartesian_positions();
        for x in cart[1] {
            assert!((x - 4.177 / 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_diamond_si() {
        let crystal = build_diamond("Si", 5.43);
        assert_eq!(crystal.len(), 2);
        assert_eq!(crystal.formula(), "Si2");
        let expected = 5.43_f64.powi(3) / 4.0;
        assert!((crystal.lattice.volume() - expected).abs() < 1e-9);
        let cart = crystal.cartesian_positions();
        for x in cart[1] {
            assert!((x - 5.43 / 4.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_corundum() {
        let crystal = build_corundum("Fe", 5.038, 13.772).unwrap();
        assert_eq!(crystal.len(), 30);
        assert_eq!(crystal.formula(), "Fe12O18");
        assert_eq!(crystal.species_order(), vec!["Fe", "O"]);
        assert!(crystal.species_contiguous());
    }

    #[test]
    fn test_graphite() {
        let crystal = build_graphite(2.464, 6.711).unwrap();
        assert_eq!(crystal.len(), 4);
        assert_eq!(crystal.formula(), "C4");
        let (a, _, c, _, _, gamma) = crystal.lattice.parameters();
        assert!((a - 2.464).abs() < 1e-9);
        assert!((c - 6.711).abs() < 1e-9);
        assert!((gamma - 120.0).abs() < 1e-9);
        // 两层碳分别位于 z = 1/4 和 3/4
        let mut zs: Vec<f64> = crystal.atoms.iter().map(|a| a.position[2]).collect();
        zs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((zs[0] - 0.25).abs() < 1e-9);
        assert!((zs[3] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_validate_inputs() {
        assert!(validate_inputs(&["Sr", "Ti"], &[3.905]).is_ok());
        assert!(validate_inputs(&["sr"], &[3.905]).is_err());
        assert!(validate_inputs(&["Sr"], &[-1.0]).is_err());
    }
}
