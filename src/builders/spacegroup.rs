//! # 空间群 Wyckoff 位置展开
//!
//! 用空间群的全部对称操作作用于不等价位置，得到晶胞中的全部原子。
//! 对称操作以 Jones 记号书写（如 `-y,x-y,z+1/2`），在运行时解析为
//! 整数旋转矩阵和以 1/12 为单位的平移。
//!
//! 只收录本工具箱需要的空间群：
//! - #167 R-3c（六方轴），刚玉结构
//! - #194 P6_3/mmc，石墨
//!
//! ## 依赖关系
//! - 被 `builders/bulk.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{DftkitError, Result};
use crate::models::{Atom, Crystal, Lattice};

/// 位置去重容差（分数坐标）
const DEDUP_TOL: f64 = 1e-4;

/// 空间群对称操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymOp {
    /// 作用在分数坐标上的整数旋转矩阵
    rot: [[i32; 3]; 3],
    /// 平移，单位 1/12
    trans: [i32; 3],
}

impl SymOp {
    /// 解析 Jones 记号，如 `x-y,-y,-z+1/2`
    pub fn parse(triplet: &str) -> Result<SymOp> {
        let parts: Vec<&str> = triplet.split(',').collect();
        if parts.len() != 3 {
            return Err(DftkitError::InvalidSpeciesOrGeometry(format!(
                "symmetry operation '{}' must have three components",
                triplet
            )));
        }

        let mut rot = [[0; 3]; 3];
        let mut trans = [0; 3];
        for (row, part) in parts.iter().enumerate() {
            let (r, t) = parse_component(part.trim()).ok_or_else(|| {
                DftkitError::InvalidSpeciesOrGeometry(format!(
                    "cannot parse symmetry component '{}' in '{}'",
                    part, triplet
                ))
            })?;
            rot[row] = r;
            trans[row] = t;
        }

        Ok(SymOp { rot, trans })
    }

    /// 作用于分数坐标并折回 [0, 1)
    pub fn apply(&self, frac: [f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for i in 0..3 {
            let v = self.rot[i][0] as f64 * frac[0]
                + self.rot[i][1] as f64 * frac[1]
                + self.rot[i][2] as f64 * frac[2]
                + self.trans[i] as f64 / 12.0;
            out[i] = wrap(v);
        }
        out
    }

    /// 叠加一个纯平移（单位 1/12），用于 R 心格矢
    fn shifted(&self, centering: [i32; 3]) -> SymOp {
        let mut op = self.clone();
        for i in 0..3 {
            op.trans[i] = (op.trans[i] + centering[i]).rem_euclid(12);
        }
        op
    }
}

/// 解析单个分量，返回 (旋转行, 平移/12)
fn parse_component(s: &str) -> Option<([i32; 3], i32)> {
    let mut rot = [0; 3];
    let mut trans = 0;
    let bytes: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
    if bytes.is_empty() {
        return None;
    }

    let mut i = 0;
    while i < bytes.len() {
        let mut sign = 1;
        if bytes[i] == '+' || bytes[i] == '-' {
            if bytes[i] == '-' {
                sign = -1;
            }
            i += 1;
        }
        let c = *bytes.get(i)?;
        match c {
            'x' | 'y' | 'z' => {
                let axis = (c as u8 - b'x') as usize;
                rot[axis] += sign;
                i += 1;
            }
            '0'..='9' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == '/') {
                    i += 1;
                }
                let token: String = bytes[start..i].iter().collect();
                let twelfths = match token.split_once('/') {
                    Some((num, den)) => {
                        let num: i32 = num.parse().ok()?;
                        let den: i32 = den.parse().ok()?;
                        if den == 0 || 12 % den != 0 {
                            return None;
                        }
                        num * (12 / den)
                    }
                    None => token.parse::<i32>().ok()? * 12,
                };
                trans += sign * twelfths;
            }
            _ => return None,
        }
    }

    Some((rot, trans))
}

fn wrap(v: f64) -> f64 {
    let w = v - v.floor();
    // 1 - 1e-12 之类的数折回 0
    if (1.0 - w).abs() < 1e-10 {
        0.0
    } else {
        w
    }
}

/// R-3c (#167) 的点群部分，六方轴
const R3C_OPS: [&str; 12] = [
    "x,y,z",
    "-y,x-y,z",
    "-x+y,-x,z",
    "y,x,-z+1/2",
    "x-y,-y,-z+1/2",
    "-x,-x+y,-z+1/2",
    "-x,-y,-z",
    "y,-x+y,-z",
    "x-y,x,-z",
    "-y,-x,z+1/2",
    "-x+y,y,z+1/2",
    "x,x-y,z+1/2",
];

/// R 心格矢 (0,0,0), (2/3,1/3,1/3), (1/3,2/3,2/3)，单位 1/12
const R_CENTERING: [[i32; 3]; 3] = [[0, 0, 0], [8, 4, 4], [4, 8, 8]];

/// P6_3/mmc (#194)
const P63MMC_OPS: [&str; 24] = [
    "x,y,z",
    "-y,x-y,z",
    "-x+y,-x,z",
    "-x,-y,z+1/2",
    "y,-x+y,z+1/2",
    "x-y,x,z+1/2",
    "y,x,-z",
    "x-y,-y,-z",
    "-x,-x+y,-z",
    "-y,-x,-z+1/2",
    "-x+y,y,-z+1/2",
    "x,x-y,-z+1/2",
    "-x,-y,-z",
    "y,-x+y,-z",
    "x-y,x,-z",
    "x,y,-z+1/2",
    "-y,x-y,-z+1/2",
    "-x+y,-x,-z+1/2",
    "-y,-x,z",
    "-x+y,y,z",
    "x,x-y,z",
    "y,x,z+1/2",
    "x-y,-y,z+1/2",
    "-x,-x+y,z+1/2",
];

/// 返回空间群的全部对称操作（含心格平移）
pub fn operations(number: u32) -> Result<Vec<SymOp>> {
    match number {
        167 => {
            let base: Vec<SymOp> = R3C_OPS.iter().map(|s| SymOp::parse(s)).collect::<Result<_>>()?;
            Ok(R_CENTERING
                .iter()
                .flat_map(|c| base.iter().map(move |op| op.shifted(*c)))
                .collect())
        }
        194 => P63MMC_OPS.iter().map(|s| SymOp::parse(s)).collect(),
        _ => Err(DftkitError::InvalidSpeciesOrGeometry(format!(
            "space group #{} is not tabulated (available: 167, 194)",
            number
        ))),
    }
}

/// 由空间群和不等价位置生成晶体
///
/// 原子顺序：按 `species` 的顺序，每个位置的轨道依次展开。
pub fn from_spacegroup(
    number: u32,
    lattice: Lattice,
    species: &[&str],
    coords: &[[f64; 3]],
) -> Result<Crystal> {
    if species.is_empty() || species.len() != coords.len() {
        return Err(DftkitError::InvalidSpeciesOrGeometry(format!(
            "{} species given for {} Wyckoff positions",
            species.len(),
            coords.len()
        )));
    }
    if let Some(bad) = species.iter().find(|s| !is_element_symbol(s)) {
        return Err(DftkitError::InvalidSpeciesOrGeometry(format!(
            "'{}' is not an element symbol",
            bad
        )));
    }

    let ops = operations(number)?;
    let mut atoms: Vec<Atom> = Vec::new();

    for (el, &site) in species.iter().zip(coords) {
        let mut orbit: Vec<[f64; 3]> = Vec::new();
        for op in &ops {
            let p = op.apply(site);
            if !orbit.iter().any(|q| periodic_close(*q, p)) {
                orbit.push(p);
            }
        }
        // 不同 Wyckoff 位置不应重合
        if orbit
            .iter()
            .any(|p| atoms.iter().any(|a| periodic_close(a.position, *p)))
        {
            return Err(DftkitError::InvalidSpeciesOrGeometry(format!(
                "Wyckoff position {:?} of {} overlaps an existing site",
                site, el
            )));
        }
        atoms.extend(orbit.into_iter().map(|p| Atom::new(*el, p)));
    }

    log::debug!(
        "expanded {} Wyckoff positions in space group #{} to {} sites",
        coords.len(),
        number,
        atoms.len()
    );

    Ok(Crystal::new(format!("sg{}", number), lattice, atoms))
}

/// 考虑周期性的分数坐标比较
fn periodic_close(a: [f64; 3], b: [f64; 3]) -> bool {
    (0..3).all(|i| {
        let d = a[i] - b[i];
        (d - d.round()).abs() < DEDUP_TOL
    })
}

/// 元素符号格式检查：首字母大写，后接至多两个小写字母
pub fn is_element_symbol(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    let rest: Vec<char> = chars.collect();
    rest.len() <= 2 && rest.iter().all(|c| c.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symop() {
        let op = SymOp::parse("-x+y,-x,z+1/2").unwrap();
        assert_eq!(op.rot, [[-1, 1, 0], [-1, 0, 0], [0, 0, 1]]);
        assert_eq!(op.trans, [0, 0, 6]);
    }

    #[test]
    fn test_parse_symop_rejects_garbage() {
        assert!(SymOp::parse("x,y").is_err());
        assert!(SymOp::parse("x,y,w").is_err());
        assert!(SymOp::parse("x,y,z+1/5").is_err());
    }

    #[test]
    fn test_apply_wraps_into_unit_cell() {
        let op = SymOp::parse("-x,-y,-z").unwrap();
        let p = op.apply([0.25, 0.0, 0.75]);
        assert!((p[0] - 0.75).abs() < 1e-12);
        assert!(p[1].abs() < 1e-12);
        assert!((p[2] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_operation_counts() {
        assert_eq!(operations(167).unwrap().len(), 36);
        assert_eq!(operations(194).unwrap().len(), 24);
        assert!(operations(225).is_err());
    }

    #[test]
    fn test_graphite_orbits() {
        let crystal = from_spacegroup(
            194,
            Lattice::hexagonal(2.464, 6.711),
            &["C", "C"],
            &[[0.0, 0.0, 0.25], [1.0 / 3.0, 2.0 / 3.0, 0.25]],
        )
        .unwrap();
        assert_eq!(crystal.len(), 4);
    }

    #[test]
    fn test_corundum_orbits() {
        let crystal = from_spacegroup(
            167,
            Lattice::hexagonal(5.038, 13.772),
            &["Fe", "O"],
            &[[0.0, 0.0, 0.3553], [0.3059, 0.0, 0.25]],
        )
        .unwrap();
        let fe = crystal.atoms.iter().filter(|a| a.element == "Fe").count();
        let o = crystal.atoms.iter().filter(|a| a.element == "O").count();
        assert_eq!(fe, 12);
        assert_eq!(o, 18);
    }

    #[test]
    fn test_mismatched_species_rejected() {
        let err = from_spacegroup(194, Lattice::hexagonal(2.0, 6.0), &["C"], &[]);
        assert!(matches!(err, Err(DftkitError::InvalidSpeciesOrGeometry(_))));
    }

    #[test]
    fn test_invalid_symbol_rejected() {
        let err = from_spacegroup(194, Lattice::hexagonal(2.0, 6.0), &["carbon"], &[[0.0, 0.0, 0.25]]);
        assert!(matches!(err, Err(DftkitError::InvalidSpeciesOrGeometry(_))));
    }
}
