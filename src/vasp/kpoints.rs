//! # KPOINTS 生成
//!
//! Gamma 中心的自动网格：k_i = max(1, ceil(density · |2π·b_i|))。
//! density 越大网格越密。

use crate::models::Lattice;

/// 由 k 点密度 (Å) 计算网格
pub fn auto_kpoints(lattice: &Lattice, density: f64) -> [usize; 3] {
    lattice.reciprocal_lengths().map(|len| {
        let k = (density * len).ceil();
        if k.is_finite() && k >= 1.0 {
            k as usize
        } else {
            1
        }
    })
}

/// KPOINTS 文件内容
pub fn kpoints_string(mesh: [usize; 3]) -> String {
    [
        "Automatic mesh".to_string(),
        "0".to_string(),
        "Gamma".to_string(),
        format!("  {}  {}  {}", mesh[0], mesh[1], mesh[2]),
        "  0  0  0".to_string(),
    ]
    .join("\n")
        + "\n"
}
