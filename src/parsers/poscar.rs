//! # VASP POSCAR 格式读写
//!
//! 读取 POSCAR/CONTCAR，写出 VASP 5 格式的 POSCAR。
//!
//! ## POSCAR 格式说明
//! ```text
//! Comment line (formula)
//! 1.0                    # scaling factor
//! a1 a2 a3               # lattice vector a
//! b1 b2 b3               # lattice vector b
//! c1 c2 c3               # lattice vector c
//! Element1 Element2 ...  # element symbols (VASP 5+)
//! n1 n2 ...              # number of atoms per element
//! Selective dynamics     # optional
//! Direct/Cartesian       # coordinate type
//! x1 y1 z1 [T T F]       # atom positions
//! ...
//! ```
//!
//! 写出时严格保持原子顺序：元素行按连续分段写出，同一元素出现在
//! 多个分段时会重复出现。
//!
//! ## 依赖关系
//! - 被 `vasp/input_set.rs`, `analysis/`, `commands/` 使用
//! - 使用 `models/structure.rs`

use crate::error::{DftkitError, Result};
use crate::models::structure::runs;
use crate::models::{Atom, Crystal, Lattice};
use std::fs;
use std::path::Path;

/// 解析 POSCAR/CONTCAR 文件
pub fn parse_poscar_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| DftkitError::read(path, e))?;

    parse_poscar_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

fn parse_error(name: &str, reason: impl Into<String>) -> DftkitError {
    DftkitError::ParseError {
        format: "poscar".to_string(),
        path: name.to_string(),
        reason: reason.into(),
    }
}

/// 解析 T/F 标志
fn parse_flag(s: &str) -> Option<bool> {
    match s.trim_matches('.').to_ascii_uppercase().as_str() {
        "T" | "TRUE" => Some(true),
        "F" | "FALSE" => Some(false),
        _ => None,
    }
}

/// 从字符串内容解析 POSCAR 格式
pub fn parse_poscar_content(content: &str, default_name: &str) -> Result<Crystal> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.len() < 8 {
        return Err(parse_error(default_name, "File too short"));
    }

    // Line 0: Comment/name
    let name = lines[0].trim().to_string();
    let name = if name.is_empty() {
        default_name.to_string()
    } else {
        name
    };

    // Line 1: Scaling factor
    let scale: f64 = lines[1]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1.0);

    // Lines 2-4: Lattice vectors
    let mut matrix = [[0.0; 3]; 3];
    for i in 0..3 {
        let parts: Vec<f64> = lines[2 + i]
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() < 3 {
            return Err(parse_error(
                &name,
                format!("Invalid lattice vector at line {}", 3 + i),
            ));
        }
        matrix[i] = [parts[0] * scale, parts[1] * scale, parts[2] * scale];
    }
    let lattice = Lattice::from_vectors(matrix);

    // Line 5: Element symbols (VASP 5+) or atom counts (VASP 4)
    let line5_parts: Vec<&str> = lines[5].split_whitespace().collect();
    if line5_parts.is_empty() {
        return Err(parse_error(&name, "Missing species/count line"));
    }
    let (elements, counts, atom_line_start) = if line5_parts[0].parse::<i32>().is_ok() {
        // VASP 4: 没有元素行，用占位符号
        let counts: Vec<usize> = line5_parts.iter().filter_map(|s| s.parse().ok()).collect();
        let elements: Vec<String> = (0..counts.len()).map(|i| format!("X{}", i + 1)).collect();
        (elements, counts, 6)
    } else {
        let elements: Vec<String> = line5_parts
            .iter()
            // POTCAR 风格的 "Sr_sv" 或 "Fe/abc" 只保留元素
            .map(|s| s.split(['_', '/']).next().unwrap_or(s).to_string())
            .collect();
        let counts: Vec<usize> = lines[6]
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        (elements, counts, 7)
    };

    if elements.len() != counts.len() {
        return Err(parse_error(
            &name,
            format!(
                "{} species but {} counts",
                elements.len(),
                counts.len()
            ),
        ));
    }

    // Selective dynamics
    let mut coord_line = atom_line_start;
    let selective = lines.len() > coord_line
        && lines[coord_line]
            .trim()
            .to_lowercase()
            .starts_with('s');
    if selective {
        coord_line += 1;
    }

    if lines.len() <= coord_line {
        return Err(parse_error(&name, "Missing coordinate type line"));
    }

    let coord_type = lines[coord_line].trim().to_lowercase();
    let is_cartesian = coord_type.starts_with('c') || coord_type.starts_with('k');

    let total: usize = counts.iter().sum();
    let mut atoms: Vec<Atom> = Vec::with_capacity(total);
    let mut line_idx = coord_line + 1;

    for (elem, &count) in elements.iter().zip(counts.iter()) {
        for _ in 0..count {
            let line = lines.get(line_idx).ok_or_else(|| {
                parse_error(
                    &name,
                    format!("Expected {} atoms, found {}", total, atoms.len()),
                )
            })?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let parts: Vec<f64> = tokens
                .iter()
                .take(3)
                .filter_map(|s| s.parse().ok())
                .collect();
            if parts.len() < 3 {
                return Err(parse_error(
                    &name,
                    format!("Invalid coordinates at line {}", line_idx + 1),
                ));
            }

            let position = if is_cartesian {
                lattice.to_fractional([parts[0] * scale, parts[1] * scale, parts[2] * scale])
            } else {
                [parts[0], parts[1], parts[2]]
            };
            let mut atom = Atom::new(elem.clone(), position);

            if selective {
                let flags: Vec<bool> = tokens.iter().skip(3).take(3).filter_map(|s| parse_flag(s)).collect();
                if flags.len() == 3 {
                    atom.selective_dynamics = Some([flags[0], flags[1], flags[2]]);
                }
            }

            atoms.push(atom);
            line_idx += 1;
        }
    }

    let mut crystal = Crystal::new(name, lattice, atoms);
    crystal.source_format = Some("poscar".to_string());

    Ok(crystal)
}

fn flag(b: bool) -> &'static str {
    if b {
        "T"
    } else {
        "F"
    }
}

/// 将 Crystal 转换为 POSCAR 格式字符串
///
/// 注释行为化学式；任一原子带选择性动力学标志时写出
/// `Selective dynamics`，未设置标志的原子写 `T T T`。
pub fn to_poscar_string(crystal: &Crystal) -> String {
    let segments = runs(&crystal.atoms);
    let selective = crystal.has_selective_dynamics();

    let mut result = String::new();

    result.push_str(&format!("{}\n", crystal.formula()));
    result.push_str("1.0\n");

    for row in &crystal.lattice.matrix {
        result.push_str(&format!(
            "  {:16.10}  {:16.10}  {:16.10}\n",
            row[0], row[1], row[2]
        ));
    }

    let symbols: Vec<&str> = segments.iter().map(|(el, _)| el.as_str()).collect();
    let counts: Vec<String> = segments.iter().map(|(_, n)| n.to_string()).collect();
    result.push_str(&format!("   {}\n", symbols.join("   ")));
    result.push_str(&format!("   {}\n", counts.join("   ")));

    if selective {
        result.push_str("Selective dynamics\n");
    }
    result.push_str("Direct\n");

    for atom in &crystal.atoms {
        let pos = atom.position;
        result.push_str(&format!(
            "  {:16.10}  {:16.10}  {:16.10}",
            pos[0], pos[1], pos[2]
        ));
        if selective {
            let [x, y, z] = atom.selective_dynamics.unwrap_or([true; 3]);
            result.push_str(&format!("   {} {} {}", flag(x), flag(y), flag(z)));
        }
        result.push('\n');
    }

    result
}

/// 写出 POSCAR 文件
pub fn write_poscar_file(crystal: &Crystal, path: &Path) -> Result<()> {
    fs::write(path, to_poscar_string(crystal)).map_err(|e| DftkitError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_poscar_vasp5() {
        let content = r#"NaCl
1.0
5.64 0.0 0.0
0.0 5.64 0.0
0.0 0.0 5.64
Na Cl
4 4
Direct
0.0 0.0 0.0
0.5 0.5 0.0
0.5 0.0 0.5
0.0 0.5 0.5
0.5 0.0 0.0
0.0 0.5 0.0
0.0 0.0 0.5
0.5 0.5 0.5
"#;
        let crystal = parse_poscar_content(content, "NaCl").unwrap();
        assert_eq!(crystal.name, "NaCl");
        assert_eq!(crystal.atoms.len(), 8);
        assert_eq!(crystal.symbols()[3], "Na");
        assert_eq!(crystal.symbols()[4], "Cl");
    }

    #[test]
    fn test_parse_poscar_with_scale_and_cartesian() {
        let content = r#"Si
2.0
2.0 0.0 0.0
0.0 2.0 0.0
0.0 0.0 2.0
Si
2
Cartesian
0.0 0.0 0.0
1.0 1.0 1.0
"#;
        let crystal = parse_poscar_content(content, "Si").unwrap();
        let (a, _, _, _, _, _) = crystal.lattice.parameters();
        assert!((a - 4.0).abs() < 1e-9);
        // 笛卡尔坐标同样乘以缩放因子
        assert!((crystal.atoms[1].position[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_write_preserves_site_order() {
        let atoms = vec![
            Atom::new("Ni", [0.0, 0.0, 0.0]),
            Atom::new("O", [0.5, 0.5, 0.5]),
            Atom::new("Ni", [0.5, 0.0, 0.0]),
            Atom::new("O", [0.0, 0.5, 0.5]),
        ];
        let crystal = Crystal::new("NiO", Lattice::cubic(4.177), atoms);
        let text = to_poscar_string(&crystal);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "NiO");
        assert_eq!(lines[5].split_whitespace().collect::<Vec<_>>(), ["Ni", "O", "Ni", "O"]);
        assert_eq!(lines[6].split_whitespace().collect::<Vec<_>>(), ["1", "1", "1", "1"]);

        let parsed = parse_poscar_content(&text, "x").unwrap();
        assert_eq!(parsed.symbols(), crystal.symbols());
    }

    #[test]
    fn test_selective_dynamics_round_trip() {
        let mut atoms = vec![
            Atom::new("Fe", [0.0, 0.0, 0.0]),
            Atom::new("Fe", [0.5, 0.5, 0.5]),
        ];
        atoms[0].selective_dynamics = Some([false, false, false]);
        let crystal = Crystal::new("Fe", Lattice::cubic(2.87), atoms);

        let text = to_poscar_string(&crystal);
        assert!(text.contains("Selective dynamics\nDirect\n"));

        let parsed = parse_poscar_content(&text, "Fe").unwrap();
        assert_eq!(parsed.atoms[0].selective_dynamics, Some([false; 3]));
        assert_eq!(parsed.atoms[1].selective_dynamics, Some([true; 3]));
    }

    #[test]
    fn test_no_selective_line_without_flags() {
        let crystal = Crystal::new(
            "Fe",
            Lattice::cubic(2.87),
            vec![Atom::new("Fe", [0.0, 0.0, 0.0])],
        );
        assert!(!to_poscar_string(&crystal).contains("Selective"));
    }

    #[test]
    fn test_potcar_style_symbols_and_short_file() {
        let content = "x\n1.0\n3 0 0\n0 3 0\n0 0 3\nSr_sv Ti_pv\n1 1\nDirect\n0 0 0\n0.5 0.5 0.5\n";
        let crystal = parse_poscar_content(content, "x").unwrap();
        assert_eq!(crystal.symbols(), vec!["Sr", "Ti"]);

        assert!(parse_poscar_content("x\n1.0\n", "x").is_err());
        let truncated = "x\n1.0\n3 0 0\n0 3 0\n0 0 3\nSr\n2\nDirect\n0 0 0\n";
        assert!(parse_poscar_content(truncated, "x").is_err());
    }
}
