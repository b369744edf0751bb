//! # FORCE_SETS 汇总
//!
//! 按 `displacements.json` 的顺序读取每个 `disp-NNN/OUTCAR` 的力，
//! 写出 phonopy 格式的 FORCE_SETS：
//!
//! ```text
//! natom
//! n_displacements
//!
//! atom_number
//! dx dy dz
//! fx fy fz      (natom 行)
//! ```
//!
//! 目录缺失或力的行数不对时跳过并记录警告。

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{DftkitError, Result};
use crate::parsers::OutputParser;
use crate::vasp::input_set::write_text;
use crate::workflows::phonon::DisplacementDataset;

#[derive(Debug, Clone, Serialize)]
pub struct ForceSetsReport {
    pub path: PathBuf,
    pub n_collected: usize,
    pub n_expected: usize,
    /// 被跳过的目录及原因
    pub skipped: Vec<(String, String)>,
}

/// 汇总力并写出 `FORCE_SETS`
///
/// 一个位移都没有收集到时返回错误，不写文件。
pub fn collect_force_sets(phonon_dir: &Path) -> Result<ForceSetsReport> {
    let dataset = DisplacementDataset::read(phonon_dir)?;

    let mut blocks = Vec::new();
    let mut skipped = Vec::new();

    for disp in &dataset.first_atoms {
        let parser = OutputParser::new(phonon_dir.join(&disp.directory));
        let forces = match parser.get_forces() {
            Ok(Some(f)) => f,
            Ok(None) => {
                log::warn!("{}: no forces in OUTCAR, skipping", disp.directory);
                skipped.push((disp.directory.clone(), "no forces in OUTCAR".to_string()));
                continue;
            }
            Err(DftkitError::FileNotFound { .. }) => {
                log::warn!("{}: OUTCAR not found, skipping", disp.directory);
                skipped.push((disp.directory.clone(), "OUTCAR not found".to_string()));
                continue;
            }
            Err(e) => return Err(e),
        };

        if forces.len() != dataset.natom {
            log::warn!(
                "{}: {} force rows, expected {}; skipping",
                disp.directory,
                forces.len(),
                dataset.natom
            );
            skipped.push((
                disp.directory.clone(),
                format!("{} force rows, expected {}", forces.len(), dataset.natom),
            ));
            continue;
        }

        let mut block = format!("{:5}\n", disp.number);
        block.push_str(&vector_line(disp.displacement));
        for f in &forces {
            block.push_str(&vector_line(*f));
        }
        blocks.push(block);
    }

    if blocks.is_empty() {
        return Err(DftkitError::Other(format!(
            "no displacement forces found under {}",
            phonon_dir.display()
        )));
    }

    let mut content = format!("{:5}\n{:5}\n", dataset.natom, blocks.len());
    for block in &blocks {
        content.push('\n');
        content.push_str(block);
    }

    let path = write_text(&phonon_dir.join("FORCE_SETS"), &content)?;
    log::info!(
        "wrote {} of {} force sets to {}",
        blocks.len(),
        dataset.first_atoms.len(),
        path.display()
    );

    Ok(ForceSetsReport {
        path,
        n_collected: blocks.len(),
        n_expected: dataset.first_atoms.len(),
        skipped,
    })
}

fn vector_line(v: [f64; 3]) -> String {
    format!("  {:20.16}  {:20.16}  {:20.16}\n", v[0], v[1], v[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::phonon::Displacement;
    use std::fs;

    fn outcar_with_forces(n: usize, fx: f64) -> String {
        let mut s = String::from(
            " POSITION                                       TOTAL-FORCE (eV/Angst)\n \
             -----------------------------------------------------------------------------------\n",
        );
        for i in 0..n {
            s.push_str(&format!(
                "      0.00000      0.00000      {:.5}        {:.6}      0.000000      0.000000\n",
                i as f64,
                if i == 0 { fx } else { -fx / (n - 1) as f64 }
            ));
        }
        s.push_str(" -----------------------------------------------------------------------------------\n");
        s
    }

    fn dataset(root: &Path, natom: usize, n_disp: usize) {
        let dataset = DisplacementDataset {
            natom,
            supercell_matrix: [[1, 0, 0], [0, 1, 0], [0, 0, 2]],
            displacement: 0.01,
            first_atoms: (0..n_disp)
                .map(|i| Displacement {
                    number: 1,
                    displacement: [0.01, 0.0, 0.0],
                    directory: format!("disp-{:03}", i + 1),
                })
                .collect(),
        };
        fs::write(
            root.join("displacements.json"),
            serde_json::to_string_pretty(&dataset).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_force_sets_layout() {
        let root = tempfile::tempdir().unwrap();
        dataset(root.path(), 3, 2);
        for (i, fx) in [(1, -0.2), (2, -0.4)] {
            let dir = root.path().join(format!("disp-{:03}", i));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("OUTCAR"), outcar_with_forces(3, fx)).unwrap();
        }

        let report = collect_force_sets(root.path()).unwrap();
        assert_eq!(report.n_collected, 2);
        assert!(report.skipped.is_empty());

        let text = fs::read_to_string(&report.path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0].trim(), "3");
        assert_eq!(lines[1].trim(), "2");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3].trim(), "1");
        let disp: Vec<f64> = lines[4].split_whitespace().map(|x| x.parse().unwrap()).collect();
        assert_eq!(disp, vec![0.01, 0.0, 0.0]);
        let f0: Vec<f64> = lines[5].split_whitespace().map(|x| x.parse().unwrap()).collect();
        assert!((f0[0] + 0.2).abs() < 1e-12);
        // 每块: 序号 + 位移 + 3 行力，块之间空行
        assert_eq!(lines.len(), 2 + 2 * (1 + 1 + 1 + 3));
        assert_eq!(lines[8], "");
    }

    #[test]
    fn test_missing_directory_skipped() {
        let root = tempfile::tempdir().unwrap();
        dataset(root.path(), 3, 3);
        let dir = root.path().join("disp-002");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("OUTCAR"), outcar_with_forces(3, 0.1)).unwrap();
        // 原子数不符
        let bad = root.path().join("disp-003");
        fs::create_dir_all(&bad).unwrap();
        fs::write(bad.join("OUTCAR"), outcar_with_forces(2, 0.1)).unwrap();

        let report = collect_force_sets(root.path()).unwrap();
        assert_eq!(report.n_collected, 1);
        assert_eq!(report.n_expected, 3);
        let skipped: Vec<&str> = report.skipped.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(skipped, ["disp-001", "disp-003"]);
    }

    #[test]
    fn test_nothing_collected() {
        let root = tempfile::tempdir().unwrap();
        dataset(root.path(), 3, 1);
        assert!(collect_force_sets(root.path()).is_err());
        assert!(!root.path().join("FORCE_SETS").exists());
    }

    #[test]
    fn test_missing_dataset() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            collect_force_sets(root.path()),
            Err(DftkitError::FileNotFound { .. })
        ));
    }
}
