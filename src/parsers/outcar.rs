//! # VASP OUTCAR 解析器
//!
//! 从计算目录的 OUTCAR 中提取能量、力、收敛标志和磁化。每次调用都
//! 重新读取文件，文件更新后再次调用即可得到新值。
//!
//! 物理量缺失返回 `None`；OUTCAR 本身缺失返回 `FileNotFound`，
//! `summary()` 将其转换为带 error 字段的汇总。
//!
//! ## 依赖关系
//! - 被 `commands/parse.rs`, `analysis/`, `batch/` 使用
//! - 使用 `models/calculation.rs`, `parsers/vasprun.rs`

use crate::error::{DftkitError, Result};
use crate::models::OutputSummary;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::vasprun;

const TOTEN_MARKER: &str = "free  energy   TOTEN";
const ENTROPY_MARKER: &str = "energy  without entropy";
const SIGMA0_MARKER: &str = "energy(sigma->0) =";
const FORCE_MARKER: &str = "TOTAL-FORCE";
const CONVERGED_MARKER: &str = "reached required accuracy";
const ELECTRON_MARKER: &str = "number of electron";
const MAGNETIZATION_MARKER: &str = "magnetization";

/// 计算目录的输出解析器
#[derive(Debug, Clone)]
pub struct OutputParser {
    directory: PathBuf,
}

impl OutputParser {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        OutputParser {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn outcar_path(&self) -> PathBuf {
        self.directory.join("OUTCAR")
    }

    fn read_outcar(&self) -> Result<String> {
        let path = self.outcar_path();
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DftkitError::FileNotFound {
                name: "OUTCAR".to_string(),
                dir: self.directory.display().to_string(),
            },
            _ => DftkitError::read(&path, e),
        })
    }

    fn parse_error(&self, reason: impl Into<String>) -> DftkitError {
        DftkitError::ParseError {
            format: "outcar".to_string(),
            path: self.outcar_path().display().to_string(),
            reason: reason.into(),
        }
    }

    /// 最终自由能 TOTEN (eV)
    ///
    /// `free  energy   TOTEN  =  -34.123456 eV`，取倒数第二个字段。
    pub fn get_total_energy(&self) -> Result<Option<f64>> {
        let content = self.read_outcar()?;
        let Some(line) = content.lines().rev().find(|l| l.contains(TOTEN_MARKER)) else {
            return Ok(None);
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let value = tokens
            .len()
            .checked_sub(2)
            .and_then(|i| tokens[i].parse::<f64>().ok())
            .ok_or_else(|| self.parse_error(format!("bad TOTEN line: {}", line.trim())))?;
        Ok(Some(value))
    }

    /// energy(sigma->0)，绝缘体的最佳能量估计
    pub fn get_total_energy_sigma0(&self) -> Result<Option<f64>> {
        let content = self.read_outcar()?;
        let Some(line) = content.lines().rev().find(|l| l.contains(ENTROPY_MARKER)) else {
            return Ok(None);
        };
        match line.split_once(SIGMA0_MARKER) {
            Some((_, rest)) => rest
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.parse_error(format!("bad sigma->0 line: {}", line.trim()))),
            None => Ok(None),
        }
    }

    /// 最后一个力块中每个原子的力 (eV/Å)，按原子顺序
    pub fn get_forces(&self) -> Result<Option<Vec<[f64; 3]>>> {
        let content = self.read_outcar()?;
        let lines: Vec<&str> = content.lines().collect();

        // 从末尾向前找最后一个力块的表头
        let Some(header) = lines.iter().rposition(|l| l.contains(FORCE_MARKER)) else {
            return Ok(None);
        };

        let mut forces = Vec::new();
        for line in &lines[header + 1..] {
            if line.contains("---") {
                if forces.is_empty() {
                    continue;
                }
                break;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 6 {
                continue;
            }
            let values: Vec<f64> = parts.iter().filter_map(|s| s.parse().ok()).collect();
            if values.len() != 6 {
                return Err(self.parse_error(format!("bad force row: {}", line.trim())));
            }
            forces.push([values[3], values[4], values[5]]);
        }

        Ok(if forces.is_empty() { None } else { Some(forces) })
    }

    /// 离子弛豫是否收敛
    pub fn is_converged(&self) -> Result<bool> {
        Ok(self.read_outcar()?.contains(CONVERGED_MARKER))
    }

    /// 总磁化 (μB)
    pub fn get_magnetization(&self) -> Result<Option<f64>> {
        let content = self.read_outcar()?;
        let Some(line) = content
            .lines()
            .rev()
            .find(|l| l.contains(ELECTRON_MARKER) && l.contains(MAGNETIZATION_MARKER))
        else {
            return Ok(None);
        };
        match line.split_once(MAGNETIZATION_MARKER) {
            Some((_, rest)) => rest
                .split_whitespace()
                .next()
                .and_then(|s| s.parse::<f64>().ok())
                .map(Some)
                .ok_or_else(|| self.parse_error(format!("bad magnetization line: {}", line.trim()))),
            None => Ok(None),
        }
    }

    /// 带隙 (eV)，来自 vasprun.xml
    ///
    /// 文件缺失或内容无法解析时返回 `Ok(None)`；其他 I/O 错误向上传递。
    pub fn get_band_gap(&self) -> Result<Option<f64>> {
        vasprun::band_gap_from_file(&self.directory.join("vasprun.xml"))
    }

    /// 汇总全部物理量
    ///
    /// OUTCAR 缺失时只返回目录和 `error = "OUTCAR not found"`。
    pub fn summary(&self) -> Result<OutputSummary> {
        let dir = self.directory.display().to_string();
        match self.collect(&dir) {
            Err(DftkitError::FileNotFound { .. }) => {
                log::debug!("no OUTCAR in {}", dir);
                Ok(OutputSummary::missing(dir, "OUTCAR not found"))
            }
            other => other,
        }
    }

    fn collect(&self, dir: &str) -> Result<OutputSummary> {
        let mut summary = OutputSummary::new(dir);
        summary.total_energy = self.get_total_energy()?;
        summary.energy_sigma0 = self.get_total_energy_sigma0()?;
        summary.converged = Some(self.is_converged()?);
        summary.magnetization = self.get_magnetization()?;
        if let Some(forces) = self.get_forces()? {
            summary.max_force = forces
                .iter()
                .flat_map(|f| f.iter().map(|x| x.abs()))
                .reduce(f64::max);
            summary.n_atoms = Some(forces.len());
        }
        summary.band_gap = self.get_band_gap()?;
        Ok(summary)
    }
}
