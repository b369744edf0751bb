//! # 石墨层间距对比
//!
//! 读取每个计算的 CONTCAR，报告 c、层间距 c/2（AB 堆垛）和 c/a。
//! 计算尚未运行（没有 CONTCAR 或为空文件）时该行只有标签。

use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::parsers::parse_poscar_file;

/// 石墨实验晶格常数 (Å)
pub const EXPERIMENT_A: f64 = 2.464;
pub const EXPERIMENT_C: f64 = 6.711;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterlayerRow {
    pub label: String,
    #[serde(rename = "c_A")]
    pub c: Option<f64>,
    #[serde(rename = "d_inter_A")]
    pub d_inter: Option<f64>,
    pub c_over_a: Option<f64>,
}

impl InterlayerRow {
    fn from_lattice(label: &str, a: f64, c: f64) -> Self {
        InterlayerRow {
            label: label.to_string(),
            c: Some(c),
            d_inter: Some(c / 2.0),
            c_over_a: Some(c / a),
        }
    }

    fn not_run(label: &str) -> Self {
        InterlayerRow {
            label: label.to_string(),
            c: None,
            d_inter: None,
            c_over_a: None,
        }
    }

    /// 实验参考行
    pub fn experiment() -> Self {
        Self::from_lattice("Experiment", EXPERIMENT_A, EXPERIMENT_C)
    }

    pub fn has_result(&self) -> bool {
        self.c.is_some()
    }
}

/// 逐个目录读取弛豫后的晶格
pub fn compare_interlayer(runs: &[(String, PathBuf)]) -> Result<Vec<InterlayerRow>> {
    let mut rows = Vec::with_capacity(runs.len());
    for (label, dir) in runs {
        let contcar = dir.join("CONTCAR");
        let written = fs::metadata(&contcar).map(|m| m.len() > 0).unwrap_or(false);
        if !written {
            log::debug!("{} has no CONTCAR yet", dir.display());
            rows.push(InterlayerRow::not_run(label));
            continue;
        }
        let crystal = parse_poscar_file(&contcar)?;
        let (a, _, c, _, _, _) = crystal.lattice.parameters();
        rows.push(InterlayerRow::from_lattice(label, a, c));
    }
    Ok(rows)
}
