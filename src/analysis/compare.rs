//! # 多个计算的对比
//!
//! 逐个目录读取能量、带隙、磁化和收敛标志，用于 PBE 与 PBE+U 等对比。

use serde::Serialize;
use std::path::PathBuf;

use crate::error::Result;
use crate::models::OutputSummary;
use crate::parsers::OutputParser;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunComparison {
    pub label: String,
    #[serde(flatten)]
    pub summary: OutputSummary,
}

/// 按给定顺序汇总每个 (标签, 目录)
pub fn compare_runs(runs: &[(String, PathBuf)]) -> Result<Vec<RunComparison>> {
    runs.iter()
        .map(|(label, dir)| {
            let summary = OutputParser::new(dir).summary()?;
            Ok(RunComparison {
                label: label.clone(),
                summary,
            })
        })
        .collect()
}
