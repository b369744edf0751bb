//! # vasprun.xml 带隙提取
//!
//! 只读取顶层 `<eigenvalues>` 块（跳过 `<projected>` 内的同名块），
//! 每行 `<r> 能量 占据数 </r>`。占据数大于 1e-8 视为占据态：
//! 带隙 = max(0, CBM - VBM)。
//!
//! 这是尽力而为的解析：文件缺失、格式不符或数据不完整都返回
//! `Ok(None)`，只有文件存在但读取失败时返回错误。

use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use once_cell::sync::Lazy;

use crate::error::{DftkitError, Result};

const OCCUPANCY_TOL: f64 = 1e-8;

static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<r>\s*(\S+)\s+(\S+)\s*</r>").expect("valid eigenvalue row pattern")
});

/// 从文件读取带隙
pub fn band_gap_from_file(path: &Path) -> Result<Option<f64>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        // 非 UTF-8 视为格式错误
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            log::warn!("{} is not valid UTF-8; band gap skipped", path.display());
            return Ok(None);
        }
        Err(e) => return Err(DftkitError::read(path, e)),
    };

    let gap = band_gap(&content);
    if gap.is_none() {
        log::debug!("no band gap could be derived from {}", path.display());
    }
    Ok(gap)
}

/// 从 vasprun.xml 内容计算带隙
pub fn band_gap(content: &str) -> Option<f64> {
    let block = eigenvalue_block(content)?;

    let mut vbm = f64::NEG_INFINITY;
    let mut cbm = f64::INFINITY;
    let mut rows = 0usize;

    for caps in ROW.captures_iter(block) {
        let energy: f64 = caps[1].parse().ok()?;
        let occ: f64 = caps[2].parse().ok()?;
        if occ > OCCUPANCY_TOL {
            vbm = vbm.max(energy);
        } else {
            cbm = cbm.min(energy);
        }
        rows += 1;
    }

    if rows == 0 || !vbm.is_finite() || !cbm.is_finite() {
        return None;
    }
    Some((cbm - vbm).max(0.0))
}

/// 第一个不在 `<projected>` 内的 `<eigenvalues>` 块
fn eigenvalue_block(content: &str) -> Option<&str> {
    let mut offset = 0;
    let mut projected_depth = 0i32;
    let mut start: Option<usize> = None;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("<projected") {
            projected_depth += 1;
        } else if trimmed.starts_with("</projected>") {
            projected_depth -= 1;
        } else if projected_depth == 0 {
            if start.is_none() && trimmed.starts_with("<eigenvalues") {
                start = Some(offset + line.len());
            } else if trimmed.starts_with("</eigenvalues>") {
                if let Some(s) = start {
                    return Some(&content[s..offset]);
                }
            }
        }
        offset += line.len();
    }
    None
}
