//! # analyze 子命令 CLI 定义
//!
//! 工作流的配套分析，包含多个子命令：
//! - `vacancy`: 空位形成能
//! - `compare`: 多个计算的能量、带隙、磁化对比
//! - `d3`: 石墨层间距对比
//! - `phonon`: 汇总位移计算的力为 FORCE_SETS
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/analyze/` 相应模块

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// 解析 `LABEL=DIR`，标签中可以含 `=`
pub fn parse_label(s: &str) -> Result<(String, PathBuf), String> {
    let (label, dir) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected LABEL=DIR, got '{}'", s))?;
    if label.is_empty() || dir.is_empty() {
        return Err(format!("expected LABEL=DIR, got '{}'", s));
    }
    Ok((label.to_string(), PathBuf::from(dir)))
}

// ─────────────────────────────────────────────────────────────
// Analyze 主命令
// ─────────────────────────────────────────────────────────────

/// analyze 主命令参数
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(subcommand)]
    pub command: AnalyzeCommands,

    /// Print JSON instead of a table
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
}

/// analyze 子命令
#[derive(Subcommand, Debug)]
pub enum AnalyzeCommands {
    /// Vacancy formation energy from pristine and defective runs
    Vacancy(VacancyArgs),

    /// Compare energies, band gaps and magnetisation of several runs
    Compare(CompareArgs),

    /// Compare relaxed graphite interlayer distances
    D3(D3Args),

    /// Collect displacement forces into FORCE_SETS
    Phonon(PhononArgs),
}

#[derive(Args, Debug)]
pub struct VacancyArgs {
    /// Pristine supercell directory
    #[arg(long, default_value = "pristine")]
    pub pristine: PathBuf,

    /// Defective supercell directory
    #[arg(long, default_value = "defective")]
    pub defective: PathBuf,

    /// Chemical potential of the removed atom (eV; default: half of PBE O2)
    #[arg(long, allow_negative_numbers = true)]
    pub mu: Option<f64>,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Run to compare (repeatable), e.g. --label PBE+U=pbe_plus_u
    #[arg(long = "label", value_name = "LABEL=DIR", value_parser = parse_label, required = true)]
    pub runs: Vec<(String, PathBuf)>,

    /// Experimental band gap for reference (eV)
    #[arg(long)]
    pub experimental_gap: Option<f64>,
}

#[derive(Args, Debug)]
pub struct D3Args {
    /// Run to compare (repeatable), e.g. --label "PBE-D3(BJ)=pbe_d3bj"
    #[arg(long = "label", value_name = "LABEL=DIR", value_parser = parse_label, required = true)]
    pub runs: Vec<(String, PathBuf)>,
}

#[derive(Args, Debug)]
pub struct PhononArgs {
    /// Phonon workflow directory (containing displacements.json)
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}
