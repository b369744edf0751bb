//! # parse 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/parse.rs`

use clap::{ArgGroup, Args};
use std::path::PathBuf;

/// parse 子命令参数
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["dir", "scan"])))]
pub struct ParseArgs {
    /// Calculation directory (containing OUTCAR)
    pub dir: Option<PathBuf>,

    /// Scan every calculation directory under this root
    #[arg(long)]
    pub scan: Option<PathBuf>,

    /// Recurse into subdirectories (scan mode)
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Marker file names that identify a calculation directory (scan mode)
    #[arg(long, default_value = "OUTCAR")]
    pub markers: String,

    /// Number of parallel jobs (0 = auto, scan mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Write the scan table to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
