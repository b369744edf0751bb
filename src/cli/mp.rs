//! # mp 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/mp.rs`

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// mp 主命令参数
#[derive(Args, Debug)]
pub struct MpArgs {
    #[command(subcommand)]
    pub command: MpCommands,

    /// Materials Project API key
    #[arg(long, env = "MP_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Print JSON instead of a table
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum MpCommands {
    /// Search materials by formula, elements, band gap or stability
    Search {
        /// Chemical formula, e.g. SrTiO3
        formula: Option<String>,
        /// Required elements (comma separated)
        #[arg(long, value_delimiter = ',')]
        elements: Vec<String>,
        /// Minimum band gap (eV)
        #[arg(long)]
        gap_min: Option<f64>,
        /// Maximum band gap (eV)
        #[arg(long)]
        gap_max: Option<f64>,
        /// Only thermodynamically stable entries
        #[arg(long, default_value_t = false)]
        stable: bool,
        #[arg(short = 'n', long, default_value_t = 10)]
        max_results: usize,
    },

    /// Download a structure by mp-id or formula and write it as POSCAR
    Get {
        /// mp-id (e.g. mp-5229) or formula (most stable polymorph)
        id: String,
        /// Output POSCAR path (printed to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reference energies for validating your own calculations
    Reference {
        /// mp-id
        id: String,
        /// Also look up elemental references for these elements (comma separated)
        #[arg(long, value_delimiter = ',')]
        elements: Vec<String>,
        /// Also report whether phonon data exists
        #[arg(long, default_value_t = false)]
        phonon: bool,
    },
}
