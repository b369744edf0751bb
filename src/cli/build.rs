//! # build 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/build.rs`

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// build 主命令参数
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(subcommand)]
    pub command: BuildCommands,

    /// Output POSCAR path (printed to stdout when omitted; a directory for `vacancy`)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,
}

/// 可构建的结构
#[derive(Subcommand, Debug)]
pub enum BuildCommands {
    /// Cubic ABO3 perovskite (5 atoms)
    Perovskite {
        /// A-site cation
        #[arg(long = "a-site", default_value = "Sr")]
        a_site: String,
        /// B-site cation
        #[arg(long = "b-site", default_value = "Ti")]
        b_site: String,
        /// Lattice constant (Å)
        #[arg(short, long, default_value_t = 3.905)]
        a: f64,
    },

    /// Rocksalt primitive cell (2 atoms)
    Rocksalt {
        #[arg(long, default_value = "Ni")]
        cation: String,
        #[arg(long, default_value = "O")]
        anion: String,
        /// Cubic lattice constant (Å)
        #[arg(short, long, default_value_t = 4.177)]
        a: f64,
    },

    /// Diamond-structure primitive cell (2 atoms)
    Diamond {
        #[arg(long, default_value = "Si")]
        element: String,
        /// Cubic lattice constant (Å)
        #[arg(short, long, default_value_t = 5.43)]
        a: f64,
    },

    /// Corundum M2O3, hexagonal conventional cell (30 atoms)
    Corundum {
        #[arg(long, default_value = "Fe")]
        metal: String,
        #[arg(short, long, default_value_t = 5.038)]
        a: f64,
        #[arg(short, long, default_value_t = 13.772)]
        c: f64,
    },

    /// AB-stacked graphite (4 atoms)
    Graphite {
        #[arg(short, long, default_value_t = 2.464)]
        a: f64,
        #[arg(short, long, default_value_t = 6.711)]
        c: f64,
    },

    /// Surface slab cut from a bulk POSCAR (default: SrTiO3)
    Slab {
        /// Bulk structure (POSCAR format)
        #[arg(long)]
        bulk: Option<PathBuf>,
        /// Miller index h k l
        #[arg(long, num_args = 3, value_names = ["H", "K", "L"], default_values_t = [1, 0, 0], allow_negative_numbers = true)]
        miller: Vec<i32>,
        /// Minimum slab thickness (Å)
        #[arg(long, default_value_t = 10.0)]
        min_slab: f64,
        /// Minimum vacuum thickness (Å)
        #[arg(long, default_value_t = 15.0)]
        min_vacuum: f64,
        /// Keep the slab at the bottom of the cell instead of centring it
        #[arg(long, default_value_t = false)]
        no_center: bool,
        /// Freeze this many bottom layers with selective dynamics
        #[arg(long, default_value_t = 0)]
        freeze: usize,
    },

    /// Pristine and single-vacancy supercells (writes two POSCARs)
    Vacancy {
        /// Bulk structure (POSCAR format, default: SrTiO3)
        #[arg(long)]
        bulk: Option<PathBuf>,
        /// Supercell repetitions
        #[arg(long, num_args = 3, value_names = ["NA", "NB", "NC"], default_values_t = [2, 2, 2])]
        supercell: Vec<usize>,
        /// Element to remove (first occurrence)
        #[arg(long, default_value = "O")]
        element: String,
        /// Remove this site index instead
        #[arg(long)]
        index: Option<usize>,
    },
}
