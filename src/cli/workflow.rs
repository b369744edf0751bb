//! # workflow 子命令 CLI 定义
//!
//! 每个工作流的参数默认值与库中 `Default` 实现一致；`-o` 缺省时使用
//! 工作流自己的目录名。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/workflow.rs`

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::workflows::WorkflowKind;

/// workflow 主命令参数
#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowCommands,

    /// Print the workflow summary as JSON
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// Lattice relaxation of a cubic perovskite
    Relax {
        #[arg(long = "a-site", default_value = "Sr")]
        a_site: String,
        #[arg(long = "b-site", default_value = "Ti")]
        b_site: String,
        /// Initial lattice constant (Å)
        #[arg(short, long, default_value_t = 3.905)]
        a: f64,
        /// Plane-wave cutoff (eV)
        #[arg(long, default_value_t = 520.0)]
        encut: f64,
        #[arg(long, default_value_t = 40.0)]
        kpoints_density: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Surface slab with frozen bottom layers
    Surface {
        /// Bulk structure (POSCAR format, default: SrTiO3)
        #[arg(long)]
        bulk: Option<PathBuf>,
        #[arg(long, num_args = 3, value_names = ["H", "K", "L"], default_values_t = [1, 0, 0], allow_negative_numbers = true)]
        miller: Vec<i32>,
        #[arg(long, default_value_t = 10.0)]
        min_slab: f64,
        #[arg(long, default_value_t = 15.0)]
        min_vacuum: f64,
        /// Bottom layers to freeze
        #[arg(long, default_value_t = 2)]
        freeze: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Vacancy formation energy (pristine + defective supercells)
    Vacancy {
        #[arg(long)]
        bulk: Option<PathBuf>,
        #[arg(long, num_args = 3, value_names = ["NA", "NB", "NC"], default_values_t = [2, 2, 2])]
        supercell: Vec<usize>,
        #[arg(long, default_value = "O")]
        element: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// PBE vs PBE+U for NiO or Fe2O3
    Dftu {
        #[arg(long, default_value = "NiO")]
        material: String,
        /// Hubbard U (eV)
        #[arg(short = 'u', long = "u-value", default_value_t = 6.2)]
        u_value: f64,
        /// Hund J (eV)
        #[arg(short = 'j', long = "j-value", default_value_t = 0.0)]
        j_value: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// PBE vs PBE-D3 for graphite
    D3 {
        #[arg(short, long, default_value_t = 2.464)]
        a: f64,
        #[arg(short, long, default_value_t = 6.711)]
        c: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Finite-displacement phonons
    Phonon {
        #[arg(long)]
        bulk: Option<PathBuf>,
        /// Diagonal of the supercell matrix
        #[arg(long, num_args = 3, value_names = ["NA", "NB", "NC"], default_values_t = [2, 2, 2])]
        supercell: Vec<i32>,
        /// Displacement amplitude (Å)
        #[arg(long, default_value_t = 0.01)]
        displacement: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run several workflows with default parameters
    All {
        /// Base directory
        #[arg(short, long, default_value = "dft_workflows")]
        output: PathBuf,
        /// Only these workflows (comma separated; default: all six)
        #[arg(long, value_enum, value_delimiter = ',')]
        only: Vec<WorkflowKind>,
    },
}
