//! # analyze 命令实现
//!
//! 工作流配套分析的统一入口，包含多个子命令：
//! - `vacancy`: 空位形成能
//! - `compare`: 多个计算的对比（PBE vs PBE+U）
//! - `d3`: 石墨层间距对比
//! - `phonon`: FORCE_SETS 汇总
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的参数
//! - 使用 `analysis/`
//! - 子模块: vacancy, compare, d3, phonon

pub mod compare;
pub mod d3;
pub mod phonon;
pub mod vacancy;

use crate::cli::analyze::{AnalyzeArgs, AnalyzeCommands};
use crate::error::Result;

/// 执行 analyze 命令
pub fn execute(args: AnalyzeArgs) -> Result<()> {
    match args.command {
        AnalyzeCommands::Vacancy(a) => vacancy::execute(a, args.json),
        AnalyzeCommands::Compare(a) => compare::execute(a, args.json),
        AnalyzeCommands::D3(a) => d3::execute(a, args.json),
        AnalyzeCommands::Phonon(a) => phonon::execute(a, args.json),
    }
}
