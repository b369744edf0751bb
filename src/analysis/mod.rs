//! # 结果分析模块
//!
//! 工作流配套的分析：空位形成能、多个计算的物理量对比、石墨层间距
//! 对比，以及声子位移计算的 FORCE_SETS 汇总。
//!
//! 输出量缺失时不报错，报告中对应字段为 `None`。
//!
//! ## 依赖关系
//! - 被 `commands/analyze.rs` 使用
//! - 使用 `parsers/`, `workflows/phonon.rs`

pub mod compare;
pub mod interlayer;
pub mod phonon;
pub mod vacancy;

pub use compare::{compare_runs, RunComparison};
pub use interlayer::{compare_interlayer, InterlayerRow};
pub use phonon::{collect_force_sets, ForceSetsReport};
pub use vacancy::{vacancy_formation_energy, VacancyReport};

/// 半个 O2 分子的 PBE 能量 (eV)，富氧极限下的 μ(O)
pub const DEFAULT_MU_O: f64 = -9.86 / 2.0;
