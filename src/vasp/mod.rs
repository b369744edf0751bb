//! # VASP 输入生成模块
//!
//! 计算类型预设、INCAR 标签合并，以及一个计算目录的全部输入文件。
//!
//! ## 依赖关系
//! - 被 `workflows/`, `commands/generate.rs`, `server/` 使用
//! - 子模块: presets, kpoints, input_set

pub mod input_set;
pub mod kpoints;
pub mod presets;

pub use input_set::{CalcInfo, VaspInputSet};
pub use kpoints::auto_kpoints;
pub use presets::{CalcType, IncarValue, TagSet};
