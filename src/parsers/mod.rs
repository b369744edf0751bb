//! # 解析器模块
//!
//! VASP 结构文件的读写，以及计算输出 (OUTCAR, vasprun.xml) 的解析。
//!
//! ## 依赖关系
//! - 被 `vasp/`, `analysis/`, `commands/`, `batch/` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: poscar, outcar, vasprun

pub mod outcar;
pub mod poscar;
pub mod vasprun;

pub use outcar::OutputParser;
pub use poscar::{parse_poscar_file, to_poscar_string, write_poscar_file};
