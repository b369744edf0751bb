//! # dftkit - 固体 DFT 计算教学工具箱
//!
//! 构建晶体结构、生成 VASP 输入、解析计算输出，并把六个典型的教学
//! 计算（结构弛豫、表面、空位、DFT+U、范德华修正、声子）打包为可直接
//! 提交的工作流目录。同一套功能既可以通过命令行使用，也可以通过 HTTP API
//! 调用。
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── builders/  (晶体构建)
//!   │     ├── vasp/      (输入文件生成)
//!   │     ├── parsers/   (POSCAR / OUTCAR / vasprun.xml)
//!   │     ├── workflows/ (六个工作流)
//!   │     ├── analysis/  (配套分析)
//!   │     ├── batch/     (并行批量解析)
//!   │     └── mp/        (Materials Project 客户端)
//!   ├── server/     (HTTP API)
//!   ├── models/     (数据模型)
//!   ├── utils/      (日志、终端输出、进度条)
//!   └── error.rs    (错误处理)
//! ```

pub mod analysis;
pub mod batch;
pub mod builders;
pub mod cli;
pub mod commands;
pub mod error;
pub mod models;
pub mod mp;
pub mod parsers;
pub mod server;
pub mod utils;
pub mod vasp;
pub mod workflows;

pub use error::{DftkitError, Result};
