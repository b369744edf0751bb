//! # 批量扫描模块
//!
//! 在目录树中找出所有计算目录并行解析。
//!
//! ## 功能
//! - 按标记文件（默认 OUTCAR）识别计算目录
//! - 递归或只看一层
//! - rayon 并行处理，进度反馈与统计
//!
//! ## 依赖关系
//! - 被 `commands/parse.rs` 使用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名
//! - 使用 `rayon` 进行并行处理，`indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::CalcDirCollector;
pub use runner::{BatchResult, BatchRunner, ProcessResult};
