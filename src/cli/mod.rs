//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `build`: 构建晶体结构并写出 POSCAR
//! - `generate`: 由 POSCAR 和计算类型生成 VASP 输入
//! - `workflow`: 六个教学工作流
//! - `parse`: 解析计算输出（单目录或批量扫描）
//! - `analyze`: 工作流配套分析（嵌套子命令）
//! - `mp`: Materials Project 查询
//! - `serve`: 启动 HTTP API
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: build, generate, workflow, parse, analyze, mp, serve

pub mod analyze;
pub mod build;
pub mod generate;
pub mod mp;
pub mod parse;
pub mod serve;
pub mod workflow;

use clap::{ArgAction, Parser, Subcommand};

/// dftkit - 固体 DFT 计算教学工具箱
#[derive(Parser)]
#[command(name = "dftkit")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Build crystals, generate VASP inputs and analyse DFT results", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Build a crystal structure and write it as POSCAR
    Build(build::BuildArgs),

    /// Generate VASP inputs (INCAR, POSCAR, KPOINTS, ...) for a structure
    Generate(generate::GenerateArgs),

    /// Set up one of the teaching workflows
    Workflow(workflow::WorkflowArgs),

    /// Parse VASP output (OUTCAR, vasprun.xml) in one or many directories
    Parse(parse::ParseArgs),

    /// Analyse finished workflow calculations
    Analyze(analyze::AnalyzeArgs),

    /// Query the Materials Project database
    Mp(mp::MpArgs),

    /// Serve the HTTP API
    Serve(serve::ServeArgs),
}
