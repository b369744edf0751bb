//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `builders/`, `vasp/`, `workflows/`, `analysis/`, `mp/`, `server/`, `utils/`
//! - 子模块: build, generate, workflow, parse, analyze, mp, serve

pub mod analyze;
pub mod build;
pub mod generate;
pub mod mp;
pub mod parse;
pub mod serve;
pub mod workflow;

use serde::Serialize;
use std::path::Path;

use crate::cli::Commands;
use crate::error::Result;
use crate::models::Crystal;
use crate::parsers::parse_poscar_file;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Build(args) => build::execute(args),
        Commands::Generate(args) => generate::execute(args),
        Commands::Workflow(args) => workflow::execute(args),
        Commands::Parse(args) => parse::execute(args),
        Commands::Analyze(args) => analyze::execute(args),
        Commands::Mp(args) => mp::execute(args),
        Commands::Serve(args) => serve::execute(args),
    }
}

/// 表格中的可选数值，缺失显示为 "-"
pub(crate) fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    }
}

pub(crate) fn fmt_flag(value: Option<bool>) -> String {
    match value {
        Some(true) => "yes".to_string(),
        Some(false) => "no".to_string(),
        None => "-".to_string(),
    }
}

/// 以缩进 JSON 打印到标准输出
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 读取可选的体相 POSCAR，缺省为 SrTiO3
pub(crate) fn load_bulk(path: Option<&Path>) -> Result<Crystal> {
    match path {
        Some(p) => parse_poscar_file(p),
        None => Ok(crate::builders::build_perovskite("Sr", "Ti", 3.905)),
    }
}
