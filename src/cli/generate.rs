//! # generate 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/generate.rs`

use clap::Args;
use std::path::PathBuf;

/// 解析 `KEY=VALUE`
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// generate 子命令参数
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Input structure (POSCAR/CONTCAR format)
    #[arg(long)]
    pub poscar: PathBuf,

    /// Calculation preset: relax, scf, dft_plus_u, dft_d3, phonon
    #[arg(long, default_value = "relax")]
    pub calc_type: String,

    /// Override or add an INCAR tag (repeatable), e.g. --set ENCUT=600
    #[arg(long = "set", value_name = "TAG=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,

    /// k-point density (Å)
    #[arg(long, default_value_t = 40.0)]
    pub kpoints_density: f64,

    /// POTCAR variant for an element (repeatable), e.g. --potcar Ti=Ti_pv
    #[arg(long = "potcar", value_name = "EL=VARIANT", value_parser = parse_key_value)]
    pub potcar: Vec<(String, String)>,

    /// Output directory
    #[arg(short, long)]
    pub output: PathBuf,

    /// Print an explanation of every INCAR tag
    #[arg(long, default_value_t = false)]
    pub explain: bool,
}
