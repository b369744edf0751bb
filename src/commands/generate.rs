//! # generate 命令实现
//!
//! 读取 POSCAR，合并预设与 `--set` 覆盖的标签，写出一个计算目录。
//!
//! ## 依赖关系
//! - 使用 `cli/generate.rs` 定义的参数
//! - 使用 `parsers/poscar.rs` 读取结构，`vasp/` 生成输入

use std::collections::HashMap;

use crate::cli::generate::GenerateArgs;
use crate::error::Result;
use crate::parsers::parse_poscar_file;
use crate::utils::output;
use crate::vasp::{IncarValue, TagSet, VaspInputSet};

/// 执行 generate 命令
pub fn execute(args: GenerateArgs) -> Result<()> {
    let crystal = parse_poscar_file(&args.poscar)?;

    let overrides: TagSet = args
        .set
        .iter()
        .map(|(tag, value)| (tag.to_ascii_uppercase(), IncarValue::parse(value)))
        .collect();
    let potcar_map: HashMap<String, String> = args.potcar.into_iter().collect();

    let set = VaspInputSet::from_preset_name(
        &crystal,
        &args.calc_type,
        &overrides,
        args.kpoints_density,
        potcar_map,
    )?;

    output::print_header(&format!(
        "{} input set for {}",
        set.calc_type(),
        set.crystal().formula()
    ));
    let kp = set.kpoints();
    output::print_kv("Atoms", &set.crystal().len().to_string());
    output::print_kv("Species (POSCAR order)", &set.species().join(" "));
    output::print_kv("k-mesh", &format!("{}x{}x{} (Gamma)", kp[0], kp[1], kp[2]));
    if !overrides.is_empty() {
        output::print_kv(
            "Overrides",
            &overrides
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", "),
        );
    }
    println!();

    let paths = set.write_all(&args.output)?;
    for (name, path) in &paths {
        output::print_file(name, &path.display().to_string());
    }

    if args.explain {
        println!("\n{}", set.explain());
    }

    output::print_done(&format!("Inputs written to {}", args.output.display()));
    Ok(())
}
