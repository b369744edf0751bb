//! # 晶体结构构建模块
//!
//! 从晶格常数和元素符号构建理想晶体，以及由体相派生的表面 slab 和
//! 空位超胞。
//!
//! ## 依赖关系
//! - 被 `workflows/`, `server/`, `commands/build.rs` 使用
//! - 子模块: bulk, spacegroup, slab, vacancy

pub mod bulk;
pub mod slab;
pub mod spacegroup;
pub mod vacancy;

pub use bulk::{
    build_corundum, build_diamond, build_graphite, build_perovskite, build_rocksalt, validate_inputs,
};
pub use slab::build_surface_slab;
pub use spacegroup::from_spacegroup;
pub use vacancy::{build_supercell_with_vacancy, VacancyInfo};
