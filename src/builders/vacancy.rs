//! # 空位超胞构建
//!
//! 将体相晶胞扩展为超胞，再删除一个原子。删除对象的优先级：
//! 显式索引 > 指定元素的第一次出现 > 第 0 个原子。

use serde::{Deserialize, Serialize};

use crate::error::{DftkitError, Result};
use crate::models::Crystal;

/// 空位信息，贯穿空位工作流的汇总与分析
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VacancyInfo {
    pub removed_symbol: String,
    /// 被删原子的笛卡尔坐标 (Å)
    pub removed_position: [f64; 3],
    pub removed_index: usize,
    pub n_atoms_pristine: usize,
    pub n_atoms_defective: usize,
    pub supercell_dims: [usize; 3],
}

/// 构建完整超胞与含一个空位的超胞
pub fn build_supercell_with_vacancy(
    bulk: &Crystal,
    dims: [usize; 3],
    vacancy_element: Option<&str>,
    vacancy_index: Option<usize>,
) -> Result<(Crystal, Crystal, VacancyInfo)> {
    if dims.iter().any(|&n| n == 0) {
        return Err(DftkitError::InvalidArgument(format!(
            "supercell dimensions must be >= 1, got {:?}",
            dims
        )));
    }

    let pristine = bulk.repeat(dims);
    if pristine.is_empty() {
        return Err(DftkitError::InvalidArgument(
            "cannot create a vacancy in an empty structure".to_string(),
        ));
    }

    let idx = match (vacancy_index, vacancy_element) {
        (Some(i), _) => {
            if i >= pristine.len() {
                return Err(DftkitError::InvalidArgument(format!(
                    "vacancy index {} out of range for {} atoms",
                    i,
                    pristine.len()
                )));
            }
            i
        }
        (None, Some(el)) => pristine
            .atoms
            .iter()
            .position(|a| a.element == el)
            .ok_or_else(|| DftkitError::SpeciesNotFound {
                element: el.to_string(),
                available: pristine.species_order().join(", "),
            })?,
        (None, None) => 0,
    };

    let removed = &pristine.atoms[idx];
    let removed_symbol = removed.element.clone();
    let removed_position = pristine.lattice.to_cartesian(removed.position);

    let mut defective = pristine.clone();
    defective.atoms.remove(idx);
    defective.name = format!("{}_V{}", pristine.name, removed_symbol);

    log::debug!(
        "removed {} (index {}) from {} -> {} atoms",
        removed_symbol,
        idx,
        pristine.formula(),
        defective.len()
    );

    let info = VacancyInfo {
        removed_symbol,
        removed_position,
        removed_index: idx,
        n_atoms_pristine: pristine.len(),
        n_atoms_defective: defective.len(),
        supercell_dims: dims,
    };

    Ok((pristine, defective, info))
}
