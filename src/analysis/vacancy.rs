//! # 空位形成能
//!
//! E_f = E(defective) - E(pristine) + μ(被移除原子)

use serde::Serialize;
use std::path::Path;

use super::DEFAULT_MU_O;
use crate::error::Result;
use crate::parsers::OutputParser;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VacancyReport {
    #[serde(rename = "pristine_energy_eV")]
    pub pristine_energy: Option<f64>,
    #[serde(rename = "defective_energy_eV")]
    pub defective_energy: Option<f64>,
    /// 使用的化学势 (eV)
    #[serde(rename = "mu_eV")]
    pub mu: f64,
    /// 两个能量都可用时的形成能 (eV)
    #[serde(rename = "formation_energy_eV")]
    pub formation_energy: Option<f64>,
    pub pristine_converged: Option<bool>,
    pub defective_converged: Option<bool>,
}

/// 计算空位形成能
///
/// `mu` 缺省时取半个 O2 的 PBE 能量。任一 OUTCAR 缺失或没有能量时
/// `formation_energy` 为 `None`，已读到的能量仍然返回。
pub fn vacancy_formation_energy(
    pristine_dir: &Path,
    defective_dir: &Path,
    mu: Option<f64>,
) -> Result<VacancyReport> {
    let pristine = OutputParser::new(pristine_dir).summary()?;
    let defective = OutputParser::new(defective_dir).summary()?;
    let mu = mu.unwrap_or(DEFAULT_MU_O);

    let formation_energy = match (pristine.total_energy, defective.total_energy) {
        (Some(e_pri), Some(e_def)) => Some(e_def - e_pri + mu),
        _ => {
            log::warn!(
                "could not read energies (pristine: {:?}, defective: {:?})",
                pristine.total_energy,
                defective.total_energy
            );
            None
        }
    };

    Ok(VacancyReport {
        pristine_energy: pristine.total_energy,
        defective_energy: defective.total_energy,
        mu,
        formation_energy,
        pristine_converged: pristine.converged,
        defective_converged: defective.converged,
    })
}
