//! # 工作流预设模块
//!
//! 六个教学用计算流程。每个流程生成一个或多个计算目录的 VASP 输入，
//! 外加 README.md 和一个调用 `dftkit analyze` 的分析脚本。
//!
//! ## 流程
//! - `relax`: 钙钛矿结构弛豫
//! - `surface`: 表面 slab，底层固定
//! - `vacancy`: 空位形成能（完整/缺陷两个超胞）
//! - `dftu`: PBE 与 PBE+U 对比
//! - `d3`: 石墨的 DFT-D3 色散修正
//! - `phonon`: 有限位移法声子
//!
//! ## 依赖关系
//! - 被 `commands/workflow.rs`, `server/` 使用
//! - 使用 `builders/`, `vasp/`

pub mod d3;
pub mod dftu;
pub mod phonon;
pub mod relax;
pub mod surface;
pub mod vacancy;

pub use d3::{D3Summary, DftD3Graphite};
pub use dftu::{DftPlusUComparison, DftuSummary};
pub use phonon::{PhononDispersion, PhononSummary};
pub use relax::{PerovskiteRelaxation, RelaxSummary};
pub use surface::{SurfaceSlabWorkflow, SurfaceSummary};
pub use vacancy::{VacancyFormationEnergy, VacancySummary};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{DftkitError, Result};
use crate::vasp::input_set::write_text;
use crate::vasp::IncarValue;

/// 工作流种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    Relax,
    Surface,
    Vacancy,
    Dftu,
    D3,
    Phonon,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 6] = [
        WorkflowKind::Relax,
        WorkflowKind::Surface,
        WorkflowKind::Vacancy,
        WorkflowKind::Dftu,
        WorkflowKind::D3,
        WorkflowKind::Phonon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Relax => "relax",
            WorkflowKind::Surface => "surface",
            WorkflowKind::Vacancy => "vacancy",
            WorkflowKind::Dftu => "dftu",
            WorkflowKind::D3 => "d3",
            WorkflowKind::Phonon => "phonon",
        }
    }

    /// `run_all` 使用的子目录名
    pub fn dir_name(&self) -> &'static str {
        match self {
            WorkflowKind::Relax => "01_SrTiO3_relax",
            WorkflowKind::Surface => "02_surface_slab",
            WorkflowKind::Vacancy => "03_vacancy",
            WorkflowKind::Dftu => "04_dft_plus_u",
            WorkflowKind::D3 => "05_dft_d3_graphite",
            WorkflowKind::Phonon => "06_phonons",
        }
    }

    /// workflow_summary.json 中的键
    pub fn summary_key(&self) -> &'static str {
        match self {
            WorkflowKind::Relax => "01_relax",
            WorkflowKind::Surface => "02_surface",
            WorkflowKind::Vacancy => "03_vacancy",
            WorkflowKind::Dftu => "04_dftu",
            WorkflowKind::D3 => "05_d3",
            WorkflowKind::Phonon => "06_phonon",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WorkflowKind::Relax => "SrTiO3 Perovskite Relaxation",
            WorkflowKind::Surface => "Surface Slab Model: SrTiO3 (100)",
            WorkflowKind::Vacancy => "Oxygen Vacancy in SrTiO3 (2x2x2 supercell)",
            WorkflowKind::Dftu => "PBE vs DFT+U: NiO",
            WorkflowKind::D3 => "DFT-D3 Corrections: Graphite",
            WorkflowKind::Phonon => "Phonon Dispersions: SrTiO3",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = DftkitError;

    fn from_str(s: &str) -> Result<Self> {
        WorkflowKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| {
                DftkitError::InvalidArgument(format!(
                    "unknown workflow '{}'. Choose from: relax, surface, vacancy, dftu, d3, phonon",
                    s
                ))
            })
    }
}

/// 任一工作流的汇总
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WorkflowSummary {
    Relax(RelaxSummary),
    Surface(SurfaceSummary),
    Vacancy(VacancySummary),
    Dftu(DftuSummary),
    D3(D3Summary),
    Phonon(PhononSummary),
}

/// 以默认参数运行一个工作流，输出到 `output_dir`
pub fn run_default(kind: WorkflowKind, output_dir: &Path) -> Result<WorkflowSummary> {
    let output_dir = output_dir.to_path_buf();
    let summary = match kind {
        WorkflowKind::Relax => WorkflowSummary::Relax(
            PerovskiteRelaxation {
                output_dir,
                ..Default::default()
            }
            .setup()?,
        ),
        WorkflowKind::Surface => WorkflowSummary::Surface(
            SurfaceSlabWorkflow {
                output_dir,
                ..Default::default()
            }
            .setup()?,
        ),
        WorkflowKind::Vacancy => WorkflowSummary::Vacancy(
            VacancyFormationEnergy {
                output_dir,
                ..Default::default()
            }
            .setup()?,
        ),
        WorkflowKind::Dftu => WorkflowSummary::Dftu(
            DftPlusUComparison {
                output_dir,
                ..Default::default()
            }
            .setup()?,
        ),
        WorkflowKind::D3 => WorkflowSummary::D3(
            DftD3Graphite {
                output_dir,
                ..Default::default()
            }
            .setup()?,
        ),
        WorkflowKind::Phonon => WorkflowSummary::Phonon(
            PhononDispersion {
                output_dir,
                ..Default::default()
            }
            .setup()?,
        ),
    };
    Ok(summary)
}

/// 依次运行所选工作流，写出 `workflow_summary.json`
///
/// 选择为空时运行全部六个。子目录为 `01_SrTiO3_relax` ... `06_phonons`。
pub fn run_all(base: &Path, selection: &[WorkflowKind]) -> Result<IndexMap<String, WorkflowSummary>> {
    run_all_with(base, selection, |_| {})
}

/// 同 [`run_all`]，每个工作流开始前调用 `on_start`
pub fn run_all_with<F>(
    base: &Path,
    selection: &[WorkflowKind],
    mut on_start: F,
) -> Result<IndexMap<String, WorkflowSummary>>
where
    F: FnMut(WorkflowKind),
{
    fs::create_dir_all(base).map_err(|e| DftkitError::write(base, e))?;

    let kinds: Vec<WorkflowKind> = if selection.is_empty() {
        WorkflowKind::ALL.to_vec()
    } else {
        WorkflowKind::ALL
            .into_iter()
            .filter(|k| selection.contains(k))
            .collect()
    };

    let mut results = IndexMap::new();
    for kind in kinds {
        log::info!("setting up {} workflow", kind);
        on_start(kind);
        let summary = run_default(kind, &base.join(kind.dir_name()))?;
        results.insert(kind.summary_key().to_string(), summary);
    }

    let json = serde_json::to_string_pretty(&results)? + "\n";
    write_text(&base.join("workflow_summary.json"), &json)?;
    Ok(results)
}

/// 文件路径表转为可序列化的字符串表
pub(crate) fn path_strings(paths: &IndexMap<String, PathBuf>) -> IndexMap<String, String> {
    paths
        .iter()
        .map(|(k, v)| (k.clone(), v.display().to_string()))
        .collect()
}

pub(crate) fn potcar_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(el, variant)| (el.to_string(), variant.to_string()))
        .collect()
}

/// 整数值的 ENCUT 写成整数
pub(crate) fn encut_value(encut: f64) -> IncarValue {
    if encut.fract() == 0.0 && encut.abs() < i64::MAX as f64 {
        IncarValue::Int(encut as i64)
    } else {
        IncarValue::Float(encut)
    }
}

pub(crate) fn write_readme(dir: &Path, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| DftkitError::write(dir, e))?;
    write_text(&dir.join("README.md"), content)
}

/// 写出可执行的 shell 脚本
pub(crate) fn write_script(path: &Path, content: &str) -> Result<PathBuf> {
    let path = write_text(path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .map_err(|e| DftkitError::write(&path, e))?;
    }
    Ok(path)
}

pub(crate) fn join_dims(dims: &[usize]) -> String {
    dims.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("x")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in WorkflowKind::ALL {
            assert_eq!(kind.as_str().parse::<WorkflowKind>().unwrap(), kind);
        }
        assert!("md".parse::<WorkflowKind>().is_err());
    }

    #[test]
    fn test_encut_value() {
        assert_eq!(encut_value(520.0), IncarValue::Int(520));
        assert_eq!(encut_value(450.5), IncarValue::Float(450.5));
    }

    #[test]
    fn test_run_all_subset() {
        let dir = tempfile::tempdir().unwrap();
        let results = run_all(dir.path(), &[WorkflowKind::D3, WorkflowKind::Relax]).unwrap();

        let keys: Vec<&String> = results.keys().collect();
        assert_eq!(keys, ["01_relax", "05_d3"]);
        assert!(dir.path().join("01_SrTiO3_relax/INCAR").exists());
        assert!(dir.path().join("05_dft_d3_graphite/pbe_d3bj/INCAR").exists());
        assert!(!dir.path().join("02_surface_slab").exists());

        let json: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("workflow_summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["01_relax"]["formula"], "O3SrTi");
        assert_eq!(json["05_d3"]["material"], "graphite");
    }
}
