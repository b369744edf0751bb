//! # VASP 计算结果数据模型
//!
//! 存储从 OUTCAR / vasprun.xml 中提取的物理量。每次解析都重新读取文件，
//! 该结构只是某一时刻的快照，不做缓存。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar.rs` 生成
//! - 被 `commands/parse.rs`, `server/` 使用

use serde::{Deserialize, Serialize};

/// 计算目录的解析汇总
///
/// `None` 表示"输出中未找到该量"；`error` 只在 OUTCAR 本身缺失时设置，
/// 用于区分"计算尚未运行"和"计算已运行但某个量不可用"。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSummary {
    /// 计算目录
    pub directory: String,

    /// 最终自由能 TOTEN (eV)
    #[serde(rename = "total_energy_eV", skip_serializing_if = "Option::is_none")]
    pub total_energy: Option<f64>,

    /// energy(sigma->0) (eV)
    #[serde(rename = "energy_sigma0_eV", skip_serializing_if = "Option::is_none")]
    pub energy_sigma0: Option<f64>,

    /// 离子弛豫是否收敛
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converged: Option<bool>,

    /// 总磁化 (μB)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnetization: Option<f64>,

    /// 最大力分量绝对值 (eV/Å)
    #[serde(rename = "max_force_eV_per_A", skip_serializing_if = "Option::is_none")]
    pub max_force: Option<f64>,

    /// 原子数（来自力块的行数）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_atoms: Option<usize>,

    /// 带隙 (eV)
    #[serde(rename = "band_gap_eV", skip_serializing_if = "Option::is_none")]
    pub band_gap: Option<f64>,

    /// OUTCAR 缺失时的错误信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutputSummary {
    pub fn new(directory: impl Into<String>) -> Self {
        OutputSummary {
            directory: directory.into(),
            ..Default::default()
        }
    }

    /// 仅含错误标记的汇总
    pub fn missing(directory: impl Into<String>, error: impl Into<String>) -> Self {
        OutputSummary {
            directory: directory.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// 计算是否已运行（OUTCAR 存在）
    pub fn has_output(&self) -> bool {
        self.error.is_none()
    }

    /// 每原子能量
    pub fn energy_per_atom(&self) -> Option<f64> {
        match (self.total_energy, self.n_atoms) {
            (Some(e), Some(n)) if n > 0 => Some(e / n as f64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_summary_serializes_only_error() {
        let summary = OutputSummary::missing("calc", "OUTCAR not found");
        let json = serde_json::to_value(&summary).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), 2);
        assert_eq!(obj["error"], "OUTCAR not found");
        assert!(!summary.has_output());
    }

    #[test]
    fn test_energy_per_atom() {
        let mut summary = OutputSummary::new("calc");
        summary.total_energy = Some(-40.0);
        summary.n_atoms = Some(5);
        assert!((summary.energy_per_atom().unwrap() + 8.0).abs() < 1e-12);
    }
}
