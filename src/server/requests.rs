//! 请求体与响应中的结构字典
//!
//! 缺省字段取各工作流的默认参数，空对象 `{}` 即默认计算。

use serde::{Deserialize, Serialize};

use crate::models::Crystal;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelaxRequest {
    /// A 位阳离子
    #[serde(rename = "A")]
    pub a_site: String,
    /// B 位阳离子
    #[serde(rename = "B")]
    pub b_site: String,
    pub a: f64,
    pub encut: f64,
    pub kpoints_density: f64,
}

impl Default for RelaxRequest {
    fn default() -> Self {
        RelaxRequest {
            a_site: "Sr".to_string(),
            b_site: "Ti".to_string(),
            a: 3.905,
            encut: 520.0,
            kpoints_density: 40.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurfaceRequest {
    pub miller_h: i32,
    pub miller_k: i32,
    pub miller_l: i32,
    pub min_slab_size: f64,
    pub min_vacuum_size: f64,
    pub freeze_bottom: usize,
}

impl Default for SurfaceRequest {
    fn default() -> Self {
        SurfaceRequest {
            miller_h: 1,
            miller_k: 0,
            miller_l: 0,
            min_slab_size: 10.0,
            min_vacuum_size: 15.0,
            freeze_bottom: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VacancyRequest {
    pub supercell: [usize; 3],
    pub vacancy_element: String,
}

impl Default for VacancyRequest {
    fn default() -> Self {
        VacancyRequest {
            supercell: [2, 2, 2],
            vacancy_element: "O".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DftuRequest {
    pub material: String,
    pub u_value: f64,
    pub j_value: f64,
}

impl Default for DftuRequest {
    fn default() -> Self {
        DftuRequest {
            material: "NiO".to_string(),
            u_value: 6.2,
            j_value: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct D3Request {
    pub a: f64,
    pub c: f64,
}

impl Default for D3Request {
    fn default() -> Self {
        D3Request { a: 2.464, c: 6.711 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhononRequest {
    pub supercell_matrix: [[i32; 3]; 3],
    pub displacement: f64,
}

impl Default for PhononRequest {
    fn default() -> Self {
        PhononRequest {
            supercell_matrix: [[2, 0, 0], [0, 2, 0], [0, 0, 2]],
            displacement: 0.01,
        }
    }
}

/// 岩盐结构的查询参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RocksaltQuery {
    pub cation: String,
    pub anion: String,
    pub a: f64,
}

impl Default for RocksaltQuery {
    fn default() -> Self {
        RocksaltQuery {
            cation: "Ni".to_string(),
            anion: "O".to_string(),
            a: 4.177,
        }
    }
}

/// `GET /api/structures/{kind}` 的查询参数，按结构类型取用
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructureQuery {
    #[serde(rename = "A")]
    pub a_site: Option<String>,
    #[serde(rename = "B")]
    pub b_site: Option<String>,
    pub cation: Option<String>,
    pub anion: Option<String>,
    pub metal: Option<String>,
    pub a: Option<f64>,
    pub c: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialsQuery {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    10
}

impl Default for MaterialsQuery {
    fn default() -> Self {
        MaterialsQuery {
            max_results: default_max_results(),
        }
    }
}

/// 返回给前端的结构：笛卡尔坐标、晶胞矩阵和化学式
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureDict {
    pub symbols: Vec<String>,
    pub positions: Vec<[f64; 3]>,
    pub cell: [[f64; 3]; 3],
    pub pbc: [bool; 3],
    pub formula: String,
    pub n_atoms: usize,
}

impl From<&Crystal> for StructureDict {
    fn from(crystal: &Crystal) -> Self {
        StructureDict {
            symbols: crystal.atoms.iter().map(|a| a.element.clone()).collect(),
            positions: crystal.cartesian_positions(),
            cell: crystal.lattice.matrix,
            pbc: crystal.pbc,
            formula: crystal.formula(),
            n_atoms: crystal.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bodies_take_defaults() {
        let relax: RelaxRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(relax.a_site, "Sr");
        assert_eq!(relax.encut, 520.0);

        let relax: RelaxRequest = serde_json::from_str(r#"{"A": "Ba", "B": "Zr"}"#).unwrap();
        assert_eq!((relax.a_site.as_str(), relax.b_site.as_str()), ("Ba", "Zr"));
        assert_eq!(relax.a, 3.905);

        let phonon: PhononRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(phonon.supercell_matrix[2], [0, 0, 2]);
    }

    #[test]
    fn test_bad_supercell_length_rejected() {
        assert!(serde_json::from_str::<VacancyRequest>(r#"{"supercell": [2, 2]}"#).is_err());
    }
}
