//! 路由处理函数

use axum::extract::{Path as UrlPath, Query};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use super::error::ApiError;
use super::requests::{
    D3Request, DftuRequest, MaterialsQuery, PhononRequest, RelaxRequest, RocksaltQuery,
    StructureDict, StructureQuery, SurfaceRequest, VacancyRequest,
};
use crate::builders::{self, build_corundum, build_diamond, validate_inputs};
use crate::error::{DftkitError, Result};
use crate::mp::{MpClient, SearchQuery};
use crate::workflows::{
    DftD3Graphite, DftPlusUComparison, PerovskiteRelaxation, PhononDispersion,
    SurfaceSlabWorkflow, VacancyFormationEnergy,
};

const MAX_RESULTS_LIMIT: usize = 50;
/// 超胞每个方向的最大倍数
const MAX_SUPERCELL_MULTIPLE: usize = 6;
/// `GET /api/si_structure` 读取能量的 SCF 输出，相对于服务进程工作目录
pub const SI_SCF_OUTPUT: &str = "si_scf_output.txt";
const SI_LATTICE_CONSTANT: f64 = 5.43;

/// 元素符号或晶格常数不合法时返回 422
fn check_inputs(symbols: &[&str], constants: &[f64]) -> std::result::Result<(), ApiError> {
    validate_inputs(symbols, constants).map_err(|e| ApiError::Validation(e.to_string()))
}

fn check_supercell(dims: [usize; 3]) -> std::result::Result<(), ApiError> {
    if dims.iter().all(|d| (1..=MAX_SUPERCELL_MULTIPLE).contains(d)) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "supercell multiples must be between 1 and {}, got {:?}",
            MAX_SUPERCELL_MULTIPLE, dims
        )))
    }
}

/// SCF 输出中最后一个 `Total energy:` 行的能量，读不到时为 `None`
fn scf_total_energy(path: &Path) -> Option<f64> {
    let text = fs::read_to_string(path).ok()?;
    text.lines()
        .filter(|line| line.contains("Total energy:"))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            fields.len().checked_sub(2).and_then(|i| fields[i].parse::<f64>().ok())
        })
        .last()
}

/// 在阻塞线程池中执行
async fn blocking<T, F>(f: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// 在临时目录中运行工作流，序列化汇总后删除目录
fn in_tempdir<S, F>(run: F, attach_inputs: bool) -> Result<Value>
where
    S: Serialize,
    F: FnOnce(&Path) -> Result<S>,
{
    let tmp = tempfile::tempdir()
        .map_err(|e| DftkitError::Other(format!("cannot create temporary directory: {}", e)))?;
    let summary = run(tmp.path())?;
    let mut value = serde_json::to_value(&summary)?;
    if attach_inputs {
        if let Value::Object(map) = &mut value {
            for (key, file) in [("incar", "INCAR"), ("poscar", "POSCAR"), ("kpoints", "KPOINTS")] {
                let text = fs::read_to_string(tmp.path().join(file)).ok();
                map.insert(key.to_string(), json!(text));
            }
        }
    }
    Ok(value)
}

// ─────────────────────────────────────────────────────────────
// 结构
// ─────────────────────────────────────────────────────────────

pub async fn build_perovskite(
    Json(req): Json<RelaxRequest>,
) -> std::result::Result<Json<StructureDict>, ApiError> {
    check_inputs(&[req.a_site.as_str(), req.b_site.as_str()], &[req.a])?;
    let crystal = builders::build_perovskite(&req.a_site, &req.b_site, req.a);
    Ok(Json(StructureDict::from(&crystal)))
}

pub async fn build_rocksalt(
    Query(q): Query<RocksaltQuery>,
) -> std::result::Result<Json<StructureDict>, ApiError> {
    check_inputs(&[q.cation.as_str(), q.anion.as_str()], &[q.a])?;
    let crystal = builders::build_rocksalt(&q.cation, &q.anion, q.a);
    Ok(Json(StructureDict::from(&crystal)))
}

pub async fn build_graphite(
    Json(req): Json<D3Request>,
) -> std::result::Result<Json<StructureDict>, ApiError> {
    check_inputs(&[], &[req.a, req.c])?;
    let crystal = builders::build_graphite(req.a, req.c)?;
    Ok(Json(StructureDict::from(&crystal)))
}

/// 只构建结构，参数全部来自查询串
pub async fn get_structure(
    UrlPath(kind): UrlPath<String>,
    Query(q): Query<StructureQuery>,
) -> std::result::Result<Json<StructureDict>, ApiError> {
    let crystal = match kind.as_str() {
        "perovskite" => {
            let a_site = q.a_site.as_deref().unwrap_or("Sr");
            let b_site = q.b_site.as_deref().unwrap_or("Ti");
            let a = q.a.unwrap_or(3.905);
            check_inputs(&[a_site, b_site], &[a])?;
            builders::build_perovskite(a_site, b_site, a)
        }
        "rocksalt" => {
            let cation = q.cation.as_deref().unwrap_or("Ni");
            let anion = q.anion.as_deref().unwrap_or("O");
            let a = q.a.unwrap_or(4.177);
            check_inputs(&[cation, anion], &[a])?;
            builders::build_rocksalt(cation, anion, a)
        }
        "corundum" => {
            let metal = q.metal.as_deref().unwrap_or("Fe");
            let (a, c) = (q.a.unwrap_or(5.038), q.c.unwrap_or(13.772));
            check_inputs(&[metal], &[a, c])?;
            build_corundum(metal, a, c)?
        }
        "graphite" => {
            let (a, c) = (q.a.unwrap_or(2.464), q.c.unwrap_or(6.711));
            check_inputs(&[], &[a, c])?;
            builders::build_graphite(a, c)?
        }
        other => {
            return Err(ApiError::Validation(format!(
                "Unknown structure kind '{}'. Choose from: perovskite, rocksalt, corundum, graphite",
                other
            )))
        }
    };
    Ok(Json(StructureDict::from(&crystal)))
}

/// 金刚石 Si 原胞，附带 `si_scf_output.txt` 中的总能（若有）
pub async fn si_structure() -> std::result::Result<Json<Value>, ApiError> {
    let crystal = build_diamond("Si", SI_LATTICE_CONSTANT);
    let energy = tokio::task::spawn_blocking(|| scf_total_energy(Path::new(SI_SCF_OUTPUT))).await?;
    let dict = StructureDict::from(&crystal);
    Ok(Json(json!({
        "atoms": {
            "symbols": dict.symbols,
            "positions": dict.positions,
            "cell": dict.cell,
            "pbc": dict.pbc,
        },
        "energy": energy,
    })))
}

// ─────────────────────────────────────────────────────────────
// 工作流
// ─────────────────────────────────────────────────────────────

pub async fn workflow_relax(
    Json(req): Json<RelaxRequest>,
) -> std::result::Result<Json<Value>, ApiError> {
    check_inputs(&[req.a_site.as_str(), req.b_site.as_str()], &[req.a])?;
    let value = blocking(move || {
        in_tempdir(
            |dir| {
                PerovskiteRelaxation {
                    a_site: req.a_site,
                    b_site: req.b_site,
                    a: req.a,
                    encut: req.encut,
                    kpoints_density: req.kpoints_density,
                    output_dir: dir.to_path_buf(),
                }
                .setup()
            },
            true,
        )
    })
    .await?;
    Ok(Json(value))
}

pub async fn workflow_surface(
    Json(req): Json<SurfaceRequest>,
) -> std::result::Result<Json<Value>, ApiError> {
    let value = blocking(move || {
        in_tempdir(
            |dir| {
                SurfaceSlabWorkflow {
                    miller_index: [req.miller_h, req.miller_k, req.miller_l],
                    min_slab_size: req.min_slab_size,
                    min_vacuum_size: req.min_vacuum_size,
                    freeze_bottom: req.freeze_bottom,
                    output_dir: dir.to_path_buf(),
                    ..Default::default()
                }
                .setup()
            },
            true,
        )
    })
    .await?;
    Ok(Json(value))
}

pub async fn workflow_vacancy(
    Json(req): Json<VacancyRequest>,
) -> std::result::Result<Json<Value>, ApiError> {
    check_supercell(req.supercell)?;
    let value = blocking(move || {
        in_tempdir(
            |dir| {
                VacancyFormationEnergy {
                    supercell_dims: req.supercell,
                    vacancy_element: req.vacancy_element,
                    output_dir: dir.to_path_buf(),
                    ..Default::default()
                }
                .setup()
            },
            false,
        )
    })
    .await?;
    Ok(Json(value))
}

pub async fn workflow_dftu(
    Json(req): Json<DftuRequest>,
) -> std::result::Result<Json<Value>, ApiError> {
    let value = blocking(move || {
        in_tempdir(
            |dir| {
                DftPlusUComparison {
                    material: req.material,
                    u_value: req.u_value,
                    j_value: req.j_value,
                    output_dir: dir.to_path_buf(),
                }
                .setup()
            },
            false,
        )
    })
    .await?;
    Ok(Json(value))
}

pub async fn workflow_d3(Json(req): Json<D3Request>) -> std::result::Result<Json<Value>, ApiError> {
    check_inputs(&[], &[req.a, req.c])?;
    let value = blocking(move || {
        in_tempdir(
            |dir| {
                DftD3Graphite {
                    a: req.a,
                    c: req.c,
                    output_dir: dir.to_path_buf(),
                }
                .setup()
            },
            false,
        )
    })
    .await?;
    Ok(Json(value))
}

pub async fn workflow_phonon(
    Json(req): Json<PhononRequest>,
) -> std::result::Result<Json<Value>, ApiError> {
    let workflow = PhononDispersion {
        supercell_matrix: req.supercell_matrix,
        displacement: req.displacement,
        ..Default::default()
    };
    let dims = workflow
        .supercell_dims()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    check_supercell(dims)?;

    let value = blocking(move || {
        in_tempdir(
            |dir| {
                PhononDispersion {
                    output_dir: dir.to_path_buf(),
                    ..workflow
                }
                .setup()
            },
            false,
        )
    })
    .await?;
    Ok(Json(value))
}

// ─────────────────────────────────────────────────────────────
// Materials Project
// ─────────────────────────────────────────────────────────────

pub async fn search_materials(
    UrlPath(formula): UrlPath<String>,
    Query(q): Query<MaterialsQuery>,
) -> std::result::Result<Json<Value>, ApiError> {
    if !(1..=MAX_RESULTS_LIMIT).contains(&q.max_results) {
        return Err(ApiError::Validation(format!(
            "max_results must be between 1 and {}, got {}",
            MAX_RESULTS_LIMIT, q.max_results
        )));
    }

    let query = SearchQuery::formula(formula.clone(), q.max_results);
    let results = blocking(move || MpClient::new(None)?.search_materials(&query)).await?;
    Ok(Json(json!({ "formula": formula, "results": results })))
}

pub async fn get_material_by_id(
    UrlPath(mp_id): UrlPath<String>,
) -> std::result::Result<Json<Value>, ApiError> {
    let value = blocking(move || {
        let client = MpClient::new(None)?;
        let reference = client.get_reference_energy(&mp_id)?;
        let structure = client.get_structure_by_mpid(&mp_id)?;
        let mut value = serde_json::to_value(&reference)?;
        if let Value::Object(map) = &mut value {
            map.insert(
                "structure".to_string(),
                serde_json::to_value(StructureDict::from(&structure))?,
            );
        }
        Ok(value)
    })
    .await?;
    Ok(Json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_perovskite_structure() {
        let Json(dict) = build_perovskite(Json(RelaxRequest::default())).await.unwrap();
        assert_eq!(dict.formula, "O3SrTi");
        assert_eq!(dict.n_atoms, 5);
        assert_eq!(dict.symbols, ["Sr", "Ti", "O", "O", "O"]);
        assert!((dict.positions[1][0] - 3.905 / 2.0).abs() < 1e-9);
        assert_eq!(dict.pbc, [true; 3]);
    }

    #[tokio::test]
    async fn test_rocksalt_defaults() {
        let Json(dict) = build_rocksalt(Query(RocksaltQuery::default())).await.unwrap();
        assert_eq!(dict.formula, "NiO");
        assert_eq!(dict.n_atoms, 2);
    }

    #[tokio::test]
    async fn test_get_structure_unknown_kind() {
        let err = get_structure(UrlPath("wurtzite".to_string()), Query(StructureQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_get_graphite_structure() {
        let q = StructureQuery {
            c: Some(6.7),
            ..Default::default()
        };
        let Json(dict) = get_structure(UrlPath("graphite".to_string()), Query(q))
            .await
            .unwrap();
        assert_eq!(dict.formula, "C4");
        assert!((dict.cell[2][2] - 6.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_workflow_relax_includes_inputs() {
        let Json(value) = workflow_relax(Json(RelaxRequest::default())).await.unwrap();
        assert_eq!(value["formula"], "O3SrTi");
        assert_eq!(value["n_atoms"], 5);
        assert!(value["incar"].as_str().unwrap().contains("ENCUT = 520"));
        assert!(value["kpoints"].as_str().unwrap().contains("Gamma"));
        assert!(value["poscar"].as_str().unwrap().contains("Sr"));

        // 临时目录在响应后被删除
        let dir = value["output_dir"].as_str().unwrap();
        assert!(!Path::new(dir).exists());
    }

    #[tokio::test]
    async fn test_workflow_dftu_unsupported_material() {
        let req = DftuRequest {
            material: "ZnO".to_string(),
            ..Default::default()
        };
        let err = workflow_dftu(Json(req)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.detail().contains("Unsupported material"));
    }

    #[tokio::test]
    async fn test_workflow_vacancy_missing_element() {
        let req = VacancyRequest {
            vacancy_element: "N".to_string(),
            ..Default::default()
        };
        let err = workflow_vacancy(Json(req)).await.unwrap_err();
        assert!(err.detail().contains("'N' not found"));
    }

    #[tokio::test]
    async fn test_invalid_perovskite_inputs_rejected() {
        let req = RelaxRequest {
            a: -1.0,
            ..Default::default()
        };
        let err = build_perovskite(Json(req)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.detail().contains("lattice constant"));

        let req = RelaxRequest {
            a_site: "sr".to_string(),
            ..Default::default()
        };
        let err = workflow_relax(Json(req)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.detail().contains("'sr'"));
    }

    #[tokio::test]
    async fn test_get_structure_rejects_bad_constants() {
        let q = StructureQuery {
            metal: Some("fe".to_string()),
            ..Default::default()
        };
        let err = get_structure(UrlPath("corundum".to_string()), Query(q))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let q = RocksaltQuery {
            a: 0.0,
            ..Default::default()
        };
        let err = build_rocksalt(Query(q)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = build_graphite(Json(D3Request { a: 2.464, c: f64::NAN }))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_si_structure() {
        let Json(value) = si_structure().await.unwrap();
        let symbols = value["atoms"]["symbols"].as_array().unwrap();
        assert_eq!(symbols.len(), 2);
        assert!(symbols.iter().all(|s| s == "Si"));
        assert!((value["atoms"]["positions"][1][0].as_f64().unwrap() - 5.43 / 4.0).abs() < 1e-9);
        assert_eq!(value["atoms"]["pbc"], json!([true, true, true]));
        assert!(value["energy"].is_null() || value["energy"].is_number());
    }

    #[test]
    fn test_scf_total_energy_takes_last_match() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SI_SCF_OUTPUT);
        assert_eq!(scf_total_energy(&path), None);

        fs::write(
            &path,
            "iter 1\n Total energy: -10.50 eV\n Total energy: garbled eV\n Total energy: -10.85 eV\n done\n",
        )
        .unwrap();
        assert_eq!(scf_total_energy(&path), Some(-10.85));

        fs::write(&path, "no energies here\n").unwrap();
        assert_eq!(scf_total_energy(&path), None);
    }

    #[tokio::test]
    async fn test_vacancy_supercell_capped() {
        for supercell in [[200, 200, 200], [2, 0, 2]] {
            let req = VacancyRequest {
                supercell,
                ..Default::default()
            };
            let err = workflow_vacancy(Json(req)).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[tokio::test]
    async fn test_phonon_supercell_capped() {
        let req = PhononRequest {
            supercell_matrix: [[200, 0, 0], [0, 200, 0], [0, 0, 200]],
            ..Default::default()
        };
        let err = workflow_phonon(Json(req)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.detail().contains("between 1 and 6"));

        let req = PhononRequest {
            supercell_matrix: [[2, 1, 0], [0, 2, 0], [0, 0, 2]],
            ..Default::default()
        };
        let err = workflow_phonon(Json(req)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_max_results_validated_before_request() {
        let err = search_materials(
            UrlPath("SrTiO3".to_string()),
            Query(MaterialsQuery { max_results: 51 }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
