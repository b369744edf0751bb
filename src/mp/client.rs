//! # Materials Project REST 客户端
//!
//! 所有请求走 `/materials/summary/`，只请求需要的字段。HTTP 客户端在第一次
//! 请求时才构建，API key 在构造 `MpClient` 时就检查。

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

use super::models::{
    MaterialSummary, PhononDoc, PhononInfo, ReferenceEnergy, Response, SummaryDoc,
};
use crate::error::{DftkitError, Result};
use crate::models::Crystal;

pub const MP_API_URL: &str = "https://api.materialsproject.org";
pub const API_KEY_ENV: &str = "MP_API_KEY";

const SEARCH_FIELDS: &str = "material_id,formula_pretty,energy_above_hull,\
formation_energy_per_atom,band_gap,is_stable,nsites,symmetry,is_magnetic";
const ENERGY_FIELDS: &str = "material_id,formula_pretty,energy_per_atom,\
formation_energy_per_atom,energy_above_hull,band_gap,is_stable";

/// 排序时缺失的 e_above_hull 视为很不稳定
const MISSING_HULL_ENERGY: f64 = 999.0;

/// 检索条件
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// 化学式，如 "SrTiO3"
    pub formula: Option<String>,
    /// 必须包含的元素
    pub elements: Vec<String>,
    /// 带隙范围 (eV)
    pub band_gap: Option<(f64, f64)>,
    pub is_stable: Option<bool>,
    pub max_results: usize,
}

impl SearchQuery {
    pub fn formula(formula: impl Into<String>, max_results: usize) -> Self {
        SearchQuery {
            formula: Some(formula.into()),
            max_results,
            ..Default::default()
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(f) = &self.formula {
            params.push(("formula", f.clone()));
        }
        if !self.elements.is_empty() {
            params.push(("elements", self.elements.join(",")));
        }
        if let Some((lo, hi)) = self.band_gap {
            params.push(("band_gap_min", lo.to_string()));
            params.push(("band_gap_max", hi.to_string()));
        }
        if let Some(stable) = self.is_stable {
            params.push(("is_stable", stable.to_string()));
        }
        params.push(("_limit", self.max_results.max(1).to_string()));
        params
    }
}

/// 按 `explicit` 优先、其次环境变量的顺序取 API key，空字符串视为缺失
pub fn resolve_api_key(explicit: Option<String>, env: Option<String>) -> Result<String> {
    explicit
        .filter(|k| !k.trim().is_empty())
        .or_else(|| env.filter(|k| !k.trim().is_empty()))
        .ok_or(DftkitError::MissingApiKey)
}

pub struct MpClient {
    api_key: String,
    base_url: String,
    http: OnceCell<Client>,
}

impl MpClient {
    /// 创建客户端；没有 API key 时立即返回 `MissingApiKey`
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let api_key = resolve_api_key(api_key, std::env::var(API_KEY_ENV).ok())?;
        Ok(MpClient {
            api_key,
            base_url: MP_API_URL.to_string(),
            http: OnceCell::new(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn http(&self) -> Result<&Client> {
        self.http.get_or_try_init(|| {
            let mut headers = HeaderMap::new();
            let key = HeaderValue::from_str(&self.api_key).map_err(|_| {
                DftkitError::InvalidArgument("API key contains invalid characters".to_string())
            })?;
            headers.insert("X-API-KEY", key);
            log::debug!("building HTTP client for {}", self.base_url);
            Ok(Client::builder()
                .default_headers(headers)
                .user_agent(concat!("dftkit/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(60))
                .build()?)
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<T>> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {} {:?}", url, params);
        let resp: Response<T> = self
            .http()?
            .get(&url)
            .query(params)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(resp.data)
    }

    fn summary_docs(&self, params: Vec<(&'static str, String)>) -> Result<Vec<SummaryDoc>> {
        self.get("/materials/summary/", &params)
    }

    /// 按条件检索材料
    pub fn search_materials(&self, query: &SearchQuery) -> Result<Vec<MaterialSummary>> {
        let mut params = query.params();
        params.push(("_fields", SEARCH_FIELDS.to_string()));
        let docs = self.summary_docs(params)?;
        log::info!("{} materials matched", docs.len());
        Ok(docs.iter().map(MaterialSummary::from).collect())
    }

    /// 按 mp-id 取结构
    pub fn get_structure_by_mpid(&self, mp_id: &str) -> Result<Crystal> {
        let docs = self.summary_docs(vec![
            ("material_ids", mp_id.to_string()),
            ("_fields", "material_id,structure".to_string()),
        ])?;
        let structure = docs
            .into_iter()
            .next()
            .and_then(|d| d.structure)
            .ok_or_else(|| DftkitError::NoResults(mp_id.to_string()))?;
        structure.to_crystal(mp_id)
    }

    /// 按化学式取结构；`most_stable` 时取 e_above_hull 最小的那个
    pub fn get_structure_by_formula(&self, formula: &str, most_stable: bool) -> Result<Crystal> {
        let mut docs = self.summary_docs(vec![
            ("formula", formula.to_string()),
            ("_fields", "material_id,energy_above_hull,structure".to_string()),
        ])?;
        if docs.is_empty() {
            return Err(DftkitError::NoResults(formula.to_string()));
        }
        if most_stable {
            sort_by_stability(&mut docs);
        }
        let doc = docs.swap_remove(0);
        log::info!("using {} for {}", doc.material_id, formula);
        let structure = doc
            .structure
            .ok_or_else(|| DftkitError::NoResults(formula.to_string()))?;
        structure.to_crystal(formula)
    }

    /// 参考能量，用于和自己的计算对比
    pub fn get_reference_energy(&self, mp_id: &str) -> Result<ReferenceEnergy> {
        let docs = self.summary_docs(vec![
            ("material_ids", mp_id.to_string()),
            ("_fields", ENERGY_FIELDS.to_string()),
        ])?;
        docs.first()
            .map(ReferenceEnergy::from)
            .ok_or_else(|| DftkitError::NoResults(mp_id.to_string()))
    }

    /// 声子数据是否存在；不是所有材料都有，请求失败时也返回 `None`
    pub fn get_phonon_data(&self, mp_id: &str) -> Option<PhononInfo> {
        let docs: Result<Vec<PhononDoc>> = self.get(
            "/materials/phonon/",
            &[
                ("material_ids", mp_id.to_string()),
                ("_fields", "material_id,has_imaginary_modes".to_string()),
            ],
        );
        match docs {
            Ok(docs) => docs.into_iter().next().map(|d| PhononInfo {
                material_id: d.material_id.unwrap_or_else(|| mp_id.to_string()),
                has_phonon_data: true,
                has_imaginary_modes: d.has_imaginary_modes,
            }),
            Err(e) => {
                log::warn!("phonon data unavailable for {}: {}", mp_id, e);
                None
            }
        }
    }

    /// 各元素最稳定单质的每原子能量
    ///
    /// 某个元素查询失败或没有稳定相时值为 `None`。
    pub fn get_elemental_reference_energies(
        &self,
        elements: &[&str],
    ) -> BTreeMap<String, Option<f64>> {
        elements
            .iter()
            .map(|el| {
                let energy = self
                    .summary_docs(vec![
                        ("formula", el.to_string()),
                        ("is_stable", "true".to_string()),
                        ("_fields", "material_id,energy_per_atom".to_string()),
                    ])
                    .map(|docs| min_energy_per_atom(&docs))
                    .unwrap_or_else(|e| {
                        log::warn!("reference energy for {} unavailable: {}", el, e);
                        None
                    });
                (el.to_string(), energy)
            })
            .collect()
    }
}

fn sort_by_stability(docs: &mut [SummaryDoc]) {
    docs.sort_by(|a, b| {
        let ea = a.energy_above_hull.unwrap_or(MISSING_HULL_ENERGY);
        let eb = b.energy_above_hull.unwrap_or(MISSING_HULL_ENERGY);
        ea.total_cmp(&eb)
    });
}

fn min_energy_per_atom(docs: &[SummaryDoc]) -> Option<f64> {
    docs.iter()
        .filter_map(|d| d.energy_per_atom)
        .min_by(|a, b| a.total_cmp(b))
}
