//! # Materials Project 响应模型
//!
//! summary 接口的文档（只反序列化用到的字段）和 pymatgen 结构 JSON，
//! 以及对外返回的精简结果。

use serde::{Deserialize, Serialize};

use crate::error::{DftkitError, Result};
use crate::models::{Atom, Crystal, Lattice};

/// API 响应外层 `{"data": [...]}`
#[derive(Debug, Deserialize)]
pub struct Response<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Symmetry {
    pub symbol: Option<String>,
}

/// materials/summary 文档
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryDoc {
    pub material_id: String,
    pub formula_pretty: Option<String>,
    pub energy_per_atom: Option<f64>,
    pub energy_above_hull: Option<f64>,
    pub formation_energy_per_atom: Option<f64>,
    pub band_gap: Option<f64>,
    pub is_stable: Option<bool>,
    pub nsites: Option<usize>,
    pub symmetry: Option<Symmetry>,
    pub is_magnetic: Option<bool>,
    pub structure: Option<PmgStructure>,
}

/// pymatgen `Structure.as_dict()`
#[derive(Debug, Clone, Deserialize)]
pub struct PmgStructure {
    pub lattice: PmgLattice,
    pub sites: Vec<PmgSite>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PmgLattice {
    pub matrix: [[f64; 3]; 3],
}

#[derive(Debug, Clone, Deserialize)]
pub struct PmgSite {
    pub species: Vec<PmgSpecies>,
    pub abc: [f64; 3],
    pub label: Option<String>,
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PmgSpecies {
    pub element: String,
    #[serde(default = "full_occupancy")]
    pub occu: f64,
}

fn full_occupancy() -> f64 {
    1.0
}

impl PmgStructure {
    /// 转为 Crystal；部分占据的位置取占据数最大的元素
    pub fn to_crystal(&self, name: &str) -> Result<Crystal> {
        let mut atoms = Vec::with_capacity(self.sites.len());
        for (i, site) in self.sites.iter().enumerate() {
            let species = site
                .species
                .iter()
                .max_by(|a, b| a.occu.total_cmp(&b.occu))
                .ok_or_else(|| {
                    DftkitError::InvalidSpeciesOrGeometry(format!("site {} has no species", i))
                })?;
            if site.species.len() > 1 || species.occu < 1.0 {
                log::warn!(
                    "site {} is disordered; using majority species {}",
                    i,
                    species.element
                );
            }

            let mut atom = Atom::new(species.element.clone(), site.abc);
            if let Some(label) = &site.label {
                if *label != species.element {
                    atom = atom.with_label(label.clone());
                }
            }
            if let Some(m) = site
                .properties
                .as_ref()
                .and_then(|p| p.get("magmom"))
                .and_then(|v| v.as_f64())
            {
                atom = atom.with_magmom(m);
            }
            atoms.push(atom);
        }

        let mut crystal = Crystal::new(name, Lattice::from_vectors(self.lattice.matrix), atoms);
        crystal.source_format = Some("materials_project".to_string());
        Ok(crystal)
    }
}

/// 检索结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialSummary {
    pub material_id: String,
    pub formula: Option<String>,
    #[serde(rename = "energy_above_hull_eV")]
    pub energy_above_hull: Option<f64>,
    #[serde(rename = "formation_energy_per_atom_eV")]
    pub formation_energy_per_atom: Option<f64>,
    #[serde(rename = "band_gap_eV")]
    pub band_gap: Option<f64>,
    pub is_stable: Option<bool>,
    pub n_sites: Option<usize>,
    pub spacegroup: Option<String>,
    pub is_magnetic: Option<bool>,
}

impl From<&SummaryDoc> for MaterialSummary {
    fn from(doc: &SummaryDoc) -> Self {
        MaterialSummary {
            material_id: doc.material_id.clone(),
            formula: doc.formula_pretty.clone(),
            energy_above_hull: doc.energy_above_hull,
            formation_energy_per_atom: doc.formation_energy_per_atom,
            band_gap: doc.band_gap,
            is_stable: doc.is_stable,
            n_sites: doc.nsites,
            spacegroup: doc.symmetry.as_ref().and_then(|s| s.symbol.clone()),
            is_magnetic: doc.is_magnetic,
        }
    }
}

/// 参考能量数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceEnergy {
    pub material_id: String,
    pub formula: Option<String>,
    #[serde(rename = "energy_per_atom_eV")]
    pub energy_per_atom: Option<f64>,
    #[serde(rename = "formation_energy_per_atom_eV")]
    pub formation_energy_per_atom: Option<f64>,
    #[serde(rename = "energy_above_hull_eV")]
    pub energy_above_hull: Option<f64>,
    #[serde(rename = "band_gap_eV")]
    pub band_gap: Option<f64>,
    pub is_stable: Option<bool>,
}

impl From<&SummaryDoc> for ReferenceEnergy {
    fn from(doc: &SummaryDoc) -> Self {
        ReferenceEnergy {
            material_id: doc.material_id.clone(),
            formula: doc.formula_pretty.clone(),
            energy_per_atom: doc.energy_per_atom,
            formation_energy_per_atom: doc.formation_energy_per_atom,
            energy_above_hull: doc.energy_above_hull,
            band_gap: doc.band_gap,
            is_stable: doc.is_stable,
        }
    }
}

/// materials/phonon 文档
#[derive(Debug, Clone, Deserialize)]
pub struct PhononDoc {
    pub material_id: Option<String>,
    pub has_imaginary_modes: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhononInfo {
    pub material_id: String,
    pub has_phonon_data: bool,
    pub has_imaginary_modes: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY_JSON: &str = r#"{
        "data": [{
            "material_id": "mp-5229",
            "formula_pretty": "SrTiO3",
            "energy_per_atom": -8.04,
            "energy_above_hull": 0.0,
            "formation_energy_per_atom": -3.5,
            "band_gap": 1.8,
            "is_stable": true,
            "nsites": 5,
            "symmetry": {"symbol": "Pm-3m", "number": 221},
            "is_magnetic": false,
            "structure": {
                "@module": "pymatgen.core.structure",
                "lattice": {"matrix": [[3.9, 0, 0], [0, 3.9, 0], [0, 0, 3.9]], "a": 3.9},
                "sites": [
                    {"species": [{"element": "Sr", "occu": 1}], "abc": [0, 0, 0], "label": "Sr", "properties": {}},
                    {"species": [{"element": "Ti", "occu": 1}], "abc": [0.5, 0.5, 0.5], "label": "Ti",
                     "properties": {"magmom": 0.5}},
                    {"species": [{"element": "O", "occu": 1}], "abc": [0.5, 0.5, 0], "label": "O"},
                    {"species": [{"element": "O", "occu": 1}], "abc": [0.5, 0, 0.5], "label": "O"},
                    {"species": [{"element": "O", "occu": 1}], "abc": [0, 0.5, 0.5], "label": "O"}
                ]
            }
        }],
        "meta": {"total_doc": 1}
    }"#;

    #[test]
    fn test_summary_doc() {
        let resp: Response<SummaryDoc> = serde_json::from_str(SUMMARY_JSON).unwrap();
        let doc = &resp.data[0];
        let summary = MaterialSummary::from(doc);
        assert_eq!(summary.material_id, "mp-5229");
        assert_eq!(summary.spacegroup.as_deref(), Some("Pm-3m"));
        assert_eq!(summary.n_sites, Some(5));

        let reference = ReferenceEnergy::from(doc);
        assert_eq!(reference.energy_per_atom, Some(-8.04));
    }

    #[test]
    fn test_structure_to_crystal() {
        let resp: Response<SummaryDoc> = serde_json::from_str(SUMMARY_JSON).unwrap();
        let crystal = resp.data[0]
            .structure
            .as_ref()
            .unwrap()
            .to_crystal("mp-5229")
            .unwrap();
        assert_eq!(crystal.formula(), "O3SrTi");
        assert_eq!(crystal.atoms[1].magmom, Some(0.5));
        assert_eq!(crystal.atoms[0].label, None);
        assert!((crystal.lattice.volume() - 3.9f64.powi(3)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_response() {
        let resp: Response<SummaryDoc> = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(resp.data.is_empty());
        let resp: Response<SummaryDoc> = serde_json::from_str("{}").unwrap();
        assert!(resp.data.is_empty());
    }
}
