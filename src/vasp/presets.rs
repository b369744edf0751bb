//! # INCAR 预设与标签说明
//!
//! 每种计算类型对应一组固定的 INCAR 标签默认值。预设表和说明表都是
//! 进程级只读常量，首次访问时初始化。
//!
//! ## 依赖关系
//! - 被 `vasp/input_set.rs`, `workflows/` 使用
//! - 纯静态数据

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use once_cell::sync::Lazy;

use crate::error::DftkitError;

/// 计算类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalcType {
    Relax,
    Scf,
    DftPlusU,
    DftD3,
    Phonon,
}

impl CalcType {
    pub const ALL: [CalcType; 5] = [
        CalcType::Relax,
        CalcType::Scf,
        CalcType::DftPlusU,
        CalcType::DftD3,
        CalcType::Phonon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalcType::Relax => "relax",
            CalcType::Scf => "scf",
            CalcType::DftPlusU => "dft_plus_u",
            CalcType::DftD3 => "dft_d3",
            CalcType::Phonon => "phonon",
        }
    }

    /// 该计算类型的默认标签
    pub fn defaults(&self) -> &'static TagSet {
        &PRESETS[self]
    }
}

impl fmt::Display for CalcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalcType {
    type Err = DftkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CalcType::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| DftkitError::UnknownPreset {
                name: s.to_string(),
                valid: CalcType::ALL
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// INCAR 标签值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<IncarValue>),
}

impl IncarValue {
    /// 从命令行字符串推断类型：.TRUE./.FALSE.、整数、浮点、空格分隔列表，其余为字符串
    pub fn parse(s: &str) -> IncarValue {
        let s = s.trim();
        let tokens: Vec<&str> = s.split_whitespace().collect();
        if tokens.len() > 1 {
            return IncarValue::List(tokens.into_iter().map(IncarValue::parse).collect());
        }
        match s.to_ascii_uppercase().trim_matches('.') {
            "TRUE" | "T" => return IncarValue::Bool(true),
            "FALSE" | "F" => return IncarValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = s.parse::<i64>() {
            return IncarValue::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return IncarValue::Float(f);
        }
        IncarValue::Str(s.to_string())
    }
}

impl fmt::Display for IncarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncarValue::Bool(true) => f.write_str(".TRUE."),
            IncarValue::Bool(false) => f.write_str(".FALSE."),
            IncarValue::Int(i) => write!(f, "{}", i),
            IncarValue::Float(x) => f.write_str(&format_float(*x)),
            IncarValue::Str(s) => f.write_str(s),
            IncarValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                f.write_str(&parts.join(" "))
            }
        }
    }
}

impl From<bool> for IncarValue {
    fn from(v: bool) -> Self {
        IncarValue::Bool(v)
    }
}

impl From<i64> for IncarValue {
    fn from(v: i64) -> Self {
        IncarValue::Int(v)
    }
}

impl From<i32> for IncarValue {
    fn from(v: i32) -> Self {
        IncarValue::Int(v as i64)
    }
}

impl From<f64> for IncarValue {
    fn from(v: f64) -> Self {
        IncarValue::Float(v)
    }
}

impl From<&str> for IncarValue {
    fn from(v: &str) -> Self {
        IncarValue::Str(v.to_string())
    }
}

impl From<String> for IncarValue {
    fn from(v: String) -> Self {
        IncarValue::Str(v)
    }
}

impl<T: Into<IncarValue>> From<Vec<T>> for IncarValue {
    fn from(v: Vec<T>) -> Self {
        IncarValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// 浮点数的最短表示
///
/// 指数 < -4 或 >= 16 时用科学计数法（两位指数，如 `1e-06`），
/// 否则为定点形式，整数值保留 `.0`。
pub fn format_float(x: f64) -> String {
    if !x.is_finite() {
        return x.to_string();
    }
    if x == 0.0 {
        return "0.0".to_string();
    }
    let exp = x.abs().log10().floor() as i32;
    if (-4..16).contains(&exp) {
        let s = format!("{}", x);
        if s.contains('.') {
            s
        } else {
            format!("{}.0", s)
        }
    } else {
        let s = format!("{:e}", x);
        match s.split_once('e') {
            Some((mantissa, e)) => {
                let e: i32 = e.parse().unwrap_or(0);
                let sign = if e < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, e.abs())
            }
            None => s,
        }
    }
}

/// 有序的 INCAR 标签集合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(IndexMap<String, IncarValue>);

impl TagSet {
    pub fn new() -> Self {
        TagSet(IndexMap::new())
    }

    /// 合并默认值与覆盖项
    ///
    /// 已有标签原位替换，新标签按覆盖项的顺序追加在末尾。
    pub fn resolve(defaults: &TagSet, overrides: &TagSet) -> TagSet {
        let mut merged = defaults.clone();
        for (tag, value) in overrides.iter() {
            merged.insert(tag, value.clone());
        }
        merged
    }

    pub fn insert(&mut self, tag: impl Into<String>, value: impl Into<IncarValue>) {
        self.0.insert(tag.into().to_ascii_uppercase(), value.into());
    }

    pub fn get(&self, tag: &str) -> Option<&IncarValue> {
        self.0.get(&tag.to_ascii_uppercase())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains_key(&tag.to_ascii_uppercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IncarValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 所有值格式化为字符串，写入 calc_info.json
    pub fn formatted(&self) -> IndexMap<String, String> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<IncarValue>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = TagSet::new();
        for (k, v) in iter {
            tags.insert(k, v);
        }
        tags
    }
}

fn relax_tags() -> TagSet {
    let mut t = TagSet::new();
    t.insert("PREC", "Accurate");
    t.insert("ENCUT", 520);
    t.insert("EDIFF", 1e-6);
    t.insert("EDIFFG", -0.01);
    t.insert("IBRION", 2);
    t.insert("ISIF", 3);
    t.insert("NSW", 100);
    t.insert("ISMEAR", 0);
    t.insert("SIGMA", 0.05);
    t.insert("LREAL", "Auto");
    t.insert("LWAVE", false);
    t.insert("LCHARG", false);
    t.insert("NELM", 200);
    t
}

/// 预设表
pub static PRESETS: Lazy<HashMap<CalcType, TagSet>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert(CalcType::Relax, relax_tags());

    let mut scf = TagSet::new();
    scf.insert("PREC", "Accurate");
    scf.insert("ENCUT", 520);
    scf.insert("EDIFF", 1e-6);
    scf.insert("IBRION", -1);
    scf.insert("NSW", 0);
    scf.insert("ISMEAR", 0);
    scf.insert("SIGMA", 0.05);
    scf.insert("LREAL", "Auto");
    scf.insert("LWAVE", true);
    scf.insert("LCHARG", true);
    scf.insert("NELM", 200);
    m.insert(CalcType::Scf, scf);

    // LDAUL/LDAUU/LDAUJ 由工作流按元素顺序设置
    let mut plus_u = relax_tags();
    plus_u.insert("LDAU", true);
    plus_u.insert("LDAUTYPE", 2);
    plus_u.insert("LDAUPRINT", 2);
    m.insert(CalcType::DftPlusU, plus_u);

    let mut d3 = relax_tags();
    d3.insert("IVDW", 12);
    m.insert(CalcType::DftD3, d3);

    let mut phonon = TagSet::new();
    phonon.insert("PREC", "Accurate");
    phonon.insert("ENCUT", 520);
    phonon.insert("EDIFF", 1e-8);
    phonon.insert("IBRION", -1);
    phonon.insert("NSW", 0);
    phonon.insert("ISMEAR", 0);
    phonon.insert("SIGMA", 0.05);
    phonon.insert("LREAL", false);
    phonon.insert("LWAVE", false);
    phonon.insert("LCHARG", false);
    phonon.insert("NELM", 300);
    m.insert(CalcType::Phonon, phonon);

    m
});

/// 标签说明，写入 INCAR 行尾注释
pub static TAG_COMMENTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("PREC", "Precision: Accurate gives good cutoff & FFT grid"),
        ("ENCUT", "Plane-wave energy cutoff (eV).  Rule: 1.3x max ENMAX in POTCAR"),
        ("EDIFF", "SCF energy convergence (eV).  1e-6 is standard"),
        ("EDIFFG", "Ionic convergence.  Negative = force criterion (eV/A)"),
        ("IBRION", "Relaxation algo: 2=CG, 1=quasi-Newton, -1=single point"),
        ("ISIF", "Stress tensor: 3=relax all, 2=fix cell, 0=fix cell+volume"),
        ("NSW", "Max number of ionic steps"),
        ("ISMEAR", "Smearing: 0=Gaussian (insulator), 1=MP (metal), -5=tetrahedron"),
        ("SIGMA", "Smearing width (eV).  Entropy term T*S should be < 1 meV/atom"),
        ("LREAL", "Real-space projectors: Auto or False for small cells"),
        ("LWAVE", "Write WAVECAR? True only if you need it for post-processing"),
        ("LCHARG", "Write CHGCAR? True for DOS, band structure, Bader"),
        ("NELM", "Max electronic (SCF) iterations"),
        ("LDAU", "Activate on-site Coulomb correction (DFT+U)"),
        ("LDAUTYPE", "DFT+U flavour: 2=Dudarev (U_eff = U - J)"),
        ("LDAUL", "Angular momentum for +U: -1=off, 2=d-electrons, 3=f-electrons"),
        ("LDAUU", "U parameter (eV) for each species"),
        ("LDAUJ", "J parameter (eV) for each species"),
        ("LDAUPRINT", "Print occupancy matrices (2=verbose)"),
        ("IVDW", "vdW correction: 11=D3(zero), 12=D3(BJ), 20=TS"),
        ("ISPIN", "1=non-spin-polarized, 2=spin-polarized"),
        ("MAGMOM", "Initial magnetic moments per atom"),
        ("LDIPOL", "Dipole correction for asymmetric slabs"),
        ("IDIPOL", "Dipole direction: 3=along c (surface normal)"),
    ])
});

/// 标签说明
pub fn tag_comment(tag: &str) -> Option<&'static str> {
    TAG_COMMENTS.get(tag.to_ascii_uppercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_type_roundtrip_and_unknown() {
        for c in CalcType::ALL {
            assert_eq!(c.as_str().parse::<CalcType>().unwrap(), c);
        }
        let err = "md".parse::<CalcType>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'md'"));
        assert!(msg.contains("relax, scf, dft_plus_u, dft_d3, phonon"));
    }

    #[test]
    fn test_preset_order_starts_with_prec_encut() {
        for c in CalcType::ALL {
            let keys: Vec<&String> = c.defaults().iter().map(|(k, _)| k).collect();
            assert_eq!(keys[0], "PREC");
            assert_eq!(keys[1], "ENCUT");
        }
        let plus_u: Vec<&String> = CalcType::DftPlusU.defaults().iter().map(|(k, _)| k).collect();
        assert_eq!(plus_u.last().unwrap().as_str(), "LDAUPRINT");
        assert_eq!(CalcType::DftD3.defaults().get("IVDW"), Some(&IncarValue::Int(12)));
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1e-6), "1e-06");
        assert_eq!(format_float(1e-8), "1e-08");
        assert_eq!(format_float(-0.01), "-0.01");
        assert_eq!(format_float(0.05), "0.05");
        assert_eq!(format_float(520.0), "520.0");
        assert_eq!(format_float(6.2), "6.2");
        assert_eq!(format_float(-2.0), "-2.0");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(1.5e16), "1.5e+16");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(IncarValue::Bool(true).to_string(), ".TRUE.");
        assert_eq!(IncarValue::Bool(false).to_string(), ".FALSE.");
        assert_eq!(IncarValue::Int(520).to_string(), "520");
        assert_eq!(IncarValue::from(vec![2, -1]).to_string(), "2 -1");
        assert_eq!(IncarValue::from(vec![6.2, 0.0]).to_string(), "6.2 0.0");
    }

    #[test]
    fn test_value_parse() {
        assert_eq!(IncarValue::parse(".TRUE."), IncarValue::Bool(true));
        assert_eq!(IncarValue::parse("F"), IncarValue::Bool(false));
        assert_eq!(IncarValue::parse("400"), IncarValue::Int(400));
        assert_eq!(IncarValue::parse("1e-5"), IncarValue::Float(1e-5));
        assert_eq!(IncarValue::parse("Auto"), IncarValue::Str("Auto".into()));
        assert_eq!(
            IncarValue::parse("2 -1"),
            IncarValue::List(vec![IncarValue::Int(2), IncarValue::Int(-1)])
        );
    }

    #[test]
    fn test_resolve_overrides_in_place_and_appends() {
        let defaults = CalcType::Relax.defaults();
        let overrides: TagSet = [("ISIF", IncarValue::Int(2)), ("LDIPOL", IncarValue::Bool(true))]
            .into_iter()
            .collect();
        let merged = TagSet::resolve(defaults, &overrides);

        assert_eq!(merged.len(), defaults.len() + 1);
        let keys: Vec<&String> = merged.iter().map(|(k, _)| k).collect();
        assert_eq!(keys[5], "ISIF");
        assert_eq!(keys.last().unwrap().as_str(), "LDIPOL");
        assert_eq!(merged.get("ISIF"), Some(&IncarValue::Int(2)));
        // 预设本身不变
        assert_eq!(defaults.get("ISIF"), Some(&IncarValue::Int(3)));
    }

    #[test]
    fn test_tag_comment_lookup() {
        assert!(tag_comment("encut").unwrap().starts_with("Plane-wave"));
        assert!(tag_comment("NPAR").is_none());
    }
}
