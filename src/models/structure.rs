//! # 晶体结构数据模型
//!
//! 定义统一的晶体结构表示。构建器产生 `Crystal`，输入生成器持有其副本，
//! 因此下游的修改（如添加选择性动力学）不会影响构建器的原始结构。
//!
//! ## 依赖关系
//! - 被 `builders/`, `parsers/`, `vasp/`, `workflows/` 使用
//! - 无外部模块依赖

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 晶格参数表示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// 从晶格参数 (a, b, c, alpha, beta, gamma) 创建晶格
    /// 角度单位：度
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let alpha_rad = alpha.to_radians();
        let beta_rad = beta.to_radians();
        let gamma_rad = gamma.to_radians();

        let cos_alpha = alpha_rad.cos();
        let cos_beta = beta_rad.cos();
        let cos_gamma = gamma_rad.cos();
        let sin_gamma = gamma_rad.sin();

        let a_vec = [a, 0.0, 0.0];
        let b_vec = [b * cos_gamma, b * sin_gamma, 0.0];

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3 = (c * c - c1 * c1 - c2 * c2).sqrt();
        let c_vec = [c1, c2, c3];

        Lattice {
            matrix: [a_vec, b_vec, c_vec],
        }
    }

    /// 从晶格向量矩阵创建
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice { matrix }
    }

    /// 立方晶格
    pub fn cubic(a: f64) -> Self {
        Lattice::from_vectors([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]])
    }

    /// 六方晶格 (a, a, c, 90°, 90°, 120°)
    pub fn hexagonal(a: f64, c: f64) -> Self {
        Lattice::from_parameters(a, a, c, 90.0, 90.0, 120.0)
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let [a_vec, b_vec, c_vec] = self.matrix;

        let a = norm(a_vec);
        let b = norm(b_vec);
        let c = norm(c_vec);

        let alpha = (dot(b_vec, c_vec) / (b * c)).acos().to_degrees();
        let beta = (dot(a_vec, c_vec) / (a * c)).acos().to_degrees();
        let gamma = (dot(a_vec, b_vec) / (a * b)).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 计算晶格体积（带符号的行列式）
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.matrix;
        dot(a, cross(b, c))
    }

    /// 倒格子（不含 2π 因子），行向量 b_i 满足 a_i · b_j = δ_ij
    pub fn reciprocal(&self) -> [[f64; 3]; 3] {
        let [a, b, c] = self.matrix;
        let vol = self.volume();
        let b1 = cross(b, c);
        let b2 = cross(c, a);
        let b3 = cross(a, b);
        [
            b1.map(|x| x / vol),
            b2.map(|x| x / vol),
            b3.map(|x| x / vol),
        ]
    }

    /// 含 2π 因子的倒格矢长度 |2π·b_i|
    pub fn reciprocal_lengths(&self) -> [f64; 3] {
        self.reciprocal().map(|row| 2.0 * PI * norm(row))
    }

    /// 分数坐标转笛卡尔坐标
    pub fn to_cartesian(&self, frac: [f64; 3]) -> [f64; 3] {
        let m = self.matrix;
        [
            frac[0] * m[0][0] + frac[1] * m[1][0] + frac[2] * m[2][0],
            frac[0] * m[0][1] + frac[1] * m[1][1] + frac[2] * m[2][1],
            frac[0] * m[0][2] + frac[1] * m[1][2] + frac[2] * m[2][2],
        ]
    }

    /// 笛卡尔坐标转分数坐标
    pub fn to_fractional(&self, cart: [f64; 3]) -> [f64; 3] {
        // frac_j = cart · b_j
        let recip = self.reciprocal();
        [dot(cart, recip[0]), dot(cart, recip[1]), dot(cart, recip[2])]
    }
}

/// 原子信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],

    /// 可选：原子标签（用于区分同种元素的不同位置）
    pub label: Option<String>,

    /// 初始磁矩 (μB)
    pub magmom: Option<f64>,

    /// 选择性动力学标志，true 表示该方向可弛豫
    pub selective_dynamics: Option<[bool; 3]>,
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
            label: None,
            magmom: None,
            selective_dynamics: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_magmom(mut self, magmom: f64) -> Self {
        self.magmom = Some(magmom);
        self
    }
}

/// 晶体结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crystal {
    /// 结构名称
    pub name: String,

    /// 晶格
    pub lattice: Lattice,

    /// 原子列表（顺序即 POSCAR 中的顺序）
    pub atoms: Vec<Atom>,

    /// 周期性边界条件
    pub pbc: [bool; 3],

    /// 来源文件格式
    pub source_format: Option<String>,
}

impl Crystal {
    pub fn new(name: impl Into<String>, lattice: Lattice, atoms: Vec<Atom>) -> Self {
        Crystal {
            name: name.into(),
            lattice,
            atoms,
            pbc: [true; 3],
            source_format: None,
        }
    }

    /// 原子数
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// 计算化学式（Hill 规则：含碳时 C、H 在前，其余按字母序）
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }

        let mut ordered: Vec<(&str, usize)> = Vec::with_capacity(counts.len());
        if counts.contains_key("C") {
            for first in ["C", "H"] {
                if let Some(n) = counts.remove(first) {
                    ordered.push((first, n));
                }
            }
        }
        ordered.extend(counts);

        ordered
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// 元素符号列表（按原子顺序）
    pub fn symbols(&self) -> Vec<&str> {
        self.atoms.iter().map(|a| a.element.as_str()).collect()
    }

    /// 不重复的元素列表，按首次出现顺序
    pub fn species_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for atom in &self.atoms {
            if !order.contains(&atom.element) {
                order.push(atom.element.clone());
            }
        }
        order
    }

    /// 同种元素是否都连续排列（POSCAR 中每种元素只出现一次）
    pub fn species_contiguous(&self) -> bool {
        runs(&self.atoms).len() == self.species_order().len()
    }

    /// 按首次出现的元素顺序稳定重排原子
    pub fn group_by_species(&mut self) {
        let order = self.species_order();
        self.atoms.sort_by_key(|a| {
            order
                .iter()
                .position(|s| *s == a.element)
                .unwrap_or(usize::MAX)
        });
    }

    /// 所有原子的笛卡尔坐标
    pub fn cartesian_positions(&self) -> Vec<[f64; 3]> {
        self.atoms
            .iter()
            .map(|a| self.lattice.to_cartesian(a.position))
            .collect()
    }

    /// 构建 nx × ny × nz 超胞
    ///
    /// 原子顺序为"像优先"：先排完第一个像中的全部原子，再排下一个像。
    pub fn repeat(&self, dims: [usize; 3]) -> Crystal {
        let [nx, ny, nz] = dims;
        let m = self.lattice.matrix;
        let matrix = [
            m[0].map(|x| x * nx as f64),
            m[1].map(|x| x * ny as f64),
            m[2].map(|x| x * nz as f64),
        ];

        let mut atoms = Vec::with_capacity(self.atoms.len() * nx * ny * nz);
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    for atom in &self.atoms {
                        let mut image = atom.clone();
                        image.position = [
                            (atom.position[0] + i as f64) / nx as f64,
                            (atom.position[1] + j as f64) / ny as f64,
                            (atom.position[2] + k as f64) / nz as f64,
                        ];
                        atoms.push(image);
                    }
                }
            }
        }

        let mut supercell = Crystal::new(self.name.clone(), Lattice::from_vectors(matrix), atoms);
        supercell.pbc = self.pbc;
        supercell
    }

    /// 设置每个原子的初始磁矩
    pub fn set_initial_magnetic_moments(&mut self, magmoms: &[f64]) {
        for (atom, &m) in self.atoms.iter_mut().zip(magmoms) {
            atom.magmom = Some(m);
        }
    }

    /// 每个原子的初始磁矩（未设置视为 0）
    pub fn initial_magnetic_moments(&self) -> Vec<f64> {
        self.atoms.iter().map(|a| a.magmom.unwrap_or(0.0)).collect()
    }

    /// 是否存在非零初始磁矩
    pub fn has_magnetic_moments(&self) -> bool {
        self.atoms.iter().any(|a| a.magmom.map_or(false, |m| m != 0.0))
    }

    /// 是否设置了选择性动力学
    pub fn has_selective_dynamics(&self) -> bool {
        self.atoms.iter().any(|a| a.selective_dynamics.is_some())
    }
}

/// 连续同种元素的分段 (元素, 数量)
pub fn runs(atoms: &[Atom]) -> Vec<(String, usize)> {
    let mut runs: Vec<(String, usize)> = Vec::new();
    for atom in atoms {
        match runs.last_mut() {
            Some((el, n)) if *el == atom.element => *n += 1,
            _ => runs.push((atom.element.clone(), 1)),
        }
    }
    runs
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}
