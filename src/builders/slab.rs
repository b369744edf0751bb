//! # 表面 slab 构建
//!
//! 按 Miller 指数切割体相晶体，生成带真空层的 slab 超胞。流程：
//!
//! 1. Miller 指数约去最大公约数
//! 2. 构造面内整数基矢（零分量对应的晶格矢量，以及非零分量两两的
//!    最小公倍数组合）和堆垛矢量（与晶面法向夹角最小的晶格矢量）
//! 3. 以该整数矩阵做超胞得到取向晶胞
//! 4. 将取向晶胞中的原子按法向高度聚类，取相邻层之间的中点作为可能的
//!    截断位置，使用第一个
//! 5. 堆叠 `ceil(min_slab / h)` 个取向晶胞，再留出 `ceil(min_vacuum / h)`
//!    个晶胞高度的真空
//! 6. c 轴改为沿表面法向，并旋转到标准取向（a 沿 x，c 沿 z）
//!
//! ## 依赖关系
//! - 被 `workflows/surface.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{DftkitError, Result};
use crate::models::structure::{cross, dot, norm};
use crate::models::{Atom, Crystal, Lattice};

/// 层聚类容差 (Å)
const LAYER_TOL: f64 = 0.1;

/// 分数坐标折回容差
const FRAC_TOL: f64 = 1e-8;

fn gcd(a: i32, b: i32) -> i32 {
    let mut a = a.abs();
    let mut b = b.abs();
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn lcm(a: i32, b: i32) -> i32 {
    if a == 0 || b == 0 {
        return 0;
    }
    (a / gcd(a, b) * b).abs()
}

/// 约化 Miller 指数
pub fn reduce_miller(miller: [i32; 3]) -> Result<[i32; 3]> {
    let g = gcd(gcd(miller[0], miller[1]), miller[2]);
    if g == 0 {
        return Err(DftkitError::NoSlabGenerated {
            h: miller[0],
            k: miller[1],
            l: miller[2],
        });
    }
    Ok(miller.map(|m| m / g))
}

/// 取向晶胞的整数变换矩阵，行依次为两个面内矢量和堆垛矢量
fn surface_basis(lattice: &Lattice, miller: [i32; 3]) -> [[i32; 3]; 3] {
    let recip = lattice.reciprocal();
    let normal_raw = [0, 1, 2].map(|j| {
        (0..3).map(|i| miller[i] as f64 * recip[i][j]).sum::<f64>()
    });
    let n_len = norm(normal_raw);
    let normal = normal_raw.map(|x| x / n_len);

    let mut in_plane: Vec<[i32; 3]> = Vec::new();
    let mut nonzero: Vec<usize> = Vec::new();
    for (i, &m) in miller.iter().enumerate() {
        if m == 0 {
            let mut e = [0; 3];
            e[i] = 1;
            in_plane.push(e);
        } else {
            nonzero.push(i);
        }
    }

    // 非零分量两两组合：d[i] = L/m_i, d[j] = -L/m_j，满足 d·m = 0
    if nonzero.len() > 1 {
        let l = nonzero.iter().fold(1, |acc, &i| lcm(acc, miller[i]));
        'pairs: for (p, &i) in nonzero.iter().enumerate() {
            for &j in &nonzero[p + 1..] {
                let mut d = [0; 3];
                d[i] = l / miller[i];
                d[j] = -l / miller[j];
                in_plane.push(d);
                if in_plane.len() == 2 {
                    break 'pairs;
                }
            }
        }
    }

    // 堆垛矢量：与法向最接近平行的晶格矢量
    let c_index = nonzero
        .iter()
        .copied()
        .max_by(|&i, &j| {
            let ci = dot(lattice.matrix[i], normal).abs() / norm(lattice.matrix[i]);
            let cj = dot(lattice.matrix[j], normal).abs() / norm(lattice.matrix[j]);
            // 并列时取较小的索引
            ci.partial_cmp(&cj).unwrap_or(std::cmp::Ordering::Equal).then(j.cmp(&i))
        })
        .unwrap_or(2);
    let mut stack = [0; 3];
    stack[c_index] = if miller[c_index] < 0 { -1 } else { 1 };

    let mut basis = [in_plane[0], in_plane[1], stack];
    if det_i(&basis) < 0 {
        basis[0] = basis[0].map(|x| -x);
    }
    basis
}

fn det_i(m: &[[i32; 3]; 3]) -> i32 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn inverse(m: [[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let det = dot(m[0], cross(m[1], m[2]));
    let c0 = cross(m[1], m[2]);
    let c1 = cross(m[2], m[0]);
    let c2 = cross(m[0], m[1]);
    // 逆矩阵的列为 c_i / det
    [
        [c0[0] / det, c1[0] / det, c2[0] / det],
        [c0[1] / det, c1[1] / det, c2[1] / det],
        [c0[2] / det, c1[2] / det, c2[2] / det],
    ]
}

fn wrap(x: f64) -> f64 {
    let w = x - x.floor();
    if w > 1.0 - FRAC_TOL {
        0.0
    } else {
        w
    }
}

/// 以整数矩阵构造超胞（新晶格行 = M · 旧晶格行）
pub fn make_supercell(crystal: &Crystal, m: [[i32; 3]; 3]) -> Crystal {
    let mf = m.map(|row| row.map(|x| x as f64));
    let inv = inverse(mf);

    let new_rows = [0, 1, 2].map(|r| {
        [0, 1, 2].map(|j| (0..3).map(|k| mf[r][k] * crystal.lattice.matrix[k][j]).sum::<f64>())
    });

    // 新晶胞的角顶在旧分数坐标下的范围
    let mut lo = [0i32; 3];
    let mut hi = [0i32; 3];
    for corner in 0..8 {
        let s = [corner & 1, (corner >> 1) & 1, (corner >> 2) & 1].map(|b| b as f64);
        for j in 0..3 {
            let v: f64 = (0..3).map(|r| s[r] * mf[r][j]).sum();
            lo[j] = lo[j].min(v.floor() as i32);
            hi[j] = hi[j].max(v.ceil() as i32);
        }
    }

    let mut atoms = Vec::new();
    for atom in &crystal.atoms {
        for tx in lo[0]..=hi[0] {
            for ty in lo[1]..=hi[1] {
                for tz in lo[2]..=hi[2] {
                    let f = [
                        atom.position[0] + tx as f64,
                        atom.position[1] + ty as f64,
                        atom.position[2] + tz as f64,
                    ];
                    let p = [0, 1, 2].map(|j| (0..3).map(|k| f[k] * inv[k][j]).sum::<f64>());
                    if p.iter().all(|&x| x > -FRAC_TOL && x < 1.0 - FRAC_TOL) {
                        let mut image = atom.clone();
                        image.position = p.map(wrap);
                        atoms.push(image);
                    }
                }
            }
        }
    }

    let mut supercell = Crystal::new(crystal.name.clone(), Lattice::from_vectors(new_rows), atoms);
    supercell.pbc = crystal.pbc;
    supercell
}

/// 可能的截断位置（取向晶胞 c 方向的分数高度），升序
pub fn termination_shifts(z: &[f64], height: f64) -> Vec<f64> {
    if z.is_empty() {
        return Vec::new();
    }
    let mut sorted: Vec<f64> = z.iter().map(|&v| wrap(v)).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    // 单链聚类
    let mut clusters: Vec<Vec<f64>> = vec![vec![sorted[0]]];
    for w in sorted.windows(2) {
        match clusters.last_mut() {
            Some(c) if (w[1] - w[0]) * height < LAYER_TOL => c.push(w[1]),
            _ => clusters.push(vec![w[1]]),
        }
    }
    // 跨越周期边界的首尾两簇合并
    if clusters.len() > 1 {
        let first = clusters[0][0];
        let last = *clusters[clusters.len() - 1].last().unwrap_or(&first);
        if (first + 1.0 - last) * height < LAYER_TOL {
            let head = clusters.remove(0);
            if let Some(tail) = clusters.last_mut() {
                tail.extend(head.into_iter().map(|v| v + 1.0));
            }
        }
    }

    let mut centers: Vec<f64> = clusters
        .iter()
        .map(|c| wrap(c.iter().sum::<f64>() / c.len() as f64))
        .collect();
    centers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut shifts: Vec<f64> = centers
        .windows(2)
        .map(|w| (w[0] + w[1]) / 2.0)
        .collect();
    shifts.push(wrap((centers[centers.len() - 1] + centers[0] + 1.0) / 2.0));
    shifts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    shifts
}

/// 切割表面 slab
///
/// 返回的 slab：c 轴垂直于表面，真空沿 c 方向；原子按元素首次出现
/// 顺序分组，组内按高度排序。
pub fn build_surface_slab(
    bulk: &Crystal,
    miller: [i32; 3],
    min_slab_size: f64,
    min_vacuum_size: f64,
    center_slab: bool,
) -> Result<Crystal> {
    let no_slab = || DftkitError::NoSlabGenerated {
        h: miller[0],
        k: miller[1],
        l: miller[2],
    };
    let hkl = reduce_miller(miller)?;
    if bulk.is_empty() || !(min_slab_size > 0.0) || min_vacuum_size < 0.0 {
        return Err(no_slab());
    }

    let basis = surface_basis(&bulk.lattice, hkl);
    let oriented = make_supercell(bulk, basis);
    let [a, b, c] = oriented.lattice.matrix;
    let ab = cross(a, b);
    let normal = ab.map(|x| x / norm(ab));
    // 取向晶胞沿法向的高度
    let height = dot(c, normal);

    let z: Vec<f64> = oriented.atoms.iter().map(|at| at.position[2]).collect();
    let shifts = termination_shifts(&z, height);
    let shift = *shifts.first().ok_or_else(no_slab)?;

    let n_slab = (min_slab_size / height).ceil().max(1.0) as usize;
    let n_vac = (min_vacuum_size / height).ceil() as usize;
    let n_total = (n_slab + n_vac) as f64;

    log::debug!(
        "slab ({} {} {}): basis {:?}, h = {:.3} A, shift = {:.4}, {} + {} layers",
        hkl[0],
        hkl[1],
        hkl[2],
        basis,
        height,
        shift,
        n_slab,
        n_vac
    );

    let mut atoms: Vec<Atom> = Vec::with_capacity(oriented.len() * n_slab);
    for layer in 0..n_slab {
        for atom in &oriented.atoms {
            let mut image = atom.clone();
            let zs = wrap(atom.position[2] - shift);
            image.position[2] = (zs + layer as f64) / n_total;
            atoms.push(image);
        }
    }

    if center_slab {
        let avg = atoms.iter().map(|at| at.position[2]).sum::<f64>() / atoms.len() as f64;
        for at in atoms.iter_mut() {
            at.position[2] += 0.5 - avg;
        }
    }

    // c 沿法向：面内分量变化只影响 x, y 分数坐标
    let c_new = normal.map(|x| x * height * n_total);
    let old_lattice = Lattice::from_vectors([a, b, c.map(|x| x * n_total)]);
    let ortho = Lattice::from_vectors([a, b, c_new]);
    for at in atoms.iter_mut() {
        let cart = old_lattice.to_cartesian(at.position);
        let f = ortho.to_fractional(cart);
        at.position = [wrap(f[0]), wrap(f[1]), f[2]];
    }

    let (la, lb, lc, alpha, beta, gamma) = ortho.parameters();
    let lattice = Lattice::from_parameters(la, lb, lc, alpha, beta, gamma);

    let order = bulk.species_order();
    atoms.sort_by(|x, y| {
        let ix = order.iter().position(|s| *s == x.element);
        let iy = order.iter().position(|s| *s == y.element);
        ix.cmp(&iy).then(
            x.position[2]
                .partial_cmp(&y.position[2])
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });

    let mut slab = Crystal::new(
        format!("{}_{}{}{}_slab", bulk.name, hkl[0], hkl[1], hkl[2]),
        lattice,
        atoms,
    );
    slab.pbc = bulk.pbc;
    Ok(slab)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{build_graphite, build_perovskite, build_rocksalt};

    #[test]
    fn test_reduce_miller() {
        assert_eq!(reduce_miller([2, 2, 0]).unwrap(), [1, 1, 0]);
        assert_eq!(reduce_miller([0, 0, -3]).unwrap(), [0, 0, -1]);
        assert!(reduce_miller([0, 0, 0]).is_err());
    }

    #[test]
    fn test_make_supercell_preserves_density() {
        let bulk = build_perovskite("Sr", "Ti", 3.905);
        let sc = make_supercell(&bulk, [[1, -1, 0], [1, 1, 0], [0, 0, 1]]);
        assert_eq!(sc.len(), 10);
        assert!((sc.lattice.volume() - 2.0 * bulk.lattice.volume()).abs() < 1e-9);
    }

    #[test]
    fn test_termination_shifts_two_layers() {
        let shifts = termination_shifts(&[0.0, 0.0, 0.5, 0.5, 0.5], 3.905);
        assert_eq!(shifts.len(), 2);
        assert!((shifts[0] - 0.25).abs() < 1e-12);
        assert!((shifts[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_termination_shifts_merge_across_boundary() {
        let shifts = termination_shifts(&[0.001, 0.999, 0.5], 4.0);
        assert_eq!(shifts.len(), 2);
    }

    #[test]
    fn test_perovskite_100_slab() {
        let bulk = build_perovskite("Sr", "Ti", 3.905);
        let slab = build_surface_slab(&bulk, [1, 0, 0], 10.0, 15.0, true).unwrap();

        // ceil(10 / 3.905) = 3 层取向晶胞
        assert_eq!(slab.len(), 15);
        assert_eq!(slab.formula(), "O9Sr3Ti3");
        assert!(slab.species_contiguous());

        // c 沿 z，且长度 = (3 + 4) * a
        let m = slab.lattice.matrix;
        assert!(m[2][0].abs() < 1e-9 && m[2][1].abs() < 1e-9);
        assert!((m[2][2] - 7.0 * 3.905).abs() < 1e-9);

        // 居中后平均高度为 0.5
        let avg: f64 = slab.atoms.iter().map(|a| a.position[2]).sum::<f64>() / slab.len() as f64;
        assert!((avg - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_perovskite_110_and_111_slabs() {
        let bulk = build_perovskite("Sr", "Ti", 3.905);
        for miller in [[1, 1, 0], [1, 1, 1]] {
            let slab = build_surface_slab(&bulk, miller, 10.0, 15.0, true).unwrap();
            assert!(!slab.is_empty());
            assert_eq!(slab.len() % 5, 0);
            let m = slab.lattice.matrix;
            assert!(m[2][0].abs() < 1e-9 && m[2][1].abs() < 1e-9);
        }
    }

    #[test]
    fn test_rocksalt_and_graphite_slabs() {
        let nio = build_rocksalt("Ni", "O", 4.177);
        let slab = build_surface_slab(&nio, [1, 0, 0], 8.0, 10.0, false).unwrap();
        let ni = slab.atoms.iter().filter(|a| a.element == "Ni").count();
        assert_eq!(ni * 2, slab.len());

        let graphite = build_graphite(2.464, 6.711).unwrap();
        let slab = build_surface_slab(&graphite, [0, 0, 1], 10.0, 15.0, true).unwrap();
        // ceil(10 / 6.711) = 2 个晶胞
        assert_eq!(slab.len(), 8);
    }

    #[test]
    fn test_zero_miller_index() {
        let bulk = build_perovskite("Sr", "Ti", 3.905);
        let err = build_surface_slab(&bulk, [0, 0, 0], 10.0, 15.0, true).unwrap_err();
        assert!(matches!(err, DftkitError::NoSlabGenerated { .. }));
    }
}
