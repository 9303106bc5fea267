//! # 晶体骨架 (skeleton) 数据模型
//!
//! 对应 OLCAO `.skl` 文件：标题、晶格参数、分数坐标原子列表、空间群、
//! 超胞倍数以及 full/prim 模式。从文件解析一次后不再修改。
//!
//! ## 依赖关系
//! - 被 `parsers/skeleton.rs`, `planner/` 使用
//! - 无外部模块依赖

use serde::{Deserialize, Serialize};
use std::fmt;

/// 晶格参数 (a, b, c, alpha, beta, gamma)，长度 > 0，角度单位：度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Lattice {
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Lattice {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        }
    }

    /// 检查长度为正、角度在 (0, 180) 内且能围成体积为正的晶胞，返回第一个不合法的描述
    pub fn check(&self) -> Option<String> {
        for (name, v) in [("a", self.a), ("b", self.b), ("c", self.c)] {
            if !(v.is_finite() && v > 0.0) {
                return Some(format!("lattice length {} must be > 0, got {}", name, v));
            }
        }
        for (name, v) in [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("gamma", self.gamma),
        ] {
            if !(v.is_finite() && v > 0.0 && v < 180.0) {
                return Some(format!(
                    "lattice angle {} must be in (0, 180) degrees, got {}",
                    name, v
                ));
            }
        }
        let volume = self.volume();
        if !(volume.is_finite() && volume > 0.0) {
            return Some(format!(
                "lattice angles {} {} {} do not form a cell",
                self.alpha, self.beta, self.gamma
            ));
        }
        None
    }

    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    pub fn vectors(&self) -> [[f64; 3]; 3] {
        let cos_alpha = self.alpha.to_radians().cos();
        let cos_beta = self.beta.to_radians().cos();
        let gamma_rad = self.gamma.to_radians();
        let cos_gamma = gamma_rad.cos();
        let sin_gamma = gamma_rad.sin();

        let a_vec = [self.a, 0.0, 0.0];
        let b_vec = [self.b * cos_gamma, self.b * sin_gamma, 0.0];

        let c1 = self.c * cos_beta;
        let c2 = self.c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3 = (self.c * self.c - c1 * c1 - c2 * c2).sqrt();

        [a_vec, b_vec, [c1, c2, c3]]
    }

    /// 计算晶格体积
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.vectors();
        a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0])
    }
}

/// 原子信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
        }
    }
}

/// 晶胞模式：完整晶胞或原胞
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellMode {
    Full,
    Prim,
}

impl fmt::Display for CellMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellMode::Full => write!(f, "full"),
            CellMode::Prim => write!(f, "prim"),
        }
    }
}

/// 晶体骨架描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDescriptor {
    /// 标题（可多行）
    pub title: String,

    /// 晶格
    pub lattice: Lattice,

    /// 原子列表（保持文件中的顺序）
    pub atoms: Vec<Atom>,

    /// 空间群标识
    pub space_group: String,

    /// 超胞倍数
    pub supercell: [u32; 3],

    pub cell_mode: CellMode,
}

impl StructureDescriptor {
    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }

        counts
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_volume_cubic() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        assert!((lattice.volume().abs() - 125.0).abs() < 1e-6);
    }

    #[test]
    fn test_lattice_vectors_hexagonal() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0);
        let [a, b, c] = lattice.vectors();
        assert!((a[0] - 3.0).abs() < 1e-9);
        assert!((b[0] + 1.5).abs() < 1e-9);
        assert!((c[2] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_lattice_check() {
        assert!(Lattice::from_parameters(1.0, 1.0, 1.0, 90.0, 90.0, 90.0)
            .check()
            .is_none());
        assert!(Lattice::from_parameters(0.0, 1.0, 1.0, 90.0, 90.0, 90.0)
            .check()
            .is_some());
        assert!(Lattice::from_parameters(1.0, 1.0, 1.0, 90.0, 180.0, 90.0)
            .check()
            .is_some());
        assert!(Lattice::from_parameters(3.0, 3.0, 3.0, 10.0, 10.0, 170.0)
            .check()
            .is_some());
        assert!(Lattice::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0)
            .check()
            .is_none());
    }

    #[test]
    fn test_formula() {
        let structure = StructureDescriptor {
            title: "NaCl".to_string(),
            lattice: Lattice::from_parameters(5.64, 5.64, 5.64, 90.0, 90.0, 90.0),
            atoms: vec![
                Atom::new("Na", [0.0, 0.0, 0.0]),
                Atom::new("Cl", [0.5, 0.5, 0.5]),
                Atom::new("Na", [0.5, 0.5, 0.0]),
            ],
            space_group: "1_a".to_string(),
            supercell: [1, 1, 1],
            cell_mode: CellMode::Full,
        };
        assert_eq!(structure.formula(), "ClNa2");
        assert_eq!(structure.num_atoms(), 3);
    }
}
