//! # OLCAO .skl 骨架格式解析器
//!
//! ## .skl 格式说明
//! ```text
//! title
//! Diamond structure
//! end
//! cell
//! 3.56679 3.56679 3.56679 90.0 90.0 90.0
//! fractional 2
//! C 0.00 0.00 0.00
//! C 0.25 0.25 0.25
//! space 227_a
//! supercell 1 1 1
//! full
//! ```
//! 关键字不区分大小写；`cell` 的六个参数可与关键字同行或在下一行；
//! 坐标块可以是 `frac[tional] n` 或 `cart[esian] n`（后者换算为分数坐标）。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`, `commands/` 使用
//! - 使用 `models/structure.rs`

use crate::error::{OlcaoError, Result};
use crate::models::{Atom, CellMode, Lattice, StructureDescriptor};
use std::fs;
use std::path::Path;

/// 解析 .skl 文件
pub fn parse_skeleton_file(path: &Path) -> Result<StructureDescriptor> {
    let content = fs::read_to_string(path).map_err(|e| OlcaoError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_skeleton_content(&content, &path.display().to_string())
}

/// 从字符串内容解析 .skl 格式，`source` 仅用于错误信息
pub fn parse_skeleton_content(content: &str, source: &str) -> Result<StructureDescriptor> {
    let fail = |reason: String| OlcaoError::ParseError {
        format: "skeleton".to_string(),
        path: source.to_string(),
        reason,
    };

    let mut lines = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('!'));

    let mut title_lines: Vec<String> = Vec::new();
    let mut lattice: Option<Lattice> = None;
    let mut atoms: Option<Vec<Atom>> = None;
    let mut space_group: Option<String> = None;
    let mut supercell = [1u32; 3];
    let mut cell_mode = CellMode::Full;

    while let Some(line) = lines.next() {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap_or_default().to_lowercase();
        let rest: Vec<&str> = tokens.collect();

        match keyword.as_str() {
            "title" => {
                let mut closed = false;
                for title_line in lines.by_ref() {
                    if title_line.eq_ignore_ascii_case("end") {
                        closed = true;
                        break;
                    }
                    title_lines.push(title_line.to_string());
                }
                if !closed {
                    return Err(fail("title block is missing its 'end' line".to_string()));
                }
            }
            "cell" => {
                let values = if rest.is_empty() {
                    let next = lines
                        .next()
                        .ok_or_else(|| fail("'cell' is missing its parameters".to_string()))?;
                    parse_floats(next.split_whitespace())
                } else {
                    parse_floats(rest.iter().copied())
                }
                .ok_or_else(|| fail("cell parameters must be numbers".to_string()))?;

                if values.len() != 6 {
                    return Err(fail(format!(
                        "cell needs 6 values (a b c alpha beta gamma), got {}",
                        values.len()
                    )));
                }
                let lat = Lattice::from_parameters(
                    values[0], values[1], values[2], values[3], values[4], values[5],
                );
                if let Some(reason) = lat.check() {
                    return Err(fail(reason));
                }
                lattice = Some(lat);
            }
            k if k.starts_with("frac") || k.starts_with("cart") => {
                let count: usize = rest
                    .first()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| fail(format!("'{}' needs an atom count", keyword)))?;

                let mut block = Vec::new();
                for i in 0..count {
                    let atom_line = lines.next().ok_or_else(|| {
                        fail(format!("expected {} atom lines, found {}", count, i))
                    })?;
                    block.push(parse_atom_line(atom_line).ok_or_else(|| {
                        fail(format!("malformed atom line '{}'", atom_line))
                    })?);
                }

                if k.starts_with("cart") {
                    let lat = lattice.ok_or_else(|| {
                        fail("cartesian coordinates require 'cell' to appear first".to_string())
                    })?;
                    for atom in &mut block {
                        atom.position = cartesian_to_fractional(&lat, atom.position);
                    }
                }
                atoms = Some(block);
            }
            "space" => {
                let id = rest
                    .first()
                    .ok_or_else(|| fail("'space' needs a space-group identifier".to_string()))?;
                space_group = Some(id.to_string());
            }
            "supercell" => {
                let values: Option<Vec<u32>> = rest.iter().map(|s| s.parse().ok()).collect();
                let values = values.unwrap_or_default();
                if values.len() != 3 || values.iter().any(|&v| v == 0) {
                    return Err(fail(format!(
                        "supercell needs 3 positive integers, got '{}'",
                        rest.join(" ")
                    )));
                }
                supercell = [values[0], values[1], values[2]];
            }
            "full" => cell_mode = CellMode::Full,
            "prim" => cell_mode = CellMode::Prim,
            other => {
                return Err(fail(format!("unknown keyword '{}'", other)));
            }
        }
    }

    let lattice = lattice.ok_or_else(|| fail("missing 'cell' line".to_string()))?;
    let atoms = atoms.ok_or_else(|| fail("missing atomic coordinate block".to_string()))?;
    let space_group = space_group.ok_or_else(|| fail("missing 'space' line".to_string()))?;

    Ok(StructureDescriptor {
        title: title_lines.join("\n"),
        lattice,
        atoms,
        space_group,
        supercell,
        cell_mode,
    })
}

fn parse_floats<'a>(tokens: impl Iterator<Item = &'a str>) -> Option<Vec<f64>> {
    tokens.map(|s| s.parse::<f64>().ok()).collect()
}

/// `<element> x y z`
fn parse_atom_line(line: &str) -> Option<Atom> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }
    let x = parts[1].parse::<f64>().ok()?;
    let y = parts[2].parse::<f64>().ok()?;
    let z = parts[3].parse::<f64>().ok()?;
    Some(Atom::new(parts[0], [x, y, z]))
}

/// r = x·a + y·b + z·c，求解分数坐标
fn cartesian_to_fractional(lattice: &Lattice, r: [f64; 3]) -> [f64; 3] {
    let [a, b, c] = lattice.vectors();
    // 列向量为 a, b, c
    let m = [
        [a[0], b[0], c[0]],
        [a[1], b[1], c[1]],
        [a[2], b[2], c[2]],
    ];
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);

    let inv = [
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
        ],
    ];

    [
        inv[0][0] * r[0] + inv[0][1] * r[1] + inv[0][2] * r[2],
        inv[1][0] * r[0] + inv[1][1] * r[1] + inv[1][2] * r[2],
        inv[2][0] * r[0] + inv[2][1] * r[1] + inv[2][2] * r[2],
    ]
}

/// 将骨架写回 .skl 文本；浮点数使用最短可精确还原的表示
pub fn to_skeleton_string(structure: &StructureDescriptor) -> String {
    let l = &structure.lattice;
    let mut result = String::new();

    result.push_str("title\n");
    for line in structure.title.lines() {
        result.push_str(line);
        result.push('\n');
    }
    result.push_str("end\n");

    result.push_str("cell\n");
    result.push_str(&format!(
        "{} {} {} {} {} {}\n",
        l.a, l.b, l.c, l.alpha, l.beta, l.gamma
    ));

    result.push_str(&format!("fractional {}\n", structure.atoms.len()));
    for atom in &structure.atoms {
        result.push_str(&format!(
            "{} {} {} {}\n",
            atom.element, atom.position[0], atom.position[1], atom.position[2]
        ));
    }

    result.push_str(&format!("space {}\n", structure.space_group));
    result.push_str(&format!(
        "supercell {} {} {}\n",
        structure.supercell[0], structure.supercell[1], structure.supercell[2]
    ));
    result.push_str(&format!("{}\n", structure.cell_mode));

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAMOND: &str = r#"
title
Diamond structure
end
cell 3.56679 3.56679 3.56679 90.0 90.0 90.0
fract 2
C 0.0 0.0 0.0
C 0.25 0.25 0.25
space 227_a
supercell 1 1 1
full
"#;

    #[test]
    fn test_parse_diamond() {
        let s = parse_skeleton_content(DIAMOND, "diamond.skl").unwrap();
        assert_eq!(s.title, "Diamond structure");
        assert!((s.lattice.a - 3.56679).abs() < 1e-12);
        assert_eq!(s.num_atoms(), 2);
        assert_eq!(s.atoms[1].element, "C");
        assert_eq!(s.atoms[1].position, [0.25, 0.25, 0.25]);
        assert_eq!(s.space_group, "227_a");
        assert_eq!(s.supercell, [1, 1, 1]);
        assert_eq!(s.cell_mode, CellMode::Full);
    }

    #[test]
    fn test_round_trip_preserves_atoms_exactly() {
        let content = r#"
title
NaCl rocksalt
primitive test
end
cell
5.6402 5.6402 5.6402 90 90 90
fract 2
Na 0.0 0.0 0.0
Cl 0.5 0.4999999999999 0.5
space 225
supercell 1 1 1
prim
"#;
        let original = parse_skeleton_content(content, "nacl.skl").unwrap();
        let text = to_skeleton_string(&original);
        let reparsed = parse_skeleton_content(&text, "round_trip").unwrap();

        assert_eq!(reparsed.num_atoms(), 2);
        assert_eq!(reparsed.atoms, original.atoms);
        assert_eq!(reparsed.atoms[0].element, "Na");
        assert_eq!(reparsed.atoms[1].position, [0.5, 0.4999999999999, 0.5]);
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_cartesian_block_converted_to_fractional() {
        let content = r#"
cell 4.0 4.0 4.0 90 90 90
cartesian 1
Fe 2.0 1.0 3.0
space 1_a
full
"#;
        let s = parse_skeleton_content(content, "fe.skl").unwrap();
        let p = s.atoms[0].position;
        assert!((p[0] - 0.5).abs() < 1e-9);
        assert!((p[1] - 0.25).abs() < 1e-9);
        assert!((p[2] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_short_atom_block_is_an_error() {
        let content = "cell 3 3 3 90 90 90\nfract 3\nC 0 0 0\nC 0.5 0.5 0.5\n";
        let err = parse_skeleton_content(content, "short.skl").unwrap_err();
        assert!(format!("{}", err).contains("expected 3 atom lines"));
    }

    #[test]
    fn test_invalid_lattice_rejected() {
        let content = "cell 3 -3 3 90 90 90\nfract 1\nC 0 0 0\nspace 1\nfull\n";
        assert!(parse_skeleton_content(content, "bad.skl").is_err());
    }

    #[test]
    fn test_unterminated_title() {
        let content = "title\nno end here\n";
        assert!(parse_skeleton_content(content, "t.skl").is_err());
    }

    #[test]
    fn test_huge_atom_count_is_an_error() {
        let content = "cell 3 3 3 90 90 90\nfract 1000000000000000000\nC 0 0 0\nspace 1\nfull\n";
        assert!(parse_skeleton_content(content, "huge.skl").is_err());
    }

    #[test]
    fn test_supercell_rejects_stray_tokens() {
        let base = "cell 3 3 3 90 90 90\nfract 1\nC 0 0 0\nspace 1\n";
        for line in ["supercell 2 x 2 2", "supercell 2 2", "supercell 2 2 0"] {
            let content = format!("{}{}\nfull\n", base, line);
            assert!(parse_skeleton_content(&content, "sc.skl").is_err(), "{}", line);
        }
        let ok = parse_skeleton_content(&format!("{}supercell 2 1 3\nfull\n", base), "sc.skl");
        assert_eq!(ok.unwrap().supercell, [2, 1, 3]);
    }

    #[test]
    fn test_impossible_angles_rejected() {
        let content = "cell 3 3 3 10 10 170\nfract 1\nC 0 0 0\nspace 1\nfull\n";
        assert!(parse_skeleton_content(content, "angles.skl").is_err());
    }
}
