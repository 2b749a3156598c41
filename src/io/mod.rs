//! XYZ geometry input and result reports

use nalgebra::Vector3;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::atom::Atom;
use crate::components::ComponentKind;
use crate::molecule::{Monomer, MoleculeError};
use crate::pipeline::InteractionResult;

/// Errors that can occur during file I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Molecule(#[from] MoleculeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Header line of the CSV summary
pub const CSV_HEADER: &str =
    "# Monomer A, Monomer B, Electrostatics, Exchange, Induction, Dispersion, Total (kcal/mol)";

/// One structure of an XYZ file
#[derive(Debug, Clone)]
pub struct XyzFrame {
    pub comment: String,
    pub atoms: Vec<Atom>,
    /// Optional fifth column, present on every atom line or on none
    pub reference: Option<Vec<f64>>,
}

impl XyzFrame {
    pub fn into_monomer(self, name: &str) -> Result<Monomer, IoError> {
        let mut monomer = Monomer::new(name, self.atoms)?;
        if let Some(reference) = self.reference {
            monomer.set_reference(reference)?;
        }
        Ok(monomer)
    }
}

fn parse_error(line: usize, message: String) -> IoError {
    IoError::Parse { line, message }
}

fn parse_float(token: &str, line: usize, what: &str) -> Result<f64, IoError> {
    token
        .parse::<f64>()
        .map_err(|_| parse_error(line, format!("Invalid {}: {}", what, token)))
}

/// Parse concatenated XYZ frames: an atom count, a comment, then one
/// `label x y z [value]` line per atom. Blank lines between frames are skipped.
pub fn parse_xyz(content: &str) -> Result<Vec<XyzFrame>, IoError> {
    let mut lines = content.lines().enumerate().map(|(i, l)| (i + 1, l));
    let mut frames = Vec::new();

    while let Some((line_number, line)) = lines.find(|(_, l)| !l.trim().is_empty()) {
        let count: usize = line
            .trim()
            .parse()
            .map_err(|_| parse_error(line_number, format!("Invalid atom count: {}", line.trim())))?;
        if count == 0 {
            return Err(parse_error(line_number, "Frame without atoms".to_string()));
        }

        let comment = match lines.next() {
            Some((_, l)) => l.trim().to_string(),
            None => {
                return Err(IoError::InvalidFormat(format!(
                    "Missing comment line after atom count at line {}",
                    line_number
                )))
            }
        };

        let mut atoms = Vec::with_capacity(count);
        let mut reference = Vec::with_capacity(count);
        for _ in 0..count {
            let (line_number, line) = lines.next().ok_or_else(|| {
                IoError::InvalidFormat(format!(
                    "Expected {} atoms, found {}",
                    count,
                    atoms.len()
                ))
            })?;

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 4 && parts.len() != 5 {
                return Err(parse_error(
                    line_number,
                    format!("Expected 'label x y z [value]', got: {}", line),
                ));
            }

            let x = parse_float(parts[1], line_number, "x coordinate")?;
            let y = parse_float(parts[2], line_number, "y coordinate")?;
            let z = parse_float(parts[3], line_number, "z coordinate")?;
            let atom = Atom::new(parts[0], Vector3::new(x, y, z))
                .map_err(|e| parse_error(line_number, e.to_string()))?;

            if let Some(value) = parts.get(4) {
                reference.push(parse_float(value, line_number, "reference value")?);
            }
            if !reference.is_empty() && reference.len() != atoms.len() + 1 {
                return Err(parse_error(
                    line_number,
                    "Reference values must be given for every atom or none".to_string(),
                ));
            }
            atoms.push(atom);
        }

        frames.push(XyzFrame {
            comment,
            atoms,
            reference: if reference.is_empty() { None } else { Some(reference) },
        });
    }

    if frames.is_empty() {
        return Err(IoError::InvalidFormat("No XYZ frame found".to_string()));
    }
    Ok(frames)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Read every frame of an XYZ file
pub fn read_xyz_frames<P: AsRef<Path>>(path: P) -> Result<Vec<XyzFrame>, IoError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_xyz(&content)
}

/// Read the monomers of an XYZ file, named after the file stem (with a
/// 1-based suffix when the file holds several frames)
pub fn read_monomer_xyz<P: AsRef<Path>>(path: P) -> Result<Vec<Monomer>, IoError> {
    let stem = file_stem(path.as_ref());
    let frames = read_xyz_frames(path)?;
    let several = frames.len() > 1;
    frames
        .into_iter()
        .enumerate()
        .map(|(i, frame)| {
            let name = if several {
                format!("{}_{}", stem, i + 1)
            } else {
                stem.clone()
            };
            frame.into_monomer(&name)
        })
        .collect()
}

/// Read a dimer stored as exactly two frames, monomer A first
pub fn read_dimer_xyz<P: AsRef<Path>>(path: P) -> Result<(Monomer, Monomer), IoError> {
    let stem = file_stem(path.as_ref());
    let frames = read_xyz_frames(path.as_ref())?;
    if frames.len() != 2 {
        return Err(IoError::InvalidFormat(format!(
            "{} holds {} frames, a dimer needs 2",
            path.as_ref().display(),
            frames.len()
        )));
    }
    let mut frames = frames.into_iter();
    match (frames.next(), frames.next()) {
        (Some(a), Some(b)) => Ok((
            a.into_monomer(&format!("{}-A", stem))?,
            b.into_monomer(&format!("{}-B", stem))?,
        )),
        _ => Err(IoError::InvalidFormat("Dimer needs two frames".to_string())),
    }
}

/// Per-atom-pair decomposition table, indices 1-based
pub fn write_atomic_decomposition<W: Write>(out: &mut W, result: &InteractionResult) -> Result<(), IoError> {
    writeln!(
        out,
        "# {}, {}, electrostatic, exchange-repulsion, induction, dispersion, total",
        result.mon_a, result.mon_b
    )?;
    let (na, nb) = result.shape();
    for a in 0..na {
        for b in 0..nb {
            let e = ComponentKind::ALL.map(|kind| result.matrix(kind)[(a, b)]);
            writeln!(
                out,
                "{:3} {:3} {:12.8} {:12.8} {:12.8} {:12.8} {:12.8}",
                a + 1,
                b + 1,
                e[0],
                e[1],
                e[2],
                e[3],
                e.iter().sum::<f64>()
            )?;
        }
    }
    Ok(())
}

pub fn write_atomic_file<P: AsRef<Path>>(path: P, result: &InteractionResult) -> Result<(), IoError> {
    let mut file = BufWriter::new(File::create(path)?);
    write_atomic_decomposition(&mut file, result)?;
    file.flush()?;
    Ok(())
}

/// One CSV row per result
pub fn write_summary_rows<W: Write>(out: &mut W, results: &[InteractionResult]) -> Result<(), IoError> {
    for result in results {
        let e = result.energies.as_array();
        writeln!(
            out,
            "{},{},{:9.5},{:9.5},{:9.5},{:9.5},{:9.5}",
            result.mon_a, result.mon_b, e[0], e[1], e[2], e[3], result.total
        )?;
    }
    Ok(())
}

/// Append results to a CSV summary, writing the header when the file is new
pub fn append_summary_csv<P: AsRef<Path>>(path: P, results: &[InteractionResult]) -> Result<(), IoError> {
    let is_new = !path.as_ref().exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut out = BufWriter::new(file);
    if is_new {
        writeln!(out, "{}", CSV_HEADER)?;
    }
    write_summary_rows(&mut out, results)?;
    out.flush()?;
    Ok(())
}

/// Totals of every result as a JSON array
pub fn write_json_summary<P: AsRef<Path>>(path: P, results: &[InteractionResult]) -> Result<(), IoError> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}

/// Human-readable summary table, one string per line
pub fn format_summary_table(results: &[InteractionResult]) -> Vec<String> {
    let mut lines = vec![
        "Output summary (kcal/mol)".to_string(),
        format!(
            "{:<20} {:<20}{:>18} {:>14} {:>15} {:>15} {:>11}",
            "MonomerA", "MonomerB", "Electrostatics", "Exchange", "Induction", "Dispersion", "Total"
        ),
        "-".repeat(118),
    ];
    for result in results {
        let e = result.energies.as_array();
        lines.push(format!(
            "{:<20} {:<20}{:18.5} {:14.5} {:15.5} {:15.5} {:11.5}",
            result.mon_a, result.mon_b, e[0], e[1], e[2], e[3], result.total
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DIMER: &str = "3
water A
O   0.000  0.000  0.000
H   0.9572 0.000  0.000
H  -0.2400 0.9266 0.000

3
water B
O   0.000  0.000  3.000
H   0.9572 0.000  3.000
H  -0.2400 0.9266 3.000
";

    #[test]
    fn test_parse_concatenated_frames() {
        let frames = parse_xyz(DIMER).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].comment, "water A");
        assert_eq!(frames[1].atoms[0].coordinates.z, 3.0);
        assert!(frames[0].reference.is_none());
    }

    #[test]
    fn test_reference_column() {
        let frames = parse_xyz("2\n\nO 0 0 0 0.81\nH 0.96 0 0 0.55\n").unwrap();
        assert_eq!(frames[0].reference, Some(vec![0.81, 0.55]));
        assert_eq!(frames[0].comment, "");

        let err = parse_xyz("2\n\nO 0 0 0 0.81\nH 0.96 0 0\n").unwrap_err();
        assert!(matches!(err, IoError::Parse { line: 4, .. }));
        let err = parse_xyz("2\n\nO 0 0 0\nH 0.96 0 0 0.5\n").unwrap_err();
        assert!(matches!(err, IoError::Parse { line: 4, .. }));
    }

    #[test]
    fn test_parse_errors_report_lines() {
        assert!(matches!(
            parse_xyz("two\ncomment\n"),
            Err(IoError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_xyz("1\nc\nO 0.0 zero 0.0\n"),
            Err(IoError::Parse { line: 3, .. })
        ));
        assert!(matches!(
            parse_xyz("1\nc\nXx 0.0 0.0 0.0\n"),
            Err(IoError::Parse { line: 3, .. })
        ));
        assert!(matches!(
            parse_xyz("3\nc\nO 0 0 0\n"),
            Err(IoError::InvalidFormat(_))
        ));
        assert!(matches!(parse_xyz("\n\n"), Err(IoError::InvalidFormat(_))));
    }

    #[test]
    fn test_read_dimer_names_monomers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("water_dimer.xyz");
        std::fs::write(&path, DIMER).unwrap();

        let (a, b) = read_dimer_xyz(&path).unwrap();
        assert_eq!(a.name, "water_dimer-A");
        assert_eq!(b.name, "water_dimer-B");
        assert_eq!(a.atom_types(), &["O2", "HO", "HO"]);

        let monomers = read_monomer_xyz(&path).unwrap();
        assert_eq!(monomers[1].name, "water_dimer_2");
    }

    #[test]
    fn test_dimer_needs_two_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("single.xyz");
        std::fs::write(&path, "1\n\nC 0 0 0\n").unwrap();
        assert!(matches!(read_dimer_xyz(&path), Err(IoError::InvalidFormat(_))));
        assert_eq!(read_monomer_xyz(&path).unwrap()[0].name, "single");
    }
}
