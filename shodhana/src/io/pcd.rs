//! PCD (Point Cloud Data) v0.7 reader and writer.
//!
//! Only the `x`, `y` and `z` fields are extracted; other fields are skipped.
//! `DATA ascii` and `DATA binary` (little-endian) are supported,
//! `binary_compressed` is not.
//!
//! ## Header
//!
//! ```text
//! # .PCD v0.7 - Point Cloud Data file format
//! VERSION 0.7
//! FIELDS x y z intensity
//! SIZE 4 4 4 4
//! TYPE F F F F
//! COUNT 1 1 1 1
//! WIDTH 360
//! HEIGHT 1
//! VIEWPOINT 0 0 0 1 0 0 0
//! POINTS 360
//! DATA binary
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::core::types::{Point3D, PointCloud3D};

/// Errors while reading or writing PCD files.
#[derive(Error, Debug)]
pub enum PcdError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid PCD header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported PCD data: {0}")]
    UnsupportedData(String),

    #[error("PCD file has no '{0}' field")]
    MissingField(&'static str),

    #[error("PCD data truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("Invalid PCD value at point {index}: '{value}'")]
    InvalidValue { index: usize, value: String },
}

pub type Result<T> = std::result::Result<T, PcdError>;

/// Storage of the point block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdEncoding {
    Ascii,
    Binary,
}

/// Scalar kind from the `TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    Float,
    Signed,
    Unsigned,
}

#[derive(Debug, Clone)]
struct PcdField {
    name: String,
    size: usize,
    kind: ScalarKind,
    count: usize,
}

#[derive(Debug, Clone)]
struct PcdHeader {
    fields: Vec<PcdField>,
    points: usize,
    encoding: PcdEncoding,
    /// Bytes per point in the binary layout.
    point_step: usize,
    /// Values per point in the ascii layout.
    values_per_point: usize,
}

impl PcdHeader {
    fn new(fields: Vec<PcdField>, points: usize, encoding: PcdEncoding) -> Result<Self> {
        let overflow = || PcdError::InvalidHeader("point layout overflows".to_string());
        let mut point_step = 0usize;
        let mut values_per_point = 0usize;
        for f in &fields {
            let bytes = f.size.checked_mul(f.count).ok_or_else(overflow)?;
            point_step = point_step.checked_add(bytes).ok_or_else(overflow)?;
            values_per_point = values_per_point.checked_add(f.count).ok_or_else(overflow)?;
        }
        Ok(Self {
            fields,
            points,
            encoding,
            point_step,
            values_per_point,
        })
    }

    /// Field index by name.
    fn find(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Value index (ascii) and byte offset (binary) of a field's first element.
    ///
    /// Both are prefix sums of totals checked in [`PcdHeader::new`].
    fn offsets(&self, field: usize) -> (usize, usize) {
        self.fields[..field]
            .iter()
            .fold((0, 0), |(v, b), f| (v + f.count, b + f.size * f.count))
    }
}

/// Load a point cloud from a PCD file.
pub fn read_pcd(path: impl AsRef<Path>) -> Result<PointCloud3D> {
    let bytes = fs::read(path)?;
    parse_pcd(&bytes)
}

/// Parse an in-memory PCD file.
pub fn parse_pcd(bytes: &[u8]) -> Result<PointCloud3D> {
    let (header, body) = parse_header(bytes)?;

    let x = header.find("x").ok_or(PcdError::MissingField("x"))?;
    let y = header.find("y").ok_or(PcdError::MissingField("y"))?;
    let z = header.find("z");
    for index in [Some(x), Some(y), z].into_iter().flatten() {
        let field = &header.fields[index];
        let supported = match field.kind {
            ScalarKind::Float => matches!(field.size, 4 | 8),
            ScalarKind::Signed | ScalarKind::Unsigned => matches!(field.size, 1 | 2 | 4 | 8),
        };
        if !supported || field.count == 0 {
            return Err(PcdError::UnsupportedData(format!(
                "field '{}' of size {} and count {}",
                field.name, field.size, field.count
            )));
        }
    }

    match header.encoding {
        PcdEncoding::Ascii => parse_ascii(&header, body, x, y, z),
        PcdEncoding::Binary => parse_binary(&header, body, x, y, z),
    }
}

fn parse_header(bytes: &[u8]) -> Result<(PcdHeader, &[u8])> {
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut kinds: Vec<ScalarKind> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut width: Option<usize> = None;
    let mut height: usize = 1;
    let mut points: Option<usize> = None;

    let mut rest = bytes;
    loop {
        let Some(end) = rest.iter().position(|&b| b == b'\n') else {
            return Err(PcdError::InvalidHeader("missing DATA line".to_string()));
        };
        let line = std::str::from_utf8(&rest[..end])
            .map_err(|_| PcdError::InvalidHeader("header is not UTF-8".to_string()))?
            .trim();
        rest = &rest[end + 1..];

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or_default().to_ascii_uppercase();
        let values: Vec<&str> = tokens.collect();

        match key.as_str() {
            "VERSION" | "VIEWPOINT" => {}
            "FIELDS" => names = values.iter().map(|s| s.to_string()).collect(),
            "SIZE" => sizes = parse_numbers(&key, &values)?,
            "TYPE" => {
                kinds = values
                    .iter()
                    .map(|t| match *t {
                        "F" => Ok(ScalarKind::Float),
                        "I" => Ok(ScalarKind::Signed),
                        "U" => Ok(ScalarKind::Unsigned),
                        other => Err(PcdError::InvalidHeader(format!("unknown TYPE '{other}'"))),
                    })
                    .collect::<Result<_>>()?;
            }
            "COUNT" => counts = parse_numbers(&key, &values)?,
            "WIDTH" => width = parse_numbers(&key, &values)?.first().copied(),
            "HEIGHT" => height = parse_numbers(&key, &values)?.first().copied().unwrap_or(1),
            "POINTS" => points = parse_numbers(&key, &values)?.first().copied(),
            "DATA" => {
                let encoding = match values.first().copied() {
                    Some("ascii") => PcdEncoding::Ascii,
                    Some("binary") => PcdEncoding::Binary,
                    Some(other) => {
                        return Err(PcdError::UnsupportedData(format!("DATA {other}")));
                    }
                    None => return Err(PcdError::InvalidHeader("empty DATA line".to_string())),
                };

                if counts.is_empty() {
                    counts = vec![1; names.len()];
                }
                if names.is_empty() || sizes.len() != names.len() || kinds.len() != names.len()
                {
                    return Err(PcdError::InvalidHeader(format!(
                        "FIELDS/SIZE/TYPE length mismatch ({}/{}/{})",
                        names.len(),
                        sizes.len(),
                        kinds.len()
                    )));
                }
                if counts.len() != names.len() {
                    return Err(PcdError::InvalidHeader("COUNT length mismatch".to_string()));
                }

                let points = match (points, width) {
                    (Some(points), _) => points,
                    (None, Some(width)) => width.checked_mul(height).ok_or_else(|| {
                        PcdError::InvalidHeader("WIDTH * HEIGHT overflows".to_string())
                    })?,
                    (None, None) => {
                        return Err(PcdError::InvalidHeader("missing POINTS".to_string()));
                    }
                };

                let fields = names
                    .into_iter()
                    .zip(sizes)
                    .zip(kinds)
                    .zip(counts)
                    .map(|(((name, size), kind), count)| PcdField {
                        name,
                        size,
                        kind,
                        count,
                    })
                    .collect();

                return Ok((PcdHeader::new(fields, points, encoding)?, rest));
            }
            other => {
                return Err(PcdError::InvalidHeader(format!("unknown key '{other}'")));
            }
        }
    }
}

fn parse_numbers(key: &str, values: &[&str]) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|v| {
            v.parse::<usize>()
                .map_err(|_| PcdError::InvalidHeader(format!("{key}: invalid number '{v}'")))
        })
        .collect()
}

fn parse_ascii(
    header: &PcdHeader,
    body: &[u8],
    x: usize,
    y: usize,
    z: Option<usize>,
) -> Result<PointCloud3D> {
    let text = std::str::from_utf8(body)
        .map_err(|_| PcdError::UnsupportedData("ascii data is not UTF-8".to_string()))?;
    let per_point = header.values_per_point;
    let (xi, _) = header.offsets(x);
    let (yi, _) = header.offsets(y);
    let zi = z.map(|z| header.offsets(z).0);

    // POINTS is only a claim; never reserve more than the text can hold.
    let mut cloud = PointCloud3D::with_capacity(header.points.min(text.lines().count()));
    for (index, line) in text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(header.points)
        .enumerate()
    {
        let values: Vec<&str> = line.split_whitespace().collect();
        if values.len() < per_point {
            return Err(PcdError::InvalidValue {
                index,
                value: line.to_string(),
            });
        }
        let parse = |i: usize| {
            values[i].parse::<f32>().map_err(|_| PcdError::InvalidValue {
                index,
                value: values[i].to_string(),
            })
        };
        let pz = match zi {
            Some(zi) => parse(zi)?,
            None => 0.0,
        };
        cloud.push(Point3D::new(parse(xi)?, parse(yi)?, pz));
    }

    if cloud.len() < header.points {
        log::warn!(
            "PCD declares {} points but ascii data holds {}",
            header.points,
            cloud.len()
        );
    }
    Ok(cloud)
}

fn parse_binary(
    header: &PcdHeader,
    body: &[u8],
    x: usize,
    y: usize,
    z: Option<usize>,
) -> Result<PointCloud3D> {
    let step = header.point_step;
    let expected = step.checked_mul(header.points).ok_or_else(|| {
        PcdError::InvalidHeader(format!("POINTS {} overflows the data size", header.points))
    })?;
    if body.len() < expected {
        return Err(PcdError::Truncated {
            expected,
            got: body.len(),
        });
    }

    let fx = (&header.fields[x], header.offsets(x).1);
    let fy = (&header.fields[y], header.offsets(y).1);
    let fz = z.map(|z| (&header.fields[z], header.offsets(z).1));

    let mut cloud = PointCloud3D::with_capacity(header.points.min(body.len() / step));
    for chunk in body[..expected].chunks_exact(step) {
        let px = read_scalar(chunk, fx.0, fx.1);
        let py = read_scalar(chunk, fy.0, fy.1);
        let pz = fz.map(|(f, o)| read_scalar(chunk, f, o)).unwrap_or(0.0);
        cloud.push(Point3D::new(px, py, pz));
    }
    Ok(cloud)
}

/// Decode one little-endian scalar. Bounds are guaranteed by the point step.
fn read_scalar(chunk: &[u8], field: &PcdField, offset: usize) -> f32 {
    let b = &chunk[offset..offset + field.size];
    match (field.kind, field.size) {
        (ScalarKind::Float, 4) => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        (ScalarKind::Float, _) => {
            f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
        }
        (ScalarKind::Signed, 1) => b[0] as i8 as f32,
        (ScalarKind::Signed, 2) => i16::from_le_bytes([b[0], b[1]]) as f32,
        (ScalarKind::Signed, 4) => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32,
        (ScalarKind::Unsigned, 1) => b[0] as f32,
        (ScalarKind::Unsigned, 2) => u16::from_le_bytes([b[0], b[1]]) as f32,
        (ScalarKind::Unsigned, 4) => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32,
        (ScalarKind::Signed, _) => {
            i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
        }
        (ScalarKind::Unsigned, _) => {
            u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
        }
    }
}

/// Write a cloud as a PCD v0.7 file with `x y z` float fields.
pub fn write_pcd(
    path: impl AsRef<Path>,
    cloud: &PointCloud3D,
    encoding: PcdEncoding,
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(writer, "VERSION 0.7")?;
    writeln!(writer, "FIELDS x y z")?;
    writeln!(writer, "SIZE 4 4 4")?;
    writeln!(writer, "TYPE F F F")?;
    writeln!(writer, "COUNT 1 1 1")?;
    writeln!(writer, "WIDTH {}", cloud.len())?;
    writeln!(writer, "HEIGHT 1")?;
    writeln!(writer, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(writer, "POINTS {}", cloud.len())?;

    match encoding {
        PcdEncoding::Ascii => {
            writeln!(writer, "DATA ascii")?;
            for p in cloud.iter() {
                writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
            }
        }
        PcdEncoding::Binary => {
            writeln!(writer, "DATA binary")?;
            for p in cloud.iter() {
                writer.write_all(&p.x.to_le_bytes())?;
                writer.write_all(&p.y.to_le_bytes())?;
                writer.write_all(&p.z.to_le_bytes())?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}
