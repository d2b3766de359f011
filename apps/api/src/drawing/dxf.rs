//! Minimal ASCII DXF codec.
//!
//! Writes a HEADER (AutoCAD 2000, millimetres) and an ENTITIES section holding a
//! single closed `LWPOLYLINE`. Reads back the first `LWPOLYLINE` found in ENTITIES;
//! every other entity and section is skipped.

use std::fmt::Display;

use super::{DrawingCodec, DrawingError};
use crate::geometry::Point;

const ACAD_VERSION: &str = "AC1015";
const INSUNITS_MILLIMETERS: i32 = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct DxfCodec;

impl DxfCodec {
    pub fn new() -> Self {
        Self
    }
}

impl DrawingCodec for DxfCodec {
    fn encode(&self, vertices: &[Point]) -> Result<Vec<u8>, DrawingError> {
        let mut out = String::with_capacity(256 + vertices.len() * 32);

        push_pair(&mut out, 0, "SECTION");
        push_pair(&mut out, 2, "HEADER");
        push_pair(&mut out, 9, "$ACADVER");
        push_pair(&mut out, 1, ACAD_VERSION);
        push_pair(&mut out, 9, "$INSUNITS");
        push_pair(&mut out, 70, INSUNITS_MILLIMETERS);
        push_pair(&mut out, 0, "ENDSEC");

        push_pair(&mut out, 0, "SECTION");
        push_pair(&mut out, 2, "ENTITIES");
        push_pair(&mut out, 0, "LWPOLYLINE");
        push_pair(&mut out, 8, "0");
        push_pair(&mut out, 90, vertices.len());
        push_pair(&mut out, 70, 1); // closed
        for point in vertices {
            push_pair(&mut out, 10, point.x);
            push_pair(&mut out, 20, point.y);
        }
        push_pair(&mut out, 0, "ENDSEC");
        push_pair(&mut out, 0, "EOF");

        Ok(out.into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Point>, DrawingError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| DrawingError::Malformed("drawing is not valid UTF-8 text".to_string()))?;
        let pairs = read_pairs(text)?;

        let mut section: Option<&str> = None;
        let mut seen_entities = false;
        let mut seen_eof = false;
        let mut polyline: Option<PolylineBuilder> = None;
        let mut finished: Option<Vec<Point>> = None;

        let mut iter = pairs.iter().peekable();
        while let Some(&(code, value)) = iter.next() {
            if code == 0 {
                // Any new entity closes the polyline being collected.
                if let Some(builder) = polyline.take() {
                    finished = Some(builder.finish()?);
                }
                match value {
                    "SECTION" => {
                        let name = match iter.next() {
                            Some(&(2, name)) => name,
                            _ => {
                                return Err(DrawingError::Malformed(
                                    "SECTION without a name".to_string(),
                                ))
                            }
                        };
                        if name == "ENTITIES" {
                            seen_entities = true;
                        }
                        section = Some(name);
                    }
                    "ENDSEC" => section = None,
                    "EOF" => {
                        seen_eof = true;
                        break;
                    }
                    "LWPOLYLINE" if section == Some("ENTITIES") && finished.is_none() => {
                        polyline = Some(PolylineBuilder::default());
                    }
                    _ => {}
                }
                continue;
            }

            if let Some(builder) = polyline.as_mut() {
                builder.accept(code, value)?;
            }
        }

        if !seen_eof {
            return Err(DrawingError::Malformed("missing EOF marker".to_string()));
        }
        if !seen_entities {
            return Err(DrawingError::Malformed("missing ENTITIES section".to_string()));
        }
        finished.ok_or(DrawingError::NoPolyline)
    }

    fn media_type(&self) -> &'static str {
        "application/dxf"
    }

    fn extension(&self) -> &'static str {
        "dxf"
    }
}

fn push_pair(out: &mut String, code: i32, value: impl Display) {
    out.push_str(&format!("{code:>3}\n{value}\n"));
}

/// Splits the text into (group code, value) pairs, stopping at `0/EOF`.
/// Anything after the EOF marker is ignored.
fn read_pairs(text: &str) -> Result<Vec<(i32, &str)>, DrawingError> {
    let mut pairs = Vec::new();
    let mut lines = text.lines().map(str::trim).enumerate();

    while let Some((index, code)) = lines.next() {
        let code = code.parse::<i32>().map_err(|_| {
            DrawingError::Malformed(format!(
                "invalid group code '{code}' at line {}",
                index + 1
            ))
        })?;
        let Some((_, value)) = lines.next() else {
            return Err(DrawingError::Malformed(format!(
                "group code {code} at line {} has no value",
                index + 1
            )));
        };
        pairs.push((code, value));
        if code == 0 && value == "EOF" {
            break;
        }
    }

    Ok(pairs)
}

#[derive(Debug, Default)]
struct PolylineBuilder {
    declared: Option<usize>,
    pending_x: Option<f64>,
    vertices: Vec<Point>,
}

impl PolylineBuilder {
    fn accept(&mut self, code: i32, value: &str) -> Result<(), DrawingError> {
        match code {
            90 => {
                let count = value.parse::<usize>().map_err(|_| {
                    DrawingError::Malformed(format!("invalid vertex count '{value}'"))
                })?;
                self.declared = Some(count);
            }
            10 => {
                if self.pending_x.is_some() {
                    return Err(DrawingError::Malformed(
                        "vertex X without matching Y".to_string(),
                    ));
                }
                self.pending_x = Some(parse_coordinate(value)?);
            }
            20 => {
                let x = self.pending_x.take().ok_or_else(|| {
                    DrawingError::Malformed("vertex Y without preceding X".to_string())
                })?;
                self.vertices.push(Point::new(x, parse_coordinate(value)?));
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<Point>, DrawingError> {
        if self.pending_x.is_some() {
            return Err(DrawingError::Malformed(
                "vertex X without matching Y".to_string(),
            ));
        }
        if let Some(declared) = self.declared {
            if declared != self.vertices.len() {
                return Err(DrawingError::Malformed(format!(
                    "polyline declares {declared} vertices but holds {}",
                    self.vertices.len()
                )));
            }
        }
        Ok(self.vertices)
    }
}

fn parse_coordinate(value: &str) -> Result<f64, DrawingError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DrawingError::Malformed(format!("invalid coordinate '{value}'")))
}
