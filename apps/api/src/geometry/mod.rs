//! Geometry Profile Builder and its inverse.
//!
//! # Vertex order
//! I-beam (h = total depth, b = flange width, tw = web, tf = flange):
//!
//! ```text
//!  7 ────────────── 6
//!  8 ──── 9    4 ── 5        indices as built below; the web rails sit at
//!         │    │             x = (b - tw) / 2 and x = (b + tw) / 2
//! 11 ──── 10   3 ── 2
//!  0 ────────────── 1
//! ```
//!
//! The inverse reads fixed indices (1, 2, 4, 6), so the order here must not change.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::component::{ColumnDimensions, ComponentSpec, IBeamSection, ParsedProfile};

const IBEAM_VERTEX_COUNT: usize = 12;
const COLUMN_VERTEX_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Closed polygon outline. The closing edge back to the first vertex is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryProfile {
    vertices: Vec<Point>,
}

impl GeometryProfile {
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }
}

pub fn build_profile(spec: &ComponentSpec) -> GeometryProfile {
    let vertices = match spec {
        ComponentSpec::IBeam(beam) => ibeam_vertices(&beam.dimensions().section()),
        ComponentSpec::Column(column) => column_vertices(column.dimensions()),
    };
    GeometryProfile { vertices }
}

fn ibeam_vertices(s: &IBeamSection) -> Vec<Point> {
    let (h, b, tw, tf) = (
        s.total_depth,
        s.flange_width,
        s.web_thickness,
        s.flange_thickness,
    );
    let web_left = (b - tw) / 2.0;
    let web_right = (b + tw) / 2.0;

    vec![
        Point::new(0.0, 0.0),        // bottom flange, bottom-left
        Point::new(b, 0.0),          // bottom flange, bottom-right
        Point::new(b, tf),           // bottom flange, top-right
        Point::new(web_right, tf),   // web, bottom-right
        Point::new(web_right, h - tf), // web, top-right
        Point::new(b, h - tf),       // top flange, bottom-right
        Point::new(b, h),            // top flange, top-right
        Point::new(0.0, h),          // top flange, top-left
        Point::new(0.0, h - tf),     // top flange, bottom-left
        Point::new(web_left, h - tf), // web, top-left
        Point::new(web_left, tf),    // web, bottom-left
        Point::new(0.0, tf),         // bottom flange, top-left
    ]
}

fn column_vertices(d: &ColumnDimensions) -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(d.width, 0.0),
        Point::new(d.width, d.height),
        Point::new(0.0, d.height),
    ]
}

/// Classifies a decoded outline by vertex count and recovers its dimensions.
///
/// 12/13 vertices → I-beam, 4/5 → column; the 13th/5th is the closing duplicate
/// of vertex 0 and is ignored. Results are rounded to 2 decimals.
pub fn infer_profile(vertices: &[Point]) -> Result<ParsedProfile, AppError> {
    match vertices.len() {
        n if n == IBEAM_VERTEX_COUNT || n == IBEAM_VERTEX_COUNT + 1 => {
            let b = vertices[1].x;
            let tf = vertices[2].y;
            let h = vertices[6].y;
            let tw = 2.0 * vertices[4].x - b;
            Ok(ParsedProfile::IBeam(IBeamSection {
                total_depth: round2(h),
                flange_width: round2(b),
                web_thickness: round2(tw),
                flange_thickness: round2(tf),
            }))
        }
        n if n == COLUMN_VERTEX_COUNT || n == COLUMN_VERTEX_COUNT + 1 => {
            Ok(ParsedProfile::Column(ColumnDimensions {
                width: round2(vertices[1].x),
                height: round2(vertices[2].y),
            }))
        }
        n => Err(AppError::UnsupportedShape(format!(
            "Unexpected number of vertices ({n}). Only standard I-Beams and Columns are supported."
        ))),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tolerances;
    use crate::models::component::ComponentKind;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn beam() -> ComponentSpec {
        let raw = json!({
            "total_depth": 300,
            "flange_width": 150,
            "web_thickness": 8,
            "flange_thickness": 12
        });
        ComponentSpec::from_json(ComponentKind::IBeam, &raw, &Tolerances::default()).unwrap()
    }

    fn column() -> ComponentSpec {
        let raw = json!({"width": 300, "height": 400});
        ComponentSpec::from_json(ComponentKind::Column, &raw, &Tolerances::default()).unwrap()
    }

    #[test]
    fn test_ibeam_profile_has_twelve_vertices_starting_at_origin() {
        let profile = build_profile(&beam());
        assert_eq!(profile.vertices().len(), IBEAM_VERTEX_COUNT);
        assert_eq!(profile.vertices()[0], Point::new(0.0, 0.0));
        assert_eq!(profile.vertices()[6], Point::new(150.0, 300.0));
    }

    #[test]
    fn test_ibeam_web_rails() {
        let v = build_profile(&beam()).vertices().to_vec();
        assert_relative_eq!(v[3].x, 79.0);
        assert_relative_eq!(v[10].x, 71.0);
        assert_relative_eq!(v[4].y, 288.0);
    }

    #[test]
    fn test_column_profile_corners() {
        let v = build_profile(&column()).vertices().to_vec();
        assert_eq!(
            v,
            vec![
                Point::new(0.0, 0.0),
                Point::new(300.0, 0.0),
                Point::new(300.0, 400.0),
                Point::new(0.0, 400.0),
            ]
        );
    }

    #[test]
    fn test_ibeam_inversion_recovers_section() {
        let vertices = build_profile(&beam()).vertices().to_vec();
        let parsed = infer_profile(&vertices).unwrap();
        assert_eq!(
            parsed,
            ParsedProfile::IBeam(IBeamSection {
                total_depth: 300.0,
                flange_width: 150.0,
                web_thickness: 8.0,
                flange_thickness: 12.0,
            })
        );
    }

    #[test]
    fn test_closing_vertex_is_ignored() {
        let mut vertices = build_profile(&column()).vertices().to_vec();
        vertices.push(vertices[0]);
        let parsed = infer_profile(&vertices).unwrap();
        assert_eq!(
            parsed,
            ParsedProfile::Column(ColumnDimensions {
                width: 300.0,
                height: 400.0
            })
        );

        let mut beam_vertices = build_profile(&beam()).vertices().to_vec();
        beam_vertices.push(beam_vertices[0]);
        assert_eq!(infer_profile(&beam_vertices).unwrap().kind(), ComponentKind::IBeam);
    }

    #[test]
    fn test_inversion_rounds_to_two_decimals() {
        let vertices = vec![
            Point::new(0.0, 0.0),
            Point::new(300.004, 0.0),
            Point::new(300.004, 399.996),
            Point::new(0.0, 399.996),
        ];
        match infer_profile(&vertices).unwrap() {
            ParsedProfile::Column(d) => {
                assert_eq!(d.width, 300.0);
                assert_eq!(d.height, 400.0);
            }
            other => panic!("expected column, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_vertex_count() {
        let vertices = vec![Point::new(0.0, 0.0); 8];
        let err = infer_profile(&vertices).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedShape(_)));
        assert!(err.to_string().contains("(8)"));
    }
}
