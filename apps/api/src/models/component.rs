//! Component specifications: the validated dimensional description of one
//! structural member.
//!
//! A `ComponentSpec` can only be obtained through the validator, so holding one
//! means its values already passed the schema, geometry and ratio phases.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Tolerances;
use crate::errors::AppError;
use crate::validation;

/// Length used when an I-beam request leaves it out.
pub const DEFAULT_IBEAM_LENGTH_MM: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    #[serde(rename = "ibeam")]
    IBeam,
    #[serde(rename = "column")]
    Column,
}

impl ComponentKind {
    /// Name used as the CacheKey prefix.
    pub fn type_name(self) -> &'static str {
        match self {
            ComponentKind::IBeam => "IBeam",
            ComponentKind::Column => "Column",
        }
    }

    /// Lower-case slug used in file names.
    pub fn slug(self) -> &'static str {
        match self {
            ComponentKind::IBeam => "ibeam",
            ComponentKind::Column => "column",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Raw dimensions
// ────────────────────────────────────────────────────────────────────────────

/// I-beam dimensions in mm. Plain data; carries no validity guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IBeamDimensions {
    pub length: f64,
    pub total_depth: f64,
    pub flange_width: f64,
    pub web_thickness: f64,
    pub flange_thickness: f64,
}

/// The cross-section part of an I-beam, i.e. what a drawing can tell us.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IBeamSection {
    pub total_depth: f64,
    pub flange_width: f64,
    pub web_thickness: f64,
    pub flange_thickness: f64,
}

/// Rectangular column dimensions in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnDimensions {
    pub width: f64,
    pub height: f64,
}

impl IBeamDimensions {
    pub fn section(&self) -> IBeamSection {
        IBeamSection {
            total_depth: self.total_depth,
            flange_width: self.flange_width,
            web_thickness: self.web_thickness,
            flange_thickness: self.flange_thickness,
        }
    }
}

impl IBeamSection {
    /// Cross-sectional area in mm²: two flanges plus the web between them.
    pub fn area(&self) -> f64 {
        let flange_area = self.flange_width * self.flange_thickness;
        let web_area = (self.total_depth - 2.0 * self.flange_thickness) * self.web_thickness;
        2.0 * flange_area + web_area
    }
}

impl ColumnDimensions {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validated components
// ────────────────────────────────────────────────────────────────────────────

/// A validated I-beam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IBeam(IBeamDimensions);

/// A validated rectangular column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Column(ColumnDimensions);

impl IBeam {
    /// Validates a raw JSON object (schema → geometry → ratios).
    pub fn from_json(raw: &Value, tolerances: &Tolerances) -> Result<Self, AppError> {
        validation::ibeam::validate(raw, tolerances).map(IBeam)
    }

    pub fn dimensions(&self) -> &IBeamDimensions {
        &self.0
    }
}

impl Column {
    pub fn from_json(raw: &Value, tolerances: &Tolerances) -> Result<Self, AppError> {
        validation::column::validate(raw, tolerances).map(Column)
    }

    pub fn dimensions(&self) -> &ColumnDimensions {
        &self.0
    }
}

/// Tagged union over every supported component.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ComponentSpec {
    #[serde(rename = "ibeam")]
    IBeam(IBeam),
    #[serde(rename = "column")]
    Column(Column),
}

impl ComponentSpec {
    /// Validates a raw JSON object as the given kind.
    pub fn from_json(
        kind: ComponentKind,
        raw: &Value,
        tolerances: &Tolerances,
    ) -> Result<Self, AppError> {
        match kind {
            ComponentKind::IBeam => IBeam::from_json(raw, tolerances).map(ComponentSpec::IBeam),
            ComponentKind::Column => Column::from_json(raw, tolerances).map(ComponentSpec::Column),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentSpec::IBeam(_) => ComponentKind::IBeam,
            ComponentSpec::Column(_) => ComponentKind::Column,
        }
    }

    /// Every field with its value. Order is not significant to callers.
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        match self {
            ComponentSpec::IBeam(beam) => {
                let d = beam.dimensions();
                vec![
                    ("length", d.length),
                    ("total_depth", d.total_depth),
                    ("flange_width", d.flange_width),
                    ("web_thickness", d.web_thickness),
                    ("flange_thickness", d.flange_thickness),
                ]
            }
            ComponentSpec::Column(column) => {
                let d = column.dimensions();
                vec![("width", d.width), ("height", d.height)]
            }
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            ComponentSpec::IBeam(beam) => beam.dimensions().section().area(),
            ComponentSpec::Column(column) => column.dimensions().area(),
        }
    }

    /// The two headline dimensions, truncated to whole mm: depth × width for an
    /// I-beam, width × height for a column.
    pub fn nominal_size(&self) -> (i64, i64) {
        match self {
            ComponentSpec::IBeam(beam) => {
                let d = beam.dimensions();
                (d.total_depth as i64, d.flange_width as i64)
            }
            ComponentSpec::Column(column) => {
                let d = column.dimensions();
                (d.width as i64, d.height as i64)
            }
        }
    }

    /// File name stem such as `ibeam_300x150` or `column_200x400`.
    pub fn display_stem(&self) -> String {
        let (a, b) = self.nominal_size();
        format!("{}_{a}x{b}", self.kind().slug())
    }

    /// Stem for the `index`-th (zero-based) member of a batch, e.g. `column_2_400x400`.
    pub fn batch_stem(&self, index: usize) -> String {
        let (a, b) = self.nominal_size();
        format!("{}_{}_{a}x{b}", self.kind().slug(), index + 1)
    }
}

/// Dimensions recovered from a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ParsedProfile {
    #[serde(rename = "ibeam")]
    IBeam(IBeamSection),
    #[serde(rename = "column")]
    Column(ColumnDimensions),
}

impl ParsedProfile {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ParsedProfile::IBeam(_) => ComponentKind::IBeam,
            ParsedProfile::Column(_) => ComponentKind::Column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn sample_beam() -> ComponentSpec {
        let raw = json!({
            "total_depth": 300,
            "flange_width": 150,
            "web_thickness": 8,
            "flange_thickness": 12
        });
        ComponentSpec::from_json(ComponentKind::IBeam, &raw, &Tolerances::default()).unwrap()
    }

    #[test]
    fn test_ibeam_area() {
        // 2 * 150 * 12 + (300 - 24) * 8
        assert_relative_eq!(sample_beam().area(), 5808.0);
    }

    #[test]
    fn test_column_area() {
        let raw = json!({"width": 200, "height": 400});
        let spec =
            ComponentSpec::from_json(ComponentKind::Column, &raw, &Tolerances::default()).unwrap();
        assert_relative_eq!(spec.area(), 80_000.0);
    }

    #[test]
    fn test_missing_length_uses_default() {
        match sample_beam() {
            ComponentSpec::IBeam(beam) => {
                assert_relative_eq!(beam.dimensions().length, DEFAULT_IBEAM_LENGTH_MM)
            }
            other => panic!("expected ibeam, got {other:?}"),
        }
    }

    #[test]
    fn test_display_stem_truncates_to_integers() {
        let raw = json!({"width": 250.7, "height": 400.2});
        let spec =
            ComponentSpec::from_json(ComponentKind::Column, &raw, &Tolerances::default()).unwrap();
        assert_eq!(spec.display_stem(), "column_250x400");
        assert_eq!(sample_beam().display_stem(), "ibeam_300x150");
        assert_eq!(spec.batch_stem(1), "column_2_250x400");
    }

    #[test]
    fn test_parsed_profile_serializes_with_type_and_data() {
        let parsed = ParsedProfile::Column(ColumnDimensions {
            width: 300.0,
            height: 400.0,
        });
        let value = serde_json::to_value(parsed).unwrap();
        assert_eq!(value["type"], "column");
        assert_eq!(value["data"]["width"], 300.0);
    }
}
