//! I-beam validator.
//!
//! Geometry phase checks absolute bounds; the ratio phase applies engineering
//! proportion rules and only runs once the absolute geometry is sound.

use serde_json::Value;

use super::{
    as_object, ensure_at_least, ensure_at_most, ensure_positive, ensure_within, optional_number,
    require_number,
};
use crate::config::Tolerances;
use crate::errors::AppError;
use crate::models::component::{IBeamDimensions, DEFAULT_IBEAM_LENGTH_MM};

pub const REQUIRED_FIELDS: [&str; 4] = [
    "total_depth",
    "flange_width",
    "web_thickness",
    "flange_thickness",
];

/// Full three-phase validation of a raw payload.
pub fn validate(raw: &Value, tolerances: &Tolerances) -> Result<IBeamDimensions, AppError> {
    let dims = validate_schema(raw)?;
    validate_dimensions(&dims, tolerances)?;
    Ok(dims)
}

/// Geometry then ratios, for input that is already typed.
pub fn validate_dimensions(dims: &IBeamDimensions, tolerances: &Tolerances) -> Result<(), AppError> {
    validate_geometry(dims, tolerances)?;
    validate_ratios(dims, tolerances)
}

fn validate_schema(raw: &Value) -> Result<IBeamDimensions, AppError> {
    let object = as_object(raw)?;
    let [total_depth, flange_width, web_thickness, flange_thickness] = [
        require_number(object, REQUIRED_FIELDS[0])?,
        require_number(object, REQUIRED_FIELDS[1])?,
        require_number(object, REQUIRED_FIELDS[2])?,
        require_number(object, REQUIRED_FIELDS[3])?,
    ];
    let length = optional_number(object, "length")?.unwrap_or(DEFAULT_IBEAM_LENGTH_MM);

    Ok(IBeamDimensions {
        length,
        total_depth,
        flange_width,
        web_thickness,
        flange_thickness,
    })
}

fn validate_geometry(d: &IBeamDimensions, t: &Tolerances) -> Result<(), AppError> {
    ensure_positive("length", d.length)?;
    ensure_positive("total_depth", d.total_depth)?;
    ensure_positive("flange_width", d.flange_width)?;
    ensure_positive("web_thickness", d.web_thickness)?;
    ensure_positive("flange_thickness", d.flange_thickness)?;

    ensure_at_most("length", d.length, t.max_ibeam_length_mm)?;
    ensure_within(
        "total_depth",
        d.total_depth,
        t.min_ibeam_depth_mm,
        t.max_ibeam_depth_mm,
    )?;
    ensure_within(
        "flange_width",
        d.flange_width,
        t.min_ibeam_width_mm,
        t.max_ibeam_width_mm,
    )?;
    ensure_at_least("web_thickness", d.web_thickness, t.min_ibeam_web_thickness_mm)?;
    ensure_at_least(
        "flange_thickness",
        d.flange_thickness,
        t.min_ibeam_flange_thickness_mm,
    )?;

    if d.web_thickness >= d.flange_width {
        return Err(AppError::geometry(
            "web_thickness",
            format!(
                "Web thickness ({}) must be less than flange width ({})",
                d.web_thickness, d.flange_width
            ),
        ));
    }
    if d.flange_thickness * 2.0 >= d.total_depth {
        return Err(AppError::geometry(
            "flange_thickness",
            format!(
                "Total flange thickness ({}) must be less than total depth ({})",
                d.flange_thickness * 2.0,
                d.total_depth
            ),
        ));
    }
    Ok(())
}

fn validate_ratios(d: &IBeamDimensions, t: &Tolerances) -> Result<(), AppError> {
    let web_to_depth = d.web_thickness / d.total_depth;
    if d.web_thickness < d.total_depth * t.min_web_to_depth_ratio {
        return Err(AppError::geometry(
            "web_thickness",
            format!(
                "Web thickness to depth ratio {web_to_depth:.4} is below the minimum of {:.4}",
                t.min_web_to_depth_ratio
            ),
        ));
    }

    let width_to_depth = d.flange_width / d.total_depth;
    if d.flange_width < d.total_depth * t.min_width_to_depth_ratio {
        return Err(AppError::geometry(
            "flange_width",
            format!(
                "Flange width to depth ratio {width_to_depth:.4} is below the minimum of {:.4}",
                t.min_width_to_depth_ratio
            ),
        ));
    }

    let flange_to_width = d.flange_thickness / d.flange_width;
    if d.flange_thickness > d.flange_width * t.max_flange_thickness_to_width_ratio {
        return Err(AppError::geometry(
            "flange_thickness",
            format!(
                "Flange thickness to width ratio {flange_to_width:.4} exceeds the maximum of {:.4}",
                t.max_flange_thickness_to_width_ratio
            ),
        ));
    }

    let web_to_width = d.web_thickness / d.flange_width;
    if d.web_thickness > d.flange_width * t.max_web_thickness_to_width_ratio {
        return Err(AppError::geometry(
            "web_thickness",
            format!(
                "Web thickness to width ratio {web_to_width:.4} exceeds the maximum of {:.4}",
                t.max_web_thickness_to_width_ratio
            ),
        ));
    }
    Ok(())
}
