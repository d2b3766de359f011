use serde_json::Value;

use super::{as_object, ensure_positive, ensure_within, require_number};
use crate::config::Tolerances;
use crate::errors::AppError;
use crate::models::component::ColumnDimensions;

pub fn validate(raw: &Value, tolerances: &Tolerances) -> Result<ColumnDimensions, AppError> {
    let object = as_object(raw)?;
    let dims = ColumnDimensions {
        width: require_number(object, "width")?,
        height: require_number(object, "height")?,
    };
    validate_dimensions(&dims, tolerances)?;
    Ok(dims)
}

pub fn validate_dimensions(dims: &ColumnDimensions, t: &Tolerances) -> Result<(), AppError> {
    // Geometry
    ensure_positive("width", dims.width)?;
    ensure_positive("height", dims.height)?;
    ensure_within("width", dims.width, t.min_column_width_mm, t.max_column_width_mm)?;
    ensure_within(
        "height",
        dims.height,
        t.min_column_height_mm,
        t.max_column_height_mm,
    )?;

    // Ratios
    let aspect = dims.height / dims.width;
    if aspect < t.min_column_aspect_ratio {
        return Err(AppError::geometry(
            "height,width",
            format!(
                "Aspect ratio (height / width) {aspect:.2} is below the minimum of {:.2}",
                t.min_column_aspect_ratio
            ),
        ));
    }
    if aspect > t.max_column_aspect_ratio {
        return Err(AppError::geometry(
            "height,width",
            format!(
                "Aspect ratio (height / width) {aspect:.2} exceeds the maximum of {:.2}",
                t.max_column_aspect_ratio
            ),
        ));
    }
    Ok(())
}
