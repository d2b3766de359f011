use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every value has a default; a value that is set but unparsable aborts startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub max_threads: usize,
    pub limits: SystemLimits,
    pub output_dir: PathBuf,
    pub generation_cache_size: usize,
    pub parse_cache_size: usize,
    pub batch_cache_size: usize,
    pub upload_max_size_bytes: usize,
    pub tolerances: Tolerances,
}

/// System-level limits enforced before any generation work starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemLimits {
    pub max_batch_size: usize,
}

impl Default for SystemLimits {
    fn default() -> Self {
        Self { max_batch_size: 50 }
    }
}

/// Engineering tolerances consumed by the validator. All lengths in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub max_ibeam_length_mm: f64,
    pub min_ibeam_depth_mm: f64,
    pub max_ibeam_depth_mm: f64,
    pub min_ibeam_width_mm: f64,
    pub max_ibeam_width_mm: f64,
    pub min_ibeam_web_thickness_mm: f64,
    pub min_ibeam_flange_thickness_mm: f64,
    /// Web thickness should be at least 1/50th of depth.
    pub min_web_to_depth_ratio: f64,
    /// Flange width should be at least 1/4th of depth.
    pub min_width_to_depth_ratio: f64,
    pub max_flange_thickness_to_width_ratio: f64,
    pub max_web_thickness_to_width_ratio: f64,
    pub min_column_width_mm: f64,
    pub max_column_width_mm: f64,
    pub min_column_height_mm: f64,
    pub max_column_height_mm: f64,
    pub min_column_aspect_ratio: f64,
    pub max_column_aspect_ratio: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            max_ibeam_length_mm: 18_000.0,
            min_ibeam_depth_mm: 80.0,
            max_ibeam_depth_mm: 1_500.0,
            min_ibeam_width_mm: 40.0,
            max_ibeam_width_mm: 1_000.0,
            min_ibeam_web_thickness_mm: 3.0,
            min_ibeam_flange_thickness_mm: 5.0,
            min_web_to_depth_ratio: 0.02,
            min_width_to_depth_ratio: 0.25,
            max_flange_thickness_to_width_ratio: 0.5,
            max_web_thickness_to_width_ratio: 0.5,
            min_column_width_mm: 50.0,
            max_column_width_mm: 2_000.0,
            min_column_height_mm: 50.0,
            max_column_height_mm: 3_000.0,
            min_column_aspect_ratio: 0.33,
            max_column_aspect_ratio: 3.0,
        }
    }
}

impl Tolerances {
    /// Starts from the defaults and applies any environment overrides.
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            max_ibeam_length_mm: env_or("MAX_IBEAM_LENGTH_MM", d.max_ibeam_length_mm)?,
            min_ibeam_depth_mm: env_or("MIN_IBEAM_DEPTH_MM", d.min_ibeam_depth_mm)?,
            max_ibeam_depth_mm: env_or("MAX_IBEAM_DEPTH_MM", d.max_ibeam_depth_mm)?,
            min_ibeam_width_mm: env_or("MIN_IBEAM_WIDTH_MM", d.min_ibeam_width_mm)?,
            max_ibeam_width_mm: env_or("MAX_IBEAM_WIDTH_MM", d.max_ibeam_width_mm)?,
            min_ibeam_web_thickness_mm: env_or(
                "MIN_IBEAM_WEB_THICKNESS_MM",
                d.min_ibeam_web_thickness_mm,
            )?,
            min_ibeam_flange_thickness_mm: env_or(
                "MIN_IBEAM_FLANGE_THICKNESS_MM",
                d.min_ibeam_flange_thickness_mm,
            )?,
            min_web_to_depth_ratio: env_or("MIN_WEB_TO_DEPTH_RATIO", d.min_web_to_depth_ratio)?,
            min_width_to_depth_ratio: env_or(
                "MIN_WIDTH_TO_DEPTH_RATIO",
                d.min_width_to_depth_ratio,
            )?,
            max_flange_thickness_to_width_ratio: env_or(
                "MAX_FLANGE_THICKNESS_TO_WIDTH_RATIO",
                d.max_flange_thickness_to_width_ratio,
            )?,
            max_web_thickness_to_width_ratio: env_or(
                "MAX_WEB_THICKNESS_TO_WIDTH_RATIO",
                d.max_web_thickness_to_width_ratio,
            )?,
            min_column_width_mm: env_or("MIN_COLUMN_WIDTH_MM", d.min_column_width_mm)?,
            max_column_width_mm: env_or("MAX_COLUMN_WIDTH_MM", d.max_column_width_mm)?,
            min_column_height_mm: env_or("MIN_COLUMN_HEIGHT_MM", d.min_column_height_mm)?,
            max_column_height_mm: env_or("MAX_COLUMN_HEIGHT_MM", d.max_column_height_mm)?,
            min_column_aspect_ratio: env_or("MIN_COLUMN_ASPECT_RATIO", d.min_column_aspect_ratio)?,
            max_column_aspect_ratio: env_or("MAX_COLUMN_ASPECT_RATIO", d.max_column_aspect_ratio)?,
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("API_PORT", 8000u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_threads: env_or("MAX_THREADS", 8usize)?,
            limits: SystemLimits {
                max_batch_size: env_or("MAX_BATCH_SIZE", SystemLimits::default().max_batch_size)?,
            },
            output_dir: std::env::var("DXF_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("generated")),
            generation_cache_size: env_or("GENERATION_CACHE_SIZE", 500usize)?,
            parse_cache_size: env_or("PARSE_CACHE_SIZE", 100usize)?,
            batch_cache_size: env_or("BATCH_CACHE_SIZE", 50usize)?,
            upload_max_size_bytes: env_or("UPLOAD_MAX_SIZE_BYTES", 10 * 1024 * 1024usize)?,
            tolerances: Tolerances::from_env()?,
        })
    }

    /// Defaults without touching the environment. Used by tests.
    #[cfg(test)]
    pub fn for_tests(output_dir: PathBuf) -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            max_threads: 4,
            limits: SystemLimits::default(),
            output_dir,
            generation_cache_size: 500,
            parse_cache_size: 100,
            batch_cache_size: 50,
            upload_max_size_bytes: 64 * 1024,
            tolerances: Tolerances::default(),
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
