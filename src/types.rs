use chrono::{DateTime, NaiveDate, Utc};
use ndarray::{Array2, Array3, Dimension, IntoDimension};
use serde::{Deserialize, Serialize};

/// Real-valued NDVI sample
pub type NdviValue = f32;

/// 2D NDVI raster (row x column)
pub type NdviImage = Array2<NdviValue>;

/// 2D validity mask, `true` marks a usable pixel
pub type ValidityMask = Array2<bool>;

/// 3D NDVI stack (time x row x column)
pub type NdviCube = Array3<NdviValue>;

/// In-band marker for pixels that carry no usable value.
///
/// NaN is never a legal NDVI, so zero NDVI stays distinguishable from missing.
pub const NO_DATA: NdviValue = f32::NAN;

/// Coordinate reference system of the acquisition grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Crs {
    /// Geographic WGS84 coordinates (longitude, latitude)
    Wgs84,
    /// Projected coordinates identified by EPSG code (e.g., UTM)
    Epsg(u32),
    /// Any other definition, kept verbatim (WKT or PROJ string)
    Custom(String),
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Crs::Wgs84 => write!(f, "EPSG:4326"),
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Custom(def) => write!(f, "{}", def),
        }
    }
}

/// Affine geotransform in GDAL ordering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform without rotation
    pub fn north_up(top_left_x: f64, top_left_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            top_left_x,
            pixel_width,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height: -pixel_height.abs(),
        }
    }

    /// Map coordinates of the upper-left corner of pixel (row, col)
    pub fn pixel_to_map(&self, row: usize, col: usize) -> (f64, f64) {
        let (r, c) = (row as f64, col as f64);
        (
            self.top_left_x + c * self.pixel_width + r * self.rotation_x,
            self.top_left_y + c * self.rotation_y + r * self.pixel_height,
        )
    }
}

/// Spatial reference shared by every raster of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialMetadata {
    pub crs: Crs,
    pub geo_transform: GeoTransform,
}

/// Cloud information delivered with an acquisition
#[derive(Debug, Clone)]
pub enum CloudLayer {
    /// Sentinel-2 scene classification (SCL) codes
    SceneClassification(Array2<u8>),
    /// Cloud probability in [0, 1]
    Probability(Array2<f32>),
}

impl CloudLayer {
    pub fn dim(&self) -> (usize, usize) {
        match self {
            CloudLayer::SceneClassification(scl) => scl.dim(),
            CloudLayer::Probability(prob) => prob.dim(),
        }
    }
}

/// One raw observation as handed over by the extract stage
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub timestamp: DateTime<Utc>,
    pub ndvi: NdviImage,
    pub cloud: CloudLayer,
    /// Data availability, 0 = no data / out of swath
    pub coverage: Array2<u8>,
    pub spatial: SpatialMetadata,
}

impl Acquisition {
    /// UTC calendar date used for bucketing
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// NDVI raster paired with its derived validity mask
#[derive(Debug, Clone)]
pub struct MaskedRaster {
    pub timestamp: DateTime<Utc>,
    pub ndvi: NdviImage,
    pub mask: ValidityMask,
}

impl MaskedRaster {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn valid_pixels(&self) -> usize {
        self.mask.iter().filter(|&&v| v).count()
    }
}

/// One reduced raster per grid timestamp
#[derive(Debug, Clone)]
pub struct DekadComposite {
    pub target: NaiveDate,
    pub ndvi: NdviImage,
    pub mask: ValidityMask,
    /// Number of acquisitions that fell into this bucket
    pub contributors: usize,
}

impl DekadComposite {
    /// Fully invalid composite for a bucket that received nothing usable
    pub fn empty(target: NaiveDate, shape: (usize, usize)) -> Self {
        Self {
            target,
            ndvi: Array2::from_elem(shape, NO_DATA),
            mask: Array2::from_elem(shape, false),
            contributors: 0,
        }
    }

    pub fn valid_pixels(&self) -> usize {
        self.mask.iter().filter(|&&v| v).count()
    }
}

/// Error types for dekadal compositing
#[derive(Debug, thiserror::Error)]
pub enum DekadError {
    #[error("Shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Temporal grid has no timestamps")]
    EmptyGrid,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DekadError {
    /// Shapes of any dimensionality, e.g. `(rows, cols)` or `(times, rows, cols)`
    pub fn shape_mismatch<D: IntoDimension>(context: impl Into<String>, expected: D, found: D) -> Self {
        DekadError::ShapeMismatch {
            context: context.into(),
            expected: expected.into_dimension().slice().to_vec(),
            found: found.into_dimension().slice().to_vec(),
        }
    }
}

/// Result type for compositing operations
pub type DekadResult<T> = Result<T, DekadError>;
