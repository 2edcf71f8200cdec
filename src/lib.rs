//! ndvi-dekad: Dekadal NDVI Composite Cube Builder
//!
//! This library turns irregularly timed, partially cloud-covered Sentinel-2
//! NDVI acquisitions into a regular 10-day (dekadal) time series: invalid
//! pixels are masked, acquisitions are reduced per dekad, remaining gaps are
//! filled along each pixel's own time series, and the result is stacked into
//! a gapless cube with its coordinates.

pub mod types;
pub mod core;

// Re-export main types and functions for easier access
pub use crate::types::{
    Acquisition, CloudLayer, Crs, DekadComposite, DekadError, DekadResult, GeoTransform,
    MaskedRaster, NdviCube, NdviImage, SpatialMetadata, ValidityMask, NO_DATA,
};

pub use crate::core::{
    CompositeAssembler, CompositeConfig, Cube, DekadAggregator, DekadalCompositor, GapFiller,
    GridKind, MaskEvaluator, MaskParams, Reducer, TemporalGrid,
};

#[cfg(feature = "python")]
mod python {
    use crate::core::{CompositeConfig, DekadalCompositor, GapFiller, GridKind, TemporalGrid};
    use crate::types::{Acquisition, CloudLayer, Crs, DekadError, DekadResult, GeoTransform, SpatialMetadata};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use ndarray::Axis;
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    impl From<DekadError> for PyErr {
        fn from(err: DekadError) -> PyErr {
            PyValueError::new_err(err.to_string())
        }
    }

    fn parse_date(value: &str) -> DekadResult<NaiveDate> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|e| DekadError::InvalidInput(format!("invalid date '{}': {}", value, e)))
    }

    /// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates
    fn parse_timestamp(value: &str) -> DekadResult<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
            return Ok(ts.with_timezone(&Utc));
        }
        let midnight = parse_date(value)?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| DekadError::InvalidInput(format!("invalid timestamp '{}'", value)))?;
        Ok(Utc.from_utc_datetime(&midnight))
    }

    fn format_dates(dates: &[NaiveDate]) -> Vec<String> {
        dates.iter().map(|d| d.to_string()).collect()
    }

    /// Fixed-step grid targets as `YYYY-MM-DD` strings
    #[pyfunction]
    #[pyo3(signature = (start, end, step_days=10))]
    fn build_grid(start: &str, end: &str, step_days: i64) -> PyResult<Vec<String>> {
        let grid = TemporalGrid::build(parse_date(start)?, parse_date(end)?, step_days)?;
        Ok(format_dates(grid.timestamps()))
    }

    /// Calendar dekad targets (1st, 11th, 21st) as `YYYY-MM-DD` strings
    #[pyfunction]
    fn calendar_dekads(start: &str, end: &str) -> PyResult<Vec<String>> {
        let grid = TemporalGrid::calendar_dekads(parse_date(start)?, parse_date(end)?)?;
        Ok(format_dates(grid.timestamps()))
    }

    /// Gap-fill a (time, row, col) array where NaN marks invalid samples
    #[pyfunction]
    fn fill_gaps<'py>(py: Python<'py>, values: PyReadonlyArray3<'py, f32>) -> PyResult<&'py PyArray3<f32>> {
        let mut cube = values.as_array().to_owned();
        let filled = py.allow_threads(move || -> DekadResult<_> {
            let valid = cube.mapv(|v| v.is_finite());
            GapFiller::fill_cube(&mut cube, &valid)?;
            Ok(cube)
        })?;
        Ok(filled.into_pyarray(py))
    }

    /// Run the full transform on stacked Sentinel-2 NDVI, SCL and dataMask arrays
    #[pyfunction]
    #[pyo3(signature = (dates, ndvi, scl, data_mask, start, end, step_days=10, epsg=4326, transform=(0.0, 1.0, 0.0, 0.0, 0.0, -1.0)))]
    #[allow(clippy::too_many_arguments)]
    fn dekadal_composite<'py>(
        py: Python<'py>,
        dates: Vec<String>,
        ndvi: PyReadonlyArray3<'py, f32>,
        scl: PyReadonlyArray3<'py, u8>,
        data_mask: PyReadonlyArray3<'py, u8>,
        start: &str,
        end: &str,
        step_days: i64,
        epsg: u32,
        transform: (f64, f64, f64, f64, f64, f64),
    ) -> PyResult<(Vec<String>, &'py PyArray3<f32>)> {
        let ndvi = ndvi.as_array();
        let scl = scl.as_array();
        let data_mask = data_mask.as_array();

        if ndvi.len_of(Axis(0)) != dates.len() {
            return Err(DekadError::InvalidInput(format!(
                "{} dates for {} NDVI rasters",
                dates.len(),
                ndvi.len_of(Axis(0))
            ))
            .into());
        }
        if scl.len_of(Axis(0)) != dates.len() || data_mask.len_of(Axis(0)) != dates.len() {
            return Err(DekadError::InvalidInput(
                "SCL and dataMask stacks must have one raster per date".to_string(),
            )
            .into());
        }

        let crs = if epsg == 4326 { Crs::Wgs84 } else { Crs::Epsg(epsg) };
        let spatial = SpatialMetadata {
            crs,
            geo_transform: GeoTransform {
                top_left_x: transform.0,
                pixel_width: transform.1,
                rotation_x: transform.2,
                top_left_y: transform.3,
                rotation_y: transform.4,
                pixel_height: transform.5,
            },
        };

        let mut acquisitions = Vec::with_capacity(dates.len());
        for (i, date) in dates.iter().enumerate() {
            acquisitions.push(Acquisition {
                timestamp: parse_timestamp(date)?,
                ndvi: ndvi.index_axis(Axis(0), i).to_owned(),
                cloud: CloudLayer::SceneClassification(scl.index_axis(Axis(0), i).to_owned()),
                coverage: data_mask.index_axis(Axis(0), i).to_owned(),
                spatial: spatial.clone(),
            });
        }

        let mut config = CompositeConfig::new(parse_date(start)?, parse_date(end)?);
        config.grid = GridKind::Fixed { step_days };

        let cube = py.allow_threads(move || DekadalCompositor::new(config).run(&acquisitions))?;
        let (timestamps, values, _) = cube.into_parts();
        Ok((format_dates(&timestamps), values.into_pyarray(py)))
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(build_grid, m)?)?;
        m.add_function(wrap_pyfunction!(calendar_dekads, m)?)?;
        m.add_function(wrap_pyfunction!(fill_gaps, m)?)?;
        m.add_function(wrap_pyfunction!(dekadal_composite, m)?)?;
        Ok(())
    }
}
