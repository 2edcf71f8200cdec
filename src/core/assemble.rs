use crate::core::grid::TemporalGrid;
use crate::core::interpolate::FilledStack;
use crate::core::statistics::StackStatistics;
use crate::types::{DekadError, DekadResult, NdviCube, NdviValue, SpatialMetadata};
use chrono::NaiveDate;
use ndarray::{Array3, ArrayView2, Axis};

/// Final gap-filled NDVI cube (time x row x column) with its coordinates
#[derive(Debug, Clone)]
pub struct Cube {
    timestamps: Vec<NaiveDate>,
    values: NdviCube,
    observed: Array3<bool>,
    spatial: SpatialMetadata,
    unrecoverable_pixels: usize,
}

impl Cube {
    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    /// Values; `NO_DATA` (NaN) marks pixels that could not be recovered
    pub fn values(&self) -> &NdviCube {
        &self.values
    }

    /// `true` where the value came from an observation, not interpolation
    pub fn observed(&self) -> &Array3<bool> {
        &self.observed
    }

    pub fn spatial(&self) -> &SpatialMetadata {
        &self.spatial
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.values.dim()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn unrecoverable_pixels(&self) -> usize {
        self.unrecoverable_pixels
    }

    /// Single-band raster for timestamp `index`
    pub fn band(&self, index: usize) -> Option<ArrayView2<'_, NdviValue>> {
        if index < self.len() {
            Some(self.values.index_axis(Axis(0), index))
        } else {
            None
        }
    }

    /// Band for the given date, if it is on the grid
    pub fn band_at(&self, date: NaiveDate) -> Option<ArrayView2<'_, NdviValue>> {
        let index = self.timestamps.iter().position(|&t| t == date)?;
        self.band(index)
    }

    /// Mean of finite pixels per timestamp, NaN when a band has none
    pub fn spatial_mean_series(&self) -> Vec<(NaiveDate, NdviValue)> {
        self.timestamps
            .iter()
            .zip(self.values.axis_iter(Axis(0)))
            .map(|(&date, band)| {
                let (sum, count) = band
                    .iter()
                    .filter(|v| v.is_finite())
                    .fold((0.0f64, 0usize), |(sum, count), &v| (sum + v as f64, count + 1));
                let mean = if count > 0 {
                    (sum / count as f64) as NdviValue
                } else {
                    NdviValue::NAN
                };
                (date, mean)
            })
            .collect()
    }

    pub fn statistics(&self) -> StackStatistics {
        StackStatistics::from_values(self.values.iter().copied())
    }

    /// Decompose into timestamps, values and spatial metadata
    pub fn into_parts(self) -> (Vec<NaiveDate>, NdviCube, SpatialMetadata) {
        (self.timestamps, self.values, self.spatial)
    }
}

/// Stacks filled rasters along the grid's time axis
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeAssembler;

impl CompositeAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(
        &self,
        filled: FilledStack,
        grid: &TemporalGrid,
        spatial: SpatialMetadata,
    ) -> DekadResult<Cube> {
        if grid.is_empty() {
            return Err(DekadError::EmptyGrid);
        }

        let (times, rows, cols) = filled.dim();
        if times != grid.len() {
            return Err(DekadError::shape_mismatch(
                format!("filled stack time axis ({} layers for {} grid targets)", times, grid.len()),
                (grid.len(), rows, cols),
                (times, rows, cols),
            ));
        }

        log::info!(
            "Assembled cube: {} timestamps of {}x{} pixels in {}",
            times,
            rows,
            cols,
            spatial.crs
        );

        Ok(Cube {
            timestamps: grid.timestamps().to_vec(),
            values: filled.values,
            observed: filled.observed,
            spatial,
            unrecoverable_pixels: filled.unrecoverable_pixels,
        })
    }
}
