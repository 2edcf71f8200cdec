use crate::core::grid::TemporalGrid;
use crate::types::{DekadComposite, DekadError, DekadResult, MaskedRaster, NdviValue, NO_DATA};
use ndarray::Array2;
use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Per-pixel reduction applied to the valid samples of one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Reducer {
    /// Median of valid samples, robust to residual cloud-edge outliers
    #[default]
    Median,
    /// Maximum value composite
    Maximum,
    /// Arithmetic mean
    Mean,
}

impl Reducer {
    /// Reduce `values` in place; `None` when there is nothing to reduce
    pub fn reduce<T: Float>(&self, values: &mut [T]) -> Option<T> {
        match self {
            Reducer::Median => median(values),
            Reducer::Maximum => values.iter().copied().reduce(Float::max),
            Reducer::Mean => mean(values),
        }
    }
}

/// Median; an even count yields the mean of the two middle values
pub fn median<T: Float>(values: &mut [T]) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        let two = T::one() + T::one();
        Some((values[mid - 1] + values[mid]) / two)
    }
}

fn mean<T: Float>(values: &[T]) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    let sum = values.iter().fold(T::zero(), |acc, &v| acc + v);
    T::from(values.len()).map(|n| sum / n)
}

/// Groups masked acquisitions into grid buckets and reduces each bucket to one composite
#[derive(Debug, Clone, Default)]
pub struct DekadAggregator {
    reducer: Reducer,
}

impl DekadAggregator {
    pub fn new(reducer: Reducer) -> Self {
        Self { reducer }
    }

    pub fn reducer(&self) -> Reducer {
        self.reducer
    }

    /// One composite per grid timestamp, in grid order
    pub fn aggregate(
        &self,
        rasters: &[MaskedRaster],
        grid: &TemporalGrid,
    ) -> DekadResult<Vec<DekadComposite>> {
        let shape = common_shape(rasters)?;
        log::info!(
            "Aggregating {} acquisitions onto {} grid targets ({:?} reducer)",
            rasters.len(),
            grid.len(),
            self.reducer
        );

        let mut buckets: Vec<Vec<&MaskedRaster>> = vec![Vec::new(); grid.len()];
        let mut dropped = 0usize;
        for raster in rasters {
            match grid.bucket_of(raster.date()) {
                Some(index) => buckets[index].push(raster),
                None => {
                    dropped += 1;
                    log::debug!("Acquisition {} lies outside the grid, dropping", raster.date());
                }
            }
        }
        if dropped > 0 {
            log::warn!("{} acquisitions fell outside the temporal grid", dropped);
        }

        let composites = grid
            .timestamps()
            .iter()
            .zip(buckets.iter())
            .map(|(&target, bucket)| {
                log::debug!(
                    "Using {:?} to composite target date {}",
                    bucket.iter().map(|r| r.date().to_string()).collect::<Vec<_>>(),
                    target
                );
                if bucket.is_empty() {
                    log::warn!("No acquisitions for target date {}, composite left invalid", target);
                    DekadComposite::empty(target, shape)
                } else {
                    self.reduce_bucket(target, bucket, shape)
                }
            })
            .collect();

        Ok(composites)
    }

    fn reduce_bucket(
        &self,
        target: chrono::NaiveDate,
        bucket: &[&MaskedRaster],
        shape: (usize, usize),
    ) -> DekadComposite {
        let mut ndvi = Array2::from_elem(shape, NO_DATA);
        let mut mask = Array2::from_elem(shape, false);

        #[cfg(feature = "parallel")]
        {
            use ndarray::Axis;
            use rayon::prelude::*;

            ndvi.axis_iter_mut(Axis(0))
                .into_par_iter()
                .zip(mask.axis_iter_mut(Axis(0)))
                .enumerate()
                .for_each(|(row, (mut values, mut valid))| {
                    for col in 0..values.len() {
                        if let Some(reduced) = self.reduce_pixel(bucket, row, col) {
                            values[col] = reduced;
                            valid[col] = true;
                        }
                    }
                });
        }

        #[cfg(not(feature = "parallel"))]
        ndarray::Zip::indexed(&mut ndvi)
            .and(&mut mask)
            .for_each(|(row, col), value, valid| {
                if let Some(reduced) = self.reduce_pixel(bucket, row, col) {
                    *value = reduced;
                    *valid = true;
                }
            });

        DekadComposite {
            target,
            ndvi,
            mask,
            contributors: bucket.len(),
        }
    }

    fn reduce_pixel(&self, bucket: &[&MaskedRaster], row: usize, col: usize) -> Option<NdviValue> {
        let mut samples: Vec<NdviValue> = bucket
            .iter()
            .filter(|raster| raster.mask[[row, col]])
            .map(|raster| raster.ndvi[[row, col]])
            .filter(|value| value.is_finite())
            .collect();
        self.reducer.reduce(&mut samples)
    }
}

/// Shape shared by every raster and mask of the input
fn common_shape(rasters: &[MaskedRaster]) -> DekadResult<(usize, usize)> {
    let first = rasters
        .first()
        .ok_or_else(|| DekadError::InvalidInput("no acquisitions to aggregate".to_string()))?;
    let shape = first.ndvi.dim();

    for raster in rasters {
        if raster.ndvi.dim() != shape {
            return Err(DekadError::shape_mismatch(
                format!("acquisition {}", raster.date()),
                shape,
                raster.ndvi.dim(),
            ));
        }
        if raster.mask.dim() != shape {
            return Err(DekadError::shape_mismatch(
                format!("validity mask of acquisition {}", raster.date()),
                shape,
                raster.mask.dim(),
            ));
        }
    }
    Ok(shape)
}
