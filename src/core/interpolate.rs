use crate::types::{DekadComposite, DekadError, DekadResult, NdviCube, NdviValue, NO_DATA};
use ndarray::{Array3, ArrayView1, ArrayViewMut1, Axis, Zip};
use num_traits::Float;

/// Gap-filled stack, time x row x column
#[derive(Debug, Clone)]
pub struct FilledStack {
    /// Filled values, `NO_DATA` where a pixel never had a valid sample
    pub values: NdviCube,
    /// `true` where the value was observed rather than interpolated
    pub observed: Array3<bool>,
    /// Number of pixel locations without a single valid sample
    pub unrecoverable_pixels: usize,
}

impl FilledStack {
    pub fn dim(&self) -> (usize, usize, usize) {
        self.values.dim()
    }

    pub fn len(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-pixel temporal gap filling over a uniform grid.
///
/// Interior gaps are linearly interpolated in grid-step units, leading and
/// trailing gaps hold the nearest valid value, and a pixel with no valid
/// sample at all stays `NO_DATA` at every timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct GapFiller;

impl GapFiller {
    pub fn new() -> Self {
        Self
    }

    /// Fill a sequence of composites in grid order
    pub fn fill(&self, composites: &[DekadComposite]) -> DekadResult<FilledStack> {
        let shape = match composites.first() {
            Some(first) => first.ndvi.dim(),
            None => {
                return Ok(FilledStack {
                    values: Array3::from_elem((0, 0, 0), NO_DATA),
                    observed: Array3::from_elem((0, 0, 0), false),
                    unrecoverable_pixels: 0,
                })
            }
        };
        let (rows, cols) = shape;
        let n = composites.len();

        let mut values = Array3::from_elem((n, rows, cols), NO_DATA);
        let mut observed = Array3::from_elem((n, rows, cols), false);
        for (t, composite) in composites.iter().enumerate() {
            if composite.ndvi.dim() != shape {
                return Err(DekadError::shape_mismatch(
                    format!("composite {}", composite.target),
                    shape,
                    composite.ndvi.dim(),
                ));
            }
            if composite.mask.dim() != shape {
                return Err(DekadError::shape_mismatch(
                    format!("validity mask of composite {}", composite.target),
                    shape,
                    composite.mask.dim(),
                ));
            }
            Zip::from(values.index_axis_mut(Axis(0), t))
                .and(observed.index_axis_mut(Axis(0), t))
                .and(&composite.ndvi)
                .and(&composite.mask)
                .for_each(|out, seen, &value, &valid| {
                    if valid && value.is_finite() {
                        *out = value;
                        *seen = true;
                    }
                });
        }

        let missing = observed.iter().filter(|&&v| !v).count();
        log::info!(
            "Gap filling {} timestamps of {}x{} pixels ({} missing samples)",
            n,
            rows,
            cols,
            missing
        );

        let unrecoverable_pixels = Self::fill_cube(&mut values, &observed)?;
        if unrecoverable_pixels > 0 {
            log::warn!(
                "{} pixels have no valid sample in any composite and stay NO_DATA",
                unrecoverable_pixels
            );
        }

        Ok(FilledStack {
            values,
            observed,
            unrecoverable_pixels,
        })
    }

    /// Fill every time lane of `values` in place using `valid`; returns the
    /// number of unrecoverable pixel locations.
    pub fn fill_cube(values: &mut NdviCube, valid: &Array3<bool>) -> DekadResult<usize> {
        if values.dim() != valid.dim() {
            return Err(DekadError::shape_mismatch(
                "gap-fill validity mask",
                values.dim(),
                valid.dim(),
            ));
        }

        #[cfg(feature = "parallel")]
        Zip::from(values.lanes_mut(Axis(0)))
            .and(valid.lanes(Axis(0)))
            .par_for_each(|lane, valid_lane| {
                fill_lane(lane, valid_lane);
            });

        #[cfg(not(feature = "parallel"))]
        Zip::from(values.lanes_mut(Axis(0)))
            .and(valid.lanes(Axis(0)))
            .for_each(|lane, valid_lane| {
                fill_lane(lane, valid_lane);
            });

        let unrecoverable = valid
            .lanes(Axis(0))
            .into_iter()
            .filter(|lane| !lane.iter().any(|&v| v))
            .count();
        Ok(unrecoverable)
    }
}

/// Fill one pixel's time series in place; returns `false` when it had no
/// valid sample.
pub fn fill_series(values: &mut [NdviValue], valid: &[bool]) -> DekadResult<bool> {
    if values.len() != valid.len() {
        return Err(DekadError::shape_mismatch(
            "pixel time series",
            values.len(),
            valid.len(),
        ));
    }
    Ok(fill_lane(ArrayViewMut1::from(values), ArrayView1::from(valid)))
}

fn fill_lane(mut values: ArrayViewMut1<NdviValue>, valid: ArrayView1<bool>) -> bool {
    let anchors: Vec<usize> = valid
        .iter()
        .enumerate()
        .filter(|(_, &v)| v)
        .map(|(i, _)| i)
        .collect();

    match anchors.as_slice() {
        [] => {
            values.fill(NO_DATA);
            false
        }
        [only] => {
            let value = values[*only];
            values.fill(value);
            true
        }
        [first, .., last] => {
            let (first, last) = (*first, *last);

            let head = values[first];
            for i in 0..first {
                values[i] = head;
            }
            let tail = values[last];
            for i in last + 1..values.len() {
                values[i] = tail;
            }

            for pair in anchors.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let (va, vb) = (values[a], values[b]);
                for i in a + 1..b {
                    values[i] = lerp(va, vb, (i - a) as f64 / (b - a) as f64);
                }
            }
            true
        }
    }
}

fn lerp<T: Float>(from: T, to: T, weight: f64) -> T {
    let w = T::from(weight).unwrap_or_else(T::zero);
    from + (to - from) * w
}
