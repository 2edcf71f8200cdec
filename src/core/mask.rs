use crate::types::{
    Acquisition, CloudLayer, DekadError, DekadResult, MaskedRaster, NdviImage, ValidityMask,
};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Sentinel-2 scene classification codes that never yield a usable pixel
pub const SCL_NO_DATA: u8 = 0;
pub const SCL_SATURATED_DEFECTIVE: u8 = 1;
pub const SCL_CLOUD_SHADOW: u8 = 3;
pub const SCL_CLOUD_MEDIUM_PROBABILITY: u8 = 8;
pub const SCL_CLOUD_HIGH_PROBABILITY: u8 = 9;
pub const SCL_THIN_CIRRUS: u8 = 10;

/// Masking parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskParams {
    /// SCL classes treated as cloud / unusable
    pub invalid_classes: Vec<u8>,
    /// Cloud probability at or above which a pixel is cloudy
    pub cloud_probability_threshold: f32,
    /// Treat non-finite NDVI values as invalid in the mask; composites skip them either way
    pub reject_non_finite: bool,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            invalid_classes: vec![
                SCL_NO_DATA,
                SCL_SATURATED_DEFECTIVE,
                SCL_CLOUD_SHADOW,
                SCL_CLOUD_MEDIUM_PROBABILITY,
                SCL_CLOUD_HIGH_PROBABILITY,
                SCL_THIN_CIRRUS,
            ],
            cloud_probability_threshold: 0.4,
            reject_non_finite: true,
        }
    }
}

/// Derives per-acquisition validity masks
#[derive(Debug, Clone, Default)]
pub struct MaskEvaluator {
    params: MaskParams,
}

impl MaskEvaluator {
    pub fn new(params: MaskParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MaskParams {
        &self.params
    }

    /// Annotate one acquisition with its validity mask
    pub fn evaluate(&self, acquisition: &Acquisition) -> DekadResult<MaskedRaster> {
        let mask = self.evaluate_channels(&acquisition.ndvi, &acquisition.cloud, &acquisition.coverage)?;
        log::debug!(
            "Acquisition {}: {} of {} pixels valid",
            acquisition.timestamp.format("%Y-%m-%d"),
            mask.iter().filter(|&&v| v).count(),
            mask.len()
        );

        Ok(MaskedRaster {
            timestamp: acquisition.timestamp,
            ndvi: acquisition.ndvi.clone(),
            mask,
        })
    }

    /// Mask every acquisition, failing on the first malformed one
    pub fn evaluate_all(&self, acquisitions: &[Acquisition]) -> DekadResult<Vec<MaskedRaster>> {
        acquisitions.iter().map(|acq| self.evaluate(acq)).collect()
    }

    /// A pixel is invalid when the cloud channel flags it or the coverage
    /// channel reports no data.
    pub fn evaluate_channels(
        &self,
        ndvi: &NdviImage,
        cloud: &CloudLayer,
        coverage: &Array2<u8>,
    ) -> DekadResult<ValidityMask> {
        let shape = ndvi.dim();
        if cloud.dim() != shape {
            return Err(DekadError::shape_mismatch("cloud channel", shape, cloud.dim()));
        }
        if coverage.dim() != shape {
            return Err(DekadError::shape_mismatch("coverage channel", shape, coverage.dim()));
        }

        let cloud_free = match cloud {
            CloudLayer::SceneClassification(scl) => {
                scl.mapv(|class| !self.params.invalid_classes.contains(&class))
            }
            CloudLayer::Probability(prob) => {
                let threshold = self.params.cloud_probability_threshold;
                prob.mapv(|p| p.is_finite() && p < threshold)
            }
        };

        let reject_non_finite = self.params.reject_non_finite;
        let mask = Zip::from(ndvi)
            .and(&cloud_free)
            .and(coverage)
            .map_collect(|&value, &clear, &covered| {
                clear && covered != 0 && (!reject_non_finite || value.is_finite())
            });

        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_scene_classification_mask() {
        let ndvi = array![[0.1f32, 0.2, 0.3], [0.4, 0.5, 0.6]];
        let scl = array![[4u8, 8, 9], [3, 5, 10]];
        let coverage = Array2::from_elem((2, 3), 1u8);

        let mask = MaskEvaluator::default()
            .evaluate_channels(&ndvi, &CloudLayer::SceneClassification(scl), &coverage)
            .unwrap();

        assert_eq!(mask, array![[true, false, false], [false, true, false]]);
    }

    #[test]
    fn test_coverage_overrides_clear_sky() {
        let ndvi = Array2::from_elem((2, 2), 0.5f32);
        let scl = Array2::from_elem((2, 2), 4u8);
        let coverage = array![[1u8, 0], [0, 1]];

        let mask = MaskEvaluator::default()
            .evaluate_channels(&ndvi, &CloudLayer::SceneClassification(scl), &coverage)
            .unwrap();

        assert_eq!(mask, array![[true, false], [false, true]]);
    }

    #[test]
    fn test_probability_threshold() {
        let ndvi = Array2::from_elem((1, 4), 0.5f32);
        let prob = array![[0.0f32, 0.39, 0.4, f32::NAN]];
        let coverage = Array2::from_elem((1, 4), 1u8);

        let mask = MaskEvaluator::default()
            .evaluate_channels(&ndvi, &CloudLayer::Probability(prob), &coverage)
            .unwrap();

        assert_eq!(mask, array![[true, true, false, false]]);
    }

    #[test]
    fn test_non_finite_ndvi_is_invalid() {
        let ndvi = array![[f32::NAN, 0.0]];
        let scl = array![[4u8, 4]];
        let coverage = array![[1u8, 1]];
        let cloud = CloudLayer::SceneClassification(scl);

        let mask = MaskEvaluator::default()
            .evaluate_channels(&ndvi, &cloud, &coverage)
            .unwrap();
        assert_eq!(mask, array![[false, true]]);

        let lenient = MaskEvaluator::new(MaskParams {
            reject_non_finite: false,
            ..MaskParams::default()
        });
        let mask = lenient.evaluate_channels(&ndvi, &cloud, &coverage).unwrap();
        assert_eq!(mask, array![[true, true]]);
    }

    #[test]
    fn test_shape_mismatch() {
        let ndvi = Array2::from_elem((2, 2), 0.5f32);
        let scl = Array2::from_elem((2, 3), 4u8);
        let coverage = Array2::from_elem((2, 2), 1u8);

        let result = MaskEvaluator::default()
            .evaluate_channels(&ndvi, &CloudLayer::SceneClassification(scl), &coverage);
        assert!(matches!(result, Err(DekadError::ShapeMismatch { .. })));

        let scl = Array2::from_elem((2, 2), 4u8);
        let coverage = Array2::from_elem((3, 2), 1u8);
        let result = MaskEvaluator::default()
            .evaluate_channels(&ndvi, &CloudLayer::SceneClassification(scl), &coverage);
        assert!(matches!(result, Err(DekadError::ShapeMismatch { .. })));
    }
}
