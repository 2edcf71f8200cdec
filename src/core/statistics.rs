use crate::types::NdviValue;
use serde::{Deserialize, Serialize};

/// Missing-data ratio and value range of a raster stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackStatistics {
    pub total_samples: usize,
    pub missing_samples: usize,
    /// Share of missing samples in percent
    pub missing_percentage: f64,
    pub min: Option<NdviValue>,
    pub max: Option<NdviValue>,
}

impl StackStatistics {
    /// Non-finite samples count as missing
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = NdviValue>,
    {
        let mut total_samples = 0usize;
        let mut missing_samples = 0usize;
        let mut min: Option<NdviValue> = None;
        let mut max: Option<NdviValue> = None;

        for value in values {
            total_samples += 1;
            if !value.is_finite() {
                missing_samples += 1;
                continue;
            }
            min = Some(min.map_or(value, |m| m.min(value)));
            max = Some(max.map_or(value, |m| m.max(value)));
        }

        let missing_percentage = if total_samples > 0 {
            missing_samples as f64 / total_samples as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_samples,
            missing_samples,
            missing_percentage,
            min,
            max,
        }
    }

    /// Like [`from_values`](Self::from_values) but a `false` mask also counts as missing
    pub fn from_masked<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a NdviValue, &'a bool)>,
    {
        Self::from_values(
            pairs
                .into_iter()
                .map(|(&value, &valid)| if valid { value } else { NdviValue::NAN }),
        )
    }

    pub fn log_summary(&self, label: &str) {
        log::info!(
            "{}: ratio of missing pixels {:.2}% ({} of {})",
            label,
            self.missing_percentage,
            self.missing_samples,
            self.total_samples
        );
        match (self.min, self.max) {
            (Some(min), Some(max)) => {
                log::info!("{}: NDVI min value {}, NDVI max value {}", label, min, max)
            }
            _ => log::warn!("{}: no finite NDVI values", label),
        }
    }
}
