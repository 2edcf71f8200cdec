use crate::core::aggregate::{DekadAggregator, Reducer};
use crate::core::assemble::{CompositeAssembler, Cube};
use crate::core::grid::{GridKind, TemporalGrid};
use crate::core::interpolate::GapFiller;
use crate::core::mask::{MaskEvaluator, MaskParams};
use crate::core::statistics::StackStatistics;
use crate::types::{Acquisition, DekadError, DekadResult, SpatialMetadata};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Settings for one compositing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeConfig {
    /// First grid target
    pub start: NaiveDate,
    /// Last admissible grid target
    pub end: NaiveDate,
    pub grid: GridKind,
    pub reducer: Reducer,
    pub mask: MaskParams,
}

impl CompositeConfig {
    /// Ten-day grid, median reduction and Sentinel-2 SCL masking
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            grid: GridKind::default(),
            reducer: Reducer::default(),
            mask: MaskParams::default(),
        }
    }

    pub fn temporal_grid(&self) -> DekadResult<TemporalGrid> {
        TemporalGrid::from_kind(self.grid, self.start, self.end)
    }
}

/// Runs mask evaluation, aggregation, gap filling and assembly in sequence
#[derive(Debug, Clone)]
pub struct DekadalCompositor {
    config: CompositeConfig,
    masker: MaskEvaluator,
    aggregator: DekadAggregator,
    filler: GapFiller,
    assembler: CompositeAssembler,
}

impl DekadalCompositor {
    pub fn new(config: CompositeConfig) -> Self {
        Self {
            masker: MaskEvaluator::new(config.mask.clone()),
            aggregator: DekadAggregator::new(config.reducer),
            filler: GapFiller::new(),
            assembler: CompositeAssembler::new(),
            config,
        }
    }

    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    /// Build the gap-filled cube from raw acquisitions in any order.
    ///
    /// Structural errors abort the run without partial output.
    pub fn run(&self, acquisitions: &[Acquisition]) -> DekadResult<Cube> {
        log::info!(
            "Creating dekadal NDVI composite {}..{} from {} acquisitions",
            self.config.start,
            self.config.end,
            acquisitions.len()
        );

        let spatial = common_spatial(acquisitions)?;
        let grid = self.config.temporal_grid()?;
        log::info!(
            "Number of dekadal targets: {}. Targets: {:?}",
            grid.len(),
            grid.timestamps().iter().map(|t| t.to_string()).collect::<Vec<_>>()
        );

        let mut masked = self.masker.evaluate_all(acquisitions)?;
        masked.sort_by_key(|raster| raster.timestamp);

        StackStatistics::from_masked(
            masked
                .iter()
                .flat_map(|raster| raster.ndvi.iter().zip(raster.mask.iter())),
        )
        .log_summary("Raw acquisitions");

        let composites = self.aggregator.aggregate(&masked, &grid)?;
        let filled = self.filler.fill(&composites)?;
        let cube = self.assembler.assemble(filled, &grid, spatial)?;

        cube.statistics().log_summary("Dekadal composite");
        log::info!("Interpolated dekadal NDVI composite obtained successfully");
        Ok(cube)
    }
}

/// Spatial metadata shared by all acquisitions
fn common_spatial(acquisitions: &[Acquisition]) -> DekadResult<SpatialMetadata> {
    let first = acquisitions
        .first()
        .ok_or_else(|| DekadError::InvalidInput("no acquisitions supplied".to_string()))?;

    if let Some(other) = acquisitions.iter().find(|acq| acq.spatial != first.spatial) {
        return Err(DekadError::InvalidInput(format!(
            "acquisition {} has spatial reference {} / {:?}, expected {} / {:?}",
            other.timestamp,
            other.spatial.crs,
            other.spatial.geo_transform,
            first.spatial.crs,
            first.spatial.geo_transform
        )));
    }
    Ok(first.spatial.clone())
}
