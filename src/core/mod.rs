//! Core transform stages

pub mod mask;
pub mod grid;
pub mod aggregate;
pub mod interpolate;
pub mod assemble;
pub mod coverage;
pub mod statistics;
pub mod pipeline;

// Re-export main types
pub use mask::{MaskEvaluator, MaskParams};
pub use grid::{GridKind, TemporalGrid, DEKAD_DAYS};
pub use aggregate::{DekadAggregator, Reducer};
pub use interpolate::{fill_series, FilledStack, GapFiller};
pub use assemble::{CompositeAssembler, Cube};
pub use coverage::{check_search_window, has_dates_around, SearchCoverage};
pub use statistics::StackStatistics;
pub use pipeline::{CompositeConfig, DekadalCompositor};
