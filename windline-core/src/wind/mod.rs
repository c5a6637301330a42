//! Wind Field Access
//!
//! - **field**: validated gridded wind snapshot with a spatial index
//! - **sampler**: nearest-cell sampling and local variability
//! - **propagation**: forecast interface and a simple trend model

mod field;
mod propagation;
mod sampler;

pub use field::{Bounds, WindField, WindFieldData, DEFAULT_CONFIDENCE};
pub use propagation::{LinearTrendPredictor, WindPropagationPredictor};
pub use sampler::{
    local_variability, sample, WindFieldSampler, WindSample, DIRECTION_VARIABILITY_WEIGHT,
    SPEED_VARIABILITY_WEIGHT,
};

#[cfg(test)]
pub(crate) use field::tests::grid_field;
