//! Batch planning
//!
//! Splits a target scene count into sequential batches sized by the panel's
//! fidelity mode.

use serde::{Deserialize, Serialize};
use studio_core::ValidationError;

/// Trade-off between per-call quality and number of calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FidelityMode {
    /// Small batches, more calls
    HighFidelity,
    /// Default
    #[default]
    Standard,
    /// Large batches, fewer calls
    Fast,
}

impl FidelityMode {
    /// Scenes requested per call
    #[inline]
    #[must_use]
    pub fn batch_size(self) -> u32 {
        match self {
            FidelityMode::HighFidelity => 10,
            FidelityMode::Standard => 15,
            FidelityMode::Fast => 20,
        }
    }
}

/// One planned batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    /// 0-based index
    pub index: usize,
    /// Nominal number of the first scene
    pub start_number: u32,
    /// Scenes requested
    pub count: u32,
}

/// Clamp a requested count into `[min, max]`
#[inline]
#[must_use]
pub fn clamp_count(requested: u32, min: u32, max: u32) -> u32 {
    requested.clamp(min.max(1), max.max(min.max(1)))
}

/// Split `total` scenes into batches of at most `batch_size`
///
/// # Errors
/// - `ValidationError::ZeroBatchSize` if `batch_size` is 0
pub fn plan_batches(total: u32, batch_size: u32) -> Result<Vec<BatchPlan>, ValidationError> {
    if batch_size == 0 {
        return Err(ValidationError::ZeroBatchSize);
    }
    let mut plans = Vec::with_capacity(total.div_ceil(batch_size) as usize);
    let mut start = 1;
    let mut remaining = total;
    while remaining > 0 {
        let count = remaining.min(batch_size);
        plans.push(BatchPlan {
            index: plans.len(),
            start_number: start,
            count,
        });
        start += count;
        remaining -= count;
    }
    Ok(plans)
}
