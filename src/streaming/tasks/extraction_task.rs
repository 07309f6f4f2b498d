//! Extracting a leased region into a mesh slot.

use std::sync::Arc;

use log::warn;

use crate::error::{TerrainError, TerrainResult};
use crate::streaming::task_management::task::{Task, TaskResult};
use crate::streaming::{StreamEvent, StreamingContext};
use crate::voxels::region::Region;

/// Extracts a region into a mesh slot.
///
/// The region plus a one-voxel halo is leased for the duration of the
/// extraction, so neither the region's chunks nor the neighbours its boundary
/// faces look at can be evicted halfway through.
pub struct ExtractionTask {
    context: Arc<StreamingContext>,
    region: Region,
    slot: usize,
}

impl ExtractionTask {
    /// Creates an extraction of `region` into the acquired `slot`.
    pub fn new(context: Arc<StreamingContext>, region: Region, slot: usize) -> Self {
        Self {
            context,
            region,
            slot,
        }
    }

    fn extract(&self) -> TerrainResult<(usize, usize)> {
        let StreamingContext {
            cache,
            pool,
            extractor,
        } = self.context.as_ref();
        let lease = cache.lease(&self.region.expanded(1))?;
        pool.fill(self.slot, |mesh| {
            extractor.extract_into(&lease, &self.region, mesh)?;
            Ok((mesh.vertices().len(), mesh.indices().len()))
        })
    }
}

impl Task for ExtractionTask {
    fn process(&self) -> Box<dyn TaskResult> {
        Box::new(ExtractionTaskResult {
            region: self.region,
            slot: self.slot,
            outcome: self.extract(),
        })
    }

    fn fail(&self, error: TerrainError) -> Box<dyn TaskResult> {
        Box::new(ExtractionTaskResult {
            region: self.region,
            slot: self.slot,
            outcome: Err(error),
        })
    }
}

struct ExtractionTaskResult {
    region: Region,
    slot: usize,
    outcome: TerrainResult<(usize, usize)>,
}

impl TaskResult for ExtractionTaskResult {
    fn handle_result(
        self: Box<Self>,
        context: &Arc<StreamingContext>,
    ) -> (Vec<Box<dyn Task>>, Vec<StreamEvent>) {
        let event = match self.outcome {
            Ok((vertices, indices)) => StreamEvent::MeshReady {
                region: self.region,
                slot: self.slot,
                vertices,
                indices,
            },
            Err(error) => {
                warn!(
                    "Extraction of region {} into slot {} failed: {}",
                    self.region, self.slot, error
                );
                context.fail_request(self.region, Some(self.slot), error)
            }
        };
        (Vec::new(), vec![event])
    }
}
