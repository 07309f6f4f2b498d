//! Paging a region into the cache ahead of use.

use std::sync::Arc;

use log::{debug, warn};

use super::extraction_task::ExtractionTask;
use crate::error::{TerrainError, TerrainResult};
use crate::streaming::task_management::task::{Task, TaskResult};
use crate::streaming::{StreamEvent, StreamingContext};
use crate::voxels::region::Region;

/// Pages every chunk of a region into the cache.
///
/// With a `follow_up` slot the region is extracted into that slot once the
/// prefetch succeeds.
pub struct PrefetchTask {
    context: Arc<StreamingContext>,
    region: Region,
    follow_up: Option<usize>,
}

impl PrefetchTask {
    /// Creates a prefetch of `region`, optionally chained to an extraction
    /// into `follow_up`.
    pub fn new(context: Arc<StreamingContext>, region: Region, follow_up: Option<usize>) -> Self {
        Self {
            context,
            region,
            follow_up,
        }
    }
}

impl Task for PrefetchTask {
    fn process(&self) -> Box<dyn TaskResult> {
        // The halo keeps boundary faces of the extraction inside resident chunks.
        let target = match self.follow_up {
            Some(_) => self.region.expanded(1),
            None => self.region,
        };
        Box::new(PrefetchTaskResult {
            region: self.region,
            follow_up: self.follow_up,
            outcome: self.context.cache.prefetch(&target),
        })
    }

    fn fail(&self, error: TerrainError) -> Box<dyn TaskResult> {
        Box::new(PrefetchTaskResult {
            region: self.region,
            follow_up: self.follow_up,
            outcome: Err(error),
        })
    }
}

struct PrefetchTaskResult {
    region: Region,
    follow_up: Option<usize>,
    outcome: TerrainResult<usize>,
}

impl TaskResult for PrefetchTaskResult {
    fn handle_result(
        self: Box<Self>,
        context: &Arc<StreamingContext>,
    ) -> (Vec<Box<dyn Task>>, Vec<StreamEvent>) {
        match (self.outcome, self.follow_up) {
            (Ok(chunks), None) => {
                debug!("Region {} resident ({} chunks)", self.region, chunks);
                (
                    Vec::new(),
                    vec![StreamEvent::RegionPrefetched {
                        region: self.region,
                        chunks,
                    }],
                )
            }
            (Ok(_), Some(slot)) => {
                let task = ExtractionTask::new(Arc::clone(context), self.region, slot);
                (vec![Box::new(task)], Vec::new())
            }
            (Err(error), follow_up) => {
                warn!("Prefetch of region {} failed: {}", self.region, error);
                let event = context.fail_request(self.region, follow_up, error);
                (Vec::new(), vec![event])
            }
        }
    }
}
