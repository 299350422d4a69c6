use crate::{Controller, MAX_SEGMENTS, drivers::neopixel::LedDriver};

/// Runner task for one segment. Spawn one per configured segment
#[embassy_executor::task(pool_size = MAX_SEGMENTS)]
pub async fn segment_task(controller: &'static Controller<LedDriver>, segment: usize) {
    controller.run_segment(segment).await
}
