use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use crossgfx_core::gpu::{
    GraphicsError,
    GraphicsResult,
};

use super::*;

/// Converts two timestamp query values into wall time. `timestamp_period` is nanoseconds per tick.
pub(crate) fn ticks_to_duration(start: u64, end: u64, timestamp_period: f32) -> Duration {
    let ticks = end.saturating_sub(start);
    Duration::from_nanos((ticks as f64 * timestamp_period as f64) as u64)
}

/// Progress of the begin/end timestamp pair of a command buffer.
/// Results are only read once both timestamps were recorded and the buffer was submitted,
/// the queries are unwritten otherwise and waiting on them never returns.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ProfileState {
    Idle,
    Begun,
    Ended,
    Submitted,
}

impl ProfileState {
    pub(crate) fn begin(self) -> Option<Self> {
        match self {
            ProfileState::Begun => None,
            _ => Some(ProfileState::Begun),
        }
    }

    pub(crate) fn end(self) -> Option<Self> {
        match self {
            ProfileState::Begun => Some(ProfileState::Ended),
            _ => None,
        }
    }

    pub(crate) fn submit(self) -> Self {
        match self {
            ProfileState::Ended => ProfileState::Submitted,
            state => state,
        }
    }

    pub(crate) fn check_readable(self) -> GraphicsResult<()> {
        match self {
            ProfileState::Submitted => Ok(()),
            ProfileState::Idle => Err(GraphicsError::InvalidUsage("No profile was recorded".to_string())),
            ProfileState::Begun => Err(GraphicsError::InvalidUsage("begin_profile without end_profile".to_string())),
            ProfileState::Ended => Err(GraphicsError::InvalidUsage(
                "The profiled command buffer wasn't submitted".to_string(),
            )),
        }
    }
}

pub struct VkQueryPool {
    device: Arc<RawVkDevice>,
    query_pool: vk::QueryPool,
    query_count: u32,
}

impl VkQueryPool {
    pub fn new(device: &Arc<RawVkDevice>, query_type: vk::QueryType, query_count: u32) -> GraphicsResult<Self> {
        let query_pool = unsafe {
            device.create_query_pool(
                &vk::QueryPoolCreateInfo {
                    flags: vk::QueryPoolCreateFlags::empty(),
                    query_type,
                    query_count,
                    pipeline_statistics: vk::QueryPipelineStatisticFlags::empty(),
                    ..Default::default()
                },
                None,
            )
        }
        .map_vk("vkCreateQueryPool")?;
        Ok(Self {
            query_pool,
            device: device.clone(),
            query_count,
        })
    }

    pub fn handle(&self) -> vk::QueryPool {
        self.query_pool
    }

    pub fn query_count(&self) -> u32 {
        self.query_count
    }

    pub(crate) unsafe fn reset(&self, command_buffer: vk::CommandBuffer) {
        self.device.cmd_reset_query_pool(command_buffer, self.query_pool, 0, self.query_count);
    }

    /// Reads every query of the pool, waiting for results that aren't available yet.
    pub(crate) fn results(&self) -> GraphicsResult<Vec<u64>> {
        let mut data = vec![0u64; self.query_count as usize];
        unsafe {
            self.device
                .get_query_pool_results(self.query_pool, 0, &mut data, vk::QueryResultFlags::TYPE_64 | vk::QueryResultFlags::WAIT)
                .map_vk("vkGetQueryPoolResults")?;
        }
        Ok(data)
    }

    pub(crate) fn elapsed(&self) -> GraphicsResult<Duration> {
        if self.query_count < 2 {
            return Err(GraphicsError::InvalidUsage("Timing needs two timestamp queries".to_string()));
        }
        let results = self.results()?;
        Ok(ticks_to_duration(results[0], results[1], self.device.timestamp_period()))
    }
}

impl Hash for VkQueryPool {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.query_pool.hash(state);
    }
}

impl PartialEq for VkQueryPool {
    fn eq(&self, other: &Self) -> bool {
        self.query_pool == other.query_pool
    }
}

impl Eq for VkQueryPool {}

impl Drop for VkQueryPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_query_pool(self.query_pool, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_scale_with_period() {
        assert_eq!(ticks_to_duration(100, 1100, 1.0f32), Duration::from_nanos(1000));
        assert_eq!(ticks_to_duration(0, 1000, 52.08f32).as_micros(), 52);
        assert_eq!(ticks_to_duration(500, 100, 1.0f32), Duration::ZERO);
    }

    #[test]
    fn profile_is_readable_after_submit_only() {
        let mut state = ProfileState::Idle;
        assert!(matches!(state.check_readable(), Err(GraphicsError::InvalidUsage(_))));
        assert_eq!(state.end(), None);
        assert_eq!(state.submit(), ProfileState::Idle);

        state = state.begin().unwrap();
        assert_eq!(state.begin(), None);
        assert!(state.check_readable().is_err());
        assert_eq!(state.submit(), ProfileState::Begun);

        state = state.end().unwrap();
        assert_eq!(state, ProfileState::Ended);
        assert!(state.check_readable().is_err());

        state = state.submit();
        assert!(state.check_readable().is_ok());
        assert_eq!(state.submit(), ProfileState::Submitted);
        assert_eq!(state.begin(), Some(ProfileState::Begun));
    }
}
