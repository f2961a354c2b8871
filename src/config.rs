/// Tunables for an [`Engine`](crate::Engine) run.
///
/// Every field has a documented default, and a zero value passed at
/// construction is treated as "use the default".
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of the bounded event channel. Backpressure flows through
    /// this channel: a slow consumer stalls the dispatcher rather than
    /// events being dropped.
    pub event_channel_capacity: usize,
    /// Capacity of each per-worker command channel feeding its instances.
    pub worker_channel_capacity: usize,
}

impl EngineConfig {
    /// Default event channel capacity.
    pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;
    /// Default per-worker command channel capacity.
    pub const DEFAULT_WORKER_CHANNEL_CAPACITY: usize = 8;

    pub(crate) fn normalized(mut self) -> Self {
        if self.event_channel_capacity == 0 {
            self.event_channel_capacity = Self::DEFAULT_EVENT_CHANNEL_CAPACITY;
        }
        if self.worker_channel_capacity == 0 {
            self.worker_channel_capacity = Self::DEFAULT_WORKER_CHANNEL_CAPACITY;
        }
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: Self::DEFAULT_EVENT_CHANNEL_CAPACITY,
            worker_channel_capacity: Self::DEFAULT_WORKER_CHANNEL_CAPACITY,
        }
    }
}
