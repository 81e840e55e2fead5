/// Timing and acceptance limits for exchanges with the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Budget for receiving one reply frame
    pub timeout_ms: u64,
    /// Wait between sending a request and starting to read the reply
    pub settle_ms: u32,
    /// Pause between polls that brought no new bytes
    pub poll_interval_ms: u32,
    /// Telemetry replies must be longer than this
    pub min_telemetry_len: usize,
}

impl Config {
    pub const DEFAULT: Config = Config {
        timeout_ms: 100,
        settle_ms: 500,
        poll_interval_ms: 1,
        min_telemetry_len: 55,
    };

    pub fn with_timeout(mut self, timeout_ms: u64) -> Config {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_settle(mut self, settle_ms: u32) -> Config {
        self.settle_ms = settle_ms;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::DEFAULT
    }
}
