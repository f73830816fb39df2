/// Settings fixed for every session an importer starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Length of an exam in seconds.
    pub duration: u32,
}

impl Config {
    pub const DEFAULT_DURATION_SECS: u32 = 90 * 60;

    pub const fn with_duration(duration: u32) -> Self {
        Self { duration }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_duration(Self::DEFAULT_DURATION_SECS)
    }
}
