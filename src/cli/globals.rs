use crate::s3::limits::DEFAULT_WORKERS;

// Define the global arguments
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub retries: u32,
    pub workers: usize,
    pub quiet: bool,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalArgs {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            retries: 3,
            workers: DEFAULT_WORKERS,
            quiet: false,
        }
    }

    pub fn set_retries(&mut self, retries: usize) {
        self.retries = u32::try_from(retries).unwrap_or(3);
    }

    pub fn set_workers(&mut self, workers: usize) {
        self.workers = workers.max(1);
    }
}
