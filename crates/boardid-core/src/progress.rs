//! Progress reporting for long-running device operations

/// Progress callbacks for byte-oriented operations such as clearing
pub trait Progress {
    /// Called when an operation over `total_bytes` starts
    fn begin(&mut self, label: &str, total_bytes: usize);

    /// Called after each chunk with the running byte count
    fn advance(&mut self, bytes_done: usize);

    /// Called when the operation is complete
    fn finish(&mut self);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn begin(&mut self, _label: &str, _total_bytes: usize) {}
    fn advance(&mut self, _bytes_done: usize) {}
    fn finish(&mut self) {}
}
