pub mod normalize;
pub mod pipeline;
pub mod types;

pub use normalize::{normalize_snapshot, DropReason, NormalizedBatch};
pub use pipeline::{run_scan_cycle, ScanInput, ScanReport, ScanStats};
pub use types::ScanSnapshot;
