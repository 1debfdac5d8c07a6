pub mod size;
pub mod tracker;

pub use size::human_size;
pub use tracker::DownloadTracker;
