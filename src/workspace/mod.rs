mod loader;
mod scan;

pub use loader::{GraphLoader, LoadedGraph};
pub use scan::{ScanOptions, ScanResult, scan_workspace};
