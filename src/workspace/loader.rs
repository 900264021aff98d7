use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info};

use super::scan::{ScanOptions, scan_workspace};
use crate::graph::{CodeGraph, build_graph};

#[derive(Debug)]
pub struct LoadedGraph {
    pub generation: u64,
    pub root: PathBuf,
    pub graph: CodeGraph,
    pub file_count: usize,
    pub unreadable: usize,
    pub truncated: bool,
    pub elapsed: Duration,
}

type LoadMessage = (u64, Result<LoadedGraph, String>);

/// Every request bumps a shared generation counter. Workers poll it between
/// files and abandon their scan once superseded, and [`GraphLoader::poll`]
/// drops any result that is not from the latest request, so the last
/// request always wins.
pub struct GraphLoader {
    latest: Arc<AtomicU64>,
    pending: Option<u64>,
    tx: Sender<LoadMessage>,
    rx: Receiver<LoadMessage>,
}

impl Default for GraphLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            latest: Arc::new(AtomicU64::new(0)),
            pending: None,
            tx,
            rx,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn request(&mut self, root: PathBuf, options: ScanOptions) -> u64 {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.pending = Some(generation);

        let latest = Arc::clone(&self.latest);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let is_stale = || latest.load(Ordering::SeqCst) != generation;
            let result = match load_graph(generation, &root, &options, &is_stale) {
                Ok(Some(loaded)) => Ok(loaded),
                Ok(None) => {
                    debug!("load #{generation} superseded");
                    return;
                }
                Err(error) => Err(format!("{error:#}")),
            };
            let _ = tx.send((generation, result));
        });

        debug!("requested load #{generation}");
        generation
    }

    /// Returns the latest request's result once it arrives. Results from
    /// superseded requests are discarded.
    pub fn poll(&mut self) -> Option<Result<LoadedGraph, String>> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    if let Some(result) = self.accept(message) {
                        return Some(result);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    pub fn wait(&mut self, timeout: Duration) -> Option<Result<LoadedGraph, String>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(message) => {
                    if let Some(result) = self.accept(message) {
                        return Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn accept(&mut self, (generation, result): LoadMessage) -> Option<Result<LoadedGraph, String>> {
        if self.pending != Some(generation) {
            debug!("discarding stale load #{generation}");
            return None;
        }
        self.pending = None;
        Some(result)
    }
}

fn load_graph(
    generation: u64,
    root: &Path,
    options: &ScanOptions,
    is_stale: &dyn Fn() -> bool,
) -> Result<Option<LoadedGraph>> {
    let started = Instant::now();
    let Some(scan) = scan_workspace(root, options, is_stale)? else {
        return Ok(None);
    };
    if is_stale() {
        return Ok(None);
    }

    let graph = build_graph(&scan.files);
    info!(
        "built graph for {}: {} nodes, {} edges",
        scan.root.display(),
        graph.node_count(),
        graph.edge_count()
    );

    Ok(Some(LoadedGraph {
        generation,
        root: scan.root,
        file_count: scan.files.len(),
        unreadable: scan.unreadable,
        truncated: scan.truncated,
        graph,
        elapsed: started.elapsed(),
    }))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn latest_request_wins() {
        let first = tempdir().unwrap();
        fs::write(first.path().join("one.ts"), "").unwrap();
        let second = tempdir().unwrap();
        fs::write(second.path().join("a.ts"), "import './b';").unwrap();
        fs::write(second.path().join("b.ts"), "").unwrap();

        let mut loader = GraphLoader::new();
        let stale = loader.request(first.path().to_path_buf(), ScanOptions::default());
        let latest = loader.request(second.path().to_path_buf(), ScanOptions::default());
        assert!(latest > stale);
        assert!(loader.is_loading());

        let loaded = loader.wait(Duration::from_secs(30)).unwrap().unwrap();
        assert_eq!(loaded.generation, latest);
        assert_eq!(loaded.graph.node_count(), 2);
        assert_eq!(loaded.graph.edge_count(), 1);
        assert!(!loader.is_loading());

        thread::sleep(Duration::from_millis(50));
        assert!(loader.poll().is_none());
    }

    #[test]
    fn missing_root_reports_error() {
        let dir = tempdir().unwrap();
        let mut loader = GraphLoader::new();
        loader.request(dir.path().join("missing"), ScanOptions::default());
        let error = loader.wait(Duration::from_secs(30)).unwrap().unwrap_err();
        assert!(error.contains("cannot open workspace root"));
    }
}
