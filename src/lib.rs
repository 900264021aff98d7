//! Interactive force-directed view of a workspace's code graph.

pub mod app;
pub mod graph;
pub mod layout;
pub mod settings;
pub mod util;
pub mod view;
pub mod workspace;
