mod build;
mod detect;
mod model;
mod resolve;

pub use build::{GraphBuilder, build_graph};
pub use detect::{Detection, FileKind, MARKUP_EXTENSIONS, SOURCE_EXTENSIONS, SourceFile};
pub use model::{CodeGraph, EdgeKind, GraphEdge, GraphNode, NodeType};
pub use resolve::{FileIndex, normalize_path};
