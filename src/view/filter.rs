use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::layout::{SimEdge, SimNode};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Free-text filter. Non-matching nodes are dimmed, never removed, so the
/// simulated node and edge counts are the same with or without a query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeFilter {
    query: String,
}

impl NodeFilter {
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    /// Returns whether the trimmed query changed.
    pub fn set_query(&mut self, query: &str) -> bool {
        let query = query.trim();
        if self.query == query {
            return false;
        }
        self.query = query.to_owned();
        true
    }

    /// Fills `dimmed` with one flag per node; all `false` when inactive.
    pub fn compute(&self, nodes: &[SimNode], dimmed: &mut Vec<bool>) {
        dimmed.clear();
        if !self.is_active() {
            dimmed.resize(nodes.len(), false);
            return;
        }

        let matcher = SkimMatcherV2::default();
        dimmed.extend(nodes.iter().map(|node| {
            let by_label = fuzzy_match_score(&matcher, &node.label, &self.query).is_some();
            let by_path = || {
                fuzzy_match_score(&matcher, &node.origin.to_string_lossy(), &self.query).is_some()
            };
            !(by_label || by_path())
        }));
    }
}

/// An edge is dimmed when either endpoint is.
pub fn edge_dimmed(dimmed: &[bool], edge: &SimEdge) -> bool {
    dimmed.get(edge.source).copied().unwrap_or(false)
        || dimmed.get(edge.target).copied().unwrap_or(false)
}
