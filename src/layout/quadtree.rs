use eframe::egui::{Vec2, vec2};

const QUADTREE_LEAF_CAPACITY: usize = 12;
const QUADTREE_MAX_DEPTH: usize = 10;

#[derive(Clone, Copy, Debug)]
pub(super) struct QuadBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl QuadBounds {
    fn from_points(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);

        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
            return None;
        }

        let span = (max - min).max(vec2(1.0, 1.0));
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: (span.max_elem() * 0.5) + 1.0,
        })
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let offset = match quadrant {
            0 => vec2(-quarter, -quarter),
            1 => vec2(quarter, -quarter),
            2 => vec2(-quarter, quarter),
            _ => vec2(quarter, quarter),
        };

        Self {
            center: self.center + offset,
            half_extent: quarter,
        }
    }

    fn quadrant_for(self, point: Vec2) -> usize {
        match (point.x >= self.center.x, point.y >= self.center.y) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }

    /// Squared gap between two cells; zero when they overlap.
    fn distance_sq_to(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let dx = ((self.center.x - other.center.x).abs() - reach).max(0.0);
        let dy = ((self.center.y - other.center.y).abs() - reach).max(0.0);
        (dx * dx) + (dy * dy)
    }
}

pub(super) struct QuadNode {
    bounds: QuadBounds,
    indices: Vec<usize>,
    children: [Option<Box<QuadNode>>; 4],
}

/// One partition cell, exposed for the debug overlay.
#[derive(Clone, Copy, Debug)]
pub struct QuadtreeCell {
    pub center: Vec2,
    pub half_extent: f32,
    pub depth: usize,
    pub is_leaf: bool,
}

impl QuadNode {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let bounds = QuadBounds::from_points(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::build_node(bounds, indices, positions, 0))
    }

    fn build_node(
        bounds: QuadBounds,
        indices: Vec<usize>,
        positions: &[Vec2],
        depth: usize,
    ) -> Self {
        let mut node = Self {
            bounds,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= QUADTREE_MAX_DEPTH || node.indices.len() <= QUADTREE_LEAF_CAPACITY {
            return node;
        }

        let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
        for &index in &node.indices {
            buckets[bounds.quadrant_for(positions[index])].push(index);
        }

        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return node;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            node.children[quadrant] = Some(Box::new(Self::build_node(
                bounds.child(quadrant),
                bucket,
                positions,
                depth + 1,
            )));
        }
        node.indices.clear();
        node
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }

    /// Visits every unordered pair of points whose cells lie within
    /// `max_distance_sq` of each other, each pair exactly once. Callers
    /// still check the exact distance; the tree only prunes far cells.
    pub(super) fn for_each_near_pair(&self, max_distance_sq: f32, visit: &mut impl FnMut(usize, usize)) {
        Self::visit_pairs(self, self, true, max_distance_sq, visit);
    }

    fn visit_pairs(
        node_a: &QuadNode,
        node_b: &QuadNode,
        same_node: bool,
        max_distance_sq: f32,
        visit: &mut impl FnMut(usize, usize),
    ) {
        if node_a.bounds.distance_sq_to(node_b.bounds) > max_distance_sq {
            return;
        }

        if node_a.is_leaf() && node_b.is_leaf() {
            if same_node {
                for (offset, &from) in node_a.indices.iter().enumerate() {
                    for &to in &node_a.indices[offset + 1..] {
                        visit(from, to);
                    }
                }
            } else {
                for &from in &node_a.indices {
                    for &to in &node_b.indices {
                        visit(from, to);
                    }
                }
            }
            return;
        }

        if same_node {
            for first in 0..4 {
                let Some(child_a) = node_a.children[first].as_deref() else {
                    continue;
                };

                Self::visit_pairs(child_a, child_a, true, max_distance_sq, visit);

                for second in (first + 1)..4 {
                    let Some(child_b) = node_a.children[second].as_deref() else {
                        continue;
                    };
                    Self::visit_pairs(child_a, child_b, false, max_distance_sq, visit);
                }
            }
            return;
        }

        let split_a = if node_a.is_leaf() {
            false
        } else if node_b.is_leaf() {
            true
        } else {
            node_a.bounds.half_extent >= node_b.bounds.half_extent
        };

        if split_a {
            for child in node_a.children.iter().flatten() {
                Self::visit_pairs(child, node_b, false, max_distance_sq, visit);
            }
        } else {
            for child in node_b.children.iter().flatten() {
                Self::visit_pairs(node_a, child, false, max_distance_sq, visit);
            }
        }
    }

    pub(super) fn collect_cells(&self, depth: usize, cells: &mut Vec<QuadtreeCell>) {
        cells.push(QuadtreeCell {
            center: self.bounds.center,
            half_extent: self.bounds.half_extent,
            depth,
            is_leaf: self.is_leaf(),
        });

        for child in self.children.iter().flatten() {
            child.collect_cells(depth + 1, cells);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn scattered(count: usize) -> Vec<Vec2> {
        (0..count)
            .map(|index| {
                let angle = index as f32 * 2.399_963;
                let radius = 12.0 * (index as f32).sqrt();
                vec2(angle.cos() * radius, angle.sin() * radius)
            })
            .collect()
    }

    #[test]
    fn near_pairs_match_brute_force_within_cutoff() {
        let positions = scattered(300);
        let cutoff = 45.0_f32;
        let cutoff_sq = cutoff * cutoff;

        let tree = QuadNode::build(&positions).unwrap();
        let mut visited = BTreeSet::new();
        let mut duplicates = 0;
        tree.for_each_near_pair(cutoff_sq, &mut |a, b| {
            if (positions[a] - positions[b]).length_sq() <= cutoff_sq
                && !visited.insert((a.min(b), a.max(b)))
            {
                duplicates += 1;
            }
        });

        let mut expected = BTreeSet::new();
        for a in 0..positions.len() {
            for b in (a + 1)..positions.len() {
                if (positions[a] - positions[b]).length_sq() <= cutoff_sq {
                    expected.insert((a, b));
                }
            }
        }

        assert_eq!(duplicates, 0);
        assert_eq!(visited, expected);
    }

    #[test]
    fn coincident_points_stay_in_one_leaf() {
        let positions = vec![Vec2::ZERO; 40];
        let tree = QuadNode::build(&positions).unwrap();
        let mut pairs = 0;
        tree.for_each_near_pair(1.0, &mut |_, _| pairs += 1);
        assert_eq!(pairs, 40 * 39 / 2);

        let mut cells = Vec::new();
        tree.collect_cells(0, &mut cells);
        assert_eq!(cells.len(), 1);
    }

    #[test]
    fn empty_input_builds_nothing() {
        assert!(QuadNode::build(&[]).is_none());
    }
}
