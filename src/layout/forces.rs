use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;
use super::{SimEdge, SimNode};

/// Distance substituted for coincident points before normalizing.
pub(super) const EPSILON_DISTANCE: f32 = 0.01;
/// Per-tick displacement cap; keeps near-coincident pairs from exploding.
pub(super) const MAX_SPEED: f32 = 50.0;

/// Deterministic unit vector for a pair with no usable direction.
fn fallback_direction(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * TAU;
    vec2(angle.cos(), angle.sin())
}

/// Unit vector from `from` to `to` and the (epsilon-substituted) distance.
fn direction_between(positions: &[Vec2], from: usize, to: usize) -> (Vec2, f32) {
    let delta = positions[to] - positions[from];
    let distance = delta.length();
    if distance > EPSILON_DISTANCE {
        (delta / distance, distance)
    } else {
        (fallback_direction(from, to), EPSILON_DISTANCE)
    }
}

/// Inverse-square repulsion between every pair closer than `cutoff`.
pub(super) fn apply_repulsion(
    nodes: &mut [SimNode],
    positions: &[Vec2],
    strength: f32,
    cutoff: f32,
    alpha: f32,
) {
    if strength <= 0.0 || nodes.len() < 2 {
        return;
    }
    let Some(tree) = QuadNode::build(positions) else {
        return;
    };

    let cutoff_sq = cutoff * cutoff;
    let scaled = strength * alpha;
    tree.for_each_near_pair(cutoff_sq, &mut |a, b| {
        let (direction, distance) = direction_between(positions, a, b);
        if distance * distance > cutoff_sq {
            return;
        }
        let push = direction * (scaled / (distance * distance));
        nodes[a].velocity -= push;
        nodes[b].velocity += push;
    });
}

/// Hooke springs along every edge toward the kind's rest length.
pub(super) fn apply_springs(
    nodes: &mut [SimNode],
    positions: &[Vec2],
    edges: &[SimEdge],
    spring: f32,
    rest_length: impl Fn(&SimEdge) -> f32,
    alpha: f32,
) {
    for edge in edges {
        if edge.source == edge.target {
            continue;
        }
        let (direction, distance) = direction_between(positions, edge.source, edge.target);
        let pull = direction * ((distance - rest_length(edge)) * spring * alpha);
        nodes[edge.source].velocity += pull;
        nodes[edge.target].velocity -= pull;
    }
}

/// Centering, damping and integration. Pinned nodes keep their position
/// and have their velocity held at zero.
pub(super) fn integrate(nodes: &mut [SimNode], centering: f32, damping: f32, alpha: f32) {
    for node in nodes {
        if node.pinned {
            node.velocity = Vec2::ZERO;
            continue;
        }

        let mut velocity = (node.velocity - node.position * (centering * alpha)) * damping;
        let speed = velocity.length();
        if speed > MAX_SPEED {
            velocity *= MAX_SPEED / speed;
        }
        if !velocity.x.is_finite() || !velocity.y.is_finite() {
            velocity = Vec2::ZERO;
        }

        node.velocity = velocity;
        node.position += velocity;
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::graph::NodeType;

    fn node(position: Vec2, velocity: Vec2) -> SimNode {
        SimNode {
            id: "n".to_owned(),
            label: "n".to_owned(),
            node_type: NodeType::Other,
            origin: PathBuf::from("/w/n"),
            parent: None,
            radius: 6.0,
            position,
            velocity,
            pinned: false,
        }
    }

    #[test]
    fn integration_adds_damped_velocity() {
        let mut nodes = [node(vec2(10.0, 0.0), vec2(2.0, 4.0))];
        integrate(&mut nodes, 0.0, 0.5, 1.0);
        assert_eq!(nodes[0].velocity, vec2(1.0, 2.0));
        assert_eq!(nodes[0].position, vec2(11.0, 2.0));
    }

    #[test]
    fn integration_caps_speed_and_drops_non_finite_velocity() {
        let mut nodes = [
            node(Vec2::ZERO, vec2(3000.0, 4000.0)),
            node(vec2(1.0, 1.0), vec2(f32::NAN, 0.0)),
        ];
        integrate(&mut nodes, 0.0, 1.0, 1.0);

        assert!((nodes[0].velocity.length() - MAX_SPEED).abs() < 1e-3);
        assert!((nodes[0].position - vec2(30.0, 40.0)).length() < 1e-3);
        assert_eq!(nodes[1].velocity, Vec2::ZERO);
        assert_eq!(nodes[1].position, vec2(1.0, 1.0));
    }

    #[test]
    fn pinned_nodes_do_not_move() {
        let mut nodes = [node(vec2(5.0, 5.0), vec2(9.0, 9.0))];
        nodes[0].pinned = true;
        integrate(&mut nodes, 0.1, 0.9, 1.0);
        assert_eq!(nodes[0].position, vec2(5.0, 5.0));
        assert_eq!(nodes[0].velocity, Vec2::ZERO);
    }
}
