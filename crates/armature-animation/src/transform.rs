//! Local and global transform evaluation over the scene graph
//!
//! Global transforms are accumulated top-down:
//! `global[node] = parent_global * local[node]`, starting from the given
//! roots. The walk is an explicit depth-first stack with a visited set, so
//! malformed graphs fail with an error instead of recursing forever.

use crate::scene::{Node, SceneGraph};
use armature_core::{ArmatureError, Result};
use glam::{Mat4, Quat, Vec3};

/// A node's local pose split into translation, rotation and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for NodePose {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl NodePose {
    /// Rest pose of a node. Matrix nodes are decomposed.
    pub fn rest(node: &Node) -> Self {
        if node.has_matrix() {
            let (scale, rotation, translation) =
                Mat4::from_cols_slice(&node.matrix).to_scale_rotation_translation();
            return Self {
                translation,
                rotation,
                scale,
            };
        }

        let mut pose = Self::default();
        if let [x, y, z] = node.translation[..] {
            pose.translation = Vec3::new(x, y, z);
        }
        if let [x, y, z, w] = node.rotation[..] {
            pose.rotation = Quat::from_xyzw(x, y, z, w);
        }
        if let [x, y, z] = node.scale[..] {
            pose.scale = Vec3::new(x, y, z);
        }
        pose
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Evaluate one node's local transform.
///
/// An explicit 16-value matrix is returned verbatim. Otherwise the identity
/// is multiplied by translation, then rotation, then scale; a vector of the
/// wrong length skips only that step.
pub fn evaluate_local_transform(node: &Node) -> Mat4 {
    if node.has_matrix() {
        return Mat4::from_cols_slice(&node.matrix);
    }
    if !node.matrix.is_empty() {
        log::debug!(
            "Ignoring matrix with {} values (expected 16)",
            node.matrix.len()
        );
    }

    let mut transform = Mat4::IDENTITY;

    match node.translation[..] {
        [x, y, z] => transform *= Mat4::from_translation(Vec3::new(x, y, z)),
        [] => {}
        _ => log::debug!(
            "Skipping translation with {} components",
            node.translation.len()
        ),
    }

    match node.rotation[..] {
        // Source order is x, y, z, w
        [x, y, z, w] => transform *= Mat4::from_quat(Quat::from_xyzw(x, y, z, w)),
        [] => {}
        _ => log::debug!("Skipping rotation with {} components", node.rotation.len()),
    }

    match node.scale[..] {
        [x, y, z] => transform *= Mat4::from_scale(Vec3::new(x, y, z)),
        [] => {}
        _ => log::debug!("Skipping scale with {} components", node.scale.len()),
    }

    transform
}

/// Local transform of every node, indexed by node
pub fn evaluate_local_transforms(graph: &SceneGraph) -> Vec<Mat4> {
    graph.nodes.iter().map(evaluate_local_transform).collect()
}

/// Depth-first preorder walk from `roots`, siblings in declared order.
///
/// `visit` receives the node index and its parent's carried value and
/// returns the value handed to the node's children. Returns the number of
/// nodes visited; reaching a node twice is an error.
fn walk<T, F>(graph: &SceneGraph, roots: &[usize], seed: T, mut visit: F) -> Result<usize>
where
    T: Copy,
    F: FnMut(usize, T) -> T,
{
    let node_count = graph.nodes.len();
    let mut visited = vec![false; node_count];
    let mut stack: Vec<(usize, T)> = roots.iter().rev().map(|&r| (r, seed)).collect();
    let mut visits = 0;

    while let Some((index, carried)) = stack.pop() {
        let node = graph
            .nodes
            .get(index)
            .ok_or(ArmatureError::NodeOutOfRange { index, node_count })?;
        if std::mem::replace(&mut visited[index], true) {
            return Err(ArmatureError::InvalidSceneGraph(format!(
                "node {} reached twice during traversal",
                index
            )));
        }

        let passed = visit(index, carried);
        visits += 1;

        for &child in node.children.iter().rev() {
            stack.push((child, passed));
        }
    }

    Ok(visits)
}

/// Propagate global transforms into `out`, in place.
///
/// Only nodes reachable from `roots` are written; every other entry keeps
/// its current value. Returns the number of nodes visited, each exactly once.
pub fn propagate_global_transforms(
    graph: &SceneGraph,
    locals: &[Mat4],
    roots: &[usize],
    parent: Mat4,
    out: &mut [Mat4],
) -> Result<usize> {
    let node_count = graph.nodes.len();
    if locals.len() != node_count {
        return Err(ArmatureError::TransformTableSize {
            expected: node_count,
            got: locals.len(),
        });
    }
    if out.len() != node_count {
        return Err(ArmatureError::TransformTableSize {
            expected: node_count,
            got: out.len(),
        });
    }

    walk(graph, roots, parent, |index, parent_global| {
        let global = parent_global * locals[index];
        out[index] = global;
        global
    })
}

/// Global transform table for the subtrees under `roots`.
///
/// Unreachable nodes keep the identity.
pub fn evaluate_global_transforms(
    graph: &SceneGraph,
    locals: &[Mat4],
    roots: &[usize],
    parent: Mat4,
) -> Result<Vec<Mat4>> {
    let mut globals = vec![Mat4::IDENTITY; graph.nodes.len()];
    propagate_global_transforms(graph, locals, roots, parent, &mut globals)?;
    Ok(globals)
}

/// Nodes under `roots` in traversal order, paired with their depth
pub fn hierarchy(graph: &SceneGraph, roots: &[usize]) -> Result<Vec<(usize, usize)>> {
    let mut order = Vec::with_capacity(graph.nodes.len());
    walk(graph, roots, 0usize, |index, depth| {
        order.push((index, depth));
        depth + 1
    })?;
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use std::f32::consts::FRAC_PI_2;

    fn assert_mat_eq(a: &Mat4, b: &Mat4) {
        assert!(
            a.abs_diff_eq(*b, 1e-5),
            "matrices differ:\n{:?}\n{:?}",
            a,
            b
        );
    }

    fn trs_node(translation: [f32; 3], children: Vec<usize>) -> Node {
        Node {
            translation: translation.to_vec(),
            children,
            ..Default::default()
        }
    }

    fn graph(nodes: Vec<Node>, roots: Vec<usize>) -> SceneGraph {
        SceneGraph::new(nodes, Some(Scene { name: None, roots }))
    }

    #[test]
    fn empty_node_is_identity() {
        assert_mat_eq(&evaluate_local_transform(&Node::default()), &Mat4::IDENTITY);
    }

    #[test]
    fn explicit_matrix_wins_over_trs() {
        let m = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
        let node = Node {
            matrix: m.to_cols_array().to_vec(),
            translation: vec![100.0, 0.0, 0.0],
            rotation: vec![0.0, 1.0, 0.0, 0.0],
            scale: vec![9.0, 9.0, 9.0],
            ..Default::default()
        };
        assert_eq!(evaluate_local_transform(&node), m);
    }

    #[test]
    fn trs_composes_in_fixed_order() {
        let node = Node {
            translation: vec![1.0, 2.0, 3.0],
            rotation: vec![0.0, (FRAC_PI_2 / 2.0).sin(), 0.0, (FRAC_PI_2 / 2.0).cos()],
            scale: vec![2.0, 2.0, 2.0],
            ..Default::default()
        };
        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_quat(Quat::from_rotation_y(FRAC_PI_2))
            * Mat4::from_scale(Vec3::splat(2.0));
        assert_mat_eq(&evaluate_local_transform(&node), &expected);

        // Scale happens first: the x axis is scaled, then rotated onto -z
        let p = evaluate_local_transform(&node).transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn quaternion_scalar_is_last() {
        // 90 degrees about x, encoded [x, y, z, w]
        let s = (FRAC_PI_2 / 2.0).sin();
        let node = Node {
            rotation: vec![s, 0.0, 0.0, s],
            ..Default::default()
        };
        let p = evaluate_local_transform(&node).transform_point3(Vec3::Y);
        assert!((p - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn malformed_vectors_skip_only_that_step() {
        let node = Node {
            matrix: vec![1.0; 9],
            translation: vec![1.0, 2.0],
            rotation: vec![0.0, 0.0, 1.0],
            scale: vec![3.0, 3.0, 3.0],
            ..Default::default()
        };
        assert_mat_eq(
            &evaluate_local_transform(&node),
            &Mat4::from_scale(Vec3::splat(3.0)),
        );
    }

    #[test]
    fn root_global_equals_local() {
        let g = graph(vec![trs_node([1.0, 2.0, 3.0], vec![])], vec![0]);
        let locals = evaluate_local_transforms(&g);
        let globals = evaluate_global_transforms(&g, &locals, g.roots(), Mat4::IDENTITY).unwrap();
        assert_mat_eq(&globals[0], &locals[0]);
    }

    #[test]
    fn child_global_is_parent_global_times_local() {
        let g = graph(
            vec![
                Node {
                    translation: vec![0.0, 1.0, 0.0],
                    rotation: vec![0.0, 0.0, (FRAC_PI_2 / 2.0).sin(), (FRAC_PI_2 / 2.0).cos()],
                    children: vec![1],
                    ..Default::default()
                },
                trs_node([2.0, 0.0, 0.0], vec![2]),
                trs_node([0.0, 0.0, 5.0], vec![]),
            ],
            vec![0],
        );
        let locals = evaluate_local_transforms(&g);
        let globals = evaluate_global_transforms(&g, &locals, g.roots(), Mat4::IDENTITY).unwrap();

        for (n, parent) in g.parents().into_iter().enumerate() {
            if let Some(p) = parent {
                assert_mat_eq(&globals[n], &(globals[p] * locals[n]));
            }
        }
        // Child 1 sits at (0,1,0) + rotate_z(90)(2,0,0) = (0,3,0)
        let origin = globals[1].transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn unreachable_nodes_keep_identity() {
        let g = graph(
            vec![trs_node([1.0, 0.0, 0.0], vec![]), trs_node([7.0, 7.0, 7.0], vec![])],
            vec![0],
        );
        let locals = evaluate_local_transforms(&g);
        let globals = evaluate_global_transforms(&g, &locals, g.roots(), Mat4::IDENTITY).unwrap();
        assert_eq!(globals[1], Mat4::IDENTITY);
    }

    #[test]
    fn parent_transform_is_applied_to_roots() {
        let g = graph(vec![trs_node([1.0, 0.0, 0.0], vec![])], vec![0]);
        let locals = evaluate_local_transforms(&g);
        let parent = Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0));
        let globals = evaluate_global_transforms(&g, &locals, g.roots(), parent).unwrap();
        let origin = globals[0].transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 10.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn traversal_does_not_mutate_graph() {
        let g = graph(
            vec![
                trs_node([1.0, 0.0, 0.0], vec![1]),
                trs_node([0.0, 1.0, 0.0], vec![]),
            ],
            vec![0],
        );
        let before = g.clone();
        let locals = evaluate_local_transforms(&g);
        evaluate_global_transforms(&g, &locals, g.roots(), Mat4::IDENTITY).unwrap();
        assert_eq!(g, before);
    }

    #[test]
    fn balanced_tree_visits_every_node_once() {
        // depth 3, branching 3: (3^4 - 1) / 2 = 40 nodes
        let (depth, branching) = (3u32, 3usize);
        let mut nodes = vec![Node::default()];
        let mut frontier = vec![0usize];
        for _ in 0..depth {
            let mut next = Vec::new();
            for parent in frontier {
                for _ in 0..branching {
                    let index = nodes.len();
                    nodes.push(Node::default());
                    nodes[parent].children.push(index);
                    next.push(index);
                }
            }
            frontier = next;
        }
        let g = graph(nodes, vec![0]);
        let expected = (branching.pow(depth + 1) - 1) / (branching - 1);
        assert_eq!(g.node_count(), expected);

        let locals = evaluate_local_transforms(&g);
        let mut out = vec![Mat4::IDENTITY; g.node_count()];
        let visits =
            propagate_global_transforms(&g, &locals, g.roots(), Mat4::IDENTITY, &mut out).unwrap();
        assert_eq!(visits, expected);
    }

    #[test]
    fn preorder_with_declared_sibling_order() {
        let g = graph(
            vec![
                Node {
                    children: vec![2, 1],
                    ..Default::default()
                },
                Node::default(),
                Node {
                    children: vec![3],
                    ..Default::default()
                },
                Node::default(),
                Node::default(),
            ],
            vec![0, 4],
        );
        let order = hierarchy(&g, g.roots()).unwrap();
        assert_eq!(order, vec![(0, 0), (2, 1), (3, 2), (1, 1), (4, 0)]);
    }

    #[test]
    fn cycle_is_an_error_not_a_stack_overflow() {
        // Unvalidated graph: 0 -> 1 -> 0
        let g = graph(
            vec![
                Node {
                    children: vec![1],
                    ..Default::default()
                },
                Node {
                    children: vec![0],
                    ..Default::default()
                },
            ],
            vec![0],
        );
        let locals = evaluate_local_transforms(&g);
        let result = evaluate_global_transforms(&g, &locals, g.roots(), Mat4::IDENTITY);
        assert!(matches!(result, Err(ArmatureError::InvalidSceneGraph(_))));
    }

    #[test]
    fn out_of_range_child_is_an_error() {
        let g = graph(
            vec![Node {
                children: vec![9],
                ..Default::default()
            }],
            vec![0],
        );
        let locals = evaluate_local_transforms(&g);
        let result = evaluate_global_transforms(&g, &locals, g.roots(), Mat4::IDENTITY);
        assert!(matches!(
            result,
            Err(ArmatureError::NodeOutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn wrong_size_local_table_is_an_error() {
        let g = graph(vec![Node::default(), Node::default()], vec![0, 1]);
        let result = evaluate_global_transforms(&g, &[Mat4::IDENTITY], g.roots(), Mat4::IDENTITY);
        assert!(matches!(
            result,
            Err(ArmatureError::TransformTableSize { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn rest_pose_round_trips_through_matrix() {
        let node = Node {
            translation: vec![1.0, -2.0, 0.5],
            rotation: vec![0.0, (FRAC_PI_2 / 2.0).sin(), 0.0, (FRAC_PI_2 / 2.0).cos()],
            scale: vec![1.0, 2.0, 1.0],
            ..Default::default()
        };
        assert_mat_eq(&NodePose::rest(&node).to_mat4(), &evaluate_local_transform(&node));

        let matrix_node = Node {
            matrix: evaluate_local_transform(&node).to_cols_array().to_vec(),
            ..Default::default()
        };
        assert_mat_eq(
            &NodePose::rest(&matrix_node).to_mat4(),
            &evaluate_local_transform(&node),
        );
    }
}
