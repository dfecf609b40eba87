use log::{debug, warn};
use nalgebra::Vector2;

use crate::{
    body::{Body, NO_LEAF},
    boundary::{Boundary, Quadrant},
    error::InvariantViolation,
    gravity,
};

/// What a node holds: at most one body, or exactly four children.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Leaf(Option<usize>),
    Internal([usize; 4]),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub boundary: Boundary,
    pub mass: f64,
    pub center_of_mass: Vector2<f64>,
    pub parent: Option<usize>,
}

impl Node {
    fn empty(boundary: Boundary, parent: Option<usize>) -> Self {
        Self {
            kind: NodeKind::Leaf(None),
            boundary,
            mass: 0.,
            center_of_mass: boundary.center(),
            parent,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// The body held by this node if it is an occupied leaf.
    #[must_use]
    pub fn body(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Leaf(body) => body,
            NodeKind::Internal(_) => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> Option<[usize; 4]> {
        match self.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Internal(children) => Some(children),
        }
    }

    fn is_occupied(&self) -> bool {
        !matches!(self.kind, NodeKind::Leaf(None))
    }
}

/// Barnes-Hut quadtree that is kept up to date as bodies move instead of
/// being rebuilt every step.
///
/// Nodes live in an arena and refer to each other by index. Bodies are not
/// owned by the tree; every method that touches them takes the body slice
/// the tree was built from, and a body is identified by its index in it.
#[derive(Clone, Debug)]
pub struct SpatialTree {
    nodes: Vec<Node>,
    free: Vec<usize>,
    root: usize,
}

impl SpatialTree {
    #[must_use]
    pub fn new(boundary: Boundary) -> Self {
        Self {
            nodes: vec![Node::empty(boundary, None)],
            free: Vec::new(),
            root: 0,
        }
    }

    /// Inserts all bodies, in order, into a root covering `boundary`.
    pub fn build(bodies: &mut [Body], boundary: Boundary) -> Self {
        let mut tree = Self::new(boundary);
        for body in 0..bodies.len() {
            tree.place(bodies, body);
        }
        tree
    }

    /// Inserts `body` from the root. A body outside the root grows the root
    /// until it fits instead of being dropped into the wrong cell. A body
    /// without a finite position is left out of the tree.
    pub fn place(&mut self, bodies: &mut [Body], body: usize) {
        let position = bodies[body].position;
        if !is_finite(&position) {
            warn!("body {body} left out of the tree at {position:?}");
            bodies[body].leaf = NO_LEAF;
            return;
        }
        while !self.nodes[self.root].boundary.contains(&position) {
            self.grow(self.root, &position);
        }
        self.insert(self.root, bodies, body);
    }

    #[must_use]
    pub fn root(&self) -> usize {
        self.root
    }

    /// Boundary of the current root. Growth replaces the root, so this must
    /// be queried again after every step.
    #[must_use]
    pub fn boundary(&self) -> Boundary {
        self.nodes[self.root].boundary
    }

    #[must_use]
    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Number of nodes reachable from the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Follows parent links from `node` up to the topmost node.
    ///
    /// Also valid for a node released by a collapse: its parent link still
    /// points at the node that absorbed it.
    #[must_use]
    pub fn topmost(&self, mut node: usize) -> usize {
        while let Some(parent) = self.nodes[node].parent {
            node = parent;
        }
        node
    }

    /// Boundaries of all nodes, for drawing the partition.
    #[must_use]
    pub fn cells(&self) -> Vec<Boundary> {
        let mut cells = Vec::with_capacity(self.node_count());
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            cells.push(self.nodes[node].boundary);
            if let NodeKind::Internal(children) = self.nodes[node].kind {
                stack.extend(children);
            }
        }
        cells
    }

    /// Stores `body` in the leaf below `node` that contains it, subdividing
    /// an occupied leaf as often as needed, then refreshes the aggregates on
    /// the way back to the root.
    ///
    /// # Panics
    ///
    /// If two bodies share a position, since no cell can separate them.
    pub fn insert(&mut self, node: usize, bodies: &mut [Body], body: usize) {
        let position = bodies[body].position;
        let mut current = node;
        loop {
            match self.nodes[current].kind {
                NodeKind::Internal(children) => {
                    current = self.child_containing(&children, &position);
                }
                NodeKind::Leaf(None) => {
                    self.store(current, bodies, body);
                    break;
                }
                NodeKind::Leaf(Some(previous)) => {
                    let boundary = self.nodes[current].boundary;
                    let center = boundary.center();
                    assert!(
                        boundary.min.x < center.x
                            && center.x < boundary.max.x
                            && boundary.min.y < center.y
                            && center.y < boundary.max.y,
                        "bodies {previous} and {body} coincide"
                    );

                    let children = self.subdivide(current);
                    let child = self.child_containing(&children, &bodies[previous].position);
                    self.store(child, bodies, previous);
                }
            }
        }
        self.refresh_upward(self.nodes[current].parent, bodies);
    }

    /// Approximate force on `body` from all other bodies below `node`.
    ///
    /// A subtree counts as a single point mass once the ratio of its width to
    /// the distance between its center of mass and the body drops below
    /// `theta`. Subtrees containing the body itself are always opened. A body
    /// that has been dropped from the tree feels no force.
    #[must_use]
    pub fn compute_force(
        &self,
        node: usize,
        bodies: &[Body],
        body: usize,
        theta: f64,
    ) -> Vector2<f64> {
        if bodies[body].leaf == NO_LEAF {
            return Vector2::zeros();
        }
        let reference_width = self.nodes[node].boundary.extent();
        self.force_from(node, bodies, body, theta, reference_width, 0)
    }

    fn force_from(
        &self,
        node: usize,
        bodies: &[Body],
        body: usize,
        theta: f64,
        reference_width: f64,
        depth: i32,
    ) -> Vector2<f64> {
        let target = &bodies[body];
        let current = &self.nodes[node];

        match current.kind {
            NodeKind::Leaf(Some(other)) if other != body => gravity::force(
                &target.position,
                target.mass(),
                &bodies[other].position,
                bodies[other].mass(),
            ),
            NodeKind::Leaf(_) => Vector2::zeros(),
            NodeKind::Internal(children) => {
                let width = reference_width / 2f64.powi(depth);
                let distance = (current.center_of_mass - target.position).norm();

                if width / distance < theta && !current.boundary.contains(&target.position) {
                    gravity::force(
                        &target.position,
                        target.mass(),
                        &current.center_of_mass,
                        current.mass,
                    )
                } else {
                    children
                        .iter()
                        .filter(|&&child| self.nodes[child].is_occupied())
                        .map(|&child| {
                            self.force_from(child, bodies, body, theta, reference_width, depth + 1)
                        })
                        .sum()
                }
            }
        }
    }

    /// Brings the tree up to date after `body` moved.
    ///
    /// A body still inside its leaf only refreshes the aggregates above it.
    /// Otherwise the leaf is emptied and the body walks up from the leaf's
    /// parent until a node contains it again, see [`Self::move_body`].
    pub fn relocate(&mut self, bodies: &mut [Body], body: usize) {
        let leaf = bodies[body].leaf;
        if leaf == NO_LEAF {
            return;
        }
        debug_assert_eq!(self.nodes[leaf].body(), Some(body), "stale leaf of body {body}");

        let position = bodies[body].position;
        if self.nodes[leaf].boundary.contains(&position) {
            self.nodes[leaf].center_of_mass = position;
            self.refresh_upward(self.nodes[leaf].parent, bodies);
            return;
        }

        self.clear(leaf);
        let start = self.nodes[leaf].parent.unwrap_or(leaf);
        self.move_body(start, bodies, body);
    }

    /// Walks from `node` towards the root until a node contains `body`, then
    /// inserts it there.
    ///
    /// Every node passed on the way lost the body: it collapses into a leaf
    /// when all its children are leaves holding at most one body, and its
    /// aggregate is recomputed. If not even the root contains the body, the
    /// root is grown towards it and the walk goes on from the new root, so
    /// on return the body is always inside its leaf.
    ///
    /// A position that is not finite can never be contained. Such a body is
    /// dropped from the tree instead, the nodes up to the root still collapse
    /// and refresh, and it stays out for good.
    pub fn move_body(&mut self, node: usize, bodies: &mut [Body], body: usize) {
        let position = bodies[body].position;
        if !is_finite(&position) {
            let mut next = Some(node);
            while let Some(current) = next {
                self.collapse(current, bodies);
                self.aggregate(current, bodies);
                next = self.nodes[current].parent;
            }
            bodies[body].leaf = NO_LEAF;
            warn!("body {body} dropped from the tree at {position:?}");
            return;
        }

        let mut current = node;
        loop {
            if self.nodes[current].boundary.contains(&position) {
                self.insert(current, bodies, body);
                return;
            }

            self.collapse(current, bodies);
            self.aggregate(current, bodies);

            current = match self.nodes[current].parent {
                Some(parent) => parent,
                None => self.grow(current, &position),
            };
        }
    }

    /// Checks every structural invariant. `Ok` is only guaranteed between
    /// relocation passes, never while a pass is in flight.
    pub fn check_invariants(&self, bodies: &[Body]) -> Result<(), InvariantViolation> {
        if self.nodes[self.root].parent.is_some() {
            return Err(InvariantViolation::Parent { node: self.root });
        }

        let mut found = 0;
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            let current = &self.nodes[node];
            match current.kind {
                NodeKind::Leaf(None) => {
                    if current.mass != 0. || current.center_of_mass != current.boundary.center() {
                        return Err(InvariantViolation::EmptyLeaf { node });
                    }
                }
                NodeKind::Leaf(Some(body)) => {
                    found += 1;
                    let Some(held) = bodies.get(body).filter(|b| b.leaf == node) else {
                        return Err(InvariantViolation::StaleLeaf { body });
                    };
                    if !current.boundary.contains(&held.position) {
                        return Err(InvariantViolation::Containment { body });
                    }
                    if current.mass != held.mass() || current.center_of_mass != held.position {
                        return Err(InvariantViolation::Aggregate { node });
                    }
                }
                NodeKind::Internal(children) => {
                    for child in children {
                        if self.nodes[child].parent != Some(node) {
                            return Err(InvariantViolation::Parent { node: child });
                        }
                        stack.push(child);
                    }

                    let (mass, center_of_mass) = self.aggregate_children(&children, &current.boundary);
                    let mass_tolerance = 1e-9 * mass.max(1.);
                    let position_tolerance = 1e-9 * current.boundary.extent().max(1.);
                    if (mass - current.mass).abs() > mass_tolerance
                        || (center_of_mass - current.center_of_mass).norm() > position_tolerance
                    {
                        return Err(InvariantViolation::Aggregate { node });
                    }
                }
            }
        }

        let mut expected = 0;
        for (body, held) in bodies.iter().enumerate() {
            if held.leaf != NO_LEAF {
                expected += 1;
            } else if is_finite(&held.position) {
                return Err(InvariantViolation::StaleLeaf { body });
            }
        }
        if found != expected {
            return Err(InvariantViolation::BodyCount { expected, found });
        }
        Ok(())
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn store(&mut self, leaf: usize, bodies: &mut [Body], body: usize) {
        let node = &mut self.nodes[leaf];
        node.kind = NodeKind::Leaf(Some(body));
        node.mass = bodies[body].mass();
        node.center_of_mass = bodies[body].position;
        bodies[body].leaf = leaf;
    }

    fn clear(&mut self, leaf: usize) {
        let node = &mut self.nodes[leaf];
        node.kind = NodeKind::Leaf(None);
        node.mass = 0.;
        node.center_of_mass = node.boundary.center();
    }

    fn subdivide(&mut self, node: usize) -> [usize; 4] {
        let boundary = self.nodes[node].boundary;
        let children = boundary
            .split_at(&boundary.center())
            .map(|cell| self.alloc(Node::empty(cell, Some(node))));
        self.nodes[node].kind = NodeKind::Internal(children);
        children
    }

    /// Turns an internal node whose children are all leaves back into a
    /// leaf if they hold at most one body between them.
    fn collapse(&mut self, node: usize, bodies: &mut [Body]) {
        let NodeKind::Internal(children) = self.nodes[node].kind else {
            return;
        };
        if !children.iter().all(|&child| self.nodes[child].is_leaf()) {
            return;
        }

        let (count, remaining) = children
            .iter()
            .filter_map(|&child| self.nodes[child].body())
            .fold((0, None), |(count, _), body| (count + 1, Some(body)));
        if count > 1 {
            return;
        }

        self.free.extend(children);
        self.nodes[node].kind = NodeKind::Leaf(remaining);
        if let Some(body) = remaining {
            bodies[body].leaf = node;
        }
        debug!("collapsed node {node} into a leaf holding {remaining:?}");
    }

    /// Replaces the root by one of twice its size that has the old root as
    /// the child facing away from `position`. Returns the new root.
    fn grow(&mut self, old_root: usize, position: &Vector2<f64>) -> usize {
        let old_boundary = self.nodes[old_root].boundary;
        let (boundary, quadrant) = old_boundary.grow_towards(position);
        let cells = boundary.split_at(&old_boundary.inner_corner(quadrant));
        let new_root = self.alloc(Node::empty(boundary, None));
        let children = Quadrant::ALL.map(|q| {
            if q == quadrant {
                old_root
            } else {
                self.alloc(Node::empty(cells[q.index()], Some(new_root)))
            }
        });
        self.nodes[old_root].parent = Some(new_root);

        let (mass, center_of_mass) = self.aggregate_children(&children, &boundary);
        let root = &mut self.nodes[new_root];
        root.kind = NodeKind::Internal(children);
        root.mass = mass;
        root.center_of_mass = center_of_mass;
        self.root = new_root;

        debug!(
            "grew root to [{}, {}) x [{}, {})",
            boundary.min.x, boundary.max.x, boundary.min.y, boundary.max.y
        );
        new_root
    }

    fn aggregate(&mut self, node: usize, bodies: &[Body]) {
        let current = &self.nodes[node];
        let (mass, center_of_mass) = match current.kind {
            NodeKind::Leaf(None) => (0., current.boundary.center()),
            NodeKind::Leaf(Some(body)) => (bodies[body].mass(), bodies[body].position),
            NodeKind::Internal(children) => self.aggregate_children(&children, &current.boundary),
        };
        let current = &mut self.nodes[node];
        current.mass = mass;
        current.center_of_mass = center_of_mass;
    }

    fn aggregate_children(&self, children: &[usize; 4], boundary: &Boundary) -> (f64, Vector2<f64>) {
        let (mass, weighted) = children.iter().map(|&child| &self.nodes[child]).fold(
            (0., Vector2::zeros()),
            |(mass, weighted), child| (mass + child.mass, weighted + child.center_of_mass * child.mass),
        );
        if mass > 0. {
            (mass, weighted / mass)
        } else {
            (0., boundary.center())
        }
    }

    /// The first of north-west, north-east and south-west whose stored
    /// boundary contains `position`, otherwise south-east.
    fn child_containing(&self, children: &[usize; 4], position: &Vector2<f64>) -> usize {
        children[..3]
            .iter()
            .copied()
            .find(|&child| self.nodes[child].boundary.contains(position))
            .unwrap_or(children[3])
    }

    fn refresh_upward(&mut self, start: Option<usize>, bodies: &[Body]) {
        let mut next = start;
        while let Some(node) = next {
            self.aggregate(node, bodies);
            next = self.nodes[node].parent;
        }
    }
}

fn is_finite(position: &Vector2<f64>) -> bool {
    position.iter().all(|c| c.is_finite())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn body(mass: f64, x: f64, y: f64) -> Body {
        Body::new(mass, Vector2::new(x, y), Vector2::zeros())
    }

    fn square(width: f64) -> Boundary {
        Boundary::from_corner(0., 0., width, width)
    }

    #[test]
    fn build_places_every_body() {
        let mut bodies = vec![
            body(1., 1., 1.),
            body(2., 3., 3.),
            body(3., 12., 12.),
            body(4., 9., 2.),
        ];
        let tree = SpatialTree::build(&mut bodies, square(16.));

        tree.check_invariants(&bodies).unwrap();
        for (i, b) in bodies.iter().enumerate() {
            assert_eq!(tree.node(b.leaf()).body(), Some(i));
            assert!(tree.node(b.leaf()).boundary.contains(&b.position));
        }
        assert_relative_eq!(tree.node(tree.root()).mass, 10.);
        let expected = bodies
            .iter()
            .fold(Vector2::zeros(), |acc, b| acc + b.position * b.mass())
            / 10.;
        assert_relative_eq!(tree.node(tree.root()).center_of_mass, expected);
    }

    #[test]
    fn single_body_is_root_leaf() {
        let mut bodies = vec![body(5., 3., 4.)];
        let tree = SpatialTree::build(&mut bodies, square(10.));

        assert_eq!(tree.node(tree.root()).kind, NodeKind::Leaf(Some(0)));
        assert_eq!(tree.node(tree.root()).mass, 5.);
        assert_eq!(tree.cells().len(), 1);
    }

    #[test]
    fn empty_tree() {
        let mut bodies: Vec<Body> = Vec::new();
        let tree = SpatialTree::build(&mut bodies, square(10.));

        tree.check_invariants(&bodies).unwrap();
        assert_eq!(tree.node(tree.root()).mass, 0.);
        assert_eq!(tree.node(tree.root()).center_of_mass, Vector2::new(5., 5.));
    }

    #[test]
    fn close_bodies_subdivide_repeatedly() {
        let mut bodies = vec![body(1., 1., 1.), body(1., 3., 3.)];
        let tree = SpatialTree::build(&mut bodies, square(16.));

        tree.check_invariants(&bodies).unwrap();
        // root -> NW [0, 8) -> NW [0, 4), which finally separates them
        let leaf = tree.node(bodies[0].leaf());
        assert_eq!(leaf.boundary, Boundary::from_corner(0., 0., 2., 2.));
        let parent = tree.node(leaf.parent.unwrap());
        assert_eq!(parent.boundary, square(4.));
        assert_eq!(tree.node(bodies[1].leaf()).parent, leaf.parent);
        assert_eq!(tree.cells().len(), 13);
    }

    #[test]
    fn out_of_bounds_body_grows_root_at_build() {
        let mut bodies = vec![body(1., 1., 1.), body(1., 25., 3.)];
        let tree = SpatialTree::build(&mut bodies, square(10.));

        tree.check_invariants(&bodies).unwrap();
        assert_eq!(tree.boundary(), square(40.));
    }

    #[test]
    #[should_panic(expected = "coincide")]
    fn coincident_bodies_panic() {
        let mut bodies = vec![body(1., 1., 1.), body(1., 1., 1.)];
        let _ = SpatialTree::build(&mut bodies, square(16.));
    }

    #[test]
    fn two_bodies_exact_force() {
        let mut bodies = vec![body(3., 2., 2.), body(5., 13., 9.)];
        let tree = SpatialTree::build(&mut bodies, square(16.));

        for theta in [0., 0.5, 10.] {
            let f0 = tree.compute_force(tree.root(), &bodies, 0, theta);
            let f1 = tree.compute_force(tree.root(), &bodies, 1, theta);

            assert_eq!(
                f0,
                gravity::force(&bodies[0].position, 3., &bodies[1].position, 5.)
            );
            assert_eq!(
                f1,
                gravity::force(&bodies[1].position, 5., &bodies[0].position, 3.)
            );
            assert_relative_eq!(f0, -f1);
        }
    }

    #[test]
    fn distant_cluster_is_one_point_mass() {
        let mut bodies = vec![body(1., 1., 1.), body(1., 2., 1.), body(1., 60., 60.)];
        let tree = SpatialTree::build(&mut bodies, square(64.));
        let query = &bodies[2];

        let approximated = tree.compute_force(tree.root(), &bodies, 2, 0.5);
        let monopole = gravity::force(&query.position, 1., &Vector2::new(1.5, 1.), 2.);
        assert_relative_eq!(approximated, monopole);

        let exact = tree.compute_force(tree.root(), &bodies, 2, 0.);
        let direct = gravity::force(&query.position, 1., &bodies[0].position, 1.)
            + gravity::force(&query.position, 1., &bodies[1].position, 1.);
        assert_relative_eq!(exact, direct);
        assert!((exact - approximated).norm() > 0.);
    }

    #[test]
    fn relocate_within_leaf_refreshes_aggregates() {
        let mut bodies = vec![body(1., 1., 1.), body(1., 12., 12.)];
        let mut tree = SpatialTree::build(&mut bodies, square(16.));
        let leaf = bodies[0].leaf();

        bodies[0].position = Vector2::new(3., 5.);
        tree.relocate(&mut bodies, 0);

        assert_eq!(bodies[0].leaf(), leaf);
        tree.check_invariants(&bodies).unwrap();
        assert_relative_eq!(tree.node(tree.root()).center_of_mass, Vector2::new(7.5, 8.5));
    }

    #[test]
    fn relocate_into_sibling() {
        let mut bodies = vec![body(1., 1., 1.), body(1., 12., 12.), body(1., 12., 2.)];
        let mut tree = SpatialTree::build(&mut bodies, square(16.));

        bodies[0].position = Vector2::new(2., 13.);
        tree.relocate(&mut bodies, 0);

        tree.check_invariants(&bodies).unwrap();
        let leaf = tree.node(bodies[0].leaf());
        assert_eq!(leaf.boundary, Boundary::from_corner(0., 8., 8., 8.));
        assert_eq!(tree.boundary(), square(16.));
    }

    #[test]
    fn merge_collapses_to_remaining_body_then_to_empty_leaf() {
        let mut bodies = vec![body(1., 1., 1.), body(1., 3., 3.), body(1., 12., 12.)];
        let mut tree = SpatialTree::build(&mut bodies, square(16.));

        let node = tree.node(bodies[0].leaf()).parent.unwrap();
        assert_eq!(tree.node(node).boundary, square(4.));
        assert!(tree
            .node(node)
            .children()
            .unwrap()
            .iter()
            .all(|&c| tree.node(c).is_leaf()));

        bodies[0].position = Vector2::new(6., 6.);
        tree.relocate(&mut bodies, 0);
        tree.check_invariants(&bodies).unwrap();
        assert_eq!(tree.node(node).kind, NodeKind::Leaf(Some(1)));
        assert_eq!(bodies[1].leaf(), node);
        assert_eq!(tree.node(node).mass, 1.);

        bodies[1].position = Vector2::new(7., 1.);
        tree.relocate(&mut bodies, 1);
        tree.check_invariants(&bodies).unwrap();
        assert_eq!(tree.node(node).kind, NodeKind::Leaf(None));
        assert_eq!(tree.node(node).mass, 0.);
        assert_eq!(tree.node(node).center_of_mass, Vector2::new(2., 2.));
    }

    #[test]
    fn merge_releases_nodes_for_reuse() {
        let mut bodies = vec![body(1., 1., 1.), body(1., 3., 3.), body(1., 12., 12.)];
        let mut tree = SpatialTree::build(&mut bodies, square(16.));
        let before = tree.node_count();

        bodies[0].position = Vector2::new(6., 6.);
        tree.relocate(&mut bodies, 0);

        assert_eq!(tree.node_count(), before - 4);
        assert_eq!(tree.cells().len(), tree.node_count());
    }

    #[test]
    fn growth_keeps_old_root_as_child() {
        let mut bodies = vec![body(1., 2., 2.), body(1., 10., 10.), body(1., 3., 12.)];
        let mut tree = SpatialTree::build(&mut bodies, square(16.));
        let old_root = tree.root();

        bodies[0].position = Vector2::new(20., 5.);
        tree.relocate(&mut bodies, 0);

        tree.check_invariants(&bodies).unwrap();
        let new_root = tree.root();
        assert_ne!(new_root, old_root);
        assert_eq!(tree.topmost(old_root), new_root);
        assert_eq!(tree.boundary(), square(32.));
        assert!(tree.boundary().contains(&bodies[0].position));
        assert_eq!(
            tree.node(new_root).children().unwrap()[Quadrant::NorthWest.index()],
            old_root
        );
        assert_eq!(tree.node(old_root).boundary, square(16.));
        assert_relative_eq!(tree.node(new_root).mass, 3.);
    }

    #[test]
    fn growth_towards_negative_corner() {
        let mut bodies = vec![body(1., 2., 2.), body(1., 10., 10.), body(1., 3., 12.)];
        let mut tree = SpatialTree::build(&mut bodies, square(16.));
        let old_root = tree.root();

        bodies[1].position = Vector2::new(-3., -1.);
        tree.relocate(&mut bodies, 1);

        tree.check_invariants(&bodies).unwrap();
        assert_eq!(tree.boundary(), Boundary::from_corner(-16., -16., 32., 32.));
        assert_eq!(
            tree.node(tree.root()).children().unwrap()[Quadrant::SouthEast.index()],
            old_root
        );
    }

    #[test]
    fn far_escape_grows_until_contained() {
        let mut bodies = vec![body(1., 2., 2.), body(1., 10., 10.), body(1., 3., 12.)];
        let mut tree = SpatialTree::build(&mut bodies, square(16.));

        bodies[2].position = Vector2::new(300., 40.);
        tree.relocate(&mut bodies, 2);

        tree.check_invariants(&bodies).unwrap();
        assert!(tree.boundary().contains(&bodies[2].position));
        assert_eq!(tree.boundary().min, Vector2::zeros());
        assert_eq!(tree.boundary().width(), 512.);
    }

    #[test]
    fn lone_body_leaving_root() {
        let mut bodies = vec![body(1., 5., 5.)];
        let mut tree = SpatialTree::build(&mut bodies, square(10.));

        bodies[0].position = Vector2::new(-75., 5.);
        tree.relocate(&mut bodies, 0);

        tree.check_invariants(&bodies).unwrap();
        assert!(tree.boundary().contains(&bodies[0].position));
        assert_eq!(tree.topmost(bodies[0].leaf()), tree.root());
    }

    #[test]
    fn growth_on_uneven_boundary_keeps_containment() {
        let corner = 1. / 14.;
        for i in 0..500 {
            let width = 0.3 + f64::from(i) * 0.000_237;
            let boundary = Boundary::from_corner(corner, corner, width, width);
            let inside = |t: f64| corner + width * t;
            let just_west = f64::from_bits(boundary.min.x.to_bits() - 1);

            for exit in [
                Vector2::new(just_west, inside(0.3)),
                Vector2::new(boundary.max.x, inside(0.3)),
                Vector2::new(inside(0.3), boundary.max.y),
            ] {
                let mut bodies = vec![
                    body(1., inside(0.3), inside(0.3)),
                    body(2., inside(0.7), inside(0.6)),
                ];
                let mut tree = SpatialTree::build(&mut bodies, boundary);

                bodies[0].position = exit;
                tree.relocate(&mut bodies, 0);

                assert_eq!(tree.check_invariants(&bodies), Ok(()), "width {width}, exit {exit:?}");
                assert!(tree.node(bodies[0].leaf()).boundary.contains(&exit));
            }
        }
    }

    #[test]
    #[should_panic(expected = "coincide")]
    fn moving_onto_another_body_panics() {
        let mut bodies = vec![body(1., 2., 2.), body(1., 11., 7.)];
        let mut tree = SpatialTree::build(&mut bodies, square(16.));

        bodies[0].position = bodies[1].position;
        tree.relocate(&mut bodies, 0);
    }

    #[test]
    fn non_finite_body_is_dropped() {
        for escaped in [Vector2::new(f64::INFINITY, 5.), Vector2::new(f64::NAN, 5.)] {
            let mut bodies = vec![body(1., 2., 2.), body(2., 10., 10.), body(4., 3., 12.)];
            let mut tree = SpatialTree::build(&mut bodies, square(16.));
            let root_boundary = tree.boundary();

            bodies[2].position = escaped;
            tree.relocate(&mut bodies, 2);

            tree.check_invariants(&bodies).unwrap();
            assert_eq!(bodies[2].leaf(), NO_LEAF);
            assert_eq!(tree.boundary(), root_boundary);
            assert_relative_eq!(tree.node(tree.root()).mass, 3.);
            assert_eq!(tree.compute_force(tree.root(), &bodies, 2, 0.5), Vector2::zeros());

            let nodes = tree.node_count();
            tree.relocate(&mut bodies, 2);
            assert_eq!(tree.node_count(), nodes);
            tree.check_invariants(&bodies).unwrap();
        }
    }

    #[test]
    fn last_body_dropped_leaves_empty_root() {
        let mut bodies = vec![body(1., 5., 5.)];
        let mut tree = SpatialTree::build(&mut bodies, square(10.));

        bodies[0].position = Vector2::new(f64::NEG_INFINITY, f64::NAN);
        tree.relocate(&mut bodies, 0);

        tree.check_invariants(&bodies).unwrap();
        assert_eq!(tree.node(tree.root()).kind, NodeKind::Leaf(None));
        assert_eq!(tree.node(tree.root()).mass, 0.);
    }

    #[test]
    fn place_skips_non_finite_body() {
        let mut bodies = vec![body(1., 5., 5.), body(1., f64::NAN, 1.)];
        let tree = SpatialTree::build(&mut bodies, square(10.));

        tree.check_invariants(&bodies).unwrap();
        assert_eq!(bodies[1].leaf(), NO_LEAF);
        assert_eq!(tree.node(tree.root()).body(), Some(0));
    }
}
