//! Flat rows in, forest out.
//!
//! # Invariants
//!
//! - Output is identical regardless of input array order: adjacency lists,
//!   the root list, and the warning list are all sorted by stable keys.
//! - Every connected component contributes exactly one root; no component
//!   is ever silently discarded.
//! - Edges that cannot be interpreted (dangling endpoint, self loop) are
//!   dropped with a warning, never a failure.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::warn;

use vansh_types::{EdgeId, Member, MemberId, RelationKind, RelationshipEdge};

use crate::forest::{FamilyForest, FamilyNode};

/// A non-fatal defect encountered while materializing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterializeWarning {
    /// An edge referenced a member outside the supplied set and was dropped.
    DanglingEdge {
        edge: EdgeId,
        kind: RelationKind,
        from: MemberId,
        to: MemberId,
    },
    /// An edge had the same member at both endpoints and was dropped.
    SelfLoopEdge { edge: EdgeId },
    /// A component had no member without parents (a recorded ancestry
    /// cycle); a deterministic root was chosen anyway.
    CyclicComponent { root: MemberId },
}

impl MaterializeWarning {
    /// Stable key so the warning list itself is order-independent.
    fn sort_key(&self) -> (u8, uuid::Uuid) {
        match self {
            Self::DanglingEdge { edge, .. } => (0, *edge.as_uuid()),
            Self::SelfLoopEdge { edge } => (1, *edge.as_uuid()),
            Self::CyclicComponent { root } => (2, *root.as_uuid()),
        }
    }
}

impl std::fmt::Display for MaterializeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DanglingEdge {
                edge,
                kind,
                from,
                to,
            } => write!(
                f,
                "dropped {kind} edge {} with endpoint outside the member set ({} -> {})",
                edge.short_id(),
                from.short_id(),
                to.short_id()
            ),
            Self::SelfLoopEdge { edge } => {
                write!(f, "dropped self-loop edge {}", edge.short_id())
            }
            Self::CyclicComponent { root } => write!(
                f,
                "component around {} has no parentless member; chose it as root",
                root.short_id()
            ),
        }
    }
}

/// Build the renderable forest from one tree's flat member and edge rows.
///
/// Pure and synchronous: no I/O, no side effects beyond `tracing` output.
/// Safe to call on every render.
pub fn materialize(members: &[Member], edges: &[RelationshipEdge]) -> FamilyForest {
    let mut nodes: HashMap<MemberId, FamilyNode> = members
        .iter()
        .map(|m| (m.id, FamilyNode::new(m.clone())))
        .collect();

    // Ordering key per member: (generation_level, created_at, id).
    let keys: HashMap<MemberId, _> = members.iter().map(|m| (m.id, m.ordering_key())).collect();

    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let mut undirected: HashMap<MemberId, Vec<MemberId>> = HashMap::new();

    for edge in edges {
        if edge.is_self_loop() {
            warn!(edge = %edge.id.short_id(), "dropping self-loop edge");
            warnings.push(MaterializeWarning::SelfLoopEdge { edge: edge.id });
            continue;
        }
        if !nodes.contains_key(&edge.from) || !nodes.contains_key(&edge.to) {
            warn!(
                edge = %edge.id.short_id(),
                kind = %edge.kind,
                "dropping edge with endpoint outside the member set"
            );
            warnings.push(MaterializeWarning::DanglingEdge {
                edge: edge.id,
                kind: edge.kind,
                from: edge.from,
                to: edge.to,
            });
            continue;
        }
        // Collapse rows that mean the same thing, including the two
        // directions of a symmetric relation.
        if !seen.insert(edge.semantic_key()) {
            continue;
        }

        match edge.kind {
            RelationKind::Parent => {
                nodes
                    .get_mut(&edge.from)
                    .expect("endpoint checked above")
                    .children
                    .push(edge.to);
                nodes
                    .get_mut(&edge.to)
                    .expect("endpoint checked above")
                    .parents
                    .push(edge.from);
            }
            RelationKind::Spouse => {
                nodes.get_mut(&edge.from).expect("endpoint checked above").spouses.push(edge.to);
                nodes.get_mut(&edge.to).expect("endpoint checked above").spouses.push(edge.from);
            }
            RelationKind::Sibling => {
                nodes.get_mut(&edge.from).expect("endpoint checked above").siblings.push(edge.to);
                nodes.get_mut(&edge.to).expect("endpoint checked above").siblings.push(edge.from);
            }
        }

        undirected.entry(edge.from).or_default().push(edge.to);
        undirected.entry(edge.to).or_default().push(edge.from);
    }

    // Deterministic adjacency: sort every list by the member ordering key.
    let by_key = |ids: &mut Vec<MemberId>| {
        ids.sort_by_key(|id| keys.get(id).copied().expect("adjacency within member set"));
    };
    for node in nodes.values_mut() {
        by_key(&mut node.parents);
        by_key(&mut node.children);
        by_key(&mut node.spouses);
        by_key(&mut node.siblings);
    }
    for neighbors in undirected.values_mut() {
        by_key(neighbors);
    }

    let roots = select_roots(&nodes, &keys, &undirected, &mut warnings);

    warnings.sort_by_key(MaterializeWarning::sort_key);

    FamilyForest {
        nodes,
        roots,
        warnings,
    }
}

/// Discover connected components and pick one deterministic root for each.
///
/// The root of a component is its least member (by the ordering key) among
/// those with no recorded parents. A component where everyone has parents
/// is a recorded cycle: its least member overall becomes the root and a
/// warning is emitted.
fn select_roots(
    nodes: &HashMap<MemberId, FamilyNode>,
    keys: &HashMap<MemberId, (i32, chrono::DateTime<chrono::Utc>, MemberId)>,
    undirected: &HashMap<MemberId, Vec<MemberId>>,
    warnings: &mut Vec<MaterializeWarning>,
) -> Vec<MemberId> {
    // Seed traversal in key order so component numbering is stable.
    let mut ordered: Vec<MemberId> = nodes.keys().copied().collect();
    ordered.sort_by_key(|id| keys[id]);

    let mut visited: HashSet<MemberId> = HashSet::new();
    let mut roots = Vec::new();

    for seed in ordered {
        if !visited.insert(seed) {
            continue;
        }
        let mut component = vec![seed];
        let mut queue = VecDeque::from([seed]);
        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = undirected.get(&current) {
                for &next in neighbors {
                    if visited.insert(next) {
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }
        }

        let parentless = component
            .iter()
            .copied()
            .filter(|id| nodes[id].is_root_candidate())
            .min_by_key(|id| keys[id]);

        let root = match parentless {
            Some(root) => root,
            None => {
                let root = component
                    .iter()
                    .copied()
                    .min_by_key(|id| keys[id])
                    .expect("component is non-empty");
                warn!(root = %root.short_id(), "cyclic component; choosing least member as root");
                warnings.push(MaterializeWarning::CyclicComponent { root });
                root
            }
        };
        roots.push(root);
    }

    roots.sort_by_key(|id| keys[id]);
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use vansh_types::{RelationInput, TreeId};

    fn tid() -> TreeId {
        TreeId::from_uuid(uuid::Uuid::from_u128(0xF00D))
    }

    fn mid(n: u128) -> MemberId {
        MemberId::from_uuid(uuid::Uuid::from_u128(n + 1))
    }

    /// A member with a fully pinned identity and ordering key.
    fn person(n: u128, name: &str, generation: i32) -> Member {
        let mut member = Member::new(tid(), name)
            .with_generation(generation)
            .with_created_at(Utc.timestamp_opt(1_700_000_000 + n as i64, 0).unwrap());
        member.id = mid(n);
        member
    }

    fn link(from: &Member, to: &Member, input: RelationInput) -> RelationshipEdge {
        RelationshipEdge::link(tid(), from.id, to.id, input).unwrap()
    }

    /// Three generations:
    ///
    ///   grandpa == grandma
    ///        \   /
    ///        father == mother
    ///             \  /
    ///          me -- sis (siblings)
    fn build_family() -> (Vec<Member>, Vec<RelationshipEdge>) {
        let grandpa = person(1, "Grandpa", 0);
        let grandma = person(2, "Grandma", 0);
        let father = person(3, "Father", 1);
        let mother = person(4, "Mother", 1);
        let me = person(5, "Me", 2);
        let sis = person(6, "Sis", 2);

        let edges = vec![
            link(&grandpa, &grandma, RelationInput::Spouse),
            link(&grandpa, &father, RelationInput::Parent),
            link(&grandma, &father, RelationInput::Parent),
            link(&father, &mother, RelationInput::Spouse),
            link(&father, &me, RelationInput::Parent),
            link(&mother, &me, RelationInput::Parent),
            link(&father, &sis, RelationInput::Parent),
            link(&mother, &sis, RelationInput::Parent),
            link(&me, &sis, RelationInput::Sibling),
        ];
        (vec![grandpa, grandma, father, mother, me, sis], edges)
    }

    // ----------------------------------------------------------
    // Basic construction
    // ----------------------------------------------------------

    #[test]
    fn empty_input_yields_empty_forest() {
        let forest = materialize(&[], &[]);
        assert!(forest.is_empty());
        assert!(forest.roots.is_empty());
        assert!(!forest.is_degraded());
    }

    #[test]
    fn single_member_is_its_own_root() {
        let solo = person(1, "Solo", 0);
        let forest = materialize(&[solo.clone()], &[]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.roots, vec![solo.id]);
        assert!(forest.node(&solo.id).unwrap().is_root_candidate());
    }

    #[test]
    fn parent_child_consistency() {
        let (members, edges) = build_family();
        let forest = materialize(&members, &edges);

        for edge in edges.iter().filter(|e| e.kind == RelationKind::Parent) {
            let parent = forest.node(&edge.from).unwrap();
            let child = forest.node(&edge.to).unwrap();
            assert!(parent.children.contains(&edge.to));
            assert!(child.parents.contains(&edge.from));
        }
    }

    #[test]
    fn family_has_single_root() {
        let (members, edges) = build_family();
        let forest = materialize(&members, &edges);
        assert_eq!(forest.component_count(), 1);
        // Grandpa: generation 0, earliest created_at.
        assert_eq!(forest.roots, vec![mid(1)]);
        assert!(!forest.is_degraded());
    }

    // ----------------------------------------------------------
    // Edge interpretation
    // ----------------------------------------------------------

    #[test]
    fn spouse_lists_collect_multiple_marriages() {
        let a = person(1, "A", 0);
        let b = person(2, "B", 0);
        let c = person(3, "C", 0);
        let edges = vec![
            link(&a, &b, RelationInput::Spouse),
            link(&a, &c, RelationInput::Spouse),
        ];
        let forest = materialize(&[a.clone(), b.clone(), c.clone()], &edges);

        assert_eq!(forest.node(&a.id).unwrap().spouses, vec![b.id, c.id]);
        assert_eq!(forest.node(&b.id).unwrap().spouses, vec![a.id]);
        assert_eq!(forest.node(&c.id).unwrap().spouses, vec![a.id]);
    }

    #[test]
    fn duplicate_symmetric_rows_collapse() {
        let a = person(1, "A", 0);
        let b = person(2, "B", 0);
        // The same marriage recorded twice, once per direction.
        let edges = vec![
            link(&a, &b, RelationInput::Spouse),
            link(&b, &a, RelationInput::Spouse),
        ];
        let forest = materialize(&[a.clone(), b.clone()], &edges);

        assert_eq!(forest.node(&a.id).unwrap().spouses, vec![b.id]);
        assert_eq!(forest.node(&b.id).unwrap().spouses, vec![a.id]);
    }

    #[test]
    fn duplicate_parent_rows_collapse() {
        let p = person(1, "P", 0);
        let c = person(2, "C", 1);
        let edges = vec![
            link(&p, &c, RelationInput::Parent),
            link(&p, &c, RelationInput::Parent),
        ];
        let forest = materialize(&[p.clone(), c.clone()], &edges);
        assert_eq!(forest.node(&p.id).unwrap().children, vec![c.id]);
        assert_eq!(forest.node(&c.id).unwrap().parents, vec![p.id]);
    }

    #[test]
    fn sibling_links_are_mutual() {
        let a = person(1, "A", 0);
        let b = person(2, "B", 0);
        let edges = vec![link(&a, &b, RelationInput::Sibling)];
        let forest = materialize(&[a.clone(), b.clone()], &edges);
        assert_eq!(forest.node(&a.id).unwrap().siblings, vec![b.id]);
        assert_eq!(forest.node(&b.id).unwrap().siblings, vec![a.id]);
    }

    #[test]
    fn legacy_child_input_materializes_as_parent() {
        let child = person(1, "Child", 1);
        let parent = person(2, "Parent", 0);
        // "child is a child of parent", the inverse legacy direction.
        let edges = vec![link(&child, &parent, RelationInput::Child)];
        let forest = materialize(&[child.clone(), parent.clone()], &edges);

        assert_eq!(forest.node(&parent.id).unwrap().children, vec![child.id]);
        assert_eq!(forest.node(&child.id).unwrap().parents, vec![parent.id]);
        assert_eq!(forest.roots, vec![parent.id]);
    }

    // ----------------------------------------------------------
    // Degraded input
    // ----------------------------------------------------------

    #[test]
    fn dangling_edge_is_dropped_with_warning() {
        let a = person(1, "A", 0);
        let ghost = person(99, "Ghost", 0);
        let edges = vec![link(&a, &ghost, RelationInput::Parent)];
        // Ghost is not in the supplied member set.
        let forest = materialize(&[a.clone()], &edges);

        assert_eq!(forest.len(), 1);
        assert!(forest.node(&a.id).unwrap().children.is_empty());
        assert!(matches!(
            forest.warnings.as_slice(),
            [MaterializeWarning::DanglingEdge { .. }]
        ));
        assert!(forest.is_degraded());
    }

    #[test]
    fn self_loop_edge_is_dropped_with_warning() {
        let a = person(1, "A", 0);
        // Simulate a corrupt row: the constructor refuses self-relations,
        // so build the struct directly.
        let loop_edge = RelationshipEdge {
            id: EdgeId::new(),
            tree: tid(),
            from: a.id,
            to: a.id,
            kind: RelationKind::Spouse,
            created_at: Utc::now(),
        };
        let forest = materialize(&[a.clone()], &[loop_edge]);

        assert!(forest.node(&a.id).unwrap().spouses.is_empty());
        assert!(matches!(
            forest.warnings.as_slice(),
            [MaterializeWarning::SelfLoopEdge { .. }]
        ));
    }

    // ----------------------------------------------------------
    // Root selection
    // ----------------------------------------------------------

    #[test]
    fn root_prefers_lower_generation_level() {
        let elder = person(5, "Elder", 0);
        let cousin = person(1, "Cousin", 1);
        let bridge = person(3, "Bridge", 1);
        let edges = vec![
            link(&elder, &bridge, RelationInput::Parent),
            link(&cousin, &bridge, RelationInput::Sibling),
        ];
        // Cousin has the earlier created_at, but Elder's generation wins.
        let forest = materialize(&[elder.clone(), cousin.clone(), bridge.clone()], &edges);
        assert_eq!(forest.roots, vec![elder.id]);
    }

    #[test]
    fn equal_generation_ties_break_on_creation_time() {
        let early = person(1, "Early", 0);
        let late = person(2, "Late", 0);
        let edges = vec![link(&early, &late, RelationInput::Sibling)];
        let forest = materialize(&[late.clone(), early.clone()], &edges);
        assert_eq!(forest.roots, vec![early.id]);

        // Same answer with the member array in the other order.
        let again = materialize(&[early.clone(), late.clone()], &edges);
        assert_eq!(again.roots, vec![early.id]);
    }

    #[test]
    fn disconnected_components_form_a_forest() {
        let a1 = person(1, "A1", 0);
        let a2 = person(2, "A2", 1);
        let b1 = person(3, "B1", 0);
        let b2 = person(4, "B2", 1);
        let edges = vec![
            link(&a1, &a2, RelationInput::Parent),
            link(&b1, &b2, RelationInput::Parent),
        ];
        let forest = materialize(
            &[a1.clone(), a2.clone(), b1.clone(), b2.clone()],
            &edges,
        );

        assert_eq!(forest.len(), 4);
        assert_eq!(forest.component_count(), 2);
        assert_eq!(forest.roots, vec![a1.id, b1.id]);
    }

    #[test]
    fn cyclic_component_still_gets_a_deterministic_root() {
        let a = person(1, "A", 0);
        let b = person(2, "B", 0);
        // Bad data: each recorded as the other's parent.
        let edges = vec![
            link(&a, &b, RelationInput::Parent),
            link(&b, &a, RelationInput::Parent),
        ];
        let forest = materialize(&[a.clone(), b.clone()], &edges);

        assert_eq!(forest.roots, vec![a.id]);
        assert!(matches!(
            forest.warnings.as_slice(),
            [MaterializeWarning::CyclicComponent { root }] if *root == a.id
        ));
    }

    // ----------------------------------------------------------
    // Determinism
    // ----------------------------------------------------------

    #[test]
    fn materialize_is_idempotent() {
        let (members, edges) = build_family();
        let first = materialize(&members, &edges);
        let second = materialize(&members, &edges);
        assert_eq!(first, second);
    }

    #[test]
    fn materialize_is_order_independent() {
        let (members, edges) = build_family();
        let forward = materialize(&members, &edges);

        let mut members_rev = members.clone();
        members_rev.reverse();
        let mut edges_rev = edges.clone();
        edges_rev.reverse();
        let backward = materialize(&members_rev, &edges_rev);

        assert_eq!(forward, backward);
    }

    proptest! {
        /// Any permutation of any small member/edge set materializes to a
        /// structurally identical forest.
        #[test]
        fn order_independence_holds_for_arbitrary_graphs(
            specs in proptest::collection::vec((0u128..6, 0u128..6, 0u8..4), 0..24),
            member_rot in 0usize..6,
            edge_rot in 0usize..24,
            reverse_members in any::<bool>(),
            reverse_edges in any::<bool>(),
        ) {
            let members: Vec<Member> = (0..6)
                .map(|n| person(n, &format!("P{n}"), (n % 3) as i32))
                .collect();
            let edges: Vec<RelationshipEdge> = specs
                .iter()
                .filter(|(a, b, _)| a != b)
                .map(|&(a, b, k)| {
                    let input = match k {
                        0 => RelationInput::Parent,
                        1 => RelationInput::Child,
                        2 => RelationInput::Spouse,
                        _ => RelationInput::Sibling,
                    };
                    link(&members[a as usize], &members[b as usize], input)
                })
                .collect();

            let baseline = materialize(&members, &edges);

            let mut shuffled_members = members.clone();
            shuffled_members.rotate_left(member_rot % members.len());
            if reverse_members {
                shuffled_members.reverse();
            }
            let mut shuffled_edges = edges.clone();
            if !shuffled_edges.is_empty() {
                let edge_len = shuffled_edges.len();
                shuffled_edges.rotate_left(edge_rot % edge_len);
            }
            if reverse_edges {
                shuffled_edges.reverse();
            }

            let shuffled = materialize(&shuffled_members, &shuffled_edges);
            prop_assert_eq!(baseline, shuffled);
        }
    }
}
