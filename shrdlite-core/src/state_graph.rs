//! Nodes (world snapshots) and successor edges of the implicit graph the
//! planner searches (spec.md §4.3): the four primitive actions `pick`,
//! `drop`, `left`, `right`.

use std::collections::HashMap;

use shrdlite_search::Graph;

use crate::physics::{is_valid_goal, Relation};
use crate::world::{check_invariants, ObjectAttributes, ObjectId, World, WorldState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Pick,
    Drop,
    Left,
    Right,
    None,
}

/// A world snapshot reached during search. `last_action` records how the
/// node was reached for plan reconstruction only — it is excluded from
/// `Eq`/`Hash` so that two nodes reached by different routes but with
/// identical `(arm, holding, stacks)` collapse in the closed set, per
/// spec.md §4.3.
#[derive(Clone, Debug)]
pub struct Node {
    pub arm: usize,
    pub holding: Option<ObjectId>,
    pub stacks: Vec<Vec<ObjectId>>,
    pub last_action: Action,
}

impl Node {
    pub fn start(world: &WorldState) -> Self {
        Node {
            arm: world.arm,
            holding: world.holding.clone(),
            stacks: world.stacks.clone(),
            last_action: Action::None,
        }
    }

    pub fn view<'a>(&'a self, objects: &'a HashMap<ObjectId, ObjectAttributes>) -> World<'a> {
        World::new(&self.stacks, objects)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.arm == other.arm && self.holding == other.holding && self.stacks == other.stacks
    }
}
impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.arm.hash(state);
        self.holding.hash(state);
        self.stacks.hash(state);
    }
}

/// Implements [`shrdlite_search::Graph`] for the blocks-world state space.
/// The attribute map is immutable and shared across every node explored, so
/// it lives alongside the graph rather than inside each node.
pub struct StateGraph<'a> {
    pub objects: &'a HashMap<ObjectId, ObjectAttributes>,
}

impl<'a> Graph for StateGraph<'a> {
    type Node = Node;

    /// Successors are generated in the fixed order pick, right, left, drop
    /// (spec.md §5), uniform cost 1.
    fn successors(&self, node: &Node) -> Vec<(Node, u32)> {
        #[cfg(debug_assertions)]
        eprintln!(
            "shrdlite-core: expanding arm={} holding={:?} via {:?}",
            node.arm, node.holding, node.last_action
        );

        let mut out = Vec::new();
        let num_columns = node.stacks.len();

        if node.holding.is_none() {
            let mut stacks = node.stacks.clone();
            if let Some(picked) = stacks[node.arm].pop() {
                out.push((
                    Node { arm: node.arm, holding: Some(picked), stacks, last_action: Action::Pick },
                    1,
                ));
            }
        }

        if node.arm + 1 < num_columns {
            out.push((
                Node { arm: node.arm + 1, holding: node.holding.clone(), stacks: node.stacks.clone(), last_action: Action::Right },
                1,
            ));
        }

        if node.arm > 0 {
            out.push((
                Node { arm: node.arm - 1, holding: node.holding.clone(), stacks: node.stacks.clone(), last_action: Action::Left },
                1,
            ));
        }

        if let Some(held) = &node.holding {
            let top = node.stacks[node.arm].last().cloned().unwrap_or_else(ObjectId::floor);
            let can_drop = is_valid_goal(self.objects, Relation::Inside, held, &top)
                || is_valid_goal(self.objects, Relation::OnTop, held, &top);
            if can_drop {
                let mut stacks = node.stacks.clone();
                stacks[node.arm].push(held.clone());
                out.push((
                    Node { arm: node.arm, holding: None, stacks, last_action: Action::Drop },
                    1,
                ));
            }
        }

        #[cfg(debug_assertions)]
        for (succ, _) in &out {
            let result = check_invariants(succ.arm, &succ.holding, &succ.stacks, self.objects);
            debug_assert!(result.is_ok(), "successor violates world invariants: {:?}", result);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Form, Size};

    fn attrs(form: Form, size: Size) -> ObjectAttributes {
        ObjectAttributes { form, size, color: None }
    }

    #[test]
    fn single_column_world_never_generates_left_or_right() {
        let objects = HashMap::from([(ObjectId::from("a"), attrs(Form::Ball, Size::Small))]);
        let graph = StateGraph { objects: &objects };
        let node = Node { arm: 0, holding: None, stacks: vec![vec![ObjectId::from("a")]], last_action: Action::None };
        let actions: Vec<_> = graph.successors(&node).into_iter().map(|(n, _)| n.last_action).collect();
        assert!(!actions.contains(&Action::Left));
        assert!(!actions.contains(&Action::Right));
    }

    #[test]
    fn empty_column_and_empty_hand_has_no_pick_or_drop() {
        let objects = HashMap::new();
        let graph = StateGraph { objects: &objects };
        let node = Node { arm: 0, holding: None, stacks: vec![vec![], vec![]], last_action: Action::None };
        let actions: Vec<_> = graph.successors(&node).into_iter().map(|(n, _)| n.last_action).collect();
        assert!(!actions.contains(&Action::Pick));
        assert!(!actions.contains(&Action::Drop));
    }

    #[test]
    fn successor_generation_does_not_mutate_parent() {
        let objects = HashMap::from([(ObjectId::from("a"), attrs(Form::Ball, Size::Small))]);
        let graph = StateGraph { objects: &objects };
        let node = Node { arm: 0, holding: None, stacks: vec![vec![ObjectId::from("a")], vec![]], last_action: Action::None };
        let before = node.stacks.clone();
        let _ = graph.successors(&node);
        assert_eq!(node.stacks, before);
    }

    #[test]
    fn pick_then_right_then_drop_produces_valid_path_of_actions() {
        let objects = HashMap::from([(ObjectId::from("a"), attrs(Form::Ball, Size::Small))]);
        let graph = StateGraph { objects: &objects };
        let node = Node { arm: 0, holding: None, stacks: vec![vec![ObjectId::from("a")], vec![]], last_action: Action::None };
        let order: Vec<_> = graph.successors(&node).into_iter().map(|(n, _)| n.last_action).collect();
        assert_eq!(order, vec![Action::Pick, Action::Right]);
    }
}
