//! Best-first search over [`crate::state_graph::StateGraph`] with a goal
//! predicate derived from a DNF formula and a domain heuristic; converts the
//! resulting node path into an action/utterance stream (spec.md §4.4).

use std::time::Duration;

use shrdlite_search::{search, SearchError};

use crate::logic::{Conjunction, Dnf, Literal};
use crate::parse_tree::Command;
use crate::physics::Relation;
use crate::state_graph::{Action, Node, StateGraph};
use crate::world::{ObjectAttributes, ObjectId, WorldState};

/// The wall-clock search budget (spec.md §4.4: "default: 30 seconds").
#[derive(Clone, Copy, Debug)]
pub struct PlannerConfig {
    pub timeout: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig { timeout: Duration::from_secs(30) }
    }
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum PlanError {
    #[error("the search driver returned no path to any goal")]
    NoPlan,
    #[error("the search budget was exhausted before a goal was found")]
    SearchTimeout,
}

impl From<SearchError> for PlanError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::NoPath => PlanError::NoPlan,
            SearchError::Timeout => PlanError::SearchTimeout,
        }
    }
}

/// One line of the returned plan: an utterance (capitalised sentence) or an
/// action code (`"p"`, `"d"`, `"l"`, `"r"`), matching spec.md §6's output
/// contract exactly.
pub type PlanLine = String;

/// Plans every interpretation, returning the first successful one (or the
/// first captured error if none succeed), mirroring [`crate::interpreter::interpret`]'s
/// per-parse error policy (spec.md §7).
pub fn plan(
    interpretations: &[(Command, Dnf)],
    world: &WorldState,
    config: PlannerConfig,
) -> Result<Vec<PlanLine>, PlanError> {
    let mut first_error = None;
    for (_, dnf) in interpretations {
        match plan_interpretation(dnf, world, config) {
            Ok(lines) => return Ok(lines),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    Err(first_error.unwrap_or(PlanError::NoPlan))
}

pub fn plan_interpretation(
    dnf: &Dnf,
    world: &WorldState,
    config: PlannerConfig,
) -> Result<Vec<PlanLine>, PlanError> {
    let graph = StateGraph { objects: &world.objects };
    let start = Node::start(world);

    let objects = &world.objects;
    let is_goal = |node: &Node| dnf.iter().any(|conj| conjunction_holds(conj, node, objects));
    let heuristic = |node: &Node| heuristic_value(dnf, node, objects);

    let result = search(&graph, start, is_goal, heuristic, config.timeout)?;

    let mut lines = Vec::new();
    let last_index = result.path.len().saturating_sub(1);
    for (i, node) in result.path.iter().enumerate() {
        match node.last_action {
            Action::Pick => {
                let Some(id) = node.last_action_object(&result.path, i) else { continue };
                let attrs = &objects[&id];
                let utterance = if i == last_index {
                    format!("Taking the {}", describe(attrs))
                } else {
                    format!("Moving the {}", describe(attrs))
                };
                lines.push(utterance);
                lines.push(action_code(Action::Pick).to_string());
            }
            Action::Drop => {
                let Some(id) = node.last_action_object(&result.path, i) else { continue };
                let attrs = &objects[&id];
                let col = &node.stacks[node.arm];
                let suffix = if col.len() == 1 {
                    " on the floor".to_string()
                } else {
                    let support = &col[col.len() - 2];
                    let support_attrs = &objects[support];
                    if support_attrs.form == crate::world::Form::Box {
                        format!(" inside the {}", describe(support_attrs))
                    } else {
                        format!(" on top the {}", describe(support_attrs))
                    }
                };
                lines.push(format!("Dropping the {}{}", describe(attrs), suffix));
                lines.push(action_code(Action::Drop).to_string());
            }
            Action::Left | Action::Right => lines.push(action_code(node.last_action).to_string()),
            Action::None => {}
        }
    }

    if lines.is_empty() {
        lines.push("That is already true!".to_string());
    }
    Ok(lines)
}

fn action_code(action: Action) -> &'static str {
    match action {
        Action::Pick => "p",
        Action::Drop => "d",
        Action::Left => "l",
        Action::Right => "r",
        Action::None => "",
    }
}

fn describe(attrs: &ObjectAttributes) -> String {
    let size = match attrs.size {
        crate::world::Size::Small => "small",
        crate::world::Size::Large => "large",
    };
    let color = attrs.color.as_deref().unwrap_or("object");
    let form = match attrs.form {
        crate::world::Form::Brick => "brick",
        crate::world::Form::Plank => "plank",
        crate::world::Form::Ball => "ball",
        crate::world::Form::Box => "box",
        crate::world::Form::Pyramid => "pyramid",
        crate::world::Form::Table => "table",
        crate::world::Form::Floor => "floor",
        crate::world::Form::AnyForm => "object",
    };
    format!("{size} {color} {form}")
}

impl Node {
    /// The object a pick/drop at path index `i` moved: the node's `holding`
    /// after a pick, or the previous node's `holding` before a drop.
    fn last_action_object(&self, path: &[Node], i: usize) -> Option<ObjectId> {
        match self.last_action {
            Action::Pick => self.holding.clone(),
            Action::Drop => path.get(i.checked_sub(1)?)?.holding.clone(),
            _ => None,
        }
    }
}

fn conjunction_holds(
    conjunction: &Conjunction,
    node: &Node,
    objects: &std::collections::HashMap<ObjectId, ObjectAttributes>,
) -> bool {
    conjunction.iter().all(|lit| literal_holds(lit, node, objects))
}

fn literal_holds(
    literal: &Literal,
    node: &Node,
    objects: &std::collections::HashMap<ObjectId, ObjectAttributes>,
) -> bool {
    if literal.relation == Relation::Holding {
        return node.holding.as_ref() == Some(&literal.args[0]);
    }
    let view = node.view(objects);
    let a = &literal.args[0];
    let b = &literal.args[1];
    let Some(col) = view.column_of(a) else { return false };
    let Some(pos) = view.height_of(a, col) else { return false };
    let pos = pos as i64;
    let targets = std::slice::from_ref(b);
    match literal.relation {
        Relation::LeftOf => view.is_left_of(targets, col),
        Relation::RightOf => view.is_right_of(targets, col),
        Relation::Beside => view.is_beside(targets, col),
        Relation::Inside => view.is_inside(targets, col, pos - 1),
        Relation::OnTop => view.is_on_top(targets, col, pos - 1),
        Relation::Above => view.is_above(targets, col, pos),
        Relation::Under => view.is_under(targets, col, pos + 1),
        // Handled by the early return above.
        Relation::Holding => unreachable!(),
    }
}

/// `h(n)`: the minimum, over conjunctions, of the *last* literal's estimate
/// within that conjunction — preserved from the source for fidelity even
/// though it is a likely bug (Design Note in spec.md §9: a conjunction's
/// true cost is generally `>=` the max of its literals' costs, not just its
/// last one). Returns 0 immediately if any literal anywhere is already
/// satisfied.
fn heuristic_value(
    dnf: &Dnf,
    node: &Node,
    objects: &std::collections::HashMap<ObjectId, ObjectAttributes>,
) -> u32 {
    let mut best: Option<u32> = None;
    for conjunction in dnf.iter() {
        if conjunction.iter().any(|lit| literal_holds(lit, node, objects)) {
            return 0;
        }
        let Some(last) = conjunction.last() else { continue };
        let cost = literal_cost(last, node, objects);
        best = Some(match best {
            Some(b) => b.min(cost),
            None => cost,
        });
    }
    best.unwrap_or(0)
}

fn above(node: &Node, objects: &std::collections::HashMap<ObjectId, ObjectAttributes>, id: &ObjectId) -> i64 {
    node.view(objects).above_count(id) as i64
}

fn span(node: &Node, objects: &std::collections::HashMap<ObjectId, ObjectAttributes>, a: &ObjectId, b: &ObjectId) -> i64 {
    let view = node.view(objects);
    let ca = view.column_of(a).map(|c| c as i64).unwrap_or(node.arm as i64);
    let cb = view.column_of(b).map(|c| c as i64).unwrap_or(node.arm as i64);
    (ca - cb).abs()
}

fn literal_cost(
    literal: &Literal,
    node: &Node,
    objects: &std::collections::HashMap<ObjectId, ObjectAttributes>,
) -> u32 {
    let a = &literal.args[0];
    let cost = match literal.relation {
        Relation::Holding => 4 * above(node, objects, a) + reach_in(node, objects, a),
        Relation::Inside | Relation::OnTop => {
            let b = &literal.args[1];
            3 * (above(node, objects, a) + above(node, objects, b)) + reach_in(node, objects, a) + reach_in(node, objects, b)
        }
        Relation::Under => {
            let b = &literal.args[1];
            4 * above(node, objects, b) + span(node, objects, a, b) + reach_in(node, objects, b)
        }
        Relation::Above => {
            let b = &literal.args[1];
            4 * above(node, objects, a) + span(node, objects, a, b) + reach_in(node, objects, a)
        }
        Relation::LeftOf | Relation::RightOf => {
            let b = &literal.args[1];
            4 * above(node, objects, a) + span(node, objects, a, b) + reach_in(node, objects, a)
        }
        Relation::Beside => {
            let b = &literal.args[1];
            4 * above(node, objects, a) + span(node, objects, a, b) + reach_in(node, objects, a) - 1
        }
    };
    cost.max(0) as u32
}

fn reach_in(node: &Node, objects: &std::collections::HashMap<ObjectId, ObjectAttributes>, id: &ObjectId) -> i64 {
    let view = node.view(objects);
    let col = view.column_of(id).map(|c| c as i64).unwrap_or(node.arm as i64);
    (node.arm as i64 - col).abs()
}
