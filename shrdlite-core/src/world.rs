//! The passive world record shared, read-only, by the interpreter and the
//! planner: arm position, held object, per-column stacks, and per-id object
//! attributes.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// An object identifier, or the sentinel [`ObjectId::floor`].
///
/// `Rc<str>` keeps clones cheap: the planner's search explores many
/// [`crate::state_graph::Node`]s, each owning a full copy of the stack
/// structure (per spec.md §4.3, successors must not alias parent storage).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Rc<str>);

impl ObjectId {
    pub fn new(id: impl Into<Rc<str>>) -> Self {
        ObjectId(id.into())
    }

    /// The sentinel id reserved for the floor. Never a real object.
    pub fn floor() -> Self {
        ObjectId(Rc::from("floor"))
    }

    pub fn is_floor(&self) -> bool {
        &*self.0 == "floor"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        ObjectId::new(s)
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        ObjectId::new(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Form {
    Brick,
    Plank,
    Ball,
    Box,
    Pyramid,
    Table,
    Floor,
    /// Matches any form; only meaningful in an [`crate::parse_tree::ObjectDescription`],
    /// never stored as a real object's attribute.
    AnyForm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Size {
    Small,
    Large,
}

/// A real object's attributes. The floor sentinel has none of these; it is
/// never a key of [`WorldState::objects`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectAttributes {
    pub form: Form,
    pub size: Size,
    pub color: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldState {
    pub arm: usize,
    pub holding: Option<ObjectId>,
    pub stacks: Vec<Vec<ObjectId>>,
    pub objects: HashMap<ObjectId, ObjectAttributes>,
}

impl WorldState {
    pub fn num_columns(&self) -> usize {
        self.stacks.len()
    }

    /// Checks the structural invariants of spec.md §3. Used by tests and, via
    /// [`check_invariants`], by debug-only assertions in the state graph.
    pub fn check_invariants(&self) -> Result<(), String> {
        check_invariants(self.arm, &self.holding, &self.stacks, &self.objects)
    }
}

/// The invariant check behind [`WorldState::check_invariants`], taking its
/// fields separately so a [`crate::state_graph::Node`] (which borrows its
/// attribute map rather than owning it) can run the same check on a
/// candidate successor without building a throwaway `WorldState`.
pub fn check_invariants(
    arm: usize,
    holding: &Option<ObjectId>,
    stacks: &[Vec<ObjectId>],
    objects: &HashMap<ObjectId, ObjectAttributes>,
) -> Result<(), String> {
    if arm >= stacks.len() {
        return Err(format!("arm column {arm} out of range (numColumns={})", stacks.len()));
    }
    let mut seen = std::collections::HashSet::new();
    for (col_idx, col) in stacks.iter().enumerate() {
        for id in col {
            if id.is_floor() {
                return Err("floor sentinel may not appear in a stack".to_string());
            }
            if !objects.contains_key(id) {
                return Err(format!("id {id} in column {col_idx} has no attributes"));
            }
            if !seen.insert(id.clone()) {
                return Err(format!("id {id} appears more than once across stacks"));
            }
        }
    }
    if let Some(held) = holding {
        if !seen.insert(held.clone()) {
            return Err(format!("id {held} is both held and present in a stack"));
        }
    }
    Ok(())
}

/// A read-only view of `(stacks, objects)`, the pair every physics predicate
/// in spec.md §4.1 is defined over. The planner builds one of these per
/// search node (stacks change; the attribute map never does), the
/// interpreter builds one from the input [`WorldState`] directly.
#[derive(Clone, Copy)]
pub struct World<'a> {
    pub stacks: &'a [Vec<ObjectId>],
    pub objects: &'a HashMap<ObjectId, ObjectAttributes>,
}

impl<'a> World<'a> {
    pub fn new(stacks: &'a [Vec<ObjectId>], objects: &'a HashMap<ObjectId, ObjectAttributes>) -> Self {
        World { stacks, objects }
    }
}

impl WorldState {
    pub fn view(&self) -> World<'_> {
        World::new(&self.stacks, &self.objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(form: Form, size: Size) -> ObjectAttributes {
        ObjectAttributes { form, size, color: None }
    }

    #[test]
    fn rejects_duplicate_id_across_stacks() {
        let a = ObjectId::from("a");
        let world = WorldState {
            arm: 0,
            holding: None,
            stacks: vec![vec![a.clone()], vec![a.clone()]],
            objects: HashMap::from([(a, attrs(Form::Ball, Size::Small))]),
        };
        assert!(world.check_invariants().is_err());
    }

    #[test]
    fn rejects_held_and_stacked_simultaneously() {
        let a = ObjectId::from("a");
        let world = WorldState {
            arm: 0,
            holding: Some(a.clone()),
            stacks: vec![vec![a.clone()]],
            objects: HashMap::from([(a, attrs(Form::Ball, Size::Small))]),
        };
        assert!(world.check_invariants().is_err());
    }

    #[test]
    fn accepts_well_formed_world() {
        let a = ObjectId::from("a");
        let b = ObjectId::from("b");
        let world = WorldState {
            arm: 0,
            holding: None,
            stacks: vec![vec![a.clone(), b.clone()], vec![]],
            objects: HashMap::from([
                (a, attrs(Form::Box, Size::Large)),
                (b, attrs(Form::Ball, Size::Small)),
            ]),
        };
        assert!(world.check_invariants().is_ok());
    }
}
