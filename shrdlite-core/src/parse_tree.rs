//! The input parse tree (spec.md §3): owned, recursive, acyclic — finite by
//! construction since it comes from a single parsed utterance, so an owned
//! tree suffices and no pointer graph is needed (Design Note 1).

use crate::physics::Relation;
use crate::world::Form;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Take,
    Put,
    Move,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub entity: Option<Entity>,
    pub location: Option<Location>,
}

/// A primitive object description: `form` defaults to [`Form::AnyForm`] when
/// unspecified, `size`/`color` are `None` when unspecified. Unspecified
/// fields match anything during [`crate::interpreter::resolve_entity`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectDescription {
    pub form: Form,
    pub size: Option<crate::world::Size>,
    pub color: Option<String>,
}

impl ObjectDescription {
    pub fn floor() -> Self {
        ObjectDescription { form: Form::Floor, size: None, color: None }
    }

    pub fn any() -> Self {
        ObjectDescription { form: Form::AnyForm, size: None, color: None }
    }
}

/// An entity reference: either a primitive description, or a description
/// further restricted by a relative clause (spec.md §3's `(object,
/// location)`). The teacher's Design Note on relative-clause depth is
/// followed here: recursion is uniform, so clauses may nest arbitrarily
/// deep even though the grammar that produces them is only required to
/// nest one level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    Described(ObjectDescription),
    Located { object: Box<Entity>, location: Box<Location> },
}

impl Entity {
    pub fn located(object: Entity, location: Location) -> Self {
        Entity::Located { object: Box::new(object), location: Box::new(location) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub relation: Relation,
    pub entity: Entity,
}
