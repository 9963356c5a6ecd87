//! Pure functions testing spatial relations and goal validity — the physical
//! laws of the blocks world (spec.md §4.1). Everything here is a pure
//! function of `(stacks, objects)`; neither the interpreter nor the planner
//! mutates either.

use std::collections::HashMap;

use crate::world::{Form, ObjectAttributes, ObjectId, Size, World};

/// The spatial/grasp relation named by a literal or a location clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relation {
    Holding,
    LeftOf,
    RightOf,
    Beside,
    Inside,
    OnTop,
    Above,
    Under,
}

impl<'a> World<'a> {
    pub fn column_of(&self, id: &ObjectId) -> Option<usize> {
        self.stacks.iter().position(|col| col.contains(id))
    }

    pub fn height_of(&self, id: &ObjectId, col: usize) -> Option<usize> {
        self.stacks.get(col)?.iter().position(|i| i == id)
    }

    pub fn above_count(&self, id: &ObjectId) -> usize {
        let Some(col) = self.column_of(id) else { return 0 };
        match self.height_of(id, col) {
            Some(pos) => self.stacks[col].len() - 1 - pos,
            None => 0,
        }
    }

    fn attrs_of(&self, id: &ObjectId) -> Option<&ObjectAttributes> {
        self.objects.get(id)
    }

    fn form_of(&self, id: &ObjectId) -> Option<Form> {
        self.attrs_of(id).map(|a| a.form)
    }

    /// Any target in `targets` lies in a column strictly to the right of `col`.
    pub fn is_left_of(&self, targets: &[ObjectId], col: usize) -> bool {
        targets
            .iter()
            .any(|t| self.column_of(t).is_some_and(|c| c > col))
    }

    /// Any target in `targets` lies in a column strictly to the left of `col`.
    pub fn is_right_of(&self, targets: &[ObjectId], col: usize) -> bool {
        targets
            .iter()
            .any(|t| self.column_of(t).is_some_and(|c| c < col))
    }

    pub fn is_beside(&self, targets: &[ObjectId], col: usize) -> bool {
        targets.iter().any(|t| {
            self.column_of(t)
                .is_some_and(|c| (c as i64 - col as i64).abs() == 1)
        })
    }

    /// Holds iff some target sits exactly at `(col, pos)`; if `targets` is
    /// exactly the floor sentinel, holds iff `pos < 0`.
    pub fn is_on_top(&self, targets: &[ObjectId], col: usize, pos: i64) -> bool {
        if is_only_floor(targets) {
            return pos < 0;
        }
        if pos < 0 {
            return false;
        }
        let pos = pos as usize;
        targets
            .iter()
            .any(|t| self.column_of(t) == Some(col) && self.height_of(t, col) == Some(pos))
    }

    /// Like [`Self::is_on_top`] but only when the target's form is `Box`;
    /// never true for the floor sentinel.
    pub fn is_inside(&self, targets: &[ObjectId], col: usize, pos: i64) -> bool {
        if pos < 0 {
            return false;
        }
        let pos = pos as usize;
        targets.iter().any(|t| {
            self.form_of(t) == Some(Form::Box)
                && self.column_of(t) == Some(col)
                && self.height_of(t, col) == Some(pos)
        })
    }

    /// Holds iff some target lies in `col` strictly below `pos`; if
    /// `targets` is exactly the floor sentinel, always true.
    pub fn is_above(&self, targets: &[ObjectId], col: usize, pos: i64) -> bool {
        if is_only_floor(targets) {
            return true;
        }
        targets.iter().any(|t| match self.column_of(t) {
            Some(c) if c == col => self.height_of(t, col).is_some_and(|h| (h as i64) < pos),
            _ => false,
        })
    }

    /// Holds iff some target lies in `col` at a position `>= pos`; never
    /// true for the floor sentinel.
    pub fn is_under(&self, targets: &[ObjectId], col: usize, pos: i64) -> bool {
        targets.iter().any(|t| match self.column_of(t) {
            Some(c) if c == col => self.height_of(t, col).is_some_and(|h| (h as i64) >= pos),
            _ => false,
        })
    }
}

fn is_only_floor(targets: &[ObjectId]) -> bool {
    matches!(targets, [one] if one.is_floor())
}

/// Whether the literal `relation(a, b)` can physically hold, per spec.md
/// §4.1's rule table. `objects` supplies form/size for `a` and `b`; the
/// floor sentinel has none.
pub fn is_valid_goal(
    objects: &HashMap<ObjectId, ObjectAttributes>,
    relation: Relation,
    a: &ObjectId,
    b: &ObjectId,
) -> bool {
    if a == b {
        return false;
    }
    if a.is_floor() {
        return false;
    }
    if b.is_floor() {
        return matches!(relation, Relation::OnTop | Relation::Above);
    }

    let Some(a_attrs) = objects.get(a) else {
        return false;
    };
    let Some(b_attrs) = objects.get(b) else {
        return false;
    };

    match relation {
        Relation::Inside => {
            if a_attrs.size == Size::Large && b_attrs.size == Size::Small {
                return false;
            }
            if b_attrs.form != Form::Box {
                return false;
            }
            if matches!(a_attrs.form, Form::Pyramid | Form::Plank | Form::Box) && a_attrs.size == b_attrs.size {
                return false;
            }
            true
        }
        Relation::OnTop | Relation::Above => {
            if a_attrs.form == Form::Ball && relation == Relation::OnTop {
                return false;
            }
            if b_attrs.form == Form::Ball {
                return false;
            }
            if a_attrs.size == Size::Large && b_attrs.size == Size::Small {
                return false;
            }
            if a_attrs.form == Form::Box
                && a_attrs.size == Size::Small
                && matches!(b_attrs.form, Form::Brick | Form::Pyramid)
                && b_attrs.size == Size::Small
            {
                return false;
            }
            if a_attrs.form == Form::Box
                && a_attrs.size == Size::Large
                && b_attrs.form == Form::Pyramid
                && b_attrs.size == Size::Large
            {
                return false;
            }
            if relation == Relation::OnTop && b_attrs.form == Form::Box {
                return false;
            }
            true
        }
        Relation::LeftOf | Relation::RightOf | Relation::Beside | Relation::Under => true,
        Relation::Holding => false,
    }
}
