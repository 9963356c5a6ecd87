//! The DNF formula data model (spec.md §3): an ordered disjunction of ordered
//! conjunctions of literals, in the style of the teacher's `logic::Literal`/
//! `logic::Clause` — plain structural data with a `Display` impl, no
//! unification (every argument here is already a ground object id).

use std::fmt;

use crate::physics::Relation;
use crate::world::ObjectId;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Literal {
    pub polarity: bool,
    pub relation: Relation,
    pub args: Vec<ObjectId>,
}

impl Literal {
    pub fn holding(id: ObjectId) -> Self {
        Literal { polarity: true, relation: Relation::Holding, args: vec![id] }
    }

    pub fn relation(relation: Relation, a: ObjectId, b: ObjectId) -> Self {
        Literal { polarity: true, relation, args: vec![a, b] }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Relation::Holding => "holding",
            Relation::LeftOf => "leftof",
            Relation::RightOf => "rightof",
            Relation::Beside => "beside",
            Relation::Inside => "inside",
            Relation::OnTop => "ontop",
            Relation::Above => "above",
            Relation::Under => "under",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.polarity {
            write!(f, "not ")?;
        }
        let args = self
            .args
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({})", self.relation, args)
    }
}

/// An ordered conjunction of literals; satisfied iff every literal is.
pub type Conjunction = Vec<Literal>;

/// An ordered disjunction of conjunctions; satisfied iff any conjunction is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dnf(pub Vec<Conjunction>);

impl Dnf {
    pub fn empty() -> Self {
        Dnf(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, conjunction: Conjunction) {
        self.0.push(conjunction);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conjunction> {
        self.0.iter()
    }
}

impl fmt::Display for Dnf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let disjuncts = self
            .0
            .iter()
            .map(|conj| {
                conj.iter()
                    .map(|l| l.to_string())
                    .collect::<Vec<_>>()
                    .join(" & ")
            })
            .collect::<Vec<_>>()
            .join(" | ");
        write!(f, "{disjuncts}")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_predicate_applications() {
        let dnf = Dnf(vec![vec![Literal::relation(
            Relation::Inside,
            ObjectId::from("a"),
            ObjectId::from("b"),
        )]]);
        assert_eq!(dnf.to_string(), "inside(a, b)");
    }

    #[test]
    fn displays_disjunction_and_conjunction_separators() {
        let dnf = Dnf(vec![
            vec![Literal::holding(ObjectId::from("a"))],
            vec![
                Literal::relation(Relation::OnTop, ObjectId::from("b"), ObjectId::from("c")),
                Literal::holding(ObjectId::from("d")),
            ],
        ]);
        assert_eq!(dnf.to_string(), "holding(a) | ontop(b, c) & holding(d)");
    }
}
