//! Resolves entity references to object-id sets and emits a DNF goal
//! (spec.md §4.2).

use itertools::Itertools;

use crate::logic::{Dnf, Literal};
use crate::parse_tree::{Command, CommandKind, Entity};
use crate::physics::{is_valid_goal, Relation};
use crate::world::{Form, ObjectId, WorldState};

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum InterpretError {
    #[error("no parse produced a non-empty goal")]
    NoInterpretation,
    #[error("a relative clause was attached where the grammar forbids it")]
    IllegalReference,
}

/// Interprets every candidate parse against `world`, returning the parses
/// that produced a goal paired with that goal. Per-parse failures are
/// suppressed as long as at least one parse succeeds; otherwise the first
/// captured error is surfaced.
pub fn interpret(
    parses: &[Command],
    world: &WorldState,
) -> Result<Vec<(Command, Dnf)>, InterpretError> {
    let mut successes = Vec::new();
    let mut first_error = None;

    for parse in parses {
        match interpret_command(parse, world) {
            Ok(dnf) => successes.push((parse.clone(), dnf)),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if successes.is_empty() {
        Err(first_error.unwrap_or(InterpretError::NoInterpretation))
    } else {
        Ok(successes)
    }
}

pub fn interpret_command(command: &Command, world: &WorldState) -> Result<Dnf, InterpretError> {
    let mut dnf = Dnf::empty();

    match command.kind {
        CommandKind::Take => {
            let entity = command.entity.as_ref().ok_or(InterpretError::IllegalReference)?;
            let candidates = resolve_entity(world, entity)?;
            for id in candidates {
                if !id.is_floor() {
                    dnf.push(vec![Literal::holding(id)]);
                }
            }
        }
        CommandKind::Move => {
            let entity = command.entity.as_ref().ok_or(InterpretError::IllegalReference)?;
            let location = command.location.as_ref().ok_or(InterpretError::IllegalReference)?;
            let subjects = resolve_entity(world, entity)?;
            let targets = resolve_entity(world, &location.entity)?;
            for (subject, target) in subjects.iter().cartesian_product(targets.iter()) {
                if is_valid_goal(&world.objects, location.relation, subject, target) {
                    dnf.push(vec![Literal::relation(location.relation, subject.clone(), target.clone())]);
                }
            }
        }
        CommandKind::Put => {
            let held = world.holding.clone().ok_or(InterpretError::IllegalReference)?;
            let location = command.location.as_ref().ok_or(InterpretError::IllegalReference)?;
            let targets = resolve_entity(world, &location.entity)?;
            for target in targets {
                if is_valid_goal(&world.objects, location.relation, &held, &target) {
                    dnf.push(vec![Literal::relation(location.relation, held.clone(), target)]);
                }
            }
        }
    }

    if dnf.is_empty() {
        return Err(InterpretError::NoInterpretation);
    }
    Ok(dnf)
}

/// Resolves an entity description to the (deterministically ordered — low
/// column to high, bottom to top) set of matching object ids, per spec.md
/// §4.2. Held objects do not appear in `stacks` and are therefore never
/// matched by the attribute scan (Design Note: noted, not "fixed").
pub fn resolve_entity(world: &WorldState, entity: &Entity) -> Result<Vec<ObjectId>, InterpretError> {
    match entity {
        Entity::Described(desc) => {
            if desc.form == Form::Floor {
                return Ok(vec![ObjectId::floor()]);
            }
            let mut matches = Vec::new();
            for column in &world.stacks {
                for id in column {
                    let Some(attrs) = world.objects.get(id) else { continue };
                    let form_ok = desc.form == Form::AnyForm || desc.form == attrs.form;
                    let size_ok = desc.size.is_none_or(|s| s == attrs.size);
                    let color_ok = desc
                        .color
                        .as_deref()
                        .is_none_or(|c| attrs.color.as_deref() == Some(c));
                    if form_ok && size_ok && color_ok {
                        matches.push(id.clone());
                    }
                }
            }
            Ok(matches)
        }
        Entity::Located { object, location } => {
            if let Entity::Described(d) = object.as_ref() {
                if d.form == Form::Floor {
                    return Err(InterpretError::IllegalReference);
                }
            }
            let candidates = resolve_entity(world, object)?;
            let relatives = resolve_entity(world, &location.entity)?;
            let view = world.view();

            let mut kept = Vec::new();
            for candidate in candidates {
                let Some(col) = view.column_of(&candidate) else { continue };
                let Some(pos) = view.height_of(&candidate, col) else { continue };
                let pos = pos as i64;
                let holds = match location.relation {
                    Relation::LeftOf => view.is_left_of(&relatives, col),
                    Relation::RightOf => view.is_right_of(&relatives, col),
                    Relation::Beside => view.is_beside(&relatives, col),
                    Relation::Inside => view.is_inside(&relatives, col, pos - 1),
                    Relation::OnTop => view.is_on_top(&relatives, col, pos - 1),
                    Relation::Above => view.is_above(&relatives, col, pos),
                    Relation::Under => view.is_under(&relatives, col, pos + 1),
                    Relation::Holding => false,
                };
                if holds {
                    kept.push(candidate);
                }
            }
            Ok(kept)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_tree::{Location, ObjectDescription};
    use crate::world::{ObjectAttributes, Size};
    use std::collections::HashMap;

    fn ball(color: &str, size: Size) -> ObjectAttributes {
        ObjectAttributes { form: Form::Ball, size, color: Some(color.to_string()) }
    }
    fn a_box(color: &str, size: Size) -> ObjectAttributes {
        ObjectAttributes { form: Form::Box, size, color: Some(color.to_string()) }
    }

    fn world_with_ball_and_box() -> WorldState {
        let a = ObjectId::from("a");
        let b = ObjectId::from("b");
        WorldState {
            arm: 0,
            holding: None,
            stacks: vec![vec![a.clone()], vec![], vec![b.clone()]],
            objects: HashMap::from([
                (a, ball("white", Size::Small)),
                (b, a_box("red", Size::Large)),
            ]),
        }
    }

    #[test]
    fn put_white_ball_inside_red_box() {
        let mut world = world_with_ball_and_box();
        world.holding = Some(ObjectId::from("a"));
        world.stacks[0].clear();

        let command = Command {
            kind: CommandKind::Put,
            entity: None,
            location: Some(Location {
                relation: Relation::Inside,
                entity: Entity::Described(ObjectDescription {
                    form: Form::Box,
                    size: None,
                    color: Some("red".to_string()),
                }),
            }),
        };
        let dnf = interpret_command(&command, &world).unwrap();
        assert_eq!(dnf.to_string(), "inside(a, b)");
    }

    #[test]
    fn take_red_box() {
        let world = world_with_ball_and_box();
        let command = Command {
            kind: CommandKind::Take,
            entity: Some(Entity::Described(ObjectDescription {
                form: Form::Box,
                size: None,
                color: Some("red".to_string()),
            })),
            location: None,
        };
        let dnf = interpret_command(&command, &world).unwrap();
        assert_eq!(dnf.to_string(), "holding(b)");
    }

    #[test]
    fn self_reference_yields_no_interpretation() {
        let c = ObjectId::from("c");
        let world = WorldState {
            arm: 0,
            holding: None,
            stacks: vec![vec![c.clone()]],
            objects: HashMap::from([(c, ball("red", Size::Small))]),
        };
        let command = Command {
            kind: CommandKind::Move,
            entity: Some(Entity::Described(ObjectDescription::any())),
            location: Some(Location {
                relation: Relation::OnTop,
                entity: Entity::Described(ObjectDescription::any()),
            }),
        };
        assert_eq!(
            interpret_command(&command, &world).unwrap_err(),
            InterpretError::NoInterpretation
        );
    }

    #[test]
    fn beside_floor_is_illegal_reference() {
        let world = world_with_ball_and_box();
        let entity = Entity::located(
            Entity::Described(ObjectDescription::floor()),
            Location { relation: Relation::Beside, entity: Entity::Described(ObjectDescription::any()) },
        );
        assert_eq!(resolve_entity(&world, &entity).unwrap_err(), InterpretError::IllegalReference);
    }

    #[test]
    fn nested_reference_take_ball_beside_green_ball() {
        let r = ObjectId::from("r");
        let g = ObjectId::from("g");
        let bl = ObjectId::from("bl");
        let world = WorldState {
            arm: 0,
            holding: None,
            stacks: vec![vec![r.clone()], vec![g.clone()], vec![bl.clone()]],
            objects: HashMap::from([
                (r, ball("red", Size::Small)),
                (g, ball("green", Size::Small)),
                (bl, ball("blue", Size::Small)),
            ]),
        };
        let entity = Entity::located(
            Entity::Described(ObjectDescription { form: Form::Ball, size: None, color: None }),
            Location {
                relation: Relation::Beside,
                entity: Entity::Described(ObjectDescription {
                    form: Form::Ball,
                    size: None,
                    color: Some("green".to_string()),
                }),
            },
        );
        let command = Command { kind: CommandKind::Take, entity: Some(entity), location: None };
        let dnf = interpret_command(&command, &world).unwrap();
        assert_eq!(dnf.to_string(), "holding(r) | holding(bl)");
    }
}
