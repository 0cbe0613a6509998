//! Activation rules between controller fields and their targets.
//!
//! Edges are resolved in the link pass, after every field and frame of a
//! scope exists, so a rule may name a target declared later in the document.
//! Evaluation is one hop only: when a target is itself a controller its own
//! rules are not re-run by the effect.

use std::collections::HashMap;

use form_config::RuleEffect;

use crate::errors::SchemaError;
use crate::field::FieldInstance;
use crate::frame::FrameTable;
use crate::kind::ValueKind;
use crate::schema::Condition;
use crate::value::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Field(usize),
    Frame(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub(crate) controller: usize,
    pub(crate) target: Target,
    pub(crate) condition: Condition,
    pub(crate) effect: RuleEffect,
}

impl Edge {
    /// Whether the target should be enabled for the controller's value.
    pub(crate) fn target_enabled(&self, value: Option<&FieldValue>) -> bool {
        let fires = match &self.condition {
            Condition::Truth(expected) => value.and_then(FieldValue::as_bool) == Some(*expected),
            Condition::Membership { option, present } => {
                let selected = match value {
                    Some(FieldValue::Text(choice)) => choice == option,
                    Some(FieldValue::List(items)) => {
                        items.iter().any(|item| item.as_str() == Some(option.as_str()))
                    }
                    _ => false,
                };
                selected == *present
            }
        };
        match self.effect {
            RuleEffect::Enable => fires,
            RuleEffect::Disable => !fires,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DependencyGraph {
    edges: Vec<Edge>,
    by_controller: HashMap<usize, Vec<usize>>,
}

impl DependencyGraph {
    /// Resolve every declared rule. Unknown targets, rules on kinds that
    /// cannot control anything, mismatched conditions, self targets and
    /// direct two-field cycles are schema errors.
    pub(crate) fn link(
        fields: &[FieldInstance],
        field_index: &HashMap<String, usize>,
        frames: &FrameTable,
    ) -> Result<Self, SchemaError> {
        let mut graph = Self::default();
        for (controller, field) in fields.iter().enumerate() {
            let spec = field.spec();
            if spec.rules.is_empty() {
                continue;
            }
            if !spec.kind.is_controller() {
                return Err(SchemaError::InvalidRule {
                    controller: spec.name.clone(),
                    reason: format!("a {} field cannot control other fields", spec.kind.name()),
                });
            }
            for rule in &spec.rules {
                check_condition(&spec.name, &spec.kind, &rule.condition)?;
                let target = match (field_index.get(&rule.target), frames.get(&rule.target)) {
                    (Some(ix), _) => Target::Field(*ix),
                    (None, Some(ix)) => Target::Frame(ix),
                    (None, None) => {
                        return Err(SchemaError::UnresolvedTarget {
                            controller: spec.name.clone(),
                            target: rule.target.clone(),
                        });
                    }
                };
                graph
                    .by_controller
                    .entry(controller)
                    .or_default()
                    .push(graph.edges.len());
                graph.edges.push(Edge {
                    controller,
                    target,
                    condition: rule.condition.clone(),
                    effect: rule.effect,
                });
            }
        }
        graph.check_cycles(fields, frames)?;
        Ok(graph)
    }

    fn check_cycles(&self, fields: &[FieldInstance], frames: &FrameTable) -> Result<(), SchemaError> {
        let affected: Vec<Vec<usize>> = self
            .edges
            .iter()
            .map(|edge| match edge.target {
                Target::Field(ix) => vec![ix],
                Target::Frame(ix) => frames.members(ix).0,
            })
            .collect();

        for (edge, targets) in self.edges.iter().zip(&affected) {
            let name = |ix: usize| fields[ix].name().to_string();
            if targets.contains(&edge.controller) {
                return Err(SchemaError::InvalidRule {
                    controller: name(edge.controller),
                    reason: "a rule cannot target its own controller".to_string(),
                });
            }
            for (other, other_targets) in self.edges.iter().zip(&affected) {
                if targets.contains(&other.controller) && other_targets.contains(&edge.controller) {
                    return Err(SchemaError::DependencyCycle {
                        first: name(edge.controller),
                        second: name(other.controller),
                    });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn edges_from(&self, controller: usize) -> impl Iterator<Item = &Edge> {
        self.by_controller
            .get(&controller)
            .into_iter()
            .flatten()
            .map(|ix| &self.edges[*ix])
    }

    pub(crate) fn controllers(&self) -> Vec<usize> {
        let mut controllers: Vec<usize> = self.by_controller.keys().copied().collect();
        controllers.sort_unstable();
        controllers
    }

    pub(crate) fn is_controller(&self, field: usize) -> bool {
        self.by_controller.contains_key(&field)
    }
}

fn check_condition(controller: &str, kind: &ValueKind, condition: &Condition) -> Result<(), SchemaError> {
    let fits = matches!(
        (kind, condition),
        (ValueKind::Bool, Condition::Truth(_))
            | (
                ValueKind::Selection | ValueKind::ListBoxSelection,
                Condition::Membership { .. }
            )
    );
    if fits {
        Ok(())
    } else {
        Err(SchemaError::InvalidRule {
            controller: controller.to_string(),
            reason: format!("condition {condition:?} does not fit a {} controller", kind.name()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(condition: Condition, effect: RuleEffect) -> Edge {
        Edge {
            controller: 0,
            target: Target::Field(1),
            condition,
            effect,
        }
    }

    #[test]
    fn truth_condition() {
        let e = edge(Condition::Truth(true), RuleEffect::Enable);
        assert!(e.target_enabled(Some(&FieldValue::Bool(true))));
        assert!(!e.target_enabled(Some(&FieldValue::Bool(false))));
        assert!(!e.target_enabled(None));

        let inverted = edge(Condition::Truth(false), RuleEffect::Disable);
        assert!(inverted.target_enabled(Some(&FieldValue::Bool(true))));
        assert!(!inverted.target_enabled(Some(&FieldValue::Bool(false))));
    }

    #[test]
    fn membership_condition() {
        let wanted = edge(
            Condition::Membership {
                option: "les".into(),
                present: true,
            },
            RuleEffect::Enable,
        );
        assert!(wanted.target_enabled(Some(&"les".into())));
        assert!(!wanted.target_enabled(Some(&"rans".into())));
        assert!(wanted.target_enabled(Some(&FieldValue::from(vec!["a", "les"]))));

        let absent = edge(
            Condition::Membership {
                option: "les".into(),
                present: false,
            },
            RuleEffect::Enable,
        );
        assert!(absent.target_enabled(Some(&FieldValue::from(vec!["a"]))));
        assert!(absent.target_enabled(None));
        assert!(!absent.target_enabled(Some(&FieldValue::from(vec!["les"]))));
    }
}
