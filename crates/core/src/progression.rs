//! Per-node progression state for a whole path.
//!
//! The calculator never repairs bad data. When the snapshot breaks the
//! monotonic-unlock rule the states are still derived positionally and the
//! breakage is returned as [`InvariantViolation`]s for the caller to surface.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    EventStatus, Lesson, LessonId, NodeKind, NodeRef, PathPriority, PathSnapshot, UnitId,
};
use crate::overlay::CompletionOverlay;

/// Mastery below this tags the first open lesson for recovery.
pub const RECOVERY_MASTERY_THRESHOLD: f64 = 0.55;

/// Every n-th lesson of a unit is styled as a checkpoint.
pub const CHECKPOINT_EVERY: usize = 5;

//
// ─── VIEW TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeState {
    Completed,
    Current,
    Available,
    Locked,
}

/// Visual weight of a node. A unit's last lesson is a milestone even when it
/// also lands on a checkpoint position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Emphasis {
    #[default]
    None,
    Checkpoint,
    Milestone,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTags {
    /// First open lesson while mastery is low.
    pub recovery: bool,
    /// Most recently completed lesson while reviews are due and prioritised.
    pub review_anchor: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub node: NodeRef,
    pub unit_index: usize,
    /// Position among the unit's lessons; `None` for events.
    pub lesson_position: Option<usize>,
    pub state: NodeState,
    pub emphasis: Emphasis,
    pub tags: NodeTags,
}

/// A snapshot shape the path should never have.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[non_exhaustive]
pub enum InvariantViolation {
    #[error("unit {unit}: locked lesson {locked} sits before completed lesson {ahead}")]
    LockedBeforeProgress {
        unit: UnitId,
        locked: LessonId,
        ahead: LessonId,
    },

    #[error("unit {unit}: lesson {lesson} is completed but earlier lesson {gap} is not")]
    CompletedAfterGap {
        unit: UnitId,
        lesson: LessonId,
        gap: LessonId,
    },
}

/// Output of [`compute_node_states`]: views in traversal order plus any data bugs found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressionReport {
    pub nodes: Vec<NodeView>,
    pub violations: Vec<InvariantViolation>,
}

impl ProgressionReport {
    #[must_use]
    pub fn view(&self, node: &NodeRef) -> Option<&NodeView> {
        self.nodes.iter().find(|view| &view.node == node)
    }

    #[must_use]
    pub fn lesson_state(&self, lesson_id: &LessonId) -> Option<NodeState> {
        self.view(&NodeRef::Lesson(lesson_id.clone()))
            .map(|view| view.state)
    }

    /// The single recommended next lesson, if any.
    #[must_use]
    pub fn current_lesson(&self) -> Option<&LessonId> {
        self.nodes.iter().find_map(|view| match (&view.node, view.state) {
            (NodeRef::Lesson(id), NodeState::Current) => Some(id),
            _ => None,
        })
    }

    /// Views belonging to one unit, in traversal order.
    pub fn unit_views(&self, unit_index: usize) -> impl Iterator<Item = &NodeView> {
        self.nodes
            .iter()
            .filter(move |view| view.unit_index == unit_index)
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

//
// ─── CALCULATOR ────────────────────────────────────────────────────────────────
//

/// Derives every node's state from the snapshot and the optimistic overlay.
#[must_use]
pub fn compute_node_states(
    snapshot: &PathSnapshot,
    overlay: &CompletionOverlay,
) -> ProgressionReport {
    let units = snapshot.ordered_units();
    let done = |lesson: &Lesson| overlay.effective_completed(lesson);
    let open = |lesson: &Lesson| lesson.unlocked && !done(lesson);

    let frontier_unit = units
        .iter()
        .position(|unit| unit.ordered_lessons().into_iter().any(open));

    let recovery_target = if snapshot.mastery_average < RECOVERY_MASTERY_THRESHOLD {
        units
            .iter()
            .flat_map(|unit| unit.ordered_lessons())
            .find(|lesson| open(lesson))
            .map(|lesson| lesson.id.clone())
    } else {
        None
    };

    let review_target = if snapshot.path_priority == PathPriority::ReviewFirst
        && snapshot.due_reviews_count > 0
    {
        units
            .iter()
            .flat_map(|unit| unit.ordered_lessons())
            .filter(|lesson| done(lesson))
            .last()
            .map(|lesson| lesson.id.clone())
    } else {
        None
    };

    let mut report = ProgressionReport::default();
    let mut current_claimed = false;

    for (unit_index, unit) in units.iter().enumerate() {
        let lessons = unit.ordered_lessons();
        let done_count = lessons.iter().take_while(|lesson| done(lesson)).count();
        let is_future = frontier_unit.is_none_or(|frontier| unit_index > frontier);

        let current_position = if !is_future && !current_claimed && done_count < lessons.len() {
            current_claimed = true;
            Some(done_count)
        } else {
            None
        };

        if let Some(gap) = lessons.get(done_count) {
            for ahead in lessons.iter().skip(done_count + 1).filter(|l| done(l)) {
                let violation = if gap.unlocked {
                    InvariantViolation::CompletedAfterGap {
                        unit: unit.id.clone(),
                        lesson: ahead.id.clone(),
                        gap: gap.id.clone(),
                    }
                } else {
                    InvariantViolation::LockedBeforeProgress {
                        unit: unit.id.clone(),
                        locked: gap.id.clone(),
                        ahead: ahead.id.clone(),
                    }
                };
                report.violations.push(violation);
            }
        }

        let last_position = lessons.len().checked_sub(1);
        let mut position = 0;
        for node in unit.ordered_nodes() {
            let view = match &node.kind {
                NodeKind::Lesson(lesson) => {
                    let state = if position < done_count {
                        NodeState::Completed
                    } else if current_position == Some(position) {
                        NodeState::Current
                    } else if lesson.unlocked {
                        NodeState::Available
                    } else {
                        NodeState::Locked
                    };
                    let emphasis = if Some(position) == last_position {
                        Emphasis::Milestone
                    } else if (position + 1) % CHECKPOINT_EVERY == 0 {
                        Emphasis::Checkpoint
                    } else {
                        Emphasis::None
                    };
                    let tags = NodeTags {
                        recovery: recovery_target.as_ref() == Some(&lesson.id),
                        review_anchor: review_target.as_ref() == Some(&lesson.id),
                    };
                    let view = NodeView {
                        node: node.node_ref(),
                        unit_index,
                        lesson_position: Some(position),
                        state,
                        emphasis,
                        tags,
                    };
                    position += 1;
                    view
                }
                NodeKind::Event(event) => NodeView {
                    node: node.node_ref(),
                    unit_index,
                    lesson_position: None,
                    state: match event.status {
                        EventStatus::Completed => NodeState::Completed,
                        EventStatus::Available => NodeState::Available,
                        EventStatus::Locked => NodeState::Locked,
                    },
                    emphasis: Emphasis::None,
                    tags: NodeTags::default(),
                },
            };
            report.nodes.push(view);
        }
    }

    report
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_math::hash_seed;
    use crate::model::{
        Difficulty, Event, EventId, EventKind, Node, SessionMetadata, SubjectId, Unit,
    };

    fn lesson(id: &str, unlocked: bool, completed: bool) -> Lesson {
        Lesson {
            id: LessonId::new(id),
            order: 0,
            title: id.to_uppercase(),
            unlocked,
            completed,
            difficulty: Difficulty::Medium,
            session_metadata: SessionMetadata::default(),
        }
    }

    fn unit(id: &str, order: u32, lessons: Vec<Lesson>) -> Unit {
        Unit {
            id: UnitId::new(id),
            order,
            title: id.to_string(),
            completion_rate: 0.0,
            nodes: lessons
                .into_iter()
                .enumerate()
                .map(|(i, l)| Node::lesson(u32::try_from(i).unwrap(), l))
                .collect(),
        }
    }

    fn snapshot(units: Vec<Unit>) -> PathSnapshot {
        PathSnapshot {
            subject_id: SubjectId::new("math"),
            units,
            streak_days: 3,
            due_reviews_count: 0,
            mastery_average: 0.8,
            path_priority: PathPriority::AdvanceFirst,
        }
    }

    fn states(report: &ProgressionReport, unit_index: usize) -> Vec<NodeState> {
        report.unit_views(unit_index).map(|v| v.state).collect()
    }

    #[test]
    fn partially_completed_unit_has_one_current_lesson() {
        let path = snapshot(vec![unit(
            "u1",
            0,
            vec![
                lesson("l0", true, true),
                lesson("l1", true, true),
                lesson("l2", true, false),
                lesson("l3", false, false),
                lesson("l4", false, false),
            ],
        )]);

        let report = compute_node_states(&path, &CompletionOverlay::new());

        assert_eq!(
            states(&report, 0),
            vec![
                NodeState::Completed,
                NodeState::Completed,
                NodeState::Current,
                NodeState::Locked,
                NodeState::Locked,
            ]
        );
        assert_eq!(report.current_lesson(), Some(&LessonId::new("l2")));
        assert!(report.is_consistent());
    }

    #[test]
    fn future_units_never_get_a_current_lesson() {
        let path = snapshot(vec![
            unit("u1", 0, vec![lesson("a0", true, true), lesson("a1", true, false)]),
            unit("u2", 1, vec![lesson("b0", false, false), lesson("b1", false, false)]),
        ]);

        let report = compute_node_states(&path, &CompletionOverlay::new());

        assert_eq!(states(&report, 0), vec![NodeState::Completed, NodeState::Current]);
        assert_eq!(states(&report, 1), vec![NodeState::Locked, NodeState::Locked]);
    }

    #[test]
    fn only_first_eligible_unit_claims_current() {
        // Both units hold unlocked work; the first one wins.
        let path = snapshot(vec![
            unit("u1", 0, vec![lesson("a0", true, false)]),
            unit("u2", 1, vec![lesson("b0", true, false)]),
        ]);

        let report = compute_node_states(&path, &CompletionOverlay::new());

        assert_eq!(states(&report, 0), vec![NodeState::Current]);
        assert_eq!(states(&report, 1), vec![NodeState::Available]);
    }

    #[test]
    fn fully_completed_path_has_no_current_lesson() {
        let path = snapshot(vec![unit(
            "u1",
            0,
            vec![lesson("l0", true, true), lesson("l1", true, true)],
        )]);
        let report = compute_node_states(&path, &CompletionOverlay::new());
        assert_eq!(report.current_lesson(), None);
    }

    #[test]
    fn units_are_walked_in_order_not_storage_order() {
        let path = snapshot(vec![
            unit("later", 5, vec![lesson("b0", true, false)]),
            unit("first", 1, vec![lesson("a0", true, false)]),
        ]);
        let report = compute_node_states(&path, &CompletionOverlay::new());
        assert_eq!(report.current_lesson(), Some(&LessonId::new("a0")));
    }

    #[test]
    fn overlay_advances_current_lesson() {
        let path = snapshot(vec![unit(
            "u1",
            0,
            vec![lesson("l0", true, false), lesson("l1", true, false)],
        )]);
        let mut overlay = CompletionOverlay::new();
        overlay.mark(LessonId::new("l0"));

        let report = compute_node_states(&path, &overlay);

        assert_eq!(states(&report, 0), vec![NodeState::Completed, NodeState::Current]);
    }

    #[test]
    fn milestone_wins_over_checkpoint() {
        let lessons: Vec<Lesson> = (0..10)
            .map(|i| lesson(&format!("l{i}"), false, false))
            .collect();
        let path = snapshot(vec![unit("u1", 0, lessons)]);

        let report = compute_node_states(&path, &CompletionOverlay::new());
        let emphasis: Vec<Emphasis> = report.unit_views(0).map(|v| v.emphasis).collect();

        assert_eq!(emphasis[4], Emphasis::Checkpoint);
        assert_eq!(emphasis[9], Emphasis::Milestone);
        assert_eq!(
            emphasis.iter().filter(|e| **e == Emphasis::Milestone).count(),
            1
        );
        assert_eq!(emphasis[0], Emphasis::None);
    }

    #[test]
    fn short_unit_last_lesson_is_milestone() {
        let path = snapshot(vec![unit(
            "u1",
            0,
            vec![lesson("l0", true, false), lesson("l1", false, false)],
        )]);
        let report = compute_node_states(&path, &CompletionOverlay::new());
        let emphasis: Vec<Emphasis> = report.unit_views(0).map(|v| v.emphasis).collect();
        assert_eq!(emphasis, vec![Emphasis::None, Emphasis::Milestone]);
    }

    #[test]
    fn events_keep_their_status_and_do_not_shift_lesson_positions() {
        let mut u = unit(
            "u1",
            0,
            vec![lesson("l0", true, true), lesson("l1", true, false)],
        );
        u.nodes[1].order_index = 2;
        u.nodes.push(Node::event(
            1,
            Event {
                id: EventId::new("chest"),
                kind: EventKind::Chest,
                status: EventStatus::Available,
            },
        ));

        let report = compute_node_states(&snapshot(vec![u]), &CompletionOverlay::new());
        let views: Vec<&NodeView> = report.unit_views(0).collect();

        assert_eq!(views[1].node, NodeRef::Event(EventId::new("chest")));
        assert_eq!(views[1].state, NodeState::Available);
        assert_eq!(views[1].lesson_position, None);
        assert_eq!(views[2].lesson_position, Some(1));
        assert_eq!(views[2].state, NodeState::Current);
    }

    #[test]
    fn low_mastery_tags_first_open_lesson_for_recovery() {
        let mut path = snapshot(vec![
            unit("u1", 0, vec![lesson("a0", true, true)]),
            unit("u2", 1, vec![lesson("b0", true, false), lesson("b1", true, false)]),
        ]);
        path.mastery_average = 0.4;

        let report = compute_node_states(&path, &CompletionOverlay::new());
        let tagged: Vec<&NodeRef> = report
            .nodes
            .iter()
            .filter(|v| v.tags.recovery)
            .map(|v| &v.node)
            .collect();

        assert_eq!(tagged, vec![&NodeRef::Lesson(LessonId::new("b0"))]);
    }

    #[test]
    fn review_first_tags_most_recent_completion() {
        let mut path = snapshot(vec![
            unit("u1", 0, vec![lesson("a0", true, true), lesson("a1", true, true)]),
            unit("u2", 1, vec![lesson("b0", true, false)]),
        ]);
        path.path_priority = PathPriority::ReviewFirst;
        path.due_reviews_count = 4;

        let report = compute_node_states(&path, &CompletionOverlay::new());
        let anchor = report.nodes.iter().find(|v| v.tags.review_anchor).unwrap();
        assert_eq!(anchor.node, NodeRef::Lesson(LessonId::new("a1")));

        path.due_reviews_count = 0;
        let report = compute_node_states(&path, &CompletionOverlay::new());
        assert!(report.nodes.iter().all(|v| !v.tags.review_anchor));
    }

    #[test]
    fn gaps_are_reported_not_reordered() {
        let path = snapshot(vec![unit(
            "u1",
            0,
            vec![
                lesson("l0", true, true),
                lesson("l1", false, false),
                lesson("l2", true, true),
            ],
        )]);

        let report = compute_node_states(&path, &CompletionOverlay::new());

        assert_eq!(
            report.violations,
            vec![InvariantViolation::LockedBeforeProgress {
                unit: UnitId::new("u1"),
                locked: LessonId::new("l1"),
                ahead: LessonId::new("l2"),
            }]
        );
        // Positional states are kept as-is; nothing is open, so nothing is current.
        assert_eq!(
            states(&report, 0),
            vec![NodeState::Completed, NodeState::Locked, NodeState::Available]
        );
        assert_eq!(report.lesson_state(&LessonId::new("l2")), Some(NodeState::Available));
    }

    #[test]
    fn empty_snapshot_yields_empty_report() {
        let report = compute_node_states(&snapshot(Vec::new()), &CompletionOverlay::new());
        assert!(report.nodes.is_empty());
        assert!(report.is_consistent());
    }

    /// Builds a well-formed path: completed prefix, then an unlocked frontier,
    /// then locked lessons, across several units.
    fn generated_path(seed: u32) -> PathSnapshot {
        let unit_count = 1 + (seed % 4) as usize;
        let sizes: Vec<usize> = (0..unit_count)
            .map(|u| 1 + (hash_seed(&format!("{seed}|size|{u}")) % 8) as usize)
            .collect();
        let total: usize = sizes.iter().sum();
        let completed = (hash_seed(&format!("{seed}|done")) as usize) % (total + 1);
        let unlocked_extra = (hash_seed(&format!("{seed}|open")) % 3) as usize;

        let mut global = 0;
        let units = sizes
            .iter()
            .enumerate()
            .map(|(u, size)| {
                let lessons = (0..*size)
                    .map(|_| {
                        let idx = global;
                        global += 1;
                        lesson(
                            &format!("l{idx}"),
                            idx < completed + 1 + unlocked_extra,
                            idx < completed,
                        )
                    })
                    .collect();
                unit(&format!("u{u}"), u32::try_from(u).unwrap(), lessons)
            })
            .collect();
        snapshot(units)
    }

    #[test]
    fn generated_paths_hold_unlock_and_current_invariants() {
        for seed in 0..200 {
            let path = generated_path(seed);
            let report = compute_node_states(&path, &CompletionOverlay::new());

            assert!(report.is_consistent(), "seed {seed}: {:?}", report.violations);

            let current = report
                .nodes
                .iter()
                .filter(|v| v.state == NodeState::Current)
                .count();
            assert!(current <= 1, "seed {seed}: {current} current lessons");

            for unit_index in 0..path.units.len() {
                let unit_states = states(&report, unit_index);
                let last_progress = unit_states
                    .iter()
                    .rposition(|s| matches!(s, NodeState::Completed | NodeState::Current));
                if let Some(last_progress) = last_progress {
                    assert!(
                        unit_states[..last_progress]
                            .iter()
                            .all(|s| *s != NodeState::Locked),
                        "seed {seed}: locked lesson before progress in unit {unit_index}"
                    );
                }
            }
        }
    }
}
