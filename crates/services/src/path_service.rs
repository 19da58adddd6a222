use tracing::{info, warn};

use quest_core::model::{LessonId, PathSnapshot};
use quest_core::{
    CompletionOverlay, InvariantViolation, ProgressionReport, TrailLayout, TrailSettings,
    compute_node_states, compute_path_layouts,
};

/// Latest path snapshot plus the optimistic completion overlay.
///
/// Node states are recomputed whenever either input changes.
#[derive(Debug, Clone)]
pub struct PathService {
    snapshot: PathSnapshot,
    overlay: CompletionOverlay,
    settings: TrailSettings,
    report: ProgressionReport,
}

impl PathService {
    #[must_use]
    pub fn new(snapshot: PathSnapshot, settings: TrailSettings) -> Self {
        let overlay = CompletionOverlay::new();
        let report = compute_node_states(&snapshot, &overlay);
        log_violations(&report.violations);
        Self {
            snapshot,
            overlay,
            settings,
            report,
        }
    }

    /// Replaces the snapshot, dropping overlay entries it now confirms.
    ///
    /// Violations are reported as-is; nodes are never reordered to hide them.
    pub fn apply_snapshot(&mut self, snapshot: PathSnapshot) -> &[InvariantViolation] {
        let pruned = self.overlay.prune(&snapshot);
        self.snapshot = snapshot;
        self.recompute();
        info!(
            subject_id = %self.snapshot.subject_id,
            units = self.snapshot.units.len(),
            pruned,
            pending = self.overlay.len(),
            "path snapshot applied"
        );
        log_violations(&self.report.violations);
        &self.report.violations
    }

    /// Shows `lesson_id` as completed until a snapshot confirms it.
    pub fn mark_completed(&mut self, lesson_id: LessonId) -> bool {
        let added = self.overlay.mark(lesson_id);
        if added {
            self.recompute();
        }
        added
    }

    #[must_use]
    pub fn snapshot(&self) -> &PathSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn overlay(&self) -> &CompletionOverlay {
        &self.overlay
    }

    #[must_use]
    pub fn settings(&self) -> &TrailSettings {
        &self.settings
    }

    #[must_use]
    pub fn node_states(&self) -> &ProgressionReport {
        &self.report
    }

    #[must_use]
    pub fn current_lesson(&self) -> Option<&LessonId> {
        self.report.current_lesson()
    }

    #[must_use]
    pub fn layouts(&self) -> Vec<TrailLayout> {
        compute_path_layouts(&self.snapshot, &self.report, &self.settings)
    }

    /// Top edge of each unit section when units are stacked, for the
    /// active-unit tracker.
    #[must_use]
    pub fn section_tops(&self) -> Vec<f64> {
        self.layouts()
            .iter()
            .scan(0.0, |top, layout| {
                let section_top = *top;
                *top += layout.height;
                Some(section_top)
            })
            .collect()
    }

    fn recompute(&mut self) {
        self.report = compute_node_states(&self.snapshot, &self.overlay);
    }
}

fn log_violations(violations: &[InvariantViolation]) {
    for violation in violations {
        warn!(%violation, "path snapshot breaks progression invariant");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::NodeState;
    use quest_core::model::{
        Difficulty, Lesson, Node, PathPriority, SessionMetadata, SubjectId, Unit, UnitId,
    };

    fn lesson(id: &str, order: u32, unlocked: bool, completed: bool) -> Node {
        Node::lesson(
            order,
            Lesson {
                id: LessonId::new(id),
                order,
                title: format!("Lesson {id}"),
                unlocked,
                completed,
                difficulty: Difficulty::Easy,
                session_metadata: SessionMetadata::default(),
            },
        )
    }

    fn snapshot(nodes: Vec<Node>) -> PathSnapshot {
        PathSnapshot {
            subject_id: SubjectId::new("math"),
            units: vec![Unit {
                id: UnitId::new("u1"),
                order: 0,
                title: "Counting".into(),
                completion_rate: 0.0,
                nodes,
            }],
            streak_days: 0,
            due_reviews_count: 0,
            mastery_average: 1.0,
            path_priority: PathPriority::AdvanceFirst,
        }
    }

    #[test]
    fn marking_moves_current_lesson_forward() {
        let mut path = PathService::new(
            snapshot(vec![
                lesson("l1", 0, true, false),
                lesson("l2", 1, true, false),
            ]),
            TrailSettings::default(),
        );
        assert_eq!(path.current_lesson(), Some(&LessonId::new("l1")));

        assert!(path.mark_completed(LessonId::new("l1")));
        assert!(!path.mark_completed(LessonId::new("l1")));
        assert_eq!(path.current_lesson(), Some(&LessonId::new("l2")));
        assert_eq!(
            path.node_states().lesson_state(&LessonId::new("l1")),
            Some(NodeState::Completed)
        );
    }

    #[test]
    fn confirming_snapshot_prunes_overlay() {
        let mut path = PathService::new(
            snapshot(vec![
                lesson("l1", 0, true, false),
                lesson("l2", 1, false, false),
            ]),
            TrailSettings::default(),
        );
        path.mark_completed(LessonId::new("l1"));
        assert_eq!(path.overlay().len(), 1);

        let violations = path.apply_snapshot(snapshot(vec![
            lesson("l1", 0, true, true),
            lesson("l2", 1, true, false),
        ]));
        assert!(violations.is_empty());
        assert!(path.overlay().is_empty());
        assert_eq!(path.current_lesson(), Some(&LessonId::new("l2")));
    }

    #[test]
    fn section_tops_stack_unit_heights() {
        let path = PathService::new(
            snapshot(vec![
                lesson("l1", 0, true, false),
                lesson("l2", 1, false, false),
            ]),
            TrailSettings::default(),
        );
        let tops = path.section_tops();
        assert_eq!(tops, vec![0.0]);
        assert!(path.layouts()[0].height > 0.0);
    }
}
