use std::collections::HashSet;

use crate::model::{Lesson, LessonId, PathSnapshot};

/// Lessons the client has finished but the server has not yet reflected.
///
/// A successful session finish marks its lesson here straight away; the entry
/// is dropped by [`CompletionOverlay::prune`] as soon as a fresh snapshot
/// reports the lesson as completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionOverlay {
    pending: HashSet<LessonId>,
}

impl CompletionOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Optimistically marks a lesson as completed. Returns `false` if it was
    /// already marked.
    pub fn mark(&mut self, lesson_id: LessonId) -> bool {
        self.pending.insert(lesson_id)
    }

    #[must_use]
    pub fn contains(&self, lesson_id: &LessonId) -> bool {
        self.pending.contains(lesson_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// `lesson.completed` or optimistically completed.
    #[must_use]
    pub fn effective_completed(&self, lesson: &Lesson) -> bool {
        lesson.completed || self.contains(&lesson.id)
    }

    /// Drops every entry `snapshot` confirms as completed server-side and
    /// returns how many were removed.
    pub fn prune(&mut self, snapshot: &PathSnapshot) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|id| !snapshot.lesson(id).is_some_and(|lesson| lesson.completed));
        before - self.pending.len()
    }
}
