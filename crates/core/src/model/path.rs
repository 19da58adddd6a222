use serde::{Deserialize, Serialize};

use crate::model::ids::{EventId, LessonId, SubjectId, UnitId};
use crate::model::question::Difficulty;

//
// ─── LESSONS ───────────────────────────────────────────────────────────────────
//

/// Provider hints about the session a lesson opens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionMetadata {
    pub question_count: u32,
    pub estimated_minutes: u32,
}

/// A playable lesson on the trail.
///
/// `unlocked` never flips back to `false` over the lifetime of a path and
/// `completed` only grows within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub order: u32,
    pub title: String,
    pub unlocked: bool,
    pub completed: bool,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub session_metadata: SessionMetadata,
}

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Chest,
    Checkpoint,
    MiniBoss,
    Boost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Locked,
    Available,
    Completed,
}

/// A non-lesson stop on the trail (reward chest, boss, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub status: EventStatus,
}

//
// ─── NODES ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    Lesson(Lesson),
    Event(Event),
}

/// A trail position. `order_index` fixes where it sits inside its unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub order_index: u32,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Stable reference to a node regardless of its variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum NodeRef {
    Lesson(LessonId),
    Event(EventId),
}

impl Node {
    #[must_use]
    pub fn lesson(order_index: u32, lesson: Lesson) -> Self {
        Self {
            order_index,
            kind: NodeKind::Lesson(lesson),
        }
    }

    #[must_use]
    pub fn event(order_index: u32, event: Event) -> Self {
        Self {
            order_index,
            kind: NodeKind::Event(event),
        }
    }

    #[must_use]
    pub fn node_ref(&self) -> NodeRef {
        match &self.kind {
            NodeKind::Lesson(lesson) => NodeRef::Lesson(lesson.id.clone()),
            NodeKind::Event(event) => NodeRef::Event(event.id.clone()),
        }
    }

    #[must_use]
    pub fn as_lesson(&self) -> Option<&Lesson> {
        match &self.kind {
            NodeKind::Lesson(lesson) => Some(lesson),
            NodeKind::Event(_) => None,
        }
    }
}

//
// ─── UNITS ─────────────────────────────────────────────────────────────────────
//

/// One curriculum chapter: an ordered group of lessons and events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub order: u32,
    pub title: String,
    #[serde(default)]
    pub completion_rate: f64,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Unit {
    /// Nodes in traversal order (stable on equal `order_index`).
    #[must_use]
    pub fn ordered_nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.iter().collect();
        nodes.sort_by_key(|node| node.order_index);
        nodes
    }

    /// Lessons in traversal order, skipping events.
    #[must_use]
    pub fn ordered_lessons(&self) -> Vec<&Lesson> {
        self.ordered_nodes()
            .into_iter()
            .filter_map(Node::as_lesson)
            .collect()
    }

    /// Completion rate clamped into `[0, 1]`.
    #[must_use]
    pub fn completion_rate(&self) -> f64 {
        if self.completion_rate.is_finite() {
            self.completion_rate.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// What the path should favour next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathPriority {
    ReviewFirst,
    #[default]
    AdvanceFirst,
    Recovery,
}

/// Point-in-time view of a learner's path for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSnapshot {
    pub subject_id: SubjectId,
    pub units: Vec<Unit>,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub due_reviews_count: u32,
    #[serde(default = "default_mastery")]
    pub mastery_average: f64,
    #[serde(default)]
    pub path_priority: PathPriority,
}

fn default_mastery() -> f64 {
    1.0
}

impl PathSnapshot {
    /// Units in traversal order (stable on equal `order`).
    #[must_use]
    pub fn ordered_units(&self) -> Vec<&Unit> {
        let mut units: Vec<&Unit> = self.units.iter().collect();
        units.sort_by_key(|unit| unit.order);
        units
    }

    /// Looks up a lesson anywhere on the path.
    #[must_use]
    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.units
            .iter()
            .flat_map(|unit| unit.nodes.iter())
            .filter_map(Node::as_lesson)
            .find(|lesson| &lesson.id == id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
