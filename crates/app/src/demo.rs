//! Built-in path and question bank so the binary runs without any input.

use providers::InMemoryContentProvider;
use quest_core::model::{
    ChoiceOption, Difficulty, Event, EventId, EventKind, EventStatus, Lesson, LessonId, Node,
    PathPriority, PathSnapshot, QuestionId, QuestionItem, QuestionMetadata, QuestionType,
    SessionMetadata, SkillId, SubjectId, Unit, UnitId,
};

const QUESTIONS_PER_LESSON: u32 = 5;

fn lesson(id: &str, order: u32, title: &str, unlocked: bool, completed: bool) -> Node {
    Node::lesson(
        order,
        Lesson {
            id: LessonId::new(id),
            order,
            title: title.to_string(),
            unlocked,
            completed,
            difficulty: Difficulty::Easy,
            session_metadata: SessionMetadata {
                question_count: QUESTIONS_PER_LESSON,
                estimated_minutes: 3,
            },
        },
    )
}

pub fn snapshot() -> PathSnapshot {
    PathSnapshot {
        subject_id: SubjectId::new("math"),
        units: vec![
            Unit {
                id: UnitId::new("counting"),
                order: 0,
                title: "Counting to 20".into(),
                completion_rate: 0.4,
                nodes: vec![
                    lesson("count-1", 0, "Count to 5", true, true),
                    lesson("count-2", 1, "Count to 10", true, true),
                    Node::event(
                        2,
                        Event {
                            id: EventId::new("chest-1"),
                            kind: EventKind::Chest,
                            status: EventStatus::Completed,
                        },
                    ),
                    lesson("count-3", 3, "Skip counting", true, false),
                    lesson("count-4", 4, "Count backwards", false, false),
                    lesson("count-5", 5, "Counting review", false, false),
                ],
            },
            Unit {
                id: UnitId::new("adding"),
                order: 1,
                title: "Adding small numbers".into(),
                completion_rate: 0.0,
                nodes: vec![
                    lesson("add-1", 0, "Plus one", false, false),
                    lesson("add-2", 1, "Make ten", false, false),
                    Node::event(
                        2,
                        Event {
                            id: EventId::new("boss-1"),
                            kind: EventKind::MiniBoss,
                            status: EventStatus::Locked,
                        },
                    ),
                    lesson("add-3", 3, "Doubles", false, false),
                ],
            },
        ],
        streak_days: 4,
        due_reviews_count: 2,
        mastery_average: 0.72,
        path_priority: PathPriority::AdvanceFirst,
    }
}

fn addition(id: String, skill: &SkillId, a: u32, b: u32) -> QuestionItem {
    let sum = a + b;
    QuestionItem {
        question_id: QuestionId::new(id),
        template_id: "tpl-add".into(),
        variant_id: format!("{a}+{b}"),
        question_type: QuestionType::Select,
        metadata: QuestionMetadata {
            prompt: format!("What is {a} + {b}?"),
            options: vec![
                ChoiceOption { id: "right".into(), label: sum.to_string() },
                ChoiceOption { id: "wrong".into(), label: (sum + 1).to_string() },
            ],
            correct_option_id: Some("right".into()),
            skill_id: Some(skill.clone()),
            ..QuestionMetadata::default()
        },
        explanation: Some(format!("Start at {a} and count {b} more: {sum}.")),
    }
}

/// Question banks for every lesson on `snapshot`, with one easy
/// remediation bank per unit.
pub fn provider(snapshot: &PathSnapshot) -> InMemoryContentProvider {
    let mut provider = InMemoryContentProvider::new();
    for unit in snapshot.ordered_units() {
        let skill = SkillId::new(unit.id.as_str());
        for (n, lesson) in unit.ordered_lessons().into_iter().enumerate() {
            let base = u32::try_from(n).unwrap_or(0) + 1;
            let questions = (0..QUESTIONS_PER_LESSON)
                .map(|i| addition(format!("{}-q{i}", lesson.id), &skill, base + i, i + 1))
                .collect();
            provider = provider.with_lesson(
                snapshot.subject_id.clone(),
                lesson.id.clone(),
                questions,
            );
        }
        let easy = (1..=3)
            .map(|i| addition(format!("{}-easy{i}", unit.id), &skill, i, 1))
            .collect();
        provider = provider.with_remediation(skill, easy);
    }
    provider
}
