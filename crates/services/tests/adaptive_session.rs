use std::sync::Arc;

use async_trait::async_trait;

use providers::{
    EnergyService, InMemoryContentProvider, InMemoryEnergy, Operation, ProviderError,
};
use quest_core::TrailSettings;
use quest_core::model::{
    Answer, ChoiceOption, Difficulty, EnergyStatus, Lesson, LessonId, Node, PathPriority,
    PathSnapshot, QuestionId, QuestionItem, QuestionMetadata, QuestionType, SessionMetadata,
    SkillId, SubjectId, Unit, UnitId,
};
use quest_core::time::fixed_now;
use services::{
    Advance, Clock, EngineConfig, PathService, RefillOutcome, Rejection, SessionError,
    SessionLoopService, SessionPhase, SubmitOutcome, SubmitReport,
};

//
// ─── FIXTURES ──────────────────────────────────────────────────────────────────
//

fn select(id: &str, skill: &str) -> QuestionItem {
    QuestionItem {
        question_id: QuestionId::new(id),
        template_id: format!("tpl-{skill}"),
        variant_id: "v1".into(),
        question_type: QuestionType::Select,
        metadata: QuestionMetadata {
            prompt: format!("Pick the right answer ({id})"),
            options: vec![
                ChoiceOption { id: "a".into(), label: "right".into() },
                ChoiceOption { id: "b".into(), label: "wrong".into() },
            ],
            correct_option_id: Some("a".into()),
            skill_id: Some(SkillId::new(skill)),
            ..QuestionMetadata::default()
        },
        explanation: Some("The right answer is always a.".into()),
    }
}

fn right() -> Answer {
    Answer::Select { option_id: "a".into() }
}

fn wrong() -> Answer {
    Answer::Select { option_id: "b".into() }
}

fn bank(questions: &[&str]) -> InMemoryContentProvider {
    InMemoryContentProvider::new()
        .with_lesson(
            SubjectId::new("math"),
            LessonId::new("l1"),
            questions.iter().map(|id| select(id, "adding")).collect(),
        )
        .with_remediation(
            SkillId::new("adding"),
            vec![select("easy-1", "adding"), select("easy-2", "adding")],
        )
}

fn service(
    content: &InMemoryContentProvider,
    energy: Arc<dyn EnergyService>,
) -> SessionLoopService {
    SessionLoopService::new(Clock::fixed(fixed_now()), Arc::new(content.clone()), energy)
}

fn recorded(outcome: SubmitOutcome) -> SubmitReport {
    match outcome {
        SubmitOutcome::Recorded(report) => report,
        SubmitOutcome::Rejected(rejection) => panic!("submit rejected: {rejection}"),
    }
}

fn queue_ids(session: &services::AdaptiveSession) -> Vec<String> {
    session
        .queue()
        .iter()
        .map(|entry| entry.item.question_id.as_str().to_string())
        .collect()
}

struct BrokenEnergy;

#[async_trait]
impl EnergyService for BrokenEnergy {
    async fn get_status(&self) -> Result<EnergyStatus, ProviderError> {
        Ok(EnergyStatus::full(5))
    }

    async fn consume_wrong_answer(&self) -> Result<EnergyStatus, ProviderError> {
        Err(ProviderError::Timeout)
    }

    async fn refill_with_wait(&self) -> Result<EnergyStatus, ProviderError> {
        Err(ProviderError::Timeout)
    }

    async fn refill_with_coins(&self) -> Result<EnergyStatus, ProviderError> {
        Err(ProviderError::Timeout)
    }
}

//
// ─── LIFECYCLE ─────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn wrong_answer_serves_remediation_next() {
    let content = bank(&["q1", "q2"]);
    let svc = service(&content, Arc::new(InMemoryEnergy::new(5)));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();

    let report = recorded(svc.submit(&mut session, wrong()).await.unwrap());
    assert!(!report.graded.correct);
    assert_eq!(report.energy.value, 4);
    assert!(report.follow_up_errors.is_empty());
    let remediation = report.remediation.unwrap();

    assert_eq!(queue_ids(&session)[0], "q1");
    assert_eq!(session.queue()[1].item.question_id, remediation);
    assert_eq!(session.queue()[1].item.metadata.difficulty, Difficulty::Easy);
    assert_eq!(queue_ids(&session)[2], "q2");

    assert_eq!(svc.advance(&mut session), Ok(Advance::Moved { cursor: 1 }));
    assert!(session.current_entry().unwrap().is_remediation());
}

#[tokio::test]
async fn queue_never_exceeds_twice_the_batch() {
    let content = bank(&["q1", "q2", "q3", "q4"]);
    let svc = service(&content, Arc::new(InMemoryEnergy::new(100)));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();

    loop {
        recorded(svc.submit(&mut session, wrong()).await.unwrap());
        if svc.advance(&mut session).unwrap() == Advance::Finishing {
            break;
        }
    }

    assert_eq!(session.queue().len(), 8);
    assert_eq!(session.answered_count(), 8);
    let remediations = session
        .queue()
        .iter()
        .filter(|entry| entry.is_remediation())
        .count();
    assert_eq!(remediations, 4);
}

#[tokio::test]
async fn disabled_remediation_keeps_queue_fixed() {
    let content = bank(&["q1", "q2"]);
    let svc = service(&content, Arc::new(InMemoryEnergy::new(5)))
        .with_config(EngineConfig::default().with_remediation(false));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();

    let report = recorded(svc.submit(&mut session, wrong()).await.unwrap());
    assert!(report.remediation.is_none());
    assert_eq!(queue_ids(&session), ["q1", "q2"]);
}

#[tokio::test]
async fn batch_size_caps_first_fetch() {
    let content = bank(&["q1", "q2", "q3", "q4"]);
    let svc = service(&content, Arc::new(InMemoryEnergy::new(5)))
        .with_config(EngineConfig::default().with_batch_size(2));
    let session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();
    assert_eq!(queue_ids(&session), ["q1", "q2"]);
}

#[tokio::test]
async fn duplicate_submit_is_a_no_op() {
    let content = bank(&["q1", "q2"]);
    let svc = service(&content, Arc::new(InMemoryEnergy::new(5)));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();

    recorded(svc.submit(&mut session, right()).await.unwrap());
    let again = svc.submit(&mut session, right()).await.unwrap();
    assert_eq!(again, SubmitOutcome::Rejected(Rejection::AlreadyRecorded));
    assert_eq!(content.record_calls(), 1);
}

//
// ─── ENERGY ────────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn empty_energy_gates_until_refill() {
    let content = bank(&["q1", "q2"]);
    let energy = InMemoryEnergy::new(1).with_refill(30, 50);
    let svc = service(&content, Arc::new(energy.clone()));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();

    let report = recorded(svc.submit(&mut session, wrong()).await.unwrap());
    assert!(report.energy.is_exhausted());

    assert_eq!(
        svc.advance(&mut session),
        Err(Rejection::EnergyExhausted)
    );
    assert_eq!(session.cursor(), 0);

    let too_early = svc.refill_with_wait(&mut session).await;
    assert!(matches!(
        too_early,
        Err(SessionError::Provider(ProviderError::Rejected(_)))
    ));
    assert!(!session.refill_in_flight());

    energy.elapse(30).unwrap();
    let refilled = svc.refill_with_wait(&mut session).await.unwrap();
    assert_eq!(refilled, RefillOutcome::Refilled(EnergyStatus::full(1)));
    assert_eq!(svc.advance(&mut session), Ok(Advance::Moved { cursor: 1 }));
}

#[tokio::test]
async fn coin_refill_unblocks_submit() {
    let content = bank(&["q1", "q2"]);
    let energy = InMemoryEnergy::new(3).with_refill(300, 20);
    energy.set_balance(0, 25).unwrap();
    let svc = service(&content, Arc::new(energy.clone()));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();

    assert_eq!(
        svc.submit(&mut session, right()).await.unwrap(),
        SubmitOutcome::Rejected(Rejection::EnergyExhausted)
    );
    assert_eq!(content.record_calls(), 0);

    svc.refill_with_coins(&mut session).await.unwrap();
    assert_eq!(energy.coins(), 5);
    recorded(svc.submit(&mut session, right()).await.unwrap());
}

#[tokio::test]
async fn energy_failure_is_not_fatal() {
    let content = bank(&["q1", "q2"]);
    let svc = service(&content, Arc::new(BrokenEnergy));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();

    let report = recorded(svc.submit(&mut session, wrong()).await.unwrap());
    assert_eq!(report.follow_up_errors, vec![ProviderError::Timeout]);
    assert_eq!(report.energy, EnergyStatus::full(5));
    assert!(report.remediation.is_some());
    assert!(session.is_recorded(0));
    assert_eq!(session.phase(), SessionPhase::Active);
}

//
// ─── FAILURES ──────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn start_failures_are_terminal() {
    let content = bank(&["q1"]);
    content
        .fail_next(Operation::FetchBatch, ProviderError::Timeout)
        .unwrap();
    let svc = service(&content, Arc::new(InMemoryEnergy::new(5)));

    let err = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Provider(ProviderError::Timeout)));

    let empty = bank(&[]);
    let svc = service(&empty, Arc::new(InMemoryEnergy::new(5)));
    let err = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Empty));
}

#[tokio::test]
async fn failed_record_leaves_question_open() {
    let content = bank(&["q1", "q2"]);
    let svc = service(&content, Arc::new(InMemoryEnergy::new(5)));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();
    content
        .fail_next(
            Operation::RecordAnswer,
            ProviderError::Unavailable("offline".into()),
        )
        .unwrap();

    let err = svc.submit(&mut session, wrong()).await.unwrap_err();
    assert!(matches!(err, SessionError::Provider(ProviderError::Unavailable(_))));
    assert!(!session.is_recorded(0));
    assert_eq!(session.queue().len(), 2);

    let report = recorded(svc.submit(&mut session, right()).await.unwrap());
    assert!(report.graded.correct);
    assert_eq!(content.record_calls(), 2);
}

#[tokio::test]
async fn remediation_failure_keeps_the_answer() {
    let content = bank(&["q1", "q2"]);
    content
        .fail_next(Operation::FetchRemediation, ProviderError::Timeout)
        .unwrap();
    let svc = service(&content, Arc::new(InMemoryEnergy::new(5)));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();

    let report = recorded(svc.submit(&mut session, wrong()).await.unwrap());
    assert_eq!(report.follow_up_errors, vec![ProviderError::Timeout]);
    assert!(report.remediation.is_none());
    assert_eq!(queue_ids(&session), ["q1", "q2"]);
    assert!(session.is_recorded(0));
}

//
// ─── FINISH ────────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn finish_calls_provider_once() {
    let content = bank(&["q1", "q2"]);
    let svc = service(&content, Arc::new(InMemoryEnergy::new(5)));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();

    recorded(svc.submit(&mut session, right()).await.unwrap());
    let first = svc.finish(&mut session).await.unwrap();
    let second = svc.finish(&mut session).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(content.finish_calls(), 1);
    assert_eq!(session.phase(), SessionPhase::Finished);
    assert_eq!(
        svc.submit(&mut session, right()).await.unwrap(),
        SubmitOutcome::Rejected(Rejection::NotActive)
    );
}

#[tokio::test]
async fn failed_finish_can_be_retried() {
    let content = bank(&["q1"]);
    let svc = service(&content, Arc::new(InMemoryEnergy::new(5)));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();
    recorded(svc.submit(&mut session, right()).await.unwrap());
    svc.advance(&mut session).unwrap();
    content
        .fail_next(Operation::FinishSession, ProviderError::Timeout)
        .unwrap();

    assert!(svc.finish(&mut session).await.is_err());
    assert_eq!(session.phase(), SessionPhase::Finishing);

    let reward = svc.finish(&mut session).await.unwrap();
    assert_eq!(reward.stars(), 3);
    assert_eq!(content.finish_calls(), 2);
}

#[tokio::test]
async fn finish_and_mark_advances_the_trail() {
    let lesson = |id: &str, order: u32, unlocked: bool| {
        Node::lesson(
            order,
            Lesson {
                id: LessonId::new(id),
                order,
                title: id.to_uppercase(),
                unlocked,
                completed: false,
                difficulty: Difficulty::Easy,
                session_metadata: SessionMetadata::default(),
            },
        )
    };
    let snapshot = PathSnapshot {
        subject_id: SubjectId::new("math"),
        units: vec![Unit {
            id: UnitId::new("u1"),
            order: 0,
            title: "Adding".into(),
            completion_rate: 0.0,
            nodes: vec![lesson("l1", 0, true), lesson("l2", 1, true)],
        }],
        streak_days: 2,
        due_reviews_count: 0,
        mastery_average: 0.8,
        path_priority: PathPriority::AdvanceFirst,
    };
    let mut path = PathService::new(snapshot, TrailSettings::default());
    assert_eq!(path.current_lesson(), Some(&LessonId::new("l1")));

    let content = bank(&["q1"]);
    let svc = service(&content, Arc::new(InMemoryEnergy::new(5)));
    let mut session = svc
        .start_session(&SubjectId::new("math"), &LessonId::new("l1"))
        .await
        .unwrap();
    recorded(svc.submit(&mut session, right()).await.unwrap());
    svc.finish_and_mark(&mut session, &mut path).await.unwrap();

    assert_eq!(path.current_lesson(), Some(&LessonId::new("l2")));
}
