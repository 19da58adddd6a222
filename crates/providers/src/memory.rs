use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use quest_core::RewardRules;
use quest_core::model::{
    Answer, EnergyStatus, LessonId, QuestionId, QuestionItem, ResultTag,
    RewardResult, SessionId, SkillId, SubjectId,
};

use crate::content::{AnswerReceipt, AnswerRecord, BatchRequest, ContentProvider, SessionHandle};
use crate::energy::EnergyService;
use crate::error::ProviderError;

/// Collaborator call that can be made to fail once, for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    StartSession,
    FetchBatch,
    FetchRemediation,
    RecordAnswer,
    FinishSession,
    ConsumeEnergy,
    RefillWait,
    RefillCoins,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, ProviderError> {
    mutex
        .lock()
        .map_err(|e| ProviderError::Unavailable(e.to_string()))
}

fn take_failure(
    failures: &mut HashMap<Operation, ProviderError>,
    op: Operation,
) -> Result<(), ProviderError> {
    match failures.remove(&op) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default)]
struct Catalog {
    lessons: HashMap<LessonId, (SubjectId, Vec<QuestionItem>)>,
    remediation: HashMap<SkillId, Vec<QuestionItem>>,
    answer_keys: HashMap<QuestionId, Answer>,
    rules: RewardRules,
}

#[derive(Debug, Default)]
struct ContentState {
    sessions: HashMap<SessionId, SessionEntry>,
    failures: HashMap<Operation, ProviderError>,
    remediation_served: usize,
    batch_calls: usize,
    record_calls: usize,
    finish_calls: usize,
    total_xp: u32,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    streak: u32,
    finished: Option<RewardResult>,
}

/// Scripted content provider backed by in-memory question banks.
///
/// Catalog data is fixed once the provider is built; runtime state (sessions,
/// call counters, injected failures) is shared across clones.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentProvider {
    catalog: Arc<Catalog>,
    state: Arc<Mutex<ContentState>>,
}

impl InMemoryContentProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the questions served for `lesson_id`.
    #[must_use]
    pub fn with_lesson(
        mut self,
        subject_id: SubjectId,
        lesson_id: LessonId,
        questions: Vec<QuestionItem>,
    ) -> Self {
        Arc::make_mut(&mut self.catalog)
            .lessons
            .insert(lesson_id, (subject_id, questions));
        self
    }

    /// Registers easy follow-up questions for a skill.
    #[must_use]
    pub fn with_remediation(mut self, skill_id: SkillId, questions: Vec<QuestionItem>) -> Self {
        Arc::make_mut(&mut self.catalog)
            .remediation
            .insert(skill_id, questions);
        self
    }

    /// Expected answer for questions the provider grades itself.
    #[must_use]
    pub fn with_answer_key(mut self, question_id: QuestionId, answer: Answer) -> Self {
        Arc::make_mut(&mut self.catalog)
            .answer_keys
            .insert(question_id, answer);
        self
    }

    #[must_use]
    pub fn with_reward_rules(mut self, rules: RewardRules) -> Self {
        Arc::make_mut(&mut self.catalog).rules = rules;
        self
    }

    /// Makes the next call of `op` fail with `error`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unavailable` if the state lock is poisoned.
    pub fn fail_next(&self, op: Operation, error: ProviderError) -> Result<(), ProviderError> {
        lock(&self.state)?.failures.insert(op, error);
        Ok(())
    }

    #[must_use]
    pub fn batch_calls(&self) -> usize {
        lock(&self.state).map_or(0, |s| s.batch_calls)
    }

    #[must_use]
    pub fn record_calls(&self) -> usize {
        lock(&self.state).map_or(0, |s| s.record_calls)
    }

    #[must_use]
    pub fn finish_calls(&self) -> usize {
        lock(&self.state).map_or(0, |s| s.finish_calls)
    }

    fn remediation_for(&self, request: &BatchRequest, served: usize) -> Vec<QuestionItem> {
        let bank = request
            .focus_skill_id
            .as_ref()
            .and_then(|skill| self.catalog.remediation.get(skill))
            .filter(|bank| !bank.is_empty())
            .or_else(|| {
                self.catalog
                    .lessons
                    .get(&request.lesson_id)
                    .map(|(_, questions)| questions)
                    .filter(|questions| !questions.is_empty())
            });
        let Some(bank) = bank else {
            return Vec::new();
        };

        let count = usize::try_from(request.count).unwrap_or(usize::MAX);
        (0..count.min(bank.len()))
            .map(|i| {
                let mut item = bank[(served + i) % bank.len()].clone();
                item.question_id = QuestionId::new(format!("{}~r{}", item.question_id, served + i));
                if let Some(difficulty) = request.force_difficulty {
                    item.metadata.difficulty = difficulty;
                }
                if item.metadata.skill_id.is_none() {
                    item.metadata.skill_id = request.focus_skill_id.clone();
                }
                item
            })
            .collect()
    }
}

#[async_trait]
impl ContentProvider for InMemoryContentProvider {
    async fn start_session(&self, lesson_id: &LessonId) -> Result<SessionHandle, ProviderError> {
        let mut state = lock(&self.state)?;
        take_failure(&mut state.failures, Operation::StartSession)?;

        let (subject_id, _) = self
            .catalog
            .lessons
            .get(lesson_id)
            .ok_or(ProviderError::NotFound)?;
        let session_id = SessionId::new(Uuid::new_v4().to_string());
        state.sessions.insert(
            session_id.clone(),
            SessionEntry {
                streak: 0,
                finished: None,
            },
        );

        Ok(SessionHandle {
            session_id,
            subject_id: subject_id.clone(),
        })
    }

    async fn fetch_question_batch(
        &self,
        request: &BatchRequest,
    ) -> Result<Vec<QuestionItem>, ProviderError> {
        let mut state = lock(&self.state)?;
        state.batch_calls += 1;

        if request.force_difficulty.is_some() {
            take_failure(&mut state.failures, Operation::FetchRemediation)?;
            let served = state.remediation_served;
            let items = self.remediation_for(request, served);
            state.remediation_served += items.len();
            return Ok(items);
        }

        take_failure(&mut state.failures, Operation::FetchBatch)?;
        let (subject_id, questions) = self
            .catalog
            .lessons
            .get(&request.lesson_id)
            .ok_or(ProviderError::NotFound)?;
        if subject_id != &request.subject_id {
            return Err(ProviderError::Rejected(format!(
                "lesson {} does not belong to subject {}",
                request.lesson_id, request.subject_id
            )));
        }

        let count = usize::try_from(request.count).unwrap_or(usize::MAX);
        Ok(questions.iter().take(count).cloned().collect())
    }

    async fn record_answer(&self, record: &AnswerRecord) -> Result<AnswerReceipt, ProviderError> {
        let mut state = lock(&self.state)?;
        state.record_calls += 1;
        take_failure(&mut state.failures, Operation::RecordAnswer)?;

        let verdict = match record.result {
            ResultTag::Ungraded => Some(
                self.catalog
                    .answer_keys
                    .get(&record.question.question_id)
                    .is_some_and(|expected| expected == &record.answer),
            ),
            ResultTag::Correct => Some(true),
            ResultTag::Incorrect | ResultTag::Skipped => Some(false),
        };

        let skill_id = self
            .catalog
            .lessons
            .values()
            .flat_map(|(_, questions)| questions.iter())
            .chain(self.catalog.remediation.values().flatten())
            .find(|item| {
                item.question_id == record.question.question_id
                    || record
                        .question
                        .question_id
                        .as_str()
                        .starts_with(&format!("{}~", item.question_id))
            })
            .and_then(|item| item.metadata.skill_id.clone());

        let session = state
            .sessions
            .get_mut(&record.question.session_id)
            .ok_or(ProviderError::NotFound)?;
        session.streak = if verdict == Some(true) {
            session.streak + 1
        } else {
            0
        };

        Ok(AnswerReceipt {
            skill_id,
            streak_correct: session.streak,
            correct: if record.result == ResultTag::Ungraded {
                verdict
            } else {
                None
            },
        })
    }

    async fn finish_session(
        &self,
        session_id: &SessionId,
        total_questions: u32,
        correct_count: u32,
    ) -> Result<RewardResult, ProviderError> {
        let mut state = lock(&self.state)?;
        state.finish_calls += 1;
        take_failure(&mut state.failures, Operation::FinishSession)?;

        let prior_xp = state.total_xp;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or(ProviderError::NotFound)?;
        if let Some(reward) = &session.finished {
            return Ok(reward.clone());
        }

        let reward = self
            .catalog
            .rules
            .estimate(total_questions, correct_count, prior_xp);
        session.finished = Some(reward.clone());
        state.total_xp = prior_xp.saturating_add(reward.xp_earned());
        Ok(reward)
    }
}

//
// ─── ENERGY ────────────────────────────────────────────────────────────────────
//

#[derive(Debug)]
struct EnergyState {
    status: EnergyStatus,
    coins: u32,
    failures: HashMap<Operation, ProviderError>,
    consume_calls: usize,
}

/// In-memory energy tank with a wait timer and a coin balance.
#[derive(Debug, Clone)]
pub struct InMemoryEnergy {
    wrong_answer_cost: i32,
    refill_wait_secs: u32,
    refill_coin_cost: u32,
    state: Arc<Mutex<EnergyState>>,
}

impl InMemoryEnergy {
    /// A full tank of `max` with a one-point wrong-answer cost.
    #[must_use]
    pub fn new(max: i32) -> Self {
        Self {
            wrong_answer_cost: 1,
            refill_wait_secs: 300,
            refill_coin_cost: 50,
            state: Arc::new(Mutex::new(EnergyState {
                status: EnergyStatus::full(max),
                coins: 0,
                failures: HashMap::new(),
                consume_calls: 0,
            })),
        }
    }

    #[must_use]
    pub fn with_wrong_answer_cost(mut self, cost: i32) -> Self {
        self.wrong_answer_cost = cost;
        self
    }

    #[must_use]
    pub fn with_refill(mut self, wait_secs: u32, coin_cost: u32) -> Self {
        self.refill_wait_secs = wait_secs;
        self.refill_coin_cost = coin_cost;
        self
    }

    /// Sets the starting value and coin balance.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unavailable` if the state lock is poisoned.
    pub fn set_balance(&self, value: i32, coins: u32) -> Result<(), ProviderError> {
        let mut state = lock(&self.state)?;
        state.status.value = value;
        state.status.seconds_until_playable = if value <= 0 { self.refill_wait_secs } else { 0 };
        state.coins = coins;
        Ok(())
    }

    /// Lets `secs` of the wait timer run out.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unavailable` if the state lock is poisoned.
    pub fn elapse(&self, secs: u32) -> Result<(), ProviderError> {
        let mut state = lock(&self.state)?;
        state.status.seconds_until_playable = state.status.seconds_until_playable.saturating_sub(secs);
        Ok(())
    }

    /// Makes the next call of `op` fail with `error`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unavailable` if the state lock is poisoned.
    pub fn fail_next(&self, op: Operation, error: ProviderError) -> Result<(), ProviderError> {
        lock(&self.state)?.failures.insert(op, error);
        Ok(())
    }

    #[must_use]
    pub fn coins(&self) -> u32 {
        lock(&self.state).map_or(0, |s| s.coins)
    }

    #[must_use]
    pub fn consume_calls(&self) -> usize {
        lock(&self.state).map_or(0, |s| s.consume_calls)
    }
}

#[async_trait]
impl EnergyService for InMemoryEnergy {
    async fn get_status(&self) -> Result<EnergyStatus, ProviderError> {
        Ok(lock(&self.state)?.status)
    }

    async fn consume_wrong_answer(&self) -> Result<EnergyStatus, ProviderError> {
        let mut state = lock(&self.state)?;
        state.consume_calls += 1;
        take_failure(&mut state.failures, Operation::ConsumeEnergy)?;

        state.status.value = (state.status.value - self.wrong_answer_cost).max(0);
        if state.status.is_exhausted() {
            state.status.seconds_until_playable = self.refill_wait_secs;
        }
        Ok(state.status)
    }

    async fn refill_with_wait(&self) -> Result<EnergyStatus, ProviderError> {
        let mut state = lock(&self.state)?;
        take_failure(&mut state.failures, Operation::RefillWait)?;

        if state.status.seconds_until_playable > 0 {
            return Err(ProviderError::Rejected(format!(
                "wait {}s before refilling",
                state.status.seconds_until_playable
            )));
        }
        state.status = EnergyStatus::full(state.status.max);
        Ok(state.status)
    }

    async fn refill_with_coins(&self) -> Result<EnergyStatus, ProviderError> {
        let mut state = lock(&self.state)?;
        take_failure(&mut state.failures, Operation::RefillCoins)?;

        if state.coins < self.refill_coin_cost {
            return Err(ProviderError::Rejected(format!(
                "refill costs {} coins, balance is {}",
                self.refill_coin_cost, state.coins
            )));
        }
        state.coins -= self.refill_coin_cost;
        state.status = EnergyStatus::full(state.status.max);
        Ok(state.status)
    }
}
