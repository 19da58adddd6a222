use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use providers::{AnswerReceipt, AnswerRecord, BatchRequest, SessionHandle};
use quest_core::model::{
    Answer, EnergyStatus, LessonId, QuestionId, QuestionItem, ResultTag, RewardResult, SessionId,
    SubjectId,
};
use quest_core::{CooldownGuard, Tone};

use super::evaluate::evaluate;
use super::feedback::FeedbackMessage;
use super::progress::{SessionPhase, SessionProgress};
use crate::config::EngineConfig;
use crate::error::SessionError;

//
// ─── QUEUE ─────────────────────────────────────────────────────────────────────
//

/// Identity of one queue slot, unique within a session.
///
/// Question ids can repeat across slots (a follow-up may reuse the id of a
/// later question), so submits and splices address slots by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EntryKey(u64);

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Original,
    /// Easy follow-up spliced in after a wrong answer to the `anchor` slot.
    Remediation { anchor: EntryKey },
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub key: EntryKey,
    pub item: QuestionItem,
    pub kind: EntryKind,
}

impl QueueEntry {
    #[must_use]
    pub fn is_remediation(&self) -> bool {
        matches!(self.kind, EntryKind::Remediation { .. })
    }
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Why a session call was ignored. Rejections are no-ops, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("session is not active")]
    NotActive,
    #[error("this question already has an answer")]
    AlreadyRecorded,
    #[error("an answer for this question is already being recorded")]
    InFlight,
    #[error("out of energy")]
    EnergyExhausted,
    #[error("a refill is already in flight")]
    RefillInFlight,
}

/// A submit accepted locally and waiting for the provider to record it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmit {
    key: EntryKey,
    question_id: QuestionId,
    local: ResultTag,
    record: AnswerRecord,
}

impl PendingSubmit {
    #[must_use]
    pub fn record(&self) -> &AnswerRecord {
        &self.record
    }

    #[must_use]
    pub fn key(&self) -> EntryKey {
        self.key
    }

    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    /// Local grading result; `Ungraded` waits for the provider's verdict.
    #[must_use]
    pub fn local_result(&self) -> ResultTag {
        self.local
    }
}

/// Follow-up question to fetch after a wrong answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationRequest {
    pub anchor: EntryKey,
    pub request: BatchRequest,
}

/// A recorded answer and what the host should do next.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub cursor: usize,
    pub result: ResultTag,
    pub correct: bool,
    pub streak_correct: u32,
    pub feedback: FeedbackMessage,
    pub remediation: Option<RemediationRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved { cursor: usize },
    /// The last question was passed; the session waits for Finish.
    Finishing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinishStep {
    /// Already finished; the reward is served from cache.
    Cached(RewardResult),
    /// Totals to report to the provider.
    Report { answered: u32, correct: u32 },
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State machine for one lesson attempt.
///
/// Holds the question queue and per-step bookkeeping. Calls that talk to
/// collaborators are split into a `begin_*` step that guards and marks the
/// work in flight and a `complete_*` step that applies the collaborator's
/// answer, so a host can keep navigating while a call is pending.
pub struct AdaptiveSession {
    session_id: SessionId,
    subject_id: SubjectId,
    lesson_id: LessonId,
    phase: SessionPhase,
    queue: Vec<QueueEntry>,
    next_key: u64,
    cursor: usize,
    answered_by_step: Vec<bool>,
    correct_by_step: Vec<bool>,
    in_flight: HashSet<EntryKey>,
    refill_in_flight: bool,
    energy: EnergyStatus,
    streak_correct: u32,
    celebration: CooldownGuard,
    streak_celebration_every: u32,
    microcopy_max_chars: usize,
    remediation_enabled: bool,
    seed: String,
    started_at: DateTime<Utc>,
    question_started_at: DateTime<Utc>,
    reward: Option<RewardResult>,
}

impl AdaptiveSession {
    /// A session that has a provider handle but no questions yet.
    #[must_use]
    pub fn bootstrapping(
        handle: SessionHandle,
        lesson_id: LessonId,
        started_at: DateTime<Utc>,
        config: &EngineConfig,
    ) -> Self {
        let seed = format!("{:016x}", rand::rng().random::<u64>());
        Self {
            session_id: handle.session_id,
            subject_id: handle.subject_id,
            lesson_id,
            phase: SessionPhase::Bootstrapping,
            queue: Vec::new(),
            next_key: 0,
            cursor: 0,
            answered_by_step: Vec::new(),
            correct_by_step: Vec::new(),
            in_flight: HashSet::new(),
            refill_in_flight: false,
            energy: EnergyStatus::new(0, 0, 0),
            streak_correct: 0,
            celebration: CooldownGuard::new(Duration::seconds(i64::from(
                config.celebration_cooldown_secs,
            ))),
            streak_celebration_every: config.streak_celebration_every,
            microcopy_max_chars: config.microcopy_max_chars,
            remediation_enabled: config.remediation_enabled,
            seed,
            started_at,
            question_started_at: started_at,
            reward: None,
        }
    }

    /// Fixes the feedback seed so microcopy is reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    /// Loads the first batch and the energy reading; enters `Active` at cursor 0.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `items` is empty and
    /// `SessionError::NotStarted` if the session is past bootstrapping.
    pub fn activate(
        &mut self,
        items: Vec<QuestionItem>,
        energy: EnergyStatus,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Bootstrapping {
            return Err(SessionError::NotStarted);
        }
        if items.is_empty() {
            return Err(SessionError::Empty);
        }

        let len = items.len();
        self.queue = Vec::with_capacity(len);
        for item in items {
            let key = self.allocate_key();
            self.queue.push(QueueEntry {
                key,
                item,
                kind: EntryKind::Original,
            });
        }
        self.answered_by_step = vec![false; len];
        self.correct_by_step = vec![false; len];
        self.cursor = 0;
        self.energy = energy;
        self.question_started_at = now;
        self.phase = SessionPhase::Active;
        Ok(())
    }

    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn queue(&self) -> &[QueueEntry] {
        &self.queue
    }

    #[must_use]
    pub fn current_entry(&self) -> Option<&QueueEntry> {
        match self.phase {
            SessionPhase::Active => self.queue.get(self.cursor),
            _ => None,
        }
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&QuestionItem> {
        self.current_entry().map(|entry| &entry.item)
    }

    #[must_use]
    pub fn energy(&self) -> EnergyStatus {
        self.energy
    }

    #[must_use]
    pub fn streak_correct(&self) -> u32 {
        self.streak_correct
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn reward(&self) -> Option<&RewardResult> {
        self.reward.as_ref()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == SessionPhase::Finished
    }

    #[must_use]
    pub fn is_recorded(&self, step: usize) -> bool {
        self.answered_by_step.get(step).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answered_by_step.iter().filter(|answered| **answered).count()
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.answered_by_step
            .iter()
            .zip(&self.correct_by_step)
            .filter(|(answered, correct)| **answered && **correct)
            .count()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self.answered_count();
        SessionProgress {
            total: self.queue.len(),
            answered,
            correct: self.correct_count(),
            remaining: self.queue.len().saturating_sub(answered),
            phase: self.phase,
        }
    }

    //
    // ─── SUBMIT ────────────────────────────────────────────────────────────────
    //

    /// Grades `answer` locally and marks the current question in flight.
    ///
    /// # Errors
    ///
    /// Returns a `Rejection` when the session is not active, energy is
    /// exhausted, or the current question is recorded or already in flight.
    pub fn begin_submit(
        &mut self,
        answer: Answer,
        now: DateTime<Utc>,
    ) -> Result<PendingSubmit, Rejection> {
        if self.phase != SessionPhase::Active {
            return Err(Rejection::NotActive);
        }
        if self.energy.is_exhausted() {
            return Err(Rejection::EnergyExhausted);
        }
        let entry = self.queue.get(self.cursor).ok_or(Rejection::NotActive)?;
        if self.is_recorded(self.cursor) {
            return Err(Rejection::AlreadyRecorded);
        }
        if self.in_flight.contains(&entry.key) {
            return Err(Rejection::InFlight);
        }

        let local = evaluate(&entry.item, &answer);
        let elapsed_ms = now
            .signed_duration_since(self.question_started_at)
            .num_milliseconds();
        let record = AnswerRecord {
            question: entry.item.question_ref(&self.session_id),
            result: local,
            answer,
            elapsed_ms: u64::try_from(elapsed_ms).unwrap_or(0),
        };
        let key = entry.key;
        let question_id = entry.item.question_id.clone();
        self.in_flight.insert(key);

        Ok(PendingSubmit {
            key,
            question_id,
            local,
            record,
        })
    }

    /// Commits a submit once the provider has recorded it.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::NotActive` if the session finished while the
    /// record call was pending; the answer is then dropped locally.
    pub fn complete_submit(
        &mut self,
        pending: PendingSubmit,
        receipt: &AnswerReceipt,
        now: DateTime<Utc>,
    ) -> Result<GradedAnswer, Rejection> {
        self.in_flight.remove(&pending.key);
        if matches!(
            self.phase,
            SessionPhase::Bootstrapping | SessionPhase::Finished
        ) {
            return Err(Rejection::NotActive);
        }
        let step = self
            .position_of(pending.key)
            .ok_or(Rejection::NotActive)?;
        if self.answered_by_step[step] {
            return Err(Rejection::AlreadyRecorded);
        }

        let correct = match pending.local {
            ResultTag::Ungraded => receipt.correct.unwrap_or(false),
            tag => tag.is_correct(),
        };
        self.answered_by_step[step] = true;
        self.correct_by_step[step] = correct;

        let entry = &self.queue[step];
        let tone = if correct {
            self.streak_correct += 1;
            let streak_milestone = self.streak_celebration_every > 0
                && self.streak_correct % self.streak_celebration_every == 0;
            if streak_milestone && self.celebration.try_fire(now) {
                Tone::SuccessWithStreak
            } else {
                Tone::Success
            }
        } else {
            self.streak_correct = 0;
            Tone::Encouragement
        };

        let seed = format!("{}:{}", self.seed, pending.question_id);
        let feedback = FeedbackMessage::compose(
            &seed,
            tone,
            self.microcopy_max_chars,
            entry.item.explanation.clone(),
        );

        let remediation = (!correct
            && self.remediation_enabled
            && self.phase == SessionPhase::Active
            && entry.kind == EntryKind::Original)
            .then(|| RemediationRequest {
                anchor: pending.key,
                request: BatchRequest::remediation(
                    self.subject_id.clone(),
                    self.lesson_id.clone(),
                    receipt
                        .skill_id
                        .clone()
                        .or_else(|| entry.item.metadata.skill_id.clone()),
                ),
            });

        Ok(GradedAnswer {
            cursor: step,
            result: pending.local,
            correct,
            streak_correct: self.streak_correct,
            feedback,
            remediation,
        })
    }

    /// Releases a submit whose record call failed; the question stays open.
    pub fn abort_submit(&mut self, pending: PendingSubmit) {
        self.in_flight.remove(&pending.key);
    }

    /// Inserts a remediation item so it is the next one served: right after
    /// its anchor, or right after the cursor if the host has moved past it.
    ///
    /// Returns `false` when the item was dropped: the session left `Active`,
    /// the anchor is unknown, or it already has a follow-up.
    pub fn splice_remediation(&mut self, anchor: EntryKey, item: QuestionItem) -> bool {
        if self.phase != SessionPhase::Active {
            debug!(
                session_id = %self.session_id,
                anchor = %anchor,
                "dropping remediation for inactive session"
            );
            return false;
        }
        let already_spliced = self.queue.iter().any(|entry| {
            matches!(entry.kind, EntryKind::Remediation { anchor: existing } if existing == anchor)
        });
        if already_spliced {
            return false;
        }
        let Some(position) = self
            .queue
            .iter()
            .position(|entry| entry.kind == EntryKind::Original && entry.key == anchor)
        else {
            return false;
        };

        let at = position.max(self.cursor) + 1;
        let key = self.allocate_key();
        self.queue.insert(
            at,
            QueueEntry {
                key,
                item,
                kind: EntryKind::Remediation { anchor },
            },
        );
        self.answered_by_step.insert(at, false);
        self.correct_by_step.insert(at, false);
        true
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Moves to the next question, or to `Finishing` from the last one.
    ///
    /// # Errors
    ///
    /// Returns a `Rejection` when the session is not active or out of energy.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<Advance, Rejection> {
        if self.phase != SessionPhase::Active {
            return Err(Rejection::NotActive);
        }
        if self.energy.is_exhausted() {
            return Err(Rejection::EnergyExhausted);
        }

        if self.cursor + 1 < self.queue.len() {
            self.cursor += 1;
            self.question_started_at = now;
            Ok(Advance::Moved {
                cursor: self.cursor,
            })
        } else {
            self.phase = SessionPhase::Finishing;
            Ok(Advance::Finishing)
        }
    }

    //
    // ─── ENERGY ────────────────────────────────────────────────────────────────
    //

    /// Stores the latest reading from the energy collaborator.
    pub fn apply_energy(&mut self, status: EnergyStatus) {
        self.energy = status;
    }

    /// Marks a refill in flight.
    ///
    /// # Errors
    ///
    /// Returns a `Rejection` before activation, after finishing, or while
    /// another refill is pending.
    pub fn begin_refill(&mut self) -> Result<(), Rejection> {
        if matches!(
            self.phase,
            SessionPhase::Bootstrapping | SessionPhase::Finished
        ) {
            return Err(Rejection::NotActive);
        }
        if self.refill_in_flight {
            return Err(Rejection::RefillInFlight);
        }
        self.refill_in_flight = true;
        Ok(())
    }

    pub fn complete_refill(&mut self, status: EnergyStatus) {
        self.refill_in_flight = false;
        self.energy = status;
    }

    pub fn abort_refill(&mut self) {
        self.refill_in_flight = false;
    }

    #[must_use]
    pub fn refill_in_flight(&self) -> bool {
        self.refill_in_flight
    }

    //
    // ─── FINISH ────────────────────────────────────────────────────────────────
    //

    /// What Finish should do: serve the cached reward or report totals.
    ///
    /// Totals cover every answered step, remediation included.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` while bootstrapping.
    pub fn begin_finish(&self) -> Result<FinishStep, SessionError> {
        if let Some(reward) = &self.reward {
            return Ok(FinishStep::Cached(reward.clone()));
        }
        if self.phase == SessionPhase::Bootstrapping {
            return Err(SessionError::NotStarted);
        }
        Ok(FinishStep::Report {
            answered: u32::try_from(self.answered_count()).unwrap_or(u32::MAX),
            correct: u32::try_from(self.correct_count()).unwrap_or(u32::MAX),
        })
    }

    /// Caches the reward and enters `Finished`. Later calls keep the first reward.
    pub fn complete_finish(&mut self, reward: RewardResult) -> RewardResult {
        if let Some(cached) = &self.reward {
            return cached.clone();
        }
        self.phase = SessionPhase::Finished;
        self.in_flight.clear();
        self.refill_in_flight = false;
        self.reward = Some(reward.clone());
        reward
    }

    fn position_of(&self, key: EntryKey) -> Option<usize> {
        self.queue.iter().position(|entry| entry.key == key)
    }

    fn allocate_key(&mut self) -> EntryKey {
        let key = EntryKey(self.next_key);
        self.next_key += 1;
        key
    }
}

impl fmt::Debug for AdaptiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveSession")
            .field("session_id", &self.session_id)
            .field("lesson_id", &self.lesson_id)
            .field("phase", &self.phase)
            .field("queue_len", &self.queue.len())
            .field("cursor", &self.cursor)
            .field("answered", &self.answered_count())
            .field("energy", &self.energy)
            .field("streak_correct", &self.streak_correct)
            .field("finished", &self.reward.is_some())
            .finish_non_exhaustive()
    }
}
