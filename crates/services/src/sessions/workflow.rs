use std::sync::Arc;

use tracing::{debug, info, warn};

use providers::{BatchRequest, ContentProvider, EnergyService, ProviderError};
use quest_core::Clock;
use quest_core::model::{Answer, EnergyStatus, LessonId, QuestionId, RewardResult, SubjectId};

use super::service::{AdaptiveSession, Advance, FinishStep, GradedAnswer, Rejection};
use crate::config::EngineConfig;
use crate::error::SessionError;
use crate::path_service::PathService;

/// A recorded answer plus the outcome of its follow-up calls.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReport {
    pub graded: GradedAnswer,
    /// Remediation item spliced after the answered question, if any.
    pub remediation: Option<QuestionId>,
    pub energy: EnergyStatus,
    /// Non-fatal follow-up failures (energy or remediation).
    pub follow_up_errors: Vec<ProviderError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Recorded(SubmitReport),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillOutcome {
    Refilled(EnergyStatus),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy)]
enum RefillKind {
    Wait,
    Coins,
}

/// Drives an `AdaptiveSession` against the content and energy collaborators.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    content: Arc<dyn ContentProvider>,
    energy: Arc<dyn EnergyService>,
    config: EngineConfig,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        content: Arc<dyn ContentProvider>,
        energy: Arc<dyn EnergyService>,
    ) -> Self {
        Self {
            clock,
            content,
            energy,
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a session, load the first batch and read energy.
    ///
    /// Any failure is terminal for this attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Provider` for collaborator failures and
    /// `SessionError::Empty` when the batch has no questions.
    pub async fn start_session(
        &self,
        subject_id: &SubjectId,
        lesson_id: &LessonId,
    ) -> Result<AdaptiveSession, SessionError> {
        let handle = self.content.start_session(lesson_id).await?;
        if &handle.subject_id != subject_id {
            warn!(
                requested = %subject_id,
                served = %handle.subject_id,
                "provider opened session under another subject"
            );
        }
        let mut session =
            AdaptiveSession::bootstrapping(handle, lesson_id.clone(), self.clock.now(), &self.config);

        let request = BatchRequest::lesson(
            subject_id.clone(),
            lesson_id.clone(),
            self.config.batch_size,
        );
        let items = self.content.fetch_question_batch(&request).await?;
        let energy = self.energy.get_status().await?;
        session.activate(items, energy, self.clock.now())?;

        info!(
            session_id = %session.session_id(),
            lesson_id = %lesson_id,
            questions = session.queue().len(),
            energy = energy.value,
            "session started"
        );
        Ok(session)
    }

    /// Grade and record the answer for the current question.
    ///
    /// On a wrong answer energy is consumed and, for original questions, one
    /// remediation item is fetched and spliced in. Those follow-ups are
    /// non-fatal: failures are logged and returned in the report.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Provider` if the record call fails. The
    /// question stays unanswered and can be submitted again.
    pub async fn submit(
        &self,
        session: &mut AdaptiveSession,
        answer: Answer,
    ) -> Result<SubmitOutcome, SessionError> {
        let pending = match session.begin_submit(answer, self.clock.now()) {
            Ok(pending) => pending,
            Err(rejection) => {
                debug!(session_id = %session.session_id(), %rejection, "submit rejected");
                return Ok(SubmitOutcome::Rejected(rejection));
            }
        };

        let receipt = match self.content.record_answer(pending.record()).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(
                    session_id = %session.session_id(),
                    question_id = %pending.question_id(),
                    error = %err,
                    "recording answer failed"
                );
                session.abort_submit(pending);
                return Err(err.into());
            }
        };

        let graded = match session.complete_submit(pending, &receipt, self.clock.now()) {
            Ok(graded) => graded,
            Err(rejection) => {
                debug!(session_id = %session.session_id(), %rejection, "late answer dropped");
                return Ok(SubmitOutcome::Rejected(rejection));
            }
        };

        let mut follow_up_errors = Vec::new();
        if !graded.correct {
            match self.energy.consume_wrong_answer().await {
                Ok(status) => session.apply_energy(status),
                Err(err) => {
                    warn!(session_id = %session.session_id(), error = %err, "energy consume failed");
                    follow_up_errors.push(err);
                }
            }
        }

        let mut remediation = None;
        if let Some(follow_up) = &graded.remediation {
            match self.content.fetch_question_batch(&follow_up.request).await {
                Ok(items) => match items.into_iter().next() {
                    Some(item) => {
                        let question_id = item.question_id.clone();
                        if session.splice_remediation(follow_up.anchor, item) {
                            remediation = Some(question_id);
                        }
                    }
                    None => debug!(anchor = %follow_up.anchor, "no remediation item available"),
                },
                Err(err) => {
                    warn!(
                        session_id = %session.session_id(),
                        anchor = %follow_up.anchor,
                        error = %err,
                        "remediation fetch failed"
                    );
                    follow_up_errors.push(err);
                }
            }
        }

        Ok(SubmitOutcome::Recorded(SubmitReport {
            graded,
            remediation,
            energy: session.energy(),
            follow_up_errors,
        }))
    }

    /// Move to the next question.
    ///
    /// # Errors
    ///
    /// Returns a `Rejection` when the session is not active or out of energy.
    pub fn advance(&self, session: &mut AdaptiveSession) -> Result<Advance, Rejection> {
        let result = session.advance(self.clock.now());
        if let Err(rejection) = result {
            debug!(session_id = %session.session_id(), %rejection, "advance rejected");
        }
        result
    }

    /// Refill energy once the wait timer has run out.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Provider` if the energy collaborator refuses.
    pub async fn refill_with_wait(
        &self,
        session: &mut AdaptiveSession,
    ) -> Result<RefillOutcome, SessionError> {
        self.refill(session, RefillKind::Wait).await
    }

    /// Refill energy by spending coins.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Provider` if the energy collaborator refuses.
    pub async fn refill_with_coins(
        &self,
        session: &mut AdaptiveSession,
    ) -> Result<RefillOutcome, SessionError> {
        self.refill(session, RefillKind::Coins).await
    }

    async fn refill(
        &self,
        session: &mut AdaptiveSession,
        kind: RefillKind,
    ) -> Result<RefillOutcome, SessionError> {
        if let Err(rejection) = session.begin_refill() {
            debug!(session_id = %session.session_id(), %rejection, "refill rejected");
            return Ok(RefillOutcome::Rejected(rejection));
        }

        let result = match kind {
            RefillKind::Wait => self.energy.refill_with_wait().await,
            RefillKind::Coins => self.energy.refill_with_coins().await,
        };
        match result {
            Ok(status) => {
                session.complete_refill(status);
                Ok(RefillOutcome::Refilled(status))
            }
            Err(err) => {
                session.abort_refill();
                warn!(session_id = %session.session_id(), ?kind, error = %err, "refill failed");
                Err(err.into())
            }
        }
    }

    /// Report totals and cache the reward. Repeated calls return the cached
    /// reward without contacting the provider.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` before activation and
    /// `SessionError::Provider` if the finish call fails; the session can
    /// be finished again afterwards.
    pub async fn finish(&self, session: &mut AdaptiveSession) -> Result<RewardResult, SessionError> {
        let (answered, correct) = match session.begin_finish()? {
            FinishStep::Cached(reward) => return Ok(reward),
            FinishStep::Report { answered, correct } => (answered, correct),
        };

        let reward = self
            .content
            .finish_session(session.session_id(), answered, correct)
            .await
            .inspect_err(|err| {
                warn!(session_id = %session.session_id(), error = %err, "finish failed");
            })?;
        let reward = session.complete_finish(reward);

        info!(
            session_id = %session.session_id(),
            answered,
            correct,
            stars = reward.stars(),
            xp = reward.xp_earned(),
            "session finished"
        );
        Ok(reward)
    }

    /// Finish, then mark the lesson completed in the path overlay so the
    /// trail reflects it before the next snapshot arrives.
    ///
    /// # Errors
    ///
    /// Same as [`SessionLoopService::finish`]; the overlay is untouched on failure.
    pub async fn finish_and_mark(
        &self,
        session: &mut AdaptiveSession,
        path: &mut PathService,
    ) -> Result<RewardResult, SessionError> {
        let reward = self.finish(session).await?;
        path.mark_completed(session.lesson_id().clone());
        Ok(reward)
    }
}
