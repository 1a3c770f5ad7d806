//! Validation orchestration service.
//!
//! `ValidationService` sequences LLM validation for a survey run: it takes
//! answers through the throttling gate, issues completion calls with a
//! bounded timeout, interprets the responses, merges verdicts into answer
//! state (discarding stale ones), injects follow-up questions, and
//! evaluates the submission gate.
//!
//! Two trigger modes exist. In immediate mode the form layer calls
//! [`ValidationService::validate_question`] whenever an answered question
//! loses focus. In batch mode [`ValidationService::attempt_submission`]
//! fans out one concurrent validation per pending question and joins all
//! of them before deciding. The fan-in is a join, not a race: partial
//! failures never cancel siblings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use canvass_core::answer::{AnswerValue, ValidationStatus, VerdictApplication};
use canvass_core::completion::{CompletionAgent, CompletionError};
use canvass_core::error::Result;
use canvass_core::interpret::interpret_response;
use canvass_core::prompt::{PromptTemplate, RenderedPrompt};
use canvass_core::question::Question;
use canvass_core::throttle::{ThrottleGate, ThrottleStatus};
use canvass_core::verdict::Verdict;
use canvass_core::CanvassError;

use crate::run::{SubmissionCheck, SurveyRun};

/// When validation requests are triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Per-question validation as answers lose focus.
    Immediate,
    /// One concurrent fan-out at submission time.
    Batch,
}

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Trigger mode; also selects the submission policy.
    #[serde(default = "default_mode")]
    pub mode: TriggerMode,
    /// Bounded timeout for one completion call, in seconds. Expiry is a
    /// transport error; retries are the caller's responsibility.
    #[serde(default = "default_completion_timeout_secs")]
    pub completion_timeout_secs: u64,
}

fn default_mode() -> TriggerMode {
    TriggerMode::Batch
}

fn default_completion_timeout_secs() -> u64 {
    30
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            completion_timeout_secs: default_completion_timeout_secs(),
        }
    }
}

/// Per-question outcome of a validation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "'de: 'static"))]
pub struct QuestionResult {
    pub question_id: String,
    /// The answer's status after the merge step.
    pub status: ValidationStatus,
    /// Id of the follow-up question this verdict injected (or found already
    /// injected), when the answer was judged insufficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_id: Option<String>,
    /// The error that hit this question, when its validation failed or was
    /// throttled. Never aborts sibling validations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CanvassError>,
}

/// Outcome of a submission attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "'de: 'static"))]
pub struct SubmissionOutcome {
    /// Whether the run may be submitted now.
    pub submitted: bool,
    /// The submission gate evaluation backing `submitted`.
    pub check: SubmissionCheck,
    /// Per-question results of the validations this attempt issued.
    pub results: Vec<QuestionResult>,
}

/// Result of one fanned-out validation task, before the merge step.
enum TaskOutcome {
    /// The completion returned text to interpret.
    Completed {
        question: Question,
        sent: AnswerValue,
        raw: String,
    },
    /// The completion call failed (transport error or timeout).
    Failed {
        question: Question,
        sent: AnswerValue,
        error: CompletionError,
    },
    /// The throttling gate rejected the request; it was never issued.
    Rejected {
        question: Question,
        sent: AnswerValue,
        error: CanvassError,
    },
}

/// Drives LLM validation for one survey run and decides submission
/// admissibility.
pub struct ValidationService {
    agent: Arc<dyn CompletionAgent>,
    gate: Arc<ThrottleGate>,
    template: PromptTemplate,
    config: ValidationConfig,
    run: Arc<RwLock<SurveyRun>>,
}

impl ValidationService {
    /// Creates a service around a run.
    pub fn new(
        agent: Arc<dyn CompletionAgent>,
        gate: Arc<ThrottleGate>,
        run: SurveyRun,
        template: PromptTemplate,
        config: ValidationConfig,
    ) -> Self {
        Self {
            agent,
            gate,
            template,
            config,
            run: Arc::new(RwLock::new(run)),
        }
    }

    /// The throttling gate, for session issuance and status queries.
    pub fn gate(&self) -> &Arc<ThrottleGate> {
        &self.gate
    }

    /// Shared handle to the run state.
    pub fn run(&self) -> Arc<RwLock<SurveyRun>> {
        Arc::clone(&self.run)
    }

    /// The configured trigger mode.
    pub fn mode(&self) -> TriggerMode {
        self.config.mode
    }

    /// Records respondent input for a question.
    pub async fn record_answer(&self, question_id: &str, value: AnswerValue) -> Result<()> {
        let mut run = self.run.write().await;
        run.record_answer(question_id, value)
    }

    /// Read-only throttling status for a session.
    pub async fn throttle_status(&self, session_id: &str) -> ThrottleStatus {
        self.gate.status(session_id, Instant::now()).await
    }

    /// Evaluates the submission gate without issuing any validation.
    pub async fn submission_state(&self) -> SubmissionCheck {
        let run = self.run.read().await;
        run.submission_check(self.config.mode == TriggerMode::Batch)
    }

    /// Validates a single question now (immediate mode's blur trigger).
    ///
    /// No-op for questions that are not probe candidates or have no
    /// non-empty answer.
    ///
    /// # Errors
    ///
    /// Returns `Throttled` when the gate rejects the request (nothing was
    /// issued; the answer rolls back to unvalidated) and `NotFound` for an
    /// unknown question id. Completion failures do not error: they are
    /// reported on the returned result with the answer marked `Errored`.
    pub async fn validate_question(
        &self,
        session_id: &str,
        origin: Option<&str>,
        question_id: &str,
    ) -> Result<QuestionResult> {
        let (question, sent, score) = {
            let mut run = self.run.write().await;
            let question = run
                .question(question_id)
                .cloned()
                .ok_or_else(|| CanvassError::not_found("question", question_id))?;
            if !question.is_probe_candidate() {
                debug!(question_id, "skipping validation for ineligible question");
                return Ok(self.noop_result(&run, question_id));
            }
            let Some(sent) = run.answers_mut().begin_validation(question_id) else {
                debug!(question_id, "nothing to validate: empty answer");
                return Ok(self.noop_result(&run, question_id));
            };
            let score = run.score_context();
            (question, sent, score)
        };

        if let Err(err) = self.gate.admit(session_id, origin, Instant::now()).await {
            let mut run = self.run.write().await;
            run.answers_mut().revert_validation(question_id, &sent);
            return Err(err);
        }

        let rendered =
            self.template
                .render(&question.prompt, &sent.as_prompt_text(), score.as_deref());
        let outcome = match self.complete_with_timeout(&rendered).await {
            Ok(raw) => TaskOutcome::Completed {
                question,
                sent,
                raw,
            },
            Err(error) => TaskOutcome::Failed {
                question,
                sent,
                error,
            },
        };

        let mut run = self.run.write().await;
        Ok(self.merge_outcome(&mut run, outcome))
    }

    /// Attempts submission.
    ///
    /// In batch mode this first fans out one concurrent validation per
    /// pending probe candidate and joins all of them; throttling or
    /// transport failures are reported per question and never cancel
    /// siblings. The submission gate is then evaluated against the merged
    /// state.
    pub async fn attempt_submission(
        &self,
        session_id: &str,
        origin: Option<&str>,
    ) -> Result<SubmissionOutcome> {
        let mut results = Vec::new();

        if self.config.mode == TriggerMode::Batch {
            let (tasks, score) = {
                let mut run = self.run.write().await;
                let score = run.score_context();
                let mut tasks = Vec::new();
                for question in run.probe_candidates() {
                    if let Some(sent) = run.answers_mut().begin_validation(&question.id) {
                        tasks.push((question, sent));
                    }
                }
                (tasks, score)
            };

            let futures = tasks.into_iter().map(|(question, sent)| {
                let rendered = self.template.render(
                    &question.prompt,
                    &sent.as_prompt_text(),
                    score.as_deref(),
                );
                async move {
                    match self
                        .gate
                        .admit(session_id, origin, Instant::now())
                        .await
                    {
                        Err(error) => TaskOutcome::Rejected {
                            question,
                            sent,
                            error,
                        },
                        Ok(_) => match self.complete_with_timeout(&rendered).await {
                            Ok(raw) => TaskOutcome::Completed {
                                question,
                                sent,
                                raw,
                            },
                            Err(error) => TaskOutcome::Failed {
                                question,
                                sent,
                                error,
                            },
                        },
                    }
                }
            });
            let outcomes = join_all(futures).await;

            let mut run = self.run.write().await;
            for outcome in outcomes {
                results.push(self.merge_outcome(&mut run, outcome));
            }
        }

        let run = self.run.read().await;
        let check = run.submission_check(self.config.mode == TriggerMode::Batch);
        Ok(SubmissionOutcome {
            submitted: check.is_allowed(),
            check,
            results,
        })
    }

    /// Issues one completion call under the configured timeout.
    async fn complete_with_timeout(
        &self,
        rendered: &RenderedPrompt,
    ) -> std::result::Result<String, CompletionError> {
        let timeout = Duration::from_secs(self.config.completion_timeout_secs);
        match tokio::time::timeout(timeout, self.agent.complete(&rendered.system, &rendered.user))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(timeout)),
        }
    }

    /// Merges one task outcome into the run under the write lock.
    fn merge_outcome(&self, run: &mut SurveyRun, outcome: TaskOutcome) -> QuestionResult {
        match outcome {
            TaskOutcome::Completed {
                question,
                sent,
                raw,
            } => {
                let verdict = interpret_response(&question, &sent, &raw);
                if verdict.heuristic_fallback {
                    debug!(
                        question_id = %question.id,
                        "free-text heuristic engaged for completion"
                    );
                }
                self.merge_verdict(run, verdict)
            }
            TaskOutcome::Failed {
                question,
                sent,
                error,
            } => {
                warn!(question_id = %question.id, error = %error, "validation call failed");
                if !run.answers_mut().mark_errored(&question.id, &sent) {
                    debug!(question_id = %question.id, "discarding failure for edited answer");
                }
                QuestionResult {
                    question_id: question.id.clone(),
                    status: self.current_status(run, &question.id),
                    follow_up_id: None,
                    error: Some(error.into()),
                }
            }
            TaskOutcome::Rejected {
                question,
                sent,
                error,
            } => {
                run.answers_mut().revert_validation(&question.id, &sent);
                QuestionResult {
                    question_id: question.id.clone(),
                    status: self.current_status(run, &question.id),
                    follow_up_id: None,
                    error: Some(error),
                }
            }
        }
    }

    /// Applies a verdict and, for probes, injects the follow-up question.
    fn merge_verdict(&self, run: &mut SurveyRun, verdict: Verdict) -> QuestionResult {
        match run.answers_mut().apply_verdict(&verdict) {
            VerdictApplication::Applied(status) => {
                let follow_up_id = if verdict.is_probe() {
                    run.inject_follow_up(&verdict)
                        .question_id()
                        .map(str::to_string)
                } else {
                    None
                };
                QuestionResult {
                    question_id: verdict.question_id,
                    status,
                    follow_up_id,
                    error: None,
                }
            }
            VerdictApplication::DiscardedStale => {
                debug!(question_id = %verdict.question_id, "discarding stale verdict");
                QuestionResult {
                    question_id: verdict.question_id.clone(),
                    status: self.current_status(run, &verdict.question_id),
                    follow_up_id: None,
                    error: None,
                }
            }
            VerdictApplication::NoAnswer => {
                warn!(question_id = %verdict.question_id, "verdict for unanswered question");
                QuestionResult {
                    question_id: verdict.question_id,
                    status: ValidationStatus::Unvalidated,
                    follow_up_id: None,
                    error: None,
                }
            }
        }
    }

    fn current_status(&self, run: &SurveyRun, question_id: &str) -> ValidationStatus {
        run.answers()
            .status_of(question_id)
            .unwrap_or(ValidationStatus::Unvalidated)
    }

    fn noop_result(&self, run: &SurveyRun, question_id: &str) -> QuestionResult {
        QuestionResult {
            question_id: question_id.to_string(),
            status: self.current_status(run, question_id),
            follow_up_id: None,
            error: None,
        }
    }
}
