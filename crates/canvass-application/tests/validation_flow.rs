//! End-to-end validation flow tests with scripted completion agents.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use canvass_application::run::SurveyRun;
use canvass_application::{
    SubmissionBlocker, TriggerMode, ValidationConfig, ValidationService,
};
use canvass_core::CanvassError;
use canvass_core::answer::{AnswerValue, ValidationStatus};
use canvass_core::completion::{CompletionAgent, CompletionError};
use canvass_core::prompt::PromptTemplate;
use canvass_core::question::{Question, SurveyConfig};
use canvass_core::throttle::{ThrottleConfig, ThrottleGate};

/// Replies with a canned response when the user message contains the
/// configured needle, `NO_PROBE` otherwise. Records every user message.
struct ScriptedAgent {
    replies: Vec<(String, String)>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    fn new(replies: Vec<(&str, &str)>) -> Self {
        Self {
            replies: replies
                .into_iter()
                .map(|(needle, reply)| (needle.to_string(), reply.to_string()))
                .collect(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn approving() -> Self {
        Self::new(Vec::new())
    }

    async fn seen_messages(&self) -> Vec<String> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl CompletionAgent for ScriptedAgent {
    async fn complete(
        &self,
        _system_instruction: &str,
        user_message: &str,
    ) -> Result<String, CompletionError> {
        self.seen.lock().await.push(user_message.to_string());
        for (needle, reply) in &self.replies {
            if user_message.contains(needle) {
                return Ok(reply.clone());
            }
        }
        Ok("NO_PROBE".to_string())
    }
}

/// Fails with a transport error when the user message contains the needle.
struct FailingAgent {
    fail_needle: String,
}

#[async_trait]
impl CompletionAgent for FailingAgent {
    async fn complete(
        &self,
        _system_instruction: &str,
        user_message: &str,
    ) -> Result<String, CompletionError> {
        if user_message.contains(&self.fail_needle) {
            Err(CompletionError::Transport("connection reset".to_string()))
        } else {
            Ok("NO_PROBE".to_string())
        }
    }
}

/// Holds every completion until released, then approves.
struct GatedAgent {
    release: Arc<Notify>,
}

#[async_trait]
impl CompletionAgent for GatedAgent {
    async fn complete(
        &self,
        _system_instruction: &str,
        _user_message: &str,
    ) -> Result<String, CompletionError> {
        self.release.notified().await;
        Ok("NO_PROBE".to_string())
    }
}

fn service_with(
    agent: Arc<dyn CompletionAgent>,
    questions: Vec<Question>,
    mode: TriggerMode,
    throttle: ThrottleConfig,
) -> Arc<ValidationService> {
    let run = SurveyRun::from_config(SurveyConfig::new(questions)).unwrap();
    Arc::new(ValidationService::new(
        agent,
        Arc::new(ThrottleGate::new(throttle)),
        run,
        PromptTemplate::default(),
        ValidationConfig {
            mode,
            completion_timeout_secs: 5,
        },
    ))
}

#[tokio::test]
async fn twelve_rapid_requests_throttle_after_ten() {
    let service = service_with(
        Arc::new(ScriptedAgent::approving()),
        vec![Question::text("q1", "What happened?")],
        TriggerMode::Immediate,
        ThrottleConfig::default(),
    );
    let session = service.gate().issue_session().await;

    for i in 0..12 {
        service
            .record_answer("q1", AnswerValue::text(format!("attempt number {i}")))
            .await
            .unwrap();
        let outcome = service.validate_question(&session, None, "q1").await;
        if i < 10 {
            let result = outcome.unwrap();
            assert_eq!(result.status, ValidationStatus::Valid, "request {i}");
        } else {
            let err = outcome.unwrap_err();
            assert!(err.is_throttled(), "request {i} should be throttled");
            assert!(err.retry_after_secs().unwrap() >= 1);
        }
    }

    let status = service.throttle_status(&session).await;
    assert_eq!(status.requests_in_window, 10);
    assert_eq!(status.max_per_window, 10);
    assert_eq!(status.window_secs, 60);

    // The rejected requests left the answer unvalidated, not in flight.
    let run = service.run();
    let run = run.read().await;
    assert_eq!(
        run.answers().status_of("q1"),
        Some(ValidationStatus::Unvalidated)
    );
}

#[tokio::test]
async fn batch_probe_blocks_submission_and_injects_follow_up() {
    let agent = Arc::new(ScriptedAgent::new(vec![(
        "What should we improve",
        "```json\n{\"action\":\"probe\",\"text\":\"Please specify a date\"}\n```",
    )]));
    let service = service_with(
        agent.clone(),
        vec![
            Question::single_choice(
                "rating",
                "How satisfied are you?",
                vec!["1".into(), "2".into(), "3".into(), "4".into(), "5".into()],
            ),
            Question::text("q1", "What went well?"),
            Question::text("q2", "What should we improve?"),
            Question::text("q3", "Anything else?"),
        ],
        TriggerMode::Batch,
        ThrottleConfig::default(),
    );
    let session = service.gate().issue_session().await;

    service
        .record_answer("rating", AnswerValue::text("4"))
        .await
        .unwrap();
    service
        .record_answer("q1", AnswerValue::text("the onboarding flow was smooth"))
        .await
        .unwrap();
    service
        .record_answer("q2", AnswerValue::text("deadlines"))
        .await
        .unwrap();
    service
        .record_answer("q3", AnswerValue::text("nothing comes to mind"))
        .await
        .unwrap();

    let outcome = service
        .attempt_submission(&session, Some("203.0.113.7"))
        .await
        .unwrap();
    assert!(!outcome.submitted);
    assert_eq!(outcome.results.len(), 3);

    // The derived question sits directly after its parent.
    let run = service.run();
    {
        let run = run.read().await;
        let ids: Vec<&str> = run.questions().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["rating", "q1", "q2", "q2::followup::1", "q3"]
        );

        let q2 = run.answers().get("q2").unwrap();
        assert_eq!(q2.status, ValidationStatus::Invalid);
        assert_eq!(q2.follow_up.as_deref(), Some("Please specify a date"));

        assert_eq!(
            outcome.check.blockers,
            vec![SubmissionBlocker::UnansweredFollowUp {
                question_id: "q2::followup::1".to_string()
            }]
        );
    }

    // The single-choice answer rode along as scoring context.
    let seen = agent.seen_messages().await;
    assert!(seen.iter().all(|message| message.contains("Rating given: 4")));

    // Answering the follow-up unblocks submission.
    service
        .record_answer("q2::followup::1", AnswerValue::text("mid-November"))
        .await
        .unwrap();
    let outcome = service
        .attempt_submission(&session, Some("203.0.113.7"))
        .await
        .unwrap();
    assert!(outcome.submitted);
    assert!(outcome.results.is_empty());
}

#[tokio::test]
async fn transport_failure_marks_errored_but_spares_siblings() {
    let service = service_with(
        Arc::new(FailingAgent {
            fail_needle: "the flaky one".to_string(),
        }),
        vec![
            Question::text("q1", "First question"),
            Question::text("q2", "Second, the flaky one"),
            Question::text("q3", "Third question"),
        ],
        TriggerMode::Batch,
        ThrottleConfig::default(),
    );
    let session = service.gate().issue_session().await;
    for id in ["q1", "q2", "q3"] {
        service
            .record_answer(id, AnswerValue::text("a reasonable answer"))
            .await
            .unwrap();
    }

    let outcome = service.attempt_submission(&session, None).await.unwrap();
    assert!(!outcome.submitted);

    let by_id = |id: &str| {
        outcome
            .results
            .iter()
            .find(|result| result.question_id == id)
            .unwrap()
    };
    assert_eq!(by_id("q1").status, ValidationStatus::Valid);
    assert_eq!(by_id("q3").status, ValidationStatus::Valid);
    let failed = by_id("q2");
    assert_eq!(failed.status, ValidationStatus::Errored);
    assert!(failed.error.as_ref().unwrap().is_transport());

    assert_eq!(
        outcome.check.blockers,
        vec![SubmissionBlocker::ValidationFailed {
            question_id: "q2".to_string()
        }]
    );
}

#[tokio::test]
async fn verdict_for_edited_answer_is_discarded() {
    let release = Arc::new(Notify::new());
    let service = service_with(
        Arc::new(GatedAgent {
            release: release.clone(),
        }),
        vec![Question::text("q1", "Describe the problem")],
        TriggerMode::Immediate,
        ThrottleConfig::default(),
    );
    let session = service.gate().issue_session().await;

    service
        .record_answer("q1", AnswerValue::text("first draft"))
        .await
        .unwrap();

    let in_flight = {
        let service = service.clone();
        let session = session.clone();
        tokio::spawn(async move { service.validate_question(&session, None, "q1").await })
    };

    // Wait until the request is actually in flight.
    let run = service.run();
    for _ in 0..1000 {
        if run.read().await.answers().status_of("q1") == Some(ValidationStatus::Validating) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    // Edit while the completion is pending, then let it finish.
    service
        .record_answer("q1", AnswerValue::text("second draft"))
        .await
        .unwrap();
    release.notify_one();

    let result = in_flight.await.unwrap().unwrap();
    assert_eq!(result.status, ValidationStatus::Unvalidated);
    assert_eq!(result.error, None);

    let run = run.read().await;
    let answer = run.answers().get("q1").unwrap();
    assert_eq!(answer.value, AnswerValue::text("second draft"));
    assert_eq!(answer.status, ValidationStatus::Unvalidated);
}

#[tokio::test]
async fn batch_throttle_rejection_leaves_answer_unvalidated() {
    let throttle = ThrottleConfig {
        session_max_per_window: 1,
        ..ThrottleConfig::default()
    };
    let service = service_with(
        Arc::new(ScriptedAgent::approving()),
        vec![
            Question::text("q1", "First question"),
            Question::text("q2", "Second question"),
        ],
        TriggerMode::Batch,
        throttle,
    );
    let session = service.gate().issue_session().await;
    for id in ["q1", "q2"] {
        service
            .record_answer(id, AnswerValue::text("an answer"))
            .await
            .unwrap();
    }

    let outcome = service.attempt_submission(&session, None).await.unwrap();
    assert!(!outcome.submitted);

    let throttled: Vec<_> = outcome
        .results
        .iter()
        .filter(|result| {
            result
                .error
                .as_ref()
                .is_some_and(CanvassError::is_throttled)
        })
        .collect();
    assert_eq!(throttled.len(), 1);
    assert_eq!(throttled[0].status, ValidationStatus::Unvalidated);

    let validated = outcome
        .results
        .iter()
        .filter(|result| result.status == ValidationStatus::Valid)
        .count();
    assert_eq!(validated, 1);

    // The rejected question is still awaiting validation.
    let awaiting = outcome
        .check
        .blockers
        .iter()
        .filter(|blocker| matches!(blocker, SubmissionBlocker::AwaitingValidation { .. }))
        .count();
    assert_eq!(awaiting, 1);
}

#[tokio::test]
async fn immediate_mode_submission_does_not_fan_out() {
    let service = service_with(
        Arc::new(ScriptedAgent::approving()),
        vec![Question::text("q1", "Optional feedback")],
        TriggerMode::Immediate,
        ThrottleConfig::default(),
    );
    let session = service.gate().issue_session().await;
    service
        .record_answer("q1", AnswerValue::text("never validated"))
        .await
        .unwrap();

    let outcome = service.attempt_submission(&session, None).await.unwrap();
    // No validations were issued, and the immediate policy does not block
    // on unvalidated answers.
    assert!(outcome.results.is_empty());
    assert!(outcome.submitted);
}
