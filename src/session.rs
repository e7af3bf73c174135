use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::gate::{GateError, RateGate};
use crate::options::{Capability, Language};
use crate::output::OutputStore;
use crate::prompts::{build_prompt, NO_VISIBLE_OUTPUT, SYSTEM_INSTRUCTION};
use crate::{Conversation, Model, ModelError};

pub const RATE_LIMIT_MESSAGE: &str = "⚠️ Rate limit reached. Please wait a minute and try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub capability: Capability,
    pub language: Language,
    pub prompt: String,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    RateLimited(#[from] GateError),
    #[error("⚠️ Please enter a prompt.")]
    EmptyPrompt,
    #[error("could not save output: {0}")]
    Save(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Empty,
    Failed,
}

/// What a finished submission produced. `text` is exactly what was saved at `path`.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub path: PathBuf,
    pub outcome: Outcome,
}

/// Per-user state: the rate gate plus the model and where results go.
pub struct Session {
    gate: RateGate,
    model: Arc<dyn Model>,
    store: OutputStore,
}

impl Session {
    pub fn new(gate: RateGate, model: Arc<dyn Model>, store: OutputStore) -> Self {
        Self { gate, model, store }
    }

    pub fn model(&self) -> Arc<dyn Model> {
        Arc::clone(&self.model)
    }

    pub const fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// Validate a request and claim the gate for it.
    ///
    /// The gate is checked before the prompt, and nothing is recorded unless
    /// both checks pass.
    pub fn begin(&mut self, request: &Request, now: Instant) -> Result<Conversation, SubmitError> {
        if let Err(err) = self.gate.check(now) {
            tracing::warn!(%err, "submission rejected by rate gate");
            return Err(err.into());
        }
        if request.prompt.trim().is_empty() {
            tracing::warn!("submission rejected: empty prompt");
            return Err(SubmitError::EmptyPrompt);
        }
        self.gate.record(now);
        tracing::info!(
            capability = %request.capability,
            language = %request.language,
            prompt_len = request.prompt.len(),
            "submission accepted"
        );

        Ok(Conversation {
            system: SYSTEM_INSTRUCTION.to_string(),
            user: build_prompt(request.capability, request.language, &request.prompt),
        })
    }

    /// Turn the model's answer into the displayed text and save it.
    pub fn finish(
        &self,
        request: &Request,
        result: Result<Option<String>, ModelError>,
        generated_at: DateTime<Local>,
    ) -> Result<Generation, SubmitError> {
        let (text, outcome) = match result {
            Ok(Some(text)) => (text, Outcome::Completed),
            Ok(None) => (NO_VISIBLE_OUTPUT.to_string(), Outcome::Empty),
            Err(err) => {
                tracing::error!(%err, "model request failed");
                (failure_message(&err), Outcome::Failed)
            }
        };
        let path = self
            .store
            .save(request.capability, request.language, &text, &generated_at)?;
        Ok(Generation {
            text,
            path,
            outcome,
        })
    }

    pub async fn submit(&mut self, request: &Request) -> Result<Generation, SubmitError> {
        let conversation = self.begin(request, Instant::now())?;
        let result = self.model.send(&conversation).await;
        self.finish(request, result, Local::now())
    }
}

pub fn failure_message(err: &ModelError) -> String {
    if err.is_rate_limited() {
        RATE_LIMIT_MESSAGE.to_string()
    } else {
        format!("❌ OpenAI API error: {err}")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use chrono::{Local, TimeZone};

    use super::{Outcome, Request, Session, SubmitError, RATE_LIMIT_MESSAGE};
    use crate::gate::{GateError, RateGate};
    use crate::openai::OpenAIError;
    use crate::options::{Capability, Language};
    use crate::output::OutputStore;
    use crate::prompts::NO_VISIBLE_OUTPUT;
    use crate::{Conversation, Model, ModelError};

    enum Reply {
        Text(&'static str),
        Nothing,
        Fail,
        RateLimited,
    }

    struct FakeModel {
        reply: Reply,
        calls: AtomicUsize,
        last: Mutex<Option<Conversation>>,
    }

    impl FakeModel {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Model for FakeModel {
        async fn send(&self, conversation: &Conversation) -> Result<Option<String>, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(conversation.clone());
            match self.reply {
                Reply::Text(text) => Ok(Some(text.to_string())),
                Reply::Nothing => Ok(None),
                Reply::Fail => Err(ModelError::Other("connection reset".to_string())),
                Reply::RateLimited => Err(OpenAIError::RateLimited("slow down".to_string()).into()),
            }
        }
    }

    fn session(model: Arc<FakeModel>, dir: &std::path::Path) -> Session {
        Session::new(
            RateGate::new(Duration::from_secs(20)),
            model,
            OutputStore::new(dir),
        )
    }

    fn request(prompt: &str) -> Request {
        Request {
            capability: Capability::DialogueAndStoryScripting,
            language: Language::Spanish,
            prompt: prompt.to_string(),
        }
    }

    #[tokio::test]
    async fn saved_file_matches_displayed_text() {
        let dir = tempfile::tempdir().unwrap();
        let model = FakeModel::new(Reply::Text("# Acto I\n- La caravana parte al alba"));
        let mut session = session(model.clone(), dir.path());

        let generation = session.submit(&request("a desert caravan")).await.unwrap();
        assert_eq!(generation.outcome, Outcome::Completed);
        assert_eq!(generation.text, "# Acto I\n- La caravana parte al alba");
        assert_eq!(fs::read_to_string(&generation.path).unwrap(), generation.text);

        let sent = model.last.lock().unwrap().clone().unwrap();
        assert!(sent.user.contains("Spanish"));
        assert!(sent.user.ends_with("a desert caravan"));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn empty_prompt_never_calls_model() {
        let dir = tempfile::tempdir().unwrap();
        let model = FakeModel::new(Reply::Text("unused"));
        let mut session = session(model.clone(), dir.path());

        for prompt in ["", "   ", "\n\t "] {
            let err = session.submit(&request(prompt)).await.unwrap_err();
            assert!(matches!(err, SubmitError::EmptyPrompt));
        }
        assert_eq!(model.calls(), 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        // rejected prompts do not consume the gate
        assert!(session.submit(&request("a real idea")).await.is_ok());
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn second_call_inside_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let model = FakeModel::new(Reply::Text("ok"));
        let mut session = session(model.clone(), dir.path());

        session.submit(&request("first")).await.unwrap();
        let err = session.submit(&request("second")).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::RateLimited(GateError::TooSoon { wait_secs }) if wait_secs <= 20
        ));
        assert!(err.to_string().starts_with("⏳ Please wait"));
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn gate_is_checked_before_the_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(FakeModel::new(Reply::Nothing), dir.path());
        let start = Instant::now();
        session.begin(&request("first"), start).unwrap();

        let err = session
            .begin(&request(" "), start + Duration::from_secs(3))
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::RateLimited(GateError::TooSoon { wait_secs: 17 })
        ));
        assert!(session
            .begin(&request("again"), start + Duration::from_secs(20))
            .is_ok());
    }

    #[test]
    fn consecutive_submissions_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(FakeModel::new(Reply::Nothing), dir.path());
        let start = Instant::now();
        let at = Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        session.begin(&request("one"), start).unwrap();
        let first = session
            .finish(&request("one"), Ok(Some("one".into())), at)
            .unwrap();
        session
            .begin(&request("two"), start + Duration::from_secs(21))
            .unwrap();
        let second = session
            .finish(
                &request("two"),
                Ok(Some("two".into())),
                at + chrono::Duration::seconds(21),
            )
            .unwrap();
        assert_ne!(first.path, second.path);
    }

    #[tokio::test]
    async fn provider_failure_is_saved_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(FakeModel::new(Reply::Fail), dir.path());

        let generation = session.submit(&request("anything")).await.unwrap();
        assert_eq!(generation.outcome, Outcome::Failed);
        assert_eq!(generation.text, "❌ OpenAI API error: connection reset");
        assert_eq!(fs::read_to_string(&generation.path).unwrap(), generation.text);
    }

    #[tokio::test]
    async fn provider_rate_limit_has_its_own_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(FakeModel::new(Reply::RateLimited), dir.path());

        let generation = session.submit(&request("anything")).await.unwrap();
        assert_eq!(generation.outcome, Outcome::Failed);
        assert_eq!(generation.text, RATE_LIMIT_MESSAGE);
    }

    #[tokio::test]
    async fn no_visible_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(FakeModel::new(Reply::Nothing), dir.path());

        let generation = session.submit(&request("anything")).await.unwrap();
        assert_eq!(generation.outcome, Outcome::Empty);
        assert_eq!(fs::read_to_string(&generation.path).unwrap(), NO_VISIBLE_OUTPUT);
    }
}
