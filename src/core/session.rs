//! The client side of an analysis request.
//!
//! A [`Session`] owns the observable state of one submit/stream/result cycle:
//! the current case, the append-only reasoning log, the current analysis,
//! a busy flag and the last user-facing error. It issues the request through
//! a [`CompletionSource`], drives the [`EventStream`] and mirrors every event
//! into that state.

use std::time::Duration;

use thiserror::Error;
use tracing::instrument;

use crate::adapters::{AnalysisRequest, CompletionSource, TransportError};
use crate::domain::{
    AnalysisRecord, AssemblyEvent, AssemblyFailure, CaseInput, CaseStatus, HistoryEntry,
    ShapeIssue,
};

use super::assembler::BoundaryMode;
use super::demux::EventStream;
use super::validation::{CaseLimits, CaseViolation};

/// Why an analysis request produced no record
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Validation(#[from] CaseViolation),

    #[error("request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("result could not be interpreted: {0}")]
    Assembly(#[from] AssemblyFailure),
}

impl AnalyzeError {
    /// Message shown to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Transport(e) => format!("Request failed: {}", e),
            Self::Assembly(e) => format!(
                "The analysis result could not be interpreted ({}). Please submit the case again.",
                e
            ),
        }
    }
}

/// Observable state of the analysis workflow
#[derive(Debug, Default)]
pub struct Session {
    limits: CaseLimits,
    boundary: BoundaryMode,
    timeout: Option<Duration>,

    current_case: Option<CaseInput>,
    current_analysis: Option<AnalysisRecord>,
    issues: Vec<ShapeIssue>,
    thinking: String,
    busy: bool,
    error: Option<String>,
}

impl Session {
    pub fn new(limits: CaseLimits, boundary: BoundaryMode) -> Self {
        Self {
            limits,
            boundary,
            ..Default::default()
        }
    }

    /// Abort requests that take longer than `timeout` end to end
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn current_case(&self) -> Option<&CaseInput> {
        self.current_case.as_ref()
    }

    pub fn current_analysis(&self) -> Option<&AnalysisRecord> {
        self.current_analysis.as_ref()
    }

    /// Shape issues reported with the current analysis
    pub fn issues(&self) -> &[ShapeIssue] {
        &self.issues
    }

    /// Reasoning text received so far, fragments concatenated in order
    pub fn thinking(&self) -> &str {
        &self.thinking
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// History entry for the current case, if one was submitted
    pub fn to_history_entry(&self) -> Option<HistoryEntry> {
        let case = self.current_case.clone()?;
        Some(HistoryEntry::new(case, self.current_analysis.clone()))
    }

    /// Mirror one event into the session state
    pub fn apply(&mut self, event: &AssemblyEvent) {
        match event {
            AssemblyEvent::ThinkingFragment(text) => {
                self.thinking.push_str(text);
            }
            AssemblyEvent::AnalysisReady { record, issues } => {
                self.current_analysis = Some(record.as_ref().clone());
                self.issues = issues.clone();
                self.busy = false;
                self.set_status(CaseStatus::Completed);
            }
            AssemblyEvent::AssemblyFailed(failure) => {
                self.fail(&AnalyzeError::Assembly(failure.clone()));
            }
        }
    }

    /// Validate, submit and stream one case.
    ///
    /// `on_event` sees every event right after it has been applied. The
    /// session is left idle on return, with either a current analysis or an
    /// error message set.
    #[instrument(skip_all, fields(case_id = %case.id, source = source.name()))]
    pub async fn analyze<F>(
        &mut self,
        source: &dyn CompletionSource,
        case: CaseInput,
        mut on_event: F,
    ) -> Result<(), AnalyzeError>
    where
        F: FnMut(&AssemblyEvent),
    {
        if let Err(violation) = self.limits.validate(&case) {
            tracing::debug!(%violation, "Case rejected before submission");
            let error = AnalyzeError::from(violation);
            self.begin(case);
            self.fail(&error);
            return Err(error);
        }

        self.begin(case.clone());
        let request = AnalysisRequest {
            case_content: case.content,
            subject_area: case.subject_area,
        };

        let outcome = match self.timeout {
            Some(limit) => {
                let drive = self.drive(source, &request, &mut on_event);
                match tokio::time::timeout(limit, drive).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(TransportError::Timeout(limit)),
                }
            }
            None => self.drive(source, &request, &mut on_event).await,
        };

        let result = match outcome {
            Ok(Some(AssemblyEvent::AnalysisReady { .. })) => Ok(()),
            Ok(Some(AssemblyEvent::AssemblyFailed(failure))) => Err(AnalyzeError::Assembly(failure)),
            Ok(_) => {
                let error = AnalyzeError::Assembly(AssemblyFailure::Empty);
                self.fail(&error);
                Err(error)
            }
            Err(transport) => {
                let error = AnalyzeError::Transport(transport);
                self.fail(&error);
                Err(error)
            }
        };

        match &result {
            Ok(()) => tracing::info!(issues = self.issues.len(), "Analysis completed"),
            Err(e) => tracing::warn!(error = %e, "Analysis failed"),
        }
        result
    }

    /// Pull events until the stream ends. Returns the terminal event, if any.
    async fn drive<F>(
        &mut self,
        source: &dyn CompletionSource,
        request: &AnalysisRequest,
        on_event: &mut F,
    ) -> Result<Option<AssemblyEvent>, TransportError>
    where
        F: FnMut(&AssemblyEvent),
    {
        let body = source.stream(request).await?;
        let mut events = EventStream::new(body, self.boundary);

        let mut terminal = None;
        while let Some(event) = events.next_event().await {
            let event = event?;
            self.apply(&event);
            on_event(&event);
            if event.is_terminal() {
                terminal = Some(event);
            }
        }
        Ok(terminal)
    }

    fn begin(&mut self, mut case: CaseInput) {
        case.status = CaseStatus::Analyzing;
        self.current_case = Some(case);
        self.current_analysis = None;
        self.issues.clear();
        self.thinking.clear();
        self.error = None;
        self.busy = true;
    }

    fn fail(&mut self, error: &AnalyzeError) {
        if !matches!(error, AnalyzeError::Assembly(_)) {
            // Nothing kept from the previous run or a broken stream is trusted
            self.thinking.clear();
            self.current_analysis = None;
            self.issues.clear();
        }
        self.error = Some(error.user_message());
        self.busy = false;
        self.set_status(CaseStatus::Error);
    }

    fn set_status(&mut self, status: CaseStatus) {
        if let Some(case) = self.current_case.as_mut() {
            case.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ChunkStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::StreamExt;

    /// Replays canned SSE lines, optionally failing after `fail_after` chunks
    struct Scripted {
        lines: Vec<String>,
        fail_after: Option<usize>,
    }

    impl Scripted {
        fn new(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|l| format!("{}\n", l)).collect(),
                fail_after: None,
            }
        }
    }

    #[async_trait]
    impl CompletionSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn stream(&self, _request: &AnalysisRequest) -> Result<ChunkStream, TransportError> {
            let mut chunks: Vec<Result<Bytes, TransportError>> = self
                .lines
                .iter()
                .map(|l| Ok(Bytes::from(l.clone())))
                .collect();
            if let Some(n) = self.fail_after {
                chunks.truncate(n);
                chunks.push(Err(TransportError::Stream("connection reset".into())));
            }
            Ok(futures::stream::iter(chunks).boxed())
        }
    }

    fn reasoning(text: &str) -> String {
        serde_json::json!({"choices": [{"delta": {"reasoning_content": text}}]}).to_string()
    }

    fn content(text: &str) -> String {
        serde_json::json!({"choices": [{"delta": {"content": text}}]}).to_string()
    }

    fn sse(payload: String) -> String {
        format!("data: {}", payload)
    }

    fn case() -> CaseInput {
        CaseInput::new("甲在商场内趁乙不备，将乙放在柜台上的手机拿走后离开。", None)
    }

    #[tokio::test]
    async fn test_successful_analysis() {
        let lines = [
            sse(reasoning("先看行为")),
            sse(reasoning("再看结果")),
            sse(content("{\"caseType\":\"盗窃\"}")),
            "data: [DONE]".to_string(),
        ];
        let source = Scripted::new(&lines.iter().map(String::as_str).collect::<Vec<_>>());
        let mut session = Session::default();
        let mut seen = Vec::new();

        session
            .analyze(&source, case(), |event| seen.push(event.clone()))
            .await
            .unwrap();

        assert_eq!(seen.len(), 3);
        assert_eq!(session.thinking(), "先看行为再看结果");
        assert_eq!(session.current_analysis().unwrap().case_type, "盗窃");
        assert!(!session.is_busy());
        assert!(session.error().is_none());
        assert_eq!(session.current_case().unwrap().status, CaseStatus::Completed);
        // Only caseType was supplied
        assert!(!session.issues().is_empty());
    }

    #[tokio::test]
    async fn test_validation_fails_before_request() {
        struct Unreachable;

        #[async_trait]
        impl CompletionSource for Unreachable {
            fn name(&self) -> &str {
                "unreachable"
            }
            async fn stream(&self, _: &AnalysisRequest) -> Result<ChunkStream, TransportError> {
                panic!("validation must run before the request");
            }
        }

        let mut session = Session::default();
        let result = session
            .analyze(&Unreachable, CaseInput::new("太短", None), |_| {})
            .await;

        assert!(matches!(result, Err(AnalyzeError::Validation(_))));
        assert!(session.error().is_some());
        assert_eq!(session.current_case().unwrap().content, "太短");
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_rejected_case_drops_previous_analysis() {
        let lines = [sse(reasoning("先分析")), sse(content("{\"caseType\":\"盗窃\"}"))];
        let source = Scripted::new(&lines.iter().map(String::as_str).collect::<Vec<_>>());
        let mut session = Session::default();
        session.analyze(&source, case(), |_| {}).await.unwrap();
        assert!(session.current_analysis().is_some());

        let result = session
            .analyze(&source, CaseInput::new("太短", None), |_| {})
            .await;

        assert!(matches!(result, Err(AnalyzeError::Validation(_))));
        assert!(session.current_analysis().is_none());
        assert!(session.issues().is_empty());
        assert!(session.thinking().is_empty());
        assert_eq!(session.current_case().unwrap().status, CaseStatus::Error);

        let entry = session.to_history_entry().unwrap();
        assert_eq!(entry.case.content, "太短");
        assert!(entry.analysis.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_discards_partial_state() {
        let lines = [sse(reasoning("一半")), sse(content("{\"caseType\":"))];
        let mut source = Scripted::new(&lines.iter().map(String::as_str).collect::<Vec<_>>());
        source.fail_after = Some(1);
        let mut session = Session::default();

        let result = session.analyze(&source, case(), |_| {}).await;

        let error = result.unwrap_err();
        assert!(matches!(error, AnalyzeError::Transport(_)));
        assert!(error.user_message().starts_with("Request failed"));
        assert_eq!(session.thinking(), "");
        assert!(session.current_analysis().is_none());
        assert_eq!(session.current_case().unwrap().status, CaseStatus::Error);
    }

    #[tokio::test]
    async fn test_empty_final_channel_is_a_failure() {
        let lines = [sse(reasoning("只有推理"))];
        let source = Scripted::new(&lines.iter().map(String::as_str).collect::<Vec<_>>());
        let mut session = Session::default();

        let result = session.analyze(&source, case(), |_| {}).await;

        assert!(matches!(
            result,
            Err(AnalyzeError::Assembly(AssemblyFailure::Empty))
        ));
        assert!(session.error().unwrap().contains("could not be interpreted"));
        assert_eq!(session.thinking(), "只有推理");
    }

    #[tokio::test]
    async fn test_unparsable_final_channel() {
        let lines = [sse(content("{ \"a\": "))];
        let source = Scripted::new(&lines.iter().map(String::as_str).collect::<Vec<_>>());
        let mut session = Session::default();

        let result = session.analyze(&source, case(), |_| {}).await;

        assert!(matches!(
            result,
            Err(AnalyzeError::Assembly(AssemblyFailure::Unparsable { .. }))
        ));
        assert!(session.current_analysis().is_none());
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_timeout_is_a_transport_failure() {
        struct Stalled;

        #[async_trait]
        impl CompletionSource for Stalled {
            fn name(&self) -> &str {
                "stalled"
            }
            async fn stream(&self, _: &AnalysisRequest) -> Result<ChunkStream, TransportError> {
                Ok(futures::stream::pending::<Result<Bytes, TransportError>>().boxed())
            }
        }

        let mut session = Session::default().with_timeout(Duration::from_millis(50));
        let result = session.analyze(&Stalled, case(), |_| {}).await;

        match result {
            Err(AnalyzeError::Transport(TransportError::Timeout(limit))) => {
                assert_eq!(limit, Duration::from_millis(50));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(session.error().unwrap().contains("50ms"));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_history_entry_from_session() {
        let mut session = Session::default();
        assert!(session.to_history_entry().is_none());

        session.begin(case());
        session.apply(&AssemblyEvent::AnalysisReady {
            record: Box::default(),
            issues: Vec::new(),
        });
        let entry = session.to_history_entry().unwrap();
        assert!(entry.analysis.is_some());
        assert_eq!(entry.case.status, CaseStatus::Completed);
    }
}
