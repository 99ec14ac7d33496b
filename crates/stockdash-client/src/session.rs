//! Task session: folds the streaming channel into a client view
//!
//! A session owns at most one live transport. Starting a new run
//! closes the previous transport first, creates a task over REST,
//! opens a transport for the returned id, and then folds delivered
//! events into an [`AnalysisView`] one step at a time. `Completed` and
//! `Failed` are terminal; events observed after a terminal state are
//! protocol violations and are logged, never applied.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::AnalysisBackend;
use crate::error::Result;
use crate::transport::{Transport, TransportEvent, TransportFactory};
use stockdash_models::{AgentMessage, AnalysisReport, AnalysisStatus, AnalysisTask, StatusPayload};

/// Lifecycle state of one analysis session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    /// Task created over REST; transport not yet open.
    Created,
    /// Transport open and folding events.
    Streaming,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Why a session ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The task could not be created; no transport was opened.
    Creation(String),
    /// The connection broke underneath the session.
    Transport(String),
    /// The agents reported failure over the channel.
    Agent(String),
}

/// Client-visible state of one analysis run
///
/// Owned exclusively by the session; consumers read it and never
/// write it.
#[derive(Debug, Clone, Default)]
pub struct AnalysisView {
    pub task: AnalysisTask,
    /// Append-only message log in arrival order.
    pub messages: Vec<AgentMessage>,
    /// Set once by a `completed` event, immutable afterwards.
    pub report: Option<AnalysisReport>,
    pub failure: Option<FailureKind>,
}

/// Outcome of driving the session one event forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    /// A non-terminal event was folded into the view.
    Applied,
    /// A terminal event was folded; the transport is closed.
    Terminal,
    /// No transport to read from (never started, stopped, or the
    /// channel drained without a terminal event).
    Closed,
}

/// State machine over one analysis task's event stream
pub struct TaskSession {
    backend: Arc<dyn AnalysisBackend>,
    transports: Arc<dyn TransportFactory>,
    analysis_type: String,
    state: SessionState,
    view: AnalysisView,
    transport: Option<Box<dyn Transport>>,
    next_sequence: u64,
}

impl TaskSession {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        transports: Arc<dyn TransportFactory>,
        analysis_type: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            transports,
            analysis_type: analysis_type.into(),
            state: SessionState::Idle,
            view: AnalysisView::default(),
            transport: None,
            next_sequence: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn view(&self) -> &AnalysisView {
        &self.view
    }

    /// Start a run for `stock_code`, closing any previous transport
    /// first so that at most one is ever live.
    ///
    /// A creation or connection failure moves the session to `Failed`
    /// (the failure kind is recorded on the view) and is also returned
    /// so callers can propagate it.
    pub async fn start(&mut self, stock_code: &str) -> Result<()> {
        self.close_transport().await;
        self.view = AnalysisView::default();
        self.next_sequence = 0;
        self.state = SessionState::Idle;

        let handle = match self
            .backend
            .create_task(stock_code, &self.analysis_type)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                self.state = SessionState::Failed;
                self.view.task.status = AnalysisStatus::Failed;
                self.view.failure = Some(FailureKind::Creation(e.to_string()));
                return Err(e);
            }
        };

        debug!(task_id = %handle.task_id, "analysis task created");
        self.view.task = AnalysisTask {
            id: handle.task_id,
            status: handle.status,
            progress: handle.progress,
        };
        self.state = SessionState::Created;

        match self.transports.open(&self.view.task.id).await {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = SessionState::Streaming;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                self.view.task.status = AnalysisStatus::Failed;
                self.view.failure = Some(FailureKind::Transport(e.to_string()));
                Err(e)
            }
        }
    }

    /// Pull one event from the transport and fold it into the view.
    pub async fn step(&mut self) -> SessionStep {
        if self.transport.is_none() {
            return SessionStep::Closed;
        }
        let event = match self.transport.as_mut() {
            Some(transport) => transport.next_event().await,
            None => None,
        };
        match event {
            Some(event) => self.apply(event).await,
            None => {
                // Channel drained without a terminal event. The
                // session stays `Streaming`; only an explicit stop or
                // a new start changes that.
                self.transport = None;
                SessionStep::Closed
            }
        }
    }

    /// Drive the session until a terminal event or channel close.
    pub async fn run(&mut self) -> &AnalysisView {
        loop {
            match self.step().await {
                SessionStep::Applied => {}
                SessionStep::Terminal | SessionStep::Closed => break,
            }
        }
        &self.view
    }

    /// Close the transport regardless of state. Idempotent.
    pub async fn stop(&mut self) {
        self.close_transport().await;
    }

    async fn close_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
    }

    pub(crate) async fn apply(&mut self, event: TransportEvent) -> SessionStep {
        if self.state.is_terminal() {
            warn!(?event, state = ?self.state, "event after terminal state; ignoring");
            return SessionStep::Terminal;
        }

        match event {
            TransportEvent::Status(payload) => self.apply_status(payload),
            TransportEvent::AgentMessage { agent, content } => {
                self.view.messages.push(AgentMessage {
                    role: agent,
                    content,
                    sequence: self.next_sequence,
                });
                self.next_sequence += 1;
            }
            TransportEvent::Progress(progress) => {
                if !(0.0..=100.0).contains(&progress) {
                    warn!(progress, "progress outside [0, 100]; applying as delivered");
                }
                self.view.task.progress = progress;
            }
            TransportEvent::Completed(report) => {
                self.view.report = Some(report);
                self.view.task.status = AnalysisStatus::Completed;
                self.state = SessionState::Completed;
                self.close_transport().await;
                return SessionStep::Terminal;
            }
            TransportEvent::Error(message) => {
                self.view.failure = Some(FailureKind::Agent(message));
                self.view.task.status = AnalysisStatus::Failed;
                self.state = SessionState::Failed;
                self.close_transport().await;
                return SessionStep::Terminal;
            }
            TransportEvent::TransportFailed(message) => {
                self.view.failure = Some(FailureKind::Transport(message));
                self.view.task.status = AnalysisStatus::Failed;
                self.state = SessionState::Failed;
                self.close_transport().await;
                return SessionStep::Terminal;
            }
        }
        SessionStep::Applied
    }

    fn apply_status(&mut self, payload: StatusPayload) {
        // Status dumps replace the status fields but never progress;
        // progress only moves on dedicated progress events.
        if let Some(task_id) = payload.task_id {
            self.view.task.id = task_id;
        }
        if let Some(status) = payload.status {
            self.view.task.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockAnalysisBackend;
    use crate::error::ClientError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stockdash_models::{AgentRole, TaskHandle};

    /// Transport that replays a fixed script of events.
    struct ScriptedTransport {
        events: VecDeque<TransportEvent>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn next_event(&mut self) -> Option<TransportEvent> {
            self.events.pop_front()
        }

        async fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Factory handing out scripted transports and tracking closes
    /// per opened transport.
    struct ScriptedFactory {
        scripts: Mutex<VecDeque<Vec<TransportEvent>>>,
        closes: Mutex<Vec<Arc<AtomicUsize>>>,
    }

    impl ScriptedFactory {
        fn new(scripts: Vec<Vec<TransportEvent>>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                closes: Mutex::new(Vec::new()),
            })
        }

        fn close_count(&self, index: usize) -> usize {
            self.closes.lock().expect("lock")[index].load(Ordering::SeqCst)
        }

        fn opened(&self) -> usize {
            self.closes.lock().expect("lock").len()
        }
    }

    #[async_trait]
    impl TransportFactory for ScriptedFactory {
        async fn open(&self, _task_id: &str) -> Result<Box<dyn Transport>> {
            let events = self
                .scripts
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_default();
            let closes = Arc::new(AtomicUsize::new(0));
            self.closes.lock().expect("lock").push(Arc::clone(&closes));
            Ok(Box::new(ScriptedTransport {
                events: events.into(),
                closes,
            }))
        }
    }

    fn backend_ok() -> Arc<MockAnalysisBackend> {
        let mut backend = MockAnalysisBackend::new();
        backend.expect_create_task().returning(|_, _| {
            Ok(TaskHandle {
                task_id: "t1".to_string(),
                status: AnalysisStatus::Pending,
                progress: 0.0,
            })
        });
        Arc::new(backend)
    }

    fn message(content: &str) -> TransportEvent {
        TransportEvent::AgentMessage {
            agent: AgentRole::Technical,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn happy_path_folds_into_completed_view() {
        let factory = ScriptedFactory::new(vec![vec![
            TransportEvent::Progress(10.0),
            message("MACD turning up"),
            TransportEvent::Progress(55.0),
            TransportEvent::Completed(AnalysisReport {
                stock_code: "600519".to_string(),
                ..AnalysisReport::default()
            }),
        ]]);
        let mut session = TaskSession::new(backend_ok(), factory.clone(), "comprehensive");

        session.start("600519").await.expect("start");
        assert_eq!(session.state(), SessionState::Streaming);

        let view = session.run().await;
        assert_eq!(view.task.id, "t1");
        assert_eq!(view.task.status, AnalysisStatus::Completed);
        assert_eq!(view.task.progress, 55.0);
        assert_eq!(view.messages.len(), 1);
        assert!(view.report.is_some());
        assert!(view.failure.is_none());
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(factory.close_count(0), 1);
    }

    #[tokio::test]
    async fn sequence_numbers_are_gapless_across_interleaved_events() {
        let factory = ScriptedFactory::new(vec![vec![
            TransportEvent::Status(StatusPayload {
                status: Some(AnalysisStatus::Running),
                ..StatusPayload::default()
            }),
            message("first"),
            TransportEvent::Progress(20.0),
            message("second"),
            TransportEvent::Status(StatusPayload::default()),
            TransportEvent::Progress(80.0),
            message("third"),
            TransportEvent::Completed(AnalysisReport::default()),
        ]]);
        let mut session = TaskSession::new(backend_ok(), factory, "comprehensive");

        session.start("600519").await.expect("start");
        let view = session.run().await;

        let sequences: Vec<u64> = view.messages.iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn second_start_closes_first_transport_exactly_once() {
        let factory = ScriptedFactory::new(vec![
            vec![TransportEvent::Progress(10.0)],
            vec![TransportEvent::Completed(AnalysisReport::default())],
        ]);
        let mut session = TaskSession::new(backend_ok(), factory.clone(), "comprehensive");

        session.start("600519").await.expect("start");
        assert_eq!(session.step().await, SessionStep::Applied);

        session.start("000001").await.expect("restart");
        assert_eq!(factory.opened(), 2);
        assert_eq!(factory.close_count(0), 1);
        assert_eq!(factory.close_count(1), 0);

        // The view was reset for the new run.
        assert_eq!(session.view().task.progress, 0.0);
        assert!(session.view().messages.is_empty());
    }

    #[tokio::test]
    async fn domain_error_moves_to_failed_with_agent_marker() {
        let factory = ScriptedFactory::new(vec![vec![
            TransportEvent::Progress(30.0),
            TransportEvent::Error("model unavailable".to_string()),
        ]]);
        let mut session = TaskSession::new(backend_ok(), factory.clone(), "comprehensive");

        session.start("600519").await.expect("start");
        session.run().await;

        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(
            session.view().failure,
            Some(FailureKind::Agent("model unavailable".to_string()))
        );
        assert_eq!(factory.close_count(0), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_distinguishable_from_agent_error() {
        let factory = ScriptedFactory::new(vec![vec![TransportEvent::TransportFailed(
            "connection reset".to_string(),
        )]]);
        let mut session = TaskSession::new(backend_ok(), factory, "comprehensive");

        session.start("600519").await.expect("start");
        session.run().await;

        assert_eq!(session.state(), SessionState::Failed);
        assert!(matches!(
            session.view().failure,
            Some(FailureKind::Transport(_))
        ));
    }

    #[tokio::test]
    async fn creation_failure_fails_locally_without_opening_transport() {
        let mut backend = MockAnalysisBackend::new();
        backend
            .expect_create_task()
            .returning(|_, _| Err(ClientError::TaskCreation("stock not found".to_string())));
        let factory = ScriptedFactory::new(vec![]);
        let mut session = TaskSession::new(Arc::new(backend), factory.clone(), "comprehensive");

        let result = session.start("999999").await;
        assert!(result.is_err());
        assert_eq!(session.state(), SessionState::Failed);
        assert!(matches!(
            session.view().failure,
            Some(FailureKind::Creation(_))
        ));
        assert_eq!(factory.opened(), 0);
    }

    #[tokio::test]
    async fn events_after_terminal_state_are_ignored() {
        let factory = ScriptedFactory::new(vec![vec![TransportEvent::Completed(
            AnalysisReport::default(),
        )]]);
        let mut session = TaskSession::new(backend_ok(), factory, "comprehensive");

        session.start("600519").await.expect("start");
        session.run().await;
        let report = session.view().report.clone();

        // Late events are protocol violations; nothing may change.
        session.apply(message("late")).await;
        session.apply(TransportEvent::Progress(99.0)).await;
        session
            .apply(TransportEvent::Error("late failure".to_string()))
            .await;

        assert_eq!(session.state(), SessionState::Completed);
        assert!(session.view().messages.is_empty());
        assert_eq!(session.view().task.progress, 0.0);
        assert_eq!(session.view().report, report);
        assert!(session.view().failure.is_none());
    }

    #[tokio::test]
    async fn status_replaces_status_but_preserves_progress() {
        let factory = ScriptedFactory::new(vec![vec![
            TransportEvent::Progress(42.0),
            TransportEvent::Status(StatusPayload {
                task_id: None,
                status: Some(AnalysisStatus::Running),
                progress: Some(5.0),
            }),
        ]]);
        let mut session = TaskSession::new(backend_ok(), factory, "comprehensive");

        session.start("600519").await.expect("start");
        assert_eq!(session.step().await, SessionStep::Applied);
        assert_eq!(session.step().await, SessionStep::Applied);

        assert_eq!(session.view().task.status, AnalysisStatus::Running);
        assert_eq!(session.view().task.progress, 42.0);
    }

    #[tokio::test]
    async fn out_of_range_progress_passes_through() {
        let factory = ScriptedFactory::new(vec![vec![TransportEvent::Progress(130.0)]]);
        let mut session = TaskSession::new(backend_ok(), factory, "comprehensive");

        session.start("600519").await.expect("start");
        session.step().await;
        assert_eq!(session.view().task.progress, 130.0);
    }

    #[tokio::test]
    async fn drained_channel_leaves_session_streaming() {
        let factory = ScriptedFactory::new(vec![vec![TransportEvent::Progress(10.0)]]);
        let mut session = TaskSession::new(backend_ok(), factory, "comprehensive");

        session.start("600519").await.expect("start");
        assert_eq!(session.step().await, SessionStep::Applied);
        assert_eq!(session.step().await, SessionStep::Closed);
        assert_eq!(session.state(), SessionState::Streaming);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let factory = ScriptedFactory::new(vec![vec![TransportEvent::Progress(10.0)]]);
        let mut session = TaskSession::new(backend_ok(), factory.clone(), "comprehensive");

        session.start("600519").await.expect("start");
        session.stop().await;
        session.stop().await;

        assert_eq!(factory.close_count(0), 1);
        assert_eq!(session.step().await, SessionStep::Closed);
    }
}
