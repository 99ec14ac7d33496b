//! Streaming channel message envelope
//!
//! The analysis channel speaks JSON envelopes discriminated by a
//! `type` field. Exactly five kinds exist; `completed` and `error` are
//! terminal for the stream that carries them.

use serde::{Deserialize, Serialize};

use crate::analysis::{AgentRole, AnalysisReport, AnalysisStatus};

/// Full or partial task status carried by a `status` envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub task_id: Option<String>,
    pub status: Option<AnalysisStatus>,
    /// Present in full task dumps; the session ignores it and only
    /// applies progress from dedicated `progress` envelopes.
    pub progress: Option<f64>,
}

/// One message on the analysis streaming channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Status { data: StatusPayload },
    AgentMessage { agent: AgentRole, content: String },
    Progress { progress: f64 },
    Completed { data: AnalysisReport },
    Error { message: String },
}
