//! Analysis task, agent message, and report types

use serde::{Deserialize, Serialize};

/// Role of an agent participating in a multi-agent analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Fundamental,
    Sentiment,
    News,
    Technical,
    Researcher,
    Trader,
    RiskManager,
}

impl AgentRole {
    /// Wire key for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fundamental => "fundamental",
            Self::Sentiment => "sentiment",
            Self::News => "news",
            Self::Technical => "technical",
            Self::Researcher => "researcher",
            Self::Trader => "trader",
            Self::RiskManager => "risk_manager",
        }
    }

    /// Human-readable label for display surfaces
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fundamental => "Fundamental Analyst",
            Self::Sentiment => "Sentiment Analyst",
            Self::News => "News Analyst",
            Self::Technical => "Technical Analyst",
            Self::Researcher => "Researcher",
            Self::Trader => "Trader",
            Self::RiskManager => "Risk Manager",
        }
    }
}

/// Lifecycle status of one analysis task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// One server-side analysis run as seen by the client
///
/// Created when a session starts and mutated only by the session in
/// response to transport events. Progress is stored exactly as
/// delivered; the protocol does not promise monotonic or in-range
/// values and none are enforced here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisTask {
    pub id: String,
    pub status: AnalysisStatus,
    /// Percent in [0, 100] by contract, passed through unclamped.
    pub progress: f64,
}

/// Response of the task-creation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
    #[serde(default)]
    pub status: AnalysisStatus,
    #[serde(default)]
    pub progress: f64,
}

/// One streamed agent utterance, append-only in the session log
///
/// `sequence` is the arrival order assigned by the session: strictly
/// increasing and gapless within one session, never reassigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: AgentRole,
    pub content: String,
    pub sequence: u64,
}

/// Terminal artifact of a completed analysis
///
/// Immutable once set on a session; every analytical field is optional
/// because the agents may skip dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub stock_code: String,
    #[serde(default)]
    pub stock_name: String,

    // Per-agent analysis texts
    pub fundamental_analysis: Option<String>,
    pub sentiment_analysis: Option<String>,
    pub news_analysis: Option<String>,
    pub technical_analysis: Option<String>,

    // Synthesis
    pub research_summary: Option<String>,
    pub trading_decision: Option<String>,
    pub risk_assessment: Option<String>,

    // Scores, 0-100 per dimension
    pub fundamental_score: Option<u8>,
    pub sentiment_score: Option<u8>,
    pub technical_score: Option<u8>,

    // Recommendation
    pub recommendation: Option<String>,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_role_wire_keys() {
        let role: AgentRole = serde_json::from_str("\"risk_manager\"").expect("decode");
        assert_eq!(role, AgentRole::RiskManager);
        assert_eq!(role.as_str(), "risk_manager");

        let json = serde_json::to_string(&AgentRole::Fundamental).expect("encode");
        assert_eq!(json, "\"fundamental\"");
    }

    #[test]
    fn task_handle_defaults() {
        let handle: TaskHandle = serde_json::from_str(r#"{"task_id":"t1"}"#).expect("decode");
        assert_eq!(handle.task_id, "t1");
        assert_eq!(handle.status, AnalysisStatus::Pending);
        assert_eq!(handle.progress, 0.0);
    }

    #[test]
    fn report_tolerates_sparse_payload() {
        let report: AnalysisReport = serde_json::from_str(
            r#"{"stock_code":"600519","research_summary":"hold","technical_score":72}"#,
        )
        .expect("decode");
        assert_eq!(report.stock_code, "600519");
        assert_eq!(report.research_summary.as_deref(), Some("hold"));
        assert_eq!(report.technical_score, Some(72));
        assert!(report.target_price.is_none());
    }
}
