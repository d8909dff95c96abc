//! Workflow kinds and per-workflow state machines
//!
//! Every bot workflow is a typed state machine. The variants here are the
//! closed set of positions a session can be in; the transition logic lives in
//! the workflows crate. States are serialized into the session so a lead
//! resumes exactly where the previous inbound left it.

use serde::{Deserialize, Serialize};

use crate::lead::Tone;

/// The bot workflow responsible for a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    SellerQualify,
    BuyerQualify,
    #[default]
    NurtureSequence,
    OutboundProspecting,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::SellerQualify => "seller-qualify",
            WorkflowKind::BuyerQualify => "buyer-qualify",
            WorkflowKind::NurtureSequence => "nurture-sequence",
            WorkflowKind::OutboundProspecting => "outbound-prospecting",
        }
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The four-question seller qualification script, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerQuestion {
    Motivation,
    Timeline,
    Condition,
    Price,
}

impl SellerQuestion {
    pub const SCRIPT: [SellerQuestion; 4] = [
        SellerQuestion::Motivation,
        SellerQuestion::Timeline,
        SellerQuestion::Condition,
        SellerQuestion::Price,
    ];

    pub fn next(&self) -> Option<SellerQuestion> {
        match self {
            SellerQuestion::Motivation => Some(SellerQuestion::Timeline),
            SellerQuestion::Timeline => Some(SellerQuestion::Condition),
            SellerQuestion::Condition => Some(SellerQuestion::Price),
            SellerQuestion::Price => None,
        }
    }
}

/// Terminal outcomes of the seller-qualify workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerOutcome {
    Qualified,
    Disengaged,
}

/// Seller-qualify workflow state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerState {
    /// Index into the fixed question script; 4 means all answered
    pub question_index: usize,
    /// Question the last outbound asked, answered by the next inbound
    pub waiting_for: Option<SellerQuestion>,
    pub tone: Tone,
    pub stall_breaker_attempted: bool,
    pub consecutive_stalls: u32,
    pub terminal: Option<SellerOutcome>,
}

impl Default for SellerState {
    fn default() -> Self {
        Self {
            question_index: 0,
            waiting_for: None,
            tone: Tone::Direct,
            stall_breaker_attempted: false,
            consecutive_stalls: 0,
            terminal: None,
        }
    }
}

impl SellerState {
    pub fn current_question(&self) -> Option<SellerQuestion> {
        SellerQuestion::SCRIPT.get(self.question_index).copied()
    }

    pub fn all_answered(&self) -> bool {
        self.question_index >= SellerQuestion::SCRIPT.len()
    }
}

/// Nodes of the buyer-qualify workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuyerNode {
    #[default]
    Discovery,
    FinancialReadiness,
    Preferences,
    PropertyMatch,
    NextAction,
    /// Terminal: hot, pre-approved, <=30 day timeline
    Closing,
}

impl BuyerNode {
    pub fn next(&self) -> Option<BuyerNode> {
        match self {
            BuyerNode::Discovery => Some(BuyerNode::FinancialReadiness),
            BuyerNode::FinancialReadiness => Some(BuyerNode::Preferences),
            BuyerNode::Preferences => Some(BuyerNode::PropertyMatch),
            BuyerNode::PropertyMatch => Some(BuyerNode::NextAction),
            BuyerNode::NextAction | BuyerNode::Closing => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuyerNode::Discovery => "discovery",
            BuyerNode::FinancialReadiness => "financial_readiness",
            BuyerNode::Preferences => "preferences",
            BuyerNode::PropertyMatch => "property_match",
            BuyerNode::NextAction => "next_action",
            BuyerNode::Closing => "closing",
        }
    }
}

/// Buyer-qualify workflow state
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuyerState {
    pub node: BuyerNode,
    /// Lead stated they hold a mortgage pre-approval
    pub pre_approved: bool,
    /// Shortest purchase timeline mentioned, in days
    pub timeline_days: Option<i64>,
    /// Budget figure extracted from conversation
    pub budget: Option<f64>,
}

/// Scheduled nurture touchpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NurtureTouch {
    #[default]
    Day3,
    Day7,
    Day14,
    Day30,
}

impl NurtureTouch {
    pub fn next(&self) -> Option<NurtureTouch> {
        match self {
            NurtureTouch::Day3 => Some(NurtureTouch::Day7),
            NurtureTouch::Day7 => Some(NurtureTouch::Day14),
            NurtureTouch::Day14 => Some(NurtureTouch::Day30),
            NurtureTouch::Day30 => None,
        }
    }

    /// Nominal day offset of this touch
    pub fn nominal_day(&self) -> i64 {
        match self {
            NurtureTouch::Day3 => 3,
            NurtureTouch::Day7 => 7,
            NurtureTouch::Day14 => 14,
            NurtureTouch::Day30 => 30,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NurtureTouch::Day3 => "day_3",
            NurtureTouch::Day7 => "day_7",
            NurtureTouch::Day14 => "day_14",
            NurtureTouch::Day30 => "day_30",
        }
    }
}

/// Terminal outcomes of the nurture sequence at day 30
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NurtureOutcome {
    QualifyHandoff,
    ContinueNurture,
    GracefulDisengage,
}

impl NurtureOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NurtureOutcome::QualifyHandoff => "qualify-handoff",
            NurtureOutcome::ContinueNurture => "continue-nurture",
            NurtureOutcome::GracefulDisengage => "graceful-disengage",
        }
    }
}

/// Nurture-sequence workflow state
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NurtureState {
    pub next_touch: NurtureTouch,
    pub touches_sent: u32,
    /// Set once the day-30 decision has been made
    pub outcome: Option<NurtureOutcome>,
    /// Early-warning escalation fired (score decline while still warm)
    pub re_engagement_triggered: bool,
}

/// Outbound-prospecting workflow state
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProspectingState {
    /// The prospect has been enrolled into a nurture cadence
    pub enrolled: bool,
    pub replies_seen: u32,
    /// Result of the last qualification-gate evaluation
    pub gate_passed: Option<bool>,
}

/// Closed union of all workflow states a session can hold
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "workflow", rename_all = "kebab-case")]
pub enum WorkflowState {
    SellerQualify(SellerState),
    BuyerQualify(BuyerState),
    NurtureSequence(NurtureState),
    OutboundProspecting(ProspectingState),
}

impl WorkflowState {
    /// Fresh initial state for a workflow kind (used on first contact and on
    /// handoff, which always resets rather than migrating mid-flow)
    pub fn initial(kind: WorkflowKind) -> Self {
        match kind {
            WorkflowKind::SellerQualify => WorkflowState::SellerQualify(SellerState::default()),
            WorkflowKind::BuyerQualify => WorkflowState::BuyerQualify(BuyerState::default()),
            WorkflowKind::NurtureSequence => WorkflowState::NurtureSequence(NurtureState::default()),
            WorkflowKind::OutboundProspecting => {
                WorkflowState::OutboundProspecting(ProspectingState::default())
            }
        }
    }

    pub fn kind(&self) -> WorkflowKind {
        match self {
            WorkflowState::SellerQualify(_) => WorkflowKind::SellerQualify,
            WorkflowState::BuyerQualify(_) => WorkflowKind::BuyerQualify,
            WorkflowState::NurtureSequence(_) => WorkflowKind::NurtureSequence,
            WorkflowState::OutboundProspecting(_) => WorkflowKind::OutboundProspecting,
        }
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        WorkflowState::initial(WorkflowKind::default())
    }
}
