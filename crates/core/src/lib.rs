//! Core types for the lead engagement orchestrator
//!
//! This crate provides foundational types used across all other crates:
//! - Conversation turns and inbound message envelopes
//! - Lead classification and workflow kinds
//! - Intent scoring types (FRS, PCS, incremental updates)
//! - Outbound plans and side-effect actions
//! - Orchestration events and the event bus
//! - Collaborator traits (CRM, response drafter, CMA, journey predictor)
//! - Error types

pub mod conversation;
pub mod error;
pub mod events;
pub mod lead;
pub mod plan;
pub mod scoring;
pub mod traits;
pub mod workflow;

pub use conversation::{InboundMessage, RawMessage, Turn, TurnRole};
pub use error::{Error, Result};
pub use events::{EventBus, EventKind, OrchestrationEvent};
pub use lead::{Channel, Classification, EmotionalState, EmotionalTransition, LeadKind, Tone};
pub use plan::{ActionStatus, OutboundAction, OutboundPlan, PlannedAction};
pub use scoring::{
    FinancialReadiness, IncrementalUpdate, IntentProfile, IntentSignal, PsychologicalCommitment,
    RecommendedAction, ScoreSnapshot, StallKind, Trajectory, TrajectoryForecast,
};
pub use traits::{
    CmaGenerator, CmaReport, CollaboratorError, Contact, CrmClient, DraftContext, DraftedResponse,
    JourneyPrediction, JourneyPredictor, ResponseDrafter, SendOutcome,
};
pub use workflow::{
    BuyerNode, BuyerState, NurtureOutcome, NurtureState, NurtureTouch, ProspectingState,
    SellerOutcome, SellerQuestion, SellerState, WorkflowKind, WorkflowState,
};
