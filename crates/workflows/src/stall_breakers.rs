//! Stall-breaking prompts
//!
//! One fixed line per stall kind, delivered in the confrontational tone.
//! The drafter weaves the line into its reply; the line itself is also the
//! template fallback when drafting is degraded.

use leadflow_core::scoring::StallKind;

/// Stall-breaker line for a detected stall kind. `None` for no stall.
pub fn stall_breaker_for(kind: StallKind) -> Option<&'static str> {
    match kind {
        StallKind::None => None,
        StallKind::Thinking => Some(
            "What specifically do you need to think through? Usually when someone says that, \
             something didn't sit right — what was it?",
        ),
        StallKind::PriceObjection => Some(
            "Let's be straight with each other — if the number worked, would you move forward \
             this week?",
        ),
        StallKind::ZestimateFixation => Some(
            "Zillow has never walked through your house. Want a number based on what actually \
             sold on your street?",
        ),
        StallKind::AgentConflict => Some(
            "Fair enough — but if your current agent had this handled, would we be talking \
             right now?",
        ),
        StallKind::Busy => Some(
            "I only need ninety seconds. What works better today — morning or afternoon?",
        ),
        StallKind::MaybeLater => Some(
            "Later usually turns into never. What would have to change for this to be a yes \
             now instead of later?",
        ),
    }
}
