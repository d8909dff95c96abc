//! Template fallback texts
//!
//! Deterministic prose used whenever the response drafter fails or
//! deadlines. Kept short and channel-neutral; SMS length limits are the
//! CRM's concern.

use leadflow_core::lead::Tone;
use leadflow_core::workflow::{BuyerNode, NurtureTouch, SellerQuestion};

/// The seller qualification script, one question per pillar
pub fn seller_question(question: SellerQuestion) -> &'static str {
    match question {
        SellerQuestion::Motivation => "What's got you thinking about selling right now?",
        SellerQuestion::Timeline => {
            "If everything lined up, when would you want this closed and done?"
        }
        SellerQuestion::Condition => {
            "How's the condition of the place — anything a buyer would flag on a walkthrough?"
        }
        SellerQuestion::Price => {
            "Do you have a number in mind that would make this worth doing?"
        }
    }
}

/// Seller terminal and tone-shift templates
pub fn seller_qualified() -> &'static str {
    "You're clearly ready to move on this. Let me get you in front of the right person today — \
     when's a good time for a quick call?"
}

pub fn seller_take_away() -> &'static str {
    "It sounds like this may not be the right time for you, and that's completely fine. \
     If things change, you know where to find me."
}

pub fn seller_disengage() -> &'static str {
    "No pressure at all — I'll step back here. If selling ever moves up your list, \
     reach out and we'll pick this right up."
}

/// Buyer node prompts
pub fn buyer_prompt(node: BuyerNode) -> &'static str {
    match node {
        BuyerNode::Discovery => {
            "Tell me a bit about what you're looking for — what's driving the move?"
        }
        BuyerNode::FinancialReadiness => {
            "Have you spoken with a lender yet, or would a pre-approval be the next step?"
        }
        BuyerNode::Preferences => {
            "What matters most — beds, neighborhood, schools, commute? Give me your top three."
        }
        BuyerNode::PropertyMatch => {
            "Based on that, I can pull a short list that actually fits. Want me to send it over?"
        }
        BuyerNode::NextAction => {
            "Want to pick two or three of those and go see them this week?"
        }
        BuyerNode::Closing => {
            "You're in a great position to move fast. Let's lock in a showing schedule today."
        }
    }
}

/// Nurture touch templates, keyed by touchpoint
pub fn nurture_touch(touch: NurtureTouch, lead_name: Option<&str>) -> String {
    let name = lead_name.unwrap_or("there");
    match touch {
        NurtureTouch::Day3 => format!(
            "Hi {name}, checking in on your property search. Any questions about the market \
             I can answer?"
        ),
        NurtureTouch::Day7 => format!(
            "Hi {name}, I'd love to catch up for a few minutes by phone — is today or \
             tomorrow better?"
        ),
        NurtureTouch::Day14 => format!(
            "Hi {name}, a few homes moved in your area this week. Want the quick rundown?"
        ),
        NurtureTouch::Day30 => format!(
            "Hi {name}, I put together a fresh market analysis for your situation. \
             Worth a look before you decide anything."
        ),
    }
}

pub fn nurture_re_engagement(lead_name: Option<&str>) -> String {
    let name = lead_name.unwrap_or("there");
    format!(
        "Hi {name}, I noticed we lost a bit of momentum — no problem at all. \
         Can I call you tomorrow to see where things stand?"
    )
}

pub fn nurture_disengage(lead_name: Option<&str>) -> String {
    let name = lead_name.unwrap_or("there");
    format!(
        "Hi {name}, I'll stop filling your inbox. If the market or your plans change, \
         I'm one message away."
    )
}

/// Prospecting reply when the gate does not pass yet
pub fn prospecting_continue(lead_name: Option<&str>) -> String {
    let name = lead_name.unwrap_or("there");
    format!("Thanks {name} — good to hear from you. What's changed since we last spoke?")
}

/// Generic fallback when nothing more specific applies
pub fn generic_fallback(tone: Tone) -> &'static str {
    match tone {
        Tone::Warm => "Thanks for the message — tell me a little more so I can point you the right way.",
        Tone::Direct => "Got it. What's the next piece of information you need from me?",
        Tone::Confrontational => "Help me understand what's really holding this up.",
        Tone::TakeAway => "No pressure from my side — the door stays open whenever you're ready.",
    }
}
