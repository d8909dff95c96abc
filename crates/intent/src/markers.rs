//! Fixed keyword tables shared by the decoder and the real-time updater
//!
//! Tables are data, not code: each is a static slice scanned against
//! lowercased message text. Matching is plain substring containment; the
//! marker sets are phrased to keep false positives rare.

/// Life-event motivation markers, weight +30 each
pub const LIFE_EVENT_MARKERS: &[&str] = &[
    "divorce",
    "relocat",
    "job loss",
    "lost my job",
    "death in",
    "passed away",
    "inherited",
    "foreclos",
    "new baby",
];

/// Urgency motivation markers, weight +20 each
pub const URGENCY_MARKERS: &[&str] = &[
    "asap",
    "immediately",
    "urgent",
    "right away",
    "need to sell",
    "have to sell",
    "must sell",
    "fast",
    "as soon as",
];

/// Commitment motivation markers, weight +15 each
pub const COMMITMENT_MARKERS: &[&str] = &[
    "definitely",
    "absolutely",
    "committed",
    "ready",
    "decision maker",
    "let's do it",
    "lets do it",
];

/// Curiosity-only markers, weight -20 each
pub const CURIOSITY_MARKERS: &[&str] = &[
    "just curious",
    "browsing",
    "just looking",
    "not really looking",
    "no rush",
    "window shopping",
];

/// Condition: acknowledged-defect markers, +15 each
pub const DEFECT_MARKERS: &[&str] = &[
    "needs work",
    "needs repairs",
    "fixer",
    "roof",
    "foundation",
    "outdated",
    "as-is",
    "as is",
    "hvac",
];

/// Condition: realistic-language markers, +10 each
pub const CONDITION_REALISM_MARKERS: &[&str] = &[
    "realistic",
    "fair condition",
    "some wear",
    "move-in ready",
    "well maintained",
];

/// Condition: unrealistic claims, -25 each
pub const CONDITION_UNREALISTIC_MARKERS: &[&str] =
    &["perfect condition", "nothing wrong", "flawless"];

/// Price: comparable-sales awareness, +15 each
pub const COMPS_MARKERS: &[&str] = &["comps", "comparable", "sold for", "recently sold"];

/// Price: third-party automated valuation fixation
pub const ZESTIMATE_MARKERS: &[&str] = &["zestimate", "zillow", "online estimate", "redfin says"];

/// Buyer intent keywords
pub const BUYER_KEYWORDS: &[&str] = &[
    "buy",
    "buying",
    "purchase",
    "looking for a home",
    "house hunting",
    "pre-approved",
    "preapproved",
    "first home",
    "mortgage",
    "down payment",
];

/// Seller intent keywords
pub const SELLER_KEYWORDS: &[&str] = &[
    "sell",
    "selling",
    "list my",
    "listing",
    "my house",
    "my home",
    "home worth",
    "equity",
    "what's it worth",
];

/// Domain nouns that make a question substantive
pub const DOMAIN_NOUNS: &[&str] = &[
    "price",
    "bedroom",
    "neighborhood",
    "school",
    "financing",
    "closing",
    "mortgage",
    "commission",
];

/// Objection markers
pub const OBJECTION_MARKERS: &[&str] = &[
    "too expensive",
    "too low",
    "not worth",
    "i'm worried",
    "concerned about",
    "don't trust",
    "too high",
    "can't afford",
];

/// Agreement markers that overcome a prior objection
pub const AGREEMENT_MARKERS: &[&str] = &[
    "makes sense",
    "good point",
    "you're right",
    "fair enough",
    "that works",
    "i understand",
    "sounds good",
];

/// Call/tour acceptance markers
pub const CALL_ACCEPTANCE_MARKERS: &[&str] = &[
    "call me",
    "give me a call",
    "schedule a call",
    "schedule a showing",
    "book a tour",
    "tour works",
    "let's talk",
    "lets talk",
];

/// Cash-readiness markers (real-time FRS boost, +8)
pub const CASH_READY_MARKERS: &[&str] = &[
    "cash",
    "liquid",
    "funds available",
    "pre-approved",
    "preapproved",
];

/// Weak-commitment markers (real-time PCS penalty, -5)
pub const WEAK_COMMITMENT_MARKERS: &[&str] =
    &["maybe", "possibly", "not sure", "depends", "we'll see"];

/// Condition-flexibility markers (real-time signal)
pub const CONDITION_FLEX_MARKERS: &[&str] = &["as-is", "as is", "flexible", "open to", "negotiable"];

/// Emotional-state markers
pub const EXCITED_MARKERS: &[&str] =
    &["excited", "love it", "perfect for us", "dream home", "amazing", "can't wait"];
pub const FRUSTRATED_MARKERS: &[&str] =
    &["frustrated", "tired of", "stressed", "fed up", "this is exhausting"];
pub const SKEPTICAL_MARKERS: &[&str] =
    &["doubt", "skeptical", "hesitant", "don't trust", "sounds too good"];

/// Count how many markers from a table occur in the (lowercased) text
pub fn count_matches(text: &str, table: &[&str]) -> usize {
    table.iter().filter(|m| text.contains(*m)).count()
}

/// Collect the markers from a table that occur in the text
pub fn collect_matches<'t>(text: &str, table: &[&'t str]) -> Vec<&'t str> {
    table.iter().filter(|m| text.contains(*m)).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_matches() {
        let text = "i need to sell fast, going through a divorce";
        assert_eq!(count_matches(text, LIFE_EVENT_MARKERS), 1);
        assert!(count_matches(text, URGENCY_MARKERS) >= 2);
        assert_eq!(count_matches(text, CURIOSITY_MARKERS), 0);
    }

    #[test]
    fn test_collect_matches() {
        let text = "the zestimate says 500k but the comps disagree";
        let hits = collect_matches(text, ZESTIMATE_MARKERS);
        assert_eq!(hits, vec!["zestimate"]);
        assert_eq!(collect_matches(text, COMPS_MARKERS), vec!["comps"]);
    }
}
