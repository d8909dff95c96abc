//! Stall detection
//!
//! A stall is a hesitation pattern in recent lead replies ("need to think
//! about it", "zillow says otherwise") that warrants a tone shift rather
//! than another scripted question. Detection is table-driven over the
//! concatenated lowercased text of the recent user messages; the first
//! matching kind in table order wins.

use leadflow_core::conversation::Turn;
use leadflow_core::scoring::StallKind;

/// Number of trailing user messages scanned by default
pub const DEFAULT_WINDOW: usize = 6;

/// Keyword tables, one per stall kind, in priority order
const STALL_TABLES: &[(StallKind, &[&str])] = &[
    (
        StallKind::Thinking,
        &[
            "need to think",
            "think about it",
            "let me think",
            "still thinking",
            "sleep on it",
            "need some time",
        ],
    ),
    (
        StallKind::PriceObjection,
        &[
            "too low",
            "price is too",
            "not enough",
            "want more for",
            "lowball",
            "worth more",
        ],
    ),
    (
        StallKind::ZestimateFixation,
        &["zestimate", "zillow says", "zillow is", "online estimate"],
    ),
    (
        StallKind::AgentConflict,
        &[
            "another agent",
            "other realtor",
            "my agent",
            "working with someone",
            "already have an agent",
        ],
    ),
    (
        StallKind::Busy,
        &["busy", "no time", "call me later", "swamped", "at work right now"],
    ),
    (
        StallKind::MaybeLater,
        &[
            "maybe later",
            "not right now",
            "down the road",
            "in a few months",
            "someday",
            "next year maybe",
        ],
    ),
];

/// Detection result: the kind plus the substring that matched, for
/// observability in events and logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StallDetection {
    pub kind: StallKind,
    pub matched: Option<String>,
}

impl StallDetection {
    pub fn none() -> Self {
        Self {
            kind: StallKind::None,
            matched: None,
        }
    }

    pub fn is_stall(&self) -> bool {
        self.kind.is_stall()
    }
}

/// Table-driven stall detector
#[derive(Debug, Clone)]
pub struct StallDetector {
    window: usize,
}

impl StallDetector {
    pub fn new() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }

    pub fn with_window(window: usize) -> Self {
        Self { window }
    }

    /// Scan the trailing user messages for stall patterns.
    pub fn detect(&self, history: &[Turn]) -> StallDetection {
        let recent: Vec<String> = history
            .iter()
            .rev()
            .filter(|t| t.is_user())
            .take(self.window)
            .map(|t| t.content.to_lowercase())
            .collect();

        if recent.is_empty() {
            return StallDetection::none();
        }
        let text = recent.join(" ");

        for (kind, table) in STALL_TABLES {
            if let Some(matched) = table.iter().find(|phrase| text.contains(*phrase)) {
                return StallDetection {
                    kind: *kind,
                    matched: Some((*matched).to_string()),
                };
            }
        }

        StallDetection::none()
    }

    /// Detect against only the most recent user message. Used by workflows to
    /// decide whether a stall is *consecutive* rather than historical.
    pub fn detect_latest(&self, history: &[Turn]) -> StallDetection {
        let latest = history.iter().rev().find(|t| t.is_user());
        match latest {
            Some(turn) => self.detect(std::slice::from_ref(turn)),
            None => StallDetection::none(),
        }
    }
}

impl Default for StallDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thinking_stall() {
        let history = vec![Turn::user("I need to think about it")];
        let detection = StallDetector::new().detect(&history);
        assert_eq!(detection.kind, StallKind::Thinking);
        assert_eq!(detection.matched.as_deref(), Some("need to think"));
    }

    #[test]
    fn test_no_stall() {
        let history = vec![Turn::user("Yes, let's move forward with the listing")];
        let detection = StallDetector::new().detect(&history);
        assert_eq!(detection.kind, StallKind::None);
        assert!(detection.matched.is_none());
    }

    #[test]
    fn test_first_matching_table_wins() {
        // Both "think about it" and "zillow says" present; thinking is
        // earlier in table order.
        let history = vec![Turn::user(
            "zillow says 600k so I need to think about it",
        )];
        let detection = StallDetector::new().detect(&history);
        assert_eq!(detection.kind, StallKind::Thinking);
    }

    #[test]
    fn test_zestimate_fixation() {
        let history = vec![Turn::user("But the zestimate shows way more")];
        assert_eq!(
            StallDetector::new().detect(&history).kind,
            StallKind::ZestimateFixation
        );
    }

    #[test]
    fn test_window_excludes_old_messages() {
        let mut history = vec![Turn::user("I need to think about it")];
        for i in 0..6 {
            history.push(Turn::user(format!("message {i} with no hesitation")));
        }
        let detection = StallDetector::new().detect(&history);
        assert_eq!(detection.kind, StallKind::None);
    }

    #[test]
    fn test_only_user_messages_scanned() {
        let history = vec![
            Turn::user("Sounds good"),
            Turn::assistant("Take time to think about it if you need"),
        ];
        assert_eq!(StallDetector::new().detect(&history).kind, StallKind::None);
    }

    #[test]
    fn test_detect_latest_ignores_earlier_stall() {
        let history = vec![
            Turn::user("I need to think about it"),
            Turn::assistant("What's holding you back?"),
            Turn::user("Actually, let's schedule the appraisal"),
        ];
        let detector = StallDetector::new();
        assert!(detector.detect(&history).is_stall());
        assert!(!detector.detect_latest(&history).is_stall());
    }

    #[test]
    fn test_busy_and_maybe_later() {
        assert_eq!(
            StallDetector::new()
                .detect(&[Turn::user("I'm really busy this week")])
                .kind,
            StallKind::Busy
        );
        assert_eq!(
            StallDetector::new()
                .detect(&[Turn::user("maybe later, not a priority")])
                .kind,
            StallKind::MaybeLater
        );
    }
}
