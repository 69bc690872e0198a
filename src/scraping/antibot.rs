//! Anti-bot interstitial detection.
//!
//! The tracker site occasionally serves a challenge page instead of flight
//! data. We only detect it so the lookup can abort early; solving it is out
//! of scope.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use std::sync::OnceLock;

/// Visible-text phrases paired with the reason label reported upstream.
const BLOCK_PHRASES: &[(&str, &str)] = &[
    ("verify you are human", "captcha"),
    ("are you a robot", "captcha"),
    ("complete the security check", "captcha"),
    ("press & hold", "press_and_hold"),
    ("press and hold", "press_and_hold"),
    ("unusual traffic", "unusual_traffic"),
    ("checking your browser", "js_challenge"),
    ("access denied", "access_denied"),
    ("request unsuccessful", "access_denied"),
];

static BLOCK_MATCHER: OnceLock<AhoCorasick> = OnceLock::new();

fn block_matcher() -> &'static AhoCorasick {
    BLOCK_MATCHER.get_or_init(|| {
        AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .build(BLOCK_PHRASES.iter().map(|(needle, _)| needle))
            .expect("valid block phrases")
    })
}

/// Returns the block reason if `visible_text` looks like a challenge page.
///
/// Only rendered text is inspected; script bodies on a normal page routinely
/// mention captcha vendors.
pub fn detect_block_reason(visible_text: &str) -> Option<&'static str> {
    block_matcher()
        .find(visible_text)
        .map(|m| BLOCK_PHRASES[m.pattern().as_usize()].1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_challenges() {
        assert_eq!(
            detect_block_reason("Please verify you are human by completing the action"),
            Some("captcha")
        );
        assert_eq!(
            detect_block_reason("PRESS & HOLD to confirm"),
            Some("press_and_hold")
        );
        assert_eq!(
            detect_block_reason("Access Denied. Reference #18"),
            Some("access_denied")
        );
    }

    #[test]
    fn ordinary_flight_text_is_not_blocked() {
        assert_eq!(
            detect_block_reason("MH 716 Flight Status Arrived Delayed by 12 minutes"),
            None
        );
    }
}
