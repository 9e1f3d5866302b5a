//! Bounded byte-sequence search used for lock-on

use crate::constants::HEARTBEAT_SIGNATURE;
use memchr::memmem;

/// Find the first occurrence of `needle` in `haystack`.
///
/// At most `scan_budget` haystack bytes are consumed: a match that would end
/// past the budget is abandoned, even if the needle is present. Returns the
/// index where the needle begins.
pub fn find(haystack: &[u8], needle: &[u8], scan_budget: usize) -> Option<usize> {
    let window = &haystack[..haystack.len().min(scan_budget)];
    if needle.len() > window.len() {
        return None;
    }
    memmem::find(window, needle)
}

/// Prebuilt searcher for a fixed signature
#[derive(Debug, Clone)]
pub struct SignatureMatcher {
    finder: memmem::Finder<'static>,
}

impl SignatureMatcher {
    /// Create a matcher for an arbitrary signature
    pub fn new(signature: &[u8]) -> Self {
        Self {
            finder: memmem::Finder::new(signature).into_owned(),
        }
    }

    /// Matcher for the heartbeat header used as lock-on anchor
    pub fn heartbeat() -> Self {
        Self::new(&HEARTBEAT_SIGNATURE)
    }

    /// The signature this matcher looks for
    pub fn signature(&self) -> &[u8] {
        self.finder.needle()
    }

    /// Same contract as [`find`], reusing the prebuilt searcher
    pub fn find(&self, haystack: &[u8], scan_budget: usize) -> Option<usize> {
        let window = &haystack[..haystack.len().min(scan_budget)];
        self.finder.find(window)
    }
}

impl Default for SignatureMatcher {
    fn default() -> Self {
        Self::heartbeat()
    }
}
