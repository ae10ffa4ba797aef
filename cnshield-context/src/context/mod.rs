// cnshield-context/src/context/mod.rs
//! Keyword context matching.
//!
//! A `ContextMatcher` owns one Aho-Corasick automaton built from a recognizer's
//! context words. It reports which *distinct* words occur around a span, which is
//! the unit the context boost is counted in.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use daachorse::errors::DaachorseError;
use daachorse::DoubleArrayAhoCorasick;

use crate::window;

/// Case-insensitive, boundary-aware matcher over a fixed set of context words.
pub struct ContextMatcher {
    automaton: Option<DoubleArrayAhoCorasick<usize>>,
    words: Vec<String>,
}

impl fmt::Debug for ContextMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextMatcher")
            .field("automaton", &"<DoubleArrayAhoCorasick>")
            .field("words", &self.words.len())
            .finish()
    }
}

impl ContextMatcher {
    /// Builds a matcher. Words are lowercased, trimmed and de-duplicated; empty
    /// entries are ignored. An empty word list yields a matcher that never hits.
    pub fn new<I, S>(words: I) -> Result<Self, DaachorseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for word in words {
            let word = word.as_ref().trim().to_lowercase();
            if !word.is_empty() && !normalized.contains(&word) {
                normalized.push(word);
            }
        }

        let automaton = if normalized.is_empty() {
            None
        } else {
            Some(DoubleArrayAhoCorasick::new(normalized.iter())?)
        };

        Ok(Self { automaton, words: normalized })
    }

    /// A matcher with no words.
    pub fn empty() -> Self {
        Self { automaton: None, words: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The normalized (lowercased, de-duplicated) words, in automaton order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Returns the distinct context words found in `haystack`, in word order.
    pub fn find_in(&self, haystack: &str) -> Vec<&str> {
        let mut seen = alloc::vec![false; self.words.len()];
        self.mark_hits(haystack, &mut seen);
        self.collect(&seen)
    }

    /// Returns the distinct context words found within `radius` chars on either
    /// side of the byte span `[start, end)`. The span itself is not searched, so
    /// a value can never boost itself (e.g. `qq` inside `12345@qq.com`).
    pub fn find_around(&self, text: &str, start: usize, end: usize, radius: usize) -> Vec<&str> {
        if self.automaton.is_none() || radius == 0 {
            return Vec::new();
        }
        let mut seen = alloc::vec![false; self.words.len()];
        self.mark_hits(window::before(text, start, radius), &mut seen);
        self.mark_hits(window::after(text, end, radius), &mut seen);
        self.collect(&seen)
    }

    /// Convenience wrapper for callers that only need a yes/no answer.
    pub fn any_around(&self, text: &str, start: usize, end: usize, radius: usize) -> bool {
        !self.find_around(text, start, end, radius).is_empty()
    }

    fn mark_hits(&self, haystack: &str, seen: &mut [bool]) {
        let Some(automaton) = &self.automaton else { return };
        if haystack.is_empty() {
            return;
        }
        let lowered = haystack.to_lowercase();
        let bytes = lowered.as_bytes();

        for matched in automaton.find_overlapping_iter(&lowered) {
            let idx = matched.value();
            let Some(word) = self.words.get(idx) else { continue };
            if seen[idx] {
                continue;
            }
            if is_bounded(bytes, word, matched.start(), matched.end()) {
                seen[idx] = true;
            }
        }
    }

    fn collect(&self, seen: &[bool]) -> Vec<&str> {
        self.words
            .iter()
            .zip(seen)
            .filter(|(_, hit)| **hit)
            .map(|(word, _)| word.as_str())
            .collect()
    }
}

/// Word-boundary check: ensures "tel" doesn't match "hotel". Only applies to the
/// ASCII alphanumeric edges of a word; CJK words are matched anywhere.
fn is_bounded(haystack: &[u8], word: &str, start: usize, end: usize) -> bool {
    let word = word.as_bytes();
    let first_ascii = word.first().is_some_and(|b| b.is_ascii_alphanumeric());
    let last_ascii = word.last().is_some_and(|b| b.is_ascii_alphanumeric());

    let prefix_ok = !first_ascii || start == 0 || !haystack[start - 1].is_ascii_alphanumeric();
    let suffix_ok = !last_ascii || end == haystack.len() || !haystack[end].is_ascii_alphanumeric();
    prefix_ok && suffix_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_distinct_hits_are_counted_once() {
        let m = ContextMatcher::new(["手机", "电话", "phone"]).unwrap();
        let hits = m.find_in("手机 手机 Phone");
        assert_eq!(hits, vec!["手机", "phone"]);
    }

    #[test]
    fn test_overlapping_words_all_hit() {
        let m = ContextMatcher::new(["手机", "手机号", "号码"]).unwrap();
        assert_eq!(m.find_in("手机号码").len(), 3);
    }

    #[test]
    fn test_ascii_word_boundaries() {
        let m = ContextMatcher::new(["tel", "id"]).unwrap();
        assert!(m.find_in("hotel valid").is_empty());
        assert_eq!(m.find_in("tel: 123, id=9"), vec!["tel", "id"]);
    }

    #[test]
    fn test_find_around_excludes_span() {
        let m = ContextMatcher::new(["qq"]).unwrap();
        let text = "mail 12345@qq.com now";
        let start = text.find('1').unwrap();
        let end = start + "12345@qq.com".len();
        assert!(m.find_around(text, start, end, 30).is_empty());
    }

    #[test]
    fn test_find_around_uses_char_radius() {
        let m = ContextMatcher::new(["工号"]).unwrap();
        let text = "工号GZ-123456";
        let start = "工号".len();
        assert_eq!(m.find_around(text, start, text.len(), 30), vec!["工号"]);
        assert!(m.find_around(text, start, text.len(), 1).is_empty());
    }

    #[test]
    fn test_duplicate_and_empty_words_are_tolerated() {
        let m = ContextMatcher::new(["Phone", "phone", " ", ""]).unwrap();
        assert_eq!(m.words().len(), 1);
        assert!(ContextMatcher::new(Vec::<&str>::new()).unwrap().is_empty());
    }
}
