//! Whole-word keyword matching over literal values.
//!
//! [`KeywordMatcher`] answers one question: does a piece of text contain any of
//! the configured keywords as a whole word? A keyword occurrence counts only if
//! the characters immediately before and after it are not alphanumeric (or the
//! occurrence touches the start/end of the text). `"HT012734817"` therefore
//! matches in `"HT012734817 catalogued"` but not in `"XHT012734817Y"`.
//!
//! The keyword set is compiled once. A single keyword is searched with
//! `memchr::memmem`; two or more keywords go into one Aho-Corasick automaton so
//! that query time does not grow with the number of keywords.
//!
//! # Examples
//!
//! ```
//! use bibsift::matcher::KeywordMatcher;
//!
//! # fn main() -> bibsift::Result<()> {
//! let matcher = KeywordMatcher::from_whitespace_separated("HT012734817 HT012734833")?;
//!
//! assert!(matcher.is_match("HT012734817"));
//! assert!(matcher.is_match("see HT012734833, vol. 2"));
//! assert!(!matcher.is_match("XHT012734817Y"));
//! # Ok(())
//! # }
//! ```

use aho_corasick::{AhoCorasick, MatchKind};
use indexmap::IndexSet;
use memchr::memmem;

use crate::error::Result;

/// One whole-word keyword occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordMatch<'m> {
    /// The keyword that matched
    pub keyword: &'m str,
    /// Byte offset of the first matched byte
    pub start: usize,
    /// Byte offset one past the last matched byte
    pub end: usize,
}

#[derive(Debug, Clone)]
enum Engine {
    /// No keywords: nothing ever matches.
    Empty,
    /// Exactly one keyword.
    Single(memmem::Finder<'static>),
    /// Two or more keywords.
    Multi(AhoCorasick),
}

/// Precompiled, immutable whole-word keyword matcher.
///
/// The matcher holds no mutable state, so one instance can be shared (for
/// example behind an `Arc`) by any number of filters and threads.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    engine: Engine,
}

impl KeywordMatcher {
    /// Builds a matcher from a list of keywords.
    ///
    /// Empty tokens are ignored and duplicates are kept once, in first-seen
    /// order. An empty list is valid and yields a matcher that never matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the automaton cannot be built.
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: IndexSet<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        let keywords: Vec<String> = unique.into_iter().collect();

        let engine = match keywords.as_slice() {
            [] => Engine::Empty,
            [single] => Engine::Single(memmem::Finder::new(single.as_bytes()).into_owned()),
            many => Engine::Multi(
                AhoCorasick::builder()
                    .match_kind(MatchKind::Standard)
                    .build(many)?,
            ),
        };

        Ok(Self { keywords, engine })
    }

    /// Builds a matcher from one string of whitespace-separated keywords,
    /// e.g. `"HT012734817 HT012734833 HT012734844"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the automaton cannot be built.
    pub fn from_whitespace_separated(keywords: &str) -> Result<Self> {
        Self::new(keywords.split_whitespace())
    }

    /// The distinct configured keywords, in first-seen order.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Number of distinct keywords.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// True if no keywords are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Returns true if any keyword occurs in `text` as a whole word.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        let mut found = false;
        self.for_each_candidate(text, |_, start, end| {
            if is_whole_word(text, start, end) {
                found = true;
                return false;
            }
            true
        });
        found
    }

    /// Returns every whole-word keyword occurrence in `text`.
    ///
    /// Occurrences of different keywords may overlap; they are reported
    /// ordered by end offset.
    #[must_use]
    pub fn find_matches<'m>(&'m self, text: &str) -> Vec<KeywordMatch<'m>> {
        let mut matches = Vec::new();
        self.for_each_candidate(text, |pattern, start, end| {
            if is_whole_word(text, start, end) {
                matches.push(KeywordMatch {
                    keyword: &self.keywords[pattern],
                    start,
                    end,
                });
            }
            true
        });
        matches
    }

    /// Feeds every raw (possibly overlapping) occurrence to `visit` until it
    /// returns false.
    fn for_each_candidate<F>(&self, text: &str, mut visit: F)
    where
        F: FnMut(usize, usize, usize) -> bool,
    {
        match &self.engine {
            Engine::Empty => {},
            Engine::Single(finder) => {
                let haystack = text.as_bytes();
                let len = finder.needle().len();
                let mut pos = 0;
                while pos < haystack.len() {
                    let Some(offset) = finder.find(&haystack[pos..]) else {
                        break;
                    };
                    let start = pos + offset;
                    if !visit(0, start, start + len) {
                        return;
                    }
                    pos = start + 1;
                }
            },
            Engine::Multi(automaton) => {
                for m in automaton.find_overlapping_iter(text) {
                    if !visit(m.pattern().as_usize(), m.start(), m.end()) {
                        return;
                    }
                }
            },
        }
    }
}

/// Checks that `text[start..end]` is bounded by non-alphanumeric characters
/// or by the ends of `text`.
fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}
