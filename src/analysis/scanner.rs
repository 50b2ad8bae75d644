//! Line-oriented pattern matching shared by the solution and project parsers
//!
//! A [`Scanner`] holds a fixed set of named patterns and reports, for one line
//! at a time, which of them match together with their capture groups. Markers
//! match case-insensitively; captured text is returned exactly as written.
//! Multi-line structure is left to the caller.

use regex::{Captures, Regex, RegexBuilder};

pub struct Scanner<K> {
    patterns: Vec<(K, Regex)>,
}

impl<K: Copy + PartialEq> Scanner<K> {
    pub fn new(patterns: &[(K, &str)]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|(kind, pattern)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| (*kind, regex))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    pub fn scan_line<'t>(&self, line: &'t str) -> LineMatches<'t, K> {
        let matches = self
            .patterns
            .iter()
            .filter_map(|(kind, regex)| regex.captures(line).map(|caps| (*kind, caps)))
            .collect();

        LineMatches { matches }
    }

    pub fn scan<'s, 't: 's>(
        &'s self,
        text: &'t str,
    ) -> impl Iterator<Item = LineMatches<'t, K>> + 's
    where
        K: 's,
    {
        text.lines().map(move |line| self.scan_line(line))
    }
}

/// Patterns that matched a single line
pub struct LineMatches<'t, K> {
    matches: Vec<(K, Captures<'t>)>,
}

impl<'t, K: Copy + PartialEq> LineMatches<'t, K> {
    pub fn has(&self, kind: K) -> bool {
        self.matches.iter().any(|(k, _)| *k == kind)
    }

    pub fn get(&self, kind: K) -> Option<&Captures<'t>> {
        self.matches
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, caps)| caps)
    }

    /// Text of the named group of `kind`'s match, if both exist
    pub fn capture(&self, kind: K, group: &str) -> Option<&'t str> {
        self.get(kind)
            .and_then(|caps| caps.name(group))
            .map(|m| m.as_str())
    }

    pub fn kinds(&self) -> impl Iterator<Item = K> + '_ {
        self.matches.iter().map(|(k, _)| *k)
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
