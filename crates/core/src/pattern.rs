// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Versioned, immutable table of named regex patterns by status class.
//!
//! Patterns are compiled once at registry construction. Adding a new
//! [`PatternVersion`] never changes behavior on its own — callers must
//! advance which version [`PatternRegistry::get_current`] returns.

use std::collections::BTreeMap;

use regex::Regex;

/// The coarse status classes a terminal buffer can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusClass {
    Idle,
    Working,
    Waiting,
    Error,
}

impl StatusClass {
    /// Priority order used when more than one class matches a buffer:
    /// waiting beats error beats working beats idle.
    pub fn scan_priority() -> [StatusClass; 4] {
        [StatusClass::Waiting, StatusClass::Error, StatusClass::Working, StatusClass::Idle]
    }

    /// The minimum confidence a match in this class must meet to "count".
    ///
    /// `waiting` and `working` trust the pattern author's native confidence;
    /// `idle`/`error` patterns are deliberately allowed to be low-confidence
    /// (e.g. a bare `"Error:"` substring) so a classification threshold is
    /// enforced here instead.
    pub fn classification_threshold(self) -> f32 {
        match self {
            StatusClass::Idle | StatusClass::Error => 0.7,
            StatusClass::Waiting | StatusClass::Working => 0.0,
        }
    }
}

/// A single named, compiled pattern with an associated confidence.
#[derive(Clone)]
pub struct Pattern {
    pub name: &'static str,
    pub regex: Regex,
    pub confidence: f32,
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("name", &self.name)
            .field("regex", &self.regex.as_str())
            .field("confidence", &self.confidence)
            .finish()
    }
}

/// Raw (uncompiled) pattern source used to build a [`PatternVersion`].
pub struct PatternSpec {
    pub name: &'static str,
    pub source: &'static str,
    pub confidence: f32,
    /// Disable the default case-insensitive flag for this pattern.
    pub case_sensitive: bool,
}

const fn spec(name: &'static str, source: &'static str, confidence: f32) -> PatternSpec {
    PatternSpec { name, source, confidence, case_sensitive: false }
}

const fn spec_cs(name: &'static str, source: &'static str, confidence: f32) -> PatternSpec {
    PatternSpec { name, source, confidence, case_sensitive: true }
}

/// One named, versioned set of patterns for every status class.
pub struct PatternVersion {
    pub version: u32,
    pub compatible_assistant_version: &'static str,
    pub created_at: &'static str,
    patterns: BTreeMap<StatusClass, Vec<Pattern>>,
}

impl PatternVersion {
    fn build(
        version: u32,
        compatible_assistant_version: &'static str,
        created_at: &'static str,
        classes: &[(StatusClass, &[PatternSpec])],
    ) -> Result<Self, regex::Error> {
        let mut patterns = BTreeMap::new();
        for (class, specs) in classes {
            let mut compiled = Vec::with_capacity(specs.len());
            for s in *specs {
                debug_assert!(s.confidence > 0.0 && s.confidence <= 1.0);
                let regex = if s.case_sensitive {
                    Regex::new(s.source)?
                } else {
                    Regex::new(&format!("(?i){}", s.source))?
                };
                compiled.push(Pattern { name: s.name, regex, confidence: s.confidence });
            }
            patterns.insert(*class, compiled);
        }
        Ok(Self { version, compatible_assistant_version, created_at, patterns })
    }

    /// Patterns for a given status class in this version, in scan order.
    pub fn patterns(&self, class: StatusClass) -> &[Pattern] {
        self.patterns.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Process-wide immutable table of pattern versions.
pub struct PatternRegistry {
    versions: Vec<PatternVersion>,
}

impl PatternRegistry {
    /// Build the registry with the built-in pattern set.
    ///
    /// Panics only if a built-in regex fails to compile — a programmer
    /// error caught immediately at process start, never at request time.
    #[allow(clippy::panic)]
    pub fn new() -> Self {
        Self::try_new().unwrap_or_else(|e| {
            // Built-in patterns are a compile-time constant; a failure here
            // means the registry itself is broken, not a runtime condition.
            tracing::error!(error = %e, "built-in pattern registry failed to compile");
            panic!("built-in pattern registry failed to compile: {e}");
        })
    }

    fn try_new() -> Result<Self, regex::Error> {
        let v1 = PatternVersion::build(
            1,
            "*",
            "2025-01-01T00:00:00Z",
            &[
                (StatusClass::Waiting, WAITING_V1),
                (StatusClass::Error, ERROR_V1),
                (StatusClass::Working, WORKING_V1),
                (StatusClass::Idle, IDLE_V1),
            ],
        )?;
        Ok(Self { versions: vec![v1] })
    }

    /// Look up a specific version by number.
    pub fn get_version(&self, v: u32) -> Option<&PatternVersion> {
        self.versions.iter().find(|pv| pv.version == v)
    }

    /// The newest version. Guaranteed non-empty for every status class.
    pub fn get_current(&self) -> &PatternVersion {
        self.versions.last().unwrap_or_else(|| {
            // Unreachable: `versions` is seeded with at least v1 in `try_new`.
            unreachable!("pattern registry constructed with zero versions")
        })
    }

    /// All known versions, oldest first.
    pub fn get_all(&self) -> &[PatternVersion] {
        &self.versions
    }

    /// Shortcut against the current version.
    pub fn get_patterns(&self, class: StatusClass) -> &[Pattern] {
        self.get_current().patterns(class)
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// -- Built-in pattern tables (version 1) -------------------------------------

static WAITING_V1: &[PatternSpec] = &[
    spec("permission_allow_deny", r"Allow this (?:command|tool|action)\?", 0.9),
    spec("yn_prompt", r"\[y/n\]\s*:?\s*$", 0.85),
    spec("plan_header", r"Here is (?:Claude's|my) plan", 0.85),
    spec("press_enter_to_continue", r"Press enter to continue", 0.75),
    spec("numbered_option_menu", r"^\s*\d+\.\s+.+", 0.6),
    spec("generic_question_mark", r"\?\s*$", 0.4),
];

static ERROR_V1: &[PatternSpec] = &[
    spec("tool_failure", r"(?:Command|Tool) failed with exit code \d+", 0.85),
    spec("traceback", r"Traceback \(most recent call last\)", 0.8),
    spec("panicked_at", r"panicked at", 0.8),
    spec("generic_error_prefix", r"^Error:", 0.4),
];

static WORKING_V1: &[PatternSpec] = &[
    spec_cs("spinner_braille", r"[\x{2800}-\x{28FF}]", 0.9),
    spec("working_ellipsis", r"(?:Working|Thinking|Generating)\.\.\.", 0.85),
    spec("esc_to_interrupt", r"esc to interrupt", 0.8),
];

static IDLE_V1: &[PatternSpec] = &[
    spec_cs("idle_chevron", r"^\x{276f}\s*$", 0.9),
    spec("ready_for_input", r"ready for input", 0.7),
];

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
