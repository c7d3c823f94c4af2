// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Classifies captured terminal bytes into a coarse status, extracting a
//! structured prompt when the status is `waiting`.
//!
//! `parse` is a pure function: same input always yields the same output,
//! no hidden state. This is required for the idempotence law tested in
//! `parser_tests.rs`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pattern::{PatternRegistry, StatusClass};

/// Coarse terminal status, as observed by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Idle,
    Working,
    Waiting,
    Error,
    Unknown,
}

impl From<StatusClass> for TerminalStatus {
    fn from(class: StatusClass) -> Self {
        match class {
            StatusClass::Idle => TerminalStatus::Idle,
            StatusClass::Working => TerminalStatus::Working,
            StatusClass::Waiting => TerminalStatus::Waiting,
            StatusClass::Error => TerminalStatus::Error,
        }
    }
}

/// A single selectable option within a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptOption {
    pub key: String,
    pub label: String,
}

/// A structured, actionable prompt extracted from waiting terminal content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminalPrompt {
    Permission {
        tool: Option<String>,
        command: Option<String>,
        options: Vec<PromptOption>,
        question: String,
        footer: Option<String>,
    },
    Plan {
        options: Vec<PromptOption>,
        question: String,
        footer: Option<String>,
    },
    Question {
        options: Vec<PromptOption>,
        question: String,
        selected_index: Option<usize>,
        footer: Option<String>,
    },
    Feedback {
        options: Vec<PromptOption>,
        question: String,
    },
}

impl TerminalPrompt {
    /// Stable, content-only hash so downstream consumers can deduplicate
    /// identical prompts recognized across separate captures.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self {
            TerminalPrompt::Permission { tool, command, options, question, .. } => {
                "permission".hash(&mut hasher);
                tool.hash(&mut hasher);
                command.hash(&mut hasher);
                hash_options(options, &mut hasher);
                question.hash(&mut hasher);
            }
            TerminalPrompt::Plan { options, question, .. } => {
                "plan".hash(&mut hasher);
                hash_options(options, &mut hasher);
                question.hash(&mut hasher);
            }
            TerminalPrompt::Question { options, question, .. } => {
                "question".hash(&mut hasher);
                hash_options(options, &mut hasher);
                question.hash(&mut hasher);
            }
            TerminalPrompt::Feedback { options, question } => {
                "feedback".hash(&mut hasher);
                hash_options(options, &mut hasher);
                question.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

fn hash_options(options: &[PromptOption], hasher: &mut impl Hasher) {
    for o in options {
        o.key.hash(hasher);
        o.label.hash(hasher);
    }
}

/// Verdict returned by [`parse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseVerdict {
    pub status: TerminalStatus,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<TerminalPrompt>,
}

impl ParseVerdict {
    fn unknown() -> Self {
        Self { status: TerminalStatus::Unknown, confidence: 0.0, prompt: None }
    }
}

/// Options controlling how much of a capture the parser considers.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Only the last `tail_lines` lines of the capture are considered.
    pub tail_lines: usize,
    /// Within that tail, only the last `window_lines` are scanned.
    pub window_lines: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { tail_lines: 150, window_lines: 50 }
    }
}

/// Classify captured terminal content into a status, confidence, and
/// (when `waiting`) a structured prompt.
///
/// Never panics or propagates an error; unparseable/empty input yields
/// `{status: unknown, confidence: 0}`.
pub fn parse(registry: &PatternRegistry, content: &str, opts: ParserOptions) -> ParseVerdict {
    if content.trim().is_empty() {
        return ParseVerdict::unknown();
    }

    let tailed: Vec<&str> = last_n_lines(content, opts.tail_lines);
    let window: Vec<&str> = tailed.iter().rev().take(opts.window_lines).rev().copied().collect();

    let mut best: Option<(StatusClass, f32)> = None;
    for class in StatusClass::scan_priority() {
        let mut class_best: Option<f32> = None;
        for pattern in registry.get_patterns(class) {
            if window.iter().any(|line| pattern.regex.is_match(line)) {
                class_best = Some(class_best.map_or(pattern.confidence, |c: f32| c.max(pattern.confidence)));
            }
        }
        if let Some(conf) = class_best {
            if conf >= class.classification_threshold() {
                best = Some((class, conf));
                break; // scan_priority order decides ties
            }
        }
    }

    let Some((class, confidence)) = best else {
        return ParseVerdict::unknown();
    };

    let status = TerminalStatus::from(class);
    let prompt = if matches!(status, TerminalStatus::Waiting) {
        extract_prompt(&window)
    } else {
        None
    };

    ParseVerdict { status, confidence, prompt }
}

fn last_n_lines<'a>(content: &'a str, n: usize) -> Vec<&'a str> {
    let all: Vec<&str> = content.lines().collect();
    if all.len() <= n {
        all
    } else {
        all[all.len() - n..].to_vec()
    }
}

// -- Prompt extraction --------------------------------------------------------

static PERMISSION_HEADER: &str = r"(?i)(?:Allow|Run)\s+(?:this\s+)?(?:command|tool|action)\??";
static PLAN_HEADER: &str = r"(?i)Here is (?:Claude's|my) plan";

fn extract_prompt(window: &[&str]) -> Option<TerminalPrompt> {
    let joined = window.join("\n");
    let permission_re = Regex::new(PERMISSION_HEADER).ok()?;
    let plan_re = Regex::new(PLAN_HEADER).ok()?;

    if permission_re.is_match(&joined) {
        let tool = extract_tool_name(&joined);
        let question = find_question_line(window).unwrap_or_else(|| joined.clone());
        return Some(TerminalPrompt::Permission {
            tool,
            command: extract_command(window),
            options: parse_option_lines(window),
            question,
            footer: find_footer(window),
        });
    }

    if plan_re.is_match(&joined) {
        return Some(TerminalPrompt::Plan {
            options: parse_option_lines(window),
            question: find_question_line(window).unwrap_or_default(),
            footer: find_footer(window),
        });
    }

    let options = parse_option_lines(window);
    if !options.is_empty() {
        return Some(TerminalPrompt::Question {
            options,
            question: find_question_line(window).unwrap_or_default(),
            selected_index: None,
            footer: find_footer(window),
        });
    }

    None
}

fn extract_tool_name(text: &str) -> Option<String> {
    let re = Regex::new(r"\(([A-Za-z][A-Za-z0-9_-]*)\)").ok()?;
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().to_owned())
}

fn extract_command(window: &[&str]) -> Option<String> {
    window
        .iter()
        .find(|l| l.trim_start().starts_with('$') || l.trim_start().starts_with('>'))
        .map(|l| l.trim_start_matches(['$', '>']).trim().to_owned())
}

fn find_question_line(window: &[&str]) -> Option<String> {
    window.iter().rev().find(|l| l.trim_end().ends_with('?')).map(|l| l.trim().to_owned())
}

fn find_footer(window: &[&str]) -> Option<String> {
    window
        .last()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_owned())
}

/// Option patterns, per spec: numbered, bulleted, or arrowed lists. The
/// earliest-appearing style in the window wins and only that style's
/// lines are collected (mixing styles within one prompt is not expected).
fn parse_option_lines(window: &[&str]) -> Vec<PromptOption> {
    const NUMBERED: &str = r"^\s*(\d+)\.\s+(.+)$";
    const BULLETED: &str = r"^\s*[•\-*]\s+(.+)$";
    const ARROWED: &str = r"^\s*[►▶→]\s+(.+)$";

    let Ok(numbered) = Regex::new(NUMBERED) else { return Vec::new() };
    let Ok(bulleted) = Regex::new(BULLETED) else { return Vec::new() };
    let Ok(arrowed) = Regex::new(ARROWED) else { return Vec::new() };

    for line in window {
        if numbered.is_match(line) {
            return window
                .iter()
                .filter_map(|l| numbered.captures(l))
                .map(|c| PromptOption {
                    key: c.get(1).map(|m| m.as_str().to_owned()).unwrap_or_default(),
                    label: c.get(2).map(|m| m.as_str().trim().to_owned()).unwrap_or_default(),
                })
                .collect();
        }
        if bulleted.is_match(line) {
            return indexed_options(window, &bulleted);
        }
        if arrowed.is_match(line) {
            return indexed_options(window, &arrowed);
        }
    }
    Vec::new()
}

/// Collect options from a style whose pattern has no explicit key group,
/// assigning sequential 1-based keys.
fn indexed_options(window: &[&str], re: &Regex) -> Vec<PromptOption> {
    window
        .iter()
        .filter_map(|l| re.captures(l))
        .enumerate()
        .map(|(i, c)| PromptOption {
            key: (i + 1).to_string(),
            label: c.get(1).map(|m| m.as_str().trim().to_owned()).unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
