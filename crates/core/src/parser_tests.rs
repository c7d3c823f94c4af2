// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

use super::*;
use crate::pattern::PatternRegistry;

fn registry() -> PatternRegistry {
    PatternRegistry::new()
}

#[test]
fn empty_input_is_unknown() {
    let v = parse(&registry(), "", ParserOptions::default());
    assert_eq!(v.status, TerminalStatus::Unknown);
    assert_eq!(v.confidence, 0.0);
}

#[test]
fn whitespace_only_input_is_unknown() {
    let v = parse(&registry(), "   \n\n  \t ", ParserOptions::default());
    assert_eq!(v.status, TerminalStatus::Unknown);
}

/// S2 — permission waiting prompt.
#[test]
fn permission_prompt_is_waiting_with_tool() {
    let content = "Some output...\nAllow this command? (Bash)\n[y/n]:";
    let v = parse(&registry(), content, ParserOptions::default());
    assert_eq!(v.status, TerminalStatus::Waiting);
    assert!(v.confidence >= 0.7);
    match v.prompt {
        Some(TerminalPrompt::Permission { tool, .. }) => assert_eq!(tool.as_deref(), Some("Bash")),
        other => panic!("expected permission prompt, got {other:?}"),
    }
}

/// S3 — tool failure beats a working spinner.
#[test]
fn tool_failure_beats_working_spinner() {
    let content = "\u{280b} Working...\nCommand failed with exit code 1";
    let v = parse(&registry(), content, ParserOptions::default());
    assert_eq!(v.status, TerminalStatus::Error);
}

#[test]
fn idle_chevron_is_idle() {
    let content = "done\n\u{276f} ";
    let v = parse(&registry(), content, ParserOptions::default());
    assert_eq!(v.status, TerminalStatus::Idle);
}

#[test]
fn bare_error_prefix_does_not_override_working() {
    let content = "Working...\nError: see log for details\nesc to interrupt";
    let v = parse(&registry(), content, ParserOptions::default());
    // generic_error_prefix confidence (0.4) is below the error threshold (0.7),
    // so it must not win over the working-class match.
    assert_eq!(v.status, TerminalStatus::Working);
}

#[test]
fn parser_is_idempotent() {
    let content = "Allow this command? (Bash)\n1. Yes\n2. No\n[y/n]:";
    let a = parse(&registry(), content, ParserOptions::default());
    let b = parse(&registry(), content, ParserOptions::default());
    assert_eq!(a, b);
}

#[test]
fn numbered_options_are_extracted_in_order() {
    let content = "Select an option:\n1. First\n2. Second\n3. Third\n[y/n]:";
    let v = parse(&registry(), content, ParserOptions::default());
    let prompt = v.prompt.expect("expected a prompt");
    let options = match prompt {
        TerminalPrompt::Question { options, .. } => options,
        TerminalPrompt::Permission { options, .. } => options,
        other => panic!("unexpected prompt kind: {other:?}"),
    };
    assert_eq!(options.len(), 3);
    assert_eq!(options[0].label, "First");
    assert_eq!(options[2].key, "3");
}

#[test]
fn content_hash_is_stable_for_equal_prompts() {
    let content = "Allow this command? (Bash)\n1. Yes\n2. No\n";
    let a = parse(&registry(), content, ParserOptions::default());
    let b = parse(&registry(), content, ParserOptions::default());
    let (Some(pa), Some(pb)) = (a.prompt, b.prompt) else {
        panic!("expected prompts on both parses");
    };
    assert_eq!(pa.content_hash(), pb.content_hash());
}

#[test]
fn only_last_k_lines_are_considered() {
    let mut lines: Vec<String> = (0..200).map(|i| format!("line {i}")).collect();
    lines.push("Allow this command? (Bash)".to_owned());
    let content = lines.join("\n");
    let v = parse(&registry(), &content, ParserOptions { tail_lines: 150, window_lines: 50 });
    assert_eq!(v.status, TerminalStatus::Waiting);
}
