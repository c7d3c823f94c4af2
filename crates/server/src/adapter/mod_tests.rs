// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

use super::*;
use paneboard_core::terminal::ProcessClass;

#[test]
fn known_assistant_command_classifies_directly() {
    assert_eq!(classify_process("claude", &[]), ProcessClass::Assistant);
}

#[test]
fn shell_with_assistant_child_classifies_as_assistant() {
    let children = vec!["claude".to_owned()];
    assert_eq!(classify_process("bash", &children), ProcessClass::Assistant);
}

#[test]
fn shell_with_non_assistant_children_is_generic_process() {
    let children = vec!["vim".to_owned()];
    assert_eq!(classify_process("zsh", &children), ProcessClass::GenericProcess);
}

#[test]
fn bare_shell_with_no_children_is_shell() {
    assert_eq!(classify_process("bash", &[]), ProcessClass::Shell);
}

#[test]
fn unknown_command_with_children_is_generic_process() {
    let children = vec!["make".to_owned()];
    assert_eq!(classify_process("node", &children), ProcessClass::GenericProcess);
}

#[test]
fn unknown_command_with_no_children_is_empty() {
    assert_eq!(classify_process("node", &[]), ProcessClass::Empty);
}
