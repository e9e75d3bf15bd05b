//! JSON action scripts.
//!
//! A script is an array whose entries are either a single action or an
//! array of actions. An array is replayed as one gesture, so it becomes a
//! single undo step and its follow-ups see each other's effects.

use anyhow::{Context, Result};
use formdraft_core::{Action, Editor, Notice};
use serde::Deserialize;
use std::path::Path;

/// One entry of a script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Gesture(Vec<Action>),
    Single(Action),
}

impl Step {
    fn into_actions(self) -> Vec<Action> {
        match self {
            Step::Gesture(actions) => actions,
            Step::Single(action) => vec![action],
        }
    }
}

/// Parse a script from JSON text.
pub fn parse_script(json: &str) -> Result<Vec<Step>> {
    serde_json::from_str(json).context("invalid action script")
}

/// Read and parse a script file.
pub fn load_script(path: &Path) -> Result<Vec<Step>> {
    let json = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    parse_script(&json).with_context(|| format!("in {}", path.display()))
}

/// Replay every step and collect the notices raised along the way.
pub fn replay(editor: &mut Editor, steps: Vec<Step>) -> Vec<Notice> {
    let mut notices = Vec::new();
    for (index, step) in steps.into_iter().enumerate() {
        let actions = step.into_actions();
        log::debug!("Step {}: {} action(s)", index, actions.len());
        editor.dispatch_gesture(actions);
        notices.extend(editor.take_notices());
    }
    notices
}
