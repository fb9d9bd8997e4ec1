// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event-sequence ordering validation.
//!
//! Checks a recorded run against the protocol ordering rules: lifecycle
//! framing, per-message START/CONTENT/END ordering, and the tool-call
//! lifecycle. Violations are accumulated, not short-circuited.

use crate::Event;
use std::collections::HashMap;
use std::fmt;

/// An individual ordering violation found in an event sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The sequence is empty.
    EmptyRun,
    /// The first event is not `RUN_STARTED`.
    FirstEventNotRunStarted,
    /// More than one `RUN_STARTED` was observed.
    DuplicateRunStarted,
    /// No terminal event closes the run.
    MissingTerminal,
    /// More than one terminal event was observed.
    DuplicateTerminal,
    /// Events were observed after the terminal event.
    EventAfterTerminal {
        /// Wire tag of the trailing event.
        kind: &'static str,
    },
    /// A text event referenced a message id with no open `TEXT_MESSAGE_START`.
    TextOutsideMessage {
        /// Offending message identifier.
        message_id: String,
    },
    /// `TEXT_MESSAGE_START` reused an already-seen message id.
    DuplicateMessageId {
        /// Reused message identifier.
        message_id: String,
    },
    /// A message was opened but never closed.
    UnclosedMessage {
        /// Dangling message identifier.
        message_id: String,
    },
    /// A tool event referenced a tool-call id with no open `TOOL_CALL_START`.
    ToolEventOutsideCall {
        /// Offending tool-call identifier.
        tool_call_id: String,
    },
    /// `TOOL_CALL_START` reused an already-seen tool-call id.
    DuplicateToolCallId {
        /// Reused tool-call identifier.
        tool_call_id: String,
    },
    /// `TOOL_CALL_ARGS` arrived after the call's `TOOL_CALL_END`.
    ArgsAfterEnd {
        /// Offending tool-call identifier.
        tool_call_id: String,
    },
    /// `TOOL_CALL_RESULT` arrived before the call's `TOOL_CALL_END`.
    ResultBeforeEnd {
        /// Offending tool-call identifier.
        tool_call_id: String,
    },
    /// A tool call was opened but never closed.
    UnclosedToolCall {
        /// Dangling tool-call identifier.
        tool_call_id: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRun => write!(f, "run contains no events"),
            Self::FirstEventNotRunStarted => write!(f, "first event is not RUN_STARTED"),
            Self::DuplicateRunStarted => write!(f, "more than one RUN_STARTED"),
            Self::MissingTerminal => write!(f, "run has no terminal event"),
            Self::DuplicateTerminal => write!(f, "more than one terminal event"),
            Self::EventAfterTerminal { kind } => {
                write!(f, "{kind} observed after the terminal event")
            }
            Self::TextOutsideMessage { message_id } => {
                write!(f, "text event for unopened message {message_id}")
            }
            Self::DuplicateMessageId { message_id } => {
                write!(f, "message id {message_id} reused")
            }
            Self::UnclosedMessage { message_id } => {
                write!(f, "message {message_id} never closed")
            }
            Self::ToolEventOutsideCall { tool_call_id } => {
                write!(f, "tool event for unopened call {tool_call_id}")
            }
            Self::DuplicateToolCallId { tool_call_id } => {
                write!(f, "tool call id {tool_call_id} reused")
            }
            Self::ArgsAfterEnd { tool_call_id } => {
                write!(f, "TOOL_CALL_ARGS after TOOL_CALL_END for {tool_call_id}")
            }
            Self::ResultBeforeEnd { tool_call_id } => {
                write!(f, "TOOL_CALL_RESULT before TOOL_CALL_END for {tool_call_id}")
            }
            Self::UnclosedToolCall { tool_call_id } => {
                write!(f, "tool call {tool_call_id} never closed")
            }
        }
    }
}

impl std::error::Error for Violation {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolState {
    Streaming,
    Ended,
    Resolved,
}

/// Check a recorded event sequence against the ordering rules.
///
/// Returns every violation found; an empty vector means the run is
/// well-formed.
pub fn check_run(events: &[Event]) -> Vec<Violation> {
    let mut violations = Vec::new();

    if events.is_empty() {
        violations.push(Violation::EmptyRun);
        return violations;
    }

    if !matches!(events[0], Event::RunStarted { .. }) {
        violations.push(Violation::FirstEventNotRunStarted);
    }

    let mut started = 0usize;
    let mut terminal_seen = false;
    let mut messages: HashMap<String, MessageState> = HashMap::new();
    let mut tools: HashMap<String, ToolState> = HashMap::new();

    for ev in events {
        if terminal_seen {
            violations.push(Violation::EventAfterTerminal { kind: ev.kind() });
        }

        match ev {
            Event::RunStarted { .. } => {
                started += 1;
                if started > 1 {
                    violations.push(Violation::DuplicateRunStarted);
                }
            }
            Event::RunFinished { .. } | Event::RunError { .. } => {
                if terminal_seen {
                    violations.push(Violation::DuplicateTerminal);
                }
                terminal_seen = true;
            }

            Event::TextMessageStart { message_id, .. } => {
                if messages.insert(message_id.clone(), MessageState::Open).is_some() {
                    violations.push(Violation::DuplicateMessageId {
                        message_id: message_id.clone(),
                    });
                }
            }
            Event::TextMessageContent { message_id, .. } => {
                match messages.get(message_id) {
                    Some(MessageState::Open) => {}
                    _ => violations.push(Violation::TextOutsideMessage {
                        message_id: message_id.clone(),
                    }),
                }
            }
            Event::TextMessageEnd { message_id, .. } => match messages.get_mut(message_id) {
                Some(state @ MessageState::Open) => *state = MessageState::Closed,
                _ => violations.push(Violation::TextOutsideMessage {
                    message_id: message_id.clone(),
                }),
            },

            Event::ToolCallStart { tool_call_id, .. } => {
                if tools.insert(tool_call_id.clone(), ToolState::Streaming).is_some() {
                    violations.push(Violation::DuplicateToolCallId {
                        tool_call_id: tool_call_id.clone(),
                    });
                }
            }
            Event::ToolCallArgs { tool_call_id, .. } => match tools.get(tool_call_id) {
                Some(ToolState::Streaming) => {}
                Some(_) => violations.push(Violation::ArgsAfterEnd {
                    tool_call_id: tool_call_id.clone(),
                }),
                None => violations.push(Violation::ToolEventOutsideCall {
                    tool_call_id: tool_call_id.clone(),
                }),
            },
            Event::ToolCallEnd { tool_call_id, .. } => match tools.get_mut(tool_call_id) {
                Some(state @ ToolState::Streaming) => *state = ToolState::Ended,
                Some(_) => violations.push(Violation::ToolEventOutsideCall {
                    tool_call_id: tool_call_id.clone(),
                }),
                None => violations.push(Violation::ToolEventOutsideCall {
                    tool_call_id: tool_call_id.clone(),
                }),
            },
            Event::ToolCallResult { tool_call_id, .. } => match tools.get_mut(tool_call_id) {
                Some(state @ ToolState::Ended) => *state = ToolState::Resolved,
                Some(ToolState::Streaming) => violations.push(Violation::ResultBeforeEnd {
                    tool_call_id: tool_call_id.clone(),
                }),
                _ => violations.push(Violation::ToolEventOutsideCall {
                    tool_call_id: tool_call_id.clone(),
                }),
            },

            _ => {}
        }
    }

    if !terminal_seen {
        violations.push(Violation::MissingTerminal);
    }

    // A run that errored out is allowed to leave messages and calls dangling;
    // partial output is not retracted.
    let errored = events.iter().any(|e| matches!(e, Event::RunError { .. }));
    if !errored {
        for (id, state) in &messages {
            if *state == MessageState::Open {
                violations.push(Violation::UnclosedMessage {
                    message_id: id.clone(),
                });
            }
        }
        for (id, state) in &tools {
            if *state == ToolState::Streaming {
                violations.push(Violation::UnclosedToolCall {
                    tool_call_id: id.clone(),
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtraMap;

    fn text_start(id: &str) -> Event {
        Event::TextMessageStart {
            message_id: id.into(),
            role: "assistant".into(),
            extra: ExtraMap::new(),
        }
    }

    fn text_content(id: &str, delta: &str) -> Event {
        Event::TextMessageContent {
            message_id: id.into(),
            delta: delta.into(),
            extra: ExtraMap::new(),
        }
    }

    fn text_end(id: &str) -> Event {
        Event::TextMessageEnd {
            message_id: id.into(),
            extra: ExtraMap::new(),
        }
    }

    fn tool_start(id: &str) -> Event {
        Event::ToolCallStart {
            tool_call_id: id.into(),
            tool_call_name: "calculator".into(),
            extra: ExtraMap::new(),
        }
    }

    fn tool_args(id: &str) -> Event {
        Event::ToolCallArgs {
            tool_call_id: id.into(),
            delta: "{\"expression\"".into(),
            extra: ExtraMap::new(),
        }
    }

    fn tool_end(id: &str) -> Event {
        Event::ToolCallEnd {
            tool_call_id: id.into(),
            extra: ExtraMap::new(),
        }
    }

    fn tool_result(id: &str) -> Event {
        Event::ToolCallResult {
            tool_call_id: id.into(),
            result: "2 + 2 = 4".into(),
            extra: ExtraMap::new(),
        }
    }

    #[test]
    fn well_formed_text_run_passes() {
        let run = vec![
            Event::run_started("t", "r"),
            text_start("m1"),
            text_content("m1", "hello"),
            text_content("m1", " world"),
            text_end("m1"),
            Event::run_finished("t", "r"),
        ];
        assert!(check_run(&run).is_empty());
    }

    #[test]
    fn well_formed_tool_run_passes() {
        let run = vec![
            Event::run_started("t", "r"),
            tool_start("tc1"),
            tool_args("tc1"),
            tool_end("tc1"),
            tool_result("tc1"),
            text_start("m1"),
            text_content("m1", "the answer is 4"),
            text_end("m1"),
            Event::run_finished("t", "r"),
        ];
        assert!(check_run(&run).is_empty());
    }

    #[test]
    fn empty_run_flagged() {
        assert_eq!(check_run(&[]), vec![Violation::EmptyRun]);
    }

    #[test]
    fn missing_run_started_flagged() {
        let run = vec![text_start("m1"), text_end("m1"), Event::run_finished("t", "r")];
        let vs = check_run(&run);
        assert!(vs.contains(&Violation::FirstEventNotRunStarted));
    }

    #[test]
    fn missing_terminal_flagged() {
        let run = vec![Event::run_started("t", "r"), text_start("m1"), text_end("m1")];
        let vs = check_run(&run);
        assert!(vs.contains(&Violation::MissingTerminal));
    }

    #[test]
    fn both_terminals_flagged() {
        let run = vec![
            Event::run_started("t", "r"),
            Event::run_error("boom", None),
            Event::run_finished("t", "r"),
        ];
        let vs = check_run(&run);
        assert!(vs.contains(&Violation::DuplicateTerminal));
    }

    #[test]
    fn event_after_terminal_flagged() {
        let run = vec![
            Event::run_started("t", "r"),
            Event::run_finished("t", "r"),
            text_start("m1"),
        ];
        let vs = check_run(&run);
        assert!(vs
            .iter()
            .any(|v| matches!(v, Violation::EventAfterTerminal { .. })));
    }

    #[test]
    fn content_before_start_flagged() {
        let run = vec![
            Event::run_started("t", "r"),
            text_content("m1", "early"),
            Event::run_finished("t", "r"),
        ];
        let vs = check_run(&run);
        assert!(vs.contains(&Violation::TextOutsideMessage {
            message_id: "m1".into()
        }));
    }

    #[test]
    fn content_after_end_flagged() {
        let run = vec![
            Event::run_started("t", "r"),
            text_start("m1"),
            text_end("m1"),
            text_content("m1", "late"),
            Event::run_finished("t", "r"),
        ];
        let vs = check_run(&run);
        assert!(vs.contains(&Violation::TextOutsideMessage {
            message_id: "m1".into()
        }));
    }

    #[test]
    fn duplicate_message_id_flagged() {
        let run = vec![
            Event::run_started("t", "r"),
            text_start("m1"),
            text_end("m1"),
            text_start("m1"),
            text_end("m1"),
            Event::run_finished("t", "r"),
        ];
        let vs = check_run(&run);
        assert!(vs.contains(&Violation::DuplicateMessageId {
            message_id: "m1".into()
        }));
    }

    #[test]
    fn result_before_end_flagged() {
        let run = vec![
            Event::run_started("t", "r"),
            tool_start("tc1"),
            tool_result("tc1"),
            tool_end("tc1"),
            Event::run_finished("t", "r"),
        ];
        let vs = check_run(&run);
        assert!(vs.contains(&Violation::ResultBeforeEnd {
            tool_call_id: "tc1".into()
        }));
    }

    #[test]
    fn args_after_end_flagged() {
        let run = vec![
            Event::run_started("t", "r"),
            tool_start("tc1"),
            tool_end("tc1"),
            tool_args("tc1"),
            tool_result("tc1"),
            Event::run_finished("t", "r"),
        ];
        let vs = check_run(&run);
        assert!(vs.contains(&Violation::ArgsAfterEnd {
            tool_call_id: "tc1".into()
        }));
    }

    #[test]
    fn unclosed_message_flagged_on_success_only() {
        let success = vec![
            Event::run_started("t", "r"),
            text_start("m1"),
            Event::run_finished("t", "r"),
        ];
        assert!(check_run(&success).contains(&Violation::UnclosedMessage {
            message_id: "m1".into()
        }));

        // A run that ends in RUN_ERROR may leave the message dangling.
        let errored = vec![
            Event::run_started("t", "r"),
            text_start("m1"),
            Event::run_error("upstream failed", Some("UPSTREAM_ERROR".into())),
        ];
        assert!(!check_run(&errored).iter().any(|v| matches!(
            v,
            Violation::UnclosedMessage { .. } | Violation::UnclosedToolCall { .. }
        )));
    }

    #[test]
    fn interleaved_messages_allowed() {
        let run = vec![
            Event::run_started("t", "r"),
            text_start("m1"),
            text_start("m2"),
            text_content("m2", "b"),
            text_content("m1", "a"),
            text_end("m1"),
            text_end("m2"),
            Event::run_finished("t", "r"),
        ];
        assert!(check_run(&run).is_empty());
    }
}
