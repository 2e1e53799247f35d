//! Human review gate.
//!
//! An optional synchronous checkpoint between the reasoning step and
//! execution. The orchestrator calls `review` with the proposed tool
//! call and suspends until the operator answers; there is no timeout,
//! and an unresponsive operator stalls the run indefinitely. That is
//! accepted behavior for an attended assessment.

use redscout_provider::ToolCall;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

/// The operator's verdict on a proposed tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Execute the call unchanged.
    Approve,
    /// Execute with the named arguments replaced; unnamed arguments
    /// are preserved verbatim.
    Edit(BTreeMap<String, Value>),
    /// Do not execute; the conversation receives a rejection notice.
    Reject,
    /// Terminate the entire run immediately.
    Abort,
}

/// A synchronous decision source the orchestrator blocks on.
pub trait ReviewGate: Send + Sync {
    /// Present the proposed call and wait for exactly one decision.
    fn review(&self, call: &ToolCall) -> io::Result<GateDecision>;
}

/// Console gate reading decisions from stdin.
pub struct ConsoleGate;

impl ConsoleGate {
    fn prompt(out: &mut impl Write, text: &str) -> io::Result<()> {
        write!(out, "{}", text)?;
        out.flush()
    }

    fn read_line(input: &mut impl BufRead) -> io::Result<String> {
        let mut line = String::new();
        input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// Interactive edit over the call's named arguments. Blank input
    /// preserves the existing value; non-blank input is parsed as
    /// JSON where possible and taken as a string otherwise.
    fn edit_fields(
        call: &ToolCall,
        input: &mut impl BufRead,
        out: &mut impl Write,
    ) -> io::Result<BTreeMap<String, Value>> {
        let mut updates = BTreeMap::new();
        let Some(fields) = call.arguments.as_object() else {
            return Ok(updates);
        };

        for (name, current) in fields {
            Self::prompt(out, &format!("  {} [{}]: ", name, current))?;
            let line = Self::read_line(input)?;
            if line.is_empty() {
                continue;
            }
            let value = serde_json::from_str(&line).unwrap_or(Value::String(line));
            updates.insert(name.clone(), value);
        }
        Ok(updates)
    }

    fn review_with(
        call: &ToolCall,
        input: &mut impl BufRead,
        out: &mut impl Write,
    ) -> io::Result<GateDecision> {
        writeln!(out, "\nProposed action: {}", call.name)?;
        writeln!(
            out,
            "{}",
            serde_json::to_string_pretty(&call.arguments).unwrap_or_default()
        )?;

        loop {
            Self::prompt(out, "[a]pprove / [e]dit / [r]eject / abort? ")?;
            match Self::read_line(input)?.to_lowercase().as_str() {
                "a" | "approve" => return Ok(GateDecision::Approve),
                "e" | "edit" => {
                    let updates = Self::edit_fields(call, input, out)?;
                    return Ok(GateDecision::Edit(updates));
                }
                "r" | "reject" => return Ok(GateDecision::Reject),
                "abort" => return Ok(GateDecision::Abort),
                other => {
                    writeln!(out, "Unrecognized decision: {:?}", other)?;
                }
            }
        }
    }
}

impl ReviewGate for ConsoleGate {
    fn review(&self, call: &ToolCall) -> io::Result<GateDecision> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stderr();
        Self::review_with(call, &mut input, &mut out)
    }
}

/// Scripted gate for tests: replays a fixed decision sequence.
pub struct ScriptedGate {
    decisions: std::sync::Mutex<std::collections::VecDeque<GateDecision>>,
}

impl ScriptedGate {
    /// Create a gate that replays `decisions` in order.
    pub fn new(decisions: Vec<GateDecision>) -> Self {
        Self {
            decisions: std::sync::Mutex::new(decisions.into()),
        }
    }
}

impl ReviewGate for ScriptedGate {
    fn review(&self, _call: &ToolCall) -> io::Result<GateDecision> {
        Ok(self
            .decisions
            .lock()
            .expect("gate script lock")
            .pop_front()
            .unwrap_or(GateDecision::Approve))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call() -> ToolCall {
        ToolCall {
            id: "call_0".to_string(),
            name: "http_get".to_string(),
            arguments: json!({"url": "http://old", "use_cookie_jar": true}),
        }
    }

    #[test]
    fn test_approve_and_reject() {
        let mut out = Vec::new();
        let decision =
            ConsoleGate::review_with(&call(), &mut "approve\n".as_bytes(), &mut out).unwrap();
        assert_eq!(decision, GateDecision::Approve);

        let decision = ConsoleGate::review_with(&call(), &mut "r\n".as_bytes(), &mut out).unwrap();
        assert_eq!(decision, GateDecision::Reject);
    }

    #[test]
    fn test_unrecognized_input_reprompts() {
        let mut out = Vec::new();
        let decision =
            ConsoleGate::review_with(&call(), &mut "what\nabort\n".as_bytes(), &mut out).unwrap();
        assert_eq!(decision, GateDecision::Abort);
        assert!(String::from_utf8_lossy(&out).contains("Unrecognized decision"));
    }

    #[test]
    fn test_edit_blank_preserves_field() {
        // First field (url) edited, second (use_cookie_jar) left blank.
        let mut out = Vec::new();
        let input = "e\n\"http://new\"\n\n";
        let decision =
            ConsoleGate::review_with(&call(), &mut input.as_bytes(), &mut out).unwrap();

        let GateDecision::Edit(updates) = decision else {
            panic!("expected edit decision");
        };
        assert_eq!(updates.len(), 1);
        assert_eq!(updates["url"], json!("http://new"));
        assert!(!updates.contains_key("use_cookie_jar"));
    }

    #[test]
    fn test_edit_plain_text_becomes_string() {
        let mut out = Vec::new();
        let input = "e\nhttp://plain\nfalse\n";
        let decision =
            ConsoleGate::review_with(&call(), &mut input.as_bytes(), &mut out).unwrap();

        let GateDecision::Edit(updates) = decision else {
            panic!("expected edit decision");
        };
        assert_eq!(updates["url"], json!("http://plain"));
        assert_eq!(updates["use_cookie_jar"], json!(false));
    }

    #[test]
    fn test_scripted_gate_replays_in_order() {
        let gate = ScriptedGate::new(vec![GateDecision::Reject, GateDecision::Abort]);
        assert_eq!(gate.review(&call()).unwrap(), GateDecision::Reject);
        assert_eq!(gate.review(&call()).unwrap(), GateDecision::Abort);
        // Exhausted scripts default to approval.
        assert_eq!(gate.review(&call()).unwrap(), GateDecision::Approve);
    }
}
