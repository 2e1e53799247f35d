//! Control loop driving one assessment session.
//!
//! A state machine over REASON, REVIEW, EXECUTE, and END. The
//! orchestrator owns termination detection and guarantees sandbox
//! teardown on every exit path; within one run the states execute
//! strictly sequentially.

use crate::config::AgentConfig;
use crate::conversation::Conversation;
use crate::error::{CoreError, CoreResult};
use crate::gate::{GateDecision, ReviewGate};
use redscout_provider::{BoxedLanguageModel, Message, ToolCall, ToolDescriptor, ToolResultRecord};
use redscout_sandbox::SandboxRuntime;
use redscout_tools::{ToolContext, ToolRegistry};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const SYSTEM_PROMPT: &str = "\
You are an autonomous security assessor operating inside a disposable, \
isolated sandbox. Work step by step: enumerate the target, probe the \
services you find, and verify every finding before reporting it. Use \
one tool at a time and read its output before deciding the next step. \
When you have finished, reply with 'assessment complete' followed by a \
summary of your findings.";

/// How a run ended, for runs that ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The assistant signalled completion.
    Completed,
    /// The iteration cap fired before a completion signal.
    IterationCapReached,
}

/// The result of a finished run.
#[derive(Debug)]
pub struct RunReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// The full transcript.
    pub conversation: Conversation,
    /// Reasoning iterations consumed.
    pub iterations: u32,
}

/// Drives one session: reason, optionally review, execute, repeat.
pub struct Orchestrator {
    model: BoxedLanguageModel,
    sandbox: Arc<dyn SandboxRuntime>,
    registry: ToolRegistry,
    gate: Option<Box<dyn ReviewGate>>,
    max_iterations: u32,
    termination_phrases: Vec<String>,
}

impl Orchestrator {
    /// Create an orchestrator for one session.
    pub fn new(
        config: &AgentConfig,
        model: BoxedLanguageModel,
        sandbox: Arc<dyn SandboxRuntime>,
        registry: ToolRegistry,
        gate: Option<Box<dyn ReviewGate>>,
    ) -> Self {
        Self {
            model,
            sandbox,
            registry,
            gate,
            max_iterations: config.max_iterations,
            termination_phrases: config.termination_phrases.clone(),
        }
    }

    /// Run a full assessment of `target`.
    ///
    /// The sandbox is created up front and destroyed exactly once on
    /// every termination path; a teardown failure is logged but never
    /// overrides the run's own outcome.
    pub async fn run(&self, target: &str) -> CoreResult<RunReport> {
        let session_id = self.sandbox.session_id().to_string();
        info!(
            session_id,
            target,
            provider = self.model.provider_id(),
            model = self.model.model_id(),
            "starting assessment run"
        );

        // Create failure is fatal and re-raised; there is no session
        // to tear down yet.
        self.sandbox.create().await?;

        let mut conversation = Conversation::new(&session_id);
        conversation.push(Message::system(SYSTEM_PROMPT));
        conversation.push(Message::user(format!(
            "Perform a security assessment on {}.",
            target
        )));

        let result = self.drive(&mut conversation).await;

        if let Err(e) = self.sandbox.destroy().await {
            warn!(session_id, error = %e, "sandbox teardown failed");
        }

        match result {
            Ok((outcome, iterations)) => {
                info!(session_id, ?outcome, iterations, messages = conversation.len(), "run finished");
                Ok(RunReport {
                    outcome,
                    conversation,
                    iterations,
                })
            }
            Err(e) => {
                error!(session_id, error = %e, messages = conversation.len(), "run terminated");
                Err(e)
            }
        }
    }

    /// The reason/review/execute loop. Never touches teardown; `run`
    /// owns that.
    async fn drive(&self, conversation: &mut Conversation) -> CoreResult<(RunOutcome, u32)> {
        let session_id = conversation.session_id().to_string();
        let descriptors = self.descriptors();

        for iteration in 0..self.max_iterations {
            debug!(session_id, iteration, state = "reason", "requesting next step");
            let message = self
                .model
                .complete(conversation.messages(), &descriptors)
                .await?;
            conversation.push(message.clone());

            let mut calls = message.tool_calls.clone().into_iter();
            if let Some(mut call) = calls.next() {
                // Only the first call of a turn is actioned; the rest
                // are recorded as not actioned and must be re-proposed.
                for discarded in calls {
                    warn!(session_id, tool = %discarded.name, "discarding extra tool call");
                    conversation.push(Message::tool_result(&ToolResultRecord::err(
                        &discarded.id,
                        format!(
                            "Not actioned: only the first tool call in a turn is executed. \
                             Propose '{}' again in a later turn.",
                            discarded.name
                        ),
                    )));
                }

                if let Some(gate) = &self.gate {
                    debug!(session_id, iteration, state = "review", tool = %call.name, "awaiting operator");
                    match gate.review(&call)? {
                        GateDecision::Approve => {}
                        GateDecision::Edit(updates) => {
                            info!(session_id, tool = %call.name, edited = updates.len(), "operator edited arguments");
                            apply_edits(&mut call, updates);
                        }
                        GateDecision::Reject => {
                            info!(session_id, tool = %call.name, "operator rejected tool call");
                            conversation.push(Message::tool_result(&ToolResultRecord::err(
                                &call.id,
                                "Rejected by operator. The proposed action was not executed.",
                            )));
                            continue;
                        }
                        GateDecision::Abort => {
                            warn!(session_id, "operator aborted the run");
                            return Err(CoreError::HumanAbort);
                        }
                    }
                }

                debug!(session_id, iteration, state = "execute", tool = %call.name, "dispatching");
                let record = self.dispatch(&session_id, &call).await?;
                conversation.push(Message::tool_result(&record));
            } else if self.is_termination(&message.content) {
                debug!(session_id, iteration, state = "end", "termination phrase matched");
                return Ok((RunOutcome::Completed, iteration + 1));
            }
        }

        warn!(session_id, cap = self.max_iterations, "iteration cap reached");
        Ok((RunOutcome::IterationCapReached, self.max_iterations))
    }

    /// Validate and execute one tool call inside the sandbox.
    ///
    /// Recoverable failures (unknown tool, malformed arguments) become
    /// tool output so the reasoning backend can adapt; sandbox-level
    /// failures are fatal and propagate.
    async fn dispatch(&self, session_id: &str, call: &ToolCall) -> CoreResult<ToolResultRecord> {
        let Some(tool) = self.registry.get(&call.name) else {
            let mut names = self.registry.list();
            names.sort_unstable();
            return Ok(ToolResultRecord::err(
                &call.id,
                format!(
                    "Unknown tool: {}. Available tools: {}",
                    call.name,
                    names.join(", ")
                ),
            ));
        };

        let ctx = ToolContext {
            session_id: session_id.to_string(),
            sandbox: self.sandbox.clone(),
        };
        info!(session_id, tool = %call.name, "executing tool");
        match tool.execute(call.arguments.clone(), &ctx).await {
            Ok(output) => Ok(ToolResultRecord::ok(&call.id, output)),
            Err(e) if e.is_recoverable() => Ok(ToolResultRecord::err(&call.id, e.to_string())),
            Err(redscout_tools::ToolError::Sandbox(e)) => Err(CoreError::Sandbox(e)),
            Err(e) => Err(CoreError::Tool(e)),
        }
    }

    /// Case-insensitive match against the configured completion
    /// phrases. Free-text matching is a fragile heuristic; a
    /// structured completion signal from the backend would be better.
    fn is_termination(&self, content: &str) -> bool {
        let lowered = content.to_lowercase();
        self.termination_phrases
            .iter()
            .any(|phrase| lowered.contains(&phrase.to_lowercase()))
    }

    /// Capability descriptors advertised to the backend, in a stable
    /// order.
    fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> = self
            .registry
            .all()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }
}

/// Replace only the named arguments; everything else is preserved
/// verbatim.
fn apply_edits(call: &mut ToolCall, updates: BTreeMap<String, Value>) {
    if let Some(arguments) = call.arguments.as_object_mut() {
        for (field, value) in updates {
            arguments.insert(field, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::ScriptedGate;
    use redscout_provider::mock::MockProvider;
    use redscout_provider::Role;
    use redscout_sandbox::{SandboxError, SandboxResult, SandboxStatus};
    use serde_json::json;
    use std::sync::Mutex;

    /// Sandbox double that counts lifecycle calls and replays
    /// canned command output.
    struct CountingSandbox {
        creates: Mutex<usize>,
        destroys: Mutex<usize>,
        commands: Mutex<Vec<String>>,
        outputs: Mutex<Vec<String>>,
        fail_create: bool,
    }

    impl CountingSandbox {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                creates: Mutex::new(0),
                destroys: Mutex::new(0),
                commands: Mutex::new(Vec::new()),
                outputs: Mutex::new(Vec::new()),
                fail_create: false,
            })
        }

        fn failing_create() -> Arc<Self> {
            Arc::new(Self {
                creates: Mutex::new(0),
                destroys: Mutex::new(0),
                commands: Mutex::new(Vec::new()),
                outputs: Mutex::new(Vec::new()),
                fail_create: true,
            })
        }

        fn push_output(&self, output: impl Into<String>) {
            self.outputs.lock().unwrap().push(output.into());
        }

        fn creates(&self) -> usize {
            *self.creates.lock().unwrap()
        }

        fn destroys(&self) -> usize {
            *self.destroys.lock().unwrap()
        }

        fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl SandboxRuntime for CountingSandbox {
        fn session_id(&self) -> &str {
            "test-session"
        }

        async fn status(&self) -> SandboxStatus {
            SandboxStatus::Running
        }

        async fn create(&self) -> SandboxResult<()> {
            *self.creates.lock().unwrap() += 1;
            if self.fail_create {
                return Err(SandboxError::create_failed("image missing"));
            }
            Ok(())
        }

        async fn execute(&self, command: &str) -> SandboxResult<String> {
            self.commands.lock().unwrap().push(command.to_string());
            let mut outputs = self.outputs.lock().unwrap();
            if outputs.is_empty() {
                Ok("ok".to_string())
            } else {
                Ok(outputs.remove(0))
            }
        }

        async fn activate_runtime(&self) -> SandboxResult<()> {
            Ok(())
        }

        async fn destroy(&self) -> SandboxResult<()> {
            *self.destroys.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn orchestrator(
        mock: Arc<MockProvider>,
        sandbox: Arc<CountingSandbox>,
        gate: Option<Box<dyn ReviewGate>>,
        max_iterations: u32,
    ) -> Orchestrator {
        let config = AgentConfig {
            max_iterations,
            ..AgentConfig::default()
        };
        Orchestrator::new(&config, mock, sandbox, ToolRegistry::with_builtins(), gate)
    }

    #[tokio::test]
    async fn test_completed_run_destroys_sandbox_once() {
        let mock = Arc::new(MockProvider::new());
        mock.expect_text("Assessment complete. No exposed services found.");
        let sandbox = CountingSandbox::new();

        let report = orchestrator(mock, sandbox.clone(), None, 10)
            .run("10.0.0.1")
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.iterations, 1);
        assert_eq!(sandbox.creates(), 1);
        assert_eq!(sandbox.destroys(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_paired_with_result_before_next_reason() {
        let mock = Arc::new(MockProvider::new());
        mock.expect_tool_call("c1", "shell", json!({"command": "id"}));
        mock.expect_text("assessment complete");
        let sandbox = CountingSandbox::new();
        sandbox.push_output("uid=1000(scout)");

        let report = orchestrator(mock, sandbox.clone(), None, 10)
            .run("10.0.0.1")
            .await
            .unwrap();

        assert_eq!(sandbox.commands(), vec!["id"]);
        let messages = report.conversation.messages();
        // system, user, assistant+call, tool result, assistant
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].role, Role::Tool);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(messages[3].content, "uid=1000(scout)");
        assert_eq!(messages[4].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_rejected_call_never_executes() {
        let mock = Arc::new(MockProvider::new());
        mock.expect_tool_call("c1", "shell", json!({"command": "rm -rf /"}));
        mock.expect_text("assessment complete");
        let sandbox = CountingSandbox::new();
        let gate = Box::new(ScriptedGate::new(vec![GateDecision::Reject]));

        let report = orchestrator(mock, sandbox.clone(), Some(gate), 10)
            .run("10.0.0.1")
            .await
            .unwrap();

        assert!(sandbox.commands().is_empty());
        let rejection = &report.conversation.messages()[3];
        assert_eq!(rejection.role, Role::Tool);
        assert!(rejection.content.contains("Rejected by operator"));
        assert_eq!(sandbox.destroys(), 1);
    }

    #[tokio::test]
    async fn test_edit_changes_only_named_argument() {
        let mock = Arc::new(MockProvider::new());
        mock.expect_tool_call(
            "c1",
            "http_get",
            json!({"url": "http://internal-admin", "use_cookie_jar": true}),
        );
        mock.expect_text("assessment complete");
        let sandbox = CountingSandbox::new();
        sandbox.push_output("<html>ok</html>");

        let mut updates = BTreeMap::new();
        updates.insert("url".to_string(), json!("http://10.0.0.1/login"));
        let gate = Box::new(ScriptedGate::new(vec![GateDecision::Edit(updates)]));

        orchestrator(mock, sandbox.clone(), Some(gate), 10)
            .run("10.0.0.1")
            .await
            .unwrap();

        let commands = sandbox.commands();
        assert_eq!(commands.len(), 1);
        // Edited field applied, untouched field preserved verbatim.
        assert!(commands[0].contains("'http://10.0.0.1/login'"));
        assert!(commands[0].contains("--cookie-jar '/home/scout/.cookie-jar'"));
    }

    #[tokio::test]
    async fn test_iteration_cap_forces_end() {
        let mock = Arc::new(MockProvider::new());
        mock.expect_text("still enumerating");
        mock.expect_text("trying another angle");
        mock.expect_text("one more idea");
        let sandbox = CountingSandbox::new();

        let report = orchestrator(mock.clone(), sandbox.clone(), None, 3)
            .run("10.0.0.1")
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::IterationCapReached);
        assert_eq!(report.iterations, 3);
        assert_eq!(mock.call_count(), 3);
        assert_eq!(sandbox.destroys(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_fatal_without_retry() {
        let mock = Arc::new(MockProvider::new());
        mock.expect_error("backend unavailable");
        let sandbox = CountingSandbox::new();

        let err = orchestrator(mock.clone(), sandbox.clone(), None, 10)
            .run("10.0.0.1")
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Provider(_)));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(sandbox.destroys(), 1);
    }

    #[tokio::test]
    async fn test_only_first_of_multiple_calls_is_actioned() {
        let mock = Arc::new(MockProvider::new());
        mock.expect_tool_calls(vec![
            ToolCall {
                id: "c1".to_string(),
                name: "shell".to_string(),
                arguments: json!({"command": "id"}),
            },
            ToolCall {
                id: "c2".to_string(),
                name: "shell".to_string(),
                arguments: json!({"command": "whoami"}),
            },
        ]);
        mock.expect_text("assessment complete");
        let sandbox = CountingSandbox::new();
        sandbox.push_output("uid=1000");

        let report = orchestrator(mock, sandbox.clone(), None, 10)
            .run("10.0.0.1")
            .await
            .unwrap();

        assert_eq!(sandbox.commands(), vec!["id"]);
        let notice = report
            .conversation
            .messages()
            .iter()
            .find(|m| m.tool_call_id.as_deref() == Some("c2"))
            .expect("discard notice for second call");
        assert!(notice.content.contains("Not actioned"));
    }

    #[tokio::test]
    async fn test_abort_terminates_with_single_teardown() {
        let mock = Arc::new(MockProvider::new());
        mock.expect_tool_call("c1", "shell", json!({"command": "id"}));
        let sandbox = CountingSandbox::new();
        let gate = Box::new(ScriptedGate::new(vec![GateDecision::Abort]));

        let err = orchestrator(mock, sandbox.clone(), Some(gate), 10)
            .run("10.0.0.1")
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::HumanAbort));
        assert!(sandbox.commands().is_empty());
        assert_eq!(sandbox.destroys(), 1);
    }

    #[tokio::test]
    async fn test_create_failure_is_fatal() {
        let mock = Arc::new(MockProvider::new());
        let sandbox = CountingSandbox::failing_create();

        let err = orchestrator(mock.clone(), sandbox.clone(), None, 10)
            .run("10.0.0.1")
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Sandbox(_)));
        assert_eq!(sandbox.creates(), 1);
        // No session ever existed, so there is nothing to tear down.
        assert_eq!(sandbox.destroys(), 0);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_feeds_back_as_output() {
        let mock = Arc::new(MockProvider::new());
        mock.expect_tool_call("c1", "rm_rf", json!({}));
        mock.expect_text("assessment complete");
        let sandbox = CountingSandbox::new();

        let report = orchestrator(mock, sandbox.clone(), None, 10)
            .run("10.0.0.1")
            .await
            .unwrap();

        assert!(sandbox.commands().is_empty());
        let result = &report.conversation.messages()[3];
        assert!(result.content.contains("Unknown tool: rm_rf"));
        assert!(result.content.contains("shell"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_feed_back_as_output() {
        let mock = Arc::new(MockProvider::new());
        mock.expect_tool_call("c1", "port_scan", json!({"target": "10.0.0.1"}));
        mock.expect_text("assessment complete");
        let sandbox = CountingSandbox::new();

        let report = orchestrator(mock, sandbox.clone(), None, 10)
            .run("10.0.0.1")
            .await
            .unwrap();

        assert!(sandbox.commands().is_empty());
        let result = &report.conversation.messages()[3];
        assert!(result.content.contains("Validation error"));
    }

    #[test]
    fn test_termination_is_case_insensitive() {
        let mock = Arc::new(MockProvider::new());
        let orchestrator = orchestrator(mock, CountingSandbox::new(), None, 10);
        assert!(orchestrator.is_termination("ASSESSMENT COMPLETE: two findings."));
        assert!(orchestrator.is_termination("The assessment complete phrase, embedded."));
        assert!(!orchestrator.is_termination("assessment is ongoing"));
    }
}
