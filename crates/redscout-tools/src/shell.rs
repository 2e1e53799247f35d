//! Unrestricted shell fallback.

use crate::{normalize_output, parse_args, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Deserialize)]
struct ShellArgs {
    command: String,
}

/// Arbitrary command execution inside the sandbox.
///
/// Intentionally unconstrained: the safety boundary is the sandbox's
/// privilege and resource envelope, not command-string filtering.
pub struct ShellTool;

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute an arbitrary shell command inside the sandbox. Use this \
         when no other tool covers what you need. Pipes, redirects, and \
         quoting are passed through to the inner shell verbatim."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let args: ShellArgs = parse_args(args)?;
        let command = args.command.trim_end_matches('\n');

        info!(session_id = %ctx.session_id, command = ?command, "running shell command");
        let output = ctx.sandbox.execute(command).await?;
        Ok(normalize_output(output, "command"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_context, FakeSandbox};

    #[tokio::test]
    async fn test_trims_only_trailing_newlines() {
        let sandbox = FakeSandbox::new();
        sandbox.push_output("root\n");
        let ctx = test_context(sandbox.clone());

        ShellTool
            .execute(json!({"command": "whoami | head -1\n\n"}), &ctx)
            .await
            .unwrap();

        assert_eq!(sandbox.commands(), vec!["whoami | head -1"]);
    }

    #[tokio::test]
    async fn test_pipes_preserved_verbatim() {
        let sandbox = FakeSandbox::new();
        sandbox.push_output("2");
        let ctx = test_context(sandbox.clone());

        let output = ShellTool
            .execute(json!({"command": "cat /etc/passwd | grep -c bash > /tmp/n; cat /tmp/n"}), &ctx)
            .await
            .unwrap();

        assert_eq!(output, "2");
        assert_eq!(
            sandbox.commands(),
            vec!["cat /etc/passwd | grep -c bash > /tmp/n; cat /tmp/n"]
        );
    }

    #[tokio::test]
    async fn test_silent_command_normalized() {
        let sandbox = FakeSandbox::new();
        let ctx = test_context(sandbox);
        let output = ShellTool
            .execute(json!({"command": "true"}), &ctx)
            .await
            .unwrap();
        assert_eq!(output, "No response from command. Host may be unreachable.");
    }
}
