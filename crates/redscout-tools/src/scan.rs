//! Network reconnaissance.

use crate::{normalize_output, parse_args, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use redscout_sandbox::shell_escape;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct PortScanArgs {
    host: String,
}

/// Full-range service-detection port scan of a single host.
pub struct PortScanTool;

#[async_trait]
impl Tool for PortScanTool {
    fn name(&self) -> &str {
        "port_scan"
    }

    fn description(&self) -> &str {
        "Scan all TCP ports of a host with service and version detection. \
         Slow but thorough; use it once per host early in the assessment \
         and refer back to the results."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "host": {
                    "type": "string",
                    "description": "Hostname or IP address to scan"
                }
            },
            "required": ["host"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let args: PortScanArgs = parse_args(args)?;
        let host = args.host.trim();
        if host.is_empty() {
            return Err(crate::ToolError::validation("host must not be empty"));
        }

        debug!(session_id = %ctx.session_id, host, "starting port scan");
        let command = format!("nmap -p- -sV {}", shell_escape(host));
        let output = ctx.sandbox.execute(&command).await?;
        Ok(normalize_output(output, host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_context, FakeSandbox};
    use crate::ToolError;

    #[tokio::test]
    async fn test_scan_command_shape() {
        let sandbox = FakeSandbox::new();
        sandbox.push_output("22/tcp open ssh");
        let ctx = test_context(sandbox.clone());
        let output = PortScanTool
            .execute(json!({"host": "10.0.0.5"}), &ctx)
            .await
            .unwrap();
        assert_eq!(output, "22/tcp open ssh");
        assert_eq!(sandbox.commands(), vec!["nmap -p- -sV '10.0.0.5'"]);
    }

    #[tokio::test]
    async fn test_empty_host_rejected() {
        let sandbox = FakeSandbox::new();
        let ctx = test_context(sandbox);
        let err = PortScanTool
            .execute(json!({"host": "  "}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn test_silent_host_normalized() {
        let sandbox = FakeSandbox::new();
        let ctx = test_context(sandbox);
        let output = PortScanTool
            .execute(json!({"host": "10.0.0.9"}), &ctx)
            .await
            .unwrap();
        assert_eq!(output, "No response from 10.0.0.9. Host may be unreachable.");
    }
}
