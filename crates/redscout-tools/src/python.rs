//! Python script execution inside the sandbox venv.

use crate::{parse_args, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use redscout_sandbox::shell_escape;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct RunPythonArgs {
    script: String,
}

/// Run a Python script with the virtual environment's interpreter so
/// that it sees packages installed through `pip_install`.
pub struct RunPythonTool;

#[async_trait]
impl Tool for RunPythonTool {
    fn name(&self) -> &str {
        "run_python"
    }

    fn description(&self) -> &str {
        "Run a Python script inside the sandbox. The script executes with \
         the interpreter from the sandbox's virtual environment, so packages \
         installed via pip_install are importable."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "script": {
                    "type": "string",
                    "description": "Python source to execute"
                }
            },
            "required": ["script"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let args: RunPythonArgs = parse_args(args)?;

        ctx.sandbox.activate_runtime().await?;

        let script = args.script.trim_end_matches('\n');
        let command = format!(
            "{}/bin/python3 -c {}",
            ctx.sandbox.venv_path(),
            shell_escape(script)
        );
        let output = ctx.sandbox.execute(&command).await?;
        Ok(output)
    }
}
