//! Package installation with verification probes.
//!
//! Installers never trust the package manager's exit chatter alone.
//! After the install command runs, each requested package gets its own
//! probe (`which` for OS packages, an import for Python packages) and
//! the combined report is returned so the reasoning backend can see
//! exactly which packages actually landed.

use crate::{parse_args, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use redscout_sandbox::shell_escape;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct InstallArgs {
    packages: String,
}

/// Split a comma-separated package request into trimmed names.
fn parse_packages(packages: &str, lowercase: bool) -> Vec<String> {
    packages
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            if lowercase {
                s.to_ascii_lowercase()
            } else {
                s.to_string()
            }
        })
        .collect()
}

fn packages_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "packages": {
                "type": "string",
                "description": "Comma-separated list of package names"
            }
        },
        "required": ["packages"]
    })
}

fn report(install_output: &str, checks: &[String]) -> String {
    format!(
        "Install output:\n{}\n\nVerification:\n{}",
        install_output,
        checks.join("\n")
    )
}

/// OS-level package installation via apt-get.
pub struct AptInstallTool;

#[async_trait]
impl Tool for AptInstallTool {
    fn name(&self) -> &str {
        "apt_install"
    }

    fn description(&self) -> &str {
        "Install OS packages with apt-get. Provide a comma-separated list of \
         package names. Each package is verified with a lookup probe after \
         installation; NOT_FOUND in the verification means the binary did \
         not land on the PATH."
    }

    fn parameters_schema(&self) -> Value {
        packages_schema()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let args: InstallArgs = parse_args(args)?;
        let packages = parse_packages(&args.packages, true);
        if packages.is_empty() {
            return Ok("Empty install request.".to_string());
        }

        debug!(session_id = %ctx.session_id, count = packages.len(), "installing OS packages");
        let quoted = packages
            .iter()
            .map(|p| shell_escape(p))
            .collect::<Vec<_>>()
            .join(" ");
        let command = format!(
            "export DEBIAN_FRONTEND=noninteractive && \
             sudo apt-get update -y && sudo apt-get install -y --no-install-recommends {}",
            quoted
        );
        let output = ctx.sandbox.execute(&command).await?;

        let mut checks = Vec::with_capacity(packages.len());
        for package in &packages {
            let probe = format!("which {} || echo NOT_FOUND", shell_escape(package));
            let check = ctx.sandbox.execute(&probe).await?;
            checks.push(format!("{}: {}", package, check.trim()));
        }
        Ok(report(&output, &checks))
    }
}

/// Python package installation into the sandbox's virtual environment.
pub struct PipInstallTool;

#[async_trait]
impl Tool for PipInstallTool {
    fn name(&self) -> &str {
        "pip_install"
    }

    fn description(&self) -> &str {
        "Install Python packages with pip into the sandbox's virtual \
         environment. Provide a comma-separated list of package names. Each \
         package is verified with an import probe after installation."
    }

    fn parameters_schema(&self) -> Value {
        packages_schema()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let args: InstallArgs = parse_args(args)?;
        let packages = parse_packages(&args.packages, false);
        if packages.is_empty() {
            return Ok("Empty install request.".to_string());
        }

        ctx.sandbox.activate_runtime().await?;

        debug!(session_id = %ctx.session_id, count = packages.len(), "installing Python packages");
        let venv = ctx.sandbox.venv_path();
        let quoted = packages
            .iter()
            .map(|p| shell_escape(p))
            .collect::<Vec<_>>()
            .join(" ");
        let command = format!("{}/bin/pip install --no-cache-dir {}", venv, quoted);
        let output = ctx.sandbox.execute(&command).await?;

        let mut checks = Vec::with_capacity(packages.len());
        for package in &packages {
            let snippet = format!("import {pkg}; print({pkg}.__version__)", pkg = package);
            let probe = format!(
                "{}/bin/python3 -c {} || echo NOT_FOUND",
                venv,
                shell_escape(&snippet)
            );
            let check = ctx.sandbox.execute(&probe).await?;
            checks.push(format!("{}: {}", package, check.trim()));
        }
        Ok(report(&output, &checks))
    }
}
