//! HTTP request capabilities.
//!
//! Both tools shell out to curl inside the sandbox so that all
//! network traffic originates from the isolated environment. An
//! opt-in cookie jar in the sandbox home carries session-scoped HTTP
//! state across calls.

use crate::{normalize_output, parse_args, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use redscout_sandbox::shell_escape;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Arguments shared by both HTTP tools.
#[derive(Debug, Deserialize)]
struct HttpGetArgs {
    url: String,
    #[serde(default)]
    headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    cookies: Option<Value>,
    #[serde(default)]
    use_cookie_jar: bool,
}

#[derive(Debug, Deserialize)]
struct HttpPostArgs {
    url: String,
    data: String,
    #[serde(default)]
    headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    cookies: Option<Value>,
    #[serde(default)]
    use_cookie_jar: bool,
}

/// Build a curl invocation with everything the agent supplied quoted
/// for the inner shell.
fn build_curl_command(
    method: &str,
    url: &str,
    headers: Option<&BTreeMap<String, String>>,
    cookies: Option<&Value>,
    data: Option<&str>,
    cookie_jar: Option<&str>,
) -> String {
    let mut cmd = vec!["curl".to_string(), "-sL".to_string()];

    if method.eq_ignore_ascii_case("POST") {
        cmd.push("-X POST".to_string());
    }

    if let Some(headers) = headers {
        for (key, value) in headers {
            cmd.push(format!("-H {}", shell_escape(&format!("{}: {}", key, value))));
        }
    }

    if let Some(cookies) = cookies {
        let cookie_str = match cookies {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| format!("{}={}", k, v.as_str().map(String::from).unwrap_or_else(|| v.to_string())))
                .collect::<Vec<_>>()
                .join("; "),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        cmd.push(format!("-b {}", shell_escape(&cookie_str)));
    }

    if let Some(jar) = cookie_jar {
        cmd.push(format!("-b {}", shell_escape(jar)));
        cmd.push(format!("--cookie-jar {}", shell_escape(jar)));
    }

    if let Some(data) = data {
        if !data.is_empty() {
            cmd.push(format!("-d {}", shell_escape(data)));
        }
    }

    cmd.push(shell_escape(url));
    cmd.join(" ")
}

fn header_and_cookie_properties() -> Value {
    json!({
        "headers": {
            "type": "object",
            "description": "Headers to include in the request",
            "additionalProperties": {"type": "string"}
        },
        "cookies": {
            "description": "Cookies to include, as an object or a raw cookie string"
        },
        "use_cookie_jar": {
            "type": "boolean",
            "description": "Persist and reuse cookies across requests in this session"
        }
    })
}

/// HTTP GET capability.
pub struct HttpGetTool;

#[async_trait]
impl Tool for HttpGetTool {
    fn name(&self) -> &str {
        "http_get"
    }

    fn description(&self) -> &str {
        "Perform an HTTP GET request to fetch the contents of a webpage or API. \
         Follows redirects. Returns the raw response body; if the host is \
         unreachable or the response is empty, returns an explicit notice."
    }

    fn parameters_schema(&self) -> Value {
        let mut properties = json!({
            "url": {"type": "string", "description": "The target URL"}
        });
        merge(&mut properties, header_and_cookie_properties());
        json!({
            "type": "object",
            "properties": properties,
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let args: HttpGetArgs = parse_args(args)?;
        if args.url.is_empty() {
            return Ok("Error: input must be a valid URL.".to_string());
        }

        let jar = args.use_cookie_jar.then(|| ctx.sandbox.cookie_jar());
        let command = build_curl_command(
            "GET",
            &args.url,
            args.headers.as_ref(),
            args.cookies.as_ref(),
            None,
            jar,
        );
        let output = ctx.sandbox.execute(&command).await?;
        Ok(normalize_output(output, &args.url))
    }
}

/// HTTP POST capability.
pub struct HttpPostTool;

#[async_trait]
impl Tool for HttpPostTool {
    fn name(&self) -> &str {
        "http_post"
    }

    fn description(&self) -> &str {
        "Perform an HTTP POST request with a form-encoded body. Follows \
         redirects. Returns the raw response body; if the host is unreachable \
         or the response is empty, returns an explicit notice."
    }

    fn parameters_schema(&self) -> Value {
        let mut properties = json!({
            "url": {"type": "string", "description": "The target URL"},
            "data": {
                "type": "string",
                "description": "Request body in application/x-www-form-urlencoded format"
            }
        });
        merge(&mut properties, header_and_cookie_properties());
        json!({
            "type": "object",
            "properties": properties,
            "required": ["url", "data"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        let args: HttpPostArgs = parse_args(args)?;
        if args.url.is_empty() {
            return Ok("Error: input must be a valid URL.".to_string());
        }

        let jar = args.use_cookie_jar.then(|| ctx.sandbox.cookie_jar());
        let command = build_curl_command(
            "POST",
            &args.url,
            args.headers.as_ref(),
            args.cookies.as_ref(),
            Some(&args.data),
            jar,
        );
        let output = ctx.sandbox.execute(&command).await?;
        Ok(normalize_output(output, &args.url))
    }
}

fn merge(target: &mut Value, extra: Value) {
    if let (Value::Object(target), Value::Object(extra)) = (target, extra) {
        target.extend(extra);
    }
}
