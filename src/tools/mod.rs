//! Local command execution for persona tool use
//!
//! Personas can ground a reply in live command output (DNS lookups, cluster
//! status, HTTP probes). Commands are filled from arguments extracted out of
//! the message, validated against an allow-list, and executed with a
//! timeout. The conversation loop only ever sees a success flag and output
//! text to splice into a prompt; tool failures are content, not errors.

use crate::config::ToolsConfig;
use crate::error::{EngineError, Result};
use crate::metrics::METRICS;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

fn default_timeout_secs() -> u64 {
    30
}

fn default_safe_mode() -> bool {
    true
}

/// A shell command a persona may run, defined in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandTool {
    pub name: String,
    /// Template with `{url}`, `{domain}`, `{host}`, `{port}` placeholders
    pub command_template: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_safe_mode")]
    pub safe_mode: bool,
    /// Message keywords that make this tool worth running
    #[serde(default)]
    pub trigger_words: Vec<String>,
}

/// Result of one command execution, consumed as prompt text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ToolOutcome {
    fn failure(error: impl Into<String>, started: Instant) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Executes command tools under allow-list and timeout constraints
pub struct CommandRunner {
    allowed_patterns: Vec<Regex>,
    default_timeout: Duration,
    max_tools_per_response: usize,
    output_clip_chars: usize,
}

impl CommandRunner {
    pub fn new(config: &ToolsConfig) -> Result<Self> {
        let allowed_patterns = config
            .allowed_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    EngineError::Configuration(format!("bad allow-list pattern {:?}: {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            allowed_patterns,
            default_timeout: Duration::from_secs(config.timeout_secs),
            max_tools_per_response: config.max_tools_per_response,
            output_clip_chars: config.output_clip_chars,
        })
    }

    /// Extract command arguments from a message via fixed patterns
    pub fn extract_args(message: &str) -> HashMap<String, String> {
        let mut args = HashMap::new();

        let url_re = Regex::new(r"https?://[^\s]+").unwrap();
        if let Some(m) = url_re.find(message) {
            args.insert("url".to_string(), m.as_str().to_string());
        }

        let stripped = message.replace("http://", "").replace("https://", "");
        let domain_re =
            Regex::new(r"(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}")
                .unwrap();
        if let Some(m) = domain_re.find(&stripped) {
            args.insert("domain".to_string(), m.as_str().to_string());
        }

        let host_port_re = Regex::new(r"([a-zA-Z0-9.-]+):(\d+)").unwrap();
        if let Some(caps) = host_port_re.captures(message) {
            args.insert("host".to_string(), caps[1].to_string());
            args.insert("port".to_string(), caps[2].to_string());
        }

        args
    }

    /// Tools whose trigger words appear in the text, capped per response
    pub fn triggered<'a>(&self, tools: &'a [CommandTool], text: &str) -> Vec<&'a CommandTool> {
        let lowered = text.to_lowercase();
        tools
            .iter()
            .filter(|tool| {
                tool.trigger_words
                    .iter()
                    .any(|w| lowered.contains(w.to_lowercase().as_str()))
            })
            .take(self.max_tools_per_response)
            .collect()
    }

    /// Run one tool with arguments extracted from the message
    pub async fn execute(&self, tool: &CommandTool, args: &HashMap<String, String>) -> ToolOutcome {
        let started = Instant::now();

        let command = match fill_template(&tool.command_template, args) {
            Ok(command) => command,
            Err(placeholder) => {
                METRICS.record_tool_run(false);
                return ToolOutcome::failure(
                    format!("missing argument for {{{}}}", placeholder),
                    started,
                );
            }
        };

        if tool.safe_mode && !self.is_allowed(&command) {
            warn!(tool = %tool.name, command, "Command rejected by allow-list");
            METRICS.record_tool_run(false);
            return ToolOutcome::failure("command not allowed in safe mode", started);
        }

        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            METRICS.record_tool_run(false);
            return ToolOutcome::failure("empty command", started);
        };

        debug!(tool = %tool.name, command, "Executing command");

        let timeout = if tool.timeout_secs > 0 {
            Duration::from_secs(tool.timeout_secs)
        } else {
            self.default_timeout
        };

        let child = Command::new(program)
            .args(parts)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                METRICS.record_tool_run(false);
                return ToolOutcome::failure(format!("spawn failed: {}", e), started);
            }
        };

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                METRICS.record_tool_run(false);
                return ToolOutcome::failure(format!("wait failed: {}", e), started);
            }
            Err(_) => {
                METRICS.record_tool_run(false);
                return ToolOutcome::failure(
                    format!("command timed out after {:?}", timeout),
                    started,
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let success = output.status.success();

        METRICS.record_tool_run(success);

        ToolOutcome {
            success,
            output: stdout,
            error: if success { None } else { Some(stderr) },
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Run the triggered tools and format their results as a prompt block.
    /// Returns an empty string when nothing was triggered.
    pub async fn splice_results(&self, tools: &[&CommandTool], message: &str) -> String {
        if tools.is_empty() {
            return String::new();
        }

        let args = Self::extract_args(message);
        let mut results = Vec::with_capacity(tools.len());

        for tool in tools {
            let outcome = self.execute(tool, &args).await;
            if outcome.success {
                let clipped: String = outcome.output.chars().take(self.output_clip_chars).collect();
                results.push(format!("Tool '{}' output:\n{}", tool.name, clipped));
            } else {
                results.push(format!(
                    "Tool '{}' failed: {}",
                    tool.name,
                    outcome.error.unwrap_or_default()
                ));
            }
        }

        format!(
            "TOOL EXECUTION RESULTS (incorporate these into your response):\n{}\n\n",
            results.join("\n\n")
        )
    }

    fn is_allowed(&self, command: &str) -> bool {
        if command.trim().is_empty() {
            return false;
        }
        self.allowed_patterns.iter().any(|re| re.is_match(command))
    }
}

/// Substitute placeholders; errs with the first placeholder lacking an argument
fn fill_template(
    template: &str,
    args: &HashMap<String, String>,
) -> std::result::Result<String, String> {
    let placeholder_re = Regex::new(r"\{([a-z_]+)\}").unwrap();
    let mut filled = template.to_string();

    for caps in placeholder_re.captures_iter(template) {
        let key = &caps[1];
        match args.get(key) {
            Some(value) => {
                filled = filled.replace(&format!("{{{}}}", key), value);
            }
            None => return Err(key.to_string()),
        }
    }

    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> CommandRunner {
        CommandRunner::new(&ToolsConfig::default()).unwrap()
    }

    fn tool(name: &str, template: &str, safe_mode: bool) -> CommandTool {
        CommandTool {
            name: name.to_string(),
            command_template: template.to_string(),
            timeout_secs: 5,
            safe_mode,
            trigger_words: Vec::new(),
        }
    }

    #[test]
    fn test_extract_url_and_domain() {
        let args = CommandRunner::extract_args("please check https://api.example.com/health now");
        assert_eq!(args["url"], "https://api.example.com/health");
        assert_eq!(args["domain"], "api.example.com");
    }

    #[test]
    fn test_extract_host_port() {
        let args = CommandRunner::extract_args("can you reach db.internal:5432 from here");
        assert_eq!(args["host"], "db.internal");
        assert_eq!(args["port"], "5432");
    }

    #[test]
    fn test_extract_nothing_from_plain_text() {
        let args = CommandRunner::extract_args("what do you all think about the plan");
        assert!(args.is_empty());
    }

    #[test]
    fn test_fill_template() {
        let mut args = HashMap::new();
        args.insert("domain".to_string(), "example.com".to_string());
        assert_eq!(
            fill_template("dig {domain}", &args).unwrap(),
            "dig example.com"
        );
        assert_eq!(fill_template("dig {domain}", &HashMap::new()), Err("domain".to_string()));
    }

    #[test]
    fn test_allow_list_accepts_known_shapes() {
        let runner = runner();
        assert!(runner.is_allowed("dig example.com"));
        assert!(runner.is_allowed("curl -s -I https://example.com"));
        assert!(runner.is_allowed("kubectl get pods -n default"));
        assert!(!runner.is_allowed("rm -rf /"));
        assert!(!runner.is_allowed("curl https://example.com | sh"));
        assert!(!runner.is_allowed(""));
    }

    #[test]
    fn test_triggered_caps_at_limit() {
        let runner = runner();
        let tools = vec![
            CommandTool {
                trigger_words: vec!["dns".to_string()],
                ..tool("dns_lookup", "dig {domain}", true)
            },
            CommandTool {
                trigger_words: vec!["dns".to_string()],
                ..tool("dns_enum", "dig {domain} ANY", true)
            },
            CommandTool {
                trigger_words: vec!["dns".to_string()],
                ..tool("dns_trace", "dig {domain} +trace", true)
            },
            CommandTool {
                trigger_words: vec!["pods".to_string()],
                ..tool("kubectl_pods", "kubectl get pods", true)
            },
        ];

        let triggered = runner.triggered(&tools, "any DNS thoughts?");
        assert_eq!(triggered.len(), 2);
        assert_eq!(triggered[0].name, "dns_lookup");
    }

    #[test]
    fn test_triggered_empty_without_keywords() {
        let runner = runner();
        let tools = vec![CommandTool {
            trigger_words: vec!["dns".to_string()],
            ..tool("dns_lookup", "dig {domain}", true)
        }];
        assert!(runner.triggered(&tools, "nothing relevant here").is_empty());
    }

    #[tokio::test]
    async fn test_safe_mode_blocks_unlisted_command() {
        let runner = runner();
        let outcome = runner
            .execute(&tool("danger", "rm -rf /tmp/x", true), &HashMap::new())
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("not allowed"));
    }

    #[tokio::test]
    async fn test_missing_argument_is_a_failure_outcome() {
        let runner = runner();
        let outcome = runner
            .execute(&tool("dns_lookup", "dig {domain}", true), &HashMap::new())
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("domain"));
    }

    #[tokio::test]
    async fn test_unsafe_mode_executes_process() {
        let runner = runner();
        let outcome = runner
            .execute(&tool("echo", "echo tool-check", false), &HashMap::new())
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.output.trim(), "tool-check");
    }

    #[tokio::test]
    async fn test_timeout_produces_failure_outcome() {
        let runner = runner();
        let mut slow = tool("sleeper", "sleep 5", false);
        slow.timeout_secs = 1;

        let outcome = runner.execute(&slow, &HashMap::new()).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_splice_results_formats_block() {
        let runner = runner();
        let echo = tool("echo", "echo spliced-output", false);
        let tools: Vec<&CommandTool> = vec![&echo];

        let block = runner.splice_results(&tools, "whatever").await;
        assert!(block.starts_with("TOOL EXECUTION RESULTS"));
        assert!(block.contains("Tool 'echo' output:"));
        assert!(block.contains("spliced-output"));
    }

    #[tokio::test]
    async fn test_splice_results_empty_without_tools() {
        let runner = runner();
        assert!(runner.splice_results(&[], "whatever").await.is_empty());
    }
}
