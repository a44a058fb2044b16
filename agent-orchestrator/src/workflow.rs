//! Generate -> execute -> debug -> re-execute workflow
//!
//! One run is a single serial pass over the backend:
//!
//! | Phase | Reached when |
//! |-------|--------------|
//! | `initial_response` | the agent returned no text (status `error`) |
//! | `text_response` | the agent declared a non-code response |
//! | `code_generation` | no code could be extracted |
//! | `execution_success` | the code ran without error |
//! | `execution_error` | the code failed and no fix was available |
//! | `execution_fixed` | the debugger's fix was executed once |
//!
//! The fixed code is executed with auto-debug disabled, so a run makes at
//! most two execution calls. Any transport failure ends the run with status
//! `error` and no phase.

use crate::assemble::assemble_document;
use crate::backend::{Agent, ChatResponse, ClientError, ExecutionResult};
use crate::client::{AgentClient, ChatOptions, ExecuteOptions};
use crate::extract::{extract_code_blocks, CodeBundle};
use crate::language::{detect_language, Language};
use serde::Serialize;
use tracing::{info, warn};

/// Terminal phase of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    InitialResponse,
    TextResponse,
    CodeGeneration,
    ExecutionSuccess,
    ExecutionError,
    ExecutionFixed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::InitialResponse => "initial_response",
            Phase::TextResponse => "text_response",
            Phase::CodeGeneration => "code_generation",
            Phase::ExecutionSuccess => "execution_success",
            Phase::ExecutionError => "execution_error",
            Phase::ExecutionFixed => "execution_fixed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Completed,
    Error,
}

/// Whether a failed execution may be handed to the debugger agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowType {
    #[default]
    Code,
    NoDebug,
}

/// Settings for one run
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub agent: Agent,
    pub model: String,
    pub temperature: f32,
    pub mcp_server: String,
    pub workflow_type: WorkflowType,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            agent: Agent::Code,
            model: "default".to_string(),
            temperature: 0.7,
            mcp_server: "anthropic".to_string(),
            workflow_type: WorkflowType::Code,
        }
    }
}

/// Code that was executed during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowCode {
    pub original: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed: Option<String>,
    pub language: String,
    pub css: String,
    pub js: String,
}

/// Record of one run
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    pub status: WorkflowStatus,
    /// `None` when the run was aborted by a transport failure
    pub phase: Option<Phase>,
    pub message: String,
    pub code_result: Option<ChatResponse>,
    pub execution_result: Option<ExecutionResult>,
    pub fixed_result: Option<ExecutionResult>,
    pub code: Option<WorkflowCode>,
    pub original_prompt: Option<String>,
    pub mcp_server: String,
    /// Failure description for aborted runs
    pub error: Option<String>,
}

impl WorkflowOutcome {
    fn completed(phase: Phase, message: &str, prompt: &str, options: &WorkflowOptions) -> Self {
        Self {
            status: WorkflowStatus::Completed,
            phase: Some(phase),
            message: message.to_string(),
            code_result: None,
            execution_result: None,
            fixed_result: None,
            code: None,
            original_prompt: Some(prompt.to_string()),
            mcp_server: options.mcp_server.clone(),
            error: None,
        }
    }

    fn failed(error: ClientError, options: &WorkflowOptions) -> Self {
        Self {
            status: WorkflowStatus::Error,
            phase: None,
            message: format!("Workflow failed: {}", error),
            code_result: None,
            execution_result: None,
            fixed_result: None,
            code: None,
            original_prompt: None,
            mcp_server: options.mcp_server.clone(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == WorkflowStatus::Error
    }

    /// Text of the initial agent response, if any
    pub fn response_text(&self) -> Option<&str> {
        self.code_result.as_ref().and_then(|r| r.text())
    }
}

/// Choose the code to execute from a bundle: assembled HTML when HTML comes
/// with separate CSS/JS, else the HTML, else the generic block
fn primary_code(bundle: &CodeBundle) -> String {
    if bundle.is_multi_file() {
        assemble_document(&bundle.html_code, &bundle.css_code, &bundle.js_code)
    } else if !bundle.html_code.is_empty() {
        bundle.html_code.clone()
    } else {
        bundle.original_code.clone()
    }
}

/// Drives workflow runs against the backend
pub struct WorkflowRunner {
    client: AgentClient,
}

impl WorkflowRunner {
    pub fn new(client: AgentClient) -> Self {
        Self { client }
    }

    /// Run the workflow for one prompt; failures become an error outcome
    pub async fn run(&self, message: &str, options: &WorkflowOptions) -> WorkflowOutcome {
        match self.try_run(message, options).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Workflow aborted");
                WorkflowOutcome::failed(e, options)
            }
        }
    }

    async fn try_run(
        &self,
        message: &str,
        options: &WorkflowOptions,
    ) -> Result<WorkflowOutcome, ClientError> {
        info!(agent = %options.agent, mcp_server = %options.mcp_server, "Starting workflow");

        let chat_options = ChatOptions {
            model: options.model.clone(),
            temperature: options.temperature,
            mcp_server: options.mcp_server.clone(),
            auto_process: true,
        };
        let code_result = self
            .client
            .send_chat_message(message, options.agent, &chat_options)
            .await?;

        let response_text = match code_result.text() {
            Some(text) => text.to_string(),
            None => {
                let mut outcome = WorkflowOutcome::completed(
                    Phase::InitialResponse,
                    "No response from agent",
                    message,
                    options,
                );
                outcome.status = WorkflowStatus::Error;
                outcome.code_result = Some(code_result);
                return Ok(outcome);
            }
        };

        if code_result.is_non_code() {
            info!(response_type = ?code_result.response_type, "Text response, skipping execution");
            let mut outcome = WorkflowOutcome::completed(
                Phase::TextResponse,
                "Response generated",
                message,
                options,
            );
            outcome.code_result = Some(code_result);
            return Ok(outcome);
        }

        let bundle = extract_code_blocks(&response_text);
        if bundle.is_empty() {
            info!("No code found in response");
            let mut outcome = WorkflowOutcome::completed(
                Phase::CodeGeneration,
                "No code found in response, returning it as is",
                message,
                options,
            );
            outcome.code_result = Some(code_result);
            return Ok(outcome);
        }

        let code = primary_code(&bundle);
        let language = if bundle.is_multi_file() {
            Language::Html.as_str().to_string()
        } else if bundle.language_undeclared() {
            detect_language(&code).as_str().to_string()
        } else {
            bundle.language.clone()
        };

        let execute_options = ExecuteOptions {
            auto_debug: options.workflow_type != WorkflowType::NoDebug,
            mcp_server: options.mcp_server.clone(),
            ..Default::default()
        };
        let execution_result = self
            .client
            .execute_code(&code, &language, None, &execute_options)
            .await?;

        let debug_text = match (execution_result.error(), execution_result.debug_suggestion()) {
            (Some(_), Some(text)) => Some(text.to_string()),
            _ => None,
        };

        if let Some(debug_text) = debug_text {
            let fixed_bundle = extract_code_blocks(&debug_text);
            let fixed_code = primary_code(&fixed_bundle);

            if !fixed_code.is_empty() {
                info!("Executing the debugger's fix");
                let fixed_options = ExecuteOptions {
                    auto_debug: false,
                    ..execute_options
                };
                let fixed_result = self
                    .client
                    .execute_code(&fixed_code, &language, None, &fixed_options)
                    .await?;

                let mut outcome = WorkflowOutcome::completed(
                    Phase::ExecutionFixed,
                    "Workflow finished with debugging",
                    message,
                    options,
                );
                outcome.code = Some(WorkflowCode {
                    original: code,
                    fixed: Some(fixed_code),
                    language,
                    css: first_non_empty(&bundle.css_code, &fixed_bundle.css_code),
                    js: first_non_empty(&bundle.js_code, &fixed_bundle.js_code),
                });
                outcome.code_result = Some(code_result);
                outcome.execution_result = Some(execution_result);
                outcome.fixed_result = Some(fixed_result);
                return Ok(outcome);
            }
            warn!("Debugger response contained no code");
        }

        let phase = if execution_result.error().is_some() {
            Phase::ExecutionError
        } else {
            Phase::ExecutionSuccess
        };
        info!(phase = %phase, "Workflow finished");

        let mut outcome = WorkflowOutcome::completed(phase, "Workflow finished", message, options);
        outcome.code = Some(WorkflowCode {
            original: code,
            fixed: None,
            language,
            css: bundle.css_code,
            js: bundle.js_code,
        });
        outcome.code_result = Some(code_result);
        outcome.execution_result = Some(execution_result);
        Ok(outcome)
    }
}

fn first_non_empty(a: &str, b: &str) -> String {
    let chosen = if a.is_empty() { b } else { a };
    chosen.to_string()
}
