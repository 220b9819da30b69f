// kubeintent-cli/src/rendering.rs
use anyhow::{Context, Result};
use colored::*;
use std::io::{self, Write};
use termimad::{crossterm::style::Color, MadSkin};

use kubeintent_core::models::execution::{format_duration, ExecutionOutcome, OrchestrationResult};
use kubeintent_core::models::response::{NetworkWorkflowResult, OperatorCheckResult};
use kubeintent_core::safety::SafetyVerdict;
use kubeintent_core::utils::truncate_string;
use kubeintent_core::{AssistantReply, AssistantResponse, Severity};

/// Per-command output is cut after this many lines in the text view.
const OUTPUT_PREVIEW_LINES: usize = 20;
const OUTPUT_LINE_CHARS: usize = 200;

fn create_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.inline_code.set_fg(Color::Cyan);
    skin.inline_code.set_bg(Color::Reset);
    skin.code_block.set_fg(Color::Reset);
    skin.code_block.set_bg(Color::Reset);
    skin
}

/// Renders markdown prose (explanations) to `writer`.
pub fn write_markdown<W: Write>(writer: &mut W, markdown_text: &str) -> Result<()> {
    create_skin()
        .write_text_on(writer, markdown_text)
        .context("Failed to render markdown")
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Info => "info".green(),
        Severity::Low => "low".cyan(),
        Severity::Medium => "medium".yellow(),
        Severity::High => "high".red().bold(),
    }
}

fn write_outcome<W: Write>(
    writer: &mut W,
    index: Option<usize>,
    outcome: &ExecutionOutcome,
) -> io::Result<()> {
    let marker = if outcome.success() {
        "ok".green().bold()
    } else if outcome.is_rejected() {
        "rejected".red().bold()
    } else if outcome.is_timeout() {
        "timeout".yellow().bold()
    } else {
        "failed".red().bold()
    };
    let prefix = index.map(|i| format!("[{}] ", i + 1)).unwrap_or_default();
    writeln!(
        writer,
        "{}{} {} {}",
        prefix,
        marker,
        outcome.command.bold(),
        format!("(exit {}, {})", outcome.exit_code, format_duration(outcome.duration)).dimmed()
    )?;

    let lines: Vec<&str> = outcome.output.lines().collect();
    for line in lines.iter().take(OUTPUT_PREVIEW_LINES) {
        writeln!(writer, "    {}", truncate_string(line, OUTPUT_LINE_CHARS))?;
    }
    if lines.len() > OUTPUT_PREVIEW_LINES {
        writeln!(
            writer,
            "    {}",
            format!("... {} more line(s)", lines.len() - OUTPUT_PREVIEW_LINES).dimmed()
        )?;
    }
    if !outcome.success() && !outcome.error.is_empty() {
        writeln!(writer, "    {} {}", "error:".red(), outcome.error)?;
    }
    Ok(())
}

fn write_commands<W: Write>(writer: &mut W, result: &OrchestrationResult) -> io::Result<()> {
    for (i, outcome) in result.outcomes.iter().enumerate() {
        write_outcome(writer, Some(i), outcome)?;
    }
    if let Some(fallback) = &result.fallback {
        writeln!(writer, "{}", "Fallback:".bold())?;
        write_outcome(writer, None, fallback)?;
    }
    Ok(())
}

fn write_operator<W: Write>(writer: &mut W, result: &OperatorCheckResult) -> io::Result<()> {
    for probe in &result.probes {
        let marker = if probe.found {
            "found".green().bold()
        } else if probe.outcome.success() {
            "none".dimmed()
        } else {
            "error".red()
        };
        writeln!(writer, "  {:<10} {} {}", probe.kind, marker, probe.outcome.command.dimmed())?;
    }
    Ok(())
}

fn write_network<W: Write>(writer: &mut W, result: &NetworkWorkflowResult) -> io::Result<()> {
    writeln!(
        writer,
        "{} {:?}  {} {}  {} {}",
        "Workflow:".bold(),
        result.workflow,
        "Namespace:".bold(),
        result.target.namespace,
        "Interface:".bold(),
        result.target.interface
    )?;
    if let Some(discovery) = &result.discovery {
        write_outcome(writer, None, discovery)?;
    }
    writeln!(writer, "{}", "Suggested commands (not executed):".bold())?;
    for command in &result.guidance {
        writeln!(writer, "  {}", command.cyan())?;
    }
    Ok(())
}

/// Writes a reply as formatted text.
pub fn write_reply<W: Write>(writer: &mut W, reply: &AssistantReply) -> Result<()> {
    writeln!(writer)?;
    match &reply.response {
        AssistantResponse::Commands(result) => write_commands(writer, result)?,
        AssistantResponse::Operator(result) => write_operator(writer, result)?,
        AssistantResponse::Network(result) => write_network(writer, result)?,
        AssistantResponse::Explanation(result) => write_markdown(writer, &result.explanation)?,
        AssistantResponse::GenerationFailed { .. } => {}
    }

    if !matches!(reply.response, AssistantResponse::Explanation(_)) {
        let summary = reply.response.summary();
        if matches!(reply.response, AssistantResponse::GenerationFailed { .. }) {
            writeln!(writer, "{} {}", "Error:".red(), summary)?;
        } else {
            writeln!(writer, "\n{}", summary)?;
        }
    }

    writeln!(
        writer,
        "{}",
        format!(
            "[{}] severity {} confidence {:.0}% id {}",
            reply.analysis.headline,
            severity_label(reply.analysis.severity),
            reply.analysis.confidence * 100.0,
            reply.id
        )
        .dimmed()
    )?;
    Ok(())
}

pub fn print_reply(reply: &AssistantReply) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write_reply(&mut stdout, reply)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

pub fn write_verdict<W: Write>(
    writer: &mut W,
    command: &str,
    verdict: &SafetyVerdict,
    mode: &str,
) -> io::Result<()> {
    let label = if verdict.is_allowed() {
        "allowed".green().bold()
    } else {
        "rejected".red().bold()
    };
    writeln!(writer, "{} {}", label, command.bold())?;
    if !verdict.is_allowed() {
        writeln!(writer, "  {}", verdict)?;
    }
    writeln!(writer, "  {} {}", "mode:".dimmed(), mode)
}
