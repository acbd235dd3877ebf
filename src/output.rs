use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use console::{style, Term};
use serde::Serialize;
use textwrap::wrap;

use crate::commands::clear::ClearOutcome;
use crate::commands::export::ExportOutcome;
use crate::commands::generate::GenerateOutcome;
use crate::commands::list::ArtifactSummary;
use crate::commands::render::RenderOutcome;
use crate::commands::show::ShowResult;
use crate::config::Config;
use crate::models::{ArtifactMetadata, ExecutionResult};
use crate::templates::Template;

/// Trait for types that can render themselves as human-readable CLI output.
pub trait Render {
    fn render(&self, w: &mut dyn Write) -> Result<()>;
}

/// Print as JSON if `json` is true, otherwise call `human` with a writer.
fn json_or<T: Serialize + ?Sized>(
    value: &T,
    json: bool,
    human: impl FnOnce(&mut dyn Write) -> Result<()>,
) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, value)?;
        writeln!(stdout)?;
    } else {
        human(&mut stdout)?;
    }
    Ok(())
}

fn terminal_width() -> usize {
    let (_, cols) = Term::stdout().size();
    cols as usize
}

/// Write a labeled field, wrapping long or multiline values.
///
/// Short values print inline: `{prefix}{label}: {value}`
/// Long or multiline values wrap onto indented continuation lines:
/// ```text
/// {prefix}{label}:
/// {prefix}  {wrapped line 1}
/// {prefix}  {wrapped line 2}
/// ```
pub fn write_field(w: &mut dyn Write, prefix: &str, label: &str, value: &str) -> Result<()> {
    let width = terminal_width();
    let inline_prefix = format!("{prefix}{label}: ");
    let inline_len = inline_prefix.len() + value.len();

    if !value.contains('\n') && inline_len <= width {
        writeln!(w, "{inline_prefix}{value}")?;
    } else {
        writeln!(w, "{prefix}{label}:")?;
        let continuation = format!("{prefix}  ");
        let wrap_width = width.saturating_sub(continuation.len()).max(20);
        for paragraph in value.split('\n') {
            if paragraph.is_empty() {
                writeln!(w)?;
            } else {
                for line in wrap(paragraph, wrap_width) {
                    writeln!(w, "{continuation}{line}")?;
                }
            }
        }
    }
    Ok(())
}

fn write_list(w: &mut dyn Write, heading: &str, items: &[String]) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    writeln!(w, "{}", style(heading).bold())?;
    for item in items {
        write_field(w, "  ", "-", item)?;
    }
    Ok(())
}

/// Code is printed verbatim; wrapping would change its meaning.
fn write_code(w: &mut dyn Write, code: &str) -> Result<()> {
    writeln!(w)?;
    writeln!(w, "{}", style("Code:").bold())?;
    for line in code.lines() {
        writeln!(w, "  {line}")?;
    }
    Ok(())
}

impl Render for ExecutionResult {
    fn render(&self, w: &mut dyn Write) -> Result<()> {
        match self {
            Self::Success { artifact_path } => {
                writeln!(
                    w,
                    "{} {}",
                    style("Diagram saved:").green(),
                    style(artifact_path.display()).cyan().bold()
                )?;
            }
            Self::Failure { message } => {
                writeln!(w, "{}", style("Diagram generation failed").red().bold())?;
                write_field(w, "  ", "Error", message)?;
            }
        }
        Ok(())
    }
}

impl Render for Template {
    fn render(&self, w: &mut dyn Write) -> Result<()> {
        writeln!(w, "{}", style(self.name).cyan().bold())?;
        write_field(w, "  ", "Description", self.description)?;
        writeln!(w, "  Type: {}", style(self.architecture_type).yellow())?;
        let provider = self
            .cloud_provider
            .map_or_else(|| "Generic".to_string(), |p| p.to_string());
        writeln!(w, "  Provider: {provider}")?;
        write_field(w, "  ", "Components", self.components)?;
        Ok(())
    }
}

impl Render for ArtifactMetadata {
    fn render(&self, w: &mut dyn Write) -> Result<()> {
        writeln!(w, "  Mode: {}", style(self.mode).yellow())?;
        writeln!(w, "  Model: {}", self.model)?;
        writeln!(w, "  Created: {}", self.created_at)?;
        writeln!(w, "  Type: {}", self.request.architecture_type())?;
        if let Some(provider) = self.request.cloud_provider() {
            writeln!(w, "  Provider: {provider}")?;
        }
        write_field(w, "  ", "Request", self.request.description())?;
        if let Some(components) = self.request.components() {
            write_field(w, "  ", "Requested components", components)?;
        }
        write_field(w, "  ", "Description", &self.description)?;
        write_list(w, "Components:", &self.components)?;
        write_list(w, "Best practices:", &self.best_practices)?;
        Ok(())
    }
}

// -- Generation outputs --

pub fn generated(outcome: &GenerateOutcome, json: bool) -> Result<()> {
    json_or(outcome, json, |w| {
        outcome.result.render(w)?;
        writeln!(w, "  Name: {}", style(&outcome.name).cyan())?;
        writeln!(w, "  Model: {}", outcome.model)?;

        if let Some(response) = &outcome.response {
            write_field(w, "  ", "Description", &response.description)?;
            write_list(w, "Components:", &response.components)?;
            write_list(w, "Best practices:", &response.best_practices)?;
            if !outcome.result.is_success() {
                write_code(w, &response.diagram_code)?;
            }
        }
        if let Some(caption) = &outcome.caption {
            write_field(w, "  ", "Caption", caption)?;
        }
        Ok(())
    })
}

pub fn rendered(outcome: &RenderOutcome, json: bool) -> Result<()> {
    json_or(outcome, json, |w| {
        outcome.result.render(w)?;
        writeln!(w, "  Name: {}", style(&outcome.name).cyan())?;
        Ok(())
    })
}

// -- Artifact outputs --

pub fn artifact_list(artifacts: &[ArtifactSummary], json: bool) -> Result<()> {
    json_or(artifacts, json, |w| {
        if artifacts.is_empty() {
            writeln!(w, "No diagrams found.")?;
            return Ok(());
        }

        for artifact in artifacts {
            let mode = artifact
                .mode
                .map_or_else(|| "unknown".to_string(), |m| m.to_string());
            writeln!(
                w,
                "{} [{}] {}",
                style(&artifact.name).cyan().bold(),
                style(mode).yellow(),
                style(format!("{} bytes", artifact.size_bytes)).dim()
            )?;
            if let Some(created_at) = &artifact.created_at {
                writeln!(w, "  Created: {created_at}")?;
            }
            if let Some(description) = &artifact.description {
                write_field(w, "  ", "Description", description)?;
            }
        }
        Ok(())
    })
}

pub fn show(result: &ShowResult, json: bool) -> Result<()> {
    json_or(result, json, |w| {
        writeln!(
            w,
            "Diagram: {} {}",
            style(&result.name).cyan().bold(),
            style(result.path.display()).dim()
        )?;

        match &result.metadata {
            Some(metadata) => {
                metadata.render(w)?;
                if let Some(code) = &metadata.code {
                    write_code(w, code)?;
                }
            }
            None => writeln!(w, "  Metadata: {}", style("(none recorded)").dim())?,
        }
        Ok(())
    })
}

pub fn exported(outcome: &ExportOutcome, json: bool) -> Result<()> {
    json_or(outcome, json, |w| {
        writeln!(
            w,
            "{} {} -> {}",
            style("Exported").green(),
            style(&outcome.name).cyan().bold(),
            outcome.dest.display()
        )?;
        Ok(())
    })
}

pub fn cleared(outcome: &ClearOutcome, output_dir: &Path, json: bool) -> Result<()> {
    json_or(outcome, json, |w| {
        match outcome {
            ClearOutcome::Empty => {
                writeln!(w, "No diagrams to clear in {}.", output_dir.display())?;
            }
            ClearOutcome::Cancelled => writeln!(w, "Cancelled.")?,
            ClearOutcome::Cleared(report) => {
                for path in &report.removed {
                    writeln!(w, "  {} {}", style("Removed").red(), style(path.display()).cyan())?;
                }
                for failure in &report.failed {
                    writeln!(
                        w,
                        "  {} {}: {}",
                        style("Skipped").yellow(),
                        style(failure.path.display()).cyan(),
                        failure.error
                    )?;
                }
                writeln!(w, "\nCleared {} diagram(s).", style(report.removed.len()).bold())?;
                if !report.failed.is_empty() {
                    writeln!(w, "{} could not be removed.", style(report.failed.len()).yellow().bold())?;
                }
            }
        }
        Ok(())
    })
}

// -- Templates --

pub fn template_list(templates: &[Template], json: bool) -> Result<()> {
    json_or(templates, json, |w| {
        for template in templates {
            template.render(w)?;
            writeln!(w)?;
        }
        Ok(())
    })
}

pub fn template(template: &Template, json: bool) -> Result<()> {
    json_or(template, json, |w| template.render(w))
}

// -- Config --

pub fn config(config: &Config, json: bool) -> Result<()> {
    if json {
        return json_or(config, true, |_| Ok(()));
    }
    let mut w = io::stdout().lock();
    write!(w, "{}", config.to_toml()?)?;
    Ok(())
}
