//! Plain-language briefings on supply risk
//!
//! Briefings are requested from completion models in priority order. The
//! first model that answers wins; if none does, an offline briefing is built
//! from the coverage report so a caller always gets text back.

use crate::coverage::{CoverageReport, ItemStatus};
use crate::error::{ForecastError, Result};
use serde::Serialize;
use std::fmt;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::thread;
use tracing::{info, warn};

/// Program type the deployment supports; selects wording of prompts and drafts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sector {
    Healthcare,
    Education,
}

impl Sector {
    /// Role the model is asked to play
    pub fn role(&self) -> &'static str {
        match self {
            Sector::Healthcare => "NGO Supply Chain Analyst",
            Sector::Education => "Education Resource Planner",
        }
    }

    /// Kind of goods tracked
    pub fn goods(&self) -> &'static str {
        match self {
            Sector::Healthcare => "essential medicines",
            Sector::Education => "school supplies (textbooks, meals)",
        }
    }

    /// Outcome that stockouts put at risk
    pub fn impact(&self) -> &'static str {
        match self {
            Sector::Healthcare => "Patient Survival",
            Sector::Education => "Student Learning Outcomes",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Sector::Healthcare => "Healthcare (Medicines)",
            Sector::Education => "Education (Textbooks/Meals)",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Sector {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        if lower.starts_with("health") {
            Ok(Sector::Healthcare)
        } else if lower.starts_with("educ") {
            Ok(Sector::Education)
        } else {
            Err(ForecastError::InvalidParameter(format!(
                "Unknown sector '{}', expected healthcare or education",
                s
            )))
        }
    }
}

/// Fixed-width table of item, stock and forecast, one line per status
pub fn status_table(statuses: &[ItemStatus]) -> String {
    let width = statuses
        .iter()
        .map(|s| s.item_id.len())
        .max()
        .unwrap_or(0)
        .max("ITEM_NAME".len());

    let mut out = format!(
        "{:<width$}  {:>15}  {:>20}\n",
        "ITEM_NAME",
        "STOCK_REMAINING",
        "FORECAST_NEXT_7_DAYS",
        width = width
    );
    for status in statuses {
        let stock = status
            .stock_remaining
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<width$}  {:>15}  {:>20.2}\n",
            status.item_id,
            stock,
            status.forecast_next_7_days,
            width = width
        ));
    }
    out
}

/// Prompt asking for an executive briefing over the latest item statuses
pub fn briefing_prompt(sector: Sector, statuses: &[ItemStatus]) -> String {
    format!(
        "You are an expert {role}.\n\
         Analyze the following data table representing inventory for {goods}:\n\
         \n\
         {table}\n\
         Produce a report in Markdown:\n\
         1. **Executive Summary**: Status of {impact}.\n\
         2. **Critical Risks**: Items running out in < 7 days.\n\
         3. **Safe Items**: Items with good coverage.\n\
         4. **Recommended Actions**: 3 strategic moves.\n\
         \n\
         Be professional and concise.\n",
        role = sector.role(),
        goods = sector.goods(),
        impact = sector.impact(),
        table = status_table(statuses),
    )
}

/// Deterministic briefing used when no model answers
pub fn offline_briefing(report: &CoverageReport) -> String {
    let (status, orders) = if report.has_risks() {
        (
            format!("CRITICAL: {} low.", report.critical_items.join(", ")),
            "Resupply immediately.",
        )
    } else {
        ("All systems nominal.".to_string(), "Stand by.")
    };

    format!(
        "**COMMANDER LOG (AUTONOMOUS)**\n\
         *Status*: {}\n\
         *Orders*: {}\n\
         *Coverage*: {} of {} tracked items below {} days (restock +{}).\n",
        status,
        orders,
        report.critical_count(),
        report.active_skus,
        report.critical_days,
        report.restock_units
    )
}

/// Draft of a restock request to a supplier
pub fn restock_email(sector: Sector, statuses: &[ItemStatus]) -> String {
    format!(
        "Subject: Urgent Restock Request - {sector}\n\
         \n\
         Dear Supplier,\n\
         \n\
         Based on current consumption trends and forecasted demand, we require an \
         immediate replenishment of the following critical items:\n\
         \n\
         {table}\n\
         Please confirm delivery timeline by EOD.\n\
         \n\
         Sincerely,\n\
         AidOps Logistics Team\n",
        sector = sector,
        table = status_table(statuses),
    )
}

/// Something that can answer a prompt with a given model
pub trait CompletionProvider {
    /// Complete `prompt` with `model`
    fn complete(&self, model: &str, prompt: &str) -> Result<String>;
}

/// Completion provider running an external program
///
/// The prompt is written to the program's stdin and its stdout is the answer.
/// Arguments containing `{model}` get the model name substituted.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
        }
    }

    /// Build from a `[program, args...]` list
    pub fn from_command_line(command: &[String]) -> Result<Self> {
        let (program, args) = command.split_first().ok_or_else(|| {
            ForecastError::InvalidParameter("Completion command is empty".to_string())
        })?;
        Ok(Self::new(program, args))
    }
}

impl CompletionProvider for CommandProvider {
    fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace("{model}", model))
            .collect();

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Stdin is fed from its own thread while stdout and stderr drain
        let writer = child.stdin.take().map(|mut stdin| {
            let prompt = prompt.to_string();
            thread::spawn(move || stdin.write_all(prompt.as_bytes()))
        });
        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            match writer.join() {
                // A child may answer without reading the whole prompt
                Ok(Err(err)) if err.kind() != ErrorKind::BrokenPipe => return Err(err.into()),
                Ok(_) => {}
                Err(_) => {
                    return Err(ForecastError::CompletionError(format!(
                        "{}: prompt writer panicked",
                        self.program
                    )))
                }
            }
        }

        if !output.status.success() {
            return Err(ForecastError::CompletionError(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(ForecastError::CompletionError(format!(
                "{} returned an empty answer",
                self.program
            )));
        }
        Ok(text)
    }
}

/// Where a briefing's text came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BriefingSource {
    /// Answered by the named model
    Model(String),
    /// Built offline from the coverage report
    Offline,
}

/// A briefing and how it was obtained
#[derive(Debug, Clone, Serialize)]
pub struct Briefing {
    pub text: String,
    pub source: BriefingSource,
    /// `(model, error)` for every model that failed before the answer
    pub failures: Vec<(String, String)>,
}

/// Prioritised list of completion models with an offline fallback
pub struct ModelCascade {
    provider: Option<Box<dyn CompletionProvider>>,
    models: Vec<String>,
}

impl ModelCascade {
    /// Cascade over `models`, answered by `provider`
    pub fn new(provider: Box<dyn CompletionProvider>, models: Vec<String>) -> Self {
        Self {
            provider: Some(provider),
            models,
        }
    }

    /// Cascade that always answers offline
    pub fn offline() -> Self {
        Self {
            provider: None,
            models: Vec::new(),
        }
    }

    /// Models tried, in order
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Ask each model in turn, falling back to the offline briefing
    pub fn brief(&self, prompt: &str, report: &CoverageReport) -> Briefing {
        let mut failures = Vec::new();

        if let Some(provider) = &self.provider {
            for model in &self.models {
                match provider.complete(model, prompt) {
                    Ok(text) => {
                        info!(model = %model, "briefing generated");
                        return Briefing {
                            text,
                            source: BriefingSource::Model(model.clone()),
                            failures,
                        };
                    }
                    Err(err) => {
                        warn!(model = %model, error = %err, "completion failed, trying next model");
                        failures.push((model.clone(), err.to_string()));
                    }
                }
            }
        }

        info!("no completion model available, using offline briefing");
        Briefing {
            text: offline_briefing(report),
            source: BriefingSource::Offline,
            failures,
        }
    }
}
