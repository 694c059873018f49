use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use relief_forecast::advisor::{BriefingSource, CompletionProvider, ModelCascade};
use relief_forecast::coverage::{CoverageReport, ItemStatus};
use relief_forecast::error::Result;
use relief_forecast::ForecastError;

/// Provider answering only for the models it knows
struct ScriptedProvider {
    answers: Vec<(&'static str, &'static str)>,
}

impl ScriptedProvider {
    fn new(answers: Vec<(&'static str, &'static str)>) -> Self {
        Self { answers }
    }
}

impl CompletionProvider for ScriptedProvider {
    fn complete(&self, model: &str, _prompt: &str) -> Result<String> {
        self.answers
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, text)| text.to_string())
            .ok_or_else(|| ForecastError::CompletionError(format!("{} unavailable", model)))
    }
}

fn models() -> Vec<String> {
    ["mistral-large", "llama3-8b", "gemma-7b"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn report() -> CoverageReport {
    let statuses = vec![ItemStatus {
        item_id: "Insulin".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        stock_remaining: Some(10.0),
        forecast_next_7_days: 12.0,
    }];
    CoverageReport::from_statuses(&statuses, 0.0, 7.0).unwrap()
}

#[test]
fn test_first_model_answers() {
    let provider = ScriptedProvider::new(vec![("mistral-large", "All good."), ("gemma-7b", "x")]);
    let cascade = ModelCascade::new(Box::new(provider), models());

    let briefing = cascade.brief("prompt", &report());
    assert_eq!(briefing.text, "All good.");
    assert_eq!(briefing.source, BriefingSource::Model("mistral-large".to_string()));
    assert!(briefing.failures.is_empty());
}

#[test]
fn test_falls_through_to_later_model() {
    let provider = ScriptedProvider::new(vec![("gemma-7b", "Gemma briefing")]);
    let cascade = ModelCascade::new(Box::new(provider), models());

    let briefing = cascade.brief("prompt", &report());
    assert_eq!(briefing.source, BriefingSource::Model("gemma-7b".to_string()));
    let failed: Vec<&str> = briefing.failures.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(failed, vec!["mistral-large", "llama3-8b"]);
}

#[test]
fn test_all_models_fail_gives_offline_briefing() {
    let cascade = ModelCascade::new(Box::new(ScriptedProvider::new(Vec::new())), models());

    let briefing = cascade.brief("prompt", &report());
    assert_eq!(briefing.source, BriefingSource::Offline);
    assert_eq!(briefing.failures.len(), 3);
    assert!(briefing.text.contains("CRITICAL: Insulin low."));
}

#[test]
fn test_offline_cascade_never_calls_models() {
    let cascade = ModelCascade::offline();
    assert!(cascade.models().is_empty());

    let briefing = cascade.brief("prompt", &report());
    assert_eq!(briefing.source, BriefingSource::Offline);
    assert!(briefing.failures.is_empty());
}
