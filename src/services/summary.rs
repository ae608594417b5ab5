use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::SaleRecord;
use crate::services::analysis::AreaStats;

const HF_ENDPOINT: &str = "https://api-inference.huggingface.co/models";
const HF_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.1";
const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_new_tokens: 150,
            temperature: 0.7,
            top_p: 0.95,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// Produces the prose summary for a single-area analysis. Tries the hosted
/// text-generation API first, then the deterministic analytical summary; the
/// request never fails because of the remote call.
pub struct Summarizer {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl Summarizer {
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(REMOTE_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            endpoint: format!("{}/{}", HF_ENDPOINT, HF_MODEL),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_endpoint(api_key: Option<String>, endpoint: &str) -> Self {
        let mut summarizer = Self::new(api_key);
        summarizer.endpoint = endpoint.to_string();
        summarizer
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().map_or(false, |key| key.len() > 10)
    }

    /// Redacted credential rendering for the debug endpoint.
    pub fn key_preview(&self) -> String {
        match self.api_key.as_deref() {
            Some(key) if key.len() > 15 => {
                format!("{}...{}", &key[..10], &key[key.len() - 5..])
            }
            Some(_) => "TOO SHORT".to_string(),
            None => "NOT SET".to_string(),
        }
    }

    /// Ordered fallback chain: remote generation, then the analytical
    /// summary. The analytical strategy cannot fail for a non-empty
    /// selection, so the chain always yields text. No retries; the first
    /// remote failure falls through immediately.
    pub async fn summarize(&self, area: &str, rows: &[SaleRecord]) -> String {
        if rows.is_empty() {
            return no_data_message(area);
        }

        match self.remote_summary(area, rows).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "Remote summary unavailable for {}: {}. Using analytical summary",
                    area,
                    e
                );
                analytical_summary(area, rows)
            }
        }
    }

    async fn remote_summary(&self, area: &str, rows: &[SaleRecord]) -> Result<String, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::LlmError("HuggingFace API key not configured".to_string()))?;

        let prompt = build_prompt(area, rows);
        tracing::info!("Calling text-generation API for {}", area);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&GenerationRequest {
                inputs: &prompt,
                parameters: GenerationParameters::default(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::LlmError(format!(
                "generation endpoint returned {}",
                status
            )));
        }

        let outputs: Vec<GeneratedText> = response.json().await?;
        let generated = outputs
            .first()
            .ok_or_else(|| AppError::LlmError("empty generation response".to_string()))?;

        // The API echoes the prompt ahead of the completion.
        let text = generated
            .generated_text
            .strip_prefix(prompt.as_str())
            .unwrap_or(&generated.generated_text)
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(AppError::LlmError("blank generation".to_string()));
        }

        tracing::info!("Summary generated for {}", area);
        Ok(text)
    }
}

fn build_prompt(area: &str, rows: &[SaleRecord]) -> String {
    format!(
        "Write a concise real-estate analysis summary (5-8 lines) for the locality '{}' \
         using the following dataset. Focus on price trend, demand trend, growth patterns, \
         and any notable changes.\n\nData:\n{}\n\nSummary:",
        area,
        format_rows_as_text(rows)
    )
}

/// Readable rendering of the selected rows for the generation prompt.
fn format_rows_as_text(rows: &[SaleRecord]) -> String {
    rows.iter()
        .map(|r| {
            format!(
                "Year {}: Price ₹{}/sqft, Sales {}, Units {}",
                r.year,
                group_thousands(r.rate),
                r.units_sold,
                r.total_units
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn no_data_message(area: &str) -> String {
    if area.is_empty() {
        "No data available.".to_string()
    } else {
        format!("No data available for {}.", area)
    }
}

/// Deterministic summary built from the computed aggregates: year span,
/// average rate, trend direction and magnitude, price range, transaction
/// totals, and the volatility band.
pub fn analytical_summary(area: &str, rows: &[SaleRecord]) -> String {
    let stats = match AreaStats::compute(rows) {
        Some(stats) => stats,
        None => return no_data_message(area),
    };

    let rate_direction = if stats.rate_change_pct > 0.0 {
        "upward"
    } else {
        "downward"
    };
    let sales_direction = if stats.sales_change_pct > 0.0 {
        "increased"
    } else {
        "decreased"
    };
    let volatility = capitalize(stats.volatility().label());

    format!(
        "{} real estate market analysis ({}-{}): \
         Average rate: Rs {}/sqft with {} trend of {:.1}%. \
         Price range: Rs {} to Rs {}/sqft. \
         Transaction activity: {:.0} units sold ({} by {:.1}%). \
         {} market with {:.1}% price volatility.",
        area,
        stats.start_year,
        stats.end_year,
        group_thousands(stats.mean_rate),
        rate_direction,
        stats.rate_change_pct.abs(),
        group_thousands(stats.min_rate),
        group_thousands(stats.max_rate),
        stats.total_units_sold,
        sales_direction,
        stats.sales_change_pct.abs(),
        volatility,
        stats.volatility_pct
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Integer rendering with thousands separators, like `12,345`.
pub(crate) fn group_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
