//! Generation parameters and the form that collects them.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Minimalist,
    Retro,
    Futuristic,
}

impl Style {
    pub const ALL: [Style; 3] = [Style::Minimalist, Style::Retro, Style::Futuristic];

    pub fn as_str(self) -> &'static str {
        match self {
            Style::Minimalist => "minimalist",
            Style::Retro => "retro",
            Style::Futuristic => "futuristic",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown style {0:?}")]
pub struct UnknownStyle(pub String);

impl FromStr for Style {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Style::ALL
            .into_iter()
            .find(|style| style.as_str() == s)
            .ok_or_else(|| UnknownStyle(s.to_string()))
    }
}

/// Parse a style field where the empty string means "no style chosen".
pub fn parse_style_field(raw: &str) -> Result<Option<Style>, UnknownStyle> {
    if raw.is_empty() {
        Ok(None)
    } else {
        raw.parse().map(Some)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub style: Option<Style>,
    pub color: String,
}

impl GenerationParameters {
    /// Value of the `style` form part; empty when no style is chosen.
    pub fn style_field(&self) -> &'static str {
        self.style.map(Style::as_str).unwrap_or_default()
    }
}

/// Style and color fields. Nothing is validated here, the backend decides.
///
/// Cloning gives another handle to the same fields.
#[derive(Debug, Clone, Default)]
pub struct ParameterForm {
    fields: Arc<Mutex<GenerationParameters>>,
}

impl ParameterForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_style(&self, style: Option<Style>) {
        self.fields.lock().style = style;
    }

    pub fn set_color(&self, color: impl Into<String>) {
        self.fields.lock().color = color.into();
    }

    pub fn parameters(&self) -> GenerationParameters {
        self.fields.lock().clone()
    }

    pub fn reset(&self) {
        *self.fields.lock() = GenerationParameters::default();
    }

    /// The submit action is only offered once a file is in the drop zone.
    pub fn is_submit_enabled(&self, file_selected: bool) -> bool {
        file_selected
    }

    /// Hand the current values to `on_submit` and reset the fields if it succeeds.
    pub async fn submit<F, Fut, T, E>(&self, on_submit: F) -> Result<T, E>
    where
        F: FnOnce(GenerationParameters) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let outcome = on_submit(self.parameters()).await;
        if outcome.is_ok() {
            self.reset();
        }
        outcome
    }
}
