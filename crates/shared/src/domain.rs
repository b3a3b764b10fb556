use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(MessageId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_loading: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            is_loading: false,
        }
    }

    /// Provisional assistant entry shown while a reply is pending.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            is_loading: true,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.role == Role::Assistant && self.is_loading
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    General,
    Nav,
    Performance,
    FundManager,
    ExpenseRatio,
    Risk,
}

impl SearchType {
    pub const ALL: [SearchType; 6] = [
        SearchType::General,
        SearchType::Nav,
        SearchType::Performance,
        SearchType::FundManager,
        SearchType::ExpenseRatio,
        SearchType::Risk,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::General => "general",
            SearchType::Nav => "nav",
            SearchType::Performance => "performance",
            SearchType::FundManager => "fund_manager",
            SearchType::ExpenseRatio => "expense_ratio",
            SearchType::Risk => "risk",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SearchType::General => "General Search",
            SearchType::Nav => "NAV Information",
            SearchType::Performance => "Performance Data",
            SearchType::FundManager => "Fund Manager",
            SearchType::ExpenseRatio => "Expense Ratio",
            SearchType::Risk => "Risk Category",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown search type '{0}'")]
pub struct UnknownSearchType(pub String);

impl FromStr for SearchType {
    type Err = UnknownSearchType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        SearchType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownSearchType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Unknown,
}

/// A fund metric the backend reports either as a JSON number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Number(f64),
    Text(String),
}

impl Metric {
    /// Leading-number parse: the longest numeric prefix wins, so "12.5% p.a."
    /// reads as 12.5, "1e3" as 1000 and "12.5.3" as 12.5.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Metric::Number(value) => Some(*value),
            Metric::Text(text) => {
                let text = text.trim_start();
                let numeric_len = text
                    .find(|c: char| {
                        !(c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
                    })
                    .unwrap_or(text.len());
                let candidate = &text[..numeric_len];
                (1..=candidate.len())
                    .rev()
                    .filter_map(|end| candidate[..end].parse::<f64>().ok())
                    .find(|value| value.is_finite())
            }
        }
    }

    pub fn trend(&self) -> Trend {
        match self.as_f64() {
            Some(value) if value >= 0.0 => Trend::Up,
            Some(_) => Trend::Down,
            None => Trend::Unknown,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Metric::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Number(value) => write!(f, "{value}"),
            Metric::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fund_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amc_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_1m: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_ytd: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_1y: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_3y: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_ratio: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fund_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sebi_risk_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl FundRecord {
    pub fn display_name(&self) -> &str {
        non_empty(&self.scheme_name)
            .or_else(|| non_empty(&self.fund_name))
            .or_else(|| non_empty(&self.title))
            .unwrap_or("Unknown Fund")
    }

    pub fn amc_display(&self) -> &str {
        non_empty(&self.amc_name).unwrap_or("Unknown AMC")
    }

    pub fn format_nav(&self) -> Option<String> {
        match self.nav.as_ref().filter(|nav| !nav.is_blank())? {
            Metric::Number(value) => Some(format_currency(*value)),
            Metric::Text(text) => Some(format!("₹{}", text.trim())),
        }
    }

    /// Returns are rendered as percentages; text values get a `%` suffix.
    pub fn format_return(metric: &Metric) -> String {
        match metric {
            Metric::Number(value) => format_percentage(*value),
            Metric::Text(text) => format!("{}%", text.trim()),
        }
    }

    pub fn has_period_returns(&self) -> bool {
        [&self.return_1m, &self.return_ytd, &self.return_3y]
            .into_iter()
            .any(|metric| metric.as_ref().is_some_and(|m| !m.is_blank()))
    }
}

pub fn format_currency(value: f64) -> String {
    format!("₹{value:.2}")
}

pub fn format_percentage(value: f64) -> String {
    format!("{value:.2}%")
}
