//! Materializes dialog text into HTML with every `{{scope.field}}` token
//! replaced by an escaped, resolved value.

pub mod spend;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::domain::{Account, CallContext, Contact};
use crate::normalize::parse_flexible_date;
use crate::resolver::Resolution;

pub use spend::{
    default_spend_ranges, format_currency, parse_dollar_amount, parse_spend_input, SpendFigures,
    SpendHeuristics, SpendRange, UNKNOWN_AMOUNT,
};

pub const TOKENS: [&str; 26] = [
    "day.greeting",
    "day.part",
    "agent.first_name",
    "agent.name",
    "contact.first_name",
    "contact.last_name",
    "contact.full_name",
    "contact.name",
    "contact.title",
    "contact.email",
    "contact.phone",
    "contact.company",
    "account.name",
    "account.industry",
    "account.city",
    "account.state",
    "account.location",
    "account.website",
    "account.supplier",
    "account.contract_end",
    "monthly_spend",
    "annual_spend",
    "potential_savings",
    "call.name",
    "call.number",
    "call.company",
];

/// Bracket markers used by older script content, mapped to the token whose
/// value replaces them.
const LEGACY_PLACEHOLDERS: [(&str, &str); 3] = [
    ("contact name", "contact.name"),
    ("company name", "account.name"),
    ("your name", "agent.first_name"),
];

/// Everything a node's text may draw on, resolved fresh for one render.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedContext {
    pub contact: Contact,
    pub account: Account,
    pub call: CallContext,
    pub agent_first_name: String,
    pub spend: SpendFigures,
    pub local_hour: u32,
}

impl ResolvedContext {
    pub fn new(
        resolution: Resolution,
        call: CallContext,
        agent_first_name: impl Into<String>,
        spend: SpendFigures,
        local_hour: u32,
    ) -> Self {
        Self {
            contact: resolution.contact,
            account: resolution.account,
            call,
            agent_first_name: agent_first_name.into(),
            spend,
            local_hour,
        }
    }
}

type TextFn = dyn Fn(&ResolvedContext) -> String + Send + Sync;

/// Template produced from live data at render time.
#[derive(Clone)]
pub struct ComputedText(Arc<TextFn>);

impl ComputedText {
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn(&ResolvedContext) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(compute))
    }

    pub fn compute(&self, context: &ResolvedContext) -> String {
        (self.0)(context)
    }
}

impl fmt::Debug for ComputedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ComputedText(..)")
    }
}

#[derive(Clone, Debug)]
pub enum NodeText {
    Static(String),
    Computed(ComputedText),
}

impl NodeText {
    pub fn computed<F>(compute: F) -> Self
    where
        F: Fn(&ResolvedContext) -> String + Send + Sync + 'static,
    {
        Self::Computed(ComputedText::new(compute))
    }

    /// Literal template for this render; computed text is invoked here and
    /// nowhere else.
    pub fn template(&self, context: &ResolvedContext) -> String {
        match self {
            Self::Static(text) => text.clone(),
            Self::Computed(text) => text.compute(context),
        }
    }
}

impl From<&str> for NodeText {
    fn from(value: &str) -> Self {
        Self::Static(value.to_owned())
    }
}

impl From<String> for NodeText {
    fn from(value: String) -> Self {
        Self::Static(value)
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let markers = LEGACY_PLACEHOLDERS
            .iter()
            .map(|(marker, _)| regex::escape(marker).replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(
            concat!(
                r"(?i)\{{\{{\s*([a-z_.]+)\s*\}}\}}",
                r"|<span\b[^>]*>\s*\(\s*({markers})\s*\)\s*</span>",
                r"|\(\s*({markers})\s*\)",
            ),
            markers = markers
        ))
        .expect("placeholder pattern compiles")
    })
}

/// Token a legacy marker stands for, whitespace and case folded.
fn legacy_token(marker: &str) -> Option<&'static str> {
    let folded = marker.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    LEGACY_PLACEHOLDERS
        .iter()
        .find(|(candidate, _)| *candidate == folded)
        .map(|(_, token)| *token)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, text: &NodeText, context: &ResolvedContext) -> String {
        self.render_template(&text.template(context), context)
    }

    /// Single left-to-right pass; substituted values are never rescanned, so
    /// CRM text that looks like a placeholder comes out literally.
    pub fn render_template(&self, template: &str, context: &ResolvedContext) -> String {
        let values = token_values(context);
        placeholder_pattern()
            .replace_all(template, |captures: &Captures<'_>| {
                let token = match captures.get(1) {
                    Some(name) => {
                        let name = name.as_str().to_lowercase();
                        TOKENS.iter().find(|token| **token == name).copied()
                    }
                    None => captures.get(2).or_else(|| captures.get(3)).and_then(|marker| {
                        legacy_token(marker.as_str())
                    }),
                };
                match token {
                    Some(token) => {
                        escape_html(values.get(token).map(String::as_str).unwrap_or_default())
                    }
                    None => captures[0].to_owned(),
                }
            })
            .into_owned()
    }
}

/// Flat token table for one render.
pub fn token_values(context: &ResolvedContext) -> BTreeMap<&'static str, String> {
    let contact = &context.contact;
    let account = &context.account;
    let call = &context.call;
    let (part, greeting) = day_part(context.local_hour);

    let contact_first = first_non_empty(&[&contact.first_name, &contact.full_name]);
    let contact_phone = first_non_empty(&[
        &contact.work_direct_phone,
        &contact.mobile_phone,
        &contact.other_phone,
        &contact.generic_phone,
        &contact.phone,
        &call.number,
    ]);
    let contract_end = if account.contract_end.is_empty() {
        String::new()
    } else {
        parse_flexible_date(&account.contract_end)
    };

    BTreeMap::from([
        ("day.greeting", greeting.to_owned()),
        ("day.part", part.to_owned()),
        ("agent.first_name", context.agent_first_name.trim().to_owned()),
        ("agent.name", context.agent_first_name.trim().to_owned()),
        ("contact.first_name", contact_first.clone()),
        ("contact.last_name", contact.last_name.clone()),
        ("contact.full_name", first_non_empty(&[&contact.full_name, &call.name])),
        ("contact.name", first_non_empty(&[&contact_first, &call.name])),
        ("contact.title", contact.title.clone()),
        ("contact.email", contact.email.clone()),
        ("contact.phone", contact_phone),
        ("contact.company", first_non_empty(&[&contact.company, &account.name, &call.company])),
        ("account.name", first_non_empty(&[&account.name, &contact.company, &call.company])),
        ("account.industry", account.industry.clone()),
        ("account.city", account.city.clone()),
        ("account.state", account.state.clone()),
        ("account.location", account.location()),
        ("account.website", account.website.clone()),
        ("account.supplier", account.supplier.clone()),
        ("account.contract_end", contract_end),
        ("monthly_spend", format_currency(context.spend.monthly)),
        ("annual_spend", format_currency(context.spend.annual)),
        ("potential_savings", format_currency(context.spend.potential_savings)),
        ("call.name", call.name.trim().to_owned()),
        ("call.number", call.number.trim().to_owned()),
        ("call.company", call.company.trim().to_owned()),
    ])
}

/// `(part, greeting)` for the local hour.
pub fn day_part(hour: u32) -> (&'static str, &'static str) {
    match hour {
        5..=11 => ("morning", "Good morning"),
        12..=16 => ("afternoon", "Good afternoon"),
        17..=20 => ("evening", "Good evening"),
        _ => ("day", "Hello"),
    }
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn first_non_empty(candidates: &[&str]) -> String {
    candidates
        .iter()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_owned()
}
