use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_AMOUNT: &str = "an estimated amount";

/// A categorical answer such as "$1K–$5K" and the dollar figure it stands for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRange {
    pub label: String,
    pub midpoint: Decimal,
}

impl SpendRange {
    pub fn new(label: impl Into<String>, midpoint: i64) -> Self {
        Self { label: label.into(), midpoint: Decimal::from(midpoint) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendHeuristics {
    pub savings_rate: Decimal,
    /// Stage label of the nodes whose chosen response discloses spend.
    pub discovery_stage: String,
    pub ranges: Vec<SpendRange>,
}

impl Default for SpendHeuristics {
    fn default() -> Self {
        Self {
            savings_rate: Decimal::new(25, 2),
            discovery_stage: "situation_discovery".to_owned(),
            ranges: default_spend_ranges(),
        }
    }
}

pub fn default_spend_ranges() -> Vec<SpendRange> {
    vec![
        SpendRange::new("Under $1K", 500),
        SpendRange::new("$1K–$5K", 3_000),
        SpendRange::new("$5K–$10K", 7_500),
        SpendRange::new("$10K–$25K", 17_500),
        SpendRange::new("$25K+", 30_000),
    ]
}

/// Derived financial figures. Zero means unknown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendFigures {
    pub monthly: Decimal,
    pub annual: Decimal,
    pub potential_savings: Decimal,
}

impl SpendHeuristics {
    /// Operator-entered spend first, then the most recent discovery answer.
    /// `discovery_labels` is expected newest first.
    pub fn infer_monthly<'a>(
        &self,
        entered: Option<Decimal>,
        discovery_labels: impl IntoIterator<Item = &'a str>,
    ) -> Option<Decimal> {
        entered.filter(|value| *value > Decimal::ZERO).or_else(|| {
            discovery_labels.into_iter().find_map(|label| {
                parse_dollar_amount(label).or_else(|| self.range_midpoint(label))
            })
        })
    }

    pub fn figures(&self, monthly: Option<Decimal>) -> SpendFigures {
        let Some(monthly) = monthly.filter(|value| *value > Decimal::ZERO) else {
            return SpendFigures::default();
        };
        let Some(annual) = monthly.checked_mul(Decimal::from(12)) else {
            return SpendFigures::default();
        };
        let Some(savings) = annual.checked_mul(self.savings_rate) else {
            return SpendFigures::default();
        };
        let potential_savings =
            savings.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        SpendFigures { monthly, annual, potential_savings }
    }

    pub fn range_midpoint(&self, label: &str) -> Option<Decimal> {
        let key = range_key(label);
        if key.is_empty() {
            return None;
        }
        let exact = self.ranges.iter().find(|range| range_key(&range.label) == key);
        exact
            .or_else(|| {
                self.ranges.iter().find(|range| {
                    let range_key = range_key(&range.label);
                    !range_key.is_empty() && key.contains(&range_key)
                })
            })
            .map(|range| range.midpoint)
    }
}

fn range_key(label: &str) -> String {
    label
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| match ch {
            '–' | '—' | '−' => '-',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

fn dollar_amount() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\s*(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?")
            .expect("dollar amount pattern compiles")
    })
}

/// First plain dollar figure in a response label. `$5K` style shorthand is not
/// plain and is left to the range table.
pub fn parse_dollar_amount(label: &str) -> Option<Decimal> {
    dollar_amount().captures_iter(label).find_map(|captures| {
        let whole = captures.get(0)?;
        let shorthand = label[whole.end()..]
            .chars()
            .next()
            .map(|ch| matches!(ch.to_ascii_lowercase(), 'k' | 'm'))
            .unwrap_or(false);
        if shorthand {
            return None;
        }
        let integer = captures[1].replace(',', "");
        let amount = match captures.get(2) {
            Some(fraction) => format!("{integer}.{}", fraction.as_str()),
            None => integer,
        };
        amount.parse::<Decimal>().ok().filter(|value| *value > Decimal::ZERO)
    })
}

/// Parses the operator's typed answer to the amount prompt: `5000`, `$5,000`, `5k`.
pub fn parse_spend_input(input: &str) -> Option<Decimal> {
    let cleaned: String = input
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    let (digits, multiplier) = if let Some(stripped) = cleaned.strip_suffix('k') {
        (stripped, Decimal::from(1_000))
    } else if let Some(stripped) = cleaned.strip_suffix('m') {
        (stripped, Decimal::from(1_000_000))
    } else {
        (cleaned.as_str(), Decimal::ONE)
    };

    let value = digits.trim_start_matches('$').parse::<Decimal>().ok()?.checked_mul(multiplier)?;
    (value > Decimal::ZERO).then_some(value)
}

/// `$` plus a thousands-grouped whole-dollar figure; never `$0`.
pub fn format_currency(value: Decimal) -> String {
    if value <= Decimal::ZERO {
        return UNKNOWN_AMOUNT.to_owned();
    }
    let whole = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    if whole.is_zero() {
        return UNKNOWN_AMOUNT.to_owned();
    }
    format!("${}", group_thousands(&whole.trunc().to_string()))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        format_currency, parse_dollar_amount, parse_spend_input, SpendFigures, SpendHeuristics,
    };

    #[test]
    fn currency_groups_thousands_and_hides_unknowns() {
        assert_eq!(format_currency(Decimal::ZERO), "an estimated amount");
        assert_eq!(format_currency(Decimal::from(-10)), "an estimated amount");
        assert_eq!(format_currency(Decimal::from(12_500)), "$12,500");
        assert_eq!(format_currency(Decimal::from(999)), "$999");
        assert_eq!(format_currency(Decimal::from(1_234_567)), "$1,234,567");
        assert_eq!(format_currency(Decimal::new(150_050, 2)), "$1,501");
        assert_eq!(format_currency(Decimal::new(4, 1)), "an estimated amount");
    }

    #[test]
    fn entered_spend_drives_annual_and_savings() {
        let heuristics = SpendHeuristics::default();
        let figures = heuristics.figures(Some(Decimal::from(5_000)));

        assert_eq!(format_currency(figures.annual), "$60,000");
        assert_eq!(format_currency(figures.potential_savings), "$15,000");
    }

    #[test]
    fn unknown_spend_yields_zero_figures() {
        assert_eq!(SpendHeuristics::default().figures(None), SpendFigures::default());
    }

    #[test]
    fn entered_value_outranks_history() {
        let heuristics = SpendHeuristics::default();
        let monthly = heuristics.infer_monthly(Some(Decimal::from(800)), ["About $4,000"]);
        assert_eq!(monthly, Some(Decimal::from(800)));
    }

    #[test]
    fn plain_amounts_parse_from_labels() {
        assert_eq!(parse_dollar_amount("Roughly $4,200 a month"), Some(Decimal::from(4_200)));
        assert_eq!(parse_dollar_amount("$950.50"), Some(Decimal::new(95_050, 2)));
        assert_eq!(parse_dollar_amount("$1K–$5K"), None);
        assert_eq!(parse_dollar_amount("Not sure"), None);
    }

    #[test]
    fn categorical_ranges_map_to_midpoints() {
        let heuristics = SpendHeuristics::default();

        assert_eq!(heuristics.range_midpoint("$1K–$5K"), Some(Decimal::from(3_000)));
        assert_eq!(heuristics.range_midpoint("$1k - $5k"), Some(Decimal::from(3_000)));
        assert_eq!(heuristics.range_midpoint("Over $25K+"), Some(Decimal::from(30_000)));
        assert_eq!(heuristics.range_midpoint("Don't know"), None);

        let monthly = heuristics.infer_monthly(None, ["$5K—$10K"]);
        assert_eq!(monthly, Some(Decimal::from(7_500)));
    }

    #[test]
    fn newest_informative_label_wins() {
        let heuristics = SpendHeuristics::default();
        let monthly = heuristics.infer_monthly(None, ["Not sure", "$2,000", "$10K–$25K"]);
        assert_eq!(monthly, Some(Decimal::from(2_000)));
    }

    #[test]
    fn typed_spend_accepts_common_shorthand() {
        assert_eq!(parse_spend_input("5000"), Some(Decimal::from(5_000)));
        assert_eq!(parse_spend_input(" $5,000 "), Some(Decimal::from(5_000)));
        assert_eq!(parse_spend_input("5k"), Some(Decimal::from(5_000)));
        assert_eq!(parse_spend_input("5.5K"), Some(Decimal::from(5_500)));
        assert_eq!(parse_spend_input("0"), None);
        assert_eq!(parse_spend_input("lots"), None);
        assert_eq!(parse_spend_input(""), None);
    }

    #[test]
    fn oversized_typed_spend_is_rejected() {
        assert_eq!(parse_spend_input("79228162514264337593543950335k"), None);
        assert_eq!(parse_spend_input("79228162514264337593543950335m"), None);
    }

    #[test]
    fn oversized_spend_yields_unknown_figures() {
        let heuristics = SpendHeuristics::default();
        let huge = parse_spend_input("8000000000000000000000000000");
        assert!(huge.is_some());
        assert_eq!(heuristics.figures(huge), SpendFigures::default());

        let from_label = heuristics.infer_monthly(None, ["$8000000000000000000000000000"]);
        assert_eq!(heuristics.figures(from_label), SpendFigures::default());
    }
}
