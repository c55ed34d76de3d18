//! Scripts shipped with the crate.

use crate::render::ResolvedContext;
use crate::script::graph::{Response, ScriptDefinitionError, ScriptGraph, ScriptGraphBuilder};

const ENERGY_COLD_CALL: &str = include_str!("../../scripts/energy_cold_call.toml");

/// Energy-broker cold call: the embedded TOML nodes plus the nodes whose text
/// depends on what was resolved for this call.
pub fn default_script() -> Result<ScriptGraph, ScriptDefinitionError> {
    ScriptGraphBuilder::from_toml_str(ENERGY_COLD_CALL)?
        .computed_node(
            "contract_review",
            "contract",
            contract_review_text,
            vec![
                Response::new("Tell me more", "value_prop"),
                Response::new("Happy where we are", "objection_happy"),
            ],
        )
        .computed_node(
            "value_prop",
            "value",
            value_prop_text,
            vec![
                Response::new("Sounds good", "close"),
                Response::new("Send me the numbers", "objection_email"),
                Response::new("Not right now", "callback"),
            ],
        )
        .build()
}

fn contract_review_text(context: &ResolvedContext) -> String {
    let account = &context.account;
    match (account.supplier.trim().is_empty(), account.contract_end.trim().is_empty()) {
        (false, false) => "I see {{account.name}} is with {{account.supplier}} through \
                           {{account.contract_end}}. Have you started looking at renewal rates?"
            .to_owned(),
        (false, true) => "I understand you're with {{account.supplier}}. Do you know when \
                          that agreement ends?"
            .to_owned(),
        _ => "Who is {{account.name}} buying electricity from today, and when does that \
              contract end?"
            .to_owned(),
    }
}

fn value_prop_text(context: &ResolvedContext) -> String {
    if context.spend.monthly.is_zero() {
        return "Businesses like {{account.name}} usually save {{potential_savings}} once we \
                compare suppliers. Want me to run the numbers?"
            .to_owned();
    }
    "At {{monthly_spend}} a month that's {{annual_spend}} a year. Clients at that level \
     typically save around {{potential_savings}} annually."
        .to_owned()
}
