use std::sync::Arc;

use callscript_core::config::LoadOptions;
use callscript_core::errors::ApplicationError;
use callscript_core::ports::{
    Clock, FixedAgent, FixedCallContext, FixedClock, ManualOverride, SessionPorts,
    StaticDataCache, SystemClock,
};
use callscript_core::script::{RenderedStep, ScriptSession};
use clap::Args;
use serde::Serialize;
use tracing::debug;

use crate::commands::{load_config, load_script, CallArgs, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub call: CallArgs,
    #[arg(long, help = "Opener variant to enter the script through")]
    pub opener: Option<String>,
    #[arg(long, value_delimiter = ',', help = "Response labels to follow from the entry node")]
    pub path: Vec<String>,
    #[arg(long, help = "Jump to this node after following --path")]
    pub node: Option<String>,
    #[arg(long, help = "Monthly spend typed into the amount prompt (e.g. 5000, $5,000, 5k)")]
    pub monthly_spend: Option<String>,
    #[arg(long, help = "Local hour (0-23) instead of the system clock")]
    pub hour: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RenderReport<'a> {
    session_id: &'a str,
    history: Vec<&'a str>,
    step: RenderedStep,
}

pub fn run(options: &LoadOptions, args: &RenderArgs) -> CommandResult {
    match render(options, args) {
        Ok(output) => output,
        Err(error) => CommandResult::from_error("render", &error),
    }
}

fn render(options: &LoadOptions, args: &RenderArgs) -> Result<CommandResult, ApplicationError> {
    let config = load_config(options)?;
    let graph = Arc::new(load_script(config.script.path.as_deref())?);
    let (people, accounts) = args.call.records()?;

    if args.hour.is_some_and(|hour| hour > 23) {
        return Err(ApplicationError::Input("--hour must be between 0 and 23".to_string()));
    }

    let cache = StaticDataCache::new(people, accounts);
    let call = FixedCallContext(args.call.call_context());
    let agent = FixedAgent(config.agent.first_name.clone());
    let selection = ManualOverride(args.call.override_contact.clone());
    let fixed_clock = args.hour.map(FixedClock);
    let clock: &dyn Clock = match &fixed_clock {
        Some(clock) => clock,
        None => &SystemClock,
    };
    let ports =
        SessionPorts { cache: &cache, call: &call, agent: &agent, selection: &selection, clock };

    let mut session = ScriptSession::from_config(graph, &config);
    if args.opener.is_some() {
        session.set_opener(args.opener.clone());
    }

    for label in args.path.iter().map(|label| label.trim()).filter(|label| !label.is_empty()) {
        let outcome = session.navigator_mut().choose(label);
        if !outcome.moved() {
            return Err(ApplicationError::Input(format!(
                "node `{}` has no response labelled `{label}`",
                session.navigator().current()
            )));
        }
    }

    if let Some(node) = args.node.as_deref() {
        if !session.navigator_mut().go(node, "jump").moved() {
            return Err(ApplicationError::Input(format!("script has no node `{node}`")));
        }
    }

    if let Some(input) = args.monthly_spend.as_deref() {
        if session.record_monthly_spend(input).is_none() {
            return Err(ApplicationError::Input(format!(
                "monthly spend `{input}` is not a positive dollar amount"
            )));
        }
    }

    let step = session.render(&ports);
    debug!(
        event_name = "cli.render.completed",
        session_id = %session.id().0,
        node_id = %step.node_id,
        "rendered node for operator"
    );

    let report = RenderReport {
        session_id: &session.id().0,
        history: session.navigator().history().iter().map(|entry| entry.node.as_str()).collect(),
        step,
    };
    Ok(CommandResult::report("render", &report))
}
