use callscript_core::config::LoadOptions;
use callscript_core::resolver::EntityResolver;
use clap::Args;

use crate::commands::{load_config, CallArgs, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub call: CallArgs,
}

pub fn run(options: &LoadOptions, args: &ResolveArgs) -> CommandResult {
    if let Err(error) = load_config(options) {
        return CommandResult::from_error("resolve", &error);
    }

    let (people, accounts) = match args.call.records() {
        Ok(records) => records,
        Err(error) => return CommandResult::from_error("resolve", &error),
    };

    let resolution = EntityResolver::new().resolve(
        &args.call.call_context(),
        args.call.override_contact.as_deref(),
        &people,
        &accounts,
    );

    CommandResult::report("resolve", &resolution)
}
