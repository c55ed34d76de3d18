use std::process::ExitCode;

fn main() -> ExitCode {
    callscript_cli::run()
}
