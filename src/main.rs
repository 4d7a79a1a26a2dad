use argh::FromArgs;
use ccsh::Interpreter;
use ccsh::command::BuiltinTable;
use ccsh::env::Environment;
use ccsh::logging;
use std::process::ExitCode;

#[derive(FromArgs)]
/// A small shell that runs `|`-connected commands as a chain of processes.
struct Args {
    #[argh(option, default = "ccsh::DEFAULT_HISTORY_FILE.to_string()")]
    /// file every input line is appended to
    history_file: String,

    #[argh(option, default = "ccsh::DEFAULT_PROMPT.to_string()")]
    /// prompt shown before each line
    prompt: String,

    #[argh(option)]
    /// diagnostics level: error, warn, info, debug or trace (default: $CCSH_LOG or warn)
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    if let Err(e) = logging::init_logging(args.log_level.as_deref()) {
        eprintln!("ccsh: {:#}", e);
        return ExitCode::FAILURE;
    }

    let env = Environment::new(&args.history_file);
    let mut sh = Interpreter::new(BuiltinTable::default(), env).with_prompt(args.prompt);
    tracing::info!(history = %sh.env().history_file.display(), "starting");

    match sh.repl() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ccsh: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
