//! kubeops-gate: JSON-over-stdio front end for the policy engine, execution
//! broker and suggestion engine.
//!
//! Usage:
//!   kubeops-gate check <command...>     print the policy decision (exit 0 allow, 2 deny)
//!   kubeops-gate execute [command...]   run a command; without args read an ExecuteRequest from stdin
//!   kubeops-gate suggest [query...]     suggest a command; without args read a SuggestRequest from stdin
//!   kubeops-gate --dump-config          print the merged configuration as TOML
//!
//! Errors are printed to stdout as JSON with exit code 1.

use std::io::Read;
use std::process::ExitCode;

use serde::Serialize;
use serde::de::DeserializeOwned;

use kubeops_gate::AppContext;
use kubeops_gate::broker::ExecuteRequest;
use kubeops_gate::config::Config;
use kubeops_gate::suggest::SuggestRequest;

const USAGE: &str = "usage: kubeops-gate <check|execute|suggest> [args...] | --dump-config";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((verb, rest)) = args.split_first() else {
        eprintln!("{USAGE}");
        return ExitCode::from(1);
    };

    let config = Config::load();

    if verb == "--dump-config" {
        return match toml::to_string_pretty(&config) {
            Ok(text) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("kubeops-gate: cannot serialize config: {e}");
                ExitCode::from(1)
            }
        };
    }

    kubeops_gate::logging::init(&config.settings);
    let ctx = AppContext::from_config(config);

    match verb.as_str() {
        "check" => check(rest),
        "execute" => execute(&ctx, rest).await,
        "suggest" => suggest(&ctx, rest).await,
        other => {
            eprintln!("kubeops-gate: unknown command {other:?}\n{USAGE}");
            ExitCode::from(1)
        }
    }
}

fn check(rest: &[String]) -> ExitCode {
    let command = match command_from_args(rest) {
        Ok(command) => command,
        Err(code) => return code,
    };
    let evaluation = kubeops_gate::evaluate(&command);
    print_json(&evaluation.decision);
    if evaluation.decision.allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

async fn execute(ctx: &AppContext, rest: &[String]) -> ExitCode {
    let request = if rest.is_empty() {
        match read_stdin_json::<ExecuteRequest>() {
            Ok(req) => req,
            Err(code) => return code,
        }
    } else {
        match command_from_args(rest) {
            Ok(command) => ExecuteRequest::new(command),
            Err(code) => return code,
        }
    };

    match ctx.broker.execute(request).await {
        Ok(response) => {
            print_json(&response);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_json(&e);
            ExitCode::from(1)
        }
    }
}

async fn suggest(ctx: &AppContext, rest: &[String]) -> ExitCode {
    let request = if rest.is_empty() {
        match read_stdin_json::<SuggestRequest>() {
            Ok(req) => req,
            Err(code) => return code,
        }
    } else {
        // A query is prose, not argv.
        SuggestRequest::new(rest.join(" "))
    };

    match ctx.suggestions.suggest_command(request).await {
        Ok(response) => {
            print_json(&response);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_json(&e);
            ExitCode::from(1)
        }
    }
}

/// Re-quote argv so the policy tokenizer sees the words the caller's shell
/// produced.
fn command_from_args(rest: &[String]) -> Result<String, ExitCode> {
    kubeops_gate::parse::join_words(rest.iter().map(String::as_str)).map_err(|e| {
        eprintln!("kubeops-gate: cannot quote command: {e}");
        ExitCode::from(1)
    })
}

fn read_stdin_json<T: DeserializeOwned>() -> Result<T, ExitCode> {
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("kubeops-gate: failed to read stdin: {e}");
        return Err(ExitCode::from(1));
    }
    serde_json::from_str(&input).map_err(|e| {
        eprintln!("kubeops-gate: JSON parse error: {e}");
        ExitCode::from(1)
    })
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("kubeops-gate: cannot serialize output: {e}"),
    }
}
