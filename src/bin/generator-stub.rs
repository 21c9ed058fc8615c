//! Stub generator CLI for development testing
//!
//! Mimics the parts of a local model runner that boidfactory drives:
//!
//! - `generator-stub run [--think|--hidethinking] MODEL INSTRUCTION` reads
//!   stdin and streams a reply: markdown for spec-like instructions, a noisy
//!   HTML page when the instruction asks for HTML.
//! - `generator-stub list` prints an installed-model table.
//! - `generator-stub lint FILE` acts as a linter for the correction pass.
//!
//! Model names select failure scenarios: a model containing `fail` exits 1,
//! `empty` prints nothing, `nodoc` never emits a document, `hang` sleeps
//! far past any test timeout. `--scenario` forces a scenario for every model.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::process;
use std::thread;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scenario {
    Success,
    Error,
    Empty,
    NoDocument,
    Slow,
    Hang,
}

impl Scenario {
    fn parse(name: &str) -> Self {
        match name {
            "error" | "fail" => Self::Error,
            "empty" => Self::Empty,
            "nodoc" => Self::NoDocument,
            "slow" => Self::Slow,
            "hang" => Self::Hang,
            _ => Self::Success,
        }
    }

    fn for_model(model: &str) -> Self {
        let lower = model.to_ascii_lowercase();
        ["fail", "empty", "nodoc", "slow", "hang"]
            .iter()
            .find(|marker| lower.contains(*marker))
            .map_or(Self::Success, |marker| Self::parse(marker))
    }
}

fn cli() -> Command {
    Command::new("generator-stub")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Stub text-generation CLI for testing boidfactory")
        .arg(
            Arg::new("scenario")
                .long("scenario")
                .value_name("SCENARIO")
                .help("Force a scenario: success, error, empty, nodoc, slow, hang")
                .global(true),
        )
        .arg(
            Arg::new("no-sleep")
                .long("no-sleep")
                .help("Disable artificial streaming delays (for fast CI tests)")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Generate a reply")
                .arg(Arg::new("think").long("think").action(ArgAction::SetTrue))
                .arg(
                    Arg::new("hidethinking")
                        .long("hidethinking")
                        .action(ArgAction::SetTrue),
                )
                .arg(Arg::new("model").required(true))
                .arg(Arg::new("instruction").required(true)),
        )
        .subcommand(Command::new("list").about("List installed models"))
        .subcommand(
            Command::new("lint")
                .about("Report diagnostics for an HTML file")
                .arg(Arg::new("file").required(true)),
        )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();
    let no_sleep = matches.get_flag("no-sleep");
    let forced = matches.get_one::<String>("scenario").map(|s| Scenario::parse(s));

    match matches.subcommand() {
        Some(("run", sub)) => handle_run(sub, forced, no_sleep),
        Some(("list", _)) => {
            print!("{}", MODEL_TABLE);
            Ok(())
        }
        Some(("lint", sub)) => handle_lint(sub),
        _ => Ok(()),
    }
}

const MODEL_TABLE: &str = "\
NAME                       ID              SIZE      MODIFIED
qwen3:8b                   500a1f067a9f    5.2 GB    2 days ago
gemma3:12b                 f4031aab637d    8.1 GB    5 weeks ago
nomic-embed-text:latest    0a109f422b47    274 MB    3 weeks ago
llama3.2:3b                a80c4f17acd5    2.0 GB    2 months ago
";

fn handle_run(
    sub: &ArgMatches,
    forced: Option<Scenario>,
    no_sleep: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = sub.get_one::<String>("model").map_or("", String::as_str);
    let instruction = sub.get_one::<String>("instruction").map_or("", String::as_str);
    let thinking = sub.get_flag("think") && !sub.get_flag("hidethinking");
    let input = read_stdin();
    let scenario = forced.unwrap_or_else(|| Scenario::for_model(model));

    match scenario {
        Scenario::Error => {
            eprintln!("Error: model '{model}' not found, try pulling it first");
            process::exit(1);
        }
        Scenario::Empty => return Ok(()),
        Scenario::Hang => {
            thread::sleep(Duration::from_secs(300));
            return Ok(());
        }
        Scenario::Slow => thread::sleep(Duration::from_millis(1500)),
        Scenario::Success | Scenario::NoDocument => {}
    }

    let mut reply = String::new();
    if thinking {
        reply.push_str("Thinking...\nThe user wants something that flocks.\n...done thinking.\n\n");
    }
    let lower = instruction.to_ascii_lowercase();
    if scenario == Scenario::NoDocument {
        reply.push_str("I would rather describe the page than write it.\n");
    } else if lower.contains("html") {
        reply.push_str(&html_reply(model, &input, lower.contains("diagnostic")));
    } else {
        reply.push_str(&spec_reply(model, instruction));
    }

    stream(&reply, no_sleep)
}

fn html_reply(model: &str, input: &str, corrected: bool) -> String {
    let html_open = if corrected {
        "<html lang=\"en\">"
    } else {
        "<html>"
    };
    format!(
        "Here is the complete page:\n\n```html\n<!DOCTYPE html>\n{html_open}\n<head>\n<meta charset=\"utf-8\">\n\
<title>Boids ({model})</title>\n</head>\n<body>\n<!-- input bytes: {} -->\n<canvas id=\"flock\"></canvas>\n\
<script>\nconst boids = Array.from({{ length: 64 }}, () => ({{ x: Math.random(), y: Math.random() }}));\n</script>\n\
</body>\n</html>\n```\n\nLet me know if you want tweaks!\n",
        input.len()
    )
}

fn spec_reply(model: &str, instruction: &str) -> String {
    let request = instruction.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    format!(
        "# Boids specification\n\n_Drafted by {model}._\n\n## Request\n\n{request}\n\n## Behaviour\n\n\
- Separation, alignment and cohesion steer each boid.\n- Boids wrap around the canvas edges.\n\n\
## Controls\n\n- Sliders for the three steering weights.\n"
    )
}

fn handle_lint(sub: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let file = sub.get_one::<String>("file").map_or("", String::as_str);
    let content = fs::read_to_string(file)?;
    if content.contains("<html lang=") {
        return Ok(());
    }
    println!("{file}:2:1: An lang attribute must be present on <html> elements. (html-lang-require)");
    println!();
    println!("1 error found.");
    process::exit(1);
}

fn read_stdin() -> String {
    if io::stdin().is_terminal() {
        return String::new();
    }
    let mut input = String::new();
    let _ = io::stdin().read_to_string(&mut input);
    input
}

/// Write `text` in small chunks the way a model streams tokens.
fn stream(text: &str, no_sleep: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout().lock();
    for line in text.split_inclusive('\n') {
        stdout.write_all(line.as_bytes())?;
        stdout.flush()?;
        if !no_sleep {
            thread::sleep(Duration::from_millis(15));
        }
    }
    Ok(())
}
