use std::io::{self, Write};
use std::process;

use clap::{arg, command, value_parser, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;

use dfa_table::emit::{graph, pairs, table};
use dfa_table::{Dfa, Nfa, PairsOptions, TableFormat, TableOptions};

const EXIT_ERROR: i32 = 1;

/// Compiled when no pattern is given on the command line.
const DEFAULT_PATTERNS: [&str; 2] = [
    r"^[ \t]*//[ \t]*TRACE[ \t]*#[0-9]+[ \t]*$",
    r"^[ \t]*#[0-9]+.*$",
];

fn cli() -> Command {
    command!()
        .about("Compiles regular expressions into DFA transition tables")
        // Keep options sorted alphabetically by their long name.
        .arg(
            Arg::new("PATTERN")
                .help("Regular expression to compile")
                .action(ArgAction::Append),
        )
        .arg(
            arg!(-e --"emit" <WHAT>)
                .help("Outputs to print")
                .value_parser(["nfa", "graph", "table", "pairs"])
                .value_delimiter(',')
                .default_values(["graph", "table"])
                .action(ArgAction::Append),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .help("Language of the full table")
                .value_parser(["c", "rust"])
                .default_value("c"),
        )
        .arg(
            arg!(-n --"name" <NAME>)
                .help("Name of the emitted table")
                .default_value("Yy_nxt"),
        )
        .arg(arg!(--"no-minimize").help("Emit the DFA straight from subset construction"))
        .arg(arg!(--"numeric").help("Print bytes in compressed tables as numbers"))
        .arg(
            arg!(-t --"threshold" <COUNT>)
                .help("Rows with more transitions are not compressed")
                .value_parser(value_parser!(usize))
                .default_value("4"),
        )
}

fn exec(pattern: &str, args: &ArgMatches) -> anyhow::Result<bool> {
    let nfa = match Nfa::new(pattern) {
        Ok(nfa) => nfa,
        Err(err) => {
            eprintln!("{}", err.render(pattern));
            return Ok(false);
        }
    };

    let mut dfa = Dfa::from_nfa(&nfa);
    if !args.get_flag("no-minimize") {
        dfa = dfa.minimize();
    }

    let name = args.get_one::<String>("name").unwrap();
    let format = match args.get_one::<String>("format").map(String::as_str) {
        Some("rust") => TableFormat::Rust,
        _ => TableFormat::C,
    };
    let table_options = TableOptions {
        name: name.clone(),
        format,
    };
    let pairs_options = PairsOptions {
        name: name.clone(),
        threshold: *args.get_one::<usize>("threshold").unwrap(),
        numbers: args.get_flag("numeric"),
    };

    let mut out = io::stdout().lock();
    writeln!(out, "{} {}", "pattern:".green().bold(), pattern)?;
    for what in args.get_many::<String>("emit").unwrap() {
        match what.as_str() {
            "nfa" => write!(out, "{}", nfa)?,
            "graph" => write!(out, "{}", graph(&dfa, name))?,
            "table" => write!(out, "{}", table(&dfa, &table_options))?,
            "pairs" => write!(out, "{}", pairs(&dfa, &pairs_options))?,
            _ => unreachable!(),
        }
        writeln!(out)?;
    }
    Ok(true)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = cli().get_matches();
    let patterns: Vec<&str> = match args.get_many::<String>("PATTERN") {
        Some(patterns) => patterns.map(String::as_str).collect(),
        None => DEFAULT_PATTERNS.to_vec(),
    };

    let mut failed = false;
    for pattern in patterns {
        if !exec(pattern, &args)? {
            failed = true;
        }
    }
    if failed {
        process::exit(EXIT_ERROR);
    }
    Ok(())
}
