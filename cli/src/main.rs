mod site;
mod test_runner;

use std::io::Read;
use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use blocktree::parser::ParseError;
use blocktree::{BlockNode, StructuredRecord};
use fieldmap::{ContentId, Orchestrator, ResolveError};

use crate::site::Site;

#[derive(Parser)]
#[command(
    name = "blockfields",
    version,
    about = "Map block tree attributes to structured records and editor templates"
)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Print JSON on a single line
    #[arg(long, global = true)]
    compact: bool,

    /// Log more (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a block tree into an editor template array
    Template(TreeArgs),

    /// Extract the structured record declared by field mappings
    Extract(TreeArgs),

    /// Write record fields into a copy of a block tree
    Hydrate(HydrateArgs),

    /// Resolve a content item's record through its data type
    Resolve(ResolveArgs),

    /// Print registration arguments for every data type of a site
    Register(SiteArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct TreeArgs {
    /// JSON block tree file ("-" reads stdin)
    file: String,
}

#[derive(clap::Args)]
struct HydrateArgs {
    /// JSON block tree file ("-" reads stdin)
    file: String,

    /// JSON record file
    #[arg(short, long)]
    record: Option<String>,

    /// Set one field: FIELD=VALUE, VALUE parsed as JSON or taken as a string. Repeatable.
    #[arg(short, long = "set", value_name = "FIELD=VALUE")]
    set: Vec<String>,
}

#[derive(clap::Args)]
struct ResolveArgs {
    /// Site manifest (TOML)
    site: String,

    /// Content item id
    id: ContentId,

    /// Print the data type's block tree hydrated with the record instead
    #[arg(long)]
    hydrate: bool,
}

#[derive(clap::Args)]
struct SiteArgs {
    /// Site manifest (TOML)
    site: String,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

/// Shared output settings.
struct Output {
    color_choice: ColorChoice,
    compact: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.no_color);

    let output = Output {
        color_choice: if cli.no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        },
        compact: cli.compact,
    };

    match cli.command {
        Command::Template(args) => {
            let blocks = load_blocks(&args.file, &output);
            print_json(&fieldmap::convert_blocks(&blocks), &output);
        }
        Command::Extract(args) => {
            let blocks = load_blocks(&args.file, &output);
            print_json(&fieldmap::extract_blocks(&blocks), &output);
        }
        Command::Hydrate(args) => do_hydrate(args, &output),
        Command::Resolve(args) => do_resolve(args, &output),
        Command::Register(args) => do_register(args, &output),
        Command::Test(args) => {
            let path = Path::new(&args.path);
            if args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &args.category);
            process::exit(exit_code);
        }
    }
}

fn init_logging(verbose: u8, no_color: bool) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .init();
}

fn do_hydrate(args: HydrateArgs, output: &Output) {
    let blocks = load_blocks(&args.file, output);

    let mut record = match &args.record {
        Some(path) => load_record(path, output),
        None => StructuredRecord::new(),
    };
    for assignment in &args.set {
        match parse_assignment(assignment) {
            Some((field, value)) => {
                record.insert(field, value);
            }
            None => fail(&format!(
                "invalid --set '{}': expected FIELD=VALUE",
                assignment
            )),
        }
    }

    print_json(&fieldmap::hydrate_blocks(&blocks, &record), output);
}

fn do_resolve(args: ResolveArgs, output: &Output) {
    let site = load_site(&args.site);
    let orchestrator = Orchestrator::new(&site);

    if args.hydrate {
        match orchestrator.hydrated_template(args.id) {
            Ok(blocks) => print_json(&blocks, output),
            Err(error) => report_resolve_error(&error),
        }
    } else {
        // No matching data type prints `null`.
        match orchestrator.resolve_record(args.id) {
            Ok(record) => print_json(&record, output),
            Err(error) => report_resolve_error(&error),
        }
    }
}

fn do_register(args: SiteArgs, output: &Output) {
    let site = load_site(&args.site);
    let (registrations, skipped) = Orchestrator::new(&site).register_data_types();
    for error in &skipped {
        eprintln!("warning: {}", error);
    }
    print_json(&registrations, output);
}

/// Read a file, or stdin for "-".
fn read_source(path: &str) -> String {
    let result = if path == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source).map(|_| source)
    } else {
        std::fs::read_to_string(path)
    };
    result.unwrap_or_else(|e| fail(&format!("cannot read '{}': {}", path, e)))
}

fn load_blocks(path: &str, output: &Output) -> Vec<BlockNode> {
    let source = read_source(path);
    let mut files = SimpleFiles::new();
    let file_id = files.add(path.to_string(), source.clone());

    blocktree::parser::Parser::new(source, file_id)
        .parse()
        .unwrap_or_else(|errors| {
            emit_parse_errors(&files, &errors, output);
            process::exit(1);
        })
}

fn load_record(path: &str, output: &Output) -> StructuredRecord {
    let source = read_source(path);
    let mut files = SimpleFiles::new();
    let file_id = files.add(path.to_string(), source.clone());

    blocktree::parser::Parser::new(source, file_id)
        .parse_record()
        .unwrap_or_else(|errors| {
            emit_parse_errors(&files, &errors, output);
            process::exit(1);
        })
}

fn load_site(path: &str) -> Site {
    Site::load(Path::new(path)).unwrap_or_else(|e| fail(&e))
}

fn emit_parse_errors(files: &SimpleFiles<String, String>, errors: &[ParseError], output: &Output) {
    let writer = StandardStream::stderr(output.color_choice);
    let config = term::Config::default();
    for error in errors {
        let diagnostic = error.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
    }
}

fn report_resolve_error(error: &ResolveError) -> ! {
    eprintln!("error: {}", error);
    if let ResolveError::Parse { errors, .. } = error {
        for note in errors.iter().flat_map(|e| &e.notes) {
            eprintln!("  = note: {}", note);
        }
    }
    process::exit(1);
}

fn fail(message: &str) -> ! {
    eprintln!("error: {}", message);
    process::exit(1);
}

fn print_json<T: Serialize>(value: &T, output: &Output) {
    let text = if output.compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    match text {
        Ok(text) => println!("{}", text),
        Err(e) => fail(&format!("cannot serialize output: {}", e)),
    }
}

/// Parse `FIELD=VALUE`. VALUE is read as JSON when it parses, otherwise kept as a string.
fn parse_assignment(assignment: &str) -> Option<(String, Value)> {
    let (field, raw) = assignment.split_once('=')?;
    if field.is_empty() {
        return None;
    }
    let value =
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Some((field.to_string(), value))
}
