//! Parse an HTML fragment and print its serialization and diagnostics.
//!
//! ## Usage
//!
//! ```bash
//! # Parse a file, sniffing its encoding
//! frag-dump page-snippet.html
//!
//! # Parse a string as the content of a <td>, strictly
//! frag-dump --html '<b>x</b' --context td --strict
//!
//! # Machine-readable output
//! frag-dump --html '<jimmy>hi</jimmy>' --json
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use fragkit_common::{init_logging, LogConfig};
use fragkit_dom::{Diagnostic, Document, DocumentFragment, ParseOptions, SaveMode, SaveOptions};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "frag-dump")]
#[command(about = "Parse an HTML fragment and dump the result")]
struct Args {
    /// HTML file to parse
    file: Option<PathBuf>,

    /// Parse this string instead of a file
    #[arg(long, conflicts_with = "file")]
    html: Option<String>,

    /// Input encoding; sniffed when omitted
    #[arg(long, short)]
    encoding: Option<String>,

    /// Output syntax
    #[arg(long, short, value_enum, default_value = "html")]
    mode: Mode,

    /// Encode the output with this encoding
    #[arg(long)]
    output_encoding: Option<String>,

    /// Parse as the content of an element with this tag name
    #[arg(long)]
    context: Option<String>,

    /// Fail on the first diagnostic
    #[arg(long)]
    strict: bool,

    /// Wrap trailing top-level text in an implied <p>
    #[arg(long)]
    legacy_wrap: bool,

    /// Drop whitespace-only text nodes
    #[arg(long)]
    noblanks: bool,

    /// Lift the nesting depth limit
    #[arg(long)]
    huge: bool,

    /// Print a JSON report instead of plain text
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Html,
    Xhtml,
    Xml,
}

impl From<Mode> for SaveMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Html => SaveMode::Html,
            Mode::Xhtml => SaveMode::Xhtml,
            Mode::Xml => SaveMode::Xml,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    encoding: Option<String>,
    output: String,
    children: usize,
    errors: &'a [Diagnostic],
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_config = if args.verbose {
        LogConfig::debug()
    } else {
        LogConfig::default()
    };
    init_logging(log_config);

    let input = read_input(&args)?;
    let fragment = parse(&args, &input)?;
    info!(
        children = fragment.children().len(),
        errors = fragment.errors().len(),
        "Parsed fragment"
    );

    let mut save = SaveOptions::new(args.mode.into());
    if let Some(label) = &args.output_encoding {
        save = save.with_encoding(label.clone());
    }
    let bytes = fragment
        .serialize(&save)
        .context("Failed to serialize fragment")?;

    let mut stdout = std::io::stdout().lock();
    if args.json {
        let report = Report {
            encoding: fragment.document().encoding(),
            output: String::from_utf8_lossy(&bytes).into_owned(),
            children: fragment.children().len(),
            errors: fragment.errors(),
        };
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
    } else {
        stdout.write_all(&bytes)?;
        writeln!(stdout)?;
        for diagnostic in fragment.errors() {
            eprintln!("{}", diagnostic);
        }
    }
    Ok(())
}

fn read_input(args: &Args) -> Result<Vec<u8>> {
    match (&args.html, &args.file) {
        (Some(html), _) => Ok(html.as_bytes().to_vec()),
        (None, Some(path)) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        (None, None) => bail!("Pass an HTML file or --html"),
    }
}

fn parse(args: &Args, input: &[u8]) -> Result<DocumentFragment> {
    let mut options = ParseOptions::new().with_legacy_paragraph_wrap(args.legacy_wrap);
    if args.strict {
        options = options.strict();
    }
    if args.noblanks {
        options = options.noblanks();
    }
    if args.huge {
        options = options.huge();
    }

    let Some(tag) = &args.context else {
        return DocumentFragment::parse(input, args.encoding.as_deref(), Some(options))
            .context("Failed to parse fragment");
    };

    let html = match args.encoding.as_deref() {
        Some(label) => {
            let decoded = fragkit_html::encoding::resolve(input, Some(label), label)
                .with_context(|| format!("Failed to decode input as {}", label))?;
            decoded.text
        }
        None => String::from_utf8(input.to_vec()).context("Input is not UTF-8; pass --encoding")?,
    };

    let document = Document::parse_html(&format!("<{0}></{0}>", tag))
        .context("Failed to build context document")?;
    let context = document
        .at(tag)
        .with_context(|| format!("No <{}> element to use as context", tag))?;
    DocumentFragment::new(&document, &html, Some(&context), Some(options))
        .with_context(|| format!("Failed to parse fragment in <{}>", tag))
}
