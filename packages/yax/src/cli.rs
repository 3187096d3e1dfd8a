//! Command-line interface for the streaming extractor.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Serialize;

use crate::condition::{Condition, ConditionFields, FilterSpec};
use crate::config::{ReaderConfig, DEFAULT_ATTRIB_PREFIX, DEFAULT_CHUNK_SIZE, DEFAULT_TEXT_KEY};
use crate::error::{CallbackError, Result, StreamError, YaxError};
use crate::reader::{PassStats, Position, StreamReader};
use crate::runner::{Output, OutputFormat};

/// YAX - Print the elements of an XML stream that match a condition.
///
/// Filters take a literal value or a regular expression written as /REGEX/,
/// which must match the whole value.
#[derive(Parser, Debug)]
#[command(name = "yax")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// XML file to read (default: stdin)
    pub file: Option<PathBuf>,

    /// Tag name filter
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Attribute filter; a bare KEY requires a non-empty value
    #[arg(short, long = "attr", value_name = "KEY[=VALUE|=/REGEX/]")]
    pub attrs: Vec<String>,

    /// Text filter, applied to the trimmed text
    #[arg(long)]
    pub text: Option<String>,

    /// Tag filter for the parent element
    #[arg(short, long)]
    pub parent: Option<String>,

    /// Require a child with this tag (repeatable)
    #[arg(short, long = "child")]
    pub children: Vec<String>,

    /// Keep children with this tag in the output (repeatable)
    #[arg(short, long)]
    pub keep: Vec<String>,

    /// Print the elements that do NOT match
    #[arg(long)]
    pub invert: bool,

    /// Representation of each match
    #[arg(short, long, default_value_t = OutputFormat::Element)]
    pub format: OutputFormat,

    /// Serialization of dict and prefixed records
    #[arg(long, value_enum, default_value_t = Emit::Json)]
    pub emit: Emit,

    /// Bytes requested from the input per read
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Attribute key prefix for the prefixed format
    #[arg(long, default_value = DEFAULT_ATTRIB_PREFIX)]
    pub attrib_prefix: String,

    /// Text key for the prefixed format
    #[arg(long, default_value = DEFAULT_TEXT_KEY)]
    pub text_key: String,

    /// Print pass statistics to stderr
    #[arg(long)]
    pub stats: bool,
}

/// Record serialization for structured formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Emit {
    /// One JSON document per line
    Json,
    /// YAML documents separated by `---`
    Yaml,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let stdout = io::stdout();
    let stats = execute(&cli, &mut stdout.lock())?;

    if cli.stats {
        eprintln!(
            "opened={} closed={} matched={} detached={} peak_alive={}",
            stats.opened, stats.closed, stats.matched, stats.detached, stats.peak_alive
        );
    }
    Ok(())
}

/// Run one pass as described by `cli`, writing records to `out`.
///
/// # Errors
/// Returns an error if the condition or configuration is invalid, the input
/// cannot be read or parsed, or writing a record fails.
pub fn execute(cli: &Cli, out: &mut impl Write) -> Result<PassStats> {
    // Build everything that can fail before touching the input
    let condition = build_condition(cli)?;
    let emit = cli.emit;
    let config = ReaderConfig::new()
        .with_chunk_size(cli.chunk_size)
        .with_attrib_prefix(cli.attrib_prefix.as_str())
        .with_text_key(cli.text_key.as_str());
    let mut reader = StreamReader::with_config(config)?;

    let input: Box<dyn Read> = match &cli.file {
        Some(path) => Box::new(File::open(path).map_err(StreamError::Io)?),
        None => Box::new(io::stdin().lock()),
    };
    reader.bind(input)?;

    reader
        .match_condition(condition)?
        .output(cli.format)
        .calls(|output, position| write_record(out, output, position, emit));
    let stats = reader.start()?;
    drop(reader);

    out.flush().map_err(StreamError::Io)?;
    Ok(stats)
}

/// Parse a filter argument: `/REGEX/` or a literal value.
///
/// # Errors
/// Returns `ConditionError::InvalidPattern` for a malformed regex.
pub fn parse_filter(value: &str) -> Result<FilterSpec> {
    let pattern = value
        .strip_prefix('/')
        .and_then(|rest| rest.strip_suffix('/'));
    match pattern {
        Some(pattern) => Ok(FilterSpec::pattern(pattern)?),
        None => Ok(FilterSpec::from(value)),
    }
}

/// Parse an attribute argument: `KEY`, `KEY=VALUE` or `KEY=/REGEX/`.
///
/// # Errors
/// Returns `YaxError::Config` for an empty key and
/// `ConditionError::InvalidPattern` for a malformed regex.
pub fn parse_attr(value: &str) -> Result<(String, FilterSpec)> {
    let (key, filter) = match value.split_once('=') {
        Some((key, filter)) => (key, parse_filter(filter)?),
        None => (value, FilterSpec::Bool(true)),
    };
    if key.is_empty() {
        return Err(YaxError::Config(format!(
            "attribute filter '{value}' has no key"
        )));
    }
    Ok((key.to_string(), filter))
}

fn build_condition(cli: &Cli) -> Result<Condition> {
    let mut fields = ConditionFields::new();
    if let Some(tag) = &cli.tag {
        fields = fields.with_tag(parse_filter(tag)?);
    }
    for attr in &cli.attrs {
        let (key, filter) = parse_attr(attr)?;
        fields = fields.with_attrib(key, filter);
    }
    if let Some(text) = &cli.text {
        fields = fields.with_text(parse_filter(text)?);
    }
    if let Some(parent) = &cli.parent {
        fields = fields.with_parent(parse_filter(parent)?);
    }
    for child in &cli.children {
        fields = fields.with_child(parse_filter(child)?);
    }
    for keep in &cli.keep {
        fields = fields.with_keep(parse_filter(keep)?);
    }

    let condition = Condition::from_fields(fields)?;
    Ok(if cli.invert {
        condition.invert()
    } else {
        condition
    })
}

fn write_record(
    out: &mut impl Write,
    output: Output<'_>,
    position: Position,
    emit: Emit,
) -> std::result::Result<(), CallbackError> {
    match output {
        Output::Element(element) => writeln!(out, "{position} <{}>", element.tag())?,
        Output::String(xml) => writeln!(out, "{xml}")?,
        Output::Dict(nested) => write_value(out, &nested, emit)?,
        Output::Prefixed(value) => write_value(out, &value, emit)?,
    }
    Ok(())
}

fn write_value<T: Serialize>(
    out: &mut impl Write,
    value: &T,
    emit: Emit,
) -> std::result::Result<(), CallbackError> {
    match emit {
        Emit::Json => {
            serde_json::to_writer(&mut *out, value)?;
            writeln!(out)?;
        }
        Emit::Yaml => {
            writeln!(out, "---")?;
            serde_yaml_ng::to_writer(&mut *out, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("yax").chain(args.iter().copied())).unwrap()
    }

    fn run_on(xml: &str, args: &[&str]) -> String {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), xml).unwrap();
        let path = file.path().to_str().unwrap();

        let mut all = vec![path];
        all.extend_from_slice(args);
        let mut out = Vec::new();
        execute(&cli(&all), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_filter() {
        assert!(matches!(parse_filter("PLANT").unwrap(), FilterSpec::Exact(s) if s == "PLANT"));
        assert!(matches!(parse_filter(r"/\d+/").unwrap(), FilterSpec::Pattern(_)));
        assert!(matches!(parse_filter("/").unwrap(), FilterSpec::Exact(_)));
        assert!(parse_filter("/(/").is_err());
    }

    #[test]
    fn test_parse_attr() {
        let (key, filter) = parse_attr("id").unwrap();
        assert_eq!(key, "id");
        assert!(matches!(filter, FilterSpec::Bool(true)));

        let (key, filter) = parse_attr("lang=en").unwrap();
        assert_eq!(key, "lang");
        assert!(matches!(filter, FilterSpec::Exact(v) if v == "en"));

        assert!(parse_attr("=x").is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = cli(&[]);
        assert_eq!(cli.format, OutputFormat::Element);
        assert_eq!(cli.emit, Emit::Json);
        assert_eq!(cli.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(cli.file.is_none());
    }

    #[test]
    fn test_execute_string_format() {
        let out = run_on(
            "<r><a>1</a><b/><a>2</a></r>",
            &["--tag", "a", "--format", "string"],
        );
        assert_eq!(out, "<a>1</a>\n<a>2</a>\n");
    }

    #[test]
    fn test_execute_prefixed_json() {
        let out = run_on(
            r#"<r><item id="1">x</item></r>"#,
            &["-t", "item", "-a", r"id=/\d/", "-f", "prefixed"],
        );
        assert_eq!(out, "{\"#text\":\"x\",\"-id\":\"1\"}\n");
    }

    #[test]
    fn test_execute_dict_yaml() {
        let out = run_on("<r><a>1</a></r>", &["-t", "a", "-f", "dict", "--emit", "yaml"]);
        assert!(out.starts_with("---\n"));
        assert!(out.contains("tag: a"));
    }

    #[test]
    fn test_execute_invert() {
        let out = run_on("<r><a/><b/></r>", &["--tag", "a", "--invert"]);
        let tags: Vec<&str> = out
            .lines()
            .filter_map(|line| line.split_once(' ').map(|(_, tag)| tag))
            .collect();
        assert_eq!(tags, vec!["<b>", "<r>"]);
    }

    #[test]
    fn test_execute_malformed_input_returns_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "<r><a>1</a><a></r>").unwrap();
        let cli = cli(&[file.path().to_str().unwrap(), "-t", "a", "-f", "dict"]);

        let mut out = Vec::new();
        let err = execute(&cli, &mut out).unwrap_err();
        assert!(matches!(err, YaxError::Stream(_)));
        assert!(String::from_utf8(out).unwrap().contains("\"tag\":\"a\""));
    }

    #[test]
    fn test_invalid_condition_fails_before_reading() {
        let cli = cli(&["/does/not/exist.xml", "--text", "/(/"]);
        let err = execute(&cli, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, YaxError::Condition(_)));
    }
}
