//! # Vellum - A Plugin-Based Rich-Text Engine
//!
//! Command-line host for the editing engine: boots an editor on an HTML
//! fragment, runs commands against it and prints the resulting HTML.
//!
//! ## Quick Start
//!
//! ```bash
//! # Center the paragraph holding offset 3, print the saved form
//! cargo run -- --html '<p>Hello</p>' --at 3 -x align_center --save
//!
//! # Commands take JSON parameters after `=`
//! cargo run -- page.html -x 'replace_all={"search":"foo","replace":"bar"}'
//!
//! # Show the plugins and keyboard shortcuts of the default preset
//! cargo run -- --list
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vellum_core::{Config, Editor};
use vellum_dom::{Document, Point};
use vellum_plugin::Catalog;

/// Vellum - run editing commands over an HTML fragment
#[derive(Parser, Debug)]
#[command(name = "vellum")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// HTML file to load
    #[arg(value_name = "FILE", conflicts_with = "html")]
    input: Option<PathBuf>,

    /// HTML fragment given inline
    #[arg(long, value_name = "HTML")]
    html: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Plugin preset, replacing the configured plugin list
    #[arg(short, long, value_name = "NAME")]
    preset: Option<String>,

    /// Place the cursor at this character offset of the text before running commands
    #[arg(long, value_name = "OFFSET")]
    at: Option<usize>,

    /// Command to run, as `id` or `id=<json params>`; repeatable, runs in order
    #[arg(short = 'x', long = "exec", value_name = "COMMAND")]
    commands: Vec<String>,

    /// Print the save-cleaned HTML
    #[arg(short, long)]
    save: bool,

    /// Write the HTML to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// List plugins, presets and keyboard shortcuts, then exit
    #[arg(long)]
    list: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Splits `id=<json>` into the command id and its parameters.
fn parse_command(arg: &str) -> anyhow::Result<(&str, Value)> {
    match arg.split_once('=') {
        Some((id, params)) => {
            let params = serde_json::from_str(params)
                .with_context(|| format!("invalid parameters for {id}"))?;
            Ok((id.trim(), params))
        }
        None => Ok((arg.trim(), Value::Null)),
    }
}

/// The text position `offset` characters into the document, counting text
/// nodes in document order. Past the end means the end of the last text.
fn point_at_offset(doc: &Document, offset: usize) -> Point {
    let mut remaining = offset;
    let mut last = None;
    for node in doc.descendants(doc.root()) {
        if !doc.is_text(node) {
            continue;
        }
        let len = doc.node_length(node);
        if remaining <= len {
            return Point::new(node, remaining);
        }
        remaining -= len;
        last = Some(Point::new(node, len));
    }
    last.unwrap_or_else(|| Point::new(doc.root(), 0))
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("could not load {}", path.display()))?,
        None => Config::load(),
    };
    if let Some(preset) = &args.preset {
        config.plugins.preset = preset.clone();
        config.plugins.enabled.clear();
    }
    Ok(config)
}

fn load_html(args: &Args) -> anyhow::Result<String> {
    match (&args.input, &args.html) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display())),
        (None, Some(html)) => Ok(html.clone()),
        (None, None) => Ok(String::new()),
    }
}

fn listing(config: Config) -> anyhow::Result<String> {
    let descriptors = Catalog::from_config(&config.plugins)?;
    let editor = Editor::new(&descriptors, config, "")?;

    let mut out = String::from("Plugins:\n");
    for id in editor.plugin_ids() {
        out.push_str(&format!("  {id}\n"));
    }
    out.push_str("Presets:\n");
    for preset in Catalog::presets() {
        out.push_str(&format!("  {preset}: {}\n", Catalog::preset(preset)?.join(", ")));
    }
    out.push_str("Shortcuts:\n");
    for (key, command) in editor.keymap().describe() {
        out.push_str(&format!("  {key:<16} {command}\n"));
    }
    Ok(out)
}

/// Boots an editor, runs the requested commands and renders the result.
fn run(args: &Args) -> anyhow::Result<String> {
    let config = load_config(args)?;
    if args.list {
        return listing(config);
    }

    let html = load_html(args)?;
    let descriptors = Catalog::from_config(&config.plugins)?;
    let mut editor = Editor::new(&descriptors, config, &html)?;
    tracing::info!(editor = %editor.id(), plugins = editor.plugin_ids().len(), "editor booted");

    if let Some(offset) = args.at {
        let point = point_at_offset(editor.document(), offset);
        editor.set_cursor(point.node, point.offset)?;
    }

    for arg in &args.commands {
        let (id, params) = parse_command(arg)?;
        editor
            .exec_command(id, &params)
            .with_context(|| format!("command {id} failed"))?;
    }

    let html = if args.save {
        editor.content_for_save()?
    } else {
        editor.export_content()?
    };
    editor.destroy();
    Ok(html)
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging; stdout carries the HTML
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::info!("Starting Vellum v{}", env!("CARGO_PKG_VERSION"));

    let output = run(&args)?;
    match &args.output {
        Some(path) => std::fs::write(path, output)
            .with_context(|| format!("could not write {}", path.display()))?,
        None => println!("{output}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("vellum").chain(argv.iter().copied()))
    }

    #[test]
    fn test_parse_command() {
        let (id, params) = parse_command("align_center").unwrap();
        assert_eq!(id, "align_center");
        assert_eq!(params, Value::Null);

        let (id, params) = parse_command(r#"set_alignment={"mode":"right"}"#).unwrap();
        assert_eq!(id, "set_alignment");
        assert_eq!(params["mode"], "right");

        assert!(parse_command("set_alignment={mode}").is_err());
    }

    #[test]
    fn test_point_at_offset() {
        let doc = Document::from_html("<p>ab</p><p>cde</p>").unwrap();
        let texts: Vec<_> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|&n| doc.is_text(n))
            .collect();
        assert_eq!(point_at_offset(&doc, 1), Point::new(texts[0], 1));
        assert_eq!(point_at_offset(&doc, 3), Point::new(texts[1], 1));
        assert_eq!(point_at_offset(&doc, 99), Point::new(texts[1], 3));

        let empty = Document::from_html("").unwrap();
        assert_eq!(point_at_offset(&empty, 4), Point::new(empty.root(), 0));
    }

    #[test]
    fn test_run_commands_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "[plugins]\npreset = \"default\"\n").unwrap();
        let input = dir.path().join("page.html");
        let mut file = std::fs::File::create(&input).unwrap();
        write!(file, "<p>Hello<b></b></p>").unwrap();

        let html = run(&args(&[
            input.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
            "--at",
            "2",
            "-x",
            "align_center",
            "-x",
            r#"replace_all={"search":"Hello","replace":"Bye"}"#,
            "--save",
        ]))
        .unwrap();
        assert_eq!(html, r#"<p style="text-align: center;">Bye<b></b></p>"#);
    }

    #[test]
    fn test_undo_from_the_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();

        let html = run(&args(&[
            "--html",
            "<p>Hello</p>",
            "-c",
            config.to_str().unwrap(),
            "--at",
            "0",
            "-x",
            "align_right",
            "-x",
            "undo",
        ]))
        .unwrap();
        assert_eq!(html, "<p>Hello</p>");
    }

    #[test]
    fn test_unknown_command_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();

        let result = run(&args(&[
            "--html",
            "<p>a</p>",
            "-c",
            config.to_str().unwrap(),
            "-x",
            "bold",
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_listing_core_preset() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();

        let out = run(&args(&["--list", "-p", "core", "-c", config.to_str().unwrap()])).unwrap();
        assert!(out.contains("  selection\n  history\n"));
        assert!(out.contains("ctrl+z"));
        assert!(out.contains("default: selection, history"));
    }
}
