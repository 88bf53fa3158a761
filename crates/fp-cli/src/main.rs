//! filterpolicy CLI
//!
//! CLI tool for loading a filtering policy and querying it.

mod policy;

use std::fs;
use std::path::Path;
use std::time::Instant;

use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};

use fp_core::{BuildOptions, ListBundle, Request};

use crate::policy::{describe, load_engine, parse_headers};

#[derive(Parser)]
#[command(name = "fp-cli")]
#[command(about = "filterpolicy category matching tools")]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the categories a URL matches
    CheckUrl {
        /// Policy configuration (cfg.json)
        #[arg(short, long)]
        config: String,

        /// Directory holding the list files
        #[arg(short, long)]
        lists: String,

        /// Request URL
        #[arg(short, long)]
        url: String,

        /// Request host (taken from the URL when omitted)
        #[arg(long, default_value = "")]
        host: String,

        /// Request header as name:value (repeatable)
        #[arg(long = "header")]
        headers: Vec<String>,

        /// Do not report bypass categories
        #[arg(long)]
        bypass: bool,

        /// Print matches as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report the trigger categories found in text
    CheckText {
        /// Policy configuration (cfg.json)
        #[arg(short, long)]
        config: String,

        /// Directory holding the list files
        #[arg(short, long)]
        lists: String,

        /// Text to scan
        #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,

        /// File whose contents to scan
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Load a policy and print load statistics
    Stats {
        /// Policy configuration (cfg.json)
        #[arg(short, long)]
        config: String,

        /// Directory holding the list files
        #[arg(short, long)]
        lists: String,

        /// Rules per shard
        #[arg(long, default_value_t = fp_core::matcher::DEFAULT_SHARD_CAPACITY)]
        shard_capacity: usize,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Split a downloaded list bundle into list files
    Unpack {
        /// Bundle file
        #[arg(short, long)]
        bundle: String,

        /// Output directory for the list files
        #[arg(short, long)]
        lists: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut logger = Builder::from_env(Env::default().default_filter_or("warn"));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let result = match cli.command {
        Commands::CheckUrl {
            config,
            lists,
            url,
            host,
            headers,
            bypass,
            json,
        } => cmd_check_url(&config, &lists, &url, &host, &headers, bypass, json),
        Commands::CheckText {
            config,
            lists,
            text,
            file,
        } => cmd_check_text(&config, &lists, text, file),
        Commands::Stats {
            config,
            lists,
            shard_capacity,
            json,
        } => cmd_stats(&config, &lists, shard_capacity, json),
        Commands::Unpack { bundle, lists } => cmd_unpack(&bundle, &lists),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_check_url(
    config: &str,
    lists: &str,
    url: &str,
    host: &str,
    header_args: &[String],
    bypass: bool,
    json: bool,
) -> Result<(), String> {
    let engine = load_engine(config, lists, BuildOptions::default())?;
    engine.set_bypass_enabled(bypass);

    let headers = parse_headers(header_args)?;
    let mut request = Request::new(url, host);
    if !headers.is_empty() {
        request = request.with_headers(&headers);
    }

    let matched = engine.test_url(&request);

    if json {
        let out = serde_json::to_string_pretty(&matched).map_err(|e| format!("Failed to encode matches: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    if matched.is_empty() {
        println!("No categories matched");
    } else {
        for line in describe(&engine, &matched) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_check_text(config: &str, lists: &str, text: Option<String>, file: Option<String>) -> Result<(), String> {
    let engine = load_engine(config, lists, BuildOptions::default())?;

    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(&path).map_err(|e| format!("Failed to read '{}': {}", path, e))?,
        (None, None) => return Err("Either --text or --file is required".to_string()),
    };

    let matched = engine.test_text(&text);
    if matched.is_empty() {
        println!("No triggers matched");
    } else {
        for line in describe(&engine, &matched) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_stats(config: &str, lists: &str, shard_capacity: usize, json: bool) -> Result<(), String> {
    let start = Instant::now();
    let options = BuildOptions {
        shard_capacity,
        ..BuildOptions::default()
    };
    let engine = load_engine(config, lists, options)?;
    let elapsed = start.elapsed();

    let generation = engine.current();
    let stats = generation.stats();

    if json {
        let out = serde_json::to_string_pretty(stats).map_err(|e| format!("Failed to encode stats: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    println!("Generation {}", generation.number());
    println!("  Lists:      {} loaded, {} skipped", stats.lists_loaded, stats.lists_skipped);
    println!("  Rules:      {} loaded, {} failed", stats.rules_loaded, stats.rules_failed);
    println!("  Triggers:   {} loaded, {} failed", stats.triggers_loaded, stats.triggers_failed);
    println!("  Categories: {}", stats.categories);
    println!("  Shards:     {} (capacity {})", stats.shards, shard_capacity);
    println!("  Trie nodes: {}", generation.triggers().node_count());
    println!("  Time:       {:.1}ms", elapsed.as_secs_f64() * 1000.0);

    println!();
    println!("Categories:");
    for category in generation.registry().iter() {
        let rules = generation
            .matcher()
            .group(category.id)
            .map(|group| group.rule_count())
            .unwrap_or(0);
        println!("  {:>4}  {:<12} {:>7} rules  {}", category.id.get(), category.list_type.as_tag(), rules, category.name);
    }

    Ok(())
}

fn cmd_unpack(bundle_path: &str, lists: &str) -> Result<(), String> {
    let text = fs::read_to_string(bundle_path).map_err(|e| format!("Failed to read '{}': {}", bundle_path, e))?;
    let bundle = ListBundle::parse(&text);

    fs::create_dir_all(lists).map_err(|e| format!("Failed to create '{}': {}", lists, e))?;
    let written = bundle
        .write_to(Path::new(lists))
        .map_err(|e| format!("Failed to write lists: {}", e))?;

    println!("Unpacked {} lists into '{}'", written.len(), lists);
    for path in &written {
        println!("  {}", path.display());
    }
    for name in &bundle.failed {
        println!("  failed: {}", name);
    }
    Ok(())
}
