use anyhow::{anyhow, bail, Result};
use crossterm::style::Stylize;
use radstore_client::config::Config;
use radstore_client::{logging, parse_cmdline, Client, CommandLine, Product, Record, Resource, Transformation};
use serde_json::{Map, Value};
use std::io::Write;

mod table_display;

use table_display::{display_results, export_to_csv};

/// Argument keys with a meaning of their own; everything else is a filter
/// or a field.
const RESERVED_ARGS: &[&str] = &[
    "kind", "limit", "offset", "id", "base_url", "file", "csv", "verbose",
];

fn print_help() {
    println!("{}", "radstore - products and transformations client".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  radstore <command> [key=value ...] [--verbose]");
    println!();
    println!("{}", "Commands:".yellow());
    println!("  {}        - List matching resources (csv=FILE to export)", "list".green());
    println!("  {}       - Number of matching resources", "count".green());
    println!("  {}      - Whether anything matches", "exists".green());
    println!("  {}       - First matching resource", "first".green());
    println!("  {}         - Resource by identifier (id=...)", "get".green());
    println!("  {}      - Create a resource from key=value fields", "create".green());
    println!("  {}     - Download product content (id=... [file=...])", "content".green());
    println!("  {}      - Upload product content (id=... file=...)", "upload".green());
    println!("  {} - Write a commented config file", "init-config".green());
    println!();
    println!("{}", "Options:".yellow());
    println!("  kind=products|transformations   (default: products)");
    println!("  limit=N offset=N base_url=URL");
    println!("  Other key=value pairs filter the query (dotted keys reach nested fields).");
    println!("  Values that parse as JSON are sent as JSON, anything else as text.");
    println!();
}

/// `3` stays a number, `true` a bool, `{"a":1}` an object; anything that is
/// not JSON is taken as a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn user_pairs(cmdline: &CommandLine) -> Vec<(String, Value)> {
    let mut pairs: Vec<(String, Value)> = cmdline
        .args
        .iter()
        .filter(|(key, _)| !RESERVED_ARGS.contains(&key.as_str()))
        .filter_map(|(key, value)| value.as_deref().map(|v| (key.clone(), parse_value(v))))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}

fn parse_number(cmdline: &CommandLine, key: &str) -> Result<Option<u64>> {
    cmdline
        .value(key)
        .map(|v| {
            v.parse::<u64>()
                .map_err(|_| anyhow!("{} must be a non-negative integer, got '{}'", key, v))
        })
        .transpose()
}

fn require<'a>(cmdline: &'a CommandLine, key: &str) -> Result<&'a str> {
    cmdline
        .value(key)
        .ok_or_else(|| anyhow!("missing required argument {}=...", key))
}

/// Identifier first, then metadata, for display.
fn to_row<R: Resource>(resource: &R) -> Value {
    let mut row = Map::new();
    if let Some(id) = resource.id() {
        row.insert("_id".to_string(), Value::String(id.to_string()));
    }
    for (key, value) in resource.metadata() {
        row.insert(key.clone(), value.clone());
    }
    Value::Object(row)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_resource<R: Resource>(client: &Client, command: &str, cmdline: &CommandLine) -> Result<()> {
    let mut query = R::query(client).filter(user_pairs(cmdline));
    if let Some(limit) = parse_number(cmdline, "limit")? {
        query = query.limit(limit);
    }
    if let Some(offset) = parse_number(cmdline, "offset")? {
        query = query.offset(offset);
    }

    match command {
        "list" => {
            let mut rows = Vec::new();
            for resource in query.all()? {
                rows.push(to_row(&resource?));
            }
            match cmdline.value("csv") {
                Some(path) => export_to_csv(&rows, path)?,
                None => display_results(&rows),
            }
        }
        "count" => println!("count: {}", query.count()?),
        "exists" => println!("{}", query.exists()?),
        "first" => print_json(&to_row(&query.first()?))?,
        "get" => {
            let resource = R::get(client, require(cmdline, "id")?)?;
            print_json(&to_row(&resource))?;
        }
        "create" => {
            let mut resource = R::from_record(Record::new());
            for (key, value) in user_pairs(cmdline) {
                resource.set_field(&key, value)?;
            }
            resource.save(client)?;
            println!(
                "{}",
                format!("Created {} {}", R::SINGULAR, resource.id().unwrap_or_default()).green()
            );
        }
        other => bail!("unknown command '{}' (try 'radstore help')", other),
    }

    Ok(())
}

fn run_content(client: &Client, command: &str, cmdline: &CommandLine) -> Result<()> {
    let mut product = Product::get(client, require(cmdline, "id")?)?;

    if command == "upload" {
        let path = require(cmdline, "file")?;
        let data = std::fs::read(path)?;
        let size = data.len();
        product.set_content(data);
        product.save_content(client)?;
        println!("{}", format!("Uploaded {} bytes from {}", size, path).green());
        return Ok(());
    }

    let content = product.content(client)?;
    match cmdline.value("file") {
        Some(path) => {
            std::fs::write(path, content)?;
            eprintln!("{}", format!("Wrote {} bytes to {}", content.len(), path).green());
        }
        None => {
            let mut stdout = std::io::stdout();
            stdout.write_all(content)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn init_config() -> Result<()> {
    let path = Config::get_config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, Config::create_default_with_comments())?;
    println!("Configuration file created at: {:?}", path);
    Ok(())
}

fn run(cmdline: &CommandLine, config: &Config) -> Result<()> {
    let command = match cmdline.command.as_deref() {
        None | Some("help") => {
            print_help();
            return Ok(());
        }
        Some(command) => command,
    };

    if command == "init-config" {
        return init_config();
    }

    let base_url = cmdline.value("base_url").unwrap_or(config.api.base_url.as_str());
    let client = Client::new(base_url)?;
    tracing::debug!(target: "system", "Using {}", client.base_url());

    if command == "content" || command == "upload" {
        return run_content(&client, command, cmdline);
    }

    let kind = cmdline.value("kind").unwrap_or(Product::ENDPOINT);
    if kind == Product::ENDPOINT {
        run_resource::<Product>(&client, command, cmdline)
    } else if kind == Transformation::ENDPOINT {
        run_resource::<Transformation>(&client, command, cmdline)
    } else {
        bail!("unknown kind '{}' (products or transformations)", kind)
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let cmdline = parse_cmdline(&args, true);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format!("Error loading config: {}", e).red());
            std::process::exit(1);
        }
    };

    let level = if cmdline.has("verbose") {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    logging::init_tracing(level);

    if let Err(e) = run(&cmdline, &config) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}
