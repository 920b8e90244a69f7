use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use hydroflag::family::{DataFamily, TIMESTAMP_COLUMN};
use hydroflag::process::{
    extract_date_from_filename, load_artifact, normalize_headers, select_table, PREFERRED_TABLE,
};
use hydroflag::quality::scan_table;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Show how one logger export would be read, mapped and flagged.
#[derive(Parser)]
#[command(author, version)]
struct Args {
    file: PathBuf,
    #[arg(long, value_enum, default_value_t = DataFamily::WeatherStation)]
    family: DataFamily,
    /// preferred table name; empty to disable
    #[arg(long, default_value = PREFERRED_TABLE)]
    table: String,
    /// print one JSON document instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct TableInfo {
    name: String,
    rows: usize,
    columns: Vec<String>,
}

#[derive(Serialize)]
struct Inspection {
    file: PathBuf,
    filename_date: Option<NaiveDate>,
    tables: Vec<TableInfo>,
    selected: Option<String>,
    selection: Option<String>,
    renamed: Vec<(String, String)>,
    duplicates: Vec<String>,
    filled: Vec<String>,
    dropped: Vec<String>,
    unparsed_timestamps: usize,
    /// column -> tag -> count
    anomalies: BTreeMap<String, BTreeMap<String, usize>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let inspection = inspect(&args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
    } else {
        print_text(&inspection);
    }
    Ok(())
}

fn inspect(args: &Args) -> Result<Inspection> {
    // 1) filename date
    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let filename_date = extract_date_from_filename(&file_name);

    // 2) every table in the artifact
    let artifact =
        load_artifact(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let tables = artifact
        .tables
        .iter()
        .map(|t| TableInfo {
            name: t.name.clone(),
            rows: t.table.len(),
            columns: t.table.columns.clone(),
        })
        .collect();

    let mut out = Inspection {
        file: args.file.clone(),
        filename_date,
        tables,
        selected: None,
        selection: None,
        renamed: Vec::new(),
        duplicates: Vec::new(),
        filled: Vec::new(),
        dropped: Vec::new(),
        unparsed_timestamps: 0,
        anomalies: BTreeMap::new(),
    };

    // 3) selection, mapping, rules
    let preferred = (!args.table.is_empty()).then_some(args.table.as_str());
    let Some((named, selection)) = select_table(&artifact, preferred) else {
        return Ok(out);
    };
    out.selected = Some(named.name.clone());
    out.selection = Some(format!("{:?}", selection));

    let profile = args.family.profile();
    let (mut table, mapping) = normalize_headers(&named.table, &profile.aliases, &profile.schema);
    out.unparsed_timestamps = table.coerce_timestamps(TIMESTAMP_COLUMN);
    for rec in scan_table(&table, &profile.rules, TIMESTAMP_COLUMN) {
        *out.anomalies
            .entry(rec.column)
            .or_default()
            .entry(rec.notes.to_string())
            .or_default() += 1;
    }
    out.renamed = mapping.renamed;
    out.duplicates = mapping.duplicates;
    out.filled = mapping.filled;
    out.dropped = mapping.dropped;
    Ok(out)
}

fn print_text(i: &Inspection) {
    println!("=== Source: {} ===", i.file.display());
    match i.filename_date {
        Some(d) => println!("Filename date:  {}", d),
        None => println!("Filename date:  <none, the walker would skip this file>"),
    }
    println!();

    println!("=== Tables ===");
    for t in &i.tables {
        println!("- {:<30} | rows: {:>7} | columns: {}", t.name, t.rows, t.columns.len());
    }
    println!();

    let Some(selected) = &i.selected else {
        println!("No tables; nothing selected.");
        return;
    };
    println!(
        "Selected:       {} ({})",
        selected,
        i.selection.as_deref().unwrap_or("")
    );
    println!();

    println!("=== Header mapping ===");
    for (from, to) in &i.renamed {
        println!("  {:<30} -> {}", from, to);
    }
    for d in &i.duplicates {
        println!("  duplicate dropped: {}", d);
    }
    for d in &i.dropped {
        println!("  not in schema:     {}", d);
    }
    for f in &i.filled {
        println!("  filled missing:    {}", f);
    }
    println!("Unparsed timestamps: {}", i.unparsed_timestamps);
    println!();

    println!("=== Anomalies ===");
    if i.anomalies.is_empty() {
        println!("  none");
    }
    for (column, tags) in &i.anomalies {
        for (tag, count) in tags {
            println!("  {:<14} {:<16} {:>7}", column, tag, count);
        }
    }
}
