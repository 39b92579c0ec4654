//! Properties Bundle CLI
//!
//! Command-line tool for comparing, editing and normalizing `.properties`
//! translation bundles.

use clap::{Args, Parser, Subcommand, ValueEnum};
use props_core::{
    apply_edits, scan_directory, Cell, ComparisonMatrix, Edit, EditScript, Journal, RowKind,
    SaveReport, Session,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "props")]
#[command(about = "Compare and edit .properties translation bundles", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Record every save in this journal file so it can be undone
    #[arg(long, global = true)]
    journal: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which property files to load
#[derive(Args)]
struct Sources {
    /// Property files to load
    #[arg(short, long, required_unless_present = "bundle")]
    file: Vec<PathBuf>,

    /// Root directories to scan for the bundle
    #[arg(short, long)]
    root: Vec<PathBuf>,

    /// Bundle to load from the scanned roots
    #[arg(short, long, requires = "root")]
    bundle: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories for property files and index bundles
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,
    },

    /// List all discovered bundles
    ListBundles {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Show member files for each bundle
        #[arg(short, long)]
        members: bool,
    },

    /// Parse and display a single property file
    Parse {
        /// Path to the property file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Compare the files of a bundle key by key
    Compare {
        #[command(flatten)]
        sources: Sources,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Set the value of a key in one file
    Set {
        /// Path to the property file
        #[arg(short, long)]
        file: PathBuf,

        /// Key to set
        key: String,

        /// New value
        value: String,
    },

    /// Delete a matrix row in all loaded files, or a value in one file
    Delete {
        #[command(flatten)]
        sources: Sources,

        /// Key to delete
        key: String,

        /// Which row of a repeated key to delete (0 = first)
        #[arg(long, default_value_t = 0, conflicts_with = "only")]
        occurrence: usize,

        /// Only delete in this file (file name or path)
        #[arg(long)]
        only: Option<String>,

        /// Value to delete in that file (default: the first value of the key)
        #[arg(long, requires = "only")]
        value: Option<String>,
    },

    /// Rename a key in all loaded files
    Rename {
        #[command(flatten)]
        sources: Sources,

        /// Current key
        old_key: String,

        /// New key
        new_key: String,

        /// Which row of a repeated key to rename (0 = first)
        #[arg(long, default_value_t = 0)]
        occurrence: usize,
    },

    /// Remove unparsable lines and sort files by key
    Normalize {
        #[command(flatten)]
        sources: Sources,
    },

    /// Apply an edit script and save the changed files
    Apply {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Path to edit script (JSON)
        #[arg(short, long)]
        script: PathBuf,

        /// Show what would change without writing files
        #[arg(long)]
        dry_run: bool,
    },

    /// Create an edit script template
    CreateScript {
        /// Bundle name for the script
        #[arg(short, long)]
        bundle: String,

        /// Output path for the script file
        #[arg(short, long)]
        output: PathBuf,

        /// Example edits to include (file:key=value)
        #[arg(short, long)]
        example: Vec<String>,
    },

    /// Show the saves recorded in a journal
    History {
        /// Path to the journal file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Undo the last save recorded in a journal
    Undo {
        /// Path to the journal file
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command, cli.journal.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(command: Commands, journal: Option<&Path>) -> props_core::Result<()> {
    match command {
        Commands::Scan { root } => cmd_scan(&root),
        Commands::ListBundles { root, members } => cmd_list_bundles(&root, members),
        Commands::Parse { file } => cmd_parse(&file),
        Commands::Compare {
            sources,
            format,
            output,
        } => cmd_compare(&sources, format, output.as_deref()),
        Commands::Set { file, key, value } => cmd_set(&file, &key, &value, journal),
        Commands::Delete {
            sources,
            key,
            occurrence,
            only,
            value,
        } => match only {
            Some(only) => cmd_delete_value(&sources, &only, &key, value.as_deref(), journal),
            None => cmd_delete_row(&sources, &key, occurrence, journal),
        },
        Commands::Rename {
            sources,
            old_key,
            new_key,
            occurrence,
        } => cmd_rename(&sources, &old_key, &new_key, occurrence, journal),
        Commands::Normalize { sources } => cmd_normalize(&sources, journal),
        Commands::Apply {
            root,
            script,
            dry_run,
        } => cmd_apply(&root, &script, dry_run, journal),
        Commands::CreateScript {
            bundle,
            output,
            example,
        } => cmd_create_script(&bundle, &output, &example),
        Commands::History { file } => cmd_history(&file),
        Commands::Undo { file } => cmd_undo(&file),
    }
}

/// Load the files named by `--file`, plus the members of `--bundle`
fn load_session(sources: &Sources) -> props_core::Result<Session> {
    let mut paths = sources.file.clone();

    if let Some(bundle_name) = &sources.bundle {
        let scan_result = scan_directory(&sources.root)?;
        let bundle = scan_result
            .find_bundle(bundle_name)
            .ok_or_else(|| props_core::Error::BundleNotFound(bundle_name.clone()))?;
        paths.extend(bundle.members.iter().map(|m| m.path.clone()));
    }

    Session::load(&paths)
}

/// Save changed files, print what happened and record the save in the
/// journal, if one was given
fn save_session(
    session: &mut Session,
    label: &str,
    journal: Option<&Path>,
) -> props_core::Result<()> {
    if !session.has_unsaved_changes() {
        println!("No changes to save.");
        return Ok(());
    }

    let report = session.save_changed();
    print_save_report(&report);
    record_save(journal, label, &report)
}

fn print_save_report(report: &SaveReport) {
    for path in report.files_written() {
        println!("Saved {}", path.display());
    }

    if !report.errors.is_empty() {
        println!("\nErrors:");
        for (path, err) in &report.errors {
            println!("  {}: {}", path.display(), err);
        }
    }
}

fn record_save(
    journal: Option<&Path>,
    label: &str,
    report: &SaveReport,
) -> props_core::Result<()> {
    let Some(journal_path) = journal else {
        return Ok(());
    };
    let mut journal = Journal::load(journal_path)?;
    if journal.record(label, report) {
        journal.save(journal_path)?;
        println!("Recorded in {}", journal_path.display());
    }
    Ok(())
}

fn cmd_scan(roots: &[PathBuf]) -> props_core::Result<()> {
    let result = scan_directory(roots)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();
    println!("Found {} files in {} bundles", result.total_files, result.bundles.len());

    Ok(())
}

fn cmd_list_bundles(roots: &[PathBuf], members: bool) -> props_core::Result<()> {
    let result = scan_directory(roots)?;

    println!("Bundles ({}):", result.bundles.len());
    println!();

    for bundle in &result.bundles {
        if members {
            println!("{} ({} files)", bundle.name, bundle.members.len());
            for member in &bundle.members {
                let locale_str = match &member.locale {
                    Some(l) => format!(" [{}]", l),
                    None => " [base]".to_string(),
                };
                println!("  {}{}", member.path.display(), locale_str);
            }
            println!();
        } else {
            println!("  {} ({} files)", bundle.name, bundle.members.len());
        }
    }

    Ok(())
}

fn cmd_parse(file: &Path) -> props_core::Result<()> {
    let session = Session::load(&[file])?;
    let properties = &session.files()[0].properties;

    println!("File: {}", file.display());
    println!("Rows: {}", properties.len());
    println!("Keys: {}", properties.keys().count());
    println!("Preamble rows: {}", properties.preamble().len());
    println!();

    for (i, row) in properties.rows().iter().enumerate() {
        let kind = match row.kind() {
            RowKind::Property { .. } if row.is_empty() => "empty",
            RowKind::Property { .. } => "property",
            RowKind::Comment { .. } => "comment",
            RowKind::Blank => "blank",
            RowKind::Invalid { .. } => "ERROR",
        };
        println!("{:>5}  {:<8}  {}", i + 1, kind, row);
    }

    let repeated: Vec<&str> = properties
        .keys()
        .filter(|key| properties.rows_for(key).len() > 1)
        .collect();
    if !repeated.is_empty() {
        println!();
        println!("Keys defined more than once: {}", repeated.join(", "));
    }

    let errors = properties.errors().count();
    if errors > 0 {
        println!();
        println!("{} unparsable line(s); run 'props normalize' to remove them", errors);
    }

    Ok(())
}

fn cmd_compare(
    sources: &Sources,
    format: OutputFormat,
    output: Option<&Path>,
) -> props_core::Result<()> {
    let session = load_session(sources)?;
    let matrix = session.compare();

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    match format {
        OutputFormat::Text => write_matrix_text(&mut writer, &matrix)?,
        OutputFormat::Csv => matrix.write_csv(&mut writer)?,
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&matrix)?;
            writeln!(writer, "{}", json)?;
        }
    }
    writer.flush()?;

    if let Some(path) = output {
        println!("Exported {} rows to {}", matrix.row_count(), path.display());
    }

    Ok(())
}

fn write_matrix_text<W: Write>(writer: &mut W, matrix: &ComparisonMatrix) -> io::Result<()> {
    writeln!(writer, "{}", matrix.headers.join("\t"))?;
    writeln!(writer, "{}", "-".repeat(matrix.headers.len() * 12))?;

    for row in &matrix.rows {
        let mut values = vec![row.key.clone()];
        values.extend(row.cells.iter().map(|cell| format_cell(cell.as_ref())));
        writeln!(writer, "{}", values.join("\t"))?;
    }

    let missing: Vec<usize> = (0..matrix.column_count())
        .map(|column| {
            matrix
                .rows
                .iter()
                .filter(|row| row.cells[column].as_ref().is_some_and(|c| c.missing))
                .count()
        })
        .collect();

    writeln!(writer)?;
    for (label, count) in matrix.headers.iter().skip(1).zip(missing) {
        writeln!(writer, "{}: {} missing", label, count)?;
    }

    Ok(())
}

fn format_cell(cell: Option<&Cell>) -> String {
    match cell {
        None => String::new(),
        Some(c) if c.missing => "<missing>".to_string(),
        Some(c) if c.empty => "<empty>".to_string(),
        Some(c) => {
            let value = c.value.as_deref().unwrap_or_default();
            if c.multiple {
                format!("{} [*]", value)
            } else {
                value.to_string()
            }
        }
    }
}

fn cmd_set(file: &Path, key: &str, value: &str, journal: Option<&Path>) -> props_core::Result<()> {
    let mut session = Session::load(&[file])?;
    session.set_value(0, key, value)?;
    save_session(&mut session, "set", journal)
}

fn cmd_delete_row(
    sources: &Sources,
    key: &str,
    occurrence: usize,
    journal: Option<&Path>,
) -> props_core::Result<()> {
    let mut session = load_session(sources)?;

    let deleted = session.delete_row(key, occurrence);
    println!("Deleted row {} of key '{}' in {} file(s)", occurrence, key, deleted);

    save_session(&mut session, "delete", journal)
}

fn cmd_delete_value(
    sources: &Sources,
    only: &str,
    key: &str,
    value: Option<&str>,
    journal: Option<&Path>,
) -> props_core::Result<()> {
    let mut session = load_session(sources)?;
    let column = session.column_of(only)?;

    if session.delete_value(column, key, value)? {
        println!("Deleted key '{}' in {}", key, only);
    } else {
        println!("Nothing to delete for key '{}' in {}", key, only);
    }

    save_session(&mut session, "delete", journal)
}

fn cmd_rename(
    sources: &Sources,
    old_key: &str,
    new_key: &str,
    occurrence: usize,
    journal: Option<&Path>,
) -> props_core::Result<()> {
    let mut session = load_session(sources)?;

    let renamed = session.rename_key(old_key, new_key, occurrence)?;
    println!("Renamed '{}' to '{}' in {} file(s)", old_key, new_key, renamed);

    save_session(&mut session, "rename", journal)
}

fn cmd_normalize(sources: &Sources, journal: Option<&Path>) -> props_core::Result<()> {
    let mut session = load_session(sources)?;
    session.normalize();
    save_session(&mut session, "normalize", journal)
}

fn cmd_apply(
    roots: &[PathBuf],
    script_path: &Path,
    dry_run: bool,
    journal: Option<&Path>,
) -> props_core::Result<()> {
    // Load the edit script
    let script = EditScript::load(script_path)?;
    println!(
        "Loaded edit script for bundle '{}' with {} edits",
        script.bundle,
        script.edits.len()
    );

    // Scan and find the bundle
    let scan_result = scan_directory(roots)?;
    let bundle = scan_result
        .find_bundle(&script.bundle)
        .ok_or_else(|| props_core::Error::BundleNotFound(script.bundle.clone()))?;

    let mut session = Session::load(&bundle.paths())?;
    println!("Loaded {} files", session.len());

    let result = apply_edits(&mut session, &script);

    if !result.failed_edits.is_empty() {
        println!("\nWarning: {} edits could not be applied:", result.failed_edits.len());
        for (edit, reason) in &result.failed_edits {
            println!("  - {:?}: {}", edit, reason);
        }
    }

    let changed: Vec<String> = session.changed_files().map(|f| f.file_name()).collect();
    if changed.is_empty() {
        println!("\nNo files to modify.");
        return Ok(());
    }

    println!("\nFiles to be modified:");
    for name in &changed {
        println!("  {}", name);
    }

    if dry_run {
        println!("\nDry run, nothing written.");
        return Ok(());
    }

    let report = session.save_changed();

    println!("\nApply complete:");
    println!("  {} edits applied", result.edits_applied);
    println!("  {} files written", report.saved.len());
    print_save_report(&report);

    record_save(journal, &script.bundle, &report)
}

fn cmd_create_script(bundle: &str, output: &Path, examples: &[String]) -> props_core::Result<()> {
    let mut script = EditScript::new(bundle);

    // Parse example edits: "file:key=value"
    for example in examples {
        let parsed = example
            .split_once(':')
            .and_then(|(file, rest)| rest.split_once('=').map(|(key, value)| (file, key, value)));

        match parsed {
            Some((file, key, value)) => script.add_edit(Edit::set(file, key, value)),
            None => eprintln!(
                "Warning: Invalid example format '{}', expected 'file:key=value'",
                example
            ),
        }
    }

    // If no examples provided, add a placeholder
    if script.edits.is_empty() {
        script.add_edit(Edit::set(
            format!("{}_de.properties", bundle),
            "some.key",
            "New value",
        ));
    }

    script.save(output)?;
    println!("Created edit script: {}", output.display());
    println!("Bundle: {}", bundle);
    println!("Edits: {}", script.edits.len());
    println!();
    println!("Edit the file to add your changes, then run:");
    println!("  props apply --root <path> --script {}", output.display());

    Ok(())
}

fn cmd_history(file: &Path) -> props_core::Result<()> {
    let journal = Journal::load(file)?;

    println!("Journal: {} saves", journal.len());
    for (i, entry) in journal.entries().iter().enumerate() {
        println!(
            "\n{:>3}  {}  {} ({} files)",
            i + 1,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.label,
            entry.files.len()
        );
        for saved in &entry.files {
            println!("       {}", saved.path.display());
        }
    }

    Ok(())
}

fn cmd_undo(file: &Path) -> props_core::Result<()> {
    let mut journal = Journal::load(file)?;

    let Some(report) = journal.undo_last()? else {
        println!("Nothing to undo.");
        return Ok(());
    };
    journal.save(file)?;

    println!("Undid save '{}'", report.label);
    for path in &report.restored {
        println!("  Restored {}", path.display());
    }
    if !report.conflicts.is_empty() {
        println!("\nChanged since the save, left as is:");
        for path in &report.conflicts {
            println!("  {}", path.display());
        }
    }

    Ok(())
}
