use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use context_translate::config::Config;
use context_translate::export::build_export;
use context_translate::i18n::Locale;
use context_translate::metadata::{ConsistencyChecker, MetadataRepository};
use context_translate::output::LocaleOutputs;
use context_translate::provider::create_service;
use context_translate::session::{SessionOptions, TranslationSession};
use context_translate::source::SourceStrings;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base i18n directory holding the metadata store
    #[arg(long)]
    i18n_dir: Option<PathBuf>,

    /// Resource directory holding the values*/strings.json files
    #[arg(long)]
    res_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all documented strings
    List,
    /// Show detailed metadata for a string
    Show { key: String },
    /// Validate metadata consistency with the source strings
    Validate,
    /// Export metadata for AI translation of one locale
    Export { locale: String },
    /// Show coverage statistics
    Stats,
    /// Remove metadata entries whose source string no longer exists
    Cleanup {
        /// Actually remove the orphans; the default is a dry run
        #[arg(long)]
        execute: bool,
    },
    /// Rebuild the index from the shard files on disk
    Reindex,
    /// Run the AI translation pipeline over the documented strings
    Translate {
        /// Translate to specific locales (comma-separated codes)
        #[arg(long, conflicts_with = "all_locales")]
        locales: Option<String>,

        /// Translate to every enabled target locale
        #[arg(long)]
        all_locales: bool,

        /// Translate only this string key (always re-translated)
        #[arg(long)]
        key: Option<String>,

        /// Show prompts without calling the translation provider
        #[arg(long)]
        dry_run: bool,

        /// Re-translate strings that are already complete
        #[arg(long)]
        force: bool,

        /// Write results into the per-locale output files
        #[arg(long)]
        output: bool,

        /// Concurrent provider calls (defaults to TRANSLATION_CONCURRENCY)
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("context_translate=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(i18n_dir) = cli.i18n_dir {
        config.i18n_dir = i18n_dir;
    }
    if let Some(res_dir) = cli.res_dir {
        config.res_dir = res_dir;
    }

    let mut repo = MetadataRepository::open(
        &config.i18n_dir,
        &config.metadata_subdir,
        &config.project,
    )?;

    match cli.command {
        Commands::List => cmd_list(&mut repo),
        Commands::Show { key } => cmd_show(&mut repo, &config, &key),
        Commands::Validate => cmd_validate(&mut repo, &config),
        Commands::Export { locale } => cmd_export(&mut repo, &config, &locale),
        Commands::Stats => cmd_stats(&mut repo, &config),
        Commands::Cleanup { execute } => cmd_cleanup(&mut repo, &config, execute),
        Commands::Reindex => cmd_reindex(&mut repo),
        Commands::Translate {
            locales,
            all_locales,
            key,
            dry_run,
            force,
            output,
            concurrency,
        } => {
            cmd_translate(
                &mut repo,
                &config,
                locales,
                all_locales,
                key,
                dry_run,
                force,
                output,
                concurrency,
            )
            .await
        }
    }
}

fn cmd_list(repo: &mut MetadataRepository) -> Result<()> {
    let all = repo.get_all()?;

    println!("\nDocumented strings ({}):", all.len());
    println!("{}", "=".repeat(80));
    for (key, record) in &all {
        println!("  {}", key);
        println!("    {}", record.short_description());
    }
    Ok(())
}

fn cmd_show(repo: &mut MetadataRepository, config: &Config, key: &str) -> Result<()> {
    let record = repo
        .get(key)
        .with_context(|| format!("No metadata found for: {}", key))?;

    let source_text = SourceStrings::load(&config.source_strings_path())
        .ok()
        .and_then(|source| source.get(key).map(str::to_string))
        .unwrap_or_else(|| "(not found in source strings)".to_string());

    println!("\nMetadata for: {}", key);
    println!("{}", "=".repeat(80));
    println!("\nSource Text: {}", source_text);
    println!("\nCategory: {}", record.category_or_default());
    println!("\nUI Location: {}", record.ui_location());
    println!("\nPurpose: {}", record.purpose.as_deref().unwrap_or(""));

    if let Some(constraints) = &record.constraints {
        println!("\nConstraints:");
        match constraints.max_length {
            Some(max_length) => println!("  Max Length: {}", max_length),
            None => println!("  Max Length: None"),
        }
        println!("  Reason: {}", constraints.reason.as_deref().unwrap_or("N/A"));
    }

    if let Some(guidance) = &record.translation_guidance {
        println!("\nTranslation Guidance:");
        println!("  Tone: {}", guidance.tone.as_deref().unwrap_or("N/A"));
        println!("  Style: {}", guidance.style.as_deref().unwrap_or("N/A"));
        if let Some(terminology) = &guidance.terminology {
            if let Some(preferred) = &terminology.preferred {
                println!("  Preferred Terms: {}", preferred.join(", "));
            }
            if let Some(avoid) = &terminology.avoid {
                println!("  Avoid Terms: {}", avoid.join(", "));
            }
        }
    }

    if let Some(technical) = &record.technical {
        println!("\nTechnical:");
        println!(
            "  Format Specifiers: {}",
            technical.format_specifiers.unwrap_or(false)
        );
        println!(
            "  Contains Emoji: {}",
            technical.contains_emoji.unwrap_or(false)
        );
        if let Some(emoji) = &technical.emoji_character {
            if !emoji.is_empty() {
                println!("  Emoji: {}", emoji);
            }
        }
    }

    Ok(())
}

fn cmd_validate(repo: &mut MetadataRepository, config: &Config) -> Result<()> {
    let source = SourceStrings::load(&config.source_strings_path())?;

    println!("\nValidating metadata consistency...");
    println!("{}", "=".repeat(80));

    let issues = ConsistencyChecker::new(repo, source.get_all()).validate()?;
    for issue in issues {
        println!("{}", issue);
    }

    // Persist the refreshed string counts.
    repo.save()?;
    Ok(())
}

fn cmd_export(repo: &mut MetadataRepository, config: &Config, locale: &str) -> Result<()> {
    let target = Locale::from_code(locale)?;
    let source = SourceStrings::load(&config.source_strings_path())?;
    let records = repo.get_all()?;

    let export = build_export(&records, &source, target, repo.project());
    let output_file = format!("translation_context_{}.json", target.code());
    std::fs::write(&output_file, serde_json::to_string_pretty(&export)?)
        .with_context(|| format!("Failed to write {}", output_file))?;

    println!(
        "Exported {} strings to {}",
        export.strings.len(),
        output_file
    );
    println!("\nExport Summary:");
    println!("  Total strings in project: {}", export.total_strings);
    println!("  Documented strings: {}", export.documented_strings);
    if export.total_strings > 0 {
        println!(
            "  Coverage: {:.1}%",
            export.documented_strings as f64 / export.total_strings as f64 * 100.0
        );
    }
    Ok(())
}

fn cmd_stats(repo: &mut MetadataRepository, config: &Config) -> Result<()> {
    let source = SourceStrings::load(&config.source_strings_path())?;
    let stats = ConsistencyChecker::new(repo, source.get_all()).stats()?;

    println!("\nMetadata Statistics");
    println!("{}", "=".repeat(80));
    println!("\nOverall Coverage:");
    println!("  Total strings: {}", stats.total_strings);
    println!("  Documented: {}", stats.documented_strings);
    println!("  Undocumented: {}", stats.undocumented_strings);
    println!("  Coverage: {:.1}%", stats.coverage_percent);

    println!("\nBy Category:");
    let mut categories: Vec<_> = stats.categories.iter().collect();
    categories.sort_by_key(|(_, count)| std::cmp::Reverse(**count));
    for (category, count) in categories {
        println!("  {}: {} strings", category, count);
    }

    println!("\nTechnical Features:");
    println!("  With format specifiers: {}", stats.with_format_specifiers);
    println!("  With emoji: {}", stats.with_emoji);
    println!("  With HTML: {}", stats.with_html);
    Ok(())
}

fn cmd_cleanup(repo: &mut MetadataRepository, config: &Config, execute: bool) -> Result<()> {
    let source = SourceStrings::load(&config.source_strings_path())?;
    let mut checker = ConsistencyChecker::new(repo, source.get_all());

    println!(
        "\n{}Cleaning orphaned metadata",
        if execute { "" } else { "DRY RUN - " }
    );
    println!("{}", "=".repeat(80));

    // Identical preview in both modes, before anything diverges.
    let orphans = checker.find_orphans()?;
    if orphans.is_empty() {
        println!("\nNo orphaned metadata found!");
        return Ok(());
    }

    let total: usize = orphans.values().map(Vec::len).sum();
    println!(
        "\nFound {} orphaned metadata entries in {} categories:\n",
        total,
        orphans.len()
    );
    for (category, keys) in &orphans {
        println!("{} ({} entries):", category, keys.len());
        for key in keys {
            println!("  - {}", key);
        }
        println!();
    }

    if execute {
        let removed = checker.remove_orphans(false)?;
        println!("Cleanup complete! Removed {} orphaned metadata entries.", removed);
    } else {
        println!("This is a DRY RUN. No files were modified.");
        println!("To actually remove orphaned metadata, re-run with --execute.");
    }
    Ok(())
}

fn cmd_reindex(repo: &mut MetadataRepository) -> Result<()> {
    repo.rebuild_index_from_shards()?;

    println!("Index rebuilt from shard files:");
    for category in repo.categories() {
        println!("  - {}", category);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_translate(
    repo: &mut MetadataRepository,
    config: &Config,
    locales: Option<String>,
    all_locales: bool,
    key: Option<String>,
    dry_run: bool,
    force: bool,
    output: bool,
    concurrency: Option<usize>,
) -> Result<()> {
    let targets = if all_locales {
        Locale::all_targets()
    } else {
        let codes = locales.context(
            "No target locales specified; use --all-locales or --locales CODES",
        )?;
        Locale::parse_targets(&codes)?
    };

    let source = SourceStrings::load(&config.source_strings_path())?;
    let service: Arc<dyn context_translate::provider::TranslationService> =
        Arc::from(create_service(config, &targets)?);
    let outputs = LocaleOutputs::new(&config.res_dir);

    info!(
        provider = service.name(),
        locales = targets.len(),
        dry_run,
        force,
        "Starting translation session"
    );

    let session = TranslationSession::new(
        service,
        outputs,
        SessionOptions {
            targets,
            specific_key: key,
            dry_run,
            force,
            write_output: output,
            concurrency: concurrency.unwrap_or(config.concurrency),
        },
    );

    // Ctrl-C requests cooperative cancellation: finish the current keys,
    // skip the rest. Locale files already written stay valid and resumable.
    let cancel = session.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight keys then stopping");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let report = session.run(repo, &source).await?;

    println!("\nTranslation session complete:");
    println!(
        "  Translated: {} strings ({} locale values)",
        report.translated, report.total_translations
    );
    println!("  Dispatched: {} provider calls", report.dispatched);
    println!("  Skipped (already complete): {}", report.skipped_complete);
    if !report.skipped_no_source.is_empty() {
        println!(
            "  Skipped (no source text): {}",
            report.skipped_no_source.join(", ")
        );
    }
    if report.cancelled > 0 {
        println!("  Cancelled before dispatch: {}", report.cancelled);
    }
    if output && !dry_run {
        println!("  Locale files written: {}", report.saved_locales);
    }
    if !report.failed.is_empty() {
        println!("  Failed: {}", report.failed.join(", "));
    }
    Ok(())
}
