use crate::catalog::JsonCatalog;
use crate::player::{self, PlayOptions};
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use console::style;
use earshot_config::{Config, ConfigManager};
use earshot_core::{format_clock, Audiobook, Chapter, PlaybackRate};
use media_engine::AudioDecoder;
use std::path::{Path, PathBuf};

/// List all books in the catalog
pub fn list_books(catalog_path: &Path) -> Result<()> {
    let catalog = JsonCatalog::open(catalog_path).context("Failed to open catalog")?;

    if catalog.is_empty() {
        println!("No books in catalog. Use 'add' to register an audiobook.");
        return Ok(());
    }

    println!("\n{} Books in Catalog", style(catalog.books().len()).bold().cyan());
    println!("{}", "=".repeat(80));

    for book in catalog.books() {
        print_book_summary(book);
    }

    Ok(())
}

/// Add an audiobook file to the catalog
pub fn add_book(catalog_path: &Path, config: &Config, matches: &ArgMatches) -> Result<()> {
    let file_path = matches
        .get_one::<String>("path")
        .ok_or_else(|| anyhow::anyhow!("File path is required"))?;

    let path = PathBuf::from(file_path);
    if !path.exists() {
        bail!("File not found: {}", file_path);
    }

    let decoder = AudioDecoder::open(&path)
        .with_context(|| format!("Could not read audio from {}", file_path))?;
    let duration = decoder
        .duration()
        .ok_or_else(|| anyhow::anyhow!("Could not determine the duration of {}", file_path))?;

    let title = matches
        .get_one::<String>("title")
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Unknown")
                .to_string()
        });

    let chapter_specs: Vec<&str> = matches
        .get_many::<String>("chapter")
        .map(|values| values.map(|s| s.as_str()).collect())
        .unwrap_or_default();
    let chapters = parse_chapters(&chapter_specs, duration)?;

    let mut book = Audiobook::new(title, path, duration).with_chapters(chapters);
    if let Some(author) = matches.get_one::<String>("author") {
        book = book.with_author(author.as_str());
    }
    if let Some(artwork) = matches.get_one::<String>("artwork") {
        book = book.with_artwork(artwork.as_str());
    }
    book.playback_rate = PlaybackRate::clamped(config.player.default_speed).value();

    let mut catalog = JsonCatalog::open(catalog_path).context("Failed to open catalog")?;
    catalog
        .upsert(book.clone())
        .context("Failed to add book to catalog")?;

    println!("{} Book added successfully!", style("✓").green().bold());
    println!("  ID: {}", book.id);
    println!("  Title: {}", book.title);
    if let Some(author) = &book.author {
        println!("  Author: {}", author);
    }
    println!("  Duration: {}", format_clock(book.duration));
    if !book.chapters.is_empty() {
        println!("  Chapters: {}", book.chapters.len());
    }

    Ok(())
}

/// Play an audiobook interactively
pub fn play_book(catalog_path: &Path, config: &Config, matches: &ArgMatches) -> Result<()> {
    let id = matches
        .get_one::<String>("id")
        .ok_or_else(|| anyhow::anyhow!("Book ID is required"))?;

    let catalog = JsonCatalog::open(catalog_path).context("Failed to open catalog")?;
    let book = catalog
        .find(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No book matches '{}'", id))?;

    let options = PlayOptions {
        sleep_minutes: matches.get_one::<u64>("sleep").copied(),
        rate: matches.get_one::<f32>("rate").copied(),
    };

    println!("\n{} {}", style("▶").green().bold(), style(&book.title).bold());
    if let Some(author) = &book.author {
        println!("by {}", author);
    }

    player::start_playback(catalog, config, book, options)
}

/// Clear the saved position and finished flag of a book
pub fn reset_book(catalog_path: &Path, matches: &ArgMatches) -> Result<()> {
    let id = matches
        .get_one::<String>("id")
        .ok_or_else(|| anyhow::anyhow!("Book ID is required"))?;

    let mut catalog = JsonCatalog::open(catalog_path).context("Failed to open catalog")?;
    let mut book = catalog
        .find(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No book matches '{}'", id))?;

    book.reset_progress();
    catalog.upsert(book.clone()).context("Failed to update book")?;

    println!("{} Progress reset: {}", style("✓").green().bold(), book.title);
    Ok(())
}

/// Inspect or change the config file
///
/// `show` prints the settings in effect, so environment overrides are
/// included; `validate` checks the file as written.
pub fn config_command(manager: &ConfigManager, config: &Config, matches: &ArgMatches) -> Result<()> {
    let config_path = manager.config_path().display();

    match matches.subcommand() {
        Some(("path", _)) => {
            println!("Config:  {}", config_path);
            println!("Catalog: {}", manager.catalog_path(config).display());
        }
        Some(("show", _)) => {
            print!("{}", config.to_toml().context("Failed to render settings")?);
        }
        Some(("init", _)) => {
            if manager.initialize().context("Failed to write config")? {
                println!("{} Wrote default settings to {}", style("✓").green().bold(), config_path);
            } else {
                println!("Config already exists at {}", config_path);
            }
        }
        Some(("reset", _)) => {
            let backup = manager.reset().context("Failed to reset config")?;
            println!("{} Settings reset to defaults", style("✓").green().bold());
            if let Some(backup) = backup {
                println!("  Previous file: {}", backup.display());
            }
        }
        Some(("validate", _)) => {
            let problems = manager.validate().context("Failed to read config")?;
            if !problems.is_empty() {
                for problem in &problems {
                    println!("  {} {}", style("✗").red().bold(), problem);
                }
                bail!("{} invalid setting(s) in {}", problems.len(), config_path);
            }
            println!("{} {} is valid", style("✓").green().bold(), config_path);
        }
        Some(("set", sub_matches)) => {
            let key = sub_matches
                .get_one::<String>("key")
                .ok_or_else(|| anyhow::anyhow!("Setting name is required"))?;
            let value = sub_matches
                .get_one::<String>("value")
                .ok_or_else(|| anyhow::anyhow!("Value is required"))?;

            manager
                .set(key, value)
                .with_context(|| format!("Failed to set {}", key))?;
            println!("{} {} = {}", style("✓").green().bold(), key, value);
        }
        Some((other, _)) => bail!("Unknown config action: {}", other),
        None => bail!("A config action is required"),
    }

    Ok(())
}

/// Builds chapters from `START=TITLE` pairs
///
/// Each chapter runs until the next one starts; the last one runs to the end
/// of the book. `START` is seconds or `H:MM:SS` / `MM:SS`.
fn parse_chapters(specs: &[&str], total_duration: f64) -> Result<Vec<Chapter>> {
    let mut starts = Vec::with_capacity(specs.len());
    for spec in specs {
        let (start, title) = spec
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Chapter '{}' must look like START=TITLE", spec))?;
        let start = parse_time(start)
            .with_context(|| format!("Invalid chapter start in '{}'", spec))?;
        if start >= total_duration {
            bail!(
                "Chapter '{}' starts after the end of the book ({})",
                title,
                format_clock(total_duration)
            );
        }
        starts.push((start, title.trim().to_string()));
    }
    starts.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut chapters = Vec::with_capacity(starts.len());
    for (i, (start, title)) in starts.iter().enumerate() {
        let end = starts
            .get(i + 1)
            .map(|(next, _)| *next)
            .unwrap_or(total_duration);
        if end <= *start {
            bail!("Chapters '{}' and '{}' start at the same time", title, starts[i + 1].1);
        }
        chapters.push(Chapter::new(title.as_str(), *start, end - start));
    }
    Ok(chapters)
}

fn parse_time(value: &str) -> Result<f64> {
    let mut seconds = 0.0;
    for part in value.trim().split(':') {
        let part: f64 = part
            .parse()
            .with_context(|| format!("'{}' is not a time", value))?;
        if part < 0.0 {
            bail!("'{}' is negative", value);
        }
        seconds = seconds * 60.0 + part;
    }
    Ok(seconds)
}

fn print_book_summary(book: &Audiobook) {
    println!("\n{}", style(&book.title).bold());
    if let Some(author) = &book.author {
        println!("  by {}", author);
    }
    println!(
        "  ID: {} | Position: {} / {} | Speed: {:.2}x",
        truncate(&book.id.to_string(), 8),
        format_clock(book.position),
        format_clock(book.duration),
        book.playback_rate
    );
    if book.is_finished {
        print!("  {}", style("✓ Finished").green());
    } else if book.position > 0.0 {
        print!("  {:.0}% listened", book.progress() * 100.0);
    }
    println!();
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run_config(dir: &TempDir, args: &[&str]) -> Result<()> {
        let manager = ConfigManager::with_directory(dir.path().to_path_buf())?;
        let config = manager.load_with_env_overrides()?;
        let matches = crate::build_cli()
            .try_get_matches_from(["earshot", "config"].iter().chain(args))?;
        let (_, config_matches) = matches
            .subcommand()
            .ok_or_else(|| anyhow::anyhow!("no subcommand"))?;
        config_command(&manager, &config, config_matches)
    }

    #[test]
    fn test_config_init_then_set() {
        let dir = TempDir::new().unwrap();
        run_config(&dir, &["init"]).unwrap();
        assert!(dir.path().join("config.toml").exists());

        run_config(&dir, &["set", "player.skip_forward_secs", "45"]).unwrap();
        run_config(&dir, &["set", "app.log_level", "info"]).unwrap();

        let manager = ConfigManager::with_directory(dir.path().to_path_buf()).unwrap();
        let saved = manager.load().unwrap();
        assert_eq!(saved.player.skip_forward_secs, 45);
        assert_eq!(saved.app.log_level, earshot_config::LogLevel::Info);
        run_config(&dir, &["validate"]).unwrap();
    }

    #[test]
    fn test_config_set_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        assert!(run_config(&dir, &["set", "player.volume", "50"]).is_err());
        assert!(run_config(&dir, &["set", "player.default_volume", "500"]).is_err());
        assert!(!dir.path().join("config.toml").exists());
    }

    #[test]
    fn test_config_reset_restores_defaults() {
        let dir = TempDir::new().unwrap();
        run_config(&dir, &["set", "player.default_volume", "20"]).unwrap();

        run_config(&dir, &["reset"]).unwrap();

        let manager = ConfigManager::with_directory(dir.path().to_path_buf()).unwrap();
        assert_eq!(manager.load().unwrap(), Config::default());
        assert!(dir.path().join("config.toml.backup").exists());
    }

    #[test]
    fn test_config_validate_fails_on_hand_edited_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[player]
speed_step = 2.0
").unwrap();

        let err = run_config(&dir, &["validate"]).unwrap_err();
        assert!(err.to_string().contains("1 invalid setting"));
    }

    #[test]
    fn test_config_read_only_actions() {
        let dir = TempDir::new().unwrap();
        run_config(&dir, &["path"]).unwrap();
        run_config(&dir, &["show"]).unwrap();
        assert!(!dir.path().join("config.toml").exists());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("90").unwrap(), 90.0);
        assert_eq!(parse_time("1:30").unwrap(), 90.0);
        assert_eq!(parse_time("1:00:05").unwrap(), 3605.0);
        assert!(parse_time("abc").is_err());
        assert!(parse_time("-5").is_err());
    }

    #[test]
    fn test_parse_chapters_fills_durations() {
        let chapters = parse_chapters(&["30:00=Part Two", "0=Part One"], 3600.0).unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Part One");
        assert_eq!(chapters[0].duration_seconds, 1800.0);
        assert_eq!(chapters[1].start_time, 1800.0);
        assert_eq!(chapters[1].end_time(), 3600.0);
    }

    #[test]
    fn test_parse_chapters_rejects_bad_input() {
        assert!(parse_chapters(&["no separator"], 3600.0).is_err());
        assert!(parse_chapters(&["4000=Too Late"], 3600.0).is_err());
        assert!(parse_chapters(&["10=A", "10=B"], 3600.0).is_err());
    }

    #[test]
    fn test_no_chapters() {
        assert!(parse_chapters(&[], 100.0).unwrap().is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("12345678", 8), "12345678");
        assert_eq!(truncate("123456789", 8), "12345678...");
    }
}
