// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use warming_atlas::{AnomalyAtlas, AtlasConfig};

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && args[1] == "report" {
        // Report mode
        let config = load_config(args.get(2).map(String::as_str))?;
        run_report(&config)?;
    } else {
        // Map mode (default)
        let config = load_config(args.get(1).map(String::as_str))?;
        run_ui_mode(&config)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warming_atlas=info"));

    // Logs go to stderr so they never mix with the report on stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&str>) -> Result<AtlasConfig> {
    match path {
        Some(path) => AtlasConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config: {}", path)),
        None => Ok(AtlasConfig::default()),
    }
}

fn load_atlas(config: &AtlasConfig) -> Result<AnomalyAtlas> {
    println!("📂 Loading datasets...");
    println!("   temperatures: {}", config.temperature_csv.display());
    println!("   boundaries:   {}", config.boundaries_geojson.display());
    config.load_atlas()
}

fn run_report(config: &AtlasConfig) -> Result<()> {
    println!("🌡️  Warming Atlas - Match Report");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let atlas = load_atlas(config)?;
    let report = atlas.report();

    println!("\n✓ {}", report.summary());
    println!("   baseline year: {} ({} entities)", atlas.baseline().year(), atlas.baseline().len());
    println!("   built at:      {}", report.built_at.to_rfc3339());

    if report.unmatched.is_empty() {
        println!("\n✅ Every boundary feature resolved to a temperature entity");
    } else {
        println!("\n⚠️  {} features will always render as no data:", report.unmatched.len());
        for feature in &report.unmatched {
            println!("   {:<8} {}", feature.id, feature.name);
        }
    }

    if !report.entities_without_feature.is_empty() {
        println!(
            "\nℹ️  {} entities have temperature data but no boundary:",
            report.entities_without_feature.len()
        );
        for entity in &report.entities_without_feature {
            println!("   {}", entity);
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AtlasConfig) -> Result<()> {
    println!("🖥️  Loading Warming Atlas...\n");

    let atlas = load_atlas(config)?;
    println!("✓ {}\n", atlas.report().summary());
    println!("Starting map... (Press 'q' to quit)\n");

    let mut app = ui::App::new(atlas, config)?;
    ui::run_ui(&mut app)?;

    println!("\n✅ Map closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AtlasConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin atlas-server --features server");
    std::process::exit(1);
}
