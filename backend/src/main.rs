//! Passboard CLI - reshape inspection spreadsheets into long JSON records
//!
//! # Main Commands
//!
//! ```bash
//! passboard serve                          # Start HTTP server (port 3000)
//! passboard tidy lob.csv                   # Compound-label table → long records
//! passboard extract outlets_by_region.csv  # Staggered blocks → outlet rows
//! passboard view --dataset lob             # Dashboard view model as JSON
//! passboard layout list                    # Manage stored block layouts
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! passboard parse input.csv                # Just parse CSV to JSON
//! passboard melt input.csv --entity Region # Plain wide → long
//! passboard detect-layout input.csv        # Show detected block layout
//! passboard datasets                       # List built-in datasets
//! ```
//!
//! JSON goes to stdout (or `--output`); progress goes to stderr.

use clap::{Parser, Subcommand};
use passboard::api::logs::LOG_BROADCASTER;
use passboard::{
    detect_layout, embed_blocks, extract_csv, parse_file_auto, parse_grid_file_auto, render,
    reshape_csv, shared_state, Config, Dataset, LayoutRegistry, LayoutSource, ReshapeOptions,
    ViewFilters, DEFAULT_BLOCK_WIDTH,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "passboard")]
#[command(about = "Tidy reshaping and block extraction for pass/fail inspection data", long_about = None)]
struct Cli {
    /// Do not echo progress logs to stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Layout registry directory (overrides PASSBOARD_LAYOUT_DIR)
    #[arg(long, global = true)]
    layout_dir: Option<PathBuf>,

    /// Directory overriding the built-in datasets (overrides PASSBOARD_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV file and output it as JSON columns
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Keep the raw cell grid (no header row)
        #[arg(long)]
        grid: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Melt a wide table into (entity, dimension, count) records
    Melt {
        /// Input CSV file
        input: PathBuf,

        /// Entity column (default: first column)
        #[arg(short, long)]
        entity: Option<String>,

        /// Columns to melt, comma separated (default: all others)
        #[arg(short, long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Drop zero, missing and non-numeric counts
        #[arg(long)]
        drop_zero: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Melt a compound-label table and split labels into product and status
    Tidy {
        /// Input CSV file
        input: PathBuf,

        /// Compound-label column
        #[arg(short, long, default_value = "Result")]
        entity: String,

        /// Keep aggregate Total columns
        #[arg(long)]
        keep_total: bool,

        /// Drop zero, missing and non-numeric counts
        #[arg(long)]
        drop_zero: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract staggered outlet blocks
    Extract {
        /// Input CSV file
        input: PathBuf,

        /// Layout JSON file (default: detect from "<Name> Region" headers)
        #[arg(short, long)]
        layout: Option<PathBuf>,

        /// Stored layout id
        #[arg(long, conflicts_with = "layout")]
        layout_id: Option<String>,

        /// Use the built-in six-region outlet layout
        #[arg(long, conflicts_with_all = ["layout", "layout_id"])]
        default_layout: bool,

        /// Block width used for detection
        #[arg(long, default_value_t = DEFAULT_BLOCK_WIDTH)]
        block_width: usize,

        /// Also write the rows back out as a staggered CSV
        #[arg(long)]
        embed: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Detect the block layout of a staggered CSV
    DetectLayout {
        /// Input CSV file
        input: PathBuf,

        #[arg(long, default_value_t = DEFAULT_BLOCK_WIDTH)]
        block_width: usize,

        /// Save the detected layout to the registry under this name
        #[arg(long)]
        save: Option<String>,
    },

    /// Render a dashboard view model
    View {
        /// Dataset id or title
        #[arg(short, long, default_value = "regional")]
        dataset: String,

        /// Only show this region
        #[arg(short, long)]
        region: Option<String>,

        /// Leave zero counts out of the chart
        #[arg(long)]
        drop_zero: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the built-in datasets
    Datasets,

    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides PASSBOARD_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage stored block layouts
    Layout {
        #[command(subcommand)]
        action: LayoutAction,
    },
}

#[derive(Subcommand)]
enum LayoutAction {
    /// List all stored layouts
    List,

    /// Import a layout JSON file
    Import {
        file: PathBuf,
        /// Name for the layout
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show details of a layout
    Show { id: String },

    /// Delete a layout
    Delete { id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    LOG_BROADCASTER.set_echo(!cli.quiet);

    let mut config = Config::from_env();
    if let Some(dir) = cli.layout_dir {
        config.layout_dir = dir;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    let result = match cli.command {
        Commands::Parse { input, grid, output } => cmd_parse(&input, grid, output.as_deref()),

        Commands::Melt {
            input,
            entity,
            columns,
            drop_zero,
            output,
        } => {
            let options = ReshapeOptions {
                entity_column: entity,
                value_columns: columns,
                drop_zero,
                ..ReshapeOptions::default()
            };
            cmd_reshape(&input, &options, output.as_deref())
        }

        Commands::Tidy {
            input,
            entity,
            keep_total,
            drop_zero,
            output,
        } => {
            let options = ReshapeOptions {
                entity_column: Some(entity),
                keep_total,
                drop_zero,
                ..ReshapeOptions::compound()
            };
            cmd_reshape(&input, &options, output.as_deref())
        }

        Commands::Extract {
            input,
            layout,
            layout_id,
            default_layout,
            block_width,
            embed,
            output,
        } => {
            let source = LayoutChoice {
                file: layout,
                id: layout_id,
                builtin: default_layout,
                block_width,
            };
            cmd_extract(&config, &input, source, embed.as_deref(), output.as_deref())
        }

        Commands::DetectLayout {
            input,
            block_width,
            save,
        } => cmd_detect_layout(&config, &input, block_width, save.as_deref()),

        Commands::View {
            dataset,
            region,
            drop_zero,
            output,
        } => cmd_view(&config, &dataset, region, drop_zero, output.as_deref()),

        Commands::Datasets => cmd_datasets(),

        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            passboard::server::start_server(&config).await
        }

        Commands::Layout { action } => cmd_layout(&config, action),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(input: &Path, grid: bool, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let json = if grid {
        let result = parse_grid_file_auto(input)?;
        eprintln!("   Encoding: {}", result.encoding);
        eprintln!("   Delimiter: '{}'", passboard::pipeline::format_delimiter(result.delimiter));
        eprintln!("✅ Parsed {} rows x {} columns", result.grid.row_count(), result.grid.width());
        serde_json::to_string_pretty(result.grid.rows())?
    } else {
        let result = parse_file_auto(input)?;
        eprintln!("   Encoding: {}", result.encoding);
        eprintln!("   Delimiter: '{}'", passboard::pipeline::format_delimiter(result.delimiter));
        eprintln!("   Columns: {}", result.headers().join(", "));
        eprintln!("✅ Parsed {} rows", result.table.len());
        serde_json::to_string_pretty(&result.table.to_frame())?
    };

    write_output(&json, output)
}

fn cmd_reshape(input: &Path, options: &ReshapeOptions, output: Option<&Path>) -> CliResult {
    let result = reshape_csv(input, options)?;

    eprintln!(
        "\n📊 {} records, pass rate {}",
        result.records.len(),
        result.kpis.pass_rate_display()
    );

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)
}

/// Where `extract` gets its layout from.
struct LayoutChoice {
    file: Option<PathBuf>,
    id: Option<String>,
    builtin: bool,
    block_width: usize,
}

fn cmd_extract(
    config: &Config,
    input: &Path,
    choice: LayoutChoice,
    embed: Option<&Path>,
    output: Option<&Path>,
) -> CliResult {
    let mut registry = LayoutRegistry::with_dir(&config.layout_dir);

    let source = if let Some(path) = &choice.file {
        let value: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        LayoutSource::Fixed {
            layout: passboard::validation::parse_layout(&value)?,
        }
    } else if let Some(id) = &choice.id {
        let stored = registry.get(id)?;
        eprintln!("📐 Using layout: {} ({})", stored.name, stored.id);
        LayoutSource::Fixed {
            layout: stored.layout.clone(),
        }
    } else if choice.builtin {
        LayoutSource::Fixed {
            layout: passboard::StaggeredBlockLayout::default_outlets(),
        }
    } else {
        LayoutSource::Detect {
            block_width: choice.block_width,
        }
    };

    let result = extract_csv(input, &source)?;
    if let Some(id) = &choice.id {
        registry.record_use(id)?;
    }

    eprintln!(
        "\n📊 {} outlets, pass rate {}",
        result.records.len(),
        result.kpis.pass_rate_display()
    );

    if let Some(path) = embed {
        let grid = embed_blocks(&result.records, &result.layout)?;
        fs::write(path, grid.to_csv()?)?;
        eprintln!("💾 Staggered copy written to: {}", path.display());
    }

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)
}

fn cmd_detect_layout(
    config: &Config,
    input: &Path,
    block_width: usize,
    save: Option<&str>,
) -> CliResult {
    let parsed = parse_grid_file_auto(input)?;
    let layout = detect_layout(&parsed.grid, block_width);

    if layout.blocks.is_empty() {
        return Err("No '<Name> Region' headers found".into());
    }

    eprintln!("🔍 Detected {} blocks:", layout.blocks.len());
    for block in &layout.blocks {
        eprintln!("   [col {:2}] {}", block.offset, block.label);
    }

    let mut registry = LayoutRegistry::with_dir(&config.layout_dir);
    for (stored, score) in registry.find_compatible(&parsed.grid) {
        eprintln!("   ♻️  Matches stored layout {} ({:.0}%)", stored.id, score * 100.0);
    }

    if let Some(name) = save {
        let id = registry.save(layout.clone(), name)?;
        eprintln!("✅ Layout saved with ID: {}", id);
    }

    println!("{}", serde_json::to_string_pretty(&layout)?);
    Ok(())
}

fn cmd_view(
    config: &Config,
    dataset: &str,
    region: Option<String>,
    drop_zero: bool,
    output: Option<&Path>,
) -> CliResult {
    let filters = ViewFilters {
        dataset: dataset.parse::<Dataset>()?,
        region,
        drop_zero,
    };

    let state = shared_state(config.data_dir.as_deref())?;
    let model = render(&state, &filters)?;

    eprintln!("📊 {}", model.title);
    for card in &model.kpi_cards {
        eprintln!("   {:<13} {}", card.label, card.value);
    }
    if let Some(placeholder) = &model.placeholder {
        eprintln!("   ⚠️  {}", placeholder);
    }

    let json = serde_json::to_string_pretty(&model)?;
    write_output(&json, output)
}

fn cmd_datasets() -> CliResult {
    for dataset in Dataset::ALL {
        println!("{:<18} {}", dataset.slug(), dataset.title());
    }
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

fn cmd_layout(config: &Config, action: LayoutAction) -> CliResult {
    let mut registry = LayoutRegistry::with_dir(&config.layout_dir);

    match action {
        LayoutAction::List => {
            let layouts = registry.list();
            if layouts.is_empty() {
                eprintln!("📋 No layouts stored yet.");
                eprintln!("   Use 'passboard layout import <file>' or 'detect-layout --save <name>'.");
                return Ok(());
            }

            eprintln!("📋 Stored layouts ({}):\n", layouts.len());
            for stored in layouts {
                println!("  📐 {} ({})", stored.name, stored.id);
                println!("     Blocks: {}", stored.layout.labels().join(", "));
                println!("     Uses: {}", stored.use_count);
                if let Some(last) = stored.last_used {
                    println!("     Last used: {}", last.to_rfc3339());
                }
                println!();
            }
        }

        LayoutAction::Import { file, name } => {
            eprintln!("📥 Importing layout from: {}", file.display());
            let id = registry.import(&file, name.as_deref())?;
            eprintln!("✅ Layout saved with ID: {}", id);
        }

        LayoutAction::Show { id } => {
            let stored = registry.get(&id)?;
            println!("{}", serde_json::to_string_pretty(stored)?);
        }

        LayoutAction::Delete { id } => {
            registry.delete(&id)?;
            eprintln!("🗑️  Layout deleted: {}", id);
        }
    }

    Ok(())
}
