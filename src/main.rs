//! stamp-certificates CLI

use std::path::PathBuf;

use anyhow::{Context, Result};
use certificate_stamper::{run_batch, stamp_single, StampConfig};
use clap::{Args, Parser, Subcommand};
use overlay_composer::FontRegistry;

#[derive(Parser)]
#[command(name = "stamp-certificates")]
#[command(version)]
#[command(about = "Stamp names onto PDF certificate templates", long_about = None)]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(short, long, value_name = "FILE", env = "STAMP_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Overrides {
    /// Directory containing PDF templates
    #[arg(long, value_name = "DIR", global = true)]
    templates: Option<PathBuf>,

    /// Names file, one name per line
    #[arg(long, value_name = "FILE", global = true)]
    names: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", global = true)]
    output: Option<PathBuf>,

    /// TrueType font file
    #[arg(long, value_name = "FILE", global = true)]
    font_path: Option<PathBuf>,

    /// Name the font is registered under
    #[arg(long, value_name = "NAME", global = true)]
    font_name: Option<String>,

    /// Font size of the stamped text
    #[arg(long, value_name = "N", global = true)]
    font_size: Option<f32>,

    /// Baseline of the stamped text, in points from the bottom
    #[arg(long, value_name = "N", global = true)]
    text_y: Option<f32>,

    /// Add the footer line
    #[arg(long, global = true)]
    footer: bool,

    /// Append the date to the footer
    #[arg(long, global = true)]
    footer_date_stamp: bool,

    /// Footer text
    #[arg(long, value_name = "TEXT", global = true)]
    footer_text: Option<String>,

    /// Footer date (YYYY.MM.DD); defaults to today
    #[arg(long, value_name = "DATE", global = true)]
    footer_date: Option<String>,

    /// Footer alignment: left, center, right or exact
    #[arg(long, value_name = "ALIGN", global = true)]
    footer_align: Option<String>,

    /// Footer x offset, used with exact alignment
    #[arg(long, value_name = "N", global = true)]
    footer_x: Option<f32>,

    /// Footer baseline, in points from the bottom
    #[arg(long, value_name = "N", global = true)]
    footer_y: Option<f32>,

    /// Footer font size
    #[arg(long, value_name = "N", global = true)]
    footer_font_size: Option<f32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp one text onto one template
    Single {
        /// Template PDF
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// Text to stamp
        #[arg(long)]
        text: String,

        /// Output file (named after template and text if not specified)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Print the effective configuration as JSON
    PrintConfig,
}

impl Overrides {
    fn apply(self, config: &mut StampConfig) {
        if let Some(dir) = self.templates {
            config.template_dir = dir;
        }
        if let Some(file) = self.names {
            config.names_file = file;
        }
        if let Some(dir) = self.output {
            config.output_dir = dir;
        }
        if let Some(path) = self.font_path {
            config.font_path = path;
        }
        if let Some(name) = self.font_name {
            config.font_name = name;
        }
        if let Some(size) = self.font_size {
            config.font_size = size;
        }
        if let Some(y) = self.text_y {
            config.text_vertical_position = y;
        }
        if self.footer {
            config.add_footer = true;
        }
        if self.footer_date_stamp {
            config.add_date_to_footer = true;
        }
        if let Some(text) = self.footer_text {
            config.footer_text = text;
        }
        if let Some(date) = self.footer_date {
            config.footer_date = Some(date);
        }
        if let Some(align) = self.footer_align {
            config.footer_horizontal_alignment = align;
        }
        if let Some(x) = self.footer_x {
            config.footer_horizontal_position_value = x;
        }
        if let Some(y) = self.footer_y {
            config.footer_vertical_position = y;
        }
        if let Some(size) = self.footer_font_size {
            config.footer_font_size = size;
        }
    }
}

fn load_config(path: Option<&PathBuf>, overrides: Overrides) -> Result<StampConfig> {
    let mut config = match path {
        Some(path) => StampConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => StampConfig::default(),
    };
    overrides.apply(&mut config);
    Ok(config)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref(), cli.overrides)?;
    let today = chrono::Local::now().date_naive();
    let mut registry = FontRegistry::new();

    match cli.command {
        Some(Commands::Single { template, text, out }) => {
            stamp_single(&config, &mut registry, &template, &text, out.as_deref(), today)
                .with_context(|| format!("Failed to stamp {} with {:?}", template.display(), text))?;
        }
        Some(Commands::PrintConfig) => {
            config.validate().context("Configuration is invalid")?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        None => {
            let report = run_batch(&config, &mut registry, today).context("Batch aborted")?;
            if !report.is_clean() {
                log::warn!("{} pairs were not generated", report.failures.len());
            }
        }
    }
    Ok(())
}
