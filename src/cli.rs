use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::record::Location;

#[derive(Debug, Parser)]
#[command(author, version, about = "Keep track of the bottles in a home wine cellar", long_about = None)]
pub struct Cli {
    /// YAML configuration file (defaults to ./vinoteca.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Catalog file, overriding the configured one
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the wines still in the cellar
    List(ListArgs),
    /// List the wines that have been drunk
    History(ListArgs),
    /// Show every field of one wine
    Show(IdArgs),
    /// Register a new bottle
    Add(AddArgs),
    /// Change fields of an existing bottle
    Update(UpdateArgs),
    /// Mark a bottle as drunk
    Consume(IdArgs),
    /// Bring a consumed bottle back to the cellar as unclassified
    Restore(IdArgs),
    /// Remove a bottle from the catalog
    Delete(IdArgs),
    /// Remove every bottle still waiting to be placed
    PurgeUnclassified(PurgeArgs),
    /// Append the rows of a CSV/TSV or spreadsheet file as new bottles
    Import(ImportArgs),
    /// Pick a random bottle matching the given filters
    Recommend(RecommendArgs),
    /// Show the values available for each recommendation filter
    Options(ListArgs),
    /// List the known grape varieties
    Grapes,
    /// List the storage locations
    Locations,
    /// Attach a photo to a bottle from a local file or a URL
    AttachImage(AttachImageArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    /// Catalog id of the bottle
    #[arg(long)]
    pub id: u64,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub winery: String,
    #[arg(long, default_value = "")]
    pub winemaker: String,
    #[arg(long, default_value_t = 2023, value_parser = clap::value_parser!(i32).range(1900..=2100))]
    pub vintage: i32,
    /// Primary grape; use "Blend" together with --blend-component
    #[arg(long, default_value = "Malbec")]
    pub grape: String,
    /// Component grape of a blend (repeatable)
    #[arg(long = "blend-component", action = clap::ArgAction::Append)]
    pub blend_components: Vec<String>,
    #[arg(long = "quality", default_value = "")]
    pub quality_tier: String,
    #[arg(long, default_value = "")]
    pub origin: String,
    /// Technical sheet text
    #[arg(long = "detail", default_value = "")]
    pub technical_detail: String,
    /// Personal tasting note
    #[arg(long = "note", default_value = "")]
    pub personal_note: String,
    #[arg(long, default_value = "Cava Eléctrica", value_parser = parse_location)]
    pub location: Location,
    /// Last year the bottle should be opened by
    #[arg(long = "drink-by", default_value_t = 2030, value_parser = clap::value_parser!(i32).range(1900..=2100))]
    pub drink_by: i32,
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub rating: u8,
    #[command(flatten)]
    pub image: ImageArgs,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Catalog id of the bottle
    #[arg(long)]
    pub id: u64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub winery: Option<String>,
    #[arg(long)]
    pub winemaker: Option<String>,
    #[arg(long, value_parser = clap::value_parser!(i32).range(1900..=2100))]
    pub vintage: Option<i32>,
    #[arg(long)]
    pub grape: Option<String>,
    /// Replaces the blend components (repeatable)
    #[arg(long = "blend-component", action = clap::ArgAction::Append)]
    pub blend_components: Vec<String>,
    #[arg(long = "quality")]
    pub quality_tier: Option<String>,
    #[arg(long)]
    pub origin: Option<String>,
    #[arg(long = "detail")]
    pub technical_detail: Option<String>,
    #[arg(long = "note")]
    pub personal_note: Option<String>,
    #[arg(long, value_parser = parse_location)]
    pub location: Option<Location>,
    #[arg(long = "drink-by", value_parser = clap::value_parser!(i32).range(1900..=2100))]
    pub drink_by: Option<i32>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub rating: Option<u8>,
    /// Drop the stored photo
    #[arg(long = "remove-image", conflicts_with_all = ["image_file", "image_url"])]
    pub remove_image: bool,
    #[command(flatten)]
    pub image: ImageArgs,
}

#[derive(Debug, Args)]
pub struct ImageArgs {
    /// Photo of the label from a local file
    #[arg(long = "image-file", conflicts_with = "image_url")]
    pub image_file: Option<PathBuf>,
    /// Photo of the label downloaded from a URL
    #[arg(long = "image-url")]
    pub image_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct PurgeArgs {
    /// Confirm the bulk delete
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// CSV, TSV or spreadsheet file to import
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Show what would be imported without saving
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    /// Only bottles whose drink-by year has been reached
    #[arg(long)]
    pub expiring: bool,
    #[arg(long = "grape", action = clap::ArgAction::Append)]
    pub grapes: Vec<String>,
    #[arg(long = "winery", action = clap::ArgAction::Append)]
    pub wineries: Vec<String>,
    #[arg(long = "vintage", action = clap::ArgAction::Append)]
    pub vintages: Vec<i32>,
    #[arg(long = "origin", action = clap::ArgAction::Append)]
    pub origins: Vec<String>,
    #[arg(long = "quality", action = clap::ArgAction::Append)]
    pub quality_tiers: Vec<String>,
    #[arg(long = "winemaker", action = clap::ArgAction::Append)]
    pub winemakers: Vec<String>,
    /// List every match instead of picking one
    #[arg(long)]
    pub all: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "url"])))]
pub struct AttachImageArgs {
    /// Catalog id of the bottle
    #[arg(long)]
    pub id: u64,
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[arg(long)]
    pub url: Option<String>,
}

pub fn parse_location(value: &str) -> Result<Location, String> {
    value.parse()
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
