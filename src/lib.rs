pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod image;
pub mod import;
pub mod io_utils;
pub mod merge;
pub mod recommend;
pub mod reconcile;
pub mod record;
pub mod store;
pub mod table;
pub mod varietal;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use serde::Serialize;

use crate::{
    catalog::{Catalog, WineChanges, WineDraft},
    cli::{Cli, Commands},
    config::Config,
    error::CatalogError,
    image::{HttpImageFetcher, ImageSource},
    import::ImportOptions,
    recommend::{FilterOptions, WineFilter},
    record::{Location, Photo},
    store::{DefaultStore, open_default_store},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("vinoteca", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

/// Everything one invocation needs; built fresh for every command.
struct Session {
    config: Config,
    catalog: Catalog<DefaultStore>,
}

impl Session {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = Config::load(cli.config.as_deref())?;
        if let Some(path) = &cli.catalog {
            config.catalog = path.clone();
        }
        debug!("Using catalog {:?}", config.catalog);
        let catalog = Catalog::new(open_default_store(&config));
        Ok(Self { config, catalog })
    }

    fn fetcher(&self) -> Result<HttpImageFetcher> {
        HttpImageFetcher::new(self.config.image_timeout())
    }
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let ctx = Session::new(&cli)?;
    match cli.command {
        Commands::List(args) => print_wines(&ctx.catalog.active()?, args.json),
        Commands::History(args) => print_wines(&ctx.catalog.history()?, args.json),
        Commands::Show(args) => handle_show(&ctx, args.id),
        Commands::Add(args) => handle_add(&ctx, args),
        Commands::Update(args) => handle_update(&ctx, args),
        Commands::Consume(args) => report_missing(ctx.catalog.consume(args.id), |wine| {
            println!("#{} {} marked as consumed", wine.id, wine.name)
        }),
        Commands::Restore(args) => report_missing(ctx.catalog.restore(args.id), |wine| {
            println!("#{} {} is back in '{}'", wine.id, wine.name, wine.location)
        }),
        Commands::Delete(args) => report_missing(ctx.catalog.delete(args.id), |wine| {
            println!("#{} {} deleted", wine.id, wine.name)
        }),
        Commands::PurgeUnclassified(args) => handle_purge(&ctx, &args),
        Commands::Import(args) => handle_import(&ctx, &args),
        Commands::Recommend(args) => handle_recommend(&ctx, args),
        Commands::Options(args) => {
            let options = FilterOptions::from_wines(&ctx.catalog.list_all()?);
            if args.json {
                print_json(&options)
            } else {
                print!("{}", table::render_options(&options));
                Ok(())
            }
        }
        Commands::Grapes => {
            for grape in ctx.catalog.grape_vocabulary()? {
                println!("{grape}");
            }
            Ok(())
        }
        Commands::Locations => {
            for location in Location::ALL {
                println!("{location}");
            }
            Ok(())
        }
        Commands::AttachImage(args) => handle_attach_image(&ctx, &args),
    }
}

fn print_wines(wines: &[record::Wine], json: bool) -> Result<()> {
    if json {
        return print_json(wines);
    }
    if wines.is_empty() {
        println!("No wines to show.");
    } else {
        print!("{}", table::render_wines(wines));
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Rendering JSON")?;
    println!("{rendered}");
    Ok(())
}

/// An unknown id is reported and the command still succeeds.
fn report_missing<T, F>(outcome: Result<T, CatalogError>, on_success: F) -> Result<()>
where
    F: FnOnce(T),
{
    match outcome {
        Ok(value) => {
            on_success(value);
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            warn!("{err}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn handle_show(ctx: &Session, id: u64) -> Result<()> {
    report_missing(ctx.catalog.get(id), |wine| {
        print!("{}", table::render_wine_detail(&wine))
    })
}

fn image_source(args: &cli::ImageArgs) -> Option<ImageSource> {
    match (&args.image_file, &args.image_url) {
        (Some(path), _) => Some(ImageSource::File(path.clone())),
        (None, Some(url)) => Some(ImageSource::Url(url.clone())),
        (None, None) => None,
    }
}

/// Fetches a photo for a record that is being saved anyway. A failure only
/// costs the photo.
fn best_effort_photo(ctx: &Session, source: Option<ImageSource>) -> Option<Photo> {
    let source = source?;
    let outcome = ctx
        .fetcher()
        .and_then(|fetcher| image::acquire(&source, &fetcher));
    match outcome {
        Ok(photo) => Some(photo),
        Err(err) => {
            warn!("Saving without a photo: {err:#}");
            None
        }
    }
}

fn handle_add(ctx: &Session, args: cli::AddArgs) -> Result<()> {
    let photo = best_effort_photo(ctx, image_source(&args.image));
    let draft = WineDraft {
        name: args.name,
        winery: args.winery,
        winemaker: args.winemaker,
        vintage_year: args.vintage,
        primary_grape: args.grape,
        blend_components: args.blend_components,
        quality_tier: args.quality_tier,
        origin: args.origin,
        technical_detail: args.technical_detail,
        personal_note: args.personal_note,
        location: args.location,
        drink_by_year: args.drink_by,
        rating: args.rating,
        photo,
    };
    let wine = ctx.catalog.add(draft)?;
    println!("Saved #{} {} ({})", wine.id, wine.name, wine.winery);
    Ok(())
}

fn handle_update(ctx: &Session, args: cli::UpdateArgs) -> Result<()> {
    let photo = if args.remove_image {
        Some(None)
    } else {
        best_effort_photo(ctx, image_source(&args.image)).map(Some)
    };
    let changes = WineChanges {
        name: args.name,
        winery: args.winery,
        winemaker: args.winemaker,
        vintage_year: args.vintage,
        primary_grape: args.grape,
        blend_components: (!args.blend_components.is_empty()).then_some(args.blend_components),
        quality_tier: args.quality_tier,
        origin: args.origin,
        technical_detail: args.technical_detail,
        personal_note: args.personal_note,
        location: args.location,
        drink_by_year: args.drink_by,
        rating: args.rating,
        photo,
    };
    if changes.is_empty() {
        bail!("Nothing to update; pass at least one field to change");
    }
    report_missing(ctx.catalog.update(args.id, changes), |wine| {
        println!("Updated #{} {}", wine.id, wine.name)
    })
}

fn handle_purge(ctx: &Session, args: &cli::PurgeArgs) -> Result<()> {
    if !args.yes {
        bail!(
            "Refusing to delete every wine in '{}' without --yes",
            Location::Unclassified
        );
    }
    let removed = ctx.catalog.purge_unclassified()?;
    println!("Deleted {removed} unclassified wine(s)");
    Ok(())
}

fn handle_import(ctx: &Session, args: &cli::ImportArgs) -> Result<()> {
    let options = ImportOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        dry_run: args.dry_run,
    };
    info!("Importing {:?}", args.input);
    let report = ctx
        .catalog
        .import(&args.input, &options, |done, total| {
            if done == total || done % 100 == 0 {
                info!("Processed {done}/{total} row(s)");
            }
        })
        .with_context(|| format!("Importing {:?}", args.input))?;

    for field in &report.unmatched_fields {
        debug!("No column found for {field:?}");
    }
    if report.added.is_empty() {
        println!("Nothing to import from {:?}", report.source);
        return Ok(());
    }
    if report.persisted {
        if let Some((first, last)) = report.id_range() {
            println!(
                "Imported {} wine(s) as #{first}..#{last}; the catalog holds {}",
                report.added.len(),
                report.catalog_size
            );
        }
    } else {
        println!("Dry run, nothing saved. These wines would be added:");
        print!("{}", table::render_wines(&report.added));
    }
    Ok(())
}

fn handle_recommend(ctx: &Session, args: cli::RecommendArgs) -> Result<()> {
    let filter = WineFilter {
        expiring_only: args.expiring,
        grapes: args.grapes,
        wineries: args.wineries,
        vintages: args.vintages,
        origins: args.origins,
        quality_tiers: args.quality_tiers,
        winemakers: args.winemakers,
    };
    let wines = ctx.catalog.list_all()?;
    let year = recommend::current_year();
    if args.all {
        let matches = filter.apply(&wines, year);
        return if args.json {
            print_json(&matches)
        } else {
            let owned = matches.into_iter().cloned().collect::<Vec<_>>();
            print_wines(&owned, false)
        };
    }
    match recommend::recommend(&wines, &filter, year, &mut rand::thread_rng()) {
        Some(wine) if args.json => print_json(wine),
        Some(wine) => {
            print!("{}", table::render_wine_detail(wine));
            Ok(())
        }
        None => {
            println!("No wine matches those filters.");
            Ok(())
        }
    }
}

fn handle_attach_image(ctx: &Session, args: &cli::AttachImageArgs) -> Result<()> {
    let source = match (&args.file, &args.url) {
        (Some(path), _) => ImageSource::File(path.clone()),
        (None, Some(url)) => ImageSource::Url(url.clone()),
        (None, None) => bail!("Pass --file or --url"),
    };
    let photo = image::acquire(&source, &ctx.fetcher()?)?;
    let changes = WineChanges {
        photo: Some(Some(photo)),
        ..WineChanges::default()
    };
    report_missing(ctx.catalog.update(args.id, changes), |wine| {
        println!("Attached a photo to #{} {}", wine.id, wine.name)
    })
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
