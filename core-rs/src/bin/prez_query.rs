//! prez-query - print (and optionally run) the SPARQL Prez would send
//!
//! Loads profile definitions, synthesizes the query for one request shape
//! and writes it to stdout. With `--execute <prez>` the query is sent to the
//! store configured for that Prez and the result is printed instead.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use oxigraph::model::NamedNode;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

use prez_core::engine::parse_iris;
use prez_core::{
    BoundingBox, CacheCapacities, EngineSettings, ItemDescriptor, OxigraphProfileGraph, Pagination, PrezConfig,
    QueryEngine, QueryResponse, RemoteSparqlStore, SparqlQuery, StoreRegistry,
};

#[derive(Parser)]
#[command(name = "prez-query")]
#[command(version)]
#[command(about = "Synthesize Prez SPARQL queries from profile definitions", long_about = None)]
struct Cli {
    /// Prez configuration file (YAML)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,
    /// Profile Turtle files, in addition to those in the config
    #[arg(long = "profiles", short = 'p', global = true)]
    profiles: Vec<PathBuf>,
    /// Send the query to the store configured for this Prez (e.g. VocPrez)
    #[arg(long, global = true)]
    execute: Option<String>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// CONSTRUCT for a single item
    Item {
        #[command(flatten)]
        item: ItemArgs,
        /// Profile IRI
        #[arg(long)]
        profile: String,
    },
    /// CONSTRUCT for a listing page
    Listing {
        #[command(flatten)]
        item: ItemArgs,
        #[arg(long)]
        profile: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Member count of a listing
    Count {
        #[command(flatten)]
        item: ItemArgs,
    },
    /// Full-text search
    Search {
        term: String,
        #[arg(long, default_value_t = 20)]
        limit: u64,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Profile and mediatype selection
    Negotiate {
        /// Candidate class IRIs of the resource
        #[arg(long = "class", required = true)]
        classes: Vec<String>,
        /// Requested profile IRI
        #[arg(long)]
        profile: Option<String>,
        /// Requested mediatype, optionally weighted: `text/turtle;q=0.9`
        #[arg(long = "mediatype")]
        mediatypes: Vec<String>,
    },
    /// Features of a collection within a bounding box
    Bbox {
        #[command(flatten)]
        item: ItemArgs,
        /// minx,miny,maxx,maxy
        #[arg(long, allow_hyphen_values = true)]
        bbox: String,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Args)]
struct ItemArgs {
    /// Selected class IRI
    #[arg(long)]
    class: String,
    /// General class IRI (defaults to the selected class)
    #[arg(long)]
    general_class: Option<String>,
    #[arg(long)]
    uri: Option<String>,
    /// dcterms:identifier token
    #[arg(long)]
    id: Option<String>,
    /// Path prefix for generated links
    #[arg(long, default_value = "")]
    link: String,
}

impl ItemArgs {
    fn descriptor(&self) -> anyhow::Result<ItemDescriptor> {
        let selected = NamedNode::new(self.class.as_str()).context("invalid --class")?;
        let general = match &self.general_class {
            Some(general) => NamedNode::new(general.as_str()).context("invalid --general-class")?,
            None => selected.clone(),
        };
        let mut builder = ItemDescriptor::builder(selected, general).link_constructor(self.link.clone());
        if let Some(uri) = &self.uri {
            builder = builder.uri(NamedNode::new(uri.as_str()).context("invalid --uri")?);
        }
        if let Some(id) = &self.id {
            builder = builder.id(id.clone());
        }
        Ok(builder.build())
    }
}

#[derive(Args)]
struct PageArgs {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    per_page: Option<u32>,
}

impl PageArgs {
    fn pagination(&self) -> anyhow::Result<Pagination> {
        Ok(Pagination::new(self.page, self.per_page)?)
    }
}

/// `type;q=weight`, weight defaulting to 1
fn parse_mediatype(value: &str) -> anyhow::Result<(f64, String)> {
    let mut parts = value.split(';').map(str::trim);
    let mediatype = parts.next().unwrap_or_default().to_string();
    if mediatype.is_empty() {
        bail!("empty mediatype");
    }
    let mut weight = 1.0;
    for param in parts {
        if let Some(q) = param.strip_prefix("q=") {
            weight = q.parse().with_context(|| format!("invalid weight in {}", value))?;
        }
    }
    Ok((weight, mediatype))
}

fn build_engine(cli: &Cli) -> anyhow::Result<(QueryEngine, PrezConfig)> {
    let mut config = match &cli.config {
        Some(path) => PrezConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => PrezConfig::default(),
    };
    config.apply_env()?;
    config.profiles.extend(cli.profiles.iter().cloned());

    let graph = OxigraphProfileGraph::from_paths(config.profiles.as_slice())?;
    let engine = QueryEngine::new(
        Arc::new(graph),
        EngineSettings::from_config(&config)?,
        CacheCapacities::from(config.cache),
    );
    Ok((engine, config))
}

fn synthesize(engine: &QueryEngine, command: &Commands) -> anyhow::Result<SparqlQuery> {
    let query = match command {
        Commands::Item { item, profile } => {
            engine.item_construct(&item.descriptor()?, &NamedNode::new(profile.as_str())?)?
        }
        Commands::Listing { item, profile, page } => engine.listing_construct(
            &item.descriptor()?,
            &NamedNode::new(profile.as_str())?,
            &page.pagination()?,
        )?,
        Commands::Count { item } => engine.listing_count(&item.descriptor()?),
        Commands::Search { term, limit, offset } => engine.search(term, *limit, *offset)?,
        Commands::Negotiate {
            classes,
            profile,
            mediatypes,
        } => {
            let classes = parse_iris(classes)?;
            let profile = profile.as_deref().map(NamedNode::new).transpose()?;
            let mediatypes = mediatypes
                .iter()
                .map(|m| parse_mediatype(m))
                .collect::<anyhow::Result<Vec<_>>>()?;
            engine.profile_mediatype(&classes, profile.as_ref(), &mediatypes)?
        }
        Commands::Bbox { item, bbox, page } => {
            engine.bbox(&item.descriptor()?, &BoundingBox::parse(bbox)?, &page.pagination()?)?
        }
    };
    Ok(query)
}

async fn execute(engine: &QueryEngine, config: &PrezConfig, target: &str, query: &SparqlQuery) -> anyhow::Result<()> {
    let mut registry = StoreRegistry::new();
    for (name, store) in &config.stores {
        registry.register(name.clone(), RemoteSparqlStore::new(store.remote())?);
    }
    let store = registry.get(target)?;
    match engine.fetch(store, query).await? {
        None => println!("(nothing to retrieve)"),
        Some(QueryResponse::Rows(rows)) => println!("{}", serde_json::to_string_pretty(&rows)?),
        Some(QueryResponse::Graph(graph)) => print!("{}", graph),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let (engine, config) = build_engine(&cli)?;
    let query = synthesize(&engine, &cli.command)?;

    match &cli.execute {
        Some(target) => execute(&engine, &config, target, &query).await?,
        None if query.is_empty() => eprintln!("(empty query: nothing to retrieve)"),
        None => print!("{}", query),
    }
    Ok(())
}
