use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use pubregistry::handlers::insert_draft;
use pubregistry::importers::{self, Datasource, PubmedClient};
use pubregistry::{db, Config, PublicationParams};

#[derive(Parser, Debug)]
#[command(name = "import_publication")]
#[command(about = "Import publication metadata from an external source as draft publications")]
struct Args {
    /// Source to import from (currently only 'pubmed')
    #[arg(short, long, default_value = "pubmed")]
    datasource: String,

    /// Record ids in the source, e.g. PubMed ids
    #[arg(required = true)]
    sourceids: Vec<String>,

    /// Publication type to set instead of the source's default
    #[arg(long)]
    publication_type: Option<String>,

    /// Dry run - print the imported data, don't write to the database
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::from_env().context("Failed to read configuration")?;

    let datasource: Datasource = args
        .datasource
        .parse()
        .context("Unsupported datasource")?;
    let pubmed = PubmedClient::new(config.pubmed_base_url.clone());

    let pool = if args.dry_run {
        None
    } else {
        let pool = db::connect(&config)
            .await
            .context("Failed to connect to database")?;
        db::migrate(&pool).await.context("Failed to run migrations")?;
        info!("Connected to database");
        Some(pool)
    };

    let mut imported_count = 0;
    for sourceid in &args.sourceids {
        let imported = importers::fetch(&pubmed, datasource, sourceid)
            .await
            .with_context(|| format!("Failed to import {} {}", datasource, sourceid))?;

        let Some(pool) = &pool else {
            println!("{}", serde_json::to_string_pretty(&imported)?);
            continue;
        };

        let overrides = PublicationParams {
            publication_type: args.publication_type.clone(),
            ..Default::default()
        };
        let draft = insert_draft(pool, overrides.or(imported.into()))
            .await
            .with_context(|| format!("Failed to store {} {}", datasource, sourceid))?;

        info!(
            "Stored {} {} as draft publication {}",
            datasource, sourceid, draft.publication.pubid
        );
        imported_count += 1;
    }

    if !args.dry_run {
        info!("Imported {} publication(s)", imported_count);
    }

    Ok(())
}
