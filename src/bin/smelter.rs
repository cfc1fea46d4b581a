//! smelter: map document collections onto PostgreSQL tables
//!
//! Usage:
//!   # Print the DDL for every mapped collection
//!   smelter --schema collections.yml ddl
//!
//!   # Create the tables in a live database, dropping existing ones
//!   smelter --schema collections.yml ddl --clobber --dsn "host=localhost user=postgres"
//!
//!   # Show the COPY rows for an NDJSON export
//!   smelter --schema collections.yml transform --ns blog.posts posts.jsonl
//!
//!   # Bulk load an export (stdin works too)
//!   mongoexport -d blog -c posts | smelter --schema collections.yml copy --ns blog.posts --dsn "..."

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smelter::{encode_row, load_ndjson, read_documents, PgSink, RowTransformer, ScriptSink, SchemaCatalog};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "smelter")]
#[command(about = "Transform document collections into PostgreSQL tables", long_about = None)]
#[command(version)]
struct Cli {
    /// Collection mapping file (YAML, or JSON with a .json extension)
    #[arg(short, long, default_value = "collections.yml")]
    schema: PathBuf,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create one table per mapped collection
    Ddl {
        /// Drop and recreate existing tables
        #[arg(long)]
        clobber: bool,

        /// PostgreSQL connection string; prints the DDL when omitted
        #[arg(long)]
        dsn: Option<String>,
    },

    /// Print the encoded COPY rows for NDJSON documents
    Transform {
        /// Source namespace, e.g. blog.posts
        #[arg(long)]
        ns: String,

        /// Input file (use stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Bulk load NDJSON documents
    Copy {
        /// Source namespace, e.g. blog.posts
        #[arg(long)]
        ns: String,

        /// PostgreSQL connection string; prints a psql script when omitted
        #[arg(long)]
        dsn: Option<String>,

        /// Input file (use stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.verbosity);

    let catalog = SchemaCatalog::load(&cli.schema)
        .with_context(|| format!("Failed to load schema from {}", cli.schema.display()))?;

    match cli.command {
        Commands::Ddl { clobber, dsn } => match dsn {
            Some(dsn) => {
                let mut sink = PgSink::connect(&dsn).context("Failed to connect to PostgreSQL")?;
                catalog.generate_ddl(&mut sink, clobber)?;
            }
            None => {
                let mut sink = ScriptSink::new(std::io::stdout().lock());
                catalog.generate_ddl(&mut sink, clobber)?;
                sink.flush()?;
            }
        },
        Commands::Transform { ns, input } => {
            let schema = catalog.lookup_strict(&ns)?;
            let transformer = RowTransformer::new(&catalog);
            let docs = read_documents(open_input(input.as_ref())?);

            let mut out = std::io::stdout().lock();
            for doc in docs {
                let doc = doc.context("Failed to read document")?;
                let row = transformer.transform_owned(&ns, doc, Some(schema))?;
                writeln!(out, "{}", encode_row(&row))?;
            }
            out.flush()?;
        }
        Commands::Copy { ns, dsn, input } => {
            let reader = open_input(input.as_ref())?;
            let rows = match dsn {
                Some(dsn) => {
                    let mut sink =
                        PgSink::connect(&dsn).context("Failed to connect to PostgreSQL")?;
                    load_ndjson(&catalog, &mut sink, &ns, reader)?
                }
                None => {
                    let mut sink = ScriptSink::new(std::io::stdout().lock());
                    let rows = load_ndjson(&catalog, &mut sink, &ns, reader)?;
                    sink.flush()?;
                    rows
                }
            };
            info!(namespace = %ns, table = catalog.table_name(&ns)?, rows, "Load complete");
        }
    }

    Ok(())
}

fn open_input(input: Option<&PathBuf>) -> Result<Box<dyn BufRead>> {
    Ok(match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    })
}

fn setup_logging(verbosity: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout stays a clean script/row stream
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
