use clap::{Parser, Subcommand};
use derive_more::{Display, Error};
use exn::ResultExt;
use serde::Serialize;
use shelf_config::Config;
use shelf_library::{Catalog, Listing};
use shelf_lookup::Info;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type Result<T> = std::result::Result<T, exn::Exn<ErrorKind>>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("catalog operation failed")]
    Catalog,
    #[display("could not write output")]
    Output,
}

#[derive(Debug, Parser)]
#[command(name = "shelf", version, about = "Personal book catalog", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON), merged over the defaults and
    /// the user configuration directory
    #[arg(short, long, global = true, value_name = "FILE", env = "SHELF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Look a book up by ISBN and add it to the catalog, replacing any
    /// previous record
    Put { isbn: String },
    /// Show a book
    Get { isbn: String },
    /// List every book
    List,
    /// Find books whose title contains the given text (case-sensitive)
    Search { title: String },
    /// Remove a book and its cover
    Delete { isbn: String },
    /// Change the title of a book
    Rename { isbn: String, title: String },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load(self.config.as_deref()).or_raise(|| ErrorKind::Config)?;
        let catalog = Catalog::from_config(&config).await.or_raise(|| ErrorKind::Catalog)?;

        match self.command {
            Command::Put { isbn } => {
                let book = catalog.put(&isbn).await.or_raise(|| ErrorKind::Catalog)?;
                print(&book)
            },
            Command::Get { isbn } => {
                let book = catalog.get(&isbn).await.or_raise(|| ErrorKind::Catalog)?;
                print(&listing(&catalog, book.into_iter().collect()))
            },
            Command::List => {
                let books = catalog.get_all().await.or_raise(|| ErrorKind::Catalog)?;
                print(&listing(&catalog, books))
            },
            Command::Search { title } => {
                let books = catalog.search(&title).await.or_raise(|| ErrorKind::Catalog)?;
                print(&listing(&catalog, books))
            },
            Command::Delete { isbn } => catalog.delete(&isbn).await.or_raise(|| ErrorKind::Catalog),
            Command::Rename { isbn, title } => catalog.rename(&isbn, &title).await.or_raise(|| ErrorKind::Catalog),
        }
    }
}

/// Cover paths are printed as they are served, not as they are stored.
fn listing(catalog: &Catalog, mut books: Vec<Info>) -> Listing {
    for book in &mut books {
        book.image.path = book.image.path.take().map(|path| catalog.assets().public_path(&path).into());
    }
    Listing::from(books)
}

fn print(value: &impl Serialize) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).or_raise(|| ErrorKind::Output)?;
    writeln!(stdout).or_raise(|| ErrorKind::Output)
}

/// Log filter for a verbosity count, used when `RUST_LOG` isn't set.
fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbose >= 2).compact())
        .init();
}
