use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;

use opsdesk::api::types::ServiceUpdate;
use opsdesk::{api, app, config};

#[derive(Parser, Debug)]
#[command(name = "opsdesk")]
#[command(about = "A command-line client for the OpsDesk back office")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/opsdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Customer records
  Customers {
    #[command(subcommand)]
    command: CustomersCommand,
  },
  /// Service catalog
  Services {
    #[command(subcommand)]
    command: ServicesCommand,
  },
  /// Website content (hero, brand partners, FAQs)
  Content {
    #[command(subcommand)]
    command: ContentCommand,
  },
  /// Stock items
  Inventory {
    #[command(subcommand)]
    command: InventoryCommand,
  },
  /// Local query cache maintenance
  Cache {
    #[command(subcommand)]
    command: CacheCommand,
  },
}

#[derive(Subcommand, Debug)]
enum CustomersCommand {
  /// List customers
  List {
    #[arg(short, long)]
    search: Option<String>,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
    #[arg(short, long, default_value_t = 10)]
    limit: u32,
  },
  /// Show one customer
  Show { id: String },
  /// Delete a customer
  Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ServicesCommand {
  /// List services
  List {
    #[arg(short, long)]
    search: Option<String>,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
    #[arg(short, long, default_value_t = 10)]
    limit: u32,
  },
  /// Create a service
  Create {
    #[arg(long)]
    title: String,
    #[arg(long)]
    category: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    price: f64,
    /// Optional image file, sent as multipart
    #[arg(long)]
    image: Option<PathBuf>,
  },
  /// Update fields on a service
  Update {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    price: Option<f64>,
  },
  /// Delete a service
  Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ContentCommand {
  /// Show the hero section
  Hero,
  /// Update the hero section
  SetHero {
    #[arg(long)]
    heading: String,
    #[arg(long)]
    subheading: String,
    /// Optional image file, sent as multipart
    #[arg(long)]
    image: Option<PathBuf>,
  },
  /// List brand partners
  Partners,
  /// Replace the brand partner list from a JSON file
  SetPartners { file: PathBuf },
  /// List FAQ entries
  Faqs,
  /// Add a FAQ entry
  AddFaq {
    #[arg(long)]
    question: String,
    #[arg(long)]
    answer: String,
  },
  /// Remove a FAQ entry
  RemoveFaq { id: String },
}

#[derive(Subcommand, Debug)]
enum InventoryCommand {
  /// List stock items
  List {
    #[arg(short, long)]
    search: Option<String>,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
    #[arg(short, long, default_value_t = 10)]
    limit: u32,
  },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
  /// Drop every cached query result and the persisted snapshot
  Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;
  let client = api::CachedApiClient::new(&config)?;
  let app = app::App::new(client);

  match args.command {
    Command::Customers { command } => match command {
      CustomersCommand::List { search, page, limit } => {
        app.customers_list(search.as_deref(), page, limit).await?
      }
      CustomersCommand::Show { id } => app.customers_show(&id).await?,
      CustomersCommand::Delete { id } => app.customers_delete(&id).await?,
    },
    Command::Services { command } => match command {
      ServicesCommand::List { search, page, limit } => {
        app.services_list(search.as_deref(), page, limit).await?
      }
      ServicesCommand::Create {
        title,
        category,
        description,
        price,
        image,
      } => {
        app
          .services_create(title, category, description, price, image.as_deref())
          .await?
      }
      ServicesCommand::Update {
        id,
        title,
        category,
        description,
        price,
      } => {
        let update = ServiceUpdate {
          title,
          category,
          description,
          price,
        };
        app.services_update(&id, update).await?
      }
      ServicesCommand::Delete { id } => app.services_delete(&id).await?,
    },
    Command::Content { command } => match command {
      ContentCommand::Hero => app.content_hero().await?,
      ContentCommand::SetHero {
        heading,
        subheading,
        image,
      } => app.content_set_hero(heading, subheading, image.as_deref()).await?,
      ContentCommand::Partners => app.content_partners().await?,
      ContentCommand::SetPartners { file } => app.content_set_partners(&file).await?,
      ContentCommand::Faqs => app.content_faqs().await?,
      ContentCommand::AddFaq { question, answer } => {
        app.content_add_faq(question, answer).await?
      }
      ContentCommand::RemoveFaq { id } => app.content_remove_faq(&id).await?,
    },
    Command::Inventory { command } => match command {
      InventoryCommand::List { search, page, limit } => {
        app.inventory_list(search.as_deref(), page, limit).await?
      }
    },
    Command::Cache { command } => match command {
      CacheCommand::Clear => app.cache_clear()?,
    },
  }

  Ok(())
}
