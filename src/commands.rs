//! Admin commands. Each one runs against an initialized engine and prints the
//! resulting local state.

use clap::{Args, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::{Instant, Interval};

use crate::cache::CacheStorage;
use crate::model::{Category, Dataset, FieldKey, FieldMap, Product, Slide};
use crate::sync::{ConnectionState, FieldSet, SyncEngine};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Show connection state and collection sizes
  Status,

  /// Fetch every collection from the remote store into the local cache
  Pull,

  /// Keep running and report remote changes as they arrive
  Watch {
    /// While offline, try to reconnect every SECS seconds
    #[arg(long, value_name = "SECS")]
    retry: Option<u64>,
  },

  /// Site text content
  Content {
    #[command(subcommand)]
    command: FieldCommand,
  },

  /// Footer block
  Footer {
    #[command(subcommand)]
    command: FieldCommand,
  },

  /// Product categories
  Categories {
    #[command(subcommand)]
    command: CategoryCommand,
  },

  /// Products
  Products {
    #[command(subcommand)]
    command: ProductCommand,
  },

  /// Homepage hero slides
  Slides {
    #[command(subcommand)]
    command: SlideCommand,
  },
}

#[derive(Subcommand, Debug)]
pub enum FieldCommand {
  /// Print every field
  Show {
    /// Only list keys that are absent or empty
    #[arg(long)]
    missing: bool,

    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
  },

  /// Set one or more fields, e.g. `hero-title="Welcome"`
  Set {
    #[arg(required = true, value_name = "KEY=VALUE")]
    assignments: Vec<String>,
  },
}

#[derive(Args, Debug)]
pub struct CategoryFields {
  #[arg(long)]
  name: Option<String>,

  #[arg(long)]
  description: Option<String>,

  /// Image URL
  #[arg(long)]
  image: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
  List {
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
  },
  Add {
    #[command(flatten)]
    fields: CategoryFields,
  },
  Update {
    id: String,

    #[command(flatten)]
    fields: CategoryFields,
  },
  Delete {
    id: String,
  },
}

#[derive(Args, Debug)]
pub struct ProductFields {
  #[arg(long)]
  name: Option<String>,

  /// Id of the owning category
  #[arg(long = "category")]
  category_id: Option<String>,

  #[arg(long)]
  description: Option<String>,

  #[arg(long)]
  specs: Option<String>,

  #[arg(long)]
  price: Option<String>,

  /// Image URL
  #[arg(long)]
  image: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ProductCommand {
  List {
    /// Only products of this category id
    #[arg(long)]
    category: Option<String>,

    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
  },
  Add {
    #[command(flatten)]
    fields: ProductFields,
  },
  Update {
    id: String,

    #[command(flatten)]
    fields: ProductFields,
  },
  Delete {
    id: String,
  },
}

#[derive(Args, Debug)]
pub struct SlideFields {
  #[arg(long)]
  title: Option<String>,

  #[arg(long)]
  subtitle: Option<String>,

  /// Image URL
  #[arg(long)]
  image: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SlideCommand {
  List {
    /// Only slides shown on the homepage
    #[arg(long)]
    active: bool,

    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
  },
  Add {
    #[command(flatten)]
    fields: SlideFields,

    /// Create the slide hidden
    #[arg(long)]
    inactive: bool,
  },
  Update {
    id: String,

    #[command(flatten)]
    fields: SlideFields,
  },
  /// Show or hide a slide
  Toggle {
    id: String,
  },
  Delete {
    id: String,
  },
}

impl Command {
  pub async fn run<S: CacheStorage>(self, engine: &SyncEngine<S>) -> Result<()> {
    match self {
      Command::Status => {
        print_status(engine);
        Ok(())
      }
      Command::Pull => pull(engine).await,
      Command::Watch { retry } => watch(engine, retry).await,
      Command::Content { command } => command.run(engine.content()).await,
      Command::Footer { command } => command.run(engine.footer()).await,
      Command::Categories { command } => command.run(engine).await,
      Command::Products { command } => command.run(engine).await,
      Command::Slides { command } => command.run(engine).await,
    }
  }
}

fn print_status<S: CacheStorage>(engine: &SyncEngine<S>) {
  let data = engine.snapshot();
  println!("State:       {}", engine.state());
  print_summary(&data);
  println!(
    "Missing:     {} content key(s), {} footer field(s)",
    data.content.missing().len(),
    data.footer.missing().len()
  );
}

fn print_summary(data: &Dataset) {
  println!("Content:     {} key(s)", data.content.len());
  println!("Footer:      {} field(s)", data.footer.len());
  println!("Categories:  {}", data.categories.len());
  println!("Products:    {}", data.products.len());
  println!(
    "Slides:      {} ({} active)",
    data.slides.len(),
    data.slides.iter().filter(|s| s.active).count()
  );
}

async fn pull<S: CacheStorage>(engine: &SyncEngine<S>) -> Result<()> {
  if engine.state() != ConnectionState::Online {
    println!("Offline: showing local cache only");
  }

  let (content_set, footer_set) = (engine.content(), engine.footer());
  let (category_set, product_set, slide_set) =
    (engine.categories(), engine.products(), engine.slides());
  let (content, footer, categories, products, slides) = futures::join!(
    content_set.read_authoritative(),
    footer_set.read_authoritative(),
    category_set.read_authoritative(),
    product_set.read_authoritative(),
    slide_set.read_authoritative(),
  );

  print_summary(&Dataset {
    content,
    footer,
    categories,
    products,
    slides,
  });
  Ok(())
}

async fn watch<S: CacheStorage>(engine: &SyncEngine<S>, retry: Option<u64>) -> Result<()> {
  println!("Watching for changes ({}), Ctrl-C to stop", engine.state());

  let mut last = engine.snapshot();
  let mut states = engine.watch_state();
  let mut tick = tokio::time::interval(Duration::from_secs(1));
  let mut retry = retry.map(|secs| {
    let period = Duration::from_secs(secs.max(1));
    tokio::time::interval_at(Instant::now() + period, period)
  });

  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => break,
      changed = states.changed() => {
        if changed.is_err() {
          break;
        }
        println!("State: {}", *states.borrow_and_update());
      }
      _ = tick.tick() => {
        let current = engine.snapshot();
        if current != last {
          println!("--- {} ---", chrono::Local::now().format("%H:%M:%S"));
          print_summary(&current);
          last = current;
        }
      }
      _ = next_retry(&mut retry) => {
        if engine.state() == ConnectionState::Offline {
          engine.reconnect().await?;
        }
      }
    }
  }
  Ok(())
}

/// Next reconnect tick, or never when retrying is off.
async fn next_retry(retry: &mut Option<Interval>) {
  match retry {
    Some(interval) => {
      interval.tick().await;
    }
    None => std::future::pending().await,
  }
}

impl FieldCommand {
  async fn run<S: CacheStorage, K>(self, fields: FieldSet<'_, S, K>) -> Result<()>
  where
    K: FieldKey + FromStr<Err = color_eyre::Report>,
  {
    match self {
      FieldCommand::Show { missing, format } => {
        let map = fields.read();
        if missing {
          for key in map.missing() {
            println!("{}", key.as_str());
          }
          return Ok(());
        }
        match format {
          OutputFormat::Json => print_json(&map)?,
          OutputFormat::Text => print_fields(&map),
        }
      }
      FieldCommand::Set { assignments } => {
        let updates = parse_assignments::<K>(&assignments)?;
        let merged = fields.update(&updates).await?;
        print_fields(&merged);
      }
    }
    Ok(())
  }
}

fn print_fields<K: FieldKey>(map: &FieldMap<K>) {
  let width = K::ALL.iter().map(|k| k.as_str().len()).max().unwrap_or(0);
  for (key, value) in map.iter() {
    println!("{:width$}  {}", key.as_str(), value, width = width);
  }
}

/// Parse `KEY=VALUE` arguments into a field map; later duplicates win.
fn parse_assignments<K>(assignments: &[String]) -> Result<FieldMap<K>>
where
  K: FieldKey + FromStr<Err = color_eyre::Report>,
{
  let mut map = FieldMap::new();
  for pair in assignments {
    let (key, value) = pair
      .split_once('=')
      .ok_or_else(|| eyre!("Expected KEY=VALUE, got: {}", pair))?;
    map.set(key.trim().parse::<K>()?, value);
  }
  Ok(map)
}

impl CategoryCommand {
  async fn run<S: CacheStorage>(self, engine: &SyncEngine<S>) -> Result<()> {
    let categories = engine.categories();
    match self {
      CategoryCommand::List { format } => {
        let items = categories.read();
        match format {
          OutputFormat::Json => print_json(&items)?,
          OutputFormat::Text => {
            for c in &items {
              println!("{:<15} {}", c.id, c.name);
            }
          }
        }
      }
      CategoryCommand::Add { fields } => {
        let created = categories.create(fields.apply(Category::default())).await?;
        println!("Created category {}", created.id);
      }
      CategoryCommand::Update { id, fields } => match categories.find(&id) {
        Some(existing) => {
          categories.update(&id, fields.apply(existing)).await?;
          println!("Updated category {}", id);
        }
        None => println!("No category with id {}", id),
      },
      CategoryCommand::Delete { id } => {
        if categories.delete(&id).await? {
          println!("Deleted category {}", id);
        } else {
          println!("No category with id {}", id);
        }
      }
    }
    Ok(())
  }
}

impl CategoryFields {
  fn apply(self, mut category: Category) -> Category {
    if let Some(name) = self.name {
      category.name = name;
    }
    if let Some(description) = self.description {
      category.description = description;
    }
    if let Some(image) = self.image {
      category.image = image;
    }
    category
  }
}

impl ProductCommand {
  async fn run<S: CacheStorage>(self, engine: &SyncEngine<S>) -> Result<()> {
    let products = engine.products();
    match self {
      ProductCommand::List { category, format } => {
        let items: Vec<Product> = products
          .read()
          .into_iter()
          .filter(|p| category.as_deref().map_or(true, |c| p.category_id == c))
          .collect();
        match format {
          OutputFormat::Json => print_json(&items)?,
          OutputFormat::Text => {
            for p in &items {
              println!(
                "{:<15} {:<30} {:<20} {}",
                p.id,
                p.name,
                products.category_name(p),
                p.price
              );
            }
          }
        }
      }
      ProductCommand::Add { fields } => {
        let created = products.create(fields.apply(Product::default())).await?;
        println!("Created product {}", created.id);
      }
      ProductCommand::Update { id, fields } => match products.find(&id) {
        Some(existing) => {
          products.update(&id, fields.apply(existing)).await?;
          println!("Updated product {}", id);
        }
        None => println!("No product with id {}", id),
      },
      ProductCommand::Delete { id } => {
        if products.delete(&id).await? {
          println!("Deleted product {}", id);
        } else {
          println!("No product with id {}", id);
        }
      }
    }
    Ok(())
  }
}

impl ProductFields {
  fn apply(self, mut product: Product) -> Product {
    if let Some(name) = self.name {
      product.name = name;
    }
    if let Some(category_id) = self.category_id {
      product.category_id = category_id;
    }
    if let Some(description) = self.description {
      product.description = description;
    }
    if let Some(specs) = self.specs {
      product.specs = specs;
    }
    if let Some(price) = self.price {
      product.price = price;
    }
    if let Some(image) = self.image {
      product.image = image;
    }
    product
  }
}

impl SlideCommand {
  async fn run<S: CacheStorage>(self, engine: &SyncEngine<S>) -> Result<()> {
    let slides = engine.slides();
    match self {
      SlideCommand::List { active, format } => {
        let items = if active { slides.active() } else { slides.read() };
        match format {
          OutputFormat::Json => print_json(&items)?,
          OutputFormat::Text => {
            for s in &items {
              let marker = if s.active { "*" } else { " " };
              println!("{} {:<15} {}", marker, s.id, s.title);
            }
          }
        }
      }
      SlideCommand::Add { fields, inactive } => {
        let slide = fields.apply(Slide {
          active: !inactive,
          ..Default::default()
        });
        let created = slides.create(slide).await?;
        println!("Created slide {}", created.id);
      }
      SlideCommand::Update { id, fields } => match slides.find(&id) {
        Some(existing) => {
          slides.update(&id, fields.apply(existing)).await?;
          println!("Updated slide {}", id);
        }
        None => println!("No slide with id {}", id),
      },
      SlideCommand::Toggle { id } => match slides.toggle(&id).await? {
        Some(slide) => println!(
          "Slide {} is now {}",
          slide.id,
          if slide.active { "active" } else { "hidden" }
        ),
        None => println!("No slide with id {}", id),
      },
      SlideCommand::Delete { id } => {
        if slides.delete(&id).await? {
          println!("Deleted slide {}", id);
        } else {
          println!("No slide with id {}", id);
        }
      }
    }
    Ok(())
  }
}

impl SlideFields {
  fn apply(self, mut slide: Slide) -> Slide {
    if let Some(title) = self.title {
      slide.title = title;
    }
    if let Some(subtitle) = self.subtitle {
      slide.subtitle = subtitle;
    }
    if let Some(image) = self.image {
      slide.image = image;
    }
    slide
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let json =
    serde_json::to_string_pretty(value).map_err(|e| eyre!("Failed to encode output: {}", e))?;
  println!("{}", json);
  Ok(())
}
