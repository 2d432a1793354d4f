use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use marble_admin::api::{CatalogClient, CatalogService, FormFields, ImageFile};
use marble_admin::config::{self, Config};
use marble_admin::controller::EntityController;
use marble_admin::images::ImageSelection;
use marble_admin::model::{
    resolve_image_url, Category, Entity, EntityKind, FormMode, Product, Subcategory,
};
use marble_admin::qr::{self, QrForm, QrMode};
use marble_admin::session::{self, SessionStore};

#[derive(Debug, Parser)]
#[command(author, version, about = "Admin client for the marble catalog backend")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the opaque session locally
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Clear the stored session
    Logout,
    #[command(subcommand)]
    Category(CategoryCmd),
    #[command(subcommand)]
    Subcategory(SubcategoryCmd),
    #[command(subcommand)]
    Product(ProductCmd),
    #[command(subcommand)]
    Qr(QrCmd),
}

#[derive(Debug, Subcommand)]
enum CategoryCmd {
    /// List categories, optionally filtered by a free-text query
    List {
        #[arg(long, default_value = "")]
        query: String,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        image: PathBuf,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// New image; omit to keep the stored one
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SubcategoryCmd {
    List {
        #[arg(long, default_value = "")]
        query: String,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category_id: String,
        #[arg(long)]
        image: PathBuf,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category_id: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ProductCmd {
    List {
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Fetch and print one product record
    Show { id: String },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        length: f64,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        slabs: i64,
        #[arg(long, default_value = "")]
        description: String,
        /// Repeatable; capped at 10 total after dedup
        #[arg(long = "image", required = true)]
        images: Vec<PathBuf>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        length: Option<f64>,
        #[arg(long)]
        width: Option<f64>,
        #[arg(long)]
        slabs: Option<i64>,
        #[arg(long)]
        description: Option<String>,
        /// Repeatable; omit to keep the stored images
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum QrCmd {
    /// Encode a product link or freeform text into a print-ready PNG
    Generate {
        /// Reference mode: encode the details link for this product id.
        /// Defaults to the first product when neither this nor --text is set.
        #[arg(long, conflicts_with = "text")]
        product_id: Option<String>,
        /// Freeform mode: encode this text verbatim
        #[arg(long)]
        text: Option<String>,
        /// Optional note attached to either mode
        #[arg(long, default_value = "")]
        note: String,
        /// Output directory; defaults to the configured data dir
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Decode a captured camera frame image
    Scan { frame: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let store = SessionStore::new(&cfg.app.data_dir);

    match args.command {
        Command::Login { email, password } => {
            let session = session::login(&cfg.backend.origin, &email, &password).await?;
            store.save(&session)?;
            println!("logged in");
            Ok(())
        }
        Command::Logout => {
            store.clear()?;
            println!("logged out");
            Ok(())
        }
        command => {
            let token = store.load()?.and_then(|s| s.token);
            let client = CatalogClient::new(&cfg.backend.origin, token)?;
            match command {
                Command::Category(cmd) => run_category(&cfg, &client, cmd).await,
                Command::Subcategory(cmd) => run_subcategory(&cfg, &client, cmd).await,
                Command::Product(cmd) => run_product(&cfg, &client, cmd).await,
                Command::Qr(cmd) => run_qr(&cfg, &client, cmd).await,
                Command::Login { .. } | Command::Logout => unreachable!(),
            }
        }
    }
}

/// Load a controller or bail with its recorded error.
async fn load_or_bail<E: Entity>(
    ctl: &mut EntityController<E>,
    svc: &dyn CatalogService,
) -> Result<()> {
    if !ctl.load(svc).await {
        bail!("{}", ctl.error().unwrap_or("load failed"));
    }
    Ok(())
}

fn finish<E: Entity>(ok: bool, ctl: &EntityController<E>, action: &str) -> Result<()> {
    if ok {
        println!("{action} ok ({} records)", ctl.items().len());
        Ok(())
    } else {
        bail!("{}", ctl.error().unwrap_or("operation failed"));
    }
}

/// The confirmation gate for deletes: `--yes` or an interactive prompt.
fn confirm_delete(label: &str, yes: bool) -> bool {
    if yes {
        return true;
    }
    eprint!("Delete {label}? [y/N] ");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes")
}

async fn load_images(paths: &[PathBuf]) -> Result<Vec<ImageFile>> {
    let mut selection = ImageSelection::new();
    let added = selection.add_paths(paths)?;
    if added < paths.len() {
        warn!(
            picked = paths.len(),
            kept = selection.len(),
            "duplicate or over-cap images were dropped"
        );
    }
    selection.load_files().await
}

async fn run_category(cfg: &Config, client: &CatalogClient, cmd: CategoryCmd) -> Result<()> {
    let mut ctl = EntityController::<Category>::new();
    match cmd {
        CategoryCmd::List { query } => {
            load_or_bail(&mut ctl, client).await?;
            for (idx, item) in ctl.filtered(&query).iter().enumerate() {
                println!(
                    "{:>3}. {}  {}  {}",
                    idx + 1,
                    item.id,
                    item.category_name,
                    resolve_image_url(&cfg.backend.origin, &item.category_image)
                );
            }
            Ok(())
        }
        CategoryCmd::Create { name, image } => {
            let mut fields = FormFields::for_kind(EntityKind::Category);
            fields.set("categoryName", &name);
            let images = load_images(&[image]).await?;
            let ok = ctl.create(client, fields, images).await;
            finish(ok, &ctl, "create")
        }
        CategoryCmd::Update { id, name, image } => {
            load_or_bail(&mut ctl, client).await?;
            let Some(original) = ctl.find(&id).cloned() else {
                bail!("no category with id {id}");
            };
            let mut fields = FormMode::Edit(original).starting_fields();
            if let Some(name) = name {
                fields.set("categoryName", &name);
            }
            let images = match image {
                Some(path) => load_images(&[path]).await?,
                None => Vec::new(),
            };
            let ok = ctl.update(client, &id, fields, images).await;
            finish(ok, &ctl, "update")
        }
        CategoryCmd::Delete { id, yes } => {
            load_or_bail(&mut ctl, client).await?;
            let ok = ctl
                .delete(client, &id, |item| confirm_delete(&item.label(), yes))
                .await;
            if !ok && ctl.error().is_none() {
                println!("delete cancelled");
                return Ok(());
            }
            finish(ok, &ctl, "delete")
        }
    }
}

async fn run_subcategory(cfg: &Config, client: &CatalogClient, cmd: SubcategoryCmd) -> Result<()> {
    let mut ctl = EntityController::<Subcategory>::new();
    match cmd {
        SubcategoryCmd::List { query } => {
            load_or_bail(&mut ctl, client).await?;
            for (idx, item) in ctl.filtered(&query).iter().enumerate() {
                println!(
                    "{:>3}. {}  {}  (category: {})  {}",
                    idx + 1,
                    item.id,
                    item.sub_category_name,
                    item.category_name,
                    resolve_image_url(&cfg.backend.origin, &item.sub_category_image)
                );
            }
            Ok(())
        }
        SubcategoryCmd::Create {
            name,
            category_id,
            image,
        } => {
            let parent_name = lookup_category_name(client, &category_id).await?;
            let mut fields = FormFields::for_kind(EntityKind::Subcategory);
            fields
                .set("categoryId", &category_id)
                .set("categoryName", &parent_name)
                .set("subCategoryName", &name);
            let images = load_images(&[image]).await?;
            let ok = ctl.create(client, fields, images).await;
            finish(ok, &ctl, "create")
        }
        SubcategoryCmd::Update {
            id,
            name,
            category_id,
            image,
        } => {
            load_or_bail(&mut ctl, client).await?;
            let Some(original) = ctl.find(&id).cloned() else {
                bail!("no subcategory with id {id}");
            };
            let mut fields = FormMode::Edit(original).starting_fields();
            if let Some(name) = name {
                fields.set("subCategoryName", &name);
            }
            if let Some(category_id) = category_id {
                // Parent change re-resolves the denormalized name.
                let parent_name = lookup_category_name(client, &category_id).await?;
                fields
                    .set("categoryId", &category_id)
                    .set("categoryName", &parent_name);
            }
            let images = match image {
                Some(path) => load_images(&[path]).await?,
                None => Vec::new(),
            };
            let ok = ctl.update(client, &id, fields, images).await;
            finish(ok, &ctl, "update")
        }
        SubcategoryCmd::Delete { id, yes } => {
            load_or_bail(&mut ctl, client).await?;
            let ok = ctl
                .delete(client, &id, |item| confirm_delete(&item.label(), yes))
                .await;
            if !ok && ctl.error().is_none() {
                println!("delete cancelled");
                return Ok(());
            }
            finish(ok, &ctl, "delete")
        }
    }
}

/// Resolve the denormalized parent-category name the backend expects on
/// every subcategory mutation.
async fn lookup_category_name(svc: &dyn CatalogService, category_id: &str) -> Result<String> {
    let mut categories = EntityController::<Category>::new();
    load_or_bail(&mut categories, svc).await?;
    match categories.find(category_id) {
        Some(cat) => Ok(cat.category_name.clone()),
        None => bail!("no category with id {category_id}"),
    }
}

async fn run_product(cfg: &Config, client: &CatalogClient, cmd: ProductCmd) -> Result<()> {
    let mut ctl = EntityController::<Product>::new();
    match cmd {
        ProductCmd::List { query } => {
            load_or_bail(&mut ctl, client).await?;
            for (idx, item) in ctl.filtered(&query).iter().enumerate() {
                println!(
                    "{:>3}. {}  {}  {}x{}cm  slabs:{}  images:{}",
                    idx + 1,
                    item.id,
                    item.marble_name,
                    item.length_in_cm,
                    item.width_in_cm,
                    item.no_of_slabs,
                    item.product_images.len()
                );
            }
            Ok(())
        }
        ProductCmd::Show { id } => {
            let value = client.fetch_one(EntityKind::Product, &id).await?;
            let product: Product = serde_json::from_value(value)?;
            println!("{}", product.marble_name);
            println!(
                "  {} x {} cm, {} slabs",
                product.length_in_cm, product.width_in_cm, product.no_of_slabs
            );
            if !product.description.is_empty() {
                println!("  {}", product.description);
            }
            for reference in &product.product_images {
                println!("  {}", resolve_image_url(&cfg.backend.origin, reference));
            }
            Ok(())
        }
        ProductCmd::Create {
            name,
            length,
            width,
            slabs,
            description,
            images,
        } => {
            let mut fields = FormFields::for_kind(EntityKind::Product);
            fields
                .set("MarbleName", &name)
                .set("lenthincm", &length.to_string())
                .set("widthincm", &width.to_string())
                .set("noofslabs", &slabs.to_string())
                .set("description", &description);
            let images = load_images(&images).await?;
            let ok = ctl.create(client, fields, images).await;
            finish(ok, &ctl, "create")
        }
        ProductCmd::Update {
            id,
            name,
            length,
            width,
            slabs,
            description,
            images,
        } => {
            load_or_bail(&mut ctl, client).await?;
            let Some(original) = ctl.find(&id).cloned() else {
                bail!("no product with id {id}");
            };
            let mut fields = FormMode::Edit(original).starting_fields();
            if let Some(name) = name {
                fields.set("MarbleName", &name);
            }
            if let Some(length) = length {
                fields.set("lenthincm", &length.to_string());
            }
            if let Some(width) = width {
                fields.set("widthincm", &width.to_string());
            }
            if let Some(slabs) = slabs {
                fields.set("noofslabs", &slabs.to_string());
            }
            if let Some(description) = description {
                fields.set("description", &description);
            }
            let images = load_images(&images).await?;
            if !images.is_empty() {
                // Tell the backend whether new uploads merge or replace.
                fields.set("imagePolicy", cfg.product.image_update_policy.as_str());
            }
            let ok = ctl.update(client, &id, fields, images).await;
            finish(ok, &ctl, "update")
        }
        ProductCmd::Delete { id, yes } => {
            load_or_bail(&mut ctl, client).await?;
            let ok = ctl
                .delete(client, &id, |item| confirm_delete(&item.label(), yes))
                .await;
            if !ok && ctl.error().is_none() {
                println!("delete cancelled");
                return Ok(());
            }
            finish(ok, &ctl, "delete")
        }
    }
}

async fn run_qr(cfg: &Config, client: &CatalogClient, cmd: QrCmd) -> Result<()> {
    match cmd {
        QrCmd::Generate {
            product_id,
            text,
            note,
            out,
        } => {
            let mut form = match text {
                Some(text) => QrForm::freeform(text),
                None => QrForm::reference(product_id.unwrap_or_default()),
            };
            form.annotation = note;

            if form.mode == QrMode::Reference {
                let mut products = EntityController::<Product>::new();
                load_or_bail(&mut products, client).await?;
                form.default_target(products.items());
                if let Some(product) = products.find(&form.target_id) {
                    println!("selected: {}", product.label());
                }
            }

            let payload = form.payload(&cfg.frontend.origin, &cfg.frontend.details_path);
            let out_dir = out.unwrap_or_else(|| Path::new(&cfg.app.data_dir).to_path_buf());
            match qr::generate(&payload, &out_dir)? {
                Some(generated) => {
                    println!("payload: {}", generated.payload);
                    println!("saved: {}", generated.path.display());
                }
                None => {
                    eprintln!("nothing to encode: select a product or enter text first");
                }
            }
            Ok(())
        }
        QrCmd::Scan { frame } => {
            let content = qr::scan(&frame)?;
            println!("{content}");
            Ok(())
        }
    }
}
