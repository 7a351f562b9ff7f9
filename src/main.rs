// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::runtime::Runtime;

use pokedex::logging::{self, LogTarget};
use pokedex::{
    CatalogLoader, CatalogView, ClientCommand, ClientConfig, DetailPhase, DisplayRecord,
    ItemResolver, CATALOG_PATH,
};

fn main() -> Result<()> {
    let config = ClientConfig::parse();
    let runtime = Runtime::new().context("Failed to start async runtime")?;

    match config.command.clone() {
        Some(ClientCommand::List) => {
            logging::init(LogTarget::Stderr)?;
            runtime.block_on(run_list(&config))
        }
        Some(ClientCommand::Show { pokemon_id }) => {
            logging::init(LogTarget::Stderr)?;
            runtime.block_on(run_show(&config, pokemon_id))
        }
        None => {
            let target = match &config.log_file {
                Some(path) => LogTarget::File(path.clone()),
                None => LogTarget::Discard,
            };
            logging::init(target)?;
            let _guard = runtime.enter();
            run_ui_mode(&config)
        }
    }
}

async fn run_list(config: &ClientConfig) -> Result<()> {
    println!("📚 Loading Pokémons from {}{}", config.base_url, CATALOG_PATH.trim_start_matches('/'));

    let loader = CatalogLoader::new(config.fetcher()?);
    let state = loader.load().await;

    match state.view() {
        CatalogView::Loading => {
            eprintln!("❌ Catalog is still loading");
            std::process::exit(1);
        }
        CatalogView::Failed(message) => {
            eprintln!("❌ {}", message);
            std::process::exit(1);
        }
        CatalogView::Empty => {
            println!("No Pokémon found. Check that {} is served and not empty.", CATALOG_PATH);
        }
        CatalogView::Cards(cards) => {
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            for card in cards {
                println!(
                    "#{:<4} {:<14} {:<18} ATK {:>3}  DEF {:>3}  SPD {:>3}  HP {:>3}",
                    card.id,
                    card.name(),
                    card.types_label(),
                    card.record.attack,
                    card.record.defense,
                    card.record.speed,
                    card.record.health,
                );
            }
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("✓ {} Pokémons", cards.len());
        }
    }

    Ok(())
}

async fn run_show(config: &ClientConfig, pokemon_id: String) -> Result<()> {
    let resolver = ItemResolver::new(config.lookup(config.fetcher()?));
    let mut events = resolver.subscribe();
    resolver.resolve_identifier(pokemon_id);

    while !resolver.phase().is_terminal() {
        if events.recv().await.is_none() {
            break;
        }
    }

    match resolver.phase() {
        DetailPhase::Resolved(item) => print_detail(&item),
        DetailPhase::IdentifierMissing => {
            eprintln!("❌ Could not determine the Pokémon ID.");
            std::process::exit(1);
        }
        DetailPhase::NotFound(id) => {
            eprintln!(
                "❌ Pokémon with ID '{}' not found or an error occurred while fetching.",
                id
            );
            std::process::exit(1);
        }
        DetailPhase::IdentifierLoading | DetailPhase::DataLoading(_) => {
            eprintln!("❌ Resolution stopped before settling");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_detail(item: &DisplayRecord) {
    println!("🔎 {} (#{})", item.name(), item.id);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Types:      {}", item.types_label());
    println!("Attack:     {}", item.record.attack);
    println!("Defense:    {}", item.record.defense);
    println!("Speed:      {}", item.record.speed);
    println!("Health:     {}", item.record.health);
    println!("Evolves to: {}", item.evolution().unwrap_or("—"));
    println!("Evolves from: {}", item.devolution().unwrap_or("—"));
    println!("Image:      {}", item.record.main_image);
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &ClientConfig) -> Result<()> {
    println!("🖥️  Loading Pokédex UI...\n");

    let fetch = config.fetcher()?;
    let loader = CatalogLoader::new(fetch.clone());
    let mut app = ui::App::new(loader, config.lookup(fetch));
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &ClientConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: pokedex list / pokedex show <id>");
    std::process::exit(1);
}
