//! Terminal Storefront
//!
//! The shop front end, built with Ratatui.
//!
//! # Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              🛒 x402 Shop pay-per-request on Base Sepolia  ●     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ Wallet 0xf39f...2266   Balance 0.0050 USDC                      │
//! ├─ Menu ─────────────────────────────────────┬─ Cart (2) ─────────┤
//! │ 🍎 Apple  🍌 Banana  🍕 Pizza ...           │ ▶ 🍎 Apple  $0.001 │
//! │ 🍿 Popcorn 🍫 Chocolate ...                 │   🍕 Pizza  $0.002 │
//! │                                            │ Total $0.003 USDC  │
//! │                                            │  [p] Pay $0.003    │
//! ├─ Checkout ─────────────────────────────────┴────────────────────┤
//! │ ✓ Cart → ● Paying → ○ Done                                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod event;
pub mod theme;
pub mod ui;
pub mod widgets;

pub use app::{App, AppEvent, Focus, View};
pub use event::{AppAction, EventHandler};

use crate::checkout::{CheckoutSettings, Shop};
use crate::config::Config;
use crate::ledger::Erc20Ledger;
use crate::payment::X402Connector;
use crate::wallet::{KeyStorage, WalletSession};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ethers::types::U256;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Type alias for our terminal backend
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> anyhow::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state
pub fn restore_terminal(terminal: &mut Tui) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Key storage location from config, or the platform default
pub fn key_storage(config: &Config) -> KeyStorage {
    match &config.wallet.data_dir {
        Some(dir) => KeyStorage::with_path(dir.clone()),
        None => KeyStorage::new(),
    }
}

/// Restore the wallet session: an explicit key wins over the stored one
async fn restore_session(config: &Config, storage: &KeyStorage) -> WalletSession {
    let mut session = WalletSession::disconnected();

    let key = match &config.wallet.private_key {
        Some(key) => Some(key.clone()),
        None => match storage.load().await {
            Ok(key) => key,
            Err(e) => {
                warn!("Could not load stored wallet: {}", e);
                None
            }
        },
    };

    if let Some(key) = key {
        if let Err(e) = session.connect_with_key(&key) {
            warn!("Ignoring unusable wallet key: {}", e);
        }
    }
    session
}

/// Build the shop from configuration
pub async fn build_shop(config: &Config, storage: &KeyStorage) -> anyhow::Result<Shop> {
    let ledger = Erc20Ledger::new(&config.chain.rpc_url, config.chain.usdc_address)?;
    let connector = X402Connector::new(config.payment.network, U256::from(config.shop.max_payment));
    let settings = CheckoutSettings::new(&config.shop.api_url)
        .with_timeout(Duration::from_secs(config.shop.checkout_timeout_secs));

    Ok(Shop::new(
        restore_session(config, storage).await,
        Arc::new(ledger),
        Arc::new(connector),
        settings,
    ))
}

/// Run the storefront
pub async fn run(config: Config) -> anyhow::Result<()> {
    info!("Starting storefront against {}", config.shop.api_url);

    let storage = key_storage(&config);
    let shop = build_shop(&config, &storage).await?;
    let mut app = App::new(shop, storage);
    app.spawn_balance_refresh();

    let mut terminal = init_terminal()?;
    let mut events = EventHandler::new(Duration::from_millis(100));

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    if let Err(e) = restore_terminal(&mut terminal) {
        error!("Failed to restore terminal: {}", e);
    }

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        // Results from payment and balance tasks
        app.poll_events();

        if let Some(action) = events.next().await {
            app.handle_action(action).await;
        }

        if app.should_quit {
            break;
        }
    }

    info!("Storefront exited normally");
    Ok(())
}
