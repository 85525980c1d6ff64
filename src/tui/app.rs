//! Application State
//!
//! Contains the storefront state and input handling for the TUI. Network work
//! (payments, balance reads) runs in spawned tasks that report back as
//! [`AppEvent`]s, so the screen keeps drawing while a payment is in flight.

use crate::catalog::{CatalogItem, CATALOG};
use crate::checkout::{BalanceRefresh, CheckoutCompletion, CheckoutError, Shop};
use crate::tui::event::AppAction;
use crate::wallet::KeyStorage;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ethers::types::Address;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Catalog grid width
pub const GRID_COLUMNS: usize = 6;

/// Current view/screen
#[derive(Debug, Clone, PartialEq, Default)]
pub enum View {
    #[default]
    Shop,
    Wallet,
    Help,
}

/// Which shop panel has the cursor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Focus {
    #[default]
    Catalog,
    Cart,
}

/// Events from background tasks
#[derive(Debug)]
pub enum AppEvent {
    CheckoutFinished(CheckoutCompletion),
    BalanceUpdated {
        address: Address,
        balance: Option<Decimal>,
    },
}

/// Main application state
pub struct App {
    pub shop: Shop,
    pub key_storage: KeyStorage,

    // UI State
    pub view: View,
    pub focus: Focus,
    pub catalog_index: usize,
    pub cart_index: usize,
    pub should_quit: bool,
    /// Animation frame counter
    pub tick: usize,

    // Wallet view state
    pub wallet_input: String,
    pub wallet_show_input: bool,
    pub wallet_notice: Option<String>,

    event_rx: mpsc::Receiver<AppEvent>,
    event_tx: mpsc::Sender<AppEvent>,
}

impl App {
    pub fn new(shop: Shop, key_storage: KeyStorage) -> Self {
        let (event_tx, event_rx) = mpsc::channel(100);
        let view = if shop.session().is_connected() {
            View::Shop
        } else {
            View::Wallet
        };

        Self {
            shop,
            key_storage,
            view,
            focus: Focus::Catalog,
            catalog_index: 0,
            cart_index: 0,
            should_quit: false,
            tick: 0,
            wallet_input: String::new(),
            wallet_show_input: false,
            wallet_notice: None,
            event_rx,
            event_tx,
        }
    }

    pub fn selected_item(&self) -> &'static CatalogItem {
        &CATALOG[self.catalog_index.min(CATALOG.len() - 1)]
    }

    /// Poll for async events
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CheckoutFinished(completion) => {
                if let Some(refresh) = self.shop.complete_checkout(completion) {
                    self.spawn_refresh(refresh);
                }
                self.clamp_cart_index();
            }
            AppEvent::BalanceUpdated { address, balance } => {
                if let Some(balance) = balance {
                    self.shop.record_balance(address, balance);
                }
            }
        }
    }

    /// Handle a user action
    pub async fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::Quit | AppAction::ForceQuit => {
                self.should_quit = true;
            }
            AppAction::Tick => {
                self.tick = self.tick.wrapping_add(1);
            }
            AppAction::ToggleHelp => {
                self.view = if self.view == View::Help {
                    View::Shop
                } else {
                    View::Help
                };
            }
            AppAction::ToggleWallet => {
                if self.view == View::Wallet {
                    self.close_wallet();
                } else {
                    self.view = View::Wallet;
                }
            }
            AppAction::Escape => match self.view {
                View::Wallet if self.wallet_show_input => {
                    self.wallet_show_input = false;
                    self.wallet_input.clear();
                }
                View::Wallet => self.close_wallet(),
                View::Help => self.view = View::Shop,
                View::Shop => {}
            },
            // Help closes on any key
            _ if self.view == View::Help => {
                self.view = View::Shop;
            }
            AppAction::Submit => match self.view {
                View::Wallet => self.import_wallet().await,
                _ => match self.focus {
                    Focus::Catalog => self.add_selected(),
                    Focus::Cart => self.remove_selected(),
                },
            },
            AppAction::DeleteKey => {
                if self.view == View::Wallet {
                    self.wallet_input.pop();
                } else if self.focus == Focus::Cart {
                    self.remove_selected();
                }
            }
            AppAction::NextField => {
                if self.view == View::Shop {
                    self.focus = match self.focus {
                        Focus::Catalog => Focus::Cart,
                        Focus::Cart => Focus::Catalog,
                    };
                }
            }
            AppAction::Up => self.move_selection(-(GRID_COLUMNS as isize), -1),
            AppAction::Down => self.move_selection(GRID_COLUMNS as isize, 1),
            AppAction::Left => self.move_selection(-1, 0),
            AppAction::Right => self.move_selection(1, 0),
            AppAction::Input(key) => self.handle_input(key).await,
        }
    }

    /// Handle keyboard input
    async fn handle_input(&mut self, key: KeyEvent) {
        if key.modifiers != KeyModifiers::NONE && key.modifiers != KeyModifiers::SHIFT {
            return;
        }
        let KeyCode::Char(c) = key.code else {
            return;
        };

        if self.view == View::Wallet {
            if self.wallet_show_input {
                self.wallet_input.push(c);
                return;
            }
            match c {
                'e' => {
                    self.wallet_show_input = true;
                    self.wallet_notice = None;
                }
                'g' => self.create_wallet().await,
                'l' => self.logout().await,
                _ => {}
            }
            return;
        }

        match c {
            'p' => self.start_checkout(),
            'r' => self.spawn_balance_refresh(),
            'c' => self.view = View::Wallet,
            'l' => self.logout().await,
            'd' | 'x' => {
                if self.focus == Focus::Cart {
                    self.remove_selected();
                }
            }
            '?' => self.view = View::Help,
            'q' => self.should_quit = true,
            _ => {}
        }
    }

    fn move_selection(&mut self, catalog_step: isize, cart_step: isize) {
        if self.view != View::Shop {
            return;
        }
        match self.focus {
            Focus::Catalog => {
                let next = self.catalog_index as isize + catalog_step;
                if (0..CATALOG.len() as isize).contains(&next) {
                    self.catalog_index = next as usize;
                }
            }
            Focus::Cart => {
                let next = self.cart_index as isize + cart_step;
                if (0..self.shop.cart().len() as isize).contains(&next) {
                    self.cart_index = next as usize;
                }
            }
        }
    }

    fn add_selected(&mut self) {
        let item = self.selected_item();
        self.shop.add_item(item);
    }

    fn remove_selected(&mut self) {
        self.shop.remove_item(self.cart_index);
        self.clamp_cart_index();
    }

    fn clamp_cart_index(&mut self) {
        self.cart_index = self.cart_index.min(self.shop.cart().len().saturating_sub(1));
    }

    /// Kick off a payment for the current cart
    pub fn start_checkout(&mut self) {
        match self.shop.begin_checkout() {
            Ok(job) => {
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let completion = job.run().await;
                    tx.send(AppEvent::CheckoutFinished(completion)).await.ok();
                });
            }
            Err(CheckoutError::NotConnected) => {
                self.view = View::Wallet;
            }
            // Anything else is already reflected in the checkout state
            Err(_) => {}
        }
    }

    /// Re-read the wallet balance in the background
    pub fn spawn_balance_refresh(&self) {
        if let Some(refresh) = self.shop.balance_refresh() {
            self.spawn_refresh(refresh);
        }
    }

    fn spawn_refresh(&self, refresh: BalanceRefresh) {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let address = refresh.address();
            let balance = refresh.run().await;
            tx.send(AppEvent::BalanceUpdated { address, balance }).await.ok();
        });
    }

    fn close_wallet(&mut self) {
        self.view = View::Shop;
        self.wallet_show_input = false;
        self.wallet_input.clear();
    }

    async fn import_wallet(&mut self) {
        if !self.wallet_show_input || self.wallet_input.trim().is_empty() {
            return;
        }

        let key = std::mem::take(&mut self.wallet_input);
        self.wallet_show_input = false;

        match self.shop.connect_with_key(&key) {
            Ok(_) => {
                self.persist_key(&key).await;
                self.spawn_balance_refresh();
                self.wallet_notice = None;
                self.view = View::Shop;
            }
            Err(e) => {
                self.wallet_notice = Some(e.to_string());
            }
        }
    }

    async fn create_wallet(&mut self) {
        let key = self.shop.create_wallet();
        self.persist_key(&key).await;
        self.spawn_balance_refresh();
        self.wallet_notice = Some(
            "New wallet created. Fund it with Base Sepolia USDC to start shopping.".to_string(),
        );
    }

    async fn persist_key(&mut self, key: &str) {
        if let Err(e) = self.key_storage.save(key).await {
            error!("Failed to save wallet: {}", e);
            self.wallet_notice = Some(format!("Wallet connected but not saved: {}", e));
        }
    }

    async fn logout(&mut self) {
        self.shop.logout();
        if let Err(e) = self.key_storage.clear().await {
            error!("Failed to remove stored wallet: {}", e);
        }
        info!("Logged out");
        self.view = View::Wallet;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{CheckoutPhase, CheckoutSettings, EMPTY_CART_MESSAGE};
    use crate::ledger::balance::tests::ScriptedLedger;
    use crate::payment::{PaidResponse, PaymentConnector, PaymentError, PaymentFetcher};
    use crate::wallet::WalletSession;
    use async_trait::async_trait;
    use ethers::signers::LocalWallet;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tempfile::TempDir;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    struct PaidFetcher;

    #[async_trait]
    impl PaymentFetcher for PaidFetcher {
        async fn get(&self, _url: &str) -> Result<PaidResponse, PaymentError> {
            Ok(PaidResponse {
                status: reqwest::StatusCode::OK,
                body: br#"{"success":true}"#.to_vec(),
                settlement: None,
            })
        }
    }

    struct PaidConnector;

    impl PaymentConnector for PaidConnector {
        fn connect(&self, _signer: &LocalWallet) -> Result<Arc<dyn PaymentFetcher>, PaymentError> {
            Ok(Arc::new(PaidFetcher))
        }
    }

    fn app(session: WalletSession, dir: &TempDir) -> App {
        let shop = Shop::new(
            session,
            Arc::new(ScriptedLedger::fixed(5000)),
            Arc::new(PaidConnector),
            CheckoutSettings::new("http://shop.test"),
        );
        App::new(shop, KeyStorage::with_path(dir.path().to_path_buf()))
    }

    fn char_key(c: char) -> AppAction {
        AppAction::Input(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[tokio::test]
    async fn test_starts_in_wallet_view_without_session() {
        let dir = TempDir::new().unwrap();
        let app = app(WalletSession::disconnected(), &dir);
        assert_eq!(app.view, View::Wallet);
    }

    #[tokio::test]
    async fn test_grid_navigation_and_add() {
        let dir = TempDir::new().unwrap();
        let mut app = app(WalletSession::disconnected(), &dir);
        app.view = View::Shop;

        app.handle_action(AppAction::Right).await;
        app.handle_action(AppAction::Right).await;
        assert_eq!(app.selected_item().name, "Pizza");
        app.handle_action(AppAction::Down).await;
        assert_eq!(app.selected_item().name, "Soda");
        // Off the bottom of the grid
        app.handle_action(AppAction::Down).await;
        assert_eq!(app.selected_item().name, "Soda");
        app.handle_action(AppAction::Left).await;
        app.handle_action(AppAction::Submit).await;
        app.handle_action(AppAction::Submit).await;

        assert_eq!(app.shop.cart().glyphs(), vec!["🍫", "🍫"]);
    }

    #[tokio::test]
    async fn test_remove_from_cart_keeps_cursor_in_bounds() {
        let dir = TempDir::new().unwrap();
        let mut app = app(WalletSession::disconnected(), &dir);
        app.view = View::Shop;
        app.handle_action(AppAction::Submit).await;
        app.handle_action(AppAction::Submit).await;

        app.handle_action(AppAction::NextField).await;
        app.handle_action(AppAction::Down).await;
        assert_eq!(app.cart_index, 1);
        app.handle_action(AppAction::DeleteKey).await;
        assert_eq!(app.cart_index, 0);
        app.handle_action(char_key('d')).await;
        assert!(app.shop.cart().is_empty());
    }

    #[tokio::test]
    async fn test_pay_without_wallet_opens_wallet_view() {
        let dir = TempDir::new().unwrap();
        let mut app = app(WalletSession::disconnected(), &dir);
        app.view = View::Shop;
        app.handle_action(AppAction::Submit).await;

        app.handle_action(char_key('p')).await;
        assert_eq!(app.view, View::Wallet);
        assert_eq!(app.shop.state().phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_pay_with_empty_cart_shows_message() {
        let dir = TempDir::new().unwrap();
        let mut app = app(WalletSession::connected(LocalWallet::new(&mut rand::thread_rng())), &dir);

        app.handle_action(char_key('p')).await;
        assert_eq!(app.shop.state().error.as_deref(), Some(EMPTY_CART_MESSAGE));
    }

    #[tokio::test]
    async fn test_background_checkout_reports_back() {
        let dir = TempDir::new().unwrap();
        let mut app = app(WalletSession::connected(LocalWallet::new(&mut rand::thread_rng())), &dir);
        app.shop.refresh_balance().await;
        app.handle_action(AppAction::Submit).await;

        app.handle_action(char_key('p')).await;
        assert!(app.shop.state().is_paying);

        let event = app.event_rx.recv().await.unwrap();
        app.handle_event(event);

        assert_eq!(app.shop.state().phase(), CheckoutPhase::Success);
        assert!(app.shop.cart().is_empty());
        assert!(!app.shop.state().is_paying);

        // The post-payment balance read arrives separately
        let event = app.event_rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::BalanceUpdated { .. }));
        app.handle_event(event);
        assert_eq!(app.shop.balance(), Some(dec!(0.005)));
    }

    #[tokio::test]
    async fn test_connecting_fetches_balance() {
        let dir = TempDir::new().unwrap();
        let mut app = app(WalletSession::disconnected(), &dir);

        app.handle_action(char_key('e')).await;
        for c in TEST_KEY.chars() {
            app.handle_action(char_key(c)).await;
        }
        app.handle_action(AppAction::Submit).await;
        assert_eq!(app.shop.balance(), None);

        let event = app.event_rx.recv().await.unwrap();
        match &event {
            AppEvent::BalanceUpdated { address, balance } => {
                assert_eq!(Some(*address), app.shop.session().address());
                assert_eq!(*balance, Some(dec!(0.005)));
            }
            other => panic!("unexpected event {:?}", other),
        }
        app.handle_event(event);
        assert_eq!(app.shop.balance(), Some(dec!(0.005)));
    }

    #[tokio::test]
    async fn test_created_wallet_fetches_balance() {
        let dir = TempDir::new().unwrap();
        let mut app = app(WalletSession::disconnected(), &dir);

        app.handle_action(char_key('g')).await;
        assert!(app.shop.session().is_connected());

        let event = app.event_rx.recv().await.unwrap();
        app.handle_event(event);
        assert_eq!(app.shop.balance(), Some(dec!(0.005)));
    }

    #[tokio::test]
    async fn test_import_and_logout_persist() {
        let dir = TempDir::new().unwrap();
        let mut app = app(WalletSession::disconnected(), &dir);

        app.handle_action(char_key('e')).await;
        for c in TEST_KEY.chars() {
            app.handle_action(char_key(c)).await;
        }
        app.handle_action(AppAction::Submit).await;

        assert_eq!(app.view, View::Shop);
        assert_eq!(app.shop.session().short_address().as_deref(), Some("0xf39f...2266"));
        assert_eq!(app.key_storage.load().await.unwrap().as_deref(), Some(TEST_KEY));

        app.handle_action(char_key('l')).await;
        assert!(!app.shop.session().is_connected());
        assert_eq!(app.key_storage.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bad_key_shows_notice() {
        let dir = TempDir::new().unwrap();
        let mut app = app(WalletSession::disconnected(), &dir);

        app.handle_action(char_key('e')).await;
        app.handle_action(char_key('z')).await;
        app.handle_action(AppAction::Submit).await;

        assert_eq!(app.view, View::Wallet);
        assert!(app.wallet_notice.is_some());
        assert!(!app.shop.session().is_connected());
    }
}
