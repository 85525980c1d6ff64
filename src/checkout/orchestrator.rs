//! Checkout Orchestrator
//!
//! [`Shop`] owns the session-scoped pieces (cart, checkout state, balance
//! gate, wallet session) and runs the pay flow in two halves:
//!
//! 1. [`Shop::begin_checkout`] evaluates the guards synchronously and, if the
//!    payment can go ahead, flips to `Paying` and hands back a [`CheckoutJob`].
//! 2. [`CheckoutJob::run`] does the payment-wrapped request under the
//!    checkout timeout without borrowing the shop, so the UI can keep drawing
//!    while it runs. Its [`CheckoutCompletion`] is fed back through
//!    [`Shop::complete_checkout`], which settles the state and, after a
//!    success, hands back a [`BalanceRefresh`] to run separately.
//!
//! [`Shop::checkout`] chains these for callers that can simply wait.

use super::{
    success_message, transition, CheckoutError, CheckoutEvent, CheckoutState,
    FALLBACK_FAILURE_MESSAGE, PAYMENT_FAILED_MESSAGE,
};
use crate::cart::Cart;
use crate::catalog::CatalogItem;
use crate::ledger::{fetch_balance, BalanceGate, LedgerClient};
use crate::payment::{PaymentConnector, PaymentError};
use crate::wallet::WalletSession;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(60);

/// Body returned by the gated resource
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Full URL of the gated resource
    pub endpoint: String,
    pub timeout: Duration,
}

impl CheckoutSettings {
    pub fn new(api_base_url: &str) -> Self {
        Self {
            endpoint: format!("{}/api/premium", api_base_url.trim_end_matches('/')),
            timeout: DEFAULT_CHECKOUT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct Shop {
    cart: Cart,
    state: CheckoutState,
    gate: BalanceGate,
    session: WalletSession,
    connector: Arc<dyn PaymentConnector>,
    settings: CheckoutSettings,
}

impl Shop {
    pub fn new(
        session: WalletSession,
        ledger: Arc<dyn LedgerClient>,
        connector: Arc<dyn PaymentConnector>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            cart: Cart::new(),
            state: CheckoutState::default(),
            gate: BalanceGate::new(ledger),
            session,
            connector,
            settings,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn balance(&self) -> Option<Decimal> {
        self.gate.balance()
    }

    pub fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    /// Whether the pay action should be enabled
    pub fn can_submit(&self) -> bool {
        !self.state.is_paying && !self.cart.is_empty()
    }

    pub fn add_item(&mut self, item: &'static CatalogItem) {
        self.cart.add(item);
        self.apply(CheckoutEvent::ItemAdded);
    }

    pub fn remove_item(&mut self, index: usize) {
        self.cart.remove(index);
    }

    /// Connect a wallet by private key. Balance is not fetched here; call
    /// [`Shop::refresh_balance`] or spawn a [`BalanceRefresh`].
    pub fn connect_with_key(&mut self, private_key: &str) -> crate::types::AppResult<Address> {
        let address = self.session.connect_with_key(private_key)?;
        self.gate.reset();
        Ok(address)
    }

    /// Create and connect a fresh wallet, returning its private key
    pub fn create_wallet(&mut self) -> String {
        let key = self.session.create();
        self.gate.reset();
        key
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.gate.reset();
    }

    pub async fn refresh_balance(&mut self) -> Option<Decimal> {
        match self.session.address() {
            Some(address) => self.gate.refresh_balance(address).await,
            None => None,
        }
    }

    /// A detached balance read for the connected wallet
    pub fn balance_refresh(&self) -> Option<BalanceRefresh> {
        self.session.address().map(|address| BalanceRefresh {
            ledger: self.gate.ledger(),
            address,
        })
    }

    /// Apply a balance fetched by a [`BalanceRefresh`]; stale answers for a
    /// wallet that is no longer connected are dropped
    pub fn record_balance(&mut self, address: Address, balance: Decimal) {
        if self.session.address() == Some(address) {
            self.gate.record(balance);
        }
    }

    /// Evaluate the guards and, if payment can proceed, enter `Paying`
    pub fn begin_checkout(&mut self) -> Result<CheckoutJob, CheckoutError> {
        let Some(signer) = self.session.signer().cloned() else {
            info!("Checkout requested without a wallet session");
            return Err(CheckoutError::NotConnected);
        };

        if self.state.is_paying {
            warn!("Checkout requested while a payment is in flight");
            return Err(CheckoutError::AlreadyPaying);
        }

        if self.cart.is_empty() {
            return Err(self.fail(CheckoutError::EmptyCart));
        }

        let total = self.cart.total();
        if !self.gate.can_afford(total) {
            return Err(self.fail(CheckoutError::InsufficientFunds { required: total }));
        }

        self.apply(CheckoutEvent::Started);
        info!("Starting checkout of {} item(s), total ${}", self.cart.len(), total);

        Ok(CheckoutJob {
            connector: Arc::clone(&self.connector),
            signer,
            endpoint: self.settings.endpoint.clone(),
            timeout: self.settings.timeout,
            glyphs: self.cart.glyphs(),
        })
    }

    /// Fold a finished job back into the shop. A successful payment hands
    /// back the balance read to run next; the caller decides where it runs.
    pub fn complete_checkout(&mut self, completion: CheckoutCompletion) -> Option<BalanceRefresh> {
        match completion.outcome {
            Ok(message) => {
                self.cart.clear();
                self.apply(CheckoutEvent::Succeeded(message));
                self.balance_refresh()
                    .filter(|refresh| refresh.address() == completion.payer)
            }
            Err(e) => {
                error!("Payment error: {}", e);
                self.apply(CheckoutEvent::Failed(e));
                None
            }
        }
    }

    /// Run a whole checkout attempt in place
    pub async fn checkout(&mut self) -> Result<(), CheckoutError> {
        let job = self.begin_checkout()?;
        let completion = job.run().await;
        let outcome = completion.outcome.clone().map(|_| ());

        if let Some(refresh) = self.complete_checkout(completion) {
            let address = refresh.address();
            if let Some(balance) = refresh.run().await {
                self.record_balance(address, balance);
            }
        }
        outcome
    }

    fn fail(&mut self, error: CheckoutError) -> CheckoutError {
        self.apply(CheckoutEvent::Failed(error.clone()));
        error
    }

    fn apply(&mut self, event: CheckoutEvent) {
        self.state = transition(&self.state, &event);
    }
}

/// Everything a payment attempt needs, detached from the [`Shop`]
pub struct CheckoutJob {
    connector: Arc<dyn PaymentConnector>,
    signer: LocalWallet,
    endpoint: String,
    timeout: Duration,
    /// Cart contents at submission time
    glyphs: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct CheckoutCompletion {
    pub outcome: Result<String, CheckoutError>,
    pub payer: Address,
}

impl CheckoutJob {
    /// Resolves as soon as the payment request does; bounded by the timeout
    pub async fn run(self) -> CheckoutCompletion {
        CheckoutCompletion {
            outcome: self.pay().await,
            payer: self.signer.address(),
        }
    }

    async fn pay(&self) -> Result<String, CheckoutError> {
        let client = self.connector.connect(&self.signer).map_err(classify)?;

        let response = match tokio::time::timeout(self.timeout, client.get(&self.endpoint)).await {
            Ok(result) => result.map_err(classify)?,
            Err(_) => {
                warn!("Payment to {} timed out after {:?}", self.endpoint, self.timeout);
                return Err(CheckoutError::Timeout);
            }
        };

        if let Some(receipt) = &response.settlement {
            info!("Payment settled in transaction {}", receipt.transaction);
        }

        let body: CheckoutResponse = serde_json::from_slice(&response.body).map_err(|e| {
            warn!("Unexpected response from {} ({}): {}", self.endpoint, response.status, e);
            CheckoutError::GenericPaymentFailure(FALLBACK_FAILURE_MESSAGE.to_string())
        })?;

        if response.is_success() && body.success {
            Ok(success_message(&self.glyphs))
        } else {
            let message = body
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| PAYMENT_FAILED_MESSAGE.to_string());
            Err(CheckoutError::GenericPaymentFailure(message))
        }
    }
}

fn classify(error: PaymentError) -> CheckoutError {
    let reason = error.to_string();
    if reason.contains("signing") {
        CheckoutError::SigningFailure(reason)
    } else if reason.trim().is_empty() {
        CheckoutError::GenericPaymentFailure(FALLBACK_FAILURE_MESSAGE.to_string())
    } else {
        CheckoutError::GenericPaymentFailure(reason)
    }
}

/// A detached balance read, for running off the UI loop
pub struct BalanceRefresh {
    ledger: Arc<dyn LedgerClient>,
    address: Address,
}

impl BalanceRefresh {
    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn run(self) -> Option<Decimal> {
        fetch_balance(self.ledger.as_ref(), self.address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find;
    use crate::checkout::{CheckoutPhase, EMPTY_CART_MESSAGE, SIGNING_FAILURE_MESSAGE, TIMEOUT_MESSAGE};
    use crate::ledger::balance::tests::ScriptedLedger;
    use crate::payment::{PaidResponse, PaymentFetcher};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Reply {
        Respond(u16, &'static str),
        Fail(fn() -> PaymentError),
        Hang,
    }

    struct MockFetcher {
        reply: Reply,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PaymentFetcher for MockFetcher {
        async fn get(&self, url: &str) -> Result<PaidResponse, PaymentError> {
            self.requests.lock().unwrap().push(url.to_string());
            match &self.reply {
                Reply::Respond(status, body) => Ok(PaidResponse {
                    status: StatusCode::from_u16(*status).unwrap(),
                    body: body.as_bytes().to_vec(),
                    settlement: None,
                }),
                Reply::Fail(make) => Err(make()),
                Reply::Hang => futures::future::pending().await,
            }
        }
    }

    struct MockConnector {
        fetcher: Arc<MockFetcher>,
        connects: AtomicUsize,
    }

    impl MockConnector {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                fetcher: Arc::new(MockFetcher {
                    reply,
                    requests: Mutex::new(Vec::new()),
                }),
                connects: AtomicUsize::new(0),
            })
        }

        fn requests(&self) -> Vec<String> {
            self.fetcher.requests.lock().unwrap().clone()
        }
    }

    impl PaymentConnector for MockConnector {
        fn connect(&self, _signer: &LocalWallet) -> Result<Arc<dyn PaymentFetcher>, PaymentError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(self.fetcher.clone())
        }
    }

    const PAID: Reply = Reply::Respond(
        200,
        r#"{"success":true,"message":"Checkout complete! Payment received.","timestamp":1700000000000}"#,
    );

    fn connected_session() -> WalletSession {
        WalletSession::connected(LocalWallet::new(&mut rand::thread_rng()))
    }

    /// Shop with a connected wallet whose balance (atomic units) is loaded
    async fn shop_with(balance: u64, connector: Arc<MockConnector>) -> Shop {
        let mut shop = Shop::new(
            connected_session(),
            Arc::new(ScriptedLedger::fixed(balance)),
            connector,
            CheckoutSettings::new("http://shop.test/"),
        );
        shop.refresh_balance().await;
        shop
    }

    fn add(shop: &mut Shop, ids: &[u32]) {
        for id in ids {
            shop.add_item(find(*id).unwrap());
        }
    }

    #[tokio::test]
    async fn test_not_connected_leaves_state_alone() {
        let connector = MockConnector::new(PAID);
        let mut shop = Shop::new(
            WalletSession::disconnected(),
            Arc::new(ScriptedLedger::fixed(5000)),
            connector.clone(),
            CheckoutSettings::new("http://shop.test"),
        );
        add(&mut shop, &[1]);

        assert_eq!(shop.checkout().await, Err(CheckoutError::NotConnected));
        assert_eq!(shop.state(), &CheckoutState::default());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_never_hits_network() {
        let connector = MockConnector::new(PAID);
        let mut shop = shop_with(5000, connector.clone()).await;

        assert_eq!(shop.checkout().await, Err(CheckoutError::EmptyCart));
        assert_eq!(shop.state().error.as_deref(), Some(EMPTY_CART_MESSAGE));
        assert!(!shop.state().is_paying);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert!(connector.requests().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_funds() {
        let connector = MockConnector::new(PAID);
        // 0.0009 USDC against an Apple at 0.001
        let mut shop = shop_with(900, connector.clone()).await;
        add(&mut shop, &[1]);

        let result = shop.checkout().await;
        assert!(matches!(result, Err(CheckoutError::InsufficientFunds { .. })));
        assert!(shop.state().error.as_deref().unwrap().contains("0.001"));
        assert!(connector.requests().is_empty());
        assert_eq!(shop.cart().len(), 1);
    }

    #[tokio::test]
    async fn test_apple_and_pizza_checkout() {
        let connector = MockConnector::new(PAID);
        let mut shop = shop_with(5000, connector.clone()).await;
        add(&mut shop, &[1, 3]);
        assert_eq!(shop.cart().total(), dec!(0.003));

        assert_eq!(shop.checkout().await, Ok(()));

        assert!(shop.cart().is_empty());
        assert_eq!(shop.state().phase(), CheckoutPhase::Success);
        let message = shop.state().success.clone().unwrap();
        assert!(message.contains("🍎 🍕"));
        assert_eq!(connector.requests(), vec!["http://shop.test/api/premium".to_string()]);
    }

    #[tokio::test]
    async fn test_success_refreshes_balance() {
        let connector = MockConnector::new(PAID);
        let ledger = Arc::new(ScriptedLedger::new(vec![
            Ok(ethers::types::U256::from(5000)),
            Ok(ethers::types::U256::from(0)),
        ]));
        let mut shop = Shop::new(
            connected_session(),
            ledger.clone(),
            connector,
            CheckoutSettings::new("http://shop.test"),
        );
        shop.refresh_balance().await;
        add(&mut shop, &[6]);

        shop.checkout().await.unwrap();
        assert_eq!(shop.balance(), Some(Decimal::ZERO));
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 2);
    }

    /// Answers the first balance read, then never answers again
    struct StallingLedger {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LedgerClient for StallingLedger {
        async fn balance_of(&self, _owner: Address) -> crate::types::AppResult<ethers::types::U256> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(ethers::types::U256::from(5000))
            } else {
                futures::future::pending().await
            }
        }
    }

    fn stalling_shop() -> Shop {
        Shop::new(
            connected_session(),
            Arc::new(StallingLedger {
                calls: AtomicUsize::new(0),
            }),
            MockConnector::new(PAID),
            CheckoutSettings::new("http://shop.test"),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_does_not_wait_for_balance_read() {
        let mut shop = stalling_shop();
        shop.refresh_balance().await;
        add(&mut shop, &[1]);

        let job = shop.begin_checkout().unwrap();
        let completion = tokio::time::timeout(Duration::from_secs(3600), job.run())
            .await
            .expect("paid job should resolve");
        let refresh = shop.complete_checkout(completion);

        assert!(!shop.state().is_paying);
        assert!(shop.cart().is_empty());
        assert_eq!(shop.state().phase(), CheckoutPhase::Success);
        assert_eq!(refresh.map(|r| r.address()), shop.session().address());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_balance_read_keeps_last_balance() {
        let mut shop = stalling_shop();
        shop.refresh_balance().await;
        add(&mut shop, &[1]);

        shop.checkout().await.unwrap();
        assert!(shop.cart().is_empty());
        assert_eq!(shop.balance(), Some(dec!(0.005)));
    }

    #[tokio::test]
    async fn test_failed_payment_has_no_balance_read() {
        let connector = MockConnector::new(Reply::Respond(402, r#"{"success":false}"#));
        let mut shop = shop_with(5000, connector).await;
        add(&mut shop, &[1]);

        let job = shop.begin_checkout().unwrap();
        assert!(shop.complete_checkout(job.run().await).is_none());
    }

    #[tokio::test]
    async fn test_glyphs_are_captured_at_submission() {
        let connector = MockConnector::new(PAID);
        let mut shop = shop_with(5000, connector).await;
        add(&mut shop, &[2, 12]);

        let job = shop.begin_checkout().unwrap();
        // Editing the cart mid-payment is allowed
        add(&mut shop, &[9]);
        assert!(shop.state().is_paying);

        let completion = job.run().await;
        shop.complete_checkout(completion);

        assert_eq!(
            shop.state().success.as_deref(),
            Some("🎉 Checkout complete! Enjoy your 🍌 🍪")
        );
        assert!(shop.cart().is_empty());
    }

    #[tokio::test]
    async fn test_second_checkout_while_paying_is_rejected() {
        let connector = MockConnector::new(PAID);
        let mut shop = shop_with(5000, connector.clone()).await;
        add(&mut shop, &[1]);

        let job = shop.begin_checkout().unwrap();
        let paying = shop.state().clone();

        assert!(matches!(shop.begin_checkout(), Err(CheckoutError::AlreadyPaying)));
        assert_eq!(shop.state(), &paying);
        assert!(!shop.can_submit());

        shop.complete_checkout(job.run().await);
        assert!(!shop.state().is_paying);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let connector = MockConnector::new(Reply::Hang);
        let mut shop = shop_with(5000, connector).await;
        add(&mut shop, &[1]);

        assert_eq!(shop.checkout().await, Err(CheckoutError::Timeout));
        assert_eq!(shop.state().error.as_deref(), Some(TIMEOUT_MESSAGE));
        assert!(!shop.state().is_paying);
        assert_eq!(shop.cart().len(), 1);
    }

    #[tokio::test]
    async fn test_payload_failure_message() {
        let connector = MockConnector::new(Reply::Respond(
            200,
            r#"{"success":false,"message":"Out of pizza"}"#,
        ));
        let mut shop = shop_with(5000, connector).await;
        add(&mut shop, &[3]);

        shop.checkout().await.unwrap_err();
        assert_eq!(shop.state().error.as_deref(), Some("Out of pizza"));
        assert_eq!(shop.cart().len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_without_message() {
        let connector = MockConnector::new(Reply::Respond(500, r#"{"success":true}"#));
        let mut shop = shop_with(5000, connector).await;
        add(&mut shop, &[3]);

        shop.checkout().await.unwrap_err();
        assert_eq!(shop.state().error.as_deref(), Some(PAYMENT_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_generic_failure() {
        let connector = MockConnector::new(Reply::Respond(200, "<html>ok</html>"));
        let mut shop = shop_with(5000, connector).await;
        add(&mut shop, &[3]);

        assert_eq!(
            shop.checkout().await,
            Err(CheckoutError::GenericPaymentFailure(FALLBACK_FAILURE_MESSAGE.to_string()))
        );
    }

    #[tokio::test]
    async fn test_signing_failure_hint() {
        let connector = MockConnector::new(Reply::Fail(|| {
            PaymentError::Signing("device rejected request".to_string())
        }));
        let mut shop = shop_with(5000, connector).await;
        add(&mut shop, &[1]);

        let result = shop.checkout().await;
        assert!(matches!(result, Err(CheckoutError::SigningFailure(_))));
        assert_eq!(shop.state().error.as_deref(), Some(SIGNING_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn test_other_failures_surface_reason() {
        let connector = MockConnector::new(Reply::Fail(|| {
            PaymentError::Rejected("insufficient_funds".to_string())
        }));
        let mut shop = shop_with(5000, connector).await;
        add(&mut shop, &[1]);

        shop.checkout().await.unwrap_err();
        assert_eq!(
            shop.state().error.as_deref(),
            Some("Payment rejected: insufficient_funds")
        );
        assert!(!shop.state().is_paying);
    }

    #[tokio::test]
    async fn test_adding_item_clears_messages_but_removing_does_not() {
        let connector = MockConnector::new(PAID);
        let mut shop = shop_with(5000, connector).await;

        shop.checkout().await.unwrap_err();
        assert!(shop.state().error.is_some());

        add(&mut shop, &[1, 2]);
        assert_eq!(shop.state().error, None);

        shop.checkout().await.unwrap();
        add(&mut shop, &[4]);
        assert_eq!(shop.state().success, None);

        let _ = shop.checkout().await;
        let before = shop.state().clone();
        shop.remove_item(0);
        assert_eq!(shop.state(), &before);
    }

    #[tokio::test]
    async fn test_stale_balance_for_other_wallet_is_dropped() {
        let connector = MockConnector::new(PAID);
        let mut shop = shop_with(5000, connector).await;
        let before = shop.balance();

        shop.record_balance(Address::repeat_byte(0x99), Decimal::ONE);
        assert_eq!(shop.balance(), before);
    }
}
