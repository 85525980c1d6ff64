use clap::{Parser, Subcommand};
use ethers::types::Address;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use x402_shop::{
    config::Config,
    ledger::{usdc_balance, Erc20Ledger},
    routes::create_router,
    tui, utils, AppState,
};

#[derive(Parser)]
#[command(author, version, about = "Pay-per-request storefront over x402", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the payment-gated API server (default)
    Serve,
    /// Open the terminal storefront
    Shop,
    /// Print the USDC balance of an address
    Balance {
        address: Address,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Shop => {
            let log_dir = tui::key_storage(&config)
                .wallet_path()
                .parent()
                .map(|dir| dir.join("logs"))
                .unwrap_or_else(|| "logs".into());
            let _guard = utils::init_file_logger(&log_dir)?;
            tui::run(config).await
        }
        Command::Balance { address } => {
            utils::init_logger();
            let ledger = Erc20Ledger::new(&config.chain.rpc_url, config.chain.usdc_address)?;
            let balance = usdc_balance(&ledger, address).await?;
            println!("{:?}: {} USDC", address, balance);
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    utils::init_logger();
    info!("Configuration loaded: {:?}", config.server);
    info!(
        "Charging {} for /api/premium on {}, paid to {:?}",
        config.payment.price, config.payment.network, config.payment.pay_to
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(config);
    let app = create_router(state);

    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
