use std::sync::Arc;

use finflow::catalog;
use finflow::config::GatewayConfig;
use finflow::flow::FlowEngine;
use finflow::gateway::HttpGateway;
use finflow::session::SessionContext;
use finflow::surface::{run_flow, ConsoleSurface};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = GatewayConfig::from_env();

    eprintln!("💸 finflow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Service: {}", config.base_url);
    eprintln!();

    let phone = match std::env::args().nth(1) {
        Some(phone) => phone,
        None => {
            eprint!("Enter your mobile number: ");
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            line
        }
    };
    let session = SessionContext::new(phone.trim())?;

    let gateway = Arc::new(HttpGateway::new(&config)?);
    let status = gateway.fetch_status(session.phone_number()).await;
    tracing::info!(%status, "onboarding status");

    let flows = catalog::all_flows()?;
    let mut surface = ConsoleSurface::new();

    match catalog::seed_for_status(&status) {
        Some(seed) => {
            let mut engine =
                FlowEngine::new(flows, catalog::ONBOARDING, session, gateway.clone())?;
            engine.start_seeded(seed).await?;
            run_flow(&mut engine, &mut surface).await?;
        }
        None => {
            eprintln!("✅ You're all set up. Let's create your next goal!");
            let mut engine =
                FlowEngine::new(flows, catalog::CREATE_GOAL, session, gateway.clone())?;
            engine.start().await?;
            run_flow(&mut engine, &mut surface).await?;
        }
    }

    Ok(())
}
