use std::sync::Arc;

use anyhow::Context;
use league_rsvp::channels::OutboundChannel;
use league_rsvp::channels::whatsapp::TwilioWhatsAppChannel;
use league_rsvp::config::AppConfig;
use league_rsvp::server::{AppState, router};
use league_rsvp::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );

    // ── WhatsApp channel ─────────────────────────────────────────────────
    let whatsapp = TwilioWhatsAppChannel::new(config.twilio.clone());
    if !whatsapp.has_credentials() {
        tracing::warn!("Twilio credentials not set; outbound messages will only be logged");
    }
    let channel: Arc<dyn OutboundChannel> = Arc::new(whatsapp);

    // ── HTTP server ──────────────────────────────────────────────────────
    let app = router(AppState::new(db, channel));
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        %addr,
        version = env!("CARGO_PKG_VERSION"),
        "League RSVP server started"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
