//! Provision the emergency topic (and optionally the reward token)
//!
//! Usage: `setup-topic [--token]`
//!
//! Reads operator credentials from the environment (or `.env`) and prints
//! the variables to add to the web process environment.

use anyhow::Context;
use ledger_bridge::topic::{create_topic, EMERGENCY_TOPIC_MEMO};
use ledger_bridge::types::TopicSpec;
use ledger_bridge::LedgerContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let with_token = std::env::args().skip(1).any(|arg| arg == "--token");

    let ctx = LedgerContext::from_env().context("failed to load ledger configuration")?;
    let conn = ctx
        .client()
        .acquire()
        .context("missing HEDERA_OPERATOR_ID or HEDERA_OPERATOR_KEY")?;

    tracing::info!(
        "Connected to {:?} as operator {}",
        ctx.config().network,
        conn.operator_id()
    );

    let spec = TopicSpec {
        memo: Some(EMERGENCY_TOPIC_MEMO.to_string()),
        submit_key: None,
        admin_key: Some(conn.operator_public_key()),
    };
    let topic = create_topic(&conn, &spec)
        .await
        .context("failed to create emergency topic")?;

    println!("HEDERA_EMERGENCY_TOPIC_ID={}", topic);

    if with_token {
        let token = ctx
            .rewards()
            .create_reward_token()
            .await
            .context("failed to create reward token")?;
        println!("HEDERA_REWARD_TOKEN_ID={}", token);
    }

    ctx.shutdown().await;
    Ok(())
}
