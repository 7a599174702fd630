//! Historical ledger backfill tool
//!
//! Replays exported business records (JSON) through the posting rules to
//! retroactively populate the general ledger. Idempotent: records that
//! already have a journal entry for their reference are skipped, so the
//! tool can be re-run safely.
//!
//! # Usage
//! ```bash
//! backfill_gl --tenant TENANT_ID --file records.json [--user USER_ID]
//! ```

use chrono::Utc;
use std::env;
use tracing_subscriber::EnvFilter;

use ledger_rs::coa;
use ledger_rs::config::Config;
use ledger_rs::db;
use ledger_rs::services::backfill_service::{self, BackfillRecord};
use ledger_rs::services::posting_service::PostingContext;

struct Args {
    tenant_id: String,
    file: String,
    user_id: String,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let args: Vec<String> = env::args().collect();

        let mut tenant_id = None;
        let mut file = None;
        let mut user_id = "backfill".to_string();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--tenant" => {
                    if i + 1 < args.len() {
                        tenant_id = Some(args[i + 1].clone());
                        i += 2;
                    } else {
                        return Err("--tenant requires a value".to_string());
                    }
                }
                "--file" => {
                    if i + 1 < args.len() {
                        file = Some(args[i + 1].clone());
                        i += 2;
                    } else {
                        return Err("--file requires a value".to_string());
                    }
                }
                "--user" => {
                    if i + 1 < args.len() {
                        user_id = args[i + 1].clone();
                        i += 2;
                    } else {
                        return Err("--user requires a value".to_string());
                    }
                }
                other => {
                    return Err(format!("Unknown argument: {other}"));
                }
            }
        }

        let usage = "Usage: backfill_gl --tenant TENANT_ID --file records.json [--user USER_ID]";
        let tenant_id = tenant_id.ok_or_else(|| usage.to_string())?;
        let file = file.ok_or_else(|| usage.to_string())?;

        Ok(Args {
            tenant_id,
            file,
            user_id,
        })
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = match Args::parse() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let config = Config::from_env().expect("Failed to load configuration from environment");

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // The backfill posts strictly; an incomplete chart should fail here,
    // before any record is replayed.
    coa::verify_chart(&pool, &args.tenant_id)
        .await
        .expect("Chart of accounts is incomplete; seed it before backfilling");

    let raw = std::fs::read_to_string(&args.file)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", args.file));
    let records: Vec<BackfillRecord> =
        serde_json::from_str(&raw).expect("Failed to parse backfill records");

    tracing::info!(
        tenant_id = %args.tenant_id,
        file = %args.file,
        record_count = records.len(),
        "Starting ledger backfill"
    );

    let ctx = PostingContext {
        tenant_id: args.tenant_id,
        user_id: args.user_id,
    };

    let summary = backfill_service::replay(&pool, &ctx, records, Utc::now().date_naive())
        .await
        .expect("Backfill failed");

    println!(
        "{}",
        serde_json::to_string_pretty(&summary).expect("Failed to serialize summary")
    );

    if !summary.trial_balanced {
        eprintln!("WARNING: trial balance does not balance after backfill");
        std::process::exit(1);
    }
}
