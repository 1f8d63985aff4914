//! Idempotency drill.

use std::collections::BTreeSet;

use clap::Args;
use serde::Serialize;

use turnstile_core::error::AppError;
use turnstile_core::types::ResultId;
use turnstile_entity::idempotency::{Fingerprint, IdempotencyKey, OperationPayload};
use turnstile_store::StoreStats;

use super::{Drill, join_callers};
use crate::output;

/// Arguments for the idempotency drill
#[derive(Debug, Args)]
pub struct RunOnceArgs {
    /// Concurrent callers sharing one key
    #[arg(long, default_value_t = 5)]
    pub callers: u32,

    /// Amount in minor units folded into the derived key
    #[arg(long, default_value_t = 1250)]
    pub amount_minor: i64,
}

#[derive(Debug, Serialize)]
struct RunOnceReport {
    key: IdempotencyKey,
    callers: u32,
    created: usize,
    result_ids: BTreeSet<ResultId>,
    errors: Vec<String>,
    store: StoreStats,
}

/// Run the idempotency drill
pub async fn execute(args: &RunOnceArgs, drill: &Drill) -> Result<(), AppError> {
    let guard = drill.engines.idempotency.clone();
    let key = guard.derive_key(&Fingerprint {
        operation: "payment".to_string(),
        actor: "drill".to_string(),
        target: "invoice-1".to_string(),
        amount_minor: args.amount_minor,
    });
    let payload = OperationPayload::new(
        "payment",
        serde_json::json!({ "amount_minor": args.amount_minor }),
    );

    let tasks = (0..args.callers)
        .map(|_| {
            let guard = guard.clone();
            let key = key.clone();
            let payload = payload.clone();
            tokio::spawn(async move { guard.run_once(&key, payload).await })
        })
        .collect();

    let mut created = 0;
    let mut result_ids = BTreeSet::new();
    let mut errors = Vec::new();
    for result in join_callers(tasks).await? {
        match result {
            Ok(outcome) => {
                if outcome.created {
                    created += 1;
                }
                result_ids.insert(outcome.result_id);
            }
            Err(e) => errors.push(e.to_string()),
        }
    }

    output::print_report(&RunOnceReport {
        key,
        callers: args.callers,
        created,
        result_ids,
        errors,
        store: drill.store.stats(),
    })
}
