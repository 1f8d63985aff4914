//! Admission drill.

use clap::Args;
use serde::Serialize;

use turnstile_core::error::AppError;
use turnstile_core::types::{ActorId, ResourceId};
use turnstile_engine::AdmissionOutcome;
use turnstile_entity::resource::Resource;
use turnstile_store::StoreStats;

use super::{Drill, join_callers};
use crate::output;

/// Arguments for the admission drill
#[derive(Debug, Args)]
pub struct AdmissionArgs {
    /// Admission slots on the resource
    #[arg(long, default_value_t = 1)]
    pub capacity: u32,

    /// Distinct actors requesting concurrently
    #[arg(long, default_value_t = 10)]
    pub actors: u32,
}

#[derive(Debug, Serialize)]
struct AdmissionReport {
    resource: Resource,
    actors: u32,
    admitted: usize,
    waitlisted: usize,
    positions: Vec<u64>,
    positions_contiguous: bool,
    errors: Vec<String>,
    store: StoreStats,
}

/// Run the admission drill
pub async fn execute(args: &AdmissionArgs, drill: &Drill) -> Result<(), AppError> {
    let engine = drill.engines.admission.clone();
    let resource_id = ResourceId::new();
    engine.create_resource(resource_id, args.capacity).await?;

    let tasks = (0..args.actors)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .request_admission(resource_id, ActorId::new())
                    .await
            })
        })
        .collect();

    let mut admitted = 0;
    let mut positions = Vec::new();
    let mut errors = Vec::new();
    for result in join_callers(tasks).await? {
        match result {
            Ok(AdmissionOutcome::Admitted) => admitted += 1,
            Ok(AdmissionOutcome::Waitlisted { position }) => positions.push(position),
            Err(e) => errors.push(e.to_string()),
        }
    }
    positions.sort_unstable();
    let positions_contiguous = positions
        .iter()
        .zip(1u64..)
        .all(|(position, expected)| *position == expected);

    output::print_report(&AdmissionReport {
        resource: engine.resource(resource_id).await?,
        actors: args.actors,
        admitted,
        waitlisted: positions.len(),
        positions,
        positions_contiguous,
        errors,
        store: drill.store.stats(),
    })
}
