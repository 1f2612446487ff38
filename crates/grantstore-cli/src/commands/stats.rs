//! Stats command implementation.

use crate::cli::StatsArgs;
use crate::error::Result;
use grantstore_domain::{RecordKind, RecordStore};
use grantstore_store::SqliteStore;
use std::collections::BTreeMap;

/// Execute the stats command.
pub async fn execute_stats(
    args: StatsArgs,
    store: &SqliteStore,
) -> Result<BTreeMap<RecordKind, usize>> {
    let mut counts = BTreeMap::new();
    for kind in RecordKind::ALL {
        counts.insert(kind, store.count(kind).await?);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
    } else {
        for (kind, count) in &counts {
            println!("{:<14}{}", kind, count);
        }
    }

    Ok(counts)
}
