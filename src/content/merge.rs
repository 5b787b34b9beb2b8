//! Fan-in merger
//!
//! Combines N concurrently-running providers into one stream, yielding
//! each entry as soon as it becomes ready across all providers. Within one
//! provider the enumeration order is preserved; across providers only a
//! readiness-consistent interleaving is guaranteed. Entries are never
//! duplicated or dropped here; de-duplication is a transformer concern.

use futures::stream;

use crate::content::{ContentProvider, EntryStream};
use crate::core::context::ExpansionContext;

/// Merge the entry streams of all providers, first-ready-wins
pub fn merge_providers(
    providers: &[Box<dyn ContentProvider>],
    ctx: &ExpansionContext,
) -> EntryStream {
    let streams: Vec<EntryStream> = providers.iter().map(|p| p.entries(ctx)).collect();
    Box::pin(stream::select_all(streams))
}
