//! Unreferenced-object removal. Runs last so that everything the earlier
//! passes orphaned (unembedded font programs, the stripped XMP stream,
//! deduplicated copies) goes out in one sweep.

use lopdf::ObjectId;

use super::{counts, Counts, PassCtx};
use crate::errors::Result;
use crate::graph::reachable_set;

pub(crate) fn run(ctx: &mut PassCtx<'_>) -> Result<Counts> {
    let reachable = reachable_set(ctx.doc);
    let doomed: Vec<ObjectId> = ctx
        .doc
        .objects
        .keys()
        .filter(|id| !reachable.contains(id))
        .copied()
        .collect();

    for id in &doomed {
        ctx.doc.objects.remove(id);
    }
    if !doomed.is_empty() {
        log::debug!("pruned {} unreachable objects", doomed.len());
    }

    Ok(counts(&[("removed", doomed.len() as i64)]))
}
