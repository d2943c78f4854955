//! Collects every block of a document by walking the parent/children
//! relationship breadth-first. The walk is iterative: a queue of ids to
//! expand is read through an index cursor, so neither document depth nor
//! document size costs call stack or quadratic dequeues.
//!
//! Failures are contained to the block whose children were being listed.
//! That block's branch stops, everything collected so far is kept, and the
//! walk moves on to the next queued id. A single broken subtree therefore
//! leaves a hole in the article instead of failing the whole fetch.

use crate::client::BlockSource;
use crate::raw::RawBlock;

/// Returns every block transitively reachable from `root_id`, in
/// breadth-first order. Blocks are returned exactly once provided the API's
/// parent/children graph is acyclic.
pub async fn fetch_all_blocks<S>(source: &S, root_id: &str) -> Vec<RawBlock>
where
    S: BlockSource + ?Sized,
{
    let mut blocks: Vec<RawBlock> = Vec::new();
    let mut queue: Vec<String> = vec![root_id.to_owned()];
    let mut front = 0;

    while front < queue.len() {
        let start = blocks.len();
        fetch_children(source, &queue[front], &mut blocks).await;
        front += 1;

        queue.extend(
            blocks[start..]
                .iter()
                .filter(|block| block.has_children)
                .map(|block| block.id.clone()),
        );
    }

    log::debug!(
        "fetched {} blocks under {} ({} expanded)",
        blocks.len(),
        root_id,
        queue.len()
    );
    blocks
}

// Appends all pages of `block_id`'s children onto `out`. Stops early, keeping
// what was already appended, when a page can't be fetched.
async fn fetch_children<S>(source: &S, block_id: &str, out: &mut Vec<RawBlock>)
where
    S: BlockSource + ?Sized,
{
    let mut cursor: Option<String> = None;
    loop {
        let page = match source.list_children(block_id, cursor.as_deref()).await
        {
            Ok(page) => page,
            Err(err) => {
                log::error!(
                    "Failed to fetch children for block {}: {}",
                    block_id,
                    err
                );
                return;
            }
        };
        out.extend(page.results);

        if !page.has_more {
            return;
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => {
                log::warn!(
                    "children of block {} report more pages without a cursor",
                    block_id
                );
                return;
            }
        }
    }
}
