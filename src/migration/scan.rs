//! Paged key-prefix scans and in-place bulk rewrites.

use crate::core::{Document, Result};
use crate::storage::{AllDocsQuery, DocumentStore};

/// Counters reported by [`rewrite_prefix`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub scanned: usize,
    pub rewritten: usize,
}

/// Collect every document whose key starts with `prefix`, one page at a time.
pub async fn scan_prefix(
    store: &dyn DocumentStore,
    prefix: &str,
    page_size: usize,
) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    rewrite_prefix(store, prefix, page_size, |_, doc| {
        documents.push(doc.clone());
        Ok(false)
    })
    .await?;
    Ok(documents)
}

/// Visit every document under `prefix` in key order and write back the ones
/// the callback reports as changed.
///
/// The callback receives the document's position in the full scan, so a
/// rerun after a partial failure sees the same positions. Each write is
/// independent: a failure stops the scan but earlier writes stay committed.
pub async fn rewrite_prefix<F>(
    store: &dyn DocumentStore,
    prefix: &str,
    page_size: usize,
    mut rewrite: F,
) -> Result<RewriteStats>
where
    F: FnMut(usize, &mut Document) -> Result<bool> + Send,
{
    let page_size = page_size.max(1);
    let mut stats = RewriteStats::default();
    let mut query = AllDocsQuery::prefix(prefix).limit(page_size);

    loop {
        let page = store.all_docs(&query).await?;
        let next_query = match page.last() {
            Some(last) => query.clone().start_after(last.id.clone()),
            None => break,
        };
        let page_len = page.len();

        for mut doc in page {
            let changed = rewrite(stats.scanned, &mut doc)?;
            stats.scanned += 1;
            if changed {
                store.put(doc).await?;
                stats.rewritten += 1;
            }
        }

        if page_len < page_size {
            break;
        }
        query = next_query;
    }

    Ok(stats)
}
