//! Index build: load the corpus, encode every document, write once.
//!
//! Builds are all-or-nothing. Every document is loaded, encoded and checked
//! by [`prepare_entries`] before the collection is touched, so a loader,
//! encoder or duplicate-id failure leaves the collection as it was. This also
//! holds for [`rebuild_index`], which only clears once the new entries are
//! ready.

use crate::embeddings::Encoder;
use crate::loader::load_documents;
use crate::progress::ProgressReporter;
use crate::types::{BuildStats, IndexEntry};
use crate::vector_index::{validate_entries, VectorIndex};
use medrag_core::AppResult;
use std::path::Path;
use std::time::Instant;

/// Load and encode the corpus into index entries without writing anything.
///
/// Entries are checked against `dimensions` and for repeated ids.
///
/// # Errors
/// * `NotFound` if the corpus file is missing
/// * `Input` for a malformed corpus line
/// * `DuplicateId` if the corpus repeats an id
pub async fn prepare_entries(
    corpus_path: &Path,
    encoder: &Encoder,
    dimensions: usize,
    progress: &ProgressReporter,
) -> AppResult<Vec<IndexEntry>> {
    let documents = load_documents(corpus_path)?;
    progress.load(documents.len() as u64, &corpus_path.display().to_string());

    let texts: Vec<String> = documents.iter().map(|doc| doc.indexed_text()).collect();
    let total = texts.len() as u64;
    let mut vectors = Vec::with_capacity(texts.len());

    for batch in texts.chunks(encoder.batch_size()) {
        vectors.extend(encoder.encode_batch(batch).await?);
        progress.embed(vectors.len() as u64, total, encoder.model_name());
    }

    let entries: Vec<IndexEntry> = documents
        .iter()
        .zip(vectors)
        .map(|(doc, vector)| IndexEntry::from_document(doc, vector))
        .collect();

    validate_entries(&entries, dimensions)?;
    Ok(entries)
}

/// Populate `index` from the corpus at `corpus_path` unless it already has entries.
///
/// # Errors
/// Same as [`prepare_entries`].
pub async fn build_index(
    corpus_path: &Path,
    encoder: &Encoder,
    index: &dyn VectorIndex,
    progress: &ProgressReporter,
) -> AppResult<BuildStats> {
    let start = Instant::now();

    let existing = index.count().await?;
    if existing > 0 {
        tracing::info!(
            collection = %index.collection(),
            entries = existing,
            "Index already populated, skipping build"
        );
        return Ok(BuildStats {
            documents: 0,
            entries_added: 0,
            total_entries: existing,
            skipped: true,
            duration_secs: start.elapsed().as_secs_f64(),
        });
    }

    tracing::info!(corpus = ?corpus_path, collection = %index.collection(), "Building index");

    let entries = prepare_entries(corpus_path, encoder, index.dimensions(), progress).await?;
    commit(entries, index, progress, start).await
}

/// Replace the contents of `index` with the corpus at `corpus_path`.
///
/// The collection is cleared only after the whole corpus has been loaded,
/// encoded and checked; on any error before that it keeps its entries.
pub async fn rebuild_index(
    corpus_path: &Path,
    encoder: &Encoder,
    index: &dyn VectorIndex,
    progress: &ProgressReporter,
) -> AppResult<BuildStats> {
    let start = Instant::now();

    tracing::info!(corpus = ?corpus_path, collection = %index.collection(), "Rebuilding index");

    let entries = prepare_entries(corpus_path, encoder, index.dimensions(), progress).await?;
    index.clear().await?;
    commit(entries, index, progress, start).await
}

async fn commit(
    entries: Vec<IndexEntry>,
    index: &dyn VectorIndex,
    progress: &ProgressReporter,
    start: Instant,
) -> AppResult<BuildStats> {
    let documents = entries.len();

    let entries_added = index.add(entries).await?;
    progress.index(entries_added as u64, index.collection());

    let total_entries = index.count().await?;
    let duration = start.elapsed();

    tracing::info!(
        documents,
        entries_added,
        total_entries,
        "Index build completed in {:.2}s",
        duration.as_secs_f64()
    );

    Ok(BuildStats {
        documents,
        entries_added,
        total_entries,
        skipped: false,
        duration_secs: duration.as_secs_f64(),
    })
}
