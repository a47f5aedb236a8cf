//! Multi-record filtering.
//!
//! A filter pass is strictly sequential, so parallelism comes from running
//! many haystack records at once. Each record gets its own [`SwiftFinder`]
//! with its own clone of a prepared [`BucketStore`]; the index is shared
//! read-only. Results come back in record order regardless of scheduling.

use rayon::prelude::*;

use crate::error::Result;
use crate::filter::{BucketStore, Hit, ScanStats, SwiftFinder};
use crate::index::QGramIndex;
use crate::io::SeqRecord;
use crate::swift_opt::SwiftOpt;

/// Hits of one haystack record.
#[derive(Debug, Clone)]
pub struct RecordHits {
    /// Position of the record in the input slice
    pub record: usize,
    pub hits: Vec<Hit>,
    pub stats: ScanStats,
}

/// Filter every record against every indexed pattern, in parallel.
///
/// Configuration problems are reported before any record is scanned.
pub fn filter_records<I>(index: &I, records: &[SeqRecord], opt: &SwiftOpt) -> Result<Vec<RecordHits>>
where
    I: QGramIndex + Sync,
{
    let template = BucketStore::new(index.pattern_lengths(), opt)?;
    // surface option/index mismatches once instead of per record
    SwiftFinder::with_store(index, &[], template.clone(), opt)?;

    records
        .par_iter()
        .enumerate()
        .map(|(i, record)| -> Result<RecordHits> {
            log::debug!("Filtering record {} ({} bp)", record.name, record.seq.len());
            let mut finder = SwiftFinder::with_store(index, &record.seq, template.clone(), opt)?;
            let hits = finder.finish();
            Ok(RecordHits {
                record: i,
                hits,
                stats: *finder.stats(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DnaQGramIndex;

    fn records() -> Vec<SeqRecord> {
        vec![
            SeqRecord::new("r0", "TTTTTTTTTTTTTTTTTTTT"),
            SeqRecord::new("r1", "TTTTTACGTACGTACTTTTT"),
            SeqRecord::new("r2", ""),
            SeqRecord::new("r3", "GGGGGATTACAGCTGGGGGGGACGTATGTACGG"),
        ]
    }

    #[test]
    fn test_results_in_record_order() {
        let index = DnaQGramIndex::new(&["ACGTACGTAC", "GATTACAGCT"], 4).unwrap();
        let opt = SwiftOpt::semi_global(0.1, 4);
        let records = records();
        let results = filter_records(&index, &records, &opt).unwrap();

        assert_eq!(results.len(), 4);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.record, i);
            assert_eq!(r.stats.positions, records[i].seq.len() as u64);
        }
        assert!(results[0].hits.is_empty());
        assert!(!results[1].hits.is_empty());
        assert!(results[2].hits.is_empty());
        let patterns: Vec<usize> = results[3].hits.iter().map(|h| h.pattern_id).collect();
        assert!(patterns.contains(&0));
        assert!(patterns.contains(&1));
    }

    #[test]
    fn test_matches_sequential_filtering() {
        let index = DnaQGramIndex::new(&["ACGTACGTAC", "GATTACAGCT"], 4).unwrap();
        let opt = SwiftOpt::semi_global(0.1, 4);
        let records = records();
        let results = filter_records(&index, &records, &opt).unwrap();
        for (record, result) in records.iter().zip(&results) {
            let sequential: Vec<Hit> = SwiftFinder::new(&index, &record.seq, &opt)
                .unwrap()
                .into_hits()
                .collect();
            assert_eq!(sequential, result.hits);
        }
    }

    #[test]
    fn test_bad_options_fail_up_front() {
        let index = DnaQGramIndex::new(&["ACGTACGTAC"], 4).unwrap();
        let opt = SwiftOpt::semi_global(0.1, 5);
        assert!(filter_records(&index, &records(), &opt).is_err());
        assert!(filter_records(&index, &[], &opt).is_err());
    }
}
