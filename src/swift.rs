// src/swift.rs
//
// Entry point of the `filter` command: load patterns, index them, stream the
// haystack records through the filter in parallel batches and write hits.

use anyhow::Result;

use crate::defaults::RECORD_BATCH_SIZE;
use crate::index::DnaQGramIndex;
use crate::io::{FastaReader, HitWriter, SeqRecord};
use crate::pipeline::filter_records;
use crate::swift_opt::{MatchMode, SwiftOpt};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Totals over one run of the `filter` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub patterns: usize,
    pub records: usize,
    pub bases: u64,
    pub hits: u64,
}

pub fn main_filter(
    patterns_file: &Path,
    haystack_file: &Path,
    output: Option<&Path>,
    opt: &SwiftOpt,
) -> Result<RunSummary> {
    if let Err(problems) = opt.validate() {
        for p in &problems {
            log::error!("{}", p);
        }
        anyhow::bail!("invalid filter options ({} problems)", problems.len());
    }

    let patterns = FastaReader::new(patterns_file)
        .and_then(|mut r| r.read_all())
        .map_err(|e| anyhow::anyhow!("Error reading patterns {}: {}", patterns_file.display(), e))?;
    if patterns.is_empty() {
        anyhow::bail!("No patterns found in {}", patterns_file.display());
    }
    let pattern_names: Vec<String> = patterns.iter().map(|p| p.name.clone()).collect();
    let pattern_seqs: Vec<&[u8]> = patterns.iter().map(|p| p.seq.as_slice()).collect();

    let index = DnaQGramIndex::new(&pattern_seqs, opt.qgram_len)
        .map_err(|e| anyhow::anyhow!("Error building q-gram index: {}", e))?;
    log::info!(
        "Indexed {} patterns ({} distinct {}-grams)",
        index.pattern_count(),
        index.distinct_qgrams(),
        opt.qgram_len
    );
    match opt.match_mode {
        MatchMode::SemiGlobal => log::info!(
            "Semi-global filter: error rate {}, {:?} buckets",
            opt.error_rate,
            opt.geometry
        ),
        MatchMode::Local => log::info!(
            "Local filter: error rate {}, min length {}, {:?} buckets",
            opt.error_rate,
            opt.min_match_length.unwrap_or_default(),
            opt.geometry
        ),
    }

    let out: Box<dyn Write> = match output {
        Some(file_name) => Box::new(File::create(file_name).map_err(|e| {
            anyhow::anyhow!("Error creating output file {}: {}", file_name.display(), e)
        })?),
        None => Box::new(io::stdout()),
    };
    let mut writer = HitWriter::new(BufWriter::new(out));

    let mut reader = FastaReader::new(haystack_file).map_err(|e| {
        anyhow::anyhow!("Error opening haystack {}: {}", haystack_file.display(), e)
    })?;

    let mut summary = RunSummary {
        patterns: patterns.len(),
        ..Default::default()
    };
    let mut batch: Vec<SeqRecord> = Vec::with_capacity(RECORD_BATCH_SIZE);

    loop {
        batch.clear();
        while batch.len() < RECORD_BATCH_SIZE {
            match reader.read_record() {
                Ok(Some(record)) => batch.push(record),
                Ok(None) => break,
                Err(e) => {
                    return Err(anyhow::anyhow!(
                        "Error reading haystack {}: {}",
                        haystack_file.display(),
                        e
                    ));
                }
            }
        }
        if batch.is_empty() {
            break;
        }

        let results = filter_records(&index, &batch, opt)
            .map_err(|e| anyhow::anyhow!("Error filtering records: {}", e))?;
        for result in &results {
            let record = &batch[result.record];
            writer
                .write_hits(&record.name, &result.hits, &pattern_names)
                .map_err(|e| anyhow::anyhow!("Error writing hits: {}", e))?;
            summary.bases += record.seq.len() as u64;
            summary.hits += result.hits.len() as u64;
        }
        summary.records += batch.len();
        log::debug!("Processed {} records so far", summary.records);
    }

    writer
        .flush()
        .map_err(|e| anyhow::anyhow!("Error flushing output: {}", e))?;

    log::info!(
        "Filtered {} records ({} bp) against {} patterns: {} candidate windows",
        summary.records,
        summary.bases,
        summary.patterns,
        summary.hits
    );
    Ok(summary)
}
