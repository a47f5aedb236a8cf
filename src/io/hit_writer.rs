// Candidate window output
//
// One tab-separated line per hit:
//   record  start  end  pattern  needle_start  needle_end
// Coordinates are 0-based, end-exclusive.

use std::io::{self, Write};

use crate::filter::Hit;

pub struct HitWriter<W: Write> {
    out: W,
    written: u64,
}

impl<W: Write> HitWriter<W> {
    pub fn new(out: W) -> Self {
        HitWriter { out, written: 0 }
    }

    /// Write the hits of one haystack record. `pattern_names` is indexed by
    /// pattern id.
    pub fn write_hits(
        &mut self,
        record: &str,
        hits: &[Hit],
        pattern_names: &[String],
    ) -> io::Result<()> {
        for hit in hits {
            let pattern = pattern_names
                .get(hit.pattern_id)
                .map(String::as_str)
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("hit names unknown pattern {}", hit.pattern_id),
                    )
                })?;
            writeln!(
                self.out,
                "{}\t{}\t{}\t{}\t{}\t{}",
                record,
                hit.haystack_start,
                hit.haystack_end,
                pattern,
                hit.needle_start,
                hit.needle_end
            )?;
        }
        self.written += hits.len() as u64;
        Ok(())
    }

    /// Number of lines written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
