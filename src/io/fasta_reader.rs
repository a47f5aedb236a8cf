// FASTA reader module using bio::io::fasta
//
// Reads pattern and haystack records, plain or gzip-compressed. Compression is
// detected from the gzip magic bytes, so a misnamed file still opens.

use bio::io::fasta;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const BUFFER_SIZE: usize = 4 * 1024 * 1024; // 4MB buffer

/// One named sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    pub name: String,
    pub seq: Vec<u8>,
}

impl SeqRecord {
    pub fn new(name: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        SeqRecord {
            name: name.into(),
            seq: seq.into(),
        }
    }
}

/// FASTA reader with automatic gzip detection
pub struct FastaReader {
    records: fasta::Records<BufReader<Box<dyn Read>>>,
}

/// Detect gzip by its two magic bytes
fn is_gzip(path: &Path) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..])? {
            0 => return Ok(false),
            n => filled += n,
        }
    }
    Ok(magic == [0x1f, 0x8b])
}

impl FastaReader {
    /// Open a FASTA file (.fa, .fasta, .fa.gz, .fasta.gz)
    ///
    /// Multi-member gzip (including BGZF) is decompressed sequentially.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader: Box<dyn Read> = if is_gzip(path)? {
            log::debug!("Detected gzip input: {}", path.display());
            Box::new(BufReader::with_capacity(BUFFER_SIZE, MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::with_capacity(BUFFER_SIZE, file))
        };
        Ok(Self::from_reader(reader))
    }

    /// Read FASTA from any byte stream (already decompressed).
    pub fn from_reader(reader: Box<dyn Read>) -> Self {
        Self {
            records: fasta::Reader::new(reader).records(),
        }
    }

    /// Read the next FASTA record
    ///
    /// Returns `Ok(Some(record))` if a record is found, `Ok(None)` at EOF,
    /// and `Err(e)` on a parse error.
    pub fn read_record(&mut self) -> io::Result<Option<SeqRecord>> {
        match self.records.next() {
            Some(Ok(record)) => Ok(Some(SeqRecord::new(record.id(), record.seq()))),
            Some(Err(e)) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
            None => Ok(None),
        }
    }

    /// Read every remaining record.
    pub fn read_all(&mut self) -> io::Result<Vec<SeqRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FASTA: &str = ">p1 first pattern\nACGTACGTAC\n>p2\nGATTACA\nGCT\n";

    #[test]
    fn test_read_plain_fasta() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FASTA.as_bytes()).unwrap();

        let records = FastaReader::new(file.path()).unwrap().read_all().unwrap();
        assert_eq!(
            records,
            vec![
                SeqRecord::new("p1", "ACGTACGTAC"),
                SeqRecord::new("p2", "GATTACAGCT"),
            ]
        );
    }

    #[test]
    fn test_read_gzip_fasta() {
        let mut file = NamedTempFile::new().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(FASTA.as_bytes()).unwrap();
        file.write_all(&encoder.finish().unwrap()).unwrap();

        let mut reader = FastaReader::new(file.path()).unwrap();
        assert_eq!(reader.read_record().unwrap().unwrap().name, "p1");
        assert_eq!(reader.read_record().unwrap().unwrap().seq, b"GATTACAGCT");
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        assert!(FastaReader::new(file.path()).unwrap().read_all().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        assert!(FastaReader::new("/nonexistent/patterns.fa").is_err());
    }
}
