//! Sequence input and hit output.

pub mod fasta_reader;
pub mod hit_writer;

pub use fasta_reader::{FastaReader, SeqRecord};
pub use hit_writer::HitWriter;
