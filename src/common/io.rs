//! Common, IO-related code.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use flate2::{bufread::MultiGzDecoder, write::GzEncoder, Compression};

/// Transparently open a file with gzip decoder.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let file = File::open(path)?;
        let bufreader = BufReader::new(file);
        let decoder = MultiGzDecoder::new(bufreader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        let file = File::open(path).map(BufReader::new)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Transparently open a file with gzip encoder.
pub fn open_write_maybe_gz<P>(path: P) -> Result<Box<dyn Write>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for writing", path.as_ref());
        let file = File::create(path)?;
        let bufwriter = BufWriter::new(file);
        let encoder = GzEncoder::new(bufwriter, Compression::default());
        Ok(Box::new(encoder))
    } else {
        tracing::trace!("Opening {:?} as plain text for writing", path.as_ref());
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Open a file for appending; the curation log and the shared error file
/// accumulate across stages.
pub fn open_append<P>(path: P) -> Result<BufWriter<File>, anyhow::Error>
where
    P: AsRef<Path>,
{
    tracing::trace!("Opening {:?} for appending", path.as_ref());
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(BufWriter::new(file))
}

/// Build a tab-separated, headerless reader over `path`.
pub fn tsv_reader<P>(path: P) -> Result<csv::Reader<Box<dyn BufRead>>, anyhow::Error>
where
    P: AsRef<Path>,
{
    Ok(csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(open_read_maybe_gz(path)?))
}

/// Build a tab-separated, headerless writer to `path`.
pub fn tsv_writer<P>(path: P) -> Result<csv::Writer<Box<dyn Write>>, anyhow::Error>
where
    P: AsRef<Path>,
{
    Ok(csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(open_write_maybe_gz(path)?))
}

/// Build a tab-separated writer appending to `path`.
pub fn tsv_writer_append<P>(path: P) -> Result<csv::Writer<BufWriter<File>>, anyhow::Error>
where
    P: AsRef<Path>,
{
    Ok(csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(open_append(path)?))
}
