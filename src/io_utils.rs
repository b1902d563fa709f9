//! I/O utilities for delimited text: delimiter and encoding resolution,
//! reader construction, field decoding, and whole-file atomic replacement.
//!
//! - **Delimiter resolution**: `.tsv` → tab, anything else → comma, unless a
//!   delimiter is given explicitly.
//! - **Encoding**: input fields are decoded with `encoding_rs`, defaulting to
//!   UTF-8. Spreadsheet exports often carry a byte-order mark on the first
//!   header, which is stripped.
//! - **stdin**: the `-` path reads from standard input.
//! - **Replacement**: writers go to a temporary sibling file that is renamed
//!   over the target only once everything has been flushed.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use tempfile::NamedTempFile;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const BYTE_ORDER_MARK: char = '\u{feff}';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Hand-authored files are read flexibly: short rows are padded by the
/// caller treating absent cells as missing.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    let mut decoded = decode_record(&headers, encoding)?;
    if let Some(first) = decoded.first_mut()
        && first.starts_with(BYTE_ORDER_MARK)
    {
        *first = first.trim_start_matches(BYTE_ORDER_MARK).to_string();
    }
    Ok(decoded)
}

/// Writes a CSV file through `fill` and swaps it into place atomically.
/// On any error the original file is left untouched.
pub fn replace_csv_file<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<BufWriter<&mut NamedTempFile>>) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staging = NamedTempFile::new_in(dir)
        .with_context(|| format!("Creating staging file next to {path:?}"))?;
    {
        let mut builder = csv::WriterBuilder::new();
        builder
            .has_headers(false)
            .delimiter(DEFAULT_CSV_DELIMITER)
            .quote_style(QuoteStyle::Necessary)
            .double_quote(true);
        let mut writer = builder.from_writer(BufWriter::new(&mut staging));
        fill(&mut writer)?;
        writer.flush().context("Flushing staged catalog")?;
    }
    staging
        .as_file()
        .sync_all()
        .context("Syncing staged catalog")?;
    staging
        .persist(path)
        .map_err(|err| anyhow!("Replacing {path:?}: {}", err.error))?;
    Ok(())
}
