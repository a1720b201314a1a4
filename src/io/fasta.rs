use anyhow::{bail, Context, Result};
use std::io::BufRead;

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub seq: Vec<u8>,
}

pub fn read_fasta(path: &str) -> Result<Vec<FastaRecord>> {
    let fh = std::fs::File::open(path)
        .with_context(|| format!("cannot open reference FASTA '{}'", path))?;
    parse_fasta(std::io::BufReader::new(fh))
}

/// Parse FASTA records; sequence bytes are uppercased, whitespace inside
/// sequence lines is dropped.
pub fn parse_fasta<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>> {
    let mut records: Vec<FastaRecord> = Vec::new();
    let mut cur: Option<FastaRecord> = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            if let Some(r) = cur.take() {
                records.push(r);
            }
            let id = header.split_whitespace().next().unwrap_or("").to_string();
            if id.is_empty() {
                bail!("FASTA header without a sequence name");
            }
            cur = Some(FastaRecord { id, seq: Vec::new() });
        } else {
            match cur.as_mut() {
                Some(r) => r.seq.extend(
                    line.bytes()
                        .filter(|b| !b.is_ascii_whitespace())
                        .map(|b| b.to_ascii_uppercase()),
                ),
                None => bail!("sequence data before first FASTA header"),
            }
        }
    }
    if let Some(r) = cur.take() {
        records.push(r);
    }
    Ok(records)
}
