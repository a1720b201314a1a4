use anyhow::{anyhow, bail, Context, Result};
use std::io::BufRead;

use crate::util::kmer;

/// Read an ONT-style pore model table: whitespace-separated lines of
/// `kmer  level_mean  level_stdv  [...]`; extra columns and '#'
/// comments are ignored, and a header line whose first token is not a
/// DNA k-mer is skipped. Returns k and the level table indexed by
/// packed k-mer id.
pub fn read_model_table(path: &str) -> Result<(usize, Vec<(f32, f32)>)> {
    let fh = std::fs::File::open(path)
        .with_context(|| format!("cannot open model table '{}'", path))?;
    parse_model_table(std::io::BufReader::new(fh))
}

pub fn parse_model_table<R: BufRead>(reader: R) -> Result<(usize, Vec<(f32, f32)>)> {
    let mut k = 0usize;
    let mut entries: Vec<Option<(f32, f32)>> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut it = line.split_whitespace();
        let kmer_s = it.next().unwrap_or("");
        if !kmer_s.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T')) {
            continue; // header row
        }
        if k == 0 {
            k = kmer_s.len();
            if k == 0 || k > 8 {
                bail!("unsupported k-mer length {} in model table", k);
            }
            entries = vec![None; kmer::kmer_count(k)];
        } else if kmer_s.len() != k {
            bail!("inconsistent k-mer length in model table: '{}'", kmer_s);
        }

        let mean: f32 = it
            .next()
            .ok_or_else(|| anyhow!("model line missing level_mean: '{}'", line))?
            .parse()
            .map_err(|_| anyhow!("cannot parse level_mean: '{}'", line))?;
        let stdv: f32 = it
            .next()
            .ok_or_else(|| anyhow!("model line missing level_stdv: '{}'", line))?
            .parse()
            .map_err(|_| anyhow!("cannot parse level_stdv: '{}'", line))?;

        let id = kmer::str_to_kmer(kmer_s.as_bytes());
        entries[id as usize] = Some((mean, stdv));
    }

    if k == 0 {
        bail!("model table contains no k-mer entries");
    }
    let missing = entries.iter().filter(|e| e.is_none()).count();
    if missing > 0 {
        bail!("model table is missing {} of {} k-mers", missing, entries.len());
    }
    Ok((k, entries.into_iter().map(|e| e.unwrap()).collect()))
}
