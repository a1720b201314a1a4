pub mod query;
pub mod seed;

use anyhow::{Context, Result};
use std::io::Write;

use log::{info, warn};
use rayon::prelude::*;

use crate::index::fm::FmIndex;
use crate::io::events::{EventRead, EventReader};
use crate::model::{KmerModel, NormParams, PoreModel};
use crate::util::kmer;

pub use query::{Frontier, Query};
pub use seed::{lf_map, SeedResult};

/// 种子搜索的概率门限（对数空间）与 seed_end 扫描下界。
#[derive(Clone, Copy, Debug)]
pub struct MapOpt {
    pub event_thresh: f32,
    pub seed_thresh: f32,
    pub stay_thresh: f32,
    pub seed_end_min: usize,
}

impl Default for MapOpt {
    fn default() -> Self {
        Self {
            event_thresh: -9.2103,
            seed_thresh: -3.75,
            stay_thresh: -5.298,
            seed_end_min: 0,
        }
    }
}

/// 文件级映射驱动的全部配置。
#[derive(Clone, Copy, Debug)]
pub struct RunOpt {
    pub tally_dist: usize,
    pub seed_len: usize,
    pub norm: NormParams,
    pub map: MapOpt,
    pub threads: usize,
}

impl Default for RunOpt {
    fn default() -> Self {
        Self {
            tally_dist: 128,
            seed_len: 16,
            norm: NormParams::default(),
            map: MapOpt::default(),
            threads: 1,
        }
    }
}

/// 对单条事件读做种子搜索。
///
/// 约定：索引建立在**反转的** k-mer 序列上（见
/// [`map_file_with_opt`]）。LF 扩展向反转序列的前方前接符号，对应
/// 沿正向参考前进一个 k-mer，恰好与模型 `neighbors`（前进一碱基）
/// 的方向一致。事件流在这里反转后交给 [`lf_map`]，输出坐标再换回
/// 正向：查询坐标回到信号时间序，参考坐标回到正向 k-mer 位置。
pub fn map_read<M: KmerModel>(
    fmi: &FmIndex<M>,
    events: &[crate::model::Event],
    seed_len: usize,
    norm: &NormParams,
    opt: &MapOpt,
) -> Result<Vec<SeedResult>> {
    if events.is_empty() {
        anyhow::bail!("read has no events");
    }
    let rev: Vec<crate::model::Event> = events.iter().rev().copied().collect();
    let raw = lf_map(fmi, &rev, rev.len() - 1, seed_len, norm, opt)?;

    let n_events = events.len() as i64;
    let n_kmers = fmi.len() as u32;
    Ok(raw
        .into_iter()
        .map(|s| SeedResult {
            qry_start: n_events - 1 - s.qry_end,
            qry_end: n_events - 1 - s.qry_start,
            ref_start: n_kmers - 1 - s.ref_end,
            ref_end: n_kmers - 1 - s.ref_start,
            prob: s.prob,
        })
        .collect())
}

/// 并行映射一批读。索引只读共享；每个 worker 自带前沿与发射
/// 概率表（见 `lf_map`）。
pub fn map_reads<M: KmerModel + Sync>(
    fmi: &FmIndex<M>,
    reads: &[EventRead],
    seed_len: usize,
    norm: &NormParams,
    opt: &MapOpt,
) -> Vec<(String, Vec<SeedResult>)> {
    reads
        .par_iter()
        .map(|read| {
            let seeds = match map_read(fmi, &read.events, seed_len, norm, opt) {
                Ok(s) => s,
                Err(e) => {
                    warn!("read {}: {}", read.id, e);
                    Vec::new()
                }
            };
            (read.id.clone(), seeds)
        })
        .collect()
}

/// 完整流水线：模型 + 参考 FASTA + 事件表 -> TSV 种子输出。
///
/// 参考取 FASTA 首条记录，翻译为期望 k-mer 序列后**反转**建索引
/// （反向不取互补；反向互补链由调用方提供第二条参考）。事件表按
/// 读分组、成批并行映射。输出列：read_id、qry_start、qry_end、
/// ref_start、ref_end、prob，参考坐标为正向 k-mer 位置。
pub fn map_file_with_opt(
    model_path: &str,
    ref_path: &str,
    events_path: &str,
    out_path: Option<&str>,
    opt: RunOpt,
) -> Result<()> {
    let model = PoreModel::load(model_path)
        .with_context(|| format!("cannot load pore model '{}'", model_path))?;
    let k = model.k();

    let records = crate::io::fasta::read_fasta(ref_path)?;
    let rec = records
        .first()
        .ok_or_else(|| anyhow::anyhow!("FASTA file '{}' contains no sequences", ref_path))?;
    info!("reference {}: {} bp", rec.id, rec.seq.len());

    let mut mer_seq = kmer::seq_to_kmer_ids(&rec.seq, k)?;
    mer_seq.reverse();
    let fmi = FmIndex::build(model, mer_seq, opt.tally_dist)?;
    info!("FM index built: n={}, tally_dist={}", fmi.len(), opt.tally_dist);

    let fh = std::fs::File::open(events_path)
        .with_context(|| format!("cannot open event table '{}'", events_path))?;
    let mut reader = EventReader::new(std::io::BufReader::new(fh));

    let mut out: Box<dyn Write> = if let Some(p) = out_path {
        Box::new(std::io::BufWriter::new(std::fs::File::create(p)?))
    } else {
        Box::new(std::io::BufWriter::new(std::io::stdout()))
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opt.threads)
        .build()
        .unwrap_or_else(|_| rayon::ThreadPoolBuilder::new().build().unwrap());

    let batch_size = 64;
    let mut n_reads = 0usize;
    let mut n_seeds = 0usize;
    loop {
        let mut batch: Vec<EventRead> = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            match reader.next_read()? {
                Some(r) => batch.push(r),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }
        n_reads += batch.len();

        let results = pool.install(|| {
            map_reads(&fmi, &batch, opt.seed_len, &opt.norm, &opt.map)
        });

        for (id, seeds) in results {
            n_seeds += seeds.len();
            for s in seeds {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\t{:.4}",
                    id, s.qry_start, s.qry_end, s.ref_start, s.ref_end, s.prob
                )?;
            }
        }
    }

    info!("mapped {} reads, {} seeds", n_reads, n_seeds);
    Ok(())
}
