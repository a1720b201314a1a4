use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::time::Instant;

use nanomap_rust::align::{self, MapOpt, RunOpt};
use nanomap_rust::index::fm::FmIndex;
use nanomap_rust::io::fasta;
use nanomap_rust::model::{KmerModel, NormParams, PoreModel};
use nanomap_rust::util::kmer;

#[derive(Parser, Debug)]
#[command(
    name = "nanomap-rust",
    author,
    version,
    about = "Probabilistic nanopore signal mapper over a k-mer FM index",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the k-mer FM index and report table statistics
    Stats {
        /// Pore model table (kmer, level_mean, level_stdv)
        #[arg(short = 'm', long = "model")]
        model: String,
        /// Reference FASTA file
        reference: String,
        #[arg(long = "tally-dist", default_value_t = 128)]
        tally_dist: usize,
    },
    /// Map event reads against a reference
    Map {
        /// Pore model table (kmer, level_mean, level_stdv)
        #[arg(short = 'm', long = "model")]
        model: String,
        /// Reference FASTA file
        reference: String,
        /// Event table (read_id, mean, stdv, start, length per line)
        events: String,
        /// Output TSV path (stdout if omitted)
        #[arg(short, long)]
        out: Option<String>,
        #[arg(long = "tally-dist", default_value_t = 128)]
        tally_dist: usize,
        /// Target seed length in matched events
        #[arg(long = "seed-len", default_value_t = 16)]
        seed_len: usize,
        /// Log-probability floor for admitting an event/k-mer pairing
        #[arg(long = "event-thresh", default_value_t = -9.2103, allow_hyphen_values = true)]
        event_thresh: f32,
        /// Log-probability floor on a seed's average emission
        #[arg(long = "seed-thresh", default_value_t = -3.75, allow_hyphen_values = true)]
        seed_thresh: f32,
        /// Log-probability floor for allowing a stay between events
        #[arg(long = "stay-thresh", default_value_t = -5.298, allow_hyphen_values = true)]
        stay_thresh: f32,
        /// Lower bound of the seed endpoint sweep
        #[arg(long = "seed-end-min", default_value_t = 0)]
        seed_end_min: usize,
        /// Read-level normalization: event mean is mean*scale + shift
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        shift: f32,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Stats { model, reference, tally_dist } => {
            run_stats(&model, &reference, tally_dist)
        }
        Commands::Map {
            model,
            reference,
            events,
            out,
            tally_dist,
            seed_len,
            event_thresh,
            seed_thresh,
            stay_thresh,
            seed_end_min,
            scale,
            shift,
            threads,
        } => {
            let opt = RunOpt {
                tally_dist,
                seed_len,
                norm: NormParams { scale, shift },
                map: MapOpt { event_thresh, seed_thresh, stay_thresh, seed_end_min },
                threads,
            };
            align::map_file_with_opt(&model, &reference, &events, out.as_deref(), opt)
        }
    }
}

fn run_stats(model_path: &str, reference: &str, tally_dist: usize) -> Result<()> {
    let model = PoreModel::load(model_path)?;
    let k = model.k();
    let sigma = model.kmer_count();
    println!("model: {} (k={}, sigma={})", model_path, k, sigma);

    let records = fasta::read_fasta(reference)?;
    if records.is_empty() {
        anyhow::bail!("FASTA file '{}' contains no sequences", reference);
    }

    for rec in &records {
        let mer_seq = kmer::seq_to_kmer_ids(&rec.seq, k)?;
        let timer = Instant::now();
        let fmi = FmIndex::build(model.clone(), mer_seq, tally_dist)?;
        let elapsed = timer.elapsed();
        info!("{}: index built in {:?}", rec.id, elapsed);

        let n = fmi.len();
        let present = (0..sigma as u16).filter(|&c| fmi.count(c) > 0).count();
        println!(
            "{}: n={} distinct_kmers={} tally_rows={} build_time={:?}",
            rec.id,
            n,
            present,
            n / tally_dist + 1,
            elapsed
        );
    }
    Ok(())
}
