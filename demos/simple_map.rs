//! 演示如何在 library 模式下使用 nanomap-rust 做信号种子比对。
//!
//! 运行方式：
//! ```bash
//! cargo run --example simple_map
//! ```

use nanomap_rust::align::{map_read, MapOpt};
use nanomap_rust::index::fm::FmIndex;
use nanomap_rust::model::{Event, NormParams, PoreModel};
use nanomap_rust::util::kmer;

fn main() -> anyhow::Result<()> {
    // 1. 玩具孔模型：k=2，每个 2-mer 一个期望电流
    let k = 2;
    let levels = (0..kmer::kmer_count(k))
        .map(|id| (60.0 + 4.0 * id as f32, 1.0))
        .collect();
    let model = PoreModel::from_levels(k, levels)?;

    // 2. 参考序列 -> 期望 k-mer 序列，反转后建索引
    //    （LF 向后扩展随即对应沿正向参考前进）
    let reference = b"ACGTAGCTGATCGTAGCTAGCTGAT";
    println!("参考序列: {}", std::str::from_utf8(reference).unwrap());
    let mut mer_seq = kmer::seq_to_kmer_ids(reference, k)?;
    mer_seq.reverse();
    println!("k-mer 序列长度: {}", mer_seq.len());

    // 3. 构建 FM 索引
    let fmi = FmIndex::build(model, mer_seq, 4)?;
    println!("FM 索引构建完成：n={}, tally_dist={}", fmi.len(), fmi.tally_dist());

    // 4. 从参考片段的期望电流合成一段"完美"事件流（信号时间序）
    let read_span = &reference[8..18];
    let read_ids = kmer::seq_to_kmer_ids(read_span, k)?;
    let events: Vec<Event> = read_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| Event {
            mean: fmi.model().level(id).0,
            stdv: 1.0,
            start: (i * 12) as u32,
            length: 12,
        })
        .collect();
    println!("模拟事件数: {}", events.len());

    // 5. 种子搜索（正向坐标输出）
    let seeds = map_read(&fmi, &events, 4, &NormParams::default(), &MapOpt::default())?;

    println!("\n种子结果（{} 条）:", seeds.len());
    for s in &seeds {
        println!(
            "  qry[{}..{}] -> ref[{}..{}] (avg log prob {:.3})",
            s.qry_start, s.qry_end, s.ref_start, s.ref_end, s.prob
        );
    }

    println!("\n完成！");
    Ok(())
}
