//! # nanomap-rust
//!
//! 纳米孔电流信号事件对参考序列的概率种子比对器。
//!
//! 经典 FM 索引的字母表是 4 个 DNA 碱基；这里的字母表是全部 k-mer
//! 标识符（σ = 4^k，k=6 时 4096 个符号）。参考序列先经孔模型翻译成
//! 期望 k-mer 序列并建索引；每个信号事件与每个 k-mer 的期望电流分布
//! 比较得到逐事件发射概率，种子沿 FM 索引向后扩展，在每个事件上遍历
//! 一组可信 k-mer，支持 "stay" 自环，并用区间合并保持前沿无冗余。
//!
//! 本 crate 提供：
//!
//! - **索引构建**：k-mer 序列上的循环后缀数组 + BWT + tally 检查点
//! - **种子搜索**：概率加权的 LF 映射向后扩展
//! - **批量映射**：多读并行（索引只读共享）
//!
//! ## 快速示例
//!
//! ```rust
//! use nanomap_rust::align::{lf_map, MapOpt};
//! use nanomap_rust::index::fm::FmIndex;
//! use nanomap_rust::model::{Event, NormParams, PoreModel};
//! use nanomap_rust::util::kmer;
//!
//! // k=1 玩具模型：四个符号的期望电流相互远离
//! let model = PoreModel::from_levels(
//!     1,
//!     vec![(10.0, 1.0), (20.0, 1.0), (30.0, 1.0), (40.0, 1.0)],
//! ).unwrap();
//!
//! let mer_seq = kmer::seq_to_kmer_ids(b"ACGTACGT", 1).unwrap();
//! let fmi = FmIndex::build(model, mer_seq, 2).unwrap();
//!
//! // 两个事件，分别落在 c 与 g 的期望电流上
//! let events = vec![
//!     Event { mean: 20.0, stdv: 1.0, start: 0, length: 10 },
//!     Event { mean: 30.0, stdv: 1.0, start: 10, length: 10 },
//! ];
//! let seeds = lf_map(&fmi, &events, 1, 2, &NormParams::default(), &MapOpt::default()).unwrap();
//! assert_eq!(seeds.len(), 2); // "cg" 在参考中出现两次
//! ```
//!
//! ## 模块说明
//!
//! - [`model`] — k-mer 字母表与发射概率契约（孔模型、stay 概率）
//! - [`index`] — FM 索引构建（后缀数组、BWT、tally/rank/LF）
//! - [`align`] — 种子搜索（查询前沿、LF 映射驱动、批量映射）
//! - [`io`] — 参考 FASTA / 事件表 / 模型表解析
//! - [`util`] — k-mer 编码与参考序列翻译

pub mod align;
pub mod index;
pub mod io;
pub mod model;
pub mod util;
