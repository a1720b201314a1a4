use anyhow::{bail, Result};
use log::debug;
use std::cmp::Ordering;
use std::time::Instant;

use crate::index::{bwt, sa};
use crate::model::KmerModel;
use crate::util::kmer::KmerId;

/// k-mer 字母表上的 FM 索引。
///
/// 与经典 4 字母 DNA FM 索引的区别：字母表是全部 k-mer 标识符
/// （σ = 4^k，k=6 时 4096），文本是参考序列经孔模型翻译出的期望
/// k-mer 序列；符号全序由模型比较器给出，不必是数值序。文本不加
/// 哨兵，BWT 定义在循环旋转上。
///
/// 表结构：
/// - `suffix_ar` / `bwt`：后缀数组与循环 BWT；
/// - `mer_counts[c]`：符号出现次数；
/// - `mer_f_starts[c] = 1 + Σ_{d ≺ c} counts[d]`：F 表首行，带刻意的
///   1 基偏移，区间运算全程使用 1 基 BWT 行号（行 x ↔ `SA[x-1]`）；
/// - `tally`：每 `tally_dist` 行采样一次的累计出现次数检查点，按行
///   展平（`row * σ + c`），rank 查询从最近检查点双向顺扫补偿。
///
/// 构建完成后全部表只读，可被多个搜索线程共享。
pub struct FmIndex<M: KmerModel> {
    model: M,
    mer_seq: Vec<KmerId>,
    suffix_ar: Vec<u32>,
    bwt: Vec<KmerId>,
    mer_counts: Vec<u32>,
    mer_f_starts: Vec<u32>,
    tally: Vec<u32>,
    tally_dist: usize,
}

impl<M: KmerModel> FmIndex<M> {
    /// 从参考 k-mer 序列构建索引。
    ///
    /// 失败情形：空序列、`tally_dist == 0`、序列中出现 ≥ σ 的符号，
    /// 以及比较器不是严格全序（构建时即检出，不留下半成品索引）。
    pub fn build(model: M, mer_seq: Vec<KmerId>, tally_dist: usize) -> Result<Self> {
        let n = mer_seq.len();
        let sigma = model.kmer_count();
        if n == 0 {
            bail!("reference k-mer sequence is empty");
        }
        if tally_dist == 0 {
            bail!("tally distance must be positive");
        }
        if let Some(&c) = mer_seq.iter().find(|&&c| (c as usize) >= sigma) {
            bail!("k-mer id {} out of range (alphabet size {})", c, sigma);
        }

        // 按模型比较器排出符号全序，并做严格性检查
        let mut order: Vec<KmerId> = (0..sigma).map(|c| c as KmerId).collect();
        order.sort_by(|&a, &b| model.compare_kmers(a, b));
        for w in order.windows(2) {
            if model.compare_kmers(w[0], w[1]) != Ordering::Less {
                bail!(
                    "model comparator is not a strict total order (k-mers {} and {})",
                    w[0],
                    w[1]
                );
            }
        }
        let mut symbol_rank = vec![0u32; sigma];
        for (r, &c) in order.iter().enumerate() {
            symbol_rank[c as usize] = r as u32;
        }

        let timer = Instant::now();
        let suffix_ar = sa::build_sa(&mer_seq, &symbol_rank);
        debug!("SA sort: {:?}", timer.elapsed());

        let timer = Instant::now();
        let bwt = bwt::build_bwt(&mer_seq, &suffix_ar);

        // 单趟扫描 BWT：计数 + tally 检查点
        let rows = n / tally_dist + 1;
        let mut mer_counts = vec![0u32; sigma];
        let mut tally = vec![0u32; rows * sigma];
        for (i, &c) in bwt.iter().enumerate() {
            mer_counts[c as usize] += 1;
            if i % tally_dist == 0 {
                let row = i / tally_dist;
                tally[row * sigma..(row + 1) * sigma].copy_from_slice(&mer_counts);
            }
        }
        // n 整除 tally_dist 时补最后一行，使末位下标两侧都有检查点
        if n % tally_dist == 0 {
            let row = n / tally_dist;
            tally[row * sigma..(row + 1) * sigma].copy_from_slice(&mer_counts);
        }

        // F 表：按 ≺ 序前缀和，1 基偏移
        let mut mer_f_starts = vec![0u32; sigma];
        let mut acc = 1u32;
        for &c in &order {
            mer_f_starts[c as usize] = acc;
            acc += mer_counts[c as usize];
        }
        debug_assert_eq!(acc as usize, n + 1);
        debug!("FM build: {:?}", timer.elapsed());

        Ok(Self {
            model,
            mer_seq,
            suffix_ar,
            bwt,
            mer_counts,
            mer_f_starts,
            tally,
            tally_dist,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// 参考 k-mer 序列长度 n。
    pub fn len(&self) -> usize {
        self.mer_seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mer_seq.is_empty()
    }

    pub fn suffix_ar(&self) -> &[u32] {
        &self.suffix_ar
    }

    pub fn bwt(&self) -> &[KmerId] {
        &self.bwt
    }

    pub fn count(&self, c: KmerId) -> u32 {
        self.mer_counts[c as usize]
    }

    pub fn f_start(&self, c: KmerId) -> u32 {
        self.mer_f_starts[c as usize]
    }

    pub fn tally_dist(&self) -> usize {
        self.tally_dist
    }

    /// 符号 `c` 全部出现位置的 1 基行区间；`c` 不在文本中时为 None。
    pub fn kmer_interval(&self, c: KmerId) -> Option<(u32, u32)> {
        let cnt = self.mer_counts[c as usize];
        if cnt == 0 {
            return None;
        }
        let f = self.mer_f_starts[c as usize];
        Some((f, f + cnt - 1))
    }

    /// 1 基行号 -> 参考坐标。
    pub fn sa_pos(&self, row: u32) -> u32 {
        self.suffix_ar[(row - 1) as usize]
    }

    /// `BWT[0..=i]`（0 基，含端点）中符号 `c` 的出现次数。
    pub fn rank(&self, c: KmerId, i: usize) -> u32 {
        debug_assert!(i < self.bwt.len());
        self.occ(c, i as i64)
    }

    /// rank 的内部形式：i < 0 返回 0（空区间哨兵）。
    /// 从最近的 tally 检查点出发，向前或向后顺扫至多 ⌊D/2⌋ 个
    /// BWT 单元补偿。
    fn occ(&self, c: KmerId, i: i64) -> u32 {
        if i < 0 {
            return 0;
        }
        let i = i as usize;
        let d = self.tally_dist;
        let n = self.bwt.len();
        let sigma = self.model.kmer_count();

        // 候选检查点：i 之前最近的一个，以及它的下一个。后者要么是
        // 普通检查点（cp + d < n），要么是 n 整除 d 时补写的末行，
        // 其覆盖位置按 n-1 计（见 build）。
        let mut cp = (i / d) * d;
        let next = cp + d;
        let next_pos = if next < n {
            Some(next)
        } else if next == n && n % d == 0 {
            Some(n - 1)
        } else {
            None
        };
        if let Some(p) = next_pos {
            if i - cp > p - i {
                cp = next;
            }
        }

        let mut t = self.tally[(cp / d) * sigma + c as usize];
        let pos = cp.min(n - 1); // 该检查点覆盖的 BWT 位置
        if pos > i {
            for j in (i + 1)..=pos {
                if self.bwt[j] == c {
                    t -= 1;
                }
            }
        } else {
            for j in (pos + 1)..=i {
                if self.bwt[j] == c {
                    t += 1;
                }
            }
        }
        t
    }

    /// LF 区间步：把 1 基行区间 `[l, r]` 前接符号 `c`，得到所有以
    /// `c` 开头、后继落在原区间的行。区间为空时返回 None。
    pub fn lf(&self, c: KmerId, l: u32, r: u32) -> Option<(u32, u32)> {
        debug_assert!((c as usize) < self.model.kmer_count());
        debug_assert!(l >= 1 && l <= r && r as usize <= self.len());
        let lo = self.occ(c, l as i64 - 2);
        let hi = self.occ(c, r as i64 - 1);
        if lo == hi {
            return None;
        }
        let f = self.mer_f_starts[c as usize];
        Some((f + lo, f + hi - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Event, NormParams, PoreModel};
    use smallvec::SmallVec;

    fn base_model() -> PoreModel {
        // k=1：四符号字母表 {a,c,g,t}，自然序
        PoreModel::from_levels(
            1,
            vec![(10.0, 1.0), (20.0, 1.0), (30.0, 1.0), (40.0, 1.0)],
        )
        .unwrap()
    }

    /// 自定义符号序的最小模型（仅供本模块测试）。
    struct PermModel {
        rank_of: Vec<u16>,
    }

    impl KmerModel for PermModel {
        fn kmer_count(&self) -> usize {
            self.rank_of.len()
        }
        fn compare_kmers(&self, a: KmerId, b: KmerId) -> Ordering {
            self.rank_of[a as usize].cmp(&self.rank_of[b as usize])
        }
        fn neighbors(&self, _k: KmerId) -> SmallVec<[KmerId; 4]> {
            SmallVec::new()
        }
        fn event_match_prob(&self, _e: &Event, _k: KmerId, _n: &NormParams) -> f32 {
            0.0
        }
    }

    fn naive_rank(bwt: &[KmerId], c: KmerId, i: usize) -> u32 {
        bwt[..=i].iter().filter(|&&b| b == c).count() as u32
    }

    #[test]
    fn acgtacgt_reference_tables() {
        // T = "acgtacgt"，D = 2
        let text: Vec<KmerId> = vec![0, 1, 2, 3, 0, 1, 2, 3];
        let fmi = FmIndex::build(base_model(), text, 2).unwrap();

        for c in 0..4u16 {
            assert_eq!(fmi.count(c), 2);
        }
        assert_eq!(fmi.f_start(0), 1);
        assert_eq!(fmi.f_start(1), 3);
        assert_eq!(fmi.f_start(2), 5);
        assert_eq!(fmi.f_start(3), 7);

        // SA 以两个 a 后缀开头
        assert!(fmi.suffix_ar()[0] % 4 == 0 && fmi.suffix_ar()[1] % 4 == 0);

        assert_eq!(fmi.rank(1, 5), 2);
    }

    #[test]
    fn rank_agrees_with_naive_count() {
        let text: Vec<KmerId> = vec![2, 0, 3, 0, 1, 0, 2, 1, 3, 0, 1, 2, 3];
        let fmi = FmIndex::build(base_model(), text, 3).unwrap();
        for c in 0..4u16 {
            for i in 0..fmi.len() {
                assert_eq!(fmi.rank(c, i), naive_rank(fmi.bwt(), c, i), "c={} i={}", c, i);
            }
        }
    }

    #[test]
    fn rank_is_tally_distance_independent() {
        let text: Vec<KmerId> = vec![1, 3, 0, 2, 2, 0, 3, 1, 0, 0, 2, 1];
        let reference = FmIndex::build(base_model(), text.clone(), 1).unwrap();
        for d in [2usize, 3, 4, 5, 7, 12, 16] {
            let fmi = FmIndex::build(base_model(), text.clone(), d).unwrap();
            for c in 0..4u16 {
                for i in 0..fmi.len() {
                    assert_eq!(fmi.rank(c, i), reference.rank(c, i), "d={} c={} i={}", d, c, i);
                }
            }
        }
    }

    #[test]
    fn f_table_brackets_symbol_rows() {
        let text: Vec<KmerId> = vec![3, 1, 1, 0, 2, 3, 3, 0];
        let fmi = FmIndex::build(base_model(), text.clone(), 2).unwrap();
        let total: u32 = (0..4u16).map(|c| fmi.count(c)).sum();
        assert_eq!(total as usize, text.len());

        for c in 0..4u16 {
            if let Some((l, r)) = fmi.kmer_interval(c) {
                assert_eq!(r, fmi.f_start(c) + fmi.count(c) - 1);
                // 区间内每行的后缀都以 c 开头
                for row in l..=r {
                    let p = fmi.sa_pos(row) as usize;
                    assert_eq!(text[p], c);
                }
                // 区间外紧邻行不以 c 开头
                if (r as usize) < text.len() {
                    let p = fmi.sa_pos(r + 1) as usize;
                    assert_ne!(text[p], c);
                }
            }
        }
    }

    #[test]
    fn lf_walk_reconstructs_reversed_text() {
        // 从 SA[row-1] == 0 的行出发做 LF 游走，依次取出
        // T[n-1], T[n-2], ..., T[0]
        let text: Vec<KmerId> = vec![0, 1, 2, 3, 1, 0, 2, 2, 3, 0];
        let n = text.len();
        let fmi = FmIndex::build(base_model(), text.clone(), 4).unwrap();

        let mut row = (1..=n as u32).find(|&x| fmi.sa_pos(x) == 0).unwrap();
        let mut collected = Vec::with_capacity(n);
        for _ in 0..n {
            let c = fmi.bwt()[(row - 1) as usize];
            collected.push(c);
            let (l, r) = fmi.lf(c, row, row).unwrap();
            assert_eq!(l, r);
            row = l;
        }
        collected.reverse();
        assert_eq!(collected, text);
    }

    #[test]
    fn lf_interval_counts_occurrences() {
        // "ac" 在 acgtacgt 中循环出现两次
        let text: Vec<KmerId> = vec![0, 1, 2, 3, 0, 1, 2, 3];
        let fmi = FmIndex::build(base_model(), text, 2).unwrap();
        let (l, r) = fmi.kmer_interval(1).unwrap();
        let (l2, r2) = fmi.lf(0, l, r).unwrap();
        assert_eq!(r2 - l2 + 1, 2);
        for row in l2..=r2 {
            assert_eq!(fmi.sa_pos(row) % 4, 0);
        }
        // "gc" 不存在
        assert!(fmi.lf(2, l, r).is_none());
    }

    #[test]
    fn lf_respects_custom_symbol_order() {
        // 符号序反转：3 < 2 < 1 < 0
        let model = PermModel { rank_of: vec![3, 2, 1, 0] };
        let text: Vec<KmerId> = vec![0, 1, 2, 3];
        let fmi = FmIndex::build(model, text, 2).unwrap();
        // F 按自定义序：t 在最前
        assert_eq!(fmi.f_start(3), 1);
        assert_eq!(fmi.f_start(0), 4);
        let (l, r) = fmi.kmer_interval(3).unwrap();
        // "gt" 存在
        assert!(fmi.lf(2, l, r).is_some());
    }

    #[test]
    fn build_rejects_invalid_input() {
        assert!(FmIndex::build(base_model(), vec![], 2).is_err());
        assert!(FmIndex::build(base_model(), vec![0, 1], 0).is_err());
        assert!(FmIndex::build(base_model(), vec![0, 9], 2).is_err());
    }

    #[test]
    fn build_rejects_non_total_order() {
        // 两个符号秩相同：比较器对它们返回 Equal
        let model = PermModel { rank_of: vec![0, 1, 1, 2] };
        let err = FmIndex::build(model, vec![0, 1, 2, 3], 2);
        assert!(err.is_err());
    }

    #[test]
    fn single_symbol_reference() {
        // T = "aaaa"
        let fmi = FmIndex::build(base_model(), vec![0, 0, 0, 0], 2).unwrap();
        assert_eq!(fmi.kmer_interval(0), Some((1, 4)));
        let (l, r) = fmi.kmer_interval(0).unwrap();
        // 前接 a 仍覆盖全部行
        assert_eq!(fmi.lf(0, l, r), Some((1, 4)));
    }
}
