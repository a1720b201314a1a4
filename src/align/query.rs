use crate::util::kmer::KmerId;

/// 前沿节点：一个 BWT 行区间及其匹配注解。
///
/// `start`/`end` 是 1 基 BWT 行号（闭区间）；`kmer` 是最近一次匹配
/// 的符号；`match_len` 为已匹配的不同事件数（≥1），`stays` 为累计
/// stay 次数，`log_prob` 为全部 `match_len + stays` 次发射的对数
/// 概率和。节点之间不保留父/子回链，结果不依赖扩展路径。
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub kmer: KmerId,
    pub start: u32,
    pub end: u32,
    pub match_len: u32,
    pub stays: u32,
    pub log_prob: f32,
}

impl Query {
    /// 合法：区间非空，且不是全零哨兵。
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
            && (self.start != 0
                || self.end != 0
                || self.match_len != 0
                || self.stays != 0
                || self.log_prob != 0.0)
    }

    pub fn total_events(&self) -> u32 {
        self.match_len + self.stays
    }

    pub fn avg_log_prob(&self) -> f32 {
        self.log_prob / self.total_events() as f32
    }

    pub fn same_range(&self, other: &Query) -> bool {
        self.start == other.start && self.end == other.end && self.match_len == other.match_len
    }

    /// 新来者 `self` 是否在重叠处压过 `other`：更长的匹配获胜，
    /// 其次更高的概率；完全平手时后插入者获胜。
    fn eclipses(&self, other: &Query) -> bool {
        self.match_len > other.match_len
            || (self.match_len == other.match_len && self.log_prob >= other.log_prob)
    }

    fn fragment(&self, start: u32, end: u32) -> Query {
        Query { start, end, ..self.clone() }
    }
}

/// 单个事件步的查询前沿：按 `(start, end)` 升序、两两不相交的
/// 区间集合。
///
/// `insert` 实现带合并的插入：新区间与既有区间重叠时，重叠段归
/// 胜者（见 [`Query::eclipses`]），双方未被覆盖的残段按原注解保
/// 留，结果重新铺回集合。任何插入序列之后不变量保持：区间互不
/// 重叠，且每个曾被覆盖的位置上存活的恰是该处的胜者注解。
#[derive(Debug, Default)]
pub struct Frontier {
    queries: Vec<Query>,
}

impl Frontier {
    pub fn new() -> Self {
        Self { queries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn clear(&mut self) {
        self.queries.clear();
    }

    pub fn as_slice(&self) -> &[Query] {
        &self.queries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Query> {
        self.queries.iter()
    }

    pub fn insert(&mut self, q: Query) {
        if !q.is_valid() {
            return;
        }
        // 区间互不重叠且有序，故 end 同样单调：重叠者构成连续一段
        let lo = self.queries.partition_point(|e| e.end < q.start);
        let hi = lo + self.queries[lo..].partition_point(|e| e.start <= q.end);
        if lo == hi {
            self.queries.insert(lo, q);
            return;
        }

        let mut pieces: Vec<Query> = Vec::with_capacity((hi - lo) * 2 + 1);
        let mut cursor = q.start; // q 中尚未铺出的最左坐标
        for e in &self.queries[lo..hi] {
            if cursor < e.start {
                // q 在 e 之前的独占段
                pieces.push(q.fragment(cursor, e.start - 1));
            }
            if e.start < q.start {
                // e 在 q 左侧的残段
                pieces.push(e.fragment(e.start, q.start - 1));
            }
            let ol = e.start.max(q.start);
            let or = e.end.min(q.end);
            debug_assert!(ol <= or);
            let winner = if q.eclipses(e) { &q } else { e };
            pieces.push(winner.fragment(ol, or));
            if e.end > q.end {
                // e 在 q 右侧的残段（只可能发生在最后一个重叠者）
                pieces.push(e.fragment(q.end + 1, e.end));
            }
            cursor = or + 1;
        }
        if cursor <= q.end {
            pieces.push(q.fragment(cursor, q.end));
        }

        // 相邻且注解一致的碎片并回一个区间
        let mut merged: Vec<Query> = Vec::with_capacity(pieces.len());
        for p in pieces {
            if let Some(last) = merged.last_mut() {
                if last.end + 1 == p.start
                    && last.kmer == p.kmer
                    && last.match_len == p.match_len
                    && last.stays == p.stays
                    && last.log_prob == p.log_prob
                {
                    last.end = p.end;
                    continue;
                }
            }
            merged.push(p);
        }
        merged.retain(Query::is_valid);
        self.queries.splice(lo..hi, merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(start: u32, end: u32, match_len: u32, log_prob: f32) -> Query {
        Query { kmer: 0, start, end, match_len, stays: 0, log_prob }
    }

    fn assert_disjoint_sorted(f: &Frontier) {
        for w in f.as_slice().windows(2) {
            assert!(w[0].end < w[1].start, "overlap: {:?} vs {:?}", w[0], w[1]);
        }
    }

    #[test]
    fn insert_disjoint_keeps_order() {
        let mut f = Frontier::new();
        f.insert(q(10, 12, 1, -1.0));
        f.insert(q(1, 3, 1, -1.0));
        f.insert(q(5, 8, 1, -1.0));
        assert_eq!(f.len(), 3);
        assert_disjoint_sorted(&f);
        assert_eq!(f.as_slice()[0].start, 1);
        assert_eq!(f.as_slice()[2].start, 10);
    }

    #[test]
    fn longer_match_eclipses_overlap() {
        let mut f = Frontier::new();
        f.insert(q(1, 10, 1, -1.0));
        f.insert(q(4, 6, 3, -5.0));
        // 旧区间被劈成两段，中间归新来的长匹配
        assert_eq!(f.len(), 3);
        assert_disjoint_sorted(&f);
        let s = f.as_slice();
        assert_eq!((s[0].start, s[0].end, s[0].match_len), (1, 3, 1));
        assert_eq!((s[1].start, s[1].end, s[1].match_len), (4, 6, 3));
        assert_eq!((s[2].start, s[2].end, s[2].match_len), (7, 10, 1));
    }

    #[test]
    fn shorter_newcomer_survives_only_outside() {
        let mut f = Frontier::new();
        f.insert(q(4, 6, 3, -5.0));
        f.insert(q(1, 10, 1, -1.0));
        // 新来的短匹配在重叠处败北，两侧残段保留
        assert_eq!(f.len(), 3);
        assert_disjoint_sorted(&f);
        let s = f.as_slice();
        assert_eq!((s[0].start, s[0].end, s[0].match_len), (1, 3, 1));
        assert_eq!((s[1].start, s[1].end, s[1].match_len), (4, 6, 3));
        assert_eq!((s[2].start, s[2].end, s[2].match_len), (7, 10, 1));
    }

    #[test]
    fn equal_len_higher_prob_wins() {
        let mut f = Frontier::new();
        f.insert(q(1, 5, 2, -1.0));
        f.insert(q(3, 8, 2, -4.0));
        let s = f.as_slice();
        assert_eq!(s.len(), 2);
        // 重叠段 [3,5] 留给概率更高的旧区间
        assert_eq!((s[0].start, s[0].end), (1, 5));
        assert_eq!(s[0].log_prob, -1.0);
        assert_eq!((s[1].start, s[1].end), (6, 8));
        assert_eq!(s[1].log_prob, -4.0);
    }

    #[test]
    fn full_tie_newest_wins() {
        let mut f = Frontier::new();
        let mut a = q(1, 5, 2, -1.0);
        a.kmer = 7;
        f.insert(a);
        let mut b = q(1, 5, 2, -1.0);
        b.kmer = 9;
        f.insert(b);
        assert_eq!(f.len(), 1);
        assert_eq!(f.as_slice()[0].kmer, 9);
    }

    #[test]
    fn newcomer_spanning_several_intervals() {
        let mut f = Frontier::new();
        f.insert(q(2, 3, 4, -1.0));
        f.insert(q(6, 7, 1, -1.0));
        f.insert(q(10, 11, 2, -9.0));
        f.insert(q(1, 12, 2, -2.0));
        assert_disjoint_sorted(&f);
        let s = f.as_slice();
        // 覆盖 [1,12]：[2,3] 的长匹配顶住，[6,7] 被压过，
        // [10,11] 同长但概率低也被压过，其余归新来者
        assert_eq!(s.len(), 3);
        assert_eq!((s[0].start, s[0].end, s[0].match_len), (1, 1, 2));
        assert_eq!((s[1].start, s[1].end, s[1].match_len), (2, 3, 4));
        assert_eq!((s[2].start, s[2].end, s[2].match_len), (4, 12, 2));
    }

    #[test]
    fn invalid_queries_are_dropped() {
        let mut f = Frontier::new();
        f.insert(q(5, 4, 1, -1.0)); // 空区间
        f.insert(Query { kmer: 0, start: 0, end: 0, match_len: 0, stays: 0, log_prob: 0.0 });
        assert!(f.is_empty());
    }

    /// 属性 6 的随机对拍：逐位置维护“当前胜者”的朴素 oracle，
    /// 任意插入序列后前沿在每个位置的注解与 oracle 一致。
    #[test]
    fn random_inserts_match_position_oracle() {
        const SPAN: usize = 64;
        let mut f = Frontier::new();
        let mut oracle: Vec<Option<Query>> = vec![None; SPAN + 1];

        let mut x: u32 = 42;
        let mut rng = || {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (x >> 16) as usize
        };

        for step in 0..300 {
            let a = rng() % SPAN + 1;
            let b = rng() % SPAN + 1;
            let (l, r) = if a <= b { (a, b) } else { (b, a) };
            let nq = Query {
                kmer: (step % 4) as u16,
                start: l as u32,
                end: r as u32,
                match_len: (rng() % 4 + 1) as u32,
                stays: 0,
                log_prob: -((rng() % 8) as f32),
            };
            for pos in l..=r {
                let beats = match &oracle[pos] {
                    None => true,
                    Some(old) => {
                        nq.match_len > old.match_len
                            || (nq.match_len == old.match_len && nq.log_prob >= old.log_prob)
                    }
                };
                if beats {
                    oracle[pos] = Some(nq.clone());
                }
            }
            f.insert(nq);

            assert_disjoint_sorted(&f);
            let mut covered = vec![false; SPAN + 1];
            for e in f.iter() {
                for pos in e.start..=e.end {
                    covered[pos as usize] = true;
                    let own = oracle[pos as usize].as_ref().unwrap();
                    assert_eq!(e.kmer, own.kmer, "pos {}", pos);
                    assert_eq!(e.match_len, own.match_len, "pos {}", pos);
                    assert_eq!(e.log_prob, own.log_prob, "pos {}", pos);
                }
            }
            for pos in 1..=SPAN {
                assert_eq!(covered[pos], oracle[pos].is_some(), "pos {}", pos);
            }
        }
    }
}
