use anyhow::{bail, Result};

use crate::align::query::{Frontier, Query};
use crate::align::MapOpt;
use crate::index::fm::FmIndex;
use crate::model::{stay_prob, Event, KmerModel, NormParams};
use crate::util::kmer::KmerId;

/// 种子结果：查询（事件）坐标区间、参考坐标区间与平均对数概率。
#[derive(Debug, Clone, PartialEq)]
pub struct SeedResult {
    pub qry_start: i64,
    pub qry_end: i64,
    pub ref_start: u32,
    pub ref_end: u32,
    pub prob: f32,
}

/// 基于 LF 映射的种子搜索：从 `map_start` 起向前（事件下标递减）
/// 扩展前沿。
///
/// 对每个候选种子终点 `seed_end`（从 `map_start` 扫到
/// `opt.seed_end_min`，默认 0）：
/// 1. 以发射概率过阈值的全部 k-mer 的完整 F 区间播种新前沿；
/// 2. 逐事件后退。每个前沿节点尝试 stay 分支（同一 k-mer、区间不
///    变，受 `stay_thresh` 与发射阈值双重门控）与 match 分支（对
///    每个过阈值的邻居做一步 LF，匹配长度 +1）。达到 `seed_len`
///    的节点移入完成集，其余插入下一代前沿；
/// 3. 本步没有产生任何节点即停。
///
/// 前沿只保留两代（当前/下一代交换），阈值是语义门而非调试开关：
/// `event_thresh` 限制搜索宽度，`stay_thresh` 控制 stay 的宽容度，
/// `seed_thresh` 在出口处过滤种子。
pub fn lf_map<M: KmerModel>(
    fmi: &FmIndex<M>,
    events: &[Event],
    map_start: usize,
    seed_len: usize,
    norm: &NormParams,
    opt: &MapOpt,
) -> Result<Vec<SeedResult>> {
    if events.is_empty() {
        bail!("event array is empty");
    }
    if map_start >= events.len() {
        bail!("map_start {} out of range for {} events", map_start, events.len());
    }
    if seed_len == 0 {
        bail!("seed length must be positive");
    }

    let model = fmi.model();
    let sigma = model.kmer_count();

    // 每事件 × 每符号的发射概率，行优先（事件内连续），一次算好
    let mut ep = vec![0.0f32; (map_start + 1) * sigma];
    for e in 0..=map_start {
        let row = &mut ep[e * sigma..(e + 1) * sigma];
        for (k, slot) in row.iter_mut().enumerate() {
            *slot = model.event_match_prob(&events[e], k as KmerId, norm);
        }
    }

    let mut finished: Vec<Query> = Vec::new();
    let mut cur = Frontier::new();
    let mut next = Frontier::new();

    let seed_end_min = opt.seed_end_min.min(map_start);
    for seed_end in (seed_end_min..=map_start).rev() {
        cur.clear();
        let mut advanced = false;

        for k in 0..sigma {
            let p = ep[seed_end * sigma + k];
            if p < opt.event_thresh {
                continue;
            }
            if let Some((l, r)) = fmi.kmer_interval(k as KmerId) {
                let q =
                    Query { kmer: k as KmerId, start: l, end: r, match_len: 1, stays: 0, log_prob: p };
                if q.match_len < seed_len as u32 {
                    cur.insert(q);
                    advanced = true;
                } else {
                    finished.push(q);
                }
            }
        }

        let mut i = seed_end as i64 - 1;
        while i >= 0 && advanced {
            let e = i as usize;
            advanced = false;
            next.clear();
            let stay_ok = stay_prob(&events[e], &events[e + 1]) >= opt.stay_thresh;

            for q in cur.iter() {
                if stay_ok {
                    let p = ep[e * sigma + q.kmer as usize];
                    if p >= opt.event_thresh {
                        next.insert(Query {
                            stays: q.stays + 1,
                            log_prob: q.log_prob + p,
                            ..q.clone()
                        });
                        advanced = true;
                    }
                }

                for nb in model.neighbors(q.kmer) {
                    let p = ep[e * sigma + nb as usize];
                    if p < opt.event_thresh {
                        continue;
                    }
                    if let Some((l, r)) = fmi.lf(nb, q.start, q.end) {
                        let nq = Query {
                            kmer: nb,
                            start: l,
                            end: r,
                            match_len: q.match_len + 1,
                            stays: q.stays,
                            log_prob: q.log_prob + p,
                        };
                        if nq.match_len < seed_len as u32 {
                            next.insert(nq);
                            advanced = true;
                        } else {
                            finished.push(nq);
                        }
                    }
                }
            }

            std::mem::swap(&mut cur, &mut next);
            i -= 1;
        }
    }

    Ok(collect_results(fmi, &mut finished, map_start, opt.seed_thresh))
}

/// 把完成集换算成参考坐标结果。
///
/// 按 `(l, r, m)` 规范序遍历（同键取总概率最高者），对逐一重复的
/// `(l, r, m)` 去重；通过 `seed_thresh` 的查询在区间内每行发一条
/// 结果。越过参考末端回绕的种子直接跳过。对同一完成集重复调用
/// 产出相同结果。
pub(crate) fn collect_results<M: KmerModel>(
    fmi: &FmIndex<M>,
    finished: &mut [Query],
    map_start: usize,
    seed_thresh: f32,
) -> Vec<SeedResult> {
    finished.sort_unstable_by(|a, b| {
        (a.start, a.end, a.match_len)
            .cmp(&(b.start, b.end, b.match_len))
            .then(b.log_prob.partial_cmp(&a.log_prob).unwrap_or(std::cmp::Ordering::Equal))
    });

    let n = fmi.len() as u32;
    let mut results = Vec::new();
    let mut prev: Option<(u32, u32, u32)> = None;
    for q in finished.iter() {
        if q.avg_log_prob() < seed_thresh {
            continue;
        }
        let key = (q.start, q.end, q.match_len);
        if prev == Some(key) {
            continue;
        }
        prev = Some(key);

        for row in q.start..=q.end {
            let ref_start = fmi.sa_pos(row);
            let ref_end = ref_start + q.match_len - 1;
            if ref_end >= n {
                continue;
            }
            results.push(SeedResult {
                qry_start: map_start as i64 - q.total_events() as i64 + 1,
                qry_end: map_start as i64,
                ref_start,
                ref_end,
                prob: q.avg_log_prob(),
            });
        }
    }
    results
}
