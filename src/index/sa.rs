use crate::util::kmer::KmerId;

/// 构建 k-mer 序列的后缀数组（倍增法，O(n log n) 排序）。
///
/// 与普通后缀数组不同之处：
/// - 符号顺序不是数值序，而是由模型比较器导出的稠密秩
///   `symbol_rank[c]`（见 `FmIndex::build`）；
/// - 后缀按**循环**方式延伸：越过序列末尾回绕到开头继续比较，
///   与 BWT 的循环旋转定义一致。走完一整圈仍相等的旋转视为
///   相等，先后次序任意。
pub fn build_sa(text: &[KmerId], symbol_rank: &[u32]) -> Vec<u32> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sa: Vec<usize> = (0..n).collect();
    let mut rank: Vec<u32> = text.iter().map(|&c| symbol_rank[c as usize]).collect();
    let mut tmp: Vec<u32> = vec![0; n];

    let mut k = 1usize;
    while k < n {
        sa.sort_unstable_by(|&i, &j| {
            let a = (rank[i], rank[(i + k) % n]);
            let b = (rank[j], rank[(j + k) % n]);
            a.cmp(&b)
        });

        tmp[sa[0]] = 0;
        for i in 1..n {
            let a = sa[i - 1];
            let b = sa[i];
            let prev = (rank[a], rank[(a + k) % n]);
            let curr = (rank[b], rank[(b + k) % n]);
            tmp[b] = tmp[a] + u32::from(curr != prev);
        }

        rank.copy_from_slice(&tmp);
        if rank[sa[n - 1]] as usize == n - 1 {
            break;
        }
        k <<= 1;
    }

    sa.into_iter().map(|x| x as u32).collect()
}
