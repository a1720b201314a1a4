use crate::util::kmer::KmerId;

/// 根据后缀数组构建循环 BWT：`BWT[i] = T[(SA[i]-1) mod n]`。
/// 文本不带哨兵，回绕取真正的末位符号。
pub fn build_bwt(text: &[KmerId], sa: &[u32]) -> Vec<KmerId> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut bwt = Vec::with_capacity(n);
    for &p in sa {
        let i = p as usize;
        let prev = if i == 0 { text[n - 1] } else { text[i - 1] };
        bwt.push(prev);
    }
    bwt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::sa::build_sa;

    #[test]
    fn bwt_matches_cyclic_definition() {
        let text: Vec<KmerId> = vec![0, 1, 2, 3, 0, 1, 2, 3];
        let rank: Vec<u32> = (0..4).collect();
        let sa = build_sa(&text, &rank);
        let bwt = build_bwt(&text, &sa);
        for (i, &p) in sa.iter().enumerate() {
            let expect = text[(p as usize + text.len() - 1) % text.len()];
            assert_eq!(bwt[i], expect);
        }
    }

    #[test]
    fn bwt_of_acgtacgt() {
        // T = "acgtacgt"，BWT 应为 t t a a c c g g
        let text: Vec<KmerId> = vec![0, 1, 2, 3, 0, 1, 2, 3];
        let rank: Vec<u32> = (0..4).collect();
        let sa = build_sa(&text, &rank);
        let bwt = build_bwt(&text, &sa);
        assert_eq!(bwt, vec![3, 3, 0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn bwt_empty() {
        assert!(build_bwt(&[], &[]).is_empty());
    }
}
