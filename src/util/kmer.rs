use anyhow::{bail, Result};

/// k-mer 标识符。按 2-bit 编码打包（首个碱基在最高位），
/// 因此数值顺序即字典序。
pub type KmerId = u16;

pub const BASE_COUNT: usize = 4; // {0:A, 1:C, 2:G, 3:T}

pub const BASE_CHARS: [u8; BASE_COUNT] = [b'A', b'C', b'G', b'T'];

#[inline]
pub fn base_to_code(b: u8) -> KmerId {
    match b.to_ascii_uppercase() {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' | b'U' => 3,
        _ => 0, // ambiguity codes collapse to A
    }
}

#[inline]
pub fn code_to_base(c: KmerId) -> u8 {
    BASE_CHARS[(c as usize) % BASE_COUNT]
}

/// 字母表大小：4^k。
#[inline]
pub fn kmer_count(k: usize) -> usize {
    BASE_COUNT.pow(k as u32)
}

/// 将 ASCII k-mer 字符串打包为标识符（k ≤ 8）。
pub fn str_to_kmer(s: &[u8]) -> KmerId {
    let mut id: u32 = 0;
    for &b in s {
        id = (id << 2) | base_to_code(b) as u32;
    }
    id as KmerId
}

/// 解包标识符为 ASCII k-mer 字符串。
pub fn kmer_to_str(id: KmerId, k: usize) -> String {
    let mut out = vec![0u8; k];
    for i in 0..k {
        let shift = 2 * (k - 1 - i);
        out[i] = code_to_base((id >> shift) & 0b11);
    }
    String::from_utf8(out).unwrap_or_default()
}

/// 将参考序列翻译为期望 k-mer 序列：位置 i 的符号是窗口
/// seq[i..i+k] 的标识符。非 ACGT 碱基按 A 处理（见 DESIGN.md）。
/// 序列短于 k 时无法产生任何符号，报错。
pub fn seq_to_kmer_ids(seq: &[u8], k: usize) -> Result<Vec<KmerId>> {
    if k == 0 || k > 8 {
        bail!("k must be in 1..=8, got {}", k);
    }
    if seq.len() < k {
        bail!(
            "reference length {} is shorter than k={}: empty k-mer sequence",
            seq.len(),
            k
        );
    }
    let mask = (kmer_count(k) - 1) as u32;
    let mut out = Vec::with_capacity(seq.len() - k + 1);
    let mut id: u32 = 0;
    for (i, &b) in seq.iter().enumerate() {
        id = ((id << 2) | base_to_code(b) as u32) & mask;
        if i + 1 >= k {
            out.push(id as KmerId);
        }
    }
    Ok(out)
}
