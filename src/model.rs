use std::cmp::Ordering;
use std::f64::consts::PI;

use smallvec::SmallVec;
use statrs::distribution::{ContinuousCDF, StudentsT};

pub use crate::util::kmer::KmerId;
use crate::util::kmer::{self, BASE_COUNT};

/// 事件：一段纳米孔电流信号的摘要统计。
/// `length` 为采样点数，供 t 统计量使用。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub mean: f32,
    pub stdv: f32,
    pub start: u32,
    pub length: u32,
}

/// 读取级归一化参数：事件均值先经 `mean * scale + shift` 校准，
/// 再与孔模型的期望电流比较。核心不解释其来源。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormParams {
    pub scale: f32,
    pub shift: f32,
}

impl Default for NormParams {
    fn default() -> Self {
        Self { scale: 1.0, shift: 0.0 }
    }
}

/// k-mer 字母表 + 发射概率的外部契约。
///
/// 索引构建与种子搜索只通过该 trait 访问孔模型：
/// - `compare_kmers` 给出字母表全序（用于后缀数组与 F 表）；
/// - `neighbors` 枚举前进一个碱基可达的 k-mer（去掉首碱基、追加
///   A/C/G/T，至多 4 个）；
/// - `event_match_prob` 返回事件在某 k-mer 下的对数发射概率。
///
/// 前置条件：`compare_kmers` 必须是全序（构建时校验）；`neighbors`
/// 返回的 id 必须小于 `kmer_count()`（调试断言，见错误设计）。
pub trait KmerModel {
    fn kmer_count(&self) -> usize;

    fn compare_kmers(&self, a: KmerId, b: KmerId) -> Ordering;

    fn neighbors(&self, k: KmerId) -> SmallVec<[KmerId; 4]>;

    /// 对数发射概率。确定性：同一输入必须返回同一结果。
    fn event_match_prob(&self, event: &Event, k: KmerId, norm: &NormParams) -> f32;
}

/// 高斯孔模型：每个 k-mer 一个期望电流 (level_mean, level_stdv)。
/// 标识符按 2-bit 打包，数值序即字典序，因此比较是整数比较，
/// 邻居通过移位枚举。
#[derive(Debug, Clone)]
pub struct PoreModel {
    k: usize,
    level_mean: Vec<f32>,
    level_stdv: Vec<f32>,
}

impl PoreModel {
    /// 从 (level_mean, level_stdv) 表直接构建；表长必须等于 4^k。
    pub fn from_levels(k: usize, levels: Vec<(f32, f32)>) -> anyhow::Result<Self> {
        if k == 0 || k > 8 {
            anyhow::bail!("k must be in 1..=8, got {}", k);
        }
        let expect = kmer::kmer_count(k);
        if levels.len() != expect {
            anyhow::bail!(
                "model table has {} entries, expected 4^{} = {}",
                levels.len(),
                k,
                expect
            );
        }
        let (level_mean, level_stdv) = levels.into_iter().unzip();
        Ok(Self { k, level_mean, level_stdv })
    }

    /// 从 ONT 风格的模型表文件加载（见 `io::model`）。
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let (k, levels) = crate::io::model::read_model_table(path)?;
        Self::from_levels(k, levels)
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// 某 k-mer 的期望电流 (level_mean, level_stdv)。
    pub fn level(&self, k: KmerId) -> (f32, f32) {
        (self.level_mean[k as usize], self.level_stdv[k as usize])
    }
}

impl KmerModel for PoreModel {
    fn kmer_count(&self) -> usize {
        self.level_mean.len()
    }

    fn compare_kmers(&self, a: KmerId, b: KmerId) -> Ordering {
        a.cmp(&b)
    }

    fn neighbors(&self, k: KmerId) -> SmallVec<[KmerId; 4]> {
        let mask = (self.kmer_count() - 1) as u32;
        let base = (((k as u32) << 2) & mask) as KmerId;
        (0..BASE_COUNT as KmerId).map(|b| base | b).collect()
    }

    fn event_match_prob(&self, event: &Event, k: KmerId, norm: &NormParams) -> f32 {
        let x = (event.mean * norm.scale + norm.shift) as f64;
        let mu = self.level_mean[k as usize] as f64;
        let sigma = self.level_stdv[k as usize] as f64;
        if sigma <= 0.0 {
            return if x == mu { 0.0 } else { f32::NEG_INFINITY };
        }
        let z = (x - mu) / sigma;
        (-0.5 * z * z - (sigma * (2.0 * PI).sqrt()).ln()) as f32
    }
}

/// 相邻两个事件由同一 k-mer 产生（"stay"）的对数概率。
///
/// Welch t 检验：对两事件均值做 t 统计量，自由度取实数形式的
/// Welch–Satterthwaite 近似，返回互补 CDF 的对数。退化输入
/// （采样数不足、合并方差为零）给出确定性结果。
pub fn stay_prob(e1: &Event, e2: &Event) -> f32 {
    if e1.length < 2 || e2.length < 2 {
        return f32::NEG_INFINITY;
    }
    let var1 = (e1.stdv as f64) * (e1.stdv as f64);
    let var2 = (e2.stdv as f64) * (e2.stdv as f64);
    let n1 = e1.length as f64;
    let n2 = e2.length as f64;

    let pooled = var1 / n1 + var2 / n2;
    if pooled <= 0.0 {
        return if e1.mean == e2.mean { 0.0 } else { f32::NEG_INFINITY };
    }

    let t = ((e1.mean - e2.mean) as f64) / pooled.sqrt();
    let df = (pooled * pooled
        / ((var1 / n1) * (var1 / n1) / (n1 - 1.0) + (var2 / n2) * (var2 / n2) / (n2 - 1.0)))
        .max(1.0);

    let dist = match StudentsT::new(0.0, 1.0, df) {
        Ok(d) => d,
        Err(_) => return f32::NEG_INFINITY,
    };
    let q = (1.0 - dist.cdf(t.abs())).max(f64::MIN_POSITIVE);
    q.ln() as f32
}
