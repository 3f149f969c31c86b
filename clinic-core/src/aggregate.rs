//! Gom nhóm bản ghi theo khóa và gấp (fold) mỗi nhóm vào một bộ tích lũy.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::metrics;

/// Một nhóm sau khi tổng hợp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bucket<K, A> {
    pub key: K,
    pub count: usize,
    pub acc: A,
}

/// Gấp `records` theo `key_fn` trong một lượt duy nhất.
///
/// Mọi khóa trong `seed_keys` đều xuất hiện trong kết quả kể cả khi không có
/// bản ghi nào khớp, nên đầu vào rỗng cho ra các nhóm toàn số 0. Kết quả được
/// sắp xếp theo khóa.
pub fn aggregate<R, K, A, I, F, G>(
    records: &[R],
    seed_keys: I,
    key_fn: F,
    reducer: G,
) -> Vec<Bucket<K, A>>
where
    K: Eq + Hash + Ord,
    A: Default,
    I: IntoIterator<Item = K>,
    F: Fn(&R) -> K,
    G: Fn(&mut A, &R),
{
    let mut groups: HashMap<K, (usize, A)> = HashMap::new();
    for key in seed_keys {
        groups.entry(key).or_default();
    }

    for record in records {
        let (count, acc) = groups.entry(key_fn(record)).or_default();
        *count += 1;
        reducer(acc, record);
    }

    let mut buckets: Vec<Bucket<K, A>> = groups
        .into_iter()
        .map(|(key, (count, acc))| Bucket { key, count, acc })
        .collect();
    buckets.sort_by(|a, b| a.key.cmp(&b.key));
    buckets
}

/// Tổng số bản ghi của mọi nhóm.
pub fn total_count<K, A>(buckets: &[Bucket<K, A>]) -> usize {
    buckets.iter().map(|bucket| bucket.count).sum()
}

/// Tập mẫu số thực (thời gian chờ, số ngày đặt trước...).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Samples(Vec<f64>);

impl Samples {
    pub fn push(&mut self, value: f64) {
        self.0.push(value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        metrics::mean(&self.0)
    }

    pub fn median(&self) -> f64 {
        metrics::median(&self.0)
    }

    pub fn percentile(&self, p: f64) -> f64 {
        metrics::percentile(&self.0, p)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

impl FromIterator<f64> for Samples {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
