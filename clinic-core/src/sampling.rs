//! Lấy mẫu ngẫu nhiên có trọng số và nguồn ngẫu nhiên có thể gieo hạt.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ClinicError;

/// Tạo bộ sinh ngẫu nhiên. Cùng hạt giống cho cùng chuỗi số.
pub fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Dao động `value` trong khoảng ±`fraction`.
pub fn vary<R: Rng + ?Sized>(rng: &mut R, value: f64, fraction: f64) -> f64 {
    if fraction <= 0.0 {
        return value;
    }
    value * (1.0 + rng.gen_range(-fraction..=fraction))
}

/// Khoảng số lượng đóng hai đầu.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

/// Bảng phân loại có trọng số, lấy mẫu bằng quét trọng số cộng dồn.
#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    items: Vec<T>,
    cumulative: Vec<f64>,
    total: f64,
    last_positive: usize,
}

impl<T> WeightedTable<T> {
    /// Dựng bảng từ các cặp (giá trị, trọng số). Trọng số phải hữu hạn, không âm
    /// và có tổng dương.
    pub fn new<I>(name: &str, entries: I) -> Result<Self, ClinicError>
    where
        I: IntoIterator<Item = (T, f64)>,
    {
        let mut items = Vec::new();
        let mut cumulative = Vec::new();
        let mut total = 0.0;
        let mut last_positive = None;

        for (index, (item, weight)) in entries.into_iter().enumerate() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ClinicError::InvalidWeight {
                    label: format!("{name}[{index}]"),
                    weight,
                });
            }
            total += weight;
            if weight > 0.0 {
                last_positive = Some(index);
            }
            items.push(item);
            cumulative.push(total);
        }

        if items.is_empty() {
            return Err(ClinicError::EmptyTable(name.to_string()));
        }
        let last_positive = last_positive.ok_or_else(|| ClinicError::InvalidWeight {
            label: format!("{name} (tổng trọng số)"),
            weight: total,
        })?;

        Ok(Self {
            items,
            cumulative,
            total,
            last_positive,
        })
    }

    /// Rút một phần tử: một lần bốc thăm trong `[0, total)`, so với trọng số cộng dồn.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        let draw = rng.gen::<f64>() * self.total;
        let index = self
            .cumulative
            .iter()
            .position(|acc| draw < *acc)
            .unwrap_or(self.last_positive);
        &self.items[index]
    }

    /// Xác suất chọn phần tử thứ `index`.
    pub fn probability(&self, index: usize) -> f64 {
        let Some(acc) = self.cumulative.get(index) else {
            return 0.0;
        };
        let previous = if index == 0 {
            0.0
        } else {
            self.cumulative[index - 1]
        };
        (acc - previous) / self.total
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn observed_frequencies_follow_weights() {
        let table = WeightedTable::new("segment", [("a", 0.5), ("b", 0.3), ("c", 0.2)]).unwrap();
        let mut rng = rng_for(Some(42));
        let draws = 100_000;
        let mut counts = [0usize; 3];
        for _ in 0..draws {
            match *table.sample(&mut rng) {
                "a" => counts[0] += 1,
                "b" => counts[1] += 1,
                _ => counts[2] += 1,
            }
        }
        for (count, expected) in counts.iter().zip([0.5, 0.3, 0.2]) {
            assert_abs_diff_eq!(*count as f64 / draws as f64, expected, epsilon = 0.02);
        }
    }

    #[test]
    fn zero_weight_entry_is_never_drawn() {
        let table = WeightedTable::new("t", [(1, 1.0), (2, 0.0), (3, 1.0), (4, 0.0)]).unwrap();
        let mut rng = rng_for(Some(1));
        for _ in 0..10_000 {
            let value = *table.sample(&mut rng);
            assert!(value == 1 || value == 3);
        }
    }

    #[test]
    fn weights_need_not_sum_to_one() {
        let table = WeightedTable::new("t", [("x", 3.0), ("y", 1.0)]).unwrap();
        assert_abs_diff_eq!(table.probability(0), 0.75);
        assert_abs_diff_eq!(table.probability(1), 0.25);
        assert_abs_diff_eq!(table.probability(5), 0.0);
    }

    #[test]
    fn rejects_invalid_tables() {
        let empty: Vec<(u8, f64)> = Vec::new();
        assert!(matches!(
            WeightedTable::new("empty", empty),
            Err(ClinicError::EmptyTable(name)) if name == "empty"
        ));
        assert!(matches!(
            WeightedTable::new("neg", [(1, -0.5)]),
            Err(ClinicError::InvalidWeight { .. })
        ));
        assert!(matches!(
            WeightedTable::new("nan", [(1, f64::NAN)]),
            Err(ClinicError::InvalidWeight { .. })
        ));
        assert!(WeightedTable::new("zero", [(1, 0.0), (2, 0.0)]).is_err());
    }

    #[test]
    fn same_seed_same_sequence() {
        let table = WeightedTable::new("t", [(1, 0.2), (2, 0.3), (3, 0.5)]).unwrap();
        let mut a = rng_for(Some(9));
        let mut b = rng_for(Some(9));
        let left: Vec<i32> = (0..50).map(|_| *table.sample(&mut a)).collect();
        let right: Vec<i32> = (0..50).map(|_| *table.sample(&mut b)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn count_range_stays_in_bounds() {
        let range = CountRange::new(20, 50);
        let mut rng = rng_for(Some(3));
        for _ in 0..1_000 {
            let value = range.sample(&mut rng);
            assert!((20..=50).contains(&value));
        }
        assert_eq!(CountRange::new(4, 4).sample(&mut rng), 4);
    }

    #[test]
    fn vary_stays_within_fraction() {
        let mut rng = rng_for(Some(11));
        for _ in 0..1_000 {
            let value = vary(&mut rng, 100.0, 0.1);
            assert!((90.0..=110.0).contains(&value));
        }
        assert_eq!(vary(&mut rng, 5.0, 0.0), 5.0);
    }
}
