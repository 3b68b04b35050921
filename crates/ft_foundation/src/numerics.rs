// crates/ft_foundation/src/numerics.rs

//! Kahan 求和算法
//!
//! 受体汇总会把成百上千条链接负荷相加，量级跨度可达十个数量级，
//! 使用补偿求和保证结果与累加顺序基本无关。

/// Kahan 补偿求和器
///
/// # 示例
///
/// ```rust
/// use ft_foundation::numerics::KahanSum;
///
/// let total = KahanSum::sum_iter(vec![1e12, 1.0, -1e12]);
/// assert!((total - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    /// 创建新的求和器
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个值
    #[inline]
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    /// 获取当前求和值
    #[inline]
    pub fn value(&self) -> f64 {
        self.sum
    }

    /// 从迭代器求和
    pub fn sum_iter<I: IntoIterator<Item = f64>>(iter: I) -> f64 {
        let mut kahan = Self::new();
        for v in iter {
            kahan.add(v);
        }
        kahan.value()
    }
}

/// 算术平均，空切片返回 `None`
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(KahanSum::sum_iter(values.iter().copied()) / values.len() as f64)
}

/// 总体标准差，空切片返回 `None`
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = KahanSum::sum_iter(values.iter().map(|v| (v - m).powi(2))) / values.len() as f64;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kahan_sum_f64() {
        let data = vec![0.1f64; 1000];
        let sum = KahanSum::sum_iter(data.iter().cloned());
        assert!((sum - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_mean_and_std() {
        assert!(mean(&[]).is_none());
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v).unwrap() - 5.0).abs() < 1e-12);
        assert!((std_dev(&v).unwrap() - 2.0).abs() < 1e-12);
    }
}
