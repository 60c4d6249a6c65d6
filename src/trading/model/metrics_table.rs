use std::cmp::Ordering;

use crate::error::AppError;
use crate::trading::model::TickerMetrics;

/// 按市值降序排列的指标表（市值相同按代码升序），构造后只读且不为空
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    rows: Vec<TickerMetrics>,
}

impl MetricsTable {
    /// 汇总采集结果并排序；没有任何记录时返回 `EmptyResult`
    pub fn from_records(mut records: Vec<TickerMetrics>) -> Result<Self, AppError> {
        if records.is_empty() {
            return Err(AppError::EmptyResult);
        }
        records.sort_by(compare_rows);
        Ok(Self { rows: records })
    }

    pub fn rows(&self) -> &[TickerMetrics] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 市值最大的前 n 条
    pub fn top(&self, n: usize) -> &[TickerMetrics] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn max_market_cap(&self) -> f64 {
        self.rows
            .first()
            .map(|r| r.market_cap_or_zero())
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TickerMetrics> {
        self.rows.iter()
    }
}

fn compare_rows(a: &TickerMetrics, b: &TickerMetrics) -> Ordering {
    b.market_cap_or_zero()
        .total_cmp(&a.market_cap_or_zero())
        .then_with(|| a.symbol().cmp(b.symbol()))
}

impl<'a> IntoIterator for &'a MetricsTable {
    type Item = &'a TickerMetrics;
    type IntoIter = std::slice::Iter<'a, TickerMetrics>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
