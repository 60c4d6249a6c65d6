use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 单日收盘价
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// 单个代码在回看窗口内的日收盘价序列
///
/// 构造时按日期升序排序；同一日期出现多次时保留最后一条，
/// 因此序列始终有序且日期不重复。
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        // 稳定排序保证同日期的原始先后顺序，便于保留最后一条
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }
        Self { points: deduped }
    }

    /// 由按时间排列的收盘价直接构造，日期从 `start` 起逐日递增（测试与离线计算用）
    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Self {
        let points = closes
            .iter()
            .zip(start.iter_days())
            .map(|(close, date)| PricePoint::new(date, *close))
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.close)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

/// 历史数据回看窗口（对应行情接口的 range 参数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LookbackRange {
    OneMonth,
    ThreeMonths,
    SixMonths,
    #[default]
    OneYear,
    TwoYears,
    FiveYears,
    YearToDate,
    Max,
}

impl LookbackRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookbackRange::OneMonth => "1mo",
            LookbackRange::ThreeMonths => "3mo",
            LookbackRange::SixMonths => "6mo",
            LookbackRange::OneYear => "1y",
            LookbackRange::TwoYears => "2y",
            LookbackRange::FiveYears => "5y",
            LookbackRange::YearToDate => "ytd",
            LookbackRange::Max => "max",
        }
    }
}

impl fmt::Display for LookbackRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookbackRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1mo" => Ok(LookbackRange::OneMonth),
            "3mo" => Ok(LookbackRange::ThreeMonths),
            "6mo" => Ok(LookbackRange::SixMonths),
            "1y" => Ok(LookbackRange::OneYear),
            "2y" => Ok(LookbackRange::TwoYears),
            "5y" => Ok(LookbackRange::FiveYears),
            "ytd" => Ok(LookbackRange::YearToDate),
            "max" => Ok(LookbackRange::Max),
            other => Err(AppError::ConfigError(format!(
                "不支持的回看窗口: {}（可选 1mo/3mo/6mo/1y/2y/5y/ytd/max）",
                other
            ))),
        }
    }
}
