use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::error::AppError;

/// 命令行持仓参数 `SYM=QTY`
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
}

impl Holding {
    pub fn new(symbol: impl Into<String>, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
        }
    }
}

impl FromStr for Holding {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (symbol, quantity) = s
            .split_once('=')
            .ok_or_else(|| AppError::ConfigError(format!("持仓格式应为 SYM=QTY: {}", s)))?;
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(AppError::ConfigError(format!("持仓代码为空: {}", s)));
        }
        let quantity: f64 = quantity
            .trim()
            .parse()
            .map_err(|_| AppError::ConfigError(format!("持仓数量无效: {}", s)))?;
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(AppError::ConfigError(format!("持仓数量无效: {}", s)));
        }
        Ok(Self::new(symbol.to_uppercase(), quantity))
    }
}

/// 持仓组合：代码 -> 数量
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Portfolio {
    stocks: BTreeMap<String, f64>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// 示例组合: AAPL×10, GOOGL×5, TSLA×5
    pub fn sample() -> Self {
        Self::from_holdings(&[
            Holding::new("AAPL", 10.0),
            Holding::new("GOOGL", 5.0),
            Holding::new("TSLA", 5.0),
        ])
    }

    pub fn from_holdings(holdings: &[Holding]) -> Self {
        let mut portfolio = Self::new();
        for holding in holdings {
            portfolio.add_stock(&holding.symbol, holding.quantity);
        }
        portfolio
    }

    /// 添加持仓，同一代码数量累加
    pub fn add_stock(&mut self, symbol: &str, quantity: f64) {
        *self
            .stocks
            .entry(symbol.trim().to_uppercase())
            .or_insert(0.0) += quantity;
    }

    pub fn quantity(&self, symbol: &str) -> Option<f64> {
        self.stocks.get(symbol).copied()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.stocks.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    /// 按给定价格计算总市值，缺少价格的持仓按0计
    pub fn calculate_total_value(&self, stock_prices: &HashMap<String, f64>) -> f64 {
        self.stocks
            .iter()
            .map(|(symbol, quantity)| stock_prices.get(symbol).copied().unwrap_or(0.0) * quantity)
            .sum()
    }
}
