pub mod risk_metrics;
