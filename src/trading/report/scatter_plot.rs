//! 夏普比率 vs 年化收益 散点图 (SVG)
//!
//! - x 轴: 年化平均收益（百分比刻度）
//! - y 轴: 夏普比率
//! - 点面积与市值成正比，最小 30
//! - 颜色按夏普比率映射到红-黄-绿色带
//! - 市值前 N 的代码标注名称

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::AppResult;
use crate::trading::model::MetricsTable;

/// 最大点面积 (pt²)
const MAX_POINT_AREA: f64 = 800.0;
/// 最小点面积 (pt²)
const MIN_POINT_AREA: f64 = 30.0;

/// RdYlGn 11 级色带
const RD_YL_GN: [(u8, u8, u8); 11] = [
    (0xa5, 0x00, 0x26),
    (0xd7, 0x30, 0x27),
    (0xf4, 0x6d, 0x43),
    (0xfd, 0xae, 0x61),
    (0xfe, 0xe0, 0x8b),
    (0xff, 0xff, 0xbf),
    (0xd9, 0xef, 0x8b),
    (0xa6, 0xd9, 0x6a),
    (0x66, 0xbd, 0x63),
    (0x1a, 0x98, 0x50),
    (0x00, 0x68, 0x37),
];

const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 170.0;
const MARGIN_TOP: f64 = 80.0;
const MARGIN_BOTTOM: f64 = 70.0;

#[derive(Debug, Clone)]
pub struct ScatterPlot {
    width: f64,
    height: f64,
    label_top_n: usize,
    title: String,
    subtitle: String,
}

impl Default for ScatterPlot {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 800.0,
            label_top_n: 20,
            title: "S&P 500: Sharpe Ratio vs Annualized Return".to_string(),
            subtitle: "Size = market cap".to_string(),
        }
    }
}

impl ScatterPlot {
    pub fn with_label_top_n(mut self, n: usize) -> Self {
        self.label_top_n = n;
        self
    }

    pub fn save(&self, path: &Path, table: &MetricsTable) -> AppResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.render(table, &mut out)?;
        out.flush()?;
        info!("Plot saved to {} ({} points)", path.display(), table.len());
        Ok(())
    }

    pub fn to_svg_string(&self, table: &MetricsTable) -> String {
        let mut buf = Vec::new();
        // 写入 Vec 不会失败
        let _ = self.render(table, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn render<W: Write>(&self, table: &MetricsTable, out: &mut W) -> io::Result<()> {
        let plot_w = self.width - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = self.height - MARGIN_TOP - MARGIN_BOTTOM;

        let x_axis = Axis::fit(table.iter().map(|r| r.average_return()));
        let y_axis = Axis::fit(table.iter().map(|r| r.sharpe_ratio()));
        let (sharpe_min, sharpe_max) = min_max(table.iter().map(|r| r.sharpe_ratio()));

        let px = |x: f64| MARGIN_LEFT + x_axis.fraction(x) * plot_w;
        let py = |y: f64| MARGIN_TOP + (1.0 - y_axis.fraction(y)) * plot_h;

        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="DejaVu Sans, Arial, sans-serif">"#,
            w = self.width,
            h = self.height
        )?;
        writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#)?;

        // 标题
        writeln!(
            out,
            r#"<text x="{:.1}" y="32" font-size="18" text-anchor="middle">{}</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            escape_xml(&self.title)
        )?;
        writeln!(
            out,
            r#"<text x="{:.1}" y="54" font-size="14" text-anchor="middle">{}</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            escape_xml(&self.subtitle)
        )?;

        // 网格与刻度
        writeln!(
            out,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#eaeaf2"/>"##,
            MARGIN_LEFT, MARGIN_TOP, plot_w, plot_h
        )?;
        let x_decimals = if x_axis.step * 100.0 < 1.0 { 1 } else { 0 };
        for tick in x_axis.ticks() {
            let x = px(tick);
            writeln!(
                out,
                r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="white" stroke-width="1"/>"#,
                MARGIN_TOP,
                MARGIN_TOP + plot_h
            )?;
            writeln!(
                out,
                r#"<text x="{x:.1}" y="{:.1}" font-size="11" text-anchor="middle">{:.*}%</text>"#,
                MARGIN_TOP + plot_h + 18.0,
                x_decimals,
                tick * 100.0
            )?;
        }
        for tick in y_axis.ticks() {
            let y = py(tick);
            writeln!(
                out,
                r#"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="white" stroke-width="1"/>"#,
                MARGIN_LEFT,
                MARGIN_LEFT + plot_w
            )?;
            writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{}</text>"#,
                MARGIN_LEFT - 8.0,
                y + 4.0,
                format_tick(tick, y_axis.step)
            )?;
        }

        // 零值参考线
        writeln!(
            out,
            r#"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="black" stroke-width="0.8" stroke-dasharray="6,4" stroke-opacity="0.5"/>"#,
            MARGIN_LEFT,
            MARGIN_LEFT + plot_w,
            y = py(0.0)
        )?;
        writeln!(
            out,
            r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="black" stroke-width="0.8" stroke-dasharray="6,4" stroke-opacity="0.5"/>"#,
            MARGIN_TOP,
            MARGIN_TOP + plot_h,
            x = px(0.0)
        )?;

        // 数据点：按市值降序绘制，小点在上层
        let max_cap = table.max_market_cap();
        for row in table {
            let area = point_area(row.market_cap_or_zero(), max_cap);
            let (r, g, b) = colormap(normalize(row.sharpe_ratio(), sharpe_min, sharpe_max));
            writeln!(
                out,
                r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="rgb({},{},{})" fill-opacity="0.7" stroke="grey" stroke-width="0.5"><title>{}</title></circle>"#,
                px(row.average_return()),
                py(row.sharpe_ratio()),
                (area / std::f64::consts::PI).sqrt(),
                r,
                g,
                b,
                escape_xml(row.symbol())
            )?;
        }

        for row in table.top(self.label_top_n) {
            writeln!(
                out,
                r#"<text x="{:.2}" y="{:.2}" font-size="9" text-anchor="start">{}</text>"#,
                px(row.average_return()) + 6.0,
                py(row.sharpe_ratio()) - 6.0,
                escape_xml(row.symbol())
            )?;
        }

        // 坐标轴标题
        writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" font-size="14" text-anchor="middle">Annualized Average Return (1Y)</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            self.height - 20.0
        )?;
        writeln!(
            out,
            r#"<text x="24" y="{y:.1}" font-size="14" text-anchor="middle" transform="rotate(-90 24 {y:.1})">Sharpe Ratio</text>"#,
            y = MARGIN_TOP + plot_h / 2.0
        )?;

        self.render_colorbar(out, plot_h, sharpe_min, sharpe_max)?;
        writeln!(out, "</svg>")
    }

    fn render_colorbar<W: Write>(
        &self,
        out: &mut W,
        plot_h: f64,
        min: f64,
        max: f64,
    ) -> io::Result<()> {
        let x = self.width - MARGIN_RIGHT + 40.0;
        let bar_w = 18.0;

        writeln!(
            out,
            r#"<defs><linearGradient id="sharpe-scale" x1="0" y1="1" x2="0" y2="0">"#
        )?;
        let last = (RD_YL_GN.len() - 1) as f64;
        for (i, (r, g, b)) in RD_YL_GN.iter().enumerate() {
            writeln!(
                out,
                r#"<stop offset="{:.3}" stop-color="rgb({},{},{})"/>"#,
                i as f64 / last,
                r,
                g,
                b
            )?;
        }
        writeln!(out, "</linearGradient></defs>")?;
        writeln!(
            out,
            r#"<rect x="{x:.1}" y="{:.1}" width="{bar_w}" height="{:.1}" fill="url(#sharpe-scale)" stroke="grey" stroke-width="0.5"/>"#,
            MARGIN_TOP,
            plot_h
        )?;

        for (fraction, value) in [(0.0, min), (0.5, (min + max) / 2.0), (1.0, max)] {
            writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" font-size="11">{:.2}</text>"#,
                x + bar_w + 6.0,
                MARGIN_TOP + (1.0 - fraction) * plot_h + 4.0,
                value
            )?;
        }

        let label_x = x + bar_w + 60.0;
        writeln!(
            out,
            r#"<text x="{label_x:.1}" y="{y:.1}" font-size="12" text-anchor="middle" transform="rotate(-90 {label_x:.1} {y:.1})">Sharpe Ratio</text>"#,
            y = MARGIN_TOP + plot_h / 2.0
        )
    }
}

/// 数据范围（总是包含0）加 5% 留白，刻度间隔取 1/2/5 × 10^n
#[derive(Debug, Clone, Copy, PartialEq)]
struct Axis {
    min: f64,
    max: f64,
    step: f64,
}

impl Axis {
    fn fit(values: impl Iterator<Item = f64>) -> Self {
        let (lo, hi) = min_max(values);
        let (lo, hi) = (lo.min(0.0), hi.max(0.0));
        let span = if hi - lo > f64::EPSILON { hi - lo } else { 1.0 };
        let pad = span * 0.05;
        let (min, max) = (lo - pad, hi + pad);
        Self {
            min,
            max,
            step: nice_step(max - min, 8.0),
        }
    }

    fn fraction(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }

    fn ticks(&self) -> impl Iterator<Item = f64> + '_ {
        let first = (self.min / self.step).ceil() as i64;
        let last = (self.max / self.step).floor() as i64;
        (first..=last).map(move |i| i as f64 * self.step)
    }
}

fn nice_step(span: f64, target_ticks: f64) -> f64 {
    let raw = span / target_ticks;
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let nice = if normalized < 1.5 {
        1.0
    } else if normalized < 3.0 {
        2.0
    } else if normalized < 7.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10().floor()) as usize
    };
    // 避免 "-0.0"
    let value = if value.abs() < step * 1e-6 { 0.0 } else { value };
    format!("{:.*}", decimals, value)
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        })
        .unwrap_or((0.0, 0.0))
}

/// 点面积: 市值/最大市值 × 800，最小 30
pub fn point_area(market_cap: f64, max_market_cap: f64) -> f64 {
    if max_market_cap <= 0.0 {
        return MIN_POINT_AREA;
    }
    (market_cap / max_market_cap * MAX_POINT_AREA).max(MIN_POINT_AREA)
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max - min <= f64::EPSILON {
        return 0.5;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// 0 -> 深红, 0.5 -> 浅黄, 1 -> 深绿
pub fn colormap(t: f64) -> (u8, u8, u8) {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
    let scaled = t * (RD_YL_GN.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(RD_YL_GN.len() - 2);
    let frac = scaled - i as f64;
    let (r0, g0, b0) = RD_YL_GN[i];
    let (r1, g1, b1) = RD_YL_GN[i + 1];
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    (lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
