//! S&P 500 成分股列表（Wikipedia 成分股表格）

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info};

use crate::app_config::ScanConfig;
use crate::error::{AppError, AppResult};
use crate::trading::yahoo::BROWSER_USER_AGENT;

const LISTING_TITLE: &str = "S&P 500 CONSTITUENTS - WIKIPEDIA";

/// 成分股表格中的一行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constituent {
    pub symbol: String,
    pub security: String,
    pub sector: String,
    pub sub_industry: String,
    pub headquarters: String,
    pub date_added: String,
    pub cik: String,
    pub founded: String,
}

impl Constituent {
    const HEADERS: [&'static str; 8] = [
        "Symbol",
        "Security",
        "GICS Sector",
        "GICS Sub-Industry",
        "Headquarters Location",
        "Date added",
        "CIK",
        "Founded",
    ];

    fn columns(&self) -> [&str; 8] {
        [
            &self.symbol,
            &self.security,
            &self.sector,
            &self.sub_industry,
            &self.headquarters,
            &self.date_added,
            &self.cik,
            &self.founded,
        ]
    }
}

/// Yahoo 使用 "-" 作为股票类别分隔符: BRK.B -> BRK-B
pub fn normalize_listing_symbol(symbol: &str) -> String {
    symbol.trim().replace('.', "-")
}

pub struct UniverseClient {
    client: reqwest::Client,
    url: String,
}

impl UniverseClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &ScanConfig) -> AppResult<Self> {
        Self::new(config.universe_url.clone(), config.universe_timeout)
    }

    /// 下载并解析成分股表格
    pub async fn fetch_constituents(&self) -> AppResult<Vec<Constituent>> {
        debug!("请求成分股列表: {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AppError::UniverseError(format!("请求失败: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UniverseError(format!(
                "HTTP {} - {}",
                status.as_u16(),
                self.url
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AppError::UniverseError(format!("读取响应失败: {}", e)))?;
        let constituents = parse_constituents(&html)?;
        info!("获取成分股 {} 个", constituents.len());
        Ok(constituents)
    }
}

/// 从页面 HTML 中解析 `id="constituents"` 表格
pub fn parse_constituents(html: &str) -> AppResult<Vec<Constituent>> {
    let parser = TableParser::new()?;
    let table = parser
        .table
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| AppError::UniverseError("未找到成分股表格".to_string()))?
        .as_str();

    let mut constituents = Vec::new();
    for row in parser.row.captures_iter(table) {
        let Some(row_html) = row.get(1) else {
            continue;
        };
        // 表头行只包含 <th>
        let cells: Vec<String> = parser
            .cell
            .captures_iter(row_html.as_str())
            .filter(|c| c.get(1).map(|m| m.as_str()) == Some("d"))
            .filter_map(|c| c.get(2).map(|m| parser.cell_text(m.as_str())))
            .collect();
        if cells.is_empty() {
            continue;
        }

        let symbol = normalize_listing_symbol(&cells[0]);
        if symbol.is_empty() {
            continue;
        }
        let field = |i: usize| cells.get(i).cloned().unwrap_or_default();
        constituents.push(Constituent {
            symbol,
            security: field(1),
            sector: field(2),
            sub_industry: field(3),
            headquarters: field(4),
            date_added: field(5),
            cik: field(6),
            founded: field(7),
        });
    }

    if constituents.is_empty() {
        return Err(AppError::UniverseError("成分股表格为空".to_string()));
    }
    Ok(constituents)
}

/// 写出带标题的定宽文本列表
pub fn write_listing(path: &Path, constituents: &[Constituent]) -> AppResult<()> {
    let mut widths = Constituent::HEADERS.map(|h| h.chars().count());
    for c in constituents {
        for (width, col) in widths.iter_mut().zip(c.columns()) {
            *width = (*width).max(col.chars().count());
        }
    }

    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", LISTING_TITLE)?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out)?;
    writeln!(out, "{}", format_row(&Constituent::HEADERS, &widths))?;
    for c in constituents {
        writeln!(out, "{}", format_row(&c.columns(), &widths))?;
    }
    out.flush()?;

    info!("成分股列表已写入 {}", path.display());
    Ok(())
}

fn format_row(columns: &[&str; 8], widths: &[usize; 8]) -> String {
    columns
        .iter()
        .zip(widths)
        .map(|(col, width)| format!("{:<width$}", col, width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

struct TableParser {
    table: Regex,
    row: Regex,
    cell: Regex,
    tag: Regex,
    footnote: Regex,
    space: Regex,
}

impl TableParser {
    fn new() -> AppResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| AppError::UniverseError(format!("正则错误: {}", e)))
        };
        Ok(Self {
            table: compile(r#"(?s)<table[^>]*id="constituents"[^>]*>(.*?)</table>"#)?,
            row: compile(r"(?s)<tr[^>]*>(.*?)</tr>")?,
            cell: compile(r"(?s)<t([dh])[^>]*>(.*?)</t[dh]>")?,
            tag: compile(r"<[^>]*>")?,
            footnote: compile(r"\[\d+\]")?,
            space: compile(r"\s+")?,
        })
    }

    fn cell_text(&self, raw: &str) -> String {
        let text = self.tag.replace_all(raw, "");
        let text = self.footnote.replace_all(&text, "");
        let text = decode_entities(&text);
        self.space.replace_all(&text, " ").trim().to_string()
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
