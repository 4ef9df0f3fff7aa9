// Report module
//
// The canonical result table handed to rendering, plus the presentation
// helpers around it: the HTML table shown on screen and the paginated
// printable document with its pass-through header fields.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::conversion::{DailyExtremes, FormatKind, HeaderMapping, COLUMN_LABELS, DATE_DISPLAY_FORMAT};

/// Rows per printed page
pub const DEFAULT_ITEMS_PER_PAGE: usize = 30;

/// Title printed at the top of every page
pub const REPORT_TITLE: &str = "DADOS DE TEMPERATURA E/OU UMIDADE";

const TABLE_CLASSES: &str = "table table-striped table-bordered";

/// Row counters for one conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// Non-blank rows below the chosen header
    pub rows_scanned: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

/// Daily min/max table, sorted by date ascending
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    pub format: FormatKind,
    pub mapping: HeaderMapping,
    pub stats: ConversionStats,
    pub columns: [&'static str; 5],
    pub rows: Vec<DailyExtremes>,
}

impl ResultTable {
    pub fn new(
        format: FormatKind,
        mapping: HeaderMapping,
        rows: Vec<DailyExtremes>,
        stats: ConversionStats,
    ) -> Self {
        Self {
            format,
            mapping,
            stats,
            columns: COLUMN_LABELS,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sheet row (0-based) where the header was found
    pub fn header_row(&self) -> usize {
        self.mapping.header_row
    }

    /// Render as a single-line HTML table
    pub fn to_html(&self) -> String {
        render_table(&self.rows)
    }

    /// Render as tab-separated text with a header line
    pub fn to_text(&self) -> String {
        let mut out = self.columns.join("\t");
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.display_cells().join("\t"));
            out.push('\n');
        }
        out
    }

    /// Number of printed pages at `per_page` rows per page
    pub fn total_pages(&self, per_page: usize) -> usize {
        self.rows.len().div_ceil(per_page.max(1))
    }

    /// Split rows into printed pages
    pub fn paginate(&self, per_page: usize) -> Vec<ReportPage<'_>> {
        let per_page = per_page.max(1);
        let total = self.total_pages(per_page);
        self.rows
            .chunks(per_page)
            .enumerate()
            .map(|(idx, rows)| ReportPage {
                number: idx + 1,
                total,
                rows,
            })
            .collect()
    }

    /// Printable document for this table
    pub fn printable<'a>(
        &'a self,
        metadata: &'a ReportMetadata,
        per_page: usize,
    ) -> PrintableReport<'a> {
        PrintableReport {
            metadata,
            pages: self.paginate(per_page),
        }
    }
}

/// One printed page of the table
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPage<'a> {
    /// 1-based page number
    pub number: usize,
    pub total: usize,
    pub rows: &'a [DailyExtremes],
}

impl ReportPage<'_> {
    pub fn label(&self) -> String {
        format!("{} / {}", self.number, self.total)
    }
}

/// Header fields of the printed document; passed through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportMetadata {
    pub formulation: String,
    pub revision: String,
    /// "Aprovado" or "Reprovado"
    pub approval_status: String,
    pub issue_date: String,
    pub study_number: String,
    pub equipment_code: String,
    pub test_number: String,
    pub reading_location: String,
}

impl Default for ReportMetadata {
    fn default() -> Self {
        Self {
            formulation: "FOR.2.031".to_string(),
            revision: "Rev. 00".to_string(),
            approval_status: "Aprovado".to_string(),
            issue_date: Local::now().date_naive().format(DATE_DISPLAY_FORMAT).to_string(),
            study_number: String::new(),
            equipment_code: String::new(),
            test_number: String::new(),
            reading_location: String::new(),
        }
    }
}

/// Paginated document: header block, table page and signature footer per page
#[derive(Debug, Clone)]
pub struct PrintableReport<'a> {
    pub metadata: &'a ReportMetadata,
    pub pages: Vec<ReportPage<'a>>,
}

impl PrintableReport<'_> {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// Render as a standalone HTML document, one section per printed page
    pub fn to_html(&self) -> String {
        let mut html = String::from(
            "<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\">",
        );
        html.push_str(&format!("<title>{}</title>", escape_html(REPORT_TITLE)));
        html.push_str(
            "<style>.page{page-break-after:always}.page:last-child{page-break-after:auto}\
             table{border-collapse:collapse;width:100%}td,th{border:1px solid #000;padding:2px 4px}</style>",
        );
        html.push_str("</head><body>");

        for page in &self.pages {
            html.push_str("<section class=\"page\">");
            html.push_str(&self.render_header(page));
            html.push_str(&render_table(page.rows));
            html.push_str(
                "<footer><p>Rubrica: ________________________________________________</p>\
                 <p>Data: ___________________________________________________</p></footer>",
            );
            html.push_str("</section>");
        }

        html.push_str("</body></html>");
        html
    }

    fn render_header(&self, page: &ReportPage<'_>) -> String {
        let m = self.metadata;
        format!(
            "<header><table class=\"report-header\"><tr>\
             <th rowspan=\"2\">{title}</th><td>{formulation}</td><td>{page}</td></tr>\
             <tr><td>{revision}</td><td>{status}<br>{date}</td></tr></table>\
             <table class=\"report-info\">\
             <tr><td>Número do estudo:</td><td>{study}</td><td>Código do equipamento:</td><td>{equipment}</td></tr>\
             <tr><td>Número do ensaio:</td><td>{test}</td><td>Local de leitura do equipamento:</td><td>{location}</td></tr>\
             </table></header>",
            title = escape_html(REPORT_TITLE),
            formulation = escape_html(&m.formulation),
            page = page.label(),
            revision = escape_html(&m.revision),
            status = escape_html(&m.approval_status),
            date = escape_html(&m.issue_date),
            study = escape_html(&m.study_number),
            equipment = escape_html(&m.equipment_code),
            test = escape_html(&m.test_number),
            location = escape_html(&m.reading_location),
        )
    }
}

fn render_table(rows: &[DailyExtremes]) -> String {
    let mut html = format!("<table class=\"{TABLE_CLASSES}\"><thead><tr>");
    for label in COLUMN_LABELS {
        html.push_str(&format!("<th>{}</th>", escape_html(label)));
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row.display_cells() {
            html.push_str(&format!("<td>{cell}</td>"));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
