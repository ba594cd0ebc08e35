//! Standalone HTML export of the dashboard page.

use crate::config::DashboardConfig;
use crate::data::CohortTable;
use crate::report::generator::{missing_file_notice, render_insights, SAMPLE_QUESTIONS};
use base64::Engine;
use std::path::Path;
use tracing::debug;

/// Shown in the header when no logo file is available.
const PLACEHOLDER_GLYPH: &str = "💳";

const STYLE: &str = r#"<style>
body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 24px; }
h1, h2, h3 { color: #D6086B; }
.main-header { background-color: #D6086B; padding: 25px; border-radius: 12px; display: flex; align-items: center; gap: 25px; border-top: 5px solid #A3F8FF; }
.main-header h1 { color: #FFFFFF; margin: 0; }
.logo { height: 60px; object-fit: contain; background-color: #FFFFFF; padding: 10px; border-radius: 8px; border: 2px solid #A3F8FF; }
.glyph { font-size: 3rem; background-color: #FFFFFF; padding: 5px; border-radius: 8px; }
table { border-collapse: collapse; }
th, td { border: 1px solid #A3F8FF; padding: 4px 8px; text-align: right; }
.error { color: #D6086B; border-left: 4px solid #D6086B; padding-left: 8px; }
.insights { white-space: pre-wrap; font-family: inherit; border-left: 4px solid #A3F8FF; padding-left: 12px; }
</style>"#;

/// Base64 of the file at `path`, or `None` when it can't be read.
pub fn image_base64(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
        Err(e) => {
            debug!("No logo at {}: {}", path.display(), e);
            None
        }
    }
}

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn logo_html(logo_b64: Option<&str>) -> String {
    match logo_b64 {
        Some(b64) => format!(
            r#"<img class="logo" alt="logo" src="data:image/png;base64,{}">"#,
            b64
        ),
        None => format!(r#"<span class="glyph">{}</span>"#, PLACEHOLDER_GLYPH),
    }
}

fn table_html(table: Option<&CohortTable>, csv_path: &Path) -> String {
    let Some(table) = table else {
        return format!(
            "<p class=\"error\">{}</p>\n",
            escape_html(&missing_file_notice(csv_path))
        );
    };

    let mut html = String::from("<table>\n<thead><tr>");
    for header in &table.headers {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for record in &table.records {
        html.push_str("<tr>");
        for cell in record {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

fn sample_questions_html() -> String {
    let mut html = String::from("<ol class=\"questions\">\n");
    for question in SAMPLE_QUESTIONS {
        html.push_str(&format!("<li>{}</li>\n", escape_html(question)));
    }
    html.push_str("</ol>\n");
    html
}

/// Render the full dashboard page: header, BI embed, raw table, the
/// executive insights and the suggested assistant questions.
pub fn render_dashboard_html(
    dashboard: &DashboardConfig,
    table: Option<&CohortTable>,
    csv_path: &Path,
) -> String {
    let logo = image_base64(&dashboard.logo_path);
    let title = escape_html(&dashboard.title);

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", title));
    html.push_str(STYLE);
    html.push_str("\n</head>\n<body>\n");

    html.push_str(&format!(
        "<div class=\"main-header\"><div>{}</div><div><h1>{}</h1></div></div>\n",
        logo_html(logo.as_deref()),
        title
    ));

    html.push_str("<h3>Financial Cohort Performance</h3>\n");
    html.push_str(&format!(
        "<iframe title=\"{}\" width=\"100%\" height=\"650\" src=\"{}\" frameborder=\"0\" allowFullScreen=\"true\"></iframe>\n",
        title,
        escape_html(&dashboard.embed_url)
    ));

    html.push_str("<h3>Raw Cohort Aggregations</h3>\n");
    html.push_str(&table_html(table, csv_path));

    html.push_str("<h3>Insights &amp; Strategy</h3>\n");
    html.push_str(&format!(
        "<pre class=\"insights\">{}</pre>\n",
        escape_html(&render_insights())
    ));

    html.push_str("<h3>Ask the Data Assistant</h3>\n");
    html.push_str(&sample_questions_html());
    html.push_str("</body>\n</html>\n");

    html
}
