//! Server-side HTML for the single-page UI.

use std::fmt::Write;

use super::Mode;
use crate::concepts::ConceptScore;
use crate::error::InnovationError;
use crate::innovation::{Context, capitalize};
use crate::random_concept::RandomConcept;
use crate::tabular::TableSummary;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; display: flex; min-height: 100vh; color: #222; }
aside { width: 16rem; background: #f3f4f8; padding: 1.5rem; }
main { flex: 1; max-width: 48rem; padding: 1.5rem 2rem; }
aside a { display: block; padding: .35rem .5rem; color: #333; text-decoration: none; border-radius: 4px; }
aside a.active { background: #dfe3f0; font-weight: 600; }
textarea { width: 100%; min-height: 8rem; }
.notice { padding: .75rem 1rem; border-radius: 4px; margin: 1rem 0; }
.warning { background: #fff6d6; }
.error { background: #fde2e1; }
.success { background: #e3f6e8; padding: .5rem 1rem; border-radius: 4px; }
pre { background: #f6f6f6; padding: .75rem; overflow-x: auto; }
table { border-collapse: collapse; font-size: .9rem; }
td, th { border: 1px solid #ddd; padding: .25rem .5rem; }
footer { margin-top: 2rem; color: #777; font-size: .85rem; border-top: 1px solid #eee; padding-top: .75rem; }
"#;

/// Message shown above the result
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Warning(String),
    Error(String),
}

impl From<&InnovationError> for Notice {
    fn from(err: &InnovationError) -> Self {
        if err.is_warning() {
            Notice::Warning(err.to_string())
        } else {
            Notice::Error(err.to_string())
        }
    }
}

/// Successful result of one action
#[derive(Debug, Clone)]
pub enum Outcome {
    Idea(String),
    Concepts {
        scores: Vec<ConceptScore>,
        idea: Option<String>,
    },
    Data {
        summary: TableSummary,
        preview: Vec<Vec<String>>,
    },
    Random(&'static RandomConcept),
}

#[derive(Debug, Clone)]
pub struct Page {
    pub mode: Mode,
    pub context: Context,
    pub problem: String,
    pub notice: Option<Notice>,
    pub outcome: Option<Outcome>,
}

impl Page {
    pub fn new(mode: Mode, context: Context) -> Self {
        Self {
            mode,
            context,
            problem: String::new(),
            notice: None,
            outcome: None,
        }
    }

    pub fn with_error(mut self, err: &InnovationError) -> Self {
        self.notice = Some(Notice::from(err));
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

/// Multi-line text as paragraphs
fn paragraphs(s: &str) -> String {
    s.split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .map(|p| format!("<p>{}</p>", escape_html(p.trim()).replace('\n', "<br>")))
        .collect()
}

pub fn format_probability(p: f32) -> String {
    format!("{:.2}%", p * 100.0)
}

pub fn render_page(page: &Page) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>AI Innovation Generator</title><style>{STYLE}</style></head><body>"
    );

    html.push_str("<aside><h3>Select the type of input:</h3><nav>");
    for mode in Mode::ALL {
        let class = if mode == page.mode { " class=\"active\"" } else { "" };
        let _ = write!(
            html,
            "<a{class} href=\"/?mode={}&amp;context={}\">{}</a>",
            mode.slug(),
            page.context.label(),
            mode.label()
        );
    }
    html.push_str("</nav></aside><main>");
    html.push_str(
        "<h1>AI Innovation Generator</h1>\
         <p>Unleash the power of <strong>AI-generated solutions</strong> for real-world problems.</p>",
    );

    render_form(&mut html, page);

    match &page.notice {
        Some(Notice::Warning(msg)) => {
            let _ = write!(html, "<div class=\"notice warning\">{}</div>", escape_html(msg));
        }
        Some(Notice::Error(msg)) => {
            let _ = write!(html, "<div class=\"notice error\">{}</div>", escape_html(msg));
        }
        None => {}
    }

    if let Some(outcome) = &page.outcome {
        render_outcome(&mut html, outcome);
    }

    html.push_str(
        "<footer>Powered by candle (GPT-2, CLIP), axum and the Rust csv crate. \
         Built for meaningful innovations!</footer></main></body></html>",
    );
    html
}

fn context_select(html: &mut String, selected: Context) {
    html.push_str(
        "<label>Choose the context for innovations: <select name=\"context\">",
    );
    for context in Context::ALL {
        let sel = if context == selected { " selected" } else { "" };
        let _ = write!(
            html,
            "<option value=\"{0}\"{sel}>{0}</option>",
            context.label()
        );
    }
    html.push_str("</select></label>");
}

fn render_form(html: &mut String, page: &Page) {
    match page.mode {
        Mode::Text => {
            html.push_str("<form method=\"post\" action=\"/generate\">");
            context_select(html, page.context);
            let _ = write!(
                html,
                "<p><label>Describe your problem or idea:<br>\
                 <textarea name=\"problem\">{}</textarea></label></p>\
                 <button type=\"submit\">Generate Innovation</button></form>",
                escape_html(&page.problem)
            );
        }
        Mode::Image => {
            html.push_str(
                "<form method=\"post\" action=\"/analyze/image\" enctype=\"multipart/form-data\">",
            );
            context_select(html, page.context);
            html.push_str(
                "<p><label>Upload an image (JPG/PNG): \
                 <input type=\"file\" name=\"image\" accept=\".jpg,.jpeg,.png\"></label></p>\
                 <button type=\"submit\">Analyze Image &amp; Generate Idea</button></form>",
            );
        }
        Mode::Csv => {
            html.push_str(
                "<form method=\"post\" action=\"/analyze/csv\" enctype=\"multipart/form-data\">\
                 <p><label>Upload a CSV file: \
                 <input type=\"file\" name=\"file\" accept=\".csv\"></label></p>\
                 <button type=\"submit\">Generate Insights &amp; Innovation</button></form>",
            );
        }
        Mode::Random => {
            html.push_str(
                "<form method=\"post\" action=\"/random\">\
                 <button type=\"submit\">Generate Random Concept</button></form>",
            );
        }
    }
}

fn render_outcome(html: &mut String, outcome: &Outcome) {
    match outcome {
        Outcome::Idea(idea) => {
            html.push_str("<div class=\"success\">Innovative Solution:</div>");
            html.push_str(&paragraphs(idea));
        }
        Outcome::Concepts { scores, idea } => {
            html.push_str("<div class=\"success\">Top Relevant Concepts:</div><ul>");
            for score in scores {
                let _ = write!(
                    html,
                    "<li><strong>{}</strong> — Probability: {}</li>",
                    escape_html(&capitalize(score.concept)),
                    format_probability(score.probability)
                );
            }
            html.push_str("</ul>");
            if let Some(idea) = idea {
                html.push_str("<p><strong>Generated Idea:</strong></p>");
                html.push_str(&paragraphs(idea));
            }
        }
        Outcome::Data { summary, preview } => {
            render_preview(html, &summary.columns, preview);
            html.push_str("<div class=\"success\">Data Insights:</div>");
            let _ = write!(
                html,
                "<p>The dataset contains <strong>{} rows</strong> and <strong>{} columns</strong>.</p>\
                 <p>{}</p>",
                summary.row_count,
                summary.column_count,
                escape_html(&summary.columns_sentence())
            );
            let stats = summary
                .statistics_json()
                .unwrap_or_else(|e| format!("statistics unavailable: {e}"));
            let _ = write!(html, "<pre>{}</pre>", escape_html(&stats));
            let _ = write!(
                html,
                "<p><strong>Use Case:</strong></p><p>{}</p>",
                escape_html(summary.advisory)
            );
        }
        Outcome::Random(concept) => {
            let _ = write!(
                html,
                "<p><strong>Random Concept:</strong></p>\
                 <p>Idea: {}</p><p>Use Case: {}</p>",
                escape_html(concept.idea),
                escape_html(concept.use_case)
            );
        }
    }
}

fn render_preview(html: &mut String, columns: &[String], rows: &[Vec<String>]) {
    html.push_str("<table><thead><tr>");
    for column in columns {
        let _ = write!(html, "<th>{}</th>", escape_html(column));
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape_html(cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
}
