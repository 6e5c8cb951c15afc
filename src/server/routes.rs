//! Form handlers for the HTML UI.
//!
//! Each handler validates its input, runs exactly one component, and renders
//! the page with either the outcome or the failure message.

use axum::{
    Form,
    extract::{Multipart, Query, State},
    response::Html,
};
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, warn};

use super::render::{Outcome, Page, render_page};
use super::upload::{UploadForm, UploadKind};
use super::{AppState, Mode};
use crate::concepts::top_concepts;
use crate::error::InnovationError;
use crate::innovation::{Context, generate_innovation};
use crate::random_concept;
use crate::tabular::{Table, summarize};

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub mode: Option<Mode>,
    pub context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub problem: String,
    pub context: Option<String>,
}

pub async fn index(Query(query): Query<IndexQuery>) -> Html<String> {
    let page = Page::new(
        query.mode.unwrap_or_default(),
        Context::from_input(query.context.as_deref()),
    );
    Html(render_page(&page))
}

pub async fn generate(State(state): State<AppState>, Form(form): Form<GenerateForm>) -> Html<String> {
    let context = Context::from_input(form.context.as_deref());
    let mut page = Page::new(Mode::Text, context);
    page.problem = form.problem.clone();

    if form.problem.trim().is_empty() {
        let warning = InnovationError::validation("Please enter a valid problem statement or idea.");
        return Html(render_page(&page.with_error(&warning)));
    }

    let started = Instant::now();
    let problem = form.problem;
    let result = state
        .run_blocking(move |models, rng| {
            generate_innovation(models, &problem, context.label(), rng)
        })
        .await;
    info!(
        "mode=text context={} latency_ms={}",
        context,
        started.elapsed().as_millis()
    );

    let page = match result {
        Ok(idea) => page.with_outcome(Outcome::Idea(idea)),
        Err(e) => {
            warn!("Text generation failed: {}", e);
            page.with_error(&e)
        }
    };
    Html(render_page(&page))
}

pub async fn analyze_image(State(state): State<AppState>, multipart: Multipart) -> Html<String> {
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return Html(render_page(&Page::new(Mode::Image, Context::General).with_error(&e))),
    };
    let context = Context::from_input(form.field("context"));
    let page = Page::new(Mode::Image, context);

    let upload = match form.require_file("image", UploadKind::Image) {
        Ok(upload) => upload.bytes.clone(),
        Err(e) => return Html(render_page(&page.with_error(&e))),
    };

    let started = Instant::now();
    // Rank first; then generate an idea around the winning concept
    let result = state
        .run_blocking(move |models, rng| {
            let scores = top_concepts(models, &upload)?;
            let idea = match scores.first() {
                Some(top) => Some(generate_innovation(
                    models,
                    &format!("{} innovation", top.concept),
                    context.label(),
                    rng,
                )),
                None => None,
            };
            Ok((scores, idea))
        })
        .await;
    info!(
        "mode=image context={} latency_ms={}",
        context,
        started.elapsed().as_millis()
    );

    let page = match result {
        Ok((scores, Some(Err(e)))) => {
            warn!("Idea generation after image analysis failed: {}", e);
            page.with_outcome(Outcome::Concepts { scores, idea: None })
                .with_error(&e)
        }
        Ok((scores, idea)) => page.with_outcome(Outcome::Concepts {
            scores,
            idea: idea.and_then(Result::ok),
        }),
        Err(e) => {
            warn!("Image analysis failed: {}", e);
            page.with_error(&e)
        }
    };
    Html(render_page(&page))
}

pub async fn analyze_csv(State(state): State<AppState>, multipart: Multipart) -> Html<String> {
    let page = Page::new(Mode::Csv, Context::General);
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return Html(render_page(&page.with_error(&e))),
    };
    let context = Context::from_input(form.field("context"));
    let page = Page {
        context,
        ..page
    };

    let result = form
        .require_file("file", UploadKind::Csv)
        .and_then(|upload| Table::from_csv_bytes(&upload.bytes));

    let page = match result {
        Ok(table) => {
            let summary = summarize(&table);
            info!(
                "mode=csv rows={} columns={} numeric={}",
                summary.row_count,
                summary.column_count,
                summary.statistics.len()
            );
            let preview = table.preview(state.config.runtime.preview_rows).to_vec();
            page.with_outcome(Outcome::Data { summary, preview })
        }
        Err(e) => {
            warn!("CSV analysis failed: {}", e);
            page.with_error(&e)
        }
    };
    Html(render_page(&page))
}

pub async fn random(State(state): State<AppState>) -> Html<String> {
    let mut rng = state.rng();
    let concept = random_concept::pick(&mut rng);
    info!("mode=random");
    Html(render_page(
        &Page::new(Mode::Random, Context::General).with_outcome(Outcome::Random(concept)),
    ))
}
