// file: src/output/terminal.rs
// description: plain and colored terminal rendering of categorized news

use crate::models::{ArticleRecord, CategorizedRecord, PipelineState};
use crate::utils::Validator;
use colored::*;
use std::fmt::Write;

const RULE_WIDTH: usize = 80;

pub struct TerminalRenderer {
    preview_chars: usize,
}

impl TerminalRenderer {
    pub fn new(preview_chars: usize) -> Self {
        Self { preview_chars }
    }

    pub fn render(&self, state: &PipelineState) -> String {
        if state.categorized.is_empty() {
            return format!("\nNo news found for \"{}\"\n", state.query());
        }

        let mut out = String::new();
        let _ = writeln!(
            out,
            "\n{} \"{}\" ({} items)",
            "Categorized news for".bold(),
            state.query(),
            state.categorized.len()
        );
        let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));

        for (index, item) in state.categorized.iter().enumerate() {
            let article = state
                .articles
                .get(index)
                .filter(|article| article.title == item.title);
            out.push_str(&self.render_item(index, item, article));
        }

        let _ = writeln!(out, "\n{}", "=".repeat(RULE_WIDTH));
        out
    }

    pub fn render_item(
        &self,
        index: usize,
        item: &CategorizedRecord,
        article: Option<&ArticleRecord>,
    ) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n{}. {}", index + 1, item.title.bold());
        let _ = writeln!(out, "   Category: {}", paint_category(&item.category));
        let _ = writeln!(
            out,
            "   Summary: {}",
            Validator::truncate_text(item.summary.trim(), self.preview_chars)
        );

        if let Some(article) = article {
            match (&article.source, &article.url) {
                (Some(source), Some(url)) => {
                    let _ = writeln!(out, "   Source: {} ({})", source, url.dimmed());
                }
                (Some(source), None) => {
                    let _ = writeln!(out, "   Source: {}", source);
                }
                (None, Some(url)) => {
                    let _ = writeln!(out, "   Link: {}", url.dimmed());
                }
                (None, None) => {}
            }
            if let Some(published) = article.published {
                let _ = writeln!(out, "   Published: {}", published.format("%Y-%m-%d %H:%M UTC"));
            }
        }

        out
    }
}

fn paint_category(category: &str) -> ColoredString {
    match category.trim().to_lowercase().as_str() {
        "politics" => category.red().bold(),
        "tech" => category.cyan().bold(),
        "sports" => category.green().bold(),
        "business" => category.yellow().bold(),
        _ => category.magenta(),
    }
}
