//! Table output formatting for CLI commands
//!
//! Renders aliases, event history, overlays and resolution records using
//! comfy-table. Colors are dropped for NO_COLOR and dumb terminals.

use chrono::{DateTime, Utc};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use super::{inline_json, short_id, truncate};
use crate::domain::models::{MetricAlias, Overlay, ResolutionRecord, SemanticEvent};

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<usize>,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Create a new table formatter with custom settings
    pub fn with_config(use_colors: bool, max_width: Option<usize>) -> Self {
        Self { use_colors, max_width }
    }

    /// Format a metric's aliases as a table
    pub fn format_aliases(&self, aliases: &[MetricAlias]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Source", "Locator", "Alias", "Confidence", "Last Seen"]));

        for alias in aliases {
            let confidence = format!("{:.2}", alias.confidence);
            let confidence_cell = if self.use_colors {
                Cell::new(confidence).fg(confidence_color(alias.confidence))
            } else {
                Cell::new(confidence)
            };

            table.add_row(vec![
                Cell::new(&alias.source_system),
                Cell::new(truncate(&alias.source_locator, 40)),
                Cell::new(truncate(&alias.alias_name, 30)),
                confidence_cell,
                Cell::new(format_time(&alias.last_seen_at)),
            ]);
        }

        table.to_string()
    }

    /// Format event history, newest first as given
    pub fn format_events(&self, events: &[SemanticEvent]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Version", "ID", "Type", "Source", "Actor", "Timestamp", "Reason"]));

        for event in events {
            let type_cell = if self.use_colors {
                Cell::new(&event.event_type).fg(Color::Cyan)
            } else {
                Cell::new(&event.event_type)
            };

            table.add_row(vec![
                Cell::new(event.version_id),
                Cell::new(short_id(&event.event_id)),
                type_cell,
                Cell::new(&event.source_system),
                Cell::new(event.actor.as_deref().unwrap_or("-")),
                Cell::new(format_time(&event.timestamp)),
                Cell::new(truncate(event.reason.as_deref().unwrap_or("-"), 40)),
            ]);
        }

        table.to_string()
    }

    /// Format overlays, marking which are inside their validity window at `now`
    pub fn format_overlays(&self, overlays: &[Overlay], now: DateTime<Utc>) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Priority", "Selector", "Window", "State", "Author"]));

        for overlay in overlays {
            let active = overlay.is_active_at(now);
            let state = if active { "active" } else { "inactive" };
            let state_cell = if self.use_colors {
                Cell::new(state).fg(if active { Color::Green } else { Color::DarkGrey })
            } else {
                Cell::new(state)
            };

            let selector = if overlay.selector.is_empty() {
                "*".to_string()
            } else {
                serde_json::Value::Object(overlay.selector.clone()).to_string()
            };

            table.add_row(vec![
                Cell::new(short_id(&overlay.overlay_id)),
                Cell::new(overlay.priority),
                Cell::new(truncate(&selector, 40)),
                Cell::new(format_window(overlay.valid_from.as_ref(), overlay.valid_to.as_ref())),
                state_cell,
                Cell::new(overlay.author.as_deref().unwrap_or("-")),
            ]);
        }

        table.to_string()
    }

    /// Format audited resolutions
    pub fn format_resolutions(&self, records: &[ResolutionRecord]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Resolved At", "Metric", "Version", "Overlays", "Context"]));

        for record in records {
            let context = inline_json(&serde_json::Value::Object(record.context.clone()));
            table.add_row(vec![
                Cell::new(format_time(&record.resolved_at)),
                Cell::new(&record.metric_id),
                Cell::new(record.base_version_id),
                Cell::new(record.applied_overlay_ids.len()),
                Cell::new(truncate(&context, 50)),
            ]);
        }

        table.to_string()
    }

    /// Create a base table with common settings
    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table.load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(u16::try_from(width).unwrap_or(u16::MAX));
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|title| Cell::new(title).add_attribute(Attribute::Bold))
        .collect()
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

fn confidence_color(confidence: f64) -> Color {
    if confidence >= 0.8 {
        Color::Green
    } else if confidence >= 0.5 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn format_window(from: Option<&DateTime<Utc>>, to: Option<&DateTime<Utc>>) -> String {
    match (from, to) {
        (None, None) => "always".to_string(),
        (Some(from), None) => format!("from {}", format_time(from)),
        (None, Some(to)) => format!("until {}", format_time(to)),
        (Some(from), Some(to)) => format!("{} .. {}", format_time(from), format_time(to)),
    }
}
