//! Plain-text rendering of selections, suggestions and sample rows.

use crate::core::selection::SelectionModel;
use crate::core::streams::StreamRecord;
use crate::domain::model::{DomainGroup, Freshness, Row, Source};

/// `"real_estate"` -> `"Real Estate"`.
pub fn title_case(label: &str) -> String {
    label
        .split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_cost(cost: f64) -> String {
    format!("${:.2}", cost)
}

/// `12473` -> `"12,473"`.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn select_all_label(model: &SelectionModel, source_id: &str) -> &'static str {
    if model.is_source_fully_selected(source_id) {
        "Deselect all"
    } else {
        "Select all"
    }
}

pub fn render_source_card(model: &SelectionModel, source: &Source) -> String {
    let selected = model.selected_fields(&source.id).map_or(0, |f| f.len());
    let mut lines = Vec::new();

    let mut header = format!("{} [{}]", source.name, title_case(&source.domain));
    if source.freshness == Freshness::RealTime {
        header.push_str(" (Real-time)");
    }
    lines.push(header);
    if !source.description.is_empty() {
        lines.push(format!("  {}", source.description));
    }
    lines.push(format!(
        "  {} users, {}/user/day, {}",
        format_count(source.estimated_users),
        source.price_per_user_day,
        source.freshness
    ));
    lines.push(format!(
        "  Fields ({}/{} selected) - {}",
        selected,
        source.fields.len(),
        select_all_label(model, &source.id)
    ));

    for field in &source.fields {
        let mark = if model.is_field_selected(&source.id, &field.name) {
            "[x]"
        } else {
            "[ ]"
        };
        let mut line = format!("    {} {}", mark, field.name);
        if !field.type_label.is_empty() {
            line.push_str(&format!(" ({})", field.type_label));
        }
        if !field.example.is_null() {
            line.push_str(&format!(" e.g. {}", display_value(&field.example)));
        }
        lines.push(line);
    }

    lines.join("\n")
}

pub fn render_domain_group(model: &SelectionModel, group: &DomainGroup) -> String {
    let heading = if group.domain.is_empty() {
        "Other".to_string()
    } else {
        title_case(&group.domain)
    };
    let mut out = format!("== {} ({} sources) ==", heading, group.sources.len());
    for source in &group.sources {
        out.push('\n');
        out.push_str(&render_source_card(model, source));
    }
    out
}

pub fn render_selection_summary(model: &SelectionModel, estimated_users: u64) -> String {
    let cost = model.estimated_cost();
    let mut lines = vec![
        format!("Sources selected: {}", model.selected_sources().len()),
        format!("Fields selected: {}", model.selected_field_count()),
        format!("Estimated monthly cost: {}", format_cost(cost)),
        format!(
            "Based on {} users x ${:.4} per user",
            format_count(estimated_users),
            model.cost_per_user(estimated_users)
        ),
    ];
    if model.selected_field_count() == 0 {
        lines.push("Select at least one field to continue".to_string());
    }
    lines.join("\n")
}

/// Renders rows as an aligned text table, columns taken from the first row.
pub fn render_rows(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return "(no rows)".to_string();
    };
    let headers: Vec<&String> = first.keys().collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|h| row.get(h.as_str()).map(display_value).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![format_line(headers.iter().map(|h| h.as_str()).collect())];
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        out.push(format_line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

/// One line per registered stream: id, dataset, sources, created date, status.
pub fn render_stream_list(records: &[StreamRecord]) -> String {
    if records.is_empty() {
        return "No streams yet. Create one with `ownly create --generate`.".to_string();
    }
    records
        .iter()
        .map(|record| {
            let mut line = format!(
                "{}  {}  {} sources  created {}  [{}]",
                record.id,
                record.dataset_id,
                record.source_count,
                record.created_at.format("%Y-%m-%d"),
                record.status
            );
            if let Some(error) = &record.last_error {
                line.push_str(&format!("  ({})", error));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strings print bare, everything else as JSON.
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Field;
    use serde_json::json;

    fn source() -> Source {
        Source {
            id: "duolingo".to_string(),
            name: "Duolingo".to_string(),
            domain: "language_learning".to_string(),
            description: "Language learning progress data".to_string(),
            estimated_users: 50000,
            freshness: Freshness::RealTime,
            price_per_user_day: 0.01,
            fields: vec![Field::named("language"), Field::named("streak_days")],
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("real_estate"), "Real Estate");
        assert_eq!(title_case("education"), "Education");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(12473), "12,473");
        assert_eq!(format_count(50000000), "50,000,000");
    }

    #[test]
    fn test_source_card_tracks_selection() {
        let mut model = SelectionModel::new(vec![source()]);
        let card = render_source_card(&model, &source());
        assert!(card.contains("Duolingo [Language Learning] (Real-time)"));
        assert!(card.contains("Fields (0/2 selected) - Select all"));

        model.select_all("duolingo");
        let card = render_source_card(&model, &source());
        assert!(card.contains("Fields (2/2 selected) - Deselect all"));
        assert!(card.contains("[x] streak_days"));
    }

    #[test]
    fn test_summary_prompts_for_selection() {
        let mut model = SelectionModel::new(vec![source()]);
        let summary = render_selection_summary(&model, 50000);
        assert!(summary.contains("Estimated monthly cost: $0.00"));
        assert!(summary.contains("Select at least one field"));

        model.toggle_field("duolingo", "language");
        let summary = render_selection_summary(&model, 50000);
        assert!(summary.contains("Estimated monthly cost: $7500.00"));
        assert!(!summary.contains("Select at least one field"));
    }

    #[test]
    fn test_render_rows() {
        let rows: Vec<Row> = vec![
            json!({"city": "Rome", "nights": 3}).as_object().unwrap().clone(),
            json!({"city": "Florence", "nights": 12}).as_object().unwrap().clone(),
        ];
        let table = render_rows(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "city     | nights");
        assert_eq!(lines[2], "Rome     | 3");
        assert_eq!(lines[3], "Florence | 12");
        assert_eq!(render_rows(&[]), "(no rows)");
    }

    #[test]
    fn test_render_stream_list() {
        use crate::core::streams::StreamStatus;
        use chrono::{TimeZone, Utc};

        assert!(render_stream_list(&[]).starts_with("No streams yet"));

        let created = Utc.with_ymd_and_hms(2024, 5, 15, 10, 30, 0).unwrap();
        let record = StreamRecord {
            id: "ds_00000001".to_string(),
            dataset_id: "duo_airbnb_italian".to_string(),
            endpoint: "http://localhost:8000/v1/streams/ds_00000001".to_string(),
            source_count: 2,
            created_at: created,
            last_updated: created,
            status: StreamStatus::Error,
            row_count: 0,
            last_error: Some("Not found: stream 'ds_00000001'".to_string()),
        };
        assert_eq!(
            render_stream_list(&[record]),
            "ds_00000001  duo_airbnb_italian  2 sources  created 2024-05-15  [error]  (Not found: stream 'ds_00000001')"
        );
    }

    #[test]
    fn test_render_rows_keeps_server_column_order() {
        let rows: Vec<Row> = vec![json!({"user_id": "user_1000", "airbnb_city": "Rome"})
            .as_object()
            .unwrap()
            .clone()];
        let table = render_rows(&rows);
        assert!(table.starts_with("user_id   | airbnb_city"));
    }
}
