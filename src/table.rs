//! Plain-text rendering of wines for the terminal.

use std::{borrow::Cow, fmt::Write as _};

use crate::{recommend::FilterOptions, record::Wine};

const LIST_HEADERS: &[&str] = &[
    "id", "name", "winery", "vintage", "grape", "location", "drink by", "rating",
];

/// Wider cells are cut and end in an ellipsis.
const MAX_CELL_WIDTH: usize = 40;

pub fn render_wines(wines: &[Wine]) -> String {
    let rows = wines
        .iter()
        .map(|wine| {
            vec![
                wine.id.to_string(),
                wine.name.clone(),
                wine.winery.clone(),
                wine.vintage_year.to_string(),
                grape_cell(wine),
                wine.location.label().to_string(),
                wine.drink_by_year.to_string(),
                wine.rating.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    render_columns(LIST_HEADERS, &rows)
}

fn grape_cell(wine: &Wine) -> String {
    if wine.is_blend() && !wine.blend_components.is_empty() {
        format!("{} ({})", wine.primary_grape, wine.blend_components)
    } else {
        wine.primary_grape.clone()
    }
}

/// Every field of one wine as `label: value` lines.
pub fn render_wine_detail(wine: &Wine) -> String {
    let photo = match &wine.photo {
        Some(photo) => format!("{} ({} bytes)", photo.mime, photo.bytes.len()),
        None => "-".to_string(),
    };
    let fields = [
        ("id", wine.id.to_string()),
        ("name", wine.name.clone()),
        ("winery", wine.winery.clone()),
        ("winemaker", wine.winemaker.clone()),
        ("vintage", wine.vintage_year.to_string()),
        ("grape", wine.primary_grape.clone()),
        ("blend", wine.blend_components.clone()),
        ("quality", wine.quality_tier.clone()),
        ("origin", wine.origin.clone()),
        ("detail", wine.technical_detail.clone()),
        ("note", wine.personal_note.clone()),
        ("location", wine.location.label().to_string()),
        ("drink by", wine.drink_by_year.to_string()),
        ("rating", format!("{}/10", wine.rating)),
        ("photo", photo),
    ];
    let label_width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let mut output = String::new();
    for (label, value) in fields {
        let value = if value.is_empty() { "-".into() } else { sanitize_cell(&value) };
        let _ = writeln!(output, "{label:<label_width$}  {value}");
    }
    output
}

pub fn render_options(options: &FilterOptions) -> String {
    let vintages = options.vintages.iter().map(i32::to_string).collect::<Vec<_>>();
    let facets: [(&str, &[String]); 6] = [
        ("grape", &options.grapes),
        ("winery", &options.wineries),
        ("vintage", &vintages),
        ("origin", &options.origins),
        ("quality", &options.quality_tiers),
        ("winemaker", &options.winemakers),
    ];
    let rows = facets
        .iter()
        .map(|(facet, values)| vec![facet.to_string(), values.join(", ")])
        .collect::<Vec<_>>();
    render_columns(&["filter", "values"], &rows)
}

/// Left-aligned columns separated by two spaces, with a dashed rule under
/// the header.
pub fn render_columns(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(display_width(&fit_cell(cell)));
        }
    }
    for width in &mut widths {
        *width = (*width).clamp(3, MAX_CELL_WIDTH);
    }

    let mut output = String::new();
    let header_cells = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&header_cells, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = fit_cell(value);
            let padding = width.saturating_sub(display_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn fit_cell(value: &str) -> String {
    let sanitized = sanitize_cell(value);
    if display_width(&sanitized) <= MAX_CELL_WIDTH {
        return sanitized.into_owned();
    }
    let mut cut = sanitized
        .chars()
        .take(MAX_CELL_WIDTH - 1)
        .collect::<String>();
    cut.push('…');
    cut
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
