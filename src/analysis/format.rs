//! Text formatting helpers shared by the aggregator and the views.

/// Format an amount with thousands separators and two decimals
/// (`1234567.891` -> `1,234,567.89`).
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Format an optional cell; missing values render as `NaN`, the way the
/// summary exports show them.
pub fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "NaN".to_string(),
    }
}

/// Render rows as right-aligned columns under a header line, no index.
pub fn format_columns(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let render_line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:>width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut lines = vec![render_line(headers.to_vec())];
    for row in rows {
        lines.push(render_line(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-12345.5), "-12,345.50");
        assert_eq!(format_amount(-0.001), "0.00");
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(Some(0.25)), "0.25");
        assert_eq!(format_cell(None), "NaN");
    }

    #[test]
    fn test_format_columns_alignment() {
        let rows = vec![
            vec!["2020-08".to_string(), "95.5".to_string()],
            vec!["2021-01".to_string(), "100".to_string()],
        ];
        let text = format_columns(&["cohort", "rate"], &rows);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], " cohort rate");
        assert_eq!(lines[1], "2020-08 95.5");
        assert_eq!(lines[2], "2021-01  100");
    }

    #[test]
    fn test_format_columns_header_only() {
        assert_eq!(format_columns(&["a", "bb"], &[]), "a bb");
    }
}
