use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use serde_json::Value;

/// Column names across all rows, `_id` first, then in first-seen order.
pub fn collect_headers(rows: &[Value]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for row in rows {
        if let Some(obj) = row.as_object() {
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
    }
    if let Some(pos) = headers.iter().position(|h| h == "_id") {
        let id = headers.remove(pos);
        headers.insert(0, id);
    }
    headers
}

fn cell_text(value: Option<&Value>, null_text: &str) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Null) => null_text.to_string(),
        Some(v) => v.to_string(),
        None => "".to_string(),
    }
}

pub fn display_results(rows: &[Value]) {
    if rows.is_empty() {
        println!("{}", "No results found.".yellow());
        return;
    }

    let headers = collect_headers(rows);

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<Cell>>(),
    );

    for row in rows {
        if let Some(obj) = row.as_object() {
            let cells: Vec<String> = headers
                .iter()
                .map(|field| cell_text(obj.get(field), "NULL"))
                .collect();
            table.add_row(cells);
        }
    }

    println!("{table}");
    println!("\n{}", format!("{} rows returned", rows.len()).green());
}

pub fn export_to_csv(rows: &[Value], filename: &str) -> anyhow::Result<()> {
    let headers = collect_headers(rows);
    let mut wtr = csv::Writer::from_path(filename)?;

    wtr.write_record(&headers)?;
    for row in rows {
        if let Some(obj) = row.as_object() {
            let cells: Vec<String> = headers
                .iter()
                .map(|field| cell_text(obj.get(field), ""))
                .collect();
            wtr.write_record(&cells)?;
        }
    }

    wtr.flush()?;
    println!("{}", format!("Results exported to {}", filename).green());
    Ok(())
}
