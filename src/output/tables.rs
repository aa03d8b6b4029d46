use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::jenkins::ApiFailure;

use super::styling::{failure, heading};

fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn status_cell(status: Option<u16>) -> Cell {
    match status {
        Some(code) if code >= 500 => Cell::new(code).fg(TableColor::Red),
        Some(code) => Cell::new(code).fg(TableColor::Yellow),
        None => Cell::new("-").fg(TableColor::Red),
    }
}

fn render_failures(failures: &[ApiFailure]) -> Table {
    let mut table = create_table();
    table.set_header(
        ["Status", "URL", "Response"]
            .iter()
            .map(|label| Cell::new(*label).fg(TableColor::Cyan)),
    );
    for failure in failures {
        table.add_row(vec![
            status_cell(failure.status),
            Cell::new(&failure.url),
            Cell::new(failure.text.trim()),
        ]);
    }
    table
}

/// Prints accumulated request failures, if any, to stdout.
pub fn print_failures(failures: &[ApiFailure]) {
    if failures.is_empty() {
        return;
    }
    println!(
        "\n{} {}",
        failure("✗"),
        heading(format!("{} request(s) failed", failures.len()))
    );
    println!("{}", render_failures(failures));
}
