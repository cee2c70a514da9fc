use super::{ACCOUNT_COLUMNS, Cell, Layout, RecordBody, RecordLayout, Report};

/// Spreadsheet rows for `report`, appended in one batch.
///
/// The first row holds the title. Flat reports follow it with a header row
/// and one row per account. Nested reports write an account row, then per
/// section a title row followed by the section's rows or its empty note.
/// Rows whose body does not match the layout are skipped, the same rows
/// the text renderer leaves out.
pub fn sheet_rows<R: RecordLayout>(report: &Report<R>) -> Vec<Vec<String>> {
    let mut rows = vec![vec![report.title.to_string()]];

    match R::LAYOUT {
        Layout::Flat => {
            rows.push(
                ACCOUNT_COLUMNS
                    .iter()
                    .chain(R::columns())
                    .map(|c| c.name.to_string())
                    .collect(),
            );
            for row in &report.rows {
                let RecordBody::Row(cells) = row.record.body() else {
                    continue;
                };
                if cells.len() != R::columns().len() {
                    continue;
                }
                let mut values = vec![
                    Cell::Text(row.account.display_name.clone()).to_string(),
                    row.account.id.to_string(),
                ];
                values.extend(cells.iter().map(Cell::to_string));
                rows.push(values);
            }
        }
        Layout::Nested => {
            for row in &report.rows {
                let RecordBody::Sections(sections) = row.record.body() else {
                    continue;
                };
                if sections
                    .iter()
                    .flat_map(|s| &s.rows)
                    .any(|cells| cells.len() != R::columns().len())
                {
                    continue;
                }
                rows.push(vec![
                    format!("Account ID: {}", row.account.id),
                    format!(
                        "Display Name: {}",
                        Cell::Text(row.account.display_name.clone())
                    ),
                ]);
                for section in sections {
                    rows.push(vec![format!("{}:", section.title.trim())]);
                    if section.rows.is_empty() {
                        rows.push(vec![section.empty_sheet_note.to_string()]);
                    }
                    for cells in &section.rows {
                        rows.push(cells.iter().map(Cell::to_string).collect());
                    }
                }
            }
        }
    }

    rows
}
