use super::{
    Cell, ColumnSpec, Layout, RecordBody, RecordLayout, RenderError, RenderFailure,
    RenderedReport, Report, ReportRow, TableWriter, sanitize_cell,
};

/// Leading columns of every flat report.
pub const ACCOUNT_COLUMNS: [ColumnSpec; 2] = [
    ColumnSpec::new("Account Name", 20),
    ColumnSpec::new("Account ID", 19),
];

/// Lays reports out as text.
///
/// Rendering never fails as a whole. A row whose cells do not fit the
/// layout is left out and reported in [`RenderedReport::failures`]; every
/// other row is still rendered, in report order.
pub struct ReportBuilder;

impl ReportBuilder {
    pub fn render<R: RecordLayout>(report: &Report<R>) -> RenderedReport {
        let mut body = String::new();
        let mut rows_rendered = 0;
        let mut failures = Vec::new();

        match R::LAYOUT {
            Layout::Flat => {
                let table = TableWriter::new(
                    ACCOUNT_COLUMNS
                        .into_iter()
                        .chain(R::columns().iter().copied()),
                );
                table.write_header(&mut body);
                for row in &report.rows {
                    match flat_row(&table, row) {
                        Ok(line) => {
                            body.push_str(&line);
                            rows_rendered += 1;
                        }
                        Err(error) => failures.push(render_failure(report.name, row, error)),
                    }
                }
            }
            Layout::Nested => {
                let table = TableWriter::new(R::columns().iter().copied());
                for row in &report.rows {
                    match nested_block(&table, row) {
                        Ok(block) => {
                            if rows_rendered > 0 {
                                body.push('\n');
                            }
                            body.push_str(&block);
                            rows_rendered += 1;
                        }
                        Err(error) => failures.push(render_failure(report.name, row, error)),
                    }
                }
            }
        }

        RenderedReport {
            name: report.name,
            title: report.title.to_string(),
            body,
            rows_rendered,
            failures,
        }
    }
}

fn flat_row<R: RecordLayout>(
    table: &TableWriter,
    row: &ReportRow<R>,
) -> Result<String, RenderError> {
    let RecordBody::Row(cells) = row.record.body() else {
        return Err(RenderError::LayoutMismatch {
            expected: Layout::Flat,
        });
    };

    let mut all = Vec::with_capacity(cells.len() + ACCOUNT_COLUMNS.len());
    all.push(Cell::Text(row.account.display_name.clone()));
    all.push(Cell::Int(row.account.id.get()));
    all.extend(cells);

    let mut line = String::new();
    table.write_row(&mut line, &all)?;
    Ok(line)
}

fn nested_block<R: RecordLayout>(
    table: &TableWriter,
    row: &ReportRow<R>,
) -> Result<String, RenderError> {
    let RecordBody::Sections(sections) = row.record.body() else {
        return Err(RenderError::LayoutMismatch {
            expected: Layout::Nested,
        });
    };

    let name = Cell::Text(row.account.display_name.clone()).to_string();
    let mut out = format!(
        "Account ID: {}, Display Name: {}\n",
        row.account.id,
        sanitize_cell(&name)
    );
    for section in sections {
        out.push_str(&sanitize_cell(&section.title));
        out.push_str(":\n");
        if section.rows.is_empty() {
            out.push_str(section.empty_note);
            out.push('\n');
            continue;
        }
        table.write_header(&mut out);
        for cells in &section.rows {
            table.write_row(&mut out, cells)?;
        }
    }
    Ok(out)
}

fn render_failure<R>(report: &str, row: &ReportRow<R>, error: RenderError) -> RenderFailure {
    tracing::warn!(
        report,
        account_id = %row.account.id,
        error = %error,
        "Row left out of rendered report"
    );
    RenderFailure {
        account_id: row.account.id,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Account;

    #[derive(Debug, Clone, PartialEq)]
    struct Score(Option<i64>);

    impl RecordLayout for Score {
        const LAYOUT: Layout = Layout::Flat;

        fn columns() -> &'static [ColumnSpec] {
            const COLUMNS: &[ColumnSpec] = &[ColumnSpec::new("Score", 5)];
            COLUMNS
        }

        fn body(&self) -> RecordBody {
            RecordBody::Row(vec![self.0.map_or(Cell::Missing, Cell::Int)])
        }
    }

    /// Emits the wrong number of cells when the score is negative.
    #[derive(Debug, Clone, PartialEq)]
    struct Fragile(i64);

    impl RecordLayout for Fragile {
        const LAYOUT: Layout = Layout::Flat;

        fn columns() -> &'static [ColumnSpec] {
            const COLUMNS: &[ColumnSpec] = &[ColumnSpec::new("Value", 5)];
            COLUMNS
        }

        fn body(&self) -> RecordBody {
            if self.0 < 0 {
                RecordBody::Row(vec![Cell::Int(self.0), Cell::Int(self.0)])
            } else {
                RecordBody::Row(vec![Cell::Int(self.0)])
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Findings(Vec<(&'static str, Vec<i64>)>);

    impl RecordLayout for Findings {
        const LAYOUT: Layout = Layout::Nested;

        fn columns() -> &'static [ColumnSpec] {
            const COLUMNS: &[ColumnSpec] = &[ColumnSpec::new("Code", 4)];
            COLUMNS
        }

        fn body(&self) -> RecordBody {
            RecordBody::Sections(
                self.0
                    .iter()
                    .map(|(title, codes)| crate::report::Section {
                        title: title.to_string(),
                        rows: codes.iter().map(|c| vec![Cell::Int(*c)]).collect(),
                        empty_note: "nothing",
                        empty_sheet_note: "Nothing.",
                    })
                    .collect(),
            )
        }
    }

    fn report<R>(rows: Vec<(Account, R)>) -> Report<R> {
        let mut report = Report::new("test", "Title");
        for (account, record) in rows {
            report.push(account, record);
        }
        report
    }

    #[test]
    fn test_flat_zero_rows_renders_header_only() {
        let rendered = ReportBuilder::render(&report::<Score>(vec![]));
        let lines: Vec<&str> = rendered.body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("| Account Name"));
        assert!(lines[1].starts_with("|----"));
        assert_eq!(rendered.rows_rendered, 0);
    }

    #[test]
    fn test_flat_rows_keep_order() {
        let rendered = ReportBuilder::render(&report(vec![
            (Account::new(2, "Second"), Score(Some(1))),
            (Account::new(1, "First"), Score(None)),
        ]));
        let lines: Vec<&str> = rendered.body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("Second"));
        assert!(lines[3].contains("First"));
        assert!(lines[3].contains("N/A"));
        assert_eq!(rendered.rows_rendered, 2);
    }

    #[test]
    fn test_render_is_idempotent() {
        let r = report(vec![(Account::new(7, "Seven"), Score(Some(0)))]);
        assert_eq!(ReportBuilder::render(&r), ReportBuilder::render(&r));
    }

    #[test]
    fn test_bad_row_is_left_out() {
        let rendered = ReportBuilder::render(&report(vec![
            (Account::new(1, "Good"), Fragile(1)),
            (Account::new(2, "Bad"), Fragile(-1)),
            (Account::new(3, "Also Good"), Fragile(3)),
        ]));
        assert_eq!(rendered.rows_rendered, 2);
        assert_eq!(rendered.failures.len(), 1);
        assert_eq!(rendered.failures[0].account_id.get(), 2);
        assert!(!rendered.body.contains("Bad"));
        assert!(rendered.body.contains("Also Good"));
    }

    #[test]
    fn test_account_name_with_border_is_sanitized() {
        let rendered = ReportBuilder::render(&report(vec![(
            Account::new(1, "A|B\nCorp"),
            Score(Some(1)),
        )]));
        let row = rendered.body.lines().nth(2).unwrap();
        assert!(row.contains("A/B Corp"));
        assert_eq!(row.matches('|').count(), 4);
    }

    #[test]
    fn test_nested_sections() {
        let rendered = ReportBuilder::render(&report(vec![
            (
                Account::new(1, "One"),
                Findings(vec![("Email", vec![1, 2]), ("Chat", vec![])]),
            ),
            (Account::new(2, "Two"), Findings(vec![("Email", vec![])])),
        ]));
        let expected = "\
Account ID: 1, Display Name: One
Email:
| Code |
|------|
| 1    |
| 2    |
Chat:
nothing

Account ID: 2, Display Name: Two
Email:
nothing
";
        assert_eq!(rendered.body, expected);
        assert_eq!(rendered.rows_rendered, 2);
    }

    #[test]
    fn test_nested_zero_rows_is_empty() {
        let rendered = ReportBuilder::render(&report::<Findings>(vec![]));
        assert!(rendered.body.is_empty());
    }
}
