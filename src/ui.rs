use crate::app::{App, EditBuffer, EditField};
use crate::state::SortDirection;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.size());

    draw_grid(f, chunks[0], app);
    draw_paging(f, chunks[1], app);
    draw_status(f, chunks[2], app);

    if app.edit.is_some() {
        draw_edit_modal(f, app);
    }
}

fn draw_grid(f: &mut Frame, area: Rect, app: &App) {
    let title = if app.state.loading {
        "Users (loading...)"
    } else {
        "Users"
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let rows_data = app.state.sorted_data();
    if rows_data.is_empty() && !app.state.loading {
        let p = Paragraph::new("No users on this page. r to reload.").block(block);
        f.render_widget(p, area);
        return;
    }

    let header = Row::new(app.state.columns.iter().map(|col| {
        let marker = match col.sort_direction {
            Some(SortDirection::Ascend) => " ^",
            Some(SortDirection::Descend) => " v",
            None => "",
        };
        Cell::from(format!("{}{}", col.title, marker))
    }))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let mut rows = Vec::with_capacity(rows_data.len());
    for (r_idx, user) in rows_data.iter().enumerate() {
        let values = [user.id.to_string(), user.name.clone(), user.age.to_string()];
        let mut cells = Vec::with_capacity(values.len());
        for (c_idx, val) in values.into_iter().enumerate() {
            let mut cell = Cell::from(val);
            if r_idx == app.sel_row && c_idx == app.sel_col {
                cell = cell.style(Style::default().bg(Color::Blue).fg(Color::Black));
            }
            cells.push(cell);
        }
        rows.push(Row::new(cells));
    }

    let widths = column_widths(area.width, app);
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1);

    f.render_widget(table, area);
}

fn column_widths(total_width: u16, app: &App) -> Vec<Constraint> {
    let cols = app.state.columns.len();
    if cols == 0 {
        return vec![];
    }
    let w = total_width.saturating_sub(2 + (cols as u16 - 1));
    let per = (w / cols as u16).max(1);
    app.state
        .columns
        .iter()
        .map(|c| Constraint::Length(c.width.unwrap_or(per)))
        .collect()
}

fn draw_paging(f: &mut Frame, area: Rect, app: &App) {
    let paging = &app.state.paging;
    if !paging.enabled {
        return;
    }
    let pages = paging
        .pages_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());
    let sizes = paging
        .page_sizes
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("/");
    let text = format!(
        " Page {}/{} | {} rows/page (z cycles {}) | PgUp/PgDn to page",
        paging.page_index + 1,
        pages,
        paging.page_size,
        sizes
    );
    f.render_widget(Paragraph::new(text).style(Style::default().fg(Color::DarkGray)), area);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let mode = if app.edit.is_some() { "EDIT" } else { "NORMAL" };
    let text = Line::from(vec![
        Span::styled(
            format!("[{mode}] "),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(&app.status),
    ]);
    f.render_widget(Paragraph::new(text), area);
}

fn draw_edit_modal(f: &mut Frame, app: &App) {
    let Some(buf) = &app.edit else { return };
    let area = centered_rect(f.size(), 44, 8);
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Edit user {}", buf.id));

    let lines = vec![
        field_line("Name", &buf.name, buf, EditField::Name),
        field_line("Age ", &buf.age, buf, EditField::Age),
        Line::raw(""),
        Line::from(Span::styled(
            "[Enter] Save  [Esc] Cancel  [Tab] Switch field",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn field_line<'a>(label: &'a str, value: &'a str, buf: &EditBuffer, field: EditField) -> Line<'a> {
    let active = buf.field == field;
    let label_span = Span::styled(
        format!("{label}: "),
        if active {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        },
    );
    if !active {
        return Line::from(vec![label_span, Span::raw(value)]);
    }
    // Split the active field at the cursor so the insertion point is visible
    let cursor = buf.cursor.min(value.len());
    Line::from(vec![
        label_span,
        Span::raw(&value[..cursor]),
        Span::styled("|", Style::default().fg(Color::Yellow)),
        Span::raw(&value[cursor..]),
    ])
}

fn centered_rect(outer: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(outer.width);
    let h = height.min(outer.height);
    Rect {
        x: outer.x + (outer.width - w) / 2,
        y: outer.y + (outer.height - h) / 2,
        width: w,
        height: h,
    }
}
