//! Rendering: header meters, the process table, and the function bar.
//! Pure presentation — all state lives in `App`; this module only reads it.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table};
use ratatui::Frame;

use crate::app::App;
use crate::meter::Meter;
use crate::rich_string::{Cell, ColorPair, RichString};
use crate::settings::MeterMode;

pub fn draw(f: &mut Frame, app: &mut App) {
    let meter_rows = app.meters.left.len().max(app.meters.right.len()).max(1) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(meter_rows),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_meters(f, app, chunks[0]);
    draw_process_table(f, app, chunks[1]);
    draw_function_bar(f, app, chunks[2]);

    if let Some(screen) = app.info_stack.last() {
        draw_info_screen(f, screen, f.area());
    }
}

// ── Header meters ───────────────────────────────────────────

fn draw_meters(f: &mut Frame, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    draw_meter_column(f, &app.meters.left, cols[0]);
    draw_meter_column(f, &app.meters.right, cols[1]);
}

fn draw_meter_column(f: &mut Frame, meters: &[Box<dyn Meter>], area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(1); meters.len().max(1)])
        .split(area);

    for (meter, row) in meters.iter().zip(rows.iter()) {
        let line = meter_line(meter.as_ref());
        f.render_widget(Paragraph::new(line), *row);
    }
}

fn meter_line(meter: &dyn Meter) -> Line<'static> {
    let readings = meter.readings();
    let body = match meter.mode() {
        MeterMode::Text | MeterMode::Graph | MeterMode::Led => readings
            .iter()
            .map(|r| format!("{}: {:.1}", r.label, r.value))
            .collect::<Vec<_>>()
            .join(" "),
        MeterMode::Bar => {
            let r = readings.first();
            match r {
                Some(r) if r.max > 0.0 => {
                    let pct = (r.value / r.max * 100.0).clamp(0.0, 100.0);
                    format!("[{:<20}] {:>5.1}%", "|".repeat((pct / 5.0) as usize), pct)
                }
                _ => "n/a".to_owned(),
            }
        }
    };
    Line::from(vec![
        Span::styled(format!("{:<6}", meter.caption()), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(body),
    ])
}

// ── Process table ───────────────────────────────────────────

fn draw_process_table(f: &mut Frame, app: &mut App, area: Rect) {
    let height = area.height.saturating_sub(2) as usize; // borders
    app.panel.sync_viewport(height);
    let _ = app.panel.repaint_plan(); // drains the dirty flag; ui always repaints fully

    let header_cells: Vec<&str> = app.settings.fields.iter().map(|f| f.header_label()).collect();
    let header = Row::new(header_cells)
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(0);

    let range = app.panel.visible_range(height);
    let selected = app.panel.selected_index();
    let fields = app.settings.fields.clone();
    let mut rows = Vec::with_capacity(range.len());
    for (i, &pid) in app.panel.items()[range.clone()].iter().enumerate() {
        let row_index = range.start + i;
        let Some(record) = app.sampling.table.get_by_pid(pid) else { continue };
        let mut line = RichString::new();
        for &field in &fields {
            record.write_field(field, &app.settings, &mut app.users, &mut line);
        }
        let spans: Vec<Span<'static>> = line.cells().iter().map(cell_to_span).collect();
        let mut row = Row::new(vec![Line::from(spans)]);
        if row_index == selected {
            row = row.style(Style::default().bg(Color::DarkGray));
        }
        rows.push(row);
    }

    let table = Table::new(rows, [Constraint::Percentage(100)])
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(sort_title(app)));

    f.render_widget(table, area);
}

fn sort_title(app: &App) -> String {
    format!(" Processes (sorted by {}) ", app.sort_field_label())
}

fn cell_to_span(cell: &Cell) -> Span<'static> {
    let mut style = Style::default().fg(color_of(cell.color));
    if cell.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    Span::styled(cell.ch.to_string(), style)
}

fn color_of(pair: ColorPair) -> Color {
    match pair {
        ColorPair::Default | ColorPair::Normal => Color::Reset,
        ColorPair::Running => Color::Green,
        ColorPair::Sleeping => Color::Reset,
        ColorPair::DiskIoOrKernel => Color::Red,
        ColorPair::Zombie => Color::Red,
        ColorPair::BaseName => Color::Cyan,
        ColorPair::Megabytes => Color::Green,
        ColorPair::LargeNumber => Color::Red,
        ColorPair::Shadow => Color::DarkGray,
        ColorPair::HighPriority => Color::Red,
        ColorPair::LowPriority => Color::Blue,
        ColorPair::ProcessTag => Color::Yellow,
        ColorPair::ProcessTree => Color::Cyan,
        ColorPair::FailedSearch => Color::Red,
        ColorPair::FunctionKey => Color::White,
        ColorPair::FunctionBar => Color::Black,
        ColorPair::PanelHeaderFocus | ColorPair::PanelHeaderUnfocus => Color::Yellow,
        ColorPair::PanelSelectionFocus | ColorPair::PanelSelectionUnfocus => Color::White,
    }
}

// ── Function bar ────────────────────────────────────────────

fn draw_function_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();
    for (i, label) in app.function_bar.labels().enumerate() {
        if label.is_empty() {
            continue;
        }
        spans.push(Span::styled(format!("F{}", i + 1), Style::default().fg(Color::Black).bg(Color::White)));
        spans.push(Span::raw(format!("{label} ")));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Info screens (Arg/Env/OpenFiles/Trace/KernelStack) ──────

fn draw_info_screen(f: &mut Frame, screen: &crate::info_screen::InfoScreen, area: Rect) {
    let lines: Vec<Line> = screen.lines.iter().map(|l| Line::from(l.as_str())).collect();
    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(screen.title.clone()));
    f.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::{MeterReading, SnapshotMeter};
    use crate::platform::MeterClass;

    #[test]
    fn bar_meter_formats_percentage() {
        let meter = SnapshotMeter::new(
            MeterClass::Memory,
            MeterMode::Bar,
            "Mem",
            vec![MeterReading { label: "Mem".to_owned(), value: 50.0, max: 100.0 }],
        );
        let line = meter_line(&meter);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.contains("50.0%"));
    }

    #[test]
    fn text_meter_joins_readings() {
        let meter = SnapshotMeter::new(
            MeterClass::LoadAverage,
            MeterMode::Text,
            "Load average",
            vec![
                MeterReading { label: "1m".to_owned(), value: 0.5, max: f64::MAX },
                MeterReading { label: "5m".to_owned(), value: 0.25, max: f64::MAX },
            ],
        );
        let line = meter_line(&meter);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.contains("1m: 0.5"));
        assert!(text.contains("5m: 0.2"));
    }

    #[test]
    fn color_of_maps_every_pair_without_panic() {
        let pairs = [
            ColorPair::Default,
            ColorPair::Running,
            ColorPair::Zombie,
            ColorPair::HighPriority,
            ColorPair::LowPriority,
            ColorPair::Shadow,
            ColorPair::ProcessTree,
        ];
        for p in pairs {
            let _ = color_of(p);
        }
    }
}
