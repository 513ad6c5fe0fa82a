use ratatui::{prelude::*, widgets::*};

use crate::tui::app::{App, LinkStatus};

pub fn render_ui(f: &mut Frame, app: &App) {
    let area = f.area();
    let main_chunks = ratatui::layout::Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .margin(1)
        .constraints([
            ratatui::layout::Constraint::Length(1), // title
            ratatui::layout::Constraint::Length(3), // tab row
            ratatui::layout::Constraint::Min(0),    // flow content
            ratatui::layout::Constraint::Length(3), // bottom help + status
        ])
        .split(area);

    // Title bar (centered, bold, deep green)
    let title = Paragraph::new(format!("flowdeck v{}", env!("CARGO_PKG_VERSION")))
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(Color::Rgb(0, 150, 0))
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(title, main_chunks[0]);

    render_tab_row(f, main_chunks[1], app);
    render_content(f, main_chunks[2], app);
    render_bottom(f, main_chunks[3], app);

    if app.dialog.is_some() {
        render_dialog(f, area, app);
    }
}

/// One tab per live flow in board order, plus the trailing `[+]` pseudo-tab
/// that opens the creation dialog.
fn render_tab_row(f: &mut Frame, area: Rect, app: &App) {
    let titles: Vec<Line> = app
        .board
        .flows()
        .iter()
        .map(|flow| Line::from(flow.name.clone()))
        .chain(std::iter::once(Line::from("[+]")))
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.selected_index())
        .block(
            Block::default()
                .title(" Flows")
                .borders(Borders::ALL)
                .border_type(BorderType::Plain),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(0, 100, 0))
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, area);
}

fn render_content(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain);

    let content = if app.on_new_flow_tab() {
        Paragraph::new("Press Enter to create a new flow").block(block)
    } else if let Some(flow) = app.selected_flow() {
        // Placeholder pane; each flow's body is just its label for now.
        Paragraph::new(format!("Flow {}", flow.name)).block(block)
    } else {
        Paragraph::new("No flows yet").block(block)
    };
    f.render_widget(content, area);
}

fn render_bottom(f: &mut Frame, area: Rect, app: &App) {
    let bottom = ratatui::layout::Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            ratatui::layout::Constraint::Length(1),
            ratatui::layout::Constraint::Length(1),
        ])
        .split(area);

    // Errors replace the help line until cleared with Esc.
    if let Some(err) = &app.error {
        let error = Paragraph::new(err.clone())
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD));
        f.render_widget(error, bottom[0]);
    } else {
        let help = Paragraph::new("←/→ select tab   Enter activate   d delete   q quit")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(help, bottom[0]);
    }

    let link_text = match app.link {
        LinkStatus::Connecting => "Connecting...",
        LinkStatus::Connected => "Connected",
        LinkStatus::Reconnecting => "Reconnecting...",
        LinkStatus::Exhausted => "Disconnected (press 'r' to retry)",
    };
    let last = app
        .last_event
        .map(|t| format!("last update {}", t.format("%H:%M:%S")))
        .unwrap_or_else(|| "no updates yet".to_string());
    let status = Paragraph::new(format!("{link_text}    {last}"))
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(Color::Rgb(0, 150, 0))
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(status, bottom[1]);
}

/// Modal overlay collecting the new flow's name.
fn render_dialog(f: &mut Frame, area: Rect, app: &App) {
    let Some(dialog) = &app.dialog else {
        return;
    };

    let popup = centered_rect(50, 5, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .title(" New Flow")
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .style(
            Style::default()
                .fg(Color::Rgb(0, 150, 0))
                .add_modifier(Modifier::BOLD),
        );

    let text = vec![
        Line::from("Name (letters, digits, _ and space):"),
        Line::from(format!("{}_", dialog.input)),
        Line::from(Span::styled(
            "Enter create    Esc cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let body = Paragraph::new(text).block(block);
    f.render_widget(body, popup);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = (area.width as u32 * percent_x as u32 / 100) as u16;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width,
        height: height.min(area.height),
    }
}
