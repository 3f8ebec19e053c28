use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

/// Yes/No modal drawn over the dashboard.
pub struct ConfirmDialog {
    pub message: String,
    pub yes_selected: bool,
}

impl ConfirmDialog {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            yes_selected: false,
        }
    }

    pub fn toggle(&mut self) {
        self.yes_selected = !self.yes_selected;
    }

    pub fn render(&self, f: &mut Frame) {
        let width = (self.message.len() as u16 + 6).max(30);
        let area = centered_rect(width, 7, f.area());
        f.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Confirm ");
        let inner = block.inner(area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1), // message
                Constraint::Length(1),
                Constraint::Length(1), // buttons
            ])
            .split(inner);

        let msg = Paragraph::new(Line::from(Span::styled(
            self.message.as_str(),
            Style::default().fg(Color::White),
        )))
        .alignment(Alignment::Center);
        f.render_widget(msg, rows[1]);

        let highlight = |on: bool, bg: Color| {
            if on {
                Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            }
        };
        let buttons = Line::from(vec![
            Span::styled("  [Yes]  ", highlight(self.yes_selected, Color::Green)),
            Span::raw("   "),
            Span::styled("  [No]  ", highlight(!self.yes_selected, Color::Red)),
        ]);
        f.render_widget(Paragraph::new(buttons).alignment(Alignment::Center), rows[3]);
    }
}

/// A `width` x `height` rect centered in `area`, clipped to it.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_no() {
        let mut d = ConfirmDialog::new("Quit?");
        assert!(!d.yes_selected);
        d.toggle();
        assert!(d.yes_selected);
    }

    #[test]
    fn test_centered_rect_clips() {
        let r = centered_rect(40, 7, Rect::new(0, 0, 20, 5));
        assert_eq!(r, Rect::new(0, 0, 20, 5));
        let r = centered_rect(10, 4, Rect::new(0, 0, 30, 10));
        assert_eq!(r, Rect::new(10, 3, 10, 4));
    }
}
