use std::io::{self, Stdout};

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};

use super::FieldsDialog;
use crate::board::UserField;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    Continue,
    Confirm,
    Cancel,
}

/// Editing state of the field form, independent of any terminal.
#[derive(Debug, Clone)]
pub struct FieldsForm {
    fields: Vec<UserField>,
    selected: usize,
    reveal_secrets: bool,
    error: Option<String>,
}

impl FieldsForm {
    pub fn new(fields: Vec<UserField>) -> Self {
        Self {
            fields,
            selected: 0,
            reveal_secrets: false,
            error: None,
        }
    }

    pub fn fields(&self) -> &[UserField] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<UserField> {
        self.fields
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    fn select_next(&mut self) {
        if !self.fields.is_empty() {
            self.selected = (self.selected + 1) % self.fields.len();
        }
    }

    fn select_prev(&mut self) {
        if !self.fields.is_empty() {
            self.selected = (self.selected + self.fields.len() - 1) % self.fields.len();
        }
    }

    fn try_confirm(&mut self) -> FormAction {
        match self.fields.iter().position(|f| f.value.is_empty()) {
            Some(idx) => {
                self.error = Some(format!(
                    "'{}' must not be empty",
                    self.fields[idx].display_label()
                ));
                self.selected = idx;
                FormAction::Continue
            }
            None => FormAction::Confirm,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode, mods: KeyModifiers) -> FormAction {
        if mods.contains(KeyModifiers::CONTROL) {
            return match code {
                KeyCode::Char('c') => FormAction::Cancel,
                KeyCode::Char('s') => self.try_confirm(),
                KeyCode::Char('r') => {
                    self.reveal_secrets = !self.reveal_secrets;
                    FormAction::Continue
                }
                _ => FormAction::Continue,
            };
        }

        match code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter => {
                if self.fields.is_empty() || self.selected + 1 == self.fields.len() {
                    return self.try_confirm();
                }
                self.select_next();
            }
            KeyCode::Tab | KeyCode::Down => self.select_next(),
            KeyCode::BackTab | KeyCode::Up => self.select_prev(),
            KeyCode::Backspace => {
                if let Some(f) = self.fields.get_mut(self.selected) {
                    f.value.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(f) = self.fields.get_mut(self.selected) {
                    f.value.push(c);
                    self.error = None;
                }
            }
            _ => {}
        }
        FormAction::Continue
    }

    fn shown_value(&self, f: &UserField) -> String {
        if f.secret && !self.reveal_secrets {
            "*".repeat(f.value.chars().count())
        } else {
            f.value.clone()
        }
    }

    pub fn draw(&self, f: &mut ratatui::Frame) {
        let area = centered_rect(70, 50, f.area());
        f.render_widget(Clear, area);

        let mut text = Vec::new();
        text.push(Line::from(
            "tab/up/down=move  enter=next/confirm  ctrl+s=confirm  ctrl+r=reveal  esc=cancel",
        ));
        if let Some(e) = &self.error {
            text.push(Line::from(Span::styled(
                format!("error: {e}"),
                Style::default().fg(Color::Red),
            )));
        }
        text.push(Line::from(""));
        for (i, field) in self.fields.iter().enumerate() {
            let selected = i == self.selected;
            let marker = if selected { "> " } else { "  " };
            let label_style = if selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Yellow)
            };
            text.push(Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{}: ", field.display_label()), label_style),
                Span::raw(self.shown_value(field)),
            ]));
        }

        let p = Paragraph::new(Text::from(text))
            .style(Style::default().fg(Color::White).bg(Color::DarkGray))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title("Configure and Upload")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double),
            );
        f.render_widget(p, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(rows[1])[1]
}

/// Full-screen terminal form. Takes over the terminal for the duration of `open`.
#[derive(Debug, Default)]
pub struct TuiDialog;

impl FieldsDialog for TuiDialog {
    fn open(&mut self, fields: Vec<UserField>) -> Result<Option<Vec<UserField>>> {
        let mut stdout = io::stdout();
        enable_raw_mode().map_err(|e| Error::msg(e.to_string()))?;
        if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
            execute!(stdout, LeaveAlternateScreen, Show).ok();
            disable_raw_mode().ok();
            return Err(Error::msg(format!("terminal setup failed: {e}")));
        }
        let backend = CrosstermBackend::new(stdout);
        let result = match Terminal::new(backend) {
            Ok(mut terminal) => {
                let r = run_form(&mut terminal, FieldsForm::new(fields));
                execute!(terminal.backend_mut(), LeaveAlternateScreen, Show).ok();
                r
            }
            Err(e) => {
                execute!(io::stdout(), LeaveAlternateScreen, Show).ok();
                Err(Error::msg(format!("terminal init failed: {e}")))
            }
        };
        disable_raw_mode().ok();
        result
    }
}

fn run_form(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut form: FieldsForm,
) -> Result<Option<Vec<UserField>>> {
    terminal
        .clear()
        .map_err(|e| Error::msg(format!("tui clear failed: {e}")))?;
    loop {
        terminal
            .draw(|f| form.draw(f))
            .map_err(|e| Error::msg(format!("tui draw failed: {e}")))?;

        let Event::Key(k) = event::read().map_err(|e| Error::msg(e.to_string()))? else {
            continue;
        };
        if k.kind != KeyEventKind::Press {
            continue;
        }
        match form.handle_key(k.code, k.modifiers) {
            FormAction::Continue => {}
            FormAction::Cancel => return Ok(None),
            FormAction::Confirm => return Ok(Some(form.into_fields())),
        }
    }
}
