use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use std::io;
use tui::backend::CrosstermBackend;
use tui::buffer::Buffer;
use tui::layout::{Constraint, Direction, Layout, Rect};
use tui::style::{Color, Style};
use tui::widgets::{Block, Borders, Paragraph, Widget};
use tui::Terminal;

use crate::video::Framebuffer;

/// Display is used by the front end to put frames on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work.
pub trait Display {
    /// how many pixels wide the machine's screen may currently be
    fn viewport_width(&mut self) -> Result<usize, io::Error>;

    /// show a frame along with the debug and status text
    fn show(&mut self, view: &View) -> Result<(), io::Error>;
}

/// everything that goes on screen in one pass
pub struct View<'a> {
    pub title: &'a str,
    pub frame: Option<&'a Framebuffer>,
    pub debug: &'a str,
    /// recent log lines, oldest first
    pub output: &'a str,
    pub status: &'a str,
}

// screen pane, debug pane, output pane, status line
struct Panes(Rect, Rect, Rect, Rect);

impl Panes {
    fn split(area: Rect) -> Panes {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)].as_ref())
            .split(area);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
            .split(rows[0]);
        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
            .split(cols[1]);
        Panes(cols[0], side[0], side[1], rows[1])
    }

    fn screen_block(title: &str) -> Block<'_> {
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Black))
    }

    /// usable pixel width: one pixel per cell across, two per cell down, for
    /// a 2:1 screen
    fn viewport_width(&self) -> usize {
        let inner = Panes::screen_block("").inner(self.0);
        (inner.width as usize).min(inner.height as usize * 4)
    }
}

/// Draws a framebuffer with upper half blocks, so each cell carries two
/// pixel rows: foreground on top, background below.
pub struct FrameView<'a>(pub &'a Framebuffer);

impl Widget for FrameView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let fb = self.0;
        for row in 0..area.height {
            let top = row as usize * 2;
            if top >= fb.height() {
                break;
            }
            for col in 0..area.width.min(fb.width() as u16) {
                let x = col as usize;
                let upper = rgb(fb.pixel(x, top));
                let lower = if top + 1 < fb.height() {
                    rgb(fb.pixel(x, top + 1))
                } else {
                    Color::Reset
                };
                buf.get_mut(area.x + col, area.y + row)
                    .set_symbol("▀")
                    .set_fg(upper)
                    .set_bg(lower);
            }
        }
    }
}

fn rgb([r, g, b, _]: [u8; 4]) -> Color {
    Color::Rgb(r, g, b)
}

/// full-screen terminal display, rendered using TUI and Crossterm
pub struct TermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TermDisplay {
    pub fn new() -> Result<TermDisplay, io::Error> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        Ok(TermDisplay { terminal })
    }
}

impl Display for TermDisplay {
    fn viewport_width(&mut self) -> Result<usize, io::Error> {
        Ok(Panes::split(self.terminal.size()?).viewport_width())
    }

    fn show(&mut self, view: &View) -> Result<(), io::Error> {
        self.terminal.draw(|f| {
            let panes = Panes::split(f.size());

            let block = Panes::screen_block(view.title);
            let inner = block.inner(panes.0);
            f.render_widget(block, panes.0);
            if let Some(frame) = view.frame {
                f.render_widget(FrameView(frame), inner);
            }

            let debug = Paragraph::new(view.debug)
                .block(Block::default().title("Debug").borders(Borders::ALL));
            f.render_widget(debug, panes.1);

            // keep the newest lines in view
            let rows = panes.2.height.saturating_sub(2) as usize;
            let scroll = view.output.lines().count().saturating_sub(rows);
            let output = Paragraph::new(view.output)
                .block(Block::default().title("Output").borders(Borders::ALL))
                .scroll((scroll.min(u16::MAX as usize) as u16, 0));
            f.render_widget(output, panes.2);
            f.render_widget(Paragraph::new(view.status), panes.3);
        })?;
        Ok(())
    }
}

impl Drop for TermDisplay {
    fn drop(&mut self) {
        if let Err(e) = self.terminal.show_cursor() {
            log::warn!("can't restore cursor: {}", e);
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen) {
            log::warn!("can't leave alternate screen: {}", e);
        }
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("can't leave raw mode: {}", e);
        }
    }
}

/// useful for testing non-display routines
pub struct DummyDisplay {
    pub width: usize,
    pub shown: usize,
}

impl DummyDisplay {
    pub fn new(width: usize) -> DummyDisplay {
        DummyDisplay { width, shown: 0 }
    }
}

impl Display for DummyDisplay {
    fn viewport_width(&mut self) -> Result<usize, io::Error> {
        Ok(self.width)
    }

    fn show(&mut self, _view: &View) -> Result<(), io::Error> {
        self.shown += 1;
        Ok(())
    }
}
