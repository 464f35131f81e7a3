use tui::layout::{Constraint, Layout, Rect, Size};

pub const STATUS_BAR_HEIGHT: u16 = 3;
pub const LOG_PANE_HEIGHT: u16 = 10;
/// Below this width the two lists stack instead of sitting side by side.
const SIDE_BY_SIDE_MIN_WIDTH: u16 = 100;

/// Pre-computed layout areas for the main draw loop.
pub struct LayoutAreas {
    pub status_bar: Rect,
    pub live: Rect,
    pub upcoming: Rect,
    /// `Rect::ZERO` while the log pane is hidden.
    pub logs: Rect,
}

impl LayoutAreas {
    pub fn new(size: Size) -> Self {
        let rect = Rect::new(0, 0, size.width, size.height);
        Self::from_rect(rect, false, false)
    }

    pub fn update(&mut self, area: Rect, full_screen: bool, show_logs: bool) {
        *self = Self::from_rect(area, full_screen, show_logs);
    }

    fn from_rect(area: Rect, full_screen: bool, show_logs: bool) -> Self {
        let status_height = if full_screen { 0 } else { STATUS_BAR_HEIGHT };
        let log_height = if show_logs { LOG_PANE_HEIGHT } else { 0 };

        let [status_bar, board, logs] = Layout::vertical([
            Constraint::Length(status_height),
            Constraint::Fill(1),
            Constraint::Length(log_height),
        ])
        .areas(area);

        let [live, upcoming] = Self::split_board(board);
        LayoutAreas {
            status_bar,
            live,
            upcoming,
            logs,
        }
    }

    fn split_board(area: Rect) -> [Rect; 2] {
        if area.width >= SIDE_BY_SIDE_MIN_WIDTH {
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area)
        } else {
            Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area)
        }
    }
}
