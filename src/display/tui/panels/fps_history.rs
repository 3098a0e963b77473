// SPDX-License-Identifier: MIT
use std::collections::VecDeque;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, Widget};

use crate::display::tui::theme::{BLOCK_CHARS, Theme};

const STEPS_PER_CELL: usize = BLOCK_CHARS.len() - 1;

/// Height of a bar in eighth-cells, scaled against `peak`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn bar_steps(value: f64, peak: f64, chart_height: usize) -> usize {
    if peak <= 0.0 || !value.is_finite() {
        return 0;
    }
    let total = (chart_height * STEPS_PER_CELL) as f64;
    ((value.max(0.0) / peak) * total).round() as usize
}

struct FpsChart<'a> {
    history: &'a VecDeque<f64>,
    theme: &'a Theme,
}

impl Widget for FpsChart<'_> {
    #[allow(clippy::cast_possible_truncation)]
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 2 || area.width < 2 {
            return;
        }

        let legend_height: u16 = 1;
        let chart_height = area.height.saturating_sub(legend_height);
        if chart_height == 0 {
            return;
        }

        let peak = self.history.iter().copied().fold(0.0_f64, f64::max);
        let num_columns = (area.width as usize).min(self.history.len());

        for j in 0..num_columns {
            let value = self.history[self.history.len() - 1 - j];
            let col_x = area.x + area.width - 1 - j as u16;
            let steps = bar_steps(value, peak, chart_height as usize);

            for row in 0..chart_height as usize {
                let cell_y = area.y + chart_height - 1 - row as u16;
                let filled = steps.saturating_sub(row * STEPS_PER_CELL).min(STEPS_PER_CELL);
                if filled > 0 {
                    buf[(col_x, cell_y)]
                        .set_char(BLOCK_CHARS[filled])
                        .set_style(self.theme.chart);
                }
            }
        }

        let legend_y = area.y + chart_height;
        let latest = self.history.back().copied().unwrap_or(0.0);
        let legend = Line::from(format!("latest {latest:.2} fps  peak {peak:.2} fps"));
        Paragraph::new(legend).render(Rect::new(area.x, legend_y, area.width, 1), buf);
    }
}

pub fn render(frame: &mut ratatui::Frame, area: Rect, history: &VecDeque<f64>, theme: &Theme) {
    if area.height < 2 || area.width < 2 {
        return;
    }

    if history.is_empty() {
        frame.render_widget(Paragraph::new("Waiting for the first rate window..."), area);
        return;
    }

    frame.render_widget(FpsChart { history, theme }, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_fills_whole_column() {
        assert_eq!(bar_steps(30.0, 30.0, 4), 4 * STEPS_PER_CELL);
        assert_eq!(bar_steps(15.0, 30.0, 4), 2 * STEPS_PER_CELL);
        assert_eq!(bar_steps(0.0, 30.0, 4), 0);
        assert_eq!(bar_steps(10.0, 0.0, 4), 0);
    }

    #[test]
    fn chart_draws_newest_value_on_the_right() {
        let history: VecDeque<f64> = [10.0, 20.0].into_iter().collect();
        let theme = Theme::default();
        let area = Rect::new(0, 0, 4, 3);
        let mut buf = Buffer::empty(area);
        FpsChart {
            history: &history,
            theme: &theme,
        }
        .render(area, &mut buf);

        // peak column is full height, the older one half.
        assert_eq!(buf[(3, 0)].symbol(), "\u{2588}");
        assert_eq!(buf[(3, 1)].symbol(), "\u{2588}");
        assert_eq!(buf[(2, 0)].symbol(), " ");
        assert_eq!(buf[(2, 1)].symbol(), "\u{2588}");
        assert_eq!(buf[(0, 1)].symbol(), " ");
    }
}
