use std::process::{Command, Stdio};

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};

use super::types::Phase;

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub(crate) fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    let right = rect.x.saturating_add(rect.width);
    let bottom = rect.y.saturating_add(rect.height);
    x >= rect.x && x < right && y >= rect.y && y < bottom
}

pub(crate) fn table_row_index_at(area: Rect, mouse_row: u16) -> Option<usize> {
    if area.height <= 3 {
        return None;
    }
    let first_data_row = area.y.saturating_add(2);
    let last_data_row = area.y + area.height - 1;
    if mouse_row >= first_data_row && mouse_row < last_data_row {
        Some((mouse_row - first_data_row) as usize)
    } else {
        None
    }
}

pub(crate) fn open_url_in_browser(url: &str) -> Result<(), String> {
    if url.trim().is_empty() {
        return Err("empty URL".to_string());
    }

    #[cfg(target_os = "macos")]
    let mut command = {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    };

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", "", url]);
        cmd
    };

    #[cfg(all(not(target_os = "macos"), not(target_os = "windows")))]
    let mut command = {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| err.to_string())?;

    Ok(())
}

pub(crate) fn broken_links_style(count: u32) -> Style {
    match count {
        0 => Style::default().fg(Color::Green),
        1..=4 => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

pub(crate) fn link_status_style(status: u16) -> Style {
    match status {
        0 => Style::default()
            .fg(Color::LightRed)
            .add_modifier(Modifier::BOLD),
        400..=499 => Style::default().fg(Color::Red),
        500..=599 => Style::default().fg(Color::Magenta),
        _ => Style::default().fg(Color::Gray),
    }
}

pub(crate) fn phase_style(phase: Phase) -> Style {
    match phase {
        Phase::Idle => Style::default().fg(Color::DarkGray),
        Phase::Loading => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        Phase::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Phase::Loaded => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    }
}

pub(crate) fn truncate_for_display(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(3))
        .collect::<String>();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_index_skips_border_and_header() {
        let area = Rect::new(0, 10, 40, 8);
        assert_eq!(table_row_index_at(area, 10), None);
        assert_eq!(table_row_index_at(area, 11), None);
        assert_eq!(table_row_index_at(area, 12), Some(0));
        assert_eq!(table_row_index_at(area, 16), Some(4));
        assert_eq!(table_row_index_at(area, 17), None);
        assert_eq!(table_row_index_at(Rect::new(0, 0, 40, 3), 2), None);
    }

    #[test]
    fn point_in_rect_is_half_open() {
        let rect = Rect::new(2, 2, 4, 4);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 5, rect));
        assert!(!point_in_rect(6, 5, rect));
        assert!(!point_in_rect(1, 3, rect));
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(60, 40, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
        assert!(point_in_rect(popup.x, popup.y, area));
    }

    #[test]
    fn truncation_marks_cut_text() {
        assert_eq!(truncate_for_display("short", 10), "short");
        assert_eq!(truncate_for_display("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn open_rejects_blank_url() {
        assert!(open_url_in_browser("   ").is_err());
    }
}
