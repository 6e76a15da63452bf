use std::collections::HashSet;

use ratatui::style::{Color, Modifier, Style};

use super::ThemeName;
use crate::model::CheckStatus;
use crate::view::RowAffordance;

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    names: HashSet<ThemeName>,
}

impl ThemeRegistry {
    pub fn contains(&self, theme: &ThemeName) -> bool {
        self.names.contains(theme)
    }

    pub fn all(&self) -> impl Iterator<Item = &ThemeName> {
        self.names.iter()
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        let names = [ThemeName::Dark, ThemeName::Light, ThemeName::HighContrast]
            .into_iter()
            .collect();
        Self { names }
    }
}

/// Closed lookup from view states to terminal styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub header: Color,
    pub selection_bg: Color,
    pub online: Color,
    pub offline: Color,
    pub redirect: Color,
    pub degraded: Color,
    pub unknown: Color,
}

impl Palette {
    pub fn for_theme(theme: &ThemeName) -> Self {
        match theme {
            ThemeName::Light => Self {
                text: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Blue,
                header: Color::Magenta,
                selection_bg: Color::Gray,
                online: Color::Green,
                offline: Color::Red,
                redirect: Color::Blue,
                degraded: Color::Yellow,
                unknown: Color::DarkGray,
            },
            ThemeName::HighContrast => Self {
                text: Color::White,
                muted: Color::White,
                accent: Color::LightYellow,
                header: Color::LightCyan,
                selection_bg: Color::Blue,
                online: Color::LightGreen,
                offline: Color::LightRed,
                redirect: Color::LightBlue,
                degraded: Color::LightYellow,
                unknown: Color::White,
            },
            ThemeName::Dark | ThemeName::Unrecognized => Self {
                text: Color::Gray,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                header: Color::LightMagenta,
                selection_bg: Color::Rgb(40, 44, 52),
                online: Color::Green,
                offline: Color::Red,
                redirect: Color::LightBlue,
                degraded: Color::Yellow,
                unknown: Color::DarkGray,
            },
        }
    }

    pub fn status_color(&self, status: CheckStatus) -> Color {
        match status {
            CheckStatus::Online => self.online,
            CheckStatus::Offline => self.offline,
            CheckStatus::Redirect => self.redirect,
            CheckStatus::ReachableWithError => self.degraded,
            CheckStatus::Unknown => self.unknown,
        }
    }

    pub fn status_style(&self, status: CheckStatus) -> Style {
        Style::default().fg(self.status_color(status))
    }

    pub fn affordance_style(&self, affordance: RowAffordance) -> Style {
        match affordance {
            RowAffordance::Checking => Style::default()
                .fg(self.accent)
                .add_modifier(Modifier::BOLD),
            RowAffordance::FolderMove => Style::default().fg(self.header),
            RowAffordance::Updating => Style::default()
                .fg(self.muted)
                .add_modifier(Modifier::SLOW_BLINK),
            RowAffordance::Idle => Style::default().fg(self.text),
        }
    }

    pub fn disabled_style(&self) -> Style {
        Style::default()
            .fg(self.muted)
            .add_modifier(Modifier::DIM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_theme_is_not_registered() {
        let registry = ThemeRegistry::default();
        assert!(registry.contains(&ThemeName::Dark));
        assert!(!registry.contains(&ThemeName::Unrecognized));
        assert_eq!(registry.all().count(), 3);
    }

    #[test]
    fn statuses_get_distinct_colors() {
        let palette = Palette::for_theme(&ThemeName::Dark);
        assert_ne!(
            palette.status_color(CheckStatus::Online),
            palette.status_color(CheckStatus::Offline)
        );
        assert_eq!(
            palette.status_style(CheckStatus::Unknown).fg,
            Some(palette.unknown)
        );
    }
}
