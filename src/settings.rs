use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::SessionOptions;
use crate::window::{DeviceProfile, WindowSizing};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080/api";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: String,
    pub token: Option<String>,
    /// Text opened when none is given on the command line.
    pub last_text_id: Option<u64>,
    pub request_timeout_secs: u64,
    /// Terminals at least this many columns wide load like a desktop.
    pub wide_columns: u16,
    pub wide_sizing: WindowSizing,
    pub narrow_sizing: WindowSizing,
    /// Rows from either edge of the laid-out window that trigger growth.
    pub edge_threshold_rows: usize,
    pub anchor_stride: usize,
    pub viewing_debounce_ms: u64,
    pub poll_interval_ms: u64,
    pub mouse_support: bool,
    pub show_statistics: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: None,
            last_text_id: None,
            request_timeout_secs: 10,
            wide_columns: 100,
            wide_sizing: WindowSizing::WIDE,
            narrow_sizing: WindowSizing::NARROW,
            edge_threshold_rows: 3,
            anchor_stride: 20,
            viewing_debounce_ms: 200,
            poll_interval_ms: 2000,
            mouse_support: false,
            show_statistics: true,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn profile_for(&self, columns: u16) -> DeviceProfile {
        DeviceProfile::for_columns(columns, self.wide_columns)
    }

    pub fn sizing_for(&self, profile: DeviceProfile) -> WindowSizing {
        match profile {
            DeviceProfile::Wide => self.wide_sizing,
            DeviceProfile::Narrow => self.narrow_sizing,
        }
    }

    pub fn session_options(&self, columns: u16) -> SessionOptions {
        SessionOptions {
            sizing: self.sizing_for(self.profile_for(columns)),
            edge_threshold: self.edge_threshold_rows,
            anchor_stride: self.anchor_stride.max(1),
            viewing_debounce: Duration::from_millis(self.viewing_debounce_ms),
            poll_period: Duration::from_millis(self.poll_interval_ms.max(100)),
        }
    }
}

/// User-facing key bindings, one character per action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgDefaultKeymaps {
    pub scroll_up: String,
    pub scroll_down: String,
    pub select_prev: String,
    pub select_next: String,
    pub level_up: String,
    pub level_down: String,
    pub mark_well_known: String,
    pub mark_ignored: String,
    pub inspect: String,
    pub jump_to_bookmark: String,
    pub help: String,
    pub quit: String,
}

impl Default for CfgDefaultKeymaps {
    fn default() -> Self {
        Self {
            scroll_up: "k".to_string(),
            scroll_down: "j".to_string(),
            select_prev: "h".to_string(),
            select_next: "l".to_string(),
            level_up: "+".to_string(),
            level_down: "-".to_string(),
            mark_well_known: "w".to_string(),
            mark_ignored: "x".to_string(),
            inspect: "d".to_string(),
            jump_to_bookmark: "b".to_string(),
            help: "?".to_string(),
            quit: "q".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ScrollUp,
    ScrollDown,
    SelectPrev,
    SelectNext,
    LevelUp,
    LevelDown,
    MarkWellKnown,
    MarkIgnored,
    Inspect,
    JumpToBookmark,
    Help,
    Quit,
}

impl CfgDefaultKeymaps {
    /// Action bound to a typed character, if any.
    pub fn action_for(&self, key: char) -> Option<Action> {
        let bindings = [
            (&self.scroll_up, Action::ScrollUp),
            (&self.scroll_down, Action::ScrollDown),
            (&self.select_prev, Action::SelectPrev),
            (&self.select_next, Action::SelectNext),
            (&self.level_up, Action::LevelUp),
            (&self.level_down, Action::LevelDown),
            (&self.mark_well_known, Action::MarkWellKnown),
            (&self.mark_ignored, Action::MarkIgnored),
            (&self.inspect, Action::Inspect),
            (&self.jump_to_bookmark, Action::JumpToBookmark),
            (&self.help, Action::Help),
            (&self.quit, Action::Quit),
        ];
        bindings
            .into_iter()
            .find(|(binding, _)| binding.chars().next() == Some(key))
            .map(|(_, action)| action)
    }

    /// Lines for the help popup.
    pub fn help_lines(&self) -> Vec<String> {
        vec![
            format!(
                "{} / {}  scroll up / down (arrows, PgUp, PgDn)",
                self.scroll_up, self.scroll_down
            ),
            format!("{} / {}  select previous / next term", self.select_prev, self.select_next),
            format!("{} / {}  learning level up / down", self.level_up, self.level_down),
            format!("{}      mark well known", self.mark_well_known),
            format!("{}      mark ignored", self.mark_ignored),
            format!("{}      inspect term (Enter)", self.inspect),
            format!("{}      jump to bookmark", self.jump_to_bookmark),
            format!("{}      this help", self.help),
            format!("{}      quit (Esc closes popups)", self.quit),
        ]
    }
}
