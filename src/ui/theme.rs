use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub price: Style,
    pub dim: Style,
    pub muted: Style,
}

impl Theme {
    /// Colors when stdout is a terminal and `NO_COLOR` is unset
    pub fn detect() -> Self {
        let colors = console::Term::stdout().is_term() && std::env::var_os("NO_COLOR").is_none();
        Self::new(colors)
    }

    pub fn new(colors: bool) -> Self {
        let pick = |style: Style| if colors { style } else { Style::new() };
        Self {
            header: pick(Style::new().cyan().bold()),
            success: pick(Style::new().green().bold()),
            error: pick(Style::new().red().bold()),
            warn: pick(Style::new().yellow().bold()),
            info: pick(Style::new().magenta()),
            price: pick(Style::new().green()),
            dim: pick(Style::new().white().dimmed()),
            muted: pick(Style::new().bright_black()),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
