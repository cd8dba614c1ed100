use serde::Serialize;

/// How command results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Human }
    }

    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    ok: bool,
    command: &'a str,
    data: T,
}

/// Render a successful result as a single JSON document
pub fn render_success<T: Serialize>(command: &str, data: T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Envelope { ok: true, command, data })
}

pub fn emit_success<T: Serialize>(command: &str, data: T) -> anyhow::Result<()> {
    println!("{}", render_success(command, data)?);
    Ok(())
}
