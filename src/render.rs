//! The only code that writes a `UiState` out.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::ui::{UiContent, UiState};

pub trait Renderer: Send + Sync {
    fn render(&self, state: &UiState) -> io::Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for &R {
    fn render(&self, state: &UiState) -> io::Result<()> {
        (**self).render(state)
    }
}

/// Writes `state` as plain text, in the layout of the result panel.
pub fn write_text<W: Write>(out: &mut W, state: &UiState) -> io::Result<()> {
    writeln!(out, "[{}]", state.class.as_str())?;
    match &state.content {
        UiContent::Message(message) => writeln!(out, "{}", message)?,
        UiContent::Summary(summary) => {
            writeln!(out, "MD5: {}", summary.md5.as_deref().unwrap_or("-"))?;
            writeln!(out, "SHA256: {}", summary.sha256.as_deref().unwrap_or("-"))?;
            writeln!(out, "{}", summary.ratio_text())?;

            writeln!(out, "Detected")?;
            for verdict in &summary.detected {
                writeln!(out, "  {}: {}", verdict.engine, verdict.result.as_deref().unwrap_or("-"))?;
            }
            writeln!(out, "Undetected")?;
            for verdict in &summary.undetected {
                writeln!(out, "  {}: {}", verdict.engine, verdict.result.as_deref().unwrap_or("-"))?;
            }
        }
    }
    Ok(())
}

/// Human-readable output on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, state: &UiState) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        write_text(&mut stdout, state)?;
        stdout.flush()
    }
}

/// One JSON document per state on stdout, one per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, state: &UiState) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer(&mut stdout, state)?;
        writeln!(stdout)?;
        stdout.flush()
    }
}

/// Keeps every rendered state, for tests and embedding.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    states: Mutex<Vec<UiState>>,
}

impl RecordingRenderer {
    pub fn new() -> RecordingRenderer {
        RecordingRenderer::default()
    }

    pub fn states(&self) -> Vec<UiState> {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<UiState> {
        self.states().pop()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, state: &UiState) -> io::Result<()> {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{AnalysisAttributes, AnalysisResponse, EngineReport, EngineResult};
    use crate::ui::{reduce, UiEvent};

    fn render_to_string(state: &UiState) -> String {
        let mut out = Vec::new();
        write_text(&mut out, state).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn summary_layout() {
        let analysis = AnalysisResponse::new(Some(
            AnalysisAttributes::new("completed")
                .with_hashes("abc", "def")
                .with_results(
                    EngineReport::new()
                        .with("EngineA", EngineResult::new("malicious", Some("Trojan")))
                        .with("EngineB", EngineResult::new("undetected", Some("clean")))
                        .with("EngineC", EngineResult::new("undetected", None)),
                ),
        ));
        let text = render_to_string(&reduce(UiEvent::Analysis(&analysis)));

        assert_eq!(
            text,
            "[malicious]\n\
             MD5: abc\n\
             SHA256: def\n\
             1 out of 3 engines detected this as malicious.\n\
             Detected\n  EngineA: Trojan\n\
             Undetected\n  EngineB: clean\n  EngineC: -\n"
        );
    }

    #[test]
    fn message_layout() {
        let text = render_to_string(&reduce(UiEvent::Submitted));
        assert_eq!(text, "[analyzing]\nAnalyzing...\n");
    }

    #[test]
    fn recording_keeps_order() {
        let renderer = RecordingRenderer::new();
        renderer.render(&reduce(UiEvent::Submitted)).unwrap();
        renderer
            .render(&reduce(UiEvent::Analysis(&AnalysisResponse::new(None))))
            .unwrap();

        let states = renderer.states();
        assert_eq!(states.len(), 2);
        assert!(renderer.last().unwrap().is_error());
    }
}
