//! Terminal rendering of controller messages
//!
//! Plain text by default, one JSON object per line with `--json`. Image data
//! URLs are only ever emitted in JSON mode.

use tryon_core::{CatalogState, ControllerMessage, NotifyLevel, OutfitSelector};

/// Renders controller messages for a terminal
#[derive(Clone, Copy, Debug)]
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print one message, if it has anything to show
    pub fn print(&self, msg: &ControllerMessage) {
        if let Some(line) = self.render(msg) {
            println!("{line}");
        }
    }

    /// Print the outcome of a backend health check
    pub fn print_health(&self, backend: &str, reachable: bool) {
        println!("{}", self.render_health(backend, reachable));
    }

    pub fn render_health(&self, backend: &str, reachable: bool) -> String {
        if self.json {
            return serde_json::json!({ "backend": backend, "reachable": reachable }).to_string();
        }
        if reachable {
            format!("{backend} is reachable")
        } else {
            format!("{backend} is not reachable")
        }
    }

    pub fn render(&self, msg: &ControllerMessage) -> Option<String> {
        if matches!(msg, ControllerMessage::Ack { .. }) {
            return None;
        }
        if self.json {
            return serde_json::to_string(msg).ok();
        }

        match msg {
            ControllerMessage::SessionInfo { session_id, backend } => {
                Some(format!("Session {session_id} ({backend})"))
            }
            ControllerMessage::Stage { stage } => Some(format!(
                "[{}/4] {}",
                stage.step_number(),
                stage.description()
            )),
            ControllerMessage::Quit { message } => message.clone(),
            ControllerMessage::Catalog { state } => render_catalog(state),
            ControllerMessage::OutfitSelected { outfit } => {
                Some(format!("Outfit: {} ({})", outfit.name, outfit.reference()))
            }
            ControllerMessage::PhotoCaptured {
                file_name,
                media_type,
                ignored_files,
                ..
            } => {
                let mut line = format!("Photo: {file_name} ({media_type})");
                if *ignored_files > 0 {
                    line.push_str(&format!(", {ignored_files} extra file(s) ignored"));
                }
                Some(line)
            }
            ControllerMessage::Progress {
                message,
                step,
                total,
            } => Some(format!("  {message} ({step}/{total})")),
            ControllerMessage::ResultReady {
                result_id,
                outfit_name,
                message,
                ..
            } => {
                let mut line = format!("Result ready: {result_id}");
                if let Some(name) = outfit_name {
                    line.push_str(&format!(" ({name})"));
                }
                if let Some(message) = message {
                    line.push_str(&format!("\n{message}"));
                }
                Some(line)
            }
            ControllerMessage::Exported { path } => Some(format!("Saved to {}", path.display())),
            ControllerMessage::ShareLink { url, message } => match message {
                Some(message) => Some(format!("Share: {url}\n{message}")),
                None => Some(format!("Share: {url}")),
            },
            ControllerMessage::Notify { level, message } => {
                Some(format!("{} {message}", level_tag(*level)))
            }
            ControllerMessage::Ack { .. } => None,
        }
    }
}

fn level_tag(level: NotifyLevel) -> &'static str {
    match level {
        NotifyLevel::Info => "[info]",
        NotifyLevel::Warning => "[warn]",
        NotifyLevel::Error => "[error]",
        NotifyLevel::Success => "[ok]",
    }
}

/// Catalog listing, numbered the way `--outfit N` resolves it
pub fn render_catalog(state: &CatalogState) -> Option<String> {
    match state {
        CatalogState::NotLoaded => None,
        CatalogState::Empty => Some("No outfits are available yet".to_string()),
        CatalogState::Failed(reason) => Some(format!("Catalog failed to load: {reason}")),
        CatalogState::Loaded(items) => {
            let lines: Vec<String> = items
                .iter()
                .zip(1u32..)
                .map(|(item, position)| {
                    format!(
                        "  #{:<3} {:<32} {}",
                        item.number.unwrap_or(position),
                        item.name,
                        item.id
                    )
                })
                .collect();
            Some(format!("{} outfit(s)\n{}", items.len(), lines.join("\n")))
        }
    }
}

/// `3` or `#3` picks by number, anything else by id
pub fn parse_selector(raw: &str) -> OutfitSelector {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    match digits.parse::<u32>() {
        Ok(n) => OutfitSelector::ByNumber(n),
        Err(_) => OutfitSelector::ById(tryon_core::OutfitId(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tryon_core::{ImageReference, OutfitId, OutfitItem, TryOnId, WorkflowStage};

    #[test]
    fn test_parse_selector() {
        assert_eq!(parse_selector("3"), OutfitSelector::ByNumber(3));
        assert_eq!(parse_selector(" #12 "), OutfitSelector::ByNumber(12));
        assert_eq!(
            parse_selector("raincoat"),
            OutfitSelector::ById(OutfitId("raincoat".to_string()))
        );
    }

    #[test]
    fn test_text_rendering() {
        let printer = Printer::new(false);
        assert_eq!(
            printer.render(&ControllerMessage::Stage {
                stage: WorkflowStage::Generating
            }),
            Some("[3/4] Creating your image...".to_string())
        );
        assert_eq!(
            printer.render(&ControllerMessage::ResultReady {
                result_id: TryOnId("abc".to_string()),
                outfit_name: Some("Raincoat".to_string()),
                before_preview: Some("data:image/png;base64,BBBB".to_string()),
                preview: "data:image/png;base64,AAAA".to_string(),
                message: Some("Try-on created".to_string()),
            }),
            Some("Result ready: abc (Raincoat)\nTry-on created".to_string())
        );
        assert_eq!(
            printer.render(&ControllerMessage::Ack {
                event_id: tryon_core::EventId("evt_1".to_string())
            }),
            None
        );
    }

    #[test]
    fn test_json_rendering() {
        let printer = Printer::new(true);
        let line = printer
            .render(&ControllerMessage::Notify {
                level: NotifyLevel::Warning,
                message: "careful".to_string(),
            })
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["Notify"]["message"], "careful");
    }

    #[test]
    fn test_standalone_commands_honor_json() {
        let printer = Printer::new(true);

        let health: serde_json::Value =
            serde_json::from_str(&printer.render_health("http://localhost:8001", false)).unwrap();
        assert_eq!(health["backend"], "http://localhost:8001");
        assert_eq!(health["reachable"], false);

        let share = printer
            .render(&ControllerMessage::ShareLink {
                url: "https://wa.me/?text=hola".to_string(),
                message: None,
            })
            .unwrap();
        let share: serde_json::Value = serde_json::from_str(&share).unwrap();
        assert_eq!(share["ShareLink"]["url"], "https://wa.me/?text=hola");

        let catalog = printer
            .render(&ControllerMessage::Catalog {
                state: CatalogState::Empty,
            })
            .unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&catalog).is_ok());

        let text = Printer::new(false);
        assert_eq!(
            text.render_health("http://localhost:8001", true),
            "http://localhost:8001 is reachable"
        );
        assert_eq!(
            text.render(&ControllerMessage::ShareLink {
                url: "https://wa.me/x".to_string(),
                message: Some("hola".to_string()),
            }),
            Some("Share: https://wa.me/x\nhola".to_string())
        );
    }

    #[test]
    fn test_catalog_rendering_numbers_unnumbered_items() {
        let state = CatalogState::Loaded(vec![
            OutfitItem {
                id: OutfitId("x1".to_string()),
                name: "Raincoat".to_string(),
                image: ImageReference::Url("/x1.png".to_string()),
                number: None,
            },
            OutfitItem {
                id: OutfitId("x2".to_string()),
                name: "Hoodie".to_string(),
                image: ImageReference::Url("/x2.png".to_string()),
                number: None,
            },
        ]);
        let text = render_catalog(&state).unwrap();
        assert!(text.starts_with("2 outfit(s)"));
        assert!(text.contains("#2"));
        assert!(text.contains("Hoodie"));
        assert_eq!(render_catalog(&CatalogState::NotLoaded), None);
    }
}
