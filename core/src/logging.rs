use log::Level;
use serde_json::Value;

/// Emit one structured diagnostic event through the `log` facade.
///
/// `module` becomes the log target so events can be filtered per subsystem
/// (`dx.dispatch`, `dx.interpret`, `dx.adapter`).
pub fn log_event(
    level: Level,
    code: Option<&str>,
    module: &str,
    message: &str,
    explain: Option<&str>,
    data: Option<Value>,
) {
    if !log::log_enabled!(target: module, level) {
        return;
    }
    let line = render_event(code, message, explain, data.as_ref());
    log::log!(target: module, level, "{line}");
}

pub fn render_event(
    code: Option<&str>,
    message: &str,
    explain: Option<&str>,
    data: Option<&Value>,
) -> String {
    let mut line = String::new();
    if let Some(code) = code {
        line.push('[');
        line.push_str(code);
        line.push_str("] ");
    }
    line.push_str(message);
    if let Some(explain) = explain {
        line.push_str(" (");
        line.push_str(explain);
        line.push(')');
    }
    if let Some(data) = data {
        line.push(' ');
        line.push_str(&data.to_string());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_includes_all_parts() {
        let line = render_event(
            Some("DX-0201"),
            "AI provider invocation failed",
            Some("Falling back to rules"),
            Some(&json!({ "provider": "qwen" })),
        );
        assert_eq!(
            line,
            r#"[DX-0201] AI provider invocation failed (Falling back to rules) {"provider":"qwen"}"#
        );
    }

    #[test]
    fn render_skips_missing_parts() {
        assert_eq!(render_event(None, "plain", None, None), "plain");
    }
}
