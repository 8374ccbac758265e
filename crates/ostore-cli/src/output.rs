use colored::Colorize;
use ostore_types::{ApiObject, ApiResponse};

use crate::cli::OutputFormat;

pub fn print_response(format: &OutputFormat, response: &ApiResponse) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(response)?),
        OutputFormat::Text => print!("{}", render_text(response)),
    }
    Ok(())
}

pub fn print_error(format: &OutputFormat, error: &anyhow::Error) {
    match format {
        OutputFormat::Json => {
            let response = ApiResponse::error(format!("{error:#}"));
            match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{json}"),
                Err(_) => eprintln!("{error:#}"),
            }
        }
        OutputFormat::Text => eprintln!("{} {error:#}", "error:".red().bold()),
    }
}

fn render_text(response: &ApiResponse) -> String {
    let mut out = String::new();
    if let Some(message) = &response.message {
        out.push_str(&format!("{} {}\n", "✓".green().bold(), message));
    }
    match &response.objects {
        Some(objects) if objects.is_empty() => out.push_str("No objects.\n"),
        Some(objects) => {
            for object in objects {
                out.push_str(&render_object(object));
            }
        }
        None if response.message.is_none() => {
            out.push_str(&format!("{} done\n", "✓".green().bold()))
        }
        None => {}
    }
    out
}

fn render_object(object: &ApiObject) -> String {
    let mut out = format!("{}\n", object.uid().unwrap_or("(unsaved)").yellow().bold());
    for (key, value) in &object.0 {
        if key == "_uid" {
            continue;
        }
        let shown = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let key = if key.starts_with('_') {
            key.dimmed().to_string()
        } else {
            key.cyan().to_string()
        };
        out.push_str(&format!("  {key}: {shown}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn renders_objects() {
        plain();
        let object: ApiObject =
            serde_json::from_value(json!({"_uid": "u1", "title": "hi", "n": 2})).unwrap();
        let text = render_text(&ApiResponse::ok().with_objects(vec![object]));
        assert!(text.starts_with("u1\n"));
        assert!(text.contains("  title: hi\n"));
        assert!(text.contains("  n: 2\n"));
        assert!(!text.contains("_uid"));
    }

    #[test]
    fn renders_empty_results() {
        plain();
        let text = render_text(&ApiResponse::ok().with_objects(Vec::new()));
        assert_eq!(text, "No objects.\n");
    }

    #[test]
    fn renders_bare_success() {
        plain();
        assert!(render_text(&ApiResponse::ok()).contains("done"));
    }
}
