//! # Page Rendering
//!
//! HTML for the transcription form. Deliberately dependency-free string
//! assembly: one page, no client-side state, everything escaped before
//! interpolation. The page round-trips the submitted selections so a POST
//! renders with the same method/variant/model the user chose.

use crate::transcription::cloud::CLOUD_MODELS;
use crate::transcription::{BackendKind, ModelSize};

/// Everything the form page needs to render.
pub struct PageView {
    pub transcription: Option<String>,
    pub selected_method: BackendKind,
    pub selected_local_model: String,
    pub selected_cloud_model: String,
    pub default_cloud_model: String,
    pub cloud_available: bool,
}

impl PageView {
    /// The empty form with process defaults, used for GET.
    pub fn with_defaults(
        default_local_model: String,
        default_cloud_model: String,
        cloud_available: bool,
    ) -> Self {
        Self {
            transcription: None,
            selected_method: BackendKind::Local,
            selected_local_model: default_local_model,
            selected_cloud_model: default_cloud_model.clone(),
            default_cloud_model,
            cloud_available,
        }
    }
}

/// Escape text for safe interpolation into HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn selected_attr(this: &str, selected: &str) -> &'static str {
    if this == selected {
        " selected"
    } else {
        ""
    }
}

fn options(names: impl IntoIterator<Item = String>, selected: &str) -> String {
    names
        .into_iter()
        .map(|name| {
            format!(
                "<option value=\"{0}\"{1}>{0}</option>",
                escape_html(&name),
                selected_attr(&name, selected)
            )
        })
        .collect()
}

pub fn index_page(view: &PageView) -> String {
    let local_options = options(
        ModelSize::ALL.iter().map(|s| s.to_string()),
        &view.selected_local_model,
    );
    let cloud_options = options(
        CLOUD_MODELS.iter().map(|s| s.to_string()),
        &view.selected_cloud_model,
    );
    let settings_options = options(
        CLOUD_MODELS.iter().map(|s| s.to_string()),
        &view.default_cloud_model,
    );

    let method_local = selected_attr("local", view.selected_method.as_str());
    let method_cloud = selected_attr("cloud", view.selected_method.as_str());

    let cloud_note = if view.cloud_available {
        String::new()
    } else {
        "<p class=\"note\">Cloud transcription is unavailable: no API key configured.</p>"
            .to_string()
    };

    let result_block = match &view.transcription {
        Some(text) => format!(
            "<section class=\"result\"><h2>Result</h2><p>{}</p></section>",
            escape_html(text)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Whisper Gateway</title>
<style>
body {{ font-family: sans-serif; max-width: 40rem; margin: 2rem auto; }}
.note {{ color: #a00; }}
.result {{ border: 1px solid #ccc; padding: 1rem; margin-top: 1rem; }}
fieldset {{ margin-bottom: 1rem; }}
</style>
</head>
<body>
<h1>Speech-to-Text</h1>
{cloud_note}
<form method="post" action="/" enctype="multipart/form-data">
  <fieldset>
    <legend>Backend</legend>
    <select name="transcription_method">
      <option value="local"{method_local}>Local model</option>
      <option value="cloud"{method_cloud}>OpenAI API</option>
    </select>
  </fieldset>
  <fieldset>
    <legend>Local model size</legend>
    <select name="local_model_size">{local_options}</select>
  </fieldset>
  <fieldset>
    <legend>Cloud model</legend>
    <select name="cloud_model">{cloud_options}</select>
  </fieldset>
  <fieldset>
    <legend>Audio file</legend>
    <input type="file" name="audio_file" accept="audio/*">
  </fieldset>
  <button type="submit">Transcribe</button>
</form>
{result_block}
<form method="post" action="/" enctype="multipart/form-data">
  <fieldset>
    <legend>Settings</legend>
    <input type="hidden" name="action" value="save_settings">
    <label>Default API model
      <select name="api_model">{settings_options}</select>
    </label>
    <button type="submit">Save settings</button>
  </fieldset>
</form>
</body>
</html>
"#
    )
}
