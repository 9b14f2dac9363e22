//! HTML rendering of the designer page. Output is a pure function of [`Presentation`].

use std::fmt::Write;

/// Everything the page needs to draw itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Presentation {
    pub preview_url: Option<String>,
    pub prompt: String,
    pub output_image: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum UploadPane<'a> {
    Empty,
    Previewing(&'a str),
}

#[derive(Debug, PartialEq)]
pub enum OutputPane<'a> {
    Placeholder,
    Result(&'a str),
}

impl Presentation {
    pub fn upload_pane(&self) -> UploadPane<'_> {
        match &self.preview_url {
            Some(url) => UploadPane::Previewing(url),
            None => UploadPane::Empty,
        }
    }

    pub fn output_pane(&self) -> OutputPane<'_> {
        match &self.output_image {
            Some(url) => OutputPane::Result(url),
            None => OutputPane::Placeholder,
        }
    }

    /// The busy overlay sits on top of whatever the output pane shows.
    pub fn shows_spinner(&self) -> bool { self.is_loading }

    pub fn generate_disabled(&self) -> bool { self.is_loading }

    pub fn generate_label(&self) -> &'static str {
        if self.is_loading { "Generating..." } else { "Generate New Design" }
    }
}

const UPLOAD_ICON: &str = r#"<svg class="upload-icon" stroke="currentColor" fill="none" viewBox="0 0 48 48" aria-hidden="true"><path d="M28 8H12a4 4 0 00-4 4v20m32-12v8m0 0v8a4 4 0 01-4 4H12a4 4 0 01-4-4v-4m32-4l-3.172-3.172a4 4 0 00-5.656 0L28 28M8 32l9.172-9.172a4 4 0 015.656 0L28 28m0 0l4 4m4-24h8m-4-4v8" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" /></svg>"#;

const LOADING_SPINNER: &str = r#"<div id="spinner" class="spinner-overlay"><div class="spinner"></div></div>"#;

// Prompt edits are chained to reach the server in keystroke order; `keepalive`
// lets the last one outlive a navigation. While loading, the page polls
// `/api/state` and patches the output pane in place.
const PAGE_SCRIPT: &str = r#"<script>
(function () {
  var prompt = document.getElementById('prompt');
  var queue = Promise.resolve();
  prompt.addEventListener('input', function () {
    var body = new URLSearchParams({ prompt: prompt.value });
    queue = queue.then(function () {
      return fetch('/prompt', { method: 'POST', keepalive: true, body: body }).catch(function () {});
    });
  });

  function apply(state) {
    var output = document.getElementById('output');
    var spinner = document.getElementById('spinner');
    if (!state.isLoading && spinner) spinner.remove();
    var img = output.querySelector('img.result');
    var placeholder = output.querySelector('.placeholder');
    if (state.outputImage) {
      if (!img) {
        img = document.createElement('img');
        img.className = 'result';
        img.alt = 'Generated design';
        output.appendChild(img);
      }
      img.src = state.outputImage;
      if (placeholder) placeholder.hidden = true;
    } else {
      if (img) img.remove();
      if (placeholder) placeholder.hidden = false;
    }
    var button = document.getElementById('generate');
    button.disabled = state.isLoading;
    button.textContent = state.isLoading ? 'Generating...' : 'Generate New Design';
    var error = document.getElementById('error');
    error.textContent = state.error || '';
    error.hidden = !state.error;
  }

  function poll() {
    fetch('/api/state')
      .then(function (r) { return r.json(); })
      .then(function (state) {
        apply(state);
        if (state.isLoading) setTimeout(poll, 1000);
      })
      .catch(function () { setTimeout(poll, 2000); });
  }

  if (document.body.dataset.loading === 'true') setTimeout(poll, 1000);
})();
</script>"#;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

pub fn render_page(p: &Presentation) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>AI Interior Designer</title>\n<link rel=\"stylesheet\" href=\"/assets/styles.css\">\n</head>\n");
    let _ = writeln!(html, "<body data-loading=\"{}\">", p.is_loading);
    html.push_str("<main class=\"glass-card\">\n");
    html.push_str("<header><h1>AI Interior Designer</h1><p class=\"tagline\">Transform your room with the power of AI.</p></header>\n");
    html.push_str("<div class=\"panes\">\n");

    // 1. upload
    html.push_str("<section class=\"input-pane\">\n<label class=\"step\">1. Upload Your Room</label>\n");
    html.push_str("<form class=\"drop-zone\" action=\"/image\" method=\"post\" enctype=\"multipart/form-data\">\n");
    match p.upload_pane() {
        UploadPane::Previewing(url) => {
            let _ = writeln!(html, "<img class=\"preview\" src=\"{}\" alt=\"Preview\">", escape_html(url));
        }
        UploadPane::Empty => {
            html.push_str(UPLOAD_ICON);
            html.push('\n');
        }
    }
    html.push_str("<label for=\"file-upload\" class=\"upload-link\"><span>Upload a file</span>");
    html.push_str("<input id=\"file-upload\" name=\"image\" type=\"file\" class=\"sr-only\" accept=\"image/*\" onchange=\"this.form.submit()\"></label>\n");
    html.push_str("<p class=\"hint\">PNG, JPG up to 10MB</p>\n</form>\n");

    // 2. prompt; the generate form owns the textarea so a click carries the latest text
    html.push_str("<form id=\"generate-form\" action=\"/generate\" method=\"post\">\n");
    html.push_str("<label for=\"prompt\" class=\"step\">2. Describe Your Style</label>\n");
    let _ = writeln!(
        html,
        "<textarea id=\"prompt\" name=\"prompt\" rows=\"4\" placeholder=\"e.g., A cozy, rustic living room with a stone fireplace and warm lighting.\">{}</textarea>",
        escape_html(&p.prompt)
    );
    html.push_str("</form>\n</section>\n");

    // 3. output
    html.push_str("<section class=\"output-pane\">\n<label class=\"step\">3. See the Magic</label>\n<div id=\"output\" class=\"output\">\n");
    if p.shows_spinner() {
        html.push_str(LOADING_SPINNER);
        html.push('\n');
    }
    match p.output_pane() {
        OutputPane::Result(url) => {
            let _ = writeln!(html, "<img class=\"result\" src=\"{}\" alt=\"Generated design\">", escape_html(url));
        }
        OutputPane::Placeholder => html.push_str("<p class=\"placeholder\">Your new room will appear here</p>\n"),
    }
    html.push_str("</div>\n</section>\n</div>\n");

    html.push_str("<div class=\"actions\">\n");
    let _ = writeln!(
        html,
        "<button id=\"generate\" type=\"submit\" form=\"generate-form\"{}>{}</button>",
        if p.generate_disabled() { " disabled" } else { "" },
        p.generate_label()
    );
    match &p.error {
        Some(error) => {
            let _ = writeln!(html, "<p id=\"error\" class=\"error\">{}</p>", escape_html(error));
        }
        None => html.push_str("<p id=\"error\" class=\"error\" hidden></p>\n"),
    }
    html.push_str("</div>\n</main>\n");
    html.push_str(PAGE_SCRIPT);
    html.push_str("\n</body>\n</html>\n");
    html
}
