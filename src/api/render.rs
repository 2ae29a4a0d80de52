//! Server-side rendering of the chat page
//!
//! Each turn becomes a chat bubble whose text is rendered as markdown. Raw
//! HTML in turn text is escaped, never passed through.

use crate::conversation::{Speaker, Turn};
use crate::system_prompt::PageConfig;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use std::fmt::Write;

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Render markdown to HTML with embedded HTML neutralized and link or image
/// destinations limited to web, mail and relative targets
pub fn markdown_to_html(text: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        other => other,
    });
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Keep relative destinations and allowed schemes; blank everything else
fn safe_destination(dest: CowStr<'_>) -> CowStr<'_> {
    // Browsers skip whitespace and control characters inside a scheme
    let compact: String = dest
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();
    match compact.find([':', '/', '?', '#']) {
        Some(i) if compact[i..].starts_with(':') => {
            let scheme = compact[..i].to_ascii_lowercase();
            if ALLOWED_SCHEMES.contains(&scheme.as_str()) {
                dest
            } else {
                tracing::debug!(scheme = %scheme, "Dropping link destination");
                CowStr::Borrowed("")
            }
        }
        _ => dest,
    }
}

/// Escape text for use inside HTML element content or a quoted attribute
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn speaker_class(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::User => "user",
        Speaker::Assistant => "assistant",
    }
}

fn avatar(page: &PageConfig, speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::User => "🧑",
        Speaker::Assistant => page.icon,
    }
}

/// Render the full chat page
pub fn render_page(page: &PageConfig, turns: &[Turn], error: Option<&str>) -> String {
    let mut body = String::new();

    for turn in turns {
        let class = speaker_class(turn.speaker());
        // write! to a String cannot fail
        let _ = write!(
            body,
            "<div class=\"turn {class}\"><span class=\"avatar\">{avatar}</span>\
             <div class=\"bubble\">{content}</div></div>\n",
            avatar = avatar(page, turn.speaker()),
            content = markdown_to_html(turn.text()),
        );
    }

    let error_html = error.map_or_else(String::new, |message| {
        format!("<div class=\"error\" role=\"alert\">{}</div>\n", escape(message))
    });

    format!(
        "<!doctype html>
<html lang=\"en\">
<head>
<meta charset=\"utf-8\">
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">
<title>{title}</title>
<link rel=\"icon\" href=\"data:image/svg+xml,<svg xmlns=%22http://www.w3.org/2000/svg%22 viewBox=%220 0 100 100%22><text y=%22.9em%22 font-size=%2290%22>{icon}</text></svg>\">
<link rel=\"stylesheet\" href=\"/assets/style.css\">
</head>
<body>
<main class=\"centered\">
<h1>{icon} {title}</h1>
<p class=\"caption\">{caption}</p>
<section class=\"transcript\">
{body}</section>
{error_html}<form class=\"chat-input\" method=\"post\" action=\"/chat\">
<input type=\"text\" name=\"prompt\" placeholder=\"{placeholder}\" autocomplete=\"off\" autofocus required>
<button type=\"submit\">Send</button>
</form>
</main>
<script>window.scrollTo(0, document.body.scrollHeight);</script>
</body>
</html>
",
        title = escape(page.title),
        icon = page.icon,
        caption = escape(page.caption),
        placeholder = escape(page.input_placeholder),
    )
}
