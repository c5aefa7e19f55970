//! Shared email layout and HTML escaping.

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Page heading block: a title and a muted sub-line.
pub fn heading(title: &str, subline: &str) -> String {
    format!(
        r#"<div style="margin-bottom: 40px; border-bottom: 2px solid #000; padding-bottom: 20px;">
  <h1 style="margin: 0; font-size: 24px; text-transform: uppercase; letter-spacing: 1px;">{title}</h1>
  <p style="margin: 5px 0 0; color: #666; font-size: 14px;">{subline}</p>
</div>"#
    )
}

/// Greeting paragraph. `body` is inserted as-is.
pub fn greeting(name: &str, body: &str) -> String {
    format!(
        r#"<p style="font-size: 16px; line-height: 1.5; margin-bottom: 30px;">
  Hi {},<br><br>
  {body}
</p>"#,
        escape(name)
    )
}

/// Wraps `content` in the document shell with the store footer.
pub fn wrap(content: &str, store_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <style>
      body {{ font-family: 'Helvetica Neue', Helvetica, Arial, sans-serif; color: #000; -webkit-font-smoothing: antialiased; }}
      .mono {{ font-family: 'Courier New', Courier, monospace; letter-spacing: -0.5px; }}
    </style>
  </head>
  <body style="background-color: #f4f4f4; margin: 0; padding: 40px 0;">
    <div style="max-width: 600px; margin: 0 auto; background-color: #ffffff; padding: 40px; border: 1px solid #e5e5e5;">
{content}
      <div style="margin-top: 40px; border-top: 1px solid #e5e5e5; padding-top: 20px; font-size: 12px; color: #888; text-align: center;">
        <p style="margin-top: 10px;">[ {} ]</p>
      </div>
    </div>
  </body>
</html>
"#,
        escape(&store_name.to_uppercase())
    )
}
