//! Server-rendered HTML pages.

const SITE_TITLE: &str = "Secrets";

fn base_style() -> &'static str {
    r"
    * { box-sizing: border-box; }
    body { margin: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
           background: #e8eaf6; color: #1a1a2e; }
    .jumbotron { max-width: 720px; margin: 10vh auto; padding: 48px 32px; background: #fff;
                 border-radius: 12px; box-shadow: 0 8px 24px rgba(0,0,0,0.08); text-align: center; }
    .display-3 { font-size: 2.6rem; margin: 0 0 16px; }
    .lead { color: #555; margin: 0 0 24px; }
    .btn { display: inline-block; padding: 10px 22px; margin: 4px; border-radius: 6px; border: 0;
           font-size: 1rem; text-decoration: none; cursor: pointer; }
    .btn-light { background: #f1f1f1; color: #1a1a2e; }
    .btn-dark { background: #1a1a2e; color: #fff; }
    .btn-google { background: #db4437; color: #fff; }
    .form-group { margin: 12px 0; text-align: left; }
    .form-group label { display: block; margin-bottom: 4px; font-weight: 600; }
    .form-control { width: 100%; padding: 10px; border: 1px solid #ccc; border-radius: 6px; font-size: 1rem; }
    .secret-text { font-size: 1.3rem; margin: 12px 0; }
    .error { background: #fdecea; color: #b71c1c; padding: 10px; border-radius: 6px; margin-bottom: 16px; }
    .centered { text-align: center; }
    hr { border: 0; border-top: 1px solid #eee; margin: 24px 0; }
    "
}

/// Escape text for use in HTML element content and quoted attributes.
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<link rel="icon" href="/favicon.ico">
<link rel="stylesheet" href="/css/styles.css">
<style>{style}</style>
</head><body>
{body}
</body></html>"#,
        title = escape_html(title),
        style = base_style(),
    )
}

pub(crate) fn home() -> String {
    layout(
        SITE_TITLE,
        r#"<div class="jumbotron">
  <i class="fas fa-key fa-6x"></i>
  <h1 class="display-3">Secrets</h1>
  <p class="lead">Don't keep your secrets, share them anonymously!</p>
  <hr>
  <a class="btn btn-light" href="/register" role="button">Register</a>
  <a class="btn btn-dark" href="/login" role="button">Login</a>
</div>"#,
    )
}

fn google_button(google_enabled: bool, label: &str) -> String {
    if google_enabled {
        format!(
            r#"<hr>
  <a class="btn btn-google" href="/auth/google" role="button">{label}</a>"#
        )
    } else {
        String::new()
    }
}

pub(crate) fn register(google_enabled: bool) -> String {
    let google = google_button(google_enabled, "Sign Up with Google");
    layout(
        &format!("{SITE_TITLE} - Register"),
        &format!(
            r#"<div class="jumbotron">
  <h1 class="display-3">Register</h1>
  <form action="/register" method="POST">
    <div class="form-group">
      <label for="username">Email</label>
      <input type="text" class="form-control" id="username" name="username" required autocomplete="username">
    </div>
    <div class="form-group">
      <label for="password">Password</label>
      <input type="password" class="form-control" id="password" name="password" required autocomplete="new-password">
    </div>
    <button type="submit" class="btn btn-dark">Register</button>
  </form>
  {google}
</div>"#
        ),
    )
}

pub(crate) fn login(google_enabled: bool, error: Option<&str>) -> String {
    let error_html = error
        .map(|e| format!(r#"<div class="error">{}</div>"#, escape_html(e)))
        .unwrap_or_default();
    let google = google_button(google_enabled, "Sign In with Google");
    layout(
        &format!("{SITE_TITLE} - Login"),
        &format!(
            r#"<div class="jumbotron">
  <h1 class="display-3">Login</h1>
  {error_html}
  <form action="/login" method="POST">
    <div class="form-group">
      <label for="username">Email</label>
      <input type="text" class="form-control" id="username" name="username" required autocomplete="username">
    </div>
    <div class="form-group">
      <label for="password">Password</label>
      <input type="password" class="form-control" id="password" name="password" required autocomplete="current-password">
    </div>
    <button type="submit" class="btn btn-dark">Login</button>
  </form>
  {google}
</div>"#
        ),
    )
}

pub(crate) fn secrets<'a>(secrets: impl IntoIterator<Item = &'a str>) -> String {
    let items: String = secrets
        .into_iter()
        .map(|secret| format!(r#"  <p class="secret-text">{}</p>"#, escape_html(secret)))
        .collect::<Vec<_>>()
        .join("\n");
    layout(
        SITE_TITLE,
        &format!(
            r#"<div class="jumbotron centered">
  <i class="fas fa-key fa-6x"></i>
  <h1 class="display-3">You've Discovered My Secret!</h1>
{items}
  <hr>
  <a class="btn btn-light" href="/logout" role="button">Log Out</a>
  <a class="btn btn-dark" href="/submit" role="button">Submit a Secret</a>
</div>"#
        ),
    )
}

pub(crate) fn submit() -> String {
    layout(
        &format!("{SITE_TITLE} - Submit"),
        r#"<div class="jumbotron centered">
  <i class="fas fa-key fa-6x"></i>
  <h1 class="display-3">Secrets</h1>
  <p class="secret-text">Don't keep your secrets, share them anonymously!</p>
  <form action="/submit" method="POST">
    <div class="form-group">
      <input type="text" class="form-control" name="secret" placeholder="What's your secret?" required>
    </div>
    <button type="submit" class="btn btn-dark">Submit</button>
  </form>
</div>"#,
    )
}

pub(crate) fn error_page(message: &str) -> String {
    layout(
        &format!("{SITE_TITLE} - Error"),
        &format!(
            r#"<div class="jumbotron centered">
  <h1 class="display-3">Something went wrong</h1>
  <p class="lead">{}</p>
  <a class="btn btn-light" href="/" role="button">Home</a>
</div>"#,
            escape_html(message)
        ),
    )
}
