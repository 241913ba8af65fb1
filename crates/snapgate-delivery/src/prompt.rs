//! Password prompt page shown in front of gated snapshots

use snapgate_core::SnapshotId;

/// HTML page asking a viewer for the snapshot password
///
/// The form posts `password` to `/s/{id}/gate`. `incorrect` adds a notice
/// after a failed attempt.
pub fn password_prompt(id: &SnapshotId, incorrect: bool) -> String {
    // Ids are URL-safe by construction, so they need no escaping here
    let notice = if incorrect {
        r#"<p class="error" role="alert">Incorrect password. Try again.</p>"#
    } else {
        ""
    };
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="robots" content="noindex">
<title>Protected snapshot</title>
<style>
body {{ font-family: system-ui, sans-serif; display: grid; place-items: center; min-height: 100vh; margin: 0; background: #f6f6f7; }}
form {{ background: #fff; padding: 2rem; border-radius: 8px; box-shadow: 0 1px 4px rgba(0,0,0,.1); min-width: 280px; }}
input, button {{ width: 100%; padding: .6rem; margin-top: .6rem; font-size: 1rem; box-sizing: border-box; }}
.error {{ color: #b00020; }}
</style>
</head>
<body>
<form method="post" action="/s/{id}/gate">
<h1>This snapshot is protected</h1>
{notice}
<label for="password">Password</label>
<input id="password" name="password" type="password" autocomplete="current-password" required autofocus>
<button type="submit">View snapshot</button>
</form>
</body>
</html>
"#
    )
}
