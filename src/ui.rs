use crate::models::TodayResponse;

/// Name of the meta tag that carries the anti-forgery token.
pub const CSRF_META_NAME: &str = "csrf-token";

pub fn render_index(today: &TodayResponse, csrf_token: &str) -> String {
    let items: String = today
        .habits
        .iter()
        .map(|habit| {
            let label = match &habit.emoji {
                Some(emoji) => format!("{} {}", escape(emoji), escape(&habit.name)),
                None => escape(&habit.name),
            };
            format!(
                r#"      <li class="habit{done}" data-habit-id="{id}" data-date="{date}" aria-pressed="{pressed}">{label}</li>
"#,
                done = if habit.completed { " completed" } else { "" },
                id = habit.id,
                date = today.date,
                pressed = habit.completed,
            )
        })
        .collect();

    INDEX_HTML
        .replace("{{CSRF_META}}", CSRF_META_NAME)
        .replace("{{CSRF}}", &escape(csrf_token))
        .replace("{{DATE}}", &today.date.to_string())
        .replace("{{RATE}}", &today.today_rate.to_string())
        .replace("{{HABITS}}", &items)
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <meta name="{{CSRF_META}}" content="{{CSRF}}" />
  <title>Habit Tracker</title>
  <style>
    body { font-family: "Trebuchet MS", sans-serif; margin: 32px; color: #2b2a28; }
    .habit { padding: 8px 0; }
    .habit.completed { color: #2d7a4b; text-decoration: line-through; }
  </style>
</head>
<body>
  <main>
    <h1>Today</h1>
    <p><span id="date">{{DATE}}</span> &middot; <span id="rate">{{RATE}}</span>% done</p>
    <ul id="habits">
{{HABITS}}    </ul>
  </main>
</body>
</html>
"#;
