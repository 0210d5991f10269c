use crate::frequency::Frequency;
use crate::models::{Dashboard, Habit, LogId, Milestone, MilestoneKind};
use chrono::NaiveDate;
use std::fmt::Write;

/// Everything the dashboard page needs besides the materialized logs.
pub struct DashboardPage<'a> {
    pub username: &'a str,
    pub score: u64,
    pub dashboard: &'a Dashboard,
    pub habits: &'a [Habit],
    pub milestones: &'a [Milestone],
    pub notices: &'a [String],
    /// Checked log whose milestone update failed and can be retried.
    pub retry: Option<LogId>,
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            other => out.push(other),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    LAYOUT_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{BODY}}", body)
}

fn notices_html(notices: &[String]) -> String {
    notices
        .iter()
        .map(|notice| format!(r#"<p class="notice">{}</p>"#, escape(notice)))
        .collect()
}

pub fn render_index(username: Option<&str>) -> String {
    let body = match username {
        Some(name) => format!(
            r#"<h1>Hello {}!</h1>
<p class="subtitle">Ready to keep the streak going?</p>
<p><a class="button" href="/dashboard">Open dashboard</a> <a href="/logout">Log out</a></p>"#,
            escape(name)
        ),
        None => r#"<h1>Hello Stranger!</h1>
<p class="subtitle">Track your habits one day at a time.</p>
<p><a class="button" href="/login">Log in</a> <a href="/signup">Sign up</a></p>"#
            .to_string(),
    };
    page("Habit Tracker", &body)
}

fn credentials_form(action: &str, button: &str) -> String {
    format!(
        r#"<form method="post" action="{action}" class="stack">
  <input name="username" placeholder="Username" autocomplete="username" />
  <input name="password" type="password" placeholder="Password" />
  <button type="submit">{button}</button>
</form>"#
    )
}

pub fn render_signup(notices: &[String]) -> String {
    let body = format!(
        "<h1>Sign up</h1>{}{}<p>Already registered? <a href=\"/login\">Log in</a></p>",
        notices_html(notices),
        credentials_form("/signup", "Create account"),
    );
    page("Sign up", &body)
}

pub fn render_login(notices: &[String]) -> String {
    let body = format!(
        "<h1>Log in</h1>{}{}<p>New here? <a href=\"/signup\">Sign up</a></p>",
        notices_html(notices),
        credentials_form("/login", "Log in"),
    );
    page("Log in", &body)
}

fn frequency_options(selected: Frequency) -> String {
    [Frequency::Daily, Frequency::Weekly, Frequency::Monthly]
        .iter()
        .map(|f| {
            let attr = if *f == selected { " selected" } else { "" };
            format!(r#"<option value="{f}"{attr}>{f}</option>"#)
        })
        .collect()
}

fn milestone_html(milestone: &Milestone) -> String {
    let mut html = format!(
        r#"<li class="{}">{}"#,
        if milestone.completed { "done" } else { "open" },
        escape(&milestone.text)
    );
    if let Some(deadline) = milestone.deadline {
        let _ = write!(html, r#" <span class="muted">by {deadline}</span>"#);
    }
    if milestone.kind == MilestoneKind::Deadline && !milestone.completed {
        let _ = write!(
            html,
            r#" <form class="inline" method="post" action="/milestone/{}/complete"><button type="submit">Done</button></form>"#,
            milestone.id
        );
    }
    html.push_str("</li>");
    html
}

fn habit_card(habit: &Habit, milestones: &[Milestone]) -> String {
    let id = habit.id;
    let archive_action = if habit.active {
        r#"<button name="archive" value="archive">Archive</button>"#
    } else {
        r#"<button name="unarchive" value="unarchive">Unarchive</button>"#
    };
    let list: String = milestones
        .iter()
        .filter(|m| m.habit_id == id)
        .map(milestone_html)
        .collect();

    format!(
        r#"<details class="habit">
  <summary>{title} <span class="muted">{frequency}{archived}</span></summary>
  <form method="post" action="/habit/{id}/edit" class="stack">
    <input name="title" value="{title}" />
    <input name="description" value="{description}" />
    <select name="frequency">{options}</select>
    <button type="submit">Save</button>
  </form>
  <form method="post" action="/habit/{id}/edit" class="row">
    {archive_action}
    <button name="delete" value="delete" class="danger">Delete</button>
  </form>
  <ul class="milestones">{list}</ul>
  <form method="post" action="/dashboard/add_milestones" class="stack">
    <input type="hidden" name="habit_id" value="{id}" />
    <input name="title" placeholder="Milestone" />
    <input name="deadline" type="date" />
    <input name="num_milestones" value="1" />
    <input name="delta" value="0" />
    <button type="submit">Add milestones</button>
  </form>
</details>"#,
        title = escape(&habit.title),
        description = escape(&habit.description),
        frequency = habit.frequency,
        archived = if habit.active { "" } else { " (archived)" },
        options = frequency_options(habit.frequency),
    )
}

pub fn render_dashboard(view: &DashboardPage<'_>) -> String {
    let dashboard = view.dashboard;
    let date = dashboard.date;

    let rows: String = dashboard
        .entries
        .iter()
        .map(|entry| {
            let retry = if entry.log.status && view.retry == Some(entry.log.id) {
                format!(
                    r#" <form class="inline" method="post" action="/log/{}/toggle"><input type="hidden" name="status" value="true" /><button type="submit">Update milestones</button></form>"#,
                    entry.log.id
                )
            } else {
                String::new()
            };
            format!(
                r#"<li class="{state}">
  <form class="inline" method="post" action="/log/{log}/toggle"><input type="hidden" name="status" value="{target}" /><button type="submit">{mark}</button></form>
  <strong>{title}</strong> <span class="muted">{description}</span>{retry}
</li>"#,
                state = if entry.log.status { "done" } else { "open" },
                log = entry.log.id,
                target = !entry.log.status,
                mark = if entry.log.status { "&#10003;" } else { "&#9675;" },
                title = escape(&entry.habit.title),
                description = escape(&entry.habit.description),
            )
        })
        .collect();

    let cards: String = view
        .habits
        .iter()
        .map(|habit| habit_card(habit, view.milestones))
        .collect();

    let body = DASHBOARD_HTML
        .replace("{{NOTICES}}", &notices_html(view.notices))
        .replace("{{USER}}", &escape(view.username))
        .replace("{{SCORE}}", &view.score.to_string())
        .replace("{{DATE}}", &date.to_string())
        .replace("{{PREV}}", &shift_day(date, false).to_string())
        .replace("{{NEXT}}", &shift_day(date, true).to_string())
        .replace("{{COMPLETED}}", &dashboard.completed.to_string())
        .replace("{{TODO}}", &dashboard.todo.to_string())
        .replace("{{TOTAL}}", &dashboard.total.to_string())
        .replace("{{ROWS}}", &rows)
        .replace("{{HABITS}}", &cards)
        .replace("{{FREQUENCIES}}", &frequency_options(Frequency::Daily));
    page(&format!("Dashboard {date}"), &body)
}

/// The next or previous day, staying put at the ends of the calendar.
pub fn shift_day(date: NaiveDate, forward: bool) -> NaiveDate {
    let shifted = if forward { date.succ_opt() } else { date.pred_opt() };
    shifted.unwrap_or(date)
}

pub fn date_path(date: NaiveDate) -> String {
    format!("/dashboard/{date}")
}

const DASHBOARD_HTML: &str = r#"<header>
  <h1>{{USER}}'s habits</h1>
  <p class="subtitle">Score: {{SCORE}} &middot; <a href="/logout">Log out</a></p>
</header>
{{NOTICES}}
<form method="post" action="/dashboard/{{DATE}}" class="row nav">
  <button name="increment" value="yesterday">&larr; {{PREV}}</button>
  <span class="date">{{DATE}}</span>
  <button name="increment" value="tomorrow">{{NEXT}} &rarr;</button>
</form>
<section class="panel">
  <div class="stat"><span class="label">Completed</span><span class="value">{{COMPLETED}}</span></div>
  <div class="stat"><span class="label">To do</span><span class="value">{{TODO}}</span></div>
  <div class="stat"><span class="label">Total</span><span class="value">{{TOTAL}}</span></div>
</section>
<ul class="logs">{{ROWS}}</ul>
<section>
  <h2>New habit</h2>
  <form method="post" action="/add_habit" class="stack">
    <input name="title" placeholder="Title" />
    <input name="description" placeholder="Description" />
    <select name="frequency">{{FREQUENCIES}}</select>
    <input name="milestone" placeholder="First milestone (optional)" />
    <input name="deadline" type="date" />
    <button type="submit">Add habit</button>
  </form>
</section>
<section>
  <h2>Your habits</h2>
  {{HABITS}}
</section>"#;

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(860px, 100%);
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 24px;
    }

    h1 {
      font-family: "Georgia", serif;
      margin: 0;
    }

    .subtitle,
    .muted {
      color: #5f5c57;
    }

    .notice {
      background: #fff1e8;
      border-left: 4px solid var(--accent);
      padding: 10px 14px;
      border-radius: 10px;
      margin: 0;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(140px, 1fr));
      gap: 12px;
    }

    .stat {
      display: grid;
      gap: 4px;
      padding: 14px;
      border-radius: 16px;
      background: #fff;
    }

    .value {
      font-size: 1.6rem;
      font-weight: 600;
    }

    .stack {
      display: grid;
      gap: 8px;
    }

    .row {
      display: flex;
      gap: 8px;
      align-items: center;
    }

    .inline {
      display: inline;
    }

    ul {
      list-style: none;
      padding: 0;
      display: grid;
      gap: 8px;
    }

    li.done strong,
    li.done {
      color: var(--accent-2);
    }

    button,
    .button {
      border: none;
      border-radius: 12px;
      padding: 8px 14px;
      background: var(--accent-2);
      color: #fff;
      cursor: pointer;
      text-decoration: none;
    }

    button.danger {
      background: var(--accent);
    }

    input,
    select {
      padding: 8px 10px;
      border-radius: 10px;
      border: 1px solid #d8cfc2;
    }
  </style>
</head>
<body>
  <main class="app">
{{BODY}}
  </main>
</body>
</html>
"#;
