//! Server-rendered HTML. Every interpolated value goes through `escape`.

use std::fmt::Write as _;

use super::i18n::Messages;
use crate::model::Project;

pub fn escape(s: &str) -> String {
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

fn layout(locale: &str, msgs: &Messages, title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"{lang}\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body style=\"max-width: 800px; margin: 2rem auto; font-family: system-ui, sans-serif\">\n\
         <nav><a href=\"/{lang}\">{home}</a> | <a href=\"/{lang}/projects\">{projects}</a></nav>\n\
         {body}\n</body>\n</html>\n",
        lang = escape(locale),
        title = escape(title),
        home = escape(msgs.t("nav.home")),
        projects = escape(msgs.t("nav.projects")),
        body = body,
    )
}

pub fn home(locale: &str, msgs: &Messages) -> String {
    let body = format!(
        "<main><h1>{}</h1><p>{}</p><ul><li><a href=\"/{}/projects\">{}</a></li></ul></main>",
        escape(msgs.t("app.title")),
        escape(msgs.t("app.intro")),
        escape(locale),
        escape(msgs.t("nav.projects")),
    );
    layout(locale, msgs, msgs.t("app.title"), &body)
}

pub fn project_list(locale: &str, msgs: &Messages, projects: &[Project]) -> String {
    let loc = escape(locale);
    let mut body = format!(
        "<main><h1>{}</h1><p><a href=\"/{loc}/projects/new\">{}</a></p>",
        escape(msgs.t("projects.title")),
        escape(msgs.t("projects.create")),
    );
    if projects.is_empty() {
        let _ = write!(body, "<p>{}</p>", escape(msgs.t("projects.empty")));
    } else {
        body.push_str("<ul>");
        for p in projects {
            let _ = write!(
                body,
                "<li><a href=\"/{loc}/projects/{}\">{}</a></li>",
                escape(&urlencoding::encode(&p.id)),
                escape(&p.name),
            );
        }
        body.push_str("</ul>");
    }
    body.push_str("</main>");
    layout(locale, msgs, msgs.t("projects.title"), &body)
}

pub fn new_project(locale: &str, msgs: &Messages) -> String {
    let body = format!(
        "<main><h1>{title}</h1>\
         <form method=\"post\" action=\"/{loc}/projects\" style=\"display: grid; gap: 0.5rem\">\
         <input name=\"name\" placeholder=\"{name}\" required>\
         <textarea name=\"description\" placeholder=\"{desc}\"></textarea>\
         <button type=\"submit\">{save}</button></form></main>",
        title = escape(msgs.t("projects.newTitle")),
        loc = escape(locale),
        name = escape(msgs.t("projects.name")),
        desc = escape(msgs.t("projects.description")),
        save = escape(msgs.t("projects.save")),
    );
    layout(locale, msgs, msgs.t("projects.newTitle"), &body)
}

pub fn project_detail(locale: &str, msgs: &Messages, p: &Project) -> String {
    let loc = escape(locale);
    let mut body = format!("<div><h2>{}</h2>", escape(&p.name));
    if let Some(d) = &p.description {
        let _ = write!(body, "<p>{}</p>", escape(d));
    }
    if let Some(c) = &p.created_at {
        let _ = write!(body, "<p><small>{}: {}</small></p>", escape(msgs.t("projects.created")), escape(c));
    }
    let _ = write!(
        body,
        "<form method=\"post\" action=\"/{loc}/projects/{id}/delete\"><button>{del}</button></form>\
         <p><a href=\"/{loc}/projects\">{back}</a></p></div>",
        id = escape(&urlencoding::encode(&p.id)),
        del = escape(msgs.t("projects.delete")),
        back = escape(msgs.t("projects.back")),
    );
    layout(locale, msgs, &p.name, &body)
}

pub fn not_found(locale: &str, msgs: &Messages) -> String {
    let text = msgs.t("errors.notFound");
    layout(locale, msgs, text, &format!("<div>{}</div>", escape(text)))
}

pub fn error(locale: &str, msgs: &Messages, key: &str) -> String {
    let text = msgs.t(key);
    layout(locale, msgs, text, &format!("<div role=\"alert\">{}</div>", escape(text)))
}
