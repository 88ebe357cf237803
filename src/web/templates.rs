//! HTML pages, compiled once at startup from the embedded `templates/`
//! directory.

use crate::error::{ErrorKind, Result};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use exn::{OptionExt, ResultExt};
use rust_embed::RustEmbed;
use serde::Serialize;
use upon::{Engine, Template};

#[derive(RustEmbed)]
#[folder = "templates/"]
struct Sources;

/// Every page the server renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    Dashboard,
    Download,
}
impl Page {
    fn file_name(self) -> &'static str {
        match self {
            Page::Login => "login.html",
            Page::Dashboard => "dashboard.html",
            Page::Download => "download.html",
        }
    }
}

pub struct Templates {
    engine: Engine<'static>,
    login: Template<'static>,
    dashboard: Template<'static>,
    download: Template<'static>,
}

impl Templates {
    /// Compile every page so a broken template stops startup rather than a
    /// request.
    pub fn load() -> Result<Self> {
        let mut engine = Engine::new();
        engine.add_formatter("escape", addons::escape_html);
        let login = compile(&engine, Page::Login)?;
        let dashboard = compile(&engine, Page::Dashboard)?;
        let download = compile(&engine, Page::Download)?;
        Ok(Self { engine, login, dashboard, download })
    }

    pub fn render(&self, page: Page, context: impl Serialize) -> Result<String> {
        let template = match page {
            Page::Login => &self.login,
            Page::Dashboard => &self.dashboard,
            Page::Download => &self.download,
        };
        template.render(&self.engine, context).to_string().or_raise(|| ErrorKind::Render)
    }

    /// Render a page into a response, or a bare 500 if rendering fails.
    pub fn respond(&self, page: Page, context: impl Serialize) -> Response {
        match self.render(page, context) {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                tracing::error!(error = ?e, page = page.file_name(), "Could not render page");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            },
        }
    }
}

fn compile(engine: &Engine<'static>, page: Page) -> Result<Template<'static>> {
    let name = page.file_name();
    let file = Sources::get(name).ok_or_raise(|| ErrorKind::Template(name))?;
    let source = String::from_utf8(file.data.into_owned()).or_raise(|| ErrorKind::Template(name))?;
    engine.compile(source).or_raise(|| ErrorKind::Template(name))
}

mod addons {
    use std::fmt::Write;
    use upon::{Value, fmt as upon_fmt};

    /// Formatter for anything user-supplied: escapes the characters that
    /// would otherwise end up as markup or break out of an attribute.
    pub(super) fn escape_html(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                for c in s.chars() {
                    match c {
                        '&' => f.write_str("&amp;")?,
                        '<' => f.write_str("&lt;")?,
                        '>' => f.write_str("&gt;")?,
                        '"' => f.write_str("&quot;")?,
                        '\'' => f.write_str("&#x27;")?,
                        c => f.write_char(c)?,
                    }
                }
            },
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }
}
