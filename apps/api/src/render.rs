//! HTML rendering for the single page (`templates/index.html`).

use askama::Template;
use axum::response::Html;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage<'a> {
    pub optimized_resume: Option<&'a str>,
    pub is_error: bool,
}

impl<'a> IndexPage<'a> {
    pub fn form() -> Self {
        Self {
            optimized_resume: None,
            is_error: false,
        }
    }

    pub fn result(text: &'a str) -> Self {
        Self {
            optimized_resume: Some(text),
            is_error: false,
        }
    }

    pub fn error(message: &'a str) -> Self {
        Self {
            optimized_resume: Some(message),
            is_error: true,
        }
    }

    pub fn to_html(&self) -> Result<Html<String>, askama::Error> {
        Ok(Html(self.render()?))
    }
}
