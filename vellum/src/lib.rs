//! Vellum is a standalone template engine: it finds templates on disk by name, compiles them,
//! keeps the compiled form in a cache directory, and renders them with a data context.
//!
//! Nothing here depends on a web framework. Everything is configured through a [`Config`]
//! passed to the [`Views`] facade.
//!
//! # Getting started
//!
//! ```rust,no_run
//! use vellum::prelude::*;
//!
//! # fn main() -> Result<(), vellum::Error> {
//! let config = Config::default()
//!     .path("views")
//!     .namespace("admin", "admin/views")
//!     .cache("storage/views");
//!
//! let views = Views::new(config)?;
//!
//! let mut context = Context::new();
//! context.set("name", "<b>Al</b>").unwrap();
//!
//! // views/hello.tmpl: Hello, {{ name }}!
//! let html = views.render("hello", &context)?;
//! assert_eq!(html, "Hello, &lt;b&gt;Al&lt;/b&gt;!");
//! # Ok(())
//! # }
//! ```
//!
//! # Templates
//!
//! Files ending in `.tmpl` are compiled templates:
//!
//! ```text
//! <h1>{{ title }}</h1>                   escaped output
//! {!! body !!}                           raw output
//! {{-- comments --}}                     dropped
//! <% if user %>...<% elsif guest %>...<% else %>...<% end %>
//! <% for post in posts %>{{ loop.iteration }}. {{ post.title }}<% else %>no posts<% end %>
//! <% include "partials.footer" %>
//! ```
//!
//! Files ending in `.html` are returned as they are.
pub mod colors;
pub mod config;
pub mod error;
pub mod events;
pub mod filesystem;
pub mod logging;
pub mod prelude;
pub mod view;

pub use config::Config;
pub use error::Error;
pub use view::Views;

pub use serde_json;
pub use tokio;

/// Convert text to snake_case.
pub fn snake_case(string: &str) -> String {
    let mut result = "".to_string();

    for (i, c) in string.chars().enumerate() {
        if c.is_ascii_uppercase() && i != 0 {
            result.push('_');
            result.push(c.to_ascii_lowercase());
        } else if c == '-' {
            result.push('_');
        } else {
            result.push(c.to_ascii_lowercase());
        }
    }

    result
}

/// Convert the first letter of the string to uppercase lettering.
pub fn capitalize(string: &str) -> String {
    let mut iter = string.chars();
    match iter.next() {
        None => String::new(),
        Some(letter) => letter.to_uppercase().chain(iter).collect(),
    }
}

/// Convert string to PascalCase (often confused with camelCase).
pub fn pascal_case(string: &str) -> String {
    string
        .split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("")
}

/// Replace characters that have a meaning in HTML with entities,
/// so the string can be printed inside a template safely.
pub fn escape_html(string: &str) -> String {
    let mut result = String::with_capacity(string.len());

    for c in string.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            c => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="/?a=1&b='2'">"#),
            "&lt;a href=&quot;/?a=1&amp;b=&#39;2&#39;&quot;&gt;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn test_cases() {
        assert_eq!(snake_case("UserProfile"), "user_profile");
        assert_eq!(snake_case("user-profile"), "user_profile");
        assert_eq!(pascal_case("user_profile"), "UserProfile");
        assert_eq!(capitalize("élan"), "Élan");
    }
}
