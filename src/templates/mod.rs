//! Template set using the Tera template engine
//!
//! Templates are loaded once from the template root into an owned
//! [`TemplateSet`] and passed to every render call. Reloading builds a
//! new set; an existing one is never mutated.

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tera::{Context, Tera};
use walkdir::WalkDir;

use crate::config::BodyMode;
use crate::content::{ContentItem, MarkdownRenderer, DATE_FORMAT};
use crate::data::DataBag;

/// Black-box renderer consumed by the build and the dev server
pub trait Renderer {
    /// Check if a template exists
    fn has_template(&self, name: &str) -> bool;

    /// Render a template with the given context
    fn render(&self, name: &str, context: &RenderContext<'_>) -> Result<String>;
}

/// Data handed to every page template
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RenderContext<'a> {
    #[serde(rename = "Page")]
    pub page: &'a ContentItem,
    #[serde(rename = "Data")]
    pub data: &'a DataBag,
    #[serde(rename = "Feed")]
    pub feed: &'a [ContentItem],
}

/// Templates loaded from the template root
pub struct TemplateSet {
    tera: Tera,
}

impl TemplateSet {
    /// Load every `*.html` file directly under `dir`, named by file name
    pub fn load(dir: &Path, markdown: Arc<MarkdownRenderer>) -> Result<Self> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_html = path.extension().map(|e| e == "html").unwrap_or(false);
            if !(entry.file_type().is_file() && is_html) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push((path.to_path_buf(), Some(name.to_string())));
            }
        }

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_template_files(files)
            .with_context(|| format!("Failed to load templates from {:?}", dir))?;
        register_filters(&mut tera, markdown);

        tracing::debug!(
            "Loaded {} templates from {:?}",
            tera.get_template_names().count(),
            dir
        );
        Ok(Self { tera })
    }

    /// Build a set from in-memory templates
    pub fn from_raw(templates: &[(&str, &str)], markdown: Arc<MarkdownRenderer>) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(templates.to_vec())?;
        register_filters(&mut tera, markdown);
        Ok(Self { tera })
    }

    /// Template names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(String::from).collect();
        names.sort();
        names
    }

    /// Render any serializable value with a named template
    pub fn render_value<T: Serialize>(&self, name: &str, value: &T) -> Result<String> {
        let context = Context::from_serialize(value)?;
        Ok(self.tera.render(name, &context)?)
    }
}

impl Renderer for TemplateSet {
    fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    fn render(&self, name: &str, context: &RenderContext<'_>) -> Result<String> {
        self.render_value(name, context)
    }
}

fn register_filters(tera: &mut Tera, markdown: Arc<MarkdownRenderer>) {
    tera.register_filter(
        "markdown",
        move |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
            let s = tera::try_get_value!("markdown", "value", String, value);
            Ok(tera::Value::String(markdown.render(&s)))
        },
    );
    tera.register_filter("parse_date", parse_date_filter);
}

/// Tera filter: reformat a `YYYY-MM-DD` date, empty when it does not parse
fn parse_date_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("parse_date", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("parse_date", "format", String, val),
        None => "%B %d, %Y".to_string(),
    };

    let formatted = chrono::NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map(|d| d.format(&format).to_string())
        .unwrap_or_default();
    Ok(tera::Value::String(formatted))
}

/// Minimal page template for a newly created collection
pub fn collection_stub(body_mode: BodyMode) -> String {
    let body = match body_mode {
        BodyMode::Raw => "{{ Page.body | markdown | safe }}",
        BodyMode::Rendered => "{{ Page.body | safe }}",
    };
    format!(
        r#"{{% include "_top.html" ignore missing %}}

<section>
  <h2>{{{{ Page.title }}}}</h2>
  <article>
  {}
  </article>
</section>

{{% include "_bottom.html" ignore missing %}}
"#,
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;

    fn markdown() -> Arc<MarkdownRenderer> {
        Arc::new(MarkdownRenderer::new())
    }

    fn item(title: &str, body: &str) -> ContentItem {
        ContentItem {
            title: title.to_string(),
            body: body.to_string(),
            date: "2024-01-15".to_string(),
            collection: "post".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_page_data_and_feed() {
        let set = TemplateSet::from_raw(
            &[(
                "post.html",
                "<h1>{{ Page.title }}</h1>{{ Page.body | markdown | safe }}\
                 {{ Data.site.name }}{% for p in Feed %}[{{ p.title }}]{% endfor %}",
            )],
            markdown(),
        )
        .unwrap();

        let page = item("Hello", "*hi*");
        let mut data = BTreeMap::new();
        data.insert("site".to_string(), serde_json::json!({"name": "Mine"}));
        let feed = vec![item("A", ""), item("B", "")];

        let html = set
            .render(
                "post.html",
                &RenderContext {
                    page: &page,
                    data: &data,
                    feed: &feed,
                },
            )
            .unwrap();
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<em>hi</em>"));
        assert!(html.contains("Mine"));
        assert!(html.contains("[A][B]"));
    }

    #[test]
    fn test_parse_date_filter() {
        let set = TemplateSet::from_raw(
            &[
                ("d.html", r#"{{ Page.date | parse_date(format="%d/%m/%Y") }}"#),
                ("bad.html", r#"[{{ Page.title | parse_date }}]"#),
            ],
            markdown(),
        )
        .unwrap();
        let page = item("not a date", "");
        let data = BTreeMap::new();
        let ctx = RenderContext {
            page: &page,
            data: &data,
            feed: &[],
        };
        assert_eq!(set.render("d.html", &ctx).unwrap(), "15/01/2024");
        assert_eq!(set.render("bad.html", &ctx).unwrap(), "[]");
    }

    #[test]
    fn test_output_is_not_autoescaped() {
        let set = TemplateSet::from_raw(&[("t.html", "{{ Page.title }}|{{ Page.date }}")], markdown())
            .unwrap();
        let page = item("<b>Fish & Chips</b>", "");
        let data = BTreeMap::new();
        let ctx = RenderContext {
            page: &page,
            data: &data,
            feed: &[],
        };
        assert_eq!(set.render("t.html", &ctx).unwrap(), "<b>Fish & Chips</b>|2024-01-15");
    }

    #[test]
    fn test_missing_template_is_render_error() {
        let set = TemplateSet::from_raw(&[], markdown()).unwrap();
        let page = item("x", "");
        let data = BTreeMap::new();
        let ctx = RenderContext {
            page: &page,
            data: &data,
            feed: &[],
        };
        assert!(!set.has_template("post.html"));
        assert!(set.render("post.html", &ctx).is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("site.html"), "site {{ Page.title }}").unwrap();
        fs::write(dir.path().join("notes.html"), "notes").unwrap();
        fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

        let set = TemplateSet::load(dir.path(), markdown()).unwrap();
        assert_eq!(set.names(), vec!["notes.html", "site.html"]);
    }

    #[test]
    fn test_collection_stub_renders() {
        let stub = collection_stub(BodyMode::Raw);
        let set = TemplateSet::from_raw(&[("recipes.html", stub.as_str())], markdown()).unwrap();
        let page = item("Soup", "Boil **water**");
        let data = BTreeMap::new();
        let html = set
            .render(
                "recipes.html",
                &RenderContext {
                    page: &page,
                    data: &data,
                    feed: &[],
                },
            )
            .unwrap();
        assert!(html.contains("<h2>Soup</h2>"));
        assert!(html.contains("<strong>water</strong>"));
    }
}
