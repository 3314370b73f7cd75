//! Template engine for rendering pages and posts.

use std::path::Path;

use minijinja::{context, path_loader, Environment, UndefinedBehavior, Value};
use quire_md::{render_markdown, Document, PostMeta, TocEntry};

/// Context for rendering the post template.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PostContext<'a> {
    /// Raw Markdown body, rendered with the `markdown` filter
    pub post_content: &'a str,
    /// Source modification time, ISO-8601 local time
    pub last_edited: &'a str,
    /// Post frontmatter
    pub metadata: &'a PostMeta,
    /// Output path relative to the site root
    pub path: &'a str,
    /// Table of contents
    pub toc: Vec<TocEntry>,
}

/// Template engine using minijinja.
///
/// Templates are loaded from disk by `/`-separated names relative to the
/// site source directory, e.g. `pages/index.html`.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a template engine rooted at `source_dir`.
    pub fn new(source_dir: &Path, undefined: UndefinedBehavior) -> Self {
        let mut env = Environment::new();

        env.set_loader(path_loader(source_dir.to_path_buf()));
        env.set_undefined_behavior(undefined);
        env.add_filter("markdown", markdown_filter);

        Self { env }
    }

    /// Check that a template exists and compiles.
    pub fn resolve(&self, name: &str) -> Result<(), minijinja::Error> {
        self.env.get_template(name).map(|_| ())
    }

    /// Render a page template with the ordered post index.
    pub fn render_page(
        &self,
        template: &str,
        posts_ordered: &[(String, &Document)],
    ) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template(template)?;

        tmpl.render(context! {
            posts_ordered => posts_ordered,
        })
    }

    /// Render the post template for a single post.
    pub fn render_post(
        &self,
        template: &str,
        context: &PostContext<'_>,
    ) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template(template)?;

        tmpl.render(context)
    }
}

/// `{{ text | markdown }}`
fn markdown_filter(content: &str) -> Value {
    Value::from_safe_string(render_markdown(content))
}
