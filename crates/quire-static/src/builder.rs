//! Static site builder.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, DurationRound, Local, TimeDelta};
use minijinja::UndefinedBehavior;
use walkdir::WalkDir;

use quire_md::{parse_document, table_of_contents, Document, DocumentError};

use crate::output::{check_collisions, write_items, RenderedItem};
use crate::templates::{PostContext, TemplateEngine};

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Site source directory, also the template search root
    pub source_dir: PathBuf,

    /// Posts directory name, relative to the source directory
    pub posts_dir: String,

    /// Pages directory name, relative to the source directory
    pub pages_dir: String,

    /// Output directory (relative paths are resolved against the source directory)
    pub output_dir: PathBuf,

    /// Page that other templates extend, never rendered on its own
    pub layout_name: String,

    /// Template used for every post
    pub post_template: String,

    /// Treat any use of an undefined template variable as an error
    pub strict_undefined: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            posts_dir: "posts".to_string(),
            pages_dir: "pages".to_string(),
            output_dir: PathBuf::from("_site"),
            layout_name: "__layout.html".to_string(),
            post_template: "posts/post.html".to_string(),
            strict_undefined: false,
        }
    }
}

impl BuildConfig {
    /// Directory walked for posts.
    pub fn posts_root(&self) -> PathBuf {
        self.source_dir.join(&self.posts_dir)
    }

    /// Directory listed for pages.
    pub fn pages_root(&self) -> PathBuf {
        self.source_dir.join(&self.pages_dir)
    }

    /// Directory the site is written to.
    pub fn output_root(&self) -> PathBuf {
        self.source_dir.join(&self.output_dir)
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages generated
    pub pages: usize,

    /// Number of posts generated
    pub posts: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read {path}")]
    ReadError {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid post {path}")]
    ContentError {
        path: String,
        #[source]
        source: DocumentError,
    },

    #[error("Failed to render template {name}")]
    TemplateError {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Output path {0} is produced by more than one source file")]
    OutputCollision(String),

    #[error("Failed to write {path}")]
    WriteError {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A post discovered under the posts directory.
#[derive(Debug, Clone)]
pub struct Post {
    /// Path relative to the posts directory, extension removed, `/`-separated
    pub key: String,

    /// Source file path
    pub source_path: PathBuf,

    /// Parsed document
    pub doc: Document,
}

impl Post {
    /// Output path relative to the output root.
    pub fn output_path(&self) -> String {
        format!("{}.html", self.key)
    }
}

/// Order posts newest first.
///
/// Posts are sorted ascending by date, with equal dates in descending key
/// order, and the result reversed. Posts sharing a date therefore come out in
/// ascending key order.
pub fn order_posts(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| {
        a.doc
            .metadata
            .date
            .cmp(&b.doc.metadata.date)
            .then_with(|| b.key.cmp(&a.key))
    });
    posts.reverse();
    posts
}

/// Pair every post with its output path, as seen by page templates.
pub fn posts_index(ordered: &[Post]) -> Vec<(String, &Document)> {
    ordered
        .iter()
        .map(|post| (post.output_path(), &post.doc))
        .collect()
}

/// Static site builder.
pub struct SiteBuilder {
    config: BuildConfig,
    templates: TemplateEngine,
}

impl SiteBuilder {
    /// Create a new site builder.
    pub fn new(config: BuildConfig) -> Self {
        let undefined = if config.strict_undefined {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        };
        let templates = TemplateEngine::new(&config.source_dir, undefined);

        Self { config, templates }
    }

    /// The configuration this builder was created with.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the site.
    ///
    /// Everything is rendered in memory first, so content and template
    /// errors leave the output directory untouched.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        let posts = self.discover_posts()?;
        tracing::info!("Found {} posts", posts.len());

        let ordered = order_posts(posts);

        let mut items = self.render_pages(&ordered)?;
        let pages = items.len();

        items.extend(self.render_posts(&ordered)?);

        check_collisions(&items)?;

        let output_dir = self.config.output_root();
        write_items(&output_dir, &items)?;

        Ok(BuildResult {
            pages,
            posts: ordered.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir,
        })
    }

    /// Discover and parse all Markdown posts, in file name order.
    pub fn discover_posts(&self) -> Result<Vec<Post>, BuildError> {
        let root = self.config.posts_root();

        if !root.is_dir() {
            return Err(BuildError::ReadError {
                path: root.display().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "posts directory not found"),
            });
        }

        let mut posts = Vec::new();

        for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&root).display().to_string();
                BuildError::ReadError {
                    path,
                    source: e.into(),
                }
            })?;

            let path = entry.path();

            if !entry.file_type().is_file() || !is_markdown(path) {
                continue;
            }

            let source = fs::read_to_string(path).map_err(|e| BuildError::ReadError {
                path: path.display().to_string(),
                source: e,
            })?;

            let doc = parse_document(&source).map_err(|e| BuildError::ContentError {
                path: path.display().to_string(),
                source: e,
            })?;

            let key = post_key(&root, path);
            tracing::debug!("Discovered post {}", key);

            posts.push(Post {
                key,
                source_path: path.to_path_buf(),
                doc,
            });
        }

        Ok(posts)
    }

    /// Render every top-level page template with the ordered post index.
    pub fn render_pages(&self, ordered: &[Post]) -> Result<Vec<RenderedItem>, BuildError> {
        let root = self.config.pages_root();
        let read_error = |e: io::Error| BuildError::ReadError {
            path: root.display().to_string(),
            source: e,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(&root).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            let name = entry.file_name().to_string_lossy().into_owned();

            if name == self.config.layout_name {
                continue;
            }

            if !entry.path().is_file() {
                tracing::debug!("Skipping non-file page entry {}", entry.path().display());
                continue;
            }

            names.push(name);
        }
        names.sort();

        let index = posts_index(ordered);

        names
            .into_iter()
            .map(|name| {
                let template = format!("{}/{}", self.config.pages_dir, name);
                let html = self
                    .templates
                    .render_page(&template, &index)
                    .map_err(|e| BuildError::TemplateError {
                        name: template,
                        source: e,
                    })?;

                Ok(RenderedItem { path: name, html })
            })
            .collect()
    }

    /// Render every post through the shared post template.
    pub fn render_posts(&self, posts: &[Post]) -> Result<Vec<RenderedItem>, BuildError> {
        let template = &self.config.post_template;
        let template_error = |e: minijinja::Error| BuildError::TemplateError {
            name: template.clone(),
            source: e,
        };

        self.templates.resolve(template).map_err(template_error)?;

        posts
            .iter()
            .map(|post| {
                let last_edited =
                    last_edited(&post.source_path).map_err(|e| BuildError::ReadError {
                        path: post.source_path.display().to_string(),
                        source: e,
                    })?;

                let path = post.output_path();
                let context = PostContext {
                    post_content: &post.doc.content,
                    last_edited: &last_edited,
                    metadata: &post.doc.metadata,
                    path: &path,
                    toc: table_of_contents(&post.doc.content),
                };

                let html = self
                    .templates
                    .render_post(template, &context)
                    .map_err(template_error)?;

                Ok(RenderedItem { path, html })
            })
            .collect()
    }
}

fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("markdown")
    )
}

/// Path relative to the posts root, without extension, `/`-separated.
fn post_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");

    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Modification time of a file as ISO-8601 local time.
///
/// Sub-second digits are only present when non-zero.
pub fn last_edited(path: &Path) -> io::Result<String> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(format_local(DateTime::<Local>::from(modified)))
}

fn format_local(dt: DateTime<Local>) -> String {
    let dt = dt.duration_round(TimeDelta::microseconds(1)).unwrap_or(dt);

    if dt.timestamp_subsec_micros() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    const LAYOUT: &str = r#"<!DOCTYPE html>
<html><body>{% block content %}{% endblock %}</body></html>"#;

    const INDEX: &str = r#"{% extends "pages/__layout.html" %}
{% block content %}<ul>
{% for link, post in posts_ordered %}<li><a href="{{ link }}">{{ post.metadata.title }}</a> {{ post.metadata.date }}</li>
{% endfor %}</ul>{% endblock %}"#;

    const POST: &str = r#"{% extends "pages/__layout.html" %}
{% block content %}<article>{{ post_content | markdown }}</article>
<footer>Last edited {{ last_edited }}</footer>{% endblock %}"#;

    fn write(root: &Path, name: &str, contents: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn post_source(title: &str, date: &str) -> String {
        format!("---\ntitle: {}\ndate: {}\n---\n\n# {}\n\nBody.\n", title, date, title)
    }

    /// A source tree with a layout, an index page, the post template and
    /// three posts.
    fn site() -> (TempDir, BuildConfig) {
        let temp = tempdir().unwrap();
        let root = temp.path();

        write(root, "pages/__layout.html", LAYOUT);
        write(root, "pages/index.html", INDEX);
        write(root, "posts/post.html", POST);
        write(root, "posts/hello.md", &post_source("Hello", "2023-01-01"));
        write(
            root,
            "posts/c-for-python-programmers/part3.md",
            &post_source("Arrays", "2024-01-01"),
        );
        write(root, "posts/notes/draft.txt", "not a post");

        let config = BuildConfig {
            source_dir: root.to_path_buf(),
            ..Default::default()
        };

        (temp, config)
    }

    fn read_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
                (rel, fs::read(e.path()).unwrap())
            })
            .collect()
    }

    fn set_mtime(path: &Path, secs: u64) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn dated(key: &str, date: &str) -> Post {
        Post {
            key: key.to_string(),
            source_path: PathBuf::from(format!("posts/{}.md", key)),
            doc: parse_document(&format!("---\ndate: {}\n---\n", date)).unwrap(),
        }
    }

    #[test]
    fn builds_simple_site() {
        let (_temp, config) = site();
        let out = config.output_root();

        let result = SiteBuilder::new(config).build().unwrap();

        assert_eq!(result.pages, 1);
        assert_eq!(result.posts, 2);
        assert_eq!(result.output_dir, out);

        let tree = read_tree(&out);
        let paths: Vec<_> = tree.keys().cloned().collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("c-for-python-programmers/part3.html"),
                PathBuf::from("hello.html"),
                PathBuf::from("index.html"),
            ]
        );

        let post = fs::read_to_string(out.join("hello.html")).unwrap();
        assert!(post.contains("<h1 id=\"hello\">Hello</h1>"));
        assert!(post.contains("Last edited "));
    }

    #[test]
    fn index_lists_every_post_newest_first() {
        let (_temp, config) = site();
        let out = config.output_root();

        SiteBuilder::new(config).build().unwrap();

        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert_eq!(index.matches("<li>").count(), 2);

        // `/` is escaped inside the href
        let nested = Post {
            key: "c-for-python-programmers/part3".to_string(),
            source_path: PathBuf::from("posts/c-for-python-programmers/part3.md"),
            doc: parse_document("---\ndate: 2024-01-01\n---\n").unwrap(),
        };
        let nested_href = nested.output_path().replace('/', "&#x2f;");
        assert_eq!(nested_href, "c-for-python-programmers&#x2f;part3.html");

        let newer = index
            .find(&format!(r#"<a href="{}">Arrays</a> 2024-01-01"#, nested_href))
            .unwrap();
        let older = index.find(r#"<a href="hello.html">Hello</a> 2023-01-01"#).unwrap();
        assert!(newer < older);
    }

    #[test]
    fn orders_posts_with_documented_ties() {
        let posts = vec![
            dated("a", "2023-01-01"),
            dated("tie-b", "2023-06-15"),
            dated("d", "2024-01-01"),
            dated("tie-a", "2023-06-15"),
        ];

        let ordered = order_posts(posts.clone());
        let keys: Vec<&str> = ordered.iter().map(|p| p.key.as_str()).collect();

        assert_eq!(keys, vec!["d", "tie-a", "tie-b", "a"]);

        for pair in ordered.windows(2) {
            assert!(pair[0].doc.metadata.date >= pair[1].doc.metadata.date);
        }

        // Reversed, the result is already sorted ascending by (date, key descending).
        let reversed: Vec<&Post> = ordered.iter().rev().collect();
        let mut resorted = reversed.clone();
        resorted.sort_by(|a, b| {
            (&a.doc.metadata.date, std::cmp::Reverse(&a.key))
                .cmp(&(&b.doc.metadata.date, std::cmp::Reverse(&b.key)))
        });
        let resorted_keys: Vec<&str> = resorted.iter().map(|p| p.key.as_str()).collect();
        let reversed_keys: Vec<&str> = reversed.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(resorted_keys, reversed_keys);

        let restored: Vec<&str> = resorted.iter().rev().map(|p| p.key.as_str()).collect();
        assert_eq!(restored, keys);
    }

    #[test]
    fn tie_order_ignores_discovery_order() {
        let forward = order_posts(vec![dated("x", "2023-06-15"), dated("y", "2023-06-15")]);
        let backward = order_posts(vec![dated("y", "2023-06-15"), dated("x", "2023-06-15")]);

        let keys = |posts: &[Post]| posts.iter().map(|p| p.key.clone()).collect::<Vec<_>>();
        assert_eq!(keys(&forward), keys(&backward));
        assert_eq!(keys(&forward), vec!["x", "y"]);
    }

    #[test]
    fn post_keys_strip_extension_only() {
        let root = Path::new("posts");

        assert_eq!(post_key(root, Path::new("posts/hello.md")), "hello");
        assert_eq!(post_key(root, Path::new("posts/a/b/v1.2.md")), "a/b/v1.2");
        assert_eq!(post_key(root, Path::new("posts/long.markdown")), "long");
    }

    #[test]
    fn missing_date_fails_without_writing_anything() {
        let (_temp, config) = site();
        write(&config.source_dir, "posts/undated.md", "---\ntitle: Oops\n---\nBody");
        let out = config.output_root();

        let err = SiteBuilder::new(config).build().unwrap_err();

        match err {
            BuildError::ContentError { path, source } => {
                assert!(path.ends_with("undated.md"));
                assert!(matches!(source, DocumentError::MissingDate));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!out.exists());
    }

    #[test]
    fn missing_post_template_is_fatal() {
        let (_temp, config) = site();
        fs::remove_file(config.source_dir.join("posts/post.html")).unwrap();
        let out = config.output_root();

        let err = SiteBuilder::new(config).build().unwrap_err();

        assert!(matches!(err, BuildError::TemplateError { ref name, .. } if name == "posts/post.html"));
        assert!(!out.exists());
    }

    #[test]
    fn missing_posts_directory_is_fatal() {
        let temp = tempdir().unwrap();
        write(temp.path(), "pages/index.html", "hi");

        let err = SiteBuilder::new(BuildConfig {
            source_dir: temp.path().to_path_buf(),
            ..Default::default()
        })
        .build()
        .unwrap_err();

        assert!(matches!(err, BuildError::ReadError { .. }));
    }

    #[test]
    fn skips_layout_and_page_subdirectories() {
        let (_temp, config) = site();
        write(&config.source_dir, "pages/partials/nav.html", "{{ broken");
        write(&config.source_dir, "pages/feed.xml", "<feed>{{ posts_ordered | length }}</feed>");
        let out = config.output_root();

        let result = SiteBuilder::new(config).build().unwrap();

        assert_eq!(result.pages, 2);
        assert!(!out.join("__layout.html").exists());
        assert!(!out.join("partials").exists());
        assert_eq!(fs::read_to_string(out.join("feed.xml")).unwrap(), "<feed>2</feed>");
    }

    #[test]
    fn page_and_post_with_same_output_collide() {
        let (_temp, config) = site();
        write(&config.source_dir, "pages/hello.html", "page");
        let out = config.output_root();

        let err = SiteBuilder::new(config).build().unwrap_err();

        assert!(matches!(err, BuildError::OutputCollision(ref p) if p == "hello.html"));
        assert!(!out.exists());
    }

    #[test]
    fn leaves_stale_output_in_place() {
        let (_temp, config) = site();
        let out = config.output_root();
        write(&out, "removed-post.html", "stale");

        SiteBuilder::new(config).build().unwrap();

        assert_eq!(fs::read_to_string(out.join("removed-post.html")).unwrap(), "stale");
    }

    #[test]
    fn rebuild_is_idempotent_until_source_changes() {
        let (_temp, config) = site();
        let out = config.output_root();
        let source = config.source_dir.join("posts/hello.md");
        set_mtime(&source, 1_700_000_000);

        let builder = SiteBuilder::new(config);
        builder.build().unwrap();
        let first = read_tree(&out);
        builder.build().unwrap();
        let second = read_tree(&out);

        assert_eq!(first, second);

        let expected = format_local(Local.timestamp_opt(1_700_000_000, 0).unwrap());
        let post = fs::read_to_string(out.join("hello.html")).unwrap();
        assert!(post.contains(&format!("Last edited {}", expected)));

        fs::write(&source, post_source("Hello", "2023-01-01")).unwrap();
        set_mtime(&source, 1_700_086_400);
        builder.build().unwrap();
        let third = read_tree(&out);

        let hello = PathBuf::from("hello.html");
        assert_ne!(first[&hello], third[&hello]);
        assert_eq!(first[&PathBuf::from("index.html")], third[&PathBuf::from("index.html")]);
    }

    #[test]
    fn formats_subsecond_times() {
        let whole = Local.timestamp_opt(1_700_000_000, 0).unwrap();
        let fractional = Local.timestamp_opt(1_700_000_000, 250_000_000).unwrap();

        assert_eq!(format_local(whole).len(), "2023-11-14T22:13:20".len());
        assert!(format_local(fractional).ends_with(".250000"));
    }

    #[test]
    fn rounds_to_nearest_microsecond() {
        let up = Local.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let down = Local.timestamp_opt(1_700_000_000, 250_000_400).unwrap();
        let carry = Local.timestamp_opt(1_700_000_000, 999_999_600).unwrap();
        let next = Local.timestamp_opt(1_700_000_001, 0).unwrap();

        assert!(format_local(up).ends_with(".123457"));
        assert!(format_local(down).ends_with(".250000"));
        assert_eq!(format_local(carry), format_local(next));
    }

    #[test]
    fn strict_undefined_is_a_template_error() {
        let (_temp, mut config) = site();
        write(&config.source_dir, "pages/about.html", "{{ author }}");
        config.strict_undefined = true;

        let err = SiteBuilder::new(config).build().unwrap_err();

        assert!(matches!(err, BuildError::TemplateError { ref name, .. } if name == "pages/about.html"));
    }
}
