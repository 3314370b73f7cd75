//! Scaffold a new site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Files created by `quire init`, relative to the source directory.
const SCAFFOLD: &[(&str, &str)] = &[
    ("pages/__layout.html", DEFAULT_LAYOUT),
    ("pages/index.html", DEFAULT_INDEX),
    ("posts/post.html", DEFAULT_POST_TEMPLATE),
    ("posts/hello-world.md", DEFAULT_POST),
];

/// Run the init command.
pub fn run(source: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing site in {}", source.display());

    let mut created = 0;
    for (relative, contents) in SCAFFOLD {
        let path = source.join(relative);

        if path.exists() && !yes {
            tracing::warn!("{} already exists. Use --yes to overwrite.", path.display());
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Created {}", relative);
        created += 1;
    }

    tracing::info!("Initialization complete! ({} files written)", created);
    tracing::info!("Run 'quire build' and then 'quire serve' to preview.");

    Ok(())
}

const DEFAULT_LAYOUT: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% block title %}My Blog{% endblock %}</title>
</head>
<body>
  <header><a href="/">My Blog</a></header>
  <main>
    {% block content %}{% endblock %}
  </main>
</body>
</html>
"##;

const DEFAULT_INDEX: &str = r##"{% extends "pages/__layout.html" %}

{% block content %}
<h1>Posts</h1>
<ul class="posts">
{% for link, post in posts_ordered %}
  <li>
    <a href="{{ link }}">{{ post.metadata.title or link }}</a>
    <time>{{ post.metadata.date }}</time>
  </li>
{% endfor %}
</ul>
{% endblock %}
"##;

const DEFAULT_POST_TEMPLATE: &str = r##"{% extends "pages/__layout.html" %}

{% block title %}{{ metadata.title or "Untitled" }} - My Blog{% endblock %}

{% block content %}
<article>
  {% if toc %}
  <nav class="toc">
    <ul>
    {% for entry in toc %}
      <li class="toc-level-{{ entry.level }}"><a href="#{{ entry.id }}">{{ entry.title }}</a></li>
    {% endfor %}
    </ul>
  </nav>
  {% endif %}
  {{ post_content | markdown }}
</article>
<footer>Last edited {{ last_edited }}</footer>
{% endblock %}
"##;

const DEFAULT_POST: &str = r#"---
title: Hello, world
date: 2024-01-01
---

# Hello, world

This post lives in `posts/hello-world.md` and is written to
`_site/hello-world.html`.

## Writing posts

Every post starts with frontmatter and must carry a `date`:

```yaml
---
title: My post
date: 2024-01-31
---
```

Posts are listed newest first on the index page.
"#;
