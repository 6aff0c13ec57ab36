//! View engine
//!
//! Tera templates for the personal centre pages. The templates ship inside
//! the binary; a directory configured as `view.templates_path` can override
//! any of them by relative name (e.g. `news/user_base_info.html`).

use rust_embed::RustEmbed;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};

mod error;

pub use error::ViewError;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Renders the HTML side of the profile pages
pub struct ViewEngine {
    tera: Tera,
}

impl ViewEngine {
    /// Build an engine from the embedded templates, letting files under
    /// `overlay` replace those with the same relative name.
    pub fn new(overlay: Option<&Path>) -> Result<Self, ViewError> {
        let mut templates: BTreeMap<String, String> = BTreeMap::new();

        for name in EmbeddedTemplates::iter() {
            if let Some(file) = EmbeddedTemplates::get(&name) {
                let content = String::from_utf8_lossy(&file.data).into_owned();
                templates.insert(name.into_owned(), content);
            }
        }

        if let Some(dir) = overlay {
            if dir.is_dir() {
                let mut found = Vec::new();
                collect_templates_from_dir(dir, dir, &mut found)?;
                for (name, content) in found {
                    tracing::debug!("Template '{}' overridden from {:?}", name, dir);
                    templates.insert(name, content);
                }
            } else {
                tracing::warn!("Template directory {:?} does not exist, using embedded templates", dir);
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates.into_iter())
            .map_err(|e| ViewError::TemplateError(describe(&e)))?;

        Ok(Self { tera })
    }

    /// Engine with only the embedded templates
    pub fn embedded() -> Result<Self, ViewError> {
        Self::new(None)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render `template` with `context`
    pub fn render(&self, template: &str, context: &Context) -> Result<String, ViewError> {
        if !self.has_template(template) {
            return Err(ViewError::NotFound(template.to_string()));
        }

        self.tera
            .render(template, context)
            .map_err(|e| ViewError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e))))
    }

    /// Bare page served when a template fails to render
    pub fn error_page(template: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <title>页面错误</title>
</head>
<body>
    <h1>页面错误</h1>
    <p>无法渲染页面 <code>{}</code></p>
</body>
</html>"#,
            template
        )
    }
}

/// Flatten a Tera error and its causes into one line
fn describe(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!(": {}", s));
        source = s.source();
    }
    message
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), ViewError> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative = path
                .strip_prefix(base_path)
                .map_err(|_| ViewError::TemplateError(format!("Template outside {:?}: {:?}", base_path, path)))?;
            let name = relative.to_string_lossy().replace('\\', "/");
            templates.push((name, fs::read_to_string(&path)?));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Gender, NewsReview, PagedResult, UserProfile};
    use tempfile::TempDir;

    fn profile() -> UserProfile {
        UserProfile {
            id: 1,
            nick_name: "Alice".into(),
            avatar_url: "/uploads/abc".into(),
            mobile: "13800000001".into(),
            gender: Gender::Woman,
            signature: "hi".into(),
            followers_count: 2,
            news_count: 5,
        }
    }

    #[test]
    fn test_embedded_templates_present() {
        let engine = ViewEngine::embedded().expect("Failed to load templates");

        for name in [
            "news/user.html",
            "news/user_follow.html",
            "news/user_base_info.html",
            "news/user_pic_info.html",
            "news/user_pass_info.html",
            "news/user_collection.html",
            "news/user_news_release.html",
            "news/user_news_list.html",
        ] {
            assert!(engine.has_template(name), "missing {}", name);
        }
    }

    #[test]
    fn test_render_base_info() {
        let engine = ViewEngine::embedded().unwrap();
        let mut context = Context::new();
        context.insert("user", &profile());

        let html = engine.render("news/user_base_info.html", &context).unwrap();
        assert!(html.contains("Alice"));
        assert!(html.contains("hi"));
    }

    #[test]
    fn test_render_news_list_statuses() {
        let engine = ViewEngine::embedded().unwrap();
        let page = PagedResult {
            items: vec![NewsReview {
                id: 7,
                title: "Rates hold".into(),
                create_time: "2024-01-01 10:00:00".into(),
                status: -1,
                reason: "duplicate".into(),
            }],
            total: 1,
            current_page: 1,
            total_page: 1,
        };
        let mut context = Context::new();
        context.insert("user", &profile());
        context.insert("news_list", &page.items);
        context.insert("current_page", &page.current_page);
        context.insert("total_page", &page.total_page);

        let html = engine.render("news/user_news_list.html", &context).unwrap();
        assert!(html.contains("Rates hold"));
        assert!(html.contains("duplicate"));
    }

    #[test]
    fn test_render_release_categories() {
        let engine = ViewEngine::embedded().unwrap();
        let mut context = Context::new();
        context.insert("user", &profile());
        context.insert("categories", &vec![Category::new(2, "股市")]);

        let html = engine.render("news/user_news_release.html", &context).unwrap();
        assert!(html.contains("股市"));
    }

    #[test]
    fn test_missing_template() {
        let engine = ViewEngine::embedded().unwrap();
        let result = engine.render("news/nope.html", &Context::new());
        assert!(matches!(result, Err(ViewError::NotFound(_))));
    }

    #[test]
    fn test_overlay_overrides_embedded() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("news")).unwrap();
        fs::write(dir.path().join("news/user_pass_info.html"), "custom {{ user.nick_name }}").unwrap();

        let engine = ViewEngine::new(Some(dir.path())).unwrap();
        let mut context = Context::new();
        context.insert("user", &profile());

        assert_eq!(engine.render("news/user_pass_info.html", &context).unwrap(), "custom Alice");
        assert!(engine.has_template("news/user_base_info.html"));
    }

    #[test]
    fn test_broken_overlay_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.html"), "{% if %}").unwrap();

        assert!(matches!(
            ViewEngine::new(Some(dir.path())),
            Err(ViewError::TemplateError(_))
        ));
    }
}
