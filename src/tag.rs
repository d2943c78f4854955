//! Defines the [`Tag`] type, which represents a post category.

use gtmpl::Value;
use std::hash::{Hash, Hasher};
use url::Url;

/// Represents a post category along with the URL of its first index page.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The category's slugified name, so e.g. `Web Dev` and `web-dev`
    /// resolve to the same index and the name can be dropped into a [`Url`].
    pub name: String,

    /// The category as written in the data source. Shown in templates.
    pub label: String,

    /// The URL for the tag's first index page,
    /// `{index_url}/{name}/index.html`.
    pub url: Url,
}

impl Tag {
    /// Builds the [`Tag`] for `category`, placing its index under
    /// `index_url`. Returns [`None`] for categories with no sluggable
    /// characters.
    pub fn new(index_url: &Url, category: &str) -> Option<Tag> {
        let name = slug::slugify(category);
        if name.is_empty() {
            return None;
        }
        let url = index_url.join(&format!("{}/index.html", name)).ok()?;
        Some(Tag {
            name,
            label: category.trim().to_owned(),
            url,
        })
    }
}

/// Builds the tags for a list of categories, dropping duplicates and
/// categories that slugify to nothing.
pub fn tags(index_url: &Url, categories: &[String]) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::with_capacity(categories.len());
    for tag in categories.iter().filter_map(|c| Tag::new(index_url, c)) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `name`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `name` field.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Tag {}

impl From<&Tag> for Value {
    /// Converts [`Tag`]s into [`Value`]s for templating.
    fn from(t: &Tag) -> Value {
        use std::collections::HashMap;
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("tag".to_owned(), Value::String(t.label.clone()));
        m.insert("slug".to_owned(), Value::String(t.name.clone()));
        m.insert("url".to_owned(), Value::String(t.url.to_string()));
        Value::Object(m)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tag_url() -> Result<(), url::ParseError> {
        let index_url = Url::parse("https://example.org/pages/")?;
        let tag = Tag::new(&index_url, " Web Dev ").unwrap();
        assert_eq!("web-dev", tag.name);
        assert_eq!("Web Dev", tag.label);
        assert_eq!(
            "https://example.org/pages/web-dev/index.html",
            tag.url.as_str()
        );
        Ok(())
    }

    #[test]
    fn test_tags_dedupes_by_slug() -> Result<(), url::ParseError> {
        let index_url = Url::parse("https://example.org/pages/")?;
        let categories = vec![
            "Rust".to_owned(),
            "rust".to_owned(),
            "!!!".to_owned(),
            "CS".to_owned(),
        ];
        let names: Vec<String> = tags(&index_url, &categories)
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(vec!["rust", "cs"], names);
        Ok(())
    }
}
