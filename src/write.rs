//! Templates and writes the site's HTML pages: one page per [`Article`] and
//! groups of index pages for all articles and for each [`Tag`].

use crate::tag::Tag;
use gtmpl::{Context, Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// A post ready to be written to disk.
#[derive(Clone, Debug)]
pub struct Article {
    pub slug: String,
    pub title: String,

    /// The created date as stored in the data source, used for the feed.
    pub created_date: Option<String>,

    /// The formatted created date, shown on index pages.
    pub created: String,

    /// The formatted updated date, shown on the post page. Falls back to
    /// the created date.
    pub date: String,

    /// The post's first paragraph as plain text.
    pub summary: String,
    pub tags: Vec<Tag>,
    pub url: Url,
    pub file_path: PathBuf,

    /// The rendered body HTML, or [`None`] when the post's content could not
    /// be fetched and the not-found page is written in its place.
    pub body: Option<String>,
}

impl Article {
    /// Converts the article into a template [`Value`] with the fields
    /// `title`, `slug`, `url`, `date`, `created`, `summary`, `tags`, and
    /// `body`.
    fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.title.clone()));
        m.insert("slug".to_owned(), Value::String(self.slug.clone()));
        m.insert("url".to_owned(), Value::String(self.url.to_string()));
        m.insert("date".to_owned(), Value::String(self.date.clone()));
        m.insert("created".to_owned(), Value::String(self.created.clone()));
        m.insert("summary".to_owned(), Value::String(self.summary.clone()));
        m.insert(
            "tags".to_owned(),
            Value::Array(self.tags.iter().map(Value::from).collect()),
        );
        m.insert(
            "body".to_owned(),
            match &self.body {
                Some(body) => Value::String(body.clone()),
                None => Value::Nil,
            },
        );
        Value::Object(m)
    }
}

/// Responsible for indexing, templating, and writing HTML pages to disk from
/// [`Article`]s.
pub struct Writer<'a> {
    /// The template for post pages.
    pub posts_template: &'a Template,

    /// The template for index pages.
    pub index_template: &'a Template,

    /// The template written in place of posts whose content is missing.
    pub not_found_template: &'a Template,

    /// The base URL for index pages. The main index pages will be located at
    /// `{index_base_url}/index.html`, `{index_base_url}/1.html`, etc. The tag
    /// index pages will be located at `{index_base_url}/{tag_name}/index.html`,
    /// `{index_base_url}/{tag_name}/1.html`, etc.
    pub index_base_url: &'a Url,

    /// The directory in which the index HTML files will be written, laid out
    /// like [`Writer::index_base_url`].
    pub index_output_directory: &'a Path,

    /// The number of posts per index page.
    pub index_page_size: usize,

    /// The site title, available to every template as `site_title`.
    pub site_title: &'a str,

    /// The URL for the site's home page.
    pub home_page: &'a Url,

    /// The URL for the static assets, typically for the theme's stylesheet.
    pub static_url: &'a Url,

    /// The URL of the Atom feed.
    pub atom_url: &'a Url,
}

impl Writer<'_> {
    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, page: &Page) -> Result<()> {
        let mut value = page.to_value();
        if let Value::Object(obj) = &mut value {
            obj.insert(
                "site_title".to_owned(),
                Value::String(self.site_title.to_owned()),
            );
            obj.insert(
                "home_page".to_owned(),
                Value::String(self.home_page.to_string()),
            );
            obj.insert(
                "static_url".to_owned(),
                Value::String(self.static_url.to_string()),
            );
            obj.insert(
                "atom_url".to_owned(),
                Value::String(self.atom_url.to_string()),
            );
        }
        page.template
            .execute(
                &mut std::fs::File::create(&page.file_path)?,
                &Context::from(value),
            )
            .map_err(|e| Error::Template(e.to_string()))?;
        Ok(())
    }

    /// Indexes `articles` by tag and writes the post and index pages to disk.
    pub fn write_articles(&self, articles: &[Article]) -> Result<()> {
        use std::collections::HashSet;
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        let pages = index_pages(
            articles,
            self.index_base_url,
            self.index_output_directory,
            self.index_page_size,
            self.index_template,
        )?
        .into_iter()
        .chain(post_pages(
            articles,
            self.posts_template,
            self.not_found_template,
        ));

        for page in pages {
            if let Some(dir) = page.file_path.parent() {
                if seen_dirs.insert(dir.to_owned()) {
                    std::fs::create_dir_all(dir)?;
                }
            }
            self.write_page(&page)?;
        }
        Ok(())
    }
}

/// An object representing an output HTML file. A [`Page`] can be converted to a
/// [`Value`] and thus rendered in a template via [`Page::to_value`].
struct Page<'a> {
    /// The main item for the page.
    item: Value,

    /// The tag an index page belongs to. [`None`] for post pages and the
    /// main index.
    tag: Option<&'a Tag>,

    /// The target location on disk for the output file.
    file_path: PathBuf,

    /// The URL for the previous page, if any.
    prev: Option<Url>,

    /// The URL for the next page, if any.
    next: Option<Url>,

    /// The template with which the page will be rendered.
    template: &'a Template,
}

impl Page<'_> {
    /// Converts a [`Page`] into a [`Value::Object`] with fields `item`,
    /// `tag`, `prev`, and `next`.
    fn to_value(&self) -> Value {
        let option_to_value = |opt: &Option<Url>| match opt {
            Some(url) => Value::String(url.to_string()),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("item".to_owned(), self.item.clone());
        m.insert(
            "tag".to_owned(),
            match self.tag {
                Some(tag) => tag.into(),
                None => Value::Nil,
            },
        );
        m.insert("prev".to_owned(), option_to_value(&self.prev));
        m.insert("next".to_owned(), option_to_value(&self.next));
        Value::Object(m)
    }
}

/// Creates the post [`Page`]s. Articles without a body get the not-found
/// template; `prev` and `next` link neighbouring articles in list order.
fn post_pages<'a>(
    articles: &'a [Article],
    template: &'a Template,
    not_found_template: &'a Template,
) -> impl Iterator<Item = Page<'a>> {
    articles.iter().enumerate().map(move |(i, article)| Page {
        item: article.to_value(),
        tag: None,
        file_path: article.file_path.clone(),
        prev: match i {
            0 => None,
            _ => Some(articles[i - 1].url.clone()),
        },
        next: articles.get(i + 1).map(|next| next.url.clone()),
        template: match article.body {
            Some(_) => template,
            None => not_found_template,
        },
    })
}

/// Creates the index [`Page`]s for all articles and for each tag.
fn index_pages<'a>(
    articles: &'a [Article],
    index_base_url: &Url,
    index_output_directory: &Path,
    index_page_size: usize,
    index_template: &'a Template,
) -> Result<Vec<Page<'a>>> {
    let mut pages = Vec::new();
    for index in index_articles(index_base_url, index_output_directory, articles)? {
        pages.extend(index.to_pages(index_page_size, index_template)?);
    }
    Ok(pages)
}

/// A collection of [`Article`]s associated with a tag, or with no tag for the
/// main index containing every article.
struct Index<'a> {
    tag: Option<&'a Tag>,

    /// The base URL for the index's pages.
    url: Url,

    /// The output directory for the index's pages.
    output_directory: PathBuf,

    articles: Vec<&'a Article>,
}

impl<'a> Index<'a> {
    /// Splits the index into pages of `index_page_size` articles. The first
    /// page is `index.html`, the rest are `1.html`, `2.html`, and so on.
    fn to_pages(&self, index_page_size: usize, index_template: &'a Template) -> Result<Vec<Page<'a>>> {
        let chunks: Vec<&[&Article]> = self.articles.chunks(index_page_size.max(1)).collect();
        let total_pages = chunks.len();
        let page_url = |i: usize| match i {
            0 => self.url.join("index.html"),
            _ => self.url.join(&format!("{}.html", i)),
        };

        let mut pages = Vec::with_capacity(total_pages);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let file_name = match i {
                0 => String::from("index.html"),
                _ => format!("{}.html", i),
            };
            pages.push(Page {
                item: Value::Array(chunk.iter().map(|a| a.to_value()).collect()),
                tag: self.tag,
                file_path: self.output_directory.join(&file_name),
                prev: match i {
                    0 => None,
                    _ => Some(page_url(i - 1)?),
                },
                next: match i + 1 < total_pages {
                    false => None,
                    true => Some(page_url(i + 1)?),
                },
                template: index_template,
            });
        }
        Ok(pages)
    }
}

/// Groups `articles` into the main index plus one index per tag. Indices
/// keep the articles' order.
fn index_articles<'a>(
    base_url: &Url,
    base_directory: &Path,
    articles: &'a [Article],
) -> Result<Vec<Index<'a>>> {
    let mut indices: Vec<Index> = vec![Index {
        tag: None,
        url: base_url.to_owned(),
        output_directory: base_directory.to_owned(),
        articles: articles.iter().collect(),
    }];
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for article in articles {
        for tag in &article.tags {
            match positions.get(tag.name.as_str()) {
                Some(&position) => indices[position].articles.push(article),
                None => {
                    positions.insert(&tag.name, indices.len());
                    indices.push(Index {
                        tag: Some(tag),
                        url: base_url.join(&format!("{}/", tag.name))?,
                        output_directory: base_directory.join(&tag.name),
                        articles: vec![article],
                    });
                }
            }
        }
    }

    Ok(indices)
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error building an index page URL.
    Url(url::ParseError),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. This allows us to
    /// use the `?` operator when joining URLs.
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Url(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Url(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}
