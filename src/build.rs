//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: fetching the posts
//! ([`crate::post`]), rendering their blocks to HTML ([`crate::render`]),
//! writing index and post pages ([`crate::write`]), copying the static theme
//! assets, and generating the Atom feed.

use crate::block::{plain_text, Block, BlockKind, Parent};
use crate::client::{self, BlockSource, NotionClient, PageSource};
use crate::config::{Config, NotionSettings};
use crate::feed::{write_feed, Error as FeedError, FeedConfig};
use crate::htmlrenderer::blocks_to_html;
use crate::post::{self, fetch_post_detail, fetch_post_list, format_date, PostSummary};
use crate::tag::tags;
use crate::write::{Article, Error as WriteError, Writer};
use gtmpl::Template;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Written in place of posts whose content can't be fetched when the theme
/// has no `not_found_template`.
const DEFAULT_NOT_FOUND: &str =
    "<!DOCTYPE html><html><body><h1>Post not found</h1></body></html>";

/// Builds the site from a [`Config`] object against the Notion API.
pub async fn build_site(config: Config, settings: &NotionSettings) -> Result<()> {
    let client = NotionClient::new(settings)?;
    build_site_from(config, &client, &client, &settings.data_source_id).await
}

/// Builds the site from a [`Config`] object, reading posts from `pages` and
/// their content from `blocks`. Posts whose content can't be fetched get the
/// not-found page; only configuration, template, catalogue and I/O errors
/// fail the build.
pub async fn build_site_from<P, B>(
    config: Config,
    pages: &P,
    blocks: &B,
    data_source_id: &str,
) -> Result<()>
where
    P: PageSource + ?Sized,
    B: BlockSource + ?Sized,
{
    // Parse the templates first so a broken theme fails before any fetching.
    let index_template = parse_template(config.index_template.iter())?;
    let posts_template = parse_template(config.posts_template.iter())?;
    let not_found_template = match config.not_found_template.is_empty() {
        true => template_from_str(DEFAULT_NOT_FOUND)?,
        false => parse_template(config.not_found_template.iter())?,
    };

    let summaries = fetch_post_list(pages, data_source_id).await?;
    log::info!("found {} published posts", summaries.len());

    let mut articles = Vec::with_capacity(summaries.len());
    let mut file_slugs: HashSet<String> = HashSet::new();
    for summary in &summaries {
        let (slug, file_slug) = match summary.slug.as_deref() {
            Some(raw) if !slug::slugify(raw).is_empty() => (raw, slug::slugify(raw)),
            _ => {
                log::warn!("skipping post {} ({}): no slug", summary.id, summary.title);
                continue;
            }
        };
        if !file_slugs.insert(file_slug.clone()) {
            log::warn!(
                "skipping post {} ({}): slug `{}` collides with a newer post's file `{}.html`",
                summary.id,
                summary.title,
                slug,
                file_slug
            );
            continue;
        }
        let content = match fetch_post_detail(pages, blocks, data_source_id, slug).await {
            Ok(post) => Some(post),
            Err(err) => {
                log::error!("Failed to fetch post {}: {}", slug, err);
                None
            }
        };
        articles.push(article(&config, summary, file_slug, content)?);
    }

    // Blow away the old output directories so we don't have any collisions.
    // The root output directory itself is left alone in case the user passed
    // the wrong directory.
    rmdir(&config.posts_output_directory)?;
    rmdir(&config.index_output_directory)?;
    rmdir(&config.static_output_directory)?;

    let writer = Writer {
        posts_template: &posts_template,
        index_template: &index_template,
        not_found_template: &not_found_template,
        index_page_size: config.index_page_size,
        index_base_url: &config.index_url,
        index_output_directory: &config.index_output_directory,
        site_title: &config.title,
        home_page: &config.home_page,
        static_url: &config.static_url,
        atom_url: &config.atom_url,
    };
    writer.write_articles(&articles)?;
    log::info!(
        "wrote {} posts to {}",
        articles.len(),
        config.root_output_directory.display()
    );

    copy_dir(
        &config.static_source_directory,
        &config.static_output_directory,
    )?;

    // copy /pages/index.html to /index.html
    let _ = std::fs::copy(
        &config.index_output_directory.join("index.html"),
        &config.root_output_directory.join("index.html"),
    )?;

    write_feed(
        FeedConfig {
            title: config.title,
            id: config.home_page.to_string(),
            author: config.author,
            home_page: config.home_page.to_string(),
        },
        &articles,
        File::create(config.root_output_directory.join("feed.atom"))?,
    )?;

    Ok(())
}

/// Fetches the post with `slug` and renders its body to HTML.
pub async fn render_post<P, B>(
    pages: &P,
    blocks: &B,
    data_source_id: &str,
    slug: &str,
) -> Result<String>
where
    P: PageSource + ?Sized,
    B: BlockSource + ?Sized,
{
    let post = fetch_post_detail(pages, blocks, data_source_id, slug).await?;
    Ok(blocks_to_html(&post.blocks)?)
}

fn article(
    config: &Config,
    summary: &PostSummary,
    slug: String,
    content: Option<post::Post>,
) -> Result<Article> {
    let file_name = format!("{}.html", slug);
    let (title, categories, created_date, updated_date, body, excerpt) = match content {
        Some(post) => (
            post.title,
            post.categories,
            post.created_date,
            post.updated_date,
            Some(blocks_to_html(&post.blocks)?),
            first_paragraph(&post.blocks),
        ),
        None => (
            summary.title.clone(),
            summary.categories.clone(),
            summary.created_date.clone(),
            summary.updated_date.clone(),
            None,
            String::new(),
        ),
    };

    Ok(Article {
        url: config.posts_url.join(&file_name)?,
        file_path: config.posts_output_directory.join(&file_name),
        tags: tags(&config.index_url, &categories),
        created: format_date(created_date.as_deref()),
        date: format_date(updated_date.as_deref().or_else(|| created_date.as_deref())),
        created_date,
        summary: excerpt,
        title,
        body,
        slug,
    })
}

// The plain text of the first non-empty top-level paragraph.
fn first_paragraph(blocks: &[Block]) -> String {
    blocks
        .iter()
        .filter(|block| matches!(block.parent, Parent::Document(_)))
        .filter_map(|block| match &block.kind {
            BlockKind::Paragraph { text } => Some(plain_text(text)),
            _ => None,
        })
        .map(|text| text.trim().to_owned())
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

// Copies `src` into `dst` recursively. A missing `src` is not an error: not
// every theme ships static assets.
fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    if !src.exists() {
        return Ok(());
    }
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| Error::CopyStatic(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| Error::CopyStatic(std::io::ErrorKind::InvalidInput.into()))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        if !contents.is_empty() {
            contents.push('\n');
        }
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
    }
    template_from_str(&contents)
}

fn template_from_str(contents: &str) -> Result<Template> {
    let mut template = Template::default();
    template
        .parse(contents)
        .map_err(|e| Error::ParseTemplate(e.to_string()))?;
    Ok(template)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during fetching,
/// writing, cleaning output directories, parsing template files, and other
/// I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned when the API client can't be set up.
    Client(client::Error),

    /// Returned when the post list (or, when rendering a single post, the
    /// post) can't be fetched.
    Post(post::Error),

    /// Returned for errors writing pages to disk as HTML files.
    Write(WriteError),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for problems copying the static theme assets.
    CopyStatic(std::io::Error),

    /// Returned when a post URL can't be built.
    Url(url::ParseError),

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Client(err) => err.fmt(f),
            Error::Post(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::CopyStatic(err) => write!(f, "Copying static assets: {}", err),
            Error::Url(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Client(err) => Some(err),
            Error::Post(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::CopyStatic(err) => Some(err),
            Error::Url(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<client::Error> for Error {
    /// Converts [`client::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: client::Error) -> Error {
        Error::Client(err)
    }
}

impl From<post::Error> for Error {
    /// Converts [`post::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: post::Error) -> Error {
        Error::Post(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts [`url::ParseError`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}
