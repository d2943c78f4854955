//! Support for creating Atom feeds from a list of articles.

use crate::config::Author;
use crate::post::parse_date;
use crate::write::Article;
use atom_syndication::{Category, Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::fmt;
use std::io::Write;
use std::time::UNIX_EPOCH;

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub id: String,
    pub author: Option<Author>,
    pub home_page: String,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and a list of
/// [`Article`]s and writes the result to a [`std::io::Write`]. Articles
/// without a body are left out.
pub fn write_feed<W: Write>(config: FeedConfig, articles: &[Article], w: W) -> Result<()> {
    feed(config, articles).write_to(w)?;
    Ok(())
}

fn feed(config: FeedConfig, articles: &[Article]) -> Feed {
    let mut feed = Feed::default();
    feed.set_entries(feed_entries(&config, articles));
    feed.set_title(config.title);
    feed.set_id(config.id);
    feed.set_updated(Utc::now());
    feed.set_authors(author_to_people(config.author));
    feed.set_links(vec![alternate(config.home_page)]);
    feed
}

fn feed_entries(config: &FeedConfig, articles: &[Article]) -> Vec<Entry> {
    articles
        .iter()
        .filter(|article| article.body.is_some())
        .map(|article| {
            let date = entry_date(article.created_date.as_deref());
            let mut entry = Entry::default();
            entry.set_id(article.url.to_string());
            entry.set_title(article.title.clone());
            entry.set_updated(date);
            entry.set_published(Some(date));
            entry.set_authors(author_to_people(config.author.clone()));
            entry.set_links(vec![alternate(article.url.to_string())]);
            entry.set_categories(
                article
                    .tags
                    .iter()
                    .map(|tag| {
                        let mut category = Category::default();
                        category.set_term(tag.label.clone());
                        category
                    })
                    .collect::<Vec<_>>(),
            );
            if !article.summary.is_empty() {
                entry.set_summary(Some(Text::plain(article.summary.clone())));
            }
            entry
        })
        .collect()
}

// Date-only values are taken as midnight UTC. Entries without a usable date
// fall back to the Unix epoch so the feed stays valid.
fn entry_date(created_date: Option<&str>) -> DateTime<FixedOffset> {
    if let Some(value) = created_date {
        if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
            return datetime;
        }
    }
    match parse_date(created_date).and_then(|date| date.and_hms_opt(0, 0, 0)) {
        Some(naive) => Utc.from_utc_datetime(&naive).into(),
        None => DateTime::<Utc>::from(UNIX_EPOCH).into(),
    }
}

fn alternate(href: String) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

fn author_to_people(author: Option<Author>) -> Vec<Person> {
    match author {
        Some(author) => {
            let mut person = Person::default();
            person.set_name(author.name);
            person.set_email(author.email);
            vec![person]
        }
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}
