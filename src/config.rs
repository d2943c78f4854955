//! Loads the site configuration: the project file (`blockpress.yaml`), the
//! theme file (`theme/theme.yaml`), and the Notion API settings from the
//! environment.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

const PROJECT_FILE: &str = "blockpress.yaml";

/// Environment variable holding the Notion integration token.
pub const API_KEY_VAR: &str = "NOTION_API_KEY";

/// Environment variable holding the id of the data source listing posts.
pub const DATA_SOURCE_VAR: &str = "NOTION_DATA_SOURCE_ID";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct Project {
    pub title: String,
    pub site_root: Url,
    pub home_page: String,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub index_page_size: PageSize,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,
    posts_template: Vec<PathBuf>,
    #[serde(default)]
    not_found_template: Vec<PathBuf>,
}

/// Settings for the Notion API connection. Read once at startup and passed
/// to whatever needs them.
#[derive(Clone)]
pub struct NotionSettings {
    pub api_key: String,
    pub data_source_id: String,
}

impl NotionSettings {
    /// Reads the settings from the process environment, failing if either
    /// variable is missing or blank.
    pub fn from_env() -> Result<NotionSettings> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<NotionSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| -> Result<String> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => {
                    Ok(value.trim().to_owned())
                }
                _ => Err(anyhow!("Missing required environment variable `{}`", name)),
            }
        };
        Ok(NotionSettings {
            api_key: require(API_KEY_VAR)?,
            data_source_id: require(DATA_SOURCE_VAR)?,
        })
    }
}

impl std::fmt::Debug for NotionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("NotionSettings")
            .field("api_key", &"<redacted>")
            .field("data_source_id", &self.data_source_id)
            .finish()
    }
}

pub struct Config {
    pub title: String,
    pub author: Option<Author>,
    pub home_page: Url,
    pub index_url: Url,
    pub index_template: Vec<PathBuf>,
    pub index_output_directory: PathBuf,
    pub index_page_size: usize,
    pub posts_url: Url,
    pub posts_template: Vec<PathBuf>,
    pub posts_output_directory: PathBuf,
    pub not_found_template: Vec<PathBuf>,
    pub static_url: Url,
    pub static_source_directory: PathBuf,
    pub static_output_directory: PathBuf,
    pub root_output_directory: PathBuf,
    pub atom_url: Url,
}

impl Config {
    /// Looks for `blockpress.yaml` in `dir` and then in each of its
    /// ancestors.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            match Config::from_project_file(&path, output_directory) {
                Ok(config) => Ok(config),
                Err(e) => Err(anyhow!("Loading configuration: {:?}", e)),
            }
        } else {
            match dir.parent() {
                Some(dir) => Config::from_directory(dir, output_directory),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        if project.index_page_size.0 < 1 {
            return Err(anyhow!("`index_page_size` must be at least 1"));
        }
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;

        let theme_dir = project_root.join("theme");
        let theme: Theme =
            serde_yaml::from_reader(open(&theme_dir.join("theme.yaml"), "theme")?)?;
        let theme_paths = |paths: Vec<PathBuf>| -> Vec<PathBuf> {
            paths.iter().map(|relpath| theme_dir.join(relpath)).collect()
        };

        // A trailing slash makes `Url::join` treat the root as a directory.
        let mut site_root = project.site_root;
        if !site_root.path().ends_with('/') {
            site_root.set_path(&format!("{}/", site_root.path()));
        }

        Ok(Config {
            title: project.title,
            author: project.author,
            home_page: site_root.join(&project.home_page)?,
            index_url: site_root.join("pages/")?,
            posts_url: site_root.join("posts/")?,
            static_url: site_root.join("static/")?,
            atom_url: site_root.join("feed.atom")?,
            index_template: theme_paths(theme.index_template),
            posts_template: theme_paths(theme.posts_template),
            not_found_template: theme_paths(theme.not_found_template),
            index_output_directory: output_directory.join("pages"),
            posts_output_directory: output_directory.join("posts"),
            static_source_directory: theme_dir.join("static"),
            static_output_directory: output_directory.join("static"),
            root_output_directory: output_directory.to_owned(),
            index_page_size: project.index_page_size.0,
        })
    }
}

fn open(path: &Path, kind: &str) -> Result<File> {
    match File::open(path) {
        Err(e) => Err(anyhow!("Opening {} file `{}`: {}", kind, path.display(), e)),
        Ok(file) => Ok(file),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_settings_require_both_variables() {
        let settings = NotionSettings::from_lookup(lookup(&[
            (API_KEY_VAR, " secret "),
            (DATA_SOURCE_VAR, "ds"),
        ]))
        .unwrap();
        assert_eq!("secret", settings.api_key);
        assert_eq!("ds", settings.data_source_id);
        assert!(!format!("{:?}", settings).contains("secret"));

        assert!(NotionSettings::from_lookup(lookup(&[(API_KEY_VAR, "k")])).is_err());
        assert!(NotionSettings::from_lookup(lookup(&[
            (API_KEY_VAR, "  "),
            (DATA_SOURCE_VAR, "ds"),
        ]))
        .is_err());
    }

    #[test]
    fn test_from_directory_walks_up() -> Result<()> {
        let root = std::env::temp_dir()
            .join(format!("blockpress-config-{}", std::process::id()));
        let nested = root.join("a/b");
        fs::create_dir_all(&nested)?;
        fs::create_dir_all(root.join("theme"))?;
        fs::write(
            root.join(PROJECT_FILE),
            "title: Blog\nsite_root: https://example.org/blog\nhome_page: pages/index.html\n",
        )?;
        fs::write(
            root.join("theme/theme.yaml"),
            "index_template: [base.html, index.html]\nposts_template: [base.html, post.html]\n",
        )?;

        let config = Config::from_directory(&nested, Path::new("/tmp/out"))?;
        fs::remove_dir_all(&root)?;

        assert_eq!("Blog", config.title);
        assert_eq!(10, config.index_page_size);
        assert_eq!(
            "https://example.org/blog/pages/index.html",
            config.home_page.as_str()
        );
        assert_eq!("https://example.org/blog/posts/", config.posts_url.as_str());
        assert_eq!(
            vec![root.join("theme/base.html"), root.join("theme/index.html")],
            config.index_template
        );
        assert!(config.not_found_template.is_empty());
        assert_eq!(PathBuf::from("/tmp/out/posts"), config.posts_output_directory);
        Ok(())
    }
}
