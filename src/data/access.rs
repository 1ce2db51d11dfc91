//! Line-oriented user state: the authorized user list and per-user language preferences.
//! Both load once at startup and append a line per write, so the files double as an audit trail.

use std::collections::{BTreeSet, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::i18n::Locale;

pub const DEFAULT_ACCESS_LIST_PATH: &str = "data/authorized_users.txt";
pub const DEFAULT_LANGUAGE_PREFS_PATH: &str = "data/user_languages.tsv";

fn append_line(path: &Path, line: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    file.sync_all()
}

fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

/// User ids allowed to submit reports, one id per line.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    path: PathBuf,
    ids: BTreeSet<i64>,
}

impl AccessList {
    /// Missing file means an empty list. Lines that are not ids are skipped with a warning.
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut ids = BTreeSet::new();
        for line in read_lines(&path)? {
            match line.parse::<i64>() {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(_) => log::warn!("ignoring malformed user id '{line}' in {}", path.display()),
            }
        }
        Ok(AccessList { path, ids })
    }

    pub fn is_authorized(&self, user_id: i64) -> bool {
        self.ids.contains(&user_id)
    }

    /// Adds `user_id`; returns `false` without touching the file when it was already present.
    pub fn authorize(&mut self, user_id: i64) -> io::Result<bool> {
        if self.ids.contains(&user_id) {
            return Ok(false);
        }
        append_line(&self.path, &user_id.to_string())?;
        self.ids.insert(user_id);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Preferred reply locale per user, stored as `user_id<TAB>locale`. Later lines win.
#[derive(Debug, Clone, Default)]
pub struct LanguagePrefs {
    path: PathBuf,
    by_user: HashMap<i64, Locale>,
}

impl LanguagePrefs {
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut by_user = HashMap::new();
        for line in read_lines(&path)? {
            let parsed = line.split_once('\t').and_then(|(id, code)| {
                Some((id.trim().parse::<i64>().ok()?, Locale::from_code(code)?))
            });
            match parsed {
                Some((id, locale)) => {
                    by_user.insert(id, locale);
                }
                None => log::warn!("ignoring malformed language entry '{line}'"),
            }
        }
        Ok(LanguagePrefs { path, by_user })
    }

    pub fn get(&self, user_id: i64) -> Option<Locale> {
        self.by_user.get(&user_id).copied()
    }

    pub fn set(&mut self, user_id: i64, locale: Locale) -> io::Result<()> {
        if self.get(user_id) == Some(locale) {
            return Ok(());
        }
        append_line(&self.path, &format!("{user_id}\t{}", locale.code()))?;
        self.by_user.insert(user_id, locale);
        Ok(())
    }

    /// Stored preference, else the locale detected from the client language tag.
    pub fn resolve(&self, user_id: Option<i64>, language_code: Option<&str>) -> Locale {
        user_id
            .and_then(|id| self.get(id))
            .unwrap_or_else(|| Locale::detect(language_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_list_round_trips_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("users.txt");
        fs::write(&path, "# admins\n42\nnot-a-number\n\n7\n").expect("fixture");

        let mut list = AccessList::load(&path).expect("load");
        assert_eq!(list.len(), 2);
        assert!(list.is_authorized(42));
        assert!(!list.is_authorized(8));

        assert!(list.authorize(8).expect("append"));
        assert!(!list.authorize(8).expect("already present"));

        let reloaded = AccessList::load(&path).expect("reload");
        assert!(reloaded.is_authorized(8));
        assert_eq!(reloaded.len(), 3);
    }

    #[test]
    fn missing_access_list_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let list = AccessList::load(dir.path().join("absent.txt")).expect("load");
        assert!(list.is_empty());
    }

    #[test]
    fn language_prefs_last_line_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("langs.tsv");
        let mut prefs = LanguagePrefs::load(&path).expect("load");
        prefs.set(5, Locale::Es).expect("set");
        prefs.set(5, Locale::Ru).expect("set");

        let reloaded = LanguagePrefs::load(&path).expect("reload");
        assert_eq!(reloaded.get(5), Some(Locale::Ru));
    }

    #[test]
    fn resolve_prefers_stored_choice_over_client_language() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut prefs = LanguagePrefs::load(dir.path().join("langs.tsv")).expect("load");
        prefs.set(1, Locale::Ru).expect("set");
        assert_eq!(prefs.resolve(Some(1), Some("es")), Locale::Ru);
        assert_eq!(prefs.resolve(Some(2), Some("es-MX")), Locale::Es);
        assert_eq!(prefs.resolve(None, None), Locale::En);
    }
}
