use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no password found for {0}")]
    NotFound(String),

    #[error("failed to read credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("password prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Where the database password comes from. There is no fallback between
/// sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Masked terminal prompt.
    Prompt,
    /// `~/.pgpass` (or `$PGPASSFILE`).
    PgPass,
    /// `$PGPASSWORD`.
    Env,
}

/// Connection parameters a password is looked up by.
#[derive(Debug, Clone, Copy)]
pub struct CredentialKey<'a> {
    pub host: &'a str,
    pub port: u16,
    pub dbname: &'a str,
    pub user: &'a str,
}

impl std::fmt::Display for CredentialKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.dbname)
    }
}

pub fn resolve_password(source: CredentialSource, key: CredentialKey<'_>) -> Result<String, CredentialError> {
    match source {
        CredentialSource::Prompt => {
            let password = dialoguer::Password::new()
                .with_prompt(format!("Enter password for {}@{}", key.user, key.host))
                .allow_empty_password(true)
                .interact()?;
            Ok(password)
        }
        CredentialSource::PgPass => {
            let path = pgpass_path().ok_or_else(|| CredentialError::NotFound(key.to_string()))?;
            let contents = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(CredentialError::NotFound(format!("{key} ({} missing)", path.display())));
                }
                Err(source) => return Err(CredentialError::Io { path, source }),
            };
            tracing::debug!(path = %path.display(), "Looking up password in credential file");
            lookup_pgpass(&contents, key).ok_or_else(|| CredentialError::NotFound(key.to_string()))
        }
        CredentialSource::Env => {
            std::env::var("PGPASSWORD").map_err(|_| CredentialError::NotFound(format!("{key} (PGPASSWORD unset)")))
        }
    }
}

/// `$PGPASSFILE`, else `~/.pgpass`.
pub fn pgpass_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("PGPASSFILE") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".pgpass"))
}

/// First matching password in pgpass-format text.
///
/// Lines are `host:port:database:username:password`; `*` matches anything
/// in the first four fields and `\` escapes `:` or `\`.
pub fn lookup_pgpass(contents: &str, key: CredentialKey<'_>) -> Option<String> {
    let port = key.port.to_string();
    let wanted = [key.host, port.as_str(), key.dbname, key.user];

    contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .filter_map(split_entry)
        .find(|(fields, _)| {
            fields
                .iter()
                .zip(wanted.iter())
                .all(|(field, want)| field == "*" || field == want)
        })
        .map(|(_, password)| password)
}

/// Split one line into its four key fields and the password.
fn split_entry(line: &str) -> Option<([String; 4], String)> {
    let mut fields: Vec<String> = Vec::with_capacity(5);
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ':' if fields.len() < 4 => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if fields.len() < 4 {
        return None;
    }
    let key: [String; 4] = fields.try_into().ok()?;
    Some((key, current))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CredentialKey<'static> {
        CredentialKey {
            host: "dev-pgsql01.example.com",
            port: 5432,
            dbname: "nba_stat",
            user: "loader",
        }
    }

    #[test]
    fn test_exact_match() {
        let contents = "dev-pgsql01.example.com:5432:nba_stat:loader:s3cret\n";
        assert_eq!(lookup_pgpass(contents, key()), Some("s3cret".into()));
    }

    #[test]
    fn test_first_match_wins_and_wildcards() {
        let contents = "\
# comment line
other-host:5432:nba_stat:loader:wrong

*:5432:*:loader:wild
dev-pgsql01.example.com:5432:nba_stat:loader:too-late
";
        assert_eq!(lookup_pgpass(contents, key()), Some("wild".into()));
    }

    #[test]
    fn test_escapes() {
        let contents = r"dev-pgsql01.example.com:5432:nba_stat:loader:pa\:ss\\word";
        assert_eq!(lookup_pgpass(contents, key()), Some(r"pa:ss\word".into()));

        let escaped_user = r"*:*:*:lo\:ader:x";
        let k = CredentialKey { user: "lo:ader", ..key() };
        assert_eq!(lookup_pgpass(escaped_user, k), Some("x".into()));
    }

    #[test]
    fn test_unescaped_colon_in_password_kept() {
        let contents = "*:*:*:*:a:b";
        assert_eq!(lookup_pgpass(contents, key()), Some("a:b".into()));
    }

    #[test]
    fn test_no_match_and_malformed() {
        let contents = "dev-pgsql01.example.com:5433:nba_stat:loader:x\nnot-a-valid-line\n";
        assert_eq!(lookup_pgpass(contents, key()), None);
    }

    #[test]
    fn test_resolve_from_pgpass_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pgpass");
        fs::write(&path, "*:5432:nba_stat:loader:from-file\n").unwrap();

        // Both pgpass cases run in this one test so PGPASSFILE is never
        // changed concurrently by another test.
        std::env::set_var("PGPASSFILE", &path);
        let found = resolve_password(CredentialSource::PgPass, key());
        std::env::set_var("PGPASSFILE", dir.path().join("missing"));
        let missing = resolve_password(CredentialSource::PgPass, key());
        std::env::remove_var("PGPASSFILE");

        assert_eq!(found.unwrap(), "from-file");
        assert!(matches!(missing, Err(CredentialError::NotFound(_))));
    }
}
