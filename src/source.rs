// src/source.rs - Opening plain, gzip and tar inputs as line sources
use crate::error::ConfigError;
use flate2::read::MultiGzDecoder;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Buffer size used for file readers
pub const BUFFER_SIZE: usize = 65536;

pub fn open_plain(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, file)))
}

/// Gzip files may hold several concatenated members; all are read.
pub fn open_gzip(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    Ok(Box::new(BufReader::with_capacity(
        BUFFER_SIZE,
        MultiGzDecoder::new(file),
    )))
}

pub fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

fn is_gzip_tarball(path: &Path) -> bool {
    let name = path.to_string_lossy().to_lowercase();
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Open a tar archive, transparently decompressing `.tar.gz` / `.tgz`.
pub fn open_archive(path: &Path) -> io::Result<tar::Archive<Box<dyn Read>>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if is_gzip_tarball(path) {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(tar::Archive::new(reader))
}

/// Shell-style wildcard over archive entry names.
///
/// `*` matches any run of characters except `/`, `?` a single such
/// character, `[...]` a character class (`[!...]` negated) and `\`
/// escapes the next character.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: String,
    regex: Regex,
}

impl GlobMatcher {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidGlob {
            pattern: pattern.to_string(),
            message: message.to_string(),
        };

        let mut regex_pattern = String::from("^");
        let mut chars = pattern.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '*' => regex_pattern.push_str("[^/]*"),
                '?' => regex_pattern.push_str("[^/]"),
                '\\' => {
                    let escaped = chars.next().ok_or_else(|| invalid("trailing escape"))?;
                    regex_pattern.push_str(&regex::escape(&escaped.to_string()));
                }
                '[' => {
                    let mut class = String::from("[");
                    if matches!(chars.peek(), Some('!') | Some('^')) {
                        chars.next();
                        class.push('^');
                    }
                    let mut closed = false;
                    let mut empty = true;
                    while let Some(inner) = chars.next() {
                        match inner {
                            ']' if !empty => {
                                closed = true;
                                break;
                            }
                            '\\' => {
                                let escaped =
                                    chars.next().ok_or_else(|| invalid("trailing escape"))?;
                                class.push('\\');
                                class.push(escaped);
                            }
                            '[' | '&' | '~' => {
                                class.push('\\');
                                class.push(inner);
                            }
                            _ => class.push(inner),
                        }
                        empty = false;
                    }
                    if !closed {
                        return Err(invalid("unclosed character class"));
                    }
                    class.push(']');
                    regex_pattern.push_str(&class);
                }
                _ => regex_pattern.push_str(&regex::escape(&ch.to_string())),
            }
        }
        regex_pattern.push('$');

        let regex = Regex::new(&regex_pattern).map_err(|e| invalid(&e.to_string()))?;
        Ok(GlobMatcher {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_glob_wildcards() {
        let glob = GlobMatcher::new("*.log").unwrap();
        assert!(glob.is_match("access.log"));
        assert!(!glob.is_match("access.log.1"));
        assert!(!glob.is_match("dir/access.log"));

        let glob = GlobMatcher::new("dir/access-?.log").unwrap();
        assert!(glob.is_match("dir/access-1.log"));
        assert!(!glob.is_match("dir/access-12.log"));
    }

    #[test]
    fn test_glob_classes() {
        let glob = GlobMatcher::new("part-[0-9].txt").unwrap();
        assert!(glob.is_match("part-3.txt"));
        assert!(!glob.is_match("part-x.txt"));

        let glob = GlobMatcher::new("part-[!0-9].txt").unwrap();
        assert!(glob.is_match("part-x.txt"));
        assert!(!glob.is_match("part-3.txt"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let glob = GlobMatcher::new("a+b(1).log").unwrap();
        assert!(glob.is_match("a+b(1).log"));
        assert!(!glob.is_match("aab1.log"));
    }

    #[test]
    fn test_invalid_glob() {
        assert!(matches!(
            GlobMatcher::new("logs/[abc"),
            Err(ConfigError::InvalidGlob { .. })
        ));
        assert!(matches!(
            GlobMatcher::new("trailing\\"),
            Err(ConfigError::InvalidGlob { .. })
        ));
    }

    #[test]
    fn test_open_gzip_reads_lines() {
        let mut file = NamedTempFile::new().unwrap();
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"first\nsecond\n").unwrap();
        file.write_all(&encoder.finish().unwrap()).unwrap();

        let reader = open_gzip(file.path()).unwrap();
        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_gzip_path_detection() {
        assert!(is_gzip_path(Path::new("access.log.GZ")));
        assert!(!is_gzip_path(Path::new("access.log")));
        assert!(is_gzip_tarball(Path::new("logs.tgz")));
        assert!(!is_gzip_tarball(Path::new("logs.tar")));
    }
}
