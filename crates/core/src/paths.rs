//! Slash-form path normalization.
//!
//! Paths are handled as strings so results do not depend on the host.
//! Backslashes are separators in Windows-form paths (drive or UNC prefix, or
//! any path on a Windows host) and ordinary file-name characters elsewhere.
//! `.` and `..` are resolved lexically, and a root is `/`, a drive (`C:`) or
//! a UNC share (`//server/share`). Two paths are only made relative to each
//! other when their roots match.

use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Root {
    /// No root: a relative path.
    None,
    Unix,
    Drive(char),
    Unc { server: String, share: String },
}

impl Root {
    fn same_volume(&self, other: &Root) -> bool {
        match (self, other) {
            (Root::Unc { server: a, share: b }, Root::Unc { server: c, share: d }) => {
                a.eq_ignore_ascii_case(c) && b.eq_ignore_ascii_case(d)
            }
            (a, b) => a == b,
        }
    }
}

#[derive(Debug, Clone)]
struct SlashPath {
    root: Root,
    parts: Vec<String>,
}

impl SlashPath {
    fn parse(raw: &str) -> Self {
        let text = if is_windows_form(raw) {
            raw.replace('\\', "/")
        } else {
            raw.to_string()
        };

        let (root, rest) = if let Some(unc) = text.strip_prefix("//") {
            let mut pieces = unc.splitn(3, '/');
            let server = pieces.next().unwrap_or_default().to_string();
            let share = pieces.next().unwrap_or_default().to_string();
            let rest = pieces.next().unwrap_or_default().to_string();
            (Root::Unc { server, share }, rest)
        } else if let Some(letter) = drive_letter(&text) {
            (Root::Drive(letter), text[2..].to_string())
        } else if let Some(rest) = text.strip_prefix('/') {
            (Root::Unix, rest.to_string())
        } else {
            (Root::None, text.clone())
        };

        let mut parts: Vec<String> = Vec::new();
        for part in rest.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    if parts.last().is_some_and(|p| p != "..") {
                        parts.pop();
                    } else if root == Root::None {
                        parts.push("..".to_string());
                    }
                }
                other => parts.push(other.to_string()),
            }
        }

        Self { root, parts }
    }

    fn render(&self) -> String {
        let joined = self.parts.join("/");
        match &self.root {
            Root::None if joined.is_empty() => ".".to_string(),
            Root::None => joined,
            Root::Unix => format!("/{}", joined),
            Root::Drive(letter) => format!("{}:/{}", letter, joined),
            Root::Unc { server, share } if joined.is_empty() => format!("//{}/{}", server, share),
            Root::Unc { server, share } => format!("//{}/{}/{}", server, share, joined),
        }
    }
}

fn is_windows_form(raw: &str) -> bool {
    cfg!(windows) || raw.starts_with(r"\\") || drive_letter(raw).is_some()
}

fn drive_letter(text: &str) -> Option<char> {
    let mut chars = text.chars();
    let letter = chars.next()?;
    if letter.is_ascii_alphabetic() && chars.next() == Some(':') {
        Some(letter.to_ascii_uppercase())
    } else {
        None
    }
}

/// Slash-form, lexically normalized rendering of a path.
pub fn to_slash(path: &Path) -> String {
    SlashPath::parse(&path.to_string_lossy()).render()
}

/// `path` relative to `base`, or `None` when they are not on the same root.
pub fn relative_to(path: &Path, base: &Path) -> Option<String> {
    let target = SlashPath::parse(&path.to_string_lossy());
    let base = SlashPath::parse(&base.to_string_lossy());

    if !target.root.same_volume(&base.root) {
        return None;
    }

    let common = target
        .parts
        .iter()
        .zip(base.parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    // A relative base that climbs out of itself cannot be inverted.
    if base.parts[common..].iter().any(|p| p == "..") {
        return None;
    }

    let mut parts: Vec<&str> = std::iter::repeat("..")
        .take(base.parts.len() - common)
        .collect();
    parts.extend(target.parts[common..].iter().map(String::as_str));

    if parts.is_empty() {
        Some(".".to_string())
    } else {
        Some(parts.join("/"))
    }
}

/// Path relative to `base` when possible, else the absolute slash form.
///
/// The absolute fallback covers paths on another volume than `base`;
/// downstream consumers accept either form.
pub fn normalize(path: &Path, base: &Path) -> String {
    match relative_to(path, base) {
        Some(relative) => relative,
        None => {
            let absolute = to_slash(path);
            warn!(
                path = %absolute,
                base = %to_slash(base),
                "Path is not on the same root as base, keeping absolute path"
            );
            absolute
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(Path::new("/media/videos/IPX-922.mp4")), "/media/videos/IPX-922.mp4");
        assert_eq!(to_slash(Path::new(r"H:\videos\IPX-922.mp4")), "H:/videos/IPX-922.mp4");
        assert_eq!(to_slash(Path::new("h:/videos/./a/../b.mp4")), "H:/videos/b.mp4");
        assert_eq!(to_slash(Path::new(r"\\nas\share\v\a.mp4")), "//nas/share/v/a.mp4");
        assert_eq!(to_slash(Path::new("covers//IPX-922.jpg")), "covers/IPX-922.jpg");
        assert_eq!(to_slash(Path::new("/../a")), "/a");
        assert_eq!(to_slash(Path::new("../a")), "../a");
        assert_eq!(to_slash(Path::new("")), ".");
    }

    #[test]
    fn test_backslash_in_unix_name_is_kept() {
        let path = Path::new(r"/media/odd\name/IPX-922.mp4");
        if cfg!(windows) {
            assert_eq!(to_slash(path), "/media/odd/name/IPX-922.mp4");
        } else {
            assert_eq!(to_slash(path), r"/media/odd\name/IPX-922.mp4");
            assert_eq!(
                relative_to(path, Path::new("/media")).as_deref(),
                Some(r"odd\name/IPX-922.mp4")
            );
            assert_eq!(to_slash(Path::new(r"covers\a.jpg")), r"covers\a.jpg");
        }
    }

    #[test]
    fn test_relative_under_base() {
        assert_eq!(
            relative_to(Path::new("/data/covers/IPX-922.jpg"), Path::new("/data")).as_deref(),
            Some("covers/IPX-922.jpg")
        );
        assert_eq!(
            relative_to(Path::new(r"D:\lib\covers\A.jpg"), Path::new("d:/lib/")).as_deref(),
            Some("covers/A.jpg")
        );
    }

    #[test]
    fn test_relative_sibling_uses_parent_steps() {
        assert_eq!(
            relative_to(Path::new("/data/covers/A.jpg"), Path::new("/data/app/bin")).as_deref(),
            Some("../../covers/A.jpg")
        );
    }

    #[test]
    fn test_relative_same_path_is_dot() {
        assert_eq!(relative_to(Path::new("/data"), Path::new("/data/")).as_deref(), Some("."));
    }

    #[test]
    fn test_cross_volume_has_no_relative() {
        assert_eq!(relative_to(Path::new("E:/covers/A.jpg"), Path::new("C:/app")), None);
        assert_eq!(relative_to(Path::new("/covers/A.jpg"), Path::new("C:/app")), None);
        assert_eq!(relative_to(Path::new("covers/A.jpg"), Path::new("/app")), None);
        assert_eq!(
            relative_to(Path::new("//nas/one/A.jpg"), Path::new("//nas/two")),
            None
        );
    }

    #[test]
    fn test_unc_share_compared_case_insensitively() {
        assert_eq!(
            relative_to(Path::new("//NAS/Media/c/A.jpg"), Path::new(r"\\nas\media")).as_deref(),
            Some("c/A.jpg")
        );
    }

    #[test]
    fn test_normalize_falls_back_to_absolute() {
        assert_eq!(
            normalize(Path::new(r"E:\covers\A.jpg"), Path::new("C:/app")),
            "E:/covers/A.jpg"
        );
        assert_eq!(
            normalize(Path::new("/srv/covers/A.jpg"), Path::new("/srv")),
            "covers/A.jpg"
        );
    }

    #[test]
    fn test_round_trip_through_base() {
        let cases = [
            ("/srv/media/covers/IPX-922.jpg", "/srv/media"),
            ("/srv/media/covers/IPX-922.jpg", "/srv/other/place"),
            ("C:/Users/me/covers/A.jpg", "C:/Users/me/app"),
            ("/a", "/"),
        ];
        for (path, base) in cases {
            let relative = normalize(Path::new(path), Path::new(base));
            assert!(!relative.starts_with('/'), "{relative} should be relative");
            let joined: PathBuf = Path::new(base).join(&relative);
            assert_eq!(to_slash(&joined), to_slash(Path::new(path)), "{path} from {base}");
        }
    }
}
