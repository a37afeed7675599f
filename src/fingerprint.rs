//! Deriving a stable identifier for a file, used as the handle store's lookup key.

/// Replace every run of non-word characters (anything outside `[A-Za-z0-9_]`) in `path` with a
/// single `.`. Stable across runs for the same path; callers needing collision-proof
/// fingerprints for distinct files with the same path text must supply their own.
pub fn derive_fingerprint(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut in_run = false;
    for c in path.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('.');
            in_run = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_path() {
        assert_eq!(derive_fingerprint("/home/user/file.txt"), ".home.user.file.txt");
    }

    #[test]
    fn collapses_runs() {
        assert_eq!(derive_fingerprint("a//b  c"), "a.b.c");
    }

    #[test]
    fn word_chars_preserved() {
        assert_eq!(derive_fingerprint("my_file_123"), "my_file_123");
    }

    #[test]
    fn stable_across_calls() {
        let a = derive_fingerprint("C:\\Users\\me\\video.mp4");
        let b = derive_fingerprint("C:\\Users\\me\\video.mp4");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_path() {
        assert_eq!(derive_fingerprint(""), "");
    }
}
