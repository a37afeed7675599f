//! Building the protocol's `Upload-Metadata` header value.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Encode `metadata` as a comma-separated sequence of `"<key> <base64(utf8(value))>"` entries.
///
/// No separator escaping is performed — keys must be free of spaces and commas, which is the
/// caller's responsibility. If `metadata` lacks a `filename` key, one is injected from the last
/// path segment of `default_filename_source` before encoding. Entry order is unspecified.
pub fn encode_metadata(metadata: &HashMap<String, String>, default_filename_source: &str) -> String {
    let mut metadata = metadata.clone();
    metadata.entry("filename".to_owned()).or_insert_with(|| last_path_segment(default_filename_source));

    metadata
        .iter()
        .map(|(key, value)| format!("{key} {}", BASE64.encode(value.as_bytes())))
        .collect::<Vec<_>>()
        .join(",")
}

fn last_path_segment(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_entry(entry: &str) -> (String, String) {
        let (key, value) = entry.split_once(' ').expect("entry must have a key and a value");
        let decoded = BASE64.decode(value).expect("value must be valid base64");
        (key.to_owned(), String::from_utf8(decoded).expect("value must be valid utf-8"))
    }

    #[test]
    fn round_trips_each_entry() {
        let mut meta = HashMap::new();
        meta.insert("filetype".to_owned(), "image/jpeg".to_owned());
        meta.insert("caption".to_owned(), "héllo wörld".to_owned());
        let encoded = encode_metadata(&meta, "/tmp/pic.jpg");

        let mut seen = HashMap::new();
        for entry in encoded.split(',') {
            let (k, v) = decode_entry(entry);
            seen.insert(k, v);
        }

        assert_eq!(seen.get("filetype").map(String::as_str), Some("image/jpeg"));
        assert_eq!(seen.get("caption").map(String::as_str), Some("héllo wörld"));
        assert_eq!(seen.get("filename").map(String::as_str), Some("pic.jpg"));
    }

    #[test]
    fn injects_default_filename_only_when_absent() {
        let mut meta = HashMap::new();
        meta.insert("filename".to_owned(), "custom-name.bin".to_owned());
        let encoded = encode_metadata(&meta, "/tmp/pic.jpg");
        let (_, filename) = decode_entry(&encoded);
        assert_eq!(filename, "custom-name.bin");
    }

    #[test]
    fn default_filename_uses_last_path_segment() {
        assert_eq!(last_path_segment("/a/b/c.mp4"), "c.mp4");
        assert_eq!(last_path_segment(r"C:\a\b\c.mp4"), "c.mp4");
        assert_eq!(last_path_segment("just-a-name"), "just-a-name");
    }

    #[test]
    fn empty_metadata_still_gets_filename() {
        let meta = HashMap::new();
        let encoded = encode_metadata(&meta, "/tmp/x.bin");
        assert_eq!(encoded, "filename eC5iaW4=");
    }
}
