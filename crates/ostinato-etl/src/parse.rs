//! Row-level parsing of the delimited source files.
//!
//! Each file has one header line (skipped) and one record per line,
//! tab- or comma-delimited depending on how the dataset was packaged.
//! The tag file carries bytes outside plain ASCII, so lines are read
//! as bytes and decoded as UTF-8 with a Latin-1 fallback.

use std::path::Path;

use ostinato_core::model::{Artist, Friendship, ListenEvent, Tag, TaggingEvent};

use crate::error::{ImportError, ImportResult};

/// Decode one raw line: UTF-8 when valid, Latin-1 otherwise.
///
/// In Latin-1 every byte maps directly to the code point of the same
/// value, so the fallback can never fail; it just may read mojibake
/// for other encodings, which is the source data's problem to report,
/// not ours to guess at.
#[must_use]
pub fn decode_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Read a source file into decoded lines, CR/LF stripped.
pub fn read_source(path: &Path) -> ImportResult<Vec<String>> {
    if !path.is_file() {
        return Err(ImportError::MissingSourceFile(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    Ok(bytes
        .split(|&b| b == b'\n')
        .map(|line| decode_line(line).trim_end_matches('\r').to_string())
        .collect())
}

/// Pick the field delimiter from the header line: tab when present,
/// comma otherwise.
#[must_use]
pub fn sniff_delimiter(header: &str) -> char {
    if header.contains('\t') {
        '\t'
    } else {
        ','
    }
}

fn malformed(file: &str, line: usize, reason: impl Into<String>) -> ImportError {
    ImportError::MalformedRow {
        file: file.to_string(),
        line,
        reason: reason.into(),
    }
}

fn require<'a>(
    fields: &[&'a str],
    idx: usize,
    name: &str,
    file: &str,
    line: usize,
) -> ImportResult<&'a str> {
    fields
        .get(idx)
        .copied()
        .ok_or_else(|| malformed(file, line, format!("missing field `{name}`")))
}

fn int_field(fields: &[&str], idx: usize, name: &str, file: &str, line: usize) -> ImportResult<i64> {
    let raw = require(fields, idx, name, file, line)?;
    raw.trim()
        .parse()
        .map_err(|_| malformed(file, line, format!("field `{name}` is not an integer: {raw:?}")))
}

fn optional_text(fields: &[&str], idx: usize) -> Option<String> {
    fields
        .get(idx)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// `artists.dat`: `id, name, url, pictureURL`.
pub fn parse_artist(fields: &[&str], file: &str, line: usize) -> ImportResult<Artist> {
    let id = int_field(fields, 0, "id", file, line)?;
    let name = require(fields, 1, "name", file, line)?.trim();
    if name.is_empty() {
        return Err(malformed(file, line, "field `name` is empty"));
    }
    let mut artist = Artist::new(id, name);
    if let Some(url) = optional_text(fields, 2) {
        artist = artist.with_url(url);
    }
    if let Some(picture_url) = optional_text(fields, 3) {
        artist = artist.with_picture_url(picture_url);
    }
    Ok(artist)
}

/// `tags.dat`: `tagID, tagValue`.
pub fn parse_tag(fields: &[&str], file: &str, line: usize) -> ImportResult<Tag> {
    let tag_id = int_field(fields, 0, "tagID", file, line)?;
    let value = require(fields, 1, "tagValue", file, line)?.trim();
    if value.is_empty() {
        return Err(malformed(file, line, "field `tagValue` is empty"));
    }
    Ok(Tag::new(tag_id, value))
}

/// `user_artists.dat`: `userID, artistID, weight`.
pub fn parse_listen(fields: &[&str], file: &str, line: usize) -> ImportResult<ListenEvent> {
    let user_id = int_field(fields, 0, "userID", file, line)?;
    let artist_id = int_field(fields, 1, "artistID", file, line)?;
    let weight = int_field(fields, 2, "weight", file, line)?;
    if weight < 0 {
        return Err(malformed(file, line, format!("negative weight: {weight}")));
    }
    Ok(ListenEvent::new(user_id, artist_id, weight))
}

/// `user_taggedartists.dat`: `userID, artistID, tagID, timestamp`.
///
/// The timestamp must be present and numeric; whether it decodes into
/// a calendar date is not a validity question, the row is kept either
/// way.
pub fn parse_tagging(fields: &[&str], file: &str, line: usize) -> ImportResult<TaggingEvent> {
    let user_id = int_field(fields, 0, "userID", file, line)?;
    let artist_id = int_field(fields, 1, "artistID", file, line)?;
    let tag_id = int_field(fields, 2, "tagID", file, line)?;
    let timestamp = int_field(fields, 3, "timestamp", file, line)?;
    Ok(TaggingEvent::new(user_id, artist_id, tag_id, timestamp))
}

/// `user_friends.dat`: `userID, friendID`.
pub fn parse_friendship(fields: &[&str], file: &str, line: usize) -> ImportResult<Friendship> {
    let user_id = int_field(fields, 0, "userID", file, line)?;
    let friend_id = int_field(fields, 1, "friendID", file, line)?;
    Ok(Friendship::new(user_id, friend_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_utf8() {
        assert_eq!(decode_line("música".as_bytes()), "música");
    }

    #[test]
    fn test_decode_line_latin1_fallback() {
        // "pop francés" with Latin-1 encoded e-acute (0xE9)
        let raw = b"pop franc\xe9s";
        assert_eq!(decode_line(raw), "pop francés");
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("id\tname\turl"), '\t');
        assert_eq!(sniff_delimiter("id,name,url"), ',');
    }

    #[test]
    fn test_parse_artist_optional_fields_may_be_empty() {
        let artist = parse_artist(&["7", "MALICE MIZER", "", ""], "artists.dat", 2).unwrap();
        assert_eq!(artist.id, 7);
        assert!(artist.url.is_none());
        assert!(artist.picture_url.is_none());
    }

    #[test]
    fn test_parse_artist_full_row_keeps_urls() {
        let artist = parse_artist(
            &[
                "1",
                "Kraftwerk",
                "http://www.last.fm/music/Kraftwerk",
                "http://userserve-ak.last.fm/serve/252/1.jpg",
            ],
            "artists.dat",
            2,
        )
        .unwrap();
        assert_eq!(artist.url.as_deref(), Some("http://www.last.fm/music/Kraftwerk"));
        assert_eq!(
            artist.picture_url.as_deref(),
            Some("http://userserve-ak.last.fm/serve/252/1.jpg")
        );
    }

    #[test]
    fn test_parse_artist_missing_name_is_malformed() {
        let err = parse_artist(&["7"], "artists.dat", 2).unwrap_err();
        assert!(matches!(err, ImportError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_parse_listen_rejects_non_numeric_weight() {
        let err = parse_listen(&["2", "51", "lots"], "user_artists.dat", 3).unwrap_err();
        assert!(matches!(err, ImportError::MalformedRow { .. }));
    }

    #[test]
    fn test_parse_listen_rejects_negative_weight() {
        let err = parse_listen(&["2", "51", "-4"], "user_artists.dat", 3).unwrap_err();
        assert!(matches!(err, ImportError::MalformedRow { .. }));
    }

    #[test]
    fn test_parse_tagging_zero_timestamp_is_kept_undated() {
        let event = parse_tagging(&["2", "52", "13", "0"], "user_taggedartists.dat", 2).unwrap();
        assert_eq!(event.timestamp, 0);
        assert!(event.date.is_none());
    }
}
