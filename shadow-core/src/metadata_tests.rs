/*!
Tests for the metadata document format, including edge cases of documents
written by older or foreign tools.
*/

#[cfg(test)]
mod tests {
    use crate::metadata::{Version, VersionList};
    use chrono::{TimeZone, Utc};

    const HASH: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_document_field_names() {
        let mut list = VersionList::new();
        list.add_version(
            "/a/b/c.txt",
            Version::new("2cf24dba", 5, HASH)
                .with_tags(vec!["draft".to_string()])
                .with_notes("first"),
        );

        let json: serde_json::Value = serde_json::to_value(&list).unwrap();
        let version = &json["files"][0]["versions"][0];

        assert_eq!(json["files"][0]["path"], "/a/b/c.txt");
        assert_eq!(version["id"], "2cf24dba");
        assert_eq!(version["tags"][0], "draft");
        assert_eq!(version["notes"], "first");
        assert_eq!(version["size"], 5);
        assert_eq!(version["hash"], HASH);
        assert!(version["created_at"].is_string());
    }

    #[test]
    fn test_document_field_order_is_stable() {
        let mut list = VersionList::new();
        list.add_version("/x", Version::new("2cf24dba", 5, HASH));

        let text = serde_json::to_string_pretty(&list).unwrap();
        let positions: Vec<usize> = [
            "\"id\"",
            "\"created_at\"",
            "\"tags\"",
            "\"notes\"",
            "\"size\"",
            "\"hash\"",
        ]
        .iter()
        .map(|key| text.find(key).unwrap())
        .collect();

        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut list = VersionList::new();
        list.add_version("/a.txt", Version::new("00000001", 1, HASH));
        list.add_version("/a.txt", Version::new("00000002", 2, HASH));
        list.add_version("/b.txt", Version::new("00000003", 3, HASH));

        let json = serde_json::to_string_pretty(&list).unwrap();
        let restored: VersionList = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, list);
        assert_eq!(serde_json::to_string_pretty(&restored).unwrap(), json);
    }

    #[test]
    fn test_reads_offset_timestamps_and_null_tags() {
        let json = r#"{
          "files": [
            {
              "path": "/home/u/notes.md",
              "versions": [
                {
                  "id": "3bfc2695",
                  "created_at": "2024-03-01T10:15:30.123456789+02:00",
                  "tags": null,
                  "notes": "",
                  "size": 2,
                  "hash": "3bfc269594ef649228e9a74bab00f042efc91d5acc6fbee31a382e80d42388fe"
                }
              ]
            }
          ]
        }"#;

        let list: VersionList = serde_json::from_str(json).unwrap();
        let version = &list.find("/home/u/notes.md").unwrap().versions[0];

        assert!(version.tags.is_empty());
        assert_eq!(
            version.created_at.timestamp(),
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 30).unwrap().timestamp()
        );
    }

    #[test]
    fn test_empty_document_variants() {
        let list: VersionList = serde_json::from_str(r#"{"files": []}"#).unwrap();
        assert!(list.is_empty());

        let list: VersionList = serde_json::from_str(r#"{"files": null}"#).unwrap();
        assert!(list.is_empty());

        let list: VersionList = serde_json::from_str("{}").unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        assert!(serde_json::from_str::<VersionList>(r#"{"files": "nope"}"#).is_err());
        assert!(serde_json::from_str::<VersionList>("not json").is_err());
    }

    #[test]
    fn test_duplicate_ids_are_permitted() {
        let mut list = VersionList::new();
        list.add_version("/a.txt", Version::new("2cf24dba", 5, HASH));
        list.add_version("/a.txt", Version::new("2cf24dba", 5, HASH));

        let entry = list.find("/a.txt").unwrap();
        assert_eq!(entry.versions.len(), 2);

        // Only the newest duplicate goes away.
        assert!(list.remove_version("/a.txt", "2cf24dba"));
        assert_eq!(list.find("/a.txt").unwrap().versions.len(), 1);
        assert!(list.references("2cf24dba"));
    }

    #[test]
    fn test_special_characters_in_paths_and_notes() {
        let path = "/tmp/dir with spaces/ünïcødé 🚀.txt";
        let mut list = VersionList::new();
        list.add_version(
            path,
            Version::new("00000001", 0, HASH).with_notes("line one\nline \"two\""),
        );

        let json = serde_json::to_string_pretty(&list).unwrap();
        let restored: VersionList = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.find(path).unwrap().versions[0].notes,
            "line one\nline \"two\""
        );
    }
}
