use ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One element of a stored array, keyed by field name.
pub type Record = BTreeMap<String, String>;

const SIZE_KEY: &str = "size";

/// Settings storage holding arrays of records.
pub trait SettingsStore {
    /// Read the array `name`, keyed by its 1-based element index.
    ///
    /// Missing arrays read as empty. Elements outside the stored size are
    /// skipped and absent indices are simply not present in the map.
    fn read_array(&self, name: &str) -> BTreeMap<usize, Record>;
    /// Replace the array `name` entirely with `records`.
    fn write_array(&mut self, name: &str, records: &[Record]);
    /// Persist pending changes.
    fn sync(&mut self) -> anyhow::Result<()>;
}

/// INI-backed store using the `[array]` / `N\field=` / `size=` layout.
///
/// Backslashes are kept verbatim so keys like `1\games` and Windows paths
/// survive unchanged. Values with surrounding whitespace or a leading quote
/// are written quoted.
pub struct IniStore {
    path: PathBuf,
    ini: Ini,
}

fn parse_option() -> ParseOption {
    ParseOption {
        enabled_quote: true,
        enabled_escape: false,
        ..Default::default()
    }
}

fn write_option() -> WriteOption {
    WriteOption {
        escape_policy: EscapePolicy::Nothing,
        ..Default::default()
    }
}

impl IniStore {
    /// Open the store at `path`. A missing or unreadable file yields an
    /// empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ini = if path.is_file() {
            Ini::load_from_file_opt(&path, parse_option()).unwrap_or_else(|e| {
                tracing::warn!("ignoring unreadable store {}: {e}", path.display());
                Ini::new()
            })
        } else {
            Ini::new()
        };
        Self { path, ini }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for IniStore {
    fn read_array(&self, name: &str) -> BTreeMap<usize, Record> {
        let mut records = BTreeMap::new();
        let Some(section) = self.ini.section(Some(name)) else {
            return records;
        };
        let size = match section.get(SIZE_KEY).map(|s| s.trim().parse::<usize>()) {
            Some(Ok(size)) => size,
            Some(Err(e)) => {
                tracing::warn!("invalid size for array {name}: {e}");
                return records;
            }
            None => return records,
        };
        for (key, value) in section.iter() {
            let Some((idx, field)) = key.split_once('\\') else {
                continue;
            };
            match idx.parse::<usize>() {
                Ok(i) if (1..=size).contains(&i) => {
                    records
                        .entry(i)
                        .or_insert_with(Record::new)
                        .insert(field.to_string(), value.to_string());
                }
                _ => tracing::debug!("ignoring out of range array key {name}/{key}"),
            }
        }
        records
    }

    fn write_array(&mut self, name: &str, records: &[Record]) {
        self.ini.delete(Some(name));
        let mut section = self.ini.with_section(Some(name));
        for (i, record) in records.iter().enumerate() {
            for (field, value) in record {
                section.set(format!("{}\\{}", i + 1, field), quote_edges(value));
            }
        }
        section.set(SIZE_KEY, records.len().to_string());
    }

    fn sync(&mut self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.ini.write_to_file_opt(&self.path, write_option())?;
        Ok(())
    }
}

/// Quote `value` if the parser would otherwise trim or unwrap it.
fn quote_edges(value: &str) -> String {
    let needs_quotes = value.trim() != value || value.starts_with(['"', '\'']);
    if !needs_quotes {
        return value.to_string();
    }
    match ['"', '\''].into_iter().find(|q| !value.contains(*q)) {
        Some(q) => format!("{q}{value}{q}"),
        None => {
            tracing::warn!("value {value:?} cannot be quoted and may not reload intact");
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(games: &str, exe: &str) -> Record {
        let mut r = Record::new();
        r.insert("games".into(), games.into());
        r.insert("executable".into(), exe.into());
        r
    }

    fn store_with(content: &str) -> (tempfile::TempDir, IniStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.ini");
        std::fs::write(&path, content).unwrap();
        let store = IniStore::open(&path);
        (dir, store)
    }

    #[test]
    fn reads_documented_layout() {
        let (_dir, store) = store_with(
            "[handlers]\n1\\games=oblivion,fallout3\n1\\executable=C:\\Games\\MO\\ModOrganizer.exe\n\
             2\\games=skyrimse,other\n2\\executable=C:/Tools/alt-handler.exe\nsize=2\n",
        );
        let records = store.read_array("handlers");
        assert_eq!(records.len(), 2);
        assert_eq!(records[&1]["games"], "oblivion,fallout3");
        assert_eq!(records[&1]["executable"], r"C:\Games\MO\ModOrganizer.exe");
        assert_eq!(records[&2]["executable"], "C:/Tools/alt-handler.exe");
    }

    #[test]
    fn missing_size_reads_as_empty() {
        let (_dir, store) = store_with("[handlers]\n1\\games=skyrim\n");
        assert!(store.read_array("handlers").is_empty());
        assert!(store.read_array("other").is_empty());
    }

    #[test]
    fn huge_size_only_reads_present_entries() {
        let (_dir, store) = store_with(
            "[handlers]\n1\\games=skyrim\n1\\executable=h.exe\nsize=18446744073709551615\n",
        );
        let records = store.read_array("handlers");
        assert_eq!(records.keys().copied().collect::<Vec<_>>(), vec![1]);

        let (_dir, store) = store_with("[handlers]\nsize=100000000000\n");
        assert!(store.read_array("handlers").is_empty());
    }

    #[test]
    fn non_numeric_size_reads_as_empty() {
        let (_dir, store) = store_with("[handlers]\n1\\games=skyrim\nsize=lots\n");
        assert!(store.read_array("handlers").is_empty());
        let (_dir, store) = store_with("[handlers]\n1\\games=skyrim\nsize=-1\n");
        assert!(store.read_array("handlers").is_empty());
    }

    #[test]
    fn indices_outside_size_and_gaps_are_skipped() {
        let (_dir, store) = store_with(
            "[handlers]\n1\\executable=a.exe\n3\\executable=c.exe\n4\\executable=d.exe\n\
             0\\executable=zero.exe\nx\\executable=bad.exe\nsize=3\n",
        );
        let records = store.read_array("handlers");
        assert_eq!(records.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(records[&3]["executable"], "c.exe");
    }

    #[test]
    fn backslashes_survive_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.ini");
        let mut store = IniStore::open(&path);
        store.write_array("handlers", &[record("skyrim", r"C:\Mods\handler.exe")]);
        store.sync().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(r"1\executable=C:\Mods\handler.exe"));

        let reopened = IniStore::open(&path);
        let records = reopened.read_array("handlers");
        assert_eq!(records[&1]["executable"], r"C:\Mods\handler.exe");
    }

    #[test]
    fn edge_whitespace_and_quotes_survive_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.ini");
        let values = [" lead.exe", "trail.exe ", "\"quoted\"", "'single", "it's \"both\" "];
        let records: Vec<Record> = values.iter().map(|v| record("skyrim", v)).collect();
        let mut store = IniStore::open(&path);
        store.write_array("handlers", &records[..4]);
        store.sync().unwrap();

        let reopened = IniStore::open(&path).read_array("handlers");
        let read: Vec<&str> = reopened.values().map(|r| r["executable"].as_str()).collect();
        assert_eq!(read, values[..4].to_vec());
        assert_eq!(quote_edges("plain"), "plain");
        assert_eq!(quote_edges(values[4]), values[4]);
    }

    #[test]
    fn write_array_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = IniStore::open(dir.path().join("store.ini"));
        store.write_array("handlers", &[record("a", "one"), record("b", "two")]);
        store.write_array("handlers", &[record("c", "three")]);
        let records = store.read_array("handlers");
        assert_eq!(records.len(), 1);
        assert_eq!(records[&1]["executable"], "three");
    }
}
