use crate::dispatch::strip_call;
use crate::games::known_game_ids;
use crate::protocol::ProtocolRegistry;
use crate::store::{Record, SettingsStore};
use std::collections::VecDeque;
use std::path::Path;

/// Name of the store file holding the handler list.
pub const HANDLER_STORE_FILE: &str = "modlhandler.ini";

const HANDLERS_ARRAY: &str = "handlers";
const GAMES_KEY: &str = "games";
const EXECUTABLE_KEY: &str = "executable";

/// A program that accepts forwarded links for a set of games.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    pub id: usize,
    /// Lowercase game identifiers, without duplicates.
    pub games: Vec<String>,
    pub executable: String,
}

impl HandlerInfo {
    pub fn handles(&self, game: &str) -> bool {
        self.games.iter().any(|g| g.eq_ignore_ascii_case(game))
    }

    fn is_executable(&self, executable: &str) -> bool {
        self.executable.to_lowercase() == executable.to_lowercase()
    }
}

fn normalize_games<S: AsRef<str>>(games: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(games.len());
    for game in games {
        let game = game.as_ref().trim().to_lowercase();
        if !game.is_empty() && !out.contains(&game) {
            out.push(game);
        }
    }
    out
}

/// Ordered list of link handlers. Earlier entries take priority.
pub struct HandlerStorage {
    handlers: VecDeque<HandlerInfo>,
    store: Box<dyn SettingsStore>,
}

impl HandlerStorage {
    /// An empty storage that will persist into `store`.
    pub fn new(store: Box<dyn SettingsStore>) -> Self {
        Self {
            handlers: VecDeque::new(),
            store,
        }
    }

    /// Load the handlers persisted in `store`, then append the current owner
    /// of `scheme` unless it is this handler (`holder_name`) or already
    /// listed.
    ///
    /// Stored entries whose executable no longer exists are skipped.
    pub fn load(
        store: Box<dyn SettingsStore>,
        protocols: &dyn ProtocolRegistry,
        scheme: &str,
        holder_name: &str,
    ) -> Self {
        let mut storage = Self::new(store);
        storage.load_store();
        storage.merge_scheme_owner(protocols, scheme, holder_name);
        storage
    }

    fn load_store(&mut self) {
        for (index, record) in self.store.read_array(HANDLERS_ARRAY) {
            let executable = record.get(EXECUTABLE_KEY).cloned().unwrap_or_default();
            let games_raw = record.get(GAMES_KEY).map(String::as_str).unwrap_or_default();
            let games: Vec<&str> = games_raw.split(',').collect();
            if executable.is_empty() || !Path::new(&executable).exists() {
                tracing::debug!("dropping handler with missing executable '{executable}'");
                continue;
            }
            self.handlers.push_back(HandlerInfo {
                id: index - 1,
                games: normalize_games(&games[..]),
                executable,
            });
        }
    }

    fn merge_scheme_owner(
        &mut self,
        protocols: &dyn ProtocolRegistry,
        scheme: &str,
        holder_name: &str,
    ) {
        let Some(command) = protocols.read(scheme) else {
            return;
        };
        let executable = strip_call(&command);
        if executable.is_empty() {
            return;
        }
        if executable.to_lowercase().ends_with(&holder_name.to_lowercase()) {
            return;
        }
        if self.handlers.iter().any(|h| h.is_executable(&executable)) {
            return;
        }
        tracing::debug!("adding scheme owner {executable} as lowest priority handler");
        self.handlers.push_back(HandlerInfo {
            id: self.handlers.len(),
            games: known_game_ids(),
            executable,
        });
    }

    /// Register `executable` for every known game.
    pub fn register_all(&mut self, executable: &str, prepend: bool) {
        let games = known_game_ids();
        self.register_handler(&games[..], executable, prepend, false);
    }

    /// Register `executable` for `games`.
    ///
    /// A known executable either gains the new games in place or, with
    /// `force`, is moved to the front/back with exactly `games`.
    pub fn register_handler<S: AsRef<str>>(
        &mut self,
        games: &[S],
        executable: &str,
        prepend: bool,
        force: bool,
    ) {
        let games = normalize_games(games);
        if let Some(pos) = self.handlers.iter().position(|h| h.is_executable(executable)) {
            if force {
                if let Some(mut info) = self.handlers.remove(pos) {
                    info.games = games;
                    self.insert(info, prepend);
                }
            } else {
                let info = &mut self.handlers[pos];
                for game in games {
                    if !info.games.contains(&game) {
                        info.games.push(game);
                    }
                }
            }
            return;
        }

        let info = HandlerInfo {
            id: self.handlers.len(),
            games,
            executable: executable.to_string(),
        };
        self.insert(info, prepend);
    }

    fn insert(&mut self, info: HandlerInfo, prepend: bool) {
        if prepend {
            self.handlers.push_front(info);
        } else {
            self.handlers.push_back(info);
        }
    }

    /// Executable of the first handler registered for `game`.
    pub fn get_handler(&self, game: &str) -> Option<String> {
        self.handlers
            .iter()
            .find(|h| h.handles(game))
            .map(|h| h.executable.clone())
    }

    pub fn handlers(&self) -> impl Iterator<Item = &HandlerInfo> {
        self.handlers.iter()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Drop every handler. Persisted data is untouched until [`Self::save`].
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Overwrite the persisted handler list with the current one.
    pub fn save(&mut self) -> anyhow::Result<()> {
        let records: Vec<Record> = self
            .handlers
            .iter()
            .map(|h| {
                let mut record = Record::new();
                record.insert(GAMES_KEY.into(), h.games.join(","));
                record.insert(EXECUTABLE_KEY.into(), h.executable.clone());
                record
            })
            .collect();
        self.store.write_array(HANDLERS_ARRAY, &records);
        self.store.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MemoryProtocolRegistry;
    use crate::store::IniStore;

    fn empty_storage() -> (tempfile::TempDir, HandlerStorage) {
        let dir = tempfile::tempdir().unwrap();
        let store = IniStore::open(dir.path().join(HANDLER_STORE_FILE));
        (dir, HandlerStorage::new(Box::new(store)))
    }

    fn executables(storage: &HandlerStorage) -> Vec<String> {
        storage.handlers().map(|h| h.executable.clone()).collect()
    }

    #[test]
    fn first_registration_gets_id_zero() {
        let (_dir, mut storage) = empty_storage();
        storage.register_handler(&["Skyrim"], "C:/h.exe", false, false);
        let list: Vec<_> = storage.handlers().cloned().collect();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, 0);
        assert_eq!(list[0].games, vec!["skyrim".to_string()]);
    }

    #[test]
    fn lookup_on_empty_storage_is_none() {
        let (_dir, storage) = empty_storage();
        assert_eq!(storage.get_handler("skyrim"), None);
        assert_eq!(storage.get_handler(""), None);
    }

    #[test]
    fn executables_compare_case_insensitively() {
        let (_dir, mut storage) = empty_storage();
        storage.register_handler(&["skyrim"], "C:/Mods/Handler.exe", false, false);
        storage.register_handler(&["oblivion"], "c:/mods/handler.EXE", false, false);
        assert_eq!(storage.len(), 1);
        assert_eq!(executables(&storage), vec!["C:/Mods/Handler.exe"]);
    }

    #[test]
    fn soft_reregister_unions_in_place() {
        let (_dir, mut storage) = empty_storage();
        storage.register_handler(&["x"], "one", false, false);
        storage.register_handler(&["y"], "two", false, false);
        storage.register_handler(&["a", "b"], "target", false, false);
        storage.register_handler(&["c", "A"], "TARGET", true, false);
        assert_eq!(executables(&storage), vec!["one", "two", "target"]);
        let target = storage.handlers().nth(2).unwrap();
        assert_eq!(target.games, vec!["a", "b", "c"]);
    }

    #[test]
    fn forced_reregister_moves_and_replaces() {
        let (_dir, mut storage) = empty_storage();
        storage.register_handler(&["x"], "one", false, false);
        storage.register_handler(&["y"], "two", false, false);
        storage.register_handler(&["a", "b"], "target", false, false);
        storage.register_handler(&["c"], "target", true, true);
        assert_eq!(executables(&storage), vec!["target", "one", "two"]);
        let target = storage.handlers().next().unwrap();
        assert_eq!(target.games, vec!["c"]);
        assert_eq!(target.id, 2);
    }

    #[test]
    fn forced_reregister_can_move_to_back() {
        let (_dir, mut storage) = empty_storage();
        storage.register_handler(&["a"], "target", false, false);
        storage.register_handler(&["b"], "other", false, false);
        storage.register_handler(&["a"], "target", false, true);
        assert_eq!(executables(&storage), vec!["other", "target"]);
    }

    #[test]
    fn first_match_wins_regardless_of_specificity() {
        let (_dir, mut storage) = empty_storage();
        storage.register_all("generic", false);
        storage.register_handler(&["skyrim"], "specific", false, false);
        assert_eq!(storage.get_handler("SKYRIM").as_deref(), Some("generic"));
        storage.register_handler(&["skyrim"], "specific", true, true);
        assert_eq!(storage.get_handler("skyrim").as_deref(), Some("specific"));
        assert_eq!(storage.get_handler("oblivion").as_deref(), Some("generic"));
    }

    #[test]
    fn duplicate_games_are_collapsed() {
        let (_dir, mut storage) = empty_storage();
        storage.register_handler(&["Skyrim", "skyrim", " ", "other"], "h", true, false);
        assert_eq!(storage.handlers().next().unwrap().games, vec!["skyrim", "other"]);
    }

    #[test]
    fn clear_keeps_persisted_data_until_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HANDLER_STORE_FILE);
        let exe = dir.path().join("handler.exe");
        std::fs::write(&exe, b"").unwrap();
        let exe = exe.to_string_lossy().into_owned();

        let mut storage = HandlerStorage::new(Box::new(IniStore::open(&path)));
        storage.register_handler(&["skyrim"], &exe, false, false);
        storage.save().unwrap();
        storage.clear();
        assert!(storage.is_empty());

        let protocols = MemoryProtocolRegistry::new();
        let reloaded = HandlerStorage::load(
            Box::new(IniStore::open(&path)),
            &protocols,
            "modl",
            "modlhandler.exe",
        );
        assert_eq!(reloaded.len(), 1);
    }
}
