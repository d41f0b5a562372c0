/// A game the handler knows how to route links for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownGame {
    pub display_name: &'static str,
    pub id: &'static str,
}

const KNOWN_GAMES: &[KnownGame] = &[
    KnownGame { display_name: "Oblivion", id: "oblivion" },
    KnownGame { display_name: "Fallout 3", id: "fallout3" },
    KnownGame { display_name: "Fallout 4", id: "fallout4" },
    KnownGame { display_name: "Fallout NV", id: "falloutnv" },
    KnownGame { display_name: "Skyrim", id: "skyrim" },
    KnownGame { display_name: "SkyrimSE", id: "skyrimse" },
    KnownGame { display_name: "Other", id: "other" },
];

pub fn known_games() -> &'static [KnownGame] {
    KNOWN_GAMES
}

/// Identifiers of every known game, in table order.
pub fn known_game_ids() -> Vec<String> {
    KNOWN_GAMES.iter().map(|g| g.id.to_string()).collect()
}

/// Map a display name or identifier to its canonical identifier.
pub fn game_id(name: &str) -> Option<&'static str> {
    KNOWN_GAMES
        .iter()
        .find(|g| g.display_name.eq_ignore_ascii_case(name) || g.id.eq_ignore_ascii_case(name))
        .map(|g| g.id)
}
