//! Text normalization shared by the source parsers

use crate::model::GameTrack;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").expect("valid regex"))
}

fn bracketed_version() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\s*(\d+\.\d+(?:\.\d+)*)").expect("valid regex"))
}

/// Lowercase ASCII slug: runs of anything non-alphanumeric become one `-`
///
/// `"$old!it"` becomes `"old-it"`, `"[Delete]"` becomes `"delete"`.
pub fn slugify(text: &str) -> String {
    non_alphanumeric()
        .replace_all(text, "-")
        .trim_matches('-')
        .to_lowercase()
}

/// Maps an interface version such as `"1.15.2"` or `"10.2.0"` to its track
pub fn game_version_to_track(version: &str) -> GameTrack {
    match version.trim().split('.').next() {
        Some("1") => GameTrack::Classic,
        Some("2") => GameTrack::ClassicTbc,
        Some("3") => GameTrack::ClassicWotlk,
        Some("4") => GameTrack::ClassicCata,
        Some("5") => GameTrack::ClassicMists,
        _ => GameTrack::Retail,
    }
}

/// Maps a GitHub catalogue flavor name to its track
pub fn flavor_to_track(flavor: &str) -> Option<GameTrack> {
    match flavor.trim().to_lowercase().as_str() {
        "mainline" | "retail" => Some(GameTrack::Retail),
        "classic" | "vanilla" => Some(GameTrack::Classic),
        "bcc" | "tbc" => Some(GameTrack::ClassicTbc),
        "wrath" | "wotlk" => Some(GameTrack::ClassicWotlk),
        "cata" | "cataclysm" => Some(GameTrack::ClassicCata),
        "mists" | "mop" => Some(GameTrack::ClassicMists),
        _ => None,
    }
}

/// Reads the tracks named in a free-text compatibility line
///
/// The text is split into clauses on `,`, `&`, `)` and `and`; each clause
/// names at most one track. A clause naming no track but carrying a
/// bracketed version, e.g. `"Shadowlands patch (9.0.5)"`, is mapped by
/// version number.
pub fn parse_game_tracks(text: &str) -> BTreeSet<GameTrack> {
    let lowered = text.to_lowercase().replace(" and ", ",");

    lowered
        .split(|c| c == ',' || c == '&' || c == ')' || c == '\n')
        .filter_map(clause_track)
        .collect()
}

fn clause_track(clause: &str) -> Option<GameTrack> {
    let clause = clause.trim();
    if clause.is_empty() {
        return None;
    }

    if clause.contains("burning crusade") || clause.contains("tbc") {
        Some(GameTrack::ClassicTbc)
    } else if clause.contains("wrath") || clause.contains("wotlk") {
        Some(GameTrack::ClassicWotlk)
    } else if clause.contains("cata") {
        Some(GameTrack::ClassicCata)
    } else if clause.contains("mists") || clause.contains("pandaria") {
        Some(GameTrack::ClassicMists)
    } else if clause.contains("classic") {
        Some(GameTrack::Classic)
    } else if clause.contains("retail") || clause.contains("mainline") {
        Some(GameTrack::Retail)
    } else {
        bracketed_version()
            .captures(clause)
            .and_then(|caps| caps.get(1))
            .map(|version| game_version_to_track(version.as_str()))
    }
}

/// Categories whose name is replaced outright by these tags
const REPLACEMENTS: &[(&str, &[&str])] = &[
    ("Character Advancement", &["quests", "leveling", "achievements"]),
    ("Other", &["misc"]),
    ("Suites", &["compilations"]),
    ("Graphic UI Mods", &["ui", "ui-replacements"]),
    ("UI Media", &["ui"]),
    ("ROFL", &["misc", "mini-games"]),
    ("Combat Mods", &["combat"]),
    ("Buff, Debuff, Spell", &["buffs", "debuffs"]),
    ("Casting Bars, Cooldowns", &["buffs", "debuffs", "ui"]),
    ("Map, Coords, Compasses", &["map", "minimap", "coords", "ui"]),
    ("RolePlay, Music Mods", &["role-play", "audio"]),
    ("Chat Mods", &["chat"]),
    ("Unit Mods", &["unit-frames"]),
    ("Raid Mods", &["unit-frames", "raid-frames"]),
    ("Data Mods", &["data"]),
    ("Utility Mods", &["utility"]),
    ("Action Bar Mods", &["action-bars", "ui"]),
    ("Tradeskill Mods", &["tradeskill"]),
    ("Classic - General", &["classic"]),
];

/// Categories that gain these tags on top of their own
const SUPPLEMENTS: &[(&str, &[&str])] = &[
    ("Pets", &["battle-pets", "companions"]),
    ("Data Broker", &["data"]),
    ("Titan Panel", &["plugins"]),
    ("FuBar", &["plugins"]),
    ("Mail", &["ui"]),
];

fn lookup(table: &[(&str, &'static [&'static str])], category: &str) -> Option<&'static [&'static str]> {
    table
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, tags)| *tags)
}

/// Converts a WowInterface category name into catalogue tags
pub fn category_to_tags(category: &str) -> BTreeSet<String> {
    let category = category.trim();
    let mut tags = BTreeSet::new();

    if let Some(supplement) = lookup(SUPPLEMENTS, category) {
        tags.extend(supplement.iter().map(|t| t.to_string()));
    }

    match lookup(REPLACEMENTS, category) {
        Some(replacement) => tags.extend(replacement.iter().map(|t| t.to_string())),
        None => {
            let split = category
                .split(" & ")
                .flat_map(|part| part.split(", "))
                .flat_map(|part| part.split(": "))
                .map(slugify)
                .filter(|tag| !tag.is_empty());
            tags.extend(split);
        }
    }

    tags
}
