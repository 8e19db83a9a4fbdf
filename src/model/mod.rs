//! Domain types shared by the crawler, the parsers and the catalogue builder

mod catalogue;
mod record;

pub use catalogue::{Addon, Catalogue, CatalogueSpec, CATALOGUE_SPEC_VERSION};
pub use record::{GithubRow, PartialRecord, Release, SourcePayload, WowiApiDetail, WowiFileListEntry};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An addon host the builder knows how to crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Wowinterface,
    Github,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Wowinterface, Source::Github];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Wowinterface => "wowinterface",
            Source::Github => "github",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wowinterface" => Ok(Source::Wowinterface),
            "github" => Ok(Source::Github),
            other => Err(format!("unknown source: {}", other)),
        }
    }
}

/// Game version an addon supports
///
/// Variant order is the canonical output order, so `Ord` sorts tracks the
/// way catalogues list them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GameTrack {
    #[serde(rename = "retail")]
    Retail,
    #[serde(rename = "classic")]
    Classic,
    #[serde(rename = "classic-tbc")]
    ClassicTbc,
    #[serde(rename = "classic-wotlk")]
    ClassicWotlk,
    #[serde(rename = "classic-cata")]
    ClassicCata,
    #[serde(rename = "classic-mists")]
    ClassicMists,
}

impl GameTrack {
    pub const ALL: [GameTrack; 6] = [
        GameTrack::Retail,
        GameTrack::Classic,
        GameTrack::ClassicTbc,
        GameTrack::ClassicWotlk,
        GameTrack::ClassicCata,
        GameTrack::ClassicMists,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameTrack::Retail => "retail",
            GameTrack::Classic => "classic",
            GameTrack::ClassicTbc => "classic-tbc",
            GameTrack::ClassicWotlk => "classic-wotlk",
            GameTrack::ClassicCata => "classic-cata",
            GameTrack::ClassicMists => "classic-mists",
        }
    }
}

impl fmt::Display for GameTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameTrack {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameTrack::ALL
            .iter()
            .find(|track| track.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown game track: {}", s))
    }
}

/// Stable identity of an addon: the host plus the host's own id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub source: Source,
    pub source_id: String,
}

impl Identity {
    pub fn new(source: Source, source_id: impl Into<String>) -> Self {
        Self {
            source,
            source_id: source_id.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.source_id)
    }
}

/// Kind of resource that produced a partial record
///
/// Declaration order is merge order: later kinds are more authoritative and
/// overwrite earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginKind {
    Listing,
    WebDetail,
    ApiFileList,
    ApiDetail,
}

impl OriginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginKind::Listing => "listing",
            OriginKind::WebDetail => "web-detail",
            OriginKind::ApiFileList => "api-file-list",
            OriginKind::ApiDetail => "api-detail",
        }
    }

    /// Merge priority; the two API kinds share the top rank
    pub fn rank(&self) -> u8 {
        match self {
            OriginKind::Listing => 0,
            OriginKind::WebDetail => 1,
            OriginKind::ApiFileList | OriginKind::ApiDetail => 2,
        }
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OriginKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "listing" => Ok(OriginKind::Listing),
            "web-detail" => Ok(OriginKind::WebDetail),
            "api-file-list" => Ok(OriginKind::ApiFileList),
            "api-detail" => Ok(OriginKind::ApiDetail),
            other => Err(format!("unknown origin kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_track_canonical_order() {
        let mut tracks = vec![
            GameTrack::ClassicMists,
            GameTrack::Classic,
            GameTrack::Retail,
            GameTrack::ClassicWotlk,
        ];
        tracks.sort();
        assert_eq!(
            tracks,
            vec![
                GameTrack::Retail,
                GameTrack::Classic,
                GameTrack::ClassicWotlk,
                GameTrack::ClassicMists
            ]
        );
    }

    #[test]
    fn test_game_track_string_roundtrip() {
        for track in GameTrack::ALL {
            assert_eq!(track.as_str().parse::<GameTrack>().unwrap(), track);
        }
        assert!("burning-crusade".parse::<GameTrack>().is_err());
    }

    #[test]
    fn test_origin_kind_order_and_rank() {
        assert!(OriginKind::Listing < OriginKind::WebDetail);
        assert!(OriginKind::WebDetail < OriginKind::ApiFileList);
        assert!(OriginKind::ApiFileList < OriginKind::ApiDetail);
        assert_eq!(OriginKind::ApiFileList.rank(), OriginKind::ApiDetail.rank());
    }

    #[test]
    fn test_source_parse() {
        assert_eq!("github".parse::<Source>().unwrap(), Source::Github);
        assert_eq!(
            "wowinterface".parse::<Source>().unwrap(),
            Source::Wowinterface
        );
        assert!("curseforge".parse::<Source>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&GameTrack::ClassicTbc).unwrap(),
            "\"classic-tbc\""
        );
        assert_eq!(
            serde_json::to_string(&Source::Wowinterface).unwrap(),
            "\"wowinterface\""
        );
    }
}
