//! abl-save: actor persistence
//!
//! The actor carries everything that must outlive a session: resource pools,
//! the hotkey table and the per-ability use counters. A save file is a JSON
//! document with a versioned header in front of the actor.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use abl_core::ActorContext;

/// Bumped whenever the actor layout changes incompatibly.
pub const SAVE_VERSION: u32 = 1;

const FORMAT_TAG: &str = "ABLS";

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("cannot access save: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed save: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no save at that path")]
    NotFound,

    #[error("save format {found} is not supported (this build reads {expected})")]
    IncompatibleVersion { expected: u32, found: u32 },

    #[error("not an ability engine save")]
    InvalidHeader,
}

/// Leading record of every save; enough to list saves without the actor body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader {
    pub format: String,
    pub format_version: u32,
    pub actor_name: String,
    /// Game time at save
    pub elapsed_time: u64,
    /// Wall-clock seconds since the Unix epoch
    pub saved_at: u64,
}

impl SaveHeader {
    pub fn new(actor: &ActorContext) -> Self {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        Self {
            format: FORMAT_TAG.to_string(),
            format_version: SAVE_VERSION,
            actor_name: actor.name.clone(),
            elapsed_time: actor.elapsed_time,
            saved_at,
        }
    }

    pub fn validate(&self) -> Result<(), SaveError> {
        match (self.format.as_str(), self.format_version) {
            (FORMAT_TAG, SAVE_VERSION) => Ok(()),
            (FORMAT_TAG, found) => Err(SaveError::IncompatibleVersion {
                expected: SAVE_VERSION,
                found,
            }),
            _ => Err(SaveError::InvalidHeader),
        }
    }
}

#[derive(Serialize)]
struct SaveFileRef<'a> {
    header: SaveHeader,
    actor: &'a ActorContext,
}

#[derive(Deserialize)]
struct SaveFile {
    header: SaveHeader,
    actor: ActorContext,
}

/// Header alone; the actor body is skipped over.
#[derive(Deserialize)]
struct HeaderOnly {
    header: SaveHeader,
}

fn open(path: &Path) -> Result<BufReader<File>, SaveError> {
    match File::open(path) {
        Ok(file) => Ok(BufReader::new(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(SaveError::NotFound),
        Err(e) => Err(e.into()),
    }
}

/// Write `actor` to `path`, creating parent directories as needed.
pub fn save_actor(actor: &ActorContext, path: impl AsRef<Path>) -> Result<(), SaveError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let record = SaveFileRef {
        header: SaveHeader::new(actor),
        actor,
    };
    serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &record)?;
    info!(actor = %actor.name, path = %path.display(), "actor saved");
    Ok(())
}

pub fn load_actor(path: impl AsRef<Path>) -> Result<ActorContext, SaveError> {
    let SaveFile { header, actor } = serde_json::from_reader(open(path.as_ref())?)?;
    header.validate()?;
    Ok(actor)
}

/// Load only the header, for listing saves.
pub fn load_header(path: impl AsRef<Path>) -> Result<SaveHeader, SaveError> {
    let HeaderOnly { header } = serde_json::from_reader(open(path.as_ref())?)?;
    header.validate()?;
    Ok(header)
}

pub fn save_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

pub fn delete_save(path: impl AsRef<Path>) -> Result<(), SaveError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(SaveError::NotFound),
        Err(e) => Err(e.into()),
    }
}

/// Save location for `actor_name` under the platform data directory.
pub fn default_save_path(actor_name: &str) -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("abl-engine")
        .join("saves")
        .join(format!("{actor_name}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use abl_core::{AbilityId, AbilityOptions, God};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("abl_save_{}_{name}.json", std::process::id()))
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");

        let mut actor = ActorContext::new("Sigmund");
        actor.god = God::Trog;
        actor.piety = 42;
        actor.elapsed_time = 1234;
        actor
            .ability_letters
            .assign(AbilityId::TrogBerserk, 'f', &AbilityOptions::default());
        actor.record_use(AbilityId::TrogBerserk);
        save_actor(&actor, &path).unwrap();
        assert!(save_exists(&path));

        let loaded = load_actor(&path).unwrap();
        assert_eq!(loaded.name, "Sigmund");
        assert_eq!(loaded.piety, 42);
        assert_eq!(loaded.ability_letters, actor.ability_letters);
        assert_eq!(loaded.ability_uses.get(&AbilityId::TrogBerserk), Some(&1));

        let header = load_header(&path).unwrap();
        assert_eq!(header.actor_name, "Sigmund");
        assert_eq!(header.elapsed_time, 1234);

        delete_save(&path).unwrap();
        assert!(!save_exists(&path));
    }

    #[test]
    fn test_header_rejects_foreign_and_future_files() {
        let header = SaveHeader::new(&ActorContext::new("Sigmund"));
        assert_eq!(header.actor_name, "Sigmund");
        header.validate().unwrap();

        let foreign = SaveHeader {
            format: "NHSV".into(),
            ..header.clone()
        };
        assert!(matches!(foreign.validate(), Err(SaveError::InvalidHeader)));

        let future = SaveHeader {
            format_version: SAVE_VERSION + 1,
            ..header
        };
        match future.validate() {
            Err(SaveError::IncompatibleVersion { expected, found }) => {
                assert_eq!(expected, SAVE_VERSION);
                assert_eq!(found, SAVE_VERSION + 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let path = temp_path("missing");
        assert!(!save_exists(&path));
        assert!(matches!(load_actor(&path), Err(SaveError::NotFound)));
        assert!(matches!(delete_save(&path), Err(SaveError::NotFound)));
    }

    #[test]
    fn test_garbage_is_serialization_error() {
        let path = temp_path("garbage");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            load_header(&path),
            Err(SaveError::Serialization(_))
        ));
        delete_save(&path).unwrap();
    }

    #[test]
    fn test_default_save_path() {
        let path = default_save_path("Sigmund");
        assert!(path.ends_with("abl-engine/saves/Sigmund.json"));
    }
}
