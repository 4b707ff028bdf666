//! Round catalog source. The catalog is produced outside this crate (spreadsheet
//! export, hand-written JSON); here it is only read as an ordered list of rounds.

use std::{io::ErrorKind, path::Path};

use tokio::fs;
use tracing::info;

use crate::{
    dao::storage::{StorageError, StorageResult},
    state::game::Round,
};

/// Read the catalog at `path`. A missing file yields an empty catalog.
///
/// Every round is normalized and covered, so catalog entries never carry
/// reveal state into a game.
pub async fn load_catalog(path: &Path) -> StorageResult<Vec<Round>> {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "round catalog not found; starting empty");
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(StorageError::unavailable(
                format!("reading catalog `{}`", path.display()),
                err,
            ));
        }
    };

    parse_catalog(&contents).map_err(|err| {
        StorageError::unavailable(format!("parsing catalog `{}`", path.display()), err)
    })
}

/// Decode a JSON array of rounds.
pub fn parse_catalog(contents: &str) -> serde_json::Result<Vec<Round>> {
    let rounds: Vec<Round> = serde_json::from_str(contents)?;
    Ok(rounds.iter().map(Round::fresh).collect())
}
