//! # Snapshot Artifact
//!
//! One line per token, ascending id:
//!
//! ```text
//! 1 0x5B38Da6a701c568545dCfcB03FcB875f56beddC4
//! 2 0xAb8483F64d9C6d1EcF9b849Ae677dD3315835cb2
//! ```
//!
//! Owners are written EIP-55 checksummed; parsing accepts any case.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use alloy_primitives::Address;
use gasbench_chain::TokenId;
use tracing::debug;

use crate::error::{SerializeError, SerializeResult};
use crate::snapshot::OwnershipSnapshot;

/// Renders `snapshot` as the text artifact. Deterministic for equal snapshots.
#[must_use]
pub fn render(snapshot: &OwnershipSnapshot) -> String {
    let mut out = String::with_capacity(snapshot.len() * 50);
    for (token_id, owner) in snapshot.iter() {
        out.push_str(&format!("{token_id} {}\n", owner.to_checksum(None)));
    }
    out
}

/// Parses an artifact written by [`render`].
///
/// Blank lines are skipped. Ids must be strictly ascending.
///
/// # Errors
///
/// The first malformed, duplicate or out-of-order line, by 1-based number.
pub fn parse(text: &str) -> SerializeResult<OwnershipSnapshot> {
    let mut owners = BTreeMap::new();
    let mut previous: Option<TokenId> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let mut fields = raw.split_whitespace();
        let (Some(id_field), Some(owner_field), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(malformed(line, "expected `<tokenId> <owner>`"));
        };
        let token_id: TokenId = id_field
            .parse()
            .map_err(|_| malformed(line, format!("invalid token id `{id_field}`")))?;
        let owner = Address::from_str(owner_field)
            .map_err(|_| malformed(line, format!("invalid owner `{owner_field}`")))?;

        match previous {
            Some(prev) if prev == token_id => return Err(SerializeError::DuplicateToken { line, token_id }),
            Some(prev) if prev > token_id => return Err(SerializeError::Unsorted { line }),
            _ => {}
        }
        previous = Some(token_id);
        owners.insert(token_id, owner);
    }

    Ok(OwnershipSnapshot::from_map(owners))
}

/// Writes the artifact to `path`, replacing any existing file.
///
/// # Errors
///
/// `Io` if the file cannot be written.
pub fn write_file(path: impl AsRef<Path>, snapshot: &OwnershipSnapshot) -> SerializeResult<()> {
    let path = path.as_ref();
    fs::write(path, render(snapshot))?;
    debug!(path = %path.display(), tokens = snapshot.len(), "wrote snapshot");
    Ok(())
}

/// Reads and parses the artifact at `path`.
///
/// # Errors
///
/// `Io` if the file cannot be read, otherwise any [`parse`] error.
pub fn read_file(path: impl AsRef<Path>) -> SerializeResult<OwnershipSnapshot> {
    let text = fs::read_to_string(path)?;
    parse(&text)
}

fn malformed(line: usize, reason: impl Into<String>) -> SerializeError {
    SerializeError::MalformedLine {
        line,
        reason: reason.into(),
    }
}
