//! Factory reset behind a typed confirmation phrase.

use crate::logging::log_safe;
use crate::storage::{KeyValueStore, StorageError};
use log::{error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Phrase the user must type verbatim before every key is cleared.
pub const FACTORY_RESET_PHRASE: &str = "DELETE ALL DATA";

#[derive(Debug)]
pub enum ResetError {
    ConfirmationMismatch,
    ClearFailed(StorageError),
}

impl Display for ResetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfirmationMismatch => {
                write!(f, "type `{FACTORY_RESET_PHRASE}` to confirm the reset")
            }
            Self::ClearFailed(err) => write!(f, "factory reset failed: {err}"),
        }
    }
}

impl Error for ResetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConfirmationMismatch => None,
            Self::ClearFailed(err) => Some(err),
        }
    }
}

/// Clears every stored key. Callers reload all domain stores afterwards.
///
/// # Errors
/// `ResetError::ConfirmationMismatch` unless `confirmation` equals
/// [`FACTORY_RESET_PHRASE`] exactly; nothing is touched in that case.
pub fn factory_reset(kv: &KeyValueStore, confirmation: &str) -> Result<(), ResetError> {
    if confirmation != FACTORY_RESET_PHRASE {
        warn!("event=factory_reset module=backup status=rejected reason=phrase_mismatch");
        return Err(ResetError::ConfirmationMismatch);
    }
    kv.try_clear_all().map_err(|err| {
        error!(
            "event=factory_reset module=backup status=error error={}",
            log_safe(&err)
        );
        ResetError::ClearFailed(err)
    })?;
    warn!("event=factory_reset module=backup status=ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{factory_reset, ResetError, FACTORY_RESET_PHRASE};
    use crate::storage::{keys, KeyValueStore};
    use serde_json::json;

    #[test]
    fn wrong_phrase_touches_nothing() {
        let kv = KeyValueStore::open_in_memory().expect("open kv");
        kv.save(keys::HABITS, &json!([]));
        assert!(matches!(
            factory_reset(&kv, "delete all data"),
            Err(ResetError::ConfirmationMismatch)
        ));
        assert_eq!(kv.keys(), vec![keys::HABITS.to_string()]);
    }

    #[test]
    fn exact_phrase_clears_every_key() {
        let kv = KeyValueStore::open_in_memory().expect("open kv");
        kv.save(keys::HABITS, &json!([]));
        kv.save(keys::GOOGLE_LINKED, &true);
        factory_reset(&kv, FACTORY_RESET_PHRASE).expect("reset");
        assert!(kv.keys().is_empty());
    }
}
