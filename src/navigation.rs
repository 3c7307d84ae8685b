//! Landing routes for the caller to navigate to after session transitions.

use crate::error::Error;
use crate::store::{KeyValueStore, StoreKey};
use crate::types::{AccountKind, JobId, Session};

pub const DASHBOARD_ROUTE: &str = "/dashboard";
pub const LOGIN_ROUTE: &str = "/login";

/// Remember the job a visitor was applying to before being sent to log in.
///
/// # Errors
///
/// Returns the store's error if the write fails.
pub fn remember_return_to_job<S: KeyValueStore + ?Sized>(store: &S, job: &JobId) -> Result<(), Error> {
    store.put(StoreKey::ReturnToJob, &job.0)
}

/// Route to open after login.
///
/// Job seekers go back to the remembered job's application form (consuming
/// the entry); everyone else lands on the dashboard.
///
/// # Errors
///
/// Returns the store's error if reading or consuming the entry fails.
pub fn post_login_route<S: KeyValueStore + ?Sized>(
    store: &S,
    session: &Session,
) -> Result<String, Error> {
    if session.account_kind != AccountKind::Individual {
        return Ok(DASHBOARD_ROUTE.to_owned());
    }

    match store.get(StoreKey::ReturnToJob)?.filter(|job| !job.is_empty()) {
        Some(job) => {
            store.remove(StoreKey::ReturnToJob)?;
            Ok(format!("/find-job/{}?apply=true", urlencoding::encode(&job)))
        }
        None => Ok(DASHBOARD_ROUTE.to_owned()),
    }
}
