//! Blocking on mirror changes

use ovsdb_core::{Error, Idl, Result};
use std::time::Duration;

/// Block until the change counter moves past `seqno`
///
/// `seqno` defaults to the current counter, so `None` waits for the next
/// change.
///
/// # Errors
///
/// [`Error::WaitTimeout`] when nothing changes within `timeout`.
pub fn wait_for_change(idl: &dyn Idl, timeout: Duration, seqno: Option<u64>) -> Result<()> {
    let seqno = seqno.unwrap_or_else(|| idl.change_seqno());
    if idl.wait(seqno, timeout) {
        Ok(())
    } else {
        Err(Error::WaitTimeout { timeout })
    }
}
