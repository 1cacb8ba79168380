//! Driver notification routing

use std::mem;

use tracing::debug;

use super::manager::Session;
use crate::device::DeviceMessage;

impl Session {
    /// Relay one driver notification to the caller
    ///
    /// Runs on the notification listener, not on the worker.
    pub fn notify(&self, msg: &DeviceMessage) {
        let inner = &self.inner;
        if inner.state.is_closed() {
            debug!(session = %inner.id, ?msg, "Session closed, notification dropped");
            return;
        }

        match msg {
            DeviceMessage::Error { code } => {
                let (error, vendor_code) = inner.codes.translate_error(*code);
                debug!(session = %inner.id, code, %error, vendor_code, "onError");
                inner.state.enter_idling();
                inner.callback.on_error(error, vendor_code);
            }
            DeviceMessage::Acquired { info } => {
                let (acquired, vendor_code) = inner.codes.translate_acquired(*info);
                debug!(session = %inner.id, info, %acquired, vendor_code, "onAcquired");
                inner.state.enter_idling();
                inner.callback.on_acquired(acquired, vendor_code);
            }
            DeviceMessage::TemplateEnrolling {
                finger,
                samples_remaining,
            } => {
                debug!(
                    session = %inner.id,
                    fid = finger.fid,
                    gid = finger.gid,
                    remaining = samples_remaining,
                    "onEnrollResult"
                );
                inner
                    .callback
                    .on_enrollment_progress(finger.fid as i32, *samples_remaining as i32);
            }
            DeviceMessage::TemplateRemoved {
                finger,
                remaining_templates,
            } => {
                debug!(
                    session = %inner.id,
                    fid = finger.fid,
                    gid = finger.gid,
                    remaining = remaining_templates,
                    "onRemove"
                );
                inner
                    .callback
                    .on_enrollments_removed(vec![finger.fid as i32]);
            }
            DeviceMessage::Authenticated { finger, hat } => {
                debug!(
                    session = %inner.id,
                    fid = finger.fid,
                    gid = finger.gid,
                    "onAuthenticated"
                );
                inner.state.enter_idling();
                if finger.fid != 0 {
                    inner
                        .callback
                        .on_authentication_succeeded(finger.fid as i32, hat.to_hardware());
                    inner.lockout.on_successful_match();
                } else {
                    inner.callback.on_authentication_failed();
                    inner.lockout.on_failed_match();
                }
            }
            DeviceMessage::TemplateEnumerating {
                finger,
                remaining_templates,
            } => {
                debug!(
                    session = %inner.id,
                    fid = finger.fid,
                    gid = finger.gid,
                    remaining = remaining_templates,
                    "onEnumerate"
                );
                let batch = {
                    let mut enumerated = inner.enumerated.lock();
                    // fid 0 means the group has no templates
                    if finger.fid != 0 {
                        enumerated.push(finger.fid as i32);
                    }
                    (*remaining_templates == 0).then(|| mem::take(&mut *enumerated))
                };
                if let Some(enrollment_ids) = batch {
                    inner.callback.on_enrollments_enumerated(enrollment_ids);
                }
            }
        }
    }
}
