use earshot_common::ParticipantId;

use crate::schema::EarshotConfig;

use super::helpers::validate_range;

/// A configured participant id must fit the 18-byte wire field.
pub(crate) fn validate_identity(errors: &mut Vec<String>, config: &EarshotConfig) {
    let id = &config.identity.participant_id;
    if id.is_empty() {
        return;
    }
    if let Err(e) = ParticipantId::new(id.as_str()) {
        errors.push(format!("identity.participant_id: {e}"));
    }
}

pub(crate) fn validate_hub(errors: &mut Vec<String>, config: &EarshotConfig) {
    validate_range(errors, "hub.port", u32::from(config.hub.port), 1024, 65535);
    validate_range(errors, "hub.ping_interval", config.hub.ping_interval, 5, 120);
    if config.hub.bind_address.trim().is_empty() {
        errors.push("hub.bind_address must not be empty".into());
    }
}

pub(crate) fn validate_session(errors: &mut Vec<String>, config: &EarshotConfig) {
    let session = &config.session;
    validate_range(errors, "session.connect_timeout", session.connect_timeout, 1, 60);
    validate_range(errors, "session.reconnect_delay", session.reconnect_delay, 1, 60);
    validate_range(
        errors,
        "session.max_reconnect_delay",
        session.max_reconnect_delay,
        1,
        600,
    );
    if session.max_reconnect_delay < session.reconnect_delay {
        errors.push(format!(
            "session.max_reconnect_delay = {} is below session.reconnect_delay = {}",
            session.max_reconnect_delay, session.reconnect_delay
        ));
    }
    if session.hub_url.trim().is_empty() {
        errors.push("session.hub_url must not be empty".into());
    }
}
