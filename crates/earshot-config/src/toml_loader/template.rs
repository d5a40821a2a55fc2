//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# earshot configuration
# Only override what you want to change -- missing fields use defaults.

[identity]
# Voice-chat participant id (at most 18 bytes). --participant-id overrides.
# participant_id = ""

[hub]
# Used by `earshot host` and `earshot-relay`.
# bind_address = "0.0.0.0"
# port = 8970            # 1024-65535
# ping_interval = 15     # seconds, 5-120

[session]
# Used by `earshot join` when no address is given on the command line.
# hub_url = "ws://127.0.0.1:8970"
# connect_timeout = 10   # seconds, 1-60
# reconnect = true
# reconnect_delay = 1    # seconds, 1-60, doubles after each failure
# max_reconnect_delay = 30  # seconds, 1-600

[proximity]
# audio_shape = "volume" # volume, stereo

[position_source]
# Empty = <config dir>/Factorio/script-output/fdpa-comm
# path = ""

[logging]
# level = "INFO"         # DEBUG, INFO, WARNING, ERROR
# verbose = false        # log every relayed position and ping
"##
    .to_string()
}
